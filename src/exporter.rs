//! Prometheus adapter for the translation engine.
//!
//! [`MemcachedExporter`] implements `prometheus::core::Collector`: the
//! description pass is derived from the static catalog, the collection pass
//! runs one engine cycle and groups its observations into metric families.

use std::collections::BTreeMap;
use std::collections::HashMap;

use prometheus::core::Desc;
use prometheus::proto::{self, LabelPair, Metric, MetricFamily, MetricType};

use crate::catalog::{self, MetricId, MetricKind};
use crate::client::MemcachedClient;
use crate::collector::{Collector, Observation, ObservationSink, StatsSource};

/// Registers the memcached catalog with a Prometheus registry.
pub struct MemcachedExporter<S: StatsSource = MemcachedClient> {
    collector: Collector<S>,
    descs: Vec<Desc>,
}

impl<S: StatsSource> MemcachedExporter<S> {
    /// Builds descriptors for every catalog entry.
    ///
    /// Fails only if a catalog name or label is not a valid Prometheus
    /// identifier.
    pub fn new(collector: Collector<S>) -> prometheus::Result<Self> {
        let descs = catalog::describe()
            .iter()
            .map(|entry| {
                Desc::new(
                    entry.fq_name(),
                    entry.help.to_string(),
                    entry.labels.iter().map(|l| l.to_string()).collect(),
                    HashMap::new(),
                )
            })
            .collect::<prometheus::Result<Vec<_>>>()?;

        Ok(Self { collector, descs })
    }

    pub fn collector(&self) -> &Collector<S> {
        &self.collector
    }
}

impl<S: StatsSource> prometheus::core::Collector for MemcachedExporter<S> {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = FamilyBuilder::default();
        self.collector.collect_into(&mut families);
        families.finish()
    }
}

/// Observation sink grouping metrics by catalog entry.
#[derive(Default)]
struct FamilyBuilder {
    metrics: BTreeMap<MetricId, Vec<Metric>>,
}

impl ObservationSink for FamilyBuilder {
    fn observe(&mut self, observation: Observation) {
        self.metrics
            .entry(observation.metric())
            .or_default()
            .push(to_metric(&observation));
    }
}

impl FamilyBuilder {
    /// Families in catalog order. Metrics without observations this cycle
    /// are left out.
    fn finish(self) -> Vec<MetricFamily> {
        self.metrics
            .into_iter()
            .filter(|(_, metrics)| !metrics.is_empty())
            .map(|(id, metrics)| {
                let entry = id.entry();
                let mut mf = MetricFamily::default();
                mf.set_name(entry.fq_name());
                mf.set_help(entry.help.to_string());
                mf.set_field_type(metric_type(entry.kind));
                mf.set_metric(metrics.into());
                mf
            })
            .collect()
    }
}

/// The text encoder cannot write untyped families, so they are exposed as
/// gauges.
fn metric_type(kind: MetricKind) -> MetricType {
    match kind {
        MetricKind::Counter => MetricType::COUNTER,
        MetricKind::Gauge | MetricKind::Untyped => MetricType::GAUGE,
    }
}

fn to_metric(observation: &Observation) -> Metric {
    let id = observation.metric();
    let labels: Vec<LabelPair> = id
        .labels()
        .iter()
        .zip(observation.labels())
        .map(|(name, value)| {
            let mut lp = LabelPair::default();
            lp.set_name(name.to_string());
            lp.set_value(value.clone());
            lp
        })
        .collect();

    let mut m = Metric::default();
    m.set_label(labels.into());
    let value = observation.value();
    match id.kind() {
        MetricKind::Counter => {
            let mut c = proto::Counter::default();
            c.set_value(value);
            m.set_counter(c);
        }
        MetricKind::Gauge | MetricKind::Untyped => {
            let mut g = proto::Gauge::default();
            g.set_value(value);
            m.set_gauge(g);
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CATALOG;
    use crate::collector::{MockSource, RecordingDiagnostics, ServerAddress, Target};
    use prometheus::core::Collector as _;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::sync::Arc;
    use std::time::Duration;

    fn exporter(source: MockSource) -> MemcachedExporter<MockSource> {
        let target = Target::new(
            ServerAddress::Tcp("mock:11211".to_string()),
            Duration::from_secs(1),
        );
        let collector = Collector::new(source, target)
            .with_diagnostics(Arc::new(RecordingDiagnostics::default()));
        MemcachedExporter::new(collector).unwrap()
    }

    fn gather(source: MockSource) -> Vec<MetricFamily> {
        let registry = Registry::new();
        registry.register(Box::new(exporter(source))).unwrap();
        registry.gather()
    }

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.get_name() == name)
            .unwrap_or_else(|| panic!("family {name} missing"))
    }

    fn label<'a>(m: &'a Metric, name: &str) -> &'a str {
        m.get_label()
            .iter()
            .find(|lp| lp.get_name() == name)
            .map(|lp| lp.get_value())
            .unwrap_or_default()
    }

    #[test]
    fn test_descs_follow_catalog() {
        let e = exporter(MockSource::default());
        let descs = e.desc();
        assert_eq!(descs.len(), CATALOG.len());
        for (desc, entry) in descs.iter().zip(CATALOG.iter()) {
            assert_eq!(desc.fq_name, entry.fq_name());
            assert_eq!(desc.help, entry.help);
            assert_eq!(desc.variable_labels, entry.labels);
        }
    }

    #[test]
    fn test_gather_typical_server() {
        let families = gather(MockSource::typical_server());

        let up = family(&families, "memcached_up");
        assert_eq!(up.get_field_type(), MetricType::GAUGE);
        assert_eq!(up.get_metric()[0].get_gauge().get_value(), 1.0);

        let uptime = family(&families, "memcached_uptime_seconds");
        assert_eq!(uptime.get_field_type(), MetricType::COUNTER);
        assert_eq!(uptime.get_metric()[0].get_counter().get_value(), 86400.0);

        let version = family(&families, "memcached_version");
        assert_eq!(label(&version.get_metric()[0], "version"), "1.6.21");

        let commands = family(&families, "memcached_commands_total");
        assert_eq!(commands.get_metric().len(), 15);
        let set = commands
            .get_metric()
            .iter()
            .find(|m| label(m, "command") == "set" && label(m, "status") == "hit")
            .unwrap();
        assert_eq!(set.get_counter().get_value(), 90.0);

        let starts = family(&families, "namespace_lru_crawler_starts");
        assert_eq!(starts.get_field_type(), MetricType::GAUGE);
        assert_eq!(starts.get_metric()[0].get_gauge().get_value(), 12.0);

        let chunk_size = family(&families, "memcached_slab_chunk_size_bytes");
        let slabs: Vec<&str> = chunk_size
            .get_metric()
            .iter()
            .map(|m| label(m, "slab"))
            .collect();
        assert_eq!(slabs, vec!["1", "5"]);

        let slab_cmds = family(&families, "memcached_slab_commands_total");
        assert_eq!(slab_cmds.get_metric()[0].get_label().len(), 3);

        assert_eq!(
            family(&families, "memcached_lru_crawler_enabled").get_metric()[0]
                .get_gauge()
                .get_value(),
            1.0
        );
    }

    #[test]
    fn test_untyped_catalog_entries_are_encodable() {
        let untyped: Vec<MetricId> = CATALOG
            .iter()
            .filter(|e| e.kind == MetricKind::Untyped)
            .map(|e| e.id)
            .collect();
        assert!(!untyped.is_empty());

        let families = gather(MockSource::typical_server());
        for id in untyped {
            let name = id.entry().fq_name();
            let mf = family(&families, &name);
            assert_ne!(mf.get_field_type(), MetricType::UNTYPED, "{name}");

            let mut buf = Vec::new();
            TextEncoder::new().encode(&[mf.clone()], &mut buf).unwrap();
            assert!(String::from_utf8(buf).unwrap().contains(&name));
        }
    }

    #[test]
    fn test_unreachable_exports_only_up() {
        let families = gather(MockSource::unreachable());
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), "memcached_up");
        assert_eq!(families[0].get_metric()[0].get_gauge().get_value(), 0.0);
    }

    #[test]
    fn test_nan_survives_into_family() {
        let mut source = MockSource::typical_server();
        source.set_global("uptime", "soon");
        let families = gather(source);

        let uptime = family(&families, "memcached_uptime_seconds");
        assert!(uptime.get_metric()[0].get_counter().get_value().is_nan());
    }

    #[test]
    fn test_text_exposition() {
        let families = gather(MockSource::typical_server());
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("# TYPE memcached_up gauge"));
        assert!(text.contains("memcached_up 1"));
        assert!(text.contains("# TYPE namespace_lru_crawler_starts gauge"));
        assert!(text.contains("namespace_lru_crawler_starts 12"));
        assert!(text.contains("memcached_commands_total{command=\"get\",status=\"hit\"} 900"));
    }
}
