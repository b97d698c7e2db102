//! Blocking memcached stats client.
//!
//! Every fetch opens a fresh connection, so a `MemcachedClient` holds no
//! connection state and is shared freely between scrapes. `stats`,
//! `stats items` and `stats slabs` are pipelined over one connection;
//! `stats settings` uses its own so that its failure cannot affect the rest.

pub mod protocol;

use std::io::{self, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::collector::model::{RawServerStats, RawSettings};
use crate::collector::traits::{ServerAddress, StatsError, StatsSource, Target};

use protocol::{
    CMD_STATS, CMD_STATS_ITEMS, CMD_STATS_SETTINGS, CMD_STATS_SLABS, apply_global, apply_items,
    apply_slabs, read_stats,
};

/// `StatsSource` talking the memcached ASCII protocol over TCP or a unix
/// domain socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemcachedClient;

impl MemcachedClient {
    pub fn new() -> Self {
        Self
    }
}

impl StatsSource for MemcachedClient {
    fn fetch_stats(&self, target: &Target) -> Result<Vec<RawServerStats>, StatsError> {
        let mut conn = Connection::open(target)?;
        let mut stats = RawServerStats::new(target.address.to_string());

        apply_global(&mut stats, conn.query(CMD_STATS)?);
        apply_items(&mut stats, conn.query(CMD_STATS_ITEMS)?);
        apply_slabs(&mut stats, conn.query(CMD_STATS_SLABS)?);

        trace!(
            address = %target.address,
            global = stats.global.len(),
            item_slabs = stats.items.len(),
            slabs = stats.slabs.len(),
            "fetched stats"
        );
        Ok(vec![stats])
    }

    fn fetch_settings(&self, target: &Target) -> Result<Vec<RawSettings>, StatsError> {
        let mut conn = Connection::open(target)?;
        let mut settings = RawSettings::new(target.address.to_string());
        settings.settings.extend(conn.query(CMD_STATS_SETTINGS)?);
        Ok(vec![settings])
    }
}

enum Socket {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Socket {
    fn set_timeouts(&self, timeout: Duration) -> io::Result<()> {
        match self {
            Socket::Tcp(s) => {
                s.set_read_timeout(Some(timeout))?;
                s.set_write_timeout(Some(timeout))
            }
            #[cfg(unix)]
            Socket::Unix(s) => {
                s.set_read_timeout(Some(timeout))?;
                s.set_write_timeout(Some(timeout))
            }
        }
    }
}

/// Socket bounded by a per-command deadline.
///
/// Before every read and write the socket timeout is shrunk to the time left,
/// so a server trickling bytes cannot stretch a command past the deadline.
struct Stream {
    socket: Socket,
    deadline: Option<Instant>,
}

impl Stream {
    fn arm(&self) -> io::Result<()> {
        let Some(deadline) = self.deadline else {
            return Ok(());
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timed_out());
        }
        self.socket.set_timeouts(remaining)
    }
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "memcached command timed out")
}

/// On Unix an expired socket timeout surfaces as `WouldBlock`.
fn normalize_timeout(e: io::Error) -> io::Error {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => timed_out(),
        _ => e,
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.arm()?;
        let result = match &mut self.socket {
            Socket::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Socket::Unix(s) => s.read(buf),
        };
        result.map_err(normalize_timeout)
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm()?;
        let result = match &mut self.socket {
            Socket::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Socket::Unix(s) => s.write(buf),
        };
        result.map_err(normalize_timeout)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.socket {
            Socket::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Socket::Unix(s) => s.flush(),
        }
    }
}

struct Connection {
    reader: BufReader<Stream>,
    timeout: Option<Duration>,
}

impl Connection {
    fn open(target: &Target) -> Result<Self, StatsError> {
        // std rejects zero timeouts; zero means "no timeout" here
        let timeout = Some(target.timeout).filter(|t| !t.is_zero());

        let socket = match &target.address {
            ServerAddress::Tcp(addr) => Socket::Tcp(connect_tcp(addr, timeout)?),
            #[cfg(unix)]
            ServerAddress::Unix(path) => {
                let stream = UnixStream::connect(path).map_err(|e| StatsError::Connect {
                    address: target.address.to_string(),
                    source: e,
                })?;
                Socket::Unix(stream)
            }
            #[cfg(not(unix))]
            ServerAddress::Unix(_) => {
                return Err(StatsError::Connect {
                    address: target.address.to_string(),
                    source: io::Error::new(
                        io::ErrorKind::Unsupported,
                        "unix sockets are not supported on this platform",
                    ),
                });
            }
        };

        Ok(Self {
            reader: BufReader::new(Stream {
                socket,
                deadline: None,
            }),
            timeout,
        })
    }

    /// Sends `command` and reads its reply, all within one timeout.
    fn query(&mut self, command: &str) -> Result<Vec<(String, String)>, StatsError> {
        let stream = self.reader.get_mut();
        stream.deadline = self.timeout.map(|t| Instant::now() + t);
        stream.write_all(command.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()?;
        read_stats(&mut self.reader)
    }
}

/// Connects to the first reachable resolved address of `addr`.
fn connect_tcp(addr: &str, timeout: Option<Duration>) -> Result<TcpStream, StatsError> {
    let connect_error = |source| StatsError::Connect {
        address: addr.to_string(),
        source,
    };

    let mut last_error = None;
    for sock_addr in addr.to_socket_addrs().map_err(connect_error)? {
        let attempt = match timeout {
            Some(t) => TcpStream::connect_timeout(&sock_addr, t),
            None => TcpStream::connect(sock_addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => {
                trace!(address = %sock_addr, error = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(connect_error(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
    })))
}
