//! The UDP transport session: resolver-host selection, socket caching and
//! the query pipeline.

use crate::errors::Error;
use crate::types::{Message, Record, Type};
use crate::wire;
use log::{debug, warn};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Standard DNS port.
pub const DNS_PORT: u16 = 53;

/// Used when the platform reports no configured resolver addresses.
pub const FALLBACK_SERVER: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), DNS_PORT);

/// How long to wait for a response before giving up on a query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Yields the ordered list of recursive resolvers configured on the
/// platform. Enumerating those addresses is the embedder's concern; the
/// session only consumes the list, first entry preferred.
pub type ServerSource = Arc<dyn Fn() -> Vec<SocketAddr> + Send + Sync>;

struct CachedSocket {
    socket: Option<UdpSocket>,
    server: Option<SocketAddr>,
}

/// Owns the UDP transport for one resolver instance.
///
/// Only socket selection and cache bookkeeping run under a lock. The
/// send/receive I/O happens on a checked-out socket no other query can
/// observe, so concurrent callers end up on distinct sockets rather than
/// interleaving reads on a shared one; the cached socket is still reused
/// on the common sequential path.
pub struct Session {
    servers: ServerSource,

    /// Resolver address in use, cached until a network change.
    primary: Mutex<Option<SocketAddr>>,

    cache: Mutex<CachedSocket>,

    /// Transaction id counter; wraps at 65536.
    next_id: AtomicU16,

    timeout: Duration,
}

impl Session {
    /// Creates a session over the given server source with the standard
    /// 5-second timeout.
    pub fn new(servers: ServerSource) -> Session {
        Session::with_timeout(servers, QUERY_TIMEOUT)
    }

    /// As [`Session::new`] but with an explicit receive timeout.
    pub fn with_timeout(servers: ServerSource, timeout: Duration) -> Session {
        Session {
            servers,
            primary: Mutex::new(None),
            cache: Mutex::new(CachedSocket {
                socket: None,
                server: None,
            }),
            // Randomly seeded so ids don't restart at the same value on
            // every process launch.
            next_id: AtomicU16::new(rand::random()),
            timeout,
        }
    }

    /// Drops the cached resolver address. Call when the platform reports a
    /// network-configuration change; the next query re-consults the
    /// server source.
    pub fn network_changed(&self) {
        *lock(&self.primary) = None;
    }

    fn server(&self) -> SocketAddr {
        let mut primary = lock(&self.primary);

        if let Some(server) = *primary {
            return server;
        }

        let server = (self.servers)()
            .into_iter()
            .next()
            .unwrap_or(FALLBACK_SERVER);
        *primary = Some(server);

        server
    }

    /// Takes the cached socket if it is connected to `server`, otherwise
    /// creates a fresh one. The caller owns the result exclusively until
    /// it is checked back in.
    fn checkout(&self, server: SocketAddr) -> io::Result<UdpSocket> {
        let mut cache = lock(&self.cache);

        if cache.server == Some(server) {
            if let Some(socket) = cache.socket.take() {
                cache.server = None;
                return Ok(socket);
            }
        }

        // Host changed or nothing cached. std's UdpSocket cannot be
        // disconnected and reconnected, so a stale socket is dropped.
        cache.socket = None;
        cache.server = None;

        let bind_addr = match server {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };

        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(self.timeout))?;
        socket.set_write_timeout(Some(self.timeout))?;

        // Connect so recv only accepts datagrams from the server.
        socket.connect(server)?;

        Ok(socket)
    }

    /// Returns a socket to the cache, or drops it if a concurrent query
    /// already filled the slot.
    fn checkin(&self, socket: UdpSocket, server: SocketAddr) {
        let mut cache = lock(&self.cache);

        if cache.socket.is_none() {
            cache.socket = Some(socket);
            cache.server = Some(server);
        }
    }

    /// Sends one query for (`domain`, `type`) and returns the decoded
    /// answer records, unfiltered.
    ///
    /// A timeout and an undecodable response both yield `Ok` with an
    /// empty list. Errors are reserved for names that cannot be encoded
    /// and for transport failures.
    pub fn query(&self, domain: &str, r#type: Type) -> Result<Vec<Record>, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = wire::encode_query(id, domain, r#type).map_err(|e| Error::Encode(e.to_string()))?;

        let server = self.server();
        let socket = self.checkout(server).map_err(|source| Error::Transport {
            domain: domain.to_string(),
            source,
        })?;

        debug!("query {:#06x}: {} {} via {}", id, r#type, domain, server);

        let result = self.exchange(&socket, id, &req);
        self.checkin(socket, server);

        result.map_err(|source| Error::Transport {
            domain: domain.to_string(),
            source,
        })
    }

    /// Send and receive on an exclusively owned socket.
    fn exchange(&self, socket: &UdpSocket, id: u16, req: &[u8]) -> io::Result<Vec<Record>> {
        socket.send(req)?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = [0; wire::MAX_DATAGRAM_SIZE];

        // Datagrams that are not the answer to this query are discarded
        // and the read continues, against the same deadline.
        loop {
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(d) if d > Duration::ZERO => d,
                _ => {
                    debug!("query {:#06x}: timed out", id);
                    return Ok(Vec::new());
                }
            };
            socket.set_read_timeout(Some(remaining))?;

            let len = match socket.recv(&mut buf) {
                Ok(len) => len,
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    debug!("query {:#06x}: timed out", id);
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            };

            let msg = match Message::from_slice(&buf[..len]) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("query {:#06x}: discarding malformed response: {}", id, e);
                    return Ok(Vec::new());
                }
            };

            if msg.id != id {
                // A stale or foreign datagram, most likely the answer to
                // an earlier query on this socket that already timed out.
                warn!(
                    "query {:#06x}: ignoring response with id {:#06x}",
                    id, msg.id
                );
                continue;
            }

            if !msg.response {
                warn!("query {:#06x}: ignoring datagram without the response bit", id);
                continue;
            }

            if msg.truncated {
                // No TCP fallback; whatever answers fit are still usable.
                warn!("query {:#06x}: response was truncated", id);
            }

            debug!(
                "query {:#06x}: {} usable answers, rcode {}",
                id,
                msg.answers.len(),
                msg.rcode
            );

            return Ok(msg.answers);
        }
    }
}

// Keeps the session usable even if a thread panicked while holding a lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
