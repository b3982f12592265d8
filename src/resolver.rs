//! The managed wire-protocol resolver: the public facade over the
//! session, codec and record decoders.

use crate::errors::Error;
use crate::resource::{Resource, MX, SRV, TXT};
use crate::service::{AsyncDnsService, DnsService};
use crate::session::{ServerSource, Session};
use crate::types::{Record, Type};
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolves MX, SRV and TXT records by speaking rfc1035 over UDP to one
/// upstream recursive resolver, trusting its answers.
///
/// # Example
///
/// ```no_run
/// use maildns::{DnsService, Resolver};
/// use std::sync::Arc;
///
/// fn main() -> Result<(), maildns::Error> {
///     // An empty server source falls back to a public resolver.
///     let resolver = Resolver::new(Arc::new(Vec::new));
///
///     for mx in resolver.get_mx_records("example.com")? {
///         println!("{} {}", mx.preference, mx.exchange);
///     }
///     Ok(())
/// }
/// ```
pub struct Resolver {
    session: Arc<Session>,
}

impl Resolver {
    /// Creates a resolver. `servers` yields the platform's configured DNS
    /// server addresses in preference order; when it yields nothing the
    /// session falls back to a public resolver.
    pub fn new(servers: ServerSource) -> Resolver {
        Resolver::with_session(Session::new(servers))
    }

    /// Creates a resolver over an explicitly configured session.
    pub fn with_session(session: Session) -> Resolver {
        Resolver {
            session: Arc::new(session),
        }
    }

    /// Forwards a platform network-configuration change to the session,
    /// dropping its cached resolver address.
    pub fn network_changed(&self) {
        self.session.network_changed()
    }

    /// One lookup, filtered to records owned by `domain` and projected to
    /// the typed record by `f`.
    fn records<T>(
        &self,
        domain: &str,
        r#type: Type,
        f: fn(Resource) -> Option<T>,
    ) -> Result<Vec<T>, Error> {
        let want = normalize(domain)?;
        let records = self.session.query(domain, r#type)?;

        Ok(project(records, &want, f))
    }

    /// As [`Resolver::records`], with the blocking transport work moved
    /// off the cooperative scheduler and raced against `cancel`.
    ///
    /// Cancellation aborts the await promptly; the offloaded blocking call
    /// is not retroactively interruptible mid-syscall and may run out its
    /// timeout in the background before its socket is returned.
    async fn records_async<T>(
        &self,
        domain: &str,
        r#type: Type,
        f: fn(Resource) -> Option<T>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, Error> {
        let want = normalize(domain)?;

        let session = Arc::clone(&self.session);
        let domain = domain.to_string();
        let task = tokio::task::spawn_blocking(move || session.query(&domain, r#type));

        let records = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            joined = task => match joined {
                Ok(result) => result?,
                // The task only fails if its closure panicked or the
                // runtime is shutting down.
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => return Err(Error::Cancelled),
            },
        };

        Ok(project(records, &want, f))
    }
}

impl DnsService for Resolver {
    fn get_mx_records(&self, domain: &str) -> Result<Vec<MX>, Error> {
        self.records(domain, Type::MX, as_mx)
    }

    fn try_get_mx_records(&self, domain: &str) -> Option<Vec<MX>> {
        swallow(self.records(domain, Type::MX, as_mx))
    }

    fn get_srv_records(&self, domain: &str) -> Result<Vec<SRV>, Error> {
        self.records(domain, Type::SRV, as_srv)
    }

    fn try_get_srv_records(&self, domain: &str) -> Option<Vec<SRV>> {
        swallow(self.records(domain, Type::SRV, as_srv))
    }

    fn get_txt_records(&self, domain: &str) -> Result<Vec<TXT>, Error> {
        self.records(domain, Type::TXT, as_txt)
    }

    fn try_get_txt_records(&self, domain: &str) -> Option<Vec<TXT>> {
        swallow(self.records(domain, Type::TXT, as_txt))
    }
}

#[async_trait]
impl AsyncDnsService for Resolver {
    async fn get_mx_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<MX>, Error> {
        self.records_async(domain, Type::MX, as_mx, cancel).await
    }

    async fn try_get_mx_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<MX>>, Error> {
        swallow_unless_cancelled(self.records_async(domain, Type::MX, as_mx, cancel).await)
    }

    async fn get_srv_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SRV>, Error> {
        self.records_async(domain, Type::SRV, as_srv, cancel).await
    }

    async fn try_get_srv_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<SRV>>, Error> {
        swallow_unless_cancelled(self.records_async(domain, Type::SRV, as_srv, cancel).await)
    }

    async fn get_txt_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TXT>, Error> {
        self.records_async(domain, Type::TXT, as_txt, cancel).await
    }

    async fn try_get_txt_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<TXT>>, Error> {
        swallow_unless_cancelled(self.records_async(domain, Type::TXT, as_txt, cancel).await)
    }
}

/// ASCII form of `domain` without the root dot, for comparing answer
/// owner names against the queried name.
fn normalize(domain: &str) -> Result<String, Error> {
    let mut ascii = idna::domain_to_ascii(domain)
        .map_err(|e| Error::Encode(format!("invalid domain name '{}': {}", domain, e)))?;

    if ascii.ends_with('.') {
        ascii.pop();
    }

    Ok(ascii)
}

/// Keeps records owned by the queried name (case-insensitively) and
/// projects them to the typed record. Anything else in the answer
/// section -- glue, unrelated names -- is discarded.
fn project<T>(records: Vec<Record>, want: &str, f: fn(Resource) -> Option<T>) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| r.name.eq_ignore_ascii_case(want))
        .filter_map(|r| f(r.resource))
        .collect()
}

fn as_mx(resource: Resource) -> Option<MX> {
    match resource {
        Resource::MX(mx) => Some(mx),
        _ => None,
    }
}

fn as_srv(resource: Resource) -> Option<SRV> {
    match resource {
        Resource::SRV(srv) => Some(srv),
        _ => None,
    }
}

fn as_txt(resource: Resource) -> Option<TXT> {
    match resource {
        Resource::TXT(txt) => Some(txt),
        _ => None,
    }
}

/// Non-throwing shape: failures become `None`, logged so they are not
/// silently invisible.
fn swallow<T>(result: Result<Vec<T>, Error>) -> Option<Vec<T>> {
    match result {
        Ok(records) => Some(records),
        Err(e) => {
            warn!("lookup failed: {}", e);
            None
        }
    }
}

/// Non-throwing async shape: failures become `Ok(None)`, except for
/// cancellation, which always propagates.
fn swallow_unless_cancelled<T>(result: Result<Vec<T>, Error>) -> Result<Option<Vec<T>>, Error> {
    match result {
        Ok(records) => Ok(Some(records)),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(e) => {
            warn!("lookup failed: {}", e);
            Ok(None)
        }
    }
}
