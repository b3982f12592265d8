//! The backend-agnostic resolver interface.
//!
//! The surrounding application selects one of several backends at startup
//! by platform: a native DNS API on one, a zero-configuration discovery
//! daemon on another, and the wire-protocol resolver in this crate
//! everywhere else. All of them expose this surface; only the last one
//! lives here.

use crate::errors::Error;
use crate::resource::{MX, SRV, TXT};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Synchronous record lookups.
///
/// `get_*` calls fail loudly; `try_get_*` calls return `None` instead.
/// Both shapes treat a timeout as success with no records, so a caller of
/// the non-throwing shape cannot distinguish "no records" from "timed
/// out". That is intentional; autodiscovery probes treat the two alike.
pub trait DnsService {
    /// Mail exchange records for `domain`, best preference not guaranteed
    /// to be first.
    fn get_mx_records(&self, domain: &str) -> Result<Vec<MX>, Error>;
    fn try_get_mx_records(&self, domain: &str) -> Option<Vec<MX>>;

    /// Service records for a name such as `_autodiscover._tcp.example.com`.
    fn get_srv_records(&self, domain: &str) -> Result<Vec<SRV>, Error>;
    fn try_get_srv_records(&self, domain: &str) -> Option<Vec<SRV>>;

    /// Text records for `domain`.
    fn get_txt_records(&self, domain: &str) -> Result<Vec<TXT>, Error>;
    fn try_get_txt_records(&self, domain: &str) -> Option<Vec<TXT>>;
}

/// Asynchronous record lookups with caller-driven cancellation.
///
/// The `try_get_*` shapes report lookup failure as `Ok(None)`; their `Err`
/// is reserved for [`Error::Cancelled`], which is never swallowed.
#[async_trait]
pub trait AsyncDnsService {
    async fn get_mx_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<MX>, Error>;

    async fn try_get_mx_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<MX>>, Error>;

    async fn get_srv_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SRV>, Error>;

    async fn try_get_srv_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<SRV>>, Error>;

    async fn get_txt_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TXT>, Error>;

    async fn try_get_txt_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<TXT>>, Error>;
}
