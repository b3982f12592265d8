//! A self-contained DNS resolver for mail and collaboration service
//! discovery: MX, SRV and TXT lookups over plain UDP against one upstream
//! recursive resolver.
//!
//! The crate builds raw rfc1035 query datagrams, sends them to a
//! configured server (or `1.1.1.1` when none is configured), and decodes
//! the wire-format response including compressed names, tolerating
//! malformed and adversarial input. It is the portable fallback behind a
//! platform-agnostic service interface whose other implementations wrap
//! OS-native DNS facilities.
//!
//! # Example
//!
//! ```no_run
//! use maildns::{DnsService, Resolver};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), maildns::Error> {
//!     let resolver = Resolver::new(Arc::new(Vec::new));
//!
//!     for srv in resolver.get_srv_records("_autodiscover._tcp.example.com")? {
//!         println!("{}:{}", srv.target, srv.port);
//!     }
//!     Ok(())
//! }
//! ```

#[macro_use]
extern crate num_derive;

mod errors;
mod resolver;
mod service;
mod session;
mod wire;

pub mod resource;
pub mod types;

pub use crate::types::*;

// Pull up the various types that should be on the front page of the docs.
#[doc(inline)]
pub use crate::errors::Error;
#[doc(inline)]
pub use crate::resolver::Resolver;
#[doc(inline)]
pub use crate::service::{AsyncDnsService, DnsService};
#[doc(inline)]
pub use crate::session::{ServerSource, Session, DNS_PORT, FALLBACK_SERVER, QUERY_TIMEOUT};

#[doc(inline)]
pub use crate::resource::{Resource, MX, SRV, TXT};

pub use crate::wire::{encode_query, MAX_DATAGRAM_SIZE};
