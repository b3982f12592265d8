use crate::resource::Resource;
use std::fmt;
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// Resource Record Type.
///
/// Only the types this resolver queries are listed; anything else found in
/// a response is skipped during parsing rather than rejected.
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u16)]
pub enum Type {
    /// Mail exchange.
    MX = 15,

    /// Text strings.
    TXT = 16,

    /// Server Selection.
    SRV = 33,
}

/// Resource Record Class.
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq, Eq)]
#[repr(u16)]
pub enum Class {
    /// (Default) The Internet (IN), see [rfc1035].
    ///
    /// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
    #[strum(serialize = "IN")]
    Internet = 1,

    /// * (ANY), only valid in questions.
    #[strum(serialize = "*")]
    Any = 255,
}

impl Default for Class {
    fn default() -> Self {
        Class::Internet
    }
}

/// Response Codes.
/// See [rfc1035] and <https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6>
///
/// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u8)] // 4 bits in the header.
pub enum Rcode {
    /// No Error
    NoError = 0,

    /// Format Error
    FormErr = 1,

    /// Server Failure
    ServFail = 2,

    /// Non-Existent Domain
    NXDomain = 3,

    /// Not Implemented
    NotImp = 4,

    /// Query Refused
    Refused = 5,

    YXDomain = 6,
    YXRRSet = 7,
    NXRRSet = 8,
    NotAuth = 9,
    NotZone = 10,
    DSOTYPENI = 11,
    // 12-15 Unassigned
}

impl Default for Rcode {
    fn default() -> Self {
        Rcode::NoError
    }
}

/// DNS Question: what was asked of the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    /// An ASCII domain name, dotted, without the trailing root dot.
    pub name: String,
    pub r#type: Type,
    pub class: Class,
}

/// Resource Record (RR): one answer entry from a response.
///
/// Records only live for as long as the caller holds on to the parsed
/// [`Message`]; nothing is cached across queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Owner name of the record.
    pub name: String,

    pub r#type: Type,
    pub class: Class,

    /// The number of seconds the record may be cached. Zero means it can
    /// only be used for the transaction in progress.
    pub ttl: Duration,

    pub resource: Resource,
}

/// A parsed DNS message.
///
/// Queries are built directly by [`crate::encode_query`]; this type is
/// the decoded form of a received datagram (and, in tests, of our own
/// encoded queries).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    /// 16-bit transaction id, copied from the query into its response.
    pub id: u16,

    /// True when this message is a response (the QR bit).
    pub response: bool,

    /// True when the response was truncated to fit the datagram. There is
    /// no TCP fallback; truncation is logged and the answers that fit are
    /// used as-is.
    pub truncated: bool,

    /// Response code.
    pub rcode: Rcode,

    /// The questions, echoed back by the server.
    pub questions: Vec<Question>,

    /// The answer records this resolver understood.
    pub answers: Vec<Record>,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "; {name:<18} {class:4} {type:6}",
            name = self.name,
            class = self.class,
            r#type = self.r#type,
        )
    }
}

/// Displays the record in a format resembling `dig` output.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{name:<20} {ttl:>4} {class:4} {type:6} {resource}",
            name = self.name,
            ttl = self.ttl.as_secs(),
            class = self.class,
            r#type = self.r#type,
            resource = self.resource,
        )
    }
}
