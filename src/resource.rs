//! Typed resource records and their RDATA decoders.
//!
//! Each decoder is handed a cursor positioned at the start of the RDATA
//! and the declared RDLENGTH; domain names inside RDATA may use message
//! compression, so decoding goes through [`DnsReadExt::read_qname`] over
//! the whole message buffer.

use crate::types::Type;
use crate::wire::DnsReadExt;
use byteorder::{ReadBytesExt, BE};
use log::warn;
use std::fmt;
use std::io;
use std::io::Cursor;
use std::io::Read;

/// Mail exchange record. See [rfc1035 section 3.3.9].
///
/// [rfc1035 section 3.3.9]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.9
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub struct MX {
    /// Lower values are preferred.
    pub preference: u16,

    /// Host willing to act as mail exchange for the owner name.
    pub exchange: String,
}

/// Server selection record. See [rfc2782].
///
/// [rfc2782]: https://datatracker.ietf.org/doc/html/rfc2782
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub struct SRV {
    /// Lower values are preferred.
    pub priority: u16,

    /// Relative weight for entries of equal priority.
    pub weight: u16,

    pub port: u16,

    /// Host of the service endpoint.
    pub target: String,
}

/// Text record. See [rfc1035 section 3.3.14].
///
/// The wire format carries one or more length-prefixed character strings;
/// they are concatenated and exposed as a single string, which is how
/// autodiscovery consumers expect to read them.
///
/// [rfc1035 section 3.3.14]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.14
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub struct TXT {
    pub text: String,
}

/// Decoded RDATA for the record types this resolver understands.
// This should be kept in sync with Type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Resource {
    MX(MX),
    SRV(SRV),
    TXT(TXT),
}

impl Resource {
    /// Decodes the RDATA for `r#type`. The cursor sits at the start of
    /// the RDATA; `rd_len` is the declared RDLENGTH.
    ///
    /// Returns `Ok(None)` for a TXT record whose character strings overrun
    /// RDLENGTH; that record is dropped without failing the rest of the
    /// response. Any other malformation is an error, failing the whole
    /// response: a partially decoded MX or SRV would be semantically wrong.
    pub(crate) fn parse(
        r#type: Type,
        cur: &mut Cursor<&[u8]>,
        rd_len: u16,
    ) -> io::Result<Option<Resource>> {
        match r#type {
            Type::MX => Ok(Some(Resource::MX(parse_mx(cur)?))),
            Type::SRV => Ok(Some(Resource::SRV(parse_srv(cur)?))),
            Type::TXT => Ok(parse_txt(cur, rd_len)?.map(Resource::TXT)),
        }
    }
}

fn parse_mx(cur: &mut Cursor<&[u8]>) -> io::Result<MX> {
    let preference = cur.read_u16::<BE>()?;
    let exchange = cur.read_qname()?;

    Ok(MX {
        preference,
        exchange,
    })
}

fn parse_srv(cur: &mut Cursor<&[u8]>) -> io::Result<SRV> {
    let priority = cur.read_u16::<BE>()?;
    let weight = cur.read_u16::<BE>()?;
    let port = cur.read_u16::<BE>()?;
    let target = cur.read_qname()?;

    Ok(SRV {
        priority,
        weight,
        port,
        target,
    })
}

fn parse_txt(cur: &mut Cursor<&[u8]>, rd_len: u16) -> io::Result<Option<TXT>> {
    let mut remaining = rd_len as usize;
    let mut text = String::new();

    while remaining > 0 {
        let len = cur.read_u8()? as usize;
        remaining -= 1;

        if len > remaining {
            warn!(
                "TXT character-string length {} overruns RDLENGTH, dropping record",
                len
            );
            return Ok(None);
        }

        let mut segment = vec![0; len];
        cur.read_exact(&mut segment)?;
        text.push_str(&String::from_utf8_lossy(&segment));

        remaining -= len;
    }

    Ok(Some(TXT { text }))
}

impl fmt::Display for MX {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.exchange)
    }
}

impl fmt::Display for SRV {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
        )
    }
}

impl fmt::Display for TXT {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self.text)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Resource::MX(mx) => mx.fmt(f),
            Resource::SRV(srv) => srv.fmt(f),
            Resource::TXT(txt) => txt.fmt(f),
        }
    }
}
