//! Encoding and decoding of DNS wire-format messages, as defined by
//! [rfc1035 section 4.1](https://datatracker.ietf.org/doc/html/rfc1035#section-4.1).
//!
//! This is the client side only: queries are encoded, responses decoded.
//! Decoding treats the peer as untrusted; every read is bounds-checked and
//! compression pointers are only followed backwards under a hop budget.

use crate::bail;
use crate::resource::Resource;
use crate::types::{Class, Message, Question, Record, Type};
use byteorder::{ReadBytesExt, BE};
use log::trace;
use num_traits::FromPrimitive;
use std::io;
use std::io::{Cursor, Seek, SeekFrom};
use std::time::Duration;

/// Largest datagram sent or accepted. Plain DNS over UDP is nominally
/// limited to 512 bytes, but resolvers in the wild send more.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Upper bound on compression-pointer jumps while decoding one name.
/// Jump targets must strictly decrease, so this only triggers on
/// pathological (but technically well-formed) pointer chains.
const MAX_POINTER_HOPS: u32 = 32;

/// Header flags for a standard query: recursion desired, all else zero.
const FLAGS_RD: u16 = 0x0100;

/// Encodes a single-question query for `domain` with the given
/// transaction id, ready to be sent over UDP.
///
/// The name is normalised with [`idna::domain_to_ascii`] before being
/// split into labels, so unicode domains are punycoded and everything is
/// lowercased on the way out.
///
/// # Errors
///
/// Returns an `io::Error(InvalidData)` if the domain contains a label
/// longer than 63 bytes, an interior empty label, or is otherwise not
/// representable; the query is never sent in that case.
pub fn encode_query(id: u16, domain: &str, r#type: Type) -> io::Result<Vec<u8>> {
    let mut req = Vec::with_capacity(512);

    req.extend_from_slice(&id.to_be_bytes());
    req.extend_from_slice(&FLAGS_RD.to_be_bytes());
    req.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    req.extend_from_slice(&0u16.to_be_bytes()); // ANCOUNT
    req.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
    req.extend_from_slice(&0u16.to_be_bytes()); // ARCOUNT

    write_qname(&mut req, domain)?;

    req.extend_from_slice(&(r#type as u16).to_be_bytes());
    req.extend_from_slice(&(Class::Internet as u16).to_be_bytes());

    Ok(req)
}

/// Writes a domain name into `buf` as length-prefixed labels followed by
/// the zero terminator.
fn write_qname(buf: &mut Vec<u8>, domain: &str) -> io::Result<()> {
    let domain = match idna::domain_to_ascii(domain) {
        Err(e) => bail!(InvalidData, "invalid dns name '{0}': {1}", domain, e),
        Ok(domain) => domain,
    };

    if !domain.is_empty() && domain != "." {
        // split_terminator so a single trailing dot does not produce an
        // empty final label.
        for label in domain.split_terminator('.') {
            if label.is_empty() {
                bail!(InvalidData, "empty label in domain name '{}'", domain);
            }

            if label.len() > 63 {
                bail!(InvalidData, "label '{0}' longer than 63 characters", label);
            }

            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
    }

    buf.push(0);

    Ok(())
}

/// All types that implement `Read` and `Seek` get methods defined
/// in `DnsReadExt` for free.
impl<R: io::Read + ?Sized + io::Seek> DnsReadExt for R {}

/// Extensions to io::Read for DNS wire types.
pub(crate) trait DnsReadExt: io::Read + io::Seek {
    /// Reads a possibly-compressed domain name, returning it as a dotted
    /// ASCII string without the trailing root dot (the empty string for
    /// the root domain itself).
    ///
    /// Compression pointers ([rfc1035 section 4.1.4]) are followed as long
    /// as every jump lands strictly before the label sequence it was read
    /// from. Anything else -- self-reference, forward pointer, cycle -- is
    /// rejected, as is a chain longer than the hop budget. Since each jump
    /// target strictly decreases, termination is guaranteed even without
    /// the budget.
    ///
    /// [rfc1035 section 4.1.4]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4
    fn read_qname(&mut self) -> io::Result<String> {
        let mut qname = String::new();

        // Offset at which the label sequence currently being read began.
        let mut sequence_start = self.stream_position()?;
        let mut return_pos = None;
        let mut hops = 0;

        loop {
            let len = self.read_u8()?;
            if len == 0 {
                break;
            }

            match len & 0xC0 {
                // Plain label.
                0x00 => {
                    let mut label = vec![0; len.into()];
                    self.read_exact(&mut label)?;

                    let label = match std::str::from_utf8(&label) {
                        Err(e) => bail!(InvalidData, "invalid label: {}", e),
                        Ok(s) => s,
                    };

                    if !label.is_ascii() {
                        bail!(InvalidData, "invalid label '{:}': not valid ascii", label);
                    }

                    if !qname.is_empty() {
                        qname.push('.');
                    }
                    qname.push_str(label);
                }

                // Compression: the remaining 14 bits are an offset into
                // the message. A pointer ends the label sequence.
                0xC0 => {
                    let b2 = self.read_u8()? as u16;
                    let ptr = u64::from((u16::from(len) & !0xC0) << 8 | b2);

                    if ptr >= sequence_start {
                        bail!(
                            InvalidData,
                            "compression pointer to offset {} does not point backwards",
                            ptr
                        );
                    }

                    hops += 1;
                    if hops > MAX_POINTER_HOPS {
                        bail!(
                            InvalidData,
                            "more than {} compression pointers in one name",
                            MAX_POINTER_HOPS
                        );
                    }

                    // The first pointer decides where the caller resumes.
                    if return_pos.is_none() {
                        return_pos = Some(self.stream_position()?);
                    }

                    self.seek(SeekFrom::Start(ptr))?;
                    sequence_start = ptr;
                }

                // 0x40 and 0x80 prefixes are unassigned.
                _ => bail!(InvalidData, "unsupported label type {0:b}", len & 0xC0),
            }
        }

        if let Some(pos) = return_pos {
            self.seek(SeekFrom::Start(pos))?;
        }

        Ok(qname)
    }

    /// Reads a TYPE. `None` for record types this resolver does not
    /// understand; upstream resolvers routinely return unrelated types.
    fn read_type(&mut self) -> io::Result<Option<Type>> {
        Ok(FromPrimitive::from_u16(self.read_u16::<BE>()?))
    }

    /// Reads a CLASS. `None` for classes outside the supported set.
    fn read_class(&mut self) -> io::Result<Option<Class>> {
        Ok(FromPrimitive::from_u16(self.read_u16::<BE>()?))
    }
}

// A helper to hold state while one response buffer is being parsed.
struct MessageParser<'a> {
    cur: Cursor<&'a [u8]>,
    m: Message,
}

impl<'a> MessageParser<'a> {
    fn new(buf: &[u8]) -> MessageParser {
        MessageParser {
            cur: Cursor::new(buf),
            m: Message::default(),
        }
    }

    /// Consume the MessageParser and return the resulting Message.
    fn parse(mut self) -> io::Result<Message> {
        self.m.id = self.cur.read_u16::<BE>()?;

        let b = self.cur.read_u8()?;
        self.m.response = (0b1000_0000 & b) != 0;
        let opcode = (0b0111_1000 & b) >> 3;
        self.m.truncated = (0b0000_0010 & b) != 0;

        if opcode != 0 {
            bail!(InvalidData, "unexpected Opcode({}) in response", opcode);
        }

        let b = self.cur.read_u8()?;
        let rcode = 0b0000_1111 & b;
        self.m.rcode = match FromPrimitive::from_u8(rcode) {
            Some(t) => t,
            None => bail!(InvalidData, "invalid Rcode({})", rcode),
        };

        let qd_count = self.cur.read_u16::<BE>()?;
        let an_count = self.cur.read_u16::<BE>()?;

        // Authority and additional counts are read and ignored; nothing
        // past the answer section matters to this resolver.
        let _ns_count = self.cur.read_u16::<BE>()?;
        let _ar_count = self.cur.read_u16::<BE>()?;

        self.read_questions(qd_count)?;
        self.read_answers(an_count)?;

        Ok(self.m)
    }

    fn read_questions(&mut self, count: u16) -> io::Result<()> {
        self.m.questions.reserve_exact(count.into());

        for _ in 0..count {
            let name = self.cur.read_qname()?;
            let r#type = match self.cur.read_type()? {
                Some(t) => t,
                None => bail!(InvalidData, "question for unsupported record type"),
            };
            let class = match self.cur.read_class()? {
                Some(c) => c,
                None => bail!(InvalidData, "question with unsupported class"),
            };

            self.m.questions.push(Question {
                name,
                r#type,
                class,
            });
        }

        Ok(())
    }

    fn read_answers(&mut self, count: u16) -> io::Result<()> {
        self.m.answers.reserve_exact(count.into());

        for _ in 0..count {
            let name = self.cur.read_qname()?;
            let r#type = self.cur.read_type()?;
            let class = self.cur.read_class()?;
            let ttl = self.cur.read_u32::<BE>()?;
            let rd_len = self.cur.read_u16::<BE>()?;

            let rd_start = self.cur.stream_position()?;
            let rd_end = rd_start + u64::from(rd_len);
            if rd_end > self.cur.get_ref().len() as u64 {
                bail!(InvalidData, "RDLENGTH {} overruns the message", rd_len);
            }

            match (r#type, class) {
                (Some(t), Some(Class::Internet)) => {
                    if let Some(resource) = Resource::parse(t, &mut self.cur, rd_len)? {
                        if self.cur.stream_position()? > rd_end {
                            bail!(InvalidData, "{} RDATA overran its RDLENGTH {}", t, rd_len);
                        }

                        self.m.answers.push(Record {
                            name,
                            r#type: t,
                            class: Class::Internet,
                            ttl: Duration::from_secs(ttl.into()),
                            resource,
                        });
                    }
                }

                // Unrelated record types and classes are skipped, not
                // errors. Some platforms' resolvers tack extra A records
                // onto everything.
                _ => trace!("skipping record '{}' of unsupported type or class", name),
            }

            // Advance by RDLENGTH whether or not the RDATA was decoded, so
            // one skipped record cannot desync the rest of the message.
            self.cur.seek(SeekFrom::Start(rd_end))?;
        }

        Ok(())
    }
}

impl Message {
    /// Parses a DNS message from a received datagram.
    ///
    /// Any malformation -- a short header, an out-of-bounds name or RDATA
    /// read, an illegal compression pointer -- fails the whole message;
    /// no partial result is returned.
    pub fn from_slice(buf: &[u8]) -> io::Result<Message> {
        MessageParser::new(buf).parse()
    }
}
