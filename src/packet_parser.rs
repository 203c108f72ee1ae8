use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::{DnsError, Result};

/// Size of the fixed header section
pub const HEADER_LEN: usize = 12;

/// The Internet class, the only class this crate queries
pub const CLASS_IN: u16 = 1;

/// Read cursor over a complete, immutable DNS message.
///
/// Cursors are cheap to copy; following a compression pointer reads through a copy so the
/// position of the name's owner is never disturbed.
#[derive(Debug, Clone, Copy)]
pub struct PacketBuffer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketBuffer<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current position within buffer
    pub const fn pos(&self) -> usize {
        self.pos
    }

    pub const fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Fail unless `len` more bytes can be read from the current position
    fn ensure(&self, len: usize) -> Result<()> {
        if self.remaining() < len {
            return Err(DnsError::Truncated {
                pos: self.pos,
                needed: len,
                len: self.buf.len(),
            });
        }

        Ok(())
    }

    /// Step the buffer position forward a specific number of steps
    pub fn step(&mut self, steps: usize) -> Result<()> {
        self.ensure(steps)?;
        self.pos += steps;

        Ok(())
    }

    /// Read a single byte and move the position one step forward
    pub fn read(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let res = self.buf[self.pos];
        self.pos += 1;

        Ok(res)
    }

    /// Read a range of bytes, stepping past them
    pub fn read_range(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let res = &self.buf[self.pos..self.pos + len];
        self.pos += len;

        Ok(res)
    }

    /// Read two bytes, stepping two steps forward
    pub fn read_u16(&mut self) -> Result<u16> {
        let raw = self.read_range(2)?;

        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    /// Read four bytes, stepping four steps forward
    pub fn read_u32(&mut self) -> Result<u32> {
        let raw = self.read_range(4)?;

        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Read a qname
    ///
    /// Takes something like [3]www[6]google[3]com[0] and returns `www.google.com`. A
    /// compression pointer ends the name in place: the reading continues at the pointer's
    /// target through a separate cursor while this buffer only moves past the pointer's two
    /// bytes.
    ///
    /// Every pointer must target an offset strictly before the start of the name it was
    /// found in, so each jump moves backwards and a cycle can never form. On error the
    /// position is left where it was.
    pub fn read_qname(&mut self) -> Result<String> {
        let mut labels: Vec<String> = Vec::new();
        let mut cursor = *self;
        let mut name_start = cursor.pos;
        // Where the caller's read resumes once a pointer has ended the name
        let mut resume = None;

        loop {
            let len_pos = cursor.pos;
            let len = cursor.read()?;

            match len & 0xC0 {
                0xC0 => {
                    let b2 = cursor.read()?;
                    let offset = (usize::from(len & 0x3F) << 8) | usize::from(b2);

                    if offset >= name_start {
                        return Err(DnsError::InvalidPointer { offset, name_start });
                    }

                    // Only the first pointer is part of the caller's read.
                    resume.get_or_insert(cursor.pos);

                    trace!(from = len_pos, to = offset, "following compression pointer");
                    name_start = offset;
                    cursor.pos = offset;
                }
                0x00 => {
                    // The empty label terminates the name.
                    if len == 0 {
                        break;
                    }

                    let label = cursor.read_range(usize::from(len))?;
                    labels.push(String::from_utf8_lossy(label).into_owned());
                }
                _ => {
                    return Err(DnsError::ReservedLabelType {
                        pos: len_pos,
                        byte: len,
                    })
                }
            }
        }

        self.pos = resume.unwrap_or(cursor.pos);

        Ok(labels.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum ResultCode {
    NOERROR,
    FORMERR,
    SERVFAIL,
    NXDOMAIN,
    NOTIMP,
    REFUSED,
    /// Any other 4-bit code, e.g. NOTAUTH (9) or a reserved value
    UNKNOWN(u8),
}

impl From<u8> for ResultCode {
    fn from(n: u8) -> Self {
        match n {
            0 => Self::NOERROR,
            1 => Self::FORMERR,
            2 => Self::SERVFAIL,
            3 => Self::NXDOMAIN,
            4 => Self::NOTIMP,
            5 => Self::REFUSED,
            _ => Self::UNKNOWN(n),
        }
    }
}

/// Message header with the flags kept in their raw 16-bit wire form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: u16,
    pub questions: u16,
    pub answers: u16,
    pub authorities: u16,
    pub additional: u16,
}

impl DnsHeader {
    pub const FLAG_RESPONSE: u16 = 1 << 15;
    pub const FLAG_AUTHORITATIVE: u16 = 1 << 10;
    pub const FLAG_TRUNCATED: u16 = 1 << 9;
    pub const FLAG_RECURSION_DESIRED: u16 = 1 << 8;
    pub const FLAG_RECURSION_AVAILABLE: u16 = 1 << 7;

    /// Header of a single-question recursive query
    pub const fn query(id: u16) -> Self {
        Self {
            id,
            flags: Self::FLAG_RECURSION_DESIRED,
            questions: 1,
            answers: 0,
            authorities: 0,
            additional: 0,
        }
    }

    pub fn read(buffer: &mut PacketBuffer<'_>) -> Result<Self> {
        buffer.ensure(HEADER_LEN)?;

        Ok(Self {
            id: buffer.read_u16()?,
            flags: buffer.read_u16()?,
            questions: buffer.read_u16()?,
            answers: buffer.read_u16()?,
            authorities: buffer.read_u16()?,
            additional: buffer.read_u16()?,
        })
    }

    pub const fn response(&self) -> bool {
        self.flags & Self::FLAG_RESPONSE != 0
    }

    pub const fn opcode(&self) -> u8 {
        ((self.flags >> 11) & 0x0F) as u8
    }

    pub const fn authoritative_answer(&self) -> bool {
        self.flags & Self::FLAG_AUTHORITATIVE != 0
    }

    pub const fn truncated_message(&self) -> bool {
        self.flags & Self::FLAG_TRUNCATED != 0
    }

    pub const fn recursion_desired(&self) -> bool {
        self.flags & Self::FLAG_RECURSION_DESIRED != 0
    }

    pub const fn recursion_available(&self) -> bool {
        self.flags & Self::FLAG_RECURSION_AVAILABLE != 0
    }

    pub fn rescode(&self) -> ResultCode {
        ResultCode::from((self.flags & 0x0F) as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum QueryType {
    UNKNOWN(u16),
    A, // 1
}

impl From<u16> for QueryType {
    fn from(n: u16) -> Self {
        match n {
            1 => Self::A,
            _ => Self::UNKNOWN(n),
        }
    }
}

impl From<QueryType> for u16 {
    fn from(t: QueryType) -> Self {
        match t {
            QueryType::A => 1,
            QueryType::UNKNOWN(n) => n,
        }
    }
}

impl FromStr for QueryType {
    type Err = String;

    /// Accepts `A`, or a numeric type as `28` or `TYPE28`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        if upper == "A" {
            return Ok(Self::A);
        }

        upper
            .strip_prefix("TYPE")
            .unwrap_or(&upper)
            .parse::<u16>()
            .map(Self::from)
            .map_err(|_| format!("Unknown query type: {s}"))
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::UNKNOWN(n) => write!(f, "TYPE{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String,
    pub qtype: QueryType,
    pub class: u16,
}

impl DnsQuestion {
    pub const fn new(name: String, qtype: QueryType) -> Self {
        Self {
            name,
            qtype,
            class: CLASS_IN,
        }
    }

    pub fn read(buffer: &mut PacketBuffer<'_>) -> Result<Self> {
        let name = buffer.read_qname()?;
        let qtype = QueryType::from(buffer.read_u16()?);
        let class = buffer.read_u16()?;

        Ok(Self { name, qtype, class })
    }
}

/// One resource record. The data is kept as raw bytes; [`DnsRecord::ipv4`] interprets it
/// for address records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub domain: String,
    pub qtype: QueryType,
    pub class: u16,
    pub ttl: u32,
    pub data: Vec<u8>,
}

impl DnsRecord {
    pub fn read(buffer: &mut PacketBuffer<'_>) -> Result<Self> {
        let domain = buffer.read_qname()?;
        let qtype = QueryType::from(buffer.read_u16()?);
        let class = buffer.read_u16()?;
        let ttl = buffer.read_u32()?;
        let data_len = buffer.read_u16()?;
        let data = buffer.read_range(usize::from(data_len))?.to_vec();

        Ok(Self {
            domain,
            qtype,
            class,
            ttl,
            data,
        })
    }

    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// The address carried by an A record, `None` for anything else
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        match (self.qtype, <[u8; 4]>::try_from(self.data.as_slice())) {
            (QueryType::A, Ok(octets)) => Some(Ipv4Addr::from(octets)),
            _ => None,
        }
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = if self.class == CLASS_IN {
            "IN".to_string()
        } else {
            format!("CLASS{}", self.class)
        };
        write!(f, "{} {} {} {} ", self.domain, self.ttl, class, self.qtype)?;

        match self.ipv4() {
            Some(addr) => write!(f, "{addr}"),
            None => {
                write!(f, "\\# {}", self.data.len())?;
                for b in &self.data {
                    write!(f, " {b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// A decoded response: the header, the echoed question and the answer section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsResponse {
    pub header: DnsHeader,
    pub question: DnsQuestion,
    pub answers: Vec<DnsRecord>,
}

impl DnsResponse {
    /// Answers follow the question's class field directly. Authority and additional sections
    /// are left unread.
    pub fn from_buffer(buffer: &mut PacketBuffer<'_>) -> Result<Self> {
        let header = DnsHeader::read(buffer)?;
        let question = DnsQuestion::read(buffer)?;

        let answers = (0..header.answers)
            .map(|_| DnsRecord::read(buffer))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            id = header.id,
            rescode = ?header.rescode(),
            answers = answers.len(),
            "parsed response"
        );

        Ok(Self {
            header,
            question,
            answers,
        })
    }
}

/// Decode one complete response datagram
pub fn parse_response(bytes: &[u8]) -> Result<DnsResponse> {
    DnsResponse::from_buffer(&mut PacketBuffer::new(bytes))
}
