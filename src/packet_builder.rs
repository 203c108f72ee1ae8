use tracing::debug;

use crate::error::{DnsError, Result};
use crate::packet_parser::{DnsHeader, DnsQuestion, QueryType, HEADER_LEN};

/// Longest label the length byte can describe without colliding with the pointer marker
pub const MAX_LABEL_LEN: usize = 0x3f;

/// Longest encoded name, terminator included
pub const MAX_NAME_LEN: usize = 255;

/// Growable output buffer for outgoing messages
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    pub fn write_u16(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    pub fn write_u32(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    /// Write a name as uncompressed length-prefixed labels.
    ///
    /// A single trailing dot is accepted, and both `""` and `"."` write the root name. The
    /// buffer is left untouched when the name is rejected.
    pub fn write_qname(&mut self, qname: &str) -> Result<()> {
        let trimmed = qname.strip_suffix('.').unwrap_or(qname);
        let mut encoded = Vec::with_capacity(trimmed.len() + 2);

        if !trimmed.is_empty() {
            for label in trimmed.split('.') {
                let len = label.len();
                if len == 0 {
                    return Err(DnsError::EmptyLabel {
                        name: qname.to_string(),
                    });
                }
                if len > MAX_LABEL_LEN {
                    return Err(DnsError::OversizedLabel {
                        label: label.to_string(),
                        len,
                    });
                }

                encoded.push(len as u8);
                encoded.extend_from_slice(label.as_bytes());
            }
        }

        encoded.push(0);
        if encoded.len() > MAX_NAME_LEN {
            return Err(DnsError::NameTooLong {
                name: qname.to_string(),
                len: encoded.len(),
            });
        }
        self.buf.extend_from_slice(&encoded);

        Ok(())
    }
}

/// Wire form of a domain name
pub fn encode_name(qname: &str) -> Result<Vec<u8>> {
    let mut writer = PacketWriter::new();
    writer.write_qname(qname)?;

    Ok(writer.into_bytes())
}

impl DnsHeader {
    pub fn write(&self, buffer: &mut PacketWriter) {
        buffer.write_u16(self.id);
        buffer.write_u16(self.flags);
        buffer.write_u16(self.questions);
        buffer.write_u16(self.answers);
        buffer.write_u16(self.authorities);
        buffer.write_u16(self.additional);
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut writer = PacketWriter::new();
        self.write(&mut writer);

        let mut out = [0; HEADER_LEN];
        out.copy_from_slice(writer.as_bytes());
        out
    }
}

impl DnsQuestion {
    pub fn write(&self, buffer: &mut PacketWriter) -> Result<()> {
        buffer.write_qname(&self.name)?;
        buffer.write_u16(self.qtype.into());
        buffer.write_u16(self.class);

        Ok(())
    }
}

/// Build a recursive query for `qname` with a random id
pub fn build_query(qname: &str, qtype: QueryType) -> Result<Vec<u8>> {
    build_query_with_id(fastrand::u16(..), qname, qtype)
}

/// Build a recursive query for `qname` carrying the given id
pub fn build_query_with_id(id: u16, qname: &str, qtype: QueryType) -> Result<Vec<u8>> {
    let header = DnsHeader::query(id);
    let question = DnsQuestion::new(qname.to_string(), qtype);

    let mut writer = PacketWriter::new();
    header.write(&mut writer);
    question.write(&mut writer)?;

    debug!(id, qname, %qtype, len = writer.as_bytes().len(), "built query");

    Ok(writer.into_bytes())
}
