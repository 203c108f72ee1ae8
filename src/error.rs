use thiserror::Error;

pub type Result<T> = std::result::Result<T, DnsError>;

#[derive(Error, Debug)]
pub enum DnsError {
    /// Not enough bytes left at `pos` for the field being read
    #[error("Message truncated: needed {needed} bytes at offset {pos}, buffer holds {len}")]
    Truncated { pos: usize, needed: usize, len: usize },

    #[error("Label '{label}' is {len} bytes, exceeding the 63 byte limit")]
    OversizedLabel { label: String, len: usize },

    #[error("Domain name '{name}' encodes to {len} bytes, exceeding the 255 byte limit")]
    NameTooLong { name: String, len: usize },

    #[error("Empty label in domain name '{name}'")]
    EmptyLabel { name: String },

    /// A compression pointer that does not point strictly backwards
    #[error("Compression pointer to offset {offset} is not before name start {name_start}")]
    InvalidPointer { offset: usize, name_start: usize },

    #[error("Reserved label type {byte:#04x} at offset {pos}")]
    ReservedLabelType { pos: usize, byte: u8 },

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}
