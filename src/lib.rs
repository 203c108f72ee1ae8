#![warn(clippy::all, clippy::nursery, rust_2018_idioms)]

pub mod error;
pub mod packet_builder;
pub mod packet_parser;
pub mod stub_resolver;

pub use error::{DnsError, Result};
pub use packet_builder::{build_query, build_query_with_id, encode_name};
pub use packet_parser::{
    parse_response, DnsHeader, DnsQuestion, DnsRecord, DnsResponse, QueryType, ResultCode,
};
pub use stub_resolver::{lookup, resolve, ResolverConfig, Transport, UdpTransport};
