use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tracing::{debug, warn};

use crate::error::Result;
use crate::packet_builder::build_query_with_id;
use crate::packet_parser::{parse_response, DnsResponse, QueryType};

/// Largest message RFC 1035 allows over UDP without extensions
pub const MAX_UDP_MESSAGE: usize = 512;

pub const DNS_PORT: u16 = 53;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Recursive resolver to query
    pub server: SocketAddr,
    /// Datagrams longer than this are cut short and fail to parse
    pub recv_buffer_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            server: SocketAddr::from((Ipv4Addr::new(8, 8, 8, 8), DNS_PORT)),
            recv_buffer_size: MAX_UDP_MESSAGE,
        }
    }
}

/// One request, one reply. Implementations block until the reply arrives.
pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn receive(&mut self) -> io::Result<Vec<u8>>;
}

/// Datagram transport connected to a single resolver
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    recv_buffer_size: usize,
}

impl UdpTransport {
    pub fn connect(config: &ResolverConfig) -> io::Result<Self> {
        let local = if config.server.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };

        let socket = UdpSocket::bind(local)?;
        socket.connect(config.server)?;

        Ok(Self {
            socket,
            recv_buffer_size: config.recv_buffer_size,
        })
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let sent = self.socket.send(bytes)?;
        debug!(server = ?self.socket.peer_addr().ok(), sent, "query sent");

        Ok(())
    }

    fn receive(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0; self.recv_buffer_size];
        let len = self.socket.recv(&mut buf)?;
        buf.truncate(len);
        debug!(len, "response received");

        Ok(buf)
    }
}

/// Send one query over `transport` and parse the reply
pub fn lookup<T: Transport>(
    transport: &mut T,
    qname: &str,
    qtype: QueryType,
) -> Result<DnsResponse> {
    let id = fastrand::u16(..);
    let query = build_query_with_id(id, qname, qtype)?;

    transport.send(&query)?;
    let reply = transport.receive()?;
    let response = parse_response(&reply)?;

    if response.header.id != id {
        warn!(sent = id, received = response.header.id, "response id does not match query");
    }

    Ok(response)
}

/// Resolve `qname` against the resolver named in `config` over UDP
pub fn resolve(config: &ResolverConfig, qname: &str, qtype: QueryType) -> Result<DnsResponse> {
    let mut transport = UdpTransport::connect(config)?;
    lookup(&mut transport, qname, qtype)
}
