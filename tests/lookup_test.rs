use std::io;
use std::net::Ipv4Addr;

use dns_stub::packet_parser::{DnsHeader, PacketBuffer, CLASS_IN};
use dns_stub::{lookup, parse_response, DnsError, QueryType, ResultCode, Transport};

/// Replies to the query it receives with a response built by `reply`
struct ScriptedTransport<F> {
    sent: Vec<Vec<u8>>,
    reply: F,
}

impl<F: Fn(&[u8]) -> io::Result<Vec<u8>>> Transport for ScriptedTransport<F> {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> io::Result<Vec<u8>> {
        let query = self.sent.last().cloned().unwrap_or_default();
        (self.reply)(&query)
    }
}

fn scripted<F: Fn(&[u8]) -> io::Result<Vec<u8>>>(reply: F) -> ScriptedTransport<F> {
    ScriptedTransport {
        sent: Vec::new(),
        reply,
    }
}

/// Turn a query into a response carrying A records for the question name, each
/// owner name compressed to a pointer at the question
fn answer_with(query: &[u8], addrs: &[[u8; 4]]) -> Vec<u8> {
    let mut response = query.to_vec();
    response[2] |= 0x80;
    response[3] = 0x80;
    response[6..8].copy_from_slice(&(addrs.len() as u16).to_be_bytes());

    for addr in addrs {
        response.extend([0xc0, 0x0c, 0, 1, 0, 1, 0, 0, 0x01, 0x2c, 0, 4]);
        response.extend(addr);
    }

    response
}

#[test]
fn lookup_returns_answers_in_order() {
    let mut transport =
        scripted(|query: &[u8]| Ok(answer_with(query, &[[93, 184, 216, 34], [10, 0, 0, 1]])));

    let response = lookup(&mut transport, "www.example.com", QueryType::A).unwrap();

    assert_eq!(transport.sent.len(), 1);
    assert!(response.header.response());
    assert_eq!(response.header.rescode(), ResultCode::NOERROR);
    assert_eq!(response.question.name, "www.example.com");
    assert_eq!(response.question.qtype, QueryType::A);
    assert_eq!(response.question.class, CLASS_IN);

    let addrs: Vec<_> = response.answers.iter().filter_map(|r| r.ipv4()).collect();
    assert_eq!(
        addrs,
        vec![Ipv4Addr::new(93, 184, 216, 34), Ipv4Addr::new(10, 0, 0, 1)]
    );
    assert!(response
        .answers
        .iter()
        .all(|r| r.domain == "www.example.com" && r.ttl == 300));
}

#[test]
fn lookup_sends_a_recursive_single_question_query() {
    let mut transport = scripted(|query: &[u8]| Ok(answer_with(query, &[])));

    let response = lookup(&mut transport, "example.org", QueryType::A).unwrap();
    assert!(response.answers.is_empty());

    let query = &transport.sent[0];
    let header = DnsHeader::read(&mut PacketBuffer::new(query)).unwrap();
    assert_eq!(header.flags, DnsHeader::FLAG_RECURSION_DESIRED);
    assert_eq!(header.questions, 1);
    assert_eq!(header.id, response.header.id);
    assert_eq!(&query[12..], b"\x07example\x03org\x00\x00\x01\x00\x01");
}

#[test]
fn lookup_surfaces_transport_failure() {
    let mut transport = scripted(|_: &[u8]| {
        Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
    });

    let err = lookup(&mut transport, "example.com", QueryType::A).unwrap_err();
    assert!(matches!(err, DnsError::Transport(ref e) if e.kind() == io::ErrorKind::ConnectionRefused));
}

/// Fails every send and records whether a reply was ever awaited
#[derive(Default)]
struct UnreachableTransport {
    received: bool,
}

impl Transport for UnreachableTransport {
    fn send(&mut self, _bytes: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "unreachable"))
    }

    fn receive(&mut self) -> io::Result<Vec<u8>> {
        self.received = true;
        Ok(Vec::new())
    }
}

#[test]
fn lookup_surfaces_send_failure_without_receiving() {
    let mut transport = UnreachableTransport::default();

    let err = lookup(&mut transport, "example.com", QueryType::A).unwrap_err();
    assert!(matches!(err, DnsError::Transport(ref e) if e.kind() == io::ErrorKind::AddrNotAvailable));
    assert!(!transport.received);
}

#[test]
fn response_with_unnamed_rcode_is_not_noerror() {
    let mut transport = scripted(|query: &[u8]| {
        let mut response = answer_with(query, &[]);
        response[3] = 0x89;
        Ok(response)
    });

    let response = lookup(&mut transport, "example.com", QueryType::A).unwrap();
    assert_eq!(response.header.rescode(), ResultCode::UNKNOWN(9));
    assert_ne!(response.header.rescode(), ResultCode::NOERROR);
}

#[test]
fn oversized_label_is_never_sent() {
    let mut transport = scripted(|query: &[u8]| Ok(answer_with(query, &[])));
    let name = format!("{}.com", "a".repeat(64));

    let err = lookup(&mut transport, &name, QueryType::A).unwrap_err();
    assert!(matches!(err, DnsError::OversizedLabel { len: 64, .. }));
    assert!(transport.sent.is_empty());
}

#[test]
fn response_cut_short_by_receive_buffer_fails_to_parse() {
    let mut transport = scripted(|query: &[u8]| {
        let mut response = answer_with(query, &[[1, 2, 3, 4]]);
        response.truncate(response.len() - 2);
        Ok(response)
    });

    let err = lookup(&mut transport, "example.com", QueryType::A).unwrap_err();
    assert!(matches!(err, DnsError::Truncated { needed: 4, .. }));
}

#[test]
fn mismatched_id_is_still_returned() {
    let mut transport = scripted(|query: &[u8]| {
        let mut response = answer_with(query, &[[1, 1, 1, 1]]);
        response[0] ^= 0xff;
        Ok(response)
    });

    let response = lookup(&mut transport, "one.one", QueryType::A).unwrap();
    assert_eq!(response.answers.len(), 1);
}

/// A captured-style response: header, question for example.com, then a CNAME-like
/// opaque record and an A record whose owner name is a pointer into the question
fn sample_response() -> Vec<u8> {
    let mut bytes = vec![
        0xab, 0xcd, 0x81, 0x80, 0, 1, 0, 2, 0, 0, 0, 0, //
        7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, //
        0, 1, 0, 1,
    ];
    // www.example.com, type 5, rdata = ptr to 12
    bytes.extend([3, b'w', b'w', b'w', 0xc0, 0x0c, 0, 5, 0, 1, 0, 0, 0, 60, 0, 2, 0xc0, 0x0c]);
    // ptr to the www label above at offset 29
    bytes.extend([0xc0, 29, 0, 1, 0, 1, 0, 0, 0, 60, 0, 4, 192, 0, 2, 1]);
    bytes
}

#[test]
fn parses_compressed_response() {
    let response = parse_response(&sample_response()).unwrap();

    assert_eq!(response.header.id, 0xabcd);
    assert_eq!(response.header.answers, 2);
    assert_eq!(response.question.name, "example.com");

    let first = &response.answers[0];
    assert_eq!(first.domain, "www.example.com");
    assert_eq!(first.qtype, QueryType::UNKNOWN(5));
    assert_eq!(first.data, vec![0xc0, 0x0c]);

    let second = &response.answers[1];
    assert_eq!(second.domain, "www.example.com");
    assert_eq!(second.ipv4(), Some(Ipv4Addr::new(192, 0, 2, 1)));
}

#[test]
fn answer_count_beyond_data_fails_whole_parse() {
    let mut bytes = sample_response();
    bytes[7] = 3;

    assert!(matches!(
        parse_response(&bytes),
        Err(DnsError::Truncated { .. })
    ));
}

#[test]
fn cyclic_answer_name_fails_whole_parse() {
    let mut bytes = sample_response();
    // Point the A record's owner name at itself
    let a_record = bytes.len() - 16;
    bytes[a_record + 1] = a_record as u8;

    assert!(matches!(
        parse_response(&bytes),
        Err(DnsError::InvalidPointer { .. })
    ));
}

#[test]
fn short_message_is_truncation() {
    assert!(matches!(
        parse_response(&[0; 5]),
        Err(DnsError::Truncated { pos: 0, needed: 12, len: 5 })
    ));
}

#[test]
fn extra_sections_are_left_unread() {
    let mut bytes = sample_response();
    bytes[11] = 1;
    bytes.extend([0xff; 3]);

    let response = parse_response(&bytes).unwrap();
    assert_eq!(response.header.additional, 1);
    assert_eq!(response.answers.len(), 2);
}
