use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{checksum, IcmpCode, IcmpType, IcmpTypes};
use pnet::packet::MutablePacket;

/// ICMP header size (fixed)
pub const ICMP_HEADER_SIZE: usize = 8;
/// Default payload size (standard ping)
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;
/// Minimum payload size (4 bytes id/seq + 4 bytes timestamp)
pub const MIN_PAYLOAD_SIZE: usize = 8;

/// Get process identifier for the ICMP identification field
pub fn get_identifier() -> u16 {
    std::process::id() as u16
}

/// Build an ICMP Echo Request with the given identifier and sequence.
///
/// Set ipv6=true to build an ICMPv6 Echo Request.
///
/// Payload layout:
/// - Bytes 0-1: identifier (backup for kernel rewrite on DGRAM sockets)
/// - Bytes 2-3: sequence (backup for kernel rewrite)
/// - Bytes 4-7: timestamp (lower 32 bits)
/// - Bytes 8+: pattern fill
pub fn build_echo_request(
    identifier: u16,
    sequence: u16,
    payload_size: usize,
    ipv6: bool,
) -> Vec<u8> {
    let payload_size = payload_size.max(MIN_PAYLOAD_SIZE);
    let packet_size = ICMP_HEADER_SIZE + payload_size;
    let mut buffer = vec![0u8; packet_size];

    // Buffer is sized above the minimum echo request, so construction
    // cannot fail.
    let mut packet = MutableEchoRequestPacket::new(&mut buffer).unwrap();

    if ipv6 {
        packet.set_icmp_type(IcmpType::new(128));
    } else {
        packet.set_icmp_type(IcmpTypes::EchoRequest);
    }
    packet.set_icmp_code(IcmpCode::new(0));
    packet.set_identifier(identifier);
    packet.set_sequence_number(sequence);

    let payload = packet.payload_mut();

    // Embed identifier and sequence at bytes 0-3 so replies stay matchable
    // when a DGRAM socket's kernel rewrites the header identifier
    payload[0..2].copy_from_slice(&identifier.to_be_bytes());
    payload[2..4].copy_from_slice(&sequence.to_be_bytes());

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u32;
    payload[4..8].copy_from_slice(&timestamp.to_be_bytes());

    for (i, byte) in payload[8..].iter_mut().enumerate() {
        *byte = (i & 0xFF) as u8;
    }

    // ICMPv6 checksums need the pseudo-header; the kernel fills them in
    if !ipv6 {
        let cksum = checksum(&pnet::packet::icmp::IcmpPacket::new(&buffer).unwrap());
        let mut packet = MutableEchoRequestPacket::new(&mut buffer).unwrap();
        packet.set_checksum(cksum);
    }

    buffer
}
