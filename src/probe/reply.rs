use pnet::packet::ipv4::Ipv4Packet;
use std::net::IpAddr;

use crate::probe::icmp::ICMP_HEADER_SIZE;

const ICMP_ECHO_REPLY_V4: u8 = 0;
const ICMP_ECHO_REPLY_V6: u8 = 129;

/// A parsed echo reply that matched our identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoReply {
    pub seq: u16,
    /// ICMP portion length (header + payload), as reported by ping tools
    pub nbytes: usize,
    pub responder: IpAddr,
    /// TTL from the IP header, available only on raw IPv4 sockets where
    /// the header is delivered with the packet
    pub ttl: Option<u8>,
}

/// Parse a received datagram into an echo reply.
///
/// RAW IPv4 sockets deliver the full IP packet; DGRAM sockets and all
/// IPv6 sockets deliver the bare ICMP message. Returns None for packets
/// that are not echo replies or belong to another process.
pub fn parse_echo_reply(
    data: &[u8],
    responder: IpAddr,
    our_identifier: u16,
    is_dgram: bool,
) -> Option<EchoReply> {
    let ipv6 = responder.is_ipv6();

    let (icmp_data, ttl) = if is_dgram || ipv6 {
        (data, None)
    } else {
        let ip_packet = Ipv4Packet::new(data)?;
        let header_len = (ip_packet.get_header_length() as usize) * 4;
        if data.len() <= header_len {
            return None;
        }
        (&data[header_len..], Some(ip_packet.get_ttl()))
    };

    if icmp_data.len() < ICMP_HEADER_SIZE {
        return None;
    }

    let expected_type = if ipv6 {
        ICMP_ECHO_REPLY_V6
    } else {
        ICMP_ECHO_REPLY_V4
    };
    if icmp_data[0] != expected_type || icmp_data[1] != 0 {
        return None;
    }

    // ICMPv6 checksums cover a pseudo-header we don't have here; the
    // kernel has already verified them
    if !ipv6 && !validate_icmp_checksum(icmp_data) {
        return None;
    }

    let identifier = u16::from_be_bytes([icmp_data[4], icmp_data[5]]);
    let seq = u16::from_be_bytes([icmp_data[6], icmp_data[7]]);

    if identifier == our_identifier {
        return Some(EchoReply {
            seq,
            nbytes: icmp_data.len(),
            responder,
            ttl,
        });
    }

    // DGRAM sockets rewrite the header identifier; fall back to the copy
    // we embedded in the payload
    if is_dgram {
        let payload = &icmp_data[ICMP_HEADER_SIZE..];
        if let Some(payload_id) = extract_id_from_payload(payload) {
            if payload_id == our_identifier {
                let payload_seq = u16::from_be_bytes([payload[2], payload[3]]);
                return Some(EchoReply {
                    seq: payload_seq,
                    nbytes: icmp_data.len(),
                    responder,
                    ttl,
                });
            }
        }
    }

    None
}

fn extract_id_from_payload(payload: &[u8]) -> Option<u16> {
    if payload.len() < 4 {
        return None;
    }
    Some(u16::from_be_bytes([payload[0], payload[1]]))
}

/// RFC 1071 internet checksum over the ICMP message; valid data sums to
/// zero
fn validate_icmp_checksum(data: &[u8]) -> bool {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(u16::from_be_bytes([*last, 0]));
    }
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum == 0xFFFF
}
