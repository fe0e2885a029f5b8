use byteorder::{BigEndian, ByteOrder};

use crate::icmp::{AddressFamily, EchoReply, PacketError};

pub const ICMP_HEADER_LEN: usize = 8;
pub const IPV4_MIN_HEADER_LEN: usize = 20;

/// Filler carried by every echo request, same pattern as the Windows ping payload.
pub const ECHO_PAYLOAD: [u8; 32] = *b"abcdefghijklmnopqrstuvwabcdefghi";

const CHECKSUM_OFFSET: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: &'static [u8],
}

impl EchoRequest {
    pub fn new(identifier: u16, sequence: u16, family: AddressFamily) -> Self {
        let mut request = Self {
            icmp_type: family.echo_request_type(),
            code: 0,
            checksum: 0,
            identifier,
            sequence,
            payload: &ECHO_PAYLOAD,
        };
        request.checksum = checksum(&request.to_bytes());
        request
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_echo(
            self.icmp_type,
            self.code,
            self.checksum,
            self.identifier,
            self.sequence,
            self.payload,
        )
    }
}

/// Serialized echo request for `sequence`, checksum filled in.
pub fn build_echo_request(sequence: u16, identifier: u16, family: AddressFamily) -> Vec<u8> {
    EchoRequest::new(identifier, sequence, family).to_bytes()
}

pub(crate) fn encode_echo(
    icmp_type: u8,
    code: u8,
    checksum: u16,
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut bytes = vec![0u8; ICMP_HEADER_LEN + payload.len()];
    bytes[0] = icmp_type;
    bytes[1] = code;
    BigEndian::write_u16(&mut bytes[2..4], checksum);
    BigEndian::write_u16(&mut bytes[4..6], identifier);
    BigEndian::write_u16(&mut bytes[6..8], sequence);
    bytes[ICMP_HEADER_LEN..].copy_from_slice(payload);
    bytes
}

/// Internet checksum (RFC 1071) over `data`.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    for chunk in data.chunks(2) {
        // Odd trailing byte is padded with a zero
        let lo = chunk.get(1).copied().unwrap_or(0);
        sum += u16::from_be_bytes([chunk[0], lo]) as u32;
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// Offset of the ICMP header inside a datagram received on a raw socket.
///
/// IPv4 raw sockets deliver the IP header in front of the ICMP message; its length
/// is taken from the IHL field. IPv6 raw sockets strip the IP header.
fn icmp_offset(datagram: &[u8], family: AddressFamily) -> Result<usize, PacketError> {
    match family {
        AddressFamily::V6 => Ok(0),
        AddressFamily::V4 => {
            let needed = IPV4_MIN_HEADER_LEN + ICMP_HEADER_LEN;
            let first = *datagram.first().ok_or(PacketError::Malformed { len: 0, needed })?;
            let ihl = ((first & 0x0F) as usize) * 4;
            if ihl < IPV4_MIN_HEADER_LEN {
                return Err(PacketError::Malformed {
                    len: datagram.len(),
                    needed,
                });
            }
            Ok(ihl)
        }
    }
}

/// Parse the ICMP header out of a received datagram.
///
/// IPv4 messages also have their checksum verified; ICMPv6 checksums cover a
/// pseudo-header the socket does not hand us, so they are taken as is.
pub fn parse_echo_reply(datagram: &[u8], family: AddressFamily) -> Result<EchoReply, PacketError> {
    let offset = icmp_offset(datagram, family)?;
    let needed = offset + ICMP_HEADER_LEN;
    if datagram.len() < needed {
        return Err(PacketError::Malformed {
            len: datagram.len(),
            needed,
        });
    }

    let icmp = &datagram[offset..];
    let reply = EchoReply {
        icmp_type: icmp[0],
        code: icmp[1],
        checksum: BigEndian::read_u16(&icmp[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2]),
        identifier: BigEndian::read_u16(&icmp[4..6]),
        sequence: BigEndian::read_u16(&icmp[6..8]),
    };

    if family == AddressFamily::V4 && checksum(icmp) != 0 {
        let mut zeroed = icmp.to_vec();
        zeroed[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].fill(0);
        return Err(PacketError::ChecksumMismatch {
            carried: reply.checksum,
            computed: checksum(&zeroed),
        });
    }

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_header() -> Vec<u8> {
        let mut header = vec![0u8; IPV4_MIN_HEADER_LEN];
        header[0] = 0x45;
        header[8] = 64;
        header[9] = 1;
        header
    }

    /// Sum of all 16-bit words with carries folded, without the final complement.
    fn folded_sum(data: &[u8]) -> u16 {
        !checksum(data)
    }

    #[test]
    fn test_echo_request_layout() {
        let bytes = build_echo_request(1, 0x1234, AddressFamily::V4);
        assert_eq!(bytes.len(), ICMP_HEADER_LEN + ECHO_PAYLOAD.len());
        assert_eq!(bytes[0], 8);
        assert_eq!(bytes[1], 0);
        assert_eq!(&bytes[4..6], &[0x12, 0x34]);
        assert_eq!(&bytes[6..8], &[0x00, 0x01]);
        assert_eq!(&bytes[8..], &ECHO_PAYLOAD);

        let bytes = build_echo_request(1, 0x1234, AddressFamily::V6);
        assert_eq!(bytes[0], 128);
    }

    #[test]
    fn test_known_checksum_vector() {
        // RFC 1071 section 3 example
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data), !0xddf2u16);
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_checksum_self_consistency() {
        for len in [4usize, 5, 8, 9, 40, 41, 255] {
            let mut data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(37).wrapping_add(11)).collect();
            data[2] = 0;
            data[3] = 0;
            let sum = checksum(&data);
            data[2..4].copy_from_slice(&sum.to_be_bytes());
            assert_eq!(folded_sum(&data), 0xFFFF, "length {}", len);
        }
    }

    #[test]
    fn test_built_request_checksum_verifies() {
        for family in [AddressFamily::V4, AddressFamily::V6] {
            let bytes = build_echo_request(42, 4242, family);
            assert_eq!(checksum(&bytes), 0);
            assert_eq!(folded_sum(&bytes), 0xFFFF);
        }
    }

    #[test]
    fn test_build_parse_round_trip() {
        let samples = [0u16, 1, 255, 256, 0x7FFF, 0x8000, 0xFFFE, 0xFFFF];
        for &seq in &samples {
            for &id in &samples {
                let v4 = [ipv4_header(), build_echo_request(seq, id, AddressFamily::V4)].concat();
                let parsed = parse_echo_reply(&v4, AddressFamily::V4).unwrap();
                assert_eq!((parsed.sequence, parsed.identifier), (seq, id));
                assert_eq!(parsed.icmp_type, crate::icmp::ICMP_ECHO_REQUEST);

                let v6 = build_echo_request(seq, id, AddressFamily::V6);
                let parsed = parse_echo_reply(&v6, AddressFamily::V6).unwrap();
                assert_eq!((parsed.sequence, parsed.identifier), (seq, id));
            }
        }
    }

    #[test]
    fn test_ipv4_header_with_options() {
        let mut header = ipv4_header();
        header[0] = 0x46;
        header.extend_from_slice(&[1, 1, 1, 0]);
        let datagram = [header, build_echo_request(9, 10, AddressFamily::V4)].concat();
        let parsed = parse_echo_reply(&datagram, AddressFamily::V4).unwrap();
        assert_eq!(parsed.sequence, 9);
        assert_eq!(parsed.identifier, 10);
    }

    #[test]
    fn test_short_datagrams_are_malformed() {
        assert_eq!(
            parse_echo_reply(&[], AddressFamily::V4),
            Err(PacketError::Malformed { len: 0, needed: 28 })
        );
        let truncated = [ipv4_header(), vec![0, 0, 0]].concat();
        assert_eq!(
            parse_echo_reply(&truncated, AddressFamily::V4),
            Err(PacketError::Malformed { len: 23, needed: 28 })
        );
        assert_eq!(
            parse_echo_reply(&[129, 0, 0, 0, 0], AddressFamily::V6),
            Err(PacketError::Malformed { len: 5, needed: 8 })
        );
        // IHL below the minimum header size
        let mut bogus = [ipv4_header(), build_echo_request(1, 1, AddressFamily::V4)].concat();
        bogus[0] = 0x44;
        assert!(matches!(
            parse_echo_reply(&bogus, AddressFamily::V4),
            Err(PacketError::Malformed { .. })
        ));
    }

    #[test]
    fn test_corrupted_ipv4_reply_is_rejected() {
        let mut datagram = [ipv4_header(), build_echo_request(5, 6, AddressFamily::V4)].concat();
        let carried = u16::from_be_bytes([datagram[22], datagram[23]]);
        datagram[30] ^= 0xFF;
        match parse_echo_reply(&datagram, AddressFamily::V4) {
            Err(PacketError::ChecksumMismatch { carried: c, computed }) => {
                assert_eq!(c, carried);
                assert_ne!(computed, carried);
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_icmpv6_checksum_not_verified() {
        let mut datagram = build_echo_request(5, 6, AddressFamily::V6);
        datagram[2] = 0;
        datagram[3] = 0;
        assert!(parse_echo_reply(&datagram, AddressFamily::V6).is_ok());
    }
}
