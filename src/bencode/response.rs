use crate::models::announce::{AnnouncePeer, AnnounceResponse};
use std::net::IpAddr;

use super::encoder::{encode_dict, BencodeEncode};

/// Build a bencode-encoded announce response
///
/// # Arguments
/// * `response` - Counts, interval, tracker id and the selected peers
/// * `compact` - Pack peers into `peers`/`peers6` byte strings instead of a list of dictionaries
/// * `no_peer_id` - Leave `peer id` out of each peer dictionary (ignored when compact)
///
/// Keys are written in bencode's sorted order.
pub fn build_announce_response(response: &AnnounceResponse, compact: bool, no_peer_id: bool) -> Vec<u8> {
    let peers = &response.peers;
    let capacity = if compact {
        100 + (peers.len() * 6)
    } else {
        100 + (peers.len() * 50)
    };
    let mut buf = Vec::with_capacity(capacity);

    buf.extend_from_slice(b"d");

    "complete".bencode(&mut buf);
    response.complete.bencode(&mut buf);

    "incomplete".bencode(&mut buf);
    response.incomplete.bencode(&mut buf);

    "interval".bencode(&mut buf);
    response.interval.bencode(&mut buf);

    if compact {
        "peers".bencode(&mut buf);
        encode_compact_peers(peers, &mut buf);

        "peers6".bencode(&mut buf);
        encode_compact_peers_ipv6(peers, &mut buf);
    } else {
        "peers".bencode(&mut buf);
        encode_dict_peers(peers, no_peer_id, &mut buf);
    }

    "tracker id".bencode(&mut buf);
    response.tracker_id.as_str().bencode(&mut buf);

    buf.extend_from_slice(b"e");

    buf
}

/// Build the `failure reason` dictionary returned for rejected announces
pub fn build_failure_response(reason: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + reason.len());
    encode_dict(&[("failure reason", reason)], &mut buf);
    buf
}

/// Encode IPv4 peers in compact format (6 bytes per peer: 4 for IP, 2 for port)
fn encode_compact_peers(peers: &[AnnouncePeer], buf: &mut Vec<u8>) {
    let ipv4_count = peers.iter().filter(|p| p.ip.is_ipv4()).count();
    let peer_bytes = ipv4_count * 6;

    let mut itoa_buf = itoa::Buffer::new();
    buf.extend_from_slice(itoa_buf.format(peer_bytes).as_bytes());
    buf.extend_from_slice(b":");

    buf.reserve(peer_bytes);

    for peer in peers {
        if let IpAddr::V4(ip) = peer.ip {
            buf.extend_from_slice(&ip.octets());
            buf.extend_from_slice(&peer.port.to_be_bytes());
        }
    }
}

/// Encode IPv6 peers in compact format (18 bytes per peer)
fn encode_compact_peers_ipv6(peers: &[AnnouncePeer], buf: &mut Vec<u8>) {
    let ipv6_count = peers.iter().filter(|p| p.ip.is_ipv6()).count();
    let peer_bytes = ipv6_count * 18;

    let mut itoa_buf = itoa::Buffer::new();
    buf.extend_from_slice(itoa_buf.format(peer_bytes).as_bytes());
    buf.extend_from_slice(b":");

    buf.reserve(peer_bytes);

    for peer in peers {
        if let IpAddr::V6(ip) = peer.ip {
            buf.extend_from_slice(&ip.octets());
            buf.extend_from_slice(&peer.port.to_be_bytes());
        }
    }
}

fn encode_dict_peers(peers: &[AnnouncePeer], no_peer_id: bool, buf: &mut Vec<u8>) {
    buf.extend_from_slice(b"l");

    for peer in peers {
        buf.extend_from_slice(b"d");

        "ip".bencode(buf);
        peer.ip.to_string().as_str().bencode(buf);

        if !no_peer_id {
            "peer id".bencode(buf);
            peer.peer_id.as_bytes().bencode(buf);
        }

        "port".bencode(buf);
        peer.port.bencode(buf);

        buf.extend_from_slice(b"e");
    }

    buf.extend_from_slice(b"e");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bip_bencode::{BDecodeOpt, BDictAccess, BListAccess, BRefAccess, BencodeRef};
    use crate::models::peer::PeerId;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn create_test_peer(peer_id: &[u8], ip: IpAddr, port: u16) -> AnnouncePeer {
        AnnouncePeer {
            peer_id: PeerId(peer_id.to_vec()),
            ip,
            port,
        }
    }

    fn create_test_response(peers: Vec<AnnouncePeer>) -> AnnounceResponse {
        AnnounceResponse {
            interval: 1800,
            complete: 5,
            incomplete: 3,
            tracker_id: "abc123".to_string(),
            peers,
        }
    }

    #[test]
    fn test_build_announce_response_dict() {
        let response = create_test_response(vec![create_test_peer(
            b"TESTPEERID",
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            8001,
        )]);

        let bytes = build_announce_response(&response, false, false);
        let decoded = BencodeRef::decode(&bytes, BDecodeOpt::default()).unwrap();
        let dict = decoded.dict().unwrap();

        assert_eq!(dict.lookup(b"complete").and_then(|v| v.int()), Some(5));
        assert_eq!(dict.lookup(b"incomplete").and_then(|v| v.int()), Some(3));
        assert_eq!(dict.lookup(b"interval").and_then(|v| v.int()), Some(1800));
        assert_eq!(dict.lookup(b"tracker id").and_then(|v| v.bytes()), Some(&b"abc123"[..]));
        assert!(dict.lookup(b"peers6").is_none());

        let peers = dict.lookup(b"peers").and_then(|v| v.list()).unwrap();
        assert_eq!(peers.len(), 1);
        let peer = peers.get(0).and_then(|v| v.dict()).unwrap();
        assert_eq!(peer.to_list().len(), 3);
        assert_eq!(peer.lookup(b"peer id").and_then(|v| v.bytes()), Some(&b"TESTPEERID"[..]));
        assert_eq!(peer.lookup(b"ip").and_then(|v| v.bytes()), Some(&b"127.0.0.1"[..]));
        assert_eq!(peer.lookup(b"port").and_then(|v| v.int()), Some(8001));
    }

    #[test]
    fn test_build_announce_response_keys_sorted() {
        let response = create_test_response(Vec::new());
        let bytes = build_announce_response(&response, false, false);

        assert_eq!(
            bytes,
            b"d8:completei5e10:incompletei3e8:intervali1800e5:peersle10:tracker id6:abc123e".to_vec()
        );
    }

    #[test]
    fn test_build_announce_response_no_peer_id() {
        let response = create_test_response(vec![create_test_peer(
            b"TESTPEERID",
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            6881,
        )]);

        let bytes = build_announce_response(&response, false, true);
        let decoded = BencodeRef::decode(&bytes, BDecodeOpt::default()).unwrap();
        let dict = decoded.dict().unwrap();

        let peers = dict.lookup(b"peers").and_then(|v| v.list()).unwrap();
        let peer = peers.get(0).and_then(|v| v.dict()).unwrap();
        assert_eq!(peer.to_list().len(), 2);
        assert!(peer.lookup(b"peer id").is_none());
    }

    #[test]
    fn test_build_announce_response_compact() {
        let response = create_test_response(vec![
            create_test_peer(b"a", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)), 6881),
            create_test_peer(b"b", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 51413),
        ]);

        let bytes = build_announce_response(&response, true, false);
        let decoded = BencodeRef::decode(&bytes, BDecodeOpt::default()).unwrap();
        let dict = decoded.dict().unwrap();

        let packed = dict.lookup(b"peers").and_then(|v| v.bytes()).unwrap();
        assert_eq!(packed.len(), 12);
        assert_eq!(&packed[0..4], &[192, 168, 1, 1]);
        assert_eq!(&packed[4..6], &6881u16.to_be_bytes());
        assert_eq!(&packed[6..10], &[10, 0, 0, 1]);
        assert_eq!(&packed[10..12], &51413u16.to_be_bytes());

        assert_eq!(dict.lookup(b"peers6").and_then(|v| v.bytes()), Some(&b""[..]));
    }

    #[test]
    fn test_encode_compact_peers_ipv6() {
        let ip = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
        let peers = vec![create_test_peer(b"a", IpAddr::V6(ip), 6881)];

        let mut buf = Vec::new();
        encode_compact_peers_ipv6(&peers, &mut buf);

        assert_eq!(&buf[0..3], b"18:");
        assert_eq!(buf.len(), 3 + 18);
        assert_eq!(&buf[3..19], &ip.octets());
        assert_eq!(&buf[19..21], &6881u16.to_be_bytes());
    }

    #[test]
    fn test_encode_compact_peers_mixed() {
        let peers = vec![
            create_test_peer(b"a", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)), 6881),
            create_test_peer(b"b", IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)), 6882),
        ];

        let mut buf = Vec::new();
        encode_compact_peers(&peers, &mut buf);
        assert_eq!(&buf[0..2], b"6:");

        let mut buf = Vec::new();
        encode_compact_peers_ipv6(&peers, &mut buf);
        assert_eq!(&buf[0..3], b"18:");
    }

    #[test]
    fn test_build_failure_response() {
        assert_eq!(
            build_failure_response("missing key"),
            b"d14:failure reason11:missing keye".to_vec()
        );
    }
}
