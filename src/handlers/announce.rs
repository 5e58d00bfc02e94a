use crate::bencode::response::build_announce_response;
use crate::core::error::{AnnounceError, ValidationError};
use crate::core::state::AppState;
use crate::validation::params::AnnounceParams;
use axum::{
    extract::{ConnectInfo, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Main announce handler
///
/// GET /announce. Every outcome, failures included, is a bencoded body.
#[instrument(skip(state, raw_query))]
pub async fn announce_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(raw_query): RawQuery,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let (status, body) = process_announce(&state, raw_query.as_deref(), addr.ip());

    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

/// Run one announce from its raw query string to the encoded reply.
///
/// `observed` is the connection's source address, used unless the query
/// names an `ip`.
pub fn process_announce(
    state: &AppState,
    raw_query: Option<&str>,
    observed: IpAddr,
) -> (StatusCode, Vec<u8>) {
    state.metrics.increment_announces();

    match try_announce(state, raw_query, observed) {
        Ok(body) => {
            state.metrics.increment_successful();
            (StatusCode::OK, body)
        }
        Err(e) => {
            warn!(error = %e, "Announce rejected");
            state.metrics.increment_failed();
            e.to_wire()
        }
    }
}

fn try_announce(
    state: &AppState,
    raw_query: Option<&str>,
    observed: IpAddr,
) -> Result<Vec<u8>, AnnounceError> {
    // No query string at all is usually a browser hitting the URL
    let raw_query = raw_query.ok_or(ValidationError::MissingParameter("info_hash"))?;

    let params = AnnounceParams::from_query(raw_query)?;
    let (compact, no_peer_id) = params.response_shape()?;
    let response = state.processor.process(&state.registry, &params, observed)?;

    debug!(
        peers_returned = response.peers.len(),
        compact, no_peer_id, "Building announce response"
    );

    Ok(build_announce_response(&response, compact, no_peer_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bip_bencode::{BDecodeOpt, BDictAccess, BListAccess, BRefAccess, BencodeRef};
    use crate::core::config::Config;
    use std::net::Ipv4Addr;

    const OBSERVED: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

    fn create_test_state() -> AppState {
        AppState::new(Config::default())
    }

    fn query(peer_id: &str, extra: &str) -> String {
        format!(
            "info_hash=TESTINFOHASH&peer_id={}&port=8001&uploaded=0\
             &downloaded=1000000&left=2000000{}",
            peer_id, extra
        )
    }

    fn failure_reason(body: &[u8]) -> Option<String> {
        let decoded = BencodeRef::decode(body, BDecodeOpt::default()).unwrap();
        decoded
            .dict()
            .and_then(|d| d.lookup(b"failure reason"))
            .and_then(|v| v.str())
            .map(str::to_string)
    }

    #[test]
    fn test_successful_announce() {
        let state = create_test_state();
        let (status, body) = process_announce(&state, Some(&query("A", "&event=started")), OBSERVED);

        assert_eq!(status, StatusCode::OK);
        let decoded = BencodeRef::decode(&body, BDecodeOpt::default()).unwrap();
        let dict = decoded.dict().unwrap();
        assert_eq!(dict.lookup(b"incomplete").and_then(|v| v.int()), Some(1));
        assert_eq!(dict.lookup(b"complete").and_then(|v| v.int()), Some(0));
        assert_eq!(dict.lookup(b"interval").and_then(|v| v.int()), Some(1800));
        assert!(dict.lookup(b"failure reason").is_none());

        assert_eq!(state.metrics.successful_announces.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_missing_query_is_failure() {
        let state = create_test_state();
        let (status, body) = process_announce(&state, None, OBSERVED);

        assert_eq!(status, StatusCode::OK);
        assert!(failure_reason(&body).is_some());
        assert_eq!(state.metrics.failed_announces.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(state.registry.active_torrents(), 0);
    }

    #[test]
    fn test_malformed_announce_leaves_registry_untouched() {
        let state = create_test_state();
        let (_, body) = process_announce(&state, Some(&query("A", "&event=bogus")), OBSERVED);

        let reason = failure_reason(&body).unwrap();
        assert!(reason.starts_with("Malformed request"));
        assert_eq!(state.registry.total_peers(), 0);
    }

    #[test]
    fn test_bad_flag_rejected() {
        let state = create_test_state();
        let (_, body) = process_announce(&state, Some(&query("A", "&compact=yes")), OBSERVED);

        assert!(failure_reason(&body).is_some());
    }

    #[test]
    fn test_compact_response() {
        let state = create_test_state();
        process_announce(&state, Some(&query("A", "")), OBSERVED);
        let (_, body) = process_announce(&state, Some(&query("B", "&compact=1")), OBSERVED);

        let decoded = BencodeRef::decode(&body, BDecodeOpt::default()).unwrap();
        let peers = decoded.dict().and_then(|d| d.lookup(b"peers")).and_then(|v| v.bytes()).unwrap();
        assert_eq!(peers, &[127, 0, 0, 1, 0x1f, 0x41]);
    }

    #[test]
    fn test_ip_param_overrides_observed() {
        let state = create_test_state();
        process_announce(&state, Some(&query("A", "&ip=10.0.0.7")), OBSERVED);
        let (_, body) = process_announce(&state, Some(&query("B", "")), OBSERVED);

        let decoded = BencodeRef::decode(&body, BDecodeOpt::default()).unwrap();
        let peers = decoded.dict().and_then(|d| d.lookup(b"peers")).and_then(|v| v.list()).unwrap();
        let peer = peers.get(0).and_then(|v| v.dict()).unwrap();
        assert_eq!(peer.lookup(b"ip").and_then(|v| v.bytes()), Some(&b"10.0.0.7"[..]));
    }
}
