//! Admission handshake helpers.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, close_code};
use axum::http::HeaderMap;
use futures::{Sink, SinkExt, Stream, StreamExt};
use seekrelay_core::AuthError;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Best-effort originating address of a connection.
///
/// The first comma-separated value of `X-Forwarded-For` wins over the peer
/// address; with neither, `"unknown"`.
pub fn resolve_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Text carried by an application frame.
///
/// Binary frames count when they are valid UTF-8.
pub fn frame_text(msg: &Message) -> Option<String> {
    match msg {
        Message::Text(t) => Some(t.to_string()),
        Message::Binary(data) => std::str::from_utf8(data).ok().map(str::to_string),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
    }
}

/// Wait for the first application frame.
///
/// Control frames are skipped. Returns `None` when the peer closes, errors,
/// or sends nothing within `timeout`.
pub async fn await_auth_frame<S, E>(stream: &mut S, timeout: Duration) -> Option<String>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
{
    let first = async {
        while let Some(Ok(msg)) = stream.next().await {
            if matches!(msg, Message::Close(_)) {
                return None;
            }
            if let Some(text) = frame_text(&msg) {
                return Some(text);
            }
        }
        None
    };
    tokio::time::timeout(timeout, first).await.ok().flatten()
}

/// Send the rejection diagnostic, then a policy-violation close.
pub async fn reject<S>(sink: &mut S, err: &AuthError)
where
    S: Sink<Message> + Unpin,
{
    let _ = sink.send(Message::Text(err.diagnostic().into())).await;
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: err.close_reason().to_string().into(),
        })))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use futures::channel::mpsc;
    use seekrelay_core::UnknownRole;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.10:51000".parse().unwrap())
    }

    #[test]
    fn identity_prefers_first_forwarded_value() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(
            FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        assert_eq!(resolve_identity(&headers, peer()), "203.0.113.5");
    }

    #[test]
    fn identity_falls_back_to_peer_ip() {
        assert_eq!(resolve_identity(&HeaderMap::new(), peer()), "192.0.2.10");
        let mut headers = HeaderMap::new();
        let _ = headers.insert(FORWARDED_FOR, HeaderValue::from_static("  "));
        assert_eq!(resolve_identity(&headers, peer()), "192.0.2.10");
    }

    #[test]
    fn identity_unknown_without_sources() {
        assert_eq!(resolve_identity(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn binary_utf8_counts_as_text() {
        assert_eq!(
            frame_text(&Message::Binary(b"tok:seeker".to_vec().into())).as_deref(),
            Some("tok:seeker")
        );
        assert_eq!(frame_text(&Message::Binary(vec![0xff, 0xfe].into())), None);
        assert_eq!(frame_text(&Message::Ping(Vec::new().into())), None);
    }

    #[tokio::test]
    async fn auth_frame_skips_control_frames() {
        let frames: Vec<Result<Message, ()>> = vec![
            Ok(Message::Ping(Vec::new().into())),
            Ok(Message::Text("tok:seeker".to_string().into())),
        ];
        let mut stream = futures::stream::iter(frames);
        assert_eq!(
            await_auth_frame(&mut stream, Duration::from_secs(1)).await.as_deref(),
            Some("tok:seeker")
        );
    }

    #[tokio::test]
    async fn auth_frame_none_on_close_or_error() {
        let mut closed = futures::stream::iter(vec![Ok::<_, ()>(Message::Close(None))]);
        assert_eq!(await_auth_frame(&mut closed, Duration::from_secs(1)).await, None);

        let mut errored = futures::stream::iter(vec![Err::<Message, _>(())]);
        assert_eq!(await_auth_frame(&mut errored, Duration::from_secs(1)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_frame_times_out() {
        let mut silent = futures::stream::pending::<Result<Message, ()>>();
        assert_eq!(await_auth_frame(&mut silent, Duration::from_secs(10)).await, None);
    }

    #[tokio::test]
    async fn reject_sends_diagnostic_then_policy_close() {
        let (mut tx, rx) = mpsc::unbounded::<Message>();
        reject(&mut tx, &AuthError::from(UnknownRole("watcher".into()))).await;
        drop(tx);
        let sent: Vec<Message> = rx.collect().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(
            frame_text(&sent[0]).as_deref(),
            Some("Invalid client type: watcher. Must be 'seeker' or 'switcher'")
        );
        match &sent[1] {
            Message::Close(Some(frame)) => {
                assert_eq!(frame.code, close_code::POLICY);
                assert_eq!(frame.reason.as_str(), "Invalid client type");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}
