// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use std::io::Cursor;

#[tokio::test]
async fn reads_a_request_written_in_a_single_chunk() {
    let body = br#"{"jsonrpc":"2.0","id":1,"method":"health_check","params":{}}"#;
    let mut reader = Cursor::new(body.to_vec());
    let req = read_request(&mut reader, std::time::Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(req.method, "health_check");
    assert_eq!(req.id, serde_json::json!(1));
}

/// A reader that trickles bytes one at a time exercises the grow-until-it-
/// parses framing the same way a slow client socket would.
struct Trickle {
    bytes: Vec<u8>,
    pos: usize,
}

impl tokio::io::AsyncRead for Trickle {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        if self.pos < self.bytes.len() {
            buf.put_slice(&[self.bytes[self.pos]]);
            self.pos += 1;
        }
        std::task::Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn reads_a_request_trickled_in_one_byte_at_a_time() {
    let body = br#"{"jsonrpc":"2.0","id":"abc","method":"list_containers","params":{"player_id":1}}"#;
    let mut reader = Trickle {
        bytes: body.to_vec(),
        pos: 0,
    };
    let req = read_request(&mut reader, std::time::Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(req.method, "list_containers");
    assert_eq!(req.id, serde_json::json!("abc"));
}

#[tokio::test]
async fn malformed_json_surfaces_as_a_json_error_once_the_stream_closes() {
    let body = b"{not json";
    let mut reader = Cursor::new(body.to_vec());
    let err = read_request(&mut reader, std::time::Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)));
}

#[tokio::test]
async fn write_response_encodes_ok_and_error_shapes() {
    let mut buf = Vec::new();
    let ok = RpcResponse::ok(serde_json::json!(1), serde_json::json!({"ok": true}));
    write_response(&mut buf, &ok).await.unwrap();
    let decoded: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(decoded["result"]["ok"], true);
    assert!(decoded.get("error").is_none());

    let mut buf = Vec::new();
    let err = RpcResponse::err(serde_json::json!(2), CODE_METHOD_NOT_FOUND, "unknown method");
    write_response(&mut buf, &err).await.unwrap();
    let decoded: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(decoded["error"]["code"], CODE_METHOD_NOT_FOUND);
    assert_eq!(decoded["error"]["message"], "unknown method");
}

#[test]
fn log_message_with_special_characters_round_trips_through_json() {
    let entry = LogEntry {
        seq: 1,
        ts: chrono::Utc::now(),
        level: LogLevel::Info,
        message: "quote\" newline\n backslash\\ emoji\u{1F680} json-like {\"a\":1}".to_string(),
    };
    let encoded = serde_json::to_string(&entry).unwrap();
    let decoded: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded["message"], entry.message);
}
