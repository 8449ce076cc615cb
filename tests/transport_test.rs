mod common;

use common::{TestServer, WAIT, next_json, send_json};
use futures_util::{SinkExt, StreamExt};
use sepp_rust::message::{CallStartData, ParticipantFlagData, Sdp, SdpUpdateData, SeppMessage};
use sepp_rust::socket::{SeppTransport, SocketError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

async fn recv(transport: &SeppTransport) -> SeppMessage {
    tokio::time::timeout(WAIT, transport.recv())
        .await
        .expect("no message routed")
        .expect("inbound channel closed")
}

async fn status(transport: &SeppTransport) -> Option<bool> {
    tokio::time::timeout(WAIT, transport.next_status())
        .await
        .expect("no status reported")
}

#[tokio::test]
async fn test_frames_are_routed_with_envelope() {
    let server = TestServer::bind().await;
    let transport = SeppTransport::new(server.endpoint(), Some("jwt".to_string()), None).unwrap();

    let (mut ws, auth) = server.accept().await;
    assert_eq!(auth.as_deref(), Some("Bearer jwt"));
    assert_eq!(status(&transport).await, Some(true));

    send_json(
        &mut ws,
        json!({
            "type": "call_accepted",
            "msg_id": "m-1",
            "from": "conf-1",
            "to": "client-1",
            "data": {"call_id": "C1", "sdp": {"type": "answer", "sdp": "X"}}
        }),
    )
    .await;

    let SeppMessage::CallAccepted(msg) = recv(&transport).await else {
        panic!("expected call_accepted");
    };
    assert_eq!(msg.envelope.msg_id, "m-1");
    assert_eq!(msg.envelope.from, "conf-1");
    assert_eq!(msg.envelope.to, "client-1");
    assert_eq!(msg.data.call_id, "C1");
    assert_eq!(msg.data.sdp, Sdp::answer("X"));

    transport.stop().await;
}

#[tokio::test]
async fn test_no_token_sends_no_authorization() {
    let server = TestServer::bind().await;
    let transport = SeppTransport::new(server.endpoint(), Some(String::new()), None).unwrap();

    let (_ws, auth) = server.accept().await;
    assert_eq!(auth, None);
    transport.stop().await;
}

#[tokio::test]
async fn test_bad_frames_are_skipped() {
    let server = TestServer::bind().await;
    let transport = SeppTransport::new(server.endpoint(), None, None).unwrap();
    let (mut ws, _) = server.accept().await;
    assert_eq!(status(&transport).await, Some(true));

    ws.send(Message::text("not json")).await.unwrap();
    send_json(&mut ws, json!({"type": "presence", "data": {}})).await;
    send_json(&mut ws, json!({"type": "call_rejected", "data": {"reject_code": "x"}})).await;
    ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    send_json(&mut ws, json!({"type": "call_rejected", "data": {"reject_code": 4}})).await;

    match recv(&transport).await {
        SeppMessage::CallRejected(msg) => assert_eq!(msg.data.reject_code, 4),
        other => panic!("unexpected {other:?}"),
    }
    assert!(transport.is_running());
    transport.stop().await;
}

#[tokio::test]
async fn test_outbound_messages_reach_the_wire() {
    let server = TestServer::bind().await;
    let transport = SeppTransport::new(server.endpoint(), None, None).unwrap();
    let (mut ws, _) = server.accept().await;
    assert_eq!(status(&transport).await, Some(true));

    let msg = SeppMessage::call_start(
        "A",
        "B",
        CallStartData {
            sdp: Sdp::offer("O"),
            display_name: "Guest".to_string(),
            platform: None,
        },
    );
    transport.send(&msg).await.unwrap();

    let frame = next_json(&mut ws).await;
    assert_eq!(frame["type"], "call_start");
    assert_eq!(frame["from"], "A");
    assert_eq!(frame["to"], "B");
    assert_eq!(frame["data"]["sdp"]["type"], "offer");
    assert_eq!(frame["data"]["display_name"], "Guest");
    assert!(frame["data"].get("platform").is_none());

    transport.stop().await;
}

#[tokio::test]
async fn test_reconnects_after_server_drop() {
    let server = TestServer::bind().await;
    let transport = SeppTransport::new(server.endpoint(), None, None).unwrap();

    let (mut ws, _) = server.accept().await;
    assert_eq!(status(&transport).await, Some(true));
    ws.close(None).await.unwrap();
    drop(ws);

    let (mut ws, _) = server.accept().await;
    assert_eq!(status(&transport).await, Some(true));

    send_json(&mut ws, json!({"type": "call_terminated", "data": {"call_id": "C1"}})).await;
    match recv(&transport).await {
        SeppMessage::CallTerminated(msg) => assert_eq!(msg.data.call_id, "C1"),
        other => panic!("unexpected {other:?}"),
    }

    // Writes go to the new connection.
    let msg = SeppMessage::call_terminate("A", "B", Default::default());
    transport.send(&msg).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "call_terminate");

    transport.stop().await;
}

#[tokio::test]
async fn test_idle_connection_gets_keepalive_ping() {
    let server = TestServer::bind().await;
    let transport = SeppTransport::new(server.endpoint(), None, None).unwrap();
    let (mut ws, _) = server.accept().await;
    assert_eq!(status(&transport).await, Some(true));

    let frame = tokio::time::timeout(WAIT, ws.next())
        .await
        .expect("no keepalive")
        .unwrap()
        .unwrap();
    match frame {
        Message::Ping(payload) => assert_eq!(&payload[..], b"keepalive"),
        other => panic!("unexpected {other:?}"),
    }

    transport.stop().await;
}

#[tokio::test]
async fn test_stop_closes_the_connection() {
    let server = TestServer::bind().await;
    let transport = SeppTransport::new(server.endpoint(), None, None).unwrap();
    let (mut ws, _) = server.accept().await;
    assert_eq!(status(&transport).await, Some(true));

    tokio::time::timeout(WAIT, transport.stop()).await.unwrap();
    assert!(!transport.is_running());
    assert_eq!(transport.recv().await, None);

    let closed = tokio::time::timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn test_stop_completes_when_peer_stops_reading() {
    let server = TestServer::bind().await;
    let transport = SeppTransport::new(server.endpoint(), None, None).unwrap();
    // Accepted but never read again.
    let (_ws, _) = server.accept().await;
    assert_eq!(status(&transport).await, Some(true));

    let huge = SeppMessage::sdp_update(
        "A",
        "B",
        SdpUpdateData {
            call_id: "C1".to_string(),
            sdp: Sdp::offer("x".repeat(64 << 20)),
        },
    );
    transport.send(&huge).await.unwrap();
    // Let the writer block on the full socket.
    tokio::time::sleep(Duration::from_millis(500)).await;

    tokio::time::timeout(Duration::from_secs(10), transport.stop())
        .await
        .expect("stop must not wait for a stalled peer");
    assert!(!transport.is_running());
    assert_eq!(transport.recv().await, None);
}

#[tokio::test]
async fn test_send_racing_stop_is_ok_or_not_running() {
    let server = TestServer::bind().await;
    let transport = Arc::new(SeppTransport::new(server.endpoint(), None, None).unwrap());
    let (_ws, _) = server.accept().await;
    assert_eq!(status(&transport).await, Some(true));

    let mut senders = Vec::new();
    for i in 0..16 {
        let transport = Arc::clone(&transport);
        senders.push(tokio::spawn(async move {
            let msg = SeppMessage::mute_video(
                "A",
                "B",
                ParticipantFlagData {
                    call_id: format!("C{i}"),
                    ..Default::default()
                },
            );
            let mut results = Vec::new();
            for _ in 0..8 {
                results.push(transport.send(&msg).await);
            }
            results
        }));
    }

    tokio::time::timeout(WAIT, transport.stop()).await.unwrap();

    for sender in senders {
        let results = tokio::time::timeout(WAIT, sender).await.unwrap().unwrap();
        for result in results {
            assert!(
                matches!(result, Ok(()) | Err(SocketError::NotRunning)),
                "unexpected {result:?}"
            );
        }
    }
    assert!(matches!(
        transport.send(&SeppMessage::call_terminate("A", "B", Default::default())).await,
        Err(SocketError::NotRunning)
    ));
}
