//! Room Hub integration tests
//!
//! Connections are attached with in-process transport halves, so these run
//! the real read and write loops without a socket.

#[cfg(feature = "ssr")]
mod common;

#[cfg(feature = "ssr")]
mod tests {
    use super::common::*;
    use axum::extract::ws::Message as Frame;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    use clawswarm::backend::realtime::Hub;
    use clawswarm::shared::HubConfig;

    fn text(payload: &str) -> Frame {
        Frame::Text(payload.into())
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_identical_bytes() {
        let hub = Hub::new(HubConfig::default());
        let space = Uuid::new_v4();

        let mut outputs = Vec::new();
        let mut inbound = Vec::new();
        for _ in 0..3 {
            let (sink, rx) = channel_sink(16);
            let (tx, stream) = channel_stream();
            hub.attach(space, sink, stream);
            outputs.push(rx);
            inbound.push(tx);
        }
        assert_eq!(hub.room_size(space), 3);

        let payload = r#"{"content":"deploy finished"}"#;
        assert_eq!(hub.broadcast(space, Bytes::from_static(payload.as_bytes())), 3);

        for rx in outputs.iter_mut() {
            assert_eq!(next_frame(rx).await, text(payload));
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_only_sees_later_payloads() {
        let hub = Hub::new(HubConfig::default());
        let space = Uuid::new_v4();

        let (early_sink, mut early) = channel_sink(16);
        let (_early_in, early_stream) = channel_stream();
        hub.attach(space, early_sink, early_stream);

        hub.broadcast(space, Bytes::from_static(b"first"));

        let (late_sink, mut late) = channel_sink(16);
        let (_late_in, late_stream) = channel_stream();
        hub.attach(space, late_sink, late_stream);

        hub.broadcast(space, Bytes::from_static(b"second"));

        assert_eq!(next_frame(&mut early).await, text("first"));
        assert_eq!(next_frame(&mut early).await, text("second"));
        assert_eq!(next_frame(&mut late).await, text("second"));
    }

    #[tokio::test]
    async fn test_frames_arrive_in_broadcast_order() {
        let hub = Hub::new(HubConfig::default());
        let space = Uuid::new_v4();
        let (sink, mut rx) = channel_sink(64);
        let (_in, stream) = channel_stream();
        hub.attach(space, sink, stream);

        for i in 0..20 {
            hub.broadcast(space, Bytes::from(format!("m{i}")));
            tokio::task::yield_now().await;
        }
        for i in 0..20 {
            assert_eq!(next_frame(&mut rx).await, text(&format!("m{i}")));
        }
    }

    #[tokio::test]
    async fn test_other_spaces_never_see_a_broadcast() {
        let hub = Hub::new(HubConfig::default());
        let (here, there) = (Uuid::new_v4(), Uuid::new_v4());

        let (sink, mut here_rx) = channel_sink(8);
        let (_a, stream) = channel_stream();
        hub.attach(here, sink, stream);
        let (sink, mut there_rx) = channel_sink(8);
        let (_b, stream) = channel_stream();
        hub.attach(there, sink, stream);

        assert_eq!(hub.broadcast(here, Bytes::from_static(b"local")), 1);
        assert_eq!(next_frame(&mut here_rx).await, text("local"));
        assert!(tokio::time::timeout(Duration::from_millis(50), there_rx.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_saturated_subscriber_is_evicted_without_stalling_others() {
        let hub = Hub::new(HubConfig {
            send_buffer: 4,
            ..HubConfig::default()
        });
        let space = Uuid::new_v4();

        // Nobody reads this sink, so its writer stalls after one frame
        let (stalled_sink, _stalled_rx) = channel_sink(1);
        let (_s, stalled_stream) = channel_stream();
        let stalled = hub.attach(space, stalled_sink, stalled_stream);

        let (sink, mut healthy_rx) = channel_sink(64);
        let (_h, stream) = channel_stream();
        let healthy = hub.attach(space, sink, stream);

        for i in 0..12 {
            hub.broadcast(space, Bytes::from(format!("m{i}")));
            tokio::task::yield_now().await;
        }

        assert!(stalled.is_closed());
        assert!(!healthy.is_closed());
        assert_eq!(hub.room_size(space), 1);
        for i in 0..12 {
            assert_eq!(next_frame(&mut healthy_rx).await, text(&format!("m{i}")));
        }
    }

    #[tokio::test]
    async fn test_peer_close_unregisters_and_sends_close_frame() {
        let hub = Hub::new(HubConfig::default());
        let space = Uuid::new_v4();
        let (sink, mut rx) = channel_sink(8);
        let (inbound, stream) = channel_stream();
        let connection = hub.attach(space, sink, stream);

        inbound.send(Ok(Frame::Close(None))).await.unwrap();
        assert!(matches!(next_frame(&mut rx).await, Frame::Close(_)));
        assert!(connection.is_closed());
        assert_eq!(hub.room_size(space), 0);
        assert_eq!(hub.broadcast(space, Bytes::from_static(b"gone")), 0);
    }

    #[tokio::test]
    async fn test_oversized_inbound_frame_drops_connection() {
        let hub = Hub::new(HubConfig {
            max_frame_bytes: 8,
            ..HubConfig::default()
        });
        let space = Uuid::new_v4();
        let (sink, _rx) = channel_sink(8);
        let (inbound, stream) = channel_stream();
        let connection = hub.attach(space, sink, stream);

        inbound.send(Ok(text("well over eight bytes"))).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), connection.closed_token().cancelled())
            .await
            .unwrap();
        assert_eq!(hub.room_size(space), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_unregister_removes_once() {
        let hub = Hub::new(HubConfig::default());
        let space = Uuid::new_v4();
        let (sink, _rx) = channel_sink(8);
        let (_in, stream) = channel_stream();
        let connection = hub.attach(space, sink, stream);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let hub = hub.clone();
            let connection = Arc::clone(&connection);
            handles.push(tokio::spawn(async move { hub.unregister(&connection) }));
        }

        let mut removed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                removed += 1;
            }
        }
        assert_eq!(removed, 1);
        assert!(connection.is_closed());
        assert_eq!(hub.room_count(), 0);
    }
}
