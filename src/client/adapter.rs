use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::debounce::Debouncer;
use super::reconnect::ReconnectPolicy;
use super::transport::StreamTransport;
use crate::event::{Event, EventKind, ParticipantIdentity};
use crate::shared::HubError;

type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handler table and connectivity flag shared with the pump task
struct ChannelShared {
    handlers: StdMutex<HashMap<u64, (Option<EventKind>, EventHandler)>>,
    connected: AtomicBool,
}

impl ChannelShared {
    fn dispatch(&self, event: &Event) {
        let handlers = self.handlers.lock().unwrap();
        for (filter, handler) in handlers.values() {
            if filter.as_ref().map_or(true, |kind| *kind == event.kind) {
                handler(event);
            }
        }
    }
}

/// One transport connection per room, shared by every subscription to it
struct RoomChannel {
    refcount: usize,
    shared: Arc<ChannelShared>,
    pump: JoinHandle<()>,
}

type ChannelMap = tokio::sync::Mutex<HashMap<String, RoomChannel>>;

/// Client-side stream adapter: typed subscribe/publish over a transport
///
/// Repeated subscriptions to the same room share one transport connection
/// by reference counting; the connection opens with the first subscriber
/// and closes when the count returns to zero.
pub struct StreamClient {
    transport: Arc<dyn StreamTransport>,
    identity: ParticipantIdentity,
    policy: ReconnectPolicy,
    channels: Arc<ChannelMap>,
    debouncer: Debouncer,
    next_subscription_id: AtomicU64,
}

impl StreamClient {
    pub fn new(transport: Arc<dyn StreamTransport>, identity: ParticipantIdentity) -> Self {
        Self {
            transport,
            identity,
            policy: ReconnectPolicy::default(),
            channels: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            debouncer: Debouncer::default(),
            next_subscription_id: AtomicU64::new(0),
        }
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debouncer = Debouncer::new(window);
        self
    }

    /// Registers `handler` for events in `room`; `kind` of `None` matches
    /// every kind. Opens the transport connection if this is the room's
    /// first subscriber, or reopens it if the stream ended earlier.
    pub async fn subscribe(
        &self,
        room: &str,
        kind: Option<EventKind>,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Result<Subscription, HubError> {
        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let mut channels = self.channels.lock().await;

        match channels.get_mut(room) {
            Some(channel) => {
                if !channel.shared.connected.load(Ordering::Acquire) {
                    // the old pump may still be alive in a backoff sleep;
                    // kill it before spawning a replacement or both end up
                    // holding a connection and every handler fires twice
                    channel.pump.abort();
                    channel.pump = self.spawn_pump(room, channel.shared.clone()).await?;
                }
                channel
                    .shared
                    .handlers
                    .lock()
                    .unwrap()
                    .insert(id, (kind, Arc::new(handler)));
                channel.refcount += 1;
            }
            None => {
                let shared = Arc::new(ChannelShared {
                    handlers: StdMutex::new(HashMap::new()),
                    connected: AtomicBool::new(false),
                });
                shared
                    .handlers
                    .lock()
                    .unwrap()
                    .insert(id, (kind, Arc::new(handler)));
                let pump = self.spawn_pump(room, shared.clone()).await?;
                debug!(room_id = %room, "Opened room channel");
                channels.insert(
                    room.to_string(),
                    RoomChannel {
                        refcount: 1,
                        shared,
                        pump,
                    },
                );
            }
        }

        Ok(Subscription {
            room: room.to_string(),
            id,
            channels: self.channels.clone(),
        })
    }

    /// Publishes one event; resolves on server acceptance, errors surface
    /// via the result rather than a panic.
    pub async fn publish(
        &self,
        room: &str,
        kind: EventKind,
        payload: serde_json::Value,
    ) -> Result<(), HubError> {
        self.transport
            .publish(room, kind, payload, &self.identity)
            .await
    }

    /// Debounced publish for high-frequency kinds (cursor moves): at most
    /// one transport publish per window, carrying the latest payload.
    pub fn publish_debounced(&self, room: &str, kind: EventKind, payload: serde_json::Value) {
        self.debouncer.publish(
            self.transport.clone(),
            self.identity.clone(),
            room,
            kind,
            payload,
        );
    }

    /// Manual retry trigger for a room whose stream ended while the
    /// manual-retry policy was in effect
    pub async fn retry(&self, room: &str) -> Result<(), HubError> {
        let mut channels = self.channels.lock().await;
        match channels.get_mut(room) {
            Some(channel) => {
                if !channel.shared.connected.load(Ordering::Acquire) {
                    channel.pump.abort();
                    channel.pump = self.spawn_pump(room, channel.shared.clone()).await?;
                    info!(room_id = %room, "Stream re-established on manual retry");
                }
                Ok(())
            }
            None => Err(HubError::NotFound(format!(
                "no subscriptions for room {room}"
            ))),
        }
    }

    async fn spawn_pump(
        &self,
        room: &str,
        shared: Arc<ChannelShared>,
    ) -> Result<JoinHandle<()>, HubError> {
        let mut receiver = self.transport.connect(room, &self.identity).await?;
        shared.connected.store(true, Ordering::Release);

        let transport = self.transport.clone();
        let identity = self.identity.clone();
        let policy = self.policy.clone();
        let room = room.to_string();

        Ok(tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                match receiver.recv().await {
                    Some(event) => {
                        attempt = 0;
                        shared.dispatch(&event);
                    }
                    None => {
                        shared.connected.store(false, Ordering::Release);
                        match policy.delay_for(attempt) {
                            Some(delay) => {
                                warn!(
                                    room_id = %room,
                                    attempt = attempt,
                                    delay_ms = delay.as_millis() as u64,
                                    "Stream ended, reconnecting after backoff"
                                );
                                tokio::time::sleep(delay).await;
                                attempt += 1;
                                match transport.connect(&room, &identity).await {
                                    Ok(new_receiver) => {
                                        receiver = new_receiver;
                                        shared.connected.store(true, Ordering::Release);
                                    }
                                    Err(e) => {
                                        warn!(room_id = %room, error = %e, "Reconnect failed");
                                    }
                                }
                            }
                            None => {
                                info!(
                                    room_id = %room,
                                    "Stream ended; waiting for the next subscribe or a manual retry"
                                );
                                break;
                            }
                        }
                    }
                }
            }
        }))
    }
}

/// Live handler registration; call `unsubscribe` to release it
pub struct Subscription {
    room: String,
    id: u64,
    channels: Arc<ChannelMap>,
}

impl Subscription {
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Removes the handler; the room's transport connection is torn down
    /// once the last subscription is gone.
    pub async fn unsubscribe(self) {
        let mut channels = self.channels.lock().await;
        let mut close_channel = false;
        if let Some(channel) = channels.get_mut(&self.room) {
            channel.shared.handlers.lock().unwrap().remove(&self.id);
            channel.refcount = channel.refcount.saturating_sub(1);
            if channel.refcount == 0 {
                channel.pump.abort();
                close_channel = true;
            }
        }
        if close_channel {
            debug!(room_id = %self.room, "Last subscriber gone, closing room channel");
            channels.remove(&self.room);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::LocalTransport;
    use crate::dispatch::EventDispatcher;
    use crate::presence::{PresenceConfig, PresenceTracker};
    use crate::registry::RoomRegistry;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn identity(id: &str) -> ParticipantIdentity {
        ParticipantIdentity::new(id, id.to_uppercase(), "member")
    }

    fn hub() -> (Arc<RoomRegistry>, Arc<dyn StreamTransport>) {
        let registry = Arc::new(RoomRegistry::new());
        let presence = Arc::new(PresenceTracker::new(PresenceConfig::default()));
        let dispatcher = Arc::new(EventDispatcher::new(registry.clone(), presence));
        let transport: Arc<dyn StreamTransport> =
            Arc::new(LocalTransport::new(registry.clone(), dispatcher));
        (registry, transport)
    }

    fn collector() -> (Arc<StdMutex<Vec<Event>>>, impl Fn(&Event) + Send + Sync) {
        let seen: Arc<StdMutex<Vec<Event>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |event: &Event| {
            sink.lock().unwrap().push(event.clone())
        })
    }

    #[tokio::test]
    async fn test_subscribe_receives_matching_events() {
        let (_registry, transport) = hub();
        let client = StreamClient::new(transport.clone(), identity("1"));
        let (seen, handler) = collector();

        let subscription = client
            .subscribe("dm:1:2", Some(EventKind::Dm), handler)
            .await
            .unwrap();

        transport
            .publish("dm:1:2", EventKind::Dm, json!({"text": "hi"}), &identity("2"))
            .await
            .unwrap();
        transport
            .publish("dm:1:2", EventKind::Typing, json!({}), &identity("2"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let events = seen.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sender.id, "2");
        assert_eq!(events[0].payload["text"], "hi");

        subscription.unsubscribe().await;
    }

    #[tokio::test]
    async fn test_subscriptions_share_one_connection() {
        let (registry, transport) = hub();
        let client = StreamClient::new(transport, identity("1"));

        let (_, first_handler) = collector();
        let (_, second_handler) = collector();
        let first = client
            .subscribe("org:acme:main", None, first_handler)
            .await
            .unwrap();
        let second = client
            .subscribe("org:acme:main", Some(EventKind::Chat), second_handler)
            .await
            .unwrap();

        assert_eq!(registry.connection_count("org:acme:main").await, 1);

        first.unsubscribe().await;
        assert_eq!(registry.connection_count("org:acme:main").await, 1);
        second.unsubscribe().await;
        // the hub notices the dropped receiver on the next delivery attempt
    }

    #[tokio::test]
    async fn test_manual_retry_reconnects() {
        let (registry, transport) = hub();
        let client = StreamClient::new(transport.clone(), identity("1"));
        let (seen, handler) = collector();

        let _subscription = client.subscribe("room", None, handler).await.unwrap();
        assert_eq!(registry.connection_count("room").await, 1);

        // sever the stream server-side
        for connection_id in registry.connection_ids_for("room", "1").await {
            registry.leave("room", &connection_id).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.connection_count("room").await, 0);

        client.retry("room").await.unwrap();
        assert_eq!(registry.connection_count("room").await, 1);

        transport
            .publish("room", EventKind::Chat, json!({"n": 1}), &identity("2"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resubscribe_during_backoff_keeps_a_single_connection() {
        let (registry, transport) = hub();
        let client = StreamClient::new(transport.clone(), identity("1")).with_reconnect_policy(
            ReconnectPolicy::Backoff {
                base: Duration::from_millis(300),
                cap: Duration::from_millis(300),
                max_attempts: 5,
            },
        );
        let (seen_a, handler_a) = collector();
        let (seen_b, handler_b) = collector();

        let _first = client.subscribe("room", None, handler_a).await.unwrap();

        // sever the stream; the pump notices and starts its backoff sleep
        for connection_id in registry.connection_ids_for("room", "1").await {
            registry.leave("room", &connection_id).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.connection_count("room").await, 0);

        // subscribing mid-backoff must replace the sleeping pump, not race it
        let _second = client.subscribe("room", None, handler_b).await.unwrap();
        assert_eq!(registry.connection_count("room").await, 1);

        // wait past the old pump's backoff window; it must not come back
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(registry.connection_count("room").await, 1);

        transport
            .publish("room", EventKind::Chat, json!({"n": 1}), &identity("2"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen_a.lock().unwrap().len(), 1);
        assert_eq!(seen_b.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_without_subscription_is_an_error() {
        let (_registry, transport) = hub();
        let client = StreamClient::new(transport, identity("1"));

        let result = client.retry("never-subscribed").await;
        assert!(matches!(result, Err(HubError::NotFound(_))));
    }

    /// Transport mock that records publishes and keeps connections open
    struct RecordingTransport {
        published: StdMutex<Vec<(String, EventKind, serde_json::Value)>>,
        senders: StdMutex<Vec<mpsc::UnboundedSender<Event>>>,
    }

    impl RecordingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                published: StdMutex::new(Vec::new()),
                senders: StdMutex::new(Vec::new()),
            })
        }

        fn published(&self) -> Vec<(String, EventKind, serde_json::Value)> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StreamTransport for RecordingTransport {
        async fn connect(
            &self,
            _room: &str,
            _identity: &ParticipantIdentity,
        ) -> Result<mpsc::UnboundedReceiver<Event>, HubError> {
            let (sender, receiver) = mpsc::unbounded_channel();
            self.senders.lock().unwrap().push(sender);
            Ok(receiver)
        }

        async fn publish(
            &self,
            room: &str,
            kind: EventKind,
            payload: serde_json::Value,
            _identity: &ParticipantIdentity,
        ) -> Result<(), HubError> {
            self.published
                .lock()
                .unwrap()
                .push((room.to_string(), kind, payload));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_debounced_publish_coalesces_to_latest() {
        let transport = RecordingTransport::new();
        let client = StreamClient::new(transport.clone(), identity("1"))
            .with_debounce_window(Duration::from_millis(100));

        client.publish_debounced("room1", EventKind::Cursor, json!({"x": 1, "y": 1}));
        tokio::time::sleep(Duration::from_millis(30)).await;
        client.publish_debounced("room1", EventKind::Cursor, json!({"x": 2, "y": 2}));

        tokio::time::sleep(Duration::from_millis(200)).await;

        let published = transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "room1");
        assert_eq!(published[0].2, json!({"x": 2, "y": 2}));
    }

    #[tokio::test]
    async fn test_debounce_slots_distinguish_room_from_kind() {
        let transport = RecordingTransport::new();
        let client = StreamClient::new(transport.clone(), identity("1"))
            .with_debounce_window(Duration::from_millis(50));

        // a naive "room:kind" string key would conflate these two
        client.publish_debounced("a:b", EventKind::Other("c".into()), json!({"n": 1}));
        client.publish_debounced("a", EventKind::Other("b:c".into()), json!({"n": 2}));

        tokio::time::sleep(Duration::from_millis(150)).await;

        let published = transport.published();
        assert_eq!(published.len(), 2);
        assert!(published
            .iter()
            .any(|(room, kind, _)| room == "a:b" && *kind == EventKind::Other("c".into())));
        assert!(published
            .iter()
            .any(|(room, kind, _)| room == "a" && *kind == EventKind::Other("b:c".into())));
    }

    #[tokio::test]
    async fn test_debounce_windows_are_independent_per_room() {
        let transport = RecordingTransport::new();
        let client = StreamClient::new(transport.clone(), identity("1"))
            .with_debounce_window(Duration::from_millis(50));

        client.publish_debounced("room1", EventKind::Cursor, json!({"x": 1}));
        client.publish_debounced("room2", EventKind::Cursor, json!({"x": 9}));

        tokio::time::sleep(Duration::from_millis(150)).await;

        let published = transport.published();
        assert_eq!(published.len(), 2);
        let rooms: Vec<&str> = published.iter().map(|(room, _, _)| room.as_str()).collect();
        assert!(rooms.contains(&"room1"));
        assert!(rooms.contains(&"room2"));
    }
}
