//! Connection lifecycle: the single long-lived chat session.
//!
//! The manager is the only writer of [`ConnectionState`]; the
//! dispatcher and resolver read it through [`StateHandle`] clones.
//! Transitions happen only on lifecycle events, never on an
//! ingress-triggered path.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::backend::{BotIdentity, ChannelId, ChatBackend, GroupScope};
use crate::error::LifecycleError;
use crate::resolver;

/// Phase of the chat connection.
///
/// `Ready` is the only phase from which dispatch sends may succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Ready,
    Closing,
    Closed,
}

/// Process-wide connection state, created once at startup.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    pub identity: Option<BotIdentity>,
    pub target_channel_id: Option<ChannelId>,
}

/// Shared read handle over the connection state. Cheap to clone; the
/// write methods are module-private so only the lifecycle manager can
/// transition it.
#[derive(Clone)]
pub struct StateHandle {
    inner: Arc<RwLock<ConnectionState>>,
    /// Broadcasts every phase transition so waiters can suspend on the
    /// change instead of polling.
    phase_tx: watch::Sender<ConnectionPhase>,
}

impl StateHandle {
    pub fn new(target_channel_id: Option<ChannelId>) -> Self {
        let (phase_tx, _) = watch::channel(ConnectionPhase::Disconnected);
        Self {
            inner: Arc::new(RwLock::new(ConnectionState {
                phase: ConnectionPhase::Disconnected,
                identity: None,
                target_channel_id,
            })),
            phase_tx,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.inner.read().unwrap().phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == ConnectionPhase::Ready
    }

    pub fn identity(&self) -> Option<BotIdentity> {
        self.inner.read().unwrap().identity.clone()
    }

    pub fn target_channel(&self) -> Option<ChannelId> {
        self.inner.read().unwrap().target_channel_id.clone()
    }

    /// Suspends until the connection reaches `Ready` or the timeout
    /// elapses; returns whether it is ready. Never blocks past the
    /// timeout, so callers can serve ingress regardless.
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut phase_rx = self.phase_tx.subscribe();
        let _ = tokio::time::timeout(timeout, async {
            while *phase_rx.borrow_and_update() != ConnectionPhase::Ready {
                if phase_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;
        self.is_ready()
    }

    /// Disconnected -> Connecting. False if a close already ran.
    fn begin_connecting(&self) -> bool {
        let mut state = self.inner.write().unwrap();
        if state.phase == ConnectionPhase::Disconnected {
            state.phase = ConnectionPhase::Connecting;
            self.phase_tx.send_replace(state.phase);
            true
        } else {
            false
        }
    }

    /// Connecting -> Ready. False if a concurrent close won the race;
    /// the state then stays on its way to `Closed`.
    fn mark_ready(&self, identity: BotIdentity) -> bool {
        let mut state = self.inner.write().unwrap();
        if state.phase == ConnectionPhase::Connecting {
            state.phase = ConnectionPhase::Ready;
            state.identity = Some(identity);
            self.phase_tx.send_replace(state.phase);
            true
        } else {
            false
        }
    }

    /// Connecting -> Disconnected, after a failed handshake.
    fn mark_disconnected(&self) {
        let mut state = self.inner.write().unwrap();
        if state.phase == ConnectionPhase::Connecting {
            state.phase = ConnectionPhase::Disconnected;
            self.phase_tx.send_replace(state.phase);
        }
    }

    /// Any phase -> Closing. False if already closing or closed.
    fn begin_closing(&self) -> bool {
        let mut state = self.inner.write().unwrap();
        match state.phase {
            ConnectionPhase::Closing | ConnectionPhase::Closed => false,
            _ => {
                state.phase = ConnectionPhase::Closing;
                self.phase_tx.send_replace(state.phase);
                true
            }
        }
    }

    fn mark_closed(&self) {
        let mut state = self.inner.write().unwrap();
        state.phase = ConnectionPhase::Closed;
        state.identity = None;
        self.phase_tx.send_replace(state.phase);
    }
}

/// Observer of lifecycle events, registered once at startup. Keeps the
/// transition triggers explicit instead of hiding them in callbacks on
/// the chat client.
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    async fn on_ready(&self, identity: &BotIdentity);
    async fn on_group_joined(&self, scope: &GroupScope);
}

/// Default observer: announces lifecycle events in the log, including
/// the configured notification channel (or its absence) once ready.
pub struct LoggingObserver {
    state: StateHandle,
}

impl LoggingObserver {
    pub fn new(state: StateHandle) -> Self {
        Self { state }
    }
}

#[async_trait]
impl LifecycleObserver for LoggingObserver {
    async fn on_ready(&self, identity: &BotIdentity) {
        info!("Bot connected as {}", identity);
        match self.state.target_channel() {
            Some(channel) => info!("Notification channel: {}", channel),
            None => warn!("No notification channel configured; dispatch will fail"),
        }
    }

    async fn on_group_joined(&self, scope: &GroupScope) {
        info!("Joined group '{}'", scope.name);
    }
}

/// Owns the chat session: starts it, tracks readiness, closes it.
pub struct LifecycleManager {
    backend: Arc<dyn ChatBackend>,
    state: StateHandle,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl LifecycleManager {
    pub fn new(backend: Arc<dyn ChatBackend>, state: StateHandle) -> Self {
        Self {
            backend,
            state,
            observers: Vec::new(),
        }
    }

    /// Registers an observer. Call before `start`; registration is not
    /// supported on a live connection.
    pub fn register_observer(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Performs the handshake and transitions to `Ready` on success.
    ///
    /// Suspends until the backend acknowledges or rejects the
    /// credential. No auto-retry; a failed handshake lands back on
    /// `Disconnected` and retry is the caller's call.
    pub async fn start(&self, credential: Option<&str>) -> Result<(), LifecycleError> {
        let credential = credential.ok_or(LifecycleError::MissingCredential)?;

        if !self.state.begin_connecting() {
            warn!(
                "start() called in phase {:?}, ignoring",
                self.state.phase()
            );
            return Ok(());
        }

        match self.backend.connect(credential).await {
            Ok(identity) => {
                if !self.state.mark_ready(identity.clone()) {
                    // close() ran while the handshake was in flight
                    info!("Connection closed before handshake completed");
                    return Ok(());
                }
                for observer in &self.observers {
                    observer.on_ready(&identity).await;
                }
                Ok(())
            }
            Err(e) => {
                self.state.mark_disconnected();
                Err(LifecycleError::AuthenticationFailed(e.to_string()))
            }
        }
    }

    /// Tears the session down. Idempotent: closing an already-closed
    /// connection is a no-op.
    pub async fn close(&self) {
        if !self.state.begin_closing() {
            return;
        }
        self.backend.disconnect().await;
        self.state.mark_closed();
        info!("Chat connection closed");
    }

    /// Handles the bot being added to a new group: notifies observers,
    /// then sends a one-time onboarding message to the discovered
    /// channel. Failures are logged and swallowed; a bad onboarding
    /// send must not destabilize the connection.
    pub async fn handle_group_joined(&self, scope: &GroupScope) {
        for observer in &self.observers {
            observer.on_group_joined(scope).await;
        }

        let Some(channel) = resolver::resolve_discovery(scope) else {
            warn!("No sendable channel in group '{}', skipping welcome", scope.name);
            return;
        };

        match self
            .backend
            .send_message(&channel, &welcome_message(scope))
            .await
        {
            Ok(()) => info!("Welcome message sent to channel {} in '{}'", channel, scope.name),
            Err(e) => error!(
                "Failed to send welcome message to channel {} in '{}': {}",
                channel, scope.name, e
            ),
        }
    }
}

fn welcome_message(scope: &GroupScope) -> String {
    format!(
        "👋 ¡Hola, {}! Soy el bot de notificaciones de Git.\n\
         Configura un webhook de GitHub o GitLab y publicaré aquí los nuevos commits.",
        scope.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, GroupChannel};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Backend stub with scriptable connect behavior and a record of
    /// every message it was asked to send.
    struct StubBackend {
        reject_credential: bool,
        fail_sends: bool,
        hold_connect: Option<Arc<Notify>>,
        sent: Mutex<Vec<(ChannelId, String)>>,
    }

    impl StubBackend {
        fn new() -> Self {
            Self {
                reject_credential: false,
                fail_sends: false,
                hold_connect: None,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(ChannelId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for StubBackend {
        async fn connect(&self, _credential: &str) -> Result<BotIdentity, BackendError> {
            if let Some(gate) = &self.hold_connect {
                gate.notified().await;
            }
            if self.reject_credential {
                return Err(BackendError::Unauthorized);
            }
            Ok(BotIdentity {
                username: "relay-bot".to_string(),
            })
        }

        async fn send_message(
            &self,
            channel: &ChannelId,
            content: &str,
        ) -> Result<(), BackendError> {
            if self.fail_sends {
                return Err(BackendError::Status(403));
            }
            self.sent
                .lock()
                .unwrap()
                .push((channel.clone(), content.to_string()));
            Ok(())
        }

        async fn channel_accessible(&self, _channel: &ChannelId) -> bool {
            true
        }

        async fn disconnect(&self) {}
    }

    fn manager_with(backend: Arc<StubBackend>) -> LifecycleManager {
        LifecycleManager::new(backend, StateHandle::new(None))
    }

    fn joined_scope() -> GroupScope {
        GroupScope {
            name: "acme".to_string(),
            system_channel: Some(ChannelId("general".to_string())),
            channels: vec![GroupChannel {
                id: ChannelId("general".to_string()),
                name: "#general".to_string(),
                can_send: true,
            }],
        }
    }

    #[tokio::test]
    async fn start_reaches_ready_and_records_identity() {
        let manager = manager_with(Arc::new(StubBackend::new()));
        manager.start(Some("token")).await.unwrap();
        assert!(manager.is_ready());
        assert_eq!(
            manager.state().identity().map(|i| i.username),
            Some("relay-bot".to_string())
        );
    }

    #[tokio::test]
    async fn missing_credential_fails_without_transition() {
        let manager = manager_with(Arc::new(StubBackend::new()));
        let err = manager.start(None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::MissingCredential));
        assert_eq!(manager.state().phase(), ConnectionPhase::Disconnected);
    }

    #[tokio::test]
    async fn rejected_credential_returns_to_disconnected() {
        let backend = Arc::new(StubBackend {
            reject_credential: true,
            ..StubBackend::new()
        });
        let manager = manager_with(backend);
        let err = manager.start(Some("bad-token")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::AuthenticationFailed(_)));
        assert_eq!(manager.state().phase(), ConnectionPhase::Disconnected);
    }

    #[tokio::test]
    async fn wait_ready_wakes_on_the_ready_transition() {
        let manager = Arc::new(manager_with(Arc::new(StubBackend::new())));
        let state = manager.state().clone();

        let starter = manager.clone();
        tokio::spawn(async move { starter.start(Some("token")).await });

        assert!(state.wait_ready(Duration::from_secs(5)).await);
        assert!(manager.is_ready());
    }

    #[tokio::test]
    async fn wait_ready_times_out_when_nothing_connects() {
        let state = StateHandle::new(None);
        assert!(!state.wait_ready(Duration::from_millis(10)).await);
        assert_eq!(state.phase(), ConnectionPhase::Disconnected);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let manager = manager_with(Arc::new(StubBackend::new()));
        manager.start(Some("token")).await.unwrap();
        manager.close().await;
        assert_eq!(manager.state().phase(), ConnectionPhase::Closed);
        manager.close().await;
        assert_eq!(manager.state().phase(), ConnectionPhase::Closed);
    }

    #[tokio::test]
    async fn close_during_handshake_ends_closed_not_ready() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(StubBackend {
            hold_connect: Some(gate.clone()),
            ..StubBackend::new()
        });
        let manager = Arc::new(manager_with(backend));

        let starter = manager.clone();
        let start_task = tokio::spawn(async move { starter.start(Some("token")).await });
        // let start() reach the handshake suspension point
        tokio::task::yield_now().await;
        assert_eq!(manager.state().phase(), ConnectionPhase::Connecting);

        manager.close().await;
        gate.notify_one();
        start_task.await.unwrap().unwrap();

        assert_eq!(manager.state().phase(), ConnectionPhase::Closed);
    }

    #[derive(Default)]
    struct RecordingObserver {
        ready: Mutex<Vec<String>>,
        joined: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LifecycleObserver for RecordingObserver {
        async fn on_ready(&self, identity: &BotIdentity) {
            self.ready.lock().unwrap().push(identity.username.clone());
        }

        async fn on_group_joined(&self, scope: &GroupScope) {
            self.joined.lock().unwrap().push(scope.name.clone());
        }
    }

    #[tokio::test]
    async fn observers_see_ready_and_group_join_events() {
        let observer = Arc::new(RecordingObserver::default());
        let mut manager = manager_with(Arc::new(StubBackend::new()));
        manager.register_observer(observer.clone());

        manager.start(Some("token")).await.unwrap();
        manager.handle_group_joined(&joined_scope()).await;

        assert_eq!(*observer.ready.lock().unwrap(), vec!["relay-bot"]);
        assert_eq!(*observer.joined.lock().unwrap(), vec!["acme"]);
    }

    #[tokio::test]
    async fn group_join_sends_welcome_to_resolved_channel() {
        let backend = Arc::new(StubBackend::new());
        let manager = manager_with(backend.clone());
        manager.start(Some("token")).await.unwrap();

        manager.handle_group_joined(&joined_scope()).await;

        let sent = backend.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChannelId("general".to_string()));
        assert!(sent[0].1.contains("acme"));
    }

    #[tokio::test]
    async fn failed_welcome_send_does_not_disturb_connection() {
        let backend = Arc::new(StubBackend {
            fail_sends: true,
            ..StubBackend::new()
        });
        let manager = manager_with(backend);
        manager.start(Some("token")).await.unwrap();

        manager.handle_group_joined(&joined_scope()).await;
        assert!(manager.is_ready());
    }

    #[tokio::test]
    async fn group_without_sendable_channel_is_a_no_op() {
        let backend = Arc::new(StubBackend::new());
        let manager = manager_with(backend.clone());
        manager.start(Some("token")).await.unwrap();

        let scope = GroupScope {
            name: "locked".to_string(),
            system_channel: None,
            channels: vec![GroupChannel {
                id: ChannelId("general".to_string()),
                name: "#general".to_string(),
                can_send: false,
            }],
        };
        manager.handle_group_joined(&scope).await;
        assert!(backend.sent().is_empty());
    }
}
