use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kaiwa::config::{KaiwaConfig, PracticeMode, RealtimeConfiguration, SpeechSettings};
use kaiwa::credential::{ClientCredential, CredentialSource, HttpCredentialSource};
use kaiwa::error::{KaiwaError, Result};
use kaiwa::session::SessionInitiator;
use kaiwa::transport::memory::{self, MemoryPeer};
use kaiwa::transport::{DataChannel, RealtimeConnector};
use serde_json::json;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Hands out one prepared memory channel and counts connection attempts.
struct CountingConnector {
    calls: AtomicUsize,
    seen_secret: Mutex<Option<String>>,
    channel: Mutex<Option<memory::MemoryChannel>>,
}

impl CountingConnector {
    fn new(channel: memory::MemoryChannel) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            seen_secret: Mutex::new(None),
            channel: Mutex::new(Some(channel)),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealtimeConnector for CountingConnector {
    async fn connect(
        &self,
        credential: &ClientCredential,
        _config: &RealtimeConfiguration,
    ) -> Result<Box<dyn DataChannel>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_secret.lock().unwrap() = Some(credential.secret().to_string());
        let channel = self
            .channel
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| KaiwaError::Transport("connector already used".into()))?;
        Ok(Box::new(channel))
    }
}

fn config_for(server: &MockServer) -> KaiwaConfig {
    KaiwaConfig::default()
        .with_api_base_url(server.uri())
        .with_speech(SpeechSettings {
            mode: PracticeMode::Travel,
            ..SpeechSettings::default()
        })
}

async fn mount_session_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "client_secret": {"value": "ek_test_123", "expires_at": 4_102_444_800i64}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn failed_credential_fetch_never_attempts_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (channel, _peer) = memory::open_pair();
    let connector = CountingConnector::new(channel);
    let initiator = SessionInitiator::new(
        Arc::new(HttpCredentialSource::new(&config).unwrap()),
        connector.clone(),
        &config,
    );

    let err = initiator.start().await.err().expect("start should fail");
    assert!(matches!(err, KaiwaError::Api { status: 500, .. }));
    assert!(err.is_user_facing());
    assert_eq!(connector.calls(), 0);
}

#[tokio::test]
async fn unauthorized_credential_fetch_is_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "not signed in"})))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (channel, _peer) = memory::open_pair();
    let connector = CountingConnector::new(channel);
    let initiator = SessionInitiator::new(
        Arc::new(HttpCredentialSource::new(&config).unwrap()),
        connector.clone(),
        &config,
    );

    let err = initiator.start().await.err().unwrap();
    assert!(matches!(err, KaiwaError::Authentication(ref msg) if msg == "not signed in"));
    assert_eq!(connector.calls(), 0);
}

#[tokio::test]
async fn start_waits_for_open_then_sends_session_update() {
    let server = MockServer::start().await;
    mount_session_ok(&server).await;

    let config = config_for(&server);
    let (channel, mut peer): (_, MemoryPeer) = memory::pair();
    let connector = CountingConnector::new(channel);
    let initiator = SessionInitiator::new(
        Arc::new(HttpCredentialSource::new(&config).unwrap()),
        connector.clone(),
        &config,
    );

    let opener = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        peer.open();
        let update = timeout(Duration::from_secs(1), peer.recv_json())
            .await
            .expect("session.update should arrive")
            .expect("channel should stay open");
        (peer, update)
    });

    let _channel = initiator.start().await.expect("session should start");
    let (_peer, update) = opener.await.unwrap();

    assert_eq!(connector.calls(), 1);
    assert_eq!(
        connector.seen_secret.lock().unwrap().as_deref(),
        Some("ek_test_123")
    );
    assert_eq!(update["type"], "session.update");
    assert_eq!(update["session"]["modalities"], json!(["audio", "text"]));
    assert_eq!(update["session"]["turn_detection"]["type"], "server_vad");
    let instructions = update["session"]["instructions"].as_str().unwrap();
    assert!(instructions.contains("traveller"));
}

#[tokio::test]
async fn channel_that_never_opens_times_out() {
    let server = MockServer::start().await;
    mount_session_ok(&server).await;

    let mut config = config_for(&server);
    config.realtime.open_timeout = Duration::from_millis(50);
    let (channel, mut peer) = memory::pair();
    let connector = CountingConnector::new(channel);
    let initiator = SessionInitiator::new(
        Arc::new(HttpCredentialSource::new(&config).unwrap()),
        connector,
        &config,
    );

    let err = initiator.start().await.err().unwrap();
    assert!(matches!(err, KaiwaError::Timeout(50)));
    // The half-open channel was closed and nothing was sent.
    assert_eq!(timeout(Duration::from_secs(1), peer.recv()).await.unwrap(), None);
}

struct ExpiredCredential;

#[async_trait]
impl CredentialSource for ExpiredCredential {
    async fn fetch(&self) -> Result<ClientCredential> {
        Ok(ClientCredential::new("ek_old")
            .with_expiry(chrono::Utc::now() - chrono::Duration::minutes(1)))
    }
}

#[tokio::test]
async fn expired_credential_is_rejected_before_connecting() {
    let config = KaiwaConfig::default();
    let (channel, _peer) = memory::open_pair();
    let connector = CountingConnector::new(channel);
    let initiator = SessionInitiator::new(Arc::new(ExpiredCredential), connector.clone(), &config);

    let err = initiator.start().await.err().unwrap();
    assert!(matches!(err, KaiwaError::Authentication(_)));
    assert_eq!(connector.calls(), 0);
}

#[tokio::test]
async fn credential_parses_top_level_value_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "ek_flat"})))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let credential = HttpCredentialSource::new(&config)
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(credential.secret(), "ek_flat");
    assert_eq!(credential.expires_at(), None);
}

#[tokio::test]
async fn credential_without_secret_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = HttpCredentialSource::new(&config)
        .unwrap()
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, KaiwaError::Authentication(_)));
}
