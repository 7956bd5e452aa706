//! Production runtime tests
//!
//! Drive [`Relay`] over real files: a key file on disk, a JSON lines live
//! feed, a JSON lines inbox export and the JSON lines spool.

use std::{
    io::{BufReader, Cursor, Read},
    sync::{Arc, LazyLock},
    thread,
    time::Duration,
};

use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use sealpost_core::{
    EncryptionGate, EventKind, InboundMessage, KeyStore, MemoryKeyStore, OutboundEvent,
};
use sealpost_crypto::{DecryptionKey, decrypt};
use sealpost_relay::{
    Dispatcher, DispatcherConfig, FileKeyStore, JsonlEmitter, JsonlInbox, MemoryAudit,
    MemoryEmitter, Relay, RelayError, RelayRuntimeConfig, ReplayWindow, RunExit, SystemEnv,
    inbox::LineStats, spawn_jsonl_feed,
};
use tempfile::{TempDir, tempdir};
use tokio::sync::{mpsc, oneshot};

static KEY: LazyLock<DecryptionKey> = LazyLock::new(|| {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    DecryptionKey::generate(&mut rng, 2048).unwrap()
});

const FEED: &str = concat!(
    r#"{"kind":"text","sender":"+15550000","receivedAt":1700000000001,"body":"OTP 123456"}"#,
    "\n",
    "garbage\n",
    r#"{"kind":"binary_data","sender":"+15550001","receivedAt":1700000000002,"bytes":"AAEC"}"#,
    "\n",
    r#"{"kind":"multimedia_notice","sender":"+15550002","receivedAt":1700000000003,"#,
    r#""messageId":"m-1","transactionId":"t-1","sizeBytes":1024,"contentClass":"text"}"#,
    "\n",
);

fn config(dir: &TempDir) -> RelayRuntimeConfig {
    RelayRuntimeConfig {
        key_path: dir.path().join("public_key.pem"),
        out_path: dir.path().join("events.jsonl"),
        dispatcher: DispatcherConfig::default(),
    }
}

fn install_key(config: &RelayRuntimeConfig) {
    FileKeyStore::new(&config.key_path).set_validated(&KEY.public_key_pem().unwrap()).unwrap();
}

fn open_first_envelope(event: &OutboundEvent) -> Vec<u8> {
    let envelope = event.envelopes()[0];
    decrypt(&KEY, &envelope.ciphertext_bytes().unwrap()).unwrap().to_vec()
}

fn memory_relay(port: Arc<MemoryEmitter>, audit: Arc<MemoryAudit>) -> Relay<SystemEnv> {
    Relay::from_dispatcher(Dispatcher::new(
        EncryptionGate::new(Arc::new(MemoryKeyStore::with_key(KEY.public_key_pem().unwrap()))),
        port,
        audit,
        SystemEnv,
        DispatcherConfig::default(),
    ))
}

/// Input whose first read blocks until the paired sender is dropped.
struct StalledInput(std::sync::mpsc::Receiver<()>);

impl Read for StalledInput {
    fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
        let _ = self.0.recv();
        Ok(0)
    }
}

fn text(received_at: u64) -> InboundMessage {
    InboundMessage::Text {
        sender: "+1".to_string(),
        received_at,
        body: "hi".to_string(),
        sim_slot: None,
    }
}

#[tokio::test]
async fn zero_concurrency_is_a_config_error() {
    let dir = tempdir().unwrap();
    let mut config = config(&dir);
    config.dispatcher.max_in_flight = 0;

    let err = Relay::open(&config).await.err().unwrap();
    assert!(matches!(err, RelayError::Config(_)));
}

#[tokio::test]
async fn unwritable_spool_is_an_io_error() {
    let dir = tempdir().unwrap();
    let mut config = config(&dir);
    config.out_path = dir.path().join("missing").join("events.jsonl");

    let err = Relay::open(&config).await.err().unwrap();
    assert!(matches!(err, RelayError::Io(_)));
}

#[tokio::test]
async fn live_feed_is_sealed_into_the_spool() {
    let dir = tempdir().unwrap();
    let config = config(&dir);
    install_key(&config);

    let relay = Relay::open(&config).await.unwrap();
    let (live, feed) = spawn_jsonl_feed(Cursor::new(FEED.as_bytes().to_vec()), 4).unwrap();

    let exit = relay.run(live, std::future::pending()).await;
    assert_eq!(exit, RunExit::FeedClosed);

    let lines = feed.join().await.unwrap();
    assert_eq!((lines.accepted, lines.skipped), (3, 1));

    let spool = JsonlEmitter::read_all(&config.out_path).await.unwrap();
    assert_eq!(spool.len(), 3);

    let mut kinds: Vec<&str> = spool.iter().map(|line| line.event.as_str()).collect();
    kinds.sort_unstable();
    assert_eq!(kinds, vec!["mms:received", "sms:data-received", "sms:received"]);

    for line in &spool {
        assert_eq!(line.event, line.payload.event_kind());
        match &line.payload {
            OutboundEvent::Sms { .. } => {
                assert_eq!(open_first_envelope(&line.payload), b"OTP 123456");
            },
            OutboundEvent::SmsData { .. } => {
                // Binary payloads are base64'd before encryption
                assert_eq!(open_first_envelope(&line.payload), b"AAEC");
            },
            OutboundEvent::Mms { subject, carrier_message_id, .. } => {
                assert!(subject.is_none());
                assert_eq!(carrier_message_id, "m-1");
            },
        }
    }

    let raw = std::fs::read_to_string(&config.out_path).unwrap();
    assert!(!raw.contains("OTP 123456"));
    assert_eq!(relay.dispatcher().stats().emitted, 3);
}

#[tokio::test]
async fn key_file_rotation_applies_to_the_next_message() {
    let dir = tempdir().unwrap();
    let config = config(&dir);
    let relay = Relay::open(&config).await.unwrap();

    relay.dispatcher().submit(text(1));
    relay.dispatcher().drain().await;
    assert_eq!(relay.dispatcher().stats().not_configured, 1);

    install_key(&config);
    relay.dispatcher().submit(text(2));
    relay.dispatcher().drain().await;

    let spool = JsonlEmitter::read_all(&config.out_path).await.unwrap();
    assert_eq!(spool.len(), 1);
    assert_eq!(spool[0].event, EventKind::SmsReceived);
    assert_eq!(spool[0].payload.received_at(), 2);
}

#[tokio::test]
async fn replay_reads_an_inbox_export() {
    let dir = tempdir().unwrap();
    let config = config(&dir);
    install_key(&config);

    let inbox_path = dir.path().join("inbox.jsonl");
    std::fs::write(&inbox_path, FEED).unwrap();

    let relay = Relay::open(&config).await.unwrap();
    let window = ReplayWindow::new(1_700_000_000_002, 1_700_000_000_003).unwrap();
    let summary = relay.replay(JsonlInbox::new(&inbox_path), window).await.unwrap();
    relay.dispatcher().drain().await;

    assert_eq!(summary.submitted, 2);
    assert_eq!(JsonlEmitter::read_all(&config.out_path).await.unwrap().len(), 2);
}

#[tokio::test]
async fn replay_of_missing_export_fails_without_submitting() {
    let dir = tempdir().unwrap();
    let config = config(&dir);
    let relay = Relay::open(&config).await.unwrap();

    let window = ReplayWindow::new(0, u64::MAX).unwrap();
    let err = relay.replay(JsonlInbox::new(dir.path().join("nope.jsonl")), window).await;

    assert!(matches!(err, Err(RelayError::Replay(_))));
    assert_eq!(relay.dispatcher().stats().submitted, 0);
}

#[tokio::test]
async fn shutdown_aborts_in_flight_messages() {
    let port = Arc::new(MemoryEmitter::with_delay(Duration::from_secs(3600)));
    let audit = Arc::new(MemoryAudit::new());
    let relay = memory_relay(port.clone(), audit.clone());

    let (tx, live) = mpsc::channel(8);
    let (stop, stopped) = oneshot::channel::<()>();

    let sender = tokio::spawn(async move {
        for i in 0..3 {
            tx.send(text(i)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.send(()).unwrap();
        // Keep the feed open so only the shutdown can end the run
        tokio::time::sleep(Duration::from_secs(3600)).await;
        drop(tx);
    });

    let exit = relay
        .run(live, async {
            let _ = stopped.await;
        })
        .await;
    sender.abort();

    assert_eq!(exit, RunExit::Shutdown { cancelled: 3, unsubmitted: 0 });
    assert!(port.is_empty());
    assert!(audit.is_empty());
    assert_eq!(relay.dispatcher().stats().cancelled, 3);
}

#[tokio::test]
async fn shutdown_discards_buffered_live_messages() {
    let port = Arc::new(MemoryEmitter::new());
    let audit = Arc::new(MemoryAudit::new());
    let relay = memory_relay(port.clone(), audit.clone());

    let (tx, live) = mpsc::channel(8);
    for i in 0..3 {
        tx.try_send(text(i)).unwrap();
    }

    let exit = relay.run(live, std::future::ready(())).await;

    assert_eq!(exit, RunExit::Shutdown { cancelled: 0, unsubmitted: 3 });
    assert!(tx.is_closed());
    assert!(port.is_empty());
    assert!(audit.is_empty());
    assert_eq!(relay.dispatcher().stats().submitted, 0);
}

#[test]
fn blocked_reader_does_not_hold_up_runtime_exit() {
    let (release, stalled) = std::sync::mpsc::channel::<()>();
    let (done, finished) = std::sync::mpsc::channel();

    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let feed = runtime.block_on(async {
            let input = BufReader::new(StalledInput(stalled));
            let (live, feed) = spawn_jsonl_feed(input, 4).unwrap();
            let relay = memory_relay(Arc::new(MemoryEmitter::new()), Arc::new(MemoryAudit::new()));

            let exit = relay.run(live, std::future::ready(())).await;
            assert_eq!(exit, RunExit::Shutdown { cancelled: 0, unsubmitted: 0 });
            feed
        });

        drop(runtime);
        let _ = done.send(feed);
    });

    let feed = finished.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(!feed.is_finished());

    drop(release);
    let lines = tokio::runtime::Runtime::new().unwrap().block_on(feed.join()).unwrap();
    assert_eq!(lines, LineStats::default());
}
