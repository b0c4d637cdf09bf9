use crate::helpers::fake_varnishd::{FakeVarnishd, Received, TEST_NONCE, TEST_SECRET};

use varnishtest::SupervisorConfig;
use varnishtest::VarnishBuilder;
use varnishtest::VarnishError;
use varnishtest::dispatch::SocketDispatcher;
use varnishtest::error::{AuthError, CommandError};
use varnishtest::handshake::{auth_token, secret_path};
use varnishtest::instance::startup::{load_command, serve_on_channel};

use common::RedactedSecret;

use std::path::PathBuf;

use tempfile::TempDir;
use tokio::io::{DuplexStream, duplex};

// ============================================================================
// Startup sequence against a scripted management peer
// These drive everything after the accept: handshake, load, use, start, poll
// ============================================================================

const RUNNING: &str = "Child in state running";

fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        poll_interval_ms: 1,
        secret_wait_ms: 200,
        ..SupervisorConfig::default()
    }
}

fn work_dir_with_secret() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let secret = secret_path(dir.path());
    std::fs::write(&secret, TEST_SECRET).unwrap();
    (dir, secret)
}

fn channel() -> (SocketDispatcher<DuplexStream>, DuplexStream) {
    let (ours, theirs) = duplex(64 * 1024);
    (SocketDispatcher::new(ours), theirs)
}

fn happy_script() -> Vec<(u16, &'static str)> {
    vec![
        (200, "-----------------------------\nVarnish Cache CLI 1.0\n-----------------------------"),
        (200, "VCL compiled."),
        (200, "VCL 'vcl1' now active"),
        (200, ""),
        (200, "Child in state starting"),
        (200, RUNNING),
        (200, "a0 127.0.0.1 6081\n"),
    ]
}

fn expected_auth_line() -> String {
    let secret = RedactedSecret::new(TEST_SECRET.to_vec());
    format!("auth {}", auth_token(TEST_NONCE, &secret))
}

fn lines(received: &[Received]) -> Vec<&str> {
    received.iter().map(|r| r.line.as_str()).collect()
}

/// **VALUE**: Verifies the full startup sequence in order, and the base URL it yields.
///
/// **WHY THIS MATTERS**: varnishd refuses every command before `auth`, and `start`
/// before an active configuration. Any reordering breaks every test that uses the
/// library.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The auth digest is computed over the wrong byte sequence
/// - The configuration is sent without the version header or backend stanza
/// - Polling continues after the running state
#[tokio::test]
async fn given_cooperative_peer_when_serving_channel_then_runs_full_sequence() {
    // GIVEN: A scripted peer and a builder with one backend
    let (_dir, secret) = work_dir_with_secret();
    let (mut dispatcher, theirs) = channel();
    let peer = FakeVarnishd::new(happy_script()).spawn(theirs);
    let builder = VarnishBuilder::new()
        .backend("origin", "http://127.0.0.1:8080")
        .unwrap()
        .vcl_string("sub vcl_recv { return (pass); }\n");

    // WHEN: Running everything after the accept
    let base_url = serve_on_channel(&mut dispatcher, &secret, &load_command(&builder), &fast_config())
        .await
        .unwrap();
    drop(dispatcher);
    let received = peer.await.unwrap();

    // THEN: Ready at the reported address after the exact command sequence
    assert_eq!(base_url, "http://127.0.0.1:6081");
    assert_eq!(
        lines(&received),
        [
            expected_auth_line().as_str(),
            "vcl.inline vcl1",
            "vcl.use vcl1",
            "start",
            "status",
            "status",
            "debug.listen_address",
        ]
    );
    let body = received[1].body.as_deref().unwrap();
    assert!(body.starts_with("vcl 4.1;\n\nbackend origin {\n\t.host = \"127.0.0.1\";"));
    assert!(body.ends_with("sub vcl_recv { return (pass); }\n"));
}

/// **VALUE**: Verifies that a frame split into single bytes is reassembled.
///
/// **BUG THIS CATCHES**: Would catch a reader that assumes one read returns a
/// whole header or a whole body.
#[tokio::test]
async fn given_peer_writing_one_byte_at_a_time_when_serving_channel_then_still_ready() {
    let (_dir, secret) = work_dir_with_secret();
    let (mut dispatcher, theirs) = channel();
    let peer = FakeVarnishd::new(happy_script()).fragmented().spawn(theirs);
    let load = load_command(&VarnishBuilder::new());

    let base_url = serve_on_channel(&mut dispatcher, &secret, &load, &fast_config())
        .await
        .unwrap();
    drop(dispatcher);

    assert_eq!(base_url, "http://127.0.0.1:6081");
    assert_eq!(peer.await.unwrap().len(), 7);
}

/// **VALUE**: Verifies that a short challenge fails before anything is sent.
///
/// **WHY THIS MATTERS**: Answering a truncated challenge would hash garbage and
/// leak a digest of the secret to whatever is on the other end.
#[tokio::test]
async fn given_twenty_byte_challenge_when_serving_channel_then_fails_without_commands() {
    let (_dir, secret) = work_dir_with_secret();
    let (mut dispatcher, theirs) = channel();
    let peer = FakeVarnishd::new(happy_script())
        .banner(b"abcdefghijklmnopqrst")
        .spawn(theirs);
    let load = load_command(&VarnishBuilder::new());

    let result = serve_on_channel(&mut dispatcher, &secret, &load, &fast_config()).await;
    drop(dispatcher);

    match result {
        Err(VarnishError::Auth(AuthError::NonceTooShort {
            length, required, ..
        })) => {
            assert_eq!(length, 20);
            assert_eq!(required, 32);
        }
        other => panic!("Expected NonceTooShort, got {other:?}"),
    }
    assert!(peer.await.unwrap().is_empty());
}

#[tokio::test]
async fn given_peer_rejecting_digest_when_serving_channel_then_auth_is_rejected() {
    let (_dir, secret) = work_dir_with_secret();
    let (mut dispatcher, theirs) = channel();
    let peer = FakeVarnishd::new([(107, "Authentication required.")]).spawn(theirs);
    let load = load_command(&VarnishBuilder::new());

    let result = serve_on_channel(&mut dispatcher, &secret, &load, &fast_config()).await;
    drop(dispatcher);

    assert!(matches!(
        result,
        Err(VarnishError::Auth(AuthError::Rejected { status: 107, .. }))
    ));
    assert_eq!(peer.await.unwrap().len(), 1);
}

/// **BUG THIS CATCHES**: Would catch `vcl.use` or `start` being sent after a
/// configuration that failed to compile.
#[tokio::test]
async fn given_compile_failure_when_serving_channel_then_stops_at_load() {
    let (_dir, secret) = work_dir_with_secret();
    let (mut dispatcher, theirs) = channel();
    let peer = FakeVarnishd::new([
        (200, "Welcome"),
        (106, "Message from VCC-compiler:\nExpected an action, 'if', '{' or '}'"),
    ])
    .spawn(theirs);
    let load = load_command(&VarnishBuilder::new().vcl_string("sub vcl_recv { nonsense }"));

    let result = serve_on_channel(&mut dispatcher, &secret, &load, &fast_config()).await;
    drop(dispatcher);

    match result {
        Err(VarnishError::Command(CommandError::Rejected {
            status, message, ..
        })) => {
            assert_eq!(status, 106);
            assert!(message.contains("VCC-compiler"));
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }
    let received = peer.await.unwrap();
    assert_eq!(&lines(&received)[1..], ["vcl.inline vcl1"]);
}

#[tokio::test]
async fn given_missing_secret_file_when_serving_channel_then_fails_with_secret_error() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, theirs) = channel();
    let peer = FakeVarnishd::new(happy_script()).spawn(theirs);
    let config = SupervisorConfig {
        secret_wait_ms: 20,
        ..fast_config()
    };
    let load = load_command(&VarnishBuilder::new());

    let result = serve_on_channel(&mut dispatcher, &secret_path(dir.path()), &load, &config).await;
    drop(dispatcher);

    assert!(matches!(
        result,
        Err(VarnishError::Auth(AuthError::Secret { .. }))
    ));
    assert!(peer.await.unwrap().is_empty());
}
