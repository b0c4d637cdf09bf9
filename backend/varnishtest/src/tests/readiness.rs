use crate::error::protocol::ProtocolError;
use crate::error::readiness::ReadinessError;
use crate::readiness::{CHILD_RUNNING, CHILD_STOPPED, ReadinessPoller, ReadinessState};
use crate::tests::scripted::ScriptedDispatcher;

use std::time::Duration;

const TICK: Duration = Duration::from_millis(1);

/// **VALUE**: Verifies that a stopped child ends the poll on the first answer.
///
/// **WHY THIS MATTERS**: A child that stopped will never become ready. Retrying would
/// hang the caller until an outer timeout fires, hiding the real failure.
#[tokio::test]
async fn given_child_stopped_on_first_status_when_polling_then_fails_without_retry() {
    // GIVEN: A dispatcher that reports the stopped state
    let mut dispatcher = ScriptedDispatcher::new([(200, CHILD_STOPPED)]);
    let mut poller = ReadinessPoller::new(TICK);

    // WHEN: Polling until terminal
    let result = poller.run(&mut dispatcher).await;

    // THEN: Failed after exactly one query
    assert!(matches!(result, Err(ReadinessError::ChildStopped { .. })));
    assert_eq!(poller.state(), &ReadinessState::Failed);
    assert_eq!(poller.status_queries(), 1);
    assert_eq!(dispatcher.sent, ["status"]);
}

/// **VALUE**: Verifies the happy path: not yet running, then running, then address lookup.
///
/// **BUG THIS CATCHES**: Would catch an extra sleep/poll after the running state, or a
/// base URL built from the wrong fields of the listen address response.
#[tokio::test]
async fn given_one_pending_status_then_running_when_polling_then_resolves_base_url() {
    // GIVEN: One non-matching body, the running body, then a listen address
    let mut dispatcher = ScriptedDispatcher::new([
        (200, "Child in state starting"),
        (200, CHILD_RUNNING),
        (200, "a0 127.0.0.1 8080\n"),
    ]);
    let mut poller = ReadinessPoller::new(TICK);

    // WHEN: Polling until terminal
    let base_url = poller.run(&mut dispatcher).await.unwrap();

    // THEN: URL resolved with exactly one intervening poll
    assert_eq!(base_url, "http://127.0.0.1:8080");
    assert_eq!(poller.status_queries(), 2);
    assert_eq!(
        dispatcher.sent,
        ["status", "status", "debug.listen_address"]
    );
    assert_eq!(
        poller.state(),
        &ReadinessState::Ready("http://127.0.0.1:8080".to_string())
    );
    assert_eq!(dispatcher.remaining(), 0);
}

#[tokio::test]
async fn given_non_ok_status_when_polling_then_fails_with_status_error() {
    let mut dispatcher = ScriptedDispatcher::new([(300, "Cannot do that")]);
    let mut poller = ReadinessPoller::new(TICK);

    let result = poller.run(&mut dispatcher).await;

    match result {
        Err(ReadinessError::Status {
            status, message, ..
        }) => {
            assert_eq!(status, 300);
            assert_eq!(message, "Cannot do that");
        }
        other => panic!("Expected Status error, got {other:?}"),
    }
    assert_eq!(poller.state(), &ReadinessState::Failed);
}

/// Matching is exact equality, never prefix or substring.
#[tokio::test]
async fn given_body_that_only_contains_running_line_when_ticked_then_stays_loading() {
    let mut dispatcher = ScriptedDispatcher::new([
        (200, "Child in state running, almost"),
        (200, "Child in state stopped!"),
    ]);
    let mut poller = ReadinessPoller::new(TICK);

    poller.tick(&mut dispatcher).await.unwrap();
    assert_eq!(poller.state(), &ReadinessState::Loading);

    poller.tick(&mut dispatcher).await.unwrap();
    assert_eq!(poller.state(), &ReadinessState::Loading);
    assert!(!poller.state().is_terminal());
}

#[tokio::test]
async fn given_dispatcher_failure_mid_poll_when_polling_then_surfaces_protocol_error() {
    let mut dispatcher = ScriptedDispatcher::new([(200, "Child in state starting")]);
    let mut poller = ReadinessPoller::new(TICK);

    let result = poller.run(&mut dispatcher).await;

    assert!(matches!(
        result,
        Err(ReadinessError::Protocol(ProtocolError::Closed { .. }))
    ));
    assert_eq!(poller.status_queries(), 2);
    assert_eq!(poller.state(), &ReadinessState::Failed);
}

#[tokio::test]
async fn given_unparseable_listen_address_when_running_then_fails() {
    let mut dispatcher = ScriptedDispatcher::new([(200, CHILD_RUNNING), (200, "garbage")]);
    let mut poller = ReadinessPoller::new(TICK);

    let result = poller.run(&mut dispatcher).await;

    assert!(matches!(
        result,
        Err(ReadinessError::Protocol(ProtocolError::ListenAddress { .. }))
    ));
    assert_eq!(poller.state(), &ReadinessState::Failed);
}
