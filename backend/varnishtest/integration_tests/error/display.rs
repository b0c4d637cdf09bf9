use varnishtest::error::{AuthError, ProtocolError, SpawnError};
use common::ErrorLocation;

use std::error::Error;
use std::io::Error as IoError;
use std::io::ErrorKind;
use std::panic::Location;

/// **VALUE**: Verifies that `SpawnError::Spawn` includes file/line/column location tracking.
///
/// **BUG THIS CATCHES**: Would catch if someone removes the location field from
/// the Display implementation, or drops the I/O source from the error chain.
#[test]
fn given_spawn_error_when_formatted_then_includes_location_and_source() {
    // GIVEN: A Spawn error with location
    let err = SpawnError::Spawn {
        message: "Failed to spawn varnishd".to_string(),
        location: ErrorLocation::from(Location::caller()),
        source: IoError::new(ErrorKind::NotFound, "binary not found"),
    };

    // WHEN: Formatting the error as string
    let error_string = err.to_string();

    // THEN: Should include error type, message, and file location
    assert!(error_string.contains("Spawn Error"));
    assert!(error_string.contains("Failed to spawn varnishd"));
    assert!(error_string.contains("display.rs"));
    assert_eq!(err.source().unwrap().to_string(), "binary not found");
}

#[test]
fn given_short_nonce_error_when_formatted_then_reports_both_lengths() {
    let err = AuthError::NonceTooShort {
        length: 20,
        required: 32,
        location: ErrorLocation::from(Location::caller()),
    };

    let error_string = err.to_string();

    assert!(error_string.contains("20 bytes"));
    assert!(error_string.contains("32"));
}

#[test]
fn given_bad_delimiter_when_formatted_then_shows_byte_in_hex() {
    let err = ProtocolError::Delimiter {
        found: b'x',
        location: ErrorLocation::from(Location::caller()),
    };

    assert!(err.to_string().contains("0x78"));
}

#[test]
fn given_protocol_error_inside_auth_error_when_formatted_then_is_transparent() {
    let inner = ProtocolError::Closed {
        message: "peer hung up".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };
    let expected = inner.to_string();

    let err = AuthError::from(inner);

    assert_eq!(err.to_string(), expected);
}
