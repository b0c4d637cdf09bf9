use crate::ErrorLocation;
use std::panic::Location;

#[track_caller]
fn raise() -> ErrorLocation {
    ErrorLocation::from(Location::caller())
}

/// **VALUE**: Verifies that a location built inside a `#[track_caller]` helper
/// points at the helper's caller.
///
/// **WHY THIS MATTERS**: Every error in the workspace carries an ErrorLocation. If capture
/// stops at the helper, a failed handshake and a rejected `vcl.use` report the same line.
#[test]
fn given_track_caller_helper_when_capturing_then_reports_call_site() {
    let (location, expected_line) = (raise(), line!());

    assert!(location.file.ends_with("error_location.rs"));
    assert_eq!(location.line, expected_line);
    assert!(location.column > 0);
}

#[test]
fn given_two_call_sites_when_capturing_then_lines_differ() {
    let first = raise();
    let second = raise();

    assert_eq!(first.file, second.file);
    assert_eq!(first.line + 1, second.line);
    assert_ne!(first, second);
}

#[test]
fn given_known_coordinates_when_displayed_then_is_bracketed_triple() {
    let location = ErrorLocation {
        file: "backend/varnishtest/src/handshake.rs",
        line: 112,
        column: 17,
    };

    assert_eq!(
        location.to_string(),
        "[backend/varnishtest/src/handshake.rs:112:17]"
    );
}
