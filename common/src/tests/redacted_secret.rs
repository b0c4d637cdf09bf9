use crate::RedactedSecret;

/// **VALUE**: Verifies that neither Debug nor Display print the secret bytes.
///
/// **WHY THIS MATTERS**: The varnishd secret is the only thing standing between a local
/// user and the management interface. A `debug!("{secret:?}")` must never leak it.
#[test]
fn given_secret_when_formatted_then_contents_are_redacted() {
    // GIVEN: A secret with recognizable content
    let secret = RedactedSecret::new(b"hunter2-management-secret".to_vec());

    // WHEN: Formatting with Debug and Display
    let debug = format!("{secret:?}");
    let display = format!("{secret}");

    // THEN: Neither representation contains the secret
    assert!(!debug.contains("hunter2"));
    assert!(!display.contains("hunter2"));
    assert!(debug.contains("25 bytes"), "Length is safe to show: {debug}");
}

#[test]
fn given_secret_when_serialized_then_returns_error() {
    let secret = RedactedSecret::new(b"abc".to_vec());

    let result = serde_json::to_string(&secret);

    assert!(result.is_err(), "Serialization must be refused");
}

#[test]
fn given_secret_bytes_when_exposed_then_returns_exact_bytes() {
    let secret = RedactedSecret::new(vec![0x00, 0xff, b'\n']);

    assert_eq!(secret.expose(), &[0x00, 0xff, b'\n']);
    assert_eq!(secret.len(), 3);
    assert!(!secret.is_empty());
}
