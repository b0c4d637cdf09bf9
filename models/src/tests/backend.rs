use crate::{BackendSpec, ModelError};

/// **VALUE**: Verifies that an https URL without a port maps to port 443 with TLS on.
///
/// **WHY THIS MATTERS**: The generated VCL stanza splices the port in verbatim. If the
/// default port were missing, `vcl.inline` would be rejected and startup would abort.
#[test]
fn given_https_url_without_port_when_parsed_then_defaults_to_443_with_tls() {
    // GIVEN: An https URL with no explicit port
    let url = "https://example.com";

    // WHEN: Parsing a backend from it
    let backend = BackendSpec::from_url("origin", url).unwrap();

    // THEN: Host, default port and TLS are filled in
    assert_eq!(backend.name(), "origin");
    assert_eq!(backend.host(), "example.com");
    assert_eq!(backend.port(), "443");
    assert!(backend.tls());
}

#[test]
fn given_http_url_with_port_when_parsed_then_keeps_explicit_port() {
    let backend = BackendSpec::from_url("svr", "http://h:8080").unwrap();

    assert_eq!(backend.host(), "h");
    assert_eq!(backend.port(), "8080");
    assert!(!backend.tls());
}

#[test]
fn given_http_url_without_port_when_parsed_then_defaults_to_80() {
    let backend = BackendSpec::from_url("svr", "http://h").unwrap();

    assert_eq!(backend.port(), "80");
    assert!(!backend.tls());
}

/// **VALUE**: Verifies that an explicit default port survives `Url::port()` returning None.
///
/// **BUG THIS CATCHES**: Would catch a regression where `http://h:80` produced an empty
/// port because the url crate elides default ports.
#[test]
fn given_url_with_explicit_default_port_when_parsed_then_reports_that_port() {
    let plain = BackendSpec::from_url("a", "http://h:80").unwrap();
    let tls = BackendSpec::from_url("b", "https://h:443").unwrap();

    assert_eq!(plain.port(), "80");
    assert_eq!(tls.port(), "443");
}

#[test]
fn given_ipv6_url_when_parsed_then_host_has_no_brackets() {
    let backend = BackendSpec::from_url("v6", "http://[::1]:9000").unwrap();

    assert_eq!(backend.host(), "::1");
    assert_eq!(backend.port(), "9000");
}

#[test]
fn given_url_with_path_when_parsed_then_path_is_ignored() {
    let backend = BackendSpec::from_url("svr", "http://127.0.0.1:34567/some/path").unwrap();

    assert_eq!(backend.host(), "127.0.0.1");
    assert_eq!(backend.port(), "34567");
}

#[test]
fn given_unsupported_scheme_when_parsed_then_returns_validation_error() {
    let result = BackendSpec::from_url("svr", "ftp://h:21");

    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert!(message.contains("ftp"), "Message should name the scheme: {message}");
        }
        Ok(backend) => panic!("Expected validation error, got {backend:?}"),
    }
}

#[test]
fn given_garbage_url_when_parsed_then_returns_validation_error() {
    assert!(BackendSpec::from_url("svr", "not a url").is_err());
}

#[test]
fn given_invalid_backend_names_when_parsed_then_rejected() {
    for name in ["", "1abc", "has space", "semi;colon"] {
        assert!(
            BackendSpec::from_url(name, "http://h").is_err(),
            "Name should be rejected: {name:?}"
        );
    }
}
