use crate::protocol::AdmCommand;
use crate::protocol::command::quote;

/// **VALUE**: Verifies that the auth digest never reaches the logs.
#[test]
fn given_auth_command_when_displayed_then_argument_is_redacted() {
    let command = AdmCommand::new("auth").arg("0123456789abcdef");

    let shown = command.to_string();

    assert_eq!(shown, "auth [REDACTED]");
    assert!(!shown.contains("0123456789abcdef"));
}

#[test]
fn given_command_with_body_when_displayed_then_shows_size_not_content() {
    let command = AdmCommand::new("vcl.inline")
        .arg("vcl1")
        .with_body("backend default none;");

    assert_eq!(command.to_string(), "vcl.inline vcl1 << [21 bytes]");
}

#[test]
fn given_plain_word_when_quoted_then_is_unchanged() {
    assert_eq!(quote("/etc/varnish/default.vcl"), "/etc/varnish/default.vcl");
}

#[test]
fn given_arguments_needing_quotes_when_quoted_then_are_escaped() {
    assert_eq!(quote("/tmp/my dir/x.vcl"), "\"/tmp/my dir/x.vcl\"");
    assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    assert_eq!(quote("a\\b"), "\"a\\\\b\"");
    assert_eq!(quote(""), "\"\"");
}
