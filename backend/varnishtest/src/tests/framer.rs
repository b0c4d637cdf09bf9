use crate::error::protocol::ProtocolError;
use crate::protocol::{AdmCommand, encode_command, parse_header, read_message};

use tokio::io::BufReader;
use tokio_test::io::Builder as MockBuilder;

/// **VALUE**: Verifies the basic frame: header, body, trailing delimiter.
///
/// **WHY THIS MATTERS**: Every response from varnishd goes through this path. The
/// delimiter must be consumed (or the next header read starts with a stray `\n`) but
/// must not leak into the body.
#[tokio::test]
async fn given_complete_frame_when_read_then_returns_status_and_body_without_delimiter() {
    // GIVEN: A header announcing 13 bytes followed by 13 bytes and the delimiter
    let mock = MockBuilder::new().read(b"200 13\nHello, world!\n").build();
    let mut reader = BufReader::new(mock);

    // WHEN: Reading one message
    let message = read_message(&mut reader).await.unwrap();

    // THEN: Status and body are exact
    assert_eq!(message.status(), 200);
    assert_eq!(message.body(), b"Hello, world!");
    assert_eq!(message.body().len(), 13);
}

/// **VALUE**: Verifies that a body split across several transport reads is reassembled.
///
/// **WHY THIS MATTERS**: A streaming socket may hand back any prefix of the body. A
/// reader that trusts one `read()` returns a short body and then misparses the rest of
/// the body as the next header.
///
/// **BUG THIS CATCHES**: Would catch replacing `read_exact` with a single `read`.
#[tokio::test]
async fn given_body_fragmented_across_reads_when_read_then_returns_complete_body() {
    // GIVEN: Header and body delivered in separate chunks
    let mock = MockBuilder::new()
        .read(b"200 13\n")
        .read(b"Hello, ")
        .read(b"world!")
        .read(b"\n")
        .build();
    let mut reader = BufReader::new(mock);

    // WHEN: Reading one message
    let message = read_message(&mut reader).await.unwrap();

    // THEN: The whole body arrives
    assert_eq!(message.body(), b"Hello, world!");
}

#[tokio::test]
async fn given_header_split_mid_line_when_read_then_parses_header() {
    let mock = MockBuilder::new()
        .read(b"20")
        .read(b"0 5")
        .read(b"\nhello\n")
        .build();
    let mut reader = BufReader::new(mock);

    let message = read_message(&mut reader).await.unwrap();

    assert_eq!(message.status(), 200);
    assert_eq!(message.body(), b"hello");
}

/// varnishd pads the header as `"%-3d %-8u\n"`.
#[tokio::test]
async fn given_padded_header_when_read_then_parses_fields() {
    let mock = MockBuilder::new().read(b"107 4       \nabcd\n").build();
    let mut reader = BufReader::new(mock);

    let message = read_message(&mut reader).await.unwrap();

    assert_eq!(message.status(), 107);
    assert_eq!(message.body(), b"abcd");
}

#[tokio::test]
async fn given_binary_body_with_newlines_when_read_then_is_preserved() {
    let mock = MockBuilder::new().read(b"200 5\na\nb\0c\n").build();
    let mut reader = BufReader::new(mock);

    let message = read_message(&mut reader).await.unwrap();

    assert_eq!(message.body(), b"a\nb\0c");
}

#[tokio::test]
async fn given_two_frames_back_to_back_when_read_then_each_is_separate() {
    let mock = MockBuilder::new()
        .read(b"200 2\nok\n300 4\nnope\n")
        .build();
    let mut reader = BufReader::new(mock);

    let first = read_message(&mut reader).await.unwrap();
    let second = read_message(&mut reader).await.unwrap();

    assert_eq!((first.status(), first.body()), (200, &b"ok"[..]));
    assert_eq!((second.status(), second.body()), (300, &b"nope"[..]));
}

#[tokio::test]
async fn given_channel_closed_before_header_when_read_then_returns_closed() {
    let mock = MockBuilder::new().build();
    let mut reader = BufReader::new(mock);

    let result = read_message(&mut reader).await;

    assert!(matches!(result, Err(ProtocolError::Closed { .. })));
}

/// **VALUE**: Verifies that a peer hanging up inside the header line is reported as a
/// closed channel rather than a malformed header.
#[tokio::test]
async fn given_channel_closed_mid_header_when_read_then_returns_closed() {
    let mock = MockBuilder::new().read(b"200 1").build();
    let mut reader = BufReader::new(mock);

    let result = read_message(&mut reader).await;

    assert!(matches!(result, Err(ProtocolError::Closed { .. })));
}

#[tokio::test]
async fn given_header_line_over_limit_when_read_then_returns_header_error() {
    let mock = MockBuilder::new().read(&[b'1'; 80]).build();
    let mut reader = BufReader::new(mock);

    let result = read_message(&mut reader).await;

    assert!(matches!(result, Err(ProtocolError::Header { .. })));
}

/// **VALUE**: Verifies that a body cut short by EOF is an I/O error, not a short body.
#[tokio::test]
async fn given_channel_closed_mid_body_when_read_then_returns_io_error() {
    let mock = MockBuilder::new().read(b"200 13\nHello").build();
    let mut reader = BufReader::new(mock);

    let result = read_message(&mut reader).await;

    match result {
        Err(ProtocolError::Io { source, .. }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
        }
        other => panic!("Expected Io error, got {other:?}"),
    }
}

#[tokio::test]
async fn given_wrong_trailing_byte_when_read_then_returns_delimiter_error() {
    let mock = MockBuilder::new().read(b"200 2\nabX").build();
    let mut reader = BufReader::new(mock);

    let result = read_message(&mut reader).await;

    assert!(matches!(
        result,
        Err(ProtocolError::Delimiter { found: b'X', .. })
    ));
}

#[test]
fn given_malformed_headers_when_parsed_then_returns_header_error() {
    let cases: [&[u8]; 7] = [
        b"abc 13\n",
        b"200\n",
        b"200 13",
        b"200 -1\n",
        b"200 13 7\n",
        b"\n",
        b"99999 1\n",
    ];

    for case in cases {
        assert!(
            matches!(parse_header(case), Err(ProtocolError::Header { .. })),
            "Should reject {:?}",
            String::from_utf8_lossy(case)
        );
    }
}

#[test]
fn given_oversized_length_when_parsed_then_returns_header_error() {
    let result = parse_header(b"200 999999999999\n");

    assert!(matches!(result, Err(ProtocolError::Header { .. })));
}

#[test]
fn given_plain_command_when_encoded_then_is_space_joined_line() {
    let command = AdmCommand::new("vcl.use").arg("vcl1");

    assert_eq!(encode_command(&command), b"vcl.use vcl1\n");
}

/// **VALUE**: Verifies the heredoc shape used by `vcl.inline`.
///
/// **WHY THIS MATTERS**: varnishd only treats the body as one argument when the sentinel
/// line terminates it exactly. A missing newline leaves the CLI waiting forever.
#[test]
fn given_command_with_body_when_encoded_then_uses_heredoc() {
    // GIVEN: A command with a multi-line body
    let command = AdmCommand::new("vcl.inline")
        .arg("vcl1")
        .with_body("vcl 4.1;\nbackend default none;");

    // WHEN: Encoding
    let encoded = String::from_utf8(encode_command(&command)).unwrap();

    // THEN: The body is wrapped between the sentinel lines
    assert_eq!(
        encoded,
        "vcl.inline vcl1 << XXYYZZ\nvcl 4.1;\nbackend default none;\nXXYYZZ\n"
    );
}

#[test]
fn given_body_containing_default_sentinel_when_encoded_then_picks_other_token() {
    let command = AdmCommand::new("vcl.inline")
        .arg("vcl1")
        .with_body("first\nXXYYZZ\nlast");

    let encoded = String::from_utf8(encode_command(&command)).unwrap();
    let header = encoded.lines().next().unwrap();
    let token = header.rsplit(' ').next().unwrap();

    assert_ne!(token, "XXYYZZ");
    assert!(token.starts_with("VT"));
    assert!(encoded.ends_with(&format!("\n{token}\n")));
}
