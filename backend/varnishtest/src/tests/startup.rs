use crate::error::command::CommandError;
use crate::instance::VarnishBuilder;
use crate::instance::startup::{configure, load_command};
use crate::protocol::{AdmCommand, VCL_INLINE};
use crate::tests::scripted::ScriptedDispatcher;

#[test]
fn given_inline_vcl_with_backend_when_building_load_then_body_is_rendered() {
    let builder = VarnishBuilder::new()
        .backend("origin", "http://127.0.0.1:8080")
        .unwrap()
        .vcl_string("sub vcl_recv { return (pass); }\n");

    let command = load_command(&builder);

    assert_eq!(command.words(), ["vcl.inline", "vcl1"]);
    let body = command.body().unwrap();
    assert!(body.starts_with("vcl 4.1;\n\nbackend origin {\n"));
    assert!(body.ends_with("sub vcl_recv { return (pass); }\n"));
}

#[test]
fn given_vcl_file_when_building_load_then_uses_vcl_load_with_path() {
    let builder = VarnishBuilder::new()
        .backend("ignored", "http://127.0.0.1:8080")
        .unwrap()
        .vcl_file("/etc/varnish/default.vcl");

    let command = load_command(&builder);

    assert_eq!(command.words(), ["vcl.load", "vcl1", "/etc/varnish/default.vcl"]);
    assert!(command.body().is_none());
}

#[test]
fn given_vcl_file_with_space_when_building_load_then_path_is_quoted() {
    let builder = VarnishBuilder::new().vcl_file("/tmp/my tests/x.vcl");

    let command = load_command(&builder);

    assert_eq!(command.words()[2], "\"/tmp/my tests/x.vcl\"");
}

/// **VALUE**: Verifies the configuration order: load, activate, start.
#[tokio::test]
async fn given_accepting_dispatcher_when_configuring_then_sends_load_use_start_in_order() {
    let mut dispatcher = ScriptedDispatcher::new([
        (200, "VCL compiled."),
        (200, "VCL 'vcl1' now active"),
        (200, ""),
    ]);
    let load = AdmCommand::new(VCL_INLINE).arg("vcl1").with_body("vcl 4.1;\n");

    configure(&mut dispatcher, &load).await.unwrap();

    assert_eq!(dispatcher.sent, ["vcl.inline vcl1", "vcl.use vcl1", "start"]);
}

/// **BUG THIS CATCHES**: Would catch continuing to `vcl.use` after a compile failure.
#[tokio::test]
async fn given_rejected_load_when_configuring_then_stops_before_vcl_use() {
    let mut dispatcher = ScriptedDispatcher::new([(106, "Message from VCC-compiler: ...")]);
    let load = AdmCommand::new(VCL_INLINE).arg("vcl1").with_body("nonsense");

    let result = configure(&mut dispatcher, &load).await;

    match result {
        Err(CommandError::Rejected {
            command, status, ..
        }) => {
            assert_eq!(status, 106);
            assert_eq!(command, "vcl.inline vcl1 << [8 bytes]");
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }
    assert_eq!(dispatcher.sent, ["vcl.inline vcl1"]);
}
