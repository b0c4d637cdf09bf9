use crate::CLIENT_LISTEN_ADDRESS;

use std::net::SocketAddr;
use std::path::Path;
use std::process::Stdio;

use log::{debug, trace};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child as TokioChild;
use tokio::process::Command as TokioCommand;
use tokio::spawn as TokioSpawn;

const FOREGROUND_FLAG: &str = "-F";
const VCL_FILE_FLAG: &str = "-f";
const NO_VCL: &str = "";
const INSTANCE_FLAG: &str = "-n";
const LISTEN_FLAG: &str = "-a";
const PARAM_FLAG: &str = "-p";
const MANAGEMENT_FLAG: &str = "-M";

/// Parameters every test instance runs with.
pub(crate) const TEST_PARAMETERS: [&str; 7] = [
    "auto_restart=off",
    "syslog_cli_traffic=off",
    "thread_pool_min=10",
    "debug=+vtc_mode",
    "vsl_mask=+Debug,+H2RxHdr,+H2RxBody",
    "h2_initial_window_size=1m",
    "h2_rx_window_low_water=64k",
];

/// Build the varnishd command line.
///
/// `management` is the rendezvous address varnishd connects back to; without
/// it varnishd keeps its default `-T` listener for the admin tool.
/// `extra` pairs are appended verbatim after the fixed arguments.
pub(crate) fn build_spawn_command(
    program: &str,
    work_dir: &Path,
    management: Option<SocketAddr>,
    extra: &[(String, String)],
) -> TokioCommand {
    let mut cmd = TokioCommand::new(program);
    cmd.arg(FOREGROUND_FLAG)
        .arg(VCL_FILE_FLAG)
        .arg(NO_VCL)
        .arg(INSTANCE_FLAG)
        .arg(work_dir)
        .arg(LISTEN_FLAG)
        .arg(CLIENT_LISTEN_ADDRESS);

    for parameter in TEST_PARAMETERS {
        cmd.arg(PARAM_FLAG).arg(parameter);
    }

    if let Some(address) = management {
        cmd.arg(MANAGEMENT_FLAG).arg(address.to_string());
    }

    for (name, value) in extra {
        cmd.arg(name).arg(value);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Drain the child's stdout and stderr into the log.
pub(crate) fn forward_output(child: &mut TokioChild) {
    if let Some(stdout) = child.stdout.take() {
        TokioSpawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                trace!("varnishd stdout: {line}");
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        TokioSpawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("varnishd stderr: {line}");
            }
        });
    }
}
