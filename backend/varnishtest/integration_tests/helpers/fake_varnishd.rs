//! Test helpers: the varnishd side of a management channel.
//!
//! [`FakeVarnishd`] speaks just enough of the CLI protocol to drive the
//! startup sequence: it sends a 107 banner, reads commands (heredocs
//! included) and answers each from a fixed script. It stops when the
//! script runs out or the peer hangs up, and reports what it received.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

pub const TEST_NONCE: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz012345";
pub const TEST_SECRET: &[u8] = b"s3cret\n";

/// One command as seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub line: String,
    pub body: Option<String>,
}

pub struct FakeVarnishd {
    banner: Vec<u8>,
    script: Vec<(u16, String)>,
    fragment: bool,
}

impl FakeVarnishd {
    pub fn new(script: impl IntoIterator<Item = (u16, &'static str)>) -> Self {
        Self {
            banner: [TEST_NONCE.as_slice(), b"\n\nAuthentication required.".as_slice()].concat(),
            script: script
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
            fragment: false,
        }
    }

    /// Replace the whole body of the 107 banner.
    pub fn banner(mut self, body: &[u8]) -> Self {
        self.banner = body.to_vec();
        self
    }

    /// Write every frame one byte at a time.
    pub fn fragmented(mut self) -> Self {
        self.fragment = true;
        self
    }

    /// Serve on `stream` in the background.
    pub fn spawn(self, stream: DuplexStream) -> JoinHandle<Vec<Received>> {
        tokio::spawn(self.serve(stream))
    }

    async fn serve(self, stream: DuplexStream) -> Vec<Received> {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);
        let mut received = Vec::new();

        if write_frame(&mut writer, 107, &self.banner, self.fragment).await.is_err() {
            return received;
        }

        for (status, reply) in self.script {
            let Some(command) = read_command(&mut reader).await else {
                return received;
            };
            received.push(command);

            if write_frame(&mut writer, status, reply.as_bytes(), self.fragment)
                .await
                .is_err()
            {
                return received;
            }
        }

        // Keep reading so a surplus command is recorded rather than lost.
        while let Some(command) = read_command(&mut reader).await {
            received.push(command);
        }
        received
    }
}

/// The frame varnishd writes: padded header, body, delimiter.
pub fn frame(status: u16, body: &[u8]) -> Vec<u8> {
    let mut bytes = format!("{status:<3} {:<8}\n", body.len()).into_bytes();
    bytes.extend_from_slice(body);
    bytes.push(b'\n');
    bytes
}

async fn write_frame<W>(writer: &mut W, status: u16, body: &[u8], fragment: bool) -> std::io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let bytes = frame(status, body);
    if fragment {
        for byte in bytes {
            writer.write_all(&[byte]).await?;
            writer.flush().await?;
            tokio::task::yield_now().await;
        }
    } else {
        writer.write_all(&bytes).await?;
    }
    writer.flush().await
}

async fn read_command<R>(reader: &mut R) -> Option<Received>
where
    R: AsyncBufReadExt + Unpin,
{
    let line = read_line(reader).await?;

    let Some((head, token)) = line.split_once(" << ") else {
        return Some(Received { line, body: None });
    };

    let mut body_lines = Vec::new();
    loop {
        let next = read_line(reader).await?;
        if next == token {
            break;
        }
        body_lines.push(next);
    }

    Some(Received {
        line: head.to_string(),
        body: Some(body_lines.join("\n")),
    })
}

async fn read_line<R>(reader: &mut R) -> Option<String>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches('\n').to_string()),
    }
}
