use std::borrow::Cow;

/// Status codes of the varnish management protocol.
///
/// These are not HTTP codes even where the numbers coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliStatus {
    Syntax,
    Unknown,
    Unimplemented,
    TooFew,
    TooMany,
    Param,
    Auth,
    Ok,
    Truncated,
    Cant,
    Comms,
    Close,
}

impl CliStatus {
    pub const fn code(self) -> u16 {
        match self {
            CliStatus::Syntax => 100,
            CliStatus::Unknown => 101,
            CliStatus::Unimplemented => 102,
            CliStatus::TooFew => 104,
            CliStatus::TooMany => 105,
            CliStatus::Param => 106,
            CliStatus::Auth => 107,
            CliStatus::Ok => 200,
            CliStatus::Truncated => 201,
            CliStatus::Cant => 300,
            CliStatus::Comms => 400,
            CliStatus::Close => 500,
        }
    }

    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            100 => Some(CliStatus::Syntax),
            101 => Some(CliStatus::Unknown),
            102 => Some(CliStatus::Unimplemented),
            104 => Some(CliStatus::TooFew),
            105 => Some(CliStatus::TooMany),
            106 => Some(CliStatus::Param),
            107 => Some(CliStatus::Auth),
            200 => Some(CliStatus::Ok),
            201 => Some(CliStatus::Truncated),
            300 => Some(CliStatus::Cant),
            400 => Some(CliStatus::Comms),
            500 => Some(CliStatus::Close),
            _ => None,
        }
    }
}

/// One framed response: a status code and an explicit-length body.
///
/// The body is binary-safe and excludes the frame's trailing delimiter byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMessage {
    status: u16,
    body: Vec<u8>,
}

impl ProtocolMessage {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn cli_status(&self) -> Option<CliStatus> {
        CliStatus::from_code(self.status)
    }

    pub fn is_ok(&self) -> bool {
        self.status == CliStatus::Ok.code()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
