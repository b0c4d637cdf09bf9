use crate::protocol::AUTH;

use std::fmt;

/// One management command: a verb, its arguments and an optional heredoc body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmCommand {
    words: Vec<String>,
    body: Option<String>,
}

impl AdmCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            words: vec![name.into()],
            body: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.words.push(arg.into());
        self
    }

    /// Attach a body sent as `<words> << TOKEN\n<body>\nTOKEN`.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.words[0]
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

// Log-safe rendering: auth arguments and bodies are elided.
impl fmt::Display for AdmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;

        if self.name() == AUTH {
            if self.words.len() > 1 {
                f.write_str(" [REDACTED]")?;
            }
        } else {
            for word in &self.words[1..] {
                write!(f, " {word}")?;
            }
        }

        if let Some(body) = &self.body {
            write!(f, " << [{} bytes]", body.len())?;
        }

        Ok(())
    }
}

/// Quote an argument for the management command line if it needs it.
///
/// Plain words pass through; anything with whitespace, quotes or
/// backslashes is wrapped in `"..."` with `\` escapes.
pub fn quote(arg: &str) -> String {
    let needs_quoting = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\');

    if !needs_quoting {
        return arg.to_string();
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
