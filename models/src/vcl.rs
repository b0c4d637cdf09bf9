use std::path::PathBuf;

/// VCL language version header prepended to inline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VclVersion {
    #[default]
    V41,
    V40,
    /// The body carries its own `vcl x.y;` line.
    Unversioned,
}

impl VclVersion {
    pub const fn header(self) -> &'static str {
        match self {
            VclVersion::V41 => "vcl 4.1;\n\n",
            VclVersion::V40 => "vcl 4.0;\n\n",
            VclVersion::Unversioned => "",
        }
    }
}

/// Where the configuration comes from.
///
/// Inline text is rendered (version header, backends, body) and sent with
/// `vcl.inline`; a file is handed to varnishd by path with `vcl.load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VclSource {
    Inline(String),
    File(PathBuf),
}

impl Default for VclSource {
    fn default() -> Self {
        VclSource::Inline(String::new())
    }
}
