use models::{BackendSpec, VclVersion};

use std::fmt::Write;

use log::warn;

/// Render inline VCL: version header, one stanza per backend, then the body.
pub fn render_inline(version: VclVersion, backends: &[BackendSpec], body: &str) -> String {
    let mut vcl = String::from(version.header());

    for backend in backends {
        if backend.tls() {
            warn!(
                "Backend '{}' was declared with https; the stanza connects in plain text to port {}",
                backend.name(),
                backend.port()
            );
        }

        // Writing to a String cannot fail.
        let _ = write!(
            vcl,
            "backend {} {{\n\t.host = \"{}\";\n\t.port = \"{}\";\n\t.host_header = \"{}\";\n}}\n",
            backend.name(),
            backend.host(),
            backend.port(),
            backend.host()
        );
    }

    vcl.push_str(body);
    vcl
}
