use std::fmt;
use std::path::PathBuf;

/// Engine-level errors shared by the recon crates.
///
/// Lives in `recon-core` so the GL backend and the host can agree on one type.
#[derive(Debug)]
pub enum EngineError {
    // ---- Config / assets ----
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    InvalidConfig {
        path: PathBuf,
        msg: String,
    },

    // ---- GPU backend ----
    VertexCompile(String),
    FragmentCompile(String),
    Link(String),
    GlCreate(String),

    /// `glCheckFramebufferStatus` did not report `FRAMEBUFFER_COMPLETE`.
    FramebufferIncomplete {
        status: u32,
        width: i32,
        height: i32,
        multisampled: bool,
    },

    /// A render target was used after its GPU objects were released (or before they existed).
    TargetNotAllocated(&'static str),

    // ---- Fallback ----
    Other(String),
}

impl EngineError {
    pub fn other<T: Into<String>>(s: T) -> Self {
        EngineError::Other(s.into())
    }

    /// Config validation failure that did not come from a file.
    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        EngineError::InvalidConfig {
            path: PathBuf::from("<inline>"),
            msg: msg.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Io { path, source } => {
                write!(f, "io error at {}: {}", path.display(), source)
            }
            EngineError::Json { path, source } => {
                write!(f, "json parse error at {}: {}", path.display(), source)
            }
            EngineError::InvalidConfig { path, msg } => {
                write!(f, "invalid config at {}: {}", path.display(), msg)
            }

            EngineError::VertexCompile(msg) => write!(f, "vertex shader compile error: {msg}"),
            EngineError::FragmentCompile(msg) => write!(f, "fragment shader compile error: {msg}"),
            EngineError::Link(msg) => write!(f, "program link error: {msg}"),
            EngineError::GlCreate(msg) => write!(f, "backend object creation failed: {msg}"),
            EngineError::FramebufferIncomplete {
                status,
                width,
                height,
                multisampled,
            } => write!(
                f,
                "framebuffer incomplete: 0x{status:x} ({width}x{height}, multisampled={multisampled})"
            ),
            EngineError::TargetNotAllocated(what) => {
                write!(f, "render target not allocated: {what}")
            }

            EngineError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io { source, .. } => Some(source),
            EngineError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_framebuffer_message_names_status_and_size() {
        let e = EngineError::FramebufferIncomplete {
            status: 0x8cd6,
            width: 1280,
            height: 720,
            multisampled: true,
        };
        let msg = e.to_string();
        assert!(msg.contains("0x8cd6"), "{msg}");
        assert!(msg.contains("1280x720"), "{msg}");
    }

    #[test]
    fn io_errors_expose_their_source() {
        let e = EngineError::Io {
            path: PathBuf::from("shaders/screen.vs"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(std::error::Error::source(&e).is_some());
        assert!(e.to_string().contains("shaders/screen.vs"));
    }
}
