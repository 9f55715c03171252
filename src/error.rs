use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to fetch or decode a model
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported url scheme: {url}")]
    UnsupportedScheme { url: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: gltf::Error,
    },

    #[error("{url} requires {extension}, which cannot be decoded")]
    UnsupportedCompression { url: String, extension: String },

    #[error("load of {url} was dropped before it finished")]
    Cancelled { url: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TweenError {
    /// Start and end bags do not share the same key set
    #[error("tween bag keys differ (missing from end: {missing:?}, only in end: {unexpected:?})")]
    MalformedBag {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("tween duration must be finite and non-negative, got {0}")]
    InvalidDuration(f64),

    #[error("no tween with id {0}")]
    UnknownTween(u64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TourError {
    #[error("tour script has no waypoints")]
    EmptyScript,

    #[error(transparent)]
    Tween(#[from] TweenError),
}

/// Errors raised while drawing or presenting a frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("render surface lost")]
    SurfaceLost,

    #[error("out of GPU memory")]
    OutOfMemory,

    #[error("render surface outdated")]
    Outdated,

    #[error("timed out acquiring the next surface texture")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl RenderError {
    /// Fatal errors stop the tick loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::SurfaceLost | RenderError::OutOfMemory)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ViewportError {
    #[error("viewport has been disposed")]
    Disposed,

    #[error("tick loop halted: {0}")]
    Halted(RenderError),

    #[error(transparent)]
    Tour(#[from] TourError),

    #[error(transparent)]
    Tween(#[from] TweenError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Which registry a failing callback belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Mixin,
    Composer,
    Renderer,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackKind::Mixin => "mixin",
            CallbackKind::Composer => "composer",
            CallbackKind::Renderer => "renderer",
        };
        f.write_str(name)
    }
}

/// A per-frame callback that errored or panicked; the loop carried on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    pub kind: CallbackKind,
    pub key: String,
    pub message: String,
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' failed: {}", self.kind, self.key, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_surface_loss_and_oom_are_fatal() {
        assert!(RenderError::SurfaceLost.is_fatal());
        assert!(RenderError::OutOfMemory.is_fatal());
        assert!(!RenderError::Outdated.is_fatal());
        assert!(!RenderError::Timeout.is_fatal());
        assert!(!RenderError::Other("x".into()).is_fatal());
    }

    #[test]
    fn test_malformed_bag_message_names_keys() {
        let err = TweenError::MalformedBag {
            missing: vec!["b".into()],
            unexpected: vec!["c".into()],
        };
        let text = err.to_string();
        assert!(text.contains("\"b\""));
        assert!(text.contains("\"c\""));
    }

    #[test]
    fn test_callback_failure_display() {
        let failure = CallbackFailure {
            kind: CallbackKind::Mixin,
            key: "scroll".into(),
            message: "boom".into(),
        };
        assert_eq!(failure.to_string(), "mixin 'scroll' failed: boom");
    }
}
