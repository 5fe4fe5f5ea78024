use std::path::PathBuf;
use thiserror::Error;

/// One scanner failed. Logged and skipped, never aborts a build.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{source_name}: i/o error: {err}")]
    Io {
        source_name: &'static str,
        #[source]
        err: std::io::Error,
    },
    #[error("{source_name}: command `{command}` failed: {detail}")]
    Command {
        source_name: &'static str,
        command: String,
        detail: String,
    },
    #[error("{source_name}: malformed output: {detail}")]
    Malformed { source_name: &'static str, detail: String },
    #[error("{source_name}: not available on this platform")]
    Unsupported { source_name: &'static str },
}

/// Why a candidate was dropped during the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RejectReason {
    #[error("name rejected by normalizer")]
    NameRejected,
    #[error("executable missing")]
    MissingExecutable,
    #[error("filtered by catalog blacklist/whitelist")]
    Filtered,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file {path} could not be read: {err}")]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("catalog file {path} is corrupt: {err}")]
    Corrupt {
        path: PathBuf,
        #[source]
        err: serde_json::Error,
    },
    #[error("catalog file {path} could not be written: {detail}")]
    Save { path: PathBuf, detail: String },
    #[error("catalog rebuild failed: {0}")]
    RebuildFailed(String),
}

/// Failure talking to the text-generation service. Mapped to `NoMatch` by the resolver.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request timed out")]
    Timeout,
    #[error("oracle transport error: {0}")]
    Transport(String),
    #[error("oracle returned status {0}")]
    Status(u16),
    #[error("oracle payload invalid: {0}")]
    Payload(String),
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn {path}: {err}")]
    Spawn {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("no identifier variant of {id} could be started (tried {tried})")]
    PackagedExhausted { id: String, tried: usize },
    #[error("packaged applications cannot be launched on this platform")]
    Unsupported,
}
