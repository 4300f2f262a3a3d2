// ABOUTME: defines the single fatal error type returned by the reader, decoder and executors.
// ABOUTME: the dispatch loop logs it once and terminates the run.

use sidefx_common::{DecodeError, UnsupportedProtocol};

#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("opening input {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("reading input failed: {0}")]
    Read(#[source] std::io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("file already exists: {path}")]
    FileExists { path: String },

    #[error("{op} {path}: {source}")]
    File {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("exec {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("waiting for {path} (pid {pid}): {source}")]
    Wait {
        path: String,
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} (pid {pid}) exited with status {exit_code}")]
    ExitStatus { path: String, pid: u32, exit_code: i32 },

    #[error(transparent)]
    Protocol(#[from] UnsupportedProtocol),

    #[error("dial {protocol} {host}:{port}: {source}")]
    Dial {
        protocol: String,
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("write {protocol} {host}:{port} from {local}: {source}")]
    NetworkWrite {
        protocol: String,
        host: String,
        port: u16,
        local: String,
        #[source]
        source: std::io::Error,
    },

    #[error("resolving {what}: {source}")]
    Identity {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl FatalError {
    /// Coarse class of the failure, logged alongside the error.
    pub fn kind(&self) -> &'static str {
        match self {
            FatalError::Open { .. } | FatalError::Read(_) => "read",
            FatalError::Decode(_) => "decode",
            FatalError::FileExists { .. } | FatalError::ExitStatus { .. } | FatalError::Protocol(_) => "precondition",
            FatalError::File { .. }
            | FatalError::Spawn { .. }
            | FatalError::Wait { .. }
            | FatalError::Dial { .. }
            | FatalError::NetworkWrite { .. } => "os",
            FatalError::Identity { .. } => "identity",
        }
    }
}
