use std::io;

use thiserror::Error;

/// Why a single network probe did not produce a result.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out")]
    Timeout,
    #[error("connection refused")]
    Refused,
    #[error("connection reset")]
    Reset,
    #[error("tls error: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("io error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => ProbeError::Refused,
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => ProbeError::Reset,
            io::ErrorKind::TimedOut => ProbeError::Timeout,
            _ => ProbeError::Io(e),
        }
    }
}

impl From<tokio::time::error::Elapsed> for ProbeError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ProbeError::Timeout
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not resolve hostname {host}: {source}")]
    Lookup {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("hostname {0} resolved to no addresses")]
    NoAddress(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create db directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_to_probe_kinds() {
        let refused: ProbeError = io::Error::from(io::ErrorKind::ConnectionRefused).into();
        assert!(matches!(refused, ProbeError::Refused));
        let reset: ProbeError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        assert!(matches!(reset, ProbeError::Reset));
        let timed: ProbeError = io::Error::from(io::ErrorKind::TimedOut).into();
        assert!(matches!(timed, ProbeError::Timeout));
        let other: ProbeError = io::Error::from(io::ErrorKind::AddrNotAvailable).into();
        assert!(matches!(other, ProbeError::Io(_)));
    }
}
