// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Crate-wide error type.

/// Convenient result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the EEBUS stack.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Wire / Data Errors
    // ========================================================================
    /// Malformed wire bytes, JSON, or date/time/duration text.
    Parse,
    /// Parse failure with context (frame decoding, handshake messages).
    ParseMsg(String),

    // ========================================================================
    // Programmer Misuse
    // ========================================================================
    /// An argument that must not be absent was absent.
    InputArgumentNull,
    /// An argument was outside its valid range (bad enum value, width overflow).
    InputArgumentOutOfRange,
    /// Generic argument/schema misuse (wrong kind for the requested operation).
    InputArgument,

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// Queue full or buffer limit exceeded.
    Memory,

    // ========================================================================
    // Setup / Lifecycle Errors
    // ========================================================================
    /// A credential file is missing or unreadable.
    FileSystemNoFile(String),
    /// TLS context construction failed or credentials are inconsistent
    /// (certificate SKI extension does not match the public key).
    Init(String),
    /// Service thread could not be launched or joined.
    Thread,
    /// Transport send/receive failed or the session is down.
    Transport(String),

    // ========================================================================
    // Other
    // ========================================================================
    /// Invariant violation reachable only through a bug.
    Other(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse => write!(f, "parse error"),
            Error::ParseMsg(msg) => write!(f, "parse error: {}", msg),
            Error::InputArgumentNull => write!(f, "input argument is null"),
            Error::InputArgumentOutOfRange => write!(f, "input argument out of range"),
            Error::InputArgument => write!(f, "invalid input argument"),
            Error::Memory => write!(f, "out of queue or buffer space"),
            Error::FileSystemNoFile(path) => write!(f, "file not found: {}", path),
            Error::Init(msg) => write!(f, "initialisation failed: {}", msg),
            Error::Thread => write!(f, "service thread failure"),
            Error::Transport(msg) => write!(f, "transport failure: {}", msg),
            Error::Other(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileSystemNoFile(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(_: serde_json::Error) -> Self {
        Error::Parse
    }
}
