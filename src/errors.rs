use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Transport(#[from] io::Error),
    #[error("Operation timed out")]
    Timeout,
    #[error("Failed to resolve host {host}: {reason}")]
    Resolve { host: String, reason: String },
    #[error("Short buffer: needed {needed} bytes, {remaining} remaining")]
    ShortBuffer { needed: usize, remaining: usize },
    #[error("Header mismatch: expected {expected:02X?}, got {got:02X?}")]
    HeaderMismatch { expected: Vec<u8>, got: Vec<u8> },
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
