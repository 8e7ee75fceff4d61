//! # servent-wire
//!
//! Binary wire codecs for the Gnutella message plane: the fixed-width
//! message header, the GGEP extension block framing, and COBS encoding
//! used to keep GGEP data segments free of NUL bytes.
//!
//! This crate has no notion of message *semantics* — see `servent-messages`
//! for the typed payload structs built on top of [`header::MessageHeader`].

pub mod cobs;
pub mod ggep;
pub mod header;

/// Error type for wire-level framing failures.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The buffer was shorter than a fixed-size structure requires.
    #[error("truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    /// A GGEP block was malformed (bad length varint, bad flags, ...).
    #[error("malformed GGEP block: {0}")]
    MalformedGgep(String),

    /// COBS decoding encountered an invalid framing byte.
    #[error("malformed COBS frame")]
    MalformedCobs,

    /// A value did not fit in the field meant to carry it.
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Result alias for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;
