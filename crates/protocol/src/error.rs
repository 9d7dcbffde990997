//! Error types for the protocol crate.
//!
//! None of these errors is fatal. The handshake engine turns them into
//! ignored state changes and the router turns payload errors into events.

use thiserror::Error;

use crate::frame::ControlKind;
use crate::handshake::HandshakeState;
use crate::level::Role;

/// Protocol error type covering every way a frame can fail to make progress.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    // Frame errors
    /// A control frame carried fields that could not be parsed.
    #[error("malformed control frame: {0}")]
    MalformedControlFrame(String),

    /// A payload line contained tokens that are not byte values.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    // Handshake errors
    /// A control frame was sent by a role that may not send it.
    #[error("{kind} frame is not accepted by a {role} peer")]
    WrongRoleFrame {
        /// Kind of the rejected frame.
        kind: ControlKind,
        /// Role of the receiving engine.
        role: Role,
    },

    /// A control frame arrived in a state that does not expect it.
    #[error("{kind} frame is unexpected in state {state:?}")]
    UnexpectedFrame {
        /// Kind of the rejected frame.
        kind: ControlKind,
        /// State of the engine when the frame arrived.
        state: HandshakeState,
    },

    /// Diffie-Hellman parameters or a public value are out of range.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    // Cipher errors
    /// A payload needed the cipher key before the handshake completed.
    #[error("key unavailable: handshake is not complete")]
    KeyUnavailable,
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
