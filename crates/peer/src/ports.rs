//! Collaborator interfaces consumed by a node.
//!
//! The core never touches hardware or sockets directly. A node is built from
//! three injected capabilities: a line transport, a status renderer and a
//! level-toggle input. Randomness is injected separately as a
//! [`protocol::RandomSource`].

use protocol::{Role, SecurityLevel};
use thiserror::Error;

/// Maximum length of one line on the link, excluding the terminator.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Errors raised by transport adapters.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The line contains a line terminator and would split on the wire.
    #[error("line contains an embedded line terminator")]
    EmbeddedNewline,

    /// The line exceeds [`MAX_LINE_LENGTH`].
    #[error("line too long: {len} bytes exceeds maximum of {max} bytes")]
    LineTooLong {
        /// Actual length.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// The other end of the link is gone.
    #[error("link closed: {0}")]
    Closed(String),

    /// Underlying socket error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Checks that a line can travel as a single wire line.
pub fn check_line(line: &str) -> Result<(), TransportError> {
    if line.contains(['\n', '\r']) {
        return Err(TransportError::EmbeddedNewline);
    }
    if line.len() > MAX_LINE_LENGTH {
        return Err(TransportError::LineTooLong {
            len: line.len(),
            max: MAX_LINE_LENGTH,
        });
    }
    Ok(())
}

/// Point-to-point line channel. Neither operation may block.
pub trait LineTransport {
    /// Queues one line for the peer.
    fn send(&mut self, line: &str) -> Result<(), TransportError>;

    /// Returns the next received line if one is already available.
    fn try_receive_line(&mut self) -> Option<String>;
}

/// Informational output. Nothing in the core depends on it succeeding.
pub trait StatusRenderer {
    /// Appends one line of text to the display.
    fn render_line(&mut self, text: &str);

    /// Briefly shows the device role and current security level.
    fn flash_status(&mut self, role: Role, level: SecurityLevel);
}

/// Debounced level-toggle button.
pub trait ToggleInput {
    /// Returns true once per press.
    fn is_toggle_pressed(&mut self) -> bool;
}
