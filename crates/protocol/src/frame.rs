//! Classification of transport lines into control and payload frames.
//!
//! # Control Frames
//!
//! ```text
//! PG:<p>,<g>      initiator -> responder   group parameters
//! ACK             responder -> initiator   parameters stored
//! AKEY:<pub>      initiator -> responder   initiator public value
//! BKEY:<pub>      responder -> initiator   responder public value
//! ```
//!
//! Every other line is a payload frame. Whether a payload holds literal
//! text or cipher tokens depends on the current security level, which the
//! classifier does not know about.

use std::fmt;

use crate::dh::DhParameters;
use crate::error::{ProtocolError, Result};
use crate::level::Role;

/// Prefix of the parameters frame.
pub const PG_PREFIX: &str = "PG:";
/// Prefix of the acknowledgement frame.
pub const ACK_PREFIX: &str = "ACK";
/// Prefix of the initiator public value frame.
pub const AKEY_PREFIX: &str = "AKEY:";
/// Prefix of the responder public value frame.
pub const BKEY_PREFIX: &str = "BKEY:";

/// Kind of a control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    /// `PG:<p>,<g>`
    Pg,
    /// `ACK`
    Ack,
    /// `AKEY:<pub>`
    AKey,
    /// `BKEY:<pub>`
    BKey,
}

impl ControlKind {
    /// The only role allowed to send this kind of frame.
    pub fn sender(self) -> Role {
        match self {
            ControlKind::Pg | ControlKind::AKey => Role::Initiator,
            ControlKind::Ack | ControlKind::BKey => Role::Responder,
        }
    }

    /// Wire prefix of this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            ControlKind::Pg => PG_PREFIX,
            ControlKind::Ack => ACK_PREFIX,
            ControlKind::AKey => AKEY_PREFIX,
            ControlKind::BKey => BKEY_PREFIX,
        }
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlKind::Pg => "PG",
            ControlKind::Ack => "ACK",
            ControlKind::AKey => "AKEY",
            ControlKind::BKey => "BKEY",
        };
        f.write_str(name)
    }
}

/// A handshake control frame with its raw trailing fields.
///
/// Fields are kept as text until the handshake engine asks for them, so a
/// malformed field is only an error for the component that consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    kind: ControlKind,
    fields: String,
}

impl ControlFrame {
    /// Creates a control frame from a kind and raw fields.
    pub fn new(kind: ControlKind, fields: impl Into<String>) -> Self {
        Self {
            kind,
            fields: fields.into(),
        }
    }

    /// `PG:<p>,<g>`
    pub fn pg(params: &DhParameters) -> Self {
        Self::new(
            ControlKind::Pg,
            format!("{},{}", params.modulus(), params.generator()),
        )
    }

    /// `ACK`
    pub fn ack() -> Self {
        Self::new(ControlKind::Ack, "")
    }

    /// `AKEY:<pub>`
    pub fn akey(public_value: u64) -> Self {
        Self::new(ControlKind::AKey, public_value.to_string())
    }

    /// `BKEY:<pub>`
    pub fn bkey(public_value: u64) -> Self {
        Self::new(ControlKind::BKey, public_value.to_string())
    }

    /// Kind of this frame.
    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    /// Raw text following the prefix.
    pub fn fields(&self) -> &str {
        &self.fields
    }

    /// Parses `<p>,<g>` from a PG frame.
    pub fn dh_parameters(&self) -> Result<DhParameters> {
        let (p, g) = self.fields.split_once(',').ok_or_else(|| {
            ProtocolError::MalformedControlFrame(format!(
                "{} fields '{}' lack a ',' separator",
                self.kind, self.fields
            ))
        })?;
        let modulus = parse_number(self.kind, p)?;
        let generator = parse_number(self.kind, g)?;
        DhParameters::new(modulus, generator)
    }

    /// Parses `<pub>` from an AKEY or BKEY frame.
    pub fn public_value(&self) -> Result<u64> {
        parse_number(self.kind, &self.fields)
    }

    /// Renders the frame as a wire line (without newline).
    pub fn to_line(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.fields)
    }
}

fn parse_number(kind: ControlKind, field: &str) -> Result<u64> {
    field.trim().parse::<u64>().map_err(|_| {
        ProtocolError::MalformedControlFrame(format!(
            "{} field '{}' is not a number",
            kind, field
        ))
    })
}

/// A classified transport line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Handshake control frame.
    Control(ControlFrame),
    /// Application data, literal or ciphered.
    Payload(String),
}

impl Frame {
    /// Whether this is a control frame.
    pub fn is_control(&self) -> bool {
        matches!(self, Frame::Control(_))
    }
}

/// Classifies one transport line.
///
/// Trailing line terminators are stripped before matching. `PG:`, `AKEY:`
/// and `BKEY:` are checked before `ACK`, so no prefix shadows another.
pub fn classify(line: &str) -> Frame {
    let line = line.trim_end_matches(['\r', '\n']);

    for kind in [ControlKind::Pg, ControlKind::AKey, ControlKind::BKey, ControlKind::Ack] {
        if let Some(rest) = line.strip_prefix(kind.prefix()) {
            return Frame::Control(ControlFrame::new(kind, rest));
        }
    }

    Frame::Payload(line.to_string())
}
