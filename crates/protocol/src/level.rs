//! Peer roles and security levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed designation of a device on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Chooses the DH parameters and opens the handshake (sends PG, AKEY).
    Initiator,
    /// Waits for the initiator and answers (sends ACK, BKEY).
    Responder,
}

impl Role {
    /// The role on the other end of the link.
    pub fn peer(self) -> Role {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }

    /// Short label used in rendered status lines.
    pub fn label(self) -> &'static str {
        match self {
            Role::Initiator => "A",
            Role::Responder => "B",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => write!(f, "initiator"),
            Role::Responder => write!(f, "responder"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initiator" | "a" => Ok(Role::Initiator),
            "responder" | "b" => Ok(Role::Responder),
            other => Err(format!(
                "unknown role '{}': expected initiator or responder",
                other
            )),
        }
    }
}

/// Operating mode of the link.
///
/// Only `Cleartext` and `Secured` are reachable by toggling. `Enhanced` is
/// declared but no toggle ever produces it; when it is set explicitly it
/// behaves like `Secured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Lines travel untouched; the handshake is bypassed.
    #[default]
    Cleartext,
    /// Handshake first, then ciphered payloads.
    Secured,
    /// Unreachable third level.
    Enhanced,
}

impl SecurityLevel {
    /// Whether the handshake and cipher are engaged at this level.
    pub fn is_secured(self) -> bool {
        !matches!(self, SecurityLevel::Cleartext)
    }

    /// The level a toggle moves to.
    pub fn toggled(self) -> SecurityLevel {
        match self {
            SecurityLevel::Cleartext => SecurityLevel::Secured,
            SecurityLevel::Secured | SecurityLevel::Enhanced => SecurityLevel::Cleartext,
        }
    }

    /// Numeric level shown on the status display.
    pub fn number(self) -> u8 {
        match self {
            SecurityLevel::Cleartext => 0,
            SecurityLevel::Secured => 1,
            SecurityLevel::Enhanced => 2,
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::Cleartext => write!(f, "cleartext"),
            SecurityLevel::Secured => write!(f, "secured"),
            SecurityLevel::Enhanced => write!(f, "enhanced"),
        }
    }
}

impl FromStr for SecurityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cleartext" | "0" => Ok(SecurityLevel::Cleartext),
            "secured" | "1" => Ok(SecurityLevel::Secured),
            other => Err(format!(
                "unknown security level '{}': expected cleartext or secured",
                other
            )),
        }
    }
}
