//! Role-aware Diffie-Hellman handshake state machine.
//!
//! One engine type serves both roles. The four control frames flow as:
//!
//! ```text
//! Initiator                          Responder
//!   Idle        -- PG:p,g -->          Idle
//!   ParamsSent  <-- ACK ---            AckReceived
//!   AckReceived -- AKEY:a -->          AckReceived
//!   Complete    <-- BKEY:b --          Complete
//! ```
//!
//! A frame whose kind may only be sent by our own role is dropped, as is any
//! frame the current state does not expect. Dropping never changes state and
//! never produces a secret. There is no timeout: if a frame is lost the
//! engine waits until [`HandshakeEngine::reset`] is called.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cipher::CipherKey;
use crate::dh::{DhParameters, KeyPair, RandomSource, SharedSecret};
use crate::error::{ProtocolError, Result};
use crate::frame::{ControlFrame, ControlKind};
use crate::level::Role;

/// Progress of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeState {
    /// Nothing sent or received yet.
    #[default]
    Idle,
    /// Initiator: PG sent, waiting for ACK.
    ParamsSent,
    /// Initiator: AKEY sent, waiting for BKEY. Responder: ACK sent, waiting for AKEY.
    AckReceived,
    /// Declared for completeness; the transition table never enters it.
    PreKeySent,
    /// Shared secret derived.
    Complete,
}

/// Outcome of feeding one control frame to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// The frame was dropped; state is unchanged.
    Ignored(ProtocolError),
    /// The engine moved to a new state.
    Advanced {
        /// State before the frame.
        from: HandshakeState,
        /// State after the frame.
        to: HandshakeState,
        /// Control frame to transmit in response, if any.
        reply: Option<ControlFrame>,
    },
}

impl StateChange {
    /// Whether this change completed the handshake.
    pub fn key_established(&self) -> bool {
        matches!(
            self,
            StateChange::Advanced {
                to: HandshakeState::Complete,
                ..
            }
        )
    }

    /// Control frame to transmit, if any.
    pub fn reply(&self) -> Option<&ControlFrame> {
        match self {
            StateChange::Advanced { reply, .. } => reply.as_ref(),
            StateChange::Ignored(_) => None,
        }
    }

    /// Whether the frame was dropped.
    pub fn is_ignored(&self) -> bool {
        matches!(self, StateChange::Ignored(_))
    }
}

/// Handshake state for one device.
///
/// The shared secret, and the cipher key derived from it, exist only while
/// the state is [`HandshakeState::Complete`].
#[derive(Debug, Clone)]
pub struct HandshakeEngine {
    /// Fixed role of this device.
    role: Role,
    /// Current state.
    state: HandshakeState,
    /// Parameters the initiator offers.
    offered: DhParameters,
    /// Parameters in force for this session (sent or received).
    session: Option<DhParameters>,
    /// Our keypair for this attempt.
    keypair: Option<KeyPair>,
    /// Agreed secret.
    shared: Option<SharedSecret>,
}

impl HandshakeEngine {
    /// Creates an idle engine. `offered` is only used by an initiator.
    pub fn new(role: Role, offered: DhParameters) -> Self {
        Self {
            role,
            state: HandshakeState::Idle,
            offered,
            session: None,
            keypair: None,
            shared: None,
        }
    }

    /// Returns the fixed role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Returns whether the shared secret is available.
    pub fn is_complete(&self) -> bool {
        self.state == HandshakeState::Complete
    }

    /// Returns the shared secret once complete.
    pub fn shared_secret(&self) -> Option<SharedSecret> {
        self.shared
    }

    /// Returns the payload cipher key once complete.
    pub fn cipher_key(&self) -> Option<CipherKey> {
        self.shared.map(|secret| secret.cipher_key())
    }

    /// Parameters in force for the current session, if agreed.
    pub fn session_parameters(&self) -> Option<DhParameters> {
        self.session
    }

    /// Our public value for the current attempt, if generated.
    pub fn public_value(&self) -> Option<u64> {
        self.keypair.as_ref().map(KeyPair::public_value)
    }

    /// Drops all session state and returns to `Idle`.
    ///
    /// Secret and cipher key are cleared together.
    pub fn reset(&mut self) {
        if self.state != HandshakeState::Idle {
            debug!(role = %self.role, from = ?self.state, "Resetting handshake");
        }
        self.state = HandshakeState::Idle;
        self.session = None;
        self.keypair = None;
        self.shared = None;
    }

    /// Opens the handshake by offering parameters.
    ///
    /// Returns the `PG` frame to send. Returns `None` for a responder or
    /// when the engine is not idle.
    pub fn begin_as_initiator(&mut self) -> Option<ControlFrame> {
        if self.role != Role::Initiator || self.state != HandshakeState::Idle {
            debug!(role = %self.role, state = ?self.state, "Ignoring handshake start");
            return None;
        }

        self.session = Some(self.offered);
        self.state = HandshakeState::ParamsSent;
        info!(
            modulus = self.offered.modulus(),
            generator = self.offered.generator(),
            "Offering handshake parameters"
        );
        Some(ControlFrame::pg(&self.offered))
    }

    /// Feeds one received control frame to the state machine.
    pub fn on_control_frame(
        &mut self,
        frame: &ControlFrame,
        rng: &mut dyn RandomSource,
    ) -> StateChange {
        let from = self.state;
        match self.apply(frame, rng) {
            Ok(reply) => {
                info!(
                    role = %self.role,
                    kind = %frame.kind(),
                    from = ?from,
                    to = ?self.state,
                    "Handshake advanced"
                );
                StateChange::Advanced {
                    from,
                    to: self.state,
                    reply,
                }
            }
            Err(err) => {
                debug!(role = %self.role, kind = %frame.kind(), error = %err, "Dropping control frame");
                StateChange::Ignored(err)
            }
        }
    }

    /// Applies a frame. Every fallible step runs before any field is written.
    fn apply(
        &mut self,
        frame: &ControlFrame,
        rng: &mut dyn RandomSource,
    ) -> Result<Option<ControlFrame>> {
        let kind = frame.kind();
        if kind.sender() == self.role {
            return Err(ProtocolError::WrongRoleFrame {
                kind,
                role: self.role,
            });
        }

        match (self.role, self.state, kind) {
            (Role::Responder, HandshakeState::Idle, ControlKind::Pg) => {
                let params = frame.dh_parameters()?;
                self.session = Some(params);
                self.state = HandshakeState::AckReceived;
                Ok(Some(ControlFrame::ack()))
            }
            (Role::Initiator, HandshakeState::ParamsSent, ControlKind::Ack) => {
                let params = self.require_session(kind)?;
                let keypair = KeyPair::generate(&params, rng);
                let reply = ControlFrame::akey(keypair.public_value());
                self.keypair = Some(keypair);
                self.state = HandshakeState::AckReceived;
                Ok(Some(reply))
            }
            (Role::Responder, HandshakeState::AckReceived, ControlKind::AKey) => {
                let params = self.require_session(kind)?;
                let peer_public = params.check_public_value(frame.public_value()?)?;
                let keypair = KeyPair::generate(&params, rng);
                let reply = ControlFrame::bkey(keypair.public_value());
                self.shared = Some(keypair.shared_secret(&params, peer_public));
                self.keypair = Some(keypair);
                self.state = HandshakeState::Complete;
                Ok(Some(reply))
            }
            (Role::Initiator, HandshakeState::AckReceived, ControlKind::BKey) => {
                let params = self.require_session(kind)?;
                let peer_public = params.check_public_value(frame.public_value()?)?;
                let keypair = self.keypair.as_ref().ok_or(ProtocolError::UnexpectedFrame {
                    kind,
                    state: self.state,
                })?;
                self.shared = Some(keypair.shared_secret(&params, peer_public));
                self.state = HandshakeState::Complete;
                Ok(None)
            }
            (_, state, kind) => Err(ProtocolError::UnexpectedFrame { kind, state }),
        }
    }

    fn require_session(&self, kind: ControlKind) -> Result<DhParameters> {
        self.session.ok_or(ProtocolError::UnexpectedFrame {
            kind,
            state: self.state,
        })
    }
}
