//! # LineCrypt Protocol Library
//!
//! This crate provides the handshake, frame classification and payload
//! cipher for LineCrypt, a two-party secure-channel bootstrap over a single
//! line-oriented link.
//!
//! ## Overview
//!
//! Both peers share one channel for handshake control frames and
//! application payloads:
//!
//! - **Frame Classifier**: Splits each received line into a control frame or a payload
//! - **Handshake Engine**: Role-guarded Diffie-Hellman exchange (`PG`, `ACK`, `AKEY`, `BKEY`)
//! - **Cipher**: Single-byte XOR stream cipher keyed by the shared secret
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Application Payloads           │  literal text or byte tokens
//! ├─────────────────────────────────────────┤
//! │         Cipher (secret mod 256)         │  XOR
//! ├─────────────────────────────────────────┤
//! │   Handshake Engine   │  Frame Classifier│  PG / ACK / AKEY / BKEY
//! ├─────────────────────────────────────────┤
//! │        Line Transport (unreliable)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{classify, DhParameters, Frame, HandshakeEngine, Role, SeededRandom};
//!
//! let mut rng = SeededRandom::from_seed(7);
//! let mut initiator = HandshakeEngine::new(Role::Initiator, DhParameters::default());
//! let mut responder = HandshakeEngine::new(Role::Responder, DhParameters::default());
//!
//! let mut line = initiator.begin_as_initiator().map(|f| f.to_line());
//! let mut to_responder = true;
//! while let Some(text) = line.take() {
//!     let Frame::Control(frame) = classify(&text) else { break };
//!     let engine = if to_responder { &mut responder } else { &mut initiator };
//!     line = engine.on_control_frame(&frame, &mut rng).reply().map(|f| f.to_line());
//!     to_responder = !to_responder;
//! }
//!
//! assert!(initiator.is_complete() && responder.is_complete());
//! let key = initiator.cipher_key().unwrap();
//! let wire = key.encode_line(b"Hey");
//! assert_eq!(responder.cipher_key().unwrap().decode_line(&wire).unwrap(), b"Hey");
//! ```
//!
//! ## Modules
//!
//! - [`frame`]: Line classification and control frame fields
//! - [`handshake`]: Handshake state machine
//! - [`dh`]: Modular exponentiation, keypairs, random source
//! - [`cipher`]: Payload cipher and token wire format
//! - [`level`]: Roles and security levels
//! - [`error`]: Error types

pub mod cipher;
pub mod dh;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod level;

pub use cipher::CipherKey;
pub use dh::{
    mod_pow, DhParameters, KeyPair, RandomSource, SeededRandom, SharedSecret, DEFAULT_GENERATOR,
    DEFAULT_MODULUS,
};
pub use error::{ProtocolError, Result};
pub use frame::{classify, ControlFrame, ControlKind, Frame};
pub use handshake::{HandshakeEngine, HandshakeState, StateChange};
pub use level::{Role, SecurityLevel};
