//! # LineCrypt Peer Library
//!
//! This crate provides the device side of LineCrypt: everything a peer
//! needs around the protocol core to run on a real or simulated link.
//!
//! ## Overview
//!
//! Each device is a [`Node`] built from explicit parts:
//!
//! - **Message Router**: Classifies received lines and routes them to the handshake or cipher
//! - **Peer Agent**: Decides per tick what to send (hellos, handshake start, ciphered traffic)
//! - **Level Controller**: Switches between cleartext and secured, resetting the session
//! - **Ports**: Line transport, status renderer and toggle input traits
//! - **Adapters**: In-memory lossy link, UDP link, console/tracing renderers, stdin toggle
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                             Node                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  toggle input ──► Level Controller ──► reset engine + agent     │
//! │                                                                 │
//! │  transport ──► Message Router ──► Handshake Engine | Cipher     │
//! │                       │                                         │
//! │                       └──► status renderer                      │
//! │                                                                 │
//! │  Peer Agent ──► Cipher (secured) ──► transport                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use peer::{Config, Simulation};
//!
//! let mut config = Config::default();
//! config.handshake.seed = Some(1);
//! config.simulation.toggle_at = vec![2];
//!
//! let mut simulation = Simulation::new(&config).unwrap();
//! let report = simulation.run(20);
//! assert!(report.secrets_match);
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`ports`]: Collaborator traits
//! - [`transport`]: In-memory and UDP line transports
//! - [`ui`]: Renderers and toggle inputs
//! - [`router`]: Received-line routing
//! - [`agent`]: Send-side traffic logic
//! - [`controller`]: Security level switch
//! - [`node`]: Per-device tick context
//! - [`simulation`]: Both roles over an in-memory link

pub mod agent;
pub mod config;
pub mod controller;
pub mod node;
pub mod ports;
pub mod router;
pub mod simulation;
pub mod transport;
pub mod ui;

// Re-export protocol for convenience
pub use protocol;

// Re-export config types for convenience
pub use config::{Config, ConfigError};

// Re-export core types for convenience
pub use agent::PeerAgent;
pub use controller::SecurityLevelController;
pub use node::{Node, NodeSettings, TickOutcome};
pub use router::{MessageRouter, Routed, RouterEvent, RouterStats};
pub use simulation::{PeerReport, SimNode, Simulation, SimulationReport};

// Re-export port and adapter types for convenience
pub use ports::{LineTransport, StatusRenderer, ToggleInput, TransportError};
pub use transport::{LinkStats, MemoryEndpoint, MemoryLink, UdpLineTransport};
pub use ui::{
    ConsoleRenderer, NeverPressed, RecordingRenderer, ScriptedToggle, StdinToggle, TracingRenderer,
};
