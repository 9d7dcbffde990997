//! Both roles in one process over an in-memory link.
//!
//! The simulation runs an initiator and a responder node on a virtual
//! monotonic clock. Every step advances the clock by one tick and ticks the
//! responder, then the initiator.

use std::fmt;
use std::time::{Duration, Instant};

use protocol::{HandshakeState, Role, SecurityLevel, SeededRandom};
use serde::Serialize;
use tracing::info;

use crate::config::{Config, ConfigError};
use crate::node::{Node, NodeSettings, TickOutcome};
use crate::transport::{MemoryEndpoint, MemoryLink};
use crate::ui::{RecordingRenderer, ScriptedToggle};

/// Node type used on both sides of a simulation.
pub type SimNode = Node<MemoryEndpoint, RecordingRenderer, ScriptedToggle>;

/// Final state of one simulated device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerReport {
    pub role: Role,
    pub level: SecurityLevel,
    pub state: HandshakeState,
    pub fingerprint: Option<String>,
    /// Plaintexts surfaced by the router, in arrival order.
    pub delivered: Vec<String>,
    pub key_unavailable: u64,
    pub malformed: u64,
    pub lines_sent: u64,
    pub lines_dropped: u64,
    pub toggles: u64,
}

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub ticks: u64,
    pub drop_rate: f64,
    pub secrets_match: bool,
    pub initiator: PeerReport,
    pub responder: PeerReport,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Simulation: {} ticks, drop rate {:.2}",
            self.ticks, self.drop_rate
        )?;
        for peer in [&self.initiator, &self.responder] {
            writeln!(f, "  {} ({})", peer.role, peer.role.label())?;
            writeln!(f, "    Level:       {}", peer.level)?;
            writeln!(f, "    Handshake:   {:?}", peer.state)?;
            writeln!(
                f,
                "    Key:         {}",
                peer.fingerprint.as_deref().unwrap_or("-")
            )?;
            writeln!(
                f,
                "    Lines:       {} sent, {} lost",
                peer.lines_sent, peer.lines_dropped
            )?;
            writeln!(
                f,
                "    Received:    {} plaintext, {} without key, {} unreadable",
                peer.delivered.len(),
                peer.key_unavailable,
                peer.malformed
            )?;
        }
        write!(
            f,
            "  Secrets match: {}",
            if self.secrets_match { "yes" } else { "no" }
        )
    }
}

/// Two nodes over a shared in-memory link.
pub struct Simulation {
    initiator: SimNode,
    responder: SimNode,
    rng: SeededRandom,
    start: Instant,
    tick: Duration,
    steps: u64,
    drop_rate: f64,
    delivered: [Vec<String>; 2],
}

impl Simulation {
    /// Builds both nodes from configuration.
    ///
    /// The toggle schedule in `[simulation]` applies to both nodes. With a
    /// configured seed the run is fully reproducible.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = config.handshake.seed;
        let link_seed = seed.map(|s| s.rotate_left(32)).unwrap_or_else(rand::random);
        let (link_a, link_b) = MemoryLink::pair(config.link.drop_rate, link_seed);
        let toggles = config.simulation.toggle_at.clone();

        let initiator = Node::new(
            NodeSettings::from_config(config, Role::Initiator)?,
            link_a,
            RecordingRenderer::new(),
            ScriptedToggle::new(toggles.iter().copied()),
        );
        let responder = Node::new(
            NodeSettings::from_config(config, Role::Responder)?,
            link_b,
            RecordingRenderer::new(),
            ScriptedToggle::new(toggles),
        );

        let rng = match seed {
            Some(seed) => SeededRandom::from_seed(seed),
            None => SeededRandom::from_entropy(),
        };

        Ok(Self {
            initiator,
            responder,
            rng,
            start: Instant::now(),
            tick: config.tick(),
            steps: 0,
            drop_rate: config.link.drop_rate,
            delivered: [Vec::new(), Vec::new()],
        })
    }

    /// Advances the clock by one tick and ticks both nodes.
    pub fn step(&mut self) -> (TickOutcome, TickOutcome) {
        let now = self.now();
        let responder = self.responder.tick(now, &mut self.rng);
        let initiator = self.initiator.tick(now, &mut self.rng);

        for (slot, outcome) in [(0, &initiator), (1, &responder)] {
            if let Some(text) = outcome.event.as_ref().and_then(|e| e.plaintext()) {
                self.delivered[slot].push(text.to_string());
            }
        }

        self.steps += 1;
        (initiator, responder)
    }

    /// Runs `ticks` steps and reports the final state.
    pub fn run(&mut self, ticks: u64) -> SimulationReport {
        for _ in 0..ticks {
            self.step();
        }
        let report = self.report();
        info!(
            ticks = report.ticks,
            secrets_match = report.secrets_match,
            initiator = ?report.initiator.state,
            responder = ?report.responder.state,
            "Simulation finished"
        );
        report
    }

    /// Snapshot of both nodes.
    pub fn report(&self) -> SimulationReport {
        let secrets_match = match (
            self.initiator.engine().shared_secret(),
            self.responder.engine().shared_secret(),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };

        SimulationReport {
            ticks: self.steps,
            drop_rate: self.drop_rate,
            secrets_match,
            initiator: peer_report(&self.initiator, &self.delivered[0]),
            responder: peer_report(&self.responder, &self.delivered[1]),
        }
    }

    pub fn initiator(&self) -> &SimNode {
        &self.initiator
    }

    pub fn responder(&self) -> &SimNode {
        &self.responder
    }

    pub fn initiator_mut(&mut self) -> &mut SimNode {
        &mut self.initiator
    }

    pub fn responder_mut(&mut self) -> &mut SimNode {
        &mut self.responder
    }

    fn now(&self) -> Instant {
        let elapsed = u32::try_from(self.steps).unwrap_or(u32::MAX);
        self.start + self.tick * elapsed
    }
}

fn peer_report(node: &SimNode, delivered: &[String]) -> PeerReport {
    let stats = node.router_stats();
    let link = node.transport().stats();
    PeerReport {
        role: node.role(),
        level: node.level(),
        state: node.engine().state(),
        fingerprint: node.engine().shared_secret().map(|s| s.fingerprint()),
        delivered: delivered.to_vec(),
        key_unavailable: stats.key_unavailable,
        malformed: stats.malformed,
        lines_sent: link.sent,
        lines_dropped: link.dropped,
        toggles: node.controller().toggle_count(),
    }
}
