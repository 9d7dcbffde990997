//! One device: the explicit context passed through every tick.
//!
//! A node owns its handshake engine, router, agent and level controller
//! together with the three injected collaborators. Each call to
//! [`Node::tick`] runs, in order:
//!
//! 1. poll the toggle input; on a press, toggle the level and flash status
//! 2. receive at most one line, route it, send any reply, render the event
//! 3. evaluate the agent once and send what it produces
//!
//! Nothing blocks. Transport send failures are logged and the tick goes on.

use std::time::{Duration, Instant};

use protocol::{DhParameters, HandshakeEngine, RandomSource, Role, SecurityLevel};
use tracing::warn;

use crate::agent::PeerAgent;
use crate::config::{Config, ConfigError};
use crate::controller::SecurityLevelController;
use crate::ports::{LineTransport, StatusRenderer, ToggleInput};
use crate::router::{MessageRouter, RouterEvent, RouterStats};

/// Static settings of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSettings {
    pub role: Role,
    pub level: SecurityLevel,
    pub params: DhParameters,
    pub send_interval: Duration,
}

impl NodeSettings {
    /// Settings from configuration, with an explicit role.
    pub fn from_config(config: &Config, role: Role) -> Result<Self, ConfigError> {
        Ok(Self {
            role,
            level: config.node.level,
            params: config.dh_parameters()?,
            send_interval: config.send_interval(),
        })
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Level after a toggle press, if there was one.
    pub toggled_to: Option<SecurityLevel>,
    /// Event from the routed line, if a line was received.
    pub event: Option<RouterEvent>,
    /// Lines handed to the transport successfully.
    pub sent: usize,
    /// Lines the transport refused.
    pub send_failures: usize,
}

/// One device on the link.
pub struct Node<T: LineTransport, R: StatusRenderer, I: ToggleInput> {
    role: Role,
    engine: HandshakeEngine,
    router: MessageRouter,
    agent: PeerAgent,
    controller: SecurityLevelController,
    transport: T,
    renderer: R,
    input: I,
    ticks: u64,
}

impl<T: LineTransport, R: StatusRenderer, I: ToggleInput> Node<T, R, I> {
    pub fn new(settings: NodeSettings, transport: T, renderer: R, input: I) -> Self {
        let mut engine = HandshakeEngine::new(settings.role, settings.params);
        let mut agent = PeerAgent::new(settings.role, settings.send_interval);
        if settings.level.is_secured() {
            agent.activate(&mut engine);
        }
        Self {
            role: settings.role,
            engine,
            router: MessageRouter::new(),
            agent,
            controller: SecurityLevelController::new(settings.level),
            transport,
            renderer,
            input,
            ticks: 0,
        }
    }

    /// Runs one tick at monotonic time `now`.
    pub fn tick(&mut self, now: Instant, rng: &mut dyn RandomSource) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        self.ticks += 1;

        if self.input.is_toggle_pressed() {
            let level = self.controller.toggle(&mut self.engine, &mut self.agent);
            self.renderer.flash_status(self.role, level);
            outcome.toggled_to = Some(level);
        }

        if let Some(line) = self.transport.try_receive_line() {
            let level = self.controller.current_level();
            let routed = self.router.route(&line, level, &mut self.engine, rng);
            if let Some(reply) = routed.reply {
                self.send(&reply, &mut outcome);
            }
            if let Some(text) = routed.event.display_text() {
                self.renderer.render_line(&text);
            }
            outcome.event = Some(routed.event);
        }

        let level = self.controller.current_level();
        for line in self.agent.on_tick(level, now, &mut self.engine) {
            self.send(&line, &mut outcome);
        }

        outcome
    }

    /// Toggles the level as if the input had been pressed.
    pub fn toggle_level(&mut self) -> SecurityLevel {
        let level = self.controller.toggle(&mut self.engine, &mut self.agent);
        self.renderer.flash_status(self.role, level);
        level
    }

    /// Moves to an explicit level. Resets the session like a toggle.
    pub fn set_level(&mut self, level: SecurityLevel) {
        self.controller
            .set_level(level, &mut self.engine, &mut self.agent);
        self.renderer.flash_status(self.role, level);
    }

    fn send(&mut self, line: &str, outcome: &mut TickOutcome) {
        match self.transport.send(line) {
            Ok(()) => outcome.sent += 1,
            Err(e) => {
                warn!(role = %self.role, error = %e, "Failed to send line");
                outcome.send_failures += 1;
            }
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn level(&self) -> SecurityLevel {
        self.controller.current_level()
    }

    pub fn engine(&self) -> &HandshakeEngine {
        &self.engine
    }

    pub fn agent(&self) -> &PeerAgent {
        &self.agent
    }

    pub fn controller(&self) -> &SecurityLevelController {
        &self.controller
    }

    pub fn router_stats(&self) -> RouterStats {
        self.router.stats()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
