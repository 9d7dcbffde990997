//! Send-side logic of a peer.
//!
//! The agent is evaluated once per tick and decides what, if anything, the
//! device sends:
//!
//! - Cleartext: the initiator sends a numbered hello every interval; the
//!   responder stays silent.
//! - Secured: activation resets the engine when the level changes, before
//!   any line is routed. The initiator opens the handshake on its first
//!   secured tick. Once the key exists both roles send a scripted pair
//!   once, then one ciphered numbered message every interval.

use std::time::{Duration, Instant};

use protocol::{HandshakeEngine, Role, SecurityLevel};
use tracing::{debug, info};

/// Literal line each role sends once the key is established.
pub fn scripted_passthrough(role: Role) -> &'static str {
    match role {
        Role::Initiator => "A plain check",
        Role::Responder => "B plain check",
    }
}

/// Ciphered line each role sends once the key is established.
pub fn scripted_ciphertext(role: Role) -> &'static str {
    match role {
        Role::Initiator => "Hey",
        Role::Responder => "Hello A",
    }
}

/// Periodic sender for one role.
#[derive(Debug, Clone)]
pub struct PeerAgent {
    role: Role,
    interval: Duration,
    sequence: u64,
    last_send: Option<Instant>,
    activated: bool,
    opened: bool,
    scripted_sent: bool,
}

impl PeerAgent {
    pub fn new(role: Role, interval: Duration) -> Self {
        Self {
            role,
            interval,
            sequence: 0,
            last_send: None,
            activated: false,
            opened: false,
            scripted_sent: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Sequence number of the last numbered message, 0 if none.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether the scripted pair went out in the current secured session.
    pub fn scripted_sent(&self) -> bool {
        self.scripted_sent
    }

    /// Whether the engine was reset for the current secured session.
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Returns to the initial state: counters, timers and activation.
    pub fn reset(&mut self) {
        self.sequence = 0;
        self.last_send = None;
        self.activated = false;
        self.opened = false;
        self.scripted_sent = false;
    }

    /// Starts a secured session: the agent and the engine go back to their
    /// initial state. Must run before the first line of the session is
    /// routed, so a `PG` answered afterwards is never discarded.
    pub fn activate(&mut self, engine: &mut HandshakeEngine) {
        self.reset();
        engine.reset();
        self.activated = true;
        debug!(role = %self.role, "Secured mode activated");
    }

    /// Decides this tick's outbound lines.
    pub fn on_tick(
        &mut self,
        level: SecurityLevel,
        now: Instant,
        engine: &mut HandshakeEngine,
    ) -> Vec<String> {
        if level.is_secured() {
            self.secured_tick(now, engine)
        } else {
            self.cleartext_tick(now)
        }
    }

    fn cleartext_tick(&mut self, now: Instant) -> Vec<String> {
        if self.role != Role::Initiator || !self.is_due(now) {
            return Vec::new();
        }
        let seq = self.next_sequence(now);
        vec![format!("{} says hello #{}", self.role.label(), seq)]
    }

    fn secured_tick(&mut self, now: Instant, engine: &mut HandshakeEngine) -> Vec<String> {
        if !self.activated {
            self.activate(engine);
        }
        if self.role == Role::Initiator && !self.opened {
            self.opened = true;
            return engine
                .begin_as_initiator()
                .map(|frame| vec![frame.to_line()])
                .unwrap_or_default();
        }

        let Some(key) = engine.cipher_key() else {
            return Vec::new();
        };

        if !self.scripted_sent {
            self.scripted_sent = true;
            self.last_send = Some(now);
            info!(role = %self.role, "Sending scripted pair");
            return vec![
                scripted_passthrough(self.role).to_string(),
                key.encode_line(scripted_ciphertext(self.role).as_bytes()),
            ];
        }

        if !self.is_due(now) {
            return Vec::new();
        }
        let seq = self.next_sequence(now);
        let text = format!("{} secure #{}", self.role.label(), seq);
        vec![key.encode_line(text.as_bytes())]
    }

    fn is_due(&self, now: Instant) -> bool {
        match self.last_send {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    fn next_sequence(&mut self, now: Instant) -> u64 {
        self.sequence += 1;
        self.last_send = Some(now);
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{DhParameters, HandshakeState, KeyPair, RandomSource};

    const INTERVAL: Duration = Duration::from_millis(100);

    struct FixedScalar(u64);

    impl RandomSource for FixedScalar {
        fn random_int(&mut self, _low: u64, _high: u64) -> u64 {
            self.0
        }
    }

    fn engine(role: Role) -> HandshakeEngine {
        HandshakeEngine::new(role, DhParameters::default())
    }

    /// Brings an initiator engine to Complete with scalars 7 and 11.
    fn complete_initiator(engine: &mut HandshakeEngine) {
        use protocol::ControlFrame;
        let params = DhParameters::default();
        let responder = KeyPair::from_private(&params, 11);
        engine.on_control_frame(&ControlFrame::ack(), &mut FixedScalar(7));
        engine.on_control_frame(
            &ControlFrame::bkey(responder.public_value()),
            &mut FixedScalar(7),
        );
    }

    #[test]
    fn test_cleartext_initiator_sends_immediately_then_on_interval() {
        let mut agent = PeerAgent::new(Role::Initiator, INTERVAL);
        let mut engine = engine(Role::Initiator);
        let t0 = Instant::now();

        assert_eq!(
            agent.on_tick(SecurityLevel::Cleartext, t0, &mut engine),
            ["A says hello #1"]
        );
        assert!(agent
            .on_tick(SecurityLevel::Cleartext, t0 + INTERVAL / 2, &mut engine)
            .is_empty());
        assert_eq!(
            agent.on_tick(SecurityLevel::Cleartext, t0 + INTERVAL, &mut engine),
            ["A says hello #2"]
        );
        assert_eq!(agent.sequence(), 2);
        assert_eq!(engine.state(), HandshakeState::Idle);
    }

    #[test]
    fn test_cleartext_responder_is_silent() {
        let mut agent = PeerAgent::new(Role::Responder, INTERVAL);
        let mut engine = engine(Role::Responder);
        let t0 = Instant::now();

        for i in 0..5 {
            assert!(agent
                .on_tick(SecurityLevel::Cleartext, t0 + INTERVAL * i, &mut engine)
                .is_empty());
        }
    }

    #[test]
    fn test_secured_initiator_opens_handshake_once() {
        let mut agent = PeerAgent::new(Role::Initiator, INTERVAL);
        let mut engine = engine(Role::Initiator);
        let t0 = Instant::now();

        assert_eq!(
            agent.on_tick(SecurityLevel::Secured, t0, &mut engine),
            ["PG:2089,2"]
        );
        assert_eq!(engine.state(), HandshakeState::ParamsSent);
        assert!(agent
            .on_tick(SecurityLevel::Secured, t0 + INTERVAL * 10, &mut engine)
            .is_empty());
    }

    #[test]
    fn test_activated_responder_keeps_answered_pg() {
        let mut agent = PeerAgent::new(Role::Responder, INTERVAL);
        let mut engine = engine(Role::Responder);
        agent.activate(&mut engine);
        assert!(agent.is_activated());

        // PG arrives and is answered in the same tick, before the agent runs.
        engine.on_control_frame(
            &protocol::ControlFrame::pg(&DhParameters::default()),
            &mut FixedScalar(11),
        );
        let lines = agent.on_tick(SecurityLevel::Secured, Instant::now(), &mut engine);

        assert!(lines.is_empty());
        assert_eq!(engine.state(), HandshakeState::AckReceived);
    }

    #[test]
    fn test_activated_initiator_still_opens_handshake() {
        let mut agent = PeerAgent::new(Role::Initiator, INTERVAL);
        let mut engine = engine(Role::Initiator);
        agent.activate(&mut engine);

        assert_eq!(
            agent.on_tick(SecurityLevel::Secured, Instant::now(), &mut engine),
            ["PG:2089,2"]
        );
        assert_eq!(engine.state(), HandshakeState::ParamsSent);
    }

    #[test]
    fn test_secured_responder_only_resets() {
        let mut agent = PeerAgent::new(Role::Responder, INTERVAL);
        let mut engine = engine(Role::Responder);
        engine.on_control_frame(
            &protocol::ControlFrame::pg(&DhParameters::default()),
            &mut FixedScalar(11),
        );
        assert_eq!(engine.state(), HandshakeState::AckReceived);

        let lines = agent.on_tick(SecurityLevel::Secured, Instant::now(), &mut engine);

        assert!(lines.is_empty());
        assert_eq!(engine.state(), HandshakeState::Idle);
    }

    #[test]
    fn test_scripted_pair_sent_exactly_once() {
        let mut agent = PeerAgent::new(Role::Initiator, INTERVAL);
        let mut engine = engine(Role::Initiator);
        let t0 = Instant::now();

        agent.on_tick(SecurityLevel::Secured, t0, &mut engine);
        complete_initiator(&mut engine);
        let key = engine.cipher_key().unwrap();

        let pair = agent.on_tick(SecurityLevel::Secured, t0, &mut engine);
        assert_eq!(pair.len(), 2);
        assert_eq!(pair[0], "A plain check");
        assert_eq!(key.decode_line(&pair[1]).unwrap(), b"Hey");
        assert!(agent.scripted_sent());

        // Not gated by the interval, and never repeated.
        assert!(agent
            .on_tick(SecurityLevel::Secured, t0 + INTERVAL / 2, &mut engine)
            .is_empty());

        let steady = agent.on_tick(SecurityLevel::Secured, t0 + INTERVAL, &mut engine);
        assert_eq!(steady.len(), 1);
        assert_eq!(key.decode_line(&steady[0]).unwrap(), b"A secure #1");

        let next = agent.on_tick(SecurityLevel::Secured, t0 + INTERVAL * 2, &mut engine);
        assert_eq!(key.decode_line(&next[0]).unwrap(), b"A secure #2");
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut agent = PeerAgent::new(Role::Initiator, INTERVAL);
        let mut engine = engine(Role::Initiator);
        let t0 = Instant::now();

        agent.on_tick(SecurityLevel::Cleartext, t0, &mut engine);
        agent.on_tick(SecurityLevel::Cleartext, t0 + INTERVAL, &mut engine);
        assert_eq!(agent.sequence(), 2);

        agent.reset();

        assert_eq!(agent.sequence(), 0);
        assert!(!agent.scripted_sent());
        assert_eq!(
            agent.on_tick(SecurityLevel::Cleartext, t0 + INTERVAL, &mut engine),
            ["A says hello #1"]
        );
    }

    #[test]
    fn test_scripted_content_differs_by_role() {
        assert_ne!(
            scripted_passthrough(Role::Initiator),
            scripted_passthrough(Role::Responder)
        );
        assert_ne!(
            scripted_ciphertext(Role::Initiator),
            scripted_ciphertext(Role::Responder)
        );
    }
}
