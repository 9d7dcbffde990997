//! Security level switch.
//!
//! Changing the level is destructive: the handshake engine and the agent
//! are both returned to their initial state, so the old shared secret and
//! cipher key are gone and ciphertext still in flight can no longer be read.

use protocol::{HandshakeEngine, SecurityLevel};
use tracing::info;

use crate::agent::PeerAgent;

#[derive(Debug, Clone)]
pub struct SecurityLevelController {
    level: SecurityLevel,
    toggles: u64,
}

impl SecurityLevelController {
    pub fn new(initial: SecurityLevel) -> Self {
        Self {
            level: initial,
            toggles: 0,
        }
    }

    pub fn current_level(&self) -> SecurityLevel {
        self.level
    }

    /// Number of toggles since creation.
    pub fn toggle_count(&self) -> u64 {
        self.toggles
    }

    /// Flips between cleartext and secured and resets the session.
    pub fn toggle(&mut self, engine: &mut HandshakeEngine, agent: &mut PeerAgent) -> SecurityLevel {
        self.toggles += 1;
        let to = self.level.toggled();
        self.switch(to, engine, agent);
        to
    }

    /// Moves to an explicit level and resets the session.
    pub fn set_level(
        &mut self,
        level: SecurityLevel,
        engine: &mut HandshakeEngine,
        agent: &mut PeerAgent,
    ) {
        self.switch(level, engine, agent);
    }

    fn switch(&mut self, to: SecurityLevel, engine: &mut HandshakeEngine, agent: &mut PeerAgent) {
        info!(role = %engine.role(), from = %self.level, to = %to, "Security level changed");
        self.level = to;
        engine.reset();
        agent.reset();
        if to.is_secured() {
            agent.activate(engine);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{ControlFrame, DhParameters, HandshakeState, RandomSource, Role};
    use std::time::{Duration, Instant};

    struct FixedScalar(u64);

    impl RandomSource for FixedScalar {
        fn random_int(&mut self, _low: u64, _high: u64) -> u64 {
            self.0
        }
    }

    fn parts(role: Role) -> (HandshakeEngine, PeerAgent) {
        (
            HandshakeEngine::new(role, DhParameters::default()),
            PeerAgent::new(role, Duration::from_millis(100)),
        )
    }

    #[test]
    fn test_toggle_alternates_two_levels() {
        let (mut engine, mut agent) = parts(Role::Initiator);
        let mut controller = SecurityLevelController::new(SecurityLevel::Cleartext);

        assert_eq!(
            controller.toggle(&mut engine, &mut agent),
            SecurityLevel::Secured
        );
        assert_eq!(
            controller.toggle(&mut engine, &mut agent),
            SecurityLevel::Cleartext
        );
        assert_eq!(controller.toggle_count(), 2);
    }

    #[test]
    fn test_enhanced_toggles_to_cleartext() {
        let (mut engine, mut agent) = parts(Role::Initiator);
        let mut controller = SecurityLevelController::new(SecurityLevel::Enhanced);
        assert_eq!(
            controller.toggle(&mut engine, &mut agent),
            SecurityLevel::Cleartext
        );
    }

    #[test]
    fn test_toggle_in_complete_discards_key() {
        let (mut engine, mut agent) = parts(Role::Responder);
        let mut controller = SecurityLevelController::new(SecurityLevel::Secured);

        let params = DhParameters::default();
        engine.on_control_frame(&ControlFrame::pg(&params), &mut FixedScalar(11));
        engine.on_control_frame(&ControlFrame::akey(128), &mut FixedScalar(11));
        assert!(engine.is_complete());
        let old_key = engine.cipher_key().unwrap();

        controller.toggle(&mut engine, &mut agent);

        assert_eq!(engine.state(), HandshakeState::Idle);
        assert_eq!(engine.shared_secret(), None);
        assert_eq!(engine.cipher_key(), None);

        // A new session with different scalars yields a different key.
        controller.toggle(&mut engine, &mut agent);
        engine.on_control_frame(&ControlFrame::pg(&params), &mut FixedScalar(13));
        engine.on_control_frame(&ControlFrame::akey(128), &mut FixedScalar(13));
        let new_key = engine.cipher_key().unwrap();
        assert_ne!(old_key, new_key);

        let wire = new_key.encode_line(b"Hey");
        assert_ne!(old_key.decode_line(&wire).unwrap(), b"Hey");
    }

    #[test]
    fn test_toggle_resets_agent() {
        let (mut engine, mut agent) = parts(Role::Initiator);
        let mut controller = SecurityLevelController::new(SecurityLevel::Cleartext);
        agent.on_tick(SecurityLevel::Cleartext, Instant::now(), &mut engine);
        assert_eq!(agent.sequence(), 1);

        controller.toggle(&mut engine, &mut agent);

        assert_eq!(agent.sequence(), 0);
        assert!(agent.is_activated());

        controller.toggle(&mut engine, &mut agent);
        assert!(!agent.is_activated());
    }

    #[test]
    fn test_set_level_is_destructive() {
        let (mut engine, mut agent) = parts(Role::Initiator);
        let mut controller = SecurityLevelController::new(SecurityLevel::Cleartext);
        engine.begin_as_initiator();

        controller.set_level(SecurityLevel::Secured, &mut engine, &mut agent);

        assert_eq!(controller.current_level(), SecurityLevel::Secured);
        assert_eq!(engine.state(), HandshakeState::Idle);
        assert_eq!(controller.toggle_count(), 0);
    }
}
