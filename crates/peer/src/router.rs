//! Message router for dispatching received lines.
//!
//! This module provides the `MessageRouter` struct that takes each received
//! line, classifies it and routes it by security level:
//!
//! - Cleartext: every line is surfaced verbatim; the handshake is bypassed.
//! - Secured: control frames go to the [`HandshakeEngine`]; payloads are
//!   deciphered when the key exists and reported as `KeyUnavailable` when it
//!   does not.

use protocol::{
    classify, Frame, HandshakeEngine, ProtocolError, RandomSource, SecurityLevel, StateChange,
};
use tracing::{debug, info, warn};

/// Something the application layer may want to show or count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// Text for the display: a cleartext line or a deciphered payload.
    ReceivedPlaintext(String),
    /// A control frame reached the handshake engine.
    Handshake(StateChange),
    /// A control frame completed the handshake.
    KeyEstablished {
        /// Short digest of the shared secret.
        fingerprint: String,
    },
    /// A payload arrived before the handshake completed; it was dropped.
    KeyUnavailable,
    /// A payload arrived with the key in place but is not a token line.
    MalformedPayload {
        /// The line as received.
        raw: String,
        /// Why the tokens were rejected.
        reason: String,
    },
}

impl RouterEvent {
    /// Text to render for this event, if any.
    ///
    /// Lines that are not ciphertext are shown as received, so literal
    /// messages sent over a secured link stay readable.
    pub fn display_text(&self) -> Option<String> {
        match self {
            RouterEvent::ReceivedPlaintext(text) => Some(text.clone()),
            RouterEvent::KeyEstablished { fingerprint } => Some(format!("key {}", fingerprint)),
            RouterEvent::KeyUnavailable => Some("[no key]".to_string()),
            RouterEvent::MalformedPayload { raw, .. } => Some(raw.clone()),
            RouterEvent::Handshake(_) => None,
        }
    }

    /// Plaintext carried by the event, if any.
    pub fn plaintext(&self) -> Option<&str> {
        match self {
            RouterEvent::ReceivedPlaintext(text) => Some(text),
            _ => None,
        }
    }
}

/// Result of routing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub event: RouterEvent,
    /// Control line to send back, if the handshake produced one.
    pub reply: Option<String>,
}

impl Routed {
    fn event(event: RouterEvent) -> Self {
        Self { event, reply: None }
    }
}

/// Counters kept by the router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Lines routed.
    pub lines: u64,
    /// Control frames handed to the engine.
    pub control: u64,
    /// Control frames the engine dropped.
    pub ignored_control: u64,
    /// Payload lines seen in secured mode.
    pub payload: u64,
    /// Lines surfaced as plaintext.
    pub plaintext: u64,
    /// Payloads dropped for lack of a key.
    pub key_unavailable: u64,
    /// Payloads that were not token lines.
    pub malformed: u64,
}

/// Routes received lines to the handshake engine or the cipher.
#[derive(Debug, Default)]
pub struct MessageRouter {
    stats: RouterStats,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Route one received line.
    ///
    /// Returns the event to surface and, when the handshake advanced with a
    /// reply, the control line to send back.
    pub fn route(
        &mut self,
        line: &str,
        level: SecurityLevel,
        engine: &mut HandshakeEngine,
        rng: &mut dyn RandomSource,
    ) -> Routed {
        self.stats.lines += 1;

        if !level.is_secured() {
            debug!(line = %line, "Cleartext line");
            self.stats.plaintext += 1;
            return Routed::event(RouterEvent::ReceivedPlaintext(line.to_string()));
        }

        match classify(line) {
            Frame::Control(frame) => {
                self.stats.control += 1;
                let change = engine.on_control_frame(&frame, rng);
                let reply = change.reply().map(|f| f.to_line());

                if change.is_ignored() {
                    self.stats.ignored_control += 1;
                }

                let event = match (change.key_established(), engine.shared_secret()) {
                    (true, Some(secret)) => {
                        let fingerprint = secret.fingerprint();
                        info!(role = %engine.role(), fingerprint = %fingerprint, "Shared key established");
                        RouterEvent::KeyEstablished { fingerprint }
                    }
                    _ => RouterEvent::Handshake(change),
                };

                Routed { event, reply }
            }
            Frame::Payload(text) => {
                self.stats.payload += 1;

                let Some(key) = engine.cipher_key() else {
                    debug!(state = ?engine.state(), "Payload before key; dropping");
                    self.stats.key_unavailable += 1;
                    return Routed::event(RouterEvent::KeyUnavailable);
                };

                match key.decode_line(&text) {
                    Ok(bytes) => {
                        self.stats.plaintext += 1;
                        let plaintext = String::from_utf8_lossy(&bytes).into_owned();
                        Routed::event(RouterEvent::ReceivedPlaintext(plaintext))
                    }
                    Err(err) => {
                        self.stats.malformed += 1;
                        let reason = match err {
                            ProtocolError::MalformedPayload(reason) => reason,
                            other => {
                                warn!(error = %other, "Unexpected payload error");
                                other.to_string()
                            }
                        };
                        debug!(line = %text, reason = %reason, "Payload is not ciphertext");
                        Routed::event(RouterEvent::MalformedPayload { raw: text, reason })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{ControlFrame, DhParameters, HandshakeState, Role, SeededRandom};

    /// Random source returning one fixed scalar.
    struct FixedScalar(u64);

    impl RandomSource for FixedScalar {
        fn random_int(&mut self, _low: u64, _high: u64) -> u64 {
            self.0
        }
    }

    fn engine(role: Role) -> HandshakeEngine {
        HandshakeEngine::new(role, DhParameters::default())
    }

    /// Drive two engines to Complete through two routers (scalars 7 and 11).
    fn completed_pair() -> (HandshakeEngine, HandshakeEngine) {
        let mut a = engine(Role::Initiator);
        let mut b = engine(Role::Responder);
        let mut router_a = MessageRouter::new();
        let mut router_b = MessageRouter::new();
        let level = SecurityLevel::Secured;

        let pg = a.begin_as_initiator().unwrap().to_line();
        let ack = router_b
            .route(&pg, level, &mut b, &mut FixedScalar(11))
            .reply
            .unwrap();
        let akey = router_a
            .route(&ack, level, &mut a, &mut FixedScalar(7))
            .reply
            .unwrap();
        let bkey = router_b
            .route(&akey, level, &mut b, &mut FixedScalar(11))
            .reply
            .unwrap();
        router_a.route(&bkey, level, &mut a, &mut FixedScalar(7));

        (a, b)
    }

    #[test]
    fn test_cleartext_bypasses_handshake() {
        let mut router = MessageRouter::new();
        let mut engine = engine(Role::Responder);
        let mut rng = SeededRandom::from_seed(1);

        let routed = router.route("PG:2089,2", SecurityLevel::Cleartext, &mut engine, &mut rng);

        assert_eq!(
            routed.event,
            RouterEvent::ReceivedPlaintext("PG:2089,2".to_string())
        );
        assert_eq!(routed.reply, None);
        assert_eq!(engine.state(), HandshakeState::Idle);
        assert_eq!(router.stats().plaintext, 1);
        assert_eq!(router.stats().control, 0);
    }

    #[test]
    fn test_control_frame_produces_reply() {
        let mut router = MessageRouter::new();
        let mut engine = engine(Role::Responder);
        let mut rng = SeededRandom::from_seed(1);

        let routed = router.route("PG:2089,2", SecurityLevel::Secured, &mut engine, &mut rng);

        assert_eq!(routed.reply.as_deref(), Some("ACK"));
        assert!(matches!(routed.event, RouterEvent::Handshake(_)));
        assert_eq!(routed.event.display_text(), None);
        assert_eq!(engine.state(), HandshakeState::AckReceived);
    }

    #[test]
    fn test_key_established_event() {
        let mut a = engine(Role::Initiator);
        let mut b = engine(Role::Responder);
        let mut router = MessageRouter::new();
        let level = SecurityLevel::Secured;

        a.begin_as_initiator();
        router.route("PG:2089,2", level, &mut b, &mut FixedScalar(11));
        let akey = ControlFrame::akey(128).to_line();
        let routed = router.route(&akey, level, &mut b, &mut FixedScalar(11));

        assert_eq!(routed.reply.as_deref(), Some("BKEY:2048"));
        let secret = b.shared_secret().unwrap();
        assert_eq!(
            routed.event,
            RouterEvent::KeyEstablished {
                fingerprint: secret.fingerprint()
            }
        );
    }

    #[test]
    fn test_payload_before_key_is_unavailable() {
        let mut router = MessageRouter::new();
        let mut engine = engine(Role::Responder);
        let mut rng = SeededRandom::from_seed(1);

        let routed = router.route("72 101 121", SecurityLevel::Secured, &mut engine, &mut rng);

        assert_eq!(routed.event, RouterEvent::KeyUnavailable);
        assert_eq!(routed.event.plaintext(), None);
        assert_eq!(routed.reply, None);
        assert_eq!(router.stats().key_unavailable, 1);
    }

    #[test]
    fn test_payload_after_key_is_deciphered() {
        let (a, mut b) = completed_pair();
        let wire = a.cipher_key().unwrap().encode_line(b"Hey");
        let mut router = MessageRouter::new();

        let routed = router.route(&wire, SecurityLevel::Secured, &mut b, &mut FixedScalar(11));

        assert_eq!(routed.event.plaintext(), Some("Hey"));
        assert_eq!(router.stats().plaintext, 1);
    }

    #[test]
    fn test_enhanced_routes_like_secured() {
        let (a, mut b) = completed_pair();
        let wire = a.cipher_key().unwrap().encode_line(b"Hey");
        let mut router = MessageRouter::new();

        let routed = router.route(&wire, SecurityLevel::Enhanced, &mut b, &mut FixedScalar(11));

        assert_eq!(routed.event.plaintext(), Some("Hey"));
    }

    #[test]
    fn test_literal_line_on_secured_link_is_malformed() {
        let (_a, mut b) = completed_pair();
        let mut router = MessageRouter::new();

        let routed = router.route(
            "A plain check",
            SecurityLevel::Secured,
            &mut b,
            &mut FixedScalar(11),
        );

        match &routed.event {
            RouterEvent::MalformedPayload { raw, .. } => assert_eq!(raw, "A plain check"),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            routed.event.display_text().as_deref(),
            Some("A plain check")
        );
        assert_eq!(router.stats().malformed, 1);
    }

    #[test]
    fn test_own_role_frame_is_counted_as_ignored() {
        let mut router = MessageRouter::new();
        let mut engine = engine(Role::Responder);
        let mut rng = SeededRandom::from_seed(1);

        let routed = router.route("ACK", SecurityLevel::Secured, &mut engine, &mut rng);

        assert!(matches!(
            routed.event,
            RouterEvent::Handshake(StateChange::Ignored(ProtocolError::WrongRoleFrame { .. }))
        ));
        assert_eq!(routed.reply, None);
        assert_eq!(router.stats().ignored_control, 1);
        assert_eq!(engine.state(), HandshakeState::Idle);
    }
}
