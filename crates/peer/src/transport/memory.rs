//! In-process line link between two endpoints.
//!
//! Each endpoint owns the sending half of one queue and the receiving half
//! of the other. Lines can be lost on send, either at random with the
//! configured drop rate or deterministically by prefix, which models the
//! unreliable byte link the handshake runs over.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::ports::{check_line, LineTransport, TransportError};

type Queue = Rc<RefCell<VecDeque<String>>>;

/// Counters for one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Lines accepted by `send`.
    pub sent: u64,
    /// Lines lost before delivery.
    pub dropped: u64,
    /// Lines handed out by `try_receive_line`.
    pub received: u64,
}

/// Factory for connected endpoint pairs.
pub struct MemoryLink;

impl MemoryLink {
    /// Creates two connected endpoints that lose lines with `drop_rate`.
    ///
    /// `seed` drives the loss model only. `drop_rate` is clamped to `[0, 1]`.
    pub fn pair(drop_rate: f64, seed: u64) -> (MemoryEndpoint, MemoryEndpoint) {
        let a_to_b: Queue = Rc::new(RefCell::new(VecDeque::new()));
        let b_to_a: Queue = Rc::new(RefCell::new(VecDeque::new()));
        let drop_rate = drop_rate.clamp(0.0, 1.0);

        let a = MemoryEndpoint::new(Rc::clone(&a_to_b), Rc::clone(&b_to_a), drop_rate, seed);
        let b = MemoryEndpoint::new(b_to_a, a_to_b, drop_rate, seed.wrapping_add(1));
        (a, b)
    }

    /// Creates two connected endpoints that never lose lines.
    pub fn lossless() -> (MemoryEndpoint, MemoryEndpoint) {
        Self::pair(0.0, 0)
    }
}

/// One end of a [`MemoryLink`].
pub struct MemoryEndpoint {
    outbound: Queue,
    inbound: Queue,
    drop_rate: f64,
    rng: StdRng,
    drop_prefixes: Vec<String>,
    stats: LinkStats,
}

impl MemoryEndpoint {
    fn new(outbound: Queue, inbound: Queue, drop_rate: f64, seed: u64) -> Self {
        Self {
            outbound,
            inbound,
            drop_rate,
            rng: StdRng::seed_from_u64(seed),
            drop_prefixes: Vec::new(),
            stats: LinkStats::default(),
        }
    }

    /// Loses every line this endpoint sends that starts with `prefix`.
    pub fn drop_lines_starting_with(&mut self, prefix: impl Into<String>) {
        self.drop_prefixes.push(prefix.into());
    }

    /// Stops losing lines by prefix.
    pub fn clear_drop_rules(&mut self) {
        self.drop_prefixes.clear();
    }

    /// Lines waiting to be received by this endpoint.
    pub fn pending(&self) -> usize {
        self.inbound.borrow().len()
    }

    /// Counters for this endpoint.
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    fn loses(&mut self, line: &str) -> bool {
        if self.drop_prefixes.iter().any(|p| line.starts_with(p.as_str())) {
            return true;
        }
        self.drop_rate > 0.0 && self.rng.gen_bool(self.drop_rate)
    }
}

impl LineTransport for MemoryEndpoint {
    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        check_line(line)?;
        self.stats.sent += 1;

        if self.loses(line) {
            self.stats.dropped += 1;
            debug!(line = %line, "Link lost line");
            return Ok(());
        }

        self.outbound.borrow_mut().push_back(line.to_string());
        Ok(())
    }

    fn try_receive_line(&mut self) -> Option<String> {
        let line = self.inbound.borrow_mut().pop_front();
        if line.is_some() {
            self.stats.received += 1;
        }
        line
    }
}
