//! Finite-field Diffie-Hellman over small integer groups.
//!
//! Both peers generate a private scalar in `[2, p-2]`, exchange
//! `g^scalar mod p`, and raise the peer's value to their own scalar. The
//! resulting shared secret is reduced to a single byte for the payload
//! cipher.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cipher::CipherKey;
use crate::error::{ProtocolError, Result};

/// Default prime modulus sent by the initiator.
pub const DEFAULT_MODULUS: u64 = 2089;

/// Default generator (a primitive root of [`DEFAULT_MODULUS`]).
pub const DEFAULT_GENERATOR: u64 = 2;

/// Smallest modulus for which the private scalar range `[2, p-2]` is non-empty.
pub const MIN_MODULUS: u64 = 5;

/// Computes `base^exp mod modulus` by square-and-multiply.
///
/// Intermediate products are held in `u128`, so any `u64` modulus is safe.
/// Returns 0 when `modulus <= 1`.
pub fn mod_pow(base: u64, exp: u64, modulus: u64) -> u64 {
    if modulus <= 1 {
        return 0;
    }

    let m = modulus as u128;
    let mut result: u128 = 1;
    let mut base = base as u128 % m;
    let mut exp = exp;

    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % m;
        }
        base = base * base % m;
        exp >>= 1;
    }

    result as u64
}

/// Source of uniformly distributed integers for key generation.
pub trait RandomSource {
    /// Returns an integer in `[low, high]`, inclusive on both ends.
    fn random_int(&mut self, low: u64, high: u64) -> u64;
}

/// Process-wide generator, seeded exactly once.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Creates a generator with a fixed seed (reproducible runs).
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a generator seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn random_int(&mut self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Group parameters chosen by the initiator.
///
/// The modulus is expected to be prime and the generator a primitive root;
/// neither property is checked at runtime.
///
/// Only [`DhParameters::new`] builds a value, and deserialization goes
/// through it too, so every instance satisfies `p >= 5` and `2 <= g < p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDhParameters")]
pub struct DhParameters {
    modulus: u64,
    generator: u64,
}

#[derive(Deserialize)]
struct RawDhParameters {
    modulus: u64,
    generator: u64,
}

impl TryFrom<RawDhParameters> for DhParameters {
    type Error = ProtocolError;

    fn try_from(raw: RawDhParameters) -> Result<Self> {
        Self::new(raw.modulus, raw.generator)
    }
}

impl DhParameters {
    /// Creates parameters after checking the ranges the exchange depends on.
    pub fn new(modulus: u64, generator: u64) -> Result<Self> {
        if modulus < MIN_MODULUS {
            return Err(ProtocolError::InvalidParameters(format!(
                "modulus {} is below the minimum of {}",
                modulus, MIN_MODULUS
            )));
        }
        if generator < 2 || generator >= modulus {
            return Err(ProtocolError::InvalidParameters(format!(
                "generator {} must be in [2, {}]",
                generator,
                modulus - 1
            )));
        }
        Ok(Self { modulus, generator })
    }

    /// Prime modulus `p`.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Generator `g`.
    pub fn generator(&self) -> u64 {
        self.generator
    }

    /// Checks that a peer's public value lies in `[1, p-1]`.
    pub fn check_public_value(&self, value: u64) -> Result<u64> {
        if value == 0 || value >= self.modulus {
            return Err(ProtocolError::InvalidParameters(format!(
                "public value {} must be in [1, {}]",
                value,
                self.modulus.saturating_sub(1)
            )));
        }
        Ok(value)
    }
}

impl Default for DhParameters {
    fn default() -> Self {
        Self {
            modulus: DEFAULT_MODULUS,
            generator: DEFAULT_GENERATOR,
        }
    }
}

/// A private scalar and its public value for one handshake attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    private_scalar: u64,
    public_value: u64,
}

impl KeyPair {
    /// Draws a fresh private scalar in `[2, p-2]`.
    pub fn generate(params: &DhParameters, rng: &mut dyn RandomSource) -> Self {
        let scalar = rng.random_int(2, params.modulus.saturating_sub(2));
        Self::from_private(params, scalar)
    }

    /// Builds a keypair from a known private scalar.
    pub fn from_private(params: &DhParameters, private_scalar: u64) -> Self {
        Self {
            private_scalar,
            public_value: mod_pow(params.generator, private_scalar, params.modulus),
        }
    }

    /// The value sent to the peer.
    pub fn public_value(&self) -> u64 {
        self.public_value
    }

    /// Combines the peer's public value with our scalar.
    pub fn shared_secret(&self, params: &DhParameters, peer_public: u64) -> SharedSecret {
        SharedSecret(mod_pow(peer_public, self.private_scalar, params.modulus))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_value", &self.public_value)
            .field("private_scalar", &"[REDACTED]")
            .finish()
    }
}

/// The value both peers agree on once the handshake completes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SharedSecret(u64);

impl SharedSecret {
    /// Raw secret value in `[0, p-1]`.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Single-byte cipher key, `secret mod 256`.
    pub fn cipher_key(&self) -> CipherKey {
        CipherKey::new((self.0 % 256) as u8)
    }

    /// Short fingerprint safe to display or log, e.g. `ae11:5626`.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let hash = Sha256::digest(self.0.to_be_bytes());
        hash[..4]
            .chunks(2)
            .map(|chunk| format!("{:02x}{:02x}", chunk[0], chunk[1]))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedSecret").field(&self.fingerprint()).finish()
    }
}
