use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::TryRngCore;
use uuid::Uuid;

use crate::error::IdentifierError;
use crate::model::identifier::{is_registered_prefix, is_valid};
use crate::model::{EntityKind, Identifier};

/// 100ns ticks between 1582-10-15T00:00:00Z and the Unix epoch.
const GREGORIAN_OFFSET_TICKS: u64 = 0x01B2_1DD2_1381_4000;

const VERSION_1: u64 = 0x1 << 12;
const VARIANT_MASK: u64 = 0x3FFF_FFFF_FFFF_FFFF;
const VARIANT_RFC4122: u64 = 0x8000_0000_0000_0000;

/// Mints time-ordered identifiers with a random node half.
///
/// Minting is serialized through `last_tick`; the tick handed out is strictly
/// increasing for the lifetime of the generator, so two identifiers from the
/// same process never share a timestamp.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_tick: Mutex<u64>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self, kind: EntityKind) -> Result<Identifier, IdentifierError> {
        self.mint(kind.prefix())
    }

    /// Mints for a raw prefix; unregistered prefixes are rejected.
    pub fn generate_with_prefix(&self, prefix: &str) -> Result<Identifier, IdentifierError> {
        if !is_registered_prefix(prefix) {
            return Err(IdentifierError::UnknownKind(prefix.to_string()));
        }
        self.mint(prefix)
    }

    /// Keeps a valid supplied identifier unchanged, otherwise mints a new one.
    pub fn assign_or_generate(
        &self,
        kind: EntityKind,
        supplied: Option<&str>,
    ) -> Result<Identifier, IdentifierError> {
        match supplied {
            Some(candidate) if is_valid(candidate) => Identifier::parse(candidate),
            _ => self.generate(kind),
        }
    }

    fn mint(&self, prefix: &str) -> Result<Identifier, IdentifierError> {
        let mut last_tick = self.last_tick.lock();

        let now = current_tick();
        let tick = if now > *last_tick { now } else { *last_tick + 1 };

        let random = OsRng
            .try_next_u64()
            .map_err(|e| IdentifierError::EntropyUnavailable(e.to_string()))?;
        *last_tick = tick;
        drop(last_tick);

        let uuid = Uuid::from_u64_pair(most_significant_bits(tick), least_significant_bits(random));
        Ok(Identifier::from_parts(prefix, uuid))
    }
}

fn current_tick() -> u64 {
    let now = Utc::now();
    let secs = now.timestamp().max(0) as u64;
    let sub_ticks = u64::from(now.timestamp_subsec_nanos()) / 100;
    secs * 10_000_000 + sub_ticks + GREGORIAN_OFFSET_TICKS
}

/// time_low(32) | time_mid(16) | version(4) | time_hi(12)
fn most_significant_bits(tick: u64) -> u64 {
    let time_low = tick & 0xFFFF_FFFF;
    let time_mid = (tick >> 32) & 0xFFFF;
    let time_hi = (tick >> 48) & 0x0FFF;
    (time_low << 32) | (time_mid << 16) | VERSION_1 | time_hi
}

fn least_significant_bits(random: u64) -> u64 {
    (random & VARIANT_MASK) | VARIANT_RFC4122
}
