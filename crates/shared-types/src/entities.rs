//! # Core Domain Entities
//!
//! Defines the ledger entities exchanged between subsystems.
//!
//! ## Clusters
//!
//! - **Identity**: `PeerId`, `Hash`, `Timestamp`
//! - **Time**: `EpochId` (UTC calendar day)
//! - **Activity**: `MatchRecord`
//! - **Archive**: `MorgueId`

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// Milliseconds since the Unix epoch (UTC).
pub type Timestamp = u64;

/// Identifier the game layer assigns to a finished match.
pub type MatchId = String;

/// Render the first eight bytes of a hash for log lines.
pub fn short_hash(hash: &Hash) -> String {
    hex::encode(&hash[..8])
}

/// Errors raised while building or parsing entities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityError {
    /// Epoch identifiers are `YYYY-MM-DD` UTC dates.
    #[error("Invalid epoch id '{0}': expected YYYY-MM-DD")]
    InvalidEpochId(String),

    /// Peer identifiers are 32 bytes, hex encoded.
    #[error("Invalid peer id '{0}': expected 64 hex characters")]
    InvalidPeerId(String),

    /// Record could not be encoded.
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Unique identifier for a peer in the swarm.
///
/// The bytes are the peer's Ed25519 verifying key, so a signature can be
/// checked against the identifier alone. Human-readable encodings (JSON)
/// render it as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    /// Wrap raw key bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, EntityError> {
        let bytes = hex::decode(s).map_err(|_| EntityError::InvalidPeerId(s.to_string()))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EntityError::InvalidPeerId(s.to_string()))?;
        Ok(Self(array))
    }

    /// Abbreviated form for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.short())
    }
}

impl From<[u8; 32]> for PeerId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(self.0))
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            PeerId::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(PeerId)
        }
    }
}

// =============================================================================
// TIME
// =============================================================================

/// A UTC calendar day, the unit of ledger finalization.
///
/// Serialized as its `YYYY-MM-DD` string so it is stable across encodings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EpochId(NaiveDate);

impl EpochId {
    /// `chrono` format string for epoch ids.
    pub const FORMAT: &'static str = "%Y-%m-%d";

    /// Epoch for a calendar date.
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> Result<Self, EntityError> {
        NaiveDate::parse_from_str(s, Self::FORMAT)
            .map(Self)
            .map_err(|_| EntityError::InvalidEpochId(s.to_string()))
    }

    /// The calendar date this epoch covers.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The following day, if representable.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add_days(Days::new(1)).map(Self)
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl fmt::Debug for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EpochId({})", self)
    }
}

impl FromStr for EpochId {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EpochId {
    type Error = EntityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EpochId> for String {
    fn from(value: EpochId) -> Self {
        value.to_string()
    }
}

// =============================================================================
// ACTIVITY
// =============================================================================

/// A completed multiplayer session as reported by the game layer.
///
/// Immutable once created. `match_hash` is computed once, at match
/// completion, by [`MatchRecord::sealed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Game-assigned match identifier (sink upsert key).
    pub match_id: MatchId,
    /// Content hash over every other field.
    pub match_hash: Hash,
    /// Level / map the match was played on.
    pub level_id: String,
    /// Participant identifiers in join order.
    pub participants: Vec<String>,
    /// Match start (ms since Unix epoch).
    pub started_at: Timestamp,
    /// Match end (ms since Unix epoch).
    pub ended_at: Timestamp,
    /// Played time in milliseconds.
    pub duration_ms: u64,
    /// Per-participant scores.
    pub scores: BTreeMap<String, i64>,
    /// Winner, if the mode has one.
    pub winner: Option<String>,
    /// Peer that hosted the session.
    pub host: PeerId,
}

/// Borrowed view hashed to produce `match_hash`.
#[derive(Serialize)]
struct MatchContent<'a> {
    match_id: &'a str,
    level_id: &'a str,
    participants: &'a [String],
    started_at: Timestamp,
    ended_at: Timestamp,
    duration_ms: u64,
    scores: &'a BTreeMap<String, i64>,
    winner: &'a Option<String>,
    host: &'a PeerId,
}

impl MatchRecord {
    /// Start a record; duration is derived from the timestamps.
    pub fn new(
        match_id: impl Into<MatchId>,
        level_id: impl Into<String>,
        participants: Vec<String>,
        started_at: Timestamp,
        ended_at: Timestamp,
        host: PeerId,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            match_hash: [0u8; 32],
            level_id: level_id.into(),
            participants,
            started_at,
            ended_at,
            duration_ms: ended_at.saturating_sub(started_at),
            scores: BTreeMap::new(),
            winner: None,
            host,
        }
    }

    /// Record a participant's score.
    pub fn with_score(mut self, participant: impl Into<String>, score: i64) -> Self {
        self.scores.insert(participant.into(), score);
        self
    }

    /// Record the winner.
    pub fn with_winner(mut self, winner: impl Into<String>) -> Self {
        self.winner = Some(winner.into());
        self
    }

    /// Compute and attach `match_hash`. Call once the record is complete.
    pub fn sealed(mut self) -> Result<Self, EntityError> {
        self.match_hash = self.content_hash()?;
        Ok(self)
    }

    /// SHA-256 over the canonical encoding of every field but `match_hash`.
    pub fn content_hash(&self) -> Result<Hash, EntityError> {
        let content = MatchContent {
            match_id: &self.match_id,
            level_id: &self.level_id,
            participants: &self.participants,
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_ms: self.duration_ms,
            scores: &self.scores,
            winner: &self.winner,
            host: &self.host,
        };
        let encoded =
            bincode::serialize(&content).map_err(|e| EntityError::Encoding(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(b"ml-match-v1");
        hasher.update(&encoded);
        Ok(hasher.finalize().into())
    }

    /// Whether `match_hash` matches the record content.
    pub fn is_sealed(&self) -> Result<bool, EntityError> {
        Ok(self.match_hash == self.content_hash()?)
    }

    /// Number of participants counted towards `total_players`.
    pub fn player_count(&self) -> u64 {
        self.participants.len() as u64
    }

    /// Canonical (bincode) encoding.
    pub fn encode(&self) -> Result<Vec<u8>, EntityError> {
        bincode::serialize(self).map_err(|e| EntityError::Encoding(e.to_string()))
    }

    /// Serialized byte length, counted towards the Body's `total_size`.
    pub fn encoded_len(&self) -> Result<u64, EntityError> {
        bincode::serialized_size(self).map_err(|e| EntityError::Encoding(e.to_string()))
    }
}

// =============================================================================
// ARCHIVE
// =============================================================================

/// Identifier the durable sink assigns to an archived epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct MorgueId(pub String);

impl MorgueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MorgueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
