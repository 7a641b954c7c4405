//! Typed time-ordered identifiers.
//!
//! `Id<T>` wraps a UUIDv7 so that different entity ids are incompatible at
//! compile time (a `PostId` cannot be passed where a `UserId` is expected).
//! V7 ids embed a 48-bit millisecond epoch prefix, so lexicographic byte
//! order — and therefore string order of the canonical hyphenated form — is
//! chronological order. That property is load-bearing: timeline scores,
//! keyset pagination, and cursor decoding all derive from the id alone.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use thiserror::Error;
use uuid::{ContextV7, Timestamp, Uuid};

/// Errors from parsing an id out of external input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("id must not be empty")]
    Empty,

    #[error("id is not a valid UUID")]
    InvalidFormat,
}

/// A typed wrapper around a time-ordered `Uuid`.
///
/// The type parameter `T` is the entity marker; see `entity_ids`.
#[repr(transparent)]
pub struct Id<T>(Uuid, PhantomData<fn() -> T>);

impl<T> Id<T> {
    /// Creates an `Id` from a raw `Uuid` (database loads, deserialization).
    #[inline]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, PhantomData)
    }

    /// Returns the inner `Uuid`.
    #[inline]
    pub fn into_uuid(self) -> Uuid {
        self.0
    }

    /// Returns a reference to the inner `Uuid`.
    #[inline]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parses an `Id` from its canonical hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, ParseIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError::Empty);
        }
        Uuid::parse_str(trimmed)
            .map(Self::from_uuid)
            .map_err(|_| ParseIdError::InvalidFormat)
    }

    /// The millisecond epoch embedded in the id's high 48 bits.
    ///
    /// This is the canonical chronological key for everything downstream:
    /// cache scores, cursor bounds, merge order. Ids minted by something
    /// other than [`IdGenerator`] (v4 test fixtures, say) carry no
    /// timestamp and sort as oldest.
    pub fn timestamp_ms(&self) -> i64 {
        match self.0.get_timestamp() {
            Some(ts) => {
                let (secs, nanos) = ts.to_unix();
                (secs as i64) * 1000 + i64::from(nanos) / 1_000_000
            }
            None => 0,
        }
    }
}

/// Mints v7 ids that are strictly distinct and monotonically non-decreasing
/// across concurrent callers in one process.
///
/// `ContextV7` fills the sub-millisecond bits from a counter, so two ids
/// minted in the same millisecond still compare distinctly and in mint
/// order.
pub struct IdGenerator {
    context: ContextV7,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            context: ContextV7::new(),
        }
    }

    pub fn generate<T>(&self) -> Id<T> {
        Id::from_uuid(Uuid::new_v7(Timestamp::now(&self.context)))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Standard trait implementations
// ============================================================================

impl<T> Clone for Id<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Id<{}>", std::any::type_name::<T>()))
            .field(&self.0)
            .finish()
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<T> PartialEq for Id<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Hash for Id<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> AsRef<Uuid> for Id<T> {
    #[inline]
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl<T> From<Uuid> for Id<T> {
    #[inline]
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T> From<Id<T>> for Uuid {
    #[inline]
    fn from(id: Id<T>) -> Self {
        id.0
    }
}

impl<T> FromStr for Id<T> {
    type Err = ParseIdError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Serde support
// ============================================================================

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

// ============================================================================
// sqlx support
// ============================================================================

use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgHasArrayType, PgTypeInfo, PgValueRef, Postgres};
use sqlx::{Decode, Encode, Type};

impl<T> Type<Postgres> for Id<T> {
    fn type_info() -> PgTypeInfo {
        <Uuid as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <Uuid as Type<Postgres>>::compatible(ty)
    }
}

impl<T> PgHasArrayType for Id<T> {
    fn array_type_info() -> PgTypeInfo {
        <Uuid as PgHasArrayType>::array_type_info()
    }
}

impl<T> Encode<'_, Postgres> for Id<T> {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <Uuid as Encode<Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<T> Decode<'_, Postgres> for Id<T> {
    fn decode(value: PgValueRef<'_>) -> Result<Self, BoxDynError> {
        <Uuid as Decode<Postgres>>::decode(value).map(Self::from_uuid)
    }
}

// ============================================================================
// Tests
// ============================================================================
