//! Partition keys: names for the independently saved slices of the world.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

/// Integer coordinate of a chunk in the world grid.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChunkPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl ChunkPos {
    /// Creates a chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Renders as `x.y.z`, which is also the on-disk file stem for chunk blobs.
impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.x, self.y, self.z)
    }
}

impl FromStr for ChunkPos {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::new(ErrorKind::InvalidPartition(format!("bad chunk position: {s}")));
        let mut parts = s.split('.');
        let mut coord = || -> Result<i32, Error> {
            parts
                .next()
                .ok_or_else(invalid)?
                .parse::<i32>()
                .map_err(|_| invalid())
        };
        let pos = Self::new(coord()?, coord()?, coord()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(pos)
    }
}

/// Identifies one independently persisted partition.
///
/// Reference tables are keyed by partition: a player's table and a chunk's
/// table never collide even if a player id happens to look like a coordinate.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PartitionKey {
    /// A connected player's partition.
    Player(String),
    /// A spatial chunk's partition.
    Chunk(ChunkPos),
}

impl PartitionKey {
    /// Creates a player partition key.
    #[must_use]
    pub fn player(id: impl Into<String>) -> Self {
        Self::Player(id.into())
    }

    /// Creates a chunk partition key.
    #[must_use]
    pub const fn chunk(pos: ChunkPos) -> Self {
        Self::Chunk(pos)
    }

    /// Returns the player id if this is a player partition.
    #[must_use]
    pub fn as_player(&self) -> Option<&str> {
        match self {
            Self::Player(id) => Some(id),
            Self::Chunk(_) => None,
        }
    }

    /// Returns the chunk position if this is a chunk partition.
    #[must_use]
    pub const fn as_chunk(&self) -> Option<ChunkPos> {
        match self {
            Self::Chunk(pos) => Some(*pos),
            Self::Player(_) => None,
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(id) => write!(f, "player:{id}"),
            Self::Chunk(pos) => write!(f, "chunk:{pos}"),
        }
    }
}

impl From<ChunkPos> for PartitionKey {
    fn from(pos: ChunkPos) -> Self {
        Self::Chunk(pos)
    }
}
