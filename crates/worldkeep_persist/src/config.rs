//! Save layout and persistence policy.

use std::path::{Component, Path, PathBuf};

use worldkeep_foundation::{ChunkPos, Error, ErrorContext, ErrorKind, PartitionKey, Result};

/// How chunk partitions are persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChunkPersistence {
    /// Chunk stores live only in memory for the life of the process.
    ///
    /// Their reference tables are not written to the global snapshot, since
    /// the data they describe would not survive a restart.
    #[default]
    MemoryOnly,
    /// Chunk stores are written on flush and read back from disk on load.
    Durable,
}

/// What happens to a reference that no longer resolves when a partition is restored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrokenReferencePolicy {
    /// The reference becomes `Nil`; the rest of the component is kept.
    #[default]
    Nullify,
    /// The whole component holding the reference is removed.
    DropComponent,
}

/// Configuration for one save.
#[derive(Clone, Debug)]
pub struct SaveConfig {
    /// Root directory of the current save.
    pub save_dir: PathBuf,
    /// Subdirectory for player blobs.
    pub players_dir: String,
    /// File extension for player blobs.
    pub player_extension: String,
    /// Subdirectory for chunk blobs.
    pub chunks_dir: String,
    /// File extension for chunk blobs.
    pub chunk_extension: String,
    /// File name of the global snapshot.
    pub global_file: String,
    /// Chunk durability.
    pub chunk_persistence: ChunkPersistence,
    /// Broken reference handling on restore.
    pub broken_references: BrokenReferencePolicy,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("saves/current"),
            players_dir: "players".to_string(),
            player_extension: "player".to_string(),
            chunks_dir: "chunks".to_string(),
            chunk_extension: "chunk".to_string(),
            global_file: "global.dat".to_string(),
            chunk_persistence: ChunkPersistence::MemoryOnly,
            broken_references: BrokenReferencePolicy::Nullify,
        }
    }
}

impl SaveConfig {
    /// Creates a configuration rooted at `save_dir` with default layout.
    #[must_use]
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            ..Self::default()
        }
    }

    /// Builder method to set chunk durability.
    #[must_use]
    pub fn with_chunk_persistence(mut self, persistence: ChunkPersistence) -> Self {
        self.chunk_persistence = persistence;
        self
    }

    /// Builder method to set the broken reference policy.
    #[must_use]
    pub fn with_broken_references(mut self, policy: BrokenReferencePolicy) -> Self {
        self.broken_references = policy;
        self
    }

    /// Builder method to set the global snapshot file name.
    #[must_use]
    pub fn with_global_file(mut self, name: impl Into<String>) -> Self {
        self.global_file = name.into();
        self
    }

    /// Builder method to set the players subdirectory.
    #[must_use]
    pub fn with_players_dir(mut self, dir: impl Into<String>) -> Self {
        self.players_dir = dir.into();
        self
    }

    /// Builder method to set the chunks subdirectory.
    #[must_use]
    pub fn with_chunks_dir(mut self, dir: impl Into<String>) -> Self {
        self.chunks_dir = dir.into();
        self
    }

    /// Returns true if chunk stores are written to disk.
    #[must_use]
    pub fn chunks_are_durable(&self) -> bool {
        self.chunk_persistence == ChunkPersistence::Durable
    }

    /// Path of the global snapshot.
    #[must_use]
    pub fn global_path(&self) -> PathBuf {
        self.save_dir.join(&self.global_file)
    }

    /// Directory holding player blobs.
    #[must_use]
    pub fn players_path(&self) -> PathBuf {
        self.save_dir.join(&self.players_dir)
    }

    /// Path of one player's blob.
    ///
    /// # Errors
    ///
    /// Returns an error if `player_id` is not a plain file stem; see
    /// [`validate_player_id`].
    pub fn player_path(&self, player_id: &str) -> Result<PathBuf> {
        validate_player_id(player_id)?;
        Ok(blob_path(&self.players_path(), player_id, &self.player_extension))
    }

    /// Directory holding chunk blobs.
    #[must_use]
    pub fn chunks_path(&self) -> PathBuf {
        self.save_dir.join(&self.chunks_dir)
    }

    /// Path of one chunk's blob.
    #[must_use]
    pub fn chunk_path(&self, pos: ChunkPos) -> PathBuf {
        blob_path(&self.chunks_path(), &pos.to_string(), &self.chunk_extension)
    }
}

/// Checks that a player id names a file directly inside the players directory.
///
/// Rejects empty ids, path separators, `..`, and anything `Path` would read
/// as a root, prefix, or relative step.
///
/// # Errors
///
/// Returns an `InvalidPartition` error naming the player.
pub fn validate_player_id(player_id: &str) -> Result<()> {
    let reason = if player_id.is_empty() {
        Some("is empty")
    } else if player_id.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if player_id.contains("..") {
        Some("contains '..'")
    } else if !Path::new(player_id)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        Some("is not a plain file name")
    } else {
        None
    };

    match reason {
        None => Ok(()),
        Some(reason) => Err(Error::new(ErrorKind::InvalidPartition(format!(
            "player id {player_id:?} {reason}"
        )))
        .with_context(ErrorContext::new().with_partition(PartitionKey::player(player_id)))),
    }
}

fn blob_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    dir.join(format!("{stem}.{extension}"))
}
