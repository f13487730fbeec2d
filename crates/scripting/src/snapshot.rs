use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use cardtable_engine::codec::CodecError;
use cardtable_engine::game::Game;

static NEXT_SLOT: AtomicU64 = AtomicU64::new(0);

/// Single-slot snapshot of the live game, scoped to one session.
///
/// A new snapshot unconditionally overwrites the previous one; callers
/// serialize snapshot/restore themselves (one run at a time). The slot
/// is released on teardown.
pub struct SnapshotManager {
    path: PathBuf,
}

impl SnapshotManager {
    /// A fresh slot under the system temp dir, unique to this session.
    pub fn for_session() -> Self {
        let slot = NEXT_SLOT.fetch_add(1, Ordering::Relaxed);
        Self::at(std::env::temp_dir().join(format!(
            "cardtable-{}-{slot}.snapshot.json",
            std::process::id()
        )))
    }

    /// A slot at an explicit path (tests, or a shell that keeps its
    /// session state somewhere specific).
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_snapshot(&self) -> bool {
        self.path.exists()
    }

    pub fn snapshot(&self, game: &Game) -> Result<(), CodecError> {
        game.save(&self.path)
    }

    /// Reloads the snapshot into the live game. The slot is our own
    /// serialization, so the load is trusted and skips deck validation.
    pub fn restore(&self, game: &mut Game) -> Result<(), CodecError> {
        *game = Game::load(&self.path, true)?;
        Ok(())
    }

    pub fn teardown(&self) {
        let _ = fs::remove_file(&self.path);
    }
}
