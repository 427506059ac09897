use std::path::{Path, PathBuf};

use crate::error::ViewerError;

/// Which way the cursor moves through the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

// ---------------------------------------------------------------------------
// Navigation ring
// ---------------------------------------------------------------------------

/// Circular, read-only sequence of filenames with a single movable cursor.
///
/// Nodes are identified by position, so the same filename listed twice is two
/// distinct stops. Both directions wrap: stepping forward from the last entry
/// lands on the first and stepping backward from the first lands on the last.
#[derive(Debug, Clone)]
pub struct NavigationRing {
    files: Vec<PathBuf>,
    cursor: usize,
}

impl NavigationRing {
    /// Build a ring from a non-empty ordered list. The cursor starts on the
    /// first entry.
    pub fn build<I, P>(files: I) -> Result<Self, ViewerError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = files.into_iter().map(Into::into).collect();
        if files.is_empty() {
            return Err(ViewerError::NoFiles);
        }
        Ok(Self { files, cursor: 0 })
    }

    pub fn current(&self) -> &Path {
        &self.files[self.cursor]
    }

    /// Index of the node under the cursor.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Never true for a built ring.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Move the cursor one step and return the new current filename.
    pub fn advance(&mut self, direction: Direction) -> &Path {
        let len = self.files.len();
        self.cursor = match direction {
            Direction::Forward => (self.cursor + 1) % len,
            Direction::Backward => (self.cursor + len - 1) % len,
        };
        self.current()
    }
}
