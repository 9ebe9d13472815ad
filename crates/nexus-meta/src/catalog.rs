//! Logical files and their constituent blocks.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{BlockId, ColorTag, FileId, FileStatus, Timestamp};

/// A fixed-size unit of a file; the unit of replication. Immutable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block identifier, derived from the file id and index.
    pub id: BlockId,
    /// Presentation tag shared by all blocks of the file.
    pub color_tag: ColorTag,
}

impl Block {
    /// The owning file.
    pub fn parent_file_id(&self) -> FileId {
        self.id.file()
    }

    /// Position within the file, starting at zero.
    pub fn index(&self) -> u32 {
        self.id.index()
    }
}

/// A logical file in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique file identifier.
    pub id: FileId,
    /// Human-readable name as supplied by the client.
    pub name: String,
    /// Blocks in index order.
    pub blocks: Vec<Block>,
    /// Target replica count, fixed at ingest.
    pub replication_factor: usize,
    /// Upload state.
    pub status: FileStatus,
    /// Size declared by the client.
    pub size_bytes: u64,
    /// Ingest time.
    pub created_at: Timestamp,
}

/// Owns the set of files, in ingest order.
#[derive(Debug, Default, Clone)]
pub struct FileCatalog {
    files: Vec<FileRecord>,
}

impl FileCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Complete file with `block_count` sequential blocks.
    ///
    /// Placement feasibility must already be checked by the caller; the
    /// catalog does not look at the node registry.
    pub fn create_file(
        &mut self,
        name: &str,
        size_bytes: u64,
        block_count: u32,
        replication_factor: usize,
        color_tag: ColorTag,
        now: Timestamp,
    ) -> FileRecord {
        let id = FileId::generate();
        let blocks = (0..block_count)
            .map(|index| Block {
                id: BlockId::new(id, index),
                color_tag: color_tag.clone(),
            })
            .collect();

        let record = FileRecord {
            id,
            name: name.to_string(),
            blocks,
            replication_factor,
            status: FileStatus::Complete,
            size_bytes,
            created_at: now,
        };
        info!(file_id = %id, name, block_count, "catalogued file");
        self.files.push(record.clone());
        record
    }

    /// Removes a file record. The caller evicts its blocks from the nodes.
    pub fn delete_file(&mut self, file_id: FileId) -> Option<FileRecord> {
        let pos = self.files.iter().position(|f| f.id == file_id)?;
        Some(self.files.remove(pos))
    }

    /// Lazy traversal of every `(file, block)` pair, files in ingest order.
    pub fn all_blocks(&self) -> impl Iterator<Item = (&FileRecord, &Block)> + '_ {
        self.files
            .iter()
            .flat_map(|file| file.blocks.iter().map(move |block| (file, block)))
    }

    /// Looks up a file by id.
    pub fn get(&self, file_id: FileId) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.id == file_id)
    }

    /// First file with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.name == name)
    }

    /// All files, in ingest order.
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total number of blocks across all files.
    pub fn block_count(&self) -> usize {
        self.files.iter().map(|f| f.blocks.len()).sum()
    }
}
