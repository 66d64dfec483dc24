//! The index facade: tree + metadata map + single-file persistence.
//!
//! # Concurrency
//!
//! One owner mutates; there is no internal locking. A long-running collection
//! job that feeds this index is expected to poll its own shutdown flag
//! between inserts or batches, never inside a call. Every operation here is
//! plain, synchronous, and non-cancelable.
//!
//! # Durability
//!
//! `write` streams the full format into a temporary file in the destination
//! directory, syncs it, then renames over the target. A crash mid-write
//! leaves the previous file intact. `read` decodes completely before
//! committing, so a corrupt file never leaves an index half-loaded.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::codec;
use crate::error::{IndexError, IndexResult};
use crate::key::IndexKey;
use crate::record::{Neighbor, VectorRecord};
use crate::tree::{KdTree, SearchOptions};
use crate::types::Dimensions;

/// An embedded exact nearest-neighbor index over fixed-dimension vectors.
///
/// Generic over the key type; [`ContentHash`](crate::ContentHash) is the
/// shipped key. The metadata map travels with the index through the file
/// format and is the place for caller bookkeeping such as
/// incremental-collection watermarks (first/last processed commit, model
/// name, and the like).
#[derive(Debug)]
pub struct VectorIndex<K> {
    tree: KdTree<K>,
    metadata: HashMap<String, String>,
}

impl<K: IndexKey> VectorIndex<K> {
    /// Creates an empty index for vectors of the given dimension count.
    #[must_use]
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            tree: KdTree::new(dimensions),
            metadata: HashMap::new(),
        }
    }

    /// Loads an index from a file; dimensions come from the header.
    pub fn load(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let (tree, metadata) = codec::read_index(&mut reader)?;
        info!("loaded index with {} records from {}", tree.len(), path.display());
        Ok(Self { tree, metadata })
    }

    /// Inserts a record after validating its vector length.
    pub fn insert(&mut self, record: VectorRecord<K>) -> IndexResult<()> {
        self.tree.insert(record)
    }

    /// Ranked nearest records, without distances.
    pub fn find(
        &self,
        target: &[f32],
        options: &SearchOptions,
    ) -> IndexResult<Vec<&VectorRecord<K>>> {
        Ok(self
            .tree
            .nearest(target, options)?
            .into_iter()
            .map(|hit| hit.record)
            .collect())
    }

    /// Ranked nearest records with their Euclidean distances.
    pub fn find_with_distance(
        &self,
        target: &[f32],
        options: &SearchOptions,
    ) -> IndexResult<Vec<Neighbor<'_, K>>> {
        self.tree.nearest(target, options)
    }

    /// Persists the index, creating parent directories if absent.
    ///
    /// The write is atomic at the filesystem level: temporary file in the
    /// same directory, sync, rename.
    pub fn write(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            codec::write_index(&mut writer, &self.tree, &self.metadata)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| IndexError::Io(e.error))?;

        info!("wrote index with {} records to {}", self.tree.len(), path.display());
        Ok(())
    }

    /// Replaces this index's contents from a file.
    ///
    /// On error the current contents are untouched.
    pub fn read(&mut self, path: impl AsRef<Path>) -> IndexResult<()> {
        *self = Self::load(path)?;
        Ok(())
    }

    /// Dimension count every vector in this index has.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.tree.dimensions()
    }

    /// Number of records ever inserted. Duplicate keys each count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// True when nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Read-only view of the underlying tree.
    #[must_use]
    pub fn tree(&self) -> &KdTree<K> {
        &self.tree
    }

    /// Looks up a metadata entry.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Sets a metadata entry, returning the previous value if any.
    pub fn set_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.metadata.insert(key.into(), value.into())
    }

    /// Removes a metadata entry, returning its value if present.
    pub fn remove_metadata(&mut self, key: &str) -> Option<String> {
        self.metadata.remove(key)
    }

    /// Iterates over all metadata entries in unspecified order.
    pub fn metadata_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ContentHash;
    use crate::types::ScopeMask;
    use tempfile::TempDir;

    fn hash(byte: u8) -> ContentHash {
        ContentHash::from_bytes([byte; 20])
    }

    fn sample_index() -> VectorIndex<ContentHash> {
        let mut index = VectorIndex::new(Dimensions::new(3).unwrap());
        index
            .insert(VectorRecord::new(vec![1.0, 0.0, 0.0], hash(1)).with_payload("one"))
            .unwrap();
        index
            .insert(
                VectorRecord::new(vec![0.0, 1.0, 0.0], hash(2)).with_scopes(ScopeMask::new(0b1)),
            )
            .unwrap();
        index
            .insert(VectorRecord::new(vec![0.0, 0.0, 1.0], hash(3)))
            .unwrap();
        index.set_metadata("last_commit", "deadbeef");
        index
    }

    #[test]
    fn write_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.vec");

        let index = sample_index();
        index.write(&path).unwrap();

        let loaded: VectorIndex<ContentHash> = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimensions().get(), 3);
        assert_eq!(loaded.metadata("last_commit"), Some("deadbeef"));

        let target = [0.9, 0.1, 0.0];
        let before = index.find_with_distance(&target, &SearchOptions::default()).unwrap();
        let after = loaded.find_with_distance(&target, &SearchOptions::default()).unwrap();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.record.key(), a.record.key());
            assert_eq!(b.distance, a.distance);
        }
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/index.vec");
        sample_index().write(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn read_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.vec");
        sample_index().write(&path).unwrap();

        let mut other: VectorIndex<ContentHash> = VectorIndex::new(Dimensions::new(7).unwrap());
        other.read(&path).unwrap();
        assert_eq!(other.dimensions().get(), 3);
        assert_eq!(other.len(), 3);
    }

    #[test]
    fn failed_read_leaves_contents_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.vec");
        sample_index().write(&path).unwrap();

        // flip the version to an unsupported one
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0..4].copy_from_slice(&2i32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let mut index = VectorIndex::new(Dimensions::new(2).unwrap());
        index
            .insert(VectorRecord::new(vec![5.0, 5.0], hash(9)))
            .unwrap();
        index.set_metadata("kept", "yes");

        let err = index.read(&path).unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedVersion { found: 2, .. }));
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimensions().get(), 2);
        assert_eq!(index.metadata("kept"), Some("yes"));
    }

    #[test]
    fn second_write_atomically_replaces_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.vec");

        sample_index().write(&path).unwrap();

        let mut updated = VectorIndex::new(Dimensions::new(3).unwrap());
        updated
            .insert(VectorRecord::new(vec![9.0, 9.0, 9.0], hash(42)))
            .unwrap();
        updated.write(&path).unwrap();

        let loaded: VectorIndex<ContentHash> = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let hits = loaded
            .find(&[9.0, 9.0, 9.0], &SearchOptions::default())
            .unwrap();
        assert_eq!(*hits[0].key(), hash(42));
    }

    #[test]
    fn metadata_accessors() {
        let mut index: VectorIndex<ContentHash> = VectorIndex::new(Dimensions::new(2).unwrap());
        assert_eq!(index.set_metadata("first_commit", "aaa"), None);
        assert_eq!(
            index.set_metadata("first_commit", "bbb"),
            Some("aaa".to_string())
        );
        assert_eq!(index.metadata("first_commit"), Some("bbb"));
        assert_eq!(index.metadata_iter().count(), 1);
        assert_eq!(index.remove_metadata("first_commit"), Some("bbb".to_string()));
        assert_eq!(index.metadata("first_commit"), None);
    }

    #[test]
    fn empty_index_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.vec");

        let index: VectorIndex<ContentHash> = VectorIndex::new(Dimensions::new(8).unwrap());
        index.write(&path).unwrap();

        let loaded: VectorIndex<ContentHash> = VectorIndex::load(&path).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimensions().get(), 8);
        let hits = loaded.find(&[0.0; 8], &SearchOptions::default()).unwrap();
        assert!(hits.is_empty());
    }
}
