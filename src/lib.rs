//! Embedded exact nearest-neighbor vector index with single-file persistence.
//!
//! A KD-tree over fixed-dimension `f32` vectors: exact k-nearest-neighbor
//! search under Euclidean distance, scope-mask filtering, per-key
//! deduplication of results, and a little-endian binary file format carrying
//! the tree plus a free-form metadata map. Single-threaded by design; one
//! owner mutates and nothing locks.
//!
//! ```no_run
//! use vicinity::{ContentHash, Dimensions, SearchOptions, VectorIndex, VectorRecord};
//!
//! # fn main() -> vicinity::IndexResult<()> {
//! let mut index = VectorIndex::new(Dimensions::new(3)?);
//! let key: ContentHash = "0123456789abcdef0123456789abcdef01234567".parse().unwrap();
//! index.insert(VectorRecord::new(vec![0.1, 0.9, 0.0], key).with_payload("fn main()"))?;
//!
//! let hits = index.find(&[0.1, 0.8, 0.1], &SearchOptions::default().with_limit(5))?;
//! index.write(".vicinity/index.vec")?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod key;
mod neighbors;
pub mod record;
pub mod tree;
pub mod types;

// Explicit exports for better API clarity
pub use config::Settings;
pub use embedding::{EmbedError, TextEmbedder};
pub use error::{IndexError, IndexResult};
pub use index::VectorIndex;
pub use key::{ContentHash, IndexKey, ParseHashError};
pub use record::{Neighbor, VectorRecord};
pub use tree::{KdTree, SearchOptions, euclidean_distance};
pub use types::{Dimensions, ScopeMask};
