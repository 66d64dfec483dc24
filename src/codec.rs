//! Binary persistence format.
//!
//! # Format (version 1, little-endian)
//!
//! ```text
//! Header (12 bytes):
//!   [0..4]   i32 format version, currently 1
//!   [4..8]   i32 dimension count, must be positive
//!   [8..12]  i32 record count, must be non-negative
//! Metadata map:
//!   u32 entry count, then per entry: string key, string value
//! Tree:
//!   u8 has-root boolean, then the pre-order node stream if set
//! Node:
//!   u32 split dimension (must be below the dimension count)
//!   f32 split value
//!   u32 scope mask
//!   key bytes (IndexKey::encode)
//!   u8 has-payload boolean, then a string if set
//!   f32 x dimension count, the vector
//!   u8 has-left boolean, then the left subtree if set
//!   u8 has-right boolean, then the right subtree if set
//! ```
//!
//! Strings are a u32 byte length followed by UTF-8 bytes. Booleans are a
//! single `0` or `1` byte; anything else is malformed. Truncation anywhere
//! surfaces as [`IndexError::InvalidFormat`], never as a bare I/O error, so
//! callers can tell a damaged file from a failing disk.
//!
//! Encode and decode walk the tree with explicit stacks; file depth never
//! translates into call-stack depth.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::error::{IndexError, IndexResult};
use crate::key::IndexKey;
use crate::record::VectorRecord;
use crate::tree::{KdTree, TreeNode};
use crate::types::{Dimensions, ScopeMask};

/// Format version this build writes, and the only one it reads.
pub const FORMAT_VERSION: i32 = 1;

/// Size in bytes of the fixed header.
pub const HEADER_SIZE: usize = 12;

// Decode-side cap on upfront buffer reservations. Length and dimension
// prefixes come straight from the file, so a buffer may only grow as the
// claimed bytes actually arrive.
const PREALLOC_LIMIT: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub version: i32,
    pub dimensions: i32,
    pub count: i32,
}

impl Header {
    pub fn write<W: Write>(&self, writer: &mut W) -> IndexResult<()> {
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.dimensions.to_le_bytes())?;
        writer.write_all(&self.count.to_le_bytes())?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> IndexResult<Self> {
        Ok(Self {
            version: read_i32(reader)?,
            dimensions: read_i32(reader)?,
            count: read_i32(reader)?,
        })
    }

    pub fn validate(&self) -> IndexResult<()> {
        if self.version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion {
                found: self.version,
                supported: FORMAT_VERSION,
            });
        }
        if self.dimensions <= 0 {
            return Err(IndexError::InvalidFormat(format!(
                "dimension count {} is not positive",
                self.dimensions
            )));
        }
        if self.count < 0 {
            return Err(IndexError::InvalidFormat(format!(
                "record count {} is negative",
                self.count
            )));
        }
        Ok(())
    }
}

/// Writes the full index: header, metadata map, tree.
pub(crate) fn write_index<W: Write, K: IndexKey>(
    writer: &mut W,
    tree: &KdTree<K>,
    metadata: &HashMap<String, String>,
) -> IndexResult<()> {
    let dimensions = i32::try_from(tree.dimensions().get()).map_err(|_| {
        IndexError::InvalidFormat(format!(
            "dimension count {} exceeds the format limit",
            tree.dimensions().get()
        ))
    })?;
    let count = i32::try_from(tree.len()).map_err(|_| {
        IndexError::InvalidFormat(format!("record count {} exceeds the format limit", tree.len()))
    })?;

    let header = Header {
        version: FORMAT_VERSION,
        dimensions,
        count,
    };
    header.write(writer)?;
    write_metadata(writer, metadata)?;
    write_tree(writer, tree)?;
    Ok(())
}

/// Reads and validates a full index.
pub(crate) fn read_index<R: Read, K: IndexKey>(
    reader: &mut R,
) -> IndexResult<(KdTree<K>, HashMap<String, String>)> {
    let header = Header::read(reader)?;
    header.validate()?;
    let metadata = read_metadata(reader)?;
    let dimensions = Dimensions::new(header.dimensions as usize)?;
    let tree = read_tree(reader, dimensions, header.count as usize)?;
    Ok((tree, metadata))
}

fn write_metadata<W: Write>(
    writer: &mut W,
    metadata: &HashMap<String, String>,
) -> IndexResult<()> {
    let len = u32::try_from(metadata.len()).map_err(|_| {
        IndexError::InvalidFormat(format!(
            "metadata map with {} entries exceeds the format limit",
            metadata.len()
        ))
    })?;
    writer.write_all(&len.to_le_bytes())?;

    // Sorted so the same index contents always produce the same bytes.
    let mut entries: Vec<_> = metadata.iter().collect();
    entries.sort();
    for (key, value) in entries {
        write_string(writer, key)?;
        write_string(writer, value)?;
    }
    Ok(())
}

fn read_metadata<R: Read>(reader: &mut R) -> IndexResult<HashMap<String, String>> {
    let len = read_u32(reader)?;
    let mut metadata = HashMap::new();
    for _ in 0..len {
        let key = read_string(reader)?;
        let value = read_string(reader)?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

/// Pre-order walk with an explicit work stack. The child marker is pushed
/// right-then-left so the left subtree streams first, directly after its
/// has-left boolean.
enum WriteStep<'t, K> {
    Node(&'t TreeNode<K>),
    Child(Option<&'t TreeNode<K>>),
}

fn write_tree<W: Write, K: IndexKey>(writer: &mut W, tree: &KdTree<K>) -> IndexResult<()> {
    let Some(root) = tree.root() else {
        write_bool(writer, false)?;
        return Ok(());
    };
    write_bool(writer, true)?;

    let mut stack = vec![WriteStep::Node(root)];
    while let Some(step) = stack.pop() {
        match step {
            WriteStep::Node(node) => {
                writer.write_all(&(node.split_dim as u32).to_le_bytes())?;
                writer.write_all(&node.split_value.to_le_bytes())?;
                write_record(writer, &node.record)?;
                stack.push(WriteStep::Child(node.right.as_deref()));
                stack.push(WriteStep::Child(node.left.as_deref()));
            }
            WriteStep::Child(child) => {
                write_bool(writer, child.is_some())?;
                if let Some(node) = child {
                    stack.push(WriteStep::Node(node));
                }
            }
        }
    }
    Ok(())
}

/// Which child of the parked parent the next completed subtree attaches to.
enum PendingSlot {
    Left,
    Right,
}

fn read_tree<R: Read, K: IndexKey>(
    reader: &mut R,
    dimensions: Dimensions,
    expected_count: usize,
) -> IndexResult<KdTree<K>> {
    if !read_bool(reader)? {
        if expected_count != 0 {
            return Err(IndexError::InvalidFormat(format!(
                "record count mismatch: header says {expected_count}, stream contains 0"
            )));
        }
        return Ok(KdTree::from_parts(dimensions, None, 0));
    }

    let dims = dimensions.get();
    let mut stack: Vec<(Box<TreeNode<K>>, PendingSlot)> = Vec::new();
    let mut current = Box::new(read_node_fields(reader, dims)?);
    let mut decoded = 1usize;

    loop {
        // Stream position after a node's fields: its has-left boolean.
        if read_bool(reader)? {
            stack.push((current, PendingSlot::Left));
            current = Box::new(read_node_fields(reader, dims)?);
            decoded += 1;
            continue;
        }
        if read_bool(reader)? {
            stack.push((current, PendingSlot::Right));
            current = Box::new(read_node_fields(reader, dims)?);
            decoded += 1;
            continue;
        }

        // `current` is a complete subtree; attach upward until some parent
        // still has a right child to read.
        loop {
            let Some((mut parent, slot)) = stack.pop() else {
                if decoded != expected_count {
                    return Err(IndexError::InvalidFormat(format!(
                        "record count mismatch: header says {expected_count}, stream contains {decoded}"
                    )));
                }
                return Ok(KdTree::from_parts(dimensions, Some(current), decoded));
            };
            match slot {
                PendingSlot::Left => {
                    parent.left = Some(current);
                    if read_bool(reader)? {
                        stack.push((parent, PendingSlot::Right));
                        current = Box::new(read_node_fields(reader, dims)?);
                        decoded += 1;
                        break;
                    }
                    current = parent;
                }
                PendingSlot::Right => {
                    parent.right = Some(current);
                    current = parent;
                }
            }
        }
    }
}

fn read_node_fields<R: Read, K: IndexKey>(
    reader: &mut R,
    dimensions: usize,
) -> IndexResult<TreeNode<K>> {
    let split_dim = read_u32(reader)? as usize;
    if split_dim >= dimensions {
        return Err(IndexError::InvalidFormat(format!(
            "split dimension {split_dim} out of range for {dimensions} dimensions"
        )));
    }
    let split_value = read_f32(reader)?;
    let record = read_record(reader, dimensions)?;
    Ok(TreeNode::new(split_dim, split_value, record))
}

fn write_record<W: Write, K: IndexKey>(
    writer: &mut W,
    record: &VectorRecord<K>,
) -> IndexResult<()> {
    writer.write_all(&record.scopes().to_bytes())?;
    record.key().encode(writer)?;
    match record.payload() {
        Some(text) => {
            write_bool(writer, true)?;
            write_string(writer, text)?;
        }
        None => write_bool(writer, false)?,
    }
    for value in record.vector() {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn read_record<R: Read, K: IndexKey>(
    reader: &mut R,
    dimensions: usize,
) -> IndexResult<VectorRecord<K>> {
    let scopes = ScopeMask::from_bytes(read_exact_bytes(reader)?);
    let key = K::decode(reader).map_err(map_eof)?;
    let payload = if read_bool(reader)? {
        Some(read_string(reader)?)
    } else {
        None
    };
    let mut vector = Vec::with_capacity(dimensions.min(PREALLOC_LIMIT));
    for _ in 0..dimensions {
        vector.push(read_f32(reader)?);
    }
    Ok(VectorRecord::from_parts(vector, key, payload, scopes))
}

fn map_eof(err: io::Error) -> IndexError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        IndexError::InvalidFormat("unexpected end of file".to_string())
    } else {
        IndexError::Io(err)
    }
}

fn read_exact_bytes<R: Read, const N: usize>(reader: &mut R) -> IndexResult<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(map_eof)?;
    Ok(buf)
}

fn read_i32<R: Read>(reader: &mut R) -> IndexResult<i32> {
    Ok(i32::from_le_bytes(read_exact_bytes(reader)?))
}

fn read_u32<R: Read>(reader: &mut R) -> IndexResult<u32> {
    Ok(u32::from_le_bytes(read_exact_bytes(reader)?))
}

fn read_f32<R: Read>(reader: &mut R) -> IndexResult<f32> {
    Ok(f32::from_le_bytes(read_exact_bytes(reader)?))
}

fn read_bool<R: Read>(reader: &mut R) -> IndexResult<bool> {
    match read_exact_bytes::<R, 1>(reader)?[0] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(IndexError::InvalidFormat(format!(
            "invalid boolean byte 0x{other:02x}"
        ))),
    }
}

fn write_bool<W: Write>(writer: &mut W, value: bool) -> io::Result<()> {
    writer.write_all(&[u8::from(value)])
}

fn read_string<R: Read>(reader: &mut R) -> IndexResult<String> {
    let len = read_u32(reader)? as usize;
    let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT));
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(IndexError::InvalidFormat(format!(
            "string claims {len} bytes but the stream holds {}",
            buf.len()
        )));
    }
    String::from_utf8(buf)
        .map_err(|_| IndexError::InvalidFormat("string is not valid UTF-8".to_string()))
}

fn write_string<W: Write>(writer: &mut W, text: &str) -> IndexResult<()> {
    let len = u32::try_from(text.len()).map_err(|_| {
        IndexError::InvalidFormat(format!(
            "string of {} bytes exceeds the format limit",
            text.len()
        ))
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(text.as_bytes())?;
    Ok(())
}
