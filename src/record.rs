//! The stored record and the search-hit pair.

use crate::types::ScopeMask;

/// Immutable value carried by every tree node.
///
/// Built once by the caller, validated against the index dimensions on
/// insert, and never mutated afterwards. The scope mask defaults to all bits
/// set so records inserted without scoping match every scoped search.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord<K> {
    vector: Vec<f32>,
    key: K,
    payload: Option<String>,
    scopes: ScopeMask,
}

impl<K> VectorRecord<K> {
    /// Creates a record with no payload and the default all-bits scope mask.
    pub fn new(vector: Vec<f32>, key: K) -> Self {
        Self {
            vector,
            key,
            payload: None,
            scopes: ScopeMask::ALL,
        }
    }

    /// Attaches a caller-owned payload string, e.g. the embedded text chunk.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Restricts the record to the given scope mask.
    #[must_use]
    pub fn with_scopes(mut self, scopes: ScopeMask) -> Self {
        self.scopes = scopes;
        self
    }

    /// The embedding vector.
    #[must_use]
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// The key identifying the logical item this record belongs to.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The payload, if one was attached.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// The scope mask.
    #[must_use]
    pub fn scopes(&self) -> ScopeMask {
        self.scopes
    }

    /// Reassembles a record from decoded parts.
    pub(crate) fn from_parts(
        vector: Vec<f32>,
        key: K,
        payload: Option<String>,
        scopes: ScopeMask,
    ) -> Self {
        Self {
            vector,
            key,
            payload,
            scopes,
        }
    }
}

/// A single ranked search hit: the Euclidean distance and the matching record.
#[derive(Debug, Clone)]
pub struct Neighbor<'a, K> {
    pub distance: f32,
    pub record: &'a VectorRecord<K>,
}
