//! # Ancestor Chains
//!
//! The hierarchy enters the engine only through [`AncestorLookup`]: for each code, an
//! ordered list of ancestors indexed by layer depth. Depth 0 is the code itself or its
//! direct parent, and the chain climbs to a universal root sentinel.
//!
//! Where the chains come from (a JSON graph description, a long-form level table, an
//! in-memory map) is the loader's business, see [`crate::io`].

use crate::types::{CodeIndex, HierarchyError};
use ahash::AHashMap;
use std::collections::HashMap;

/// Read access to per-code ancestor chains.
pub trait AncestorLookup {
    /// The full depth-indexed chain for `code`, or `None` if the code is unknown.
    fn chain(&self, code: &str) -> Option<&[String]>;

    /// The ancestor of `code` at `depth`.
    fn ancestor_at(&self, code: &str, depth: usize) -> Result<&str, HierarchyError> {
        let chain = self
            .chain(code)
            .ok_or_else(|| HierarchyError::MissingCode(code.to_string()))?;
        chain
            .get(depth)
            .map(String::as_str)
            .ok_or_else(|| HierarchyError::ChainTooShort {
                code: code.to_string(),
                found: chain.len(),
                required: depth.saturating_add(1),
            })
    }
}

impl AncestorLookup for HashMap<String, Vec<String>> {
    fn chain(&self, code: &str) -> Option<&[String]> {
        self.get(code).map(Vec::as_slice)
    }
}

impl AncestorLookup for AHashMap<String, Vec<String>> {
    fn chain(&self, code: &str) -> Option<&[String]> {
        self.get(code).map(Vec::as_slice)
    }
}

/// An owned code-to-chain table, the form every loader produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorTable {
    chains: AHashMap<String, Vec<String>>,
}

impl AncestorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the chain for `code`.
    pub fn insert(&mut self, code: impl Into<String>, chain: Vec<String>) {
        self.chains.insert(code.into(), chain);
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.chains.contains_key(code)
    }

    /// Length of the longest chain in the table.
    pub fn max_chain_len(&self) -> usize {
        self.chains.values().map(Vec::len).max().unwrap_or(0)
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for AncestorTable {
    fn from_iter<I: IntoIterator<Item = (S, Vec<String>)>>(iter: I) -> Self {
        Self {
            chains: iter
                .into_iter()
                .map(|(code, chain)| (code.into(), chain))
                .collect(),
        }
    }
}

impl AncestorLookup for AncestorTable {
    fn chain(&self, code: &str) -> Option<&[String]> {
        self.chains.get(code).map(Vec::as_slice)
    }
}

/// Checks that every code of the universe has a chain of at least `max_layer + 1`
/// entries, so that no layer up to `max_layer` can run off the end of a chain.
pub fn validate_chains<A>(
    codes: &CodeIndex,
    lookup: &A,
    max_layer: usize,
) -> Result<(), HierarchyError>
where
    A: AncestorLookup + ?Sized,
{
    let required = max_layer
        .checked_add(1)
        .ok_or(HierarchyError::LayerOutOfRange {
            layer: max_layer,
            max_layer,
        })?;
    for code in codes.codes() {
        let chain = lookup
            .chain(code)
            .ok_or_else(|| HierarchyError::MissingCode(code.to_string()))?;
        if chain.len() < required {
            return Err(HierarchyError::ChainTooShort {
                code: code.to_string(),
                found: chain.len(),
                required,
            });
        }
    }
    Ok(())
}
