//! The inhabitation memo and its on-disk form.
//!
//! Entries are keyed by node address identity, not by structure: two equal
//! but distinct nodes are cached independently. Each entry also carries the
//! node's fingerprint, a hash of the graph below it as it currently resolves.
//! An entry whose fingerprint no longer matches the heap is dropped on
//! lookup: a hole below the node has since been redirected, or the entry came
//! from a cache file written for a different graph.
//!
//! Only decided verdicts are written to disk. Stored derivations refer to
//! other nodes by address, which means nothing in another heap, so a loaded
//! memo starts every undecided node from scratch. Losing or corrupting the
//! cache therefore only costs recomputation.
//!
//! The file is a pretty-printed JSON array of records in insertion order, so
//! saving a freshly loaded cache reproduces the file byte for byte.

use super::expr::TiExpr;
use super::ternary::TiVal;
use crate::error::MemoError;
use crate::types::Addr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A named derivation tried for a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub rule: String,
    pub expr: TiExpr,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TiMemoEntry {
    pub fingerprint: u64,
    /// Set once decided.
    pub value: Option<TiVal>,
    pub derivations: Vec<Derivation>,
    /// Nodes whose verdicts decided this one.
    pub causes: Vec<Addr>,
}

#[derive(Serialize, Deserialize)]
struct MemoRecord {
    node: Addr,
    fingerprint: u64,
    value: TiVal,
}

/// Counters over the memo's lifetime (not persisted).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    /// Structural derivations built from scratch.
    pub derivations: u64,
    /// Queries answered from a stored verdict.
    pub memo_hits: u64,
    /// Entries dropped because their fingerprint was stale.
    pub stale_discards: u64,
}

#[derive(Debug, Default)]
pub struct TiMemo {
    entries: IndexMap<Addr, TiMemoEntry>,
    stats: MemoStats,
}

impl TiMemo {
    pub fn new() -> Self {
        TiMemo::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, node: Addr) -> Option<&TiMemoEntry> {
        self.entries.get(&node)
    }

    pub fn stats(&self) -> MemoStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut MemoStats {
        &mut self.stats
    }

    /// The entry for `node` if it describes the node as it is now.
    fn live_entry(&mut self, node: Addr, fingerprint: u64) -> Option<&mut TiMemoEntry> {
        let stale = self
            .entries
            .get(&node)
            .is_some_and(|entry| entry.fingerprint != fingerprint);
        if stale {
            debug!(%node, "discarding stale inhabitation memo entry");
            self.entries.shift_remove(&node);
            self.stats.stale_discards += 1;
            return None;
        }
        self.entries.get_mut(&node)
    }

    /// The stored verdict for `node`, if decided.
    pub fn resolved(&mut self, node: Addr, fingerprint: u64) -> Option<TiVal> {
        self.live_entry(node, fingerprint)?.value
    }

    /// Move the stored derivations out so they can be evaluated while the
    /// solver recurses; [`TiMemo::store`] puts them back.
    pub(crate) fn take_derivations(&mut self, node: Addr, fingerprint: u64) -> Vec<Derivation> {
        self.live_entry(node, fingerprint)
            .map(|entry| std::mem::take(&mut entry.derivations))
            .unwrap_or_default()
    }

    pub(crate) fn store(
        &mut self,
        node: Addr,
        fingerprint: u64,
        value: Option<TiVal>,
        derivations: Vec<Derivation>,
        causes: Vec<Addr>,
    ) {
        let entry = self.entries.entry(node).or_default();
        entry.fingerprint = fingerprint;
        entry.value = value.filter(|v| v.is_decided());
        entry.derivations = derivations;
        entry.causes = causes;
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Load a cache file, degrading to an empty memo if it is missing or
    /// unreadable.
    pub fn load(path: &Path) -> TiMemo {
        match TiMemo::try_load(path) {
            Ok(memo) => {
                debug!(path = %path.display(), entries = memo.len(), "loaded inhabitation memo");
                memo
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring inhabitation memo");
                TiMemo::new()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<TiMemo, MemoError> {
        let text = fs::read_to_string(path)?;
        TiMemo::from_json_str(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), MemoError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn from_json_str(text: &str) -> Result<TiMemo, MemoError> {
        let records: Vec<MemoRecord> = serde_json::from_str(text)?;
        let mut entries = IndexMap::with_capacity(records.len());
        for record in records {
            if !record.value.is_decided() {
                warn!(node = %record.node, "skipping undecided memo record");
                continue;
            }
            let entry = TiMemoEntry {
                fingerprint: record.fingerprint,
                value: Some(record.value),
                derivations: Vec::new(),
                causes: Vec::new(),
            };
            if entries.insert(record.node, entry).is_some() {
                return Err(MemoError::DuplicateNode { node: record.node });
            }
        }
        Ok(TiMemo {
            entries,
            stats: MemoStats::default(),
        })
    }

    pub fn to_json_string(&self) -> Result<String, MemoError> {
        let records: Vec<MemoRecord> = self
            .entries
            .iter()
            .filter_map(|(&node, entry)| {
                Some(MemoRecord {
                    node,
                    fingerprint: entry.fingerprint,
                    value: entry.value?,
                })
            })
            .collect();
        let mut text = serde_json::to_string_pretty(&records)?;
        text.push('\n');
        Ok(text)
    }
}
