//! Dictionary store with atomically swapped immutable snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::info;

use crate::dictionary::entry::DictionaryEntry;
use crate::dictionary::trie::PrefixTrie;

/// An immutable view of the dictionary at one point in time.
///
/// Lookups need no locking: a request clones the snapshot `Arc` once and
/// keeps a consistent view even if a reload lands mid-request.
#[derive(Debug)]
pub struct DictionarySnapshot {
    entries: Vec<DictionaryEntry>,
    trie: PrefixTrie,
    version: u64,
    loaded_at: DateTime<Utc>,
}

impl DictionarySnapshot {
    /// Build a snapshot from a list of entries. Later duplicates of the
    /// same term replace earlier ones.
    pub fn build(entries: Vec<DictionaryEntry>, version: u64) -> Self {
        let mut trie = PrefixTrie::new();
        for (idx, entry) in entries.iter().enumerate() {
            trie.insert(&entry.term, idx);
        }

        DictionarySnapshot {
            entries,
            trie,
            version,
            loaded_at: Utc::now(),
        }
    }

    /// Longest dictionary term starting at `chars[start]`, with its entry.
    pub fn longest_match(&self, chars: &[char], start: usize) -> Option<(usize, &DictionaryEntry)> {
        self.trie
            .longest_match(chars, start)
            .map(|(len, idx)| (len, &self.entries[idx]))
    }

    /// Look up an exact term.
    pub fn get(&self, term: &str) -> Option<&DictionaryEntry> {
        let chars: Vec<char> = term.chars().collect();
        match self.trie.longest_match(&chars, 0) {
            Some((len, idx)) if len == chars.len() => Some(&self.entries[idx]),
            _ => None,
        }
    }

    /// Whether the exact term is present.
    pub fn contains(&self, term: &str) -> bool {
        self.get(term).is_some()
    }

    /// Number of distinct terms in this snapshot.
    pub fn term_count(&self) -> usize {
        self.trie.len()
    }

    /// Monotonically increasing snapshot version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When this snapshot was built.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Shared handle to the current dictionary snapshot.
///
/// The lock guards only the pointer swap; readers clone the `Arc` and drop
/// the lock before doing any lookups.
pub struct DictionaryStore {
    current: RwLock<Arc<DictionarySnapshot>>,
    next_version: AtomicU64,
}

impl DictionaryStore {
    /// Create a store with an initial set of entries.
    pub fn new(entries: Vec<DictionaryEntry>) -> Self {
        let snapshot = DictionarySnapshot::build(entries, 1);
        DictionaryStore {
            current: RwLock::new(Arc::new(snapshot)),
            next_version: AtomicU64::new(2),
        }
    }

    /// Create a store with no entries (segmentation falls back entirely to
    /// the non-dictionary engines).
    pub fn empty() -> Self {
        DictionaryStore::new(Vec::new())
    }

    /// Get the current snapshot.
    pub fn snapshot(&self) -> Arc<DictionarySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Replace the snapshot atomically. In-flight readers keep the old one.
    pub fn reload(&self, entries: Vec<DictionaryEntry>) -> Arc<DictionarySnapshot> {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let snapshot = Arc::new(DictionarySnapshot::build(entries, version));
        *self.current.write() = Arc::clone(&snapshot);
        info!(
            version,
            terms = snapshot.term_count(),
            "dictionary snapshot swapped"
        );
        snapshot
    }

    /// Number of terms in the current snapshot.
    pub fn term_count(&self) -> usize {
        self.snapshot().term_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(term: &str, confidence: f32) -> DictionaryEntry {
        DictionaryEntry::new(term, "compound").with_confidence(confidence)
    }

    #[test]
    fn test_snapshot_lookup() {
        let store = DictionaryStore::new(vec![entry("วากาเมะ", 0.95), entry("สาหร่าย", 0.9)]);
        let snapshot = store.snapshot();

        assert_eq!(snapshot.term_count(), 2);
        assert!(snapshot.contains("วากาเมะ"));
        assert!(!snapshot.contains("วากา"));

        let chars: Vec<char> = "วากาเมะทะเล".chars().collect();
        let (len, matched) = snapshot.longest_match(&chars, 0).unwrap();
        assert_eq!(len, 7);
        assert_eq!(matched.term, "วากาเมะ");
    }

    #[test]
    fn test_reload_swaps_atomically() {
        let store = DictionaryStore::new(vec![entry("เก่า", 1.0)]);
        let before = store.snapshot();

        store.reload(vec![entry("ใหม่", 1.0)]);
        let after = store.snapshot();

        // The old snapshot is still valid for readers that hold it.
        assert!(before.contains("เก่า"));
        assert!(!after.contains("เก่า"));
        assert!(after.contains("ใหม่"));
        assert!(after.version() > before.version());
    }

    #[test]
    fn test_duplicate_terms_last_wins() {
        let store = DictionaryStore::new(vec![entry("ซ้ำ", 0.5), entry("ซ้ำ", 0.8)]);
        let snapshot = store.snapshot();

        assert_eq!(snapshot.term_count(), 1);
        assert_eq!(snapshot.get("ซ้ำ").unwrap().confidence, 0.8);
    }
}
