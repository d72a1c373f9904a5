// ja4lens/src/state/index.rs
//
// Read-only inverted indexes over the snapshot.
//
// Design:
//   - One bucket map per family: hash → record ids, in load order
//   - Global first-seen list: every distinct hash once, tagged with the family
//     it was first met under (later sightings under other families are NOT
//     re-attributed)
//   - Global lookup: hash → position in the first-seen list
//
// Built in one linear pass and never mutated afterwards, so any number of
// readers can share it without locking.

use std::collections::HashMap;

use crate::model::{FingerprintFamily, Record, RecordId};

/// One entry of the first-seen list. `lower` is cached for prefix scans.
#[derive(Debug, Clone)]
pub struct GlobalEntry {
    pub hash:   String,
    pub lower:  String,
    pub family: FingerprintFamily,
}

#[derive(Debug)]
pub struct IndexStore {
    buckets:       [HashMap<String, Vec<RecordId>>; 7],
    first_seen:    Vec<GlobalEntry>,
    global_lookup: HashMap<String, usize>,
}

impl IndexStore {
    pub fn build(records: &[Record]) -> Self {
        let mut buckets: [HashMap<String, Vec<RecordId>>; 7] =
            std::array::from_fn(|_| HashMap::new());
        let mut first_seen    = Vec::new();
        let mut global_lookup = HashMap::new();

        for (id, rec) in records.iter().enumerate() {
            for (family, hash) in rec.fingerprints() {
                buckets[family.slot()]
                    .entry(hash.to_string())
                    .or_insert_with(Vec::new)
                    .push(id);

                if !global_lookup.contains_key(hash) {
                    global_lookup.insert(hash.to_string(), first_seen.len());
                    first_seen.push(GlobalEntry {
                        hash:  hash.to_string(),
                        lower: hash.to_lowercase(),
                        family,
                    });
                }
            }
        }

        Self { buckets, first_seen, global_lookup }
    }

    /// Record ids indexed under (family, hash). Never returns an empty slice.
    pub fn lookup(&self, family: FingerprintFamily, hash: &str) -> Option<&[RecordId]> {
        self.buckets[family.slot()].get(hash).map(|v| v.as_slice())
    }

    pub fn contains(&self, family: FingerprintFamily, hash: &str) -> bool {
        self.buckets[family.slot()].contains_key(hash)
    }

    /// Family the hash was first attributed to during load.
    pub fn attributed_family(&self, hash: &str) -> Option<FingerprintFamily> {
        self.global_lookup.get(hash).map(|&i| self.first_seen[i].family)
    }

    /// Distinct hashes in first-seen order.
    pub fn first_seen(&self) -> &[GlobalEntry] {
        &self.first_seen
    }

    pub fn unique_fingerprints(&self) -> usize {
        self.first_seen.len()
    }

    /// Number of distinct hashes indexed under `family`.
    pub fn distinct_in(&self, family: FingerprintFamily) -> usize {
        self.buckets[family.slot()].len()
    }
}
