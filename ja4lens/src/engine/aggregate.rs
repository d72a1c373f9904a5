// ja4lens/src/engine/aggregate.rs
//
// Aggregation engine: fold every record sharing one fingerprint into a single
// AggregatedResult.
//
// One pass over the bucket:
//   - six attribute tallies (exact string keys, no case/whitespace folding)
//   - distinct notes and verified flags, in encounter order
//   - first display string seen
//   - (family, hash) tally for every OTHER family present on the record
// Then each tally is ranked by count with a stable sort (ties keep encounter
// order) and cut to MAX_ENTRIES. Nothing is cached; every call recomputes.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::classify;
use crate::engine::risk::{self, RiskInputs};
use crate::model::{AggregatedResult, CountedItem, FingerprintFamily, RelatedFingerprint};
use crate::state::db::FingerprintDb;

/// Cap on every ranked table and on the related-fingerprint list.
pub const MAX_ENTRIES: usize = 50;

// ── Encounter-ordered counter ─────────────────────────────────────────────────

struct Tally<K> {
    entries: Vec<(K, usize)>,
    pos:     HashMap<K, usize>,
}

impl<K: Eq + Hash + Copy> Tally<K> {
    fn new() -> Self {
        Self { entries: Vec::new(), pos: HashMap::new() }
    }

    fn bump(&mut self, key: K) {
        match self.pos.get(&key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.pos.insert(key, self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    fn bump_opt(&mut self, key: Option<K>) {
        if let Some(k) = key {
            self.bump(k);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// All entries, count descending; `sort_by` is stable so ties stay in
    /// first-encounter order.
    fn ranked(self) -> Vec<(K, usize)> {
        let mut v = self.entries;
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v
    }
}

fn counted(tally: Tally<&str>) -> Vec<CountedItem> {
    tally
        .ranked()
        .into_iter()
        .map(|(value, count)| CountedItem { value: value.to_string(), count })
        .collect()
}

fn capped(mut items: Vec<CountedItem>) -> Vec<CountedItem> {
    items.truncate(MAX_ENTRIES);
    items
}

// ── Search ────────────────────────────────────────────────────────────────────

pub fn search(db: &FingerprintDb, input: &str) -> Option<AggregatedResult> {
    let family = classify::detect(db.index(), input)?;
    let bucket = db.index().lookup(family, input)?;
    if bucket.is_empty() {
        return None;
    }

    let mut apps    = Tally::new();
    let mut libs    = Tally::new();
    let mut devices = Tally::new();
    let mut oses    = Tally::new();
    let mut uas     = Tally::new();
    let mut cas     = Tally::new();
    let mut related: Tally<(FingerprintFamily, &str)> = Tally::new();
    let mut notes: Vec<String>  = Vec::new();
    let mut verified: Vec<bool> = Vec::new();
    let mut display: Option<&str> = None;

    for &id in bucket {
        let Some(rec) = db.record(id) else { continue };

        apps.bump_opt(rec.application.as_deref());
        libs.bump_opt(rec.library.as_deref());
        devices.bump_opt(rec.device.as_deref());
        oses.bump_opt(rec.os.as_deref());
        uas.bump_opt(rec.user_agent_string.as_deref());
        cas.bump_opt(rec.certificate_authority.as_deref());

        if let Some(n) = rec.notes.as_deref() {
            if !notes.iter().any(|seen| seen == n) {
                notes.push(n.to_string());
            }
        }
        if !verified.contains(&rec.verified) {
            verified.push(rec.verified);
        }
        if display.is_none() {
            display = rec.ja4_fingerprint_string.as_deref();
        }

        for (other, hash) in rec.fingerprints() {
            if other != family {
                related.bump((other, hash));
            }
        }
    }

    let distinct_user_agents = uas.len();
    let applications = counted(apps);
    let risk_score = risk::score(RiskInputs {
        match_count:  bucket.len(),
        any_verified: verified.contains(&true),
        applications: &applications,
        distinct_user_agents,
    });

    let mut related_fingerprints: Vec<RelatedFingerprint> = related
        .ranked()
        .into_iter()
        .map(|((family, hash), count)| RelatedFingerprint { family, hash: hash.to_string(), count })
        .collect();
    related_fingerprints.truncate(MAX_ENTRIES);

    debug!(
        "search {} [{}]: {} matches, {} related, risk {}",
        input, family, bucket.len(), related_fingerprints.len(), risk_score
    );

    Some(AggregatedResult {
        fingerprint:             input.to_string(),
        fingerprint_type:        family,
        match_count:             bucket.len(),
        total_records:           db.total_records(),
        applications:            capped(applications),
        libraries:               capped(counted(libs)),
        devices:                 capped(counted(devices)),
        operating_systems:       capped(counted(oses)),
        user_agents:             capped(counted(uas)),
        certificate_authorities: capped(counted(cas)),
        notes,
        verified_values: verified,
        related_fingerprints,
        fingerprint_string: display.map(str::to_string),
        risk_score,
    })
}
