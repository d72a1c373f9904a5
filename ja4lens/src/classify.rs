// ja4lens/src/classify.rs
//
// Fingerprint family classifier.
//
// Resolution order:
//   1. Exact index membership, families tried in FingerprintFamily::ALL order.
//      A literal that is a key in two family indexes resolves to the earlier
//      family; there is no further disambiguation.
//   2. Structural grammars, tried in FALLBACK_ORDER. Well-formed hashes of one
//      family never match another family's grammar.
//   3. None. Garbage input and a valid-looking-but-unknown hash are both just
//      "unresolved" here; only the index decides whether records exist.
//
// JA4TS and JA4TScan share JA4T's lexical shape, so they have no grammar of
// their own and resolve only through the index.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::model::FingerprintFamily;
use crate::state::index::IndexStore;

/// Order in which structural grammars are tried.
pub const FALLBACK_ORDER: [FingerprintFamily; 5] = [
    FingerprintFamily::Ja4,
    FingerprintFamily::Ja4h,
    FingerprintFamily::Ja4t,
    FingerprintFamily::Ja4s,
    FingerprintFamily::Ja4x,
];

// ── Grammars ──────────────────────────────────────────────────────────────────

// (family, pattern). Named groups document each field of the fingerprint.
const GRAMMAR_PATTERNS: &[(FingerprintFamily, &str)] = &[
    // t13d1516h2_8daaf6152771_02713d6af862
    (
        FingerprintFamily::Ja4,
        r"^(?P<protocol>[tq])(?P<version>\d{2})(?P<sni>[di])(?P<ciphers>\d{2})(?P<extensions>\d{2})(?P<alpn>[a-z0-9]{2})_(?P<cipher_hash>[a-f0-9]{12})_(?P<extension_hash>[a-f0-9]{12})$",
    ),
    // ge11cn20enus_60ca1bd65281_ac95b44401d9_8df6a44f726c
    (
        FingerprintFamily::Ja4h,
        r"^(?P<method>[a-z]{2})(?P<version>\d{2})(?P<cookie>[a-z])(?P<referer>[a-z])(?P<headers>\d+)(?P<language>[a-z]*)_(?P<header_hash>[a-f0-9]{12})_(?P<cookie_name_hash>[a-f0-9]{12})_(?P<cookie_value_hash>[a-f0-9]{12})$",
    ),
    // 64240_2-1-3-1-1-4_1460_8
    (
        FingerprintFamily::Ja4t,
        r"^(?P<window>\d+)_(?P<options>[\d-]+)_(?P<mss>\d+)_(?P<window_scale>\d+)$",
    ),
    // t130200_1301_a56c5b993250
    (
        FingerprintFamily::Ja4s,
        r"^(?P<protocol>[tq])(?P<version>\d{2})(?P<extensions>\d{2})(?P<alpn>\d{2})_(?P<cipher>[a-f0-9]{4})_(?P<extension_hash>[a-f0-9]{12})$",
    ),
    // a373a9f83c6b_2bab15409345_7bf9a7bf7029
    (
        FingerprintFamily::Ja4x,
        r"^(?P<issuer_hash>[a-f0-9]{12})_(?P<subject_hash>[a-f0-9]{12})_(?P<extension_hash>[a-f0-9]{12})$",
    ),
];

/// A family's fixed lexical grammar.
#[derive(Debug)]
pub struct FamilyGrammar {
    pub family: FingerprintFamily,
    regex:      Regex,
}

impl FamilyGrammar {
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    /// Named fields of `input`, or None if it does not fit the grammar.
    pub fn captures<'h>(&self, input: &'h str) -> Option<Captures<'h>> {
        self.regex.captures(input)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }
}

static GRAMMARS: OnceLock<Vec<FamilyGrammar>> = OnceLock::new();

/// All grammars in FALLBACK_ORDER.
pub fn grammars() -> &'static [FamilyGrammar] {
    GRAMMARS.get_or_init(|| {
        FALLBACK_ORDER
            .iter()
            .filter_map(|fam| GRAMMAR_PATTERNS.iter().find(|(f, _)| f == fam))
            .map(|(family, pattern)| FamilyGrammar {
                family: *family,
                regex:  Regex::new(pattern).expect("fingerprint grammar failed to compile"),
            })
            .collect()
    })
}

pub fn grammar_for(family: FingerprintFamily) -> Option<&'static FamilyGrammar> {
    grammars().iter().find(|g| g.family == family)
}

// ── Detection ─────────────────────────────────────────────────────────────────

/// Structural-only classification (no index).
pub fn detect_by_shape(input: &str) -> Option<FingerprintFamily> {
    grammars().iter().find(|g| g.is_match(input)).map(|g| g.family)
}

pub fn detect(index: &IndexStore, input: &str) -> Option<FingerprintFamily> {
    FingerprintFamily::ALL
        .into_iter()
        .find(|&f| index.contains(f, input))
        .or_else(|| detect_by_shape(input))
}
