// ja4lens/src/model.rs
//
// Shared domain types flowing through ja4lens.
// `Record` mirrors one entry of the database.json snapshot; everything else is
// derived per query and never stored.

use serde::{Deserialize, Deserializer, Serialize};

/// Position of a record in the loaded dataset.
pub type RecordId = usize;

// ── Fingerprint families ──────────────────────────────────────────────────────

/// The seven JA4+ fingerprint families carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintFamily {
    Ja4,      // TLS client hello
    Ja4s,     // TLS server hello
    Ja4h,     // HTTP client
    Ja4x,     // X.509 certificate
    Ja4t,     // TCP client
    Ja4ts,    // TCP server
    Ja4tscan, // TCP active scan
}

impl FingerprintFamily {
    /// Classifier priority order. Exact index hits are tried in this order and
    /// the first family holding the literal hash wins.
    pub const ALL: [FingerprintFamily; 7] = [
        Self::Ja4,
        Self::Ja4s,
        Self::Ja4h,
        Self::Ja4x,
        Self::Ja4t,
        Self::Ja4ts,
        Self::Ja4tscan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ja4      => "ja4",
            Self::Ja4s     => "ja4s",
            Self::Ja4h     => "ja4h",
            Self::Ja4x     => "ja4x",
            Self::Ja4t     => "ja4t",
            Self::Ja4ts    => "ja4ts",
            Self::Ja4tscan => "ja4tscan",
        }
    }

    /// Dense index into per-family arrays.
    pub fn slot(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for FingerprintFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FingerprintFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown fingerprint family: {s}"))
    }
}

// ── Snapshot record ───────────────────────────────────────────────────────────

/// One historical observation. Empty strings in the snapshot are read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "non_empty")]
    pub application:           Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub library:               Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub device:                Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub os:                    Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub user_agent_string:     Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub certificate_authority: Option<String>,
    pub verified:              bool,
    #[serde(default, deserialize_with = "non_empty")]
    pub notes:                 Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub ja4_fingerprint:        Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub ja4_fingerprint_string: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub ja4s_fingerprint:       Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub ja4h_fingerprint:       Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub ja4x_fingerprint:       Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub ja4t_fingerprint:       Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub ja4ts_fingerprint:      Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub ja4tscan_fingerprint:   Option<String>,
}

impl Record {
    /// The hash this record carries for `family`, if any.
    pub fn fingerprint(&self, family: FingerprintFamily) -> Option<&str> {
        let field = match family {
            FingerprintFamily::Ja4      => &self.ja4_fingerprint,
            FingerprintFamily::Ja4s     => &self.ja4s_fingerprint,
            FingerprintFamily::Ja4h     => &self.ja4h_fingerprint,
            FingerprintFamily::Ja4x     => &self.ja4x_fingerprint,
            FingerprintFamily::Ja4t     => &self.ja4t_fingerprint,
            FingerprintFamily::Ja4ts    => &self.ja4ts_fingerprint,
            FingerprintFamily::Ja4tscan => &self.ja4tscan_fingerprint,
        };
        field.as_deref()
    }

    /// All (family, hash) pairs present, in priority order.
    pub fn fingerprints(&self) -> impl Iterator<Item = (FingerprintFamily, &str)> + '_ {
        FingerprintFamily::ALL
            .into_iter()
            .filter_map(move |f| self.fingerprint(f).map(|h| (f, h)))
    }
}

fn non_empty<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<String>::deserialize(de)?;
    Ok(v.filter(|s| !s.is_empty()))
}

// ── Aggregated view ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedItem {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedFingerprint {
    #[serde(rename = "type")]
    pub family: FingerprintFamily,
    pub hash:   String,
    pub count:  usize,
}

/// Everything known about one fingerprint, folded from every matching record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub fingerprint:             String,
    pub fingerprint_type:        FingerprintFamily,
    pub match_count:             usize,
    pub total_records:           usize,
    pub applications:            Vec<CountedItem>,
    pub libraries:               Vec<CountedItem>,
    pub devices:                 Vec<CountedItem>,
    pub operating_systems:       Vec<CountedItem>,
    pub user_agents:             Vec<CountedItem>,
    pub certificate_authorities: Vec<CountedItem>,
    pub notes:                   Vec<String>,
    pub verified_values:         Vec<bool>,
    pub related_fingerprints:    Vec<RelatedFingerprint>,
    pub fingerprint_string:      Option<String>,
    pub risk_score:              u8,
}

/// Autocomplete hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub hash: String,
    #[serde(rename = "type")]
    pub family: FingerprintFamily,
}

/// Human-readable decoding of a JA4 section-a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedJa4 {
    pub protocol:        String,
    pub tls_version:     String,
    pub sni:             String,
    pub cipher_count:    String,
    pub extension_count: String,
    pub alpn:            String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_strings_read_as_absent() {
        let rec: Record = serde_json::from_str(
            r#"{"application":"","verified":true,"ja4_fingerprint":"t13d1516h2_8daaf6152771_02713d6af862","notes":null}"#,
        ).unwrap();
        assert_eq!(rec.application, None);
        assert_eq!(rec.notes, None);
        assert!(rec.verified);
        assert_eq!(
            rec.fingerprint(FingerprintFamily::Ja4),
            Some("t13d1516h2_8daaf6152771_02713d6af862")
        );
    }

    #[test]
    fn verified_is_required() {
        assert!(serde_json::from_str::<Record>(r#"{"application":"curl"}"#).is_err());
    }

    #[test]
    fn family_round_trips_through_its_name() {
        for f in FingerprintFamily::ALL {
            assert_eq!(f.as_str().parse::<FingerprintFamily>().unwrap(), f);
            assert_eq!(serde_json::to_string(&f).unwrap(), format!("\"{}\"", f.as_str()));
        }
        assert!("ja5".parse::<FingerprintFamily>().is_err());
    }

    #[test]
    fn fingerprints_follow_priority_order() {
        let rec = Record {
            ja4t_fingerprint: Some("64240_2-1-3-1-1-4_1460_8".into()),
            ja4_fingerprint:  Some("t13d1516h2_8daaf6152771_02713d6af862".into()),
            ..Default::default()
        };
        let fams: Vec<_> = rec.fingerprints().map(|(f, _)| f).collect();
        assert_eq!(fams, vec![FingerprintFamily::Ja4, FingerprintFamily::Ja4t]);
    }
}
