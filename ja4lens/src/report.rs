// ja4lens/src/report.rs
//
// Terminal rendering of engine output. Everything here is a consumer of the
// engine's types; nothing feeds back into the index.

use std::fmt::Write as _;

use serde_json::Value;

use crate::model::{AggregatedResult, CountedItem, ParsedJa4, Suggestion};
use crate::state::db::DbStats;

const RESET: &str = "\x1b[0m";
const BOLD:  &str = "\x1b[1m";
const GREY:  &str = "\x1b[90m";

const BAR_WIDTH:    usize = 30;
const TOP_RELATED:  usize = 15;
const TOP_ASSOC:    usize = 5;

/// Keys the extraction tool may emit per session, in display order.
pub const STREAM_FINGERPRINT_KEYS: &[&str] = &[
    "JA4", "JA4S", "JA4H", "JA4X", "JA4T", "JA4TS", "JA4TScan", "JA4L", "JA4LS", "JA4SSH",
];

fn risk_color(score: u8) -> &'static str {
    match score {
        0..=33  => "\x1b[92m",
        34..=66 => "\x1b[93;1m",
        _       => "\x1b[91;1m",
    }
}

pub fn risk_bar(score: u8) -> String {
    let filled = (score.min(100) as usize * BAR_WIDTH + 50) / 100;
    format!(
        "{}{}{}{} {}%",
        risk_color(score),
        "█".repeat(filled),
        GREY,
        "░".repeat(BAR_WIDTH - filled),
        score,
    ) + RESET
}

fn assoc_rows(out: &mut String, label: &str, items: &[CountedItem], limit: usize) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {BOLD}{label}{RESET}");
    for item in items.iter().take(limit) {
        let _ = writeln!(out, "    {:>5}  {}", item.count, item.value);
    }
}

pub fn render_result(r: &AggregatedResult, parsed: Option<&ParsedJa4>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{BOLD}{}{RESET}  {GREY}[{}]{RESET}", r.fingerprint, r.fingerprint_type);
    let _ = writeln!(out, "  Matches : {} of {} records", r.match_count, r.total_records);
    let _ = writeln!(out, "  Risk    : {}", risk_bar(r.risk_score));
    if let Some(s) = &r.fingerprint_string {
        let _ = writeln!(out, "  String  : {GREY}{s}{RESET}");
    }
    let verified: Vec<String> = r.verified_values.iter().map(|v| v.to_string()).collect();
    let _ = writeln!(out, "  Verified: {}", verified.join(", "));

    if let Some(p) = parsed {
        let _ = writeln!(out, "\n  {BOLD}JA4 translation{RESET}");
        for (label, value) in [
            ("Protocol", &p.protocol),
            ("TLS Version", &p.tls_version),
            ("SNI", &p.sni),
            ("Cipher Suites", &p.cipher_count),
            ("Extensions", &p.extension_count),
            ("ALPN", &p.alpn),
        ] {
            let _ = writeln!(out, "    {label:<14} {value}");
        }
    }

    if !r.related_fingerprints.is_empty() {
        let _ = writeln!(out, "\n  {BOLD}Top related fingerprints{RESET}");
        for rf in r.related_fingerprints.iter().take(TOP_RELATED) {
            let _ = writeln!(out, "    {:>5}  {:<8} {}", rf.count, rf.family, rf.hash);
        }
    }

    let _ = writeln!(out);
    assoc_rows(&mut out, "Applications", &r.applications, TOP_ASSOC);
    assoc_rows(&mut out, "Libraries", &r.libraries, TOP_ASSOC);
    assoc_rows(&mut out, "Devices", &r.devices, TOP_ASSOC);
    assoc_rows(&mut out, "Operating systems", &r.operating_systems, TOP_ASSOC);
    assoc_rows(&mut out, "User agent strings", &r.user_agents, TOP_ASSOC);
    assoc_rows(&mut out, "Certificate authorities", &r.certificate_authorities, TOP_ASSOC);

    if !r.notes.is_empty() {
        let _ = writeln!(out, "  {BOLD}Notes{RESET}");
        for n in &r.notes {
            let _ = writeln!(out, "    - {n}");
        }
    }
    out
}

pub fn render_suggestions(items: &[Suggestion]) -> String {
    items.iter().map(|s| format!("{:<8} {}\n", s.family, s.hash)).collect()
}

pub fn render_stats(s: &DbStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "| Metric              | Value   |");
    let _ = writeln!(out, "|---------------------|---------|");
    let _ = writeln!(out, "| Records             | {:<7} |", s.total_records);
    let _ = writeln!(out, "| Unique fingerprints | {:<7} |", s.unique_fingerprints);
    let _ = writeln!(out, "| Skipped records     | {:<7} |", s.skipped_records);
    for (family, n) in &s.per_family {
        let _ = writeln!(out, "| {:<19} | {:<7} |", family.as_str(), n);
    }
    let _ = writeln!(out, "\nLoaded at {}", s.loaded_at.to_rfc3339());
    out
}

fn field_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Summary of extraction-tool sessions: endpoints plus every non-empty
/// fingerprint key.
pub fn render_streams(sessions: &[Value]) -> String {
    if sessions.is_empty() {
        return "No streams found in this capture file.\n".into();
    }
    let mut out = String::new();
    let plural = if sessions.len() == 1 { "" } else { "s" };
    let _ = writeln!(out, "{BOLD}{} stream{plural} analyzed{RESET}", sessions.len());

    for (i, stream) in sessions.iter().enumerate() {
        let endpoint = |host: &str, port: &str| {
            field_text(&stream[host]).map(|h| match field_text(&stream[port]) {
                Some(p) => format!("{h}:{p}"),
                None    => h,
            })
        };
        let _ = write!(out, "\n  Stream {i}");
        if let (Some(src), Some(dst)) = (endpoint("src", "src_port"), endpoint("dst", "dst_port")) {
            let _ = write!(out, "  {GREY}{src} → {dst}{RESET}");
        }
        let _ = writeln!(out);

        let mut any = false;
        for key in STREAM_FINGERPRINT_KEYS {
            if let Some(fp) = field_text(&stream[*key]) {
                any = true;
                let _ = writeln!(out, "    {key:<8} {fp}");
            }
        }
        if !any {
            let _ = writeln!(out, "    {GREY}no fingerprints{RESET}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FingerprintFamily, RelatedFingerprint};
    use serde_json::json;

    fn result() -> AggregatedResult {
        AggregatedResult {
            fingerprint:             "t13d1516h2_8daaf6152771_02713d6af862".into(),
            fingerprint_type:        FingerprintFamily::Ja4,
            match_count:             2,
            total_records:           10,
            applications:            vec![CountedItem { value: "curl".into(), count: 2 }],
            libraries:               vec![],
            devices:                 vec![],
            operating_systems:       vec![],
            user_agents:             vec![],
            certificate_authorities: vec![],
            notes:                   vec!["lab capture".into()],
            verified_values:         vec![true],
            related_fingerprints:    vec![RelatedFingerprint {
                family: FingerprintFamily::Ja4s,
                hash:   "t130200_1301_a56c5b993250".into(),
                count:  2,
            }],
            fingerprint_string: None,
            risk_score:         30,
        }
    }

    #[test]
    fn bar_scales_with_score() {
        assert!(risk_bar(0).contains("0%"));
        assert_eq!(risk_bar(100).matches('█').count(), BAR_WIDTH);
        assert_eq!(risk_bar(50).matches('█').count(), BAR_WIDTH / 2);
        assert_eq!(risk_bar(0).matches('█').count(), 0);
    }

    #[test]
    fn result_lists_sections() {
        let parsed = crate::grammar::parse_display("t13d1516h2_8daaf6152771_02713d6af862");
        let text = render_result(&result(), parsed.as_ref());
        assert!(text.contains("2 of 10 records"));
        assert!(text.contains("TLS 1.3"));
        assert!(text.contains("t130200_1301_a56c5b993250"));
        assert!(text.contains("curl"));
        assert!(text.contains("lab capture"));
        assert!(!text.contains("Libraries"));
    }

    #[test]
    fn streams_show_endpoints_and_present_keys() {
        let sessions = vec![
            json!({"src":"10.0.0.1","src_port":51514,"dst":"1.1.1.1","dst_port":443,
                   "JA4":"t13d1516h2_8daaf6152771_02713d6af862","JA4S":"","JA4T":null}),
            json!({"stream": 1}),
        ];
        let text = render_streams(&sessions);
        assert!(text.contains("2 streams analyzed"));
        assert!(text.contains("10.0.0.1:51514 → 1.1.1.1:443"));
        assert!(text.contains("JA4      t13d1516h2"));
        assert!(!text.contains("JA4S "));
        assert!(text.contains("no fingerprints"));
        assert_eq!(render_streams(&[]), "No streams found in this capture file.\n");
    }
}
