// ja4lens/src/grammar.rs
//
// JA4 section-a decoder: turns the leading `t13d1516h2_` block of a client
// TLS fingerprint into readable labels. Pure; anything that doesn't fit the
// fixed-width layout yields None.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::ParsedJa4;

static SECTION_A: OnceLock<Regex> = OnceLock::new();

fn section_a() -> &'static Regex {
    SECTION_A.get_or_init(|| {
        Regex::new(
            r"^(?P<protocol>[tq])(?P<tls>\d{2})(?P<sni>[di])(?P<ciphers>\d{2})(?P<extensions>\d{2})(?P<alpn>[a-z0-9]{2})_",
        )
        .expect("JA4 section-a pattern failed to compile")
    })
}

fn tls_label(code: &str) -> String {
    match code {
        "10" => "TLS 1.0".into(),
        "11" => "TLS 1.1".into(),
        "12" => "TLS 1.2".into(),
        "13" => "TLS 1.3".into(),
        "00" => "Unknown".into(),
        other => format!("TLS ({other})"),
    }
}

fn alpn_label(code: &str) -> String {
    match code {
        "h1" => "HTTP/1.1".into(),
        "h2" => "HTTP/2".into(),
        "h3" => "HTTP/3 (QUIC)".into(),
        "00" => "No ALPN".into(),
        other => other.to_string(),
    }
}

pub fn parse_display(fingerprint: &str) -> Option<ParsedJa4> {
    let caps = section_a().captures(fingerprint)?;
    // two ASCII digits, always fits
    let ciphers: u32    = caps["ciphers"].parse().ok()?;
    let extensions: u32 = caps["extensions"].parse().ok()?;

    Some(ParsedJa4 {
        protocol: (if &caps["protocol"] == "t" { "TCP" } else { "QUIC" }).into(),
        tls_version: tls_label(&caps["tls"]),
        sni: (if &caps["sni"] == "d" { "Domain (SNI present)" } else { "IP (no SNI)" }).into(),
        cipher_count:    format!("{ciphers} cipher suites"),
        extension_count: format!("{extensions} extensions"),
        alpn: alpn_label(&caps["alpn"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_chrome_like_fingerprint() {
        let p = parse_display("t13d1516h2_8daaf6152771_02713d6af862").unwrap();
        assert_eq!(p.protocol, "TCP");
        assert_eq!(p.tls_version, "TLS 1.3");
        assert_eq!(p.sni, "Domain (SNI present)");
        assert_eq!(p.cipher_count, "15 cipher suites");
        assert_eq!(p.extension_count, "16 extensions");
        assert_eq!(p.alpn, "HTTP/2");
    }

    #[test]
    fn quic_ip_and_fallback_labels() {
        let p = parse_display("q09i0705dt_aaaaaaaaaaaa_bbbbbbbbbbbb").unwrap();
        assert_eq!(p.protocol, "QUIC");
        assert_eq!(p.tls_version, "TLS (09)");
        assert_eq!(p.sni, "IP (no SNI)");
        assert_eq!(p.cipher_count, "7 cipher suites");
        assert_eq!(p.extension_count, "5 extensions");
        assert_eq!(p.alpn, "dt");
    }

    #[test]
    fn only_section_a_is_checked() {
        let p = parse_display("t00d000000_anything").unwrap();
        assert_eq!(p.tls_version, "Unknown");
        assert_eq!(p.alpn, "No ALPN");
    }

    #[test]
    fn non_ja4_input_is_none() {
        for s in ["", "t13d1516h2", "t130200_1301_a56c5b993250", "64240_2-1-3-1-1-4_1460_8", "T13d1516h2_x"] {
            assert_eq!(parse_display(s), None, "{s:?}");
        }
    }
}
