// ja4lens/src/engine/risk.rs
//
// Heuristic 0–100 suspicion score for one aggregated fingerprint.
//
// Score contributions (additive, clamped to 100):
//   unverified:       +10  no record in the bucket is verified
//   offensive_tool:   +40  an observed application name contains a deny-list fragment
//   rare:             +15  match_count ≤ 5
//   no_user_agent:    +15  no user-agent string observed
//
// Deny-list scan: Aho-Corasick over the lower-cased distinct application names,
// O(total name length) regardless of fragment count.

use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::model::CountedItem;

pub const UNVERIFIED_WEIGHT:     u32 = 10;
pub const OFFENSIVE_TOOL_WEIGHT: u32 = 40;
pub const RARE_WEIGHT:           u32 = 15;
pub const NO_USER_AGENT_WEIGHT:  u32 = 15;

/// At or below this many matching records a fingerprint counts as rare.
pub const RARE_MATCH_COUNT: usize = 5;

/// Fragments of offensive-security tool names (scanners, exploitation
/// frameworks, credential dumpers, brute-forcers, C2).
pub const OFFENSIVE_TOOLS: &[&str] = &[
    "nmap",
    "metasploit",
    "cobalt",
    "mimikatz",
    "burp",
    "sqlmap",
    "hydra",
    "nikto",
    "masscan",
    "zmap",
    "gobuster",
    "dirbuster",
    "hashcat",
    "john",
    "responder",
    "empire",
    "sliver",
    "havoc",
    "covenant",
    "brute",
];

static TOOL_AC: OnceLock<AhoCorasick> = OnceLock::new();

fn tool_automaton() -> &'static AhoCorasick {
    TOOL_AC.get_or_init(|| {
        AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .build(OFFENSIVE_TOOLS)
            .expect("offensive-tool AC build failed")
    })
}

/// First deny-list fragment found in any application name, if any.
pub fn offensive_tool_hit<'a, I>(applications: I) -> Option<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    let ac = tool_automaton();
    applications.into_iter().find_map(|name| {
        ac.find(&name.to_lowercase())
            .map(|m| OFFENSIVE_TOOLS[m.pattern().as_usize()])
    })
}

/// Inputs the score depends on, collected during the aggregation pass.
#[derive(Debug, Clone, Copy)]
pub struct RiskInputs<'a> {
    pub match_count:  usize,
    pub any_verified: bool,
    /// Distinct application names, every one observed (not only the top 50).
    pub applications: &'a [CountedItem],
    pub distinct_user_agents: usize,
}

pub fn score(inputs: RiskInputs<'_>) -> u8 {
    let mut risk = 0u32;

    if !inputs.any_verified {
        risk += UNVERIFIED_WEIGHT;
    }
    if offensive_tool_hit(inputs.applications.iter().map(|c| c.value.as_str())).is_some() {
        risk += OFFENSIVE_TOOL_WEIGHT;
    }
    if inputs.match_count <= RARE_MATCH_COUNT {
        risk += RARE_WEIGHT;
    }
    if inputs.distinct_user_agents == 0 {
        risk += NO_USER_AGENT_WEIGHT;
    }

    risk.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apps(names: &[&str]) -> Vec<CountedItem> {
        names.iter().map(|n| CountedItem { value: n.to_string(), count: 1 }).collect()
    }

    #[test]
    fn clean_common_verified_scores_zero() {
        let a = apps(&["Chrome", "Edge"]);
        let s = score(RiskInputs { match_count: 6, any_verified: true, applications: &a, distinct_user_agents: 1 });
        assert_eq!(s, 0);
    }

    #[test]
    fn everything_fires() {
        let a = apps(&["Metasploit Framework"]);
        let s = score(RiskInputs { match_count: 1, any_verified: false, applications: &a, distinct_user_agents: 0 });
        assert_eq!(s, 80);
    }

    #[test]
    fn deny_list_is_case_insensitive_substring() {
        assert_eq!(offensive_tool_hit(["Nmap NSE"]), Some("nmap"));
        assert_eq!(offensive_tool_hit(["curl", "CobaltStrike beacon"]), Some("cobalt"));
        // substring semantics: "john" hits inside longer names too
        assert_eq!(offensive_tool_hit(["Johnny's Browser"]), Some("john"));
        assert_eq!(offensive_tool_hit(["curl", "Firefox"]), None);
        assert_eq!(offensive_tool_hit(Vec::<&str>::new()), None);
    }

    #[test]
    fn rare_threshold_is_inclusive() {
        let a = apps(&[]);
        let at = score(RiskInputs { match_count: 5, any_verified: true, applications: &a, distinct_user_agents: 2 });
        let above = score(RiskInputs { match_count: 6, any_verified: true, applications: &a, distinct_user_agents: 2 });
        assert_eq!(at, 15);
        assert_eq!(above, 0);
    }

    #[test]
    fn max_possible_stays_in_range() {
        let total = UNVERIFIED_WEIGHT + OFFENSIVE_TOOL_WEIGHT + RARE_WEIGHT + NO_USER_AGENT_WEIGHT;
        assert!(total <= 100);
        assert_eq!(OFFENSIVE_TOOLS.len(), 20);
    }
}
