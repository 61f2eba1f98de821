//! Team identity resolution.
//!
//! Every source spells club names its own way ("Manchester Utd", "Wolves",
//! "Brighton & Hove Albion"). All joins run on one canonical identifier:
//! trimmed, lowercased, whitespace collapsed to underscores, then corrected
//! through a fixed alias table. Unknown spellings pass through unchanged so
//! an unexpected club still survives the outer join under its raw id.

use std::collections::BTreeSet;

/// Post-canonicalization spellings that differ from the identifier the rest
/// of the pipeline uses. Targets are never alias keys themselves, so the
/// mapping is idempotent.
const ALIASES: &[(&str, &str)] = &[
    ("afc_bournemouth", "bournemouth"),
    ("brighton_&_hove_albion", "brighton"),
    ("brighton_and_hove_albion", "brighton"),
    ("ipswich_town", "ipswich"),
    ("leeds_united", "leeds"),
    ("leicester_city", "leicester"),
    ("luton_town", "luton"),
    ("manchester_utd", "manchester_united"),
    ("newcastle_utd", "newcastle_united"),
    ("nott'm_forest", "nottingham_forest"),
    ("nott'ham_forest", "nottingham_forest"),
    ("sheffield_utd", "sheffield_united"),
    ("tottenham_hotspur", "tottenham"),
    ("west_ham_united", "west_ham"),
    ("wolves", "wolverhampton_wanderers"),
];

/// Canonical join key for a club name as scraped from any source.
pub fn canonical_team_id(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let flat = lowered.split_whitespace().collect::<Vec<_>>().join("_");
    for (alias, canonical) in ALIASES {
        if flat == *alias {
            return (*canonical).to_string();
        }
    }
    flat
}

/// Directory name for a team's scraped files: display casing kept, spaces
/// replaced. Canonicalization happens when the files are read back.
pub fn team_dir_name(display: &str) -> String {
    display.trim().replace(' ', "_")
}

/// Ids that still do not match any expected canonical id after
/// normalization. Returned sorted and deduplicated; callers log the list
/// rather than abort, and the rows stay in the merge under their raw id.
pub fn unresolved<'a>(
    ids: impl IntoIterator<Item = &'a str>,
    expected: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let known: BTreeSet<&str> = expected.into_iter().collect();
    let mut strays: BTreeSet<String> = BTreeSet::new();
    for id in ids {
        if !known.contains(id) {
            strays.insert(id.to_string());
        }
    }
    strays.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_id_lowercases_and_joins() {
        assert_eq!(canonical_team_id("Manchester United"), "manchester_united");
        assert_eq!(canonical_team_id("  West Ham   United "), "west_ham");
    }

    #[test]
    fn canonical_id_applies_aliases() {
        assert_eq!(canonical_team_id("Manchester Utd"), "manchester_united");
        assert_eq!(canonical_team_id("Wolves"), "wolverhampton_wanderers");
        assert_eq!(canonical_team_id("Leicester City"), "leicester");
        assert_eq!(canonical_team_id("Ipswich Town"), "ipswich");
        assert_eq!(canonical_team_id("Newcastle Utd"), "newcastle_united");
        assert_eq!(canonical_team_id("Tottenham Hotspur"), "tottenham");
        assert_eq!(canonical_team_id("AFC Bournemouth"), "bournemouth");
        assert_eq!(canonical_team_id("Brighton & Hove Albion"), "brighton");
    }

    #[test]
    fn canonical_id_is_idempotent() {
        for raw in ["Wolves", "Nott'm Forest", "Arsenal", "Sheffield Utd"] {
            let once = canonical_team_id(raw);
            assert_eq!(canonical_team_id(&once), once);
        }
    }

    #[test]
    fn dir_name_keeps_display_casing() {
        assert_eq!(team_dir_name("Manchester United"), "Manchester_United");
        assert_eq!(team_dir_name(" Arsenal "), "Arsenal");
    }

    #[test]
    fn unresolved_reports_strays_sorted() {
        let ids = ["arsenal".to_string(), "gotham_city".to_string(), "arsenal".to_string()];
        let expected = ["arsenal".to_string(), "chelsea".to_string()];
        let strays = unresolved(
            ids.iter().map(String::as_str),
            expected.iter().map(String::as_str),
        );
        assert_eq!(strays, vec!["gotham_city".to_string()]);
    }
}
