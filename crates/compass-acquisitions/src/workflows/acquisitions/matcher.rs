use std::collections::HashMap;

use super::domain::RemoteRecord;
use super::mapping::ReconciliationMappings;
use super::normalizer::normalize_title;

/// Containment matches are only trusted when the titles are of similar length.
const MAX_PREFIX_LENGTH_GAP: usize = 30;
const TOKEN_PREFIX_TOKENS: usize = 3;
const MIN_TOKEN_PREFIX_TOKENS: usize = 2;
const MIN_TOKEN_PREFIX_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Manual,
    Exact,
    Prefix,
    SuburbStripped,
    TokenPrefix,
}

impl MatchKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::SuburbStripped => "suburb stripped",
            Self::TokenPrefix => "token prefix",
        }
    }

    pub const fn needs_review(self) -> bool {
        matches!(self, Self::Manual | Self::TokenPrefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchHit {
    /// Position in the slice the matcher was built from.
    pub index: usize,
    pub kind: MatchKind,
}

/// Index over remote titles, scanned in fetch order.
#[derive(Debug)]
pub struct TitleMatcher<'a> {
    keys: Vec<(String, usize)>,
    by_key: HashMap<String, usize>,
    by_id: HashMap<&'a str, usize>,
    mappings: &'a ReconciliationMappings,
}

impl<'a> TitleMatcher<'a> {
    pub fn new(remotes: &'a [RemoteRecord], mappings: &'a ReconciliationMappings) -> Self {
        let mut keys = Vec::with_capacity(remotes.len());
        let mut by_key = HashMap::with_capacity(remotes.len());
        let mut by_id = HashMap::with_capacity(remotes.len());

        for (index, remote) in remotes.iter().enumerate() {
            by_id.entry(remote.id.as_str()).or_insert(index);
            let key = normalize_title(remote.title.as_deref().unwrap_or_default());
            if key.is_empty() {
                continue;
            }
            by_key.entry(key.clone()).or_insert(index);
            keys.push((key, index));
        }

        Self {
            keys,
            by_key,
            by_id,
            mappings,
        }
    }

    pub fn find(&self, raw_title: &str) -> Option<MatchHit> {
        let key = normalize_title(raw_title);
        if key.is_empty() {
            return None;
        }

        if let Some(index) = self
            .mappings
            .manual_match(&key)
            .and_then(|id| self.by_id.get(id).copied())
        {
            return Some(MatchHit {
                index,
                kind: MatchKind::Manual,
            });
        }

        if let Some(hit) = self.exact_or_prefix(&key) {
            return Some(hit);
        }

        if let Some(hit) = self.without_suburb(raw_title) {
            return Some(hit);
        }

        self.token_prefix(&key).map(|index| MatchHit {
            index,
            kind: MatchKind::TokenPrefix,
        })
    }

    fn exact_or_prefix(&self, key: &str) -> Option<MatchHit> {
        if let Some(index) = self.by_key.get(key) {
            return Some(MatchHit {
                index: *index,
                kind: MatchKind::Exact,
            });
        }
        self.prefix(key).map(|index| MatchHit {
            index,
            kind: MatchKind::Prefix,
        })
    }

    fn prefix(&self, key: &str) -> Option<usize> {
        self.keys.iter().find_map(|(remote_key, index)| {
            let contained = remote_key.starts_with(key) || key.starts_with(remote_key.as_str());
            (contained && remote_key.len().abs_diff(key.len()) < MAX_PREFIX_LENGTH_GAP)
                .then_some(*index)
        })
    }

    /// Sheet titles often end in ", Suburb" while the CMS title does not.
    fn without_suburb(&self, raw_title: &str) -> Option<MatchHit> {
        let comma = raw_title.rfind(',').filter(|position| *position > 0)?;
        let stripped = normalize_title(&raw_title[..comma]);
        if stripped.is_empty() {
            return None;
        }
        self.exact_or_prefix(&stripped).map(|hit| MatchHit {
            index: hit.index,
            kind: MatchKind::SuburbStripped,
        })
    }

    fn token_prefix(&self, key: &str) -> Option<usize> {
        let head = leading_tokens(key)?;
        if head.len() < MIN_TOKEN_PREFIX_LEN {
            return None;
        }

        self.keys.iter().find_map(|(remote_key, index)| {
            let same_head = leading_tokens(remote_key)? == head;
            (same_head && remote_key.len().abs_diff(key.len()) < MAX_PREFIX_LENGTH_GAP)
                .then_some(*index)
        })
    }
}

fn leading_tokens(key: &str) -> Option<String> {
    let tokens: Vec<&str> = key
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .take(TOKEN_PREFIX_TOKENS)
        .collect();
    (tokens.len() >= MIN_TOKEN_PREFIX_TOKENS).then(|| tokens.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str, title: &str) -> RemoteRecord {
        RemoteRecord {
            id: id.to_string(),
            title: Some(title.to_string()),
            ..RemoteRecord::default()
        }
    }

    fn find(remotes: &[RemoteRecord], title: &str) -> Option<(String, MatchKind)> {
        let mappings = ReconciliationMappings::default();
        let matcher = TitleMatcher::new(remotes, &mappings);
        matcher
            .find(title)
            .map(|hit| (remotes[hit.index].id.clone(), hit.kind))
    }

    #[test]
    fn exact_match_beats_prefix_regardless_of_order() {
        let remotes = vec![
            remote("long", "12 Paperbark Court, Banora Point"),
            remote("short", "12 Paperbark Court"),
        ];
        assert_eq!(
            find(&remotes, "12 Paperbark Court NSW 2486"),
            Some(("short".to_string(), MatchKind::Exact))
        );
    }

    #[test]
    fn prefix_match_respects_length_gap() {
        let remotes = vec![remote("a", "7 Ti Tree Avenue, Bogangar")];
        assert_eq!(
            find(&remotes, "7 Ti Tree Avenue"),
            Some(("a".to_string(), MatchKind::Prefix))
        );

        let remotes = vec![remote(
            "b",
            "7 Ti Tree Avenue with sweeping coastal views and a pool",
        )];
        assert_eq!(find(&remotes, "7 Ti Tree Avenue"), None);
    }

    #[test]
    fn suburb_suffix_is_stripped_before_fallback() {
        let remotes = vec![remote("gibson", "13 Gibson Street")];
        assert_eq!(
            find(&remotes, "13 Gibson St, Kingscliff"),
            Some(("gibson".to_string(), MatchKind::SuburbStripped))
        );
        assert_eq!(
            find(&remotes, "13 Gibson Street, Kingscliff Beachside Precinct Estate"),
            Some(("gibson".to_string(), MatchKind::SuburbStripped))
        );
    }

    #[test]
    fn token_prefix_requires_two_tokens_and_length() {
        let remotes = vec![remote("a", "Lot 5 Something Road"), remote("b", "Acreage")];
        assert_eq!(
            find(&remotes, "Lot 5 Something Rd"),
            Some(("a".to_string(), MatchKind::TokenPrefix))
        );
        assert_eq!(find(&remotes, "Acres Uki Road"), None);
        assert_eq!(find(&remotes, "Lot 5 Somewhere Road"), None);
        assert_eq!(find(&remotes, "5 Other Road"), None);
    }

    #[test]
    fn token_prefix_ignores_comma_placement() {
        let remotes = vec![remote("gibson", "13 Gibson Street, Kingscliff NSW")];
        assert_eq!(
            find(&remotes, "13 Gibson Street Kingscliff"),
            Some(("gibson".to_string(), MatchKind::TokenPrefix))
        );
    }

    #[test]
    fn manual_override_wins_when_id_exists() {
        let remotes = vec![
            remote("acquisition-69780ddd01396de0528772d9", "Clara Lane Casuarina Townhouse"),
            remote("other", "1/3 Clara Lane, Casuarina"),
        ];
        assert_eq!(
            find(&remotes, "1/3 Clara Lane, Casuarina"),
            Some((
                "acquisition-69780ddd01396de0528772d9".to_string(),
                MatchKind::Manual
            ))
        );

        let remotes = vec![remote("other", "1/3 Clara Lane, Casuarina")];
        assert_eq!(
            find(&remotes, "1/3 Clara Lane, Casuarina"),
            Some(("other".to_string(), MatchKind::Exact))
        );
    }

    #[test]
    fn empty_titles_never_match() {
        let remotes = vec![remote("blank", "  "), remote("nsw", "NSW 2486")];
        assert_eq!(find(&remotes, "NSW"), None);
        assert_eq!(find(&remotes, "12 Paperbark Court"), None);
    }
}
