//! Maps a free-form spoken phrase to at most one catalog entry.
//!
//! Stages run strictly in order and the first hit wins. The deterministic
//! stages go from most to least precise; the oracle is only consulted when
//! all of them come up empty.

use crate::aliases::{is_important, SYNONYMS};
use crate::catalog::Catalog;
use crate::config::{MatchConfig, OracleConfig};
use crate::model::{CatalogEntry, MatchResult, MatchStage};
use crate::oracle::{self, Oracle};
use log::{debug, info};
use regex::Regex;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// Leading command verbs, tried in order. The capture is the application part.
static COMMAND_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?:je veux que tu|je voudrais que tu)\s+(?:ouvres?|lances?|démarres?)\s+(.+)",
        r"\b(?:ouvre|ouvrir|lance|lancer|démarre|démarrer|exécute|exécuter)\s+(?:l'application\s+)?(.+)",
        r"\b(?:je veux|j'aimerais|besoin de)\s+(?:regarder|voir|écouter|utiliser)\s+(?:(?:un|une|le|la|des)\s+)?(.+)",
        r"(.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static STOP_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:l'application|application|les|le|la|une|un|de|pour|à)\b").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Function words too common to ever be an application name.
const EXCLUDED_WORDS: &[&str] = &["de", "le", "la", "un", "une", "me", "ai", "et", "ou", "du"];

fn strip_stop_words(text: &str) -> String {
    let stripped = STOP_WORDS.replace_all(text, " ");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// Extracts the application part of a command phrase.
pub fn clean_phrase(phrase: &str) -> String {
    for pattern in COMMAND_PATTERNS.iter() {
        let Some(captures) = pattern.captures(phrase) else {
            continue;
        };
        let cleaned = strip_stop_words(&captures[1]);
        if cleaned.chars().count() >= 3 {
            return cleaned;
        }
    }
    phrase.to_string()
}

fn alphanumeric(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

/// One string contains the other after dropping non-alphanumerics, both are
/// longer than `min_len`, and they differ by at most half the longer length.
pub fn length_bounded_contains(a: &str, b: &str, min_len: usize) -> bool {
    let (a, b) = (alphanumeric(a), alphanumeric(b));
    let (la, lb) = (a.chars().count(), b.chars().count());
    if la <= min_len || lb <= min_len {
        return false;
    }
    (a.contains(&b) || b.contains(&a)) && la.abs_diff(lb) <= la.max(lb) / 2
}

struct Query {
    /// Lowercase-trimmed phrase.
    raw: String,
    /// `raw` without command verb and stop words.
    cleaned: String,
}

impl Query {
    fn new(phrase: &str) -> Self {
        let raw = phrase.trim().to_lowercase().replace('\u{2019}', "'");
        let cleaned = clean_phrase(&raw);
        Self { raw, cleaned }
    }
}

type Stage<'a> = fn(&Resolver<'a>, &Query) -> Option<&'a CatalogEntry>;

pub struct Resolver<'a> {
    catalog: &'a Catalog,
    matching: &'a MatchConfig,
    oracle: Option<&'a dyn Oracle>,
    oracle_config: &'a OracleConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(
        catalog: &'a Catalog,
        matching: &'a MatchConfig,
        oracle: Option<&'a dyn Oracle>,
        oracle_config: &'a OracleConfig,
    ) -> Self {
        Self {
            catalog,
            matching,
            oracle,
            oracle_config,
        }
    }

    pub fn resolve(&self, phrase: &str) -> MatchResult<'a> {
        self.run(phrase, Duration::from_secs(self.oracle_config.timeout_secs))
    }

    /// Like `resolve`, but the oracle call never outlives `deadline` and is
    /// skipped once it has passed.
    pub fn resolve_before(&self, phrase: &str, deadline: Instant) -> MatchResult<'a> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.run(phrase, remaining.min(Duration::from_secs(self.oracle_config.timeout_secs)))
    }

    fn run(&self, phrase: &str, oracle_budget: Duration) -> MatchResult<'a> {
        let query = Query::new(phrase);
        if query.raw.is_empty() {
            return MatchResult::NoMatch;
        }
        debug!("Resolving {:?} (cleaned {:?})", query.raw, query.cleaned);

        let stages: [(MatchStage, Stage<'a>); 5] = [
            (MatchStage::ExactAlias, Self::exact_alias),
            (MatchStage::Substring { synonym: false }, Self::alias_substring),
            (MatchStage::Substring { synonym: true }, Self::synonym_keyword),
            (MatchStage::TokenFuzzy, Self::token_fuzzy),
            (MatchStage::LengthFuzzy, Self::length_fuzzy),
        ];
        for (stage, matches) in stages {
            if let Some(entry) = matches(self, &query) {
                info!("{:?} -> {} via {}", query.raw, entry.key, stage);
                return MatchResult::Found { entry, stage };
            }
        }

        self.ask_oracle(&query, oracle_budget)
    }

    /// Ties go to the smallest key since the catalog iterates in key order.
    fn exact_alias(&self, query: &Query) -> Option<&'a CatalogEntry> {
        self.catalog.iter().find(|e| e.aliases.contains(query.raw.as_str()))
    }

    fn alias_substring(&self, query: &Query) -> Option<&'a CatalogEntry> {
        let cleaned = query.cleaned.as_str();
        if cleaned.chars().count() <= self.matching.substring_min_len || EXCLUDED_WORDS.contains(&cleaned) {
            return None;
        }
        self.catalog.iter().find(|e| {
            e.aliases
                .iter()
                .any(|alias| cleaned.contains(alias.as_str()) || alias.contains(cleaned))
        })
    }

    fn synonym_keyword(&self, query: &Query) -> Option<&'a CatalogEntry> {
        let cleaned = query.cleaned.as_str();
        for group in SYNONYMS {
            for keyword in group.keywords {
                let hit = cleaned.contains(keyword) || (cleaned.chars().count() >= 3 && keyword.contains(cleaned));
                if !hit {
                    continue;
                }

                let mut exact = Vec::new();
                let mut partial = Vec::new();
                for entry in self.catalog.iter() {
                    let key = entry.key.as_str();
                    if key == *keyword || key.split_whitespace().any(|w| w == *keyword) || key.contains(group.pattern) {
                        exact.push(entry);
                    } else if key.contains(keyword) || entry.display_name.to_lowercase().contains(keyword) {
                        partial.push(entry);
                    }
                }

                let best = if exact.is_empty() { partial } else { exact };
                let chosen = best.iter().find(|e| is_important(&e.key)).or(best.first());
                if let Some(entry) = chosen {
                    debug!("Synonym {:?} selected {}", keyword, entry.key);
                    return Some(*entry);
                }
            }
        }
        None
    }

    fn token_fuzzy(&self, query: &Query) -> Option<&'a CatalogEntry> {
        let cleaned = query.cleaned.as_str();
        let len = cleaned.chars().count();
        if len <= self.matching.fuzzy_min_len {
            return None;
        }
        self.catalog.iter().find(|e| {
            e.display_name.to_lowercase().split_whitespace().any(|word| {
                let word_len = word.chars().count();
                word_len > self.matching.word_min_len
                    && (cleaned.contains(word) || word.contains(cleaned))
                    && len.abs_diff(word_len) <= self.matching.word_len_slack
            })
        })
    }

    fn length_fuzzy(&self, query: &Query) -> Option<&'a CatalogEntry> {
        self.catalog
            .iter()
            .find(|e| length_bounded_contains(&query.cleaned, &e.display_name, self.matching.fuzzy_min_len))
    }

    fn ask_oracle(&self, query: &Query, budget: Duration) -> MatchResult<'a> {
        let Some(oracle) = self.oracle else {
            return MatchResult::NoMatch;
        };
        if budget.is_zero() {
            debug!("Deadline passed, skipping oracle for {:?}", query.raw);
            return MatchResult::NoMatch;
        }
        match oracle::consult(oracle, &query.raw, self.catalog, self.oracle_config, self.matching.fuzzy_min_len, budget) {
            Some(entry) => {
                info!("{:?} -> {} via {}", query.raw, entry.key, MatchStage::Oracle);
                MatchResult::Found {
                    entry,
                    stage: MatchStage::Oracle,
                }
            }
            None => MatchResult::NoMatch,
        }
    }
}
