// src/rules.rs
//! Token classification rules: which token texts are special markers and
//! which are subword continuations.

use std::collections::HashSet;
use std::path::Path;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, Anchored, Input, MatchKind, StartKind};
use fancy_regex::Regex;
use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

// ----- DEFAULTS -----
pub static DEFAULT_SPECIAL_TOKENS: &[&str] = &["[CLS]", "[SEP]", "[PAD]", "[UNK]", "<s>", "</s>", "<pad>"];

/// `##` is the WordPiece continuation marker, `▁` the SentencePiece word marker.
pub static DEFAULT_SUBWORD_PREFIXES: &[&str] = &["##", "\u{2581}"];

lazy_static! {
    static ref DEFAULT_RULES: ClassificationRules = ClassificationRules::new(&ClassificationConfig::default())
        .unwrap_or_else(|e| panic!("default classification rules are invalid: {}", e));
}

/// Classification of a single token. Rules are applied in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Special,
    Subword,
    Regular,
}

/// Plain-data rule configuration, as passed on the command line or read from a
/// JSON rules file. Missing fields fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationConfig {
    pub special_tokens: Vec<String>,
    /// Regexes that must match a whole token text, e.g. `\[unused\d+\]`.
    pub special_patterns: Vec<String>,
    pub subword_prefixes: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        ClassificationConfig {
            special_tokens: DEFAULT_SPECIAL_TOKENS.iter().map(|s| s.to_string()).collect(),
            special_patterns: Vec::new(),
            subword_prefixes: DEFAULT_SUBWORD_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ClassificationConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = crate::error::read_input(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            ReportError::ClassificationConfig(format!("invalid rules file '{}': {}", path.display(), e))
        })
    }
}

/// Compiled form of [`ClassificationConfig`].
#[derive(Debug, Clone)]
pub struct ClassificationRules {
    special_tokens: HashSet<String>,
    special_patterns: Vec<Regex>,
    subword_prefixes: Vec<String>,
    prefix_matcher: Option<AhoCorasick>,
}

impl ClassificationRules {
    pub fn new(config: &ClassificationConfig) -> Result<Self> {
        let special_tokens: HashSet<String> = config.special_tokens.iter().cloned().collect();

        let special_patterns = config
            .special_patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{})$", p)).map_err(|e| {
                    ReportError::ClassificationConfig(format!("invalid special-token pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // An empty prefix would swallow every non-special token.
        let mut subword_prefixes: Vec<String> = Vec::new();
        for prefix in config.subword_prefixes.iter().filter(|p| !p.is_empty()) {
            if !subword_prefixes.contains(prefix) {
                subword_prefixes.push(prefix.clone());
            }
        }

        if special_tokens.is_empty() && special_patterns.is_empty() && subword_prefixes.is_empty() {
            return Err(ReportError::ClassificationConfig(
                "special-token set and subword prefixes are both empty; tokens cannot be classified".to_string(),
            ));
        }

        let prefix_matcher = if subword_prefixes.is_empty() {
            None
        } else {
            Some(
                AhoCorasickBuilder::new()
                    .match_kind(MatchKind::LeftmostFirst)
                    .start_kind(StartKind::Anchored)
                    .build(&subword_prefixes)
                    .map_err(|e| {
                        ReportError::ClassificationConfig(format!(
                            "cannot build prefix matcher for {:?}: {}",
                            subword_prefixes, e
                        ))
                    })?,
            )
        };

        debug!(
            "classification rules: {} special tokens, {} special patterns, subword prefixes {:?}",
            special_tokens.len(),
            special_patterns.len(),
            subword_prefixes
        );

        Ok(ClassificationRules {
            special_tokens,
            special_patterns,
            subword_prefixes,
            prefix_matcher,
        })
    }

    pub fn classify(&self, token_text: &str) -> TokenClass {
        if self.is_special(token_text) {
            TokenClass::Special
        } else if self.is_subword(token_text) {
            TokenClass::Subword
        } else {
            TokenClass::Regular
        }
    }

    pub fn subword_prefixes(&self) -> &[String] {
        &self.subword_prefixes
    }

    pub fn is_special(&self, token_text: &str) -> bool {
        if self.special_tokens.contains(token_text) {
            return true;
        }
        self.special_patterns.iter().any(|re| match re.find(token_text) {
            Ok(Some(mat)) => mat.start() == 0 && mat.end() == token_text.len(),
            _ => false,
        })
    }

    pub fn is_subword(&self, token_text: &str) -> bool {
        match &self.prefix_matcher {
            Some(matcher) => matcher.find(Input::new(token_text).anchored(Anchored::Yes)).is_some(),
            None => false,
        }
    }
}

impl Default for ClassificationRules {
    fn default() -> Self {
        DEFAULT_RULES.clone()
    }
}
