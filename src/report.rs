// src/report.rs
//! The token report generator: classifies an already-tokenized sequence and
//! summarises it. No I/O happens here; see `render` for output.

use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::error::{ReportError, Result};
use crate::rules::{ClassificationRules, TokenClass};

/// One token of a tokenized input, in sequence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRecord {
    index: usize,
    token_id: u32,
    token_text: String,
    is_special: bool,
}

impl TokenRecord {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn token_id(&self) -> u32 {
        self.token_id
    }

    pub fn token_text(&self) -> &str {
        &self.token_text
    }

    pub fn is_special(&self) -> bool {
        self.is_special
    }
}

/// Tokenizer output together with the limit declared by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizationResult {
    pub tokens: Vec<TokenRecord>,
    pub max_sequence_length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total_tokens: usize,
    pub regular_token_count: usize,
    pub subword_token_count: usize,
    pub special_token_count: usize,
    pub unique_token_count: usize,
    pub exceeds_max_length: bool,
    pub reconstructed_text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
    rules: ClassificationRules,
}

impl ReportGenerator {
    pub fn new(rules: ClassificationRules) -> Self {
        ReportGenerator { rules }
    }

    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    /// Builds index-numbered records from `(token_id, token_text)` pairs,
    /// flagging special tokens with this generator's rules.
    pub fn records<I, S>(&self, pairs: I) -> Vec<TokenRecord>
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        pairs
            .into_iter()
            .enumerate()
            .map(|(index, (token_id, text))| {
                let token_text: String = text.into();
                let is_special = self.rules.classify(&token_text) == TokenClass::Special;
                TokenRecord {
                    index,
                    token_id,
                    token_text,
                    is_special,
                }
            })
            .collect()
    }

    pub fn tokenization<I, S>(&self, pairs: I, max_sequence_length: usize) -> Result<TokenizationResult>
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        check_max_length(max_sequence_length)?;
        Ok(TokenizationResult {
            tokens: self.records(pairs),
            max_sequence_length,
        })
    }

    /// Classifies every token and computes the summary. `reconstruct` receives
    /// all token ids in order; whether it drops special tokens is up to it.
    ///
    /// A record's `is_special` flag, fixed when the record was built, decides
    /// the special count, so the counts always agree with the flags shown in
    /// the token table even for records built under other rules. Non-special
    /// tokens are split into subword and regular by this generator's prefixes.
    pub fn generate<F>(&self, tokens: &[TokenRecord], max_sequence_length: usize, reconstruct: F) -> Result<ReportSummary>
    where
        F: FnOnce(&[u32]) -> Result<String>,
    {
        check_max_length(max_sequence_length)?;

        let mut summary = ReportSummary {
            total_tokens: tokens.len(),
            ..ReportSummary::default()
        };
        let mut seen: HashSet<&str> = HashSet::with_capacity(tokens.len());

        for token in tokens {
            match self.class_of(token) {
                TokenClass::Special => summary.special_token_count += 1,
                TokenClass::Subword => summary.subword_token_count += 1,
                TokenClass::Regular => summary.regular_token_count += 1,
            }
            seen.insert(token.token_text.as_str());
        }
        summary.unique_token_count = seen.len();
        summary.exceeds_max_length = summary.total_tokens > max_sequence_length;

        let ids: Vec<u32> = tokens.iter().map(|t| t.token_id).collect();
        summary.reconstructed_text = reconstruct(&ids)?;

        debug!(
            "summary: {} tokens ({} regular, {} subword, {} special), {} unique",
            summary.total_tokens,
            summary.regular_token_count,
            summary.subword_token_count,
            summary.special_token_count,
            summary.unique_token_count
        );
        Ok(summary)
    }

    fn class_of(&self, token: &TokenRecord) -> TokenClass {
        if token.is_special {
            TokenClass::Special
        } else if self.rules.is_subword(&token.token_text) {
            TokenClass::Subword
        } else {
            TokenClass::Regular
        }
    }

    pub fn generate_for<F>(&self, result: &TokenizationResult, reconstruct: F) -> Result<ReportSummary>
    where
        F: FnOnce(&[u32]) -> Result<String>,
    {
        self.generate(&result.tokens, result.max_sequence_length, reconstruct)
    }
}

fn check_max_length(max_sequence_length: usize) -> Result<()> {
    if max_sequence_length == 0 {
        return Err(ReportError::InvalidInput(format!(
            "max_sequence_length must be positive, got {}",
            max_sequence_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ClassificationConfig;

    fn join_ids(ids: &[u32]) -> Result<String> {
        Ok(ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(","))
    }

    fn bert_sample(generator: &ReportGenerator) -> Vec<TokenRecord> {
        generator.records(vec![(101, "[CLS]"), (7592, "Hello"), (2088, "##world"), (102, "[SEP]")])
    }

    fn assert_consistent(summary: &ReportSummary) {
        assert_eq!(
            summary.regular_token_count + summary.subword_token_count + summary.special_token_count,
            summary.total_tokens
        );
        assert!(summary.unique_token_count <= summary.total_tokens);
    }

    #[test]
    fn bert_style_sequence() {
        let generator = ReportGenerator::default();
        let tokens = bert_sample(&generator);
        let summary = generator.generate(&tokens, 512, join_ids).unwrap();

        assert_eq!(summary.total_tokens, 4);
        assert_eq!(summary.regular_token_count, 1);
        assert_eq!(summary.subword_token_count, 1);
        assert_eq!(summary.special_token_count, 2);
        assert_eq!(summary.unique_token_count, 4);
        assert!(!summary.exceeds_max_length);
        assert_eq!(summary.reconstructed_text, "101,7592,2088,102");
    }

    #[test]
    fn records_are_numbered_and_flagged() {
        let generator = ReportGenerator::default();
        let tokens = bert_sample(&generator);
        let flags: Vec<(usize, bool)> = tokens.iter().map(|t| (t.index(), t.is_special())).collect();
        assert_eq!(flags, vec![(0, true), (1, false), (2, false), (3, true)]);
        assert_eq!(tokens[2].token_text(), "##world");
        assert_eq!(tokens[2].token_id(), 2088);
    }

    #[test]
    fn empty_sequence() {
        let generator = ReportGenerator::default();
        let mut seen_ids = None;
        let summary = generator
            .generate(&[], 1, |ids| {
                seen_ids = Some(ids.len());
                Ok(String::new())
            })
            .unwrap();

        assert_eq!(seen_ids, Some(0));
        assert_eq!(summary, ReportSummary::default());
    }

    #[test]
    fn overflow_is_strictly_greater() {
        let generator = ReportGenerator::default();
        let tokens = bert_sample(&generator);

        assert!(!generator.generate(&tokens, 4, join_ids).unwrap().exceeds_max_length);
        assert!(generator.generate(&tokens, 3, join_ids).unwrap().exceeds_max_length);
    }

    #[test]
    fn zero_max_length_is_invalid() {
        let generator = ReportGenerator::default();
        let err = generator.generate(&[], 0, join_ids).unwrap_err();
        assert!(matches!(err, ReportError::InvalidInput(_)));
        assert!(err.to_string().contains('0'));

        assert!(generator.tokenization(vec![(1u32, "a")], 0).is_err());
    }

    #[test]
    fn duplicates_reduce_unique_count() {
        let generator = ReportGenerator::default();
        let tokens = generator.records(vec![(1, "the"), (2, "The"), (1, "the"), (3, "##s"), (3, "##s")]);
        let summary = generator.generate(&tokens, 512, join_ids).unwrap();

        assert_eq!(summary.unique_token_count, 3);
        assert_eq!(summary.regular_token_count, 3);
        assert_eq!(summary.subword_token_count, 2);
        assert_consistent(&summary);
    }

    #[test]
    fn generate_is_deterministic() {
        let generator = ReportGenerator::default();
        let tokens = generator.records(vec![(0, "<s>"), (5, "\u{2581}Hi"), (6, "there"), (1, "</s>"), (0, "<pad>")]);
        let first = generator.generate(&tokens, 3, join_ids).unwrap();
        let second = generator.generate(&tokens, 3, join_ids).unwrap();
        assert_eq!(first, second);
        assert_consistent(&first);
    }

    #[test]
    fn reconstruction_error_propagates() {
        let generator = ReportGenerator::default();
        let tokens = bert_sample(&generator);
        let err = generator
            .generate(&tokens, 512, |_| Err(ReportError::external("decode", "id out of vocabulary")))
            .unwrap_err();
        assert!(matches!(err, ReportError::ExternalTooling { .. }));
    }

    #[test]
    fn custom_rules_change_classification() {
        let config = ClassificationConfig {
            special_tokens: vec!["<|endoftext|>".to_string()],
            special_patterns: Vec::new(),
            subword_prefixes: Vec::new(),
        };
        let generator = ReportGenerator::new(ClassificationRules::new(&config).unwrap());
        let tokens = generator.records(vec![(10, "##a"), (50256, "<|endoftext|>"), (11, "[CLS]")]);
        let summary = generator.generate(&tokens, 1024, join_ids).unwrap();

        assert_eq!(summary.special_token_count, 1);
        assert_eq!(summary.subword_token_count, 0);
        assert_eq!(summary.regular_token_count, 2);
    }

    #[test]
    fn counts_follow_record_flags_across_generators() {
        let gpt_rules = ClassificationConfig {
            special_tokens: vec!["<|endoftext|>".to_string()],
            special_patterns: Vec::new(),
            subword_prefixes: vec!["##".to_string()],
        };
        let builder = ReportGenerator::new(ClassificationRules::new(&gpt_rules).unwrap());
        let tokens = builder.records(vec![(50256, "<|endoftext|>"), (1, "[CLS]"), (2, "##ing")]);

        let summary = ReportGenerator::default().generate(&tokens, 512, join_ids).unwrap();
        let flagged = tokens.iter().filter(|t| t.is_special()).count();

        assert_eq!(flagged, 1);
        assert_eq!(summary.special_token_count, flagged);
        assert_eq!(summary.subword_token_count, 1);
        assert_eq!(summary.regular_token_count, 1);
        assert_consistent(&summary);
    }

    #[test]
    fn summary_serializes_all_fields() {
        let generator = ReportGenerator::default();
        let tokens = bert_sample(&generator);
        let summary = generator.generate(&tokens, 512, |_| Ok("hello world".to_string())).unwrap();
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["total_tokens"], 4);
        assert_eq!(json["exceeds_max_length"], false);
        assert_eq!(json["reconstructed_text"], "hello world");
    }
}
