// src/lib.rs
//! Token statistics for text run through a pretrained subword tokenizer.
//!
//! Tokenization is delegated to a [`tokenizer::TokenizerCapability`]; this
//! crate classifies the resulting tokens ([`rules`]), summarises them
//! ([`report`]) and prints the result ([`render`]).

pub mod error;
pub mod render;
pub mod report;
pub mod rules;
pub mod tokenizer;

pub use error::{ReportError, Result};
pub use render::{render, render_json, RenderOptions, Report};
pub use report::{ReportGenerator, ReportSummary, TokenRecord, TokenizationResult};
pub use rules::{ClassificationConfig, ClassificationRules, TokenClass};
pub use tokenizer::{PretrainedTokenizer, TokenizerCapability};
