// src/tokenizer.rs
//! The tokenizer capability the report consumes, and its implementation on
//! top of a pretrained Hugging Face tokenizer, loaded from a local
//! `tokenizer.json` or fetched from the Hub by model id.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, warn};
use serde::Deserialize;
use tokenizers::Tokenizer;

use crate::error::{ReportError, Result};

pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 512;

pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

// HF writes 1e30 into tokenizer_config.json when a model declares no limit.
const UNBOUNDED_SENTINEL: f64 = 1e9;

/// What the report needs from a tokenizer. Segmentation itself happens behind
/// this trait.
pub trait TokenizerCapability {
    /// Model identification shown in the report header.
    fn name(&self) -> &str;

    /// Splits `text` into ordered `(token_id, token_text)` pairs, including the
    /// model's special tokens and without truncation.
    fn encode(&self, text: &str) -> Result<Vec<(u32, String)>>;

    /// Turns ids back into text, dropping special tokens.
    fn decode(&self, ids: &[u32]) -> Result<String>;

    fn max_sequence_length(&self) -> usize;
}

#[derive(Debug, Deserialize)]
struct TokenizerConfigFile {
    #[serde(default)]
    model_max_length: Option<f64>,
}

pub struct PretrainedTokenizer {
    name: String,
    inner: Tokenizer,
    max_sequence_length: usize,
}

impl PretrainedTokenizer {
    /// Loads `tokenizer.json` from `path`, which may be the file itself or the
    /// model directory holding it. `max_length_override` wins over anything
    /// found on disk.
    pub fn from_path(path: impl AsRef<Path>, name: Option<String>, max_length_override: Option<usize>) -> Result<Self> {
        check_override(max_length_override)?;
        let load_start = Instant::now();
        let file = resolve_tokenizer_file(path.as_ref());

        let inner = Tokenizer::from_file(&file)
            .map_err(|e| ReportError::external(format!("cannot load tokenizer '{}'", file.display()), e))?;

        let name = name.unwrap_or_else(|| default_model_name(&file));
        let declared = max_length_override.or_else(|| config_max_length(&file));
        let tokenizer = Self::prepare(inner, name, declared)?;
        debug!(
            "loaded tokenizer '{}' from {} (max length {}, took {:?})",
            tokenizer.name,
            file.display(),
            tokenizer.max_sequence_length,
            load_start.elapsed()
        );
        Ok(tokenizer)
    }

    /// Fetches the tokenizer of a Hugging Face Hub model, e.g.
    /// `sentence-transformers/all-MiniLM-L6-v2`. Downloads are cached by the
    /// `tokenizers` crate; network and lookup failures come back unchanged as
    /// [`ReportError::ExternalTooling`].
    pub fn from_pretrained(identifier: &str, name: Option<String>, max_length_override: Option<usize>) -> Result<Self> {
        check_override(max_length_override)?;
        let load_start = Instant::now();

        let inner = Tokenizer::from_pretrained(identifier, None)
            .map_err(|e| ReportError::external(format!("cannot fetch tokenizer for model '{}'", identifier), e))?;

        let name = name.unwrap_or_else(|| identifier.to_string());
        let tokenizer = Self::prepare(inner, name, max_length_override)?;
        debug!(
            "fetched tokenizer '{}' (max length {}, took {:?})",
            identifier,
            tokenizer.max_sequence_length,
            load_start.elapsed()
        );
        Ok(tokenizer)
    }

    /// Resolves the length limit and switches truncation and padding off so
    /// the full input is counted; the report only warns about overflow.
    fn prepare(mut inner: Tokenizer, name: String, declared_max_length: Option<usize>) -> Result<Self> {
        let truncation_length = inner.get_truncation().map(|t| t.max_length);
        let max_sequence_length = declared_max_length
            .or(truncation_length)
            .unwrap_or(DEFAULT_MAX_SEQUENCE_LENGTH);

        inner
            .with_truncation(None)
            .map_err(|e| ReportError::external("cannot disable truncation", e))?;
        inner.with_padding(None);

        Ok(PretrainedTokenizer {
            name,
            inner,
            max_sequence_length,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl TokenizerCapability for PretrainedTokenizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, text: &str) -> Result<Vec<(u32, String)>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| ReportError::external(format!("tokenizer '{}' failed to encode input", self.name), e))?;
        Ok(encoding
            .get_ids()
            .iter()
            .copied()
            .zip(encoding.get_tokens().iter().cloned())
            .collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| ReportError::external(format!("tokenizer '{}' failed to decode ids", self.name), e))
    }

    fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }
}

fn check_override(max_length_override: Option<usize>) -> Result<()> {
    if max_length_override == Some(0) {
        return Err(ReportError::InvalidInput(
            "max sequence length override must be positive, got 0".to_string(),
        ));
    }
    Ok(())
}

fn resolve_tokenizer_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join("tokenizer.json")
    } else {
        path.to_path_buf()
    }
}

/// Names a model after the directory its tokenizer lives in, falling back to
/// the file name.
fn default_model_name(file: &Path) -> String {
    file.parent()
        .and_then(|dir| dir.file_name())
        .or_else(|| file.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

/// Reads `model_max_length` from a `tokenizer_config.json` next to the
/// tokenizer file. Absent, unreadable or unbounded values yield `None`.
fn config_max_length(tokenizer_file: &Path) -> Option<usize> {
    let config_path = tokenizer_file.with_file_name("tokenizer_config.json");
    let raw = std::fs::read_to_string(&config_path).ok()?;
    let parsed: TokenizerConfigFile = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("ignoring unreadable {}: {}", config_path.display(), e);
            return None;
        }
    };
    match parsed.model_max_length {
        Some(n) if n >= 1.0 && n < UNBOUNDED_SENTINEL => Some(n as usize),
        Some(n) => {
            debug!("{} declares model_max_length {}, treating as unbounded", config_path.display(), n);
            None
        }
        None => None,
    }
}
