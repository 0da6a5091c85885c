// src/main.rs
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use token_report::error::read_input;
use token_report::tokenizer::DEFAULT_MODEL;
use token_report::{
    render, render_json, ClassificationConfig, ClassificationRules, PretrainedTokenizer, RenderOptions, Report,
    ReportGenerator, TokenizerCapability,
};

/// Tokenize a file with a pretrained tokenizer and report how it was split.
#[derive(Parser, Debug)]
#[command(name = "token-report", version)]
struct Args {
    /// Text file to tokenize.
    file: PathBuf,

    /// Hugging Face Hub model whose tokenizer is fetched (and cached).
    #[arg(short, long, value_name = "ID", default_value = DEFAULT_MODEL)]
    model: String,

    /// Local tokenizer.json, or a model directory containing one. Used
    /// instead of `--model` for offline runs.
    #[arg(short, long, value_name = "PATH")]
    tokenizer: Option<PathBuf>,

    /// Name shown in the report header. Defaults to the model id or the
    /// local model directory name.
    #[arg(long)]
    model_name: Option<String>,

    /// Override the model's maximum sequence length.
    #[arg(long, value_name = "N")]
    max_length: Option<usize>,

    /// JSON file with `special_tokens`, `special_patterns` and `subword_prefixes`.
    #[arg(long, value_name = "RULES.json")]
    rules: Option<PathBuf>,

    /// Special-token marker; repeat to list several. Replaces the default set.
    #[arg(long = "special", value_name = "TOKEN")]
    special_tokens: Vec<String>,

    /// Regex a whole token must match to count as special; repeatable.
    #[arg(long = "special-pattern", value_name = "REGEX")]
    special_patterns: Vec<String>,

    /// Subword continuation prefix; repeat to list several. Replaces the defaults.
    #[arg(long = "subword-prefix", value_name = "PREFIX")]
    subword_prefixes: Vec<String>,

    /// Show at most N characters (grapheme clusters) of the decoded text.
    #[arg(long, value_name = "N")]
    preview_chars: Option<usize>,

    /// List at most N tokens in the token table.
    #[arg(long, value_name = "N")]
    max_rows: Option<usize>,

    /// Print the summary and token list as JSON instead of the text report.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn classification_config(&self) -> Result<ClassificationConfig> {
        let mut config = match &self.rules {
            Some(path) => ClassificationConfig::from_json_file(path)?,
            None => ClassificationConfig::default(),
        };
        if !self.special_tokens.is_empty() {
            config.special_tokens = self.special_tokens.clone();
        }
        config.special_patterns.extend(self.special_patterns.iter().cloned());
        if !self.subword_prefixes.is_empty() {
            config.subword_prefixes = self.subword_prefixes.clone();
        }
        Ok(config)
    }

    fn load_tokenizer(&self) -> Result<PretrainedTokenizer> {
        let tokenizer = match &self.tokenizer {
            Some(path) => PretrainedTokenizer::from_path(path, self.model_name.clone(), self.max_length)?,
            None => PretrainedTokenizer::from_pretrained(&self.model, self.model_name.clone(), self.max_length)?,
        };
        Ok(tokenizer)
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            preview_chars: self.preview_chars,
            max_rows: self.max_rows,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let rules_init_start = Instant::now();
    let config = args.classification_config()?;
    let generator = ReportGenerator::new(ClassificationRules::new(&config)?);
    info!("classification rules initialized (took {:?})", rules_init_start.elapsed());

    let tokenizer = args.load_tokenizer()?;
    info!(
        "tokenizer '{}' ready: vocab size {}, max length {}",
        tokenizer.name(),
        tokenizer.vocab_size(),
        tokenizer.max_sequence_length()
    );

    let content = read_input(&args.file)?;
    if content.trim().is_empty() {
        warn!("{} contains no text; only special tokens will be reported", args.file.display());
    }

    let tokenize_start = Instant::now();
    let pairs = tokenizer.encode(&content)?;
    info!("tokenized {} into {} tokens (took {:?})", args.file.display(), pairs.len(), tokenize_start.elapsed());

    let result = generator.tokenization(pairs, tokenizer.max_sequence_length())?;
    let summary = generator.generate_for(&result, |ids| tokenizer.decode(ids))?;

    let report = Report {
        model_name: tokenizer.name(),
        max_sequence_length: result.max_sequence_length,
        subword_prefixes: generator.rules().subword_prefixes(),
        summary: &summary,
        tokens: &result.tokens,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        render_json(&mut out, &report).context("writing JSON report")?;
    } else {
        render(&mut out, &report, &args.render_options()).context("writing report")?;
    }
    out.flush().context("flushing report")?;
    Ok(())
}
