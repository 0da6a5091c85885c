// src/render.rs
//! Writes a generated report as human-readable text or JSON.

use std::io::{self, Write};

use serde::Serialize;
use unicode_general_category::{get_general_category, GeneralCategory};
use unicode_segmentation::UnicodeSegmentation;

use crate::report::{ReportSummary, TokenRecord};

const RULE_WIDTH: usize = 80;

/// Everything `render` prints. Borrowed, so rendering never copies the token list.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Report<'a> {
    pub model_name: &'a str,
    pub max_sequence_length: usize,
    #[serde(skip)]
    pub subword_prefixes: &'a [String],
    #[serde(flatten)]
    pub summary: &'a ReportSummary,
    pub tokens: &'a [TokenRecord],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Grapheme clusters of reconstructed text to show; `None` shows all of it.
    pub preview_chars: Option<usize>,
    /// Rows of the token table to show; `None` lists every token.
    pub max_rows: Option<usize>,
}

pub fn render<W: Write>(out: &mut W, report: &Report<'_>, options: &RenderOptions) -> io::Result<()> {
    let summary = report.summary;
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    writeln!(out, "{}", heavy)?;
    writeln!(out, "MODEL: {}", report.model_name)?;
    writeln!(out, "{}", heavy)?;

    writeln!(out, "\n{}", heavy)?;
    writeln!(out, "TOKENIZATION DETAILS")?;
    writeln!(out, "{}", heavy)?;
    writeln!(out, "\nTotal token count: {}", summary.total_tokens)?;
    writeln!(out, "Token IDs count: {}", report.tokens.len())?;
    writeln!(out, "Model max length: {}", report.max_sequence_length)?;

    if summary.exceeds_max_length {
        writeln!(out, "\nWARNING: Content exceeds model max length!")?;
        writeln!(
            out,
            "   Tokens will be truncated from {} to {}",
            summary.total_tokens, report.max_sequence_length
        )?;
    }

    writeln!(out, "\n{}", light)?;
    writeln!(out, "TOKEN LIST (showing how text is split into subwords)")?;
    writeln!(out, "{}", light)?;
    writeln!(out, "\n{:<8} {:<12} {:<30}", "Index", "Token ID", "Token")?;
    writeln!(out, "{}", "-".repeat(50))?;

    let shown = options.max_rows.unwrap_or(report.tokens.len()).min(report.tokens.len());
    for token in &report.tokens[..shown] {
        let text = display_token(token.token_text());
        if token.is_special() {
            writeln!(out, "{:<8} {:<12} {:<30} [SPECIAL]", token.index(), token.token_id(), text)?;
        } else {
            writeln!(out, "{:<8} {:<12} {}", token.index(), token.token_id(), text)?;
        }
    }
    if shown < report.tokens.len() {
        writeln!(out, "... {} more tokens", report.tokens.len() - shown)?;
    }

    writeln!(out, "\n{}", heavy)?;
    writeln!(out, "TOKEN ANALYSIS")?;
    writeln!(out, "{}", heavy)?;
    writeln!(out, "\nToken Statistics:")?;
    writeln!(out, "   - Total tokens: {}", summary.total_tokens)?;
    writeln!(out, "   - Regular tokens: {}", summary.regular_token_count)?;
    writeln!(
        out,
        "   - Subword tokens ({}): {}",
        describe_prefixes(report.subword_prefixes),
        summary.subword_token_count
    )?;
    writeln!(out, "   - Special tokens: {}", summary.special_token_count)?;
    writeln!(out, "   - Unique tokens: {}", summary.unique_token_count)?;

    writeln!(out, "\n{}", light)?;
    writeln!(out, "DECODED TEXT (reconstructed from tokens)")?;
    writeln!(out, "{}", light)?;
    let (preview, truncated) = preview(&summary.reconstructed_text, options.preview_chars);
    if truncated {
        writeln!(out, "\n{}...", preview)?;
    } else {
        writeln!(out, "\n{}", preview)?;
    }

    writeln!(out, "\n{}", heavy)?;
    writeln!(out, "SUMMARY")?;
    writeln!(out, "{}", heavy)?;
    writeln!(out, "Total tokens: {}", summary.total_tokens)?;
    writeln!(out, "Unique tokens: {}", summary.unique_token_count)?;
    writeln!(out, "Model max length: {}", report.max_sequence_length)?;
    Ok(())
}

pub fn render_json<W: Write>(out: &mut W, report: &Report<'_>) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}

/// First `limit` grapheme clusters of `text`, and whether anything was cut.
pub fn preview(text: &str, limit: Option<usize>) -> (&str, bool) {
    let Some(limit) = limit else {
        return (text, false);
    };
    match text.grapheme_indices(true).nth(limit) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Makes a token printable on one table row: line breaks, tabs, control and
/// format characters, and non-ASCII separators are escaped.
pub fn display_token(text: &str) -> String {
    let mut shown = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => shown.push_str("\\n"),
            '\r' => shown.push_str("\\r"),
            '\t' => shown.push_str("\\t"),
            c if needs_escape(c) => shown.extend(c.escape_unicode()),
            c => shown.push(c),
        }
    }
    shown
}

fn needs_escape(c: char) -> bool {
    match get_general_category(c) {
        GeneralCategory::Control
        | GeneralCategory::Format
        | GeneralCategory::LineSeparator
        | GeneralCategory::ParagraphSeparator => true,
        GeneralCategory::SpaceSeparator => c != ' ',
        _ => false,
    }
}

fn describe_prefixes(prefixes: &[String]) -> String {
    if prefixes.is_empty() {
        return "no prefix configured".to_string();
    }
    let quoted: Vec<String> = prefixes.iter().map(|p| format!("{} prefix", p)).collect();
    quoted.join(" or ")
}
