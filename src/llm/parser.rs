//! Response parsing for LLM outputs.
//!
//! Chat models rarely return bare SQL: they wrap it in markdown fences,
//! preface it with pleasantries, or emit a completion-style fragment.
//! `extract_sql` turns all of that into a clean single statement, or
//! nothing when the response contains no SQL at all.

use regex::Regex;
use std::sync::OnceLock;

/// Extracts a clean SQL statement from an LLM response.
///
/// Resolution order:
/// 1. A ```sql fenced block (first one wins).
/// 2. A generic ``` fenced block.
/// 3. The raw text with leading chat boilerplate stripped.
///
/// The candidate must start with (or contain) SELECT or WITH; responses
/// with no recognizable SQL yield `None`.
pub fn extract_sql(response: &str) -> Option<String> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(block) = extract_code_block(trimmed, "sql") {
        return normalize(&block);
    }
    if let Some(block) = extract_code_block(trimmed, "") {
        return normalize(&block);
    }

    normalize(&strip_boilerplate(trimmed))
}

/// Extracts content from a markdown code block with the specified language.
///
/// Pass an empty string for `lang` to match blocks without a language
/// specifier. A missing closing fence takes the rest of the text: truncated
/// responses are common and the candidate still gets validated downstream.
fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let start_pattern = format!("```{}", lang);
    let start_idx = text.find(&start_pattern)?;

    let after_fence = start_idx + start_pattern.len();
    let newline = text[after_fence..].find('\n')?;

    // For generic blocks, text between ``` and the newline is a language
    // specifier; don't treat ```python as a generic block.
    if lang.is_empty() && !text[after_fence..after_fence + newline].trim().is_empty() {
        return None;
    }

    let content_start = after_fence + newline + 1;
    match text[content_start..].find("```") {
        Some(end) => Some(text[content_start..content_start + end].to_string()),
        None => Some(text[content_start..].to_string()),
    }
}

/// Strips leading chat boilerplate ("Here is the SQL query:", "Sure, ...:").
fn strip_boilerplate(text: &str) -> String {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let re = PREFIX.get_or_init(|| {
        Regex::new(r"(?is)^(here is|here's|sure|certainly|the query is|based on the schema)[^:\n]*:\s*")
            .expect("boilerplate regex is valid")
    });
    re.replace(text, "").to_string()
}

/// Trims a candidate and anchors it at the first SELECT or WITH.
fn normalize(candidate: &str) -> Option<String> {
    let candidate = candidate.trim().trim_end_matches("```").trim();
    if candidate.is_empty() {
        return None;
    }

    let upper = candidate.to_uppercase();
    if upper.starts_with("SELECT") || upper.starts_with("WITH") {
        return Some(candidate.to_string());
    }

    // Chat models sometimes bury the statement mid-sentence; anchor on the
    // first SELECT if there is one.
    upper
        .find("SELECT")
        .map(|idx| candidate[idx..].trim().to_string())
}
