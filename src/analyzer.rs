//! Text analysis via a local language model.
//!
//! Defines the [`Analyzer`] trait and its Ollama implementation, the fixed
//! analysis prompt, and the parser that turns a model reply into an
//! [`AnalysisOutcome`].
//!
//! # Reply parsing
//!
//! Models are asked for a JSON object with `summary`, `persons` and
//! `category` keys, and Ollama is asked to constrain output to JSON. Replies
//! still drift, so [`parse_reply`] accepts, in order:
//!
//! 1. a JSON object, bare or embedded in surrounding prose or a code fence;
//! 2. free text with `Summary:` / `Persons:` / `Category:` headings.
//!
//! A reply matching neither is [`AnalyzeError::MalformedReply`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::OllamaConfig;
use crate::models::{AnalysisOutcome, Category};

/// Failures of a single analysis request.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("text must not be empty")]
    EmptyInput,
    #[error("text is too long (max {max} characters)")]
    InputTooLong { max: usize },
    #[error("model server unreachable: {0}")]
    Unreachable(String),
    #[error("model server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not parse model reply: {0}")]
    MalformedReply(String),
    #[error("failed to store analysis: {0}")]
    Storage(String),
}

impl AnalyzeError {
    /// True for errors caused by the submitted text rather than the model or storage.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AnalyzeError::EmptyInput | AnalyzeError::InputTooLong { .. }
        )
    }

    /// True for errors caused by the model server or its reply.
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            AnalyzeError::Unreachable(_)
                | AnalyzeError::Status { .. }
                | AnalyzeError::MalformedReply(_)
        )
    }
}

/// Something that can turn a text into an [`AnalysisOutcome`].
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Model identifier, shown in `/health` and logs.
    fn model_name(&self) -> &str;

    async fn analyze(&self, text: &str) -> Result<AnalysisOutcome, AnalyzeError>;
}

/// Build the fixed analysis prompt around `text`.
pub fn build_prompt(text: &str) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "Analyze the following article and provide:\n\
         1. A concise summary (2-3 sentences)\n\
         2. All person names mentioned (comma-separated)\n\
         3. The most relevant category ({})\n\
         \n\
         Return your response as a valid JSON object with these keys: \"summary\", \"persons\", \"category\"\n\
         \n\
         Article:\n\
         {}\n\
         \n\
         Response:",
        categories.join(", "),
        text
    )
}

/// Placeholder outcome stored when the model fails and fallback is enabled.
pub fn fallback_outcome() -> AnalysisOutcome {
    AnalysisOutcome {
        summary: "No summary, error".to_string(),
        persons: vec!["No people, error".to_string()],
        category: Category::Other,
    }
}

// ============ Ollama ============

/// Analyzer backed by Ollama's `POST /api/generate`.
///
/// One non-streaming request per analysis, no retries.
pub struct OllamaAnalyzer {
    client: reqwest::Client,
    url: String,
    model: String,
    json_format: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

impl OllamaAnalyzer {
    pub fn new(config: &OllamaConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            json_format: config.json_format,
        })
    }

    /// Send `prompt` and return the raw completion text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AnalyzeError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        if self.json_format {
            body["format"] = Value::String("json".to_string());
        }

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalyzeError::Unreachable(format!("request to {} timed out", self.url))
                } else {
                    AnalyzeError::Unreachable(format!(
                        "is Ollama running at {}? {}",
                        self.url, e
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzeError::Status {
                status: status.as_u16(),
                body: truncate(&body, 300),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnalyzeError::MalformedReply(format!("invalid Ollama response: {}", e)))?;

        parsed
            .response
            .ok_or_else(|| AnalyzeError::MalformedReply("no 'response' in Ollama reply".into()))
    }
}

#[async_trait]
impl Analyzer for OllamaAnalyzer {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, text: &str) -> Result<AnalysisOutcome, AnalyzeError> {
        let reply = self.generate(&build_prompt(text)).await?;
        debug!(model = %self.model, reply = %truncate(&reply, 500), "model reply");
        parse_reply(&reply)
    }
}

// ============ Reply parsing ============

/// Parse a model reply into an [`AnalysisOutcome`].
pub fn parse_reply(raw: &str) -> Result<AnalysisOutcome, AnalyzeError> {
    if let Some(outcome) = parse_json_reply(raw) {
        return Ok(outcome);
    }
    if let Some(outcome) = parse_marked_reply(raw) {
        return Ok(outcome);
    }
    Err(AnalyzeError::MalformedReply(format!(
        "no summary, persons or category found in: {}",
        truncate(raw.trim(), 200)
    )))
}

fn parse_json_reply(raw: &str) -> Option<AnalysisOutcome> {
    let trimmed = raw.trim();
    let value: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => {
            let start = trimmed.find('{')?;
            let end = trimmed.rfind('}')?;
            if end <= start {
                return None;
            }
            serde_json::from_str(&trimmed[start..=end]).ok()?
        }
    };

    let obj = value.as_object()?;
    let summary = lookup(obj, &["summary"]);
    let persons = lookup(obj, &["persons", "people", "names"]);
    let category = lookup(obj, &["category"]);
    if summary.is_none() && persons.is_none() && category.is_none() {
        return None;
    }

    Some(AnalysisOutcome {
        summary: summary.map(value_to_text).unwrap_or_default(),
        persons: match persons {
            Some(Value::Array(items)) => clean_persons(items.iter().map(value_to_text)),
            Some(Value::String(s)) => split_persons(s),
            _ => Vec::new(),
        },
        category: category
            .map(|v| Category::from_label(&value_to_text(v)))
            .unwrap_or(Category::Other),
    })
}

/// Case-insensitive key lookup accepting several aliases.
fn lookup<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    obj.iter()
        .find(|(k, _)| names.iter().any(|n| k.eq_ignore_ascii_case(n)))
        .map(|(_, v)| v)
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Heading {
    Summary,
    Persons,
    Category,
}

impl Heading {
    /// Persons are listed one per line as often as comma-separated.
    fn separator(self) -> char {
        match self {
            Heading::Persons => '\n',
            Heading::Summary | Heading::Category => ' ',
        }
    }
}

/// Recognize a `Heading: value` line, tolerating list numbering and `**` emphasis.
fn split_heading(line: &str) -> Option<(Heading, &str)> {
    let mut s = line.trim_start_matches(|c: char| c == '-' || c == '#' || c.is_whitespace());

    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &s[digits..];
        s = rest
            .strip_prefix('.')
            .or_else(|| rest.strip_prefix(')'))?
            .trim_start();
    }

    let s = s.trim_start_matches('*');
    let colon = s.find(':')?;
    let head = s[..colon].trim().trim_matches('*').trim().to_ascii_lowercase();
    let heading = match head.as_str() {
        "summary" | "concise summary" => Heading::Summary,
        "persons" | "people" | "names" | "person names" | "persons mentioned"
        | "people mentioned" => Heading::Persons,
        "category" | "most relevant category" => Heading::Category,
        _ => return None,
    };

    let value = s[colon + 1..].trim().trim_start_matches("**").trim();
    Some((heading, value))
}

fn parse_marked_reply(raw: &str) -> Option<AnalysisOutcome> {
    let mut summary: Option<String> = None;
    let mut persons: Option<String> = None;
    let mut category: Option<String> = None;
    let mut current: Option<Heading> = None;

    for line in raw.lines() {
        if let Some((heading, value)) = split_heading(line) {
            current = Some(heading);
            let slot = match heading {
                Heading::Summary => &mut summary,
                Heading::Persons => &mut persons,
                Heading::Category => &mut category,
            };
            slot.get_or_insert_with(String::new);
            append_line(slot, value, heading.separator());
            continue;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match current {
            Some(h @ Heading::Summary) => append_line(&mut summary, line, h.separator()),
            Some(h @ Heading::Persons) => append_line(&mut persons, line, h.separator()),
            Some(h @ Heading::Category) => append_line(&mut category, line, h.separator()),
            None => {}
        }
    }

    if summary.is_none() && persons.is_none() && category.is_none() {
        return None;
    }

    Some(AnalysisOutcome {
        summary: summary.unwrap_or_default(),
        persons: persons.as_deref().map(split_persons).unwrap_or_default(),
        category: category
            .as_deref()
            .map(Category::from_label)
            .unwrap_or(Category::Other),
    })
}

fn append_line(slot: &mut Option<String>, text: &str, sep: char) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let buf = slot.get_or_insert_with(String::new);
    if !buf.is_empty() {
        buf.push(sep);
    }
    buf.push_str(text);
}

fn split_persons(text: &str) -> Vec<String> {
    clean_persons(text.split([',', ';', '\n']).map(|s| s.to_string()))
}

/// Trim names, drop placeholders and duplicates, keep first-seen order.
fn clean_persons(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = strip_list_marker(name.trim())
            .trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
        if name.is_empty() {
            continue;
        }
        let lower = name.to_ascii_lowercase();
        if matches!(lower.as_str(), "none" | "n/a" | "na" | "unknown" | "no one") {
            continue;
        }
        if out.iter().any(|existing| existing.eq_ignore_ascii_case(name)) {
            continue;
        }
        out.push(name.to_string());
    }
    out
}

/// Drop a leading bullet (`-`, `*`, `•`) or number (`1.`, `2)`).
fn strip_list_marker(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix(['-', '*', '•']) {
        return rest.trim_start();
    }
    let digits = name.len() - name.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = name[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    name
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
