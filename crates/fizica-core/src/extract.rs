//! Tolerant recovery of structured fields from free-form model output.
//!
//! Models are asked for a bare JSON object but routinely wrap it in prose
//! or code fences, emit nested objects where a string was requested, or
//! skip JSON entirely. [`ResponseExtractor`] tries an ordered chain of
//! parsers and, when none yields an object, degrades to a result built
//! from the raw text. Extraction never fails.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// How a field's raw JSON value is normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain text; objects and arrays are pretty-printed.
    Text,
    /// Sequence of strings; anything but an array becomes empty.
    List,
    /// One-line answer or score; structures are flattened to `key: value; ...`.
    Summary,
    /// Step-by-step detail; replaced by `backfill_from` when it only holds template filler.
    Detail { backfill_from: String },
}

/// One field to recover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Value used when the reply had no recoverable JSON.
    pub fallback: String,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fallback: String::new(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::List)
    }

    pub fn summary(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Summary)
    }

    pub fn detail(name: impl Into<String>, backfill_from: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Detail {
                backfill_from: backfill_from.into(),
            },
        )
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }
}

const NO_CONTENT_NOTICE: &str =
    "Modelul nu a generat niciun răspuns. Te rugăm să încerci din nou.";

/// The set of fields a reply is expected to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSchema {
    pub fields: Vec<FieldSpec>,
    /// Field that receives the raw text when no JSON is recoverable.
    pub primary: String,
    /// Placed in the primary field when the model produced nothing.
    pub empty_notice: String,
}

impl ResponseSchema {
    /// Schema over `fields`; the first field is primary.
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        let primary = fields.first().map(|f| f.name.clone()).unwrap_or_default();
        Self {
            fields,
            primary,
            empty_notice: NO_CONTENT_NOTICE.to_string(),
        }
    }

    pub fn with_primary(mut self, name: impl Into<String>) -> Self {
        self.primary = name.into();
        self
    }

    pub fn with_empty_notice(mut self, notice: impl Into<String>) -> Self {
        self.empty_notice = notice.into();
        self
    }

    /// Grading reply: correct solution, error analysis, score.
    pub fn analysis() -> Self {
        Self::new(vec![
            FieldSpec::text("solution"),
            FieldSpec::text("errorAnalysis")
                .with_fallback("Analiza erorilor este inclusă în textul de mai sus."),
            FieldSpec::summary("rating").with_fallback("—/10"),
        ])
    }

    /// Worked-solution reply.
    pub fn worked_solution() -> Self {
        Self::new(vec![
            FieldSpec::text("problemSummary"),
            FieldSpec::text("solutionSummary"),
            FieldSpec::text("solution"),
            FieldSpec::detail("explanation", "solution")
                .with_fallback("Explicațiile sunt incluse în soluția de mai sus."),
            FieldSpec::list("formulas"),
            FieldSpec::summary("finalAnswer").with_fallback("—"),
        ])
        .with_primary("solution")
    }
}

/// A normalized field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

/// How the result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// A parser in the chain produced a JSON object.
    Parsed(&'static str),
    /// No JSON; the raw text went into the primary field.
    RawText,
    /// The reply (or every extracted field) was empty.
    NoContent,
}

/// Outcome of extraction: every schema field, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResult {
    fields: Vec<(String, FieldValue)>,
    recovery: Recovery,
}

impl ParsedResult {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Text value of `name`; empty for lists and unknown fields.
    pub fn text(&self, name: &str) -> &str {
        match self.get(name) {
            Some(FieldValue::Text(text)) => text,
            _ => "",
        }
    }

    /// List value of `name`; empty for text and unknown fields.
    pub fn list(&self, name: &str) -> &[String] {
        match self.get(name) {
            Some(FieldValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn recovery(&self) -> Recovery {
        self.recovery
    }

    /// True when the structured breakdown could not be recovered.
    pub fn is_degraded(&self) -> bool {
        !matches!(self.recovery, Recovery::Parsed(_))
    }
}

// ---------------------------------------------------------------------------
// Parser chain
// ---------------------------------------------------------------------------

type Parser = fn(&str) -> Option<Value>;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json\s*(.*?)```").expect("valid json fence regex"));
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\s*(.*?)```").expect("valid fence regex"));

/// Tried in order; the first parser yielding a JSON object wins.
const PARSER_CHAIN: &[(&str, Parser)] = &[
    ("json_fence", parse_json_fence),
    ("any_fence", parse_any_fence),
    ("brace_span", parse_brace_span),
    ("whole_text", parse_whole_text),
];

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate.trim())
        .ok()
        .filter(Value::is_object)
}

fn parse_json_fence(raw: &str) -> Option<Value> {
    parse_object(JSON_FENCE.captures(raw)?.get(1)?.as_str())
}

fn parse_any_fence(raw: &str) -> Option<Value> {
    parse_object(ANY_FENCE.captures(raw)?.get(1)?.as_str())
}

/// The first `{` that opens a complete object. Nested objects stay intact
/// and text after the closing brace is ignored.
fn parse_brace_span(raw: &str) -> Option<Value> {
    raw.match_indices('{').find_map(|(idx, _)| {
        serde_json::Deserializer::from_str(&raw[idx..])
            .into_iter::<Value>()
            .next()?
            .ok()
            .filter(Value::is_object)
    })
}

fn parse_whole_text(raw: &str) -> Option<Value> {
    parse_object(raw)
}

/// Recover the first JSON object from `raw`, naming the parser that found it.
pub fn parse_json_object(raw: &str) -> Option<(&'static str, Value)> {
    PARSER_CHAIN
        .iter()
        .find_map(|(name, parser)| parser(raw).map(|value| (*name, value)))
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Stringify without losing structure: objects and arrays become pretty
/// JSON, null becomes empty.
pub fn safe_stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

fn inline_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collapse newlines into `; ` and runs of whitespace into one space.
fn collapse_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Flatten a summary value onto one line.
pub fn flatten_summary(value: &Value) -> String {
    let flat = match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, v)| format!("{key}: {}", inline_value(v)))
            .collect::<Vec<_>>()
            .join("; "),
        Value::Array(items) => items
            .iter()
            .map(inline_value)
            .filter(|item| !item.trim().is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        other => safe_stringify(other),
    };
    collapse_lines(&flat)
}

const FILLER_PHRASES: &[&str] = &[
    "detailed explanation for each step",
    "detailed explanations for each step",
    "explanation for each step",
    "explicații detaliate pentru fiecare pas",
    "explicatii detaliate pentru fiecare pas",
    "explicații pentru fiecare pas",
    "step-by-step explanation",
    "lorem ipsum",
];
const FILLER_TOKENS: &[&str] = &["...", "…", "-", "—", "n/a", "tbd", "todo"];

/// Heuristic for values that are template filler rather than content.
pub fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_lowercase();
    if lower.contains("placeholder") || FILLER_TOKENS.contains(&lower.as_str()) {
        return true;
    }
    lower.chars().count() <= 120 && FILLER_PHRASES.iter().any(|p| lower.contains(p))
}

fn normalize(kind: &FieldKind, value: Option<&Value>) -> FieldValue {
    let value = value.unwrap_or(&Value::Null);
    match kind {
        FieldKind::Text | FieldKind::Detail { .. } => {
            FieldValue::Text(safe_stringify(value).trim().to_string())
        }
        FieldKind::List => match value {
            Value::Array(items) => FieldValue::List(
                items
                    .iter()
                    .map(|item| safe_stringify(item).trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect(),
            ),
            _ => FieldValue::List(Vec::new()),
        },
        FieldKind::Summary => FieldValue::Text(flatten_summary(value)),
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Recovers a [`ParsedResult`] for one [`ResponseSchema`].
#[derive(Debug, Clone)]
pub struct ResponseExtractor {
    schema: ResponseSchema,
}

impl ResponseExtractor {
    pub fn new(schema: ResponseSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &ResponseSchema {
        &self.schema
    }

    /// Extract every schema field from `raw`. Never fails.
    pub fn extract(&self, raw: &str) -> ParsedResult {
        if raw.trim().is_empty() {
            tracing::warn!("Model reply was empty");
            return self.no_content();
        }

        let Some((parser, value)) = parse_json_object(raw) else {
            tracing::warn!(
                chars = raw.chars().count(),
                "No JSON object in model reply, using raw text"
            );
            return self.from_raw_text(raw);
        };
        tracing::debug!(parser, "Recovered JSON object from model reply");

        let mut fields: Vec<(String, FieldValue)> = self
            .schema
            .fields
            .iter()
            .map(|spec| {
                let normalized = normalize(&spec.kind, value.get(&spec.name));
                (spec.name.clone(), normalized)
            })
            .collect();

        self.backfill_details(&mut fields);

        if fields.iter().all(|(_, v)| v.is_empty()) {
            tracing::warn!(parser, "Every extracted field was empty");
            return self.no_content();
        }

        ParsedResult {
            fields,
            recovery: Recovery::Parsed(parser),
        }
    }

    fn backfill_details(&self, fields: &mut [(String, FieldValue)]) {
        for spec in &self.schema.fields {
            let FieldKind::Detail { backfill_from } = &spec.kind else {
                continue;
            };

            let source = fields.iter().find_map(|(name, value)| match value {
                FieldValue::Text(text) if name == backfill_from && !is_placeholder(text) => {
                    Some(text.clone())
                }
                _ => None,
            });
            let Some(source) = source else { continue };

            for (name, value) in fields.iter_mut() {
                if *name == spec.name
                    && let FieldValue::Text(text) = value
                    && is_placeholder(text)
                {
                    tracing::debug!(
                        field = %spec.name,
                        from = %backfill_from,
                        "Backfilling placeholder field"
                    );
                    *text = source.clone();
                }
            }
        }
    }

    fn no_content(&self) -> ParsedResult {
        self.degraded(self.schema.empty_notice.clone(), Recovery::NoContent)
    }

    fn from_raw_text(&self, raw: &str) -> ParsedResult {
        self.degraded(raw.trim().to_string(), Recovery::RawText)
    }

    fn degraded(&self, primary_text: String, recovery: Recovery) -> ParsedResult {
        let fields = self
            .schema
            .fields
            .iter()
            .map(|spec| {
                let is_primary = spec.name == self.schema.primary;
                let value = match (&spec.kind, is_primary) {
                    (FieldKind::List, true) => FieldValue::List(vec![primary_text.clone()]),
                    (FieldKind::List, false) => FieldValue::List(Vec::new()),
                    (_, true) => FieldValue::Text(primary_text.clone()),
                    (_, false) => FieldValue::Text(spec.fallback.clone()),
                };
                (spec.name.clone(), value)
            })
            .collect();

        ParsedResult { fields, recovery }
    }
}
