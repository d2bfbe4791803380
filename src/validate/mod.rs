//! Schema and integrity validation of result files.
//!
//! Findings are returned as data so a batch keeps going past bad files.
//! A file is accepted only when it parses, satisfies its schema, and (if the
//! schema names an integrity field) its stored hash matches the hash
//! recomputed from its own values.

pub mod schema;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::DuelError;
use crate::integrity::hash_excluding;
use crate::record::{SummaryRecord, VerifiedRecord};
use crate::timestamp::Timestamp;

pub use schema::{JsonType, Schema, SchemaNode, TypeSpec};

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// The file could not be read or is not JSON.
    Parse,
    /// A value is missing, has the wrong type, or is out of bounds.
    Schema,
    /// The stored hash does not match the recomputed hash.
    Integrity,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parse => "parse",
            Self::Schema => "schema",
            Self::Integrity => "integrity",
        })
    }
}

/// One finding, located by a JSON path such as `$.spikes[2].intensity`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationIssue {
    /// Which check failed.
    pub kind: IssueKind,
    /// JSON path of the offending value; `$` for the whole document.
    pub path: String,
    /// Human-readable detail.
    pub message: String,
}

impl ValidationIssue {
    fn new(kind: IssueKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
    }
}

impl From<DuelError> for ValidationIssue {
    fn from(err: DuelError) -> Self {
        match err {
            DuelError::Integrity { .. } => Self::new(IssueKind::Integrity, "$", err.to_string()),
            DuelError::SchemaValidation { path, message } => {
                Self::new(IssueKind::Schema, path, message)
            }
            DuelError::Json(_) => Self::new(IssueKind::Schema, "$", err.to_string()),
            other => Self::new(IssueKind::Parse, "$", other.to_string()),
        }
    }
}

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationResult {
    /// `true` exactly when `errors` is empty.
    pub ok: bool,
    /// Every finding, in discovery order.
    pub errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }

    /// Whether any finding is an integrity mismatch.
    pub fn has_integrity_error(&self) -> bool {
        self.errors.iter().any(|e| e.kind == IssueKind::Integrity)
    }
}

/// Validates an in-memory JSON value.
pub fn validate_value(value: &Value, schema: &Schema) -> ValidationResult {
    let mut issues = Vec::new();
    check_node(value, &schema.root, "$", &mut issues);
    if let Some(field) = &schema.integrity_field {
        check_integrity(value, field, &mut issues);
    }
    ValidationResult::from_issues(issues)
}

/// Validates JSON text.
pub fn validate_str(text: &str, schema: &Schema) -> ValidationResult {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => validate_value(&value, schema),
        Err(e) => ValidationResult::from_issues(vec![ValidationIssue::new(
            IssueKind::Parse,
            "$",
            format!("invalid JSON: {e}"),
        )]),
    }
}

/// Validates the file at `path`. Read failures are reported as `Parse`.
pub fn validate_file(path: &Path, schema: &Schema) -> ValidationResult {
    let result = match fs::read_to_string(path) {
        Ok(text) => validate_str(&text, schema),
        Err(e) => ValidationResult::from_issues(vec![ValidationIssue::new(
            IssueKind::Parse,
            "$",
            format!("cannot read file: {e}"),
        )]),
    };
    if !result.ok {
        warn!(
            path = %path.display(),
            errors = result.errors.len(),
            "file rejected"
        );
    }
    result
}

/// Outcome for one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FileReport {
    /// File as given on the command line.
    pub path: PathBuf,
    pub result: ValidationResult,
}

/// Outcomes for every file of a batch, in input order. Serialized by
/// `validate --report`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    /// One entry per input file.
    pub files: Vec<FileReport>,
}

impl BatchReport {
    /// Number of accepted files.
    pub fn valid_count(&self) -> usize {
        self.files.iter().filter(|f| f.result.ok).count()
    }

    /// Whether every file was accepted.
    pub fn all_ok(&self) -> bool {
        self.files.iter().all(|f| f.result.ok)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            let verdict = if file.result.ok { "VALID" } else { "INVALID" };
            writeln!(f, "{}: {verdict}", file.path.display())?;
            for issue in &file.result.errors {
                writeln!(f, "   - {issue}")?;
            }
        }
        write!(
            f,
            "Validation Summary: {}/{} files valid",
            self.valid_count(),
            self.files.len()
        )
    }
}

/// Validates every file independently; one bad file never stops the rest.
pub fn validate_batch(paths: &[PathBuf], schema: &Schema) -> BatchReport {
    let files: Vec<FileReport> = paths
        .par_iter()
        .map(|path| FileReport {
            path: path.clone(),
            result: validate_file(path, schema),
        })
        .collect();
    let report = BatchReport { files };
    info!(
        files = report.files.len(),
        valid = report.valid_count(),
        "batch validated"
    );
    report
}

/// Loads a summary record file and returns it only if it fully verifies.
///
/// # Errors
///
/// Returns every finding when the file does not parse, breaks the summary
/// schema, or fails its integrity check.
pub fn load_summary(path: &Path) -> Result<VerifiedRecord, Vec<ValidationIssue>> {
    let text = fs::read_to_string(path).map_err(|e| {
        vec![ValidationIssue::new(
            IssueKind::Parse,
            "$",
            format!("cannot read {}: {e}", path.display()),
        )]
    })?;
    parse_summary(&text)
}

/// Verifies summary-record JSON text; see [`load_summary`].
///
/// # Errors
///
/// Returns every finding when the text is not an intact summary record.
pub fn parse_summary(text: &str) -> Result<VerifiedRecord, Vec<ValidationIssue>> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        vec![ValidationIssue::new(
            IssueKind::Parse,
            "$",
            format!("invalid JSON: {e}"),
        )]
    })?;
    let result = validate_value(&value, &Schema::summary_record());
    if !result.ok {
        return Err(result.errors);
    }
    SummaryRecord::verify_json(value).map_err(|e| vec![ValidationIssue::from(e)])
}

fn check_node(value: &Value, node: &SchemaNode, path: &str, issues: &mut Vec<ValidationIssue>) {
    if let Some(spec) = &node.kind {
        if !spec.kinds().iter().any(|kind| matches_type(value, *kind)) {
            issues.push(ValidationIssue::new(
                IssueKind::Schema,
                path,
                format!("expected {spec}, found {}", describe(value)),
            ));
            return;
        }
    }

    if let Some(allowed) = &node.allowed {
        if !allowed.contains(value) {
            issues.push(ValidationIssue::new(
                IssueKind::Schema,
                path,
                format!("{value} is not one of the allowed values"),
            ));
        }
    }

    if let Some(n) = value.as_f64() {
        check_bounds(n, node, path, issues);
    }

    if let Some(s) = value.as_str() {
        check_string(s, node, path, issues);
    }

    if let Some(map) = value.as_object() {
        for field in &node.required {
            if !map.contains_key(field) {
                issues.push(ValidationIssue::new(
                    IssueKind::Schema,
                    format!("{path}.{field}"),
                    "missing required field",
                ));
            }
        }
        if node.additional_properties == Some(false) {
            for name in map.keys().filter(|k| !node.properties.contains_key(*k)) {
                issues.push(ValidationIssue::new(
                    IssueKind::Schema,
                    format!("{path}.{name}"),
                    "field is not allowed",
                ));
            }
        }
        for (name, child) in &node.properties {
            if let Some(v) = map.get(name) {
                check_node(v, child, &format!("{path}.{name}"), issues);
            }
        }
    }

    if let Some(array) = value.as_array() {
        check_count(array.len(), node.min_items, node.max_items, "items", path, issues);
        if let Some(items) = &node.items {
            for (i, item) in array.iter().enumerate() {
                check_node(item, items, &format!("{path}[{i}]"), issues);
            }
        }
    }
}

fn check_string(s: &str, node: &SchemaNode, path: &str, issues: &mut Vec<ValidationIssue>) {
    let chars = s.chars().count();
    check_count(chars, node.min_length, node.max_length, "characters", path, issues);
    if node.format.as_deref() == Some("date-time") {
        if let Err(e) = Timestamp::parse(s) {
            issues.push(ValidationIssue::new(IssueKind::Schema, path, e.to_string()));
        }
    }
}

fn check_count(
    n: usize,
    min: Option<usize>,
    max: Option<usize>,
    unit: &str,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(min) = min.filter(|min| n < *min) {
        issues.push(ValidationIssue::new(
            IssueKind::Schema,
            path,
            format!("has {n} {unit}, fewer than {min}"),
        ));
    }
    if let Some(max) = max.filter(|max| n > *max) {
        issues.push(ValidationIssue::new(
            IssueKind::Schema,
            path,
            format!("has {n} {unit}, more than {max}"),
        ));
    }
}

fn check_bounds(n: f64, node: &SchemaNode, path: &str, issues: &mut Vec<ValidationIssue>) {
    if let Some(min) = node.minimum {
        if n < min {
            issues.push(ValidationIssue::new(
                IssueKind::Schema,
                path,
                format!("{n} is below the minimum {min}"),
            ));
        }
    }
    if let Some(bound) = node.exclusive_minimum {
        if n <= bound {
            issues.push(ValidationIssue::new(
                IssueKind::Schema,
                path,
                format!("{n} must be greater than {bound}"),
            ));
        }
    }
    if let Some(max) = node.maximum {
        if n > max {
            issues.push(ValidationIssue::new(
                IssueKind::Schema,
                path,
                format!("{n} is above the maximum {max}"),
            ));
        }
    }
    if let Some(bound) = node.exclusive_maximum {
        if n >= bound {
            issues.push(ValidationIssue::new(
                IssueKind::Schema,
                path,
                format!("{n} must be less than {bound}"),
            ));
        }
    }
}

fn check_integrity(value: &Value, field: &str, issues: &mut Vec<ValidationIssue>) {
    let path = format!("$.{field}");
    let Some(map) = value.as_object() else {
        return;
    };
    match map.get(field).and_then(Value::as_str) {
        None => issues.push(ValidationIssue::new(
            IssueKind::Integrity,
            path,
            "integrity hash missing or not a string",
        )),
        Some(stored) => {
            let recomputed = hash_excluding(value, field);
            if stored != recomputed {
                issues.push(ValidationIssue::new(
                    IssueKind::Integrity,
                    path,
                    format!("stored {stored}, recomputed {recomputed}"),
                ));
            }
        }
    }
}

fn matches_type(value: &Value, kind: JsonType) -> bool {
    match kind {
        JsonType::Object => value.is_object(),
        JsonType::Array => value.is_array(),
        JsonType::String => value.is_string(),
        JsonType::Number => value.is_number(),
        JsonType::Integer => value.is_i64() || value.is_u64(),
        JsonType::Boolean => value.is_boolean(),
        JsonType::Null => value.is_null(),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
