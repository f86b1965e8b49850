//! Structured validation results

use serde::{Deserialize, Serialize};
use std::fmt;

use super::options::ValidationOptions;

pub const PASS_COLUMN: &str = "Pass";
pub const NOTES_COLUMN: &str = "Notes";

/// Typed cell of a result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ColumnValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    /// Reference to an artifact produced during the run
    Link { label: String, target: String },
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Bool(v) => write!(f, "{v}"),
            ColumnValue::Int(v) => write!(f, "{v}"),
            ColumnValue::Double(v) => write!(f, "{v:.2}"),
            ColumnValue::Text(v) => write!(f, "{v}"),
            ColumnValue::Link { label, .. } => write!(f, "{label}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,
    pub value: ColumnValue,
}

/// Outcome of one validation invocation.
///
/// The pass flag is read from the boolean column named by `pass_column`, which every
/// constructor adds first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFact {
    pub name: String,
    pub columns: Vec<ResultColumn>,
    pub pass_column: String,
}

impl ResultFact {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            columns: vec![ResultColumn {
                name: PASS_COLUMN.to_string(),
                value: ColumnValue::Bool(passed),
            }],
            pass_column: PASS_COLUMN.to_string(),
        }
    }

    /// Failed row explaining why the validation could not produce a result
    pub fn failure(name: impl Into<String>, notes: impl Into<String>) -> Self {
        Self::new(name, false).with_column(NOTES_COLUMN, ColumnValue::Text(notes.into()))
    }

    pub fn with_column(mut self, name: impl Into<String>, value: ColumnValue) -> Self {
        self.columns.push(ResultColumn {
            name: name.into(),
            value,
        });
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| &column.value)
    }

    pub fn pass(&self) -> bool {
        matches!(self.column(&self.pass_column), Some(ColumnValue::Bool(true)))
    }

    pub fn notes(&self) -> Option<&str> {
        match self.column(NOTES_COLUMN) {
            Some(ColumnValue::Text(notes)) => Some(notes),
            _ => None,
        }
    }
}

/// Which sequences a validation run covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStage {
    Trace,
    Consensus,
}

/// One validated sequence and its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEntry {
    /// Name of the validated sequence
    pub subject: String,
    pub fact: ResultFact,
}

/// Results of one validation over every sequence of a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRun {
    pub options: ValidationOptions,
    pub stage: ValidationStage,
    pub entries: Vec<ValidationEntry>,
}

impl ValidationRun {
    pub fn new(options: ValidationOptions, stage: ValidationStage, entries: Vec<ValidationEntry>) -> Self {
        Self {
            options,
            stage,
            entries,
        }
    }

    pub fn passed(&self) -> bool {
        self.entries.iter().all(|entry| entry.fact.pass())
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.fact.pass()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_follows_bool_column() {
        let fact = ResultFact::new("trace", true).with_column("Failed windows", ColumnValue::Int(0));
        assert!(fact.pass());

        let failed = ResultFact::failure("trace", "no quality track");
        assert!(!failed.pass());
        assert_eq!(failed.notes(), Some("no quality track"));
    }

    #[test]
    fn test_pass_column_must_be_bool() {
        let mut fact = ResultFact::new("trace", true);
        fact.columns[0].value = ColumnValue::Text("true".to_string());
        assert!(!fact.pass());
    }

    #[test]
    fn test_column_serialization() {
        let value = ColumnValue::Link {
            label: "barcode".to_string(),
            target: "barcode:BOLD-1".to_string(),
        };
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"type\":\"link\""));
        assert_eq!(value.to_string(), "barcode");
    }
}
