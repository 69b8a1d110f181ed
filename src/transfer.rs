//! Export of the prompt collection to a portable JSON document, and tolerant import
//! of documents produced by this or other prompt tools.

use crate::error::{Error, Result};
use crate::models::prompt::{generate_id, split_csv, Prompt};
use crate::repository::{sort_favorites_first, PromptRepository};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

pub const EXPORT_VERSION: &str = "1.0";

const LABEL_KEYS: &[&str] = &["label", "title", "name"];
const TEMPLATE_KEYS: &[&str] = &["template", "content", "text", "prompt"];
const TAG_KEYS: &[&str] = &["tags", "labels", "categories"];
const FAVORITE_KEYS: &[&str] = &["favorite", "starred", "pinned"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportDocument {
    pub version: String,
    pub exported: String,
    pub prompts: Vec<Prompt>,
}

/// Counts returned by an import.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records added to the collection.
    pub imported: usize,
    /// Records found in the document, before skipping invalid or duplicate ones.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Nothing new was added.
    Nothing,
    All,
    /// Some records were skipped as duplicates or incomplete.
    Partial,
}

impl ImportSummary {
    pub fn outcome(&self) -> ImportOutcome {
        if self.imported == 0 {
            ImportOutcome::Nothing
        } else if self.imported == self.total {
            ImportOutcome::All
        } else {
            ImportOutcome::Partial
        }
    }
}

#[derive(Clone)]
pub struct TransferEngine {
    repository: PromptRepository,
}

impl TransferEngine {
    pub fn new(repository: PromptRepository) -> Self {
        Self { repository }
    }

    /// Serializes the collection as an indented `{version, exported, prompts}` document.
    #[instrument(skip(self))]
    pub async fn export(&self) -> Result<String> {
        let mut prompts = self.repository.load().await?;
        sort_favorites_first(&mut prompts);
        let document = ExportDocument {
            version: EXPORT_VERSION.to_string(),
            exported: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            prompts,
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| Error::store("Failed to serialize export document", e))?;
        info!(count = document.prompts.len(), "Exported prompts");
        Ok(json)
    }

    /// Merges the prompts found in `document` into the collection.
    ///
    /// Records whose trimmed, case-folded label is already present (or was accepted
    /// earlier in the same document) are skipped, as are records without a label or
    /// template. Accepted records always get a fresh id.
    ///
    /// Callers are expected to take a `pre-import` backup first.
    #[instrument(skip(self, document), fields(bytes = document.len()))]
    pub async fn import(&self, document: &str) -> Result<ImportSummary> {
        let parsed: Value = serde_json::from_str(document).map_err(Error::InvalidDocument)?;
        let records = candidate_records(parsed)?;
        let total = records.len();

        let mut collection = self.repository.load_collection().await?;
        let mut seen: HashSet<String> =
            collection.prompts.iter().map(|p| title_key(&p.label)).collect();
        let mut imported = 0;

        for record in &records {
            let Some(candidate) = ImportedPrompt::from_record(record) else {
                continue;
            };
            if !seen.insert(title_key(&candidate.label)) {
                debug!(label = %candidate.label, "Skipping duplicate title");
                continue;
            }
            collection.prompts.push(Prompt {
                id: generate_id("prompt"),
                label: candidate.label,
                template: candidate.template,
                tags: candidate.tags,
                favorite: candidate.favorite,
            });
            imported += 1;
        }

        if imported > 0 {
            self.repository.persist(&collection).await?;
        }
        info!(imported, total, "Imported prompts");
        Ok(ImportSummary { imported, total })
    }
}

/// Accepts `{"prompts": [...]}`, a bare array, or `{"data": [...]}`, in that order.
fn candidate_records(document: Value) -> Result<Vec<Value>> {
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("prompts") {
                return Ok(items);
            }
            match map.remove("data") {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(Error::InvalidFormat),
            }
        }
        _ => Err(Error::InvalidFormat),
    }
}

fn title_key(label: &str) -> String {
    label.trim().to_lowercase()
}

#[derive(Debug, PartialEq)]
struct ImportedPrompt {
    label: String,
    template: String,
    tags: Vec<String>,
    favorite: bool,
}

impl ImportedPrompt {
    fn from_record(record: &Value) -> Option<Self> {
        let label = pick(record, LABEL_KEYS)?.as_str()?.trim();
        let template = pick(record, TEMPLATE_KEYS)?.as_str()?.trim();
        if label.is_empty() || template.is_empty() {
            return None;
        }
        Some(Self {
            label: label.to_string(),
            template: template.to_string(),
            tags: pick(record, TAG_KEYS).map(tags_from).unwrap_or_default(),
            favorite: pick(record, FAVORITE_KEYS).is_some_and(favorite_from),
        })
    }
}

/// First of `keys` present on `record` with a non-null value.
fn pick<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let map = record.as_object()?;
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

fn tags_from(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .filter(|t| !t.is_empty())
            .collect(),
        Value::String(csv) => split_csv(csv),
        _ => Vec::new(),
    }
}

fn favorite_from(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pick_skips_null_and_respects_key_order() {
        let record = json!({ "title": null, "name": "Named", "label": null });
        assert_eq!(pick(&record, LABEL_KEYS), Some(&json!("Named")));

        let record = json!({ "name": "Named", "title": "Titled" });
        assert_eq!(pick(&record, LABEL_KEYS), Some(&json!("Titled")));
    }

    #[test]
    fn favorite_accepts_true_string_true_and_one() {
        assert!(favorite_from(&json!(true)));
        assert!(favorite_from(&json!("true")));
        assert!(favorite_from(&json!(1)));
        assert!(!favorite_from(&json!("yes")));
        assert!(!favorite_from(&json!(2)));
        assert!(!favorite_from(&json!(false)));
        assert!(!favorite_from(&json!("TRUE")));
    }

    #[test]
    fn record_with_alternate_field_names() {
        let record = json!({
            "title": "  Summarize ",
            "content": "Summarize this: ",
            "categories": "work, writing",
            "starred": 1
        });
        assert_eq!(
            ImportedPrompt::from_record(&record),
            Some(ImportedPrompt {
                label: "Summarize".into(),
                template: "Summarize this:".into(),
                tags: vec!["work".into(), "writing".into()],
                favorite: true,
            })
        );
    }

    #[test]
    fn record_without_template_is_rejected() {
        assert_eq!(ImportedPrompt::from_record(&json!({ "label": "x", "text": "  " })), None);
        assert_eq!(ImportedPrompt::from_record(&json!({ "label": "x" })), None);
        assert_eq!(ImportedPrompt::from_record(&json!("just a string")), None);
    }

    #[test]
    fn shapes_are_tried_in_precedence_order() {
        let both = json!({ "prompts": [1], "data": [1, 2] });
        assert_eq!(candidate_records(both).unwrap().len(), 1);

        let data_only = json!({ "prompts": "nope", "data": [1, 2] });
        assert_eq!(candidate_records(data_only).unwrap().len(), 2);

        assert!(matches!(candidate_records(json!({ "items": [] })), Err(Error::InvalidFormat)));
        assert!(matches!(candidate_records(json!(42)), Err(Error::InvalidFormat)));
    }

    #[test]
    fn outcome_distinguishes_none_all_partial() {
        assert_eq!(ImportSummary { imported: 0, total: 3 }.outcome(), ImportOutcome::Nothing);
        assert_eq!(ImportSummary { imported: 3, total: 3 }.outcome(), ImportOutcome::All);
        assert_eq!(ImportSummary { imported: 1, total: 3 }.outcome(), ImportOutcome::Partial);
        assert_eq!(ImportSummary { imported: 0, total: 0 }.outcome(), ImportOutcome::Nothing);
    }
}
