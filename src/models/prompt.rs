use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A stored prompt template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub template: String,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    // Records written before favorites existed have no flag at all
    #[serde(default, deserialize_with = "lenient_bool")]
    pub favorite: bool,
}

/// Input to `PromptRepository::save`.
///
/// Without an `id` a new prompt is created; with one, the matching prompt is replaced
/// (or a new one appended under that id when nothing matches).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
    pub template: String,
    #[serde(default)]
    pub tags: TagInput,
    /// `None` keeps the flag of the prompt being replaced (false for new prompts).
    #[serde(default)]
    pub favorite: Option<bool>,
}

impl PromptDraft {
    pub fn new(label: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            template: template.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tags(mut self, tags: impl Into<TagInput>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = Some(favorite);
        self
    }
}

impl From<&Prompt> for PromptDraft {
    fn from(prompt: &Prompt) -> Self {
        Self {
            id: Some(prompt.id.clone()),
            label: prompt.label.clone(),
            template: prompt.template.clone(),
            tags: TagInput::List(prompt.tags.clone()),
            favorite: Some(prompt.favorite),
        }
    }
}

/// Tags as typed by a user: either already split, or one comma-separated string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TagInput {
    List(Vec<String>),
    Csv(String),
}

impl Default for TagInput {
    fn default() -> Self {
        TagInput::List(Vec::new())
    }
}

impl TagInput {
    /// Trimmed, non-empty tags in input order. Duplicates are kept.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            TagInput::List(tags) => clean_tags(tags.iter().map(String::as_str)),
            TagInput::Csv(csv) => split_csv(csv),
        }
    }
}

impl From<Vec<String>> for TagInput {
    fn from(tags: Vec<String>) -> Self {
        TagInput::List(tags)
    }
}

impl From<Vec<&str>> for TagInput {
    fn from(tags: Vec<&str>) -> Self {
        TagInput::List(tags.into_iter().map(str::to_string).collect())
    }
}

impl From<&str> for TagInput {
    fn from(csv: &str) -> Self {
        TagInput::Csv(csv.to_string())
    }
}

impl From<String> for TagInput {
    fn from(csv: String) -> Self {
        TagInput::Csv(csv)
    }
}

pub(crate) fn split_csv(csv: &str) -> Vec<String> {
    clean_tags(csv.split(','))
}

pub(crate) fn clean_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    tags.into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Mints an id of the form `<prefix>_<epoch millis>_<9 base-36 chars>`.
///
/// Uniqueness is probabilistic only; collisions are negligible at the expected
/// number of records per installation.
pub fn generate_id(prefix: &str) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", prefix, chrono::Utc::now().timestamp_millis(), suffix)
}

/// `true` only for a JSON `true`; anything else (missing, null, strings) reads as false.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

/// Strings pass through, numbers and booleans are stringified, anything else is empty.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Value::String(csv) => split_csv(&csv),
        _ => Vec::new(),
    })
}
