//! Parsed specification documents.
//!
//! Documents are kept as `serde_yaml::Value` trees, keyed by their path
//! relative to the specification root. The set is path-sorted so every pass
//! visits documents in the same order.

use crate::error::{BundleError, Result};
use crate::naming::document_key;
use crate::reference::Reference;
use crate::source::SourceProvider;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Structured-data formats a document can be read from or rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Detects the format from a file extension; `None` for non-spec files.
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yml" | "yaml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    pub fn parse(self, document: &str, bytes: &[u8]) -> Result<Value> {
        let parsed = match self {
            Format::Yaml => serde_yaml::from_slice(bytes).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| BundleError::Parse {
            document: document.to_string(),
            message,
        })
    }

    pub fn render(self, value: &Value) -> Result<String> {
        match self {
            Format::Yaml => serde_yaml::to_string(value).map_err(|e| BundleError::Serialize(e.to_string())),
            Format::Json => serde_json::to_string_pretty(value)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| BundleError::Serialize(e.to_string())),
        }
    }
}

/// All documents of one specification tree, keyed by root-relative path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSet {
    documents: BTreeMap<String, Value>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every YAML/JSON file beneath `dir` from `provider`.
    ///
    /// Keys are relative to `dir`, which becomes the specification root. Files
    /// with other extensions are ignored.
    pub fn load(provider: &impl SourceProvider, dir: &Path) -> Result<Self> {
        let mut set = DocumentSet::new();

        for path in provider.list(dir)? {
            let Some(format) = Format::from_path(&path) else {
                tracing::debug!(path = %path.display(), "skipping non-spec file");
                continue;
            };
            let key = document_key(path.strip_prefix(dir).unwrap_or(&path));
            let bytes = provider.read(&path)?;
            let value = format.parse(&key, &bytes)?;
            set.insert(key, value);
        }

        tracing::debug!(documents = set.len(), "loaded specification tree");
        Ok(set)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.documents.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.documents.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.documents.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.documents.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.documents.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.documents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.documents.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Resolves a normalized (root-relative) reference to the value it targets.
    pub fn resolve(&self, reference: &Reference) -> Option<&Value> {
        let document = self.get(&reference.external_pathname())?;
        pointer_get(document, reference.anchor_path())
    }
}

impl FromIterator<(String, Value)> for DocumentSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        DocumentSet {
            documents: iter.into_iter().collect(),
        }
    }
}

/// Follows unescaped JSON Pointer tokens into a value.
pub fn pointer_get<'a>(value: &'a Value, tokens: &[String]) -> Option<&'a Value> {
    tokens.iter().try_fold(value, |current, token| match current {
        Value::Mapping(map) => map.get(token.as_str()),
        Value::Sequence(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Tagged(tagged) => pointer_get(&tagged.value, std::slice::from_ref(token)),
        _ => None,
    })
}

/// Mirrors JavaScript truthiness: null, false, zero, NaN and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(_) | Value::Mapping(_) => true,
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

/// Whether a value is a map or sequence (and can therefore be inlined).
pub fn is_structured(value: &Value) -> bool {
    match value {
        Value::Sequence(_) | Value::Mapping(_) => true,
        Value::Tagged(tagged) => is_structured(&tagged.value),
        _ => false,
    }
}

#[cfg(test)]
pub(crate) fn yaml(source: &str) -> Value {
    serde_yaml::from_str(source).unwrap()
}
