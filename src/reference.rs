//! JSON Reference (`$ref`) value type.
//!
//! A reference is split on its first `#` into an external path (the file part,
//! kept as `/`-separated segments) and an anchor path (the JSON Pointer part,
//! kept as unescaped tokens). Rewriting either half and serializing again is how
//! every pass of the bundler edits refs; the serialized form is the only
//! representation ever written back into a document.

use crate::error::RefSyntaxError;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<external>[\w\s./-]+)?(?P<anchor>#[\w\s./~{}-]*)?$")
        .expect("$ref grammar is a valid regex")
});

/// A path given either as pre-split segments or as a pathname to split.
#[derive(Debug, Clone)]
pub enum PathInput<'a> {
    Segments(Vec<String>),
    Pathname(&'a str),
}

impl<'a> From<&'a str> for PathInput<'a> {
    fn from(pathname: &'a str) -> Self {
        PathInput::Pathname(pathname)
    }
}

impl From<Vec<String>> for PathInput<'_> {
    fn from(segments: Vec<String>) -> Self {
        PathInput::Segments(segments)
    }
}

/// A parsed `$ref`.
///
/// Internal references have an empty external path. `parse(r.to_string()) == r`
/// holds for every reference this crate constructs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Reference {
    external_path: Vec<String>,
    anchor_path: Vec<String>,
}

impl Reference {
    /// Parses a `$ref` string, failing if it falls outside the accepted grammar.
    pub fn parse(raw: &str) -> Result<Self, RefSyntaxError> {
        let captures = REF_RE.captures(raw).ok_or_else(|| RefSyntaxError {
            reference: raw.to_string(),
        })?;

        Ok(Reference {
            external_path: captures
                .name("external")
                .map(|m| split_external(m.as_str()))
                .unwrap_or_default(),
            anchor_path: captures
                .name("anchor")
                .map(|m| split_anchor(m.as_str()))
                .unwrap_or_default(),
        })
    }

    /// An internal reference to `#/components/<component_type>/<name>`.
    pub fn component(component_type: &str, name: &str) -> Self {
        Reference {
            external_path: Vec::new(),
            anchor_path: vec![
                "components".to_string(),
                component_type.to_string(),
                name.to_string(),
            ],
        }
    }

    pub fn external_path(&self) -> &[String] {
        &self.external_path
    }

    pub fn anchor_path(&self) -> &[String] {
        &self.anchor_path
    }

    /// The external path joined back into a relative pathname.
    pub fn external_pathname(&self) -> String {
        self.external_path.join("/")
    }

    /// The anchor as an escaped JSON Pointer with a leading `#`, or an empty
    /// string when there is no anchor.
    pub fn anchor_pathname(&self) -> String {
        if self.anchor_path.is_empty() {
            return String::new();
        }
        let escaped: Vec<String> = self.anchor_path.iter().map(|s| escape_token(s)).collect();
        format!("#/{}", escaped.join("/"))
    }

    /// Last segment of the external path, e.g. `common.yml`.
    pub fn external_filename(&self) -> Option<&str> {
        self.external_path
            .last()
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn is_external(&self) -> bool {
        !self.external_path.is_empty()
    }

    pub fn has_anchor(&self) -> bool {
        !self.anchor_path.is_empty()
    }

    pub fn set_external_path<'a>(&mut self, path: impl Into<PathInput<'a>>) -> &mut Self {
        self.external_path = match path.into() {
            PathInput::Segments(segments) => segments,
            PathInput::Pathname(pathname) => split_external(pathname),
        };
        self
    }

    pub fn set_anchor_path<'a>(&mut self, path: impl Into<PathInput<'a>>) -> &mut Self {
        self.anchor_path = match path.into() {
            PathInput::Segments(segments) => segments,
            PathInput::Pathname(pathname) => split_anchor(pathname),
        };
        self
    }

    /// Drops the external path, turning the reference into an internal one.
    pub fn clear_external_path(&mut self) -> &mut Self {
        self.external_path.clear();
        self
    }

    pub fn has_external_segment(&self, segment: &str) -> bool {
        self.external_path.iter().any(|s| s == segment)
    }

    pub fn has_anchor_segment(&self, segment: &str) -> bool {
        self.anchor_path.iter().any(|s| s == segment)
    }

    /// Whether the anchor passes through a `components` section.
    pub fn targets_component(&self) -> bool {
        self.has_anchor_segment("components")
    }

    /// The anchor segment immediately following `components`, e.g. `schemas`.
    pub fn component_type(&self) -> Option<&str> {
        let idx = self.anchor_path.iter().position(|s| s == "components")?;
        self.anchor_path.get(idx + 1).map(String::as_str)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.external_pathname(), self.anchor_pathname())
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Reference {
    type Err = RefSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reference::parse(s)
    }
}

fn split_external(pathname: &str) -> Vec<String> {
    if pathname.is_empty() {
        return Vec::new();
    }
    pathname.split('/').map(str::to_string).collect()
}

/// Splits `#/a/b~1c` (or `/a/b~1c`) into unescaped pointer tokens.
fn split_anchor(pathname: &str) -> Vec<String> {
    let pointer = pathname.strip_prefix('#').unwrap_or(pathname);
    if pointer.is_empty() {
        return Vec::new();
    }
    let pointer = pointer.strip_prefix('/').unwrap_or(pointer);
    pointer.split('/').map(unescape_token).collect()
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}
