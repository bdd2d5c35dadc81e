//! Reference scanner.
//!
//! Every document is seen as a tree of four node kinds: maps, sequences,
//! scalars, and ref markers (a map holding a string `$ref`). The walkers here
//! visit ref markers in document order, either reporting where they are
//! ([`walk`], [`collect_refs`]) or rewriting their `$ref` strings in place
//! ([`rewrite_refs`]). Neither walker changes the shape of the tree.

use crate::reference::Reference;
use serde_yaml::{Mapping, Value};

/// The key that marks a JSON Reference.
pub const REF_KEY: &str = "$ref";

/// One step into a document: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Key(Value),
    Index(usize),
}

/// Path from a document root to a node.
pub type Location = Vec<Segment>;

/// Closed set of node kinds.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Map(&'a Mapping),
    Seq(&'a [Value]),
    Scalar(&'a Value),
    /// A map with a string `$ref`. Sibling keys are still walked.
    Ref { target: &'a str, map: &'a Mapping },
}

impl<'a> Node<'a> {
    pub fn classify(value: &'a Value) -> Node<'a> {
        match value {
            Value::Mapping(map) => match map.get(REF_KEY) {
                Some(Value::String(target)) => Node::Ref { target, map },
                _ => Node::Map(map),
            },
            Value::Sequence(items) => Node::Seq(items),
            Value::Tagged(tagged) => Node::classify(&tagged.value),
            scalar => Node::Scalar(scalar),
        }
    }
}

/// Receives every ref marker found by [`walk`].
pub trait Visitor {
    /// `location` addresses the map holding the `$ref`, not the string itself.
    fn visit_ref(&mut self, location: &[Segment], target: &str);
}

/// A `$ref` occurrence inside a document.
#[derive(Debug, Clone, PartialEq)]
pub struct RefSite {
    pub location: Location,
    pub target: String,
}

impl Visitor for Vec<RefSite> {
    fn visit_ref(&mut self, location: &[Segment], target: &str) {
        self.push(RefSite {
            location: location.to_vec(),
            target: target.to_string(),
        });
    }
}

/// Walks `value` in pre-order, reporting each ref marker to `visitor`.
pub fn walk<V: Visitor + ?Sized>(value: &Value, visitor: &mut V) {
    let mut location = Vec::new();
    walk_node(value, &mut location, visitor);
}

fn walk_node<V: Visitor + ?Sized>(value: &Value, location: &mut Location, visitor: &mut V) {
    match Node::classify(value) {
        Node::Ref { target, map } => {
            visitor.visit_ref(location, target);
            walk_entries(map, location, visitor);
        }
        Node::Map(map) => walk_entries(map, location, visitor),
        Node::Seq(items) => {
            for (idx, item) in items.iter().enumerate() {
                location.push(Segment::Index(idx));
                walk_node(item, location, visitor);
                location.pop();
            }
        }
        Node::Scalar(_) => {}
    }
}

fn walk_entries<V: Visitor + ?Sized>(map: &Mapping, location: &mut Location, visitor: &mut V) {
    for (key, child) in map {
        if is_ref_entry(key, child) {
            continue;
        }
        location.push(Segment::Key(key.clone()));
        walk_node(child, location, visitor);
        location.pop();
    }
}

/// Collects every ref marker in `value`, in document order.
pub fn collect_refs(value: &Value) -> Vec<RefSite> {
    let mut sites = Vec::new();
    walk(value, &mut sites);
    sites
}

/// Renders a location as a JSON Pointer anchor (`#/paths/~1pets/get`).
pub fn location_pointer(location: &[Segment]) -> String {
    let tokens: Vec<String> = location
        .iter()
        .map(|segment| match segment {
            Segment::Index(idx) => idx.to_string(),
            Segment::Key(Value::String(key)) => key.clone(),
            Segment::Key(Value::Number(n)) => n.to_string(),
            Segment::Key(Value::Bool(b)) => b.to_string(),
            Segment::Key(other) => format!("{:?}", other),
        })
        .collect();
    let mut reference = Reference::default();
    reference.set_anchor_path(tokens);
    reference.to_string()
}

/// Offers every `$ref` string in `value` to `rewrite`; `Ok(Some(new))`
/// replaces it. Returns how many refs were replaced.
pub fn rewrite_refs<E, F>(value: &mut Value, rewrite: &mut F) -> Result<usize, E>
where
    F: FnMut(&str) -> Result<Option<String>, E>,
{
    match value {
        Value::Mapping(map) => {
            let mut count = 0;
            for (key, child) in map.iter_mut() {
                if let Value::String(target) = child
                    && key.as_str() == Some(REF_KEY)
                {
                    if let Some(updated) = rewrite(target.as_str())? {
                        *target = updated;
                        count += 1;
                    }
                } else {
                    count += rewrite_refs(child, rewrite)?;
                }
            }
            Ok(count)
        }
        Value::Sequence(items) => {
            let mut count = 0;
            for item in items.iter_mut() {
                count += rewrite_refs(item, rewrite)?;
            }
            Ok(count)
        }
        Value::Tagged(tagged) => rewrite_refs(&mut tagged.value, rewrite),
        _ => Ok(0),
    }
}

fn is_ref_entry(key: &Value, child: &Value) -> bool {
    key.as_str() == Some(REF_KEY) && child.is_string()
}
