//! Deferred subtree substitution.
//!
//! Inlining a ref replaces the whole map holding it. Doing that while the
//! tree is being walked would invalidate locations not yet visited and let
//! freshly inlined content be scanned again, so substitutions are queued
//! during the scan and applied afterwards. They are applied in reverse queue
//! order: queues are filled in pre-order, so nested locations are replaced
//! before the map that contains them.

use crate::document::DocumentSet;
use crate::scanner::{Location, Segment};
use serde_yaml::Value;

/// Which tree a queued substitution applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A loaded document, by root-relative key.
    Document(String),
    /// The freshly assembled `components` tree.
    Components,
}

/// A replacement for the node at `location`.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub location: Location,
    pub replacement: Value,
}

#[derive(Debug, Clone, Default)]
pub struct PendingSubstitutions {
    queued: Vec<(Target, Substitution)>,
}

impl PendingSubstitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: Target, location: Location, replacement: Value) {
        self.queued.push((
            target,
            Substitution {
                location,
                replacement,
            },
        ));
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Applies every queued substitution, returning how many landed.
    ///
    /// A substitution whose location no longer exists (because an enclosing
    /// map was itself replaced) is dropped.
    pub fn apply(self, documents: &mut DocumentSet, components: &mut Value) -> usize {
        let mut applied = 0;
        for (target, substitution) in self.queued.into_iter().rev() {
            let root = match &target {
                Target::Document(key) => documents.get_mut(key),
                Target::Components => Some(&mut *components),
            };
            let Some(root) = root else {
                continue;
            };
            if substitute(root, substitution) {
                applied += 1;
            } else {
                tracing::debug!(?target, "dropping substitution under a replaced node");
            }
        }
        applied
    }
}

/// Replaces the node at `substitution.location` inside `root`.
pub fn substitute(root: &mut Value, substitution: Substitution) -> bool {
    match get_mut_at(root, &substitution.location) {
        Some(node) => {
            *node = substitution.replacement;
            true
        }
        None => false,
    }
}

/// Follows `location` from `root`, returning the node there if it exists.
pub fn get_mut_at<'a>(root: &'a mut Value, location: &[Segment]) -> Option<&'a mut Value> {
    let Some((first, rest)) = location.split_first() else {
        return Some(root);
    };

    let child = match (root, first) {
        (Value::Tagged(tagged), _) => return get_mut_at(&mut tagged.value, location),
        (Value::Mapping(map), Segment::Key(key)) => map.get_mut(key)?,
        (Value::Sequence(items), Segment::Index(idx)) => items.get_mut(*idx)?,
        _ => return None,
    };
    get_mut_at(child, rest)
}
