//! Component registry.
//!
//! Maps each derived local component name to the component type and the
//! normalized ref it originates from. Built once while refs are normalized and
//! read-only afterwards. Two different origins deriving the same name are
//! handled by an explicit [`CollisionPolicy`].

use crate::error::{BundleError, Result};
use crate::reference::Reference;
use colored::Colorize;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// What to do when two different origins derive the same local name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// The later registration replaces the earlier one.
    #[default]
    Overwrite,
    /// Abort the run with [`BundleError::NameCollision`].
    Error,
}

/// Where a registered component comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentEntry {
    /// Section under `components`, e.g. `schemas` or `responses`.
    pub component_type: String,
    /// Normalized, root-relative ref to the definition.
    pub origin: Reference,
}

/// A registration that replaced an entry with a different origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub name: String,
    pub replaced: Reference,
    pub by: Reference,
}

#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    policy: CollisionPolicy,
    entries: Vec<(String, ComponentEntry)>,
    index: HashMap<String, usize>,
}

impl ComponentRegistry {
    pub fn new(policy: CollisionPolicy) -> Self {
        ComponentRegistry {
            policy,
            ..Default::default()
        }
    }

    /// Registers `entry` under `name`.
    ///
    /// Re-registering the same origin is a no-op. A different origin is a
    /// collision: with [`CollisionPolicy::Overwrite`] it replaces the old entry
    /// in place and is returned, with [`CollisionPolicy::Error`] it fails.
    pub fn register(&mut self, name: &str, entry: ComponentEntry) -> Result<Option<Collision>> {
        let Some(&idx) = self.index.get(name) else {
            self.index.insert(name.to_string(), self.entries.len());
            self.entries.push((name.to_string(), entry));
            return Ok(None);
        };

        let existing = &mut self.entries[idx].1;
        if existing.origin == entry.origin {
            return Ok(None);
        }

        match self.policy {
            CollisionPolicy::Error => Err(BundleError::NameCollision {
                name: name.to_string(),
                first: existing.origin.to_string(),
                second: entry.origin.to_string(),
            }),
            CollisionPolicy::Overwrite => {
                tracing::warn!(
                    name,
                    replaced = %existing.origin,
                    by = %entry.origin,
                    "component name collision, last registration wins"
                );
                let replaced = std::mem::replace(existing, entry);
                Ok(Some(Collision {
                    name: name.to_string(),
                    replaced: replaced.origin,
                    by: self.entries[idx].1.origin.clone(),
                }))
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ComponentEntry> {
        self.index.get(name).map(|&idx| &self.entries[idx].1)
    }

    /// Looks up `name` on behalf of `reference`, failing if it was never registered.
    pub fn lookup(&self, name: &str, reference: &str) -> Result<&ComponentEntry> {
        self.get(name)
            .ok_or_else(|| BundleError::UnregisteredComponent {
                reference: reference.to_string(),
                name: name.to_string(),
            })
    }

    /// The purely internal ref `#/components/<type>/<name>` for a registered name.
    pub fn internal_ref(&self, name: &str, reference: &str) -> Result<String> {
        let entry = self.lookup(name, reference)?;
        Ok(Reference::component(&entry.component_type, name).to_string())
    }

    /// Entries in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Groups registered names by component type, both sorted.
    pub fn by_type(&self) -> BTreeMap<&str, BTreeMap<&str, &Reference>> {
        let mut grouped: BTreeMap<&str, BTreeMap<&str, &Reference>> = BTreeMap::new();
        for (name, entry) in self.iter() {
            grouped
                .entry(entry.component_type.as_str())
                .or_default()
                .insert(name, &entry.origin);
        }
        grouped
    }
}

/// Prints the registry as an indented `type -> name -> origin` tree to stdout.
///
/// `max_depth` of 1 prints only component types, 2 adds names, 3 or more
/// adds origins.
pub fn print_tree(registry: &ComponentRegistry, max_depth: usize) {
    if max_depth == 0 {
        return;
    }

    for (component_type, names) in registry.by_type() {
        println!("{}", component_type.bold());
        if max_depth < 2 {
            continue;
        }
        for (name, origin) in names {
            if max_depth < 3 {
                println!("  {}", name);
            } else {
                println!("  {} {}", name, origin.to_string().dimmed());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(component_type: &str, origin: &str) -> ComponentEntry {
        ComponentEntry {
            component_type: component_type.to_string(),
            origin: Reference::parse(origin).unwrap(),
        }
    }

    #[test]
    fn registers_and_looks_up_entries() {
        let mut registry = ComponentRegistry::new(CollisionPolicy::Overwrite);
        registry
            .register("common_Error", entry("schemas", "common.yml#/components/schemas/Error"))
            .unwrap();

        let found = registry.lookup("common_Error", "x").unwrap();
        assert_eq!(found.component_type, "schemas");
        assert_eq!(
            registry.internal_ref("common_Error", "x").unwrap(),
            "#/components/schemas/common_Error"
        );
    }

    #[test]
    fn same_origin_twice_is_not_a_collision() {
        let mut registry = ComponentRegistry::new(CollisionPolicy::Error);
        let origin = "pet.yml#/components/schemas/Pet";
        assert_eq!(registry.register("pet_Pet", entry("schemas", origin)).unwrap(), None);
        assert_eq!(registry.register("pet_Pet", entry("schemas", origin)).unwrap(), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn overwrite_policy_keeps_last_registration() {
        let mut registry = ComponentRegistry::new(CollisionPolicy::Overwrite);
        registry
            .register("common_Id", entry("schemas", "a/common.yml#/components/schemas/Id"))
            .unwrap();
        registry
            .register("common_Page", entry("schemas", "a/common.yml#/components/schemas/Page"))
            .unwrap();
        let collision = registry
            .register("common_Id", entry("parameters", "b/common.yml#/components/parameters/Id"))
            .unwrap()
            .unwrap();

        assert_eq!(collision.replaced.to_string(), "a/common.yml#/components/schemas/Id");
        assert_eq!(collision.by.to_string(), "b/common.yml#/components/parameters/Id");
        assert_eq!(registry.get("common_Id").unwrap().component_type, "parameters");
        // replaced in place, first-registration order is kept
        let names: Vec<_> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["common_Id", "common_Page"]);
    }

    #[test]
    fn error_policy_rejects_collisions() {
        let mut registry = ComponentRegistry::new(CollisionPolicy::Error);
        registry
            .register("common_Id", entry("schemas", "a/common.yml#/components/schemas/Id"))
            .unwrap();
        let err = registry
            .register("common_Id", entry("schemas", "b/common.yml#/components/schemas/Id"))
            .unwrap_err();
        assert!(matches!(err, BundleError::NameCollision { ref name, .. } if name == "common_Id"));
    }

    #[test]
    fn unknown_names_are_typed_errors() {
        let registry = ComponentRegistry::default();
        let err = registry
            .lookup("ghost_Thing", "ghost.yml#/components/schemas/Thing")
            .unwrap_err();
        assert!(matches!(
            err,
            BundleError::UnregisteredComponent { ref name, .. } if name == "ghost_Thing"
        ));
    }

    #[test]
    fn groups_names_by_type() {
        let mut registry = ComponentRegistry::default();
        registry
            .register("pet_Pet", entry("schemas", "pet.yml#/components/schemas/Pet"))
            .unwrap();
        registry
            .register("common_NotFound", entry("responses", "common.yml#/components/responses/NotFound"))
            .unwrap();
        registry
            .register("common_Error", entry("schemas", "common.yml#/components/schemas/Error"))
            .unwrap();

        let grouped = registry.by_type();
        let types: Vec<_> = grouped.keys().copied().collect();
        assert_eq!(types, vec!["responses", "schemas"]);
        let schemas: Vec<_> = grouped["schemas"].keys().copied().collect();
        assert_eq!(schemas, vec!["common_Error", "pet_Pet"]);
    }
}
