//! Multi-file specification bundler.
//!
//! Merges a tree of documents linked by `$ref` into the entrypoint document in
//! four ordered phases:
//!
//! 1. **Normalize** every ref so its external path is relative to the
//!    specification root (internal refs gain their own document's path), and
//!    register each ref that passes through `components`.
//! 2. **Assemble** a fresh `components` tree from the registry, rewriting the
//!    refs inside it to `#/components/<type>/<name>`.
//! 3. **Dereference** the remaining refs: component refs at usage sites are
//!    rewritten the same way, other external refs are queued for inlining.
//! 4. **Merge** by applying the queued substitutions and folding the assembled
//!    components into the entrypoint.
//!
//! Inlined content is expanded from its source before it is copied, so refs
//! nested inside it are inlined too. A ref that would re-enter content already
//! being expanded is left in place and reported as dangling.

use crate::document::{DocumentSet, Format, is_structured, is_truthy};
use crate::error::{BundleError, Result};
use crate::naming::{derive_local_name, document_key, resolve_external};
use crate::reference::Reference;
use crate::registry::{CollisionPolicy, ComponentEntry, ComponentRegistry};
use crate::report::BundleReport;
use crate::rewriter::{PendingSubstitutions, Substitution, Target, substitute};
use crate::scanner::{collect_refs, location_pointer, rewrite_refs};
use crate::source::{OutputSink, SourceProvider};
use serde_yaml::{Mapping, Value};
use std::path::Path;

const COMPONENTS_KEY: &str = "components";

/// Settings for one bundling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOptions {
    /// Entrypoint path relative to the specification root, e.g. `api.yml`.
    pub entrypoint: String,
    pub collision_policy: CollisionPolicy,
    /// Fail on components that resolve to nothing and on refs that cannot be
    /// inlined, instead of skipping them with a warning.
    pub strict: bool,
}

impl BundleOptions {
    pub fn new(entrypoint: impl Into<String>) -> Self {
        BundleOptions {
            entrypoint: entrypoint.into(),
            collision_policy: CollisionPolicy::default(),
            strict: false,
        }
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The entrypoint as a document key (`./api.yml` -> `api.yml`).
    pub fn entrypoint_key(&self) -> String {
        document_key(Path::new(&self.entrypoint))
    }
}

/// A merged document together with the diagnostics of the run that built it.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub document: Value,
    pub report: BundleReport,
}

impl Bundle {
    pub fn render(&self, format: Format) -> Result<String> {
        format.render(&self.document)
    }
}

/// Loads the tree beneath `root` from `provider` and bundles it.
pub fn bundle_source(
    provider: &impl SourceProvider,
    root: &Path,
    options: &BundleOptions,
) -> Result<Bundle> {
    let documents = DocumentSet::load(provider, root)?;
    bundle(documents, options)
}

/// Bundles `documents` and writes the result to `output` through `sink`.
///
/// The document is fully rendered before the sink is called, so a failing run
/// never leaves partial output behind.
pub fn bundle_to(
    provider: &impl SourceProvider,
    root: &Path,
    options: &BundleOptions,
    sink: &impl OutputSink,
    output: &Path,
    format: Format,
) -> Result<BundleReport> {
    let bundle = bundle_source(provider, root, options)?;
    let rendered = bundle.render(format)?;
    sink.write(output, &rendered)?;
    Ok(bundle.report)
}

/// Runs all four phases over an in-memory document set.
pub fn bundle(mut documents: DocumentSet, options: &BundleOptions) -> Result<Bundle> {
    let entrypoint = options.entrypoint_key();
    let mut report = BundleReport::default();
    report.diagnostics.documents_loaded = documents.len();

    let registry = normalize(&mut documents, options, &mut report)?;
    if !documents.contains(&entrypoint) {
        return Err(BundleError::MissingEntrypoint(entrypoint));
    }

    let mut components = assemble_components(&documents, &registry, options, &mut report)?;
    let pending = dereference(&mut documents, &components, &registry, options, &mut report)?;

    let applied = pending.apply(&mut documents, &mut components);
    tracing::debug!(applied, "applied substitutions");

    let document = merge(&documents, components, &entrypoint)?;
    check_self_contained(&document, &entrypoint, options, &mut report)?;
    Ok(Bundle { document, report })
}

/// Phase 1: rewrites every ref to its root-relative form and registers
/// component refs.
pub fn normalize(
    documents: &mut DocumentSet,
    options: &BundleOptions,
    report: &mut BundleReport,
) -> Result<ComponentRegistry> {
    let entrypoint = options.entrypoint_key();
    let mut registry = ComponentRegistry::new(options.collision_policy);

    for (key, document) in documents.iter_mut() {
        let count = rewrite_refs(document, &mut |raw: &str| {
            let mut reference = parse_in(key, raw)?;
            let root_relative = if reference.is_external() {
                resolve_external(key, reference.external_path())
            } else {
                key.split('/').map(str::to_string).collect()
            };
            reference.set_external_path(root_relative);
            if Reference::parse(&reference.to_string()).is_err() {
                return Err(BundleError::UnaddressableDocument {
                    document: key.to_string(),
                    reference: raw.to_string(),
                });
            }

            if let Some(component_type) = reference.component_type() {
                let name = local_name(&reference, &entrypoint)?;
                let entry = ComponentEntry {
                    component_type: component_type.to_string(),
                    origin: reference.clone(),
                };
                if let Some(collision) = registry.register(&name, entry)? {
                    report.collisions.push(collision);
                }
            }

            Ok::<_, BundleError>(Some(reference.to_string()))
        })?;
        report.diagnostics.refs_normalized += count;
    }

    report.diagnostics.components_registered = registry.len();
    tracing::debug!(
        refs = report.diagnostics.refs_normalized,
        components = registry.len(),
        "normalized refs"
    );
    Ok(registry)
}

/// Phase 2: copies every registered component into a fresh `components` tree
/// and points the refs inside it at their merged names.
pub fn assemble_components(
    documents: &DocumentSet,
    registry: &ComponentRegistry,
    options: &BundleOptions,
    report: &mut BundleReport,
) -> Result<Value> {
    let entrypoint = options.entrypoint_key();
    let mut sections = Mapping::new();

    for (name, entry) in registry.iter() {
        let Some(found) = documents.resolve(&entry.origin).filter(|v| is_truthy(v)) else {
            if options.strict {
                return Err(BundleError::UnresolvedComponent {
                    name: name.to_string(),
                    reference: entry.origin.to_string(),
                });
            }
            tracing::warn!(name, origin = %entry.origin, "component does not resolve, skipping");
            report.record_skipped(name, &entry.origin);
            continue;
        };

        let section_key = Value::from(entry.component_type.as_str());
        if !sections.contains_key(&section_key) {
            sections.insert(section_key.clone(), Value::Mapping(Mapping::new()));
        }
        if let Some(Value::Mapping(section)) = sections.get_mut(&section_key) {
            section.insert(Value::from(name), found.clone());
        }
        report.diagnostics.components_assembled += 1;
    }

    let mut components = Value::Mapping(sections);
    rewrite_refs(&mut components, &mut |raw: &str| {
        internalize(COMPONENTS_KEY, raw, registry, &entrypoint)
    })?;

    tracing::debug!(
        assembled = report.diagnostics.components_assembled,
        skipped = report.diagnostics.components_skipped,
        "assembled components"
    );
    Ok(components)
}

/// Phase 3: rewrites component refs at their usage sites, then scans every
/// document and the assembled components for external refs to inline.
///
/// Nothing is inlined here; the returned substitutions are applied once the
/// scan is complete.
pub fn dereference(
    documents: &mut DocumentSet,
    components: &Value,
    registry: &ComponentRegistry,
    options: &BundleOptions,
    report: &mut BundleReport,
) -> Result<PendingSubstitutions> {
    let entrypoint = options.entrypoint_key();

    for (key, document) in documents.iter_mut() {
        report.diagnostics.refs_rewritten += rewrite_refs(document, &mut |raw: &str| {
            internalize(key, raw, registry, &entrypoint)
        })?;
    }

    let documents: &DocumentSet = documents;
    let inliner = Inliner {
        documents,
        strict: options.strict,
    };
    let mut pending = PendingSubstitutions::new();
    let holders = documents
        .iter()
        .map(|(key, document)| (Target::Document(key.clone()), key.as_str(), document))
        .chain(std::iter::once((Target::Components, COMPONENTS_KEY, components)));

    for (target, holder, tree) in holders {
        for site in collect_refs(tree) {
            let reference = parse_in(holder, &site.target)?;
            if !reference.is_external() {
                continue;
            }

            let mut expanding = Vec::new();
            match inliner.expand(holder, &reference, &mut expanding, &mut report.diagnostics.refs_inlined)? {
                Some(resolved) => {
                    pending.push(target.clone(), site.location, resolved);
                    report.diagnostics.refs_inlined += 1;
                }
                None => tracing::debug!(document = holder, reference = %site.target, "ref cannot be inlined"),
            }
        }
    }

    tracing::debug!(
        rewritten = report.diagnostics.refs_rewritten,
        queued = pending.len(),
        "dereferenced refs"
    );
    Ok(pending)
}

/// Phase 4: folds the assembled components into the entrypoint.
///
/// Components merge per type and then per name; assembled entries win over
/// same-named ones the entrypoint declares. With nothing assembled the
/// entrypoint is returned as is.
pub fn merge(documents: &DocumentSet, components: Value, entrypoint: &str) -> Result<Value> {
    let mut merged = documents
        .get(entrypoint)
        .cloned()
        .ok_or_else(|| BundleError::MissingEntrypoint(entrypoint.to_string()))?;

    let assembled = match components {
        Value::Mapping(sections) if !sections.is_empty() => sections,
        _ => return Ok(merged),
    };

    let Value::Mapping(root) = &mut merged else {
        return Err(BundleError::Parse {
            document: entrypoint.to_string(),
            message: "entrypoint is not a mapping".to_string(),
        });
    };

    let key = Value::from(COMPONENTS_KEY);
    let mut merged_components = match root.get(&key) {
        Some(Value::Mapping(declared)) => declared.clone(),
        _ => Mapping::new(),
    };

    for (component_type, section) in assembled {
        match section {
            Value::Mapping(section)
                if merged_components
                    .get(&component_type)
                    .is_some_and(Value::is_mapping) =>
            {
                if let Some(Value::Mapping(existing)) = merged_components.get_mut(&component_type) {
                    for (name, definition) in section {
                        existing.insert(name, definition);
                    }
                }
            }
            section => {
                merged_components.insert(component_type, section);
            }
        }
    }

    root.insert(key, Value::Mapping(merged_components));
    Ok(merged)
}

/// The merged name of the component `reference` targets.
///
/// Components declared directly in the entrypoint
/// (`<entrypoint>#/components/<type>/<name>`) keep their own name, since the
/// entrypoint's `components` section is carried into the output. Everything
/// else is namespaced by its origin file.
fn local_name(reference: &Reference, entrypoint: &str) -> Result<String> {
    if let [components, _, name] = reference.anchor_path()
        && components == COMPONENTS_KEY
        && reference.external_pathname() == entrypoint
    {
        return Ok(name.clone());
    }
    derive_local_name(reference)
}

/// Rewrites a normalized ref to its in-document form, if it has one.
///
/// Component refs become `#/components/<type>/<name>`; refs into the
/// entrypoint's own tree become plain internal pointers. Other refs are left
/// for inlining.
fn internalize(
    holder: &str,
    raw: &str,
    registry: &ComponentRegistry,
    entrypoint: &str,
) -> Result<Option<String>> {
    let mut reference = parse_in(holder, raw)?;
    if !reference.is_external() {
        return Ok(None);
    }

    if reference.targets_component() {
        let name = local_name(&reference, entrypoint)?;
        return registry.internal_ref(&name, raw).map(Some);
    }

    if reference.external_pathname() == entrypoint && reference.has_anchor() {
        reference.clear_external_path();
        return Ok(Some(reference.to_string()));
    }

    Ok(None)
}

/// Builds the replacement for an inlined ref from the current documents.
struct Inliner<'a> {
    documents: &'a DocumentSet,
    strict: bool,
}

impl Inliner<'_> {
    /// Copies the target of `reference` with every external ref nested in it
    /// expanded as well.
    ///
    /// `None` means the target is missing, is not a map or sequence, or is
    /// already being expanded further up (a cycle). Nested refs that come back
    /// `None` stay in the copy.
    fn expand(
        &self,
        holder: &str,
        reference: &Reference,
        expanding: &mut Vec<String>,
        inlined: &mut usize,
    ) -> Result<Option<Value>> {
        let key = reference.to_string();
        if expanding.contains(&key) {
            tracing::warn!(reference = %key, "circular ref, leaving it in place");
            return Ok(None);
        }

        let Some(found) = self.documents.resolve(reference).filter(|v| is_structured(v)) else {
            if self.strict {
                return Err(BundleError::DereferenceTargetMissing {
                    document: holder.to_string(),
                    reference: key,
                });
            }
            return Ok(None);
        };

        let origin = reference.external_pathname();
        let mut copy = found.clone();
        expanding.push(key);
        for site in collect_refs(found).into_iter().rev() {
            let nested = parse_in(&origin, &site.target)?;
            if !nested.is_external() {
                continue;
            }
            if let Some(replacement) = self.expand(&origin, &nested, expanding, inlined)?
                && substitute(
                    &mut copy,
                    Substitution {
                        location: site.location,
                        replacement,
                    },
                )
            {
                *inlined += 1;
            }
        }
        expanding.pop();

        Ok(Some(copy))
    }
}

/// Records every ref in the merged document that still points at another
/// file. Under strict mode the first one is an error.
fn check_self_contained(
    document: &Value,
    entrypoint: &str,
    options: &BundleOptions,
    report: &mut BundleReport,
) -> Result<()> {
    for site in collect_refs(document) {
        if !parse_in(entrypoint, &site.target)?.is_external() {
            continue;
        }
        if options.strict {
            return Err(BundleError::DereferenceTargetMissing {
                document: entrypoint.to_string(),
                reference: site.target,
            });
        }
        let location = location_pointer(&site.location);
        tracing::warn!(%location, reference = %site.target, "ref left pointing outside the bundle");
        report.record_dangling(entrypoint, &location, &site.target);
    }
    Ok(())
}

fn parse_in(document: &str, raw: &str) -> Result<Reference> {
    Reference::parse(raw).map_err(|source| BundleError::RefSyntax {
        document: document.to_string(),
        source,
    })
}
