//! openapi-bundle library for merging multi-file OpenAPI specifications.
//!
//! A specification split across many YAML/JSON files linked with `$ref` is
//! merged into its entrypoint document, leaving only internal references. The
//! result is suitable for tools that expect a single self-contained document,
//! such as type generators.
//!
//! The bundler works in four phases:
//!
//! 1. **Normalize**: rewrite every ref relative to the specification root and
//!    register the components refs point at
//! 2. **Assemble**: copy registered components into one `components` tree under
//!    names derived from their origin file (`common.yml#/.../Error` -> `common_Error`)
//! 3. **Dereference**: point component refs at the assembled names and queue
//!    other external refs for inlining, expanding nested refs first
//! 4. **Merge**: apply the queued inlining, fold the components into the
//!    entrypoint and report any ref still pointing at another file
//!
//! # Example
//!
//! ```no_run
//! use openapi_bundle::{BundleOptions, Format, FsSource, bundle_source};
//! use std::path::Path;
//!
//! let source = FsSource::new("./spec");
//! let options = BundleOptions::new("api.yml");
//! let bundle = bundle_source(&source, Path::new(""), &options).unwrap();
//!
//! println!("{}", bundle.render(Format::Yaml).unwrap());
//! println!("inlined {} refs", bundle.report.diagnostics.refs_inlined);
//! ```

pub mod bundler;
pub mod document;
pub mod error;
pub mod naming;
pub mod reference;
pub mod registry;
pub mod report;
pub mod rewriter;
pub mod scanner;
pub mod source;

// Re-export commonly used types at crate root
pub use bundler::{Bundle, BundleOptions, bundle, bundle_source, bundle_to};
pub use document::{DocumentSet, Format};
pub use error::{BundleError, RefSyntaxError, SourceError};
pub use reference::Reference;
pub use registry::{CollisionPolicy, ComponentRegistry};
pub use report::BundleReport;
pub use source::{FsSink, FsSource, MemorySource, OutputSink, SourceProvider};
