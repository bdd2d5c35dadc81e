//! Error taxonomy for a bundling run.
//!
//! Every error aborts the run; nothing is retried and no output is written.
//! Collaborator failures (listing or reading sources, writing output) are kept
//! in their own [`SourceError`] so callers can tell I/O problems apart from
//! problems in the specification itself.

use std::path::PathBuf;
use thiserror::Error;

/// A `$ref` string that does not match the external-path/anchor grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid $ref '{reference}'")]
pub struct RefSyntaxError {
    pub reference: String,
}

/// Failures raised by source providers and output sinks.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("source path '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("{document}: {source}")]
    RefSyntax {
        document: String,
        #[source]
        source: RefSyntaxError,
    },

    #[error("$ref '{reference}' in {document} resolves to a path that cannot be written as a $ref")]
    UnaddressableDocument { document: String, reference: String },

    #[error("spec entrypoint file '{0}' not found")]
    MissingEntrypoint(String),

    #[error("$ref '{reference}' targets component '{name}' which was never registered")]
    UnregisteredComponent { reference: String, name: String },

    #[error("component '{name}' ({reference}) does not resolve to a value")]
    UnresolvedComponent { name: String, reference: String },

    #[error("$ref '{reference}' in {document} does not resolve to a structured value")]
    DereferenceTargetMissing { document: String, reference: String },

    #[error("component name '{name}' is derived from both {first} and {second}")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("$ref '{0}' is not external")]
    NotExternal(String),

    #[error("$ref '{0}' has no anchor to name a component after")]
    MissingAnchor(String),

    #[error("failed to parse {document}: {message}")]
    Parse { document: String, message: String },

    #[error("failed to serialize bundled document: {0}")]
    Serialize(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

pub type Result<T, E = BundleError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_syntax_error_names_the_document() {
        let err = BundleError::RefSyntax {
            document: "paths/pets.yml".to_string(),
            source: RefSyntaxError {
                reference: "http://x#/a".to_string(),
            },
        };
        assert_eq!(err.to_string(), "paths/pets.yml: invalid $ref 'http://x#/a'");
    }

    #[test]
    fn source_errors_convert_into_bundle_errors() {
        let err: BundleError = SourceError::NotADirectory(PathBuf::from("api.yml")).into();
        assert!(matches!(err, BundleError::Source(SourceError::NotADirectory(_))));
        assert_eq!(err.to_string(), "source path 'api.yml' is not a directory");
    }
}
