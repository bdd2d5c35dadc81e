//! Command-line interface definitions.
//!
//! Defines the argument parser and subcommands using clap's derive API.
//! Each subcommand corresponds to a distinct operation: bundling a
//! specification, inspecting its component registry, or listing the files
//! that would be loaded.

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use openapi_bundle::{CollisionPolicy, Format};
use std::path::PathBuf;

/// Bundle multi-file OpenAPI specifications into a single document.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Print additional diagnostics to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand that reads the specification tree.
#[derive(Debug, ClapArgs)]
pub struct SourceArgs {
    /// Root directory of the specification.
    #[arg(short, long, env = "OPENAPI_BUNDLE_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Glob patterns for directories/files to exclude (e.g., "drafts", "*.bak.yml").
    /// By default, entries starting with `.` are excluded.
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Disable default exclusion of `.` prefixed entries.
    #[arg(long)]
    pub no_default_excludes: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge the specification into one self-contained document.
    Bundle {
        #[command(flatten)]
        source: SourceArgs,

        /// Entrypoint file, relative to the root.
        #[arg(long, env = "OPENAPI_BUNDLE_ENTRYPOINT", default_value = "api.yml")]
        entrypoint: String,

        /// Output file. Existing content is overwritten.
        #[arg(short, long, env = "OPENAPI_BUNDLE_OUTPUT", default_value = "openapi-schema.yml")]
        output: PathBuf,

        /// Output format. Defaults to JSON for `.json` outputs, YAML otherwise.
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// What to do when two files derive the same component name.
        #[arg(long, value_enum, default_value_t = OnCollision::Overwrite)]
        on_collision: OnCollision,

        /// Fail on unresolvable components and refs instead of warning.
        #[arg(long)]
        strict: bool,

        /// Interactively confirm before overwriting an existing output file.
        #[arg(short, long)]
        interactive: bool,

        /// Emit the bundle report as JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },

    /// Print the component registry as a tree.
    Components {
        #[command(flatten)]
        source: SourceArgs,

        /// Entrypoint file, relative to the root.
        #[arg(long, env = "OPENAPI_BUNDLE_ENTRYPOINT", default_value = "api.yml")]
        entrypoint: String,

        /// Maximum tree depth to display (1 = types, 2 = names, 3 = origins).
        #[arg(long)]
        depth: Option<usize>,
    },

    /// List files that would be loaded without processing them.
    Scan {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => Format::Yaml,
            OutputFormat::Json => Format::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnCollision {
    /// Keep the last registered component.
    Overwrite,
    /// Abort the run.
    Error,
}

impl From<OnCollision> for CollisionPolicy {
    fn from(policy: OnCollision) -> Self {
        match policy {
            OnCollision::Overwrite => CollisionPolicy::Overwrite,
            OnCollision::Error => CollisionPolicy::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_bundle_defaults() {
        let args = Args::parse_from(["openapi-bundle", "bundle", "--root", "spec"]);
        let Commands::Bundle {
            source,
            entrypoint,
            format,
            on_collision,
            strict,
            ..
        } = args.command
        else {
            panic!("expected bundle command");
        };
        assert_eq!(source.root, PathBuf::from("spec"));
        assert_eq!(entrypoint, "api.yml");
        assert_eq!(format, None);
        assert_eq!(on_collision, OnCollision::Overwrite);
        assert!(!strict);
    }

    #[test]
    fn parses_collision_policy_and_format() {
        let args = Args::parse_from([
            "openapi-bundle",
            "bundle",
            "--on-collision",
            "error",
            "--format",
            "json",
            "-e",
            "drafts",
        ]);
        let Commands::Bundle {
            source,
            format,
            on_collision,
            ..
        } = args.command
        else {
            panic!("expected bundle command");
        };
        assert_eq!(CollisionPolicy::from(on_collision), CollisionPolicy::Error);
        assert_eq!(format.map(Format::from), Some(Format::Json));
        assert_eq!(source.exclude, vec!["drafts"]);
    }
}
