//! openapi-bundle: Merge multi-file OpenAPI specifications into one document.
//!
//! This tool loads every YAML/JSON file beneath a specification root, merges
//! the files reachable through `$ref` into the entrypoint, and writes a single
//! document whose refs are all internal.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands, SourceArgs};
use colored::Colorize;
use dialoguer::Confirm;
use openapi_bundle::bundler::{BundleOptions, bundle_to, normalize};
use openapi_bundle::naming::root_relative;
use openapi_bundle::registry::print_tree;
use openapi_bundle::{BundleReport, DocumentSet, Format, FsSink, FsSource, SourceProvider};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Bundle {
            source,
            entrypoint,
            output,
            format,
            on_collision,
            strict,
            interactive,
            json,
        } => {
            let options = BundleOptions::new(entrypoint)
                .with_collision_policy(on_collision.into())
                .with_strict(strict);
            let format = format
                .map(Format::from)
                .unwrap_or_else(|| output_format(&output));
            cmd_bundle(&source, &options, &output, format, interactive, json, args.verbose)
        }
        Commands::Components {
            source,
            entrypoint,
            depth,
        } => cmd_components(&source, &entrypoint, depth),
        Commands::Scan { source } => cmd_scan(&source),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "openapi_bundle=debug"
    } else {
        "openapi_bundle=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// JSON for `.json` outputs, YAML for everything else.
fn output_format(output: &Path) -> Format {
    match Format::from_path(output) {
        Some(Format::Json) => Format::Json,
        _ => Format::Yaml,
    }
}

fn build_source(args: &SourceArgs, extra_excludes: &[String]) -> Result<FsSource> {
    let patterns: Vec<String> = args.exclude.iter().chain(extra_excludes).cloned().collect();
    let source = FsSource::new(&args.root)
        .with_excludes(&patterns)
        .context("Invalid exclude pattern")?
        .with_default_excludes(!args.no_default_excludes);
    Ok(source)
}

/// A previous bundle written inside the root would otherwise be loaded as a
/// source document on the next run.
fn output_exclude(root: &Path, output: &Path) -> Option<String> {
    let root = std::fs::canonicalize(root).ok()?;
    let output = std::fs::canonicalize(output).ok()?;
    root_relative(&root, &output).map(|relative| glob::Pattern::escape(&relative))
}

fn cmd_bundle(
    args: &SourceArgs,
    options: &BundleOptions,
    output: &Path,
    format: Format,
    interactive: bool,
    json_output: bool,
    verbose: bool,
) -> Result<()> {
    if interactive && output.exists() {
        let proceed = Confirm::new()
            .with_prompt(format!("Overwrite {}?", output.display()))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !proceed {
            println!("{} Output left untouched", "info:".blue().bold());
            return Ok(());
        }
    }

    let extra: Vec<String> = output_exclude(&args.root, output).into_iter().collect();
    let source = build_source(args, &extra)?;

    let report = bundle_to(&source, Path::new(""), options, &FsSink, output, format)
        .with_context(|| format!("Failed to bundle {}", args.root.join(&options.entrypoint).display()))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_bundle_report(&report, output, verbose);
    }

    Ok(())
}

fn cmd_components(args: &SourceArgs, entrypoint: &str, depth: Option<usize>) -> Result<()> {
    let source = build_source(args, &[])?;
    let mut documents = DocumentSet::load(&source, Path::new(""))
        .with_context(|| format!("Failed to load {}", args.root.display()))?;

    let options = BundleOptions::new(entrypoint);
    let mut report = BundleReport::default();
    let registry = normalize(&mut documents, &options, &mut report)?;

    if registry.is_empty() {
        println!("{} No component refs found", "info:".blue().bold());
        return Ok(());
    }
    print_tree(&registry, depth.unwrap_or(usize::MAX));
    Ok(())
}

fn cmd_scan(args: &SourceArgs) -> Result<()> {
    let source = build_source(args, &[])?;
    let files: Vec<PathBuf> = source
        .list(Path::new(""))
        .with_context(|| format!("Failed to list {}", args.root.display()))?
        .into_iter()
        .filter(|path| Format::from_path(path).is_some())
        .collect();

    println!("Would load {} files:", files.len());
    for file in files {
        println!("  {}", file.display());
    }

    Ok(())
}

fn print_bundle_report(report: &BundleReport, output: &Path, verbose: bool) {
    let d = &report.diagnostics;

    if verbose {
        println!(
            "\n{} Documents: {}, Refs normalized: {}",
            "Diagnostics:".bold(),
            d.documents_loaded,
            d.refs_normalized
        );
        println!(
            "             Components: {} registered, {} assembled, {} skipped",
            d.components_registered, d.components_assembled, d.components_skipped
        );
        println!(
            "             Refs: {} rewritten, {} inlined, {} dangling",
            d.refs_rewritten, d.refs_inlined, d.dangling_refs
        );
    }

    for collision in &report.collisions {
        println!(
            "  {} {} {} {}",
            "overwrote".yellow(),
            collision.name.bold(),
            collision.replaced.to_string().red(),
            format!("-> {}", collision.by).green()
        );
    }
    for skipped in &report.skipped {
        println!(
            "  {} {} {}",
            "skipped".yellow(),
            skipped.name.bold(),
            format!("({} did not resolve)", skipped.origin).dimmed()
        );
    }
    for dangling in &report.dangling {
        println!(
            "  {} {} {}",
            "dangling".yellow(),
            dangling.reference.red(),
            format!("at {}", dangling.location).dimmed()
        );
    }

    let status = if report.is_clean() {
        "ok:".green().bold()
    } else {
        "warn:".yellow().bold()
    };
    println!(
        "{} Wrote {} ({} components, {} refs inlined)",
        status,
        output.display(),
        d.components_assembled,
        d.refs_inlined
    );
}
