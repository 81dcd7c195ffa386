use anyhow::{Context, Result};
use artifact_patcher::catalog::{load_catalog, PatchCatalog, PatchDescriptor};
use artifact_patcher::options::{self, PatchingOptions, SelectionDirectives};
use artifact_patcher::{
    read_package_metadata, ApplicationDriver, CommandEngine, DirectoryMerger, FileMergeTrigger,
    PackageMetadata, SelectionEngine, TracingSink,
};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter, e.g. `artifact_patcher=trace`.
const LOG_ENV: &str = "ARTIFACT_PATCHER_LOG";

#[derive(Parser)]
#[command(name = "artifact-patcher")]
#[command(about = "Select and apply compatible patches to a packaged artifact", long_about = None)]
#[command(version)]
struct Cli {
    /// Show every selection decision (trace level)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List patches in the catalog and their compatibility
    List {
        /// Patch catalog file or directory
        #[arg(short, long, default_value = "patches")]
        patches: PathBuf,

        /// Only show patches selection would consider for this package
        /// (declared compatible, or without compatibility metadata)
        #[arg(long)]
        package: Option<String>,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which patches would be applied, without applying them
    Select {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Merge files and apply the selected patches to an artifact
    Apply {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Engine command, run once per patch as `<CMD> <patch> <artifact>`
        #[arg(last = true, value_name = "CMD")]
        engine: Vec<String>,
    },
}

#[derive(Args)]
struct SelectionArgs {
    /// Patch catalog file or directory
    #[arg(short, long, default_value = "patches")]
    patches: PathBuf,

    /// Artifact directory (its package.toml identifies the target)
    #[arg(short, long)]
    artifact: Option<PathBuf>,

    /// Target package name, overrides package.toml
    #[arg(long)]
    package_name: Option<String>,

    /// Target package version, overrides package.toml
    #[arg(long)]
    package_version: Option<String>,

    /// TOML file with a [patching] section
    #[arg(short, long)]
    options: Option<PathBuf>,

    /// Exclude a patch by name
    #[arg(short, long = "exclude", value_name = "PATCH")]
    exclude: Vec<String>,

    /// Include a patch by name, even if it is excluded by default
    #[arg(short, long = "include", value_name = "PATCH")]
    include: Vec<String>,

    /// Only apply patches named with --include
    #[arg(long)]
    exclusive: bool,

    /// Ignore version compatibility
    #[arg(long)]
    experimental: bool,

    /// File or directory to merge into the artifact
    #[arg(short, long = "merge", value_name = "FILE")]
    merge: Vec<PathBuf>,
}

/// Everything a run needs, validated up front.
struct Run {
    catalog: PatchCatalog,
    target: PackageMetadata,
    directives: SelectionDirectives,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::List {
            patches,
            package,
            json,
        } => cmd_list(&patches, package.as_deref(), json),

        Commands::Select { selection } => cmd_select(selection),

        Commands::Apply { selection, engine } => cmd_apply(selection, engine),
    }
}

fn init_tracing(verbose: u8) {
    let default = if verbose == 0 { "info" } else { "trace" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the target, either from flags or from the artifact's package.toml.
fn resolve_target(args: &SelectionArgs) -> Result<PackageMetadata> {
    if let (Some(name), Some(version)) = (&args.package_name, &args.package_version) {
        return Ok(PackageMetadata::new(name.clone(), version.clone()));
    }

    let Some(artifact) = &args.artifact else {
        anyhow::bail!(
            "No target package. Pass --artifact <DIR> with a package.toml, or both --package-name and --package-version"
        );
    };

    let mut target = read_package_metadata(artifact)?;
    if let Some(name) = &args.package_name {
        target.package_name = name.clone();
    }
    if let Some(version) = &args.package_version {
        target.package_version = version.clone();
    }
    Ok(target)
}

/// Load the catalog, resolve the target and freeze the directives.
///
/// Any problem here is fatal: nothing is selected until all inputs are valid.
fn prepare(args: SelectionArgs) -> Result<Run> {
    let catalog = load_catalog(&args.patches)?;
    let target = resolve_target(&args)?;

    let mut patching = match &args.options {
        Some(path) => options::load_from_path(path)?,
        None => PatchingOptions::default(),
    };
    patching.merge(PatchingOptions {
        exclude: args.exclude,
        include: args.include,
        exclusive: args.exclusive,
        experimental: args.experimental,
        merge: args.merge,
    });
    let directives = patching.resolve(&catalog, &mut TracingSink)?;

    Ok(Run {
        catalog,
        target,
        directives,
    })
}

fn cmd_list(patches: &Path, package: Option<&str>, json: bool) -> Result<()> {
    let catalog = load_catalog(patches)?;
    let listed: Vec<&PatchDescriptor> = catalog
        .patches
        .iter()
        .filter(|patch| package.map_or(true, |name| patch.is_candidate_for(name)))
        .collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&listed).context("failed to serialize catalog")?
        );
        return Ok(());
    }

    for patch in &listed {
        let marker = if patch.deprecated.is_some() {
            "⊘".red()
        } else if patch.include_by_default {
            "✓".green()
        } else {
            "○".yellow()
        };
        println!("{} {}", marker, patch.name.bold());

        if let Some(description) = &patch.description {
            println!("  {}", description);
        }
        if let Some(deprecation) = &patch.deprecated {
            let mut line = format!("deprecated: {}", deprecation.reason);
            if let Some(replacement) = &deprecation.replacement {
                line.push_str(&format!(" (use {replacement})"));
            }
            println!("  {}", line.red());
        }
        match &patch.compatible_packages {
            None => println!("  {}", "no compatibility metadata".dimmed()),
            Some(packages) => {
                for compatible in packages {
                    let versions = if compatible.accepts_any_version() {
                        "any version".to_string()
                    } else {
                        compatible
                            .versions
                            .iter()
                            .map(String::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    };
                    println!(
                        "  {} {}",
                        compatible.package_name.cyan(),
                        versions.dimmed()
                    );
                }
            }
        }
    }

    println!();
    println!("{} of {} patches", listed.len(), catalog.len());
    Ok(())
}

fn cmd_select(args: SelectionArgs) -> Result<()> {
    let run = prepare(args)?;
    let mut sink = TracingSink;

    let selected =
        SelectionEngine::new(&run.target, &run.directives).select(&run.catalog.patches, &mut sink);

    println!("Target: {}", run.target);
    println!(
        "Selected {} of {} patches:",
        selected.len(),
        run.catalog.len()
    );
    for patch in &selected {
        println!("  {} {}", "✓".green(), patch.name);
    }
    Ok(())
}

fn cmd_apply(args: SelectionArgs, engine: Vec<String>) -> Result<()> {
    let Some(artifact) = args.artifact.clone() else {
        anyhow::bail!("apply requires --artifact <DIR>");
    };
    let engine = CommandEngine::new(&engine, &artifact)?;
    let run = prepare(args)?;
    let mut sink = TracingSink;

    println!("Target: {}", run.target);
    println!("Artifact: {}", artifact.display());
    println!();

    // 1. Selection is frozen before anything touches the artifact
    let selected =
        SelectionEngine::new(&run.target, &run.directives).select(&run.catalog.patches, &mut sink);

    // 2. Merge auxiliary files
    FileMergeTrigger::new(DirectoryMerger::new(&artifact))
        .merge_all(&run.directives.merge_files, &mut sink)
        .context("merging files into the artifact failed")?;

    // 3. Apply
    let report = ApplicationDriver::new(engine).apply(&selected, &mut sink);

    println!("{}", "Summary:".bold());
    println!("  {} succeeded", format!("{}", report.succeeded()).green());
    println!("  {} failed", format!("{}", report.failed()).red());
    println!(
        "  {} skipped",
        format!("{}", run.catalog.len() - selected.len()).cyan()
    );

    if report.has_failures() {
        for (patch, cause) in report.failures() {
            eprintln!("{} {}: {}", "✗".red(), patch.name, cause.message);
        }
        std::process::exit(1);
    }

    Ok(())
}
