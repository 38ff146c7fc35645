use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use fencefmt_lib::code_block_tools::{CodeBlockFormatter, Family, WriteMode};
use fencefmt_lib::config::{self, CONFIG_FILE_NAME, Config};
use fencefmt_lib::exit_codes;
use fencefmt_lib::file_processor::{find_markdown_files, process_files};
use fencefmt_lib::hook::{self, Skip};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (default: nearest .fencefmt.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format the Markdown file named in an editor hook payload read from stdin
    Hook,
    /// Format code blocks in Markdown files
    Fmt(FmtArgs),
    /// Create a default .fencefmt.toml in the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct FmtArgs {
    /// Files or directories to format
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Report files that would change without writing them
    #[arg(long)]
    check: bool,

    /// Skip the whole-document formatter
    #[arg(long)]
    no_document_formatter: bool,

    /// Only format these families (repeatable)
    #[arg(long, value_name = "FAMILY")]
    only: Vec<Family>,

    /// Do not respect .gitignore files when walking directories
    #[arg(long)]
    no_gitignore: bool,
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Commands::Hook => {
            run_hook(&cli);
            Ok(exit_codes::SUCCESS)
        }
        Commands::Fmt(args) => run_fmt(&cli, args),
        Commands::Init { force } => run_init(&cli, *force),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{}: {e:#}", "Error".red().bold());
            exit_codes::exit::tool_error();
        }
    }
}

/// Hook mode never fails: every problem is logged and the process exits 0.
fn run_hook(cli: &Cli) {
    let mut payload = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut payload) {
        log::warn!("Could not read hook payload: {e}");
        return;
    }

    let path = match hook::markdown_target(&payload) {
        Ok(path) => path,
        Err(Skip::InvalidPayload(e)) => {
            log::debug!("Ignoring hook payload that is not valid JSON: {e}");
            return;
        }
        Err(skip) => {
            log::debug!("Nothing to format: {skip:?}");
            return;
        }
    };

    let start = path.parent().unwrap_or(Path::new("."));
    let config = Config::resolve(cli.config.as_deref(), start).unwrap_or_else(|e| {
        log::warn!("{e}; using default configuration");
        Config::default()
    });

    let formatter = match CodeBlockFormatter::from_config(&config.code_blocks) {
        Ok(formatter) => formatter,
        Err(e) => {
            log::warn!("Invalid fence aliases in configuration: {e}");
            return;
        }
    };

    // Diagnostics are logged by the formatter itself
    let outcome = formatter.format_file(&path, WriteMode::Write);
    log::debug!(
        "{}: {} of {} block(s) changed",
        path.display(),
        outcome.blocks_changed,
        outcome.blocks_found
    );
}

fn run_fmt(cli: &Cli, args: &FmtArgs) -> Result<i32> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let mut config = Config::resolve(cli.config.as_deref(), &cwd)?;
    if let Some(source) = &config.source {
        log::debug!("Loaded configuration from {}", source.display());
    }

    if args.no_document_formatter {
        config.code_blocks.document.enabled = false;
    }
    if !args.only.is_empty() {
        for family in Family::ALL {
            config.code_blocks.families.get_mut(family).enabled = args.only.contains(&family);
        }
    }

    let files = find_markdown_files(&args.paths, !args.no_gitignore).context("Failed to find Markdown files")?;
    if files.is_empty() {
        bail!("No Markdown files found");
    }

    let formatter =
        CodeBlockFormatter::from_config(&config.code_blocks).context("Invalid fence aliases in configuration")?;
    let mode = if args.check { WriteMode::Check } else { WriteMode::Write };

    let summary = process_files(&formatter, &files, mode, |path, outcome| {
        if cli.quiet {
            return;
        }
        if outcome.written {
            println!("{} {}", "Formatted:".green().bold(), path.display());
        } else if outcome.changed && args.check {
            println!("{} {}", "Would reformat:".yellow().bold(), path.display());
        } else if outcome.changed {
            println!("{} {}", "Not written:".red().bold(), path.display());
        }
    });

    if !cli.quiet {
        let verb = if args.check { "would change" } else { "changed" };
        println!(
            "{} {} of {} file(s) {verb} ({} of {} block(s)), {} warning(s)",
            "Summary:".bold(),
            summary.files_changed,
            summary.files,
            summary.blocks_changed,
            summary.blocks_found,
            summary.diagnostics,
        );
    }

    if args.check && summary.files_changed > 0 {
        Ok(exit_codes::CHANGES_NEEDED)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

fn run_init(cli: &Cli, force: bool) -> Result<i32> {
    let path = cli.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    config::create_default_config(&path, force)?;
    if !cli.quiet {
        println!("Created default configuration file: {}", path.display());
    }
    Ok(exit_codes::SUCCESS)
}
