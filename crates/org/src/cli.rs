use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use episode_org::{
    digest_with_progress, CheckError, CheckEvent, CheckOutcome, Checker, FileCheck, ImportError,
    Importer, Progress, Series,
};
use episode_org_core::{parse_algorithms, DEFAULT_CHUNK_SIZE};

const TICK_MS: u64 = 80;

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(":: {spinner} {msg:<24} ━{bar:30}━ {bytes}/{total_bytes} | ETA {eta}")
        .expect("static progress template")
        .tick_chars("▏▎▍▌▋▊▉█▉▋▌▍▎")
        .progress_chars("━━░")
}

/// Byte progress bar over the file currently being digested.
struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(bar_style());
        pb.enable_steady_tick(Duration::from_millis(TICK_MS));
        Self { pb }
    }

    /// Prints above the bar; works the same when stderr is not a terminal.
    fn say(&self, msg: impl AsRef<str>) {
        self.pb.suspend(|| eprintln!("{}", msg.as_ref()));
    }

    fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl Progress for BarProgress {
    fn start_file(&self, path: &Path, len: u64) {
        self.pb.reset();
        self.pb.set_length(len);
        self.pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
    }

    fn advance(&self, bytes: u64) {
        self.pb.inc(bytes);
    }
}

#[derive(Parser)]
#[command(name = "org")]
#[command(version)]
#[command(about = "Import and verify numbered episode files in a series directory")]
struct Cli {
    #[arg(
        short = 'C',
        long,
        global = true,
        help = "Series directory [default: current dir]"
    )]
    directory: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Show debug logging")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename files into the series naming scheme and record their SHA-1
    Import {
        #[arg(
            short = 'n',
            value_parser = clap::value_parser!(u64).range(1..),
            help = "Episode number of the first file [default: next in series]"
        )]
        start: Option<u64>,
        #[arg(long, help = "Run all checks but do not move anything")]
        dry_run: bool,
        #[arg(required = true, help = "Files to import, in episode order")]
        files: Vec<PathBuf>,
    },
    /// Verify the series manifest and list files it does not cover
    Check,
    /// Print CRC-32 and/or SHA-1 digests of files
    Hash {
        #[arg(
            short,
            long = "algorithm",
            value_delimiter = ',',
            default_value = "sha1",
            help = "Digest algorithms (crc32, sha1)"
        )]
        algorithms: Vec<String>,
        #[arg(required = true, help = "Files to digest")]
        files: Vec<PathBuf>,
    },
    /// Show the naming scheme derived for the series
    Status,
    /// Generate shell completions
    Completions {
        #[arg(help = "Shell to generate for (bash, zsh, fish, powershell)")]
        shell: Shell,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let dir = match cli.directory {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    match cli.command {
        Commands::Import {
            start,
            dry_run,
            files,
        } => cmd_import(&dir, start, &files, dry_run),
        Commands::Check => cmd_check(&dir),
        Commands::Hash { algorithms, files } => cmd_hash(&algorithms, &files),
        Commands::Status => cmd_status(&dir),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "org", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

fn usage_error(msg: &str) -> ! {
    Cli::command().error(ErrorKind::ValueValidation, msg).exit()
}

fn open_series(dir: &Path) -> Result<Series> {
    Series::open(dir).with_context(|| format!("cannot open series at {}", dir.display()))
}

fn cmd_import(
    dir: &Path,
    start: Option<u64>,
    files: &[PathBuf],
    dry_run: bool,
) -> Result<ExitCode> {
    let series = open_series(dir)?;
    let progress = BarProgress::new();
    let importer = Importer::new(&series, &progress);

    let plan = match importer.plan(start, files) {
        Ok(plan) => plan,
        Err(ImportError::Usage(msg)) => {
            progress.finish();
            usage_error(&msg)
        }
        Err(ImportError::Validation(e)) => {
            progress.finish();
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            progress.finish();
            return Err(e).context("import aborted");
        }
    };

    for candidate in &plan.candidates {
        progress.say(format!("Digests for: {}", candidate.source.display()));
        progress.say(format!(" SHA-1: {}", candidate.sha1));
        if let Some(crc) = &candidate.crc32 {
            progress.say(format!(" CRC-32: {crc} OK"));
        }
    }

    if dry_run {
        progress.finish();
        println!("Would import starting at episode {}:", plan.start_number);
        for candidate in &plan.candidates {
            println!("{} -> {}", candidate.source.display(), candidate.destination);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let result = importer.commit(plan, |candidate| {
        progress.say(format!(
            "Moving: {} -> {}",
            candidate.source.display(),
            candidate.destination
        ))
    });
    progress.finish();

    let count = result.context("import partially applied")?;
    eprintln!(
        "Imported {} file(s) into {}",
        count,
        series.identity().basename()
    );
    Ok(ExitCode::SUCCESS)
}

fn describe_check(check: &FileCheck) -> String {
    let status = match &check.outcome {
        CheckOutcome::Ok => "OK".to_string(),
        CheckOutcome::Mismatch { actual } => {
            format!("NOT OK: expected {}, got {}", check.entry.sha1, actual)
        }
        CheckOutcome::Unreadable(e) if e.is_not_found() => "NOT OK: file not found".to_string(),
        CheckOutcome::Unreadable(e) => format!("NOT OK: {e}"),
    };
    format!("Checking {} ... {}", check.entry.filename, status)
}

fn cmd_check(dir: &Path) -> Result<ExitCode> {
    let series = open_series(dir)?;
    let manifest_name = series.manifest_filename();
    let progress = BarProgress::new();

    let result = Checker::new(&series, &progress).check(|event| match event {
        CheckEvent::Duplicate(name) => progress.say(format!(
            "Warning: duplicate file entry in {manifest_name}: {name}"
        )),
        CheckEvent::Checking(_) => {}
        CheckEvent::Checked(check) => progress.say(describe_check(check)),
    });
    progress.finish();

    let report = match result {
        Ok(report) => report,
        Err(CheckError::Manifest(e)) => {
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("check aborted"),
    };

    for name in &report.unchecked {
        eprintln!("Unchecked file: {name}");
    }

    if report.all_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "{} of {} file(s) failed verification",
            report.failures().count(),
            report.results.len()
        );
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_hash(algorithms: &[String], files: &[PathBuf]) -> Result<ExitCode> {
    let algorithms = parse_algorithms(algorithms)?;
    let progress = BarProgress::new();
    let mut all_ok = true;

    for file in files {
        match digest_with_progress(file, &algorithms, DEFAULT_CHUNK_SIZE, &progress) {
            Ok(digests) => {
                progress.pb.suspend(|| println!("{}  {}", digests.join(" "), file.display()));
            }
            Err(e) => {
                progress.say(format!("{e}"));
                all_ok = false;
            }
        }
    }
    progress.finish();

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_status(dir: &Path) -> Result<ExitCode> {
    let series = open_series(dir)?;
    let status = series.status()?;

    println!("Series: {}", status.basename);
    println!("Directory: {}", series.dir().display());
    println!("Digits: {}", status.digit_width);
    println!("Episodes: {}", status.episode_count);
    match &status.next_number {
        Ok(next) => println!("Next episode: {next}"),
        Err(e) => println!("Next episode: unavailable ({e})"),
    }
    let manifest = series.manifest_filename();
    match status.manifest_entries {
        Some(count) => println!("Manifest: {manifest} ({count} entries)"),
        None if !series.manifest().exists() => println!("Manifest: {manifest} (not created yet)"),
        None => println!("Manifest: {manifest} (not readable)"),
    }

    Ok(ExitCode::SUCCESS)
}
