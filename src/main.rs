//! CLI entry point for `emlex`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use emlex::batch::{self, BatchSummary, FileOutcome, OutputRoot, Pipeline};
use emlex::config::Config;
use emlex::error::ExtractError;
use emlex::naming::{Namer, NamingPolicy};
use emlex::resolve;

const AFTER_HELP: &str = "\
Examples:
  emlex msg1.eml msg2.eml msg3.eml
  emlex *.eml
  emlex './**/*.eml'
  emlex --naming recipient --copy-original inbox/*.eml";

#[derive(Parser)]
#[command(
    name = "emlex",
    version,
    about = "Extract attachments from multiple .eml files",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Path to .eml file(s); glob patterns are expanded
    #[arg(value_name = "EMAIL", allow_hyphen_values = true)]
    emails: Vec<String>,

    /// How destination folders are named
    #[arg(long, value_enum, value_name = "POLICY")]
    naming: Option<NamingPolicy>,

    /// Maximum number of files processed at once [default: 8]
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Directory in which the timestamped output folder is created [default: .]
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Copy each source message next to its attachments
    #[arg(long)]
    copy_original: bool,

    /// Exit with status 1 if any file failed
    #[arg(long)]
    strict: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<ExitCode> {
    // Help and version exit 0; any other usage error exits 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Ok(if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            });
        }
    };

    let (config, config_warning) = emlex::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);
    if let Some(warning) = config_warning {
        tracing::warn!("{warning}");
    }

    if cli.emails.is_empty() {
        anyhow::bail!("missing arguments, use -h");
    }

    run(&cli, &config)
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let file_target = config.general.log_file.as_deref().and_then(|path| {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = path.file_name()?;
        std::fs::create_dir_all(dir).ok()?;
        Some((dir.to_path_buf(), name.to_owned()))
    });

    if let Some((dir, name)) = file_target {
        let file_appender = tracing_appender::rolling::never(dir, name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Resolve inputs, create the output root, and run the batch.
fn run(cli: &Cli, config: &Config) -> anyhow::Result<ExitCode> {
    let extract = &config.extract;
    let policy = cli.naming.unwrap_or(extract.naming);
    let workers = cli.jobs.unwrap_or(extract.workers).max(1);
    let output_dir = cli.output_dir.as_deref().unwrap_or(&extract.output_dir);
    let copy_original = cli.copy_original || extract.copy_original;
    let strict = cli.strict || extract.strict;

    let resolved = resolve::resolve_inputs(&cli.emails);
    for warning in &resolved.unresolved {
        eprintln!("warning: {warning}");
    }
    if resolved.files.is_empty() {
        return Err(ExtractError::NoInputFiles.into());
    }

    let root = OutputRoot::create(output_dir, &extract.root_suffix)?;
    let pipeline = Pipeline::new(
        root,
        Namer::new(policy, extract.subject_max_len),
        copy_original.then(|| extract.original_name.clone()),
    );

    let pb = ProgressBar::new(resolved.files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Extracting [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let summary = batch::run_batch(&resolved.files, &pipeline, workers, &|outcome| {
        pb.suspend(|| report_outcome(outcome));
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    print_summary(&summary, pipeline.root().path(), policy, start.elapsed());

    if strict && summary.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Print one finished file: its destinations on stdout, its problems on stderr.
fn report_outcome(outcome: &FileOutcome) {
    match &outcome.result {
        Ok(report) => {
            for dest in &report.destinations {
                println!(
                    "  {} -> {} ({} attachment(s))",
                    outcome.source.display(),
                    dest.dir.display(),
                    dest.written.len()
                );
            }
            if !report.is_complete() {
                for failure in report.failures() {
                    eprintln!("error: {failure}");
                }
            }
        }
        Err(e) if e.is_benign() => eprintln!("skipped: {e}"),
        Err(e) => eprintln!("error: {e}"),
    }
}

/// Print the batch summary as a small table.
fn print_summary(
    summary: &BatchSummary,
    root: &Path,
    policy: NamingPolicy,
    elapsed: std::time::Duration,
) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<25} {}", "Files processed", summary.files());
    println!("  {:<25} {}", "With attachments", summary.extracted());
    println!("  {:<25} {}", "Without attachments", summary.without_attachments());
    println!("  {:<25} {}", "Failed", summary.failed());
    if summary.partial_failures() > 0 {
        println!("  {:<25} {}", "Partial failures", summary.partial_failures());
    }
    println!(
        "  {:<25} {} ({})",
        "Attachments written",
        summary.attachments_written(),
        format_size(summary.bytes_written(), BINARY)
    );
    println!("  {:<25} {}", "Naming", policy);
    println!("  {:<25} {}", "Output directory", root.display());
    println!("  {:<25} {:.2?}", "Elapsed", elapsed);
    println!();
}
