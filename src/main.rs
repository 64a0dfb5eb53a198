//! CLI entry point for `mboxdedup`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use mboxdedup::config::Config;
use mboxdedup::dedup::{BatchRunner, DedupContext, ProgressSink};
use mboxdedup::fingerprint::FingerprintPolicy;
use mboxdedup::model::report::BatchReport;
use mboxdedup::store::reader::MboxStore;

/// Progress reached once the backup is done; the batch shares the rest.
const BACKUP_DONE_PERCENT: u8 = 29;

#[derive(Parser)]
#[command(
    name = "mboxdedup",
    version,
    about = "Remove duplicate messages from MBOX mail folders"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up a mail folder, then remove duplicates from every MBOX in it
    Run {
        /// Mail folder (defaults to the last folder used)
        folder: Option<PathBuf>,
        /// Also process folders and files named like "Trash"
        #[arg(long)]
        include_trash: bool,
        /// Fingerprint policy
        #[arg(long, value_enum)]
        policy: Option<FingerprintPolicy>,
        /// Skip the zip backup
        #[arg(long)]
        no_backup: bool,
        /// Run even if the mail client appears to be running
        #[arg(long)]
        ignore_running: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the MBOX files found in a mail folder
    Scan {
        folder: Option<PathBuf>,
        #[arg(long)]
        include_trash: bool,
    },
    /// Remove duplicates from specific MBOX files (no backup)
    Dedup {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, value_enum)]
        policy: Option<FingerprintPolicy>,
        #[arg(long)]
        json: bool,
    },
    /// Print one fingerprint per message of an MBOX file
    Fingerprints {
        path: PathBuf,
        #[arg(long, value_enum)]
        policy: Option<FingerprintPolicy>,
    },
    /// Create a zip backup of a mail folder
    Backup {
        folder: Option<PathBuf>,
        /// Compression level, 1 (fast) to 9 (small)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=9))]
        level: Option<u8>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; problems are logged once logging is up
    let (mut config, config_issue) = mboxdedup::config::read_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);
    if let Some(issue) = config_issue {
        warn!("{issue}");
    }

    match cli.command {
        Commands::Run {
            folder,
            include_trash,
            policy,
            no_backup,
            ignore_running,
            json,
        } => {
            if include_trash {
                config.scan.exclude_trash = false;
            }
            if let Some(p) = policy {
                config.dedup.policy = p;
            }
            if no_backup {
                config.backup.enabled = false;
            }
            cmd_run(&config, folder, ignore_running, json)
        }
        Commands::Scan {
            folder,
            include_trash,
        } => {
            if include_trash {
                config.scan.exclude_trash = false;
            }
            cmd_scan(&config, folder)
        }
        Commands::Dedup {
            paths,
            policy,
            json,
        } => {
            if let Some(p) = policy {
                config.dedup.policy = p;
            }
            cmd_dedup(&config, &paths, json)
        }
        Commands::Fingerprints { path, policy } => {
            cmd_fingerprints(&config, &path, policy.unwrap_or(config.dedup.policy))
        }
        Commands::Backup { folder, level } => {
            if let Some(level) = level {
                config.backup.compression_level = level;
            }
            cmd_backup(&config, folder)
        }
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = mboxdedup::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxdedup.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
        tracing::debug!(
            path = %mboxdedup::config::log_file_path(config).display(),
            "Logging to file"
        );
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Progress bar fed by the batch runner, cancelled by ctrl-c.
struct BarSink {
    bar: ProgressBar,
    cancelled: Arc<AtomicBool>,
}

impl BarSink {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg:<32} [{bar:40.cyan/blue}] {pos:>3}%")
                .expect("valid template")
                .progress_chars("#>-"),
        );

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            warn!(error = %e, "Could not install ctrl-c handler");
        }

        Self { bar, cancelled }
    }

    fn stage(&self, percent: u8, msg: &'static str) {
        self.bar.set_message(msg);
        self.bar.set_position(u64::from(percent));
    }
}

impl ProgressSink for BarSink {
    fn report(&mut self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Resolve the folder argument, falling back to the configured one.
fn resolve_folder(config: &Config, folder: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let folder = folder
        .or_else(|| config.general.target_folder.clone())
        .ok_or_else(|| anyhow::anyhow!("No mail folder given and none configured"))?;
    if !folder.is_dir() {
        anyhow::bail!("Please select a valid folder: {}", folder.display());
    }
    Ok(folder)
}

/// Full run: client check, backup, scan, dedup.
///
/// `config` may carry command line overrides; only the folder is saved.
fn cmd_run(
    config: &Config,
    folder: Option<PathBuf>,
    ignore_running: bool,
    json: bool,
) -> anyhow::Result<()> {
    let folder = resolve_folder(config, folder)?;

    if config.general.target_folder.as_ref() != Some(&folder) {
        if let Err(e) = mboxdedup::config::remember_target_folder(&folder) {
            warn!(error = %e, "Could not remember the selected folder");
        }
    }

    if config.client.refuse_when_running
        && !ignore_running
        && mboxdedup::process_check::is_mail_client_running(&config.client.process_names)
    {
        anyhow::bail!(
            "The mail client locks mailbox files while running. Close it and try again \
             (or pass --ignore-running)."
        );
    }

    info!("{}", "-".repeat(60));
    info!(folder = %folder.display(), "Folder selected");
    let start = Instant::now();

    let mut sink = BarSink::new();
    sink.stage(1, "Backing up mailboxes...");

    let backup = if config.backup.enabled {
        let archive = mboxdedup::backup::backup_folder(
            &folder,
            &config.backup.output_dir,
            &config.backup.file_prefix,
            config.backup.compression_level,
        )?;
        let size = std::fs::metadata(&archive).map(|m| m.len()).unwrap_or(0);
        let archive = std::path::absolute(&archive).unwrap_or(archive);
        {
            use humansize::{format_size, BINARY};
            info!(
                size = %format_size(size, BINARY),
                path = %archive.display(),
                elapsed = ?start.elapsed(),
                "Backup created"
            );
            if !json {
                sink.bar.println(format!(
                    "  Backup created: {}, {}",
                    format_size(size, BINARY),
                    archive.display()
                ));
            }
        }
        Some(archive)
    } else {
        None
    };

    sink.stage(BACKUP_DONE_PERCENT, "Scanning for duplicate mails...");
    let ctx = DedupContext::from_config(config);
    let mboxes = ctx.scanner().scan(&folder)?;

    let batch = BatchRunner::new(&ctx)
        .starting_at(BACKUP_DONE_PERCENT)
        .process_all(&mboxes, &mut sink)?;

    sink.stage(100, "Finished");
    sink.bar.finish_and_clear();

    info!(elapsed = ?start.elapsed(), "Finished");

    if json {
        let output = serde_json::json!({
            "folder": folder,
            "backup": backup,
            "mailboxes": mboxes,
            "report": batch,
            "summary": batch.summary(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        println!("  Mailbox files found: {}", mboxes.len());
        for path in &mboxes {
            println!("    {}", path.display());
        }
        print_batch(&batch);
    }

    Ok(())
}

/// List MBOX files in a folder.
fn cmd_scan(config: &Config, folder: Option<PathBuf>) -> anyhow::Result<()> {
    let folder = resolve_folder(config, folder)?;
    let ctx = DedupContext::from_config(config);
    let mboxes = ctx.scanner().scan(&folder)?;

    for path in &mboxes {
        println!("{}", path.display());
    }
    eprintln!("  {} mailbox file(s) found", mboxes.len());
    Ok(())
}

/// Deduplicate the given MBOX files directly.
fn cmd_dedup(config: &Config, paths: &[PathBuf], json: bool) -> anyhow::Result<()> {
    for path in paths {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
    }

    let ctx = DedupContext::from_config(config);
    let mut sink = BarSink::new();
    sink.stage(0, "Removing duplicates...");
    let batch = BatchRunner::new(&ctx).process_all(paths, &mut sink)?;
    sink.bar.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        print_batch(&batch);
    }
    Ok(())
}

/// Print one fingerprint per message, in file order.
fn cmd_fingerprints(config: &Config, path: &Path, policy: FingerprintPolicy) -> anyhow::Result<()> {
    let store = MboxStore::load(path)?;
    let fingerprinter = policy.fingerprinter(config.dedup.body_chars);

    let mut out = String::new();
    for message in &store.messages {
        out.push_str(fingerprinter.fingerprint(message).as_str());
        out.push('\n');
    }
    print!("{out}");
    Ok(())
}

/// Create a backup archive only.
fn cmd_backup(config: &Config, folder: Option<PathBuf>) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let folder = resolve_folder(config, folder)?;
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Backing up mailboxes...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let archive = mboxdedup::backup::backup_folder(
        &folder,
        &config.backup.output_dir,
        &config.backup.file_prefix,
        config.backup.compression_level,
    )?;
    spinner.finish_and_clear();

    let size = std::fs::metadata(&archive)?.len();
    println!(
        "  Backup created: {}, {}",
        format_size(size, BINARY),
        archive.display()
    );
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxdedup", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Human-readable batch outcome.
fn print_batch(batch: &BatchReport) {
    println!();
    let text = batch.combined_text();
    if !text.is_empty() {
        for line in text.lines() {
            println!("  {line}");
        }
        println!();
    }

    if !batch.failed.is_empty() {
        println!("  Failed mailboxes:");
        for failed in &batch.failed {
            println!("    {}: {}", failed.path.display(), failed.reason);
        }
        println!();
    }

    if batch.cancelled {
        println!("  Cancelled before all mailboxes were processed.");
    }
    println!("  {}", batch.summary());
    println!();
}
