//! burrow - background file-task engine.
//!
//! Usage:
//!   burrow worker               Serve JSON-lines tasks on stdin/stdout
//!   burrow index [PATH...]      Build and save the search index
//!   burrow search QUERY [DIR]   Find files by name
//!   burrow grep QUERY [DIR]     Find files by content
//!   burrow size [PATH]          Folder size with extension breakdown
//!   burrow checksum FILE        Hash a file
//!   burrow ls [DIR]             List a directory
//!   burrow --help               Show help

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use burrow_core::{EngineConfig, Entry, FileTypeClass, NoProgress, ProgressData, SearchFilters};
use burrow_ops::{
    ControlMessage, Dispatcher, Task, TaskOutput, TaskRequest, TaskResult, WORKER_CHANNEL_SIZE,
    WorkerMessage, WorkerPool,
};

#[derive(Parser)]
#[command(
    name = "burrow",
    version,
    about = "Background file-task engine",
    long_about = "burrow indexes, searches, sizes and hashes files.\n\n\
                  Run `burrow worker` to serve tasks over JSON lines, or use \
                  the other subcommands for one-off tasks."
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the raw task result as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve tasks read as JSON lines from stdin
    Worker {
        /// Number of concurrent tasks (defaults to the config value)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Build the search index and save it
    Index {
        /// Locations to index (defaults to the configured locations)
        paths: Vec<PathBuf>,

        /// Maximum number of entries
        #[arg(short = 'n', long)]
        max: Option<usize>,

        /// Where to save the index
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find files by name
    Search {
        query: String,

        /// Directory to walk (omit with --index)
        dir: Option<PathBuf>,

        /// Search the saved index instead of walking
        #[arg(short, long)]
        index: bool,

        /// Restrict to a file-type class
        #[arg(short = 't', long, default_value = "all")]
        file_type: FileTypeClass,

        #[arg(short = 'n', long)]
        max_results: Option<usize>,
    },

    /// Find files whose contents contain the query
    Grep {
        query: String,

        /// Directory to walk (omit with --index)
        dir: Option<PathBuf>,

        /// Search files listed in the saved index instead of walking
        #[arg(short, long)]
        index: bool,

        #[arg(short = 'n', long)]
        max_results: Option<usize>,
    },

    /// Total size of a folder
    Size {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Hash a file with one or more algorithms
    Checksum {
        file: PathBuf,

        /// Algorithms: md5, sha256, blake3
        #[arg(short, long, value_delimiter = ',', default_value = "sha256")]
        algorithms: Vec<String>,
    },

    /// List a directory
    Ls {
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Include hidden entries
        #[arg(short, long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BURROW_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(EngineConfig::default_path);
    let config = EngineConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let dispatcher = Dispatcher::new(config).context("Invalid configuration")?;

    match cli.command {
        Command::Worker { workers } => {
            let size = workers.unwrap_or_else(|| dispatcher.config().worker_count());
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start runtime")?;
            runtime.block_on(serve(dispatcher, size))?;
        }
        Command::Index { paths, max, output } => {
            let task = Task::BuildIndex {
                locations: paths,
                max_index_size: max,
                index_path: Some(output.unwrap_or_else(|| dispatcher.config().index_path.clone())),
            };
            run_once(&dispatcher, task, cli.json)?;
        }
        Command::Search {
            query,
            dir,
            index,
            file_type,
            max_results,
        } => {
            let filters = SearchFilters {
                file_type,
                ..Default::default()
            };
            let task = if index {
                Task::SearchIndex {
                    index_path: None,
                    query,
                    filters,
                    max_results,
                }
            } else {
                Task::SearchFiles {
                    dir_path: dir.unwrap_or_else(|| PathBuf::from(".")),
                    query,
                    filters,
                    max_depth: None,
                    max_results,
                }
            };
            run_once(&dispatcher, task, cli.json)?;
        }
        Command::Grep {
            query,
            dir,
            index,
            max_results,
        } => {
            let task = if index {
                Task::SearchContentIndex {
                    index_path: None,
                    query,
                    filters: SearchFilters::default(),
                    max_results,
                }
            } else {
                Task::SearchContent {
                    dir_path: dir.unwrap_or_else(|| PathBuf::from(".")),
                    query,
                    filters: SearchFilters::default(),
                    max_depth: None,
                    max_results,
                }
            };
            run_once(&dispatcher, task, cli.json)?;
        }
        Command::Size { path } => {
            run_once(&dispatcher, Task::FolderSize { folder_path: path }, cli.json)?;
        }
        Command::Checksum { file, algorithms } => {
            let task = Task::Checksum {
                file_path: file,
                algorithms,
            };
            run_once(&dispatcher, task, cli.json)?;
        }
        Command::Ls { dir, all } => {
            let task = Task::ListDirectory {
                dir_path: dir,
                batch_size: None,
                include_hidden: all,
            };
            run_once(&dispatcher, task, cli.json)?;
        }
    }

    Ok(())
}

/// Run one task in the foreground and print its result.
fn run_once(dispatcher: &Dispatcher, task: Task, json: bool) -> Result<()> {
    let request = TaskRequest::new("cli", task);
    let result = if json {
        dispatcher.handle(request, &NoProgress)
    } else {
        dispatcher.handle(request, &print_progress)
    };
    if !json {
        eprint!("\r\x1b[K");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    let TaskResult {
        success,
        data,
        error,
        ..
    } = result;
    if !success {
        bail!(error.unwrap_or_else(|| "task failed".to_string()));
    }
    let data = data.ok_or_else(|| eyre!("task returned no data"))?;
    print_output(data);
    Ok(())
}

fn print_progress(data: ProgressData) {
    match data {
        ProgressData::Walk {
            calculated_size,
            file_count,
            current_path,
            ..
        } => eprint!(
            "\r\x1b[K{} files, {}  {}",
            file_count,
            format_size(calculated_size),
            truncate(&current_path.display().to_string(), 50)
        ),
        ProgressData::Checksum { percent, algorithm } => {
            eprint!("\r\x1b[K{algorithm}: {percent:.0}%")
        }
        ProgressData::Listing { loaded } => eprint!("\r\x1b[K{loaded} entries"),
    }
    let _ = std::io::stderr().flush();
}

fn print_output(data: TaskOutput) {
    match data {
        TaskOutput::Index(report) => {
            println!("Indexed {} files", report.entry_count);
            if report.truncated {
                println!("Stopped at the size limit; raise --max to index more");
            }
            for skipped in &report.skipped_locations {
                println!("Skipped {}", skipped.display());
            }
        }
        TaskOutput::Entries(entries) => {
            if entries.is_empty() {
                println!("No matches");
            }
            for entry in &entries {
                print_match(entry);
            }
        }
        TaskOutput::FolderSize(report) => {
            println!("{}", "─".repeat(60));
            println!(
                " {} - {}",
                report.path.display(),
                format_size(report.total_size)
            );
            println!(
                " {} files, {} directories",
                report.file_count, report.folder_count
            );
            println!("{}", "─".repeat(60));
            for stat in &report.file_types {
                println!(
                    " {:>10}  {:>8} files  {}",
                    format_size(stat.size),
                    stat.count,
                    stat.extension
                );
            }
        }
        TaskOutput::Checksum(digests) => {
            for (algorithm, digest) in &digests {
                println!("{algorithm:<7} {digest}");
            }
        }
        TaskOutput::Listing(listing) => {
            for entry in &listing.contents {
                let size = if entry.is_directory {
                    "-".to_string()
                } else {
                    format_size(entry.size)
                };
                let marker = if entry.is_directory { "/" } else { "" };
                println!(
                    "{:>10}  {}  {}{}",
                    size,
                    entry.modified.format("%Y-%m-%d %H:%M"),
                    entry.name,
                    marker
                );
            }
        }
        TaskOutput::Snapshot(snapshot) => {
            println!("{} entries", snapshot.entry_count);
        }
        TaskOutput::Saved(ack) => {
            println!("Saved {} entries to {}", ack.entry_count, ack.path.display());
        }
    }
}

fn print_match(entry: &Entry) {
    match (&entry.match_context, entry.match_line_number) {
        (Some(context), Some(line)) => {
            println!("{}:{}: {}", entry.path.display(), line, context)
        }
        _ => println!("{}", display_path(&entry.path, entry.is_directory)),
    }
}

fn display_path(path: &Path, is_directory: bool) -> String {
    if is_directory {
        format!("{}/", path.display())
    } else {
        path.display().to_string()
    }
}

/// Serve the controller protocol until stdin closes.
///
/// Every input line is a [`ControlMessage`]; every output line is a
/// [`WorkerMessage`]. A line that fails to parse but carries an `id` gets
/// a failure result so the controller is never left waiting.
async fn serve(dispatcher: Dispatcher, size: usize) -> Result<()> {
    let (pool, mut pool_rx) = WorkerPool::start(Arc::new(dispatcher), size);
    let (out_tx, mut out_rx) = mpsc::channel::<WorkerMessage>(WORKER_CHANNEL_SIZE);

    let forward_tx = out_tx.clone();
    tokio::spawn(async move {
        while let Some(message) = pool_rx.recv().await {
            if forward_tx.send(message).await.is_err() {
                break;
            }
        }
    });

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = out_rx.recv().await {
            let Some(line) = message.to_json_line() else {
                continue;
            };
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ControlMessage>(&line) {
            Ok(message) => {
                if let Err(request) = pool.handle_control(message).await {
                    tracing::warn!(id = %request.id, "worker pool closed, dropping request");
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed control message");
                if let Some(id) = request_id(&line) {
                    let reply = TaskResult::failure(id, format!("Invalid input: {e}"));
                    let _ = out_tx.send(WorkerMessage::Result(reply)).await;
                }
            }
        }
    }

    pool.close().await;
    drop(out_tx);
    writer.await.context("Output writer failed")??;
    Ok(())
}

fn request_id(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value.get("id")?.as_str().map(str::to_string)
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

fn truncate(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - (max_len - 3)).collect();
        format!("...{tail}")
    }
}
