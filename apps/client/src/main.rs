//! ramstash command-line client.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use ramstash_client::{TransferClient, TransferSummary};
use ramstash_transfer::{Direction, ProgressReport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Progress reports buffered between the transfer and the printer.
const PROGRESS_BUFFER: usize = 256;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(version, about = "Upload, download and list files on a ramstash server")]
struct Args {
    /// Server host name or address
    server_address: String,

    /// Server TCP port
    server_port: u16,

    /// Operation to perform
    #[arg(value_enum, ignore_case = true)]
    operation: Operation,

    /// Local file (source for UPLOAD, destination for DOWNLOAD)
    file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    Upload,
    Download,
    List,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so listings on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let client = TransferClient::new(&args.server_address, args.server_port);

    match args.operation {
        Operation::List => {
            let names = client.list().await.context("LIST failed")?;
            for name in names {
                println!("{name}");
            }
        }
        Operation::Upload => {
            let path = required_path(args.file_path, "UPLOAD")?;
            let (tx, printer) = spawn_printer(Direction::Upload, display_name(&path));
            let result = client.upload(&path, tx).await;
            let last = printer.await.ok().flatten();
            let summary = result.with_context(|| format!("upload of {} failed", path.display()))?;
            finish(summary, last);
        }
        Operation::Download => {
            let path = required_path(args.file_path, "DOWNLOAD")?;
            let (tx, printer) = spawn_printer(Direction::Download, display_name(&path));
            let result = client.download(&path, tx).await;
            let last = printer.await.ok().flatten();
            let summary = result.with_context(|| format!("download of {} failed", path.display()))?;
            finish(summary, last);
        }
    }
    Ok(())
}

fn required_path(path: Option<PathBuf>, operation: &str) -> anyhow::Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => bail!("{operation} requires a file path"),
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Prints one line per report until the sender is dropped, then hands back
/// the last report.
fn spawn_printer(
    direction: Direction,
    name: String,
) -> (mpsc::Sender<ProgressReport>, JoinHandle<Option<ProgressReport>>) {
    let (tx, mut rx) = mpsc::channel::<ProgressReport>(PROGRESS_BUFFER);
    let handle = tokio::spawn(async move {
        let mut last = None;
        while let Some(report) = rx.recv().await {
            println!("{} '{}': {}", direction.verb(), name, report);
            last = Some(report);
        }
        last
    });
    (tx, handle)
}

fn finish(summary: TransferSummary, last: Option<ProgressReport>) {
    println!("{}", completion_line(&summary, last.as_ref()));
}

fn completion_line(summary: &TransferSummary, last: Option<&ProgressReport>) -> String {
    let verb = match summary.direction {
        Direction::Upload => "uploaded",
        Direction::Download => "downloaded",
    };
    let speed = last.map_or(0.0, |report| report.average_speed() / 1024.0);
    format!(
        "'{}' {}: {} bytes in {:.2}s ({:.2} KB/s)",
        summary.file_name,
        verb,
        summary.bytes,
        summary.elapsed.as_secs_f64(),
        speed
    )
}
