use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notebooklm_rpc::artifacts::parse_data_table;
use notebooklm_rpc::chat::parse_answer;
use notebooklm_rpc::logging::{self, LogConfig};
use notebooklm_rpc::rpc::parse_frames;
use serde_json::Value;

// ── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "notebooklm-rpc",
    version,
    about = "Inspect captured NotebookLM RPC responses"
)]
struct Cli {
    /// Verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print every frame of a captured response body
    Frames {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the answer selected from a captured chat stream
    Answer {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Flatten a captured data-table studio record to CSV on stdout
    Table {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        logging::init(LogConfig::debug());
    } else {
        logging::init_from_env();
    }

    match cli.command {
        Commands::Frames { file } => {
            let body = read(&file)?;
            let frames = parse_frames(&body);
            if frames.is_empty() {
                eprintln!("no frames in {}", file.display());
            }
            for frame in frames {
                println!(
                    "{}\t{}\t{}",
                    frame.frame_kind,
                    frame.call_id.as_deref().unwrap_or("-"),
                    frame.decoded_payload()
                );
            }
        }
        Commands::Answer { file } => {
            let body = read(&file)?;
            println!("{}", parse_answer(&body));
        }
        Commands::Table { file } => {
            let text = read(&file)?;
            let record: Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not JSON", file.display()))?;
            let table = parse_data_table(&record).context("decoding data table")?;
            print!("{}", table.to_csv());
        }
    }
    Ok(())
}
