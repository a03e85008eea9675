use std::fs::{self, File};
use std::io::{BufWriter, Write};

use anyhow::Result;
use clap::Parser;
use ingest::UpstreamArgs;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Load the full upstream message feed and write it as JSONL")]
struct Cli {
    #[command(flatten)]
    upstream: UpstreamArgs,
    /// Output JSONL file path
    #[arg(long, default_value = "./sample_data/messages.jsonl")]
    output: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    if let Some(dir) = std::path::Path::new(&args.output).parent() {
        fs::create_dir_all(dir)?;
    }

    let ingestor = args.upstream.build_ingestor()?;
    let messages = ingestor.load_all().await?;

    let mut out = BufWriter::new(File::create(&args.output)?);
    for msg in &messages {
        serde_json::to_writer(&mut out, msg)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    tracing::info!(documents = messages.len(), output = %args.output, "wrote dump");
    Ok(())
}
