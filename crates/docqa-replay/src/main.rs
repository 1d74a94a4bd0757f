//! Replays a captured stream response (NDJSON) through a stream session.
//!
//! ```text
//! docqa-replay --kind upload --chunk-size 7 capture.ndjson
//! curl -sN .../api/stream-query -d '{...}' | docqa-replay --kind query
//! ```

mod config;
mod input;
mod printer;

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use docqa_stream::observability::init_observability;
use docqa_stream::{StreamConfig, StreamConsumer};

use crate::printer::PrintSink;

const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StreamKind {
    /// Upload-with-progress response; resolves on `complete`.
    Upload,
    /// Answer response; resolves on `complete` or `done`.
    Query,
}

#[derive(Debug, Parser)]
#[command(name = "docqa-replay", about = "Replay a captured document Q&A stream response")]
struct Args {
    /// Capture file; stdin when omitted or `-`.
    input: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = StreamKind::Query)]
    kind: StreamKind,
    /// Bytes per delivered chunk (default: DOCQA_REPLAY_CHUNK_SIZE or 64).
    #[arg(long)]
    chunk_size: Option<NonZeroUsize>,
    /// Longest accepted line; 0 disables the limit (default: DOCQA_STREAM_MAX_LINE_BYTES).
    #[arg(long)]
    max_line_bytes: Option<usize>,
    /// Print the final result as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init();
    init_observability();
    let args = Args::parse();

    let chunk_size = args
        .chunk_size
        .or_else(|| config::get_env::<NonZeroUsize>("DOCQA_REPLAY_CHUNK_SIZE"))
        .or(NonZeroUsize::new(DEFAULT_CHUNK_SIZE))
        .ok_or("chunk size must be positive")?;
    let mut stream_config = StreamConfig::from_env()?;
    if let Some(limit) = args.max_line_bytes {
        stream_config.max_line_bytes = (limit > 0).then_some(limit);
    }

    let body = input::read_capture(args.input.as_deref()).await?;
    tracing::info!(bytes = body.len(), chunk_size = chunk_size.get(), kind = ?args.kind, "replaying capture");
    let source = input::chunked_source(body, chunk_size);

    let mut sink: PrintSink = PrintSink::default();
    match args.kind {
        StreamKind::Upload => {
            let mut consumer = StreamConsumer::upload(&mut sink).config(stream_config);
            abort_on_ctrl_c(consumer.abort_handle());
            let result = consumer.run(source).await;
            sink.finish_line();
            let summary = result?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "added {} chunks from {} files ({} errors)",
                    summary.added_count,
                    summary.files.len(),
                    summary.errors.len()
                );
            }
        }
        StreamKind::Query => {
            let mut consumer = StreamConsumer::query(&mut sink).config(stream_config);
            abort_on_ctrl_c(consumer.abort_handle());
            let result = consumer.run(source).await;
            sink.finish_line();
            let answer = result?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else if !answer.sources.is_empty() {
                println!("sources: {}", answer.source_labels().join(", "));
            }
        }
    }
    Ok(())
}

fn abort_on_ctrl_c(handle: docqa_stream::AbortHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; aborting replay");
            handle.abort();
        }
    });
}
