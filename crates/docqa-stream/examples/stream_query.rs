use docqa_stream::observability::init_observability;
use docqa_stream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_observability();

    let base = std::env::var("DOCQA_API_BASE").unwrap_or_else(|_| "http://localhost:5000/api".into());
    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What does the knowledge base contain?".into());

    let response = reqwest::Client::new()
        .post(format!("{}/stream-query", base.trim_end_matches('/')))
        .json(&serde_json::json!({
            "question": question,
            "mode": "auto",
            "use_stream": true,
            "top_k": 3,
        }))
        .send()
        .await?
        .error_for_status()?;

    let sink = FnSink::new()
        .start(|start| {
            if let Some(label) = start.mode.label() {
                println!("[{label}]");
            }
        })
        .delta(|text| print!("{text}"));

    let answer = StreamConsumer::query(sink)
        .config(StreamConfig::from_env()?)
        .run(StreamSource::from_response(response))
        .await?;

    println!();
    for source in answer.source_labels() {
        println!("  - {source}");
    }
    Ok(())
}
