use media_cache::prelude::*;
use media_cache::{format_bytes, BucketKind, TracingMetrics};
use tracing_subscriber::EnvFilter;

/// Prefetch the URLs given on the command line, print every event, then
/// print the media bucket's footprint.
///
/// ```text
/// RUST_LOG=media_cache=debug cargo run --example prefetch -- https://example.com/ /videos/a.mp4
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("media_cache=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let scope = args.next().unwrap_or_else(|| "https://example.com/".to_string());
    let urls: Vec<String> = args.collect();

    let config = WorkerConfig::from_scope(&scope)?.with_prefix("demo");
    let worker = MediaWorker::builder(config)
        .storage(MemoryStorage::new(MemoryConfig::with_quota(512 * 1024 * 1024)))
        .metrics(TracingMetrics::new().with_service_name("prefetch-demo"))
        .build()?;
    let mut events = worker.subscribe().ok_or("worker has no event bus")?;

    worker.install().await?;
    worker.activate().await?;

    worker
        .handle_message(ClientMessage::PrefetchVideos {
            task_id: None,
            urls,
            label: "demo".to_string(),
        })
        .await;

    loop {
        let event = events.recv().await?;
        println!("{}", event.to_json()?);

        match event {
            // Nothing to download: no summary follows
            WorkerEvent::PrefetchVideosUpdate(report) if report.status == PrefetchStatus::Idle => {
                break;
            }
            WorkerEvent::CacheSummary(summary) => {
                let media = summary
                    .bucket(BucketKind::Media)
                    .and_then(|b| b.total_bytes)
                    .unwrap_or(0);
                println!("media bucket holds {}", format_bytes(media));
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
