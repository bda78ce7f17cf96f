use anyhow::Result;
use std::sync::atomic::Ordering;
use taxroll::{config::ParserConfig, extract::TextGridExtractor, run::Runner};
use tokio::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) load config ──────────────────────────────────────────────
    let config = ParserConfig::load()?;
    info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        "configured"
    );

    // ─── 3) stop between documents on Ctrl-C ─────────────────────────
    let extractor = TextGridExtractor::new(config.column_starts.clone());
    let runner = Runner::new(config, extractor);
    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing current document");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    // ─── 4) run on the blocking pool ─────────────────────────────────
    let start = Instant::now();
    let summary = match tokio::task::spawn_blocking(move || runner.run()).await? {
        Ok(summary) => summary,
        Err(e) => {
            error!("run failed: {:#}", e);
            return Err(e);
        }
    };

    for doc in &summary.documents {
        info!(
            doc = %doc.document.display(),
            pages = doc.pages,
            failed = doc.failed_pages,
            rows = doc.rows,
            output = %doc.output.display(),
            "parsed"
        );
    }
    if !summary.skipped.is_empty() {
        warn!(count = summary.skipped.len(), "documents skipped after cancel");
    }
    info!(log = %summary.log_path.display(), elapsed = ?start.elapsed(), "all done");
    Ok(())
}
