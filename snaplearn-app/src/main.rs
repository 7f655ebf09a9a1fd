mod config;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;

use config::AppSettings;
use snaplearn_core::Data;
use snaplearn_ledger::Ledger;
use snaplearn_llm::{GeminiService, prompt::instruction_prompt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let target = metadata.target();

        let within_info_level = *metadata.level() <= tracing::Level::INFO;
        if !within_info_level {
            return false;
        }

        !(target.starts_with("hyper")
            || target.starts_with("h2")
            || target.starts_with("rustls")
            || target.starts_with("reqwest"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    // Load the .env file
    dotenvy::dotenv().ok();

    let settings = AppSettings::from_env();

    let llm = GeminiService::from_env()?;
    info!(model = llm.model(), "Gemini client configured.");

    let ledger = Ledger::new(&settings.ledger_path);
    info!(path = %ledger.path().display(), "Chat history ledger ready.");

    let instruction = instruction_prompt(&settings.prompt_file);
    let data = Data::new(ledger, Arc::new(llm), instruction, settings.reveal_delay);

    let app = snaplearn_pages::router(data, settings.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    info!(address = %settings.bind_address, "SnapLearn is listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SnapLearn stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
