//! Local web control panel: static page, tool catalog, multipart job endpoints and result files.

mod form;
mod routes;

use anyhow::{Context, Result};
use studio_core::{Studio, StudioSettings};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use routes::{AppState, router};

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(settings: StudioSettings) -> Result<()> {
    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| format!("creating {}", settings.output_dir.display()))?;
    if let Some(dir) = settings.upload_dir.as_ref() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    if !settings.denoise_model.exists() {
        warn!(
            model = %settings.denoise_model.display(),
            "denoise model missing; Ultra AI Clean will fail until it is installed"
        );
    }

    let studio = Studio::with_process_runner(settings.workspace());
    let state = AppState::new(studio, settings.upload_dir.as_deref());
    let app = router(state, settings.max_upload_bytes);

    let listener = TcpListener::bind((settings.host.as_str(), settings.port))
        .await
        .with_context(|| format!("binding {}", settings.bind_address()))?;
    let url = format!("http://{}", listener.local_addr()?);
    info!(
        %url,
        output_dir = %settings.output_dir.display(),
        ffmpeg = %settings.ffmpeg,
        "control panel listening"
    );
    println!("Ultra Studio running at {url}");

    if settings.open_browser {
        if let Err(err) = open::that(&url) {
            warn!(error = %err, "could not open a browser");
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("control panel stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
