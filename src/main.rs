use google_cloud_storage::client::Storage;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use photoframe::config::Config;
use photoframe::frames::FrameSet;
use photoframe::models::Verdict;
use photoframe::services::classifier::GeminiClassifier;
use photoframe::storage::{GcsPublisher, LocalPublisher, Publisher};
use photoframe::{AppState, build_router};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoframe=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = Config::from_env()?;

    let classifier = Arc::new(GeminiClassifier::new(
        &config.gemini_api_key,
        &config.gemini_model,
    ));

    let publisher: Arc<dyn Publisher> = match &config.local_storage_path {
        Some(path) => {
            tracing::info!("Publishing to local storage at {:?}", path);
            Arc::new(LocalPublisher::new(path, &config.public_base_url))
        }
        None => {
            // GCS client uses GOOGLE_APPLICATION_CREDENTIALS env var
            let gcs = Storage::builder()
                .build()
                .await
                .map_err(|e| format!("Failed to create GCS client: {:?}", e))?;
            tracing::info!(bucket = %config.bucket_name, "Publishing to GCS");
            Arc::new(GcsPublisher::new(
                gcs,
                &config.bucket_name,
                &config.public_base_url,
            ))
        }
    };

    let frames = FrameSet::new(&config.frames_dir, config.frame_padding);
    for verdict in [Verdict::Yes, Verdict::No] {
        let path = frames.path_for(verdict);
        if !path.exists() {
            tracing::warn!("Frame asset {:?} not found, {} photos will be unframed", path, verdict);
        }
    }

    let state = Arc::new(AppState {
        classifier,
        publisher,
        frames,
    });
    let app = build_router(state, config.max_upload_size);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
