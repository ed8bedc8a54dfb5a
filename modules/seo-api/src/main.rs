use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::{OpenAi, TextGenerator};
use seo_api::{build_router, AppState, Analyzer};
use seo_common::Config;
use serp_client::{CredentialResolver, SerpClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("seo=info".parse()?)
                .add_directive("serp_client=info".parse()?),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    // Requests still fail individually with a configuration error; this only warns early.
    if let Err(e) = CredentialResolver::new(&config).resolve() {
        warn!(error = %e, "Ranking provider credentials are not configured");
    }
    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; analyses will fail at the generation step");
    }

    let mut openai = OpenAi::new(
        config.openai_api_key.clone().unwrap_or_default(),
        config.openai_model.clone(),
    )
    .with_timeout(config.generation_timeout);
    if let Some(url) = &config.openai_base_url {
        openai = openai.with_base_url(url.clone());
    }
    info!(model = openai.model(), "Text generator configured");
    let generator: Arc<dyn TextGenerator> = Arc::new(openai);

    let state = Arc::new(AppState {
        analyzer: Analyzer::new(config.clone(), SerpClient::new(config.clone()), generator),
    });

    let app = build_router(state, config.allowed_origin.as_deref());

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("SEO analysis API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
