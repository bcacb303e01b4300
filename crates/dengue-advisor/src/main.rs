mod advisor;
mod config;
mod error;
mod http;
mod prompt;
mod rate_limit;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use advisor_common::openai::{OpenAiClient, OpenAiClientConfig};

use advisor::RecommendationService;
use config::Config;
use server::DengueAdvisorServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries MCP JSON-RPC.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting dengue-advisor");

    let config = Config::from_env()?;
    info!(
        model = %config.model,
        temperature = config.temperature,
        max_tokens = config.max_tokens,
        http = config.http_addr.is_some(),
        "configuration loaded"
    );

    let openai = Arc::new(OpenAiClient::new(OpenAiClientConfig::from_env())?);
    let openai_config = openai.config();
    info!(
        base_url = %openai_config.base_url,
        api_key = openai_config.api_key.is_some(),
        timeout_ms = openai_config.default_timeout.as_millis(),
        max_retries = openai_config.max_retries,
        "openai client configured"
    );

    let limiter = rate_limit::RateLimiter::from_env();
    if let Some(limiter) = &limiter {
        info!(rps = limiter.rps(), "rate limiting enabled");
    }

    let http_addr = config.http_addr.clone();
    let service = RecommendationService::new(openai, config, limiter);

    if let Some(addr) = http_addr {
        http::serve(&addr, service).await?;
        info!("HTTP API shut down");
        return Ok(());
    }

    let server = DengueAdvisorServer::new(service);

    info!("MCP server ready, serving on stdio");
    let running = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    running.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
