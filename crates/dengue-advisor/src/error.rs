use advisor_common::openai::OpenAiClientError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("recommendation request failed: {0}")]
    Upstream(#[from] OpenAiClientError),
}
