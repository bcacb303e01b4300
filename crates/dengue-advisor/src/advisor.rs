/// Recommendation workflow: validate factors, ask the generator, normalize
/// whatever comes back.
use std::sync::Arc;

use advice_format::{format_recommendations, RecommendationDocument};
use advisor_common::openai::{ChatCompletionRequest, OpenAiClient};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::prompt::{build_messages, RiskFactors};
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RecommendationResponse {
    pub success: bool,
    /// Categorized, deduplicated recommendations. Never empty.
    pub recommendations: RecommendationDocument,
    /// One `• item` line per recommendation, without headers or markup.
    pub plain_text: String,
}

impl RecommendationResponse {
    pub fn from_document(recommendations: RecommendationDocument) -> Self {
        let plain_text = recommendations.to_plain_text();
        Self {
            success: true,
            recommendations,
            plain_text,
        }
    }
}

#[derive(Clone)]
pub struct RecommendationService {
    openai: Arc<OpenAiClient>,
    config: Config,
    limiter: Option<RateLimiter>,
}

impl RecommendationService {
    pub fn new(openai: Arc<OpenAiClient>, config: Config, limiter: Option<RateLimiter>) -> Self {
        Self {
            openai,
            config,
            limiter,
        }
    }

    async fn gate(&self) -> Result<(), AppError> {
        if let Some(limiter) = &self.limiter {
            limiter.check().await?;
        }
        Ok(())
    }

    /// Generate recommendations for `factors` and normalize them.
    pub async fn recommend(&self, factors: &RiskFactors) -> Result<RecommendationResponse, AppError> {
        factors.validate()?;
        self.gate().await?;

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: build_messages(factors),
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
        };
        let response = self.openai.chat_completions(request, None).await?;

        let raw = response.first_content().map(str::trim);
        if raw.is_none() {
            warn!(model = %self.config.model, "generator returned no content");
        }

        let document = format_recommendations(raw);
        info!(
            model = %self.config.model,
            raw_chars = raw.map_or(0, str::len),
            categories = document.categories.len(),
            items = document.item_count(),
            "recommendations formatted"
        );
        Ok(RecommendationResponse::from_document(document))
    }

    /// Normalize caller-supplied text without calling the generator.
    pub fn format(&self, raw: Option<&str>) -> RecommendationResponse {
        RecommendationResponse::from_document(format_recommendations(raw))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use advisor_common::openai::OpenAiClientConfig;

    use super::*;

    /// Service pointed at an address nothing listens on, with retries off.
    pub(crate) fn offline_service(limiter: Option<RateLimiter>) -> RecommendationService {
        let openai = OpenAiClient::new(OpenAiClientConfig {
            base_url: "http://127.0.0.1:9/v1".to_string(),
            api_key: None,
            default_timeout: Duration::from_millis(500),
            max_retries: 0,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            max_error_body_bytes: 1024,
        })
        .expect("client builds");
        RecommendationService::new(Arc::new(openai), Config::default(), limiter)
    }

    pub(crate) fn sample_factors() -> RiskFactors {
        RiskFactors {
            waste_disposal: 79.3,
            stagnant_water: 90.0,
            drainage_score: 2.0,
            temperature: 30.0,
            rainfall: 121.0,
            cleanup_score: 5.0,
            dengue_cases: 32.93,
        }
    }

    #[test]
    fn format_builds_plain_text_alongside_document() {
        let service = offline_service(None);
        let response = service.format(Some(
            "**Vector Control Measures**\n- Conduct fogging in high-risk areas",
        ));
        assert!(response.success);
        assert_eq!(response.recommendations.categories[0].key, "vector_control");
        assert_eq!(response.plain_text, "• Conduct fogging in high-risk areas");
    }

    #[test]
    fn format_without_text_is_placeholder() {
        let response = offline_service(None).format(None);
        assert!(response.recommendations.is_placeholder());
        assert!(!response.plain_text.is_empty());
    }

    #[tokio::test]
    async fn invalid_factors_fail_before_upstream() {
        let service = offline_service(None);
        let factors = RiskFactors {
            dengue_cases: -3.0,
            ..sample_factors()
        };
        assert!(matches!(
            service.recommend(&factors).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_an_upstream_error() {
        let service = offline_service(None);
        assert!(matches!(
            service.recommend(&sample_factors()).await,
            Err(AppError::Upstream(_))
        ));
    }
}
