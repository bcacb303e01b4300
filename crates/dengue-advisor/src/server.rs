/// MCP server for dengue-prevention recommendations.
///
/// Exposes three tools:
/// - `get_recommendations`: generate and normalize advice for a set of risk factors
/// - `format_recommendations`: normalize already-generated text
/// - `health_check`: reports that the server is up
use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::advisor::{RecommendationResponse, RecommendationService};
use crate::prompt::RiskFactors;

#[derive(Clone)]
pub struct DengueAdvisorServer {
    service: RecommendationService,
    tool_router: ToolRouter<DengueAdvisorServer>,
}

impl DengueAdvisorServer {
    pub fn new(service: RecommendationService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FormatRecommendationsParams {
    /// Raw generator output. Missing or blank text yields the placeholder document.
    raw_text: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

#[tool_router]
impl DengueAdvisorServer {
    #[tool(description = "Generate dengue-prevention recommendations for community and environmental risk factors. Returns categorized, deduplicated items plus a plain-text list.")]
    async fn get_recommendations(
        &self,
        Parameters(factors): Parameters<RiskFactors>,
    ) -> Result<Json<RecommendationResponse>, String> {
        let response = self
            .service
            .recommend(&factors)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(response))
    }

    #[tool(description = "Normalize raw recommendation text: drop meta-commentary, group items into categories and remove duplicates. Does not call the generator.")]
    async fn format_recommendations(
        &self,
        Parameters(params): Parameters<FormatRecommendationsParams>,
    ) -> Result<Json<RecommendationResponse>, String> {
        Ok(Json(self.service.format(params.raw_text.as_deref())))
    }

    #[tool(description = "Report service health.")]
    async fn health_check(&self) -> Result<Json<HealthResponse>, String> {
        Ok(Json(HealthResponse::healthy()))
    }
}

#[tool_handler]
impl ServerHandler for DengueAdvisorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dengue-advisor".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Dengue prevention advisor. Call get_recommendations with the seven risk factors \
(waste_disposal, stagnant_water, drainage_score, temperature, rainfall, cleanup_score, \
dengue_cases) to get categorized recommendations. Use format_recommendations to clean up text \
you already have."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::tests::offline_service;

    #[test]
    fn tools_publish_output_schemas() {
        let tools = DengueAdvisorServer::tool_router().list_all();
        for name in ["get_recommendations", "format_recommendations", "health_check"] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn format_tool_normalizes_text() {
        let server = DengueAdvisorServer::new(offline_service(None));
        let Json(response) = server
            .format_recommendations(Parameters(FormatRecommendationsParams {
                raw_text: Some("Let me think.\n- Conduct fogging in high-risk areas".to_string()),
            }))
            .await
            .expect("format never fails");
        assert_eq!(response.plain_text, "• Conduct fogging in high-risk areas");
    }

    #[test]
    fn server_info_names_the_service() {
        let server = DengueAdvisorServer::new(offline_service(None));
        assert_eq!(server.get_info().server_info.name, "dengue-advisor");
    }
}
