/// Prompt construction for the recommendation generator.
use advisor_common::openai::Message;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const SYSTEM_PROMPT: &str = "You are a concise expert. Output ONLY the final recommendations. \
No explanations, no thinking process, no meta-commentary.";

/// Community and environmental factors plus the predicted case count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskFactors {
    /// % of houses with proper waste disposal
    pub waste_disposal: f64,
    /// % of houses free of stagnant water
    pub stagnant_water: f64,
    /// Drainage score (1-5)
    pub drainage_score: f64,
    /// Temperature in °C
    pub temperature: f64,
    /// Rainfall as number of rainy days
    pub rainfall: f64,
    /// Community clean-up drive frequency
    pub cleanup_score: f64,
    /// Predicted number of dengue cases
    pub dengue_cases: f64,
}

impl RiskFactors {
    fn fields(&self) -> [(&'static str, f64); 7] {
        [
            ("waste_disposal", self.waste_disposal),
            ("stagnant_water", self.stagnant_water),
            ("drainage_score", self.drainage_score),
            ("temperature", self.temperature),
            ("rainfall", self.rainfall),
            ("cleanup_score", self.cleanup_score),
            ("dengue_cases", self.dengue_cases),
        ]
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some((name, _)) = self.fields().into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(AppError::InvalidInput(format!("{name} must be a finite number")));
        }
        if self.dengue_cases < 0.0 {
            return Err(AppError::InvalidInput(
                "dengue_cases must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Whole numbers keep one decimal, e.g. `90.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub fn user_prompt(factors: &RiskFactors) -> String {
    format!(
        "You are a dengue prevention expert. Provide ONLY the final recommendation list. \
NO explanations, NO thinking process, NO meta-commentary.

Predicted Dengue Cases: {cases:.2}
% of Houses with Proper Waste Disposal: {waste}%
% of Houses Free of Stagnant Water: {stagnant}%
Drainage Score (1-5): {drainage}
Temperature (°C): {temperature}
Rainfall (Number of Rainy Days): {rainfall}
Community Clean-Up Drive Frequency: {cleanup}

Output format (ONLY output the recommendations, nothing else):

**Waste Management Strategies**
• Implement [action]
• Organize [action]

**Vector Control Measures**
• Conduct [action]
• Implement [action]

**Community Health Tips**
• Advise [action]
• Promote [action]

**Environmental Interventions**
• Improve [action]
• Organize [action]

**Preventive Measures**
• Establish [action]
• Distribute [action]

**Public Awareness & Education**
• Organize [action]
• Conduct [action]

OR format as a clean list with bullet points (they will be automatically categorized):
• Implement [action]
• Organize [action]
• Conduct [action]

Requirements:
- Provide actionable recommendations to reduce dengue incidence
- Start each recommendation with an action verb (Implement, Organize, Conduct, Distribute, Establish, Promote, Advise, etc.)
- Provide 3-5 unique recommendations per category (NO duplicates)
- Each recommendation must be distinct and different from others
- NO explanations, NO \"based on\", NO \"these factors\", NO thinking process
- NO analysis or description of input values (e.g., \"30% is low\", \"that's high\", \"which is good\")
- NO meta-commentary or instructions to yourself
- NO repeating the same recommendation multiple times
- Start immediately with the first recommendation",
        cases = factors.dengue_cases,
        waste = format_number(factors.waste_disposal),
        stagnant = format_number(factors.stagnant_water),
        drainage = format_number(factors.drainage_score),
        temperature = format_number(factors.temperature),
        rainfall = format_number(factors.rainfall),
        cleanup = format_number(factors.cleanup_score),
    )
}

pub fn build_messages(factors: &RiskFactors) -> Vec<Message> {
    vec![Message::system(SYSTEM_PROMPT), Message::user(user_prompt(factors))]
}
