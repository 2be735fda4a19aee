//! Legitimacy assessment model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    HighlyLegitimate,
    LikelyLegitimate,
    PossiblyLegitimate,
    Suspicious,
}

impl Recommendation {
    /// Pick the tier; the first matching tier wins
    pub fn for_assessment(is_legitimate: bool, confidence: u32) -> Self {
        match (is_legitimate, confidence) {
            (true, c) if c > 80 => Recommendation::HighlyLegitimate,
            (true, c) if c > 60 => Recommendation::LikelyLegitimate,
            (true, _) => Recommendation::PossiblyLegitimate,
            (false, _) => Recommendation::Suspicious,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::HighlyLegitimate => {
                "HIGHLY LEGITIMATE - Strong transparency indicators and low risk"
            }
            Recommendation::LikelyLegitimate => {
                "LIKELY LEGITIMATE - Good transparency with minor concerns"
            }
            Recommendation::PossiblyLegitimate => {
                "POSSIBLY LEGITIMATE - Limited transparency, verify independently"
            }
            Recommendation::Suspicious => {
                "SUSPICIOUS - Multiple risk factors detected, proceed with caution"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegitimacyAssessment {
    pub is_legitimate: bool,
    /// Always equal to the analysis transparency score
    pub confidence_score: u32,
    pub risk_factors: Vec<String>,
    pub transparency_indicators: Vec<String>,
    pub recommendation: Recommendation,
    pub overall_recommendation: String,
}
