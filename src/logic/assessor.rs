//! Legitimacy Assessor
//!
//! Pure mapping from an analysis to a legitimacy verdict.
//! Risk rules are a table evaluated in order; each matching rule adds its
//! factor, and some also clear the legitimacy flag.

use crate::models::{AnalysisResult, LegitimacyAssessment, Recommendation};

struct RiskRule {
    applies: fn(&AnalysisResult) -> bool,
    factor: &'static str,
    disqualifies: bool,
}

const RISK_RULES: [RiskRule; 4] = [
    RiskRule {
        applies: |r| r.risk_level > 7,
        factor: "High risk level detected",
        disqualifies: true,
    },
    RiskRule {
        applies: |r| r.transparency_score < 30,
        factor: "Low transparency score",
        disqualifies: true,
    },
    RiskRule {
        applies: |r| !r.metadata.has_public_github && r.transparency_score < 50,
        factor: "No public code repository",
        disqualifies: false,
    },
    RiskRule {
        applies: |r| !r.metadata.has_audit_reports && r.risk_level > 5,
        factor: "No audit reports for elevated-risk project",
        disqualifies: false,
    },
];

fn transparency_indicators(result: &AnalysisResult) -> Vec<String> {
    let meta = &result.metadata;
    [
        (meta.has_public_github, "Public GitHub repository"),
        (meta.has_documented_roadmap, "Documented roadmap"),
        (meta.has_audit_reports, "Security audit reports available"),
        (meta.has_team_verification, "Verified team information"),
        (meta.has_token_economics, "Published token economics"),
        (result.certificate_valid, "Valid TLS certificate"),
    ]
    .into_iter()
    .filter(|(present, _)| *present)
    .map(|(_, label)| label.to_string())
    .collect()
}

pub fn assess(result: &AnalysisResult) -> LegitimacyAssessment {
    let mut is_legitimate = true;
    let mut risk_factors = Vec::new();

    for rule in RISK_RULES.iter().filter(|rule| (rule.applies)(result)) {
        risk_factors.push(rule.factor.to_string());
        if rule.disqualifies {
            is_legitimate = false;
        }
    }

    let confidence_score = result.transparency_score;
    let recommendation = Recommendation::for_assessment(is_legitimate, confidence_score);

    LegitimacyAssessment {
        is_legitimate,
        confidence_score,
        risk_factors,
        transparency_indicators: transparency_indicators(result),
        recommendation,
        overall_recommendation: recommendation.message().to_string(),
    }
}
