//! Analysis Prompts
//!
//! System prompts, output schemas, and pure prompt builders for the two
//! provider calls. Identical inputs always produce identical prompts.

use game_advisor_core::ResearchResult;
use game_advisor_llm::ResponseFormat;

/// Domain used when the request names none
pub const DEFAULT_DOMAIN: &str = "video game";

pub const DESCRIBE_SYSTEM_PROMPT: &str = "You are a precise visual analyst for video game screenshots. \
Describe what is on screen: the scene, the player character and their state, visible UI elements \
(health, resources, minimap, inventory, objectives), enemies, and any on-screen text. \
Then estimate how likely it is that the screenshot comes from the named game. \
Answer only with the requested JSON object.";

pub const SYNTHESIS_SYSTEM_PROMPT: &str = "You are an expert game coach. Using the screenshot description, \
any research excerpts, and any game rules provided, answer the player's question with concrete, \
prioritized advice. Each recommendation has a priority of exactly \"high\", \"medium\" or \"low\", \
a specific action, the reasoning behind it, and the in-game context it applies to. \
Set referenceLink to an https URL from the research excerpts when one supports the advice, otherwise null. \
Confidence is a number between 0 and 1. Answer only with the requested JSON object.";

/// Output schema for the describe call
pub fn description_format() -> ResponseFormat {
    ResponseFormat::new(
        "image_description",
        serde_json::json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "Detailed description of the screenshot"
                },
                "relevance": {
                    "type": "number",
                    "description": "Probability between 0 and 1 that the screenshot is from the named game"
                }
            },
            "required": ["description", "relevance"],
            "additionalProperties": false
        }),
    )
}

/// Output schema for the synthesis call
pub fn recommendation_format() -> ResponseFormat {
    ResponseFormat::new(
        "recommendation",
        serde_json::json!({
            "type": "object",
            "properties": {
                "analysis": { "type": "string" },
                "summary": { "type": "string" },
                "recommendations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "priority": { "type": "string", "enum": ["high", "medium", "low"] },
                            "action": { "type": "string" },
                            "reasoning": { "type": "string" },
                            "context": { "type": "string" },
                            "referenceLink": { "type": ["string", "null"] }
                        },
                        "required": ["priority", "action", "reasoning", "context", "referenceLink"],
                        "additionalProperties": false
                    }
                },
                "confidence": { "type": "number" }
            },
            "required": ["analysis", "summary", "recommendations", "confidence"],
            "additionalProperties": false
        }),
    )
}

/// User text sent beside the screenshot
pub fn build_description_prompt(domain: &str) -> String {
    format!(
        "Game: {}\n\nDescribe this screenshot in detail and rate its relevance to {} \
         as a number between 0 and 1.",
        domain, domain
    )
}

/// Combined synthesis prompt. Empty sections are omitted entirely.
pub fn build_synthesis_prompt(
    description: &str,
    research: &[ResearchResult],
    rule_text: &str,
    user_prompt: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("## Screenshot Description\n\n");
    prompt.push_str(description.trim());
    prompt.push_str("\n\n");

    if !research.is_empty() {
        prompt.push_str("## Research\n\n");
        for (i, result) in research.iter().enumerate() {
            prompt.push_str(&format!(
                "### [{}] {}\nSource: {}\nRelevance: {:.2}\n\n{}\n\n",
                i + 1,
                result.title.trim(),
                result.url,
                result.relevance_score,
                result.content.trim()
            ));
        }
    }

    if !rule_text.trim().is_empty() {
        prompt.push_str("## Game Rules\n\n");
        prompt.push_str(rule_text.trim_end());
        prompt.push_str("\n\n");
    }

    prompt.push_str("## Question\n\n");
    prompt.push_str(user_prompt.trim());
    prompt.push('\n');
    prompt
}
