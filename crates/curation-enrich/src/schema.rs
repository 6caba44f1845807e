//! Wire shape the LLM is forced to return for a Phase-2 enrichment pass,
//! via `curation_ai::StructuredOutput`. `classifier_rationale` letters
//! were already fixed in Phase 1; enrichment only ever sharpens the
//! descriptive fields and proposes metadata tags.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentMetadataCode {
    /// One of ORG, DOM, FNC, TEC, CON, IND, AUD, PRC, LIC, LNG, PLT, SEG, CAT, TYP.
    pub metadata_type: String,
    pub code: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentOutput {
    /// A sharper title than the one extraction produced, if warranted.
    pub title: Option<String>,
    pub company: Option<String>,
    pub phrase_description: Option<String>,
    pub short_description: Option<String>,
    pub ai_summary: Option<String>,
    pub key_concepts: Vec<String>,
    pub logo_url: Option<String>,
    pub metadata_codes: Vec<EnrichmentMetadataCode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_ai::StructuredOutput;

    #[test]
    fn schema_has_no_refs_or_definitions() {
        let schema = EnrichmentOutput::openai_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));
    }
}
