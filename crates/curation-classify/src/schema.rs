//! Wire shape the LLM is forced to return, via `curation_ai::StructuredOutput`.
//! Letters come back as single-character strings since JSON Schema has no
//! native char type; `classifier.rs` takes the first character of each and
//! validates it against the fixed taxonomy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutput {
    /// One of the 10 segment letters.
    pub segment: String,
    /// Exactly 3 uppercase letters, belonging to `segment`'s category set.
    pub category: String,
    /// One of the 12 content-type letters.
    pub content_type: String,
    /// 4 uppercase letters/underscores, or `UNKN` if unknown.
    pub organization: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// Short justification, truncated to 200 characters.
    pub reasoning: Option<String>,
}
