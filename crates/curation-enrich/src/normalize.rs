//! Metadata-code normalization (§4.7): UPPERCASE, underscores for spaces,
//! alphanumeric + underscore only, 2..=50 characters, at most 5 codes per
//! type. `MetadataCode::normalize_code` already does the character-class
//! rewrite; this module adds the length floor, per-type cap, and the
//! type-string parse that the LLM's free-form `metadataType` needs.

use std::collections::HashMap;

use curation_core::{MetadataCode, MetadataType};

use crate::schema::EnrichmentMetadataCode;

const MIN_CODE_LEN: usize = 2;
const MAX_CODES_PER_TYPE: usize = 5;
const ENRICHMENT_SOURCE: &str = "enrichment";

/// Normalize, drop malformed entries, and cap at 5 per type (highest
/// confidence kept). Unknown `metadataType` strings and codes that
/// collapse to fewer than 2 characters are dropped rather than failing
/// the whole enrichment pass.
pub fn normalize_metadata_codes(raw: &[EnrichmentMetadataCode]) -> Vec<MetadataCode> {
    let mut by_type: HashMap<MetadataType, HashMap<String, f32>> = HashMap::new();

    for item in raw {
        let Ok(metadata_type) = item.metadata_type.parse::<MetadataType>() else {
            tracing::debug!(raw_type = %item.metadata_type, "dropping metadata code with unknown type");
            continue;
        };
        let normalized = MetadataCode::normalize_code(&item.code);
        if normalized.len() < MIN_CODE_LEN {
            tracing::debug!(code = %item.code, "dropping metadata code shorter than 2 characters after normalization");
            continue;
        }
        let confidence = item.confidence.clamp(0.0, 1.0);
        let entry = by_type.entry(metadata_type).or_default();
        let best = entry.entry(normalized).or_insert(confidence);
        if confidence > *best {
            *best = confidence;
        }
    }

    let mut result = Vec::new();
    for (metadata_type, codes) in by_type {
        let mut ranked: Vec<(String, f32)> = codes.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(MAX_CODES_PER_TYPE);
        for (code, confidence) in ranked {
            result.push(MetadataCode {
                metadata_type,
                code,
                confidence,
                source: ENRICHMENT_SOURCE.to_string(),
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(metadata_type: &str, code: &str, confidence: f32) -> EnrichmentMetadataCode {
        EnrichmentMetadataCode {
            metadata_type: metadata_type.to_string(),
            code: code.to_string(),
            confidence,
        }
    }

    #[test]
    fn normalizes_case_and_spaces() {
        let codes = normalize_metadata_codes(&[raw("tec", "machine learning", 0.9)]);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].code, "MACHINE_LEARNING");
        assert_eq!(codes[0].metadata_type, MetadataType::Tec);
    }

    #[test]
    fn drops_unknown_type() {
        let codes = normalize_metadata_codes(&[raw("bogus", "rust", 0.9)]);
        assert!(codes.is_empty());
    }

    #[test]
    fn drops_single_character_codes() {
        let codes = normalize_metadata_codes(&[raw("tec", "!a!", 0.9)]);
        assert!(codes.is_empty());
    }

    #[test]
    fn caps_at_five_per_type_keeping_highest_confidence() {
        let raw_codes: Vec<EnrichmentMetadataCode> = (0..8)
            .map(|i| raw("tec", &format!("tag{i}"), i as f32 / 10.0))
            .collect();
        let codes = normalize_metadata_codes(&raw_codes);
        assert_eq!(codes.len(), 5);
        assert!(codes.iter().all(|c| c.confidence >= 0.3));
    }

    #[test]
    fn dedupes_same_code_keeping_max_confidence() {
        let codes = normalize_metadata_codes(&[
            raw("tec", "rust", 0.4),
            raw("tec", "Rust", 0.9),
        ]);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].confidence, 0.9);
    }
}
