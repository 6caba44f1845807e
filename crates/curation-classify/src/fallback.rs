//! URL-pattern fallback used whenever the LLM call fails. Classification is
//! never fatal to an import (spec §4.8 step 4) — this is always the safety
//! net underneath `classify`.

use curation_core::taxonomy::{is_valid_content_type, DEFAULT_CATEGORY, DEFAULT_CONTENT_TYPE, DEFAULT_ORGANIZATION, DEFAULT_SEGMENT};
use curation_core::Classification;
use curation_extract::Extracted;

/// Confidence ceiling for any fallback classification — never mistaken for
/// a genuine LLM result.
const FALLBACK_CONFIDENCE: f32 = 0.2;

pub fn fallback_classification(canonical_url: &str, extracted: &Extracted) -> Classification {
    let host = url::Url::parse(canonical_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    let organization = organization_for_host(&host);
    let content_type = if is_valid_content_type(extracted.content_type_hint) {
        extracted.content_type_hint
    } else {
        DEFAULT_CONTENT_TYPE
    };

    Classification {
        segment: DEFAULT_SEGMENT,
        category: DEFAULT_CATEGORY.to_string(),
        content_type,
        organization,
        confidence: FALLBACK_CONFIDENCE,
        reasoning: Some(format!("classifier fallback: no LLM response for host {host}")),
        from_cache: false,
        fallback: true,
    }
}

/// A handful of well-known hosts where the organization is unambiguous
/// even without a model call. Anything else falls back to `UNKN`.
fn organization_for_host(host: &str) -> String {
    let stripped = host.strip_prefix("www.").unwrap_or(host);
    match stripped {
        "github.com" => "GHUB",
        "youtube.com" | "youtu.be" => "GOOG",
        "twitter.com" | "x.com" => "TWTR",
        _ => DEFAULT_ORGANIZATION,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(hint: char) -> Extracted {
        Extracted {
            title: "t".to_string(),
            description: None,
            author: None,
            site_name: None,
            favicon: None,
            image: None,
            main_content: String::new(),
            word_count: 0,
            language: None,
            content_type_hint: hint,
            type_specific: serde_json::Value::Null,
        }
    }

    #[test]
    fn recognizes_github() {
        let c = fallback_classification("https://github.com/foo/bar", &extracted('R'));
        assert_eq!(c.organization, "GHUB");
        assert_eq!(c.content_type, 'R');
        assert!(c.fallback);
        assert!(c.confidence <= 0.3);
    }

    #[test]
    fn recognizes_youtube() {
        let c = fallback_classification("https://www.youtube.com/watch?v=x", &extracted('V'));
        assert_eq!(c.organization, "GOOG");
        assert_eq!(c.content_type, 'V');
    }

    #[test]
    fn unknown_host_falls_back_to_unkn() {
        let c = fallback_classification("https://example.com/a", &extracted('A'));
        assert_eq!(c.organization, "UNKN");
        assert_eq!(c.segment, 'T');
        assert_eq!(c.category, "OTH");
    }

    #[test]
    fn invalid_content_type_hint_falls_back_to_default() {
        let c = fallback_classification("https://example.com/a", &extracted('?'));
        assert_eq!(c.content_type, 'A');
    }
}
