//! System and user prompt construction for the Phase-2 enrichment call.

use curation_core::Node;

const EXCERPT_MAX_CHARS: usize = 4000;

pub fn system_prompt() -> String {
    "You are a content enrichment assistant. Given a curated item's existing \
     metadata and the text extracted from its source page, propose an \
     improved title only if the existing one is generic, the producing \
     company if identifiable, a one-phrase description, a one-sentence short \
     description, a short AI summary, up to 10 key concepts, a logo URL if \
     one was present in the extracted fields, and a bag of typed metadata \
     codes (type one of ORG, DOM, FNC, TEC, CON, IND, AUD, PRC, LIC, LNG, \
     PLT, SEG, CAT, TYP) each with a confidence in [0, 1]. Leave any field \
     null rather than guessing. Do not invent facts not present in the \
     source material."
        .to_string()
}

pub fn user_prompt(node: &Node) -> String {
    let mut lines = vec![
        format!("Title: {}", node.title),
        format!("URL: {}", node.source_url),
        format!("Domain: {}", node.source_domain),
    ];
    if let Some(company) = &node.company {
        lines.push(format!("Known company: {company}"));
    }
    if !node.metadata_tags.is_empty() {
        lines.push(format!("Existing tags: {}", node.metadata_tags.join(", ")));
    }
    let excerpt = node
        .extracted_fields
        .get("main_content")
        .and_then(|v| v.as_str())
        .or_else(|| node.extracted_fields.get("description").and_then(|v| v.as_str()))
        .unwrap_or_default();
    let truncated: String = excerpt.chars().take(EXCERPT_MAX_CHARS).collect();
    lines.push(format!("Extracted content: {truncated}"));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn node() -> Node {
        Node {
            id: Uuid::new_v4(),
            title: "Untitled page".to_string(),
            source_url: "https://example.com/a".to_string(),
            source_domain: "example.com".to_string(),
            company: None,
            extracted_fields: serde_json::json!({"main_content": "x".repeat(5000)}),
            metadata_tags: Vec::new(),
            ai_summary: None,
            phrase_description: None,
            short_description: None,
            key_concepts: Vec::new(),
            logo_url: None,
            segment_code: "T".to_string(),
            category_code: "DEV".to_string(),
            content_type_code: "A".to_string(),
            organization_code: "UNKN".to_string(),
            function_hierarchy_code: "T.DEV.A.1".to_string(),
            organization_hierarchy_code: "UNKN.DEV.A.1".to_string(),
            descriptor: String::new(),
            is_deleted: false,
            date_added: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn truncates_excerpt() {
        let prompt = user_prompt(&node());
        let excerpt_line = prompt.lines().last().unwrap();
        assert!(excerpt_line.len() <= EXCERPT_MAX_CHARS + "Extracted content: ".len());
    }
}
