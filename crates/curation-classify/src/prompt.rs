//! System and user prompt construction for the Phase-1 classifier call.

use curation_core::taxonomy::describe_taxonomy;
use curation_extract::Extracted;

const EXCERPT_MAX_CHARS: usize = 1500;
const REASONING_MAX_CHARS: usize = 200;

pub fn system_prompt() -> String {
    format!(
        "You are a fast content classifier. Assign exactly one segment, one \
         category belonging to that segment, one content type, and a 4-letter \
         organization code (or UNKN if unclear) to the page described below.\n\n\
         {}\n\
         Respond with segment and contentType as single uppercase letters, \
         category as 3 uppercase letters, organization as 4 uppercase \
         letters or underscores. confidence is a number in [0, 1]. Keep \
         reasoning under {REASONING_MAX_CHARS} characters.",
        describe_taxonomy()
    )
}

pub fn user_prompt(canonical_url: &str, domain: &str, extracted: &Extracted) -> String {
    let mut lines = vec![
        format!("URL: {canonical_url}"),
        format!("Domain: {domain}"),
        format!("Title: {}", extracted.title),
    ];
    if let Some(description) = &extracted.description {
        lines.push(format!("Description: {description}"));
    }
    if let Some(author) = &extracted.author {
        lines.push(format!("Author: {author}"));
    }
    if let Some(site_name) = &extracted.site_name {
        lines.push(format!("Site name: {site_name}"));
    }
    lines.push(format!(
        "Excerpt: {}",
        extracted.excerpt(EXCERPT_MAX_CHARS)
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_mentions_every_segment() {
        let prompt = system_prompt();
        for segment in curation_core::taxonomy::SEGMENTS {
            assert!(prompt.contains(&segment.to_string()));
        }
    }

    #[test]
    fn user_prompt_truncates_excerpt() {
        let extracted = Extracted {
            title: "t".to_string(),
            description: None,
            author: None,
            site_name: None,
            favicon: None,
            image: None,
            main_content: "x".repeat(5000),
            word_count: 5000,
            language: None,
            content_type_hint: 'A',
            type_specific: serde_json::Value::Null,
        };
        let prompt = user_prompt("https://a.example.com", "a.example.com", &extracted);
        let excerpt_line = prompt.lines().last().unwrap();
        assert!(excerpt_line.len() <= EXCERPT_MAX_CHARS + "Excerpt: ".len());
    }
}
