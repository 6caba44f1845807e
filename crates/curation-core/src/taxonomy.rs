//! Fixed classification taxonomy: the 10 segments, each segment's category
//! set, and the 12 content types. Shared by the classifier (to validate
//! LLM output) and the hierarchy engine (to validate codes at rest).

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Safe defaults used whenever classifier output falls outside its allowed
/// set (spec §4.3 validation policy).
pub const DEFAULT_SEGMENT: char = 'T';
pub const DEFAULT_CATEGORY: &str = "OTH";
pub const DEFAULT_CONTENT_TYPE: char = 'A';
pub const DEFAULT_ORGANIZATION: &str = "UNKN";

/// The 10 top-level functional segments.
pub const SEGMENTS: &[char] = &['T', 'B', 'M', 'F', 'H', 'E', 'L', 'G', 'S', 'C'];

/// The 12 content-type letters, shared across every segment.
pub const CONTENT_TYPES: &[char] = &[
    'T', 'A', 'V', 'P', 'R', 'G', 'S', 'C', 'I', 'N', 'K', 'U',
];

/// Per-segment category sets. `OTH` is always present as the fallback.
static CATEGORIES_BY_SEGMENT: Lazy<HashMap<char, &'static [&'static str]>> = Lazy::new(|| {
    let mut m: HashMap<char, &'static [&'static str]> = HashMap::new();
    m.insert('T', &["DEV", "AIX", "SAS", "SEC", "DAT", "OTH"]);
    m.insert('B', &["FIN", "MKT", "SAL", "OPS", "LEG", "OTH"]);
    m.insert('M', &["SOC", "NWS", "ENT", "POD", "BLG", "OTH"]);
    m.insert('F', &["EDU", "RES", "LRN", "COU", "CRT", "OTH"]);
    m.insert('H', &["MED", "FIT", "MEN", "NUT", "CAR", "OTH"]);
    m.insert('E', &["RTL", "TRV", "FOD", "HOM", "AUT", "OTH"]);
    m.insert('L', &["GOV", "POL", "ADV", "NPO", "CIV", "OTH"]);
    m.insert('G', &["SIM", "MOB", "CON", "ESP", "TOY", "OTH"]);
    m.insert('S', &["SPT", "FAN", "TEA", "EVT", "REC", "OTH"]);
    m.insert('C', &["SCI", "ENG", "MTH", "PHY", "BIO", "OTH"]);
    m
});

/// Whether `segment` is one of the 10 allowed letters.
pub fn is_valid_segment(segment: char) -> bool {
    SEGMENTS.contains(&segment)
}

/// Whether `content_type` is one of the 12 allowed letters.
pub fn is_valid_content_type(content_type: char) -> bool {
    CONTENT_TYPES.contains(&content_type)
}

/// Whether `category` belongs to `segment`'s category set.
pub fn category_belongs_to_segment(segment: char, category: &str) -> bool {
    CATEGORIES_BY_SEGMENT
        .get(&segment)
        .map(|cats| cats.contains(&category))
        .unwrap_or(false)
}

/// The category set for a segment, or just `OTH` for an unrecognized one.
pub fn categories_for_segment(segment: char) -> &'static [&'static str] {
    CATEGORIES_BY_SEGMENT
        .get(&segment)
        .copied()
        .unwrap_or(&["OTH"])
}

/// Whether `organization` matches `^[A-Z_]{4}$`.
pub fn is_valid_organization(organization: &str) -> bool {
    organization.len() == 4 && organization.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

/// Render the system prompt fragment enumerating all codes and categories,
/// used to build the Phase-1 classifier's LLM system prompt.
pub fn describe_taxonomy() -> String {
    let mut out = String::new();
    out.push_str("Segments and their categories:\n");
    for seg in SEGMENTS {
        let cats = categories_for_segment(*seg);
        out.push_str(&format!("  {seg}: {}\n", cats.join(", ")));
    }
    out.push_str(&format!(
        "Content types: {}\n",
        CONTENT_TYPES.iter().collect::<String>()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_segment_and_category_pairing() {
        assert!(is_valid_segment('T'));
        assert!(!is_valid_segment('Z'));
        assert!(category_belongs_to_segment('T', "DEV"));
        assert!(!category_belongs_to_segment('T', "FIN"));
        assert!(category_belongs_to_segment('B', "FIN"));
    }

    #[test]
    fn validates_organization_shape() {
        assert!(is_valid_organization("GHUB"));
        assert!(is_valid_organization("UNKN"));
        assert!(!is_valid_organization("ghub"));
        assert!(!is_valid_organization("TOOLONG"));
    }
}
