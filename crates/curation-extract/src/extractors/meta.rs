//! Shared HTML meta-tag parsing used by the generic extractor and by
//! per-source adapters that still want OpenGraph fallbacks (e.g. a GitHub
//! repo page without a recognizable API shortcut).

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("link").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static HTML_TAG: Lazy<Selector> = Lazy::new(|| Selector::parse("html").unwrap());

/// The subset of `<meta>`/`<link>`/`<title>` fields the generic extractor
/// and the classifier both care about.
#[derive(Debug, Clone, Default)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub site_name: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub language: Option<String>,
}

fn meta_attr(el: &scraper::ElementRef, key: &str, value: &str) -> Option<String> {
    let matches = el.value().attr(key).map(|v| v == value).unwrap_or(false);
    if matches {
        el.value().attr("content").map(str::to_string)
    } else {
        None
    }
}

pub fn parse(html: &str) -> PageMeta {
    let document = Html::parse_document(html);
    let mut meta = PageMeta::default();

    for el in document.select(&META) {
        if meta.description.is_none() {
            if let Some(v) = meta_attr(&el, "name", "description") {
                meta.description = Some(v);
            }
        }
        if let Some(v) = meta_attr(&el, "property", "og:description") {
            meta.description = Some(v);
        }
        if let Some(v) = meta_attr(&el, "property", "og:title") {
            meta.title = Some(v);
        }
        if let Some(v) = meta_attr(&el, "property", "og:site_name") {
            meta.site_name = Some(v);
        }
        if let Some(v) = meta_attr(&el, "property", "og:image") {
            meta.image = Some(v);
        }
        if meta.author.is_none() {
            if let Some(v) = meta_attr(&el, "name", "author") {
                meta.author = Some(v);
            }
        }
    }

    for el in document.select(&LINK) {
        let is_icon = el
            .value()
            .attr("rel")
            .map(|r| r.contains("icon"))
            .unwrap_or(false);
        if is_icon {
            if let Some(href) = el.value().attr("href") {
                meta.favicon = Some(href.to_string());
            }
        }
    }

    if meta.title.is_none() {
        meta.title = document
            .select(&TITLE)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());
    }
    if meta.title.is_none() {
        meta.title = document
            .select(&H1)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());
    }

    meta.language = document
        .select(&HTML_TAG)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(str::to_string);

    meta
}

/// Readable plain-text body, via `html2text`, used as the extractor's
/// `main_content` and truncated later by the classifier for its excerpt.
pub fn body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let scoped = document
        .select(&BODY)
        .next()
        .map(|el| el.html())
        .unwrap_or_else(|| html.to_string());
    curation_core::html_to_plain_text(&scoped)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
