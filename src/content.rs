use log::debug;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;

/// Cleaned text and metadata extracted from a fetched page, ready for
/// prompting. Request-scoped; never cached on its own.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: String,
    /// Raw JSON-LD fragments found on the page, kept uninterpreted
    pub structured_data: Vec<Value>,
}

/// Content areas tried in order of preference before falling back to body.
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[role=\"main\"]",
    "main",
    ".recipe",
    ".recipe-content",
    ".recipe-card",
    ".post-content",
    ".entry-content",
    ".content",
    "#content",
];

/// Elements whose text is never page content.
fn should_skip_element(tag: &str) -> bool {
    matches!(
        tag,
        "script"
            | "style"
            | "noscript"
            | "iframe"
            | "svg"
            | "canvas"
            | "nav"
            | "header"
            | "footer"
            | "aside"
            | "form"
    )
}

fn is_hidden(element: &ElementRef) -> bool {
    element.value().attr("hidden").is_some()
        || element
            .value()
            .attr("style")
            .map(|s| s.contains("display: none") || s.contains("visibility: hidden"))
            .unwrap_or(false)
}

fn collect_text(element: &ElementRef, out: &mut Vec<String>) {
    if is_hidden(element) || should_skip_element(element.value().name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !trimmed.is_empty() {
                    out.push(trimmed);
                }
            }
            Node::Element(_) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, out);
                }
            }
            _ => {}
        }
    }
}

fn element_text(element: &ElementRef) -> String {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    parts.join(" ")
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").expect("static selector");
    if let Some(el) = document.select(&title_selector).next() {
        let text = el.inner_html();
        let decoded = html_escape::decode_html_entities(text.trim()).to_string();
        if !decoded.is_empty() {
            return Some(decoded);
        }
    }

    let og_selector = Selector::parse(r#"meta[property="og:title"]"#).expect("static selector");
    if let Some(el) = document.select(&og_selector).next() {
        if let Some(content) = el.value().attr("content") {
            let decoded = html_escape::decode_html_entities(content.trim()).to_string();
            if !decoded.is_empty() {
                return Some(decoded);
            }
        }
    }

    let h1_selector = Selector::parse("h1").expect("static selector");
    document.select(&h1_selector).next().and_then(|el| {
        let text = element_text(&el);
        (!text.is_empty()).then_some(text)
    })
}

fn extract_description(document: &Html) -> Option<String> {
    for selector in [
        r#"meta[name="description"]"#,
        r#"meta[property="og:description"]"#,
    ] {
        let selector = Selector::parse(selector).expect("static selector");
        if let Some(el) = document.select(&selector).next() {
            if let Some(content) = el.value().attr("content") {
                let decoded = html_escape::decode_html_entities(content.trim()).to_string();
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        }
    }
    None
}

fn extract_structured_data(document: &Html) -> Vec<Value> {
    let selector =
        Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector");
    document
        .select(&selector)
        .filter_map(|el| {
            let raw = el.inner_html();
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("skipping unparsable JSON-LD fragment: {}", e);
                    None
                }
            }
        })
        .collect()
}

fn extract_main_text(document: &Html) -> String {
    for selector_str in CONTENT_SELECTORS {
        let selector = Selector::parse(selector_str).expect("static selector");
        if let Some(el) = document.select(&selector).next() {
            let text = element_text(&el);
            // A content area shorter than this is navigation chrome, not
            // the article itself
            if text.len() > 100 {
                debug!("found main content using selector: {}", selector_str);
                return text;
            }
        }
    }

    let body_selector = Selector::parse("body").expect("static selector");
    document
        .select(&body_selector)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default()
}

/// Reduce raw HTML to cleaned text and metadata for downstream prompting.
pub fn extract(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    PageContent {
        title: extract_title(&document),
        description: extract_description(&document),
        text: extract_main_text(&document),
        structured_data: extract_structured_data(&document),
    }
}
