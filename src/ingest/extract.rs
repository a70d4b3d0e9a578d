// src/ingest/extract.rs
//! Field extraction for scraped static pages.
//!
//! Every field with a fallback chain is an ordered slice of small rules, each
//! returning `Option<String>`. The first rule yielding `Some` wins.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::article::{self, ArticleRecord, SourceType, Thumbnail, NO_DESCRIPTION};

/// Scraped descriptions are cut to this many characters before the ellipsis.
pub const DESCRIPTION_MAX_CHARS: usize = 100;

type Rule = fn(&Html) -> Option<String>;

/// `<title>`, then the first `<h1>`.
pub const TITLE_RULES: &[Rule] = &[title_tag, first_heading];
/// `meta[name=date]`, then `time[datetime]`.
pub const DATE_RULES: &[Rule] = &[meta_date, time_datetime];
/// Open Graph image, then the biography figure, then any image.
pub const THUMBNAIL_RULES: &[Rule] = &[og_image, biography_figure_image, first_image];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

static SEL_TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static SEL_H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static SEL_P: Lazy<Selector> = Lazy::new(|| selector("p"));
static SEL_META_DATE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="date"]"#));
static SEL_TIME: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));
static SEL_OG_IMAGE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:image"]"#));
static SEL_BIO_IMG: Lazy<Selector> = Lazy::new(|| selector("figure.biography__image img"));
static SEL_IMG: Lazy<Selector> = Lazy::new(|| selector("img"));
static SEL_META_CATEGORY: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="category"]"#));

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

fn collapse_ws(s: &str) -> String {
    RE_WS.replace_all(s, " ").trim().to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    let el = doc.select(sel).next()?;
    non_empty(collapse_ws(&el.text().collect::<String>()))
}

fn first_attr(doc: &Html, sel: &Selector, attr: &str) -> Option<String> {
    let el = doc.select(sel).next()?;
    non_empty(el.value().attr(attr)?.trim().to_string())
}

pub fn title_tag(doc: &Html) -> Option<String> {
    first_text(doc, &SEL_TITLE)
}

pub fn first_heading(doc: &Html) -> Option<String> {
    first_text(doc, &SEL_H1)
}

pub fn meta_date(doc: &Html) -> Option<String> {
    first_attr(doc, &SEL_META_DATE, "content")
}

pub fn time_datetime(doc: &Html) -> Option<String> {
    first_attr(doc, &SEL_TIME, "datetime")
}

pub fn og_image(doc: &Html) -> Option<String> {
    first_attr(doc, &SEL_OG_IMAGE, "content")
}

pub fn biography_figure_image(doc: &Html) -> Option<String> {
    first_attr(doc, &SEL_BIO_IMG, "src")
}

pub fn first_image(doc: &Html) -> Option<String> {
    first_attr(doc, &SEL_IMG, "src")
}

pub fn first_match(doc: &Html, rules: &[Rule]) -> Option<String> {
    rules.iter().find_map(|rule| rule(doc))
}

/// First paragraph, cut to [`DESCRIPTION_MAX_CHARS`] and suffixed with `...`.
pub fn description(doc: &Html) -> String {
    match first_text(doc, &SEL_P) {
        Some(text) => {
            let cut: String = text.chars().take(DESCRIPTION_MAX_CHARS).collect();
            format!("{cut}...")
        }
        None => NO_DESCRIPTION.to_string(),
    }
}

/// Exact, case-sensitive comparison against the configured label.
pub fn is_feature(doc: &Html, label: &str) -> bool {
    doc.select(&SEL_META_CATEGORY)
        .next()
        .and_then(|el| el.value().attr("content"))
        .is_some_and(|c| c == label)
}

/// Resolve an image reference against the page URL; `//host/x` becomes `https://host/x`.
pub fn resolve_image_url(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let effective = if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    };
    let resolved = match base {
        Some(b) => b.join(&effective).ok()?,
        None => Url::parse(&effective).ok()?,
    };
    Some(resolved.to_string())
}

/// Candidates that fail to resolve fall through to the next rule.
pub fn thumbnail(doc: &Html, base: Option<&Url>) -> Option<Thumbnail> {
    THUMBNAIL_RULES
        .iter()
        .find_map(|rule| rule(doc).and_then(|raw| resolve_image_url(&raw, base)))
        .map(|url| Thumbnail { url })
}

/// Filename stem of the last path segment: `.../interview-01.html` -> `interview-01`.
pub fn page_id(page_url: &str) -> String {
    let last = page_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(page_url);
    let last = last.split(['?', '#']).next().unwrap_or(last);
    let stem = last.split('.').next().unwrap_or(last);
    if stem.is_empty() {
        page_url.to_string()
    } else {
        stem.to_string()
    }
}

/// Build a static-sourced record from a fetched page. Never fails; every field has a default.
pub fn extract_article(html: &str, page_url: &str, feature_label: &str) -> ArticleRecord {
    let doc = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let id = page_id(page_url);

    let title = first_match(&doc, TITLE_RULES).unwrap_or_else(|| article::placeholder_title(&id));

    let raw_date = first_match(&doc, DATE_RULES);
    let publish = raw_date.as_deref().and_then(article::parse_publish_date);
    match (&raw_date, &publish) {
        (Some(raw), None) => {
            tracing::warn!(url = %page_url, raw = %raw, "unparseable publish date; sorting at epoch")
        }
        (None, _) => tracing::debug!(url = %page_url, "no publish date on page"),
        _ => {}
    }
    let (publish_instant, display_date) = article::dated(publish);

    let thumbnail = thumbnail(&doc, base.as_ref());
    if thumbnail.is_none() {
        tracing::debug!(url = %page_url, "no thumbnail candidate resolved");
    }

    ArticleRecord {
        id,
        source_type: SourceType::Static,
        title,
        description: description(&doc),
        url: page_url.to_string(),
        thumbnail,
        publish_instant,
        display_date,
        feature_flag: is_feature(&doc, feature_label),
    }
}
