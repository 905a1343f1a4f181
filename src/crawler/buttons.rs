//! Classification of the buttons attached to a review
//!
//! Every review renders several buttons sharing its `data-review-id`. Which one
//! is which can only be told from labels and attributes. Predicates are checked
//! in a fixed order and the first match wins.

use regex::Regex;
use std::sync::OnceLock;

/// Attributes of a review button relevant to classification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonAttrs {
    pub aria_label: Option<String>,
    pub title: Option<String>,
    pub data_href: Option<String>,
    pub photo_index: Option<String>,
    pub style: Option<String>,
}

/// What a review button does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonKind {
    /// Author avatar; `link` is the author's contributions page
    AuthorPhoto { link: String },
    /// Opens the share panel holding the review permalink
    Share,
    /// Like counter, already parsed
    Likes(String),
    /// Attached photo, already resolved to its URL
    Photo(String),
    Unknown,
}

fn author_photo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)photo\s+of").expect("author photo pattern is valid"))
}

fn share_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)share").expect("share pattern is valid"))
}

fn likes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d*)\s*like").expect("likes pattern is valid"))
}

fn photo_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"url\((?:&quot;|")?(https?://.+?)(?:&quot;|")?\)"#)
            .expect("photo url pattern is valid")
    })
}

fn author_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"contrib/(.+)/review").expect("author id pattern is valid"))
}

/// Classifies a button by its attributes
pub fn classify(attrs: &ButtonAttrs) -> ButtonKind {
    let label = attrs.aria_label.as_deref().unwrap_or("");

    if author_photo_re().is_match(label) {
        if let Some(link) = attrs.data_href.as_deref().filter(|l| !l.is_empty()) {
            return ButtonKind::AuthorPhoto {
                link: link.to_string(),
            };
        }
    }

    if share_re().is_match(label) {
        return ButtonKind::Share;
    }

    if let Some(likes) = attrs.title.as_deref().and_then(parse_likes) {
        return ButtonKind::Likes(likes);
    }

    if attrs.photo_index.as_deref().is_some_and(|i| !i.is_empty()) {
        if let Some(url) = attrs.style.as_deref().and_then(parse_photo_url) {
            return ButtonKind::Photo(url);
        }
    }

    ButtonKind::Unknown
}

/// Parses a like counter tooltip
///
/// A tooltip mentioning likes without a number ("Liked") counts as zero.
pub fn parse_likes(title: &str) -> Option<String> {
    let caps = likes_re().captures(title)?;
    let count = caps[1].trim();
    Some(if count.is_empty() {
        "0".to_string()
    } else {
        count.to_string()
    })
}

/// Extracts the image URL from an inline `background-image` style
pub fn parse_photo_url(style: &str) -> Option<String> {
    photo_url_re()
        .captures(style)
        .map(|caps| caps[1].to_string())
}

/// Extracts the author id from a contributions link
pub fn parse_author_id(link: &str) -> Option<String> {
    author_id_re()
        .captures(link)
        .map(|caps| caps[1].to_string())
}
