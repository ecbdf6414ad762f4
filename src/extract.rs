//! Review extraction from listing markup.
//!
//! Each review container on a listing page is parsed independently. Fields
//! are recovered through ordered strategy chains: a field's strategies are
//! pure functions over the container element, tried in order until one
//! yields a value. Containers that lack a usable body, author or permalink
//! are rejected and counted; extraction never fails as a whole.
//!
//! # Recovered fields
//!
//! | Field | Strategies (in order) | Absent when |
//! |-------|-----------------------|-------------|
//! | permalink | first `a.context` linking to `/film/<subject>` | rejected |
//! | author | profile link `a.avatar`, then `/<user>/film/...` permalink path | rejected |
//! | body | `div.js-review div.body-text.-prose`, then `div.js-review .body-text` | rejected |
//! | language | body `lang` attribute, then detection from the text | default language |
//! | rating | `rated-<N>` class token on `span.rating` | `None` |
//! | reviewed_at | `time.timestamp[datetime]` | `None` |

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::config::Config;
use crate::models::RawReview;

const CONTAINER_SELECTOR: &str = "div.listitem article.production-viewing";

/// Why a container produced no review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingBody,
    TextTooShort,
    MissingAuthor,
    MissingPermalink,
}

/// Result of extracting one listing page.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Valid reviews in document order.
    pub reviews: Vec<RawReview>,
    /// Containers skipped by a rejection rule.
    pub rejected: usize,
}

struct Selectors {
    container: Selector,
    avatar: Selector,
    context_link: Selector,
    prose_body: Selector,
    any_body: Selector,
    rating: Selector,
    timestamp: Selector,
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {:?}", css, e))
}

impl Selectors {
    fn new() -> Result<Self> {
        Ok(Self {
            container: parse_selector(CONTAINER_SELECTOR)?,
            avatar: parse_selector("a.avatar[href^='/']")?,
            context_link: parse_selector("a.context[href]")?,
            prose_body: parse_selector("div.js-review div.body-text.-prose")?,
            any_body: parse_selector("div.js-review .body-text")?,
            rating: parse_selector("span.rating[class*='rated-']")?,
            timestamp: parse_selector("time.timestamp[datetime]")?,
        })
    }
}

type AuthorStrategy = fn(&Selectors, ElementRef<'_>, Option<&str>) -> Option<String>;
type BodyStrategy = for<'a> fn(&Selectors, ElementRef<'a>) -> Option<ElementRef<'a>>;

const AUTHOR_STRATEGIES: &[AuthorStrategy] = &[author_from_avatar, author_from_permalink];
const BODY_STRATEGIES: &[BodyStrategy] = &[prose_body, any_body];

fn author_from_avatar(sel: &Selectors, el: ElementRef<'_>, _permalink: Option<&str>) -> Option<String> {
    let href = el.select(&sel.avatar).next()?.value().attr("href")?;
    let handle = href.trim_matches('/');
    if handle.is_empty() || handle.contains('/') {
        return None;
    }
    Some(handle.to_string())
}

fn author_from_permalink(
    _sel: &Selectors,
    _el: ElementRef<'_>,
    permalink: Option<&str>,
) -> Option<String> {
    let path = url_path(permalink?);
    let mut parts = path.split('/');
    // "/<user>/film/<slug>/..." splits into "", user, "film", ...
    if parts.next()? != "" {
        return None;
    }
    let user = parts.next()?;
    if user.is_empty() || parts.next()? != "film" {
        return None;
    }
    Some(user.to_string())
}

fn prose_body<'a>(sel: &Selectors, el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.select(&sel.prose_body).next()
}

fn any_body<'a>(sel: &Selectors, el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.select(&sel.any_body).next()
}

/// Path component of an absolute or root-relative URL.
fn url_path(href: &str) -> &str {
    match href.find("://") {
        Some(scheme_end) => {
            let rest = &href[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => href,
    }
}

/// Text nodes trimmed and joined with single spaces.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// ISO 639-1 code of the text's language, when detection is confident.
fn detect_language(text: &str) -> Option<&'static str> {
    let info = whatlang::detect(text)?;
    if !info.is_reliable() {
        return None;
    }
    let code = match info.lang().code() {
        "eng" => "en",
        "fra" => "fr",
        "deu" => "de",
        "spa" => "es",
        "por" => "pt",
        "ita" => "it",
        "nld" => "nl",
        "swe" => "sv",
        "dan" => "da",
        "nob" => "no",
        "fin" => "fi",
        "pol" => "pl",
        "ces" => "cs",
        "tur" => "tr",
        "rus" => "ru",
        "ukr" => "uk",
        "ell" => "el",
        "ara" => "ar",
        "heb" => "he",
        "hin" => "hi",
        "jpn" => "ja",
        "kor" => "ko",
        "cmn" => "zh",
        "ind" => "id",
        "vie" => "vi",
        "tha" => "th",
        _ => return None,
    };
    Some(code)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Parses listing markup into [`RawReview`]s.
pub struct Extractor {
    selectors: Selectors,
    rating_pattern: Regex,
    base_url: String,
    min_text_chars: usize,
    default_language: String,
}

impl Extractor {
    pub fn new(base_url: &str, min_text_chars: usize, default_language: &str) -> Result<Self> {
        Ok(Self {
            selectors: Selectors::new()?,
            rating_pattern: Regex::new(r"rated-(\d+)")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            min_text_chars,
            default_language: default_language.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.source.base_url,
            config.extract.min_text_chars,
            &config.extract.default_language,
        )
    }

    /// True if the markup holds at least one review container.
    pub fn has_review_containers(&self, markup: &str) -> bool {
        let doc = Html::parse_document(markup);
        let found = doc.select(&self.selectors.container).next().is_some();
        found
    }

    /// Extract up to `limit` reviews for `subject_id`, in document order.
    pub fn extract(&self, markup: &str, subject_id: &str, limit: usize) -> Extraction {
        let mut out = Extraction::default();
        if limit == 0 {
            return out;
        }

        let doc = Html::parse_document(markup);
        for container in doc.select(&self.selectors.container) {
            match self.extract_one(container, subject_id) {
                Ok(review) => {
                    out.reviews.push(review);
                    if out.reviews.len() >= limit {
                        break;
                    }
                }
                Err(reason) => {
                    debug!(subject = subject_id, ?reason, "container rejected");
                    out.rejected += 1;
                }
            }
        }

        debug!(
            subject = subject_id,
            extracted = out.reviews.len(),
            rejected = out.rejected,
            "extraction finished"
        );
        out
    }

    fn extract_one(&self, el: ElementRef<'_>, subject_id: &str) -> Result<RawReview, Rejection> {
        let sel = &self.selectors;

        let body = BODY_STRATEGIES
            .iter()
            .find_map(|strategy| strategy(sel, el))
            .ok_or(Rejection::MissingBody)?;
        let text = element_text(body);
        if text.chars().count() < self.min_text_chars.max(1) {
            return Err(Rejection::TextTooShort);
        }

        let permalink = self.permalink_href(el, subject_id);
        let author = AUTHOR_STRATEGIES
            .iter()
            .find_map(|strategy| strategy(sel, el, permalink))
            .ok_or(Rejection::MissingAuthor)?;
        let url = permalink
            .map(|href| self.absolute_url(href))
            .ok_or(Rejection::MissingPermalink)?;

        let language = body
            .value()
            .attr("lang")
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .or_else(|| detect_language(&text))
            .unwrap_or(self.default_language.as_str())
            .to_string();

        Ok(RawReview {
            subject_id: subject_id.to_string(),
            text,
            author,
            url,
            language,
            rating: self.rating(el),
            reviewed_at: self.reviewed_at(el),
        })
    }

    /// First context link pointing at this subject's film path.
    fn permalink_href<'a>(&self, el: ElementRef<'a>, subject_id: &str) -> Option<&'a str> {
        let needle = format!("/film/{}", subject_id);
        el.select(&self.selectors.context_link)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| {
                let path = url_path(href);
                match path.find(&needle) {
                    Some(pos) => {
                        let after = &path[pos + needle.len()..];
                        after.is_empty() || after.starts_with('/')
                    }
                    None => false,
                }
            })
    }

    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }

    fn rating(&self, el: ElementRef<'_>) -> Option<f64> {
        let class = el.select(&self.selectors.rating).next()?.value().attr("class")?;
        let caps = self.rating_pattern.captures(class)?;
        caps.get(1)?.as_str().parse::<f64>().ok()
    }

    fn reviewed_at(&self, el: ElementRef<'_>) -> Option<DateTime<Utc>> {
        let time = el.select(&self.selectors.timestamp).next()?;
        parse_timestamp(time.value().attr("datetime")?)
    }
}
