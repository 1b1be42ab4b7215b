//! The named matchers that make up the default HTML cascade.
//!
//! Ordered from most specific (a fenced block labeled `html` that closes the
//! root element) to most permissive (a bare `<html>…</html>` span with no
//! fencing at all). Each matcher returns every non-overlapping hit in the
//! text; the cascade decides which one wins.

use regex::Regex;
use std::sync::LazyLock;

/// A named extraction rule.
#[derive(Clone, Copy)]
pub struct Matcher {
    /// Stable name, reported in logs and on the selected artifact
    pub name: &'static str,
    find: fn(&str) -> Vec<String>,
}

impl Matcher {
    pub const fn new(name: &'static str, find: fn(&str) -> Vec<String>) -> Self {
        Self { name, find }
    }

    /// All candidate texts this rule finds in `text`, in order of appearance.
    pub fn find_all(&self, text: &str) -> Vec<String> {
        (self.find)(text)
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher").field("name", &self.name).finish()
    }
}

static FENCED_HTML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```html\s*(.*?)```").expect("Invalid fenced_html regex"));

/// Any fenced block, label or not; the body ends at the first closing fence.
static FENCE_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n`]*\n(.*?)```").expect("Invalid fence body regex"));

static DOCTYPE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<!doctype\s+html").expect("Invalid doctype regex"));

static BARE_DOCTYPE_DOCUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<!doctype\s+html.*?</html>)").expect("Invalid bare_doctype_document regex")
});

static BARE_ROOT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<html.*?</html>)").expect("Invalid bare_root_element regex")
});

const ROOT_CLOSE: &str = "</html>";

/// Collect capture group 1 of every match, trimmed.
fn captures(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Cut `body` just after its last root-element closing marker.
///
/// `None` when the body never closes the root element.
fn through_root_close(body: String) -> Option<String> {
    // ASCII lowercasing keeps byte offsets intact.
    let end = body.to_ascii_lowercase().rfind(ROOT_CLOSE)? + ROOT_CLOSE.len();
    Some(body[..end].to_string())
}

fn fenced_html_document(text: &str) -> Vec<String> {
    captures(&FENCED_HTML, text)
        .into_iter()
        .filter_map(through_root_close)
        .collect()
}

fn fenced_html(text: &str) -> Vec<String> {
    captures(&FENCED_HTML, text)
}

fn fenced_doctype(text: &str) -> Vec<String> {
    captures(&FENCE_BODY, text)
        .into_iter()
        .filter(|body| DOCTYPE_START.is_match(body))
        .collect()
}

fn fenced_root_element(text: &str) -> Vec<String> {
    captures(&FENCE_BODY, text)
        .into_iter()
        .filter(|body| body.get(..5).is_some_and(|s| s.eq_ignore_ascii_case("<html")))
        .filter_map(through_root_close)
        .collect()
}

fn fenced_ending_root(text: &str) -> Vec<String> {
    captures(&FENCE_BODY, text)
        .into_iter()
        .filter_map(through_root_close)
        .collect()
}

fn bare_doctype_document(text: &str) -> Vec<String> {
    captures(&BARE_DOCTYPE_DOCUMENT, text)
}

fn bare_root_element(text: &str) -> Vec<String> {
    captures(&BARE_ROOT_ELEMENT, text)
}

/// The default cascade, most specific first.
pub fn html_cascade() -> Vec<Matcher> {
    vec![
        Matcher::new("fenced_html_document", fenced_html_document),
        Matcher::new("fenced_html", fenced_html),
        Matcher::new("fenced_doctype", fenced_doctype),
        Matcher::new("fenced_root_element", fenced_root_element),
        Matcher::new("fenced_ending_root", fenced_ending_root),
        Matcher::new("bare_doctype_document", bare_doctype_document),
        Matcher::new("bare_root_element", bare_root_element),
    ]
}
