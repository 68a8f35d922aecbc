//! Converts rich-text activity titles into chat-formatted plain text.

use regex::Regex;

const LEADING_ANCHOR: &str = r"^<a[\s>].*?</a>";
const RESOLVED_LINK: &str = r#"<span class=['"]resolved-link['"]>(.+?)</span>"#;
const ANCHOR: &str = r#"<a\s[^>]*?href="([^"]+)"[^>]*>(.+?)</a>"#;
const WHITESPACE_RUN: &str = r"\s+";

/// Title normalizer with its patterns compiled once.
///
/// Steps run in order on the previous step's output:
/// 1. drop an anchor at the very start of the title (the actor link);
/// 2. wrap `resolved-link` spans in `~strike~` markers;
/// 3. rewrite remaining anchors as `<url|label>`;
/// 4. collapse whitespace runs and trim;
/// 5. decode HTML entities.
///
/// The pass repeats until the text stops changing, so normalizing an
/// already-normalized title is a no-op.
///
/// Repeating the pass also unwraps nested escapes: `&amp;lt;` ends up as `<`,
/// and entity-escaped markup from an issue summary is rendered (anchors become
/// live links) rather than kept as literal text.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    leading_anchor: Regex,
    resolved_link: Regex,
    anchor: Regex,
    whitespace_run: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            leading_anchor: Regex::new(LEADING_ANCHOR)?,
            resolved_link: Regex::new(RESOLVED_LINK)?,
            anchor: Regex::new(ANCHOR)?,
            whitespace_run: Regex::new(WHITESPACE_RUN)?,
        })
    }

    pub fn normalize(&self, title: &str) -> String {
        let mut current = self.normalize_once(title);
        loop {
            let next = self.normalize_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn normalize_once(&self, title: &str) -> String {
        let text = self.leading_anchor.replace(title, "");
        let text = self.resolved_link.replace_all(&text, "~${1}~");
        let text = self.anchor.replace_all(&text, "<${1}|${2}>");
        let text = self.whitespace_run.replace_all(&text, " ");
        html_escape::decode_html_entities(text.trim()).into_owned()
    }
}
