// Renderer - turns raw comment text into safe display HTML ("cooked")
// Everything is escaped first; only a small inline subset is turned back into markup.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub trait TextRenderer: Send + Sync {
    fn cook(&self, raw: &str) -> String;
}

static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("valid regex"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"']+[^\s<>"'.,;:!?)]"#).expect("valid regex"));
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\n]+)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid regex"));
static MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[\s(])@([A-Za-z0-9_][A-Za-z0-9_.\-]*[A-Za-z0-9_])").expect("valid regex")
});

/// Inline markup only: `code`, **bold**, *italic*, bare links and @mentions
#[derive(Debug, Default, Clone)]
pub struct BasicRenderer;

impl BasicRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Links are emitted untouched; only the text between them gets inline formatting
    fn format_inline(text: &str) -> String {
        let escaped = escape_html(text);
        let mut out = String::with_capacity(escaped.len());
        let mut last = 0;

        for link in LINK.find_iter(&escaped) {
            out.push_str(&Self::format_text(&escaped[last..link.start()]));
            let url = link.as_str();
            out.push_str(&format!(r#"<a href="{url}" rel="nofollow noopener">{url}</a>"#));
            last = link.end();
        }
        out.push_str(&Self::format_text(&escaped[last..]));
        out.replace('\n', "<br>")
    }

    fn format_text(escaped: &str) -> String {
        let bolded = BOLD.replace_all(escaped, "<strong>$1</strong>");
        let emphasised = ITALIC.replace_all(&bolded, "<em>$1</em>");
        MENTION
            .replace_all(&emphasised, |caps: &Captures| {
                format!(
                    r#"{}<a class="mention" href="/u/{}">@{}</a>"#,
                    &caps[1],
                    caps[2].to_lowercase(),
                    &caps[2]
                )
            })
            .into_owned()
    }
}

impl TextRenderer for BasicRenderer {
    fn cook(&self, raw: &str) -> String {
        let raw = raw.trim();
        let mut cooked = String::with_capacity(raw.len() + 16);
        let mut last = 0;

        for caps in CODE_SPAN.captures_iter(raw) {
            let Some(whole) = caps.get(0) else { continue };
            cooked.push_str(&Self::format_inline(&raw[last..whole.start()]));
            cooked.push_str("<code>");
            cooked.push_str(&escape_html(&caps[1]));
            cooked.push_str("</code>");
            last = whole.end();
        }
        cooked.push_str(&Self::format_inline(&raw[last..]));
        cooked
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
