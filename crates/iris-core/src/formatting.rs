//! Markup helpers shared by reply builders (Telegram HTML or plain markdown).

use crate::paginate::HeaderStyle;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Target markup of outgoing text.
///
/// Every helper returns final text, so byte counts taken on the result are the
/// bytes that will actually be sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Markup {
    #[default]
    Markdown,
    Html,
}

impl Markup {
    /// Literal user text.
    pub fn text(self, text: &str) -> String {
        match self {
            Markup::Markdown => text.to_string(),
            Markup::Html => escape_html(text),
        }
    }

    pub fn strong(self, text: &str) -> String {
        match self {
            Markup::Markdown => format!("**{text}**"),
            Markup::Html => format!("<b>{}</b>", escape_html(text)),
        }
    }

    pub fn emphasis(self, text: &str) -> String {
        match self {
            Markup::Markdown => format!("*{text}*"),
            Markup::Html => format!("<i>{}</i>", escape_html(text)),
        }
    }

    pub fn code(self, text: &str) -> String {
        match self {
            Markup::Markdown => format!("`{text}`"),
            Markup::Html => format!("<code>{}</code>", escape_html(text)),
        }
    }

    /// Multi-line preformatted text.
    pub fn pre(self, text: &str) -> String {
        match self {
            Markup::Markdown => format!("```{text}```"),
            Markup::Html => format!("<pre>{}</pre>", escape_html(text)),
        }
    }

    pub fn header_style(self) -> HeaderStyle {
        match self {
            Markup::Markdown => HeaderStyle::markdown(),
            Markup::Html => HeaderStyle::html(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn html_markup_escapes_inside_tags() {
        assert_eq!(Markup::Html.code("a<b"), "<code>a&lt;b</code>");
        assert_eq!(Markup::Html.strong("R&D"), "<b>R&amp;D</b>");
        assert_eq!(Markup::Html.text("1 < 2"), "1 &lt; 2");
    }

    #[test]
    fn markdown_markup_is_verbatim() {
        assert_eq!(Markup::Markdown.strong("Roles"), "**Roles**");
        assert_eq!(Markup::Markdown.code("/join"), "`/join`");
        assert_eq!(Markup::Markdown.emphasis("several"), "*several*");
    }

    #[test]
    fn header_style_follows_markup() {
        assert_eq!(Markup::Html.header_style().strong_open, "<b>");
        assert_eq!(Markup::Markdown.header_style(), HeaderStyle::markdown());
    }
}
