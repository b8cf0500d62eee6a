//! Marked-up pad text
//!
//! Content files hold the pad text with inline style tags:
//! `<b>`, `<i>`, `<u>` and `<s>`. Literal `&`, `<` and `>` in the text are
//! written as entities. Parsing is lenient: unknown tags and stray
//! brackets are kept as text, unbalanced tags are closed at the end.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Style {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

impl Style {
    const ALL: [Style; 4] = [
        Style::Bold,
        Style::Italic,
        Style::Underline,
        Style::Strikethrough,
    ];

    fn tag(self) -> &'static str {
        match self {
            Style::Bold => "b",
            Style::Italic => "i",
            Style::Underline => "u",
            Style::Strikethrough => "s",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.tag() == tag)
    }
}

/// Styled range in character offsets, `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub style: Style,
}

impl Span {
    pub fn new(start: usize, end: usize, style: Style) -> Self {
        Self { start, end, style }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkedText {
    pub text: String,
    pub spans: Vec<Span>,
}

impl MarkedText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    pub fn with_spans(text: impl Into<String>, spans: Vec<Span>) -> Self {
        let mut marked = Self {
            text: text.into(),
            spans,
        };
        marked.normalize();
        marked
    }

    /// First line of the text, trimmed; used as the pad title
    pub fn title(&self) -> &str {
        self.text.lines().next().unwrap_or("").trim()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Clamp spans to the text, drop empty ones, merge touching spans of
    /// the same style
    fn normalize(&mut self) {
        let len = self.text.chars().count();
        let mut spans: Vec<Span> = self
            .spans
            .iter()
            .map(|s| Span::new(s.start.min(len), s.end.min(len), s.style))
            .filter(|s| s.start < s.end)
            .collect();
        spans.sort_by_key(|s| (s.style, s.start));

        let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(last) if last.style == span.style && span.start <= last.end => {
                    last.end = last.end.max(span.end);
                }
                _ => merged.push(span),
            }
        }
        merged.sort_by_key(|s| (s.start, s.style));
        self.spans = merged;
    }

    fn styles_at(&self, pos: usize) -> BTreeSet<Style> {
        self.spans
            .iter()
            .filter(|s| s.start <= pos && pos < s.end)
            .map(|s| s.style)
            .collect()
    }

    /// Serialize to the content file format
    pub fn to_markup(&self) -> String {
        let chars: Vec<char> = self.text.chars().collect();
        let mut bounds: BTreeSet<usize> = BTreeSet::from([0, chars.len()]);
        for span in &self.spans {
            bounds.insert(span.start);
            bounds.insert(span.end);
        }

        let mut out = String::with_capacity(self.text.len());
        let bounds: Vec<usize> = bounds.into_iter().collect();
        for window in bounds.windows(2) {
            let (start, end) = (window[0], window[1]);
            if start >= end {
                continue;
            }
            let styles = self.styles_at(start);
            for style in &styles {
                out.push('<');
                out.push_str(style.tag());
                out.push('>');
            }
            for c in &chars[start..end] {
                match c {
                    '&' => out.push_str("&amp;"),
                    '<' => out.push_str("&lt;"),
                    '>' => out.push_str("&gt;"),
                    c => out.push(*c),
                }
            }
            for style in styles.iter().rev() {
                out.push_str("</");
                out.push_str(style.tag());
                out.push('>');
            }
        }
        out
    }

    /// Parse content file text
    pub fn from_markup(markup: &str) -> Self {
        let mut text = String::with_capacity(markup.len());
        let mut len = 0usize;
        let mut open: Vec<(Style, usize)> = Vec::new();
        let mut spans = Vec::new();
        let mut rest = markup;

        while let Some(c) = rest.chars().next() {
            if c == '<'
                && let Some(close) = rest.find('>')
            {
                let inner = &rest[1..close];
                let (closing, name) = match inner.strip_prefix('/') {
                    Some(name) => (true, name),
                    None => (false, inner),
                };
                if let Some(style) = Style::from_tag(name) {
                    if closing {
                        if let Some(idx) = open.iter().rposition(|(s, _)| *s == style) {
                            let (_, start) = open.remove(idx);
                            spans.push(Span::new(start, len, style));
                        }
                    } else {
                        open.push((style, len));
                    }
                    rest = &rest[close + 1..];
                    continue;
                }
            }
            if c == '&' {
                let entity = [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>')]
                    .into_iter()
                    .find(|(e, _)| rest.starts_with(e));
                if let Some((entity, decoded)) = entity {
                    text.push(decoded);
                    len += 1;
                    rest = &rest[entity.len()..];
                    continue;
                }
            }
            text.push(c);
            len += 1;
            rest = &rest[c.len_utf8()..];
        }

        for (style, start) in open {
            spans.push(Span::new(start, len, style));
        }
        Self::with_spans(text, spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_has_no_tags() {
        assert_eq!(MarkedText::plain("hello\nworld").to_markup(), "hello\nworld");
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let marked = MarkedText::plain("a < b && c > d");
        let markup = marked.to_markup();
        assert_eq!(markup, "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(MarkedText::from_markup(&markup), marked);
    }

    #[test]
    fn test_overlapping_spans_survive_serialization() {
        let marked = MarkedText::with_spans(
            "bold and both",
            vec![Span::new(0, 13, Style::Bold), Span::new(9, 13, Style::Italic)],
        );
        let markup = marked.to_markup();
        assert_eq!(markup, "<b>bold and </b><b><i>both</i></b>");
        assert_eq!(MarkedText::from_markup(&markup), marked);
    }

    #[test]
    fn test_parse_counts_characters_not_bytes() {
        let marked = MarkedText::from_markup("né <u>ü</u>");
        assert_eq!(marked.text, "né ü");
        assert_eq!(marked.spans, vec![Span::new(3, 4, Style::Underline)]);
    }

    #[test]
    fn test_unknown_tags_and_stray_brackets_are_text() {
        let marked = MarkedText::from_markup("<tt>x</tt> 1<2 and 3>2 &nbsp;");
        assert_eq!(marked.text, "<tt>x</tt> 1<2 and 3>2 &nbsp;");
        assert!(marked.spans.is_empty());
    }

    #[test]
    fn test_unbalanced_tags() {
        let marked = MarkedText::from_markup("</b>a<s>struck");
        assert_eq!(marked.text, "astruck");
        assert_eq!(marked.spans, vec![Span::new(1, 7, Style::Strikethrough)]);
    }

    #[test]
    fn test_touching_spans_merge() {
        let marked = MarkedText::with_spans(
            "abcdef",
            vec![Span::new(0, 2, Style::Bold), Span::new(2, 4, Style::Bold), Span::new(5, 9, Style::Bold)],
        );
        assert_eq!(
            marked.spans,
            vec![Span::new(0, 4, Style::Bold), Span::new(5, 6, Style::Bold)]
        );
    }

    #[test]
    fn test_title_is_first_line_trimmed() {
        assert_eq!(MarkedText::plain("  groceries \nmilk").title(), "groceries");
        assert_eq!(MarkedText::plain("").title(), "");
        assert!(MarkedText::plain(" \n\t").is_blank());
    }
}
