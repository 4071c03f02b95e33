use crate::format::truncate;

/// Columns kept free for borders and the gutter.
pub const RESERVED_COLUMNS: usize = 4;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum YamlToken {
    Indent,
    Comment,
    ListMarker,
    Key,
    Colon,
    Quoted,
    Literal,
    Number,
    Flow,
    Value,
    Text,
}

/// Splits one line into styled pieces without parsing the document.
pub fn tokenize_line(line: &str) -> Vec<(YamlToken, &str)> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ' || **byte == b'\t')
        .count();
    let (indent, mut rest) = line.split_at(indent_len);

    let mut tokens = Vec::new();
    if !indent.is_empty() {
        tokens.push((YamlToken::Indent, indent));
    }
    if rest.is_empty() {
        return tokens;
    }

    if rest.starts_with('#') {
        tokens.push((YamlToken::Comment, rest));
        return tokens;
    }

    if let Some(item) = rest.strip_prefix("- ") {
        tokens.push((YamlToken::ListMarker, &rest[..2]));
        rest = item;
    } else if rest == "-" {
        tokens.push((YamlToken::ListMarker, rest));
        return tokens;
    }

    match split_key_value(rest) {
        Some((key, value)) => {
            tokens.push((YamlToken::Key, key));
            tokens.push((YamlToken::Colon, ":"));
            if !value.is_empty() {
                tokens.push((classify_value(value.trim()), value));
            }
        }
        None if !rest.is_empty() => tokens.push((classify_scalar(rest.trim()), rest)),
        None => {}
    }
    tokens
}

fn split_key_value(content: &str) -> Option<(&str, &str)> {
    if content.starts_with('"') || content.starts_with('\'') {
        return None;
    }
    let (key, value) = content.split_once(':')?;
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    if !value.is_empty() && !value.starts_with(' ') {
        return None;
    }
    Some((key, value))
}

fn classify_value(value: &str) -> YamlToken {
    if value.starts_with('"') || value.starts_with('\'') {
        YamlToken::Quoted
    } else if matches!(value, "true" | "false" | "null" | "~") {
        YamlToken::Literal
    } else if value.parse::<f64>().is_ok() {
        YamlToken::Number
    } else if value.starts_with('{') || value.starts_with('[') {
        YamlToken::Flow
    } else {
        YamlToken::Value
    }
}

fn classify_scalar(value: &str) -> YamlToken {
    match classify_value(value) {
        YamlToken::Value => YamlToken::Text,
        other => other,
    }
}

/// Cuts lines that do not fit in `width - reserved` columns, ending them with `...`.
pub fn clip_line(line: &str, width: usize, reserved: usize) -> String {
    let limit = width.saturating_sub(reserved);
    truncate(line, limit)
}

/// Scrollable text viewer used for YAML manifests and describe output.
#[derive(Debug, Clone)]
pub struct YamlViewer {
    title: String,
    lines: Vec<String>,
    offset: usize,
    height: usize,
    highlight: bool,
}

impl YamlViewer {
    pub fn new(title: impl Into<String>, content: &str) -> Self {
        let mut viewer = Self {
            title: title.into(),
            lines: Vec::new(),
            offset: 0,
            height: 20,
            highlight: true,
        };
        viewer.set_content(content);
        viewer
    }

    /// Plain text without YAML colouring.
    pub fn plain(title: impl Into<String>, content: &str) -> Self {
        let mut viewer = Self::new(title, content);
        viewer.highlight = false;
        viewer
    }

    pub fn set_content(&mut self, content: &str) {
        self.lines = content.lines().map(str::to_string).collect();
        self.offset = 0;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn highlight(&self) -> bool {
        self.highlight
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.max_offset() as isize;
        self.offset = (self.offset as isize + delta).clamp(0, max) as usize;
    }

    pub fn half_page(&self) -> isize {
        (self.height / 2).max(1) as isize
    }

    pub fn scroll_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn visible_lines(&self, width: usize) -> Vec<String> {
        self.lines
            .iter()
            .skip(self.offset)
            .take(self.height)
            .map(|line| clip_line(line, width, RESERVED_COLUMNS))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{YamlToken, YamlViewer, clip_line, tokenize_line};

    fn kinds(line: &str) -> Vec<YamlToken> {
        tokenize_line(line).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn comments_keys_and_quoted_values() {
        assert_eq!(
            kinds("  # managed by helm"),
            vec![YamlToken::Indent, YamlToken::Comment]
        );
        assert_eq!(
            tokenize_line("name: \"web\""),
            vec![
                (YamlToken::Key, "name"),
                (YamlToken::Colon, ":"),
                (YamlToken::Quoted, " \"web\""),
            ]
        );
        assert_eq!(
            kinds("replicas: 3"),
            vec![YamlToken::Key, YamlToken::Colon, YamlToken::Number]
        );
        assert_eq!(kinds("metadata:"), vec![YamlToken::Key, YamlToken::Colon]);
    }

    #[test]
    fn list_items_and_urls() {
        assert_eq!(
            kinds("  - name: app"),
            vec![
                YamlToken::Indent,
                YamlToken::ListMarker,
                YamlToken::Key,
                YamlToken::Colon,
                YamlToken::Value,
            ]
        );
        assert_eq!(
            kinds("- http://example.com"),
            vec![YamlToken::ListMarker, YamlToken::Text]
        );
    }

    #[test]
    fn long_lines_are_clipped_with_dots() {
        let line = "a".repeat(50);
        let clipped = clip_line(&line, 24, 4);
        assert_eq!(clipped.chars().count(), 20);
        assert!(clipped.ends_with("..."));
        assert_eq!(clip_line("short", 24, 4), "short");
    }

    #[test]
    fn viewer_scrolls_within_bounds() {
        let content = (0..50)
            .map(|index| format!("key{index}: {index}"))
            .collect::<Vec<_>>()
            .join("\n");
        let mut viewer = YamlViewer::new("pod web", &content);
        viewer.set_height(10);
        viewer.scroll_by(-3);
        assert_eq!(viewer.offset(), 0);
        viewer.scroll_by(viewer.half_page());
        assert_eq!(viewer.offset(), 5);
        viewer.scroll_bottom();
        assert_eq!(viewer.offset(), 40);
        viewer.scroll_by(10);
        assert_eq!(viewer.offset(), 40);
        assert_eq!(viewer.visible_lines(80).len(), 10);
        viewer.set_content("a: 1");
        assert_eq!(viewer.offset(), 0);
    }
}
