use std::sync::Arc;

use super::{split_container, Block, Container, Node, Paginable, Sequence, SplitResult};

/// How a section header is spelled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderStyle {
    pub strong_open: String,
    pub strong_close: String,
    /// Hint given to every fragment after the first.
    pub continuation: String,
}

impl HeaderStyle {
    pub fn markdown() -> Self {
        Self {
            strong_open: "**".to_string(),
            strong_close: "**".to_string(),
            continuation: "(cont'd)".to_string(),
        }
    }

    pub fn html() -> Self {
        Self {
            strong_open: "<b>".to_string(),
            strong_close: "</b>".to_string(),
            continuation: "(cont'd)".to_string(),
        }
    }

    /// `<strong>name</strong>hint` followed by a newline. Empty parts are skipped.
    pub fn header(&self, name: Option<&str>, hint: Option<&str>) -> String {
        let mut out = String::new();
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            out.push_str(&self.strong_open);
            out.push_str(name);
            out.push_str(&self.strong_close);
        }
        if let Some(hint) = hint {
            out.push_str(hint);
        }
        out.push('\n');
        out
    }
}

impl Default for HeaderStyle {
    fn default() -> Self {
        Self::markdown()
    }
}

/// A block headed by a bold name and an optional hint.
///
/// When split, the first fragment keeps the original header and the following
/// ones swap the hint for the style's continuation marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    name: Option<String>,
    hint: Option<String>,
    style: Arc<HeaderStyle>,
    block: Block,
}

impl Section {
    pub fn new(name: Option<String>, hint: Option<String>, style: Arc<HeaderStyle>) -> Self {
        let header = style.header(name.as_deref(), hint.as_deref());
        Self {
            name,
            hint,
            style,
            block: Block::decorated(header, ""),
        }
    }

    /// A markdown-styled section without hint.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Some(name.into()), None, Arc::new(HeaderStyle::markdown()))
    }

    fn with_items(
        name: Option<String>,
        hint: Option<String>,
        style: Arc<HeaderStyle>,
        items: Vec<Node>,
    ) -> Self {
        let header = style.header(name.as_deref(), hint.as_deref());
        Self {
            name,
            hint,
            style,
            block: Block::with_items(items, header, ""),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn header(&self) -> &str {
        self.block.prefix()
    }

    pub fn append(&mut self, node: impl Into<Node>) {
        self.block.append(node);
    }

    pub fn add_line(&mut self, text: impl Into<String>) {
        self.block.add_line(text);
    }

    pub fn add_line_gap(&mut self, text: impl Into<String>) {
        self.block.add_line_gap(text);
    }

    pub fn add_blank_line(&mut self) {
        self.block.add_blank_line();
    }

    pub fn items(&self) -> &[Node] {
        self.block.items()
    }

    pub fn reserved_size(&self) -> usize {
        self.block.reserved_size()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }
}

impl Paginable for Section {
    fn size(&self) -> usize {
        self.block.size()
    }

    fn render(&self) -> String {
        self.block.render()
    }

    fn split(self, budget: usize) -> SplitResult {
        split_container(self, budget)
    }
}

impl Container for Section {
    fn body(&self) -> &Sequence {
        Container::body(&self.block)
    }

    fn take_items(&mut self) -> Vec<Node> {
        Container::take_items(&mut self.block)
    }

    fn reserved_size(&self) -> usize {
        self.block.reserved_size()
    }

    fn rebuild(&self, first: Vec<Node>, rest: Vec<Node>) -> (Node, Node) {
        let head = Section::with_items(
            self.name.clone(),
            self.hint.clone(),
            self.style.clone(),
            first,
        );
        let tail = Section::with_items(
            self.name.clone(),
            Some(self.style.continuation.clone()),
            self.style.clone(),
            rest,
        );
        (head.into(), tail.into())
    }
}
