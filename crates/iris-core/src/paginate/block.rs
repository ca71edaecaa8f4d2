use super::{split_container, Container, Leaf, Node, Paginable, Sequence, SplitResult};

/// A [`Sequence`] wrapped in a fixed prefix and suffix.
///
/// The decoration is paid again by every page holding a fragment of the block,
/// since each page is sent as a self-contained message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    prefix: String,
    suffix: String,
    body: Sequence,
}

impl Block {
    /// A block without decoration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decorated(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            body: Sequence::new(),
        }
    }

    pub fn with_items(
        items: impl IntoIterator<Item = Node>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            body: Sequence::from_items(items),
        }
    }

    /// One leaf per line of `text`.
    pub fn from_text(text: &str) -> Self {
        let mut block = Self::new();
        for line in text.lines() {
            block.add_line(line);
        }
        block
    }

    pub fn append(&mut self, node: impl Into<Node>) {
        self.body.append(node);
    }

    pub fn add_line(&mut self, text: impl Into<String>) {
        self.body.append(Leaf::new(text));
    }

    /// A line followed by a blank line.
    pub fn add_line_gap(&mut self, text: impl Into<String>) {
        self.add_line(text);
        self.add_blank_line();
    }

    pub fn add_blank_line(&mut self) {
        self.body.append(Leaf::blank());
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn items(&self) -> &[Node] {
        self.body.items()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn reserved_size(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }
}

impl Paginable for Block {
    fn size(&self) -> usize {
        self.body.size() + self.reserved_size()
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(self.size());
        out.push_str(&self.prefix);
        out.push_str(&self.body.render());
        out.push_str(&self.suffix);
        out
    }

    fn split(self, budget: usize) -> SplitResult {
        split_container(self, budget)
    }
}

impl Container for Block {
    fn body(&self) -> &Sequence {
        &self.body
    }

    fn take_items(&mut self) -> Vec<Node> {
        self.body.take_items()
    }

    fn reserved_size(&self) -> usize {
        Block::reserved_size(self)
    }

    fn rebuild(&self, first: Vec<Node>, rest: Vec<Node>) -> (Node, Node) {
        (
            Block::with_items(first, self.prefix.clone(), self.suffix.clone()).into(),
            Block::with_items(rest, self.prefix.clone(), self.suffix.clone()).into(),
        )
    }
}
