use super::{Node, Paginable, SplitResult, Unsplittable};

/// A single line of literal text. Never split.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Leaf {
    text: String,
}

impl Leaf {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Paginable for Leaf {
    fn size(&self) -> usize {
        self.text.len()
    }

    fn render(&self) -> String {
        self.text.clone()
    }

    fn split(self, budget: usize) -> SplitResult {
        if self.size() <= budget {
            return Ok((Node::Leaf(self), None));
        }
        Err(Unsplittable::new(Node::Leaf(self), budget))
    }
}
