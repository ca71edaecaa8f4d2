use std::mem;

use super::{split_container, Container, Node, Paginable, SplitResult, SEPARATOR};

/// Ordered children rendered one per line, without decoration.
///
/// `items_size` is kept equal to the sum of the children's sizes; it is
/// maintained on append and only recomputed when a fresh sequence is built
/// from a list of children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sequence {
    items: Vec<Node>,
    items_size: usize,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = Node>) -> Self {
        let mut seq = Self::new();
        for item in items {
            seq.append(item);
        }
        seq
    }

    pub fn append(&mut self, node: impl Into<Node>) {
        let node = node.into();
        self.items_size += node.size();
        self.items.push(node);
    }

    pub fn items(&self) -> &[Node] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the children's sizes, separators excluded.
    pub fn items_size(&self) -> usize {
        self.items_size
    }

    fn separators_size(&self) -> usize {
        self.items.len().saturating_sub(1) * SEPARATOR.len()
    }
}

impl Paginable for Sequence {
    fn size(&self) -> usize {
        self.items_size + self.separators_size()
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(self.size());
        for (idx, item) in self.items.iter().enumerate() {
            if idx > 0 {
                out.push_str(SEPARATOR);
            }
            out.push_str(&item.render());
        }
        out
    }

    fn split(self, budget: usize) -> SplitResult {
        split_container(self, budget)
    }
}

impl Container for Sequence {
    fn body(&self) -> &Sequence {
        self
    }

    fn take_items(&mut self) -> Vec<Node> {
        self.items_size = 0;
        mem::take(&mut self.items)
    }

    fn reserved_size(&self) -> usize {
        0
    }

    fn rebuild(&self, first: Vec<Node>, rest: Vec<Node>) -> (Node, Node) {
        (
            Sequence::from_items(first).into(),
            Sequence::from_items(rest).into(),
        )
    }
}
