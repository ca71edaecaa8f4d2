//! Bounded-size pagination of nested text.
//!
//! A document is a tree of [`Node`]s built bottom-up by the caller. [`paginate`]
//! cuts it into pages whose rendered size never exceeds a budget. Splits happen
//! between children whenever possible; a child is only fragmented when it cannot
//! fit a page on its own. Containers re-apply their decoration (prefix/suffix,
//! section header) to every fragment they are split into.
//!
//! Sizes are byte lengths and are exact: `node.size() == node.render().len()`
//! holds for every node, including the separators between children.

mod block;
mod leaf;
mod section;
mod sequence;

pub use block::Block;
pub use leaf::Leaf;
pub use section::{HeaderStyle, Section};
pub use sequence::Sequence;

/// Separator placed between the rendered children of a container.
pub(crate) const SEPARATOR: &str = "\n";

/// An atomic item (or a container's decoration alone) exceeds the page budget.
///
/// This is the only way pagination can fail. The offending node is carried so
/// the caller can decide to shorten it or to retry with a larger budget.
#[derive(Clone, Debug, thiserror::Error)]
#[error("unsplittable item of {size} bytes exceeds page budget of {budget}")]
pub struct Unsplittable {
    pub node: Box<Node>,
    pub size: usize,
    pub budget: usize,
}

impl Unsplittable {
    fn new(node: Node, budget: usize) -> Self {
        Self {
            size: node.size(),
            node: Box::new(node),
            budget,
        }
    }
}

pub type SplitResult = std::result::Result<(Node, Option<Node>), Unsplittable>;

/// Capability shared by every node of a pagination tree.
pub trait Paginable {
    /// Rendered size in bytes.
    fn size(&self) -> usize;

    fn render(&self) -> String;

    /// Split into a head that fits `budget` and an optional remainder.
    ///
    /// Returns `(self, None)` when the node already fits.
    fn split(self, budget: usize) -> SplitResult;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf(Leaf),
    Sequence(Sequence),
    Block(Block),
    Section(Section),
}

impl Node {
    /// Undecorated leaf texts in reading order.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        let items = match self {
            Node::Leaf(leaf) => {
                out.push(leaf.text());
                return;
            }
            Node::Sequence(seq) => seq.items(),
            Node::Block(block) => block.items(),
            Node::Section(section) => section.items(),
        };
        for item in items {
            item.collect_leaves(out);
        }
    }
}

impl Paginable for Node {
    fn size(&self) -> usize {
        match self {
            Node::Leaf(n) => n.size(),
            Node::Sequence(n) => n.size(),
            Node::Block(n) => n.size(),
            Node::Section(n) => n.size(),
        }
    }

    fn render(&self) -> String {
        match self {
            Node::Leaf(n) => n.render(),
            Node::Sequence(n) => n.render(),
            Node::Block(n) => n.render(),
            Node::Section(n) => n.render(),
        }
    }

    fn split(self, budget: usize) -> SplitResult {
        match self {
            Node::Leaf(n) => n.split(budget),
            Node::Sequence(n) => n.split(budget),
            Node::Block(n) => n.split(budget),
            Node::Section(n) => n.split(budget),
        }
    }
}

impl From<Leaf> for Node {
    fn from(v: Leaf) -> Self {
        Node::Leaf(v)
    }
}

impl From<Sequence> for Node {
    fn from(v: Sequence) -> Self {
        Node::Sequence(v)
    }
}

impl From<Block> for Node {
    fn from(v: Block) -> Self {
        Node::Block(v)
    }
}

impl From<Section> for Node {
    fn from(v: Section) -> Self {
        Node::Section(v)
    }
}

/// A node that owns children and splits between them.
///
/// Implementors only decide how a fresh container is built around a list of
/// children; the split itself lives in [`split_container`].
pub(crate) trait Container: Sized + Into<Node> {
    fn body(&self) -> &Sequence;

    fn take_items(&mut self) -> Vec<Node>;

    /// Decoration bytes not attributable to any child.
    fn reserved_size(&self) -> usize;

    /// Build the two halves of a split, each carrying the right decoration.
    fn rebuild(&self, first: Vec<Node>, rest: Vec<Node>) -> (Node, Node);
}

pub(crate) fn split_container<C: Container>(mut container: C, budget: usize) -> SplitResult {
    let reserved = container.reserved_size();
    if container.body().size() + reserved <= budget {
        return Ok((container.into(), None));
    }

    let Some(allowed) = budget.checked_sub(reserved) else {
        // The decoration alone overflows; no choice of children can fix that.
        return Err(Unsplittable::new(container.into(), budget));
    };

    let mut items = container.take_items();
    if items.is_empty() {
        return Err(Unsplittable::new(container.into(), budget));
    }

    // Fragmenting a child is a last resort, only taken when the first child
    // cannot fit a page even on its own.
    if items[0].size() > allowed {
        let first = items.remove(0);
        let (head, tail) = first.split(allowed)?;
        let mut rest: Vec<Node> = tail.into_iter().collect();
        rest.append(&mut items);
        let (first, rest) = container.rebuild(vec![head], rest);
        return Ok((first, Some(rest)));
    }

    let mut space_left = allowed;
    let mut cut = 0usize;
    for (idx, item) in items.iter().enumerate() {
        let cost = if idx == 0 {
            item.size()
        } else {
            item.size() + SEPARATOR.len()
        };
        if cost > space_left {
            break;
        }
        space_left -= cost;
        cut = idx + 1;
    }

    let rest = items.split_off(cut);
    let (first, rest) = container.rebuild(items, rest);
    Ok((first, Some(rest)))
}

/// Cut `node` into pages of at most `budget` bytes each.
///
/// A node exactly at budget is a single page. Fails only when some atomic line
/// (or some decoration) cannot fit a page on its own; there is no partial
/// output in that case.
pub fn paginate(node: impl Into<Node>, budget: usize) -> Result<Vec<Node>, Unsplittable> {
    let mut current: Node = node.into();
    let mut pages = Vec::new();

    while current.size() > budget {
        let (head, tail) = current.split(budget)?;
        pages.push(head);
        match tail {
            Some(tail) => current = tail,
            None => return Ok(pages),
        }
    }
    pages.push(current);

    tracing::trace!(pages = pages.len(), budget, "paginated document");
    Ok(pages)
}

/// [`paginate`], then render each page.
pub fn render_pages(node: impl Into<Node>, budget: usize) -> Result<Vec<String>, Unsplittable> {
    Ok(paginate(node, budget)?
        .iter()
        .map(Paginable::render)
        .collect())
}
