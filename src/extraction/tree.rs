use std::fmt::Debug;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Layout classification of a container node, mirroring CSS `display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    Block,
    Flex,
    Grid,
    Table,
    Inline,
    InlineBlock,
    ListItem,
    Contents,
    None,
}

impl Display {
    /// Containers that start a new paragraph for sentence extraction.
    ///
    /// Only block, flex, grid and table count; list items and inline-blocks are
    /// walked through like inline formatting.
    pub fn is_paragraph_boundary(self) -> bool {
        matches!(
            self,
            Display::Block | Display::Flex | Display::Grid | Display::Table
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Display::Block => "block",
            Display::Flex => "flex",
            Display::Grid => "grid",
            Display::Table => "table",
            Display::Inline => "inline",
            Display::InlineBlock => "inline-block",
            Display::ListItem => "list-item",
            Display::Contents => "contents",
            Display::None => "none",
        }
    }
}

impl FromStr for Display {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Display::Block),
            "flex" => Ok(Display::Flex),
            "grid" => Ok(Display::Grid),
            "table" => Ok(Display::Table),
            "inline" => Ok(Display::Inline),
            "inline-block" => Ok(Display::InlineBlock),
            "list-item" => Ok(Display::ListItem),
            "contents" => Ok(Display::Contents),
            "none" => Ok(Display::None),
            other => Err(format!("unsupported display value '{other}'")),
        }
    }
}

/// A position in the tree.
///
/// For a text node `offset` counts characters into its text; for a container
/// it counts child nodes, so `offset == 0` sits before the first child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryPoint<N> {
    pub node: N,
    pub offset: usize,
}

impl<N> BoundaryPoint<N> {
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A selected span plus the plain text it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRange<N> {
    pub start: BoundaryPoint<N>,
    pub end: BoundaryPoint<N>,
    pub text: String,
}

/// The user's current selection; usually zero or one range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<N> {
    ranges: Vec<SelectionRange<N>>,
}

impl<N> Selection<N> {
    pub fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn from_range(range: SelectionRange<N>) -> Self {
        Self {
            ranges: vec![range],
        }
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn range_at(&self, index: usize) -> Option<&SelectionRange<N>> {
        self.ranges.get(index)
    }
}

impl<N> Default for Selection<N> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Read-only view of a document tree.
pub trait DocumentTree {
    type Node: Copy + Eq + Debug;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn is_text(&self, node: Self::Node) -> bool;

    /// Layout classification; text nodes report [`Display::Inline`].
    fn display(&self, node: Self::Node) -> Display;

    /// Concatenated text of every text node under `node`, in document order.
    fn text_content(&self, node: Self::Node) -> String;

    /// Number of characters of `container`'s flattened text that precede
    /// `point`, or `None` when the point lies outside `container`.
    fn text_offset(
        &self,
        container: Self::Node,
        point: BoundaryPoint<Self::Node>,
    ) -> Option<usize>;

    fn ancestors(&self, node: Self::Node) -> Vec<Self::Node> {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Deepest node containing both `a` and `b`.
    fn common_ancestor(&self, a: Self::Node, b: Self::Node) -> Option<Self::Node> {
        let b_chain = self.ancestors(b);
        self.ancestors(a)
            .into_iter()
            .find(|candidate| b_chain.contains(candidate))
    }
}
