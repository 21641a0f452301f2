use super::tree::{BoundaryPoint, Display, DocumentTree, SelectionRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element { tag: String, display: Display },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Arena-backed document tree.
///
/// Nodes are never removed, so a `NodeId` stays valid for the document's
/// lifetime. Text nodes ignore any children attached to them.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document whose root is a block-level `body`.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Element {
                    tag: "body".into(),
                    display: Display::Block,
                },
            }],
        }
    }

    /// One `<p>` per blank-line separated paragraph, with the paragraph's
    /// lines joined by single spaces.
    pub fn from_plain_text(text: &str) -> Self {
        let mut document = Self::new();
        let root = document.root();

        let mut paragraph: Vec<&str> = Vec::new();
        let flush = |document: &mut Document, lines: &mut Vec<&str>| {
            if lines.is_empty() {
                return;
            }
            let p = document.append_element(root, "p", Display::Block);
            document.append_text(p, &lines.join(" "));
            lines.clear();
        };

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                flush(&mut document, &mut paragraph);
            } else {
                paragraph.push(line);
            }
        }
        flush(&mut document, &mut paragraph);

        document
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str, display: Display) -> NodeId {
        self.push(
            parent,
            NodeKind::Element {
                tag: tag.to_string(),
                display,
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match self.nodes[node.0].kind {
            NodeKind::Element { .. } => &self.nodes[node.0].children,
            NodeKind::Text(_) => &[],
        }
    }

    /// Nodes under `node` (inclusive) in document order.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        order
    }

    fn text_len(&self, node: NodeId) -> usize {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => text.chars().count(),
            NodeKind::Element { .. } => self
                .children(node)
                .iter()
                .map(|child| self.text_len(*child))
                .sum(),
        }
    }

    /// Adds the length of everything in `node` before `point` to `acc`.
    /// Returns `true` once `point` has been reached.
    fn prefix_len(&self, node: NodeId, point: BoundaryPoint<NodeId>, acc: &mut usize) -> bool {
        if node == point.node {
            match &self.nodes[node.0].kind {
                NodeKind::Text(text) => *acc += point.offset.min(text.chars().count()),
                NodeKind::Element { .. } => {
                    let children = self.children(node);
                    let upto = point.offset.min(children.len());
                    *acc += children[..upto]
                        .iter()
                        .map(|child| self.text_len(*child))
                        .sum::<usize>();
                }
            }
            return true;
        }

        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => {
                *acc += text.chars().count();
                false
            }
            NodeKind::Element { .. } => self
                .children(node)
                .iter()
                .any(|child| self.prefix_len(*child, point, acc)),
        }
    }

    /// First occurrence of `needle` inside a single text node, as a range.
    pub fn find_text(&self, needle: &str) -> Option<SelectionRange<NodeId>> {
        if needle.is_empty() {
            return None;
        }

        self.descendants(self.root()).into_iter().find_map(|node| {
            let NodeKind::Text(text) = &self.nodes[node.0].kind else {
                return None;
            };
            let byte_index = text.find(needle)?;
            let start = text[..byte_index].chars().count();
            let end = start + needle.chars().count();
            Some(SelectionRange {
                start: BoundaryPoint::new(node, start),
                end: BoundaryPoint::new(node, end),
                text: needle.to_string(),
            })
        })
    }

    /// Build a range between two points, filling in the covered text.
    pub fn select(
        &self,
        start: BoundaryPoint<NodeId>,
        end: BoundaryPoint<NodeId>,
    ) -> Option<SelectionRange<NodeId>> {
        let ancestor = self.common_ancestor(start.node, end.node)?;
        let from = self.text_offset(ancestor, start)?;
        let to = self.text_offset(ancestor, end)?;
        if to < from {
            return None;
        }
        let text = self
            .text_content(ancestor)
            .chars()
            .skip(from)
            .take(to - from)
            .collect();
        Some(SelectionRange { start, end, text })
    }
}

impl DocumentTree for Document {
    type Node = NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|data| data.parent)
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].kind, NodeKind::Text(_))
    }

    fn display(&self, node: NodeId) -> Display {
        match self.nodes[node.0].kind {
            NodeKind::Element { display, .. } => display,
            NodeKind::Text(_) => Display::Inline,
        }
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(node) {
            if let NodeKind::Text(text) = &self.nodes[id.0].kind {
                out.push_str(text);
            }
        }
        out
    }

    fn text_offset(&self, container: NodeId, point: BoundaryPoint<NodeId>) -> Option<usize> {
        let mut acc = 0;
        self.prefix_len(container, point, &mut acc).then_some(acc)
    }
}
