// One side of a migration: a screenshot plus the page forests

use crate::error::InvalidSnapshotError;
use crate::model::{AssetRef, Node, NodeKind, PreOrder};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One page: an ordered forest of top-level elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub elements: Vec<Node>,
}

impl Page {
    pub fn new(elements: Vec<Node>) -> Self {
        Self { elements }
    }

    /// Every node on the page in pre-order.
    pub fn nodes(&self) -> PreOrder<'_> {
        PreOrder::forest(&self.elements)
    }

    pub fn element_count(&self) -> usize {
        self.nodes().count()
    }

    /// Assemble a page from flat records that name their parent by id.
    ///
    /// Sibling order follows the order of `records`. `page` is only used to
    /// label errors.
    pub fn from_flat(page: usize, records: Vec<FlatNode>) -> Result<Self, InvalidSnapshotError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            if index.insert(record.id.as_str(), idx).is_some() {
                return Err(InvalidSnapshotError::DuplicateNodeId {
                    page,
                    id: record.id.clone(),
                });
            }
        }

        let mut parents: Vec<Option<usize>> = Vec::with_capacity(records.len());
        for record in &records {
            let parent = match record.parent_id.as_deref() {
                None => None,
                Some(parent_id) => match index.get(parent_id) {
                    Some(&parent_idx) => Some(parent_idx),
                    None => {
                        return Err(InvalidSnapshotError::UnknownParent {
                            page,
                            id: record.id.clone(),
                            parent: parent_id.to_string(),
                        });
                    }
                },
            };
            parents.push(parent);
        }

        if let Some(idx) = find_cycle(&parents) {
            return Err(InvalidSnapshotError::ParentCycle {
                page,
                id: records[idx].id.clone(),
            });
        }

        let mut roots = Vec::new();
        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
        for (idx, parent) in parents.iter().enumerate() {
            match parent {
                Some(parent_idx) => children_of[*parent_idx].push(idx),
                None => roots.push(idx),
            }
        }

        // Build owned nodes bottom-up in post-order so no level recurses.
        let mut pending: Vec<Option<FlatNode>> = records.into_iter().map(Some).collect();
        let mut built: Vec<Option<Node>> = (0..pending.len()).map(|_| None).collect();
        let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();

        while let Some((idx, expanded)) = stack.pop() {
            if expanded {
                if let Some(record) = pending[idx].take() {
                    let children = children_of[idx]
                        .iter()
                        .filter_map(|&child| built[child].take())
                        .collect();
                    let mut node = Node::new(record.kind);
                    node.text = record.text;
                    node.assets = record.assets;
                    node.children = children;
                    built[idx] = Some(node);
                }
            } else {
                stack.push((idx, true));
                stack.extend(children_of[idx].iter().rev().map(|&child| (child, false)));
            }
        }

        let elements = roots.iter().filter_map(|&r| built[r].take()).collect();
        Ok(Self { elements })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    Unseen,
    Active,
    Done,
}

/// Index of a node that lies on a parent cycle, if any.
fn find_cycle(parents: &[Option<usize>]) -> Option<usize> {
    let mut state = vec![Visit::Unseen; parents.len()];
    let mut path = Vec::new();

    for start in 0..parents.len() {
        let mut current = Some(start);
        while let Some(idx) = current {
            match state[idx] {
                Visit::Done => break,
                Visit::Active => return Some(idx),
                Visit::Unseen => {
                    state[idx] = Visit::Active;
                    path.push(idx);
                    current = parents[idx];
                }
            }
        }
        for idx in path.drain(..) {
            state[idx] = Visit::Done;
        }
    }

    None
}

/// Flat element record as emitted by extraction pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(alias = "type")]
    pub kind: NodeKind,
    #[serde(default, alias = "content", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetRef>,
}

/// A page on the wire, either nested or flat.
#[derive(Debug, Clone)]
pub enum PageDocument {
    Nested(Page),
    Flat { nodes: Vec<FlatNode> },
}

// Read as a plain record instead of an untagged enum, which would buffer the
// whole nested tree before picking a variant.
#[derive(Deserialize)]
struct PageRecord {
    elements: Option<Vec<Node>>,
    nodes: Option<Vec<FlatNode>>,
}

impl<'de> Deserialize<'de> for PageDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match PageRecord::deserialize(deserializer)? {
            PageRecord {
                elements: Some(elements),
                nodes: None,
            } => Ok(PageDocument::Nested(Page::new(elements))),
            PageRecord {
                elements: None,
                nodes: Some(nodes),
            } => Ok(PageDocument::Flat { nodes }),
            PageRecord {
                elements: Some(_),
                nodes: Some(_),
            } => Err(de::Error::custom(
                "a page has either `elements` or `nodes`, not both",
            )),
            PageRecord {
                elements: None,
                nodes: None,
            } => Err(de::Error::custom("a page needs `elements` or `nodes`")),
        }
    }
}

/// Structural half of a snapshot as supplied by an extraction or conversion
/// collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotDocument {
    pub pages: Vec<PageDocument>,
}

impl SnapshotDocument {
    /// Parse a document of any nesting depth.
    ///
    /// serde_json stops at 128 levels by default; here the limit is lifted
    /// and the stack grows on demand instead.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        deserializer.disable_recursion_limit();
        let document = Self::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
        deserializer.end()?;
        Ok(document)
    }

    pub fn into_pages(self) -> Result<Vec<Page>, InvalidSnapshotError> {
        self.pages
            .into_iter()
            .enumerate()
            .map(|(idx, page)| match page {
                PageDocument::Nested(page) => Ok(page),
                PageDocument::Flat { nodes } => Page::from_flat(idx, nodes),
            })
            .collect()
    }
}

/// Everything one side of a migration contributes to a scoring run.
#[derive(Debug, Clone, Default)]
pub struct SiteSnapshot {
    pub screenshot: Vec<u8>,
    pub pages: Vec<Page>,
}

impl SiteSnapshot {
    pub fn new(screenshot: Vec<u8>, pages: Vec<Page>) -> Self {
        Self { screenshot, pages }
    }

    pub fn from_document(
        screenshot: Vec<u8>,
        document: SnapshotDocument,
    ) -> Result<Self, InvalidSnapshotError> {
        Ok(Self {
            screenshot,
            pages: document.into_pages()?,
        })
    }

    /// Every node of every page, page by page, each in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.pages.iter().flat_map(Page::nodes)
    }

    /// Every asset attached to any node, in document order.
    pub fn assets(&self) -> impl Iterator<Item = &AssetRef> {
        self.nodes().flat_map(|node| node.assets.iter())
    }

    /// Non-empty text fields in document order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.nodes()
            .filter_map(|node| node.text.as_deref())
            .filter(|text| !text.is_empty())
    }
}
