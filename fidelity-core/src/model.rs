// Structural tree model shared by every comparator

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    // Layout
    Container,
    Section,
    Row,
    Column,
    // Navigation
    Header,
    Footer,
    Navigation,
    Menu,
    MenuItem,
    // Content
    Text,
    Heading,
    Paragraph,
    List,
    ListItem,
    // Media
    Image,
    Video,
    Audio,
    Gallery,
    Slider,
    // Interactive
    Button,
    Link,
    Form,
    Input,
    Textarea,
    Select,
    Checkbox,
    Radio,
    // Composite
    Hero,
    Card,
    Accordion,
    Tab,
    Modal,
    Icon,
    Spacer,
    Divider,
    // Embedded
    Iframe,
    Embed,
    Html,
    Script,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Container => "container",
            NodeKind::Section => "section",
            NodeKind::Row => "row",
            NodeKind::Column => "column",
            NodeKind::Header => "header",
            NodeKind::Footer => "footer",
            NodeKind::Navigation => "navigation",
            NodeKind::Menu => "menu",
            NodeKind::MenuItem => "menu_item",
            NodeKind::Text => "text",
            NodeKind::Heading => "heading",
            NodeKind::Paragraph => "paragraph",
            NodeKind::List => "list",
            NodeKind::ListItem => "list_item",
            NodeKind::Image => "image",
            NodeKind::Video => "video",
            NodeKind::Audio => "audio",
            NodeKind::Gallery => "gallery",
            NodeKind::Slider => "slider",
            NodeKind::Button => "button",
            NodeKind::Link => "link",
            NodeKind::Form => "form",
            NodeKind::Input => "input",
            NodeKind::Textarea => "textarea",
            NodeKind::Select => "select",
            NodeKind::Checkbox => "checkbox",
            NodeKind::Radio => "radio",
            NodeKind::Hero => "hero",
            NodeKind::Card => "card",
            NodeKind::Accordion => "accordion",
            NodeKind::Tab => "tab",
            NodeKind::Modal => "modal",
            NodeKind::Icon => "icon",
            NodeKind::Spacer => "spacer",
            NodeKind::Divider => "divider",
            NodeKind::Iframe => "iframe",
            NodeKind::Embed => "embed",
            NodeKind::Html => "html",
            NodeKind::Script => "script",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Video,
    Font,
    #[serde(other)]
    Other,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Font => "font",
            AssetKind::Other => "other",
        }
    }
}

/// Reference to a media asset. Only `kind` takes part in comparison; the
/// locator differs between platforms and is kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(alias = "type")]
    pub kind: AssetKind,
    #[serde(default, alias = "original_url", alias = "url")]
    pub source_locator: String,
}

impl AssetRef {
    pub fn new(kind: AssetKind, source_locator: impl Into<String>) -> Self {
        Self {
            kind,
            source_locator: source_locator.into(),
        }
    }
}

/// One element of a structural tree. Children are owned by their parent.
///
/// Walking, cloning, comparing and dropping are iterative and handle any
/// depth. The derived `Debug` and `Serialize` still recurse once per level.
#[derive(Debug, Serialize, Deserialize)]
pub struct Node {
    #[serde(alias = "type")]
    pub kind: NodeKind,
    #[serde(default, alias = "content", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetRef>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            text: None,
            children: Vec::new(),
            assets: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_asset(mut self, asset: AssetRef) -> Self {
        self.assets.push(asset);
        self
    }

    /// This node and all of its descendants in pre-order.
    pub fn pre_order(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Copy of this node without its children.
    fn shallow_clone(&self) -> Self {
        Self {
            kind: self.kind,
            text: self.text.clone(),
            children: Vec::with_capacity(self.children.len()),
            assets: self.assets.clone(),
        }
    }

    fn shallow_eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.text == other.text
            && self.assets == other.assets
            && self.children.len() == other.children.len()
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        // Rebuilt bottom-up from the reversed pre-order: when a node is
        // reached, its children are the topmost finished subtrees, first
        // child on top.
        let descendants: Vec<&Node> = self.pre_order().skip(1).collect();
        let mut finished: Vec<Node> = Vec::new();
        for original in descendants.into_iter().rev() {
            let mut node = original.shallow_clone();
            let first = finished.len() - original.children.len();
            node.children.extend(finished.drain(first..).rev());
            finished.push(node);
        }

        let mut root = self.shallow_clone();
        root.children.extend(finished.into_iter().rev());
        root
    }
}

impl PartialEq for Node {
    // Equal pre-order sequences with equal child counts describe the same tree.
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.pre_order();
        let mut right = other.pre_order();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a.shallow_eq(b) => {}
                _ => return false,
            }
        }
    }
}

impl Drop for Node {
    // Flattens the subtree before it is freed so that dropping a deep tree
    // does not recurse once per level.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Depth-first pre-order walk over a forest.
///
/// Uses an explicit stack, so tree depth is bounded only by memory.
pub struct PreOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> PreOrder<'a> {
    pub fn forest(roots: &'a [Node]) -> Self {
        Self {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
