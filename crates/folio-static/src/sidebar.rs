//! Numbered, collapsible navigation.
//!
//! The sidebar is built once per build. Each page serializes it through a [`SidebarView`],
//! which marks the active node and opens its ancestors while leaving the shared structure
//! untouched.

use std::ops::Range;

use serde::ser::{SerializeSeq, SerializeStruct, Serializer};
use serde::Serialize;

use folio_book::{BookTree, NodeId, Numbering};

use crate::links::LinkResolver;

/// One sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarItem {
    pub node: NodeId,
    /// Number path, e.g. "2.1"
    pub number: String,
    /// Display label, e.g. "2." or "2.1"
    pub label: String,
    pub title: String,
    pub id: String,
    /// Base-URL-rooted link; `None` for sections without a page
    pub url: Option<String>,
    pub depth: usize,
    /// Initial expansion from the fold level
    pub expanded: bool,
    pub children: Vec<SidebarItem>,
    /// Preorder indices of this node and its descendants
    span: Range<usize>,
}

impl SidebarItem {
    fn contains(&self, node: NodeId) -> bool {
        self.span.contains(&node.index())
    }
}

/// The rendered navigation structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidebar {
    items: Vec<SidebarItem>,
}

impl Sidebar {
    /// A node at depth `d` starts expanded when `fold_level` is unset or `d < fold_level`.
    pub fn render(
        tree: &BookTree,
        numbering: &Numbering,
        links: &LinkResolver,
        fold_level: Option<usize>,
    ) -> Self {
        fn build(
            ids: &[NodeId],
            tree: &BookTree,
            numbering: &Numbering,
            links: &LinkResolver,
            fold_level: Option<usize>,
        ) -> Vec<SidebarItem> {
            ids.iter()
                .map(|&id| {
                    let node = tree.get(id);
                    let number = numbering.get(id);
                    SidebarItem {
                        node: id,
                        number: number.to_string(),
                        label: number.label(),
                        title: node.title.clone(),
                        id: node.id.clone(),
                        url: node.page().map(|p| links.page_url(p)),
                        depth: node.depth,
                        expanded: fold_level.is_none_or(|f| node.depth < f),
                        children: build(tree.children(id), tree, numbering, links, fold_level),
                        span: id.index()..tree.subtree_end(id),
                    }
                })
                .collect()
        }

        Self {
            items: build(tree.roots(), tree, numbering, links, fold_level),
        }
    }

    pub fn items(&self) -> &[SidebarItem] {
        &self.items
    }

    /// The sidebar as seen from one page.
    pub fn view(&self, active: Option<NodeId>) -> SidebarView<'_> {
        SidebarView {
            sidebar: self,
            active,
        }
    }
}

/// A sidebar with a per-page active marker.
///
/// Serializes as `{ items: [...] }` where every item also carries `active` and `open`.
#[derive(Debug, Clone, Copy)]
pub struct SidebarView<'a> {
    sidebar: &'a Sidebar,
    active: Option<NodeId>,
}

impl<'a> SidebarView<'a> {
    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    pub fn is_active(&self, item: &SidebarItem) -> bool {
        self.active == Some(item.node)
    }

    /// Expanded by the fold level, or an ancestor of the active page.
    pub fn is_open(&self, item: &SidebarItem) -> bool {
        item.expanded || self.active.is_some_and(|a| a != item.node && item.contains(a))
    }
}

impl Serialize for SidebarView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Sidebar", 1)?;
        state.serialize_field("items", &Items(&self.sidebar.items, self))?;
        state.end()
    }
}

struct Items<'v, 'a>(&'v [SidebarItem], &'v SidebarView<'a>);

impl Serialize for Items<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for item in self.0 {
            seq.serialize_element(&ItemView(item, self.1))?;
        }
        seq.end()
    }
}

struct ItemView<'v, 'a>(&'v SidebarItem, &'v SidebarView<'a>);

impl Serialize for ItemView<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ItemView(item, view) = self;
        let mut state = serializer.serialize_struct("SidebarItem", 10)?;
        state.serialize_field("number", &item.number)?;
        state.serialize_field("label", &item.label)?;
        state.serialize_field("title", &item.title)?;
        state.serialize_field("id", &item.id)?;
        state.serialize_field("url", &item.url)?;
        state.serialize_field("depth", &item.depth)?;
        state.serialize_field("expanded", &item.expanded)?;
        state.serialize_field("active", &view.is_active(item))?;
        state.serialize_field("open", &view.is_open(item))?;
        state.serialize_field("children", &Items(&item.children, view))?;
        state.end()
    }
}
