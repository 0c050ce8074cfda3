//! Category tree built from the library index.
//!
//! Siblings are ordered by `order` (missing = 0) with a stable sort, so
//! entries sharing a key keep their source order. Labels are not unique;
//! a node's identity is its [`NodeKey`].

use std::collections::HashSet;

use crate::library::{Language, LibraryNode};

/// Deepest level whose children the outline will show
pub const DEFAULT_MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTreeNode {
    pub label: String,
    pub title: String,
    pub he_title: Option<String>,
    /// The work's own title, absent for pure categories
    pub work_title: Option<String>,
    pub order: f64,
    /// Labels from the root down to and including this node
    pub path: Vec<String>,
    pub is_leaf: bool,
    /// Position among sorted siblings
    pub sibling_index: usize,
    /// Positions in the unsorted index, root first
    pub source: Vec<usize>,
    pub children: Vec<CategoryTreeNode>,
}

impl CategoryTreeNode {
    pub fn display_title(&self, language: Language) -> &str {
        match language {
            Language::En => &self.title,
            Language::He => self.he_title.as_deref().unwrap_or(&self.title),
        }
    }

    /// The index entry this node was built from
    pub fn resolve<'l>(&self, items: &'l [LibraryNode]) -> Option<&'l LibraryNode> {
        let (first, rest) = self.source.split_first()?;
        let mut node = items.get(*first)?;
        for &i in rest {
            node = node.children().get(i)?;
        }
        Some(node)
    }
}

/// Identity of a node: its label path plus the sibling index at every level
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub path: Vec<String>,
    pub indices: Vec<usize>,
}

impl NodeKey {
    pub fn depth(&self) -> usize {
        self.indices.len().saturating_sub(1)
    }
}

/// Build the sorted tree for `items`, prefixing every path with `parent_path`
pub fn build_tree(items: &[LibraryNode], parent_path: &[String]) -> Vec<CategoryTreeNode> {
    build_level(items, parent_path, &[])
}

fn build_level(
    items: &[LibraryNode],
    parent_path: &[String],
    parent_source: &[usize],
) -> Vec<CategoryTreeNode> {
    let mut nodes: Vec<CategoryTreeNode> = items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let label = item.label().to_string();
            let mut path = parent_path.to_vec();
            path.push(label.clone());
            let mut source = parent_source.to_vec();
            source.push(position);

            // Children come back already sorted
            let children = build_level(item.children(), &path, &source);

            CategoryTreeNode {
                title: item
                    .title
                    .clone()
                    .unwrap_or_else(|| label.clone()),
                he_title: item.he_title.clone().or_else(|| item.he_category.clone()),
                work_title: item.title.clone(),
                order: item.sort_key(),
                is_leaf: children.is_empty(),
                sibling_index: 0,
                label,
                path,
                source,
                children,
            }
        })
        .collect();

    // Vec::sort_by is stable
    nodes.sort_by(|a, b| a.order.total_cmp(&b.order));
    for (index, node) in nodes.iter_mut().enumerate() {
        node.sibling_index = index;
    }
    nodes
}

/// A node together with where it sits in the tree
#[derive(Debug, Clone)]
pub struct TreeEntry<'t> {
    pub key: NodeKey,
    pub depth: usize,
    pub node: &'t CategoryTreeNode,
}

/// Depth-first, pre-order listing of every node
pub fn walk<'t>(tree: &'t [CategoryTreeNode]) -> Vec<TreeEntry<'t>> {
    let mut out = Vec::new();
    collect(tree, &[], &mut out, &|_, _| true);
    out
}

fn collect<'t>(
    nodes: &'t [CategoryTreeNode],
    parent_indices: &[usize],
    out: &mut Vec<TreeEntry<'t>>,
    descend: &dyn Fn(&NodeKey, &CategoryTreeNode) -> bool,
) {
    for node in nodes {
        let mut indices = parent_indices.to_vec();
        indices.push(node.sibling_index);
        let key = NodeKey {
            path: node.path.clone(),
            indices,
        };
        let depth = key.depth();
        let go_deeper = !node.is_leaf && descend(&key, node);
        let child_indices = key.indices.clone();
        out.push(TreeEntry { key, depth, node });
        if go_deeper {
            collect(&node.children, &child_indices, out, descend);
        }
    }
}

/// Find a node by label path. With duplicate labels the first match wins.
pub fn find<'t, S: AsRef<str>>(
    tree: &'t [CategoryTreeNode],
    path: &[S],
) -> Option<&'t CategoryTreeNode> {
    let (first, rest) = path.split_first()?;
    let node = tree.iter().find(|n| n.label == first.as_ref())?;
    if rest.is_empty() {
        Some(node)
    } else {
        find(&node.children, rest)
    }
}

pub fn leaf_count(tree: &[CategoryTreeNode]) -> usize {
    tree.iter()
        .map(|n| if n.is_leaf { 1 } else { leaf_count(&n.children) })
        .sum()
}

/// Which categories are open in the outline view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    expanded: HashSet<NodeKey>,
}

impl Expansion {
    /// Top-level categories start expanded
    pub fn new(tree: &[CategoryTreeNode]) -> Self {
        let mut expansion = Self::default();
        expansion.collapse_all(tree);
        expansion
    }

    pub fn is_expanded(&self, key: &NodeKey) -> bool {
        self.expanded.contains(key)
    }

    pub fn toggle(&mut self, key: &NodeKey) {
        if !self.expanded.remove(key) {
            self.expanded.insert(key.clone());
        }
    }

    pub fn expand_all(&mut self, tree: &[CategoryTreeNode]) {
        self.expanded = walk(tree)
            .into_iter()
            .filter(|entry| !entry.node.is_leaf)
            .map(|entry| entry.key)
            .collect();
    }

    /// Back to just the top level open
    pub fn collapse_all(&mut self, tree: &[CategoryTreeNode]) {
        self.expanded = tree
            .iter()
            .filter(|node| !node.is_leaf)
            .map(|node| NodeKey {
                path: node.path.clone(),
                indices: vec![node.sibling_index],
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

/// Rows visible in the outline: a node's children are listed when it is
/// expanded and its depth is below `max_depth`.
pub fn outline<'t>(
    tree: &'t [CategoryTreeNode],
    expansion: &Expansion,
    max_depth: usize,
) -> Vec<TreeEntry<'t>> {
    let mut out = Vec::new();
    collect(tree, &[], &mut out, &|key, _| {
        key.depth() < max_depth && expansion.is_expanded(key)
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn library(json: &str) -> Vec<LibraryNode> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_tanakh_genesis_scenario() {
        let items = library(r#"[{"category": "Tanakh", "contents": [{"title": "Genesis"}]}]"#);
        let tree = build_tree(&items, &[]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].label, "Tanakh");
        assert!(!tree[0].is_leaf);
        assert_eq!(tree[0].children.len(), 1);

        let genesis = &tree[0].children[0];
        assert_eq!(genesis.label, "Genesis");
        assert!(genesis.is_leaf);
        assert_eq!(genesis.path, vec!["Tanakh", "Genesis"]);
        assert_eq!(genesis.source, vec![0, 0]);
        assert!(std::ptr::eq(genesis.resolve(&items).unwrap(), &items[0].children()[0]));
        assert_eq!(genesis.work_title.as_deref(), Some("Genesis"));
        assert_eq!(tree[0].work_title, None);
    }

    #[test]
    fn test_siblings_sorted_stably_at_every_level() {
        let items = library(
            r#"[
                {"category": "B", "order": 2, "contents": [
                    {"title": "z", "order": 5}, {"title": "y"}, {"title": "x", "order": 1}, {"title": "w"}
                ]},
                {"category": "A", "order": 1},
                {"category": "C"}
            ]"#,
        );
        let tree = build_tree(&items, &[]);

        let top: Vec<&str> = tree.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(top, vec!["C", "A", "B"]);
        let inner: Vec<&str> = tree[2].children.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(inner, vec!["y", "w", "x", "z"]);
        let indices: Vec<usize> = tree[2].children.iter().map(|n| n.sibling_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parent_path_prefixes_every_node() {
        let items = library(r#"[{"title": "Berakhot"}]"#);
        let tree = build_tree(&items, &["Talmud".to_string(), "Bavli".to_string()]);
        assert_eq!(tree[0].path, vec!["Talmud", "Bavli", "Berakhot"]);
    }

    #[test]
    fn test_duplicate_labels_have_distinct_keys() {
        let items = library(
            r#"[
                {"category": "Commentary", "contents": [{"title": "Rashi"}]},
                {"category": "Commentary", "contents": [{"title": "Rashi"}]}
            ]"#,
        );
        let tree = build_tree(&items, &[]);
        let entries = walk(&tree);

        assert_eq!(entries.len(), 4);
        let keys: HashSet<&NodeKey> = entries.iter().map(|e| &e.key).collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(entries[1].key.path, entries[3].key.path);
        assert_ne!(entries[1].key, entries[3].key);

        let found = find(&tree, &["Commentary", "Rashi"]).unwrap();
        assert!(std::ptr::eq(found.resolve(&items).unwrap(), &items[0].children()[0]));
        assert_eq!(leaf_count(&tree), 2);
    }

    #[test]
    fn test_outline_respects_expansion_and_depth() {
        let items = library(
            r#"[{"category": "L0", "contents": [
                {"category": "L1", "contents": [
                    {"category": "L2", "contents": [{"title": "leaf"}]}
                ]}
            ]}, {"title": "Loose"}]"#,
        );
        let tree = build_tree(&items, &[]);

        let mut expansion = Expansion::new(&tree);
        assert_eq!(expansion.len(), 1);
        let rows: Vec<&str> = outline(&tree, &expansion, DEFAULT_MAX_DEPTH)
            .iter()
            .map(|e| e.node.label.as_str())
            .collect();
        assert_eq!(rows, vec!["L0", "L1", "Loose"]);

        expansion.expand_all(&tree);
        assert_eq!(outline(&tree, &expansion, DEFAULT_MAX_DEPTH).len(), 5);
        // Depth limit stops below L1
        assert_eq!(outline(&tree, &expansion, 1).len(), 3);

        let l1 = walk(&tree)[1].key.clone();
        expansion.toggle(&l1);
        assert!(!expansion.is_expanded(&l1));
        assert_eq!(outline(&tree, &expansion, DEFAULT_MAX_DEPTH).len(), 3);

        expansion.collapse_all(&tree);
        assert_eq!(expansion.len(), 1);
    }

    #[test]
    fn test_hebrew_display_title_falls_back_to_english() {
        let items = library(r#"[{"category": "Tanakh", "heCategory": "תנ״ך"}, {"title": "Avot"}]"#);
        let tree = build_tree(&items, &[]);
        assert_eq!(tree[0].display_title(Language::He), "תנ״ך");
        assert_eq!(tree[1].display_title(Language::He), "Avot");
        assert_eq!(tree[1].display_title(Language::En), "Avot");
    }

    #[test]
    fn test_missing_title_uses_label() {
        let items = library(r#"[{"category": "Mishnah", "heCategory": "משנה"}]"#);
        let tree = build_tree(&items, &[]);
        assert_eq!(tree[0].title, "Mishnah");
        assert_eq!(tree[0].he_title.as_deref(), Some("משנה"));
    }

    fn arb_node() -> impl Strategy<Value = LibraryNode> {
        let leaf = (prop::option::of(-3i32..4), "[a-c]{1,2}", any::<bool>()).prop_map(
            |(order, title, empty_contents)| LibraryNode {
                title: Some(title),
                order: order.map(f64::from),
                contents: if empty_contents { Some(Vec::new()) } else { None },
                ..LibraryNode::default()
            },
        );
        leaf.prop_recursive(4, 48, 6, |inner| {
            (prop::option::of(-3i32..4), "[A-C]{1,2}", prop::collection::vec(inner, 0..6)).prop_map(
                |(order, category, contents)| LibraryNode {
                    category: Some(category),
                    order: order.map(f64::from),
                    contents: Some(contents),
                    ..LibraryNode::default()
                },
            )
        })
    }

    fn check_level(nodes: &[CategoryTreeNode], items: &[LibraryNode]) {
        for pair in nodes.windows(2) {
            assert!(pair[0].order <= pair[1].order);
            if pair[0].order == pair[1].order {
                // Ties keep source order
                assert!(pair[0].source.last() < pair[1].source.last());
            }
        }
        for node in nodes {
            let source = node.resolve(items).unwrap();
            assert_eq!(node.is_leaf, source.contents.as_ref().map_or(true, |c| c.is_empty()));
            assert_eq!(node.path.last().map(String::as_str), Some(source.label()));
            for child in &node.children {
                assert_eq!(child.source[..child.source.len() - 1], node.source[..]);
            }
            check_level(&node.children, items);
        }
    }

    proptest! {
        #[test]
        fn prop_every_level_sorted_stably_and_leaves_match_contents(
            items in prop::collection::vec(arb_node(), 0..8)
        ) {
            let tree = build_tree(&items, &[]);
            prop_assert_eq!(tree.len(), items.len());
            check_level(&tree, &items);
        }
    }
}
