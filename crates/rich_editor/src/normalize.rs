use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bullet::{BULLET_HINT_ATTRS, BULLET_STYLE_ATTR, BulletRegistry};
use crate::core::{AttrPatch, Attrs, Document, ElementNode, Node};
use crate::ops::{Op, Path};

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document) -> Vec<Op>;
}

/// Passes the edit session runs after every transaction.
pub fn structural_passes() -> Vec<Box<dyn NormalizePass>> {
    vec![
        Box::new(RemoveEmptyLists),
        Box::new(FillEmptyTextBlocks),
        Box::new(MergeAdjacentTextLeaves),
    ]
}

fn holds_text(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "li"
            | "div"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "blockquote"
            | "pre"
            | "td"
            | "th"
    )
}

/// Gives every text-holding block without a text leaf an empty one, so a
/// caret can sit inside it.
pub struct FillEmptyTextBlocks;

impl NormalizePass for FillEmptyTextBlocks {
    fn id(&self) -> &'static str {
        "core.fill_empty_text_blocks"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        // Returns whether the subtree holds a text leaf once `ops` are applied.
        fn walk(node: &Node, path: &mut Vec<usize>, ops: &mut Vec<Op>) -> bool {
            let el = match node {
                Node::Text(_) => return true,
                Node::Void(_) => return false,
                Node::Element(el) => el,
            };
            let mut has_text = false;
            for (ix, child) in el.children.iter().enumerate() {
                path.push(ix);
                has_text |= walk(child, path, ops);
                path.pop();
            }
            if !has_text && holds_text(&el.tag) {
                let mut leaf_path = path.clone();
                leaf_path.push(0);
                ops.push(Op::InsertNode {
                    path: leaf_path,
                    node: Node::text(""),
                });
                return true;
            }
            has_text
        }

        let mut ops = Vec::new();
        for (ix, node) in doc.children.iter().enumerate() {
            walk(node, &mut vec![ix], &mut ops);
        }
        ops
    }
}

/// Removes `ul`/`ol` elements that no longer hold any item.
pub struct RemoveEmptyLists;

impl NormalizePass for RemoveEmptyLists {
    fn id(&self) -> &'static str {
        "core.remove_empty_lists"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate().rev() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                walk(&el.children, path, ops);
                let has_items = el
                    .children
                    .iter()
                    .any(|child| !matches!(child, Node::Text(t) if t.text.trim().is_empty()));
                if el.is_list() && !has_items {
                    ops.push(Op::RemoveNode { path: path.clone() });
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

pub struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        // Post-order: a container's own removals shift its element children,
        // so ops inside those children must come first.
        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                if let Node::Element(el) = node {
                    path.push(ix);
                    walk(&el.children, path, ops);
                    path.pop();
                }
            }

            let mut ix = children.len();
            while ix > 0 {
                ix -= 1;
                let Node::Text(right) = &children[ix] else {
                    continue;
                };

                let mut start = ix;
                while start > 0 {
                    let Some(Node::Text(left)) = children.get(start - 1) else {
                        break;
                    };
                    if left.marks != right.marks {
                        break;
                    }
                    start -= 1;
                }

                if start == ix {
                    continue;
                }

                // Fold right to left so each removed leaf is a suffix of its
                // left neighbour when it goes.
                let mut carried = String::new();
                for right_ix in (start + 1..=ix).rev() {
                    let (Some(Node::Text(left)), Some(Node::Text(right))) =
                        (children.get(right_ix - 1), children.get(right_ix))
                    else {
                        continue;
                    };
                    carried.insert_str(0, &right.text);
                    if !carried.is_empty() {
                        let mut insert_text_path = path.clone();
                        insert_text_path.push(right_ix - 1);
                        ops.push(Op::InsertText {
                            path: insert_text_path,
                            offset: left.text.len(),
                            text: carried.clone(),
                        });
                    }
                    let mut remove_path = path.clone();
                    remove_path.push(right_ix);
                    ops.push(Op::RemoveNode { path: remove_path });
                }

                ix = start;
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

/// How list nodes pick their bullet style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletPolicy {
    #[serde(default)]
    pub level_map: Vec<String>,
    pub default_style: String,
    pub nested_style: String,
}

impl Default for BulletPolicy {
    fn default() -> Self {
        Self {
            level_map: Vec::new(),
            default_style: "dot".to_string(),
            nested_style: "circle".to_string(),
        }
    }
}

impl BulletPolicy {
    pub fn has_level_map(&self) -> bool {
        !self.level_map.is_empty()
    }

    /// Style for a list at `depth` (1 = top level).
    pub fn target_style(&self, depth: usize) -> &str {
        if let Some(last) = self.level_map.last() {
            let ix = depth.max(1) - 1;
            return self.level_map.get(ix).unwrap_or(last);
        }
        if depth > 1 {
            &self.nested_style
        } else {
            &self.default_style
        }
    }
}

/// One row of the normalizer's side table: the style a list node ends up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletAssignment {
    pub path: Path,
    pub depth: usize,
    pub style_id: String,
    /// Rendering hints for `style_id`, or `None` when the registry does not
    /// know the id.
    pub hints: Option<Attrs>,
    /// The list already carried a style that was kept.
    pub kept_existing: bool,
}

impl BulletAssignment {
    pub(crate) fn patch_for(&self, el: &ElementNode) -> AttrPatch {
        let mut patch = AttrPatch::default();
        if el.attr(BULLET_STYLE_ATTR) != Some(self.style_id.as_str()) {
            patch
                .set
                .insert(BULLET_STYLE_ATTR.to_string(), self.style_id.clone());
        }
        match &self.hints {
            Some(hints) => {
                for (key, value) in hints {
                    if el.attrs.get(key) != Some(value) {
                        patch.set.insert(key.clone(), value.clone());
                    }
                }
                for key in BULLET_HINT_ATTRS {
                    if !hints.contains_key(key) && el.attrs.contains_key(key) {
                        patch.remove.push(key.to_string());
                    }
                }
            }
            None => {
                for key in BULLET_HINT_ATTRS {
                    if el.attrs.contains_key(key) {
                        patch.remove.push(key.to_string());
                    }
                }
            }
        }
        patch
    }
}

/// Keeps every list's bullet attributes consistent with its nesting depth.
pub struct ListNormalizer {
    policy: BulletPolicy,
    registry: Arc<BulletRegistry>,
}

impl ListNormalizer {
    pub fn new(policy: BulletPolicy, registry: Arc<BulletRegistry>) -> Self {
        Self { policy, registry }
    }

    pub fn policy(&self) -> &BulletPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &BulletRegistry {
        &self.registry
    }

    /// Computes the style of every list node, in document order.
    pub fn plan(&self, doc: &Document) -> Vec<BulletAssignment> {
        fn walk(
            normalizer: &ListNormalizer,
            children: &[Node],
            path: &mut Vec<usize>,
            list_depth: usize,
            out: &mut Vec<BulletAssignment>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                let mut depth = list_depth;
                if el.is_list() {
                    depth += 1;
                    out.push(normalizer.assign(el, path, depth));
                }
                walk(normalizer, &el.children, path, depth, out);
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(self, &doc.children, &mut Vec::new(), 0, &mut out);
        out
    }

    fn assign(&self, el: &ElementNode, path: &[usize], depth: usize) -> BulletAssignment {
        let existing = el.attr(BULLET_STYLE_ATTR).filter(|id| !id.is_empty());
        let (style_id, kept_existing) = match existing {
            Some(id) if !self.policy.has_level_map() => (id.to_string(), true),
            _ => (self.policy.target_style(depth).to_string(), false),
        };
        let hints = self.registry.resolve(&style_id).map(|style| style.hints());
        BulletAssignment {
            path: path.to_vec(),
            depth,
            style_id,
            hints,
            kept_existing,
        }
    }
}

impl NormalizePass for ListNormalizer {
    fn id(&self) -> &'static str {
        "list.normalize_bullet_styles"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        self.plan(doc)
            .into_iter()
            .filter_map(|assignment| {
                let el = doc.element(&assignment.path)?;
                let patch = assignment.patch_for(el);
                (!patch.is_empty()).then(|| Op::SetNodeAttrs {
                    path: assignment.path,
                    patch,
                })
            })
            .collect()
    }
}
