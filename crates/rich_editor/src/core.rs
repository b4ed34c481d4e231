use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::{NormalizePass, structural_passes};
use crate::ops::{Op, Path, Transaction};

pub type Attrs = BTreeMap<String, String>;

/// Tags that always render as a block box.
pub fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "li"
            | "ul"
            | "ol"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "blockquote"
            | "pre"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "table"
            | "thead"
            | "tbody"
            | "tr"
            | "td"
            | "th"
    )
}

pub fn is_list_tag(tag: &str) -> bool {
    matches!(tag, "ul" | "ol")
}

pub fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "br" | "img" | "hr" | "input" | "wbr" | "col" | "area" | "embed" | "source"
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn element(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            tag: tag.into(),
            attrs: Attrs::default(),
            children,
        })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element("p", vec![Node::text(text)])
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        Node::element("li", vec![Node::text(text)])
    }

    pub fn is_block(&self) -> bool {
        match self {
            Node::Element(el) => is_block_tag(&el.tag),
            Node::Void(v) => v.tag == "hr",
            Node::Text(_) => false,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        self.as_element().is_some_and(ElementNode::is_list)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn is_list(&self) -> bool {
        is_list_tag(&self.tag)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub tag: String,
    #[serde(default)]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Returns `(start, end)` in document order.
    pub fn ordered(&self) -> (Point, Point) {
        let mut start = self.anchor.clone();
        let mut end = self.focus.clone();

        if start.path == end.path {
            if end.offset < start.offset {
                std::mem::swap(&mut start, &mut end);
            }
            return (start, end);
        }
        if end.path < start.path {
            std::mem::swap(&mut start, &mut end);
        }
        (start, end)
    }

    pub fn is_backward(&self) -> bool {
        self.ordered().0 != self.anchor
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        node_ref(self, path)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        self.node(path).and_then(Node::as_element)
    }

    pub fn text_node(&self, path: &[usize]) -> Option<&TextNode> {
        match self.node(path)? {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Children of the container at `path`; the empty path is the root.
    pub fn children_at(&self, path: &[usize]) -> Option<&[Node]> {
        if path.is_empty() {
            return Some(&self.children);
        }
        self.element(path).map(|el| el.children.as_slice())
    }

    /// Paths of every text leaf, in document order.
    pub fn text_paths(&self) -> Vec<Path> {
        fn walk(children: &[Node], path: &mut Path, out: &mut Vec<Path>) {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                match node {
                    Node::Text(_) => out.push(path.clone()),
                    Node::Element(el) => walk(&el.children, path, out),
                    Node::Void(_) => {}
                }
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }

    pub fn text_ordinal(&self, path: &[usize]) -> Option<usize> {
        self.text_paths().iter().position(|p| p.as_slice() == path)
    }

    pub fn text_path_at(&self, ordinal: usize) -> Option<Path> {
        self.text_paths().into_iter().nth(ordinal)
    }

    pub fn first_text_point(&self) -> Option<Point> {
        self.text_paths()
            .into_iter()
            .next()
            .map(|path| Point::new(path, 0))
    }

    pub fn end_point(&self) -> Option<Point> {
        let path = self.text_paths().pop()?;
        let len = self.text_node(&path).map(|t| t.text.len()).unwrap_or(0);
        Some(Point::new(path, len))
    }

    /// Nearest strict ancestor of `path` that is an `ul`/`ol` element.
    pub fn list_ancestor(&self, path: &[usize]) -> Option<Path> {
        self.ancestor_where(path, |el| el.is_list())
    }

    /// Nearest strict ancestor `li` whose parent is a list.
    pub fn list_item_ancestor(&self, path: &[usize]) -> Option<Path> {
        let mut current = path.to_vec();
        while current.pop().is_some() {
            if current.is_empty() {
                return None;
            }
            let Some(el) = self.element(&current) else {
                continue;
            };
            if el.tag != "li" {
                continue;
            }
            let parent = &current[..current.len() - 1];
            if !parent.is_empty() && self.element(parent).is_some_and(ElementNode::is_list) {
                return Some(current);
            }
        }
        None
    }

    pub fn ancestor_where(
        &self,
        path: &[usize],
        pred: impl Fn(&ElementNode) -> bool,
    ) -> Option<Path> {
        let mut current = path.to_vec();
        while current.pop().is_some() {
            if current.is_empty() {
                return None;
            }
            if let Some(el) = self.element(&current)
                && pred(el)
            {
                return Some(current);
            }
        }
        None
    }

    pub fn is_text_point(&self, point: &Point) -> bool {
        self.text_node(&point.path)
            .is_some_and(|t| t.text.is_char_boundary(point.offset.min(t.text.len())))
    }

    /// Snaps a point onto an existing text leaf, or returns `None` when the
    /// document has no text at all.
    pub fn normalize_point(&self, point: &Point) -> Option<Point> {
        normalize_point_to_existing_text(self, point)
    }

    pub fn normalize_selection(&self, selection: &Selection) -> Selection {
        let fallback = self
            .first_text_point()
            .unwrap_or_else(|| Point::new(Vec::new(), 0));

        let anchor = self.normalize_point(&selection.anchor).unwrap_or_else(|| {
            self.normalize_point(&selection.focus)
                .unwrap_or_else(|| fallback.clone())
        });
        let focus = self
            .normalize_point(&selection.focus)
            .unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    let point = Point {
                        path: path.clone(),
                        offset: 0,
                    };
                    path.pop();
                    return Some(point);
                }
                Node::Element(el) => {
                    if let Some(point) = first_text_descendant(&el.children, path) {
                        path.pop();
                        return Some(point);
                    }
                }
                Node::Void(_) => {}
            }
            path.pop();
        }
        None
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: clamp_to_char_boundary(&t.text, point.offset),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
            Node::Void(_) => {
                break;
            }
        }
    }

    match node_ref(doc, &resolved_path)? {
        Node::Text(t) => Some(Point {
            path: resolved_path,
            offset: clamp_to_char_boundary(&t.text, point.offset),
        }),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path)
            .or_else(|| doc.first_text_point()),
        Node::Void(_) => doc.first_text_point(),
    }
}

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub max_undo: usize,
    #[serde(default)]
    pub max_normalize_iterations: usize,
}

impl SessionConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self
    }
}

/// Document, selection and undo history of one editable surface.
pub struct EditSession {
    doc: Document,
    selection: Selection,
    passes: Vec<Box<dyn NormalizePass>>,
    config: SessionConfig,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
}

impl EditSession {
    pub fn new(doc: Document, selection: Selection, config: SessionConfig) -> Self {
        let mut session = Self {
            doc,
            selection,
            passes: structural_passes(),
            config: config.with_defaults(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        };
        session.normalize_in_place();
        session
    }

    pub fn from_document(doc: Document) -> Self {
        Self::at_end(doc, SessionConfig::default())
    }

    /// A session with the caret at the end of the normalized document.
    pub fn at_end(doc: Document, config: SessionConfig) -> Self {
        let mut session = Self::new(doc, Selection::collapsed(Point::new(Vec::new(), 0)), config);
        if let Some(end) = session.doc.end_point() {
            session.set_selection(Selection::collapsed(end));
        }
        session
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    /// Replaces the whole document, dropping history.
    pub fn replace_document(&mut self, doc: Document) {
        self.doc = doc;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.normalize_in_place();
        self.selection = Selection::collapsed(
            self.doc
                .end_point()
                .unwrap_or_else(|| Point::new(Vec::new(), 0)),
        );
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut redo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok(inv) = self.apply_op(op) {
                redo_ops.push(inv);
            } else {
                break;
            }
        }
        redo_ops.reverse();

        self.selection = selection_before.clone();
        self.normalize_in_place();

        self.redo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: redo_ops,
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut undo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok(inv) = self.apply_op(op) {
                undo_ops.push(inv);
            } else {
                break;
            }
        }
        undo_ops.reverse();

        self.selection = selection_after.clone();
        self.normalize_in_place();

        self.undo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: undo_ops,
        });
        true
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let selection_before = self.selection.clone();

        let mut inverse_ops: Vec<Op> = Vec::new();
        for op in tx.ops.iter().cloned() {
            let inv = self.apply_op(op)?;
            inverse_ops.push(inv);
        }

        if let Some(sel) = tx.selection_after {
            self.selection = sel;
        }

        let mut inverse_normalize = self.normalize_with_inverse_ops()?;
        inverse_ops.append(&mut inverse_normalize);
        inverse_ops.reverse();

        self.normalize_selection_in_place();

        if inverse_ops.is_empty() {
            return Ok(());
        }

        let selection_after = self.selection.clone();
        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }

        Ok(())
    }

    /// Applies follow-up ops produced by an external normalizer. Their inverses
    /// are folded into the most recent undo step so one undo reverts both.
    pub fn apply_normalization(&mut self, ops: Vec<Op>) -> Result<(), ApplyError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut inverse_ops: Vec<Op> = Vec::new();
        for op in ops {
            inverse_ops.push(self.apply_op(op)?);
        }
        inverse_ops.append(&mut self.normalize_with_inverse_ops()?);
        inverse_ops.reverse();
        self.normalize_selection_in_place();

        if let Some(record) = self.undo_stack.last_mut() {
            inverse_ops.append(&mut record.inverse_ops);
            record.inverse_ops = inverse_ops;
            record.selection_after = self.selection.clone();
        }
        Ok(())
    }

    fn normalize_in_place(&mut self) {
        if let Err(err) = self.normalize_with_inverse_ops() {
            tracing::warn!(target: "manos_rich_editor::session", %err, "structural normalization failed");
        }
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = self.doc.normalize_selection(&self.selection);
    }

    fn normalize_with_inverse_ops(&mut self) -> Result<Vec<Op>, ApplyError> {
        let mut inverse_ops: Vec<Op> = Vec::new();
        for _ in 0..self.config.max_normalize_iterations {
            let ops = run_passes(&self.passes, &self.doc);
            if ops.is_empty() {
                return Ok(inverse_ops);
            }
            for op in ops {
                let inv = self.apply_op(op)?;
                inverse_ops.push(inv);
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    fn apply_op(&mut self, op: Op) -> Result<Op, ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op)
    }
}

fn run_passes(passes: &[Box<dyn NormalizePass>], doc: &Document) -> Vec<Op> {
    // Each pass sees the document as it was before this round, so only the
    // first pass with work contributes ops.
    for pass in passes {
        let ops = pass.run(doc);
        if !ops.is_empty() {
            tracing::trace!(target: "manos_rich_editor::session", pass = pass.id(), ops = ops.len(), "normalize");
            return ops;
        }
    }
    Vec::new()
}

pub fn apply_op_to(
    doc: &mut Document,
    selection: &mut Selection,
    op: Op,
) -> Result<Op, ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            let appended = offset == text_node.text.len();
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len(), appended);
            Ok(Op::RemoveText {
                path,
                range: offset..offset + text.len(),
            })
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start >= end {
                return Ok(Op::InsertText {
                    path,
                    offset: start,
                    text: String::new(),
                });
            }
            let removed = text_node.text[start..end].to_string();
            text_node.text.replace_range(start..end, "");
            transform_selection_remove_text(selection, &path, start..end);
            Ok(Op::InsertText {
                path,
                offset: start,
                text: removed,
            })
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
            Ok(Op::RemoveNode { path })
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path, &removed, doc);
            Ok(Op::InsertNode {
                path,
                node: removed,
            })
        }
        Op::SetNodeAttrs { path, patch } => {
            let old = match node_mut(doc, &path)? {
                Node::Element(el) => patch_apply(&mut el.attrs, &patch),
                Node::Void(v) => patch_apply(&mut v.attrs, &patch),
                Node::Text(_) => return Err(ApplyError::InvalidPath("Text has no attrs".into())),
            };
            Ok(Op::SetNodeAttrs { path, patch: old })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug)]
pub struct PathError(pub String);

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
    appended: bool,
) {
    // A point sitting at the end of a leaf stays put when text is appended.
    for point in [&mut selection.anchor, &mut selection.focus] {
        let moves = point.offset > offset || (point.offset == offset && !appended);
        if point.path == path && moves {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path {
            continue;
        }
        if point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    if path.is_empty() {
        return;
    }
    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(
    selection: &mut Selection,
    path: &[usize],
    removed: &Node,
    doc_after_remove: &Document,
) {
    if path.is_empty() {
        return;
    }
    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    let merge_prefix_len = match (removed, index.checked_sub(1)) {
        (Node::Text(removed_text), Some(left_index)) => {
            let mut left_path = parent_path.to_vec();
            left_path.push(left_index);
            match node_ref(doc_after_remove, &left_path) {
                Some(Node::Text(left_text))
                    if left_text.marks == removed_text.marks
                        && left_text.text.ends_with(&removed_text.text) =>
                {
                    Some(left_text.text.len().saturating_sub(removed_text.text.len()))
                }
                _ => None,
            }
        }
        _ => None,
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
            continue;
        }
        if ix < index {
            continue;
        }

        // Point was inside the removed subtree. Map it to a nearby point.
        if let (Some(prefix), Node::Text(removed_text), Some(left_index)) =
            (merge_prefix_len, removed, index.checked_sub(1))
        {
            point.path.truncate(depth + 1);
            point.path[depth] = left_index;
            point.offset = (prefix + point.offset).min(prefix + removed_text.text.len());
        } else {
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

fn node_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let mut node = doc.children.get(*first)?;
    for &ix in rest {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Void(_) | Node::Text(_) => return None,
        };
    }
    Some(node)
}

fn children_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Vec<Node>, PathError> {
    let mut children = &mut doc.children;
    for (depth, &ix) in path.iter().enumerate() {
        let current = children;
        let len = current.len();
        children = match current.get_mut(ix) {
            Some(Node::Element(el)) => &mut el.children,
            Some(Node::Void(_) | Node::Text(_)) => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
            None => {
                return Err(PathError(format!(
                    "Path out of bounds at depth {depth}: {ix} >= {len}"
                )));
            }
        };
    }
    Ok(children)
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty path".into()));
    };
    let children = children_mut(doc, parent_path)?;
    let len = children.len();
    children
        .get_mut(index)
        .ok_or_else(|| PathError(format!("Path out of bounds: {index} >= {len}")))
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(PathError("Expected Text node".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty insert path".into()));
    };
    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty remove path".into()));
    };
    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }
}

fn patch_apply(attrs: &mut Attrs, patch: &AttrPatch) -> AttrPatch {
    let mut old_set: Attrs = Attrs::new();
    let mut old_remove: Vec<String> = Vec::new();

    for (k, v) in &patch.set {
        if let Some(prev) = attrs.insert(k.clone(), v.clone()) {
            old_set.insert(k.clone(), prev);
        } else {
            old_remove.push(k.clone());
        }
    }

    for key in &patch.remove {
        if let Some(prev) = attrs.remove(key) {
            old_set.insert(key.clone(), prev);
        }
    }

    AttrPatch {
        set: old_set,
        remove: old_remove,
    }
}
