//! Transaction builders behind the surface's editing commands.
//!
//! Every builder reads the current document and selection and returns a
//! [`Transaction`]; nothing here mutates state directly. Structural commands
//! never create or drop text leaves, which lets selections be carried across
//! by text-leaf ordinal.

use crate::core::{
    Attrs, Document, ElementNode, Marks, Node, Point, Selection, TextNode, apply_op_to,
    clamp_to_char_boundary,
};
use crate::ops::{Op, Path, Transaction};

fn preview_ops(doc: &Document, ops: &[Op]) -> Result<Document, String> {
    let mut doc = doc.clone();
    let mut scratch = Selection::collapsed(Point::new(Vec::new(), 0));
    for op in ops.iter().cloned() {
        apply_op_to(&mut doc, &mut scratch, op).map_err(|e| format!("Invalid edit: {e}"))?;
    }
    Ok(doc)
}

fn remap_point(old: &Document, new: &Document, point: &Point) -> Option<Point> {
    let ordinal = old.text_ordinal(&point.path)?;
    let path = new.text_path_at(ordinal)?;
    Some(Point::new(path, point.offset))
}

fn remap_selection(old: &Document, new: &Document, sel: &Selection) -> Selection {
    let anchor = remap_point(old, new, &sel.anchor);
    let focus = remap_point(old, new, &sel.focus);
    match (anchor, focus) {
        (Some(anchor), Some(focus)) => Selection { anchor, focus },
        (anchor, focus) => {
            let fallback = anchor.or(focus).unwrap_or_else(|| Point::new(Vec::new(), 0));
            new.normalize_selection(&Selection::collapsed(fallback))
        }
    }
}

/// Moves a point that lived under `from` to the same spot under `to`.
fn relocate(point: &Point, from: &[usize], to: &[usize]) -> Option<Point> {
    let rel = point.path.strip_prefix(from)?;
    let mut path = to.to_vec();
    path.extend_from_slice(rel);
    Some(Point::new(path, point.offset))
}

fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

fn is_whitespace_text(node: &Node) -> bool {
    matches!(node, Node::Text(t) if t.text.trim().is_empty())
}

pub fn marks_at(doc: &Document, point: &Point) -> Marks {
    doc.text_node(&point.path)
        .map(|t| t.marks.clone())
        .unwrap_or_default()
}

pub fn in_unordered_list(doc: &Document, point: &Point) -> bool {
    doc.list_ancestor(&point.path)
        .and_then(|path| doc.element(&path))
        .is_some_and(|el| el.tag == "ul")
}

struct TextSlice {
    ordinal: usize,
    path: Path,
    from: usize,
    to: usize,
}

/// Non-empty byte ranges of every text leaf covered by the selection.
fn selected_slices(doc: &Document, sel: &Selection) -> Result<Vec<TextSlice>, String> {
    let (start, end) = sel.ordered();
    let texts = doc.text_paths();
    let si = texts
        .iter()
        .position(|p| *p == start.path)
        .ok_or_else(|| "Selection start is not in a text node".to_string())?;
    let ei = texts
        .iter()
        .position(|p| *p == end.path)
        .ok_or_else(|| "Selection end is not in a text node".to_string())?;

    let mut slices = Vec::new();
    for (ordinal, path) in texts.iter().enumerate().take(ei + 1).skip(si) {
        let Some(t) = doc.text_node(path) else {
            continue;
        };
        let from = if ordinal == si {
            clamp_to_char_boundary(&t.text, start.offset)
        } else {
            0
        };
        let to = if ordinal == ei {
            clamp_to_char_boundary(&t.text, end.offset)
        } else {
            t.text.len()
        };
        if from < to {
            slices.push(TextSlice {
                ordinal,
                path: path.clone(),
                from,
                to,
            });
        }
    }
    Ok(slices)
}

/// `Some(true)` when every selected character has the mark, `None` when the
/// selection covers no text.
pub fn selection_has_mark(doc: &Document, sel: &Selection, get: fn(&Marks) -> bool) -> Option<bool> {
    let slices = selected_slices(doc, sel).ok()?;
    if slices.is_empty() {
        return None;
    }
    Some(slices.iter().all(|slice| {
        doc.text_node(&slice.path)
            .is_some_and(|t| get(&t.marks))
    }))
}

pub fn apply_mark_range(
    doc: &Document,
    sel: &Selection,
    apply: &dyn Fn(Marks) -> Marks,
) -> Result<Transaction, String> {
    let slices = selected_slices(doc, sel)?;
    if slices.is_empty() {
        return Ok(Transaction::default());
    }

    struct Split {
        path: Path,
        pieces: Vec<Node>,
        mid_ordinal: usize,
        mid_len: usize,
    }

    let mut splits: Vec<Split> = Vec::new();
    let mut added = 0usize;
    for slice in &slices {
        let Some(t) = doc.text_node(&slice.path) else {
            continue;
        };
        let mut pieces = Vec::new();
        if slice.from > 0 {
            pieces.push(Node::Text(TextNode {
                text: t.text[..slice.from].to_string(),
                marks: t.marks.clone(),
            }));
        }
        let mid_ordinal = slice.ordinal + added + pieces.len();
        pieces.push(Node::Text(TextNode {
            text: t.text[slice.from..slice.to].to_string(),
            marks: apply(t.marks.clone()),
        }));
        if slice.to < t.text.len() {
            pieces.push(Node::Text(TextNode {
                text: t.text[slice.to..].to_string(),
                marks: t.marks.clone(),
            }));
        }
        added += pieces.len() - 1;
        splits.push(Split {
            path: slice.path.clone(),
            pieces,
            mid_ordinal,
            mid_len: slice.to - slice.from,
        });
    }

    let mut ops = Vec::new();
    for split in splits.iter().rev() {
        let Some((&ix, parent)) = split.path.split_last() else {
            continue;
        };
        ops.push(Op::RemoveNode {
            path: split.path.clone(),
        });
        for (k, piece) in split.pieces.iter().cloned().enumerate() {
            ops.push(Op::InsertNode {
                path: child_path(parent, ix + k),
                node: piece,
            });
        }
    }

    let next = preview_ops(doc, &ops)?;
    let (Some(first), Some(last)) = (splits.first(), splits.last()) else {
        return Ok(Transaction::new(ops));
    };
    let start = next
        .text_path_at(first.mid_ordinal)
        .map(|path| Point::new(path, 0));
    let end = next
        .text_path_at(last.mid_ordinal)
        .map(|path| Point::new(path, last.mid_len));
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(Transaction::new(ops));
    };
    let selection_after = if sel.is_backward() {
        Selection {
            anchor: end,
            focus: start,
        }
    } else {
        Selection {
            anchor: start,
            focus: end,
        }
    };
    Ok(Transaction::new(ops).selection_after(selection_after))
}

/// Removes the selected characters; returns the ops and the caret after them.
fn remove_range(doc: &Document, sel: &Selection) -> Result<(Vec<Op>, Point), String> {
    let slices = selected_slices(doc, sel)?;
    let (start, _) = sel.ordered();
    let caret = doc
        .text_node(&start.path)
        .map(|t| Point::new(start.path.clone(), clamp_to_char_boundary(&t.text, start.offset)))
        .unwrap_or(start);
    let ops = slices
        .into_iter()
        .rev()
        .map(|slice| Op::RemoveText {
            path: slice.path,
            range: slice.from..slice.to,
        })
        .collect();
    Ok((ops, caret))
}

pub fn insert_text(
    doc: &Document,
    sel: &Selection,
    text: &str,
    pending: Option<&Marks>,
) -> Result<Transaction, String> {
    let (mut ops, caret, base) = if sel.is_collapsed() {
        (Vec::new(), sel.focus.clone(), doc.clone())
    } else {
        let (ops, caret) = remove_range(doc, sel)?;
        let base = preview_ops(doc, &ops)?;
        (ops, caret, base)
    };

    if text.is_empty() {
        return Ok(Transaction::new(ops).selection_after(Selection::collapsed(caret)));
    }

    let Some(t) = base.text_node(&caret.path) else {
        if !base.text_paths().is_empty() {
            return Err("Selection is not in a text node".into());
        }
        // Typing into an empty surface creates a bare text leaf.
        let path = vec![base.children.len()];
        ops.push(Op::InsertNode {
            path: path.clone(),
            node: Node::Text(TextNode {
                text: text.to_string(),
                marks: pending.cloned().unwrap_or_default(),
            }),
        });
        return Ok(Transaction::new(ops)
            .selection_after(Selection::collapsed(Point::new(path, text.len()))));
    };

    let offset = clamp_to_char_boundary(&t.text, caret.offset);
    match pending.filter(|marks| **marks != t.marks) {
        Some(marks) => {
            let Some((&ix, parent)) = caret.path.split_last() else {
                return Err("Selection is not in a text node".into());
            };
            let mut pieces = Vec::new();
            if offset > 0 {
                pieces.push(Node::Text(TextNode {
                    text: t.text[..offset].to_string(),
                    marks: t.marks.clone(),
                }));
            }
            let typed_ix = ix + pieces.len();
            pieces.push(Node::Text(TextNode {
                text: text.to_string(),
                marks: marks.clone(),
            }));
            if offset < t.text.len() {
                pieces.push(Node::Text(TextNode {
                    text: t.text[offset..].to_string(),
                    marks: t.marks.clone(),
                }));
            }
            ops.push(Op::RemoveNode {
                path: caret.path.clone(),
            });
            for (k, piece) in pieces.into_iter().enumerate() {
                ops.push(Op::InsertNode {
                    path: child_path(parent, ix + k),
                    node: piece,
                });
            }
            Ok(Transaction::new(ops).selection_after(Selection::collapsed(Point::new(
                child_path(parent, typed_ix),
                text.len(),
            ))))
        }
        None => {
            ops.push(Op::InsertText {
                path: caret.path.clone(),
                offset,
                text: text.to_string(),
            });
            Ok(Transaction::new(ops).selection_after(Selection::collapsed(Point::new(
                caret.path,
                offset + text.len(),
            ))))
        }
    }
}

pub fn delete_backward(doc: &Document, sel: &Selection) -> Result<Transaction, String> {
    if !sel.is_collapsed() {
        let (ops, caret) = remove_range(doc, sel)?;
        return Ok(Transaction::new(ops).selection_after(Selection::collapsed(caret)));
    }

    let focus = &sel.focus;
    let Some(t) = doc.text_node(&focus.path) else {
        return Ok(Transaction::default());
    };
    let offset = clamp_to_char_boundary(&t.text, focus.offset);
    if let Some(ch) = t.text[..offset].chars().next_back() {
        let start = offset - ch.len_utf8();
        return Ok(Transaction::new(vec![Op::RemoveText {
            path: focus.path.clone(),
            range: start..offset,
        }])
        .selection_after(Selection::collapsed(Point::new(focus.path.clone(), start))));
    }

    // Caret at the very start of a list item: lift the item out of its list.
    if let Some(li_path) = doc.list_item_ancestor(&focus.path) {
        let first_in_item = doc
            .text_paths()
            .into_iter()
            .find(|p| p.starts_with(&li_path));
        if first_in_item.as_deref() == Some(focus.path.as_slice()) {
            return outdent_list_item(doc, sel).map(Option::unwrap_or_default);
        }
    }

    // Otherwise eat the last character of the previous leaf in the same block.
    let ordinal = doc.text_ordinal(&focus.path).unwrap_or(0);
    let Some(prev_path) = ordinal.checked_sub(1).and_then(|o| doc.text_path_at(o)) else {
        return Ok(Transaction::default());
    };
    let block = |path: &[usize]| doc.ancestor_where(path, |el| crate::core::is_block_tag(&el.tag));
    if block(&prev_path) != block(&focus.path) {
        return Ok(Transaction::default());
    }
    let Some(prev) = doc.text_node(&prev_path) else {
        return Ok(Transaction::default());
    };
    let Some(ch) = prev.text.chars().next_back() else {
        return Ok(Transaction::default());
    };
    let end = prev.text.len();
    Ok(Transaction::new(vec![Op::RemoveText {
        path: prev_path.clone(),
        range: end - ch.len_utf8()..end,
    }])
    .selection_after(Selection::collapsed(Point::new(prev_path, end - ch.len_utf8()))))
}

/// A run of sibling nodes acting as one text block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockRange {
    parent: Path,
    start: usize,
    end: usize,
}

fn block_of(doc: &Document, text_path: &[usize]) -> BlockRange {
    let container = doc
        .ancestor_where(text_path, |el| {
            crate::core::is_block_tag(&el.tag) && !el.is_list()
        })
        .unwrap_or_default();
    let children = doc.children_at(&container).unwrap_or(&[]);

    if let Some((&ix, parent)) = container.split_last()
        && children.iter().all(|n| !n.is_block())
    {
        return BlockRange {
            parent: parent.to_vec(),
            start: ix,
            end: ix + 1,
        };
    }

    let child_ix = text_path.get(container.len()).copied().unwrap_or(0);
    let mut start = child_ix;
    while start > 0 && !children[start - 1].is_block() {
        start -= 1;
    }
    let mut end = (child_ix + 1).min(children.len());
    while end < children.len() && !children[end].is_block() {
        end += 1;
    }
    BlockRange {
        parent: container,
        start,
        end,
    }
}

fn list_item(children: Vec<Node>) -> Node {
    Node::Element(ElementNode {
        tag: "li".to_string(),
        attrs: Attrs::default(),
        children,
    })
}

fn list_node(tag: &str, attrs: Attrs, children: Vec<Node>) -> Node {
    Node::Element(ElementNode {
        tag: tag.to_string(),
        attrs,
        children,
    })
}

/// Turns sibling blocks into list items, merging lists already in the range.
fn items_from_blocks(nodes: &[Node]) -> Vec<Node> {
    fn flush(run: &mut Vec<Node>, items: &mut Vec<Node>, carry: &mut Vec<Node>) {
        if run.is_empty() {
            return;
        }
        if run.iter().all(is_whitespace_text) {
            match items.last_mut() {
                Some(Node::Element(last)) => last.children.append(run),
                _ => carry.append(run),
            }
            return;
        }
        let mut children = std::mem::take(carry);
        children.append(run);
        items.push(list_item(children));
    }

    let mut items: Vec<Node> = Vec::new();
    let mut run: Vec<Node> = Vec::new();
    let mut carry: Vec<Node> = Vec::new();
    for node in nodes {
        if !node.is_block() {
            run.push(node.clone());
            continue;
        }
        flush(&mut run, &mut items, &mut carry);
        match node {
            Node::Element(el) if el.is_list() => {
                for child in &el.children {
                    match child {
                        Node::Element(li) if li.tag == "li" => items.push(child.clone()),
                        Node::Element(_) | Node::Void(_) => items.push(list_item(vec![child.clone()])),
                        Node::Text(_) => match items.last_mut() {
                            Some(Node::Element(last)) => last.children.push(child.clone()),
                            _ => carry.push(child.clone()),
                        },
                    }
                }
            }
            Node::Element(el) if matches!(el.tag.as_str(), "p" | "div") => {
                let mut children = std::mem::take(&mut carry);
                children.extend(el.children.iter().cloned());
                items.push(list_item(children));
            }
            _ => {
                let mut children = std::mem::take(&mut carry);
                children.push(node.clone());
                items.push(list_item(children));
            }
        }
    }
    flush(&mut run, &mut items, &mut carry);
    if !carry.is_empty() {
        items.push(list_item(carry));
    }
    items
}

/// Groups list-item content into paragraphs, passing nested blocks through.
fn blocks_from_item(children: &[Node]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut run: Vec<Node> = Vec::new();
    for node in children {
        if node.is_block() {
            if !run.is_empty() {
                out.push(Node::element("p", std::mem::take(&mut run)));
            }
            out.push(node.clone());
        } else {
            run.push(node.clone());
        }
    }
    if !run.is_empty() || out.is_empty() {
        out.push(Node::element("p", run));
    }
    out
}

pub fn toggle_unordered_list(doc: &Document, sel: &Selection) -> Result<Transaction, String> {
    if doc.text_paths().is_empty() {
        let path = vec![doc.children.len()];
        let caret = Point::new(vec![doc.children.len(), 0, 0], 0);
        return Ok(Transaction::new(vec![Op::InsertNode {
            path,
            node: list_node("ul", Attrs::default(), vec![Node::list_item("")]),
        }])
        .selection_after(Selection::collapsed(caret))
        .source("command:list.toggle"));
    }
    if !doc.is_text_point(&sel.focus) {
        return Err("Selection is not in a text node".into());
    }

    if let Some(li_path) = doc.list_item_ancestor(&sel.focus.path) {
        let list_path = &li_path[..li_path.len() - 1];
        let Some(list) = doc.element(list_path) else {
            return Err("List item has no list parent".into());
        };
        if list.tag != "ul" {
            let mut converted = list.clone();
            converted.tag = "ul".to_string();
            return Ok(Transaction::new(vec![
                Op::RemoveNode {
                    path: list_path.to_vec(),
                },
                Op::InsertNode {
                    path: list_path.to_vec(),
                    node: Node::Element(converted),
                },
            ])
            .selection_after(sel.clone())
            .source("command:list.toggle"));
        }
        return unlist_item(doc, sel, &li_path);
    }

    wrap_in_list(doc, sel)
}

fn wrap_in_list(doc: &Document, sel: &Selection) -> Result<Transaction, String> {
    let (start, end) = sel.ordered();
    let start_block = block_of(doc, &start.path);
    let end_block = block_of(doc, &end.path);
    let range = if start_block.parent == end_block.parent {
        BlockRange {
            parent: start_block.parent.clone(),
            start: start_block.start.min(end_block.start),
            end: start_block.end.max(end_block.end),
        }
    } else {
        block_of(doc, &sel.focus.path)
    };

    let Some(siblings) = doc.children_at(&range.parent) else {
        return Err("Block parent not found".into());
    };
    let items = items_from_blocks(&siblings[range.start..range.end]);

    let mut ops: Vec<Op> = (range.start..range.end)
        .rev()
        .map(|ix| Op::RemoveNode {
            path: child_path(&range.parent, ix),
        })
        .collect();
    ops.push(Op::InsertNode {
        path: child_path(&range.parent, range.start),
        node: list_node("ul", Attrs::default(), items),
    });

    let next = preview_ops(doc, &ops)?;
    Ok(Transaction::new(ops)
        .selection_after(remap_selection(doc, &next, sel))
        .source("command:list.toggle"))
}

/// Lifts one item out of its list: the list splits around it and the item
/// becomes paragraphs (or an item of the enclosing list when lists nest
/// directly).
fn unlist_item(doc: &Document, sel: &Selection, li_path: &[usize]) -> Result<Transaction, String> {
    let (Some((&k, list_path)), Some(li)) = (li_path.split_last(), doc.element(li_path)) else {
        return Err("List item not found".into());
    };
    let Some(list) = doc.element(list_path) else {
        return Err("List not found".into());
    };
    let Some((&list_ix, parent_path)) = list_path.split_last() else {
        return Err("List has no parent".into());
    };
    let parent_is_list = doc.element(parent_path).is_some_and(ElementNode::is_list);

    let before = &list.children[..k];
    let after = &list.children[k + 1..];
    let mut replacement = Vec::new();
    if before.iter().any(|n| !is_whitespace_text(n)) {
        replacement.push(list_node(&list.tag, list.attrs.clone(), before.to_vec()));
    } else {
        replacement.extend(before.iter().cloned());
    }
    if parent_is_list {
        replacement.push(Node::Element(li.clone()));
    } else {
        replacement.extend(blocks_from_item(&li.children));
    }
    if after.iter().any(|n| !is_whitespace_text(n)) {
        replacement.push(list_node(&list.tag, list.attrs.clone(), after.to_vec()));
    } else {
        replacement.extend(after.iter().cloned());
    }

    let mut ops = vec![Op::RemoveNode {
        path: list_path.to_vec(),
    }];
    for (i, node) in replacement.into_iter().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(parent_path, list_ix + i),
            node,
        });
    }

    let next = preview_ops(doc, &ops)?;
    Ok(Transaction::new(ops)
        .selection_after(remap_selection(doc, &next, sel))
        .source("command:list.unwrap"))
}

fn moved_item_selection(
    doc: &Document,
    next: &Document,
    sel: &Selection,
    from: &[usize],
    to: &[usize],
) -> Selection {
    let map = |point: &Point| {
        relocate(point, from, to).or_else(|| remap_point(doc, next, point))
    };
    match (map(&sel.anchor), map(&sel.focus)) {
        (Some(anchor), Some(focus)) => Selection { anchor, focus },
        _ => next.normalize_selection(sel),
    }
}

/// Nests the focused list item under its previous sibling. `Ok(None)` when
/// the selection is not inside a list.
pub fn indent_list_item(doc: &Document, sel: &Selection) -> Result<Option<Transaction>, String> {
    let Some(li_path) = doc.list_item_ancestor(&sel.focus.path) else {
        return Ok(None);
    };
    let Some((&k, list_path)) = li_path.split_last() else {
        return Ok(None);
    };
    let Some(list) = doc.element(list_path) else {
        return Ok(None);
    };
    let item = list.children[k].clone();

    let prev = (0..k)
        .rev()
        .find_map(|i| list.children[i].as_element().map(|el| (i, el)));

    let mut ops = vec![Op::RemoveNode {
        path: li_path.clone(),
    }];
    let new_li_path = match prev {
        Some((i, prev)) if prev.tag == "li" => {
            let prev_path = child_path(list_path, i);
            let trailing = prev
                .children
                .iter()
                .enumerate()
                .rev()
                .find(|(_, n)| !is_whitespace_text(n));
            match trailing {
                Some((j, Node::Element(sub))) if sub.tag == list.tag => {
                    let path = child_path(&child_path(&prev_path, j), sub.children.len());
                    ops.push(Op::InsertNode {
                        path: path.clone(),
                        node: item,
                    });
                    path
                }
                _ => {
                    let sub_path = child_path(&prev_path, prev.children.len());
                    ops.push(Op::InsertNode {
                        path: sub_path.clone(),
                        node: list_node(&list.tag, Attrs::default(), vec![item]),
                    });
                    child_path(&sub_path, 0)
                }
            }
        }
        Some((i, prev)) if prev.is_list() => {
            let path = child_path(&child_path(list_path, i), prev.children.len());
            ops.push(Op::InsertNode {
                path: path.clone(),
                node: item,
            });
            path
        }
        _ => {
            ops.push(Op::InsertNode {
                path: li_path.clone(),
                node: list_node(&list.tag, Attrs::default(), vec![item]),
            });
            child_path(&li_path, 0)
        }
    };

    let next = preview_ops(doc, &ops)?;
    let selection_after = moved_item_selection(doc, &next, sel, &li_path, &new_li_path);
    Ok(Some(
        Transaction::new(ops)
            .selection_after(selection_after)
            .source("command:list.indent"),
    ))
}

/// Moves the focused list item one level up. Items that followed it become
/// its own sub-list so document order is preserved. A top-level item turns
/// back into paragraphs.
pub fn outdent_list_item(doc: &Document, sel: &Selection) -> Result<Option<Transaction>, String> {
    let Some(li_path) = doc.list_item_ancestor(&sel.focus.path) else {
        return Ok(None);
    };
    let Some((&k, list_path)) = li_path.split_last() else {
        return Ok(None);
    };
    let Some(list) = doc.element(list_path) else {
        return Ok(None);
    };
    let Some(Node::Element(li)) = list.children.get(k) else {
        return Ok(None);
    };
    let Some((&list_ix, parent_path)) = list_path.split_last() else {
        return Ok(None);
    };

    let target = match doc.element(parent_path) {
        Some(parent) if parent.tag == "li" => match parent_path.split_last() {
            Some((&p_ix, grand)) if doc.element(grand).is_some_and(ElementNode::is_list) => {
                Some(child_path(grand, p_ix + 1))
            }
            _ => None,
        },
        Some(parent) if parent.is_list() => Some(child_path(parent_path, list_ix + 1)),
        _ => None,
    };
    let Some(new_li_path) = target else {
        return unlist_item(doc, sel, &li_path).map(Some);
    };

    let following = &list.children[k + 1..];
    let mut moved = li.clone();
    if following.iter().any(|n| !is_whitespace_text(n)) {
        moved.children.push(list_node(&list.tag, Attrs::default(), following.to_vec()));
    } else {
        moved.children.extend(following.iter().cloned());
    }

    let mut ops: Vec<Op> = (k..list.children.len())
        .rev()
        .map(|ix| Op::RemoveNode {
            path: child_path(list_path, ix),
        })
        .collect();
    ops.push(Op::InsertNode {
        path: new_li_path.clone(),
        node: Node::Element(moved),
    });

    let next = preview_ops(doc, &ops)?;
    let selection_after = moved_item_selection(doc, &next, sel, &li_path, &new_li_path);
    Ok(Some(
        Transaction::new(ops)
            .selection_after(selection_after)
            .source("command:list.outdent"),
    ))
}

fn last_text_path(nodes: &[Node], base: &[usize], first_ix: usize) -> Option<Path> {
    fn walk(node: &Node, path: &mut Path) -> bool {
        match node {
            Node::Text(_) => true,
            Node::Void(_) => false,
            Node::Element(el) => {
                for (ix, child) in el.children.iter().enumerate().rev() {
                    path.push(ix);
                    if walk(child, path) {
                        return true;
                    }
                    path.pop();
                }
                false
            }
        }
    }

    for (i, node) in nodes.iter().enumerate().rev() {
        let mut path = child_path(base, first_ix + i);
        if walk(node, &mut path) {
            return Some(path);
        }
    }
    None
}

/// Splices a parsed fragment in at the caret. Inline fragments split the
/// focused text leaf; fragments with blocks go after the focused block (or
/// after the outermost list when the caret is inside one).
pub fn insert_fragment(
    doc: &Document,
    sel: &Selection,
    fragment: &Document,
) -> Result<Transaction, String> {
    if fragment.children.is_empty() {
        return Ok(Transaction::default());
    }

    let (mut ops, caret, base) = if sel.is_collapsed() {
        (Vec::new(), sel.focus.clone(), doc.clone())
    } else {
        let (ops, caret) = remove_range(doc, sel)?;
        let base = preview_ops(doc, &ops)?;
        (ops, caret, base)
    };

    let Some(t) = base.text_node(&caret.path) else {
        return Err("Selection is not in a text node".into());
    };

    if fragment.children.iter().all(|n| !n.is_block()) {
        let Some((&ix, parent)) = caret.path.split_last() else {
            return Err("Selection is not in a text node".into());
        };
        let offset = clamp_to_char_boundary(&t.text, caret.offset);
        let mut pieces = vec![Node::Text(TextNode {
            text: t.text[..offset].to_string(),
            marks: t.marks.clone(),
        })];
        pieces.extend(fragment.children.iter().cloned());
        pieces.push(Node::Text(TextNode {
            text: t.text[offset..].to_string(),
            marks: t.marks.clone(),
        }));
        let caret_path = child_path(parent, ix + pieces.len() - 1);

        ops.push(Op::RemoveNode {
            path: caret.path.clone(),
        });
        for (k, piece) in pieces.into_iter().enumerate() {
            ops.push(Op::InsertNode {
                path: child_path(parent, ix + k),
                node: piece,
            });
        }
        return Ok(Transaction::new(ops)
            .selection_after(Selection::collapsed(Point::new(caret_path, 0)))
            .source("command:insert_html"));
    }

    let (parent, insert_at) = {
        let mut outer = None;
        let mut cursor = caret.path.clone();
        while let Some(list) = base.list_ancestor(&cursor) {
            cursor = list.clone();
            outer = Some(list);
        }
        match outer.as_ref().and_then(|p| p.split_last()) {
            Some((&ix, parent)) => (parent.to_vec(), ix + 1),
            None => {
                let block = block_of(&base, &caret.path);
                (block.parent, block.end)
            }
        }
    };

    for (i, node) in fragment.children.iter().cloned().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(&parent, insert_at + i),
            node,
        });
    }
    let selection_after = last_text_path(&fragment.children, &parent, insert_at)
        .and_then(|path| {
            let next = preview_ops(doc, &ops).ok()?;
            let len = next.text_node(&path)?.text.len();
            Some(Selection::collapsed(Point::new(path, len)))
        })
        .unwrap_or_else(|| Selection::collapsed(caret));
    Ok(Transaction::new(ops)
        .selection_after(selection_after)
        .source("command:insert_html"))
}
