//! Markup codec: HTML fragment <-> [`Document`].
//!
//! Inline formatting tags (`b`, `strong`, `i`, `em`, `u`, colored `span`/`font`)
//! are folded into [`Marks`] on text leaves; every other tag becomes an
//! element or void node. Serialization writes marks back in a fixed order so
//! that `to_markup(parse_markup(to_markup(doc)))` is stable.

use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::core::{
    Attrs, Document, ElementNode, Marks, Node, TextNode, VoidNode, is_block_tag, is_list_tag,
    is_void_tag,
};

#[derive(Debug)]
enum MarkupToken {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
    Text(String),
}

struct MarkupSink {
    tokens: RefCell<Vec<MarkupToken>>,
}

impl TokenSink for MarkupSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => {
                let name = tag.name.to_string();
                match tag.kind {
                    TagKind::StartTag => {
                        let attrs = tag
                            .attrs
                            .iter()
                            .map(|a| (a.name.local.to_string(), a.value.to_string()))
                            .collect();
                        self.tokens.borrow_mut().push(MarkupToken::StartTag {
                            name,
                            attrs,
                            self_closing: tag.self_closing,
                        });
                    }
                    TagKind::EndTag => self.tokens.borrow_mut().push(MarkupToken::EndTag(name)),
                }
            }
            Token::CharacterTokens(s) => {
                self.tokens.borrow_mut().push(MarkupToken::Text(s.to_string()));
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

fn tokenize(markup: &str) -> Vec<MarkupToken> {
    let sink = MarkupSink {
        tokens: RefCell::new(Vec::new()),
    };
    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    let mut queue = BufferQueue::default();
    queue.push_back(StrTendril::from(markup));
    let _ = tokenizer.feed(&mut queue);
    tokenizer.end();
    tokenizer.sink.tokens.into_inner()
}

enum Frame {
    Element(ElementNode),
    Marks { tag: String, marks: Marks },
}

struct TreeBuilder {
    root: Vec<Node>,
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn current_marks(&self) -> Marks {
        let mut marks = Marks::default();
        for frame in &self.stack {
            if let Frame::Marks { marks: m, .. } = frame {
                marks.bold |= m.bold;
                marks.italic |= m.italic;
                marks.underline |= m.underline;
                if m.text_color.is_some() {
                    marks.text_color = m.text_color.clone();
                }
            }
        }
        marks
    }

    fn open_element(&self) -> Option<&ElementNode> {
        self.stack.iter().rev().find_map(|frame| match frame {
            Frame::Element(el) => Some(el),
            Frame::Marks { .. } => None,
        })
    }

    fn children_mut(&mut self) -> &mut Vec<Node> {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Element(el) = frame {
                return &mut el.children;
            }
        }
        &mut self.root
    }

    fn push_text(&mut self, text: String) {
        // Whitespace between list items carries no content.
        if text.trim().is_empty() && self.open_element().is_some_and(|el| is_list_tag(&el.tag)) {
            return;
        }
        let marks = self.current_marks();
        let children = self.children_mut();
        if let Some(Node::Text(last)) = children.last_mut()
            && last.marks == marks
        {
            last.text.push_str(&text);
            return;
        }
        children.push(Node::Text(TextNode { text, marks }));
    }

    fn push_node(&mut self, node: Node) {
        self.children_mut().push(node);
    }

    fn start_tag(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
        if let Some(marks) = marks_for_tag(&name, &attrs) {
            if !self_closing {
                self.stack.push(Frame::Marks { tag: name, marks });
            }
            return;
        }

        let attrs: Attrs = attrs.into_iter().collect();
        if is_void_tag(&name) {
            self.push_node(Node::Void(VoidNode { tag: name, attrs }));
            return;
        }

        // `<li>` and `<p>` close an open sibling of the same kind.
        if matches!(name.as_str(), "li" | "p")
            && self.open_element().is_some_and(|el| el.tag == name)
        {
            self.end_tag(&name);
        }
        if is_block_tag(&name) {
            self.close_inline_marks();
        }

        let el = ElementNode {
            tag: name,
            attrs,
            children: Vec::new(),
        };
        if self_closing {
            self.push_node(Node::Element(el));
        } else {
            self.stack.push(Frame::Element(el));
        }
    }

    /// Mark frames never span a block boundary.
    fn close_inline_marks(&mut self) {
        while matches!(self.stack.last(), Some(Frame::Marks { .. })) {
            self.stack.pop();
        }
    }

    fn end_tag(&mut self, name: &str) {
        let Some(pos) = self.stack.iter().rposition(|frame| match frame {
            Frame::Element(el) => el.tag == name,
            Frame::Marks { tag, .. } => tag == name,
        }) else {
            return;
        };
        while self.stack.len() > pos {
            self.pop_frame();
        }
    }

    fn pop_frame(&mut self) {
        match self.stack.pop() {
            Some(Frame::Element(el)) => self.push_node(Node::Element(el)),
            Some(Frame::Marks { .. }) | None => {}
        }
    }

    fn finish(mut self) -> Document {
        while !self.stack.is_empty() {
            self.pop_frame();
        }
        Document::new(self.root)
    }
}

fn marks_for_tag(name: &str, attrs: &[(String, String)]) -> Option<Marks> {
    let attr = |key: &str| {
        attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };
    let mut marks = Marks::default();
    match name {
        "b" | "strong" => marks.bold = true,
        "i" | "em" => marks.italic = true,
        "u" | "ins" => marks.underline = true,
        "font" => marks.text_color = attr("color").map(str::to_string),
        "span" => {}
        _ => return None,
    }
    if let Some(style) = attr("style") {
        apply_inline_style(&mut marks, style);
    }
    Some(marks)
}

fn apply_inline_style(marks: &mut Marks, style: &str) {
    for decl in style.split(';') {
        let Some((key, value)) = decl.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "color" if !value.is_empty() => marks.text_color = Some(value.to_string()),
            "font-weight" => {
                marks.bold |= value == "bold"
                    || value == "bolder"
                    || value.parse::<u32>().is_ok_and(|w| w >= 600);
            }
            "font-style" => marks.italic |= value == "italic",
            "text-decoration" | "text-decoration-line" => {
                marks.underline |= value.contains("underline");
            }
            _ => {}
        }
    }
}

pub fn parse_markup(markup: &str) -> Document {
    let mut builder = TreeBuilder {
        root: Vec::new(),
        stack: Vec::new(),
    };
    for token in tokenize(markup) {
        match token {
            MarkupToken::StartTag {
                name,
                attrs,
                self_closing,
            } => builder.start_tag(name, attrs, self_closing),
            MarkupToken::EndTag(name) => builder.end_tag(&name),
            MarkupToken::Text(text) => builder.push_text(text),
        }
    }
    builder.finish()
}

pub fn to_markup(doc: &Document) -> String {
    let mut out = String::new();
    write_nodes(&doc.children, &mut out);
    out
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => write_text(t, out),
            Node::Void(v) => {
                out.push('<');
                out.push_str(&v.tag);
                write_attrs(&v.attrs, out);
                out.push('>');
            }
            Node::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                write_attrs(&el.attrs, out);
                out.push('>');
                write_nodes(&el.children, out);
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

fn write_attrs(attrs: &Attrs, out: &mut String) {
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }
}

fn write_text(text: &TextNode, out: &mut String) {
    if text.text.is_empty() {
        return;
    }
    let marks = &text.marks;
    if let Some(color) = &marks.text_color {
        out.push_str("<span style=\"color: ");
        escape_into(color, true, out);
        out.push_str(";\">");
    }
    if marks.bold {
        out.push_str("<strong>");
    }
    if marks.italic {
        out.push_str("<em>");
    }
    if marks.underline {
        out.push_str("<u>");
    }
    escape_into(&text.text, false, out);
    if marks.underline {
        out.push_str("</u>");
    }
    if marks.italic {
        out.push_str("</em>");
    }
    if marks.bold {
        out.push_str("</strong>");
    }
    if marks.text_color.is_some() {
        out.push_str("</span>");
    }
}

fn escape_into(s: &str, attr: bool, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Text as the user sees it: block boundaries and `<br>` become newlines.
pub fn plain_text(doc: &Document) -> String {
    fn ensure_newline(out: &mut String) {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }

    fn walk(nodes: &[Node], out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(t) => out.push_str(&t.text),
                Node::Void(v) if v.tag == "br" || v.tag == "hr" => out.push('\n'),
                Node::Void(_) => {}
                Node::Element(el) => {
                    let block = is_block_tag(&el.tag);
                    if block {
                        ensure_newline(out);
                    }
                    walk(&el.children, out);
                    if block {
                        ensure_newline(out);
                    }
                }
            }
        }
    }

    let mut out = String::new();
    walk(&doc.children, &mut out);
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out
}

/// Whether a parsed fragment holds nothing worth inserting.
pub fn is_blank(doc: &Document) -> bool {
    fn has_content(nodes: &[Node]) -> bool {
        nodes.iter().any(|node| match node {
            Node::Text(t) => !t.text.trim().is_empty(),
            Node::Void(_) => true,
            Node::Element(el) => {
                is_list_tag(&el.tag)
                    || el.tag == "li"
                    || !el.attrs.is_empty()
                    || has_content(&el.children)
            }
        })
    }
    !has_content(&doc.children)
}
