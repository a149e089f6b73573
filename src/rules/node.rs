//! Expression tree for emitted rules
//!
//! Rendering uses four spaces per nesting level, one argument or list item per
//! line and a trailing comma after each, so the text of a tree never depends
//! on anything but the tree itself.

use std::fmt::Write;

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Call(Call),
    Str(String),
    List(Vec<Node>),
}

/// `label(key = value, ...)` with arguments in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub label: String,
    pub args: Vec<(String, Node)>,
}

impl Call {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: Node) -> Self {
        self.args.push((key.into(), value));
        self
    }

    /// Adds the argument only when the list is non-empty.
    pub fn list_arg<S: AsRef<str>>(self, key: &str, items: &[S]) -> Self {
        if items.is_empty() {
            return self;
        }
        self.arg(key, Node::strings(items))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        out.push_str(&self.label);
        out.push_str("(\n");
        for (key, value) in &self.args {
            indent(out, depth + 1);
            let _ = write!(out, "{} = ", key);
            value.render_into(out, depth + 1);
            out.push_str(",\n");
        }
        indent(out, depth);
        out.push(')');
    }
}

impl Node {
    pub fn string(s: impl Into<String>) -> Self {
        Node::Str(s.into())
    }

    pub fn strings<S: AsRef<str>>(items: &[S]) -> Self {
        Node::List(items.iter().map(|s| Node::string(s.as_ref())).collect())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        match self {
            Node::Call(call) => call.render_into(out, depth),
            Node::Str(s) => out.push_str(&quote(s)),
            Node::List(items) if items.is_empty() => out.push_str("[]"),
            Node::List(items) => {
                out.push_str("[\n");
                for item in items {
                    indent(out, depth + 1);
                    item.render_into(out, depth + 1);
                    out.push_str(",\n");
                }
                indent(out, depth);
                out.push(']');
            }
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Starlark double-quoted string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
