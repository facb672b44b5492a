//! Typed node tree for the widget's isolated subtree.
//!
//! Text can only enter the tree as [`Sanitized`], so tenant- or user-supplied
//! strings cannot inject markup into the host page. Attribute values are
//! quote-escaped on serialisation.

use std::fmt::Write as _;

/// Text that has had `&`, `<` and `>` escaped. The unescaped form is kept
/// for text-content queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    raw: String,
    escaped: String,
}

impl Sanitized {
    /// Escaped form, safe to emit as markup.
    pub fn as_str(&self) -> &str {
        &self.escaped
    }

    /// The text as it was supplied.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

pub fn sanitize(raw: &str) -> Sanitized {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    Sanitized {
        raw: raw.to_string(),
        escaped: out,
    }
}

fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// Keeps only characters that can appear in a colour declaration.
pub fn css_color(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || "#(),.% -".contains(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Strips characters that could terminate a `url("…")` token or the rule.
pub fn css_url(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() && !c.is_whitespace() && !"\"'()\\<>;{}".contains(*c))
        .collect()
}

/// Stylesheet body emitted into the host's `<style>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet(String);

impl Stylesheet {
    /// Callers must only interpolate values filtered through [`css_color`]
    /// or [`css_url`].
    pub(crate) fn new(css: String) -> Self {
        Self(css)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(Sanitized),
    Style(Stylesheet),
}

impl Node {
    pub fn text(raw: &str) -> Self {
        Node::Text(sanitize(raw))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.children.iter().for_each(|c| c.collect_text(out)),
            Node::Text(text) => out.push_str(text.raw()),
            Node::Style(_) => {}
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text.as_str()),
            Node::Style(css) => {
                out.push_str("<style>");
                out.push_str(css.as_str());
                out.push_str("</style>");
            }
            Node::Element(el) => el.write_html(out),
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

const VOID_TAGS: &[&str] = &["img", "input", "br"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Adds a boolean attribute such as `hidden` when `on` is set.
    pub fn flag(self, name: &'static str, on: bool) -> Self {
        if on { self.attr(name, "") } else { self }
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn text(self, raw: &str) -> Self {
        self.child(Node::text(raw))
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_some()
    }

    pub fn set_attr(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .map(|v| v.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.get_attr("id") == Some(id) {
            return Some(self);
        }
        self.children
            .iter()
            .filter_map(Node::as_element)
            .find_map(|el| el.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.get_attr("id") == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(el) => el.find_by_id_mut(id),
            _ => None,
        })
    }

    /// Depth-first list of descendants (and self) carrying `class`.
    pub fn find_by_class(&self, class: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_class(class, &mut found);
        found
    }

    fn collect_class<'a>(&'a self, class: &str, found: &mut Vec<&'a Element>) {
        if self.has_class(class) {
            found.push(self);
        }
        for el in self.children.iter().filter_map(Node::as_element) {
            el.collect_class(class, found);
        }
    }

    pub fn count_elements(&self) -> usize {
        1 + self
            .children
            .iter()
            .filter_map(Node::as_element)
            .map(Element::count_elements)
            .sum::<usize>()
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        for (name, value) in &self.attrs {
            if value.is_empty() && *name != "value" && *name != "alt" {
                let _ = write!(out, " {name}");
            } else {
                let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
            }
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag) {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}
