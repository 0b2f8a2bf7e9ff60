//! Shared mutable document model backing the checks.
//!
//! The "live document body" is a `Document`: a cheaply clonable handle to a
//! shared element tree. Fragments are parsed with `scraper` and written back
//! out with a deterministic serializer so a capture/restore cycle is
//! byte-stable. Every mutating operation emits `MutationRecord`s to all
//! active subscriptions (see the `observer` module).

use crate::error::{Error, Result};
use crate::observer::{self, MutationRecord, MutationStream, Subscription};
use scraper::Html;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Elements that never carry children and are serialized without an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

/// A node in the document body: an element or a run of text
#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Element(Element),
    Text(String),
}

/// An element node with sorted attributes and owned children
///
/// Attributes are kept sorted by name so serialization is deterministic and
/// a capture/restore round trip preserves the markup exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    children: Vec<DomNode>,
}

impl Element {
    /// Create an empty element with the given tag name
    pub fn new(tag: &str) -> Self {
        Element {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Tag name, lowercased
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Whether the attribute is present at all (possibly empty)
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Set or replace an attribute
    pub fn set_attr(&mut self, name: &str, value: &str) {
        self.attrs.insert(name.to_string(), value.to_string());
    }

    /// Child nodes in document order
    pub fn children(&self) -> &[DomNode] {
        &self.children
    }

    /// Direct element children in document order
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            DomNode::Element(el) => Some(el),
            DomNode::Text(_) => None,
        })
    }

    /// Every element descendant in document order, self excluded
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect_elements(&self.children, &mut out);
        out
    }

    /// Concatenated text of this element and its descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// A short selector hint for reporting: tag plus `#id` or `.class` parts
    pub fn selector(&self) -> String {
        let mut sel = self.tag.clone();
        if let Some(id) = self.attr("id") {
            sel.push('#');
            sel.push_str(id);
        } else if let Some(classes) = self.attr("class") {
            for class in classes.split_whitespace() {
                sel.push('.');
                sel.push_str(class);
            }
        }
        sel
    }

    /// Serialize this element (and subtree) back to HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn collect_elements<'a>(nodes: &'a [DomNode], out: &mut Vec<&'a Element>) {
    for node in nodes {
        if let DomNode::Element(el) = node {
            out.push(el);
            collect_elements(&el.children, out);
        }
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(text) => out.push_str(text),
            DomNode::Element(el) => collect_text(&el.children, out),
        }
    }
}

fn write_node(node: &DomNode, out: &mut String) {
    match node {
        DomNode::Text(text) => out.push_str(&escape_text(text)),
        DomNode::Element(el) => write_element(el, out),
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&el.tag.as_str()) {
        return;
    }
    for child in &el.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;")
}

/// Parse an HTML fragment into owned body nodes
pub fn parse_fragment(html: &str) -> Vec<DomNode> {
    let fragment = Html::parse_fragment(html);
    let root = fragment.root_element();
    let mut nodes = Vec::new();
    for child in root.children() {
        if let Some(el) = scraper::ElementRef::wrap(child) {
            nodes.push(DomNode::Element(convert_element(el)));
        } else if let scraper::Node::Text(text) = child.value() {
            nodes.push(DomNode::Text(text.text.to_string()));
        }
    }
    nodes
}

fn convert_element(el_ref: scraper::ElementRef<'_>) -> Element {
    let mut attrs = BTreeMap::new();
    for (name, value) in el_ref.value().attrs() {
        attrs.insert(name.to_string(), value.to_string());
    }
    let mut children = Vec::new();
    for child in el_ref.children() {
        if let Some(child_el) = scraper::ElementRef::wrap(child) {
            children.push(DomNode::Element(convert_element(child_el)));
        } else if let scraper::Node::Text(text) = child.value() {
            children.push(DomNode::Text(text.text.to_string()));
        }
    }
    Element {
        tag: el_ref.value().name().to_ascii_lowercase(),
        attrs,
        children,
    }
}

struct DocumentInner {
    body: Vec<DomNode>,
    subscribers: Vec<(u64, mpsc::UnboundedSender<MutationRecord>)>,
    next_subscriber: u64,
}

/// A clonable handle to the shared document body
///
/// All clones refer to the same body tree; mutations through any handle are
/// visible to every other handle and delivered to every active subscription.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<DocumentInner>>,
}

impl Document {
    /// Create a document with an empty body
    pub fn new() -> Self {
        Document {
            inner: Arc::new(Mutex::new(DocumentInner {
                body: Vec::new(),
                subscribers: Vec::new(),
                next_subscriber: 0,
            })),
        }
    }

    /// Create a document whose body holds the given markup
    pub fn from_body_html(html: &str) -> Self {
        let doc = Document::new();
        doc.set_body_html(html);
        doc
    }

    /// Serialize the current body markup
    pub fn body_html(&self) -> String {
        let inner = self.inner.lock().unwrap();
        let mut out = String::new();
        for node in &inner.body {
            write_node(node, &mut out);
        }
        out
    }

    /// Replace the entire body with new markup
    ///
    /// Emits one child-list record: everything previously in the body counts
    /// as removed, the new top-level elements as added.
    pub fn set_body_html(&self, html: &str) {
        let nodes = parse_fragment(html);
        let added = top_level_elements(&nodes);
        let mut inner = self.inner.lock().unwrap();
        let removed = inner.body.len();
        inner.body = nodes;
        emit(&mut inner, MutationRecord::ChildList { added, removed });
    }

    /// Append parsed fragment nodes to the body
    pub fn append_html(&self, html: &str) {
        let nodes = parse_fragment(html);
        let added = top_level_elements(&nodes);
        let mut inner = self.inner.lock().unwrap();
        inner.body.extend(nodes);
        emit(&mut inner, MutationRecord::ChildList { added, removed: 0 });
    }

    /// Remove everything from the body
    pub fn clear_body(&self) {
        let mut inner = self.inner.lock().unwrap();
        let removed = inner.body.len();
        if removed == 0 {
            return;
        }
        inner.body.clear();
        emit(
            &mut inner,
            MutationRecord::ChildList {
                added: Vec::new(),
                removed,
            },
        );
    }

    /// Set an attribute on the element addressed by `path`
    ///
    /// `path` indexes element children only: `[0]` is the first element child
    /// of body, `[0, 1]` that element's second element child, and so on.
    pub fn set_attribute(&self, path: &[usize], name: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let target = element_at_path_mut(&mut inner.body, path)?;
        target.set_attr(name, value);
        let record = MutationRecord::Attributes {
            target: target.selector(),
            attribute: name.to_string(),
        };
        emit(&mut inner, record);
        Ok(())
    }

    /// Replace the text content of the element addressed by `path`
    pub fn set_text(&self, path: &[usize], text: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let target = element_at_path_mut(&mut inner.body, path)?;
        target.children = vec![DomNode::Text(text.to_string())];
        let record = MutationRecord::CharacterData {
            target: target.selector(),
        };
        emit(&mut inner, record);
        Ok(())
    }

    /// Every element descendant of the body, cloned, in document order
    pub fn body_elements(&self) -> Vec<Element> {
        let inner = self.inner.lock().unwrap();
        let mut refs = Vec::new();
        collect_elements(&inner.body, &mut refs);
        refs.into_iter().cloned().collect()
    }

    /// Subscribe to mutation records for the body subtree
    ///
    /// The returned stream yields batches of records (child-list, attribute,
    /// and character-data changes, all descendants included) until
    /// `disconnect` is called for the subscription and queued records drain.
    pub fn observe(&self) -> (Subscription, MutationStream) {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        inner.subscribers.push((id, tx));
        (observer::subscription(id), observer::stream(rx))
    }

    /// Drop a subscription; its stream ends once queued records drain
    pub fn disconnect(&self, subscription: &Subscription) {
        let mut inner = self.inner.lock().unwrap();
        let id = observer::subscription_id(subscription);
        inner.subscribers.retain(|(sid, _)| *sid != id);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn top_level_elements(nodes: &[DomNode]) -> Vec<Element> {
    nodes
        .iter()
        .filter_map(|n| match n {
            DomNode::Element(el) => Some(el.clone()),
            DomNode::Text(_) => None,
        })
        .collect()
}

fn element_at_path_mut<'a>(
    nodes: &'a mut Vec<DomNode>,
    path: &[usize],
) -> Result<&'a mut Element> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| Error::Dom("empty element path".to_string()))?;
    let element = nodes
        .iter_mut()
        .filter_map(|n| match n {
            DomNode::Element(el) => Some(el),
            DomNode::Text(_) => None,
        })
        .nth(*first)
        .ok_or_else(|| Error::Dom(format!("no element at index {}", first)))?;
    if rest.is_empty() {
        Ok(element)
    } else {
        element_at_path_mut(&mut element.children, rest)
    }
}

fn emit(inner: &mut DocumentInner, record: MutationRecord) {
    inner
        .subscribers
        .retain(|(_, tx)| tx.send(record.clone()).is_ok());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_round_trips_through_serializer() {
        let doc = Document::from_body_html("<div id=\"main\"><img src=\"x.png\">text</div>");
        let html = doc.body_html();
        let again = Document::from_body_html(&html);
        assert_eq!(html, again.body_html());
    }

    #[test]
    fn body_elements_are_in_document_order() {
        let doc = Document::from_body_html("<div><span>a</span><p><b>c</b></p></div>");
        let tags: Vec<String> = doc
            .body_elements()
            .iter()
            .map(|el| el.tag().to_string())
            .collect();
        assert_eq!(tags, vec!["div", "span", "p", "b"]);
    }

    #[test]
    fn selector_prefers_id_over_classes() {
        let doc = Document::from_body_html("<img id=\"hero\" class=\"big\"><img class=\"a b\">");
        let els = doc.body_elements();
        assert_eq!(els[0].selector(), "img#hero");
        assert_eq!(els[1].selector(), "img.a.b");
    }

    #[test]
    fn set_attribute_reaches_nested_elements() {
        let doc = Document::from_body_html("<div><img></div>");
        doc.set_attribute(&[0, 0], "alt", "logo").expect("path resolves");
        assert!(doc.body_html().contains("alt=\"logo\""));
        let missing = doc.set_attribute(&[3], "alt", "x");
        assert!(missing.is_err());
    }

    #[test]
    fn clear_body_empties_markup() {
        let doc = Document::from_body_html("<p>hi</p>");
        doc.clear_body();
        assert_eq!(doc.body_html(), "");
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let doc = Document::from_body_html("<div>a<span>b</span>c</div>");
        let els = doc.body_elements();
        assert_eq!(els[0].text_content(), "abc");
    }
}
