//! Element builder.
//!
//! [`el`] starts an [`ElementBuilder`]; chained calls fill in the element
//! and [`ElementBuilder::build`] seals it into a [`Node`]. Errors (a bad
//! child value, mixed style kinds) are held until `build`, so render code
//! stays a single expression and a nested builder's error surfaces through
//! its parent.

use std::rc::Rc;

use indexmap::IndexMap;

use super::events::Event;
use super::node::{text, Element, Node, Style, Thunk};
use crate::error::{Error, Result};
use crate::host::{AttrValue, NativeId};
use crate::reactive::{Proxy, Value};

/// Start building an element. The tag is lowercased.
pub fn el(tag: &str) -> ElementBuilder {
    ElementBuilder {
        element: Element {
            tag: tag.to_ascii_lowercase(),
            ..Element::default()
        },
        error: None,
    }
}

/// Anything that can be appended as a child.
pub enum Child {
    Node(Node),
    Builder(ElementBuilder),
    /// Scalars become text, `Null` is skipped.
    Value(Value),
    /// Read at build time, then treated as a value.
    State(Proxy),
    Empty,
}

/// Convert a store value into a child node.
///
/// Strings, numbers and booleans become text nodes and `Null` yields no
/// node. Containers, functions and references cannot be rendered.
pub fn value_child(value: &Value) -> Result<Option<Node>> {
    match value {
        Value::Null => Ok(None),
        other => other
            .display_text()
            .map(|s| Some(text(s)))
            .ok_or(Error::BadChild { kind: other.kind() }),
    }
}

impl Child {
    fn into_node(self) -> Result<Option<Node>> {
        match self {
            Child::Node(node) => Ok(Some(node)),
            Child::Builder(builder) => builder.build().map(Some),
            Child::Value(value) => value_child(&value),
            Child::State(proxy) => value_child(&proxy.get()?),
            Child::Empty => Ok(None),
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<Option<Node>> for Child {
    fn from(node: Option<Node>) -> Self {
        node.map_or(Child::Empty, Child::Node)
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Child::Builder(builder)
    }
}

impl From<Thunk> for Child {
    fn from(thunk: Thunk) -> Self {
        Child::Node(thunk.into())
    }
}

impl From<Value> for Child {
    fn from(value: Value) -> Self {
        Child::Value(value)
    }
}

impl From<Proxy> for Child {
    fn from(proxy: Proxy) -> Self {
        Child::State(proxy)
    }
}

impl From<&Proxy> for Child {
    fn from(proxy: &Proxy) -> Self {
        Child::State(proxy.clone())
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Node(text(s))
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Node(text(s))
    }
}

impl From<f64> for Child {
    fn from(n: f64) -> Self {
        Child::Value(Value::from(n))
    }
}

impl From<i32> for Child {
    fn from(n: i32) -> Self {
        Child::Value(Value::from(n))
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Child::Value(Value::from(b))
    }
}

/// Chained element construction.
pub struct ElementBuilder {
    element: Element,
    error: Option<Error>,
}

impl ElementBuilder {
    /// Apply a `#id.class.class` selector. Parts are a `#` or `.` followed
    /// by a letter and then letters, digits, `_`, `:` or `-`; anything else
    /// is skipped.
    pub fn selector(mut self, selector: &str) -> Self {
        for (sigil, name) in selector_parts(selector) {
            if sigil == '#' {
                self.element.id = Some(name.to_string());
            } else {
                self.element.classes.insert(name.to_string(), true);
            }
        }
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.element.id = Some(id.into());
        self
    }

    /// Turn on every whitespace-separated class in `names`.
    pub fn class(mut self, names: &str) -> Self {
        for name in names.split_whitespace() {
            self.element.classes.insert(name.to_string(), true);
        }
        self
    }

    /// Set one class flag. A `false` flag removes the class on patch.
    pub fn class_flag(mut self, name: impl Into<String>, on: bool) -> Self {
        self.element.classes.insert(name.into(), on);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.element.attributes.insert(name.into(), value.into());
        self
    }

    /// Append raw CSS text. Cannot be combined with [`style_prop`](Self::style_prop).
    pub fn style(mut self, css: &str) -> Self {
        let style = self
            .element
            .style
            .get_or_insert_with(|| Style::Text(String::new()));
        match style {
            Style::Text(existing) => existing.push_str(css),
            Style::Map(_) => self.mixed_style(),
        }
        self
    }

    /// Set one style property. Cannot be combined with [`style`](Self::style).
    pub fn style_prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let style = self
            .element
            .style
            .get_or_insert_with(|| Style::Map(IndexMap::new()));
        match style {
            Style::Map(props) => {
                props.insert(name.into(), value.into());
            }
            Style::Text(_) => self.mixed_style(),
        }
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match child.into().into_node() {
            Ok(Some(node)) => self.element.children.push(node),
            Ok(None) => {}
            Err(err) => self.fail(err),
        }
        self
    }

    pub fn children<I, C>(self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        children.into_iter().fold(self, |builder, child| builder.child(child))
    }

    /// Append a text child.
    pub fn text(self, content: impl Into<String>) -> Self {
        self.child(text(content))
    }

    /// Raw markup. When set, the element's children are not rendered and
    /// the element is never patched in place.
    pub fn inner_markup(mut self, markup: impl Into<String>) -> Self {
        self.element.inner_markup = Some(markup.into());
        self
    }

    /// Handle a native event. `name` is `type`, `type:subtype` or
    /// `type$subtype`; distinct subtypes can share one event type.
    pub fn on<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Event) -> Option<Value> + 'static,
    {
        self.element.events.insert(name.into(), Rc::new(handler));
        self
    }

    /// Run after the element is realized, with its native handle.
    pub fn on_created<F>(mut self, hook: F) -> Self
    where
        F: Fn(NativeId) + 'static,
    {
        self.element.created.push(Rc::new(hook));
        self
    }

    /// Run after the element is patched, with its native handle.
    pub fn on_patched<F>(mut self, hook: F) -> Self
    where
        F: Fn(NativeId) + 'static,
    {
        self.element.patched.push(Rc::new(hook));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.element.key = Some(key.into());
        self
    }

    /// Seal the element, or return the first error recorded while building.
    pub fn build(self) -> Result<Node> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut element = self.element;
        if element.has_markup() {
            element.children.clear();
        }
        Ok(Node::Element(Rc::new(element)))
    }

    fn mixed_style(&mut self) {
        let tag = self.element.tag.clone();
        self.fail(Error::MixedStyle { tag });
    }

    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

fn selector_parts(selector: &str) -> Vec<(char, &str)> {
    let is_name_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-');
    let mut parts = Vec::new();
    let mut rest = selector;
    while let Some(at) = rest.find(|c: char| c == '#' || c == '.') {
        let sigil = rest[at..].chars().next().unwrap_or('.');
        let tail = &rest[at + 1..];
        let len = match tail.chars().next() {
            Some(first) if first.is_ascii_alphabetic() => {
                tail.find(|c: char| !is_name_char(c)).unwrap_or(tail.len())
            }
            _ => 0,
        };
        if len > 0 {
            parts.push((sigil, &tail[..len]));
        }
        rest = &tail[len..];
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Store;
    use serde_json::json;

    fn element(node: Node) -> Rc<Element> {
        match node {
            Node::Element(e) => e,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn selector_sets_id_and_classes() {
        let e = element(el("DIV").selector("#main.a.b-c 1.x").build().unwrap());
        assert_eq!(e.tag(), "div");
        assert_eq!(e.id(), Some("main"));
        let classes: Vec<&str> = e.classes().keys().map(String::as_str).collect();
        assert_eq!(classes, vec!["a", "b-c", "x"]);
    }

    #[test]
    fn malformed_selector_parts_are_skipped() {
        assert_eq!(selector_parts("#1.ok."), vec![('.', "ok")]);
        assert!(selector_parts("").is_empty());
    }

    #[test]
    fn string_styles_concatenate() {
        let e = element(el("p").style("color: red;").style("margin: 0").build().unwrap());
        assert_eq!(e.style(), Some(&Style::Text("color: red;margin: 0".into())));
    }

    #[test]
    fn mixing_style_kinds_fails() {
        let err = el("p")
            .style("color: red")
            .style_prop("margin", "0")
            .build()
            .unwrap_err();
        assert_eq!(err, Error::MixedStyle { tag: "p".into() });
    }

    #[test]
    fn scalar_children_become_text() {
        let e = element(
            el("p")
                .child("a")
                .child(1)
                .child(true)
                .child(Value::Null)
                .build()
                .unwrap(),
        );
        let texts: Vec<String> = e
            .children()
            .iter()
            .map(|c| match c {
                Node::Text(t) => t.text().to_string(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(texts, vec!["a", "1", "true"]);
    }

    #[test]
    fn container_children_are_rejected_through_the_parent() {
        let store = Store::new(Value::from(json!({"list": [1, 2]})));
        let err = el("div")
            .child(el("ul").child(store.proxy("/list")))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::BadChild { .. }));
    }

    #[test]
    fn state_children_read_the_current_value() {
        let store = Store::new(Value::from(json!({"count": 3})));
        let e = element(el("span").child(&store.proxy("/count")).build().unwrap());
        match &e.children()[0] {
            Node::Text(t) => assert_eq!(t.text(), "3"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn markup_drops_children() {
        let e = element(el("div").text("x").inner_markup("<i>y</i>").build().unwrap());
        assert!(e.children().is_empty());
        assert_eq!(e.inner_markup(), Some("<i>y</i>"));
    }
}
