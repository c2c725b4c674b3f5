//! In-memory document.
//!
//! An arena of native nodes that implements [`Document`] and records every
//! host call as a [`Mutation`]. Tests assert on the mutation log (an empty
//! log after a re-render means the pass was a no-op) and on the rendered
//! markup.
//!
//! Invariants:
//! - Ids are allocated sequentially starting at 1 and never reused.
//! - Mutations are logged in call order, including redundant ones.
//! - Calls with unknown ids are ignored and not logged.

use indexmap::{IndexMap, IndexSet};

use super::{AttrValue, Document, NativeId, NativeKind};

/// One recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create { node: NativeId, kind: NativeKind },
    InsertBefore { parent: NativeId, child: NativeId, before: Option<NativeId> },
    RemoveChild { parent: NativeId, child: NativeId },
    SetText { node: NativeId, text: String },
    SetAttribute { node: NativeId, name: String, value: String },
    RemoveAttribute { node: NativeId, name: String },
    SetProperty { node: NativeId, name: String, value: AttrValue },
    AddClass { node: NativeId, class: String },
    RemoveClass { node: NativeId, class: String },
    SetStyleProperty { node: NativeId, name: String, value: String },
    SetStyleText { node: NativeId, css: String },
    SetInnerMarkup { node: NativeId, markup: String },
    Listen { node: NativeId, event_type: String },
    Unlisten { node: NativeId, event_type: String },
}

#[derive(Debug)]
struct Slot {
    kind: NativeKind,
    tag: String,
    text: String,
    parent: Option<NativeId>,
    children: Vec<NativeId>,
    attributes: IndexMap<String, String>,
    properties: IndexMap<String, AttrValue>,
    classes: IndexSet<String>,
    style: IndexMap<String, String>,
    inner_markup: Option<String>,
    listeners: IndexSet<String>,
}

impl Slot {
    fn new(kind: NativeKind, tag: &str, text: &str) -> Self {
        Self {
            kind,
            tag: tag.to_ascii_lowercase(),
            text: text.to_string(),
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
            classes: IndexSet::new(),
            style: IndexMap::new(),
            inner_markup: None,
            listeners: IndexSet::new(),
        }
    }
}

/// Arena-backed [`Document`].
#[derive(Debug, Default)]
pub struct MemoryDocument {
    slots: Vec<Slot>,
    mutations: Vec<Mutation>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `<body>` holding an empty `<div>` and return the div, the
    /// usual mount point for an app. The setup is not logged.
    pub fn mount_point(&mut self) -> NativeId {
        let body = self.create_element("body");
        let root = self.create_element("div");
        self.append_child(body, root);
        self.mutations.clear();
        root
    }

    /// Number of nodes ever created.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Drain the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    pub fn clear_mutations(&mut self) {
        self.mutations.clear();
    }

    pub fn children(&self, node: NativeId) -> &[NativeId] {
        self.slot(node).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    /// Active classes in insertion order.
    pub fn classes(&self, node: NativeId) -> Vec<String> {
        self.slot(node)
            .map(|s| s.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn style_property(&self, node: NativeId, name: &str) -> Option<String> {
        self.slot(node).and_then(|s| s.style.get(name).cloned())
    }

    /// Inline style in `name: value; ...` form.
    pub fn style_text(&self, node: NativeId) -> String {
        self.slot(node)
            .map(|s| style_to_text(&s.style))
            .unwrap_or_default()
    }

    pub fn is_listening(&self, node: NativeId, event_type: &str) -> bool {
        self.slot(node)
            .map(|s| s.listeners.contains(event_type))
            .unwrap_or(false)
    }

    /// Change a live property without logging, as user input would.
    pub fn tweak_property(&mut self, node: NativeId, name: &str, value: impl Into<AttrValue>) {
        if let Some(slot) = self.slot_mut(node) {
            slot.properties.insert(name.to_string(), value.into());
        }
    }

    /// Markup of the node itself and its subtree.
    pub fn outer_markup(&self, node: NativeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    /// Markup of the node's children.
    pub fn inner_markup(&self, node: NativeId) -> String {
        let mut out = String::new();
        if let Some(slot) = self.slot(node) {
            self.write_children(slot, &mut out);
        }
        out
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn slot(&self, node: NativeId) -> Option<&Slot> {
        let index = node.raw().checked_sub(1)?;
        self.slots.get(usize::try_from(index).ok()?)
    }

    fn slot_mut(&mut self, node: NativeId) -> Option<&mut Slot> {
        let index = node.raw().checked_sub(1)?;
        self.slots.get_mut(usize::try_from(index).ok()?)
    }

    fn alloc(&mut self, slot: Slot) -> NativeId {
        let kind = slot.kind;
        self.slots.push(slot);
        let node = NativeId::from(self.slots.len() as u64);
        self.mutations.push(Mutation::Create { node, kind });
        node
    }

    fn detach(&mut self, child: NativeId) {
        let Some(parent) = self.slot(child).and_then(|s| s.parent) else {
            return;
        };
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.retain(|c| *c != child);
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = None;
        }
    }

    fn write_markup(&self, node: NativeId, out: &mut String) {
        let Some(slot) = self.slot(node) else {
            return;
        };
        match slot.kind {
            NativeKind::Text => out.push_str(&escape(&slot.text)),
            NativeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&slot.text);
                out.push_str("-->");
            }
            NativeKind::Element => {
                out.push('<');
                out.push_str(&slot.tag);
                for (name, value) in &slot.attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
                }
                if !slot.classes.is_empty() {
                    let classes: Vec<&str> = slot.classes.iter().map(String::as_str).collect();
                    out.push_str(&format!(" class=\"{}\"", escape(&classes.join(" "))));
                }
                if !slot.style.is_empty() {
                    out.push_str(&format!(" style=\"{}\"", escape(&style_to_text(&slot.style))));
                }
                out.push('>');
                self.write_children(slot, out);
                out.push_str("</");
                out.push_str(&slot.tag);
                out.push('>');
            }
        }
    }

    fn write_children(&self, slot: &Slot, out: &mut String) {
        match &slot.inner_markup {
            Some(markup) => out.push_str(markup),
            None => {
                for child in &slot.children {
                    self.write_markup(*child, out);
                }
            }
        }
    }
}

impl Document for MemoryDocument {
    fn create_element(&mut self, tag: &str) -> NativeId {
        self.alloc(Slot::new(NativeKind::Element, tag, ""))
    }

    fn create_text(&mut self, text: &str) -> NativeId {
        self.alloc(Slot::new(NativeKind::Text, "", text))
    }

    fn create_comment(&mut self, text: &str) -> NativeId {
        self.alloc(Slot::new(NativeKind::Comment, "", text))
    }

    fn kind(&self, node: NativeId) -> Option<NativeKind> {
        self.slot(node).map(|s| s.kind)
    }

    fn tag_name(&self, node: NativeId) -> Option<String> {
        self.slot(node)
            .filter(|s| s.kind == NativeKind::Element)
            .map(|s| s.tag.clone())
    }

    fn parent(&self, node: NativeId) -> Option<NativeId> {
        self.slot(node).and_then(|s| s.parent)
    }

    fn child_at(&self, parent: NativeId, index: usize) -> Option<NativeId> {
        self.slot(parent).and_then(|s| s.children.get(index).copied())
    }

    fn child_count(&self, parent: NativeId) -> usize {
        self.slot(parent).map(|s| s.children.len()).unwrap_or(0)
    }

    fn insert_before(&mut self, parent: NativeId, child: NativeId, reference: Option<NativeId>) {
        if self.slot(parent).is_none() || self.slot(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(slot) = self.slot_mut(parent) {
            let at = reference
                .and_then(|r| slot.children.iter().position(|c| *c == r))
                .unwrap_or(slot.children.len());
            slot.children.insert(at, child);
            slot.inner_markup = None;
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
        self.mutations.push(Mutation::InsertBefore {
            parent,
            child,
            before: reference,
        });
    }

    fn remove_child(&mut self, parent: NativeId, child: NativeId) {
        if self.parent(child) != Some(parent) {
            return;
        }
        self.detach(child);
        self.mutations.push(Mutation::RemoveChild { parent, child });
    }

    fn text(&self, node: NativeId) -> Option<String> {
        self.slot(node)
            .filter(|s| s.kind != NativeKind::Element)
            .map(|s| s.text.clone())
    }

    fn set_text(&mut self, node: NativeId, text: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.text = text.to_string();
            self.mutations.push(Mutation::SetText {
                node,
                text: text.to_string(),
            });
        }
    }

    fn attribute(&self, node: NativeId, name: &str) -> Option<String> {
        self.slot(node).and_then(|s| s.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, node: NativeId, name: &str, value: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.attributes.insert(name.to_string(), value.to_string());
            self.mutations.push(Mutation::SetAttribute {
                node,
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    fn remove_attribute(&mut self, node: NativeId, name: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.attributes.shift_remove(name);
            self.mutations.push(Mutation::RemoveAttribute {
                node,
                name: name.to_string(),
            });
        }
    }

    fn property(&self, node: NativeId, name: &str) -> Option<AttrValue> {
        self.slot(node).and_then(|s| s.properties.get(name).cloned())
    }

    fn set_property(&mut self, node: NativeId, name: &str, value: AttrValue) {
        if let Some(slot) = self.slot_mut(node) {
            slot.properties.insert(name.to_string(), value.clone());
            self.mutations.push(Mutation::SetProperty {
                node,
                name: name.to_string(),
                value,
            });
        }
    }

    fn add_class(&mut self, node: NativeId, class: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.classes.insert(class.to_string());
            self.mutations.push(Mutation::AddClass {
                node,
                class: class.to_string(),
            });
        }
    }

    fn remove_class(&mut self, node: NativeId, class: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.classes.shift_remove(class);
            self.mutations.push(Mutation::RemoveClass {
                node,
                class: class.to_string(),
            });
        }
    }

    fn set_style_property(&mut self, node: NativeId, name: &str, value: &str) {
        if let Some(slot) = self.slot_mut(node) {
            if value.is_empty() {
                slot.style.shift_remove(name);
            } else {
                slot.style.insert(name.to_string(), value.to_string());
            }
            self.mutations.push(Mutation::SetStyleProperty {
                node,
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    fn set_style_text(&mut self, node: NativeId, css: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.style = parse_style(css);
            self.mutations.push(Mutation::SetStyleText {
                node,
                css: css.to_string(),
            });
        }
    }

    fn set_inner_markup(&mut self, node: NativeId, markup: &str) {
        let Some(slot) = self.slot(node) else {
            return;
        };
        for child in slot.children.clone() {
            self.detach(child);
        }
        if let Some(slot) = self.slot_mut(node) {
            slot.inner_markup = (!markup.is_empty()).then(|| markup.to_string());
        }
        self.mutations.push(Mutation::SetInnerMarkup {
            node,
            markup: markup.to_string(),
        });
    }

    fn listen(&mut self, node: NativeId, event_type: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.listeners.insert(event_type.to_string());
            self.mutations.push(Mutation::Listen {
                node,
                event_type: event_type.to_string(),
            });
        }
    }

    fn unlisten(&mut self, node: NativeId, event_type: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.listeners.shift_remove(event_type);
            self.mutations.push(Mutation::Unlisten {
                node,
                event_type: event_type.to_string(),
            });
        }
    }
}

fn parse_style(css: &str) -> IndexMap<String, String> {
    css.split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let (name, value) = (name.trim(), value.trim());
            (!name.is_empty() && !value.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

fn style_to_text(style: &IndexMap<String, String>) -> String {
    style
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
