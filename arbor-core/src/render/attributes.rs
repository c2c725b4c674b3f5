//! Attribute, class, style and id diffs.
//!
//! Every function takes the previous element as an `Option`: `None` means
//! the native element is fresh, which makes realization the same diff
//! against nothing.

use super::node::{Element, Style};
use crate::host::{AttrValue, Document, NativeId};

/// Write one attribute and mirror it into the live property.
fn apply_attribute<D: Document>(doc: &mut D, handle: NativeId, name: &str, value: &AttrValue) {
    match value {
        AttrValue::Bool(true) => doc.set_attribute(handle, name, name),
        AttrValue::Bool(false) => doc.remove_attribute(handle, name),
        other => doc.set_attribute(handle, name, &other.to_markup()),
    }
    doc.set_property(handle, name, value.clone());
}

pub(super) fn patch_attributes<D: Document>(
    doc: &mut D,
    handle: NativeId,
    node: &Element,
    last: Option<&Element>,
) {
    // Inputs are compared against the live property too, since user input
    // moves it away from the attribute.
    let is_input = node.tag.eq_ignore_ascii_case("input");
    for (name, value) in &node.attributes {
        let update = match last.and_then(|l| l.attributes.get(name)) {
            None => true,
            Some(prev) if prev != value => true,
            Some(_) => is_input && doc.property(handle, name).as_ref() != Some(value),
        };
        if update {
            apply_attribute(doc, handle, name, value);
        }
    }
    if let Some(last) = last {
        for name in last.attributes.keys() {
            if !node.attributes.contains_key(name) {
                doc.remove_attribute(handle, name);
            }
        }
    }
}

pub(super) fn patch_classes<D: Document>(
    doc: &mut D,
    handle: NativeId,
    node: &Element,
    last: Option<&Element>,
) {
    for (class, &on) in &node.classes {
        let prev = last.and_then(|l| l.classes.get(class)).copied();
        if prev == Some(on) {
            continue;
        }
        if on {
            doc.add_class(handle, class);
        } else if last.is_some() {
            doc.remove_class(handle, class);
        }
    }
    if let Some(last) = last {
        for class in last.classes.keys() {
            if !node.classes.contains_key(class) {
                doc.remove_class(handle, class);
            }
        }
    }
}

pub(super) fn patch_style<D: Document>(
    doc: &mut D,
    handle: NativeId,
    node: &Element,
    last: Option<&Element>,
) {
    let prev = last.and_then(|l| l.style.as_ref());
    match (node.style.as_ref(), prev) {
        (None, None) => {}
        (Some(Style::Text(css)), Some(Style::Text(old))) => {
            if css != old {
                doc.set_style_text(handle, css);
            }
        }
        (Some(Style::Map(props)), Some(Style::Map(old))) => {
            for (name, value) in props {
                if old.get(name) != Some(value) {
                    doc.set_style_property(handle, name, value);
                }
            }
            for name in old.keys() {
                if !props.contains_key(name) {
                    doc.set_style_property(handle, name, "");
                }
            }
        }
        // Kind switch: start from a clean style.
        (style, _) => {
            if last.is_some() {
                doc.set_style_text(handle, "");
            }
            match style {
                Some(Style::Text(css)) => doc.set_style_text(handle, css),
                Some(Style::Map(props)) => {
                    for (name, value) in props {
                        doc.set_style_property(handle, name, value);
                    }
                }
                None => {}
            }
        }
    }
}

pub(super) fn patch_id<D: Document>(
    doc: &mut D,
    handle: NativeId,
    node: &Element,
    last: Option<&Element>,
) {
    let prev = last.and_then(|l| l.id.as_deref());
    if node.id.as_deref() == prev {
        return;
    }
    match &node.id {
        Some(id) => doc.set_attribute(handle, "id", id),
        None => doc.remove_attribute(handle, "id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryDocument, Mutation};
    use crate::render::el;

    fn element(builder: crate::render::ElementBuilder) -> std::rc::Rc<Element> {
        match builder.build().unwrap() {
            crate::render::Node::Element(e) => e,
            _ => unreachable!(),
        }
    }

    fn fresh(doc: &mut MemoryDocument, tag: &str) -> NativeId {
        let handle = doc.create_element(tag);
        doc.clear_mutations();
        handle
    }

    #[test]
    fn booleans_toggle_attribute_and_property() {
        let mut doc = MemoryDocument::new();
        let handle = fresh(&mut doc, "input");
        let on = element(el("input").attr("checked", true));
        let off = element(el("input").attr("checked", false));

        patch_attributes(&mut doc, handle, &on, None);
        assert_eq!(doc.attribute(handle, "checked").as_deref(), Some("checked"));
        assert_eq!(doc.property(handle, "checked"), Some(AttrValue::Bool(true)));

        patch_attributes(&mut doc, handle, &off, Some(&*on));
        assert_eq!(doc.attribute(handle, "checked"), None);
        assert_eq!(doc.property(handle, "checked"), Some(AttrValue::Bool(false)));
    }

    #[test]
    fn unchanged_attributes_are_left_alone() {
        let mut doc = MemoryDocument::new();
        let handle = fresh(&mut doc, "a");
        let a = element(el("a").attr("href", "/x").attr("tabindex", 1));
        let b = element(el("a").attr("href", "/x").attr("tabindex", 1));
        patch_attributes(&mut doc, handle, &a, None);
        doc.clear_mutations();
        patch_attributes(&mut doc, handle, &b, Some(&*a));
        assert!(doc.mutations().is_empty());
    }

    #[test]
    fn inputs_follow_the_live_property() {
        let mut doc = MemoryDocument::new();
        let handle = fresh(&mut doc, "input");
        let a = element(el("input").attr("value", "abc"));
        let b = element(el("input").attr("value", "abc"));
        patch_attributes(&mut doc, handle, &a, None);
        doc.tweak_property(handle, "value", "typed");
        doc.clear_mutations();

        patch_attributes(&mut doc, handle, &b, Some(&*a));
        assert_eq!(doc.property(handle, "value"), Some(AttrValue::from("abc")));
        assert!(!doc.mutations().is_empty());
    }

    #[test]
    fn dropped_attributes_are_removed() {
        let mut doc = MemoryDocument::new();
        let handle = fresh(&mut doc, "div");
        let a = element(el("div").attr("title", "t"));
        let b = element(el("div"));
        patch_attributes(&mut doc, handle, &a, None);
        patch_attributes(&mut doc, handle, &b, Some(&*a));
        assert_eq!(doc.attribute(handle, "title"), None);
    }

    #[test]
    fn classes_change_only_on_flag_changes() {
        let mut doc = MemoryDocument::new();
        let handle = fresh(&mut doc, "div");
        let a = element(el("div").class("a b"));
        let b = element(el("div").class("a").class_flag("b", false).class("c"));
        patch_classes(&mut doc, handle, &a, None);
        doc.clear_mutations();
        patch_classes(&mut doc, handle, &b, Some(&*a));
        assert_eq!(
            doc.mutations(),
            &[
                Mutation::RemoveClass { node: handle, class: "b".into() },
                Mutation::AddClass { node: handle, class: "c".into() },
            ]
        );
        assert_eq!(doc.classes(handle), vec!["a", "c"]);
    }

    #[test]
    fn style_maps_diff_per_property() {
        let mut doc = MemoryDocument::new();
        let handle = fresh(&mut doc, "div");
        let a = element(el("div").style_prop("color", "red").style_prop("margin", "0"));
        let b = element(el("div").style_prop("color", "blue"));
        patch_style(&mut doc, handle, &a, None);
        patch_style(&mut doc, handle, &b, Some(&*a));
        assert_eq!(doc.style_text(handle), "color: blue;");
    }

    #[test]
    fn style_kind_switch_replaces_everything() {
        let mut doc = MemoryDocument::new();
        let handle = fresh(&mut doc, "div");
        let a = element(el("div").style_prop("color", "red").style_prop("margin", "0"));
        let b = element(el("div").style("padding: 1px"));
        patch_style(&mut doc, handle, &a, None);
        patch_style(&mut doc, handle, &b, Some(&*a));
        assert_eq!(doc.style_text(handle), "padding: 1px;");

        let c = element(el("div"));
        patch_style(&mut doc, handle, &c, Some(&*b));
        assert_eq!(doc.style_text(handle), "");
    }

    #[test]
    fn id_is_set_and_removed_on_change() {
        let mut doc = MemoryDocument::new();
        let handle = fresh(&mut doc, "div");
        let a = element(el("div").id("main"));
        let b = element(el("div").id("main"));
        let c = element(el("div"));
        patch_id(&mut doc, handle, &a, None);
        doc.clear_mutations();
        patch_id(&mut doc, handle, &b, Some(&*a));
        assert!(doc.mutations().is_empty());
        patch_id(&mut doc, handle, &c, Some(&*b));
        assert_eq!(doc.attribute(handle, "id"), None);
    }
}
