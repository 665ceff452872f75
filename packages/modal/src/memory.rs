use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dom::{ClickHandler, Dom, Key, KeyHandler, KeyInput};
use crate::error::Result;
use crate::focus;

/// Handle to an element of a [`MemoryDom`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
struct NodeData {
    tag: String,
    text: Option<String>,
    attributes: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Default)]
struct Document {
    nodes: Vec<NodeData>,
    active: Option<NodeId>,
    next_listener: u64,
    key_listeners: BTreeMap<u64, KeyHandler>,
    click_listeners: BTreeMap<u64, (NodeId, ClickHandler<NodeId>)>,
}

const HTML: NodeId = NodeId(0);
const BODY: NodeId = NodeId(1);

impl Document {
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, tag: &str, text: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            text,
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Removing the focused element (or an ancestor of it) blurs it.
    fn unlink(&mut self, id: NodeId) {
        if let Some(active) = self.active {
            if self.ancestors(active).any(|ancestor| ancestor == id) {
                self.active = None;
            }
        }
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|child| *child != id);
        }
    }

    fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |id| self.node(*id).parent)
    }

    fn is_connected(&self, id: NodeId) -> bool {
        self.ancestors(id).any(|ancestor| ancestor == HTML)
    }

    /// Pre-order walk of the subtree under `root`, excluding `root`.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(root).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    fn is_focusable(&self, id: NodeId) -> bool {
        let data = self.node(id);
        data.text.is_none()
            && focus::is_focusable(&data.tag, |name| {
                data.attributes.get(name).map(String::as_str)
            })
    }

    fn add_listener(&mut self) -> u64 {
        self.next_listener += 1;
        self.next_listener
    }
}

/// Compound selector made of an optional tag, `#id` and `.class` parts.
#[derive(Debug, Default, PartialEq)]
struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl SimpleSelector {
    fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        let mut parsed = SimpleSelector::default();
        let mut rest = selector;
        let tag_end = rest.find(['#', '.']).unwrap_or(rest.len());
        if tag_end > 0 {
            parsed.tag = Some(rest[..tag_end].to_ascii_lowercase());
        }
        rest = &rest[tag_end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
                return None;
            }
            match marker {
                '#' => parsed.id = Some(name.to_string()),
                _ => parsed.classes.push(name.to_string()),
            }
            rest = &body[end..];
        }
        if parsed
            .tag
            .as_deref()
            .is_some_and(|tag| !tag.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return None;
        }
        Some(parsed)
    }

    fn matches(&self, data: &NodeData) -> bool {
        if data.text.is_some() {
            return false;
        }
        if self.tag.as_deref().is_some_and(|tag| tag != data.tag) {
            return false;
        }
        if let Some(id) = &self.id {
            if data.attributes.get("id") != Some(id) {
                return false;
            }
        }
        let classes = data.attributes.get("class").map(String::as_str).unwrap_or("");
        self.classes
            .iter()
            .all(|class| classes.split_whitespace().any(|c| c == class))
    }
}

/// In-memory document for testing and native hosts.
///
/// Starts as `<html><body></body></html>`. Besides the [`Dom`] operations it
/// can simulate user input: [`press_key`](MemoryDom::press_key) runs keydown
/// listeners and applies default Tab navigation when nothing prevented it, and
/// [`click`](MemoryDom::click) bubbles a click from its target to the root.
#[derive(Clone)]
pub struct MemoryDom {
    doc: Rc<RefCell<Document>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = self.doc.borrow();
        f.debug_struct("MemoryDom")
            .field("nodes", &doc.nodes.len())
            .field("active", &doc.active)
            .field("key_listeners", &doc.key_listeners.len())
            .field("click_listeners", &doc.click_listeners.len())
            .finish()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        let mut doc = Document::default();
        let html = doc.push("html", None);
        let body = doc.push("body", None);
        doc.node_mut(body).parent = Some(html);
        doc.node_mut(html).children.push(body);
        Self {
            doc: Rc::new(RefCell::new(doc)),
        }
    }

    pub fn body(&self) -> NodeId {
        BODY
    }

    /// Create an element and append it to `parent`.
    pub fn element(&self, parent: &NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut doc = self.doc.borrow_mut();
        let id = doc.push(tag, None);
        let data = doc.node_mut(id);
        for (name, value) in attributes {
            data.attributes.insert(name.to_string(), value.to_string());
        }
        data.parent = Some(*parent);
        doc.node_mut(*parent).children.push(id);
        id
    }

    /// Create a text node and append it to `parent`.
    pub fn text(&self, parent: &NodeId, text: &str) -> NodeId {
        let mut doc = self.doc.borrow_mut();
        let id = doc.push("#text", Some(text.to_string()));
        doc.node_mut(id).parent = Some(*parent);
        doc.node_mut(*parent).children.push(id);
        id
    }

    pub fn tag(&self, node: &NodeId) -> String {
        self.doc.borrow().node(*node).tag.clone()
    }

    pub fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.doc.borrow().node(*node).attributes.get(name).cloned()
    }

    pub fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.doc.borrow().node(*node).children.clone()
    }

    /// Concatenated text of the subtree, like `Node.textContent`.
    pub fn text_content(&self, node: &NodeId) -> String {
        let doc = self.doc.borrow();
        std::iter::once(*node)
            .chain(doc.descendants(*node))
            .filter_map(|id| doc.node(id).text.clone())
            .collect()
    }

    /// Whether `node` is reachable from the document root.
    pub fn is_connected(&self, node: &NodeId) -> bool {
        self.doc.borrow().is_connected(*node)
    }

    /// All connected elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let Some(selector) = SimpleSelector::parse(selector) else {
            return Vec::new();
        };
        let doc = self.doc.borrow();
        std::iter::once(HTML)
            .chain(doc.descendants(HTML))
            .filter(|id| selector.matches(doc.node(*id)))
            .collect()
    }

    /// Connected text nodes containing `needle`, like `getByText`.
    pub fn find_text(&self, needle: &str) -> Option<NodeId> {
        let doc = self.doc.borrow();
        doc.descendants(HTML)
            .into_iter()
            .find(|id| doc.node(*id).text.as_deref().is_some_and(|t| t.contains(needle)))
    }

    pub fn key_listener_count(&self) -> usize {
        self.doc.borrow().key_listeners.len()
    }

    pub fn click_listener_count(&self) -> usize {
        self.doc.borrow().click_listeners.len()
    }

    /// Dispatch a keydown to every registered listener.
    ///
    /// Returns whether any listener prevented the default action. An
    /// unprevented Tab moves focus along the document's tab sequence.
    pub fn press_key(&self, input: &KeyInput) -> bool {
        let handlers: Vec<KeyHandler> = self.doc.borrow().key_listeners.values().cloned().collect();
        let mut prevented = false;
        for handler in handlers {
            prevented |= handler(input).prevents_default();
        }
        if !prevented && input.key == Key::Tab {
            self.default_tab(input.shift);
        }
        prevented
    }

    /// Dispatch a click on `target`, bubbling through its ancestors.
    pub fn click(&self, target: &NodeId) {
        let chain: Vec<NodeId> = self.doc.borrow().ancestors(*target).collect();
        for node in chain {
            let handlers: Vec<ClickHandler<NodeId>> = self
                .doc
                .borrow()
                .click_listeners
                .values()
                .filter(|(on, _)| *on == node)
                .map(|(_, handler)| handler.clone())
                .collect();
            for handler in handlers {
                handler(target);
            }
        }
    }

    /// Browser default for Tab: next connected focusable element in document
    /// order. Past either end, focus leaves the document.
    fn default_tab(&self, backwards: bool) {
        let mut doc = self.doc.borrow_mut();
        let sequence: Vec<NodeId> = doc
            .descendants(HTML)
            .into_iter()
            .filter(|id| doc.is_focusable(*id))
            .collect();
        let current = doc
            .active
            .and_then(|active| sequence.iter().position(|id| *id == active));
        doc.active = match (current, backwards) {
            (None, false) => sequence.first().copied(),
            (None, true) => sequence.last().copied(),
            (Some(i), false) => sequence.get(i + 1).copied(),
            (Some(i), true) => i.checked_sub(1).and_then(|i| sequence.get(i).copied()),
        };
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;
    type Listener = MemoryListener;

    fn create_element(&self, tag: &str) -> Result<NodeId> {
        Ok(self.doc.borrow_mut().push(tag, None))
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.query_selector_all(selector).into_iter().next()
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) -> Result<()> {
        let mut doc = self.doc.borrow_mut();
        doc.unlink(*child);
        doc.node_mut(*child).parent = Some(*parent);
        doc.node_mut(*parent).children.push(*child);
        Ok(())
    }

    fn detach(&self, node: &NodeId) {
        self.doc.borrow_mut().unlink(*node);
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.doc.borrow().node(*node).parent
    }

    fn contains(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        self.doc.borrow().ancestors(*node).any(|id| id == *ancestor)
    }

    fn clear_children(&self, node: &NodeId) {
        let mut doc = self.doc.borrow_mut();
        let children = doc.node(*node).children.clone();
        for child in children {
            doc.unlink(child);
        }
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<()> {
        self.doc
            .borrow_mut()
            .node_mut(*node)
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&self, node: &NodeId, name: &str) -> Result<()> {
        self.doc.borrow_mut().node_mut(*node).attributes.remove(name);
        Ok(())
    }

    fn focusable_descendants(&self, root: &NodeId) -> Vec<NodeId> {
        let doc = self.doc.borrow();
        doc.descendants(*root)
            .into_iter()
            .filter(|id| doc.is_focusable(*id))
            .collect()
    }

    fn active_element(&self) -> Option<NodeId> {
        let doc = self.doc.borrow();
        match doc.active {
            Some(active) if doc.is_connected(active) => Some(active),
            _ => Some(BODY),
        }
    }

    fn focus(&self, node: &NodeId) -> Result<()> {
        let mut doc = self.doc.borrow_mut();
        if doc.is_connected(*node) && doc.is_focusable(*node) {
            doc.active = Some(*node);
        }
        Ok(())
    }

    fn listen_keydown(&self, handler: KeyHandler) -> Result<MemoryListener> {
        let mut doc = self.doc.borrow_mut();
        let id = doc.add_listener();
        doc.key_listeners.insert(id, handler);
        Ok(MemoryListener {
            doc: Rc::downgrade(&self.doc),
            id,
        })
    }

    fn listen_click(&self, node: &NodeId, handler: ClickHandler<NodeId>) -> Result<MemoryListener> {
        let mut doc = self.doc.borrow_mut();
        let id = doc.add_listener();
        doc.click_listeners.insert(id, (*node, handler));
        Ok(MemoryListener {
            doc: Rc::downgrade(&self.doc),
            id,
        })
    }
}

/// Listener registration in a [`MemoryDom`]; removed on drop.
#[derive(Debug)]
pub struct MemoryListener {
    doc: Weak<RefCell<Document>>,
    id: u64,
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        if let Some(doc) = self.doc.upgrade() {
            let mut doc = doc.borrow_mut();
            doc.key_listeners.remove(&self.id);
            doc.click_listeners.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::KeyOutcome;
    use std::cell::Cell;

    #[test]
    fn test_starts_with_body() {
        let dom = MemoryDom::new();
        assert_eq!(dom.query_selector("body"), Some(dom.body()));
        assert_eq!(dom.active_element(), Some(dom.body()));
        assert!(dom.is_connected(&dom.body()));
    }

    #[test]
    fn test_selectors() {
        let dom = MemoryDom::new();
        let root = dom.element(&dom.body(), "div", &[("id", "root"), ("class", "a b")]);
        let inner = dom.element(&root, "span", &[("class", "b")]);

        assert_eq!(dom.query_selector("#root"), Some(root));
        assert_eq!(dom.query_selector(".b"), Some(root));
        assert_eq!(dom.query_selector("span.b"), Some(inner));
        assert_eq!(dom.query_selector("div.a.b"), Some(root));
        assert_eq!(dom.query_selector_all(".b"), vec![root, inner]);
        assert_eq!(dom.query_selector("#missing"), None);
        assert_eq!(dom.query_selector(""), None);
        assert_eq!(dom.query_selector("div > span"), None);
    }

    #[test]
    fn test_detached_nodes_are_not_queried() {
        let dom = MemoryDom::new();
        let node = dom.create_element("div").unwrap();
        dom.set_attribute(&node, "id", "floating").unwrap();
        assert_eq!(dom.query_selector("#floating"), None);

        dom.append_child(&dom.body(), &node).unwrap();
        assert_eq!(dom.query_selector("#floating"), Some(node));

        dom.detach(&node);
        assert_eq!(dom.query_selector("#floating"), None);
        assert_eq!(dom.parent(&node), None);
    }

    #[test]
    fn test_append_moves_node() {
        let dom = MemoryDom::new();
        let a = dom.element(&dom.body(), "div", &[]);
        let b = dom.element(&dom.body(), "div", &[]);
        let child = dom.element(&a, "p", &[]);

        dom.append_child(&b, &child).unwrap();
        assert!(dom.children(&a).is_empty());
        assert_eq!(dom.children(&b), vec![child]);
        assert!(dom.contains(&b, &child));
        assert!(!dom.contains(&a, &child));
        assert!(dom.contains(&child, &child));
    }

    #[test]
    fn test_focus_requires_connected_focusable() {
        let dom = MemoryDom::new();
        let plain = dom.element(&dom.body(), "div", &[]);
        let input = dom.element(&dom.body(), "input", &[]);
        let floating = dom.create_element("input").unwrap();

        dom.focus(&plain).unwrap();
        assert_eq!(dom.active_element(), Some(dom.body()));
        dom.focus(&floating).unwrap();
        assert_eq!(dom.active_element(), Some(dom.body()));
        dom.focus(&input).unwrap();
        assert_eq!(dom.active_element(), Some(input));

        dom.detach(&input);
        assert_eq!(dom.active_element(), Some(dom.body()));
    }

    #[test]
    fn test_focusable_descendants_in_document_order() {
        let dom = MemoryDom::new();
        let root = dom.element(&dom.body(), "div", &[]);
        let first = dom.element(&root, "a", &[("href", "#")]);
        let group = dom.element(&root, "div", &[]);
        let nested = dom.element(&group, "button", &[]);
        dom.element(&group, "button", &[("disabled", "")]);
        let custom = dom.element(&root, "div", &[("tabindex", "0")]);
        dom.text(&root, "not focusable");

        assert_eq!(dom.focusable_descendants(&root), vec![first, nested, custom]);
    }

    #[test]
    fn test_default_tab_walks_document() {
        let dom = MemoryDom::new();
        let a = dom.element(&dom.body(), "input", &[]);
        let b = dom.element(&dom.body(), "input", &[]);

        assert!(!dom.press_key(&KeyInput::tab()));
        assert_eq!(dom.active_element(), Some(a));
        dom.press_key(&KeyInput::tab());
        assert_eq!(dom.active_element(), Some(b));
        dom.press_key(&KeyInput::tab());
        assert_eq!(dom.active_element(), Some(dom.body()));
        dom.press_key(&KeyInput::shift_tab());
        assert_eq!(dom.active_element(), Some(b));
    }

    #[test]
    fn test_key_listener_guard() {
        let dom = MemoryDom::new();
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        let guard = dom
            .listen_keydown(Rc::new(move |_: &KeyInput| {
                counter.set(counter.get() + 1);
                KeyOutcome::Suppressed
            }))
            .unwrap();
        assert_eq!(dom.key_listener_count(), 1);

        assert!(dom.press_key(&KeyInput::escape()));
        assert_eq!(seen.get(), 1);

        drop(guard);
        assert_eq!(dom.key_listener_count(), 0);
        assert!(!dom.press_key(&KeyInput::escape()));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_click_bubbles_with_original_target() {
        let dom = MemoryDom::new();
        let outer = dom.element(&dom.body(), "div", &[]);
        let inner = dom.element(&outer, "span", &[]);
        let targets = Rc::new(RefCell::new(Vec::new()));
        let seen = targets.clone();
        let _guard = dom
            .listen_click(&outer, Rc::new(move |target: &NodeId| seen.borrow_mut().push(*target)))
            .unwrap();

        dom.click(&inner);
        dom.click(&outer);
        dom.click(&dom.body());
        assert_eq!(*targets.borrow(), vec![inner, outer]);
    }

    #[test]
    fn test_text_content() {
        let dom = MemoryDom::new();
        let root = dom.element(&dom.body(), "div", &[]);
        dom.text(&root, "Hello ");
        let p = dom.element(&root, "p", &[]);
        let world = dom.text(&p, "world");

        assert_eq!(dom.text_content(&root), "Hello world");
        assert_eq!(dom.find_text("world"), Some(world));
    }
}
