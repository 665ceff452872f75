//! # Host document abstraction
//!
//! The modal never talks to a browser directly. Everything it needs from the
//! host document (creating and moving nodes, attributes, focus, and event
//! listeners) goes through the [`Dom`] trait, so the same controller runs
//! against the in-memory document ([`crate::MemoryDom`]) in tests and on native
//! hosts, and against the real browser document ([`crate::WebDom`]) on the web.
//!
//! ## Listener guards
//!
//! [`Dom::listen_keydown`] and [`Dom::listen_click`] return a
//! [`Dom::Listener`] guard. Dropping the guard unregisters the handler, so a
//! listener's lifetime is exactly the lifetime of the value holding it.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;

/// Logical key decoded from a keyboard event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Tab,
    Other(String),
}

impl Key {
    /// Decode a DOM `KeyboardEvent.key` value.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            other => Key::Other(other.to_string()),
        }
    }

    /// Decode a legacy `KeyboardEvent.keyCode` value.
    pub fn from_code(code: u32) -> Self {
        match code {
            27 => Key::Escape,
            9 => Key::Tab,
            other => Key::Other(other.to_string()),
        }
    }
}

/// A keydown as seen by the modal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn escape() -> Self {
        Self::new(Key::Escape)
    }

    pub fn tab() -> Self {
        Self::new(Key::Tab)
    }

    pub fn shift_tab() -> Self {
        Self::tab().with_shift(true)
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }
}

/// What a keydown handler did with the event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not a key the modal cares about, or the behavior is switched off.
    Ignored,
    /// Escape was pressed and `on_request_close` was invoked.
    RequestedClose,
    /// Tab navigation was blocked without moving focus.
    Suppressed,
    /// Tab navigation was redirected to another element.
    FocusMoved,
    /// Tab navigation stays inside the dialog on its own.
    Allowed,
}

impl KeyOutcome {
    /// Whether the host should call `preventDefault` on the event.
    pub fn prevents_default(self) -> bool {
        matches!(self, KeyOutcome::Suppressed | KeyOutcome::FocusMoved)
    }
}

pub type KeyHandler = Rc<dyn Fn(&KeyInput) -> KeyOutcome>;

/// Click handler receiving the event's original target.
pub type ClickHandler<N> = Rc<dyn Fn(&N)>;

/// The subset of a DOM document the modal relies on.
pub trait Dom: Clone + 'static {
    type Node: Clone + PartialEq + fmt::Debug + 'static;
    /// Registration guard; dropping it removes the listener.
    type Listener: 'static;

    fn create_element(&self, tag: &str) -> Result<Self::Node>;

    /// First connected element matching `selector`, in document order.
    fn query_selector(&self, selector: &str) -> Option<Self::Node>;

    /// Append `child` to `parent`, moving it if it already has a parent.
    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<()>;

    /// Remove `node` from its parent. No-op for a detached node.
    fn detach(&self, node: &Self::Node);

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Inclusive descendant check, like `Node.contains`.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool;

    fn clear_children(&self, node: &Self::Node);

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<()>;

    fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<()>;

    /// Descendants of `root` that can take keyboard focus, in document order.
    /// See [`crate::focus::FOCUSABLE_SELECTOR`].
    fn focusable_descendants(&self, root: &Self::Node) -> Vec<Self::Node>;

    fn active_element(&self) -> Option<Self::Node>;

    fn focus(&self, node: &Self::Node) -> Result<()>;

    /// Register a document-level keydown handler.
    fn listen_keydown(&self, handler: KeyHandler) -> Result<Self::Listener>;

    /// Register a click handler on `node`, fired for clicks that bubble to it.
    fn listen_click(
        &self,
        node: &Self::Node,
        handler: ClickHandler<Self::Node>,
    ) -> Result<Self::Listener>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("Escape"), Key::Escape);
        assert_eq!(Key::from_name("Esc"), Key::Escape);
        assert_eq!(Key::from_name("Tab"), Key::Tab);
        assert_eq!(Key::from_name("a"), Key::Other("a".to_string()));
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(Key::from_code(27), Key::Escape);
        assert_eq!(Key::from_code(9), Key::Tab);
        assert_eq!(Key::from_code(13), Key::Other("13".to_string()));
    }

    #[test]
    fn test_only_trap_actions_prevent_default() {
        assert!(KeyOutcome::Suppressed.prevents_default());
        assert!(KeyOutcome::FocusMoved.prevents_default());
        assert!(!KeyOutcome::Allowed.prevents_default());
        assert!(!KeyOutcome::Ignored.prevents_default());
        assert!(!KeyOutcome::RequestedClose.prevents_default());
    }
}
