//! # Browser document: `web-sys` backed [`Dom`]
//!
//! [`WebDom`] is the [`Dom`] implementation used on the **web platform**. Nodes
//! are `web_sys::Element`s and listeners are `wasm_bindgen` closures registered
//! with `addEventListener`.
//!
//! ## Listener lifetime
//!
//! [`WebListener`] keeps its closure alive for as long as it is registered and
//! calls `removeEventListener` on drop. Closures are never `forget`-ed, so
//! closing or tearing down a modal leaves no handler behind in the page.
//!
//! ## Errors
//!
//! Failed browser calls surface as [`ModalError::Dom`] carrying the stringified
//! `JsValue`.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, KeyboardEvent, Node};

use crate::dom::{ClickHandler, Dom, Key, KeyHandler, KeyInput};
use crate::error::{ModalError, Result};
use crate::focus::FOCUSABLE_SELECTOR;

fn js_error(err: JsValue) -> ModalError {
    ModalError::Dom(format!("{err:?}"))
}

/// The page's `document`.
#[derive(Clone, Debug)]
pub struct WebDom {
    document: Document,
}

impl WebDom {
    /// The current window's document, if running in a browser.
    pub fn new() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self { document })
    }

    pub fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn listen(
        &self,
        target: EventTarget,
        kind: &'static str,
        callback: Box<dyn FnMut(Event)>,
    ) -> Result<WebListener> {
        let closure = Closure::wrap(callback);
        target
            .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
            .map_err(js_error)?;
        Ok(WebListener {
            target,
            kind,
            closure,
        })
    }
}

fn key_input(event: &KeyboardEvent) -> KeyInput {
    let name = event.key();
    let key = if name.is_empty() || name == "Unidentified" {
        Key::from_code(event.key_code())
    } else {
        Key::from_name(&name)
    };
    KeyInput::new(key).with_shift(event.shift_key())
}

impl Dom for WebDom {
    type Node = Element;
    type Listener = WebListener;

    fn create_element(&self, tag: &str) -> Result<Element> {
        self.document.create_element(tag).map_err(js_error)
    }

    fn query_selector(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }

    fn append_child(&self, parent: &Element, child: &Element) -> Result<()> {
        parent.append_child(child).map(|_| ()).map_err(js_error)
    }

    fn detach(&self, node: &Element) {
        node.remove();
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn contains(&self, ancestor: &Element, node: &Element) -> bool {
        ancestor.contains(Some(AsRef::<Node>::as_ref(node)))
    }

    fn clear_children(&self, node: &Element) {
        node.set_inner_html("");
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) -> Result<()> {
        node.set_attribute(name, value).map_err(js_error)
    }

    fn remove_attribute(&self, node: &Element, name: &str) -> Result<()> {
        node.remove_attribute(name).map_err(js_error)
    }

    fn focusable_descendants(&self, root: &Element) -> Vec<Element> {
        let Ok(list) = root.query_selector_all(FOCUSABLE_SELECTOR) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn active_element(&self) -> Option<Element> {
        self.document.active_element()
    }

    fn focus(&self, node: &Element) -> Result<()> {
        match node.dyn_ref::<HtmlElement>() {
            Some(element) => element.focus().map_err(js_error),
            None => Ok(()),
        }
    }

    fn listen_keydown(&self, handler: KeyHandler) -> Result<WebListener> {
        let target: EventTarget = self.document.clone().into();
        self.listen(
            target,
            "keydown",
            Box::new(move |event: Event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                if handler(&key_input(event)).prevents_default() {
                    event.prevent_default();
                }
            }),
        )
    }

    fn listen_click(&self, node: &Element, handler: ClickHandler<Element>) -> Result<WebListener> {
        let target: EventTarget = node.clone().into();
        self.listen(
            target,
            "click",
            Box::new(move |event: Event| {
                let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                    return;
                };
                handler(&target);
            }),
        )
    }
}

/// An `addEventListener` registration; removed on drop.
pub struct WebListener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Drop for WebListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref());
    }
}
