//! # Modal options and props
//!
//! [`ModalOptions`] is the serializable part of a modal's configuration: where
//! the portal lives, class names, style overrides, behavior flags and ARIA
//! references. It can be stored as TOML:
//!
//! ```toml
//! container = "#modal-root"
//! close_on_overlay_click = false
//! aria_labelledby = "dialog-title"
//!
//! [overlay_styles]
//! background-color = "rgba(0, 0, 0, 0.75)"
//! ```
//!
//! Every field is optional; a missing or empty file is the default
//! configuration.
//!
//! [`Callbacks`] holds the lifecycle hooks, and [`ModalProps`] bundles the open
//! flag, options and callbacks into what a render receives.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::styles::StyleMap;

/// Serializable modal configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModalOptions {
    /// Selector of the node the portal is attached to.
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default = "default_portal_class")]
    pub portal_class: String,
    #[serde(default = "default_overlay_class")]
    pub overlay_class: String,
    #[serde(default = "default_modal_class")]
    pub modal_class: String,
    #[serde(default = "default_true")]
    pub close_on_esc: bool,
    #[serde(default = "default_true")]
    pub close_on_overlay_click: bool,
    /// Focus the first focusable descendant when the modal opens.
    #[serde(default = "default_true")]
    pub focus_after_render: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_labelledby: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_describedby: Option<String>,
    // Tables come last so the TOML output stays valid.
    /// Merged over [`crate::styles::default_overlay`].
    #[serde(default)]
    pub overlay_styles: StyleMap,
    /// Merged over [`crate::styles::default_modal`].
    #[serde(default)]
    pub modal_styles: StyleMap,
}

fn default_container() -> String {
    "body".to_string()
}

fn default_portal_class() -> String {
    "ReactModal__Portal".to_string()
}

fn default_overlay_class() -> String {
    "ReactModal__Overlay".to_string()
}

fn default_modal_class() -> String {
    "ReactModal__Modal".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ModalOptions {
    fn default() -> Self {
        Self {
            container: default_container(),
            portal_class: default_portal_class(),
            overlay_class: default_overlay_class(),
            modal_class: default_modal_class(),
            overlay_styles: StyleMap::default(),
            modal_styles: StyleMap::default(),
            close_on_esc: true,
            close_on_overlay_click: true,
            focus_after_render: true,
            aria_labelledby: None,
            aria_describedby: None,
        }
    }
}

impl ModalOptions {
    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

pub type Callback = Rc<dyn Fn()>;

/// Lifecycle hooks. A missing hook is a no-op.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_after_open: Option<Callback>,
    pub on_after_close: Option<Callback>,
    pub on_request_close: Option<Callback>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_after_open", &self.on_after_open.is_some())
            .field("on_after_close", &self.on_after_close.is_some())
            .field("on_request_close", &self.on_request_close.is_some())
            .finish()
    }
}

/// Everything a single render of the modal receives.
#[derive(Clone, Debug, Default)]
pub struct ModalProps {
    pub is_open: bool,
    pub options: ModalOptions,
    pub callbacks: Callbacks,
}

impl ModalProps {
    pub fn new(is_open: bool) -> Self {
        Self {
            is_open,
            ..Self::default()
        }
    }

    pub fn open(mut self, is_open: bool) -> Self {
        self.is_open = is_open;
        self
    }

    pub fn with_options(mut self, options: ModalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn container(mut self, selector: impl Into<String>) -> Self {
        self.options.container = selector.into();
        self
    }

    pub fn close_on_esc(mut self, enabled: bool) -> Self {
        self.options.close_on_esc = enabled;
        self
    }

    pub fn close_on_overlay_click(mut self, enabled: bool) -> Self {
        self.options.close_on_overlay_click = enabled;
        self
    }

    pub fn focus_after_render(mut self, enabled: bool) -> Self {
        self.options.focus_after_render = enabled;
        self
    }

    pub fn on_after_open(mut self, f: impl Fn() + 'static) -> Self {
        self.callbacks.on_after_open = Some(Rc::new(f));
        self
    }

    pub fn on_after_close(mut self, f: impl Fn() + 'static) -> Self {
        self.callbacks.on_after_close = Some(Rc::new(f));
        self
    }

    pub fn on_request_close(mut self, f: impl Fn() + 'static) -> Self {
        self.callbacks.on_request_close = Some(Rc::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ModalOptions::default();
        assert_eq!(options.container, "body");
        assert_eq!(options.portal_class, "ReactModal__Portal");
        assert_eq!(options.overlay_class, "ReactModal__Overlay");
        assert_eq!(options.modal_class, "ReactModal__Modal");
        assert!(options.close_on_esc);
        assert!(options.close_on_overlay_click);
        assert!(options.focus_after_render);
        assert!(options.aria_labelledby.is_none());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(ModalOptions::from_toml("").unwrap(), ModalOptions::default());
    }

    #[test]
    fn test_partial_toml() {
        let options = ModalOptions::from_toml(
            r##"
container = "#modal-root"
close_on_overlay_click = false
aria_labelledby = "dialog-title"

[overlay_styles]
background-color = "black"
"##,
        )
        .unwrap();

        assert_eq!(options.container, "#modal-root");
        assert!(!options.close_on_overlay_click);
        assert!(options.close_on_esc);
        assert_eq!(options.aria_labelledby.as_deref(), Some("dialog-title"));
        assert_eq!(options.overlay_styles.get("background-color"), Some("black"));
        assert_eq!(options.portal_class, "ReactModal__Portal");
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut options = ModalOptions::default();
        options.modal_class = "dialog".to_string();
        options.aria_describedby = Some("dialog-body".to_string());
        options.modal_styles.insert("width", "400px");

        let text = options.to_toml().unwrap();
        assert_eq!(ModalOptions::from_toml(&text).unwrap(), options);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ModalOptions::from_toml("close_on_esc = \"yes\"").is_err());
    }

    #[test]
    fn test_props_builder() {
        let props = ModalProps::new(true)
            .container("#root")
            .close_on_esc(false)
            .focus_after_render(false)
            .on_request_close(|| {});

        assert!(props.is_open);
        assert_eq!(props.options.container, "#root");
        assert!(!props.options.close_on_esc);
        assert!(!props.options.focus_after_render);
        assert!(props.callbacks.on_request_close.is_some());
        assert!(props.callbacks.on_after_open.is_none());
    }
}
