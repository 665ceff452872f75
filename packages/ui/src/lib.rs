//! Dioxus components for the workspace.

mod dialog;
pub use dialog::Modal;

pub use ::modal::{ModalOptions, StyleMap};
