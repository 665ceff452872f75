//! Accessible modal dialogs rendered through a portal.
//!
//! The controller is framework-agnostic: it works against any [`Dom`]. Use
//! [`MemoryDom`] for tests and native hosts, and [`WebDom`] in the browser.

pub mod dom;
pub mod error;
pub mod focus;
pub mod lifecycle;
pub mod options;
pub mod styles;

mod modal;
pub use modal::{Modal, Shell};

mod memory;
pub use memory::{MemoryDom, MemoryListener, NodeId};

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod web;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use web::{WebDom, WebListener};

pub use dom::{Dom, Key, KeyInput, KeyOutcome};
pub use error::{ModalError, Result};
pub use lifecycle::{OpenTracker, Transition};
pub use options::{Callback, Callbacks, ModalOptions, ModalProps};
pub use styles::StyleMap;
