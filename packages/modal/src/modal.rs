//! # Modal controller
//!
//! [`Modal`] drives one modal dialog over a host [`Dom`]. It owns a [`Shell`]
//! of three nodes, `portal > overlay > dialog`, and keeps the following in
//! step with the `is_open` prop:
//!
//! | State | Portal | Keyboard listener |
//! |-------|--------|-------------------|
//! | open | attached under the `container` node | registered on the document |
//! | closed | detached | none |
//! | torn down | detached | none, and the overlay click listener is gone too |
//!
//! ## Render and commit
//!
//! A host drives the controller in two steps per update, mirroring a UI
//! framework's render pass followed by its post-render hook:
//!
//! 1. [`render`](Modal::render) stores the new props and syncs the portal and
//!    keyboard listener with `is_open`.
//! 2. [`commit`](Modal::commit) compares `is_open` with the previous commit and
//!    fires the lifecycle callbacks. On open it places initial focus before
//!    `on_after_open`; on close the portal and listener are already gone when
//!    `on_after_close` runs. The very first commit never counts as a
//!    transition.
//!
//! [`update`](Modal::update) runs both.
//!
//! ## Content
//!
//! [`Modal::new`] builds its own shell and hosts mount children into the dialog
//! with [`set_content`](Modal::set_content). A host that renders the shell
//! itself (the Dioxus component) hands the nodes over with
//! [`Modal::adopt`]; class, style and ARIA attributes are then left to the
//! host's markup.
//!
//! ## Event handling
//!
//! Listener closures hold a `Weak` reference to the controller's shared state
//! and clone callbacks out before invoking them, so a callback is free to
//! drive the controller again (for example, closing it from
//! `on_request_close`).

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::dom::{Dom, Key, KeyInput, KeyOutcome};
use crate::error::{ModalError, Result};
use crate::focus::{self, TrapAction};
use crate::lifecycle::{OpenTracker, Transition};
use crate::options::{Callback, ModalOptions, ModalProps};
use crate::styles;

/// The portal container, the overlay backdrop, and the dialog box.
#[derive(Clone, Debug, PartialEq)]
pub struct Shell<N> {
    pub portal: N,
    pub overlay: N,
    pub dialog: N,
}

impl<N> Shell<N> {
    /// Create a detached `portal > overlay > dialog` tree.
    pub fn build<D: Dom<Node = N>>(dom: &D) -> Result<Self> {
        let portal = dom.create_element("div")?;
        let overlay = dom.create_element("div")?;
        let dialog = dom.create_element("div")?;
        dom.append_child(&portal, &overlay)?;
        dom.append_child(&overlay, &dialog)?;
        Ok(Self {
            portal,
            overlay,
            dialog,
        })
    }
}

/// State reachable from listener closures.
struct Shared<D: Dom> {
    dom: D,
    shell: Shell<D::Node>,
    props: RefCell<ModalProps>,
}

impl<D: Dom> Shared<D> {
    fn option<T>(&self, f: impl FnOnce(&ModalOptions) -> T) -> T {
        f(&self.props.borrow().options)
    }

    fn callback(&self, pick: impl FnOnce(&ModalProps) -> Option<Callback>) -> Option<Callback> {
        pick(&self.props.borrow())
    }

    fn request_close(&self) {
        if let Some(callback) = self.callback(|p| p.callbacks.on_request_close.clone()) {
            callback();
        }
    }

    fn on_keydown(&self, input: &KeyInput) -> KeyOutcome {
        match input.key {
            Key::Escape if self.option(|o| o.close_on_esc) => {
                trace!("escape pressed, requesting close");
                self.request_close();
                KeyOutcome::RequestedClose
            }
            Key::Tab => self.trap_tab(input.shift),
            _ => KeyOutcome::Ignored,
        }
    }

    fn trap_tab(&self, shift: bool) -> KeyOutcome {
        let focusable = self.dom.focusable_descendants(&self.shell.dialog);
        let current = self.dom.active_element();
        match focus::on_tab(&focusable, current.as_ref(), shift) {
            TrapAction::Allow => KeyOutcome::Allowed,
            TrapAction::Suppress => {
                trace!("nothing focusable in dialog, tab suppressed");
                KeyOutcome::Suppressed
            }
            TrapAction::MoveTo(target) => {
                if let Err(err) = self.dom.focus(&target) {
                    warn!("failed to move focus: {err}");
                }
                KeyOutcome::FocusMoved
            }
        }
    }

    fn on_overlay_click(&self, target: &D::Node) -> bool {
        if *target != self.shell.overlay || !self.option(|o| o.close_on_overlay_click) {
            return false;
        }
        trace!("overlay clicked, requesting close");
        self.request_close();
        true
    }

    fn place_initial_focus(&self) -> Result<()> {
        match self.dom.focusable_descendants(&self.shell.dialog).first() {
            Some(first) => self.dom.focus(first),
            None => Ok(()),
        }
    }

    fn apply_attributes(&self) -> Result<()> {
        let props = self.props.borrow();
        let options = &props.options;
        let Shell {
            portal,
            overlay,
            dialog,
        } = &self.shell;
        let dom = &self.dom;

        dom.set_attribute(portal, "class", &options.portal_class)?;

        dom.set_attribute(overlay, "class", &options.overlay_class)?;
        let overlay_css = options
            .overlay_styles
            .merged_over(&styles::default_overlay())
            .to_css();
        dom.set_attribute(overlay, "style", &overlay_css)?;

        dom.set_attribute(dialog, "class", &options.modal_class)?;
        let modal_css = options
            .modal_styles
            .merged_over(&styles::default_modal())
            .to_css();
        dom.set_attribute(dialog, "style", &modal_css)?;
        dom.set_attribute(dialog, "role", "dialog")?;
        dom.set_attribute(dialog, "aria-modal", "true")?;
        for (name, value) in [
            ("aria-labelledby", &options.aria_labelledby),
            ("aria-describedby", &options.aria_describedby),
        ] {
            match value {
                Some(value) => dom.set_attribute(dialog, name, value)?,
                None => dom.remove_attribute(dialog, name)?,
            }
        }
        Ok(())
    }
}

/// A modal dialog bound to a host document.
///
/// Dropping the controller tears it down.
pub struct Modal<D: Dom> {
    shared: Rc<Shared<D>>,
    owns_markup: bool,
    boundary: Option<D::Node>,
    tracker: OpenTracker,
    keyboard: Option<D::Listener>,
    overlay_click: Option<D::Listener>,
    torn_down: bool,
}

impl<D: Dom> Modal<D> {
    /// Create a modal with its own detached shell.
    pub fn new(dom: D, props: ModalProps) -> Result<Self> {
        let shell = Shell::build(&dom)?;
        let modal = Self::with_shell(dom, shell, props, true)?;
        modal.shared.apply_attributes()?;
        Ok(modal)
    }

    /// Take over a shell whose markup the host renders itself.
    pub fn adopt(dom: D, shell: Shell<D::Node>, props: ModalProps) -> Result<Self> {
        Self::with_shell(dom, shell, props, false)
    }

    fn with_shell(
        dom: D,
        shell: Shell<D::Node>,
        props: ModalProps,
        owns_markup: bool,
    ) -> Result<Self> {
        let shared = Rc::new(Shared {
            dom,
            shell,
            props: RefCell::new(props),
        });

        let weak = Rc::downgrade(&shared);
        let overlay_click = shared.dom.listen_click(
            &shared.shell.overlay,
            Rc::new(move |target: &D::Node| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_overlay_click(target);
                }
            }),
        )?;

        Ok(Self {
            shared,
            owns_markup,
            boundary: None,
            tracker: OpenTracker::new(),
            keyboard: None,
            overlay_click: Some(overlay_click),
            torn_down: false,
        })
    }

    /// Keep the portal inside `boundary`.
    ///
    /// A container outside `boundary` is replaced by `boundary` itself. Hosts
    /// that only see events dispatched within one subtree of the document
    /// pass that subtree's root here.
    pub fn with_boundary(mut self, boundary: D::Node) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn dom(&self) -> &D {
        &self.shared.dom
    }

    pub fn shell(&self) -> &Shell<D::Node> {
        &self.shared.shell
    }

    pub fn is_open(&self) -> bool {
        self.shared.props.borrow().is_open
    }

    /// Whether the portal currently sits in a host node.
    pub fn is_attached(&self) -> bool {
        self.shared.dom.parent(&self.shared.shell.portal).is_some()
    }

    pub fn has_keyboard_listener(&self) -> bool {
        self.keyboard.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Replace the props seen by event handlers without touching the document.
    pub fn set_props(&self, props: ModalProps) {
        *self.shared.props.borrow_mut() = props;
    }

    /// Store `props` and sync the portal and keyboard listener with `is_open`.
    pub fn render(&mut self, props: ModalProps) -> Result<()> {
        self.ensure_live()?;
        self.set_props(props);

        let (is_open, container) = {
            let props = self.shared.props.borrow();
            (props.is_open, props.options.container.clone())
        };
        if !is_open {
            self.release();
            return Ok(());
        }

        let dom = &self.shared.dom;
        let portal = &self.shared.shell.portal;
        let mut host = dom
            .query_selector(&container)
            .ok_or_else(|| ModalError::ContainerNotFound {
                selector: container.clone(),
            })?;
        if let Some(boundary) = &self.boundary {
            if !dom.contains(boundary, &host) {
                debug!(%container, "container lies outside the boundary, using the boundary");
                host = boundary.clone();
            }
        }
        if !dom.contains(&host, portal) {
            dom.append_child(&host, portal)?;
            debug!(%container, "portal attached");
        }

        if self.keyboard.is_none() {
            let weak = Rc::downgrade(&self.shared);
            let listener = dom.listen_keydown(Rc::new(move |input: &KeyInput| {
                match weak.upgrade() {
                    Some(shared) => shared.on_keydown(input),
                    None => KeyOutcome::Ignored,
                }
            }))?;
            self.keyboard = Some(listener);
            debug!("keyboard listener registered");
        }

        if self.owns_markup {
            self.shared.apply_attributes()?;
        }
        Ok(())
    }

    /// Fire lifecycle callbacks for the change since the previous commit.
    pub fn commit(&mut self) -> Result<Transition> {
        self.ensure_live()?;
        let is_open = self.is_open();
        let transition = self.tracker.observe(is_open);
        match transition {
            Transition::Opened => {
                if self.shared.option(|o| o.focus_after_render) {
                    if let Err(err) = self.shared.place_initial_focus() {
                        warn!("failed to place initial focus: {err}");
                    }
                }
                debug!("modal opened");
                if let Some(callback) = self.shared.callback(|p| p.callbacks.on_after_open.clone()) {
                    callback();
                }
            }
            Transition::Closed => {
                self.release();
                debug!("modal closed");
                if let Some(callback) = self.shared.callback(|p| p.callbacks.on_after_close.clone()) {
                    callback();
                }
            }
            Transition::Unchanged => {}
        }
        Ok(transition)
    }

    /// [`render`](Self::render) followed by [`commit`](Self::commit).
    pub fn update(&mut self, props: ModalProps) -> Result<Transition> {
        self.render(props)?;
        self.commit()
    }

    /// Replace the dialog's children with whatever `mount` builds.
    pub fn set_content(&self, mount: impl FnOnce(&D, &D::Node) -> Result<()>) -> Result<()> {
        self.ensure_live()?;
        self.shared.dom.clear_children(&self.shared.shell.dialog);
        mount(&self.shared.dom, &self.shared.shell.dialog)
    }

    /// Handle a keydown directly. Ignored unless the modal is open.
    pub fn handle_keydown(&self, input: &KeyInput) -> KeyOutcome {
        if self.keyboard.is_none() {
            return KeyOutcome::Ignored;
        }
        self.shared.on_keydown(input)
    }

    /// Handle a click whose original target is `target`. Returns whether
    /// `on_request_close` was invoked.
    pub fn handle_overlay_click(&self, target: &D::Node) -> bool {
        !self.torn_down && self.shared.on_overlay_click(target)
    }

    /// Detach the portal and drop every listener, whatever the open state.
    /// Further renders fail with [`ModalError::TornDown`].
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.release();
        self.overlay_click = None;
        self.torn_down = true;
        debug!("modal torn down");
    }

    fn release(&mut self) {
        let dom = &self.shared.dom;
        let portal = &self.shared.shell.portal;
        if dom.parent(portal).is_some() {
            dom.detach(portal);
            debug!("portal detached");
        }
        if self.keyboard.take().is_some() {
            debug!("keyboard listener removed");
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.torn_down {
            return Err(ModalError::TornDown);
        }
        Ok(())
    }
}

impl<D: Dom> Drop for Modal<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
