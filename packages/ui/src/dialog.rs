use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use dioxus::prelude::*;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use modal::{styles, Callback, Callbacks, ModalOptions, ModalProps as CoreProps, StyleMap};

/// Without a browser document the shell is rendered in place and the keyboard
/// contract runs through `document::eval`.
const INLINE: bool = !cfg!(all(target_arch = "wasm32", feature = "web"));

static MODAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Element ids of one modal instance's shell.
#[derive(Clone, Debug, PartialEq)]
struct ShellIds {
    portal: String,
    overlay: String,
    dialog: String,
}

impl ShellIds {
    fn next() -> Self {
        let id = MODAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            portal: format!("modal-{id}-portal"),
            overlay: format!("modal-{id}-overlay"),
            dialog: format!("modal-{id}-dialog"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Notice {
    AfterOpen,
    AfterClose,
    RequestClose,
}

#[derive(Clone, Copy, Default)]
struct Handlers {
    on_after_open: Option<EventHandler<()>>,
    on_after_close: Option<EventHandler<()>>,
    on_request_close: Option<EventHandler<()>>,
}

impl Handlers {
    fn get(&self, notice: Notice) -> Option<EventHandler<()>> {
        match notice {
            Notice::AfterOpen => self.on_after_open,
            Notice::AfterClose => self.on_after_close,
            Notice::RequestClose => self.on_request_close,
        }
    }
}

fn notify(tx: &UnboundedSender<Notice>, notice: Notice) -> Callback {
    let tx = tx.clone();
    Rc::new(move || {
        let _ = tx.unbounded_send(notice);
    })
}

/// An accessible modal dialog.
///
/// While open, the shell is moved into the `container` node, Escape and clicks
/// on the backdrop call `on_request_close`, and Tab cycles focus inside the
/// dialog. Closing is up to the caller: flip `is_open` from
/// `on_request_close`.
///
/// Dioxus only sees events inside its mount root, so a `container` outside
/// the root (the default `body`, for one) resolves to the root itself.
///
/// Lifecycle handlers fire on open/close transitions only, never for the
/// initial render.
#[component]
pub fn Modal(
    is_open: bool,
    on_after_open: Option<EventHandler<()>>,
    on_after_close: Option<EventHandler<()>>,
    on_request_close: Option<EventHandler<()>>,
    #[props(default = ModalOptions::default().close_on_esc)] close_on_esc: bool,
    #[props(default = ModalOptions::default().close_on_overlay_click)] close_on_overlay_click: bool,
    #[props(default = ModalOptions::default().focus_after_render)] focus_after_render: bool,
    #[props(into, default = ModalOptions::default().container)] container: String,
    #[props(into, default = ModalOptions::default().portal_class)] portal_class: String,
    #[props(into, default = ModalOptions::default().overlay_class)] overlay_class: String,
    #[props(into, default = ModalOptions::default().modal_class)] modal_class: String,
    #[props(default)] overlay_styles: StyleMap,
    #[props(default)] modal_styles: StyleMap,
    #[props(into)] aria_labelledby: Option<String>,
    #[props(into)] aria_describedby: Option<String>,
    children: Element,
) -> Element {
    let ids = use_hook(ShellIds::next);

    let handlers = use_hook(|| Rc::new(Cell::new(Handlers::default())));
    handlers.set(Handlers {
        on_after_open,
        on_after_close,
        on_request_close,
    });

    // Core callbacks may run inside raw browser listeners, so they only queue
    // a notice; this task calls the handlers from within the Dioxus runtime.
    let notices = use_hook(|| {
        let (tx, mut rx) = mpsc::unbounded::<Notice>();
        let handlers = handlers.clone();
        spawn(async move {
            while let Some(notice) = rx.next().await {
                if let Some(handler) = handlers.get().get(notice) {
                    handler.call(());
                }
            }
        });
        tx
    });

    let options = ModalOptions {
        container,
        portal_class: portal_class.clone(),
        overlay_class: overlay_class.clone(),
        modal_class: modal_class.clone(),
        close_on_esc,
        close_on_overlay_click,
        focus_after_render,
        aria_labelledby: aria_labelledby.clone(),
        aria_describedby: aria_describedby.clone(),
        overlay_styles: overlay_styles.clone(),
        modal_styles: modal_styles.clone(),
    };
    let props = CoreProps {
        is_open,
        options,
        callbacks: Callbacks {
            on_after_open: Some(notify(&notices, Notice::AfterOpen)),
            on_after_close: Some(notify(&notices, Notice::AfterClose)),
            on_request_close: Some(notify(&notices, Notice::RequestClose)),
        },
    };

    #[cfg(all(target_arch = "wasm32", feature = "web"))]
    let taken_over = portal::use_portal(&ids, props);
    #[cfg(not(all(target_arch = "wasm32", feature = "web")))]
    let taken_over = {
        inline::use_inline_modal(&ids, props, notices.clone());
        true
    };

    if INLINE && !is_open {
        return rsx! {};
    }

    // Until the controller owns the shell it sits where Dioxus put it, so keep
    // the backdrop out of the way.
    let portal_css = if taken_over { "" } else { "display: none;" };
    let overlay_css = overlay_styles.merged_over(&styles::default_overlay()).to_css();
    let modal_css = modal_styles.merged_over(&styles::default_modal()).to_css();
    let click_close = notify(&notices, Notice::RequestClose);

    rsx! {
        div {
            id: "{ids.portal}",
            class: "{portal_class}",
            style: "{portal_css}",
            div {
                id: "{ids.overlay}",
                class: "{overlay_class}",
                style: "{overlay_css}",
                onclick: move |_| {
                    if INLINE && close_on_overlay_click {
                        click_close();
                    }
                },
                div {
                    id: "{ids.dialog}",
                    class: "{modal_class}",
                    style: "{modal_css}",
                    role: "dialog",
                    "aria-modal": "true",
                    "aria-labelledby": aria_labelledby,
                    "aria-describedby": aria_describedby,
                    onclick: move |evt: MouseEvent| {
                        if INLINE {
                            evt.stop_propagation();
                        }
                    },
                    if is_open {
                        {children}
                    }
                }
            }
        }
    }
}

/// The shell rendered in place, with the keyboard contract and initial focus
/// driven through `document::eval`.
#[cfg(not(all(target_arch = "wasm32", feature = "web")))]
mod inline {
    use super::*;
    use dioxus::document;
    use modal::focus::{self, FOCUSABLE_SELECTOR};
    use modal::{OpenTracker, Transition};
    use serde::Deserialize;
    use tracing::{trace, warn};

    /// What the document keydown listener reports back.
    #[derive(Debug, Deserialize)]
    #[serde(tag = "kind", rename_all = "lowercase")]
    enum KeyMessage {
        Escape,
        Tab {
            shift: bool,
            len: usize,
            current: Option<usize>,
        },
        Closed,
    }

    /// Registers a document keydown listener for as long as `dialog_id` stays
    /// connected. Tab navigation is always blocked and reported, so focus only
    /// moves through [`focus_nth`].
    fn keyboard_script(dialog_id: &str) -> String {
        format!(
            r#"
            const dialog = document.getElementById({dialog_id:?});
            if (dialog === null) {{
                dioxus.send({{ kind: "closed" }});
            }} else {{
                const onKeyDown = (event) => {{
                    if (!dialog.isConnected) {{
                        document.removeEventListener("keydown", onKeyDown);
                        dioxus.send({{ kind: "closed" }});
                    }} else if (event.key === "Escape" || event.key === "Esc" || event.keyCode === 27) {{
                        dioxus.send({{ kind: "escape" }});
                    }} else if (event.key === "Tab" || event.keyCode === 9) {{
                        event.preventDefault();
                        const items = Array.from(dialog.querySelectorAll({FOCUSABLE_SELECTOR:?}));
                        const index = items.indexOf(document.activeElement);
                        dioxus.send({{
                            kind: "tab",
                            shift: event.shiftKey,
                            len: items.length,
                            current: index < 0 ? null : index,
                        }});
                    }}
                }};
                document.addEventListener("keydown", onKeyDown);
            }}
            "#
        )
    }

    fn focus_script(dialog_id: &str, index: usize) -> String {
        format!(
            "document.getElementById({dialog_id:?})?.querySelectorAll({FOCUSABLE_SELECTOR:?})[{index}]?.focus();"
        )
    }

    fn focus_nth(dialog_id: &str, index: usize) {
        let _ = document::eval(&focus_script(dialog_id, index));
    }

    async fn run_keyboard(
        dialog_id: String,
        latest: Rc<RefCell<CoreProps>>,
        notices: UnboundedSender<Notice>,
    ) {
        let mut keys = document::eval(&keyboard_script(&dialog_id));
        loop {
            match keys.recv::<KeyMessage>().await {
                Ok(KeyMessage::Escape) => {
                    if latest.borrow().options.close_on_esc {
                        trace!("escape pressed, requesting close");
                        let _ = notices.unbounded_send(Notice::RequestClose);
                    }
                }
                Ok(KeyMessage::Tab {
                    shift,
                    len,
                    current,
                }) => {
                    if let Some(index) = focus::step_index(len, current, shift) {
                        focus_nth(&dialog_id, index);
                    }
                }
                Ok(KeyMessage::Closed) => break,
                Err(err) => {
                    warn!("modal keyboard listener unavailable: {err:?}");
                    break;
                }
            }
        }
    }

    /// Tracks open transitions and keeps a keyboard listener alive while open.
    pub(super) fn use_inline_modal(
        ids: &ShellIds,
        props: CoreProps,
        notices: UnboundedSender<Notice>,
    ) {
        let tracker = use_hook(|| Rc::new(RefCell::new(OpenTracker::new())));
        let keyboard = use_hook(|| Rc::new(RefCell::new(None::<Task>)));
        let latest = use_hook(|| Rc::new(RefCell::new(CoreProps::default())));
        *latest.borrow_mut() = props.clone();

        let dialog_id = ids.dialog.clone();
        let effect_keyboard = keyboard.clone();
        use_effect(use_reactive((&props.is_open,), move |(is_open,)| {
            let props = latest.borrow().clone();
            if !is_open {
                if let Some(task) = effect_keyboard.borrow_mut().take() {
                    task.cancel();
                }
            } else if effect_keyboard.borrow().is_none() {
                let task = spawn(run_keyboard(dialog_id.clone(), latest.clone(), notices.clone()));
                *effect_keyboard.borrow_mut() = Some(task);
            }

            let callback = match tracker.borrow_mut().observe(is_open) {
                Transition::Opened => {
                    if props.options.focus_after_render {
                        focus_nth(&dialog_id, 0);
                    }
                    props.callbacks.on_after_open
                }
                Transition::Closed => props.callbacks.on_after_close,
                Transition::Unchanged => None,
            };
            if let Some(callback) = callback {
                callback();
            }
        }));

        use_drop(move || {
            if let Some(task) = keyboard.borrow_mut().take() {
                task.cancel();
            }
        });
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn message(json: &str) -> KeyMessage {
            serde_json::from_str(json).unwrap()
        }

        #[test]
        fn test_key_messages() {
            assert!(matches!(message(r#"{"kind":"escape"}"#), KeyMessage::Escape));
            assert!(matches!(message(r#"{"kind":"closed"}"#), KeyMessage::Closed));
            assert!(matches!(
                message(r#"{"kind":"tab","shift":true,"len":3,"current":0}"#),
                KeyMessage::Tab {
                    shift: true,
                    len: 3,
                    current: Some(0)
                }
            ));
            assert!(matches!(
                message(r#"{"kind":"tab","shift":false,"len":2,"current":null}"#),
                KeyMessage::Tab {
                    shift: false,
                    len: 2,
                    current: None
                }
            ));
        }

        #[test]
        fn test_scripts_target_the_dialog() {
            let script = keyboard_script("modal-7-dialog");
            assert!(script.contains(r#"getElementById("modal-7-dialog")"#));
            assert!(script.contains(r#"addEventListener("keydown""#));
            assert!(script.contains(r#"input:not([type=\"hidden\"])"#));

            let focus = focus_script("modal-7-dialog", 2);
            assert!(focus.contains(r#"getElementById("modal-7-dialog")"#));
            assert!(focus.ends_with("[2]?.focus();"));
        }
    }
}

/// Hands the rendered shell to a [`modal::Modal`] on the page's document.
#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod portal {
    use super::*;
    use modal::{Modal as Controller, ModalError, Shell, WebDom};

    /// Dioxus marks its mount root with this id and delegates bubbling events
    /// there.
    const MOUNT_ROOT: &str = "[data-dioxus-id=\"0\"]";

    fn adopt(ids: &ShellIds, props: CoreProps) -> Result<Controller<WebDom>, ModalError> {
        let dom = WebDom::new().ok_or_else(|| ModalError::Dom("no browser document".to_string()))?;
        let find = |id: &str| {
            dom.element_by_id(id)
                .ok_or_else(|| ModalError::Dom(format!("shell element `{id}` is not rendered")))
        };
        let shell = Shell {
            portal: find(&ids.portal)?,
            overlay: find(&ids.overlay)?,
            dialog: find(&ids.dialog)?,
        };
        let mount_root = shell.portal.closest(MOUNT_ROOT).ok().flatten();
        let controller = Controller::adopt(dom, shell, props)?;
        Ok(match mount_root {
            Some(root) => controller.with_boundary(root),
            None => {
                tracing::warn!("modal rendered outside a Dioxus mount root");
                controller
            }
        })
    }

    /// Keeps the controller in step with `is_open` and the options. Returns
    /// whether the controller has taken the shell over.
    pub(super) fn use_portal(ids: &ShellIds, props: CoreProps) -> bool {
        let controller = use_hook(|| Rc::new(RefCell::new(None::<Controller<WebDom>>)));
        let latest = use_hook(|| Rc::new(RefCell::new(CoreProps::default())));
        let mut taken_over = use_signal(|| false);
        *latest.borrow_mut() = props.clone();
        if let Some(modal) = controller.borrow().as_ref() {
            modal.set_props(props.clone());
        }

        let effect_ids = ids.clone();
        let effect_controller = controller.clone();
        use_effect(use_reactive(
            (&props.is_open, &props.options),
            move |(is_open, _options)| {
                tracing::trace!(is_open, "syncing modal portal");
                let props = latest.borrow().clone();
                let mut slot = effect_controller.borrow_mut();
                if slot.is_none() {
                    match adopt(&effect_ids, props.clone()) {
                        Ok(modal) => {
                            *slot = Some(modal);
                            taken_over.set(true);
                        }
                        Err(err) => {
                            tracing::error!("modal portal unavailable: {err}");
                            return;
                        }
                    }
                }
                if let Some(modal) = slot.as_mut() {
                    if let Err(err) = modal.update(props) {
                        tracing::error!("modal update failed: {err}");
                    }
                }
            },
        ));

        use_drop(move || {
            if let Some(mut modal) = controller.borrow_mut().take() {
                modal.teardown();
            }
        });

        taken_over()
    }
}
