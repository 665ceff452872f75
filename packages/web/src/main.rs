use dioxus::prelude::*;

use ui::{Modal, ModalOptions};

const MODAL_TOML: &str = include_str!("../modal.toml");

fn main() {
    dioxus::launch(App);
}

fn load_options() -> ModalOptions {
    match ModalOptions::from_toml(MODAL_TOML) {
        Ok(options) => options,
        Err(err) => {
            tracing::warn!("invalid modal.toml, using defaults: {err}");
            ModalOptions::default()
        }
    }
}

#[component]
fn App() -> Element {
    let options = use_hook(load_options);
    let mut open = use_signal(|| false);
    let mut name = use_signal(|| "Untitled".to_string());
    let mut draft = use_signal(String::new);
    let mut events = use_signal(Vec::<&'static str>::new);

    rsx! {
        main {
            h1 { "{name}" }
            button {
                onclick: move |_| {
                    draft.set(name());
                    open.set(true);
                },
                "Rename"
            }
            ul {
                for (i, event) in events().into_iter().enumerate() {
                    li { key: "{i}", "{event}" }
                }
            }
        }
        Modal {
            is_open: open(),
            container: options.container.clone(),
            close_on_esc: options.close_on_esc,
            close_on_overlay_click: options.close_on_overlay_click,
            focus_after_render: options.focus_after_render,
            overlay_styles: options.overlay_styles.clone(),
            modal_styles: options.modal_styles.clone(),
            aria_labelledby: options.aria_labelledby.clone(),
            aria_describedby: options.aria_describedby.clone(),
            on_after_open: move |_| events.write().push("opened"),
            on_after_close: move |_| events.write().push("closed"),
            on_request_close: move |_| {
                events.write().push("close requested");
                open.set(false);
            },
            h2 { id: "rename-title", "Rename note" }
            p { id: "rename-hint", "Escape or a click outside cancels." }
            input {
                value: "{draft}",
                oninput: move |evt| draft.set(evt.value()),
            }
            button {
                onclick: move |_| {
                    name.set(draft());
                    open.set(false);
                },
                "Save"
            }
            button { onclick: move |_| open.set(false), "Cancel" }
        }
    }
}
