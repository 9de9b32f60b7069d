/// Popup UI for Titlest

use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::error::TitlestError;
use crate::messages::{RuntimeMessage, UpdateTabsAction};
use crate::store::{HostStore, Mutation, STORAGE_KEY, StoreState};
use crate::ui::components::HostCard;

// Import JS bridge functions
#[wasm_bindgen(module = "/popup.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendMessage(message: JsValue) -> Result<(), JsValue>;
}

/// A user edit in the popup
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    ToggleGlobal,
    ToggleHost(String),
    ToggleAppended(String),
    SetUserTitle(String, String),
    RemoveHost(String),
}

/// Apply an edit to a copy of the state. Returns the new state and the
/// messages that tell the background page what to retitle.
pub fn apply_edit(state: &StoreState, edit: &Edit) -> (StoreState, Vec<RuntimeMessage>) {
    let mut store = HostStore::from_state(state.clone());
    let mut messages = Vec::new();

    match edit {
        Edit::ToggleGlobal => {
            let enabled = !store.global_state();
            store.commit(Mutation::SetGlobalState(enabled));
            messages.push(RuntimeMessage::SetTabsToGlobalState);
        }
        Edit::ToggleHost(host_name) => {
            if let Some(host) = store.host_by_host_name(host_name) {
                let enabled = !host.host_state;
                store.commit(Mutation::SetHostState {
                    host_name: host_name.clone(),
                    enabled,
                });
            }
        }
        Edit::ToggleAppended(host_name) => {
            if let Some(host) = store.host_by_host_name(host_name) {
                let appended = !host.is_appended;
                store.commit(Mutation::SetAppended {
                    host_name: host_name.clone(),
                    appended,
                });
            }
        }
        Edit::SetUserTitle(host_name, title) => {
            store.commit(Mutation::SetUserTitle {
                host_name: host_name.clone(),
                title: title.clone(),
            });
        }
        Edit::RemoveHost(host_name) => {
            if let Some(host) = store.host_by_host_name(host_name) {
                messages.push(RuntimeMessage::UpdateTabs {
                    host: host.clone(),
                    action: UpdateTabsAction::SetTabsToOriginalTabTitles,
                });
            }
            if store.commit(Mutation::RemoveHost {
                host_name: host_name.clone(),
            }) {
                messages.push(RuntimeMessage::UpdateSavedTabs);
            }
        }
    }

    let edited_host = match edit {
        Edit::ToggleHost(host_name)
        | Edit::ToggleAppended(host_name)
        | Edit::SetUserTitle(host_name, _) => store.host_by_host_name(host_name),
        Edit::ToggleGlobal | Edit::RemoveHost(_) => None,
    };
    if let Some(host) = edited_host {
        messages.push(RuntimeMessage::update_tabs(host));
    }

    (store.state().clone(), messages)
}

#[derive(Clone, PartialEq)]
enum PopupState {
    Loading,
    Idle,
    Saving,
    Error(String),
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| PopupState::Loading);
    let store_state = use_state(StoreState::default);

    // Load storage on mount
    {
        let state = state.clone();
        let store_state = store_state.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                match load_state().await {
                    Ok(loaded) => {
                        store_state.set(loaded);
                        state.set(PopupState::Idle);
                    }
                    Err(e) => {
                        state.set(PopupState::Error(format!("Failed to load: {}", e)));
                    }
                }
            });
            || ()
        });
    }

    let on_edit = {
        let state = state.clone();
        let store_state = store_state.clone();

        Callback::from(move |edit: Edit| {
            let (next, messages) = apply_edit(&store_state, &edit);
            if next == *store_state && messages.is_empty() {
                return;
            }

            store_state.set(next.clone());
            state.set(PopupState::Saving);

            let state = state.clone();
            spawn_local(async move {
                match save_and_notify(&next, messages).await {
                    Ok(_) => state.set(PopupState::Idle),
                    Err(e) => {
                        log::error!("popup edit failed: {}", e);
                        state.set(PopupState::Error(format!("Failed to save: {}", e)));
                    }
                }
            });
        })
    };

    let on_toggle_global = on_edit.reform(|_: MouseEvent| Edit::ToggleGlobal);

    let is_busy = matches!(*state, PopupState::Loading | PopupState::Saving);
    let global_state = store_state.globals.global_state;
    let global_variant = if global_state {
        ButtonVariant::Primary
    } else {
        ButtonVariant::Secondary
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Titlest"}</h1>

            <Button
                onclick={on_toggle_global}
                disabled={is_busy}
                variant={global_variant}
                block={true}
            >
                {if global_state { "Titles on" } else { "Titles off" }}
            </Button>

            // Status display
            {match &*state {
                PopupState::Loading => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{"Loading hosts..."}</p>
                    </div>
                },
                PopupState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                PopupState::Idle | PopupState::Saving => html! {}
            }}

            if store_state.hosts.is_empty() && *state == PopupState::Idle {
                <div class="empty-state">
                    <p>{"No hostnames yet."}</p>
                    <p class="empty-state-hint">
                        {"Right click a page and choose \"add hostname to Titlest\", "}
                        {"or press Alt+Shift+N."}
                    </p>
                </div>
            } else {
                <div class="hosts-list">
                    {for store_state.hosts.iter().map(|host| html! {
                        <HostCard
                            key={host.host_name.clone()}
                            host={host.clone()}
                            on_edit={on_edit.clone()}
                            disabled={is_busy}
                        />
                    })}
                </div>
            }

            <p class="footer-popup">
                {"Titlest v0.1.0"}
            </p>
        </div>
    }
}

// Helper functions

async fn load_state() -> Result<StoreState, TitlestError> {
    let value = getStorage(STORAGE_KEY)
        .await
        .map_err(|e| TitlestError::js("Failed to get storage", e))?;
    StoreState::from_js(value)
}

async fn save_and_notify(
    state: &StoreState,
    messages: Vec<RuntimeMessage>,
) -> Result<(), TitlestError> {
    setStorage(STORAGE_KEY, state.to_js()?)
        .await
        .map_err(|e| TitlestError::js("Failed to save storage", e))?;

    for message in messages {
        sendMessage(message.to_js()?)
            .await
            .map_err(|e| TitlestError::js("Failed to send message", e))?;
    }

    Ok(())
}
