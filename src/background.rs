/// Background page: wires browser events to the title logic

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::error::TitlestError;
use crate::host_data::{HostConfig, TabChangeInfo, TabInfo};
use crate::hostname::url_match_pattern;
use crate::messages::{RuntimeMessage, UpdateTabsAction};
use crate::store::{HostStore, Mutation, STORAGE_KEY, StoreState};
use crate::titles::{self, TitleWrite};

pub const MENU_ID: &str = "add-host";
pub const MENU_TITLE: &str = "add hostname to Titlest";
pub const ADD_HOST_COMMAND: &str = "add-host";

// Import JS bridge functions
#[wasm_bindgen(module = "/background.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn queryTabs(query_info: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn executeScript(tab_id: i32, code: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn createNotification(options: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn resetContextMenu(id: &str, title: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    fn onCommand(callback: &js_sys::Function);

    fn onMenuClicked(callback: &js_sys::Function);

    fn onMessage(callback: &js_sys::Function);

    fn onTabUpdated(callback: &js_sys::Function);

    fn onStorageChanged(key: &str, callback: &js_sys::Function);
}

/// Filter for `tabs.query`
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct TabQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_window: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl TabQuery {
    fn active_in_current_window() -> Self {
        TabQuery {
            active: Some(true),
            current_window: Some(true),
            ..Default::default()
        }
    }

    fn host(host_name: &str) -> Self {
        TabQuery {
            url: Some(url_match_pattern(host_name)),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationOptions {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
    title: String,
    message: String,
}

struct Inner {
    store: RefCell<HostStore>,
    dirty: Cell<bool>,
}

#[derive(Clone)]
pub struct Background {
    inner: Rc<Inner>,
}

impl Background {
    fn new(state: StoreState) -> Self {
        Background {
            inner: Rc::new(Inner {
                store: RefCell::new(HostStore::from_state(state)),
                dirty: Cell::new(false),
            }),
        }
    }

    fn downgrade(&self) -> Weak<Inner> {
        Rc::downgrade(&self.inner)
    }

    fn upgrade(inner: &Weak<Inner>) -> Option<Self> {
        inner.upgrade().map(|inner| Background { inner })
    }

    /// Local mutations need saving. A replaced state came from storage.
    fn subscribe(&self) {
        let weak = self.downgrade();
        self.inner.store.borrow_mut().subscribe(move |mutation, _state| {
            let Some(background) = Background::upgrade(&weak) else { return };
            if !matches!(mutation, Mutation::ReplaceState(_)) {
                background.inner.dirty.set(true);
            }
        });
    }

    fn listen(&self) {
        let background = self.clone();
        let command_callback = Closure::wrap(Box::new(move |command: String| {
            if command != ADD_HOST_COMMAND {
                return;
            }
            let background = background.clone();
            spawn_local(async move {
                if let Err(e) = background.add_active_host().await {
                    log::error!("command failed: {}", e);
                }
            });
        }) as Box<dyn FnMut(String)>);
        onCommand(command_callback.as_ref().unchecked_ref());
        command_callback.forget();

        let background = self.clone();
        let menu_callback = Closure::wrap(Box::new(move |_info: JsValue, tab: JsValue| {
            let background = background.clone();
            spawn_local(async move {
                let result = match serde_wasm_bindgen::from_value::<TabInfo>(tab) {
                    Ok(tab) => background.add_host(tab).await,
                    Err(e) => Err(e.into()),
                };
                if let Err(e) = result {
                    log::error!("menu click failed: {}", e);
                }
            });
        }) as Box<dyn FnMut(JsValue, JsValue)>);
        onMenuClicked(menu_callback.as_ref().unchecked_ref());
        menu_callback.forget();

        let background = self.clone();
        let message_callback = Closure::wrap(Box::new(move |message: JsValue| {
            let background = background.clone();
            spawn_local(async move {
                if let Err(e) = background.handle_message(message).await {
                    log::error!("message failed: {}", e);
                }
            });
        }) as Box<dyn FnMut(JsValue)>);
        onMessage(message_callback.as_ref().unchecked_ref());
        message_callback.forget();

        let background = self.clone();
        let updated_callback = Closure::wrap(Box::new(
            move |_tab_id: i32, change: JsValue, tab: JsValue| {
                let background = background.clone();
                spawn_local(async move {
                    if let Err(e) = background.handle_updated_tab(change, tab).await {
                        log::error!("handleUpdatedTabs failed: {}", e);
                    }
                });
            },
        ) as Box<dyn FnMut(i32, JsValue, JsValue)>);
        onTabUpdated(updated_callback.as_ref().unchecked_ref());
        updated_callback.forget();

        let background = self.clone();
        let storage_callback = Closure::wrap(Box::new(move |new_value: JsValue| {
            match StoreState::from_js(new_value) {
                Ok(state) => {
                    background.inner.store.borrow_mut().apply_external(state);
                }
                Err(e) => log::error!("storage change ignored: {}", e),
            }
        }) as Box<dyn FnMut(JsValue)>);
        onStorageChanged(STORAGE_KEY, storage_callback.as_ref().unchecked_ref());
        storage_callback.forget();
    }

    async fn reload_init(&self) -> Result<(), TitlestError> {
        let tabs = query_tabs(&TabQuery::default()).await?;
        let writes = titles::reload_init(&mut self.inner.store.borrow_mut(), &tabs);
        self.finish(writes).await
    }

    async fn set_tabs_to_global_state(&self) -> Result<(), TitlestError> {
        let tabs = query_tabs(&TabQuery::default()).await?;
        let writes = titles::set_tabs_to_global_state(&self.inner.store.borrow(), &tabs);
        self.finish(writes).await
    }

    async fn update_tabs(
        &self,
        host: HostConfig,
        action: UpdateTabsAction,
    ) -> Result<(), TitlestError> {
        let tabs = query_tabs(&TabQuery::host(&host.host_name)).await?;
        let writes = titles::update_tabs(&mut self.inner.store.borrow_mut(), &host, action, &tabs);
        self.finish(writes).await
    }

    async fn handle_updated_tab(&self, change: JsValue, tab: JsValue) -> Result<(), TitlestError> {
        let change: TabChangeInfo = serde_wasm_bindgen::from_value(change)?;
        let tab: TabInfo = serde_wasm_bindgen::from_value(tab)?;

        let write = titles::handle_updated_tab(&mut self.inner.store.borrow_mut(), &change, &tab);
        self.finish(write.into_iter().collect()).await
    }

    async fn handle_message(&self, message: JsValue) -> Result<(), TitlestError> {
        match serde_wasm_bindgen::from_value::<RuntimeMessage>(message)? {
            RuntimeMessage::UpdateTabs { host, action } => self.update_tabs(host, action).await,
            RuntimeMessage::SetTabsToGlobalState => self.set_tabs_to_global_state().await,
            RuntimeMessage::UpdateSavedTabs => self.reload_init().await,
            RuntimeMessage::Unknown => {
                log::debug!("ignoring unknown runtime message");
                Ok(())
            }
        }
    }

    async fn add_active_host(&self) -> Result<(), TitlestError> {
        let tabs = query_tabs(&TabQuery::active_in_current_window()).await?;
        match tabs.into_iter().next() {
            Some(tab) => self.add_host(tab).await,
            None => {
                log::warn!("add-host: no active tab");
                Ok(())
            }
        }
    }

    async fn add_host(&self, tab: TabInfo) -> Result<(), TitlestError> {
        let created = titles::add_host(&mut self.inner.store.borrow_mut(), &tab)?;
        if created {
            self.reload_init().await?;
        }
        notify_host_added(&tab).await
    }

    /// Perform title writes, then save the store if anything changed
    async fn finish(&self, writes: Vec<TitleWrite>) -> Result<(), TitlestError> {
        apply_writes(writes).await;
        self.persist_if_dirty().await
    }

    async fn persist_if_dirty(&self) -> Result<(), TitlestError> {
        if !self.inner.dirty.replace(false) {
            return Ok(());
        }
        let value = self.inner.store.borrow_mut().take_snapshot().to_js()?;
        setStorage(STORAGE_KEY, value)
            .await
            .map_err(|e| TitlestError::js("Failed to save storage", e))
    }
}

/// Entry point of the background page
pub fn start() {
    spawn_local(async move {
        if let Err(e) = run().await {
            log::error!("background start failed: {}", e);
        }
    });
}

async fn run() -> Result<(), TitlestError> {
    let state = load_state().await?;
    log::info!("loaded {} hosts", state.hosts.len());

    let background = Background::new(state);
    background.subscribe();
    background.listen();

    // the shortcut and the tab listeners work without the menu entry
    if let Err(e) = resetContextMenu(MENU_ID, MENU_TITLE).await {
        let e = TitlestError::js("Failed to create context menu", e);
        log::error!("context menu unavailable: {}", e);
    }

    background.reload_init().await
}

async fn load_state() -> Result<StoreState, TitlestError> {
    let value = getStorage(STORAGE_KEY)
        .await
        .map_err(|e| TitlestError::js("Failed to get storage", e))?;
    StoreState::from_js(value)
}

async fn query_tabs(query: &TabQuery) -> Result<Vec<TabInfo>, TitlestError> {
    let query_js = serde_wasm_bindgen::to_value(query)?;
    let tabs_js = queryTabs(query_js)
        .await
        .map_err(|e| TitlestError::js("Failed to query tabs", e))?;
    Ok(serde_wasm_bindgen::from_value(tabs_js)?)
}

/// A failed write only affects its own tab (privileged pages reject scripts)
async fn apply_writes(writes: Vec<TitleWrite>) {
    for write in writes {
        log::debug!("tab {}: title -> {:?}", write.tab_id, write.title);
        if let Err(e) = executeScript(write.tab_id, &write.script()).await {
            log::warn!("tab {}: could not set title: {:?}", write.tab_id, e);
        }
    }
}

async fn notify_host_added(tab: &TabInfo) -> Result<(), TitlestError> {
    let host_name = tab.host_name().unwrap_or_default();
    let options = NotificationOptions {
        kind: "basic",
        icon_url: tab.fav_icon_url.clone(),
        title: "Hostname added:".to_string(),
        message: format!("{} has been added to Titlest.", host_name),
    };

    createNotification(serde_wasm_bindgen::to_value(&options)?)
        .await
        .map_err(|e| TitlestError::js("Failed to create notification", e))
}
