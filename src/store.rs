/// Reactive store of host configurations, persisted to `storage.local`

use crate::error::TitlestError;
use crate::host_data::{GlobalOptions, HostConfig};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use wasm_bindgen::JsValue;

/// Key the whole state is persisted under
pub const STORAGE_KEY: &str = "titlest_state";

/// Snapshots kept while waiting for their `storage.onChanged` echo
const MAX_PENDING_ECHOES: usize = 32;

/// Root storage structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreState {
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub globals: GlobalOptions,
}

impl StoreState {
    /// Plain JS object for `storage.local`; maps become objects, not `Map`s
    pub fn to_js(&self) -> Result<JsValue, TitlestError> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        Ok(self.serialize(&serializer)?)
    }

    /// Nothing stored yet means a fresh state
    pub fn from_js(value: JsValue) -> Result<StoreState, TitlestError> {
        if value.is_null() || value.is_undefined() {
            Ok(StoreState::default())
        } else {
            Ok(serde_wasm_bindgen::from_value(value)?)
        }
    }
}

/// A change committed to the store
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetHost(HostConfig),
    SetOriginalTabTitle {
        host_name: String,
        tab_id: i32,
        title: String,
    },
    ClearOriginalTabTitles { host_name: String },
    SetHostState { host_name: String, enabled: bool },
    SetUserTitle { host_name: String, title: String },
    SetAppended { host_name: String, appended: bool },
    RemoveHost { host_name: String },
    SetGlobalState(bool),
    /// Persisted state was replaced from outside (another extension page)
    ReplaceState(StoreState),
}

type Subscriber = Box<dyn Fn(&Mutation, &StoreState)>;

pub struct HostStore {
    state: StoreState,
    subscribers: Vec<Subscriber>,
    pending_echoes: VecDeque<StoreState>,
}

impl HostStore {
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    pub fn from_state(state: StoreState) -> Self {
        HostStore {
            state,
            subscribers: Vec::new(),
            pending_echoes: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn hosts(&self) -> &[HostConfig] {
        &self.state.hosts
    }

    pub fn global_state(&self) -> bool {
        self.state.globals.global_state
    }

    pub fn host_by_host_name(&self, host_name: &str) -> Option<&HostConfig> {
        self.state.hosts.iter().find(|h| h.host_name == host_name)
    }

    /// Register a listener called after every committed mutation
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: Fn(&Mutation, &StoreState) + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Apply a mutation and notify subscribers. Returns whether the state changed.
    pub fn commit(&mut self, mutation: Mutation) -> bool {
        let changed = self.apply(&mutation);
        if changed {
            log::debug!("store: committed {}", mutation_name(&mutation));
            for subscriber in &self.subscribers {
                subscriber(&mutation, &self.state);
            }
        }
        changed
    }

    /// Copy of the state to persist. It is remembered so that the storage
    /// change it causes is recognised as our own write.
    pub fn take_snapshot(&mut self) -> StoreState {
        let snapshot = self.state.clone();
        self.pending_echoes.push_back(snapshot.clone());
        while self.pending_echoes.len() > MAX_PENDING_ECHOES {
            self.pending_echoes.pop_front();
        }
        snapshot
    }

    /// Apply a state another extension page wrote to storage
    ///
    /// Echoes of our own snapshots are dropped, along with any older ones
    /// still pending. Original title caches are only ever recorded here, so
    /// ours are kept over whatever the incoming copy carries.
    pub fn apply_external(&mut self, incoming: StoreState) -> bool {
        if let Some(pos) = self.pending_echoes.iter().position(|s| *s == incoming) {
            self.pending_echoes.drain(..=pos);
            return false;
        }

        let merged = self.with_own_caches(incoming);
        self.commit(Mutation::ReplaceState(merged))
    }

    /// `host` with this store's original title cache, when we track the host
    pub fn with_own_cache(&self, host: &HostConfig) -> HostConfig {
        let mut host = host.clone();
        if let Some(ours) = self.host_by_host_name(&host.host_name) {
            host.original_tab_titles = ours.original_tab_titles.clone();
        }
        host
    }

    fn with_own_caches(&self, mut incoming: StoreState) -> StoreState {
        for host in &mut incoming.hosts {
            *host = self.with_own_cache(host);
        }
        incoming
    }

    fn apply(&mut self, mutation: &Mutation) -> bool {
        match mutation {
            Mutation::SetHost(host) => {
                match self
                    .state
                    .hosts
                    .iter_mut()
                    .find(|h| h.host_name == host.host_name)
                {
                    Some(existing) if *existing == *host => false,
                    Some(existing) => {
                        *existing = host.clone();
                        true
                    }
                    None => {
                        self.state.hosts.push(host.clone());
                        true
                    }
                }
            }
            Mutation::SetOriginalTabTitle {
                host_name,
                tab_id,
                title,
            } => self.update_host(host_name, |host| {
                let previous = host
                    .original_tab_titles
                    .insert(tab_id.to_string(), title.clone());
                previous.as_ref() != Some(title)
            }),
            Mutation::ClearOriginalTabTitles { host_name } => self.update_host(host_name, |host| {
                let had_titles = !host.original_tab_titles.is_empty();
                host.original_tab_titles.clear();
                had_titles
            }),
            Mutation::SetHostState { host_name, enabled } => self.update_host(host_name, |host| {
                let changed = host.host_state != *enabled;
                host.host_state = *enabled;
                changed
            }),
            Mutation::SetUserTitle { host_name, title } => self.update_host(host_name, |host| {
                let changed = host.user_title != *title;
                host.user_title = title.clone();
                changed
            }),
            Mutation::SetAppended {
                host_name,
                appended,
            } => self.update_host(host_name, |host| {
                let changed = host.is_appended != *appended;
                host.is_appended = *appended;
                changed
            }),
            Mutation::RemoveHost { host_name } => {
                let original_len = self.state.hosts.len();
                self.state.hosts.retain(|h| h.host_name != *host_name);
                self.state.hosts.len() < original_len
            }
            Mutation::SetGlobalState(enabled) => {
                let changed = self.state.globals.global_state != *enabled;
                self.state.globals.global_state = *enabled;
                changed
            }
            Mutation::ReplaceState(state) => {
                if self.state == *state {
                    false
                } else {
                    self.state = state.clone();
                    true
                }
            }
        }
    }

    fn update_host<F>(&mut self, host_name: &str, update: F) -> bool
    where
        F: FnOnce(&mut HostConfig) -> bool,
    {
        self.state
            .hosts
            .iter_mut()
            .find(|h| h.host_name == host_name)
            .map(update)
            .unwrap_or(false)
    }
}

impl Default for HostStore {
    fn default() -> Self {
        Self::new()
    }
}

fn mutation_name(mutation: &Mutation) -> &'static str {
    match mutation {
        Mutation::SetHost(_) => "SET_HOST",
        Mutation::SetOriginalTabTitle { .. } => "SET_ORIGINAL_TAB_TITLE",
        Mutation::ClearOriginalTabTitles { .. } => "CLEAR_ORIGINAL_TAB_TITLES",
        Mutation::SetHostState { .. } => "SET_HOST_STATE",
        Mutation::SetUserTitle { .. } => "SET_USER_TITLE",
        Mutation::SetAppended { .. } => "SET_APPENDED",
        Mutation::RemoveHost { .. } => "REMOVE_HOST",
        Mutation::SetGlobalState(_) => "SET_GLOBAL_STATE",
        Mutation::ReplaceState(_) => "REPLACE_STATE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store_with_host(host_name: &str) -> HostStore {
        let mut store = HostStore::new();
        store.commit(Mutation::SetHost(HostConfig::new(1, host_name)));
        store
    }

    #[test]
    fn test_store_new() {
        let store = HostStore::new();
        assert!(store.hosts().is_empty());
        assert!(store.global_state());
    }

    #[test]
    fn test_set_host_keeps_one_record_per_hostname() {
        let mut store = store_with_host("github.com");

        let mut replacement = HostConfig::new(2, "github.com");
        replacement.user_title = "GH".to_string();
        store.commit(Mutation::SetHost(replacement));

        assert_eq!(store.hosts().len(), 1);
        assert_eq!(store.host_by_host_name("github.com").unwrap().user_title, "GH");
    }

    #[test]
    fn test_host_by_host_name_missing() {
        let store = store_with_host("github.com");
        assert!(store.host_by_host_name("gitlab.com").is_none());
    }

    #[test]
    fn test_original_tab_titles() {
        let mut store = store_with_host("github.com");

        store.commit(Mutation::SetOriginalTabTitle {
            host_name: "github.com".to_string(),
            tab_id: 4,
            title: "GitHub".to_string(),
        });
        assert_eq!(
            store.host_by_host_name("github.com").unwrap().original_tab_title(4),
            Some("GitHub")
        );

        let cleared = store.commit(Mutation::ClearOriginalTabTitles {
            host_name: "github.com".to_string(),
        });
        assert!(cleared);
        assert!(store.host_by_host_name("github.com").unwrap().original_tab_titles.is_empty());
    }

    #[test]
    fn test_mutations_on_unknown_host_are_noops() {
        let mut store = store_with_host("github.com");

        let changed = store.commit(Mutation::SetUserTitle {
            host_name: "gitlab.com".to_string(),
            title: "x".to_string(),
        });

        assert!(!changed);
        assert_eq!(store.host_by_host_name("github.com").unwrap().user_title, " - Titlest");
    }

    #[test]
    fn test_host_property_mutations() {
        let mut store = store_with_host("github.com");
        let host_name = "github.com".to_string();

        store.commit(Mutation::SetHostState { host_name: host_name.clone(), enabled: false });
        store.commit(Mutation::SetAppended { host_name: host_name.clone(), appended: false });
        store.commit(Mutation::SetUserTitle {
            host_name: host_name.clone(),
            title: "Code".to_string(),
        });

        let host = store.host_by_host_name(&host_name).unwrap();
        assert!(!host.host_state);
        assert!(!host.is_appended);
        assert_eq!(host.user_title, "Code");
    }

    #[test]
    fn test_remove_host() {
        let mut store = store_with_host("github.com");

        assert!(store.commit(Mutation::RemoveHost { host_name: "github.com".to_string() }));
        assert!(!store.commit(Mutation::RemoveHost { host_name: "github.com".to_string() }));
        assert!(store.hosts().is_empty());
    }

    #[test]
    fn test_subscribers_see_committed_state() {
        let mut store = HostStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        store.subscribe(move |mutation, state| {
            sink.borrow_mut().push((mutation_name(mutation), state.globals.global_state));
        });

        store.commit(Mutation::SetGlobalState(false));

        assert_eq!(*seen.borrow(), vec![("SET_GLOBAL_STATE", false)]);
    }

    #[test]
    fn test_unchanged_commit_notifies_nobody() {
        let mut store = store_with_host("github.com");
        let calls = Rc::new(RefCell::new(0));

        let counter = calls.clone();
        store.subscribe(move |_, _| *counter.borrow_mut() += 1);

        let same = store.state().clone();
        assert!(!store.commit(Mutation::ReplaceState(same)));
        assert!(!store.commit(Mutation::SetGlobalState(true)));
        assert!(!store.commit(Mutation::SetHost(HostConfig::new(1, "github.com"))));

        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_replace_state() {
        let mut store = store_with_host("github.com");
        let mut incoming = StoreState::default();
        incoming.hosts.push(HostConfig::new(9, "gitlab.com"));

        assert!(store.commit(Mutation::ReplaceState(incoming)));
        assert!(store.host_by_host_name("github.com").is_none());
        assert!(store.host_by_host_name("gitlab.com").is_some());
    }

    #[test]
    fn test_own_echoes_are_dropped_out_of_order() {
        let mut store = store_with_host("github.com");
        store.commit(Mutation::SetOriginalTabTitle {
            host_name: "github.com".to_string(),
            tab_id: 1,
            title: "GitHub".to_string(),
        });
        let first = store.take_snapshot();

        store.commit(Mutation::SetOriginalTabTitle {
            host_name: "github.com".to_string(),
            tab_id: 2,
            title: "Issues".to_string(),
        });
        let second = store.take_snapshot();

        // the first write's echo arrives after the second commit
        assert!(!store.apply_external(first));
        let host = store.host_by_host_name("github.com").unwrap();
        assert_eq!(host.original_tab_title(2), Some("Issues"));

        assert!(!store.apply_external(second));
        assert_eq!(*store.state(), {
            let mut expected = StoreState::default();
            let mut host = HostConfig::new(1, "github.com");
            host.original_tab_titles.insert("1".to_string(), "GitHub".to_string());
            host.original_tab_titles.insert("2".to_string(), "Issues".to_string());
            expected.hosts.push(host);
            expected
        });
    }

    #[test]
    fn test_own_echo_notifies_nobody() {
        let mut store = store_with_host("github.com");
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        store.subscribe(move |_, _| *counter.borrow_mut() += 1);

        let snapshot = store.take_snapshot();
        store.commit(Mutation::SetGlobalState(false));

        assert!(!store.apply_external(snapshot));
        assert_eq!(*calls.borrow(), 1);
        assert!(!store.global_state());
    }

    #[test]
    fn test_external_state_keeps_own_caches() {
        let mut store = store_with_host("github.com");
        store.commit(Mutation::SetOriginalTabTitle {
            host_name: "github.com".to_string(),
            tab_id: 1,
            title: "GitHub".to_string(),
        });

        // another page edited the user title from a copy with a stale cache
        let mut incoming = StoreState::default();
        let mut edited = HostConfig::new(1, "github.com");
        edited.user_title = " | GH".to_string();
        incoming.hosts.push(edited);

        assert!(store.apply_external(incoming));

        let host = store.host_by_host_name("github.com").unwrap();
        assert_eq!(host.user_title, " | GH");
        assert_eq!(host.original_tab_title(1), Some("GitHub"));
    }

    #[test]
    fn test_external_state_drops_removed_hosts() {
        let mut store = store_with_host("github.com");

        assert!(store.apply_external(StoreState::default()));
        assert!(store.hosts().is_empty());
    }

    #[test]
    fn test_serialization() {
        let store = store_with_host("github.com");

        let json = serde_json::to_string(store.state()).unwrap();
        let deserialized: StoreState = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, *store.state());
    }

    #[test]
    fn test_empty_object_deserializes_to_defaults() {
        let state: StoreState = serde_json::from_str("{}").unwrap();
        assert!(state.hosts.is_empty());
        assert!(state.globals.global_state);
    }
}
