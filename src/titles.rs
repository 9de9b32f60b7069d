/// Title rewriting: deciding which tabs get which title
///
/// Everything here is pure over the store and the tab snapshots handed in by
/// the background page. The caller performs the returned writes.

use crate::error::TitlestError;
use crate::host_data::{HostConfig, TabChangeInfo, TabInfo};
use crate::messages::UpdateTabsAction;
use crate::store::{HostStore, Mutation};

/// A `document.title` assignment to run in one tab
#[derive(Debug, Clone, PartialEq)]
pub struct TitleWrite {
    pub tab_id: i32,
    pub title: String,
}

impl TitleWrite {
    fn new(tab_id: i32, title: String) -> Self {
        TitleWrite { tab_id, title }
    }

    pub fn script(&self) -> String {
        title_script(&self.title)
    }
}

/// Remove the first occurrence of the user title from a tab title
pub fn strip_user_title(title: &str, user_title: &str) -> String {
    title.replacen(user_title, "", 1)
}

/// The page's own title for a tab: the cached one, else the current title
/// with our suffix taken back off
pub fn original_title_for(tab: &TabInfo, host: &HostConfig) -> String {
    match host.original_tab_title(tab.id) {
        Some(original) => original.to_string(),
        None => strip_user_title(tab.title(), &host.user_title),
    }
}

pub fn format_tab_title(tab: &TabInfo, host: &HostConfig, global_state: bool) -> String {
    if !host.host_state || !global_state {
        return original_title_for(tab, host);
    }

    if host.is_appended {
        format!("{}{}", original_title_for(tab, host), host.user_title)
    } else {
        host.user_title.clone()
    }
}

/// Loop check: false when the tab already shows the transformed title, so
/// the write our own rewrite triggers does not cause another one
pub fn needs_title_rewrite(tab: &TabInfo, host: &HostConfig) -> bool {
    if host.host_state {
        let title = tab.title();
        let appended = format!("{}{}", original_title_for(tab, host), host.user_title);
        if host.is_appended && title == appended {
            return false;
        }
        if !host.is_appended && title == host.user_title {
            return false;
        }
    }

    true
}

/// Code injected into a tab to set its title
pub fn title_script(title: &str) -> String {
    // A JSON string literal is a valid JS string literal
    let literal = serde_json::to_string(title).unwrap_or_else(|_| "\"\"".to_string());
    format!("document.title = {};", literal)
}

/// Cache the tab's original title on its host, unless the tab currently shows
/// the bare user title (nothing of the page's own title is left to keep)
pub fn set_original_tab_title(store: &mut HostStore, tab: &TabInfo, host_name: &str) {
    let original = match store.host_by_host_name(host_name) {
        Some(host) if tab.title() != host.user_title => {
            strip_user_title(tab.title(), &host.user_title)
        }
        _ => return,
    };

    store.commit(Mutation::SetOriginalTabTitle {
        host_name: host_name.to_string(),
        tab_id: tab.id,
        title: original,
    });
}

/// Rebuild every host's original title cache from the open tabs and retitle
/// the tabs of enabled hosts
pub fn reload_init(store: &mut HostStore, tabs: &[TabInfo]) -> Vec<TitleWrite> {
    let mut stale_hosts: Vec<String> = Vec::new();
    for tab in tabs {
        let Some(host_name) = tab.host_name() else { continue };
        if let Some(host) = store.host_by_host_name(&host_name) {
            if tab.title() != host.user_title && !stale_hosts.contains(&host_name) {
                stale_hosts.push(host_name);
            }
        }
    }
    for host_name in stale_hosts {
        store.commit(Mutation::ClearOriginalTabTitles { host_name });
    }

    let mut writes = Vec::new();
    for tab in tabs {
        let Some(host_name) = tab.host_name() else { continue };
        if store.host_by_host_name(&host_name).is_none() {
            continue;
        }

        set_original_tab_title(store, tab, &host_name);

        if let Some(host) = store.host_by_host_name(&host_name) {
            if host.host_state && needs_title_rewrite(tab, host) && store.global_state() {
                writes.push(TitleWrite::new(tab.id, format_tab_title(tab, host, true)));
            }
        }
    }

    writes
}

/// Bring every tab of an enabled host in line with the global switch
pub fn set_tabs_to_global_state(store: &HostStore, tabs: &[TabInfo]) -> Vec<TitleWrite> {
    tabs.iter()
        .filter_map(|tab| {
            let host_name = tab.host_name()?;
            let host = store.host_by_host_name(&host_name)?;
            host.host_state
                .then(|| TitleWrite::new(tab.id, format_tab_title(tab, host, store.global_state())))
        })
        .collect()
}

/// Retitle the tabs of one host after the popup edited it
///
/// `host` is the snapshot carried by the message. The popup writes storage
/// and messages us in no guaranteed order, so a host we still track takes the
/// snapshot's settings right away. Its original title cache stays ours: the
/// popup's copy may be stale.
pub fn update_tabs(
    store: &mut HostStore,
    host: &HostConfig,
    action: UpdateTabsAction,
    tabs: &[TabInfo],
) -> Vec<TitleWrite> {
    let host = store.with_own_cache(host);
    if store.host_by_host_name(&host.host_name).is_some() {
        store.commit(Mutation::SetHost(host.clone()));
    }

    match action {
        UpdateTabsAction::SetTabsToOriginalTabTitles => tabs
            .iter()
            .filter_map(|tab| {
                host.original_tab_title(tab.id)
                    .map(|original| TitleWrite::new(tab.id, original.to_string()))
            })
            .collect(),
        UpdateTabsAction::SetTabsToUserTitle => {
            if !store.global_state() {
                return Vec::new();
            }
            tabs.iter()
                .filter(|tab| needs_title_rewrite(tab, &host))
                .map(|tab| TitleWrite::new(tab.id, format_tab_title(tab, &host, true)))
                .collect()
        }
    }
}

/// React to `tabs.onUpdated`
pub fn handle_updated_tab(
    store: &mut HostStore,
    change: &TabChangeInfo,
    tab: &TabInfo,
) -> Option<TitleWrite> {
    if change.title.is_none() {
        return None;
    }

    let host_name = tab.host_name()?;
    store.host_by_host_name(&host_name)?;

    set_original_tab_title(store, tab, &host_name);

    let host = store.host_by_host_name(&host_name)?;
    if host.host_state && needs_title_rewrite(tab, host) && store.global_state() {
        Some(TitleWrite::new(tab.id, format_tab_title(tab, host, true)))
    } else {
        None
    }
}

/// Add a default configuration for the tab's hostname. Returns whether a
/// record was created; an existing one is left untouched.
pub fn add_host(store: &mut HostStore, tab: &TabInfo) -> Result<bool, TitlestError> {
    let host_name = tab
        .host_name()
        .ok_or_else(|| TitlestError::NoHostname(tab.url.clone().unwrap_or_default()))?;

    if store.host_by_host_name(&host_name).is_some() {
        return Ok(false);
    }

    log::info!("adding host {}", host_name);
    Ok(store.commit(Mutation::SetHost(HostConfig::new(tab.id, &host_name))))
}
