/// Data structures for Titlest
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Title given to a freshly added host
pub const DEFAULT_USER_TITLE: &str = " - Titlest";

/// Information about a browser tab
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: i32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
}

impl TabInfo {
    pub fn new(id: i32, url: &str, title: &str) -> TabInfo {
        TabInfo {
            id,
            url: Some(url.to_string()),
            title: Some(title.to_string()),
            fav_icon_url: None,
        }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn host_name(&self) -> Option<String> {
        self.url.as_deref().and_then(crate::hostname::extract_hostname)
    }

    /// Key of this tab in a host's original title cache
    pub fn cache_key(&self) -> String {
        self.id.to_string()
    }
}

/// Properties of a tab that changed, as reported by `tabs.onUpdated`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TabChangeInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Per-hostname title configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    pub id: i32,
    #[serde(default)]
    pub date: Option<f64>,
    pub host_state: bool,
    pub host_name: String,
    pub user_title: String,
    pub is_appended: bool,
    /// Tab id (as a string, the way JS object keys arrive) to unmodified title
    #[serde(default)]
    pub original_tab_titles: BTreeMap<String, String>,
    #[serde(default)]
    pub host_bindings: Vec<String>,
}

impl HostConfig {
    pub fn new(tab_id: i32, host_name: &str) -> HostConfig {
        HostConfig {
            id: tab_id,
            date: None,
            host_state: true,
            host_name: host_name.to_string(),
            user_title: DEFAULT_USER_TITLE.to_string(),
            is_appended: true,
            original_tab_titles: BTreeMap::new(),
            host_bindings: Vec::new(),
        }
    }

    pub fn original_tab_title(&self, tab_id: i32) -> Option<&str> {
        self.original_tab_titles
            .get(&tab_id.to_string())
            .map(String::as_str)
    }
}

/// Extension-wide switches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalOptions {
    pub global_state: bool,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        GlobalOptions { global_state: true }
    }
}
