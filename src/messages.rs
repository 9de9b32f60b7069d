/// Runtime messages exchanged between the popup and the background page
use crate::error::TitlestError;
use crate::host_data::HostConfig;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UpdateTabsAction {
    SetTabsToOriginalTabTitles,
    SetTabsToUserTitle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuntimeMessage {
    /// Retitle the tabs of one host from the attached snapshot
    UpdateTabs {
        host: HostConfig,
        action: UpdateTabsAction,
    },
    /// The global switch flipped
    SetTabsToGlobalState,
    /// Saved hosts changed; rebuild caches and titles
    UpdateSavedTabs,
    #[serde(other)]
    Unknown,
}

impl RuntimeMessage {
    pub fn update_tabs(host: &HostConfig) -> Self {
        let action = if host.host_state {
            UpdateTabsAction::SetTabsToUserTitle
        } else {
            UpdateTabsAction::SetTabsToOriginalTabTitles
        };
        RuntimeMessage::UpdateTabs {
            host: host.clone(),
            action,
        }
    }

    /// Plain JS object for `runtime.sendMessage`, host maps included
    pub fn to_js(&self) -> Result<JsValue, TitlestError> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        Ok(self.serialize(&serializer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_tabs() {
        let json = r#"{
            "type": "updateTabs",
            "action": "setTabsToOriginalTabTitles",
            "host": {
                "id": 1,
                "hostState": false,
                "hostName": "github.com",
                "userTitle": " - Titlest",
                "isAppended": true,
                "originalTabTitles": { "1": "GitHub" },
                "hostBindings": []
            }
        }"#;

        let message: RuntimeMessage = serde_json::from_str(json).unwrap();

        match message {
            RuntimeMessage::UpdateTabs { host, action } => {
                assert_eq!(host.host_name, "github.com");
                assert_eq!(host.original_tab_title(1), Some("GitHub"));
                assert_eq!(action, UpdateTabsAction::SetTabsToOriginalTabTitles);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_parse_unit_messages() {
        let global: RuntimeMessage =
            serde_json::from_str(r#"{ "type": "setTabsToGlobalState" }"#).unwrap();
        let saved: RuntimeMessage =
            serde_json::from_str(r#"{ "type": "updateSavedTabs" }"#).unwrap();

        assert_eq!(global, RuntimeMessage::SetTabsToGlobalState);
        assert_eq!(saved, RuntimeMessage::UpdateSavedTabs);
    }

    #[test]
    fn test_parse_unknown_type() {
        let message: RuntimeMessage =
            serde_json::from_str(r#"{ "type": "somethingElse" }"#).unwrap();
        assert_eq!(message, RuntimeMessage::Unknown);
    }

    #[test]
    fn test_update_tabs_action_follows_host_state() {
        let mut host = HostConfig::new(1, "github.com");
        assert!(matches!(
            RuntimeMessage::update_tabs(&host),
            RuntimeMessage::UpdateTabs { action: UpdateTabsAction::SetTabsToUserTitle, .. }
        ));

        host.host_state = false;
        assert!(matches!(
            RuntimeMessage::update_tabs(&host),
            RuntimeMessage::UpdateTabs { action: UpdateTabsAction::SetTabsToOriginalTabTitles, .. }
        ));
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(RuntimeMessage::SetTabsToGlobalState).unwrap();
        assert_eq!(json["type"], "setTabsToGlobalState");
    }
}
