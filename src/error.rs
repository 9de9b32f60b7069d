/// Error type shared by the background page and the popup
use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum TitlestError {
    /// A call through the JS bridge rejected
    #[error("{context}: {message}")]
    Js { context: &'static str, message: String },

    /// A value could not cross the JS boundary
    #[error("serialization failed: {0}")]
    Serde(#[from] serde_wasm_bindgen::Error),

    #[error("no hostname in tab url '{0}'")]
    NoHostname(String),
}

impl TitlestError {
    /// Wrap a rejected bridge promise, keeping what we were doing
    pub fn js(context: &'static str, value: JsValue) -> Self {
        TitlestError::Js {
            context,
            message: format!("{:?}", value),
        }
    }
}
