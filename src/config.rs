//! Configuration surface consumed at dispatch and render time.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::message::Severity;
use crate::policy::AllowSpec;

/// Settings read by the dispatcher, the policy engine and the response
/// lifecycle.
///
/// Every field has a defined default; the ones that are only required
/// in specific situations (message tags, modal template, messages
/// template) raise a configuration error at the point of use rather
/// than at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HxConfig {
    /// Allow handlers for views of the same owning app by default.
    pub enforce_same_app: bool,
    /// Handlers allowed everywhere, regardless of view-local rules.
    pub global_allow: Option<AllowSpec>,
    /// Deny unauthenticated fragment requests outright.
    pub require_auth: bool,
    /// Handlers exempt from the authentication gate.
    pub unauthenticated_allow: Option<AllowSpec>,
    /// Render queued messages into fragment responses.
    pub use_messages: bool,
    /// Severity to display-tag mapping. Required when `use_messages`
    /// is on.
    pub message_tags: BTreeMap<Severity, String>,
    /// Template rendering the queued messages. Required the first time
    /// a fragment response carries a message.
    pub messages_template: Option<String>,
    /// Shared modal shell template. Required when a modal handler is
    /// invoked.
    pub modal_template: Option<String>,
    /// DOM id of the modal container element.
    pub modal_container_id: String,
    /// CSS selector for the modal body, the retarget destination when
    /// a modal form fails validation.
    pub modal_body_selector: String,
}

impl Default for HxConfig {
    fn default() -> Self {
        Self {
            enforce_same_app: true,
            global_allow: None,
            require_auth: false,
            unauthenticated_allow: None,
            use_messages: false,
            message_tags: BTreeMap::new(),
            messages_template: None,
            modal_template: None,
            modal_container_id: "hx_modal_container".to_string(),
            modal_body_selector: "#hx_modal_body".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::OwnerRule;

    #[test]
    fn test_defaults() {
        let config = HxConfig::default();
        assert!(config.enforce_same_app);
        assert!(!config.require_auth);
        assert!(!config.use_messages);
        assert_eq!(config.modal_container_id, "hx_modal_container");
        assert_eq!(config.modal_body_selector, "#hx_modal_body");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: HxConfig = serde_json::from_str(
            r#"{
                "require_auth": true,
                "global_allow": {"blog": "__all__"},
                "message_tags": {"success": "alert-success"}
            }"#,
        )
        .unwrap();
        assert!(config.require_auth);
        // Untouched fields keep their defaults.
        assert!(config.enforce_same_app);
        assert_eq!(
            config.message_tags.get(&Severity::Success).map(String::as_str),
            Some("alert-success")
        );
        match config.global_allow {
            Some(AllowSpec::PerOwner(rules)) => {
                assert_eq!(rules.get("blog"), Some(&OwnerRule::All));
            }
            other => panic!("unexpected allow spec: {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_rejects_malformed_allow_spec() {
        // An allow-spec that is neither an owner list nor an
        // owner-to-rule mapping must fail at load time.
        let result: std::result::Result<HxConfig, _> =
            serde_json::from_str(r#"{"global_allow": 17}"#);
        assert!(result.is_err());
    }
}
