//! Manifest derivation.
//!
//! The manifest template carries a single canonical `action` block. The host
//! platform expects that block under one of two mutually exclusive keys,
//! chosen by the `use_toolbar_button` setting of the merged defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::merge::merge_template;
use crate::{is_truthy, Document};

/// Key of the canonical action block in the manifest template.
pub const ACTION_KEY: &str = "action";

/// Config flag selecting the toolbar button integration.
pub const TOOLBAR_FLAG: &str = "use_toolbar_button";

/// Config flag selecting the menu-type action under [`ActionTypePolicy::SpamReportMenu`].
pub const SPAM_REPORT_FLAG: &str = "spam_report_enabled";

/// Errors for manifest derivation
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Manifest template has no \"action\" key")]
    MissingAction,

    #[error("Configuration is missing the \"{0}\" flag")]
    MissingFlag(String),

    #[error("Manifest \"action\" must be an object to carry a type")]
    ActionNotObject,

    #[error("Manifest is missing a string value at {0}")]
    MissingField(String),
}

/// Where the action block ends up in the derived manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSlot {
    /// Toolbar button (`browser_action`)
    BrowserAction,
    /// Message display integration (`message_display_action`)
    MessageDisplayAction,
}

impl ActionSlot {
    /// Pick the slot from the merged defaults document.
    pub fn from_config(config: &Document) -> Result<Self, ManifestError> {
        if flag(config, TOOLBAR_FLAG)? {
            Ok(ActionSlot::BrowserAction)
        } else {
            Ok(ActionSlot::MessageDisplayAction)
        }
    }

    /// Manifest key for this slot.
    pub fn key(self) -> &'static str {
        match self {
            ActionSlot::BrowserAction => "browser_action",
            ActionSlot::MessageDisplayAction => "message_display_action",
        }
    }
}

impl fmt::Display for ActionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Whether the action block gets a `type` field injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionTypePolicy {
    /// Move the action block as is.
    #[default]
    Unchanged,
    /// Set `type` to `"menu"` when spam reporting is enabled, `"button"` otherwise.
    SpamReportMenu,
}

impl ActionTypePolicy {
    fn apply(self, action: &mut Value, config: &Document) -> Result<(), ManifestError> {
        match self {
            ActionTypePolicy::Unchanged => Ok(()),
            ActionTypePolicy::SpamReportMenu => {
                let kind = if flag(config, SPAM_REPORT_FLAG)? {
                    "menu"
                } else {
                    "button"
                };
                let block = action.as_object_mut().ok_or(ManifestError::ActionNotObject)?;
                block.insert("type".to_string(), Value::String(kind.to_string()));
                Ok(())
            }
        }
    }
}

impl FromStr for ActionTypePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unchanged" => Ok(ActionTypePolicy::Unchanged),
            "spam-report-menu" => Ok(ActionTypePolicy::SpamReportMenu),
            other => Err(format!(
                "unknown action type policy '{}' (expected unchanged or spam-report-menu)",
                other
            )),
        }
    }
}

fn flag(config: &Document, name: &str) -> Result<bool, ManifestError> {
    config
        .get(name)
        .map(is_truthy)
        .ok_or_else(|| ManifestError::MissingFlag(name.to_string()))
}

/// Merge manifest overrides onto the template and move `action` into its slot.
///
/// Fails with [`ManifestError::MissingAction`] when the merged manifest has no
/// `action` key; no partial manifest is returned.
pub fn derive_manifest(
    template: Document,
    overrides: Document,
    config: &Document,
    policy: ActionTypePolicy,
) -> Result<Document, ManifestError> {
    let mut manifest = merge_template(template, overrides);

    let mut action = manifest
        .remove(ACTION_KEY)
        .ok_or(ManifestError::MissingAction)?;
    let slot = ActionSlot::from_config(config)?;
    policy.apply(&mut action, config)?;

    manifest.insert(slot.key().to_string(), action);
    Ok(manifest)
}

/// Identifier used to name the packaged archive: `<gecko id>-<version>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginId {
    pub gecko_id: String,
    pub version: String,
}

impl PluginId {
    /// Read the gecko id and version from a derived manifest.
    ///
    /// The id is looked up under `applications.gecko.id`, then
    /// `browser_specific_settings.gecko.id`.
    pub fn from_manifest(manifest: &Document) -> Result<Self, ManifestError> {
        let gecko_id = ["applications", "browser_specific_settings"]
            .iter()
            .find_map(|root| {
                manifest
                    .get(*root)
                    .and_then(|v| v.get("gecko"))
                    .and_then(|v| v.get("id"))
                    .and_then(Value::as_str)
            })
            .ok_or_else(|| ManifestError::MissingField("applications.gecko.id".to_string()))?;

        let version = manifest
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| ManifestError::MissingField("version".to_string()))?;

        Ok(Self {
            gecko_id: gecko_id.to_string(),
            version: version.to_string(),
        })
    }

    /// File name of the packaged archive.
    pub fn archive_name(&self) -> String {
        format!("{}.xpi", self)
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.gecko_id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn template() -> Document {
        doc(json!({
            "manifest_version": 2,
            "name": "__MSG_extensionName__",
            "version": "1.0.0",
            "action": {
                "default_title": "Report",
                "default_icon": "images/icon.png"
            }
        }))
    }

    #[test]
    fn test_toolbar_button_selects_browser_action() {
        let config = doc(json!({"use_toolbar_button": true}));
        let original_action = template()["action"].clone();

        let manifest =
            derive_manifest(template(), Document::new(), &config, ActionTypePolicy::Unchanged)
                .unwrap();

        assert!(!manifest.contains_key("action"));
        assert!(!manifest.contains_key("message_display_action"));
        assert_eq!(manifest["browser_action"], original_action);
    }

    #[test]
    fn test_no_toolbar_button_selects_message_display_action() {
        let config = doc(json!({"use_toolbar_button": false}));
        let original_action = template()["action"].clone();

        let manifest =
            derive_manifest(template(), Document::new(), &config, ActionTypePolicy::Unchanged)
                .unwrap();

        assert!(!manifest.contains_key("action"));
        assert!(!manifest.contains_key("browser_action"));
        assert_eq!(manifest["message_display_action"], original_action);
    }

    #[test]
    fn test_end_to_end_minimal() {
        let manifest = derive_manifest(
            doc(json!({"action": {"default_title": "X"}})),
            Document::new(),
            &doc(json!({"use_toolbar_button": true})),
            ActionTypePolicy::Unchanged,
        )
        .unwrap();

        assert_eq!(
            Value::Object(manifest),
            json!({"browser_action": {"default_title": "X"}})
        );
    }

    #[test]
    fn test_overrides_applied_before_rename() {
        let overrides = doc(json!({
            "version": "2.0.0",
            "action": {"default_title": "Phish!"}
        }));
        let config = doc(json!({"use_toolbar_button": 0}));

        let manifest =
            derive_manifest(template(), overrides, &config, ActionTypePolicy::Unchanged).unwrap();

        assert_eq!(manifest["version"], "2.0.0");
        assert_eq!(
            manifest["message_display_action"],
            json!({"default_title": "Phish!", "default_icon": "images/icon.png"})
        );
    }

    #[test]
    fn test_override_can_supply_missing_action() {
        let manifest = derive_manifest(
            doc(json!({"name": "n"})),
            doc(json!({"action": {"default_title": "X"}})),
            &doc(json!({"use_toolbar_button": true})),
            ActionTypePolicy::Unchanged,
        )
        .unwrap();
        assert_eq!(manifest["browser_action"]["default_title"], "X");
    }

    #[test]
    fn test_missing_action_fails() {
        let err = derive_manifest(
            doc(json!({"name": "n"})),
            Document::new(),
            &doc(json!({"use_toolbar_button": true})),
            ActionTypePolicy::Unchanged,
        )
        .unwrap_err();
        assert_eq!(err, ManifestError::MissingAction);
    }

    #[test]
    fn test_missing_toolbar_flag_fails() {
        let err = derive_manifest(
            template(),
            Document::new(),
            &Document::new(),
            ActionTypePolicy::Unchanged,
        )
        .unwrap_err();
        assert_eq!(err, ManifestError::MissingFlag(TOOLBAR_FLAG.to_string()));
    }

    #[test]
    fn test_unchanged_policy_adds_no_type() {
        let config = doc(json!({"use_toolbar_button": true, "spam_report_enabled": true}));
        let manifest =
            derive_manifest(template(), Document::new(), &config, ActionTypePolicy::Unchanged)
                .unwrap();
        assert!(manifest["browser_action"].get("type").is_none());
    }

    #[test]
    fn test_spam_report_policy_menu() {
        let config = doc(json!({"use_toolbar_button": true, "spam_report_enabled": true}));
        let manifest = derive_manifest(
            template(),
            Document::new(),
            &config,
            ActionTypePolicy::SpamReportMenu,
        )
        .unwrap();
        assert_eq!(manifest["browser_action"]["type"], "menu");
        assert_eq!(manifest["browser_action"]["default_title"], "Report");
    }

    #[test]
    fn test_spam_report_policy_button() {
        let config = doc(json!({"use_toolbar_button": false, "spam_report_enabled": false}));
        let manifest = derive_manifest(
            template(),
            Document::new(),
            &config,
            ActionTypePolicy::SpamReportMenu,
        )
        .unwrap();
        assert_eq!(manifest["message_display_action"]["type"], "button");
    }

    #[test]
    fn test_spam_report_policy_requires_flag() {
        let config = doc(json!({"use_toolbar_button": true}));
        let err = derive_manifest(
            template(),
            Document::new(),
            &config,
            ActionTypePolicy::SpamReportMenu,
        )
        .unwrap_err();
        assert_eq!(err, ManifestError::MissingFlag(SPAM_REPORT_FLAG.to_string()));
    }

    #[test]
    fn test_spam_report_policy_rejects_scalar_action() {
        let config = doc(json!({"use_toolbar_button": true, "spam_report_enabled": true}));
        let err = derive_manifest(
            doc(json!({"action": "button"})),
            Document::new(),
            &config,
            ActionTypePolicy::SpamReportMenu,
        )
        .unwrap_err();
        assert_eq!(err, ManifestError::ActionNotObject);
    }

    #[test]
    fn test_action_slot_keys() {
        assert_eq!(ActionSlot::BrowserAction.key(), "browser_action");
        assert_eq!(ActionSlot::MessageDisplayAction.key(), "message_display_action");
        assert_eq!(
            ActionSlot::from_config(&doc(json!({"use_toolbar_button": "yes"}))).unwrap(),
            ActionSlot::BrowserAction
        );
        assert_eq!(
            ActionSlot::from_config(&doc(json!({"use_toolbar_button": null}))).unwrap(),
            ActionSlot::MessageDisplayAction
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "unchanged".parse::<ActionTypePolicy>().unwrap(),
            ActionTypePolicy::Unchanged
        );
        assert_eq!(
            "spam-report-menu".parse::<ActionTypePolicy>().unwrap(),
            ActionTypePolicy::SpamReportMenu
        );
        assert!("menu".parse::<ActionTypePolicy>().is_err());

        let policy: ActionTypePolicy = serde_json::from_value(json!("spam-report-menu")).unwrap();
        assert_eq!(policy, ActionTypePolicy::SpamReportMenu);
    }

    #[test]
    fn test_plugin_id_from_applications() {
        let manifest = doc(json!({
            "version": "1.2.3",
            "applications": {"gecko": {"id": "reporter@example.com"}}
        }));
        let id = PluginId::from_manifest(&manifest).unwrap();
        assert_eq!(id.to_string(), "reporter@example.com-1.2.3");
        assert_eq!(id.archive_name(), "reporter@example.com-1.2.3.xpi");
    }

    #[test]
    fn test_plugin_id_from_browser_specific_settings() {
        let manifest = doc(json!({
            "version": "4.0",
            "browser_specific_settings": {"gecko": {"id": "x@y"}}
        }));
        let id = PluginId::from_manifest(&manifest).unwrap();
        assert_eq!(id.gecko_id, "x@y");
        assert_eq!(id.version, "4.0");
    }

    #[test]
    fn test_plugin_id_missing_fields() {
        let err = PluginId::from_manifest(&doc(json!({"version": "1"}))).unwrap_err();
        assert_eq!(err, ManifestError::MissingField("applications.gecko.id".to_string()));

        let err = PluginId::from_manifest(&doc(json!({
            "applications": {"gecko": {"id": "a@b"}}
        })))
        .unwrap_err();
        assert_eq!(err, ManifestError::MissingField("version".to_string()));
    }
}
