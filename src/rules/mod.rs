//! Rule surface: the `Rule` trait, preset assembly, and baseline rules.
//!
//! A preset is a `RuleConfig` bundling the rules an engine evaluates. The
//! baseline rules live one per file below and ship under the
//! `builtin-rules` feature; custom rules implement `Rule` and merge in via
//! `RuleConfig::with_rules`.

use crate::dom::Element;
use crate::report::Impact;
use std::sync::Arc;

#[cfg(feature = "builtin-rules")]
pub mod button_name;
#[cfg(feature = "builtin-rules")]
pub mod image_alt;
#[cfg(feature = "builtin-rules")]
pub mod input_label;
#[cfg(feature = "builtin-rules")]
pub mod link_name;

#[cfg(feature = "builtin-rules")]
pub use button_name::ButtonName;
#[cfg(feature = "builtin-rules")]
pub use image_alt::ImageAlt;
#[cfg(feature = "builtin-rules")]
pub use input_label::InputLabel;
#[cfg(feature = "builtin-rules")]
pub use link_name::LinkName;

/// One accessibility rule evaluated against a single element
pub trait Rule: Send + Sync {
    /// Stable rule identifier, e.g. "image-alt"
    fn id(&self) -> &'static str;

    /// What a failure of this rule means
    fn description(&self) -> &'static str;

    fn impact(&self) -> Impact;

    /// Whether the element violates this rule
    fn violates(&self, el: &Element) -> bool;
}

/// A named bundle of enabled rules
#[derive(Clone, Default)]
pub struct RuleConfig {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleConfig {
    /// A config with no rules enabled
    pub fn empty() -> Self {
        RuleConfig::default()
    }

    /// Merge additional rules into this config
    pub fn with_rules(mut self, extra: Vec<Arc<dyn Rule>>) -> Self {
        self.rules.extend(extra);
        self
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }
}

/// The baseline preset: every built-in rule enabled
#[cfg(feature = "builtin-rules")]
pub fn default_config() -> RuleConfig {
    RuleConfig::empty().with_rules(vec![
        Arc::new(ImageAlt) as Arc<dyn Rule>,
        Arc::new(LinkName),
        Arc::new(ButtonName),
        Arc::new(InputLabel),
    ])
}

/// Whether the element has a non-empty accessible name from text content,
/// `aria-label`, or `title`
#[cfg(feature = "builtin-rules")]
pub(crate) fn has_accessible_text(el: &Element) -> bool {
    if !el.text_content().trim().is_empty() {
        return true;
    }
    for attr in ["aria-label", "title"] {
        if el.attr(attr).map(|v| !v.trim().is_empty()).unwrap_or(false) {
            return true;
        }
    }
    false
}
