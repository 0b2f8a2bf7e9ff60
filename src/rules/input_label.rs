/// Text-entry inputs must have a label source
use crate::dom::Element;
use crate::report::Impact;

use super::Rule;

/// Input types that carry a default or irrelevant label
const EXEMPT_TYPES: &[&str] = &["hidden", "submit", "reset", "button"];

pub struct InputLabel;

impl Rule for InputLabel {
    fn id(&self) -> &'static str {
        "input-label"
    }

    fn description(&self) -> &'static str {
        "Form inputs must have a label"
    }

    fn impact(&self) -> Impact {
        Impact::Serious
    }

    fn violates(&self, el: &Element) -> bool {
        if el.tag() != "input" {
            return false;
        }
        let kind = el.attr("type").unwrap_or("text");
        if EXEMPT_TYPES.contains(&kind) {
            return false;
        }
        for attr in ["aria-label", "aria-labelledby", "title"] {
            if el.attr(attr).map(|v| !v.trim().is_empty()).unwrap_or(false) {
                return false;
            }
        }
        true
    }
}
