/// Buttons must have an accessible name
use crate::dom::Element;
use crate::report::Impact;

use super::{has_accessible_text, Rule};

pub struct ButtonName;

impl Rule for ButtonName {
    fn id(&self) -> &'static str {
        "button-name"
    }

    fn description(&self) -> &'static str {
        "Buttons must have discernible text"
    }

    fn impact(&self) -> Impact {
        Impact::Critical
    }

    fn violates(&self, el: &Element) -> bool {
        el.tag() == "button" && !has_accessible_text(el)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn first_element(html: &str) -> Element {
        Document::from_body_html(html).body_elements().remove(0)
    }

    #[test]
    fn empty_button_violates() {
        assert!(ButtonName.violates(&first_element("<button></button>")));
    }

    #[test]
    fn labelled_buttons_pass() {
        assert!(!ButtonName.violates(&first_element("<button>Save</button>")));
        assert!(!ButtonName.violates(&first_element(
            "<button aria-label=\"save\"></button>"
        )));
        // Text anywhere in the subtree counts
        assert!(!ButtonName.violates(&first_element(
            "<button><span>Save</span></button>"
        )));
    }
}
