/// Links with an `href` must have discernible text
use crate::dom::Element;
use crate::report::Impact;

use super::{has_accessible_text, Rule};

pub struct LinkName;

impl Rule for LinkName {
    fn id(&self) -> &'static str {
        "link-name"
    }

    fn description(&self) -> &'static str {
        "Links must have discernible text"
    }

    fn impact(&self) -> Impact {
        Impact::Serious
    }

    fn violates(&self, el: &Element) -> bool {
        el.tag() == "a" && el.has_attr("href") && !has_accessible_text(el)
    }
}
