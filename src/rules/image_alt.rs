/// Images must have an `alt` attribute; an empty one marks decoration
use crate::dom::Element;
use crate::report::Impact;

use super::Rule;

pub struct ImageAlt;

impl Rule for ImageAlt {
    fn id(&self) -> &'static str {
        "image-alt"
    }

    fn description(&self) -> &'static str {
        "Images must have alternate text"
    }

    fn impact(&self) -> Impact {
        Impact::Critical
    }

    fn violates(&self, el: &Element) -> bool {
        el.tag() == "img" && !el.has_attr("alt")
    }
}
