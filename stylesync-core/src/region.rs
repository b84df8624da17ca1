//! Style region lookup.
//!
//! A style region starts with `<style>` (or `<style ATTR>`, e.g. `<style module>`)
//! and ends at the nearest following `</style>`.
//! Only the first region in a component is ever touched.

use std::{fmt, ops::Range};

use regex::Regex;

use crate::{Error, Result};

/// Start marker of a style region, with optional attribute token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleMarker {
    attribute: Option<String>,
}

impl StyleMarker {
    pub const END_TAG: &'static str = "</style>";

    /// Bare `<style>` marker.
    pub fn plain() -> Self {
        Self { attribute: None }
    }

    /// Marker with attribute token, `module` gives `<style module>`.
    pub fn with_attribute(attribute: impl Into<String>) -> Result<Self> {
        let attribute = attribute.into();
        if attribute.trim().is_empty() || attribute.contains(['<', '>']) {
            return Err(Error::InvalidMarker(attribute));
        }
        Ok(Self {
            attribute: Some(attribute),
        })
    }

    /// Empty attribute means plain marker.
    pub fn from_attribute(attribute: Option<&str>) -> Result<Self> {
        match attribute {
            Some(attribute) if !attribute.is_empty() => Self::with_attribute(attribute),
            _ => Ok(Self::plain()),
        }
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn start_tag(&self) -> String {
        match &self.attribute {
            Some(attribute) => format!("<style {attribute}>"),
            None => "<style>".to_string(),
        }
    }
}

impl fmt::Display for StyleMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.start_tag())
    }
}

#[derive(Clone, Debug)]
pub struct StyleRegion {
    marker: StyleMarker,
    pattern: Regex,
}

impl StyleRegion {
    pub fn new(marker: StyleMarker) -> Result<Self> {
        // Both tags are escaped, so the pattern is always valid.
        let source = format!(
            "(?s){}.*?{}",
            regex::escape(&marker.start_tag()),
            regex::escape(StyleMarker::END_TAG)
        );
        let pattern = Regex::new(&source).map_err(|e| Error::InvalidMarker(e.to_string()))?;
        Ok(Self { marker, pattern })
    }

    pub fn marker(&self) -> &StyleMarker {
        &self.marker
    }

    /// Byte range of the first region, tags included.
    pub fn find(&self, component: &str) -> Option<Range<usize>> {
        self.pattern.find(component).map(|m| m.range())
    }

    /// Returns component text with the first region's content replaced by `css`.
    /// `css` is inserted verbatim. Returns `None` if there is no region.
    pub fn synchronize(&self, component: &str, css: &str) -> Option<String> {
        let range = self.find(component)?;
        let start_tag = self.marker.start_tag();

        let mut result = String::with_capacity(component.len() + css.len());
        result.push_str(&component[..range.start]);
        result.push_str(&start_tag);
        result.push('\n');
        result.push_str(css);
        result.push('\n');
        result.push_str(StyleMarker::END_TAG);
        result.push_str(&component[range.end..]);
        Some(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain() -> StyleRegion {
        StyleRegion::new(StyleMarker::plain()).unwrap()
    }

    #[test]
    fn test_replace_region_content() {
        let component = "<template></template>\n<style>\n.old{}\n</style>";
        let result = plain().synchronize(component, ".btn{color:red}").unwrap();
        assert_eq!(
            result,
            "<template></template>\n<style>\n.btn{color:red}\n</style>"
        );
    }

    #[test]
    fn test_prefix_and_suffix_untouched() {
        let component = "<script>\n  export let mode;\n</script>\r\n\n<style>a{}</style>\n<!-- tail -->\n";
        let result = plain().synchronize(component, ".btn{}").unwrap();
        assert_eq!(
            result,
            "<script>\n  export let mode;\n</script>\r\n\n<style>\n.btn{}\n</style>\n<!-- tail -->\n"
        );
    }

    #[test]
    fn test_only_first_region_replaced() {
        let component = "<style>\none\n</style>\n<style>\ntwo\n</style>";
        let result = plain().synchronize(component, "new").unwrap();
        assert_eq!(result, "<style>\nnew\n</style>\n<style>\ntwo\n</style>");
    }

    #[test]
    fn test_idempotent() {
        let css = ".btn {\n  padding: 0.5em;\n}\n";
        let component = "<button class={classes}>Go</button>\n<style>\n</style>\n";
        let first = plain().synchronize(component, css).unwrap();
        let second = plain().synchronize(&first, css).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_css_is_not_a_template() {
        let css = ".btn::after { content: \"$0 $1 ${name}\"; }";
        let result = plain().synchronize("<style></style>", css).unwrap();
        assert_eq!(result, format!("<style>\n{css}\n</style>"));
    }

    #[test]
    fn test_no_region() {
        assert_eq!(plain().synchronize("<template></template>", "a{}"), None);
        assert_eq!(plain().synchronize("<style>\nunclosed", "a{}"), None);
    }

    #[test]
    fn test_module_marker() {
        let module = StyleRegion::new(StyleMarker::with_attribute("module").unwrap()).unwrap();
        let component = "<template>\n  <button :class=\"classes\">Go</button>\n</template>\n<style module>\n.old{}\n</style>\n";
        let result = module.synchronize(component, ".btn{}").unwrap();
        assert_eq!(
            result,
            "<template>\n  <button :class=\"classes\">Go</button>\n</template>\n<style module>\n.btn{}\n</style>\n"
        );

        // Markers do not match each other's regions.
        assert_eq!(plain().find(component), None);
        assert_eq!(module.find("<style>\n</style>"), None);
    }

    #[test]
    fn test_marker_validation() {
        assert!(StyleMarker::with_attribute("").is_err());
        assert!(StyleMarker::with_attribute("  ").is_err());
        assert!(StyleMarker::with_attribute("module>").is_err());
        assert_eq!(
            StyleMarker::with_attribute("lang=\"scss\"").unwrap().start_tag(),
            "<style lang=\"scss\">"
        );
        assert_eq!(StyleMarker::from_attribute(Some("")).unwrap(), StyleMarker::plain());
        assert_eq!(StyleMarker::plain().to_string(), "<style>");
    }
}
