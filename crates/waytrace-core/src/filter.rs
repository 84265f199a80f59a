//! Include/exclude event filtering
//!
//! `-f`/`-F` arguments compile into a [`FilterSet`] consulted once per
//! event, before any formatting work happens.

use std::convert::Infallible;
use std::str::FromStr;

/// A single `interface[:event]` filter argument.
///
/// A rule without an event name matches every event of that interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub interface: String,
    pub event: Option<String>,
}

impl FilterRule {
    fn matches(&self, interface: &str, event: &str) -> bool {
        self.interface == interface && self.event.as_deref().map_or(true, |e| e == event)
    }
}

impl FromStr for FilterRule {
    type Err = Infallible;

    /// `wl_pointer` matches all pointer events; `wl_pointer:motion` matches
    /// only motion events.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (interface, event) = match s.split_once(':') {
            Some((interface, event)) => (interface.to_string(), Some(event.to_string())),
            None => (s.to_string(), None),
        };
        Ok(FilterRule { interface, event })
    }
}

/// Ordered include and exclude rules, built once at startup and immutable
/// for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    include: Vec<FilterRule>,
    exclude: Vec<FilterRule>,
}

impl FilterSet {
    pub fn new(include: Vec<FilterRule>, exclude: Vec<FilterRule>) -> Self {
        Self { include, exclude }
    }

    /// Whether an event named `event` on `interface` should be printed.
    ///
    /// With include rules present, at least one must match; independently,
    /// any matching exclude rule suppresses the event. An exclude rule can
    /// therefore veto an event an include rule admitted.
    pub fn should_emit(&self, interface: &str, event: &str) -> bool {
        let passes_include =
            self.include.is_empty() || self.include.iter().any(|r| r.matches(interface, event));
        let passes_exclude = !self.exclude.iter().any(|r| r.matches(interface, event));
        passes_include && passes_exclude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(s: &str) -> FilterRule {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_interface_only() {
        let r = rule("wl_pointer");
        assert_eq!(r.interface, "wl_pointer");
        assert_eq!(r.event, None);
    }

    #[test]
    fn test_parse_interface_and_event() {
        let r = rule("wl_pointer:motion");
        assert_eq!(r.interface, "wl_pointer");
        assert_eq!(r.event.as_deref(), Some("motion"));
    }

    #[test]
    fn test_no_rules_shows_everything() {
        let filters = FilterSet::default();
        assert!(filters.should_emit("wl_pointer", "motion"));
        assert!(filters.should_emit("wl_seat", "name"));
    }

    #[test]
    fn test_include_only_matching_interface() {
        let filters = FilterSet::new(vec![rule("wl_seat")], vec![]);
        assert!(filters.should_emit("wl_seat", "capabilities"));
        assert!(filters.should_emit("wl_seat", "name"));
        assert!(!filters.should_emit("wl_pointer", "motion"));
    }

    #[test]
    fn test_include_with_event_name() {
        let filters = FilterSet::new(vec![rule("wl_pointer:button")], vec![]);
        assert!(filters.should_emit("wl_pointer", "button"));
        assert!(!filters.should_emit("wl_pointer", "motion"));
    }

    #[test]
    fn test_exclude_only_hides_matches() {
        let filters = FilterSet::new(vec![], vec![rule("wl_pointer:motion")]);
        assert!(!filters.should_emit("wl_pointer", "motion"));
        assert!(filters.should_emit("wl_pointer", "button"));
        assert!(filters.should_emit("wl_seat", "name"));
    }

    #[test]
    fn test_exclude_vetoes_include_match() {
        // include wl_seat, exclude wl_seat:name: capabilities shown, name hidden
        let filters = FilterSet::new(vec![rule("wl_seat")], vec![rule("wl_seat:name")]);
        assert!(filters.should_emit("wl_seat", "capabilities"));
        assert!(!filters.should_emit("wl_seat", "name"));
        assert!(!filters.should_emit("wl_pointer", "motion"));
    }

    #[test]
    fn test_multiple_include_rules() {
        let filters = FilterSet::new(vec![rule("wl_keyboard:key"), rule("wl_touch")], vec![]);
        assert!(filters.should_emit("wl_keyboard", "key"));
        assert!(!filters.should_emit("wl_keyboard", "modifiers"));
        assert!(filters.should_emit("wl_touch", "down"));
    }
}
