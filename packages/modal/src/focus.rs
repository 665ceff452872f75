//! # Focus trap
//!
//! While a modal is open, Tab and Shift+Tab must cycle through the dialog's
//! focusable descendants and never leave the dialog.
//!
//! The focusable set is defined once, as [`FOCUSABLE_SELECTOR`] for hosts with a
//! real selector engine and as [`is_focusable`] for hosts without one. Both
//! must agree.
//!
//! [`on_tab`] is the decision procedure. It is pure: it takes the ordered
//! focusable set and the active element, and returns a [`TrapAction`] that the
//! controller applies to the document.

/// CSS selector for the focusable set.
pub const FOCUSABLE_SELECTOR: &str = concat!(
    "a[href]:not([tabindex=\"-1\"]), ",
    "area[href]:not([tabindex=\"-1\"]), ",
    "input:not([type=\"hidden\"]):not([disabled]):not([tabindex=\"-1\"]), ",
    "select:not([disabled]):not([tabindex=\"-1\"]), ",
    "textarea:not([disabled]):not([tabindex=\"-1\"]), ",
    "button:not([disabled]):not([tabindex=\"-1\"]), ",
    "[tabindex=\"0\"]",
);

/// Selector-free equivalent of [`FOCUSABLE_SELECTOR`].
///
/// `attr` looks up an attribute on the element by name.
pub fn is_focusable<'a>(tag: &str, attr: impl Fn(&str) -> Option<&'a str>) -> bool {
    match attr("tabindex") {
        Some("-1") => return false,
        Some("0") => return true,
        _ => {}
    }
    match tag.to_ascii_lowercase().as_str() {
        "a" | "area" => attr("href").is_some(),
        "input" if attr("type").is_some_and(|ty| ty.eq_ignore_ascii_case("hidden")) => false,
        "input" | "select" | "textarea" | "button" => attr("disabled").is_none(),
        _ => false,
    }
}

/// What the trap does with a Tab keydown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrapAction<N> {
    /// Let the browser move focus to the next element.
    Allow,
    /// Block navigation and leave focus where it is.
    Suppress,
    /// Block navigation and focus the given element instead.
    MoveTo(N),
}

/// Decide how a Tab (or Shift+Tab when `shift`) keydown is handled.
pub fn on_tab<N: Clone + PartialEq>(
    focusable: &[N],
    current: Option<&N>,
    shift: bool,
) -> TrapAction<N> {
    let (Some(first), Some(last)) = (focusable.first(), focusable.last()) else {
        return TrapAction::Suppress;
    };

    match current {
        Some(current) if shift && current == first => TrapAction::MoveTo(last.clone()),
        Some(current) if !shift && current == last => TrapAction::MoveTo(first.clone()),
        Some(current) if focusable.contains(current) => TrapAction::Allow,
        _ => TrapAction::MoveTo(first.clone()),
    }
}

/// [`on_tab`] over positions in a set of `len` elements, for hosts that
/// always block the browser's navigation and move focus themselves.
///
/// Returns the index to focus, or `None` to leave focus where it is.
pub fn step_index(len: usize, current: Option<usize>, shift: bool) -> Option<usize> {
    let positions: Vec<usize> = (0..len).collect();
    match on_tab(&positions, current.as_ref(), shift) {
        TrapAction::Suppress => None,
        TrapAction::MoveTo(index) => Some(index),
        TrapAction::Allow => current.map(|i| if shift { i - 1 } else { i + 1 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn focusable(tag: &str, attrs: &[(&str, &str)]) -> bool {
        let attrs: HashMap<&str, &str> = attrs.iter().copied().collect();
        is_focusable(tag, |name| attrs.get(name).copied())
    }

    #[test]
    fn test_native_controls() {
        assert!(focusable("input", &[]));
        assert!(focusable("SELECT", &[]));
        assert!(focusable("textarea", &[]));
        assert!(focusable("button", &[]));
        assert!(!focusable("button", &[("disabled", "")]));
        assert!(!focusable("input", &[("disabled", "disabled")]));
    }

    #[test]
    fn test_hidden_inputs_are_skipped() {
        assert!(!focusable("input", &[("type", "hidden")]));
        assert!(!focusable("INPUT", &[("type", "Hidden"), ("name", "csrf")]));
        assert!(focusable("input", &[("type", "text")]));
        assert!(FOCUSABLE_SELECTOR.contains("input:not([type=\"hidden\"])"));
    }

    #[test]
    fn test_links_need_href() {
        assert!(focusable("a", &[("href", "#")]));
        assert!(!focusable("a", &[]));
        assert!(focusable("area", &[("href", "/map")]));
        assert!(!focusable("area", &[]));
    }

    #[test]
    fn test_tabindex() {
        assert!(focusable("div", &[("tabindex", "0")]));
        assert!(!focusable("div", &[]));
        assert!(!focusable("div", &[("tabindex", "1")]));
        assert!(!focusable("input", &[("tabindex", "-1")]));
        assert!(!focusable("a", &[("href", "#"), ("tabindex", "-1")]));
    }

    #[test]
    fn test_empty_set_suppresses() {
        assert_eq!(on_tab::<u32>(&[], None, false), TrapAction::Suppress);
        assert_eq!(on_tab::<u32>(&[], Some(&7), true), TrapAction::Suppress);
    }

    #[test]
    fn test_wraps_forward_and_backward() {
        let set = [1, 2, 3];
        assert_eq!(on_tab(&set, Some(&3), false), TrapAction::MoveTo(1));
        assert_eq!(on_tab(&set, Some(&1), true), TrapAction::MoveTo(3));
    }

    #[test]
    fn test_allows_movement_inside_set() {
        let set = [1, 2, 3];
        assert_eq!(on_tab(&set, Some(&1), false), TrapAction::Allow);
        assert_eq!(on_tab(&set, Some(&2), false), TrapAction::Allow);
        assert_eq!(on_tab(&set, Some(&3), true), TrapAction::Allow);
    }

    #[test]
    fn test_escaped_focus_returns_to_first() {
        let set = [1, 2, 3];
        assert_eq!(on_tab(&set, Some(&9), false), TrapAction::MoveTo(1));
        assert_eq!(on_tab(&set, Some(&9), true), TrapAction::MoveTo(1));
        assert_eq!(on_tab(&set, None, false), TrapAction::MoveTo(1));
    }

    #[test]
    fn test_single_element_stays_put() {
        let set = [5];
        assert_eq!(on_tab(&set, Some(&5), false), TrapAction::MoveTo(5));
        assert_eq!(on_tab(&set, Some(&5), true), TrapAction::MoveTo(5));
    }

    #[test]
    fn test_step_index() {
        assert_eq!(step_index(0, None, false), None);
        assert_eq!(step_index(3, Some(0), false), Some(1));
        assert_eq!(step_index(3, Some(2), true), Some(1));
        assert_eq!(step_index(3, Some(2), false), Some(0));
        assert_eq!(step_index(3, Some(0), true), Some(2));
        assert_eq!(step_index(3, None, true), Some(0));
        assert_eq!(step_index(1, Some(0), false), Some(0));
    }
}
