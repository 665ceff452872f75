//! Inline style maps for the overlay and dialog nodes.
//!
//! Callers pass overrides; [`StyleMap::merged_over`] lays them on top of the
//! built-in defaults, property by property.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// CSS property name to value, rendered as an inline `style` attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleMap(BTreeMap<String, String>);

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set one property.
    pub fn with(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(property, value);
        self
    }

    pub fn insert(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.0.insert(property.into(), value.into());
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of `base` with every property of `self` written over it.
    pub fn merged_over(&self, base: &StyleMap) -> StyleMap {
        let mut merged = base.clone();
        merged
            .0
            .extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Serialize as CSS declarations, e.g. `"display: flex; top: 0;"`.
    pub fn to_css(&self) -> String {
        self.0
            .iter()
            .map(|(property, value)| format!("{property}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StyleMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Full-viewport backdrop centering the dialog.
pub fn default_overlay() -> StyleMap {
    StyleMap::from_iter([
        ("position", "fixed"),
        ("top", "0"),
        ("left", "0"),
        ("right", "0"),
        ("bottom", "0"),
        ("display", "flex"),
        ("align-items", "center"),
        ("justify-content", "center"),
        ("background-color", "rgba(0, 0, 0, 0.5)"),
    ])
}

pub fn default_modal() -> StyleMap {
    StyleMap::from_iter([
        ("position", "relative"),
        ("background", "#fff"),
        ("border-radius", "4px"),
        ("padding", "20px"),
        ("max-width", "90vw"),
        ("max-height", "90vh"),
        ("overflow", "auto"),
        ("outline", "none"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win() {
        let overrides = StyleMap::new()
            .with("background-color", "red")
            .with("z-index", "10");
        let merged = overrides.merged_over(&default_overlay());

        assert_eq!(merged.get("background-color"), Some("red"));
        assert_eq!(merged.get("z-index"), Some("10"));
        assert_eq!(merged.get("position"), Some("fixed"));
    }

    #[test]
    fn test_empty_overrides_keep_defaults() {
        assert_eq!(StyleMap::new().merged_over(&default_modal()), default_modal());
    }

    #[test]
    fn test_to_css() {
        let styles = StyleMap::new().with("top", "0").with("display", "flex");
        assert_eq!(styles.to_css(), "display: flex; top: 0;");
        assert_eq!(StyleMap::new().to_css(), "");
    }
}
