//! Theme drill-down.
//!
//! Themes and quotes arrive as two separate lists keyed by label, with no
//! guarantee that the backend kept them in sync. Lookups are therefore
//! independent: a theme may resolve a description, quotes, both or neither.

use crate::models::AnalysisResult;
use serde::{Deserialize, Serialize};

/// Resolved detail for one theme label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDetail {
    pub theme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotes: Option<Vec<String>>,
}

/// Look up the description and quotes for `theme` (exact, case-sensitive).
///
/// The first entry wins when a label repeats.
pub fn resolve_theme(result: &AnalysisResult, theme: &str) -> ThemeDetail {
    let description = result
        .key_themes
        .iter()
        .find(|t| t.theme == theme)
        .map(|t| t.description.clone());

    let quotes = result
        .quotes
        .iter()
        .find(|q| q.theme == theme)
        .map(|q| q.quotes.clone());

    ThemeDetail {
        theme: theme.to_string(),
        description,
        quotes,
    }
}

/// Labels that appear in only one of the two lists.
pub fn label_mismatches(result: &AnalysisResult) -> Vec<String> {
    let mut mismatched: Vec<String> = result
        .key_themes
        .iter()
        .filter(|t| !result.quotes.iter().any(|q| q.theme == t.theme))
        .map(|t| t.theme.clone())
        .collect();

    for quotes in &result.quotes {
        let known = result.key_themes.iter().any(|t| t.theme == quotes.theme);
        if !known && !mismatched.contains(&quotes.theme) {
            mismatched.push(quotes.theme.clone());
        }
    }

    mismatched
}

/// The currently selected theme. Selecting the active theme again clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeSelection {
    selected: Option<String>,
}

impl ThemeSelection {
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Toggle `theme` and return the new selection.
    pub fn toggle(&mut self, theme: &str) -> Option<&str> {
        if self.selected.as_deref() == Some(theme) {
            self.selected = None;
        } else {
            self.selected = Some(theme.to_string());
        }
        self.selected()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Detail for the selected theme, if any.
    pub fn detail(&self, result: &AnalysisResult) -> Option<ThemeDetail> {
        self.selected().map(|theme| resolve_theme(result, theme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeyTheme, SentimentBreakdown, ThemeQuotes};

    fn result() -> AnalysisResult {
        AnalysisResult {
            sentiment: SentimentBreakdown::default(),
            key_themes: vec![
                KeyTheme {
                    theme: "Pricing".to_string(),
                    description: "Prices are fair".to_string(),
                },
                KeyTheme {
                    theme: "Temperature".to_string(),
                    description: "Food served cold".to_string(),
                },
            ],
            summary: "s".to_string(),
            quotes: vec![
                ThemeQuotes {
                    theme: "Temperature".to_string(),
                    quotes: vec!["the food is often cold".to_string()],
                },
                ThemeQuotes {
                    theme: "Coffee".to_string(),
                    quotes: vec!["coffee machine breaks".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_theme_without_quotes() {
        let detail = resolve_theme(&result(), "Pricing");
        assert_eq!(detail.description.as_deref(), Some("Prices are fair"));
        assert_eq!(detail.quotes, None);
    }

    #[test]
    fn test_quotes_without_theme() {
        let detail = resolve_theme(&result(), "Coffee");
        assert_eq!(detail.description, None);
        assert_eq!(detail.quotes.map(|q| q.len()), Some(1));
    }

    #[test]
    fn test_both_and_neither() {
        let both = resolve_theme(&result(), "Temperature");
        assert!(both.description.is_some() && both.quotes.is_some());

        let neither = resolve_theme(&result(), "temperature");
        assert!(neither.description.is_none() && neither.quotes.is_none());
    }

    #[test]
    fn test_first_duplicate_label_wins() {
        let mut result = result();
        result.key_themes.push(KeyTheme {
            theme: "Pricing".to_string(),
            description: "second".to_string(),
        });
        let detail = resolve_theme(&result, "Pricing");
        assert_eq!(detail.description.as_deref(), Some("Prices are fair"));
    }

    #[test]
    fn test_toggle_twice_unselects() {
        let mut selection = ThemeSelection::default();
        assert_eq!(selection.toggle("Pricing"), Some("Pricing"));
        assert_eq!(selection.toggle("Pricing"), None);
        assert!(selection.detail(&result()).is_none());
    }

    #[test]
    fn test_selecting_other_theme_replaces_detail() {
        let mut selection = ThemeSelection::default();
        selection.toggle("Pricing");
        selection.toggle("Temperature");

        let detail = selection.detail(&result()).unwrap();
        assert_eq!(detail.theme, "Temperature");
        assert_eq!(detail.description.as_deref(), Some("Food served cold"));
        assert_eq!(
            detail.quotes,
            Some(vec!["the food is often cold".to_string()])
        );
    }

    #[test]
    fn test_label_mismatches() {
        assert_eq!(label_mismatches(&result()), vec!["Pricing", "Coffee"]);
    }
}
