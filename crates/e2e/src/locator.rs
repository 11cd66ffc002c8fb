//! Locators: re-resolvable descriptions of DOM elements
//!
//! A `Locator` is a chain of selector steps, scoped to the page or to another
//! locator. It never holds an element; the driver resolves it against the live
//! DOM on every call, mirroring Playwright's own locator semantics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One resolution step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Step {
    /// CSS selector, descendant of the current scope
    Css { selector: String },
    /// `data-testid` attribute
    TestId { id: String },
    /// ARIA role, optionally with an accessible name (substring, case-insensitive)
    Role { role: String, name: Option<String> },
    /// Text content
    Text { text: String },
    /// Form control by its label
    Label { text: String },
    /// Input by placeholder
    Placeholder { text: String },
    /// Keep only matches whose text contains `text`
    HasText { text: String },
    Nth { index: usize },
    First,
    Last,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Css { selector } => write!(f, "{}", selector),
            Step::TestId { id } => write!(f, "[data-testid=\"{}\"]", id),
            Step::Role { role, name: Some(name) } => write!(f, "role={}[name~=\"{}\"]", role, name),
            Step::Role { role, name: None } => write!(f, "role={}", role),
            Step::Text { text } => write!(f, "text=\"{}\"", text),
            Step::Label { text } => write!(f, "label=\"{}\"", text),
            Step::Placeholder { text } => write!(f, "placeholder=\"{}\"", text),
            Step::HasText { text } => write!(f, ":has-text(\"{}\")", text),
            Step::Nth { index } => write!(f, ":nth({})", index),
            Step::First => write!(f, ":first"),
            Step::Last => write!(f, ":last"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    steps: Vec<Step>,
}

impl Locator {
    fn root(step: Step) -> Self {
        Self { steps: vec![step] }
    }

    fn then(&self, step: Step) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::root(Step::Css {
            selector: selector.into(),
        })
    }

    pub fn by_test_id(id: impl Into<String>) -> Self {
        Self::root(Step::TestId { id: id.into() })
    }

    pub fn by_role(role: impl Into<String>) -> Self {
        Self::root(Step::Role {
            role: role.into(),
            name: None,
        })
    }

    pub fn by_role_with_name(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::root(Step::Role {
            role: role.into(),
            name: Some(name.into()),
        })
    }

    pub fn by_text(text: impl Into<String>) -> Self {
        Self::root(Step::Text { text: text.into() })
    }

    pub fn by_label(text: impl Into<String>) -> Self {
        Self::root(Step::Label { text: text.into() })
    }

    pub fn by_placeholder(text: impl Into<String>) -> Self {
        Self::root(Step::Placeholder { text: text.into() })
    }

    /// Scope a CSS selector inside this locator
    pub fn locator(&self, selector: impl Into<String>) -> Self {
        self.then(Step::Css {
            selector: selector.into(),
        })
    }

    pub fn get_by_test_id(&self, id: impl Into<String>) -> Self {
        self.then(Step::TestId { id: id.into() })
    }

    pub fn get_by_role(&self, role: impl Into<String>, name: Option<&str>) -> Self {
        self.then(Step::Role {
            role: role.into(),
            name: name.map(String::from),
        })
    }

    pub fn get_by_text(&self, text: impl Into<String>) -> Self {
        self.then(Step::Text { text: text.into() })
    }

    pub fn filter_has_text(&self, text: impl Into<String>) -> Self {
        self.then(Step::HasText { text: text.into() })
    }

    pub fn nth(&self, index: usize) -> Self {
        self.then(Step::Nth { index })
    }

    pub fn first(&self) -> Self {
        self.then(Step::First)
    }

    pub fn last(&self) -> Self {
        self.then(Step::Last)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            let chained = matches!(
                step,
                Step::HasText { .. } | Step::Nth { .. } | Step::First | Step::Last
            );
            if i > 0 && !chained {
                write!(f, " >> ")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_locator_description() {
        let cell = Locator::by_test_id("table-list")
            .locator("tbody tr")
            .filter_has_text("manual__")
            .nth(0)
            .locator("td");
        assert_eq!(
            cell.to_string(),
            "[data-testid=\"table-list\"] >> tbody tr:has-text(\"manual__\"):nth(0) >> td"
        );
    }

    #[test]
    fn test_scoping_does_not_mutate_parent() {
        let rows = Locator::css("tbody tr");
        let first = rows.first();
        assert_eq!(rows.steps().len(), 1);
        assert_eq!(first.steps().len(), 2);
    }

    #[test]
    fn test_wire_format() {
        let loc = Locator::by_role_with_name("button", "Save").nth(1);
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "steps": [
                    { "by": "role", "role": "button", "name": "Save" },
                    { "by": "nth", "index": 1 }
                ]
            })
        );
    }
}
