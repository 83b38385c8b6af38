//! Rendering-aware page access
//!
//! `ChromiumRenderer` is the production [`Renderer`](crate::Renderer);
//! `DomPredicate` is the condition type its bounded waits poll for.

mod chromium;

pub use chromium::ChromiumRenderer;

/// A boolean script evaluated against the rendered DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomPredicate {
    description: String,
    script: String,
}

impl DomPredicate {
    pub fn new(description: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            script: script.into(),
        }
    }

    /// Basic readiness: the document has a body.
    pub fn body_present() -> Self {
        Self::new("document body", "document.body !== null")
    }

    /// True once any of `rules` matches at least one element.
    pub fn any_selector_present(rules: &[String]) -> Self {
        Self::new(
            format!("any of [{}]", rules.join(", ")),
            format!(
                "{}.some(s => document.querySelector(s) !== null)",
                js_literal(rules)
            ),
        )
    }

    /// True once a `<button>` whose text contains `label` is rendered.
    pub fn button_with_text(label: &str) -> Self {
        Self::new(
            format!("button containing '{}'", label),
            format!(
                "Array.from(document.querySelectorAll('button')).some(b => (b.textContent || '').includes({}))",
                js_literal(label)
            ),
        )
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}

/// Quote a value as a JavaScript literal. JSON is a subset of JS expressions.
pub(crate) fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
