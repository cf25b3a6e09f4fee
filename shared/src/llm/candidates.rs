//! Ordered, de-duplicated list of model identifiers to try.

/// Known-good fallbacks, tried in order after the configured preference.
pub const FALLBACK_MODELS: [&str; 6] = [
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-2.0-flash",
    "gemini-2.0-flash-001",
    "gemini-flash-latest",
    "gemini-pro-latest",
];

/// Immutable, non-empty list of candidate model identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidates(Vec<String>);

impl ModelCandidates {
    /// Build from an optional preference and the built-in fallbacks.
    pub fn build(preference: Option<&str>) -> Self {
        Self::with_fallbacks(preference, &FALLBACK_MODELS)
    }

    /// Build from an optional preference and an explicit fallback list.
    ///
    /// # Panics
    ///
    /// Panics if `fallbacks` is empty; that is a programming error.
    pub fn with_fallbacks(preference: Option<&str>, fallbacks: &[&str]) -> Self {
        assert!(!fallbacks.is_empty(), "fallback model list must not be empty");

        let preferred = preference.map(str::trim).filter(|p| !p.is_empty());

        let mut models: Vec<String> = Vec::with_capacity(fallbacks.len() + 1);
        for name in preferred.into_iter().chain(fallbacks.iter().copied()) {
            if !models.iter().any(|m| m == name) {
                models.push(name.to_string());
            }
        }

        Self(models)
    }

    /// The first candidate (the configured preference when present).
    pub fn primary(&self) -> &str {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Free-function form of [`ModelCandidates::build`].
pub fn build_candidates(preference: Option<&str>) -> ModelCandidates {
    ModelCandidates::build(preference)
}
