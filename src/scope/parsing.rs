use super::{ScopeError, Selector};
use std::str::FromStr;

/// Parse a kubectl-style pod reference into a [`Selector`]
///
/// Supported formats:
/// - `pod/name`, `po/name` → pod by name
/// - `deployment/name`, `deploy/name` → pod of a workload
/// - `name` → pod by name
///
/// # Errors
///
/// Returns `ScopeError::InvalidSelector` if the reference is empty, has an
/// empty name, or uses an unsupported kind.
pub fn parse_selector(reference: &str) -> Result<Selector, ScopeError> {
    if reference.is_empty() {
        return Err(ScopeError::InvalidSelector(
            "selector cannot be empty".to_string(),
        ));
    }

    let Some((kind, name)) = reference.split_once('/') else {
        return Ok(Selector::name(reference));
    };

    if name.is_empty() {
        return Err(ScopeError::InvalidSelector(format!(
            "resource name cannot be empty in '{reference}'"
        )));
    }

    match kind.to_lowercase().as_str() {
        "pod" | "po" => Ok(Selector::name(name)),
        "deployment" | "deploy" => Ok(Selector::workload(name)),
        _ => Err(ScopeError::InvalidSelector(format!(
            "unsupported resource kind '{kind}' in '{reference}' (use pod or deployment)"
        ))),
    }
}

impl FromStr for Selector {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selector(s)
    }
}
