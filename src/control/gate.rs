// ABOUTME: Pre-start decision policy for ETL jobs
// ABOUTME: Separates blocking errors from advisory warnings that need an operator override

use crate::remote::models::EtlValidation;

/// Three-way outcome of the pre-start checks.
///
/// Starting an import is expensive and not reversible, so blocking problems
/// refuse it outright, while advisory ones require a conscious operator
/// override before the start request is forced through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartDecision {
    /// Blocking problems; no start request may be issued.
    Blocked(Vec<String>),
    /// Advisory problems; starting needs explicit confirmation and, once
    /// confirmed, must be forced past the server's own warning check.
    NeedsConfirmation(Vec<String>),
    /// Nothing in the way; start immediately without forcing.
    Proceed,
}

pub fn decide(validation: &EtlValidation) -> StartDecision {
    if !validation.errors.is_empty() {
        StartDecision::Blocked(validation.errors.clone())
    } else if !validation.warnings.is_empty() {
        StartDecision::NeedsConfirmation(validation.warnings.clone())
    } else {
        StartDecision::Proceed
    }
}

/// Resolves a decision into the `force` flag to start with.
///
/// Returns `None` when starting is refused or the operator declines.
/// `confirm` is invoked only for [`StartDecision::NeedsConfirmation`] and
/// receives the warnings to show.
pub fn authorize<F>(decision: &StartDecision, confirm: F) -> Option<bool>
where
    F: FnOnce(&[String]) -> bool,
{
    match decision {
        StartDecision::Blocked(_) => None,
        StartDecision::NeedsConfirmation(warnings) => confirm(warnings).then_some(true),
        StartDecision::Proceed => Some(false),
    }
}
