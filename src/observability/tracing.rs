//! Spans tying log lines to the identity being processed.

use alloy::primitives::Address;
use tracing::Span;

/// Span entered for the whole of one identity's run.
pub fn identity_span(name: &str, address: Address) -> Span {
    tracing::info_span!("identity", name = %name, address = %address)
}

/// Span around a single module run.
pub fn module_span(kind: &'static str) -> Span {
    tracing::info_span!("module", kind)
}
