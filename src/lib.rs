//! `vellum`: a safe, sandboxed expression evaluator for survey/template
//! runtimes. Only pre-registered functions, variables, and reserved words
//! are ever reachable from an expression.
//!
//! ```
//! use vellum::Evaluator;
//!
//! let mut evaluator = vellum::new_evaluator();
//! evaluator.register_variables_merge([
//!     ("name".to_owned(), vellum::Payload::Text("Sergei".into())),
//!     ("age".to_owned(), vellum::Payload::Number(45.0)),
//! ]);
//! assert_eq!(
//!     evaluator.process_template("{name}, you are {age}"),
//!     "Sergei, you are 45"
//! );
//! ```

use tracing_subscriber::prelude::*;

pub use vellum_core::{
    loose_eq, split, strip_spaces, tokenize, CallError, Diagnostic, Evaluator,
    EvalError, FunctionArity, FunctionBody, FunctionEntry, Payload, Registry,
    Segment, Token, TokenCategory, Value, ValueCategory,
    DEFAULT_MAX_TEMPLATE_DEPTH,
};

/// Install a stderr `tracing` subscriber for hosts that embed `vellum` but
/// don't already run their own subscriber (standalone test binaries, quick
/// scripts). Applications with their own logging setup should skip this and
/// let `vellum`'s `tracing::debug!`/`tracing::warn!` calls flow into theirs.
pub fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);
    tracing_subscriber::registry().with(fmt_layer).init();
}

/// Build an [Evaluator] pre-loaded with the default function catalog
/// (`if`, `list`, `min`, `max`, arithmetic, string, and type-check
/// builtins). Hosts that want a bare evaluator with no catalog should
/// construct [Evaluator] directly and register only what they need.
#[must_use]
pub fn new_evaluator() -> Evaluator {
    let mut evaluator = Evaluator::new();
    register_default_functions(&mut evaluator);
    evaluator
}

/// Merge the default function catalog into an existing evaluator, for
/// hosts that built one with [Evaluator::new] and want the builtins added
/// after their own domain functions.
pub fn register_default_functions(evaluator: &mut Evaluator) {
    evaluator.register_functions(vellum_functions::default_catalog());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_registered() {
        let mut evaluator = new_evaluator();
        assert!(evaluator.evaluate("pi() > 3", false));
        assert!(evaluator.get_result().unwrap().is_truthy());
    }
}
