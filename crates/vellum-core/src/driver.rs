//! The driver: the public surface an embedding application actually calls.
//! Owns the three registries across the evaluator's lifetime and resets all
//! per-call transient state (tokens, stack, errors, used-name lists) at the
//! start of every [Evaluator::evaluate].

use crate::error::{Diagnostic, ErrorCollector};
use crate::parse::evaluate_tokens;
use crate::registry::{FunctionEntry, Registry};
use crate::splitter::{split, Segment};
use crate::token::{strip_spaces, tokenize};
use crate::value::Payload;
use vellum_util::dedup_preserve_order;

/// Recursion ceiling [Evaluator::process_template] applies when no explicit
/// depth is supplied.
pub const DEFAULT_MAX_TEMPLATE_DEPTH: u32 = 5;

/// Owns the function/variable/reserved-word registries and the result of
/// the most recent [Evaluator::evaluate] call.
#[derive(Debug, Default)]
pub struct Evaluator {
    registry: Registry,
    last_source: String,
    last_result: Option<Payload>,
    last_errors: ErrorCollector,
    last_vars_used: Vec<String>,
    last_reserved_used: Vec<String>,
    all_vars_used: Vec<String>,
    all_reserved_used: Vec<String>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    // -- registration, delegated straight to the registry --

    pub fn register_functions(
        &mut self,
        functions: impl IntoIterator<Item = (String, FunctionEntry)>,
    ) {
        self.registry.register_functions(functions);
    }

    pub fn register_variables_merge(
        &mut self,
        variables: impl IntoIterator<Item = (String, Payload)>,
    ) {
        self.registry.register_variables_merge(variables);
    }

    pub fn register_variables_replace(
        &mut self,
        variables: impl IntoIterator<Item = (String, Payload)>,
    ) {
        self.registry.register_variables_replace(variables);
    }

    pub fn register_reserved_merge(
        &mut self,
        reserved: impl IntoIterator<Item = (String, Payload)>,
    ) {
        self.registry.register_reserved_merge(reserved);
    }

    pub fn register_reserved_replace(
        &mut self,
        reserved: impl IntoIterator<Item = (String, Payload)>,
    ) {
        self.registry.register_reserved_replace(reserved);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Tokenize and evaluate `expr`, resetting all per-call state first.
    /// Returns whether evaluation succeeded; inspect [Self::get_result] /
    /// [Self::get_errors] for the outcome.
    pub fn evaluate(&mut self, expr: &str, parse_only: bool) -> bool {
        let tokens = strip_spaces(tokenize(expr));
        let outcome = evaluate_tokens(tokens, &mut self.registry, parse_only);

        self.last_source = expr.to_owned();
        self.last_result = outcome.result.map(|v| v.payload);
        self.last_errors = outcome.errors;
        self.last_vars_used = outcome.vars_used;
        self.last_reserved_used = outcome.reserved_used;

        if !outcome.success {
            tracing::debug!(
                expr,
                errors = self.last_errors.errors().len(),
                "expression evaluation failed"
            );
        }
        outcome.success
    }

    pub fn get_result(&self) -> Option<&Payload> {
        self.last_result.as_ref()
    }

    pub fn has_errors(&self) -> bool {
        self.last_errors.has_errors()
    }

    pub fn get_errors(&self) -> &[Diagnostic] {
        self.last_errors.errors()
    }

    pub fn get_readable_errors(&self) -> String {
        self.last_errors.readable_report(&self.last_source)
    }

    /// Names resolved to variables during the last [Self::evaluate] call,
    /// deduplicated on retrieval: a name used three times in one expression
    /// is reported once, in first-use order.
    pub fn get_vars_used(&self) -> Vec<String> {
        dedup_preserve_order(self.last_vars_used.iter().cloned())
    }

    pub fn get_reserved_used(&self) -> Vec<String> {
        dedup_preserve_order(self.last_reserved_used.iter().cloned())
    }

    pub fn get_all_vars_used(&self) -> Vec<String> {
        dedup_preserve_order(self.all_vars_used.iter().cloned())
    }

    pub fn get_all_reserved_used(&self) -> Vec<String> {
        dedup_preserve_order(self.all_reserved_used.iter().cloned())
    }

    /// Substitute every `{ … }` expression in `text` with its computed
    /// value (or its rendered error, if the expression failed), using
    /// [DEFAULT_MAX_TEMPLATE_DEPTH] as the recursion ceiling.
    pub fn process_template(&mut self, text: &str) -> String {
        self.process_template_with_max_depth(text, DEFAULT_MAX_TEMPLATE_DEPTH)
    }

    /// As [Self::process_template], but with an explicit recursion ceiling.
    /// A substituted value that itself contains `{ … }` is re-split and
    /// re-evaluated, up to `max_depth` passes; beyond that the text from the
    /// last completed pass is returned unchanged.
    pub fn process_template_with_max_depth(
        &mut self,
        text: &str,
        max_depth: u32,
    ) -> String {
        self.all_vars_used.clear();
        self.all_reserved_used.clear();
        self.process_template_pass(text, 0, max_depth)
    }

    fn process_template_pass(
        &mut self,
        text: &str,
        depth: u32,
        max_depth: u32,
    ) -> String {
        if depth >= max_depth {
            tracing::warn!(
                depth,
                max_depth,
                "template recursion depth exceeded, leaving remaining braces unresolved"
            );
            return text.to_owned();
        }

        let mut output = String::new();
        for segment in split(text) {
            match segment {
                Segment::Raw { text, .. } => output.push_str(&text),
                Segment::Expression { text: expr, .. } => {
                    let success = self.evaluate(&expr, false);
                    self.all_vars_used.extend(self.last_vars_used.iter().cloned());
                    self.all_reserved_used
                        .extend(self.last_reserved_used.iter().cloned());
                    if success {
                        let result = self
                            .get_result()
                            .expect("a successful evaluate always has a result");
                        output.push_str(&result.to_string());
                    } else {
                        output.push_str(&self.get_readable_errors());
                    }
                }
            }
        }

        if output.contains('{') {
            self.process_template_pass(&output, depth + 1, max_depth)
        } else {
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FunctionArity;
    use pretty_assertions::assert_eq;

    fn evaluator_with_fixtures() -> Evaluator {
        let mut evaluator = Evaluator::new();
        evaluator.register_variables_merge([
            ("name".to_owned(), Payload::Text("Sergei".into())),
            ("age".to_owned(), Payload::Number(45.0)),
        ]);
        evaluator.register_functions([(
            "concat".to_owned(),
            FunctionEntry::new(FunctionArity::Variadic, |args| {
                Ok(Payload::Text(
                    args.iter().map(ToString::to_string).collect(),
                ))
            }),
        )]);
        evaluator
    }

    #[test]
    fn test_template_substitution() {
        let mut evaluator = evaluator_with_fixtures();
        let output =
            evaluator.process_template("{name}, you are {age}");
        assert_eq!(output, "Sergei, you are 45");
    }

    #[test]
    fn test_idempotent_on_plain_text() {
        let mut evaluator = evaluator_with_fixtures();
        let text = "no expressions here at all";
        assert_eq!(evaluator.process_template(text), text);
    }

    #[test]
    fn test_failed_expression_renders_error_inline() {
        let mut evaluator = evaluator_with_fixtures();
        let output = evaluator.process_template("before {nope} after");
        assert!(output.starts_with("before "));
        assert!(output.ends_with(" after"));
        assert!(output.contains("not a registered"));
    }

    #[test]
    fn test_recursion_depth_guard_terminates() {
        let mut evaluator = evaluator_with_fixtures();
        evaluator.register_variables_merge([(
            "loop".to_owned(),
            Payload::Text("{loop}".into()),
        )]);
        // Must terminate rather than loop forever; exact content past the
        // ceiling is not load-bearing, only that this returns at all.
        let output = evaluator
            .process_template_with_max_depth("{loop}", 3);
        assert!(!output.is_empty());
    }

    #[test]
    fn test_all_vars_used_aggregates_across_segments() {
        let mut evaluator = evaluator_with_fixtures();
        evaluator.process_template("{name} is {age}");
        assert_eq!(
            evaluator.get_all_vars_used(),
            &["name".to_owned(), "age".to_owned()]
        );
    }

    #[test]
    fn test_evaluate_resets_per_call_state() {
        let mut evaluator = evaluator_with_fixtures();
        assert!(!evaluator.evaluate("nope", false));
        assert!(evaluator.has_errors());
        assert!(evaluator.evaluate("age", false));
        assert!(!evaluator.has_errors());
    }
}
