//! The registry: three independent name→entry maps (functions, variables,
//! reserved words) that back every name lookup the parser performs. Kept
//! deliberately dumb — no fuzzy matching, no namespacing beyond what's baked
//! into a WORD lexeme — so the sandbox boundary stays easy to audit.

use crate::error::CallError;
use crate::value::Payload;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// The accepted argument counts for a function catalog entry.
#[derive(Clone, Debug)]
pub enum FunctionArity {
    /// Exactly one of these counts is accepted.
    Fixed(BTreeSet<usize>),
    /// Any count is accepted; the call always receives the full argument
    /// list as a single slice, same as a fixed-arity call.
    Variadic,
}

impl FunctionArity {
    pub fn fixed(counts: impl IntoIterator<Item = usize>) -> Self {
        Self::Fixed(counts.into_iter().collect())
    }

    pub fn exactly(count: usize) -> Self {
        Self::fixed([count])
    }

    fn accepts(&self, got: usize) -> bool {
        match self {
            Self::Fixed(counts) => counts.contains(&got),
            Self::Variadic => true,
        }
    }
}

/// A callable registered under some expression-visible name.
pub type FunctionBody =
    Arc<dyn Fn(&[Payload]) -> Result<Payload, CallError> + Send + Sync>;

/// One entry in the function map: its accepted arities and the body the
/// dispatch layer invokes once arity has been checked.
#[derive(Clone)]
pub struct FunctionEntry {
    pub arity: FunctionArity,
    pub invoke: FunctionBody,
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl FunctionEntry {
    pub fn new(
        arity: FunctionArity,
        invoke: impl Fn(&[Payload]) -> Result<Payload, CallError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            arity,
            invoke: Arc::new(invoke),
        }
    }

    pub fn accepts_arity(&self, got: usize) -> bool {
        self.arity.accepts(got)
    }
}

/// Holds the three registries an evaluator instance owns across its
/// lifetime: functions, variables, and reserved words. Registry contents are
/// static for the duration of one `evaluate` call; callers mutate them only
/// between calls via the `register_*` methods.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    functions: IndexMap<String, FunctionEntry>,
    variables: IndexMap<String, Payload>,
    reserved: IndexMap<String, Payload>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additive merge: entries in `functions` overwrite any existing entry
    /// of the same name, entries not mentioned are left untouched.
    pub fn register_functions(
        &mut self,
        functions: impl IntoIterator<Item = (String, FunctionEntry)>,
    ) {
        self.functions.extend(functions);
    }

    pub fn register_variables_merge(
        &mut self,
        variables: impl IntoIterator<Item = (String, Payload)>,
    ) {
        self.variables.extend(variables);
    }

    pub fn register_variables_replace(
        &mut self,
        variables: impl IntoIterator<Item = (String, Payload)>,
    ) {
        self.variables = variables.into_iter().collect();
    }

    pub fn register_reserved_merge(
        &mut self,
        reserved: impl IntoIterator<Item = (String, Payload)>,
    ) {
        self.reserved.extend(reserved);
    }

    pub fn register_reserved_replace(
        &mut self,
        reserved: impl IntoIterator<Item = (String, Payload)>,
    ) {
        self.reserved = reserved.into_iter().collect();
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn is_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains_key(name)
    }

    pub fn get_function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    pub fn get_variable(&self, name: &str) -> Option<&Payload> {
        self.variables.get(name)
    }

    /// Set a variable's value, inserting it if this is the first time it's
    /// seen. Assignment to a name that is only known as a reserved word is
    /// rejected by the parser before this is ever called.
    pub fn set_variable(&mut self, name: &str, value: Payload) {
        self.variables.insert(name.to_owned(), value);
    }

    pub fn get_reserved(&self, name: &str) -> Option<&Payload> {
        self.reserved.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn noop_entry(arity: FunctionArity) -> FunctionEntry {
        FunctionEntry::new(arity, |_| Ok(Payload::Number(0.0)))
    }

    #[test]
    fn test_function_registration_and_lookup() {
        let mut registry = Registry::new();
        registry.register_functions([
            ("pi".to_owned(), noop_entry(FunctionArity::exactly(0))),
            ("list".to_owned(), noop_entry(FunctionArity::Variadic)),
        ]);
        assert!(registry.is_function("pi"));
        assert!(registry.is_function("list"));
        assert!(!registry.is_function("nope"));
        assert!(registry.get_function("pi").unwrap().accepts_arity(0));
        assert!(!registry.get_function("pi").unwrap().accepts_arity(1));
        assert!(registry.get_function("list").unwrap().accepts_arity(50));
    }

    #[test]
    fn test_variable_merge_vs_replace() {
        let mut registry = Registry::new();
        registry.register_variables_merge([
            ("one".to_owned(), Payload::Number(1.0)),
            ("two".to_owned(), Payload::Number(2.0)),
        ]);
        registry.register_variables_merge([(
            "three".to_owned(),
            Payload::Number(3.0),
        )]);
        assert!(registry.is_variable("one"));
        assert!(registry.is_variable("three"));

        registry.register_variables_replace([(
            "only".to_owned(),
            Payload::Number(9.0),
        )]);
        assert!(!registry.is_variable("one"));
        assert!(registry.is_variable("only"));
    }

    #[test]
    fn test_set_variable_overwrites() {
        let mut registry = Registry::new();
        registry.set_variable("x", Payload::Number(1.0));
        registry.set_variable("x", Payload::Number(2.0));
        assert_eq!(registry.get_variable("x"), Some(&Payload::Number(2.0)));
    }

    #[test]
    fn test_reserved_words_are_independent_of_variables() {
        let mut registry = Registry::new();
        registry.register_reserved_merge([(
            "TOKEN".to_owned(),
            Payload::Text("abc123".into()),
        )]);
        assert!(registry.is_reserved("TOKEN"));
        assert!(!registry.is_variable("TOKEN"));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut registry = Registry::new();
        registry.set_variable("Name", Payload::Text("Sergei".into()));
        assert!(registry.is_variable("Name"));
        assert!(!registry.is_variable("name"));
    }
}
