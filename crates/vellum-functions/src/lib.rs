//! The default builtin function catalog. None of this is hard-coded into
//! the evaluator itself: every entry here is just a [FunctionEntry] plugged
//! into a [Registry] through [register_defaults], the same path a host
//! application would use to register its own domain-specific functions.
//!
//! Argument handling follows the same discipline the grammar enforces on
//! arity: each builtin pulls exactly the arguments it declared, in
//! positional order, and never panics on a well-formed call (arity has
//! already been checked by the time `invoke` runs).

use indexmap::IndexMap;
use vellum_core::{CallError, FunctionArity, FunctionEntry, Payload, Registry};

/// Build the default catalog and merge it into `registry`.
pub fn register_defaults(registry: &mut Registry) {
    registry.register_functions(default_catalog());
}

/// The default catalog as a standalone map, for callers that want to
/// inspect or filter it before registering.
pub fn default_catalog() -> IndexMap<String, FunctionEntry> {
    let mut catalog = IndexMap::new();
    macro_rules! add {
        ($name:expr, $arity:expr, $body:expr) => {
            catalog.insert($name.to_owned(), FunctionEntry::new($arity, $body));
        };
    }

    add!("if", FunctionArity::exactly(3), |args| {
        Ok(if args[0].is_truthy() {
            args[1].clone()
        } else {
            args[2].clone()
        })
    });

    add!("list", FunctionArity::Variadic, |args| {
        Ok(Payload::Text(
            args.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
        ))
    });

    add!("min", FunctionArity::Variadic, |args| {
        numbers(args)
            .into_iter()
            .fold(None, |acc, n| Some(acc.map_or(n, |m: f64| m.min(n))))
            .map(Payload::Number)
            .ok_or_else(|| CallError::new("min() requires at least one argument"))
    });

    add!("max", FunctionArity::Variadic, |args| {
        numbers(args)
            .into_iter()
            .fold(None, |acc, n| Some(acc.map_or(n, |m: f64| m.max(n))))
            .map(Payload::Number)
            .ok_or_else(|| CallError::new("max() requires at least one argument"))
    });

    add!("sum", FunctionArity::Variadic, |args| {
        Ok(Payload::Number(numbers(args).into_iter().sum()))
    });

    add!("abs", FunctionArity::exactly(1), |args| {
        Ok(Payload::Number(args[0].to_number().abs()))
    });

    add!("round", FunctionArity::fixed([1, 2]), |args| {
        let value = args[0].to_number();
        let precision = args.get(1).map_or(0.0, Payload::to_number) as i32;
        let factor = 10f64.powi(precision);
        Ok(Payload::Number((value * factor).round() / factor))
    });

    add!("ceil", FunctionArity::exactly(1), |args| {
        Ok(Payload::Number(args[0].to_number().ceil()))
    });

    add!("floor", FunctionArity::exactly(1), |args| {
        Ok(Payload::Number(args[0].to_number().floor()))
    });

    add!("sqrt", FunctionArity::exactly(1), |args| {
        let value = args[0].to_number();
        if value < 0.0 {
            return Err(CallError::new("sqrt() of a negative number"));
        }
        Ok(Payload::Number(value.sqrt()))
    });

    add!("pow", FunctionArity::exactly(2), |args| {
        Ok(Payload::Number(args[0].to_number().powf(args[1].to_number())))
    });

    add!("pi", FunctionArity::exactly(0), |_| {
        Ok(Payload::Number(std::f64::consts::PI))
    });

    add!("concat", FunctionArity::Variadic, |args| {
        Ok(Payload::Text(args.iter().map(ToString::to_string).collect()))
    });

    add!("strlen", FunctionArity::exactly(1), |args| {
        Ok(Payload::Number(args[0].to_string().chars().count() as f64))
    });

    add!("trim", FunctionArity::exactly(1), |args| {
        Ok(Payload::Text(args[0].to_string().trim().to_owned()))
    });

    add!("upper", FunctionArity::exactly(1), |args| {
        Ok(Payload::Text(args[0].to_string().to_uppercase()))
    });

    add!("lower", FunctionArity::exactly(1), |args| {
        Ok(Payload::Text(args[0].to_string().to_lowercase()))
    });

    add!("substr", FunctionArity::fixed([2, 3]), |args| {
        let text = args[0].to_string();
        let chars: Vec<char> = text.chars().collect();
        let start = args[1].to_number().max(0.0) as usize;
        let end = args
            .get(2)
            .map_or(chars.len(), |v| (start + v.to_number().max(0.0) as usize).min(chars.len()));
        if start > chars.len() {
            return Ok(Payload::Text(String::new()));
        }
        Ok(Payload::Text(chars[start..end.max(start)].iter().collect()))
    });

    add!("str_replace", FunctionArity::exactly(3), |args| {
        let subject = args[0].to_string();
        let search = args[1].to_string();
        let replacement = args[2].to_string();
        Ok(Payload::Text(subject.replace(&search, &replacement)))
    });

    add!("number_format", FunctionArity::fixed([1, 2]), |args| {
        let value = args[0].to_number();
        let decimals = args.get(1).map_or(0.0, Payload::to_number).max(0.0) as usize;
        Ok(Payload::Text(format!("{value:.decimals$}")))
    });

    add!("is_numeric", FunctionArity::exactly(1), |args| {
        Ok(Payload::boolean(match &args[0] {
            Payload::Number(_) => true,
            Payload::Text(s) => s.trim().parse::<f64>().is_ok(),
        }))
    });

    add!("is_empty", FunctionArity::exactly(1), |args| {
        Ok(Payload::boolean(match &args[0] {
            Payload::Number(n) => *n == 0.0,
            Payload::Text(s) => s.is_empty(),
        }))
    });

    catalog
}

fn numbers(args: &[Payload]) -> Vec<f64> {
    args.iter().map(Payload::to_number).collect()
}
