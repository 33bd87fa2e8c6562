//! The recursive-descent parser/evaluator. Walks the token stream with an
//! explicit [Value] stack rather than returning computed values up the call
//! chain, mirroring the stack-machine shape the data model describes. Every
//! rule is a method returning `bool`; a `false` return means a diagnostic has
//! already been appended to the error collector and the caller should
//! unwind without touching the stack further.

use crate::error::{ErrorCollector, EvalError};
use crate::registry::Registry;
use crate::token::{Token, TokenCategory};
use crate::value::{loose_eq, Payload, Value};
use vellum_util::{Mapping, ResultTraced};

/// The four relational comparisons, each reachable through either its symbol
/// or its keyword spelling (`lt`/`le`/`gt`/`ge`), mirroring the symbol/word
/// duality [crate::token]'s `COMPARE_WORD` pattern tokenizes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RelationOp {
    Lt,
    Le,
    Gt,
    Ge,
}

static RELATION_OPS: Mapping<'static, RelationOp> = Mapping::new(&[
    (RelationOp::Lt, "<"),
    (RelationOp::Lt, "lt"),
    (RelationOp::Le, "<="),
    (RelationOp::Le, "le"),
    (RelationOp::Gt, ">"),
    (RelationOp::Gt, "gt"),
    (RelationOp::Ge, ">="),
    (RelationOp::Ge, "ge"),
]);

/// The outcome of one parse/evaluate pass: whether it succeeded, the final
/// value (only present on success), the accumulated diagnostics, and the
/// names resolved along the way.
pub struct ParseOutcome {
    pub success: bool,
    pub result: Option<Value>,
    pub errors: ErrorCollector,
    pub vars_used: Vec<String>,
    pub reserved_used: Vec<String>,
}

/// Run the grammar over `tokens` once. `registry` is mutable because
/// assignment expressions write through to the variable map as they
/// evaluate, not just at the end.
pub fn evaluate_tokens(
    tokens: Vec<Token>,
    registry: &mut Registry,
    parse_only: bool,
) -> ParseOutcome {
    Parser::new(tokens, registry, parse_only).run()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    stack: Vec<Value>,
    registry: &'a mut Registry,
    parse_only: bool,
    errors: ErrorCollector,
    vars_used: Vec<String>,
    reserved_used: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, registry: &'a mut Registry, parse_only: bool) -> Self {
        Self {
            tokens,
            pos: 0,
            stack: Vec::new(),
            registry,
            parse_only,
            errors: ErrorCollector::new(),
            vars_used: Vec::new(),
            reserved_used: Vec::new(),
        }
    }

    fn run(mut self) -> ParseOutcome {
        pre_parse_check(&self.tokens, self.registry, &mut self.errors);
        let success = if self.errors.has_errors() {
            false
        } else if !self.expressions() {
            false
        } else if self.pos != self.tokens.len() {
            let token = self.tokens[self.pos].clone();
            self.errors.push(EvalError::TrailingTokens, Some(token));
            false
        } else if self.stack.len() != 1 {
            self.errors.push(EvalError::UnbalancedEquation, None);
            false
        } else {
            true
        };
        let result = if success { self.stack.pop() } else { None };
        ParseOutcome {
            success,
            result,
            errors: self.errors,
            vars_used: self.vars_used,
            reserved_used: self.reserved_used,
        }
    }

    // -- stack helpers --

    /// Push a value onto the stack, applying the parse-only payload
    /// override (literal 1, category preserved) when this pass is
    /// validation-only.
    fn push(&mut self, value: Value) {
        let value = if self.parse_only {
            value.into_parse_only()
        } else {
            value
        };
        self.stack.push(value);
    }

    fn pop(&mut self) -> Option<Value> {
        match self.stack.pop() {
            Some(value) => Some(value),
            None => {
                self.errors.push(EvalError::EmptyStack, None);
                None
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn current(&self) -> Option<&Token> {
        self.peek(0)
    }

    fn check(&self, category: TokenCategory) -> bool {
        self.current().is_some_and(|t| t.category == category)
    }

    /// If the current token matches `category` and its lexeme
    /// case-insensitively equals one of `lexemes`, consume it and return it.
    fn match_operator(
        &mut self,
        category: TokenCategory,
        lexemes: &[&str],
    ) -> Option<Token> {
        let token = self.current()?;
        if token.category == category
            && lexemes.iter().any(|l| token.lexeme_eq_ignore_case(l))
        {
            let token = token.clone();
            self.pos += 1;
            Some(token)
        } else {
            None
        }
    }

    // -- grammar --

    /// `Expressions := Expression ( ',' Expression )*`. Each comma discards
    /// the previous result (popping it) so only the last expression's value
    /// survives; this keeps the "one value per rule" invariant even though
    /// the grammar allows a comma-separated list here.
    fn expressions(&mut self) -> bool {
        if !self.expression() {
            return false;
        }
        while self.check(TokenCategory::Comma) {
            self.pos += 1;
            if self.pop().is_none() {
                return false;
            }
            if !self.expression() {
                return false;
            }
        }
        true
    }

    /// `Expression := ( Variable ASSIGN )? LogicalOr`
    fn expression(&mut self) -> bool {
        if let Some(assign_token) = self.peek(1) {
            if assign_token.category == TokenCategory::Assign {
                let name_token = self.current().expect("peek(1) implies a current token").clone();
                if matches!(
                    name_token.category,
                    TokenCategory::Word | TokenCategory::Sgqa
                ) {
                    let assign_token = assign_token.clone();
                    return self.assignment(name_token, assign_token);
                }
            }
        }
        self.logical_or()
    }

    fn assignment(&mut self, name_token: Token, op_token: Token) -> bool {
        self.pos += 2; // name, operator
        if !self.logical_or() {
            return false;
        }
        let Some(rhs) = self.pop() else {
            return false;
        };
        let name = name_token.lexeme.clone();
        if !self.registry.is_variable(&name) {
            self.errors
                .push(EvalError::NotAssignable { name }, Some(name_token));
            return false;
        }
        self.vars_used.push(name.clone());

        let new_payload = if op_token.lexeme == "=" {
            rhs.payload.clone()
        } else {
            let current = self
                .registry
                .get_variable(&name)
                .cloned()
                .unwrap_or(Payload::Number(0.0));
            let lhs = Value::from_payload(current, name_token.offset);
            let op = &op_token.lexeme[..1];
            match apply_arith(op, &lhs, &rhs, &mut self.errors, &op_token) {
                Some(value) => value.payload,
                None => return false,
            }
        };

        // Parse-only mode must not mutate state the caller might depend on;
        // the grammar and name resolution still ran, which is all it's for.
        if !self.parse_only {
            self.registry.set_variable(&name, new_payload.clone());
        }
        self.push(Value::from_payload(new_payload, name_token.offset));
        true
    }

    /// `LogicalOr := LogicalAnd ( ('||'|'or') LogicalAnd )*`
    fn logical_or(&mut self) -> bool {
        if !self.logical_and() {
            return false;
        }
        while let Some(op) =
            self.match_operator(TokenCategory::AndOr, &["||", "or"])
        {
            if !self.logical_and() {
                return false;
            }
            let (Some(rhs), Some(lhs)) = (self.pop(), self.pop()) else {
                return false;
            };
            self.push(Value::boolean(
                lhs.is_truthy() || rhs.is_truthy(),
                op.offset,
            ));
        }
        true
    }

    /// `LogicalAnd := Equality ( ('&&'|'and') Equality )*`
    fn logical_and(&mut self) -> bool {
        if !self.equality() {
            return false;
        }
        while let Some(op) =
            self.match_operator(TokenCategory::AndOr, &["&&", "and"])
        {
            if !self.equality() {
                return false;
            }
            let (Some(rhs), Some(lhs)) = (self.pop(), self.pop()) else {
                return false;
            };
            self.push(Value::boolean(
                lhs.is_truthy() && rhs.is_truthy(),
                op.offset,
            ));
        }
        true
    }

    /// `Equality := Relation ( ('=='|'!='|'eq'|'ne') Relation )*`
    fn equality(&mut self) -> bool {
        if !self.relation() {
            return false;
        }
        while let Some(op) = self.match_operator(
            TokenCategory::Compare,
            &["==", "!=", "eq", "ne"],
        ) {
            if !self.relation() {
                return false;
            }
            let (Some(rhs), Some(lhs)) = (self.pop(), self.pop()) else {
                return false;
            };
            let equal = loose_eq(&lhs, &rhs);
            let negate = op.lexeme_eq_ignore_case("!=") || op.lexeme_eq_ignore_case("ne");
            self.push(Value::boolean(equal != negate, op.offset));
        }
        true
    }

    /// `Relation := Additive ( ('<'|'<='|'>'|'>='|'lt'|'le'|'gt'|'ge') Additive )*`
    fn relation(&mut self) -> bool {
        if !self.additive() {
            return false;
        }
        while let Some(op) = self.match_operator(
            TokenCategory::Compare,
            &["<", "<=", ">", ">=", "lt", "le", "gt", "ge"],
        ) {
            if !self.additive() {
                return false;
            }
            let (Some(rhs), Some(lhs)) = (self.pop(), self.pop()) else {
                return false;
            };
            let (l, r) = (lhs.to_number(), rhs.to_number());
            let relation_op = RELATION_OPS
                .get(&op.lexeme.to_lowercase())
                .expect("match_operator only matches known relation lexemes");
            let result = match relation_op {
                RelationOp::Lt => l < r,
                RelationOp::Le => l <= r,
                RelationOp::Gt => l > r,
                RelationOp::Ge => l >= r,
            };
            self.push(Value::boolean(result, op.offset));
        }
        true
    }

    /// `Additive := Multiplicative ( ('+'|'-') Multiplicative )*`
    fn additive(&mut self) -> bool {
        if !self.multiplicative() {
            return false;
        }
        while let Some(op) =
            self.match_operator(TokenCategory::BinaryOp, &["+", "-"])
        {
            if !self.multiplicative() {
                return false;
            }
            let (Some(rhs), Some(lhs)) = (self.pop(), self.pop()) else {
                return false;
            };
            let Some(value) =
                apply_arith(&op.lexeme, &lhs, &rhs, &mut self.errors, &op)
            else {
                return false;
            };
            self.push(value);
        }
        true
    }

    /// `Multiplicative := Unary ( ('*'|'/') Unary )*`
    fn multiplicative(&mut self) -> bool {
        if !self.unary() {
            return false;
        }
        while let Some(op) =
            self.match_operator(TokenCategory::BinaryOp, &["*", "/"])
        {
            if !self.unary() {
                return false;
            }
            let (Some(rhs), Some(lhs)) = (self.pop(), self.pop()) else {
                return false;
            };
            let Some(value) =
                apply_arith(&op.lexeme, &lhs, &rhs, &mut self.errors, &op)
            else {
                return false;
            };
            self.push(value);
        }
        true
    }

    /// `Unary := ('+'|'-'|'!')? Primary`
    fn unary(&mut self) -> bool {
        let prefix = self.current().and_then(|token| {
            match (token.category, token.lexeme.as_str()) {
                (TokenCategory::BinaryOp, "+") => Some(('+', token.clone())),
                (TokenCategory::BinaryOp, "-") => Some(('-', token.clone())),
                (TokenCategory::Not, "!") => Some(('!', token.clone())),
                _ => None,
            }
        });
        let Some((op, token)) = prefix else {
            return self.primary();
        };
        self.pos += 1;
        if !self.primary() {
            return false;
        }
        let Some(operand) = self.pop() else {
            return false;
        };
        let value = match op {
            '+' => Value::number(operand.to_number(), token.offset),
            '-' => Value::number(-operand.to_number(), token.offset),
            '!' => Value::boolean(!operand.is_truthy(), token.offset),
            _ => unreachable!("prefix match only yields +, -, !"),
        };
        self.push(value);
        true
    }

    /// `Primary := '(' Expressions ')' | ConstantVarOrFunction`
    fn primary(&mut self) -> bool {
        let Some(token) = self.current().cloned() else {
            self.errors.push(EvalError::PoorlyTerminatedExpression, None);
            return false;
        };
        match token.category {
            TokenCategory::Lp => {
                self.pos += 1;
                if !self.expressions() {
                    return false;
                }
                if self.check(TokenCategory::Rp) {
                    self.pos += 1;
                    true
                } else {
                    self.errors
                        .push(EvalError::UnbalancedParens, Some(token));
                    false
                }
            }
            TokenCategory::Number => {
                self.pos += 1;
                let value = token.lexeme.parse().unwrap_or(0.0);
                self.push(Value::number(value, token.offset));
                true
            }
            TokenCategory::Str => {
                self.pos += 1;
                self.push(Value::text(token.lexeme.clone(), token.offset));
                true
            }
            TokenCategory::Word
                if self
                    .peek(1)
                    .is_some_and(|t| t.category == TokenCategory::Lp) =>
            {
                self.function_call(token)
            }
            TokenCategory::Word | TokenCategory::Sgqa => {
                self.pos += 1;
                self.resolve_name(token)
            }
            _ => {
                self.errors
                    .push(EvalError::UnsupportedSyntax, Some(token));
                false
            }
        }
    }

    fn resolve_name(&mut self, token: Token) -> bool {
        let name = token.lexeme.clone();
        if let Some(payload) = self.registry.get_variable(&name).cloned() {
            self.vars_used.push(name);
            self.push(Value::from_payload(payload, token.offset));
            true
        } else if let Some(payload) = self.registry.get_reserved(&name).cloned() {
            self.reserved_used.push(name);
            self.push(Value::from_payload(payload, token.offset));
            true
        } else {
            self.errors
                .push(EvalError::UndefinedName { name }, Some(token));
            false
        }
    }

    /// `FunctionCall := WORD '(' ( Expression (',' Expression)* )? ')'`.
    /// Unlike [Self::expressions], each argument is popped into the
    /// parameter list immediately after it's evaluated.
    fn function_call(&mut self, name_token: Token) -> bool {
        self.pos += 1; // WORD
        self.pos += 1; // '('
        let mut args = Vec::new();
        if !self.check(TokenCategory::Rp) {
            loop {
                if !self.expression() {
                    return false;
                }
                let Some(value) = self.pop() else {
                    return false;
                };
                args.push(value);
                if self.check(TokenCategory::Comma) {
                    self.pos += 1;
                    continue;
                }
                break;
            }
        }
        if self.check(TokenCategory::Rp) {
            self.pos += 1;
        } else {
            self.errors.push(
                EvalError::PoorlyTerminatedExpression,
                Some(name_token),
            );
            return false;
        }

        let name = name_token.lexeme.clone();
        let Some(entry) = self.registry.get_function(&name).cloned() else {
            self.errors
                .push(EvalError::UndefinedFunction { name }, Some(name_token));
            return false;
        };
        if !entry.accepts_arity(args.len()) {
            self.errors.push(
                EvalError::WrongArity {
                    name,
                    got: args.len(),
                },
                Some(name_token),
            );
            return false;
        }

        if self.parse_only {
            self.push(Value::number(1.0, name_token.offset));
            return true;
        }

        let payloads: Vec<Payload> =
            args.iter().map(|v| v.payload.clone()).collect();
        match (entry.invoke)(&payloads).traced() {
            Ok(payload) => {
                self.push(Value::from_call_result(payload, name_token.offset));
                true
            }
            Err(source) => {
                self.errors.push(
                    EvalError::Call {
                        name: name_token.lexeme.clone(),
                        source,
                    },
                    Some(name_token),
                );
                false
            }
        }
    }
}

fn apply_arith(
    op: &str,
    lhs: &Value,
    rhs: &Value,
    errors: &mut ErrorCollector,
    op_token: &Token,
) -> Option<Value> {
    let (l, r) = (lhs.to_number(), rhs.to_number());
    let result = match op {
        "+" => l + r,
        "-" => l - r,
        "*" => l * r,
        "/" => {
            if r == 0.0 {
                errors.push(EvalError::DivisionByZero, Some(op_token.clone()));
                return None;
            }
            l / r
        }
        _ => unreachable!("apply_arith only called with +, -, *, /"),
    };
    Some(Value::number(result, op_token.offset))
}

/// Verify, before any evaluation runs, that the token list contains no
/// unsupported syntax, that parentheses are balanced with no negative
/// running depth, and that every name token resolves to something the
/// registry actually knows about.
fn pre_parse_check(
    tokens: &[Token],
    registry: &Registry,
    errors: &mut ErrorCollector,
) {
    let mut depth = 0i32;
    for (i, token) in tokens.iter().enumerate() {
        match token.category {
            TokenCategory::Other => {
                errors.push(EvalError::UnsupportedSyntax, Some(token.clone()));
            }
            TokenCategory::UnterminatedStr => {
                errors.push(EvalError::UnterminatedString, Some(token.clone()));
            }
            TokenCategory::Lp => depth += 1,
            TokenCategory::Rp => {
                depth -= 1;
                if depth < 0 {
                    errors.push(EvalError::UnbalancedParens, Some(token.clone()));
                    depth = 0;
                }
            }
            TokenCategory::Word | TokenCategory::Sgqa => {
                let is_call = token.category == TokenCategory::Word
                    && tokens
                        .get(i + 1)
                        .is_some_and(|t| t.category == TokenCategory::Lp);
                let name = token.lexeme.clone();
                let resolvable = if is_call {
                    registry.is_function(&name)
                } else {
                    registry.is_variable(&name) || registry.is_reserved(&name)
                };
                if !resolvable {
                    let error = if is_call {
                        EvalError::UndefinedFunction { name }
                    } else {
                        EvalError::UndefinedName { name }
                    };
                    errors.push(error, Some(token.clone()));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        errors.push(EvalError::UnbalancedParens, None);
    }
}
