//! Expression evaluation
//!
//! The directive-body grammar: literals, bare identifiers resolved against
//! the data binding, `$var` paths resolved against loop variables, comparison
//! operators on comparable scalars, and calls into the user function table.

use std::collections::BTreeMap;

use crate::render::value::{Functions, ReportData, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Identifier or `$var` path not present in the binding.
    Undefined(String),
    /// The body does not parse as an expression.
    Syntax(String),
    /// A user function signalled failure.
    Function { name: String, reason: String },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Undefined(name) => write!(f, "undefined identifier '{name}'"),
            EvalError::Syntax(msg) => write!(f, "invalid expression: {msg}"),
            EvalError::Function { name, reason } => write!(f, "function '{name}' failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Var(String),
    Str(String),
    Int(i64),
    Float(f64),
    True,
    False,
    Null,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    LParen,
    RParen,
    Comma,
    Dot,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Eq);
                } else {
                    return Err(EvalError::Syntax("expected '=='".into()));
                }
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ne);
                } else {
                    return Err(EvalError::Syntax("expected '!='".into()));
                }
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => s.push(c),
                        None => return Err(EvalError::Syntax("unterminated string".into())),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '$' => {
                chars.next();
                let mut name = String::from("$");
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.len() == 1 {
                    return Err(EvalError::Syntax("'$' without a variable name".into()));
                }
                tokens.push(Token::Var(name));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut num = String::new();
                num.push(c);
                chars.next();
                let mut is_float = false;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        num.push(c);
                        chars.next();
                    } else if c == '.' && !is_float {
                        // Look past the dot: only consume it as a decimal point.
                        let mut ahead = chars.clone();
                        ahead.next();
                        if ahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                            is_float = true;
                            num.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                if is_float {
                    let x: f64 = num
                        .parse()
                        .map_err(|_| EvalError::Syntax(format!("bad number '{num}'")))?;
                    tokens.push(Token::Float(x));
                } else {
                    let i: i64 = num
                        .parse()
                        .map_err(|_| EvalError::Syntax(format!("bad number '{num}'")))?;
                    tokens.push(Token::Int(i));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(ident),
                });
            }
            other => return Err(EvalError::Syntax(format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

pub struct Evaluator<'a> {
    pub data: &'a ReportData,
    pub vars: &'a BTreeMap<String, Value>,
    pub functions: &'a Functions,
}

struct Parser<'a, 'b> {
    tokens: Vec<Token>,
    pos: usize,
    env: &'b Evaluator<'a>,
}

impl<'a> Evaluator<'a> {
    /// Evaluate a directive body against the binding and loop variables.
    pub fn evaluate(&self, expr: &str) -> Result<Value, EvalError> {
        let tokens = tokenize(expr)?;
        if tokens.is_empty() {
            return Err(EvalError::Syntax("empty expression".into()));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            env: self,
        };
        let value = parser.comparison()?;
        if parser.pos != parser.tokens.len() {
            return Err(EvalError::Syntax(format!(
                "trailing tokens in '{expr}'"
            )));
        }
        Ok(value)
    }
}

impl<'a, 'b> Parser<'a, 'b> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn comparison(&mut self) -> Result<Value, EvalError> {
        let left = self.operand()?;
        let op = match self.peek() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.operand()?;
        Ok(Value::Bool(compare(op, &left, &right)))
    }

    fn operand(&mut self) -> Result<Value, EvalError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::Int(i)) => Ok(Value::Int(i)),
            Some(Token::Float(x)) => Ok(Value::Float(x)),
            Some(Token::True) => Ok(Value::Bool(true)),
            Some(Token::False) => Ok(Value::Bool(false)),
            Some(Token::Null) => Ok(Value::Null),
            Some(Token::Var(name)) => self.var_path(name),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.call(name)
                } else {
                    self.env
                        .data
                        .get(&name)
                        .cloned()
                        .ok_or(EvalError::Undefined(name))
                }
            }
            other => Err(EvalError::Syntax(format!(
                "expected a value, found {other:?}"
            ))),
        }
    }

    /// `$name` with optional `.field` dereferences into maps.
    fn var_path(&mut self, name: String) -> Result<Value, EvalError> {
        let mut path = name.clone();
        let mut value = self
            .env
            .vars
            .get(&name)
            .cloned()
            .ok_or_else(|| EvalError::Undefined(name))?;
        while matches!(self.peek(), Some(Token::Dot)) {
            self.pos += 1;
            let field = match self.next() {
                Some(Token::Ident(field)) => field,
                _ => return Err(EvalError::Syntax("expected field name after '.'".into())),
            };
            path = format!("{path}.{field}");
            value = match value.as_map().and_then(|map| map.get(&field)) {
                Some(v) => v.clone(),
                None => return Err(EvalError::Undefined(path)),
            };
        }
        Ok(value)
    }

    fn call(&mut self, name: String) -> Result<Value, EvalError> {
        self.pos += 1; // consume '('
        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                args.push(self.comparison()?);
                match self.next() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    _ => return Err(EvalError::Syntax("expected ',' or ')'".into())),
                }
            }
        } else {
            self.pos += 1; // consume ')'
        }
        let function = self
            .env
            .functions
            .get(&name)
            .ok_or_else(|| EvalError::Undefined(name.clone()))?;
        function(&args).map_err(|reason| EvalError::Function { name, reason })
    }
}

#[derive(Debug, Clone, Copy)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

/// Comparison on comparable scalars; any type mismatch yields false.
fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        };
    }
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        return match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        };
    }
    if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
        return match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            _ => false,
        };
    }
    false
}
