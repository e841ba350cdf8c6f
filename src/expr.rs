use crate::scope::Scope;
use std::fmt;
use thiserror::Error;

/// Failure to compile or evaluate a linear expression.
///
/// Every call site in the engine recovers from this locally by substituting
/// the `'?'` marker; it is never allowed to abort sibling rows, samples or
/// entities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("wrong number of arguments to `{0}`")]
    Arity(&'static str),
    #[error("result is not a finite number")]
    NonFinite,
}

/// A complex number as a plain (re, im) pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }

    pub fn abs(self) -> f64 {
        self.re.hypot(self.im)
    }

    pub fn arg(self) -> f64 {
        self.im.atan2(self.re)
    }

    pub fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }

    fn sub(self, rhs: Complex) -> Complex {
        Complex::new(self.re - rhs.re, self.im - rhs.im)
    }

    fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }

    fn div(self, rhs: Complex) -> Complex {
        let denom = rhs.re * rhs.re + rhs.im * rhs.im;
        Complex::new(
            (self.re * rhs.re + self.im * rhs.im) / denom,
            (self.im * rhs.re - self.re * rhs.im) / denom,
        )
    }

    fn exp(self) -> Complex {
        let m = self.re.exp();
        Complex::new(m * self.im.cos(), m * self.im.sin())
    }

    fn ln(self) -> Complex {
        Complex::new(self.abs().ln(), self.arg())
    }

    fn sqrt(self) -> Complex {
        let m = self.abs().sqrt();
        let a = self.arg() / 2.0;
        Complex::new(m * a.cos(), m * a.sin())
    }

    fn pow(self, rhs: Complex) -> Complex {
        rhs.mul(self.ln()).exp()
    }

    fn sin(self) -> Complex {
        Complex::new(
            self.re.sin() * self.im.cosh(),
            self.re.cos() * self.im.sinh(),
        )
    }

    fn cos(self) -> Complex {
        Complex::new(
            self.re.cos() * self.im.cosh(),
            -self.re.sin() * self.im.sinh(),
        )
    }

    fn tan(self) -> Complex {
        self.sin().div(self.cos())
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < 0.0 {
            write!(f, "{} - {}i", self.re, -self.im)
        } else {
            write!(f, "{} + {}i", self.re, self.im)
        }
    }
}

/// An evaluation result: a real number, or a complex one.
///
/// Arithmetic stays in the real domain and promotes to complex only when an
/// operation demands it (`sqrt`/`log` of a negative, a negative base raised
/// to a non-integer power), so a genuinely real computation is classified as
/// real exactly rather than as a complex value with a rounding-error
/// imaginary part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Real(f64),
    Complex(Complex),
}

impl Value {
    pub fn re(self) -> f64 {
        match self {
            Value::Real(x) => x,
            Value::Complex(c) => c.re,
        }
    }

    pub fn im(self) -> f64 {
        match self {
            Value::Real(_) => 0.0,
            Value::Complex(c) => c.im,
        }
    }

    pub fn is_real(self) -> bool {
        self.im() == 0.0
    }

    fn to_complex(self) -> Complex {
        match self {
            Value::Real(x) => Complex::new(x, 0.0),
            Value::Complex(c) => c,
        }
    }

    fn is_finite(self) -> bool {
        match self {
            Value::Real(x) => x.is_finite(),
            Value::Complex(c) => c.is_finite(),
        }
    }

    /// A complex result whose imaginary part collapsed to exactly zero is a
    /// real result.
    fn normalized(self) -> Value {
        match self {
            Value::Complex(c) if c.im == 0.0 => Value::Real(c.re),
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Real(x) => write!(f, "{}", x),
            Value::Complex(c) => write!(f, "{}", c),
        }
    }
}

fn add(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Real(x), Value::Real(y)) => Value::Real(x + y),
        _ => Value::Complex(a.to_complex().add(b.to_complex())).normalized(),
    }
}

fn sub(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Real(x), Value::Real(y)) => Value::Real(x - y),
        _ => Value::Complex(a.to_complex().sub(b.to_complex())).normalized(),
    }
}

fn mul(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Real(x), Value::Real(y)) => Value::Real(x * y),
        _ => Value::Complex(a.to_complex().mul(b.to_complex())).normalized(),
    }
}

fn div(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Real(x), Value::Real(y)) => Value::Real(x / y),
        _ => Value::Complex(a.to_complex().div(b.to_complex())).normalized(),
    }
}

fn pow(a: Value, b: Value) -> Value {
    match (a, b) {
        // A negative base under a non-integer exponent leaves the reals.
        (Value::Real(x), Value::Real(y)) if x >= 0.0 || y.fract() == 0.0 => Value::Real(x.powf(y)),
        _ => Value::Complex(a.to_complex().pow(b.to_complex())).normalized(),
    }
}

fn neg(a: Value) -> Value {
    match a {
        Value::Real(x) => Value::Real(-x),
        Value::Complex(c) => Value::Complex(Complex::new(-c.re, -c.im)),
    }
}

fn sqrt(a: Value) -> Value {
    match a {
        Value::Real(x) if x >= 0.0 => Value::Real(x.sqrt()),
        Value::Real(x) => Value::Complex(Complex::new(0.0, (-x).sqrt())),
        Value::Complex(c) => Value::Complex(c.sqrt()).normalized(),
    }
}

fn ln(a: Value) -> Value {
    match a {
        Value::Real(x) if x >= 0.0 => Value::Real(x.ln()),
        Value::Real(x) => Value::Complex(Complex::new((-x).ln(), std::f64::consts::PI)),
        Value::Complex(c) => Value::Complex(c.ln()).normalized(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Builtin {
    Sqrt,
    Sin,
    Cos,
    Tan,
    Log,
    Exp,
    Abs,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "sqrt" => Some(Builtin::Sqrt),
            "sin" => Some(Builtin::Sin),
            "cos" => Some(Builtin::Cos),
            "tan" => Some(Builtin::Tan),
            "log" => Some(Builtin::Log),
            "exp" => Some(Builtin::Exp),
            "abs" => Some(Builtin::Abs),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Num(f64),
    Sym(String),
    Neg(Box<Node>),
    Bin(BinOp, Box<Node>, Box<Node>),
    Call(Builtin, Vec<Node>),
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

fn lex(src: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' | '[' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' | ']' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Scientific notation: the `e` is part of the literal only
                // when digits (optionally signed) actually follow.
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| EvalError::Syntax(format!("bad number `{}`", text)))?;
                tokens.push(Token::Num(value));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => return Err(EvalError::Syntax(format!("unexpected character `{}`", c))),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), EvalError> {
        if self.next().as_ref() == Some(&token) {
            Ok(())
        } else {
            Err(EvalError::Syntax(format!("expected {}", what)))
        }
    }

    fn parse_sum(&mut self) -> Result<Node, EvalError> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let rhs = self.parse_term()?;
                    lhs = Node::Bin(BinOp::Add, Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let rhs = self.parse_term()?;
                    lhs = Node::Bin(BinOp::Sub, Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_term(&mut self) -> Result<Node, EvalError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    lhs = Node::Bin(BinOp::Mul, Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    lhs = Node::Bin(BinOp::Div, Box::new(lhs), Box::new(rhs));
                }
                // Implicit multiplication: `2x`, `(a)(b)`, `)sin(` and the
                // like — anything that starts a new operand.
                Some(Token::Num(_)) | Some(Token::Ident(_)) | Some(Token::LParen) => {
                    let rhs = self.parse_unary()?;
                    lhs = Node::Bin(BinOp::Mul, Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Node, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.parse_unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    /// `^` is right-associative and binds tighter than unary minus, so
    /// `-x^2` is `-(x^2)` and `2^-3` parses.
    fn parse_power(&mut self) -> Result<Node, EvalError> {
        let base = self.parse_atom()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let exponent = self.parse_unary()?;
            Ok(Node::Bin(BinOp::Pow, Box::new(base), Box::new(exponent)))
        } else {
            Ok(base)
        }
    }

    fn parse_atom(&mut self) -> Result<Node, EvalError> {
        match self.next() {
            Some(Token::Num(x)) => Ok(Node::Num(x)),
            Some(Token::LParen) => {
                let inner = self.parse_sum()?;
                self.expect(Token::RParen, "closing delimiter")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    match Builtin::from_name(&name) {
                        Some(builtin) => self.parse_call(builtin),
                        None => Err(EvalError::UnknownFunction(name)),
                    }
                } else {
                    Ok(Node::Sym(name))
                }
            }
            Some(other) => Err(EvalError::Syntax(format!("unexpected token {:?}", other))),
            None => Err(EvalError::Syntax("unexpected end of expression".to_string())),
        }
    }

    fn parse_call(&mut self, builtin: Builtin) -> Result<Node, EvalError> {
        self.pos += 1; // the opening delimiter
        let mut args = vec![self.parse_sum()?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.parse_sum()?);
        }
        self.expect(Token::RParen, "closing delimiter")?;
        let ok = match builtin {
            Builtin::Log => args.len() == 1 || args.len() == 2,
            _ => args.len() == 1,
        };
        if !ok {
            let name = match builtin {
                Builtin::Sqrt => "sqrt",
                Builtin::Sin => "sin",
                Builtin::Cos => "cos",
                Builtin::Tan => "tan",
                Builtin::Log => "log",
                Builtin::Exp => "exp",
                Builtin::Abs => "abs",
            };
            return Err(EvalError::Arity(name));
        }
        Ok(Node::Call(builtin, args))
    }
}

/// An expression compiled once and evaluable against any scope.
#[derive(Clone, Debug)]
pub struct CompiledExpr {
    source: String,
    root: Node,
}

impl CompiledExpr {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates against `scope`. Row-local bindings shadow the constants
    /// `pi` and `e`; a non-finite result (division by zero, log of zero) is
    /// an error, not a value.
    pub fn eval(&self, scope: &Scope) -> Result<Value, EvalError> {
        let value = eval_node(&self.root, scope)?;
        if !value.is_finite() {
            return Err(EvalError::NonFinite);
        }
        Ok(value)
    }
}

fn eval_node(node: &Node, scope: &Scope) -> Result<Value, EvalError> {
    match node {
        Node::Num(x) => Ok(Value::Real(*x)),
        Node::Sym(name) => match scope.get(name) {
            Some(v) => Ok(Value::Real(*v)),
            None => match name.as_str() {
                "pi" => Ok(Value::Real(std::f64::consts::PI)),
                "e" => Ok(Value::Real(std::f64::consts::E)),
                _ => Err(EvalError::UnknownSymbol(name.clone())),
            },
        },
        Node::Neg(inner) => Ok(neg(eval_node(inner, scope)?)),
        Node::Bin(op, lhs, rhs) => {
            let a = eval_node(lhs, scope)?;
            let b = eval_node(rhs, scope)?;
            Ok(match op {
                BinOp::Add => add(a, b),
                BinOp::Sub => sub(a, b),
                BinOp::Mul => mul(a, b),
                BinOp::Div => div(a, b),
                BinOp::Pow => pow(a, b),
            })
        }
        Node::Call(builtin, args) => {
            let first = eval_node(&args[0], scope)?;
            Ok(match builtin {
                Builtin::Sqrt => sqrt(first),
                Builtin::Sin => match first {
                    Value::Real(x) => Value::Real(x.sin()),
                    Value::Complex(c) => Value::Complex(c.sin()).normalized(),
                },
                Builtin::Cos => match first {
                    Value::Real(x) => Value::Real(x.cos()),
                    Value::Complex(c) => Value::Complex(c.cos()).normalized(),
                },
                Builtin::Tan => match first {
                    Value::Real(x) => Value::Real(x.tan()),
                    Value::Complex(c) => Value::Complex(c.tan()).normalized(),
                },
                Builtin::Exp => match first {
                    Value::Real(x) => Value::Real(x.exp()),
                    Value::Complex(c) => Value::Complex(c.exp()).normalized(),
                },
                Builtin::Abs => Value::Real(match first {
                    Value::Real(x) => x.abs(),
                    Value::Complex(c) => c.abs(),
                }),
                Builtin::Log => {
                    let natural = ln(first);
                    if args.len() == 2 {
                        let base = eval_node(&args[1], scope)?;
                        div(natural, ln(base))
                    } else {
                        natural
                    }
                }
            })
        }
    }
}

/// Compiles a linear expression string.
pub fn compile(src: &str) -> Result<CompiledExpr, EvalError> {
    let tokens = lex(src)?;
    if tokens.is_empty() {
        return Err(EvalError::Syntax("empty expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let root = parser.parse_sum()?;
    if parser.pos != parser.tokens.len() {
        return Err(EvalError::Syntax("trailing input after expression".to_string()));
    }
    Ok(CompiledExpr {
        source: src.to_string(),
        root,
    })
}

/// Compile-and-evaluate convenience for one-shot callers.
pub fn evaluate(src: &str, scope: &Scope) -> Result<Value, EvalError> {
    compile(src)?.eval(scope)
}
