//! Formula parser.
//!
//! Recursive descent parser for the formula grammar. Converts text to an
//! [`Expr`] tree with error messages carrying the character offset.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | atom
//! atom   := number | call | reference | '(' expr ')'
//! call   := ('abs' | 'min' | 'max') '(' expr (',' expr)* ')'
//! ```

use crate::domain::error::ParseError;
use crate::domain::formula::{BinaryOp, Expr, Function};

/// Deepest expression tree (and deepest bracket nesting) a formula may have.
/// Evaluation and display recurse over the tree.
pub const MAX_DEPTH: usize = 256;

/// A parsed subtree and its height.
type Parsed = (Expr, usize);

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            nesting: 0,
        }
    }

    /// Errors report character offsets; `pos` is a byte offset.
    fn error(&self, message: String, byte_pos: usize) -> ParseError {
        ParseError {
            message,
            position: self.input[..byte_pos].chars().count(),
        }
    }

    fn too_deep(&self, start: usize) -> ParseError {
        self.error(format!("formula nested too deeply (limit {})", MAX_DEPTH), start)
    }

    fn enter(&mut self, start: usize) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(self.too_deep(start));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn node(&self, expr: Expr, height: usize, start: usize) -> Result<Parsed, ParseError> {
        if height > MAX_DEPTH {
            return Err(self.too_deep(start));
        }
        Ok((expr, height))
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch), self.pos)),
            None => Err(self.error(format!("expected '{}', found end of input", expected), self.pos)),
        }
    }

    fn is_identifier_char(ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || ch == '&'
    }

    fn peek_identifier(&self) -> &'a str {
        let remaining = self.remaining();
        let end = remaining
            .char_indices()
            .find(|&(_, c)| !Self::is_identifier_char(c))
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        &remaining[..end]
    }

    fn found_description(&self) -> String {
        self.peek()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(self.error("expected number".to_string(), start));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map_err(|_| self.error(format!("invalid number: {}", num_str), start))
    }

    fn parse_call(&mut self, func: Function, name_start: usize) -> Result<Parsed, ParseError> {
        self.expect_char('(')?;
        self.enter(name_start)?;
        let (first, mut height) = self.parse_expr()?;
        let mut args = vec![first];

        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            let (arg, h) = self.parse_expr()?;
            height = height.max(h);
            args.push(arg);
        }
        self.leave();

        let arity_ok = match func {
            Function::Abs => args.len() == 1,
            Function::Min | Function::Max => args.len() >= 2,
        };
        if !arity_ok {
            let expected = match func {
                Function::Abs => "exactly 1 argument",
                Function::Min | Function::Max => "at least 2 arguments",
            };
            return Err(self.error(
                format!("{} requires {}, found {}", func.name(), expected, args.len()),
                name_start,
            ));
        }

        self.node(Expr::Call { func, args }, height + 1, name_start)
    }

    fn parse_atom(&mut self) -> Result<Parsed, ParseError> {
        self.skip_whitespace();

        match self.peek() {
            Some('(') => {
                let start = self.pos;
                self.advance();
                self.enter(start)?;
                let inner = self.parse_expr()?;
                self.expect_char(')')?;
                self.leave();
                Ok(inner)
            }
            Some(ch) if ch.is_ascii_digit() || ch == '.' => Ok((Expr::Number(self.parse_number()?), 1)),
            Some(ch) if ch.is_ascii_alphabetic() => {
                let start = self.pos;
                let word = self.peek_identifier();
                self.pos += word.len();

                let func = match word {
                    "abs" => Some(Function::Abs),
                    "min" => Some(Function::Min),
                    "max" => Some(Function::Max),
                    _ => None,
                };
                if let Some(func) = func {
                    self.skip_whitespace();
                    if self.peek() == Some('(') {
                        return self.parse_call(func, start);
                    }
                }

                if word.ends_with('.') {
                    return Err(self.error(format!("reference '{}' ends with '.'", word), start));
                }
                Ok((Expr::Ref(word.to_string()), 1))
            }
            _ => Err(self.error(
                format!("expected number, reference or '(', found {}", self.found_description()),
                self.pos,
            )),
        }
    }

    fn parse_unary(&mut self) -> Result<Parsed, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('-') {
            let start = self.pos;
            self.advance();
            self.enter(start)?;
            let (inner, height) = self.parse_unary()?;
            self.leave();
            return self.node(Expr::Neg(Box::new(inner)), height + 1, start);
        }
        self.parse_atom()
    }

    fn parse_term(&mut self) -> Result<Parsed, ParseError> {
        let (mut left, mut height) = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let op = match self.peek() {
                Some('*') => BinaryOp::Multiply,
                Some('/') => BinaryOp::Divide,
                _ => return Ok((left, height)),
            };
            self.advance();
            let (right, h) = self.parse_unary()?;
            (left, height) = self.node(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                height.max(h) + 1,
                start,
            )?;
        }
    }

    fn parse_expr(&mut self) -> Result<Parsed, ParseError> {
        let (mut left, mut height) = self.parse_term()?;
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let op = match self.peek() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Subtract,
                _ => return Ok((left, height)),
            };
            self.advance();
            let (right, h) = self.parse_term()?;
            (left, height) = self.node(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                height.max(h) + 1,
                start,
            )?;
        }
    }

    fn parse(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(self.error("empty formula".to_string(), 0));
        }
        let (expr, _) = self.parse_expr()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(
                format!("unexpected input after formula: '{}'", self.remaining()),
                self.pos,
            ));
        }
        Ok(expr)
    }
}

pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(name: &str) -> Box<Expr> {
        Box::new(Expr::Ref(name.to_string()))
    }

    #[test]
    fn parse_single_reference() {
        assert_eq!(parse("is.NetRevenue").unwrap(), Expr::Ref("is.NetRevenue".into()));
        assert_eq!(parse("  pp&e ").unwrap(), Expr::Ref("pp&e".into()));
    }

    #[test]
    fn parse_subtraction() {
        let expr = parse("revenue - cogs").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Subtract,
                left: r("revenue"),
                right: r("cogs"),
            }
        );
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse("a + b * c").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinaryOp::Multiply, .. })),
            other => panic!("expected addition at root, got {other:?}"),
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = parse("a - b - c").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Subtract,
                left,
                right,
            } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Subtract, .. }));
                assert_eq!(right, r("c"));
            }
            other => panic!("expected subtraction at root, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse("(a + b) * 365").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Multiply,
                left,
                right,
            } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Add, .. }));
                assert_eq!(*right, Expr::Number(365.0));
            }
            other => panic!("expected multiplication at root, got {other:?}"),
        }
    }

    #[test]
    fn parse_unary_minus() {
        assert_eq!(parse("-capex").unwrap(), Expr::Neg(r("capex")));
    }

    #[test]
    fn parse_function_calls() {
        assert_eq!(
            parse("abs(interest_expense)").unwrap(),
            Expr::Call {
                func: Function::Abs,
                args: vec![Expr::Ref("interest_expense".into())],
            }
        );
        assert!(matches!(
            parse("max(a, b, 0)").unwrap(),
            Expr::Call { func: Function::Max, ref args } if args.len() == 3
        ));
    }

    #[test]
    fn function_names_without_call_are_references() {
        assert_eq!(parse("min").unwrap(), Expr::Ref("min".into()));
    }

    #[test]
    fn abs_requires_one_argument() {
        let err = parse("abs(a, b)").unwrap_err();
        assert!(err.message.contains("abs requires exactly 1 argument"));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn min_requires_two_arguments() {
        let err = parse("1 + min(a)").unwrap_err();
        assert!(err.message.contains("at least 2"));
        assert_eq!(err.position, 4);
    }

    #[test]
    fn error_on_empty_input() {
        let err = parse("   ").unwrap_err();
        assert_eq!(err.message, "empty formula");
    }

    #[test]
    fn error_on_dangling_operator() {
        let err = parse("revenue -").unwrap_err();
        assert_eq!(err.position, 9);
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn error_on_unbalanced_parenthesis() {
        let err = parse("(a + b").unwrap_err();
        assert!(err.message.contains("expected ')'"));
    }

    #[test]
    fn error_on_trailing_input() {
        let err = parse("a b").unwrap_err();
        assert_eq!(err.position, 2);
        assert!(err.message.contains("unexpected input after formula"));
    }

    #[test]
    fn error_on_reference_ending_with_dot() {
        let err = parse("is. + 1").unwrap_err();
        assert!(err.message.contains("ends with '.'"));
    }

    #[test]
    fn decimal_numbers() {
        assert_eq!(parse("0.25").unwrap(), Expr::Number(0.25));
        assert_eq!(parse(".5").unwrap(), Expr::Number(0.5));
    }

    #[test]
    fn deep_bracket_nesting_is_rejected() {
        let n = 200_000;
        let input = format!("{}a{}", "(".repeat(n), ")".repeat(n));
        let err = parse(&input).unwrap_err();
        assert!(err.message.contains("nested too deeply"), "{}", err.message);
        assert_eq!(err.position, MAX_DEPTH);
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        let input = vec!["a"; 10_000].join(" + ");
        let err = parse(&input).unwrap_err();
        assert!(err.message.contains("nested too deeply"));

        let negations = format!("{}a", "-".repeat(100_000));
        assert!(parse(&negations).unwrap_err().message.contains("nested too deeply"));
    }

    #[test]
    fn nesting_within_limit_parses() {
        let depth = MAX_DEPTH - 1;
        let input = format!("{}a{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&input).unwrap(), Expr::Ref("a".into()));
        assert!(parse(&vec!["a"; 200].join(" * ")).is_ok());
    }

    #[test]
    fn positions_count_characters() {
        // 'é' is two bytes but one character
        let err = parse("é").unwrap_err();
        assert_eq!(err.position, 0);
        let err = parse("(a + b) é").unwrap_err();
        assert_eq!(err.position, 8);
        let err = parse("max(a, ü)").unwrap_err();
        assert_eq!(err.position, 7);
        let err = parse("a\u{a0}+\u{a0}\u{a0}*").unwrap_err();
        assert_eq!(err.position, 5);
    }
}
