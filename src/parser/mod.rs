//! PromQL parser producing a position-annotated syntax tree
//!
//! ```text
//! source -> Lexer -> tokens -> Parser -> Expr
//! ```
//!
//! Lexical errors are all collected; syntax and type errors stop at the
//! first one found.

pub mod ast;
pub mod functions;
pub mod lexer;
pub mod walk;

pub use ast::*;
pub use walk::inspect;

use crate::position::SourceRange;
use lexer::{Lexer, Token, TokenKind};
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// A single structured parse error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub range: SourceRange,
    pub message: String,
}

impl ParseError {
    pub fn new(range: SourceRange, message: impl Into<String>) -> Self {
        Self {
            range,
            message: message.into(),
        }
    }
}

/// Non-empty list of parse errors, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrors(Vec<ParseError>);

impl ParseErrors {
    pub fn iter(&self) -> std::slice::Iter<'_, ParseError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&ParseError> {
        self.0.first()
    }
}

impl From<Vec<ParseError>> for ParseErrors {
    fn from(errors: Vec<ParseError>) -> Self {
        Self(errors)
    }
}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ParseErrors {}

/// Parse a PromQL expression
pub fn parse(source: &str) -> Result<Expr, ParseErrors> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser {
        source,
        tokens,
        position: 0,
    };

    let expr = parser.parse_root()?;
    Ok(expr)
}

type PResult<T> = Result<T, ParseError>;

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    position: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Token {
        self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_nth(&self, n: usize) -> Token {
        self.tokens[(self.position + n).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn text(&self, token: Token) -> &'src str {
        token.text(self.source)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Check whether the next token is the (case-insensitive) keyword
    fn at_keyword(&self, keyword: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Identifier && self.text(token).eq_ignore_ascii_case(keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> Option<Token> {
        if self.at_keyword(keyword) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn unexpected(&self, token: Token, context: &str) -> ParseError {
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Identifier | TokenKind::Number | TokenKind::Duration => {
                format!("{} {:?}", token.kind.describe(), self.text(token))
            }
            kind => kind.describe().to_string(),
        };
        ParseError::new(token.range, format!("unexpected {} in {}", found, context))
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> PResult<Token> {
        let token = self.peek();
        if token.kind == kind {
            Ok(self.advance())
        } else {
            let mut err = self.unexpected(token, context);
            err.message.push_str(&format!(", expected {}", kind.describe()));
            Err(err)
        }
    }

    fn parse_root(&mut self) -> PResult<Expr> {
        if self.at(TokenKind::Eof) {
            return Err(ParseError::new(self.peek().range, "no expression found in input"));
        }

        let expr = self.parse_expr(0)?;
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            return Err(self.unexpected(token, "expression"));
        }

        Ok(expr)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let token = self.peek();
        let op = match token.kind {
            TokenKind::Add => BinaryOp::Add,
            TokenKind::Sub => BinaryOp::Sub,
            TokenKind::Mul => BinaryOp::Mul,
            TokenKind::Div => BinaryOp::Div,
            TokenKind::Mod => BinaryOp::Mod,
            TokenKind::Pow => BinaryOp::Pow,
            TokenKind::Eql => BinaryOp::Eql,
            TokenKind::Neq => BinaryOp::Neq,
            TokenKind::Gtr => BinaryOp::Gtr,
            TokenKind::Lss => BinaryOp::Lss,
            TokenKind::Gte => BinaryOp::Gte,
            TokenKind::Lte => BinaryOp::Lte,
            TokenKind::Identifier => match self.text(token).to_lowercase().as_str() {
                "and" => BinaryOp::And,
                "or" => BinaryOp::Or,
                "unless" => BinaryOp::Unless,
                "atan2" => BinaryOp::Atan2,
                _ => return None,
            },
            _ => return None,
        };
        Some(op)
    }

    /// Precedence-climbing loop over binary operators
    fn parse_expr(&mut self, min_precedence: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.peek_binary_op() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            let op_token = self.advance();

            let return_bool = if op.is_comparison() {
                self.eat_keyword("bool").is_some()
            } else {
                false
            };
            let matching = self.parse_vector_matching(op)?;

            let next_min = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let rhs = self.parse_expr(next_min)?;

            lhs = self.build_binary(op, op_token, lhs, rhs, return_bool, matching)?;
        }

        Ok(lhs)
    }

    fn build_binary(
        &self,
        op: BinaryOp,
        op_token: Token,
        lhs: Expr,
        rhs: Expr,
        return_bool: bool,
        matching: Option<VectorMatching>,
    ) -> PResult<Expr> {
        let range = lhs.range().cover(rhs.range());
        let (lt, rt) = (lhs.value_type(), rhs.value_type());

        for side in [&lhs, &rhs] {
            if !matches!(side.value_type(), ValueType::Scalar | ValueType::Vector) {
                return Err(ParseError::new(
                    side.range(),
                    format!(
                        "binary expression must contain only scalar and instant vector types, got {}",
                        side.value_type()
                    ),
                ));
            }
        }

        if op.is_set_operator() && (lt == ValueType::Scalar || rt == ValueType::Scalar) {
            return Err(ParseError::new(
                op_token.range,
                format!("set operator {:?} not allowed in binary scalar expression", op.to_string()),
            ));
        }

        if op.is_comparison() && !return_bool && lt == ValueType::Scalar && rt == ValueType::Scalar
        {
            return Err(ParseError::new(
                op_token.range,
                "comparisons between scalars must use BOOL modifier",
            ));
        }

        if return_bool && !op.is_comparison() {
            return Err(ParseError::new(
                op_token.range,
                "bool modifier can only be used on comparison operators",
            ));
        }

        if matching.is_some() && (lt != ValueType::Vector || rt != ValueType::Vector) {
            return Err(ParseError::new(
                op_token.range,
                "vector matching only allowed between instant vectors",
            ));
        }

        Ok(Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            return_bool,
            matching,
            range,
        }))
    }

    fn parse_vector_matching(&mut self, op: BinaryOp) -> PResult<Option<VectorMatching>> {
        let on = if self.eat_keyword("on").is_some() {
            true
        } else if self.eat_keyword("ignoring").is_some() {
            false
        } else {
            return Ok(None);
        };
        let labels = self.parse_label_list("vector matching")?;

        let mut card = Cardinality::OneToOne;
        let mut include = Vec::new();
        let group_token = if let Some(token) = self.eat_keyword("group_left") {
            card = Cardinality::ManyToOne;
            Some(token)
        } else if let Some(token) = self.eat_keyword("group_right") {
            card = Cardinality::OneToMany;
            Some(token)
        } else {
            None
        };

        if let Some(token) = group_token {
            if op.is_set_operator() {
                return Err(ParseError::new(
                    token.range,
                    "no grouping allowed for set operations",
                ));
            }
            if self.at(TokenKind::LeftParen) {
                include = self.parse_label_list("grouping")?;
            }
        }

        Ok(Some(VectorMatching {
            on,
            labels,
            card,
            include,
        }))
    }

    /// `( label, label, ... )` with an optional trailing comma
    fn parse_label_list(&mut self, context: &str) -> PResult<Vec<String>> {
        self.expect(TokenKind::LeftParen, context)?;
        let mut labels = Vec::new();

        loop {
            if self.eat(TokenKind::RightParen).is_some() {
                break;
            }

            let token = self.expect(TokenKind::Identifier, context)?;
            labels.push(self.text(token).to_string());

            if self.eat(TokenKind::Comma).is_none() {
                self.expect(TokenKind::RightParen, context)?;
                break;
            }
        }

        Ok(labels)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Add => UnaryOp::Plus,
            TokenKind::Sub => UnaryOp::Minus,
            _ => return self.parse_postfix(),
        };
        let op_token = self.advance();

        // Unary operators bind tighter than everything but `^`
        let operand = self.parse_expr(BinaryOp::Pow.precedence())?;
        let range = op_token.range.cover(operand.range());

        match (op, operand) {
            (UnaryOp::Plus, Expr::Number(n)) => Ok(Expr::Number(NumberLiteral {
                value: n.value,
                range,
            })),
            (UnaryOp::Minus, Expr::Number(n)) => Ok(Expr::Number(NumberLiteral {
                value: -n.value,
                range,
            })),
            (op, operand) => {
                if !matches!(operand.value_type(), ValueType::Scalar | ValueType::Vector) {
                    return Err(ParseError::new(
                        operand.range(),
                        format!(
                            "unary expression only allowed on expressions of type scalar or instant vector, got {}",
                            operand.value_type()
                        ),
                    ));
                }
                Ok(Expr::Unary(UnaryExpr {
                    op,
                    expr: Box::new(operand),
                    range,
                }))
            }
        }
    }

    /// Primary expression followed by `[range]`, `[range:step]`, `offset` and `@`
    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.at(TokenKind::LeftBracket) {
                expr = self.parse_range_suffix(expr)?;
            } else if self.at_keyword("offset") {
                expr = self.parse_offset(expr)?;
            } else if self.at(TokenKind::At) {
                expr = self.parse_at(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_duration_token(&mut self, context: &str) -> PResult<(i64, Token)> {
        let token = self.expect(TokenKind::Duration, context)?;
        let ms = lexer::parse_duration(self.text(token))
            .map_err(|message| ParseError::new(token.range, message))?;
        Ok((ms, token))
    }

    fn parse_range_suffix(&mut self, expr: Expr) -> PResult<Expr> {
        let open = self.advance();
        let (range_ms, _) = self.parse_duration_token("range")?;

        if self.eat(TokenKind::Colon).is_some() {
            let step_ms = if self.at(TokenKind::Duration) {
                Some(self.parse_duration_token("subquery step")?.0)
            } else {
                None
            };
            let close = self.expect(TokenKind::RightBracket, "subquery")?;

            if expr.value_type() != ValueType::Vector {
                return Err(ParseError::new(
                    expr.range(),
                    format!(
                        "subquery is only allowed on instant vector, got {}",
                        expr.value_type()
                    ),
                ));
            }

            let range = expr.range().cover(close.range);
            return Ok(Expr::Subquery(SubqueryExpr {
                expr: Box::new(expr),
                range_ms,
                step_ms,
                offset: None,
                at: None,
                range,
            }));
        }

        let close = self.expect(TokenKind::RightBracket, "range selector")?;
        match expr {
            Expr::VectorSelector(selector) => {
                let range = selector.range.cover(close.range);
                Ok(Expr::MatrixSelector(MatrixSelector {
                    selector,
                    range_ms,
                    range,
                }))
            }
            other => Err(ParseError::new(
                open.range.cover(close.range),
                format!(
                    "ranges only allowed for vector selectors, got {}",
                    other.value_type()
                ),
            )),
        }
    }

    fn parse_offset(&mut self, mut expr: Expr) -> PResult<Expr> {
        let keyword = self.advance();
        let negative = self.eat(TokenKind::Sub).is_some();
        let (ms, duration) = self.parse_duration_token("offset")?;
        let offset = if negative { -ms } else { ms };
        let end = duration.range;

        let slot = match &mut expr {
            Expr::VectorSelector(v) => {
                v.range = v.range.cover(end);
                &mut v.offset
            }
            Expr::MatrixSelector(m) => {
                m.range = m.range.cover(end);
                &mut m.selector.offset
            }
            Expr::Subquery(s) => {
                s.range = s.range.cover(end);
                &mut s.offset
            }
            _ => {
                return Err(ParseError::new(
                    keyword.range,
                    "offset modifier must be preceded by an instant vector selector or range vector selector or a subquery",
                ))
            }
        };

        if slot.is_some() {
            return Err(ParseError::new(
                keyword.range.cover(end),
                "offset may not be set multiple times",
            ));
        }
        *slot = Some(offset);

        Ok(expr)
    }

    fn parse_at(&mut self, mut expr: Expr) -> PResult<Expr> {
        let at_token = self.advance();

        let (modifier, end) = if self.at_keyword("start") || self.at_keyword("end") {
            let name = self.advance();
            let is_start = self.text(name).eq_ignore_ascii_case("start");
            self.expect(TokenKind::LeftParen, "@ modifier")?;
            let close = self.expect(TokenKind::RightParen, "@ modifier")?;
            let modifier = if is_start {
                AtModifier::Start
            } else {
                AtModifier::End
            };
            (modifier, close.range)
        } else {
            let negative = self.eat(TokenKind::Sub).is_some();
            let token = self.expect(TokenKind::Number, "@ modifier")?;
            let value = self.number_value(token)?;
            let value = if negative { -value } else { value };
            if !value.is_finite() {
                return Err(ParseError::new(
                    token.range,
                    "timestamp out of bounds for @ modifier",
                ));
            }
            (AtModifier::Timestamp(value), token.range)
        };

        let slot = match &mut expr {
            Expr::VectorSelector(v) => {
                v.range = v.range.cover(end);
                &mut v.at
            }
            Expr::MatrixSelector(m) => {
                m.range = m.range.cover(end);
                &mut m.selector.at
            }
            Expr::Subquery(s) => {
                s.range = s.range.cover(end);
                &mut s.at
            }
            _ => {
                return Err(ParseError::new(
                    at_token.range,
                    "@ modifier must be preceded by an instant vector selector or range vector selector or a subquery",
                ))
            }
        };

        if slot.is_some() {
            return Err(ParseError::new(
                at_token.range.cover(end),
                "@ <timestamp> may not be set multiple times",
            ));
        }
        *slot = Some(modifier);

        Ok(expr)
    }

    fn number_value(&self, token: Token) -> PResult<f64> {
        let text = self.text(token);
        let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).map(|v| v as f64).ok()
        } else {
            text.parse::<f64>().ok()
        };

        parsed.ok_or_else(|| ParseError::new(token.range, format!("invalid number {:?}", text)))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.peek();

        match token.kind {
            TokenKind::Number => {
                self.advance();
                let value = self.number_value(token)?;
                Ok(Expr::Number(NumberLiteral {
                    value,
                    range: token.range,
                }))
            }
            TokenKind::String => {
                self.advance();
                let value = lexer::unquote(self.text(token))
                    .map_err(|message| ParseError::new(token.range, message))?;
                Ok(Expr::String(StringLiteral {
                    value,
                    range: token.range,
                }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                let close = self.expect(TokenKind::RightParen, "parenthesized expression")?;
                Ok(Expr::Paren(ParenExpr {
                    expr: Box::new(inner),
                    range: token.range.cover(close.range),
                }))
            }
            TokenKind::LeftBrace => self.parse_vector_selector(None),
            TokenKind::Identifier => self.parse_identifier_expr(token),
            _ => Err(self.unexpected(token, "expression")),
        }
    }

    fn parse_identifier_expr(&mut self, token: Token) -> PResult<Expr> {
        let name = self.text(token);
        let lowered = name.to_lowercase();
        let next = self.peek_nth(1);

        if lowered == "inf" || lowered == "nan" {
            self.advance();
            let value = if lowered == "inf" { f64::INFINITY } else { f64::NAN };
            return Ok(Expr::Number(NumberLiteral {
                value,
                range: token.range,
            }));
        }

        if let Some(op) = AggregateOp::from_name(name) {
            let grouping_follows = next.kind == TokenKind::Identifier
                && matches!(
                    self.text(next).to_lowercase().as_str(),
                    "by" | "without"
                );
            if next.kind == TokenKind::LeftParen || grouping_follows {
                return self.parse_aggregate(op, token);
            }
        }

        if next.kind == TokenKind::LeftParen {
            return self.parse_call(token);
        }

        if is_reserved_keyword(&lowered) {
            return Err(self.unexpected(token, "expression"));
        }

        self.parse_vector_selector(Some(token))
    }

    fn parse_call(&mut self, name_token: Token) -> PResult<Expr> {
        let name = self.text(name_token);
        let function = functions::lookup(name).ok_or_else(|| {
            ParseError::new(
                name_token.range,
                format!("unknown function with name {:?}", name),
            )
        })?;
        self.advance();
        self.expect(TokenKind::LeftParen, "function call")?;

        let mut args = Vec::new();
        let close = loop {
            if let Some(close) = self.eat(TokenKind::RightParen) {
                break close;
            }
            args.push(self.parse_expr(0)?);
            if self.eat(TokenKind::Comma).is_none() {
                break self.expect(TokenKind::RightParen, "function call arguments")?;
            }
        };
        let range = name_token.range.cover(close.range);

        let too_many = function.max_args().is_some_and(|max| args.len() > max);
        if args.len() < function.min_args() || too_many {
            let expected = match function.max_args() {
                Some(max) if max == function.min_args() => max.to_string(),
                Some(max) => format!("{} to {}", function.min_args(), max),
                None => format!("at least {}", function.min_args()),
            };
            return Err(ParseError::new(
                range,
                format!(
                    "expected {} argument(s) in call to {:?}, got {}",
                    expected,
                    function.name,
                    args.len()
                ),
            ));
        }

        for (index, arg) in args.iter().enumerate() {
            if let Some(expected) = function.arg_type(index) {
                check_argument_type(arg, expected, &format!("call to function {:?}", function.name))?;
            }
        }

        Ok(Expr::Call(Call {
            func: function.name.to_string(),
            args,
            return_type: function.return_type,
            range,
        }))
    }

    fn parse_grouping(&mut self) -> PResult<Option<Grouping>> {
        let without = if self.eat_keyword("by").is_some() {
            false
        } else if self.eat_keyword("without").is_some() {
            true
        } else {
            return Ok(None);
        };

        let labels = self.parse_label_list("grouping")?;
        Ok(Some(Grouping { without, labels }))
    }

    fn parse_aggregate(&mut self, op: AggregateOp, op_token: Token) -> PResult<Expr> {
        self.advance();
        let leading = self.parse_grouping()?;

        self.expect(TokenKind::LeftParen, "aggregation")?;
        let mut args = Vec::new();
        let mut end = loop {
            if let Some(close) = self.eat(TokenKind::RightParen) {
                break close.range;
            }
            args.push(self.parse_expr(0)?);
            if self.eat(TokenKind::Comma).is_none() {
                break self.expect(TokenKind::RightParen, "aggregation")?.range;
            }
        };

        let grouping = match leading {
            Some(grouping) => grouping,
            None => match self.parse_grouping()? {
                Some(grouping) => {
                    end = self.tokens[self.position - 1].range;
                    grouping
                }
                None => Grouping::default(),
            },
        };
        let range = op_token.range.cover(end);

        let expected = if op.param_type().is_some() { 2 } else { 1 };
        if args.len() != expected {
            return Err(ParseError::new(
                range,
                format!(
                    "wrong number of arguments for aggregate expression provided, expected {}, got {}",
                    expected,
                    args.len()
                ),
            ));
        }

        let mut args = args.into_iter();
        let (param, expr) = match (args.next(), args.next()) {
            (Some(param), Some(expr)) => (Some(param), expr),
            (Some(expr), None) => (None, expr),
            _ => return Err(ParseError::new(range, "missing aggregation expression")),
        };

        if let (Some(param), Some(expected)) = (&param, op.param_type()) {
            check_argument_type(param, expected, "aggregation parameter")?;
        }
        check_argument_type(&expr, ValueType::Vector, "aggregation expression")?;

        Ok(Expr::Aggregate(AggregateExpr {
            op,
            param: param.map(Box::new),
            expr: Box::new(expr),
            grouping,
            range,
        }))
    }

    fn parse_vector_selector(&mut self, name_token: Option<Token>) -> PResult<Expr> {
        let mut matchers = Vec::new();
        let mut name = None;
        let mut range = match name_token {
            Some(token) => {
                self.advance();
                let metric = self.text(token).to_string();
                matchers.push(LabelMatcher {
                    name: METRIC_NAME_LABEL.to_string(),
                    op: MatchOp::Equal,
                    value: metric.clone(),
                    range: token.range,
                });
                name = Some(metric);
                token.range
            }
            None => self.peek().range,
        };

        if let Some(open) = self.eat(TokenKind::LeftBrace) {
            range = range.cover(open.range);
            loop {
                if let Some(close) = self.eat(TokenKind::RightBrace) {
                    range = range.cover(close.range);
                    break;
                }

                matchers.push(self.parse_label_matcher()?);

                if self.eat(TokenKind::Comma).is_none() {
                    let close = self.expect(TokenKind::RightBrace, "label matching")?;
                    range = range.cover(close.range);
                    break;
                }
            }
        }

        let mut has_non_empty = false;
        for matcher in &matchers {
            if !matches_empty(matcher).map_err(|message| ParseError::new(matcher.range, message))? {
                has_non_empty = true;
            }
        }
        if !has_non_empty {
            return Err(ParseError::new(
                range,
                "vector selector must contain at least one non-empty matcher",
            ));
        }

        Ok(Expr::VectorSelector(VectorSelector {
            name,
            matchers,
            offset: None,
            at: None,
            range,
        }))
    }

    fn parse_label_matcher(&mut self) -> PResult<LabelMatcher> {
        let label = self.expect(TokenKind::Identifier, "label matching")?;
        let op_token = self.advance();
        let op = match op_token.kind {
            TokenKind::Assign => MatchOp::Equal,
            TokenKind::Neq => MatchOp::NotEqual,
            TokenKind::RegexMatch => MatchOp::Regex,
            TokenKind::RegexNoMatch => MatchOp::NotRegex,
            _ => {
                let mut err = self.unexpected(op_token, "label matching");
                err.message
                    .push_str(", expected one of \"=\", \"!=\", \"=~\" or \"!~\"");
                return Err(err);
            }
        };
        let value = self.expect(TokenKind::String, "label matching")?;
        let decoded = lexer::unquote(self.text(value))
            .map_err(|message| ParseError::new(value.range, message))?;

        Ok(LabelMatcher {
            name: self.text(label).to_string(),
            op,
            value: decoded,
            range: label.range.cover(value.range),
        })
    }
}

fn is_reserved_keyword(word: &str) -> bool {
    matches!(
        word,
        "and"
            | "or"
            | "unless"
            | "atan2"
            | "by"
            | "without"
            | "on"
            | "ignoring"
            | "group_left"
            | "group_right"
            | "bool"
            | "offset"
    )
}

fn check_argument_type(arg: &Expr, expected: ValueType, context: &str) -> PResult<()> {
    let actual = arg.value_type();
    let compatible = match expected {
        // Scalars and instant vectors are both accepted where a number is expected
        ValueType::Scalar | ValueType::Vector => {
            matches!(actual, ValueType::Scalar | ValueType::Vector)
        }
        other => actual == other,
    };

    if compatible {
        Ok(())
    } else {
        Err(ParseError::new(
            arg.range(),
            format!("expected type {} in {}, got {}", expected, context, actual),
        ))
    }
}

/// Whether a matcher accepts the empty label value
fn matches_empty(matcher: &LabelMatcher) -> Result<bool, String> {
    match matcher.op {
        MatchOp::Equal => Ok(matcher.value.is_empty()),
        MatchOp::NotEqual => Ok(!matcher.value.is_empty()),
        MatchOp::Regex | MatchOp::NotRegex => {
            let anchored = format!("^(?:{})$", matcher.value);
            let re = Regex::new(&anchored).map_err(|e| {
                format!(
                    "invalid regular expression in label matcher {:?}: {}",
                    matcher.name, e
                )
            })?;
            Ok(re.is_match("") == (matcher.op == MatchOp::Regex))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Expr {
        match parse(source) {
            Ok(expr) => expr,
            Err(errors) => panic!("failed to parse {:?}: {}", source, errors),
        }
    }

    fn parse_err(source: &str) -> ParseError {
        let errors = parse(source).expect_err("expected a parse error");
        errors.first().cloned().unwrap()
    }

    #[test]
    fn test_vector_selector_with_matchers() {
        let expr = parse_ok(r#"http_requests_total{job="prometheus", code!~"5.."}"#);
        let Expr::VectorSelector(selector) = expr else {
            panic!("expected a vector selector");
        };

        assert_eq!(selector.name.as_deref(), Some("http_requests_total"));
        assert_eq!(selector.range, SourceRange::new(0, 50));
        assert_eq!(selector.matchers.len(), 3);
        assert!(selector.matchers[0].is_metric_name());
        assert_eq!(selector.matchers[1].name, "job");
        assert_eq!(selector.matchers[1].value, "prometheus");
        assert_eq!(selector.matchers[1].range, SourceRange::new(20, 36));
        assert_eq!(selector.matchers[2].op, MatchOp::NotRegex);
    }

    #[test]
    fn test_selector_range_matches_denied_label_example() {
        let expr = parse_ok(r#"http_requests_total{job="prometheus"}"#);
        assert_eq!(expr.range(), SourceRange::new(0, 37));
    }

    #[test]
    fn test_nameless_selector() {
        let expr = parse_ok(r#"{__name__="up", job="node",}"#);
        let selector = expr.as_selector().unwrap();
        assert_eq!(selector.name, None);
        assert_eq!(selector.matchers.len(), 2);
        assert_eq!(selector.range, SourceRange::new(0, 28));
    }

    #[test]
    fn test_precedence() {
        let expr = parse_ok("1 + 2 * 3");
        let Expr::Binary(add) = expr else { panic!() };
        assert_eq!(add.op, BinaryOp::Add);
        assert!(matches!(*add.rhs, Expr::Binary(BinaryExpr { op: BinaryOp::Mul, .. })));
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_ok("2 ^ 3 ^ 2");
        let Expr::Binary(pow) = expr else { panic!() };
        assert!(matches!(*pow.lhs, Expr::Number(_)));
        assert!(matches!(*pow.rhs, Expr::Binary(BinaryExpr { op: BinaryOp::Pow, .. })));
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse_ok("-foo ^ 2");
        let Expr::Unary(unary) = expr else { panic!() };
        assert_eq!(unary.op, UnaryOp::Minus);
        assert!(matches!(*unary.expr, Expr::Binary(_)));
        assert_eq!(unary.range, SourceRange::new(0, 8));
    }

    #[test]
    fn test_negative_number_literal() {
        let expr = parse_ok("-1.5");
        assert_eq!(
            expr,
            Expr::Number(NumberLiteral {
                value: -1.5,
                range: SourceRange::new(0, 4)
            })
        );
    }

    #[test]
    fn test_rate_over_matrix_selector() {
        let expr = parse_ok("rate(http_requests_total{job=\"api\"}[5m] offset 1h)");
        let Expr::Call(call) = expr else { panic!() };
        assert_eq!(call.func, "rate");
        assert_eq!(call.range, SourceRange::new(0, 50));

        let Expr::MatrixSelector(matrix) = &call.args[0] else { panic!() };
        assert_eq!(matrix.range_ms, 300_000);
        assert_eq!(matrix.selector.offset, Some(3_600_000));
        assert_eq!(matrix.selector.range, SourceRange::new(5, 35));
    }

    #[test]
    fn test_aggregation_with_grouping() {
        let before = parse_ok("sum by (job, instance) (rate(foo[1m]))");
        let after = parse_ok("sum(rate(foo[1m])) by (job, instance)");

        for expr in [&before, &after] {
            let Expr::Aggregate(agg) = expr else { panic!() };
            assert_eq!(agg.op, AggregateOp::Sum);
            assert!(!agg.grouping.without);
            assert_eq!(agg.grouping.labels, vec!["job", "instance"]);
        }
        assert_eq!(after.range(), SourceRange::new(0, 37));
    }

    #[test]
    fn test_topk_parameter() {
        let expr = parse_ok("topk(5, foo)");
        let Expr::Aggregate(agg) = expr else { panic!() };
        assert!(matches!(agg.param.as_deref(), Some(Expr::Number(_))));
        assert_eq!(expr_children_count(&Expr::Aggregate(agg)), 2);
    }

    fn expr_children_count(expr: &Expr) -> usize {
        expr.children().len()
    }

    #[test]
    fn test_binary_with_vector_matching() {
        let expr = parse_ok("foo / on(job) group_left(team) bar");
        let Expr::Binary(binary) = expr else { panic!() };
        let matching = binary.matching.unwrap();
        assert!(matching.on);
        assert_eq!(matching.labels, vec!["job"]);
        assert_eq!(matching.card, Cardinality::ManyToOne);
        assert_eq!(matching.include, vec!["team"]);
    }

    #[test]
    fn test_comparison_with_bool() {
        let expr = parse_ok("1 > bool 2");
        let Expr::Binary(binary) = expr else { panic!() };
        assert!(binary.return_bool);
    }

    #[test]
    fn test_subquery() {
        let expr = parse_ok("max_over_time(rate(foo[5m])[1h:1m])");
        let Expr::Call(call) = expr else { panic!() };
        let Expr::Subquery(sub) = &call.args[0] else { panic!() };
        assert_eq!(sub.range_ms, 3_600_000);
        assert_eq!(sub.step_ms, Some(60_000));
    }

    #[test]
    fn test_at_modifier() {
        let expr = parse_ok("foo @ 1609746000");
        assert_eq!(
            expr.as_selector().unwrap().at,
            Some(AtModifier::Timestamp(1_609_746_000.0))
        );

        let expr = parse_ok("foo[5m] @ end()");
        assert_eq!(expr.as_selector().unwrap().at, Some(AtModifier::End));
    }

    #[test]
    fn test_multiline_expression() {
        let source = "sum(\n  rate(foo{job=\"api\"}[5m])\n)";
        let expr = parse_ok(source);
        assert_eq!(expr.range(), SourceRange::new(0, source.len()));
    }

    #[test]
    fn test_error_unexpected_character() {
        let err = parse_err("foo{job=\"a\"} $ 1");
        assert_eq!(err.range, SourceRange::new(13, 14));
    }

    #[test]
    fn test_error_unexpected_end() {
        let err = parse_err("sum(foo");
        assert_eq!(err.range, SourceRange::new(7, 7));
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn test_error_empty_input() {
        let err = parse_err("   ");
        assert_eq!(err.message, "no expression found in input");
    }

    #[test]
    fn test_error_unknown_function() {
        let err = parse_err("frobnicate(foo)");
        assert_eq!(err.range, SourceRange::new(0, 10));
        assert_eq!(err.message, "unknown function with name \"frobnicate\"");
    }

    #[test]
    fn test_error_wrong_arity() {
        let err = parse_err("rate(foo[5m], bar[5m])");
        assert!(err.message.starts_with("expected 1 argument(s) in call to \"rate\""));
    }

    #[test]
    fn test_error_instant_vector_to_rate() {
        let err = parse_err("rate(foo)");
        assert_eq!(err.range, SourceRange::new(5, 8));
        assert_eq!(
            err.message,
            "expected type range vector in call to function \"rate\", got instant vector"
        );
    }

    #[test]
    fn test_error_range_on_non_selector() {
        let err = parse_err("sum(foo)[5m]");
        assert!(err.message.starts_with("ranges only allowed for vector selectors"));
    }

    #[test]
    fn test_error_empty_matchers() {
        let err = parse_err(r#"{job=""}"#);
        assert_eq!(
            err.message,
            "vector selector must contain at least one non-empty matcher"
        );
        assert!(parse(r#"{job=~".+"}"#).is_ok());
        assert!(parse(r#"{job=~".*"}"#).is_err());
    }

    #[test]
    fn test_error_invalid_matcher_regex() {
        let err = parse_err(r#"foo{job=~"(unclosed"}"#);
        assert!(err.message.starts_with("invalid regular expression"));
    }

    #[test]
    fn test_error_scalar_comparison_without_bool() {
        let err = parse_err("1 > 2");
        assert_eq!(err.message, "comparisons between scalars must use BOOL modifier");
    }

    #[test]
    fn test_error_reports_all_lexical_errors() {
        let errors = parse("foo $ bar ~ baz").unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_display_of_parse_error() {
        let err = ParseError::new(SourceRange::new(0, 1), "unexpected character: '$'");
        assert_eq!(err.to_string(), "parse error: unexpected character: '$'");
    }
}
