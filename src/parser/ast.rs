//! PromQL syntax tree

use crate::position::SourceRange;
use std::fmt;

/// Name of the implicit label holding the metric name
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Type of value an expression evaluates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Scalar,
    String,
    /// Instant vector
    Vector,
    /// Range vector
    Matrix,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Scalar => write!(f, "scalar"),
            ValueType::String => write!(f, "string"),
            ValueType::Vector => write!(f, "instant vector"),
            ValueType::Matrix => write!(f, "range vector"),
        }
    }
}

/// Label matching operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOp {
    Equal,
    NotEqual,
    Regex,
    NotRegex,
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOp::Equal => write!(f, "="),
            MatchOp::NotEqual => write!(f, "!="),
            MatchOp::Regex => write!(f, "=~"),
            MatchOp::NotRegex => write!(f, "!~"),
        }
    }
}

/// A single `name op "value"` matcher inside a selector
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMatcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
    pub range: SourceRange,
}

impl LabelMatcher {
    pub fn new(name: impl Into<String>, op: MatchOp, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op,
            value: value.into(),
            range: SourceRange::default(),
        }
    }

    /// Whether this is the implicit (or explicit) metric name matcher
    pub fn is_metric_name(&self) -> bool {
        self.name == METRIC_NAME_LABEL
    }
}

/// `@` modifier value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AtModifier {
    Timestamp(f64),
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    pub value: f64,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub value: String,
    pub range: SourceRange,
}

/// Instant vector selector, e.g. `http_requests_total{job="api"}`
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSelector {
    pub name: Option<String>,
    /// All matchers, including the implicit `__name__` one
    pub matchers: Vec<LabelMatcher>,
    /// Offset in milliseconds
    pub offset: Option<i64>,
    pub at: Option<AtModifier>,
    pub range: SourceRange,
}

/// Range vector selector, e.g. `foo[5m]`
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSelector {
    pub selector: VectorSelector,
    /// Range in milliseconds
    pub range_ms: i64,
    pub range: SourceRange,
}

/// Subquery, e.g. `rate(foo[5m])[1h:1m]`
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryExpr {
    pub expr: Box<Expr>,
    pub range_ms: i64,
    pub step_ms: Option<i64>,
    pub offset: Option<i64>,
    pub at: Option<AtModifier>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParenExpr {
    pub expr: Box<Expr>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Atan2,
    Eql,
    Neq,
    Gtr,
    Lss,
    Gte,
    Lte,
    And,
    Or,
    Unless,
}

impl BinaryOp {
    /// Binding power; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And | BinaryOp::Unless => 2,
            BinaryOp::Eql
            | BinaryOp::Neq
            | BinaryOp::Gtr
            | BinaryOp::Lss
            | BinaryOp::Gte
            | BinaryOp::Lte => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Atan2 => 5,
            BinaryOp::Pow => 6,
        }
    }

    pub fn is_right_associative(&self) -> bool {
        matches!(self, BinaryOp::Pow)
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 3
    }

    pub fn is_set_operator(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Unless)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Atan2 => "atan2",
            BinaryOp::Eql => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Gtr => ">",
            BinaryOp::Lss => "<",
            BinaryOp::Gte => ">=",
            BinaryOp::Lte => "<=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Unless => "unless",
        };
        write!(f, "{}", s)
    }
}

/// Which side of a binary expression may match many series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    OneToOne,
    ManyToOne,
    OneToMany,
}

/// `on`/`ignoring` and `group_left`/`group_right` clause of a binary expression
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatching {
    /// `true` for `on(...)`, `false` for `ignoring(...)`
    pub on: bool,
    pub labels: Vec<String>,
    pub card: Cardinality,
    pub include: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub return_bool: bool,
    pub matching: Option<VectorMatching>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub func: String,
    pub args: Vec<Expr>,
    pub return_type: ValueType,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Sum,
    Avg,
    Count,
    Min,
    Max,
    Group,
    Stddev,
    Stdvar,
    Topk,
    Bottomk,
    Quantile,
    CountValues,
    Limitk,
    LimitRatio,
}

impl AggregateOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_lowercase().as_str() {
            "sum" => AggregateOp::Sum,
            "avg" => AggregateOp::Avg,
            "count" => AggregateOp::Count,
            "min" => AggregateOp::Min,
            "max" => AggregateOp::Max,
            "group" => AggregateOp::Group,
            "stddev" => AggregateOp::Stddev,
            "stdvar" => AggregateOp::Stdvar,
            "topk" => AggregateOp::Topk,
            "bottomk" => AggregateOp::Bottomk,
            "quantile" => AggregateOp::Quantile,
            "count_values" => AggregateOp::CountValues,
            "limitk" => AggregateOp::Limitk,
            "limit_ratio" => AggregateOp::LimitRatio,
            _ => return None,
        })
    }

    /// Type of the leading parameter, if the operator takes one
    pub fn param_type(&self) -> Option<ValueType> {
        match self {
            AggregateOp::Topk
            | AggregateOp::Bottomk
            | AggregateOp::Quantile
            | AggregateOp::Limitk
            | AggregateOp::LimitRatio => Some(ValueType::Scalar),
            AggregateOp::CountValues => Some(ValueType::String),
            _ => None,
        }
    }
}

/// `by (...)` / `without (...)` clause
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grouping {
    pub without: bool,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub op: AggregateOp,
    pub param: Option<Box<Expr>>,
    pub expr: Box<Expr>,
    pub grouping: Grouping,
    pub range: SourceRange,
}

/// A node of the PromQL syntax tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(NumberLiteral),
    String(StringLiteral),
    VectorSelector(VectorSelector),
    MatrixSelector(MatrixSelector),
    Subquery(SubqueryExpr),
    Paren(ParenExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Call(Call),
    Aggregate(AggregateExpr),
}

impl Expr {
    /// Byte range of the node in the source expression
    pub fn range(&self) -> SourceRange {
        match self {
            Expr::Number(n) => n.range,
            Expr::String(s) => s.range,
            Expr::VectorSelector(v) => v.range,
            Expr::MatrixSelector(m) => m.range,
            Expr::Subquery(s) => s.range,
            Expr::Paren(p) => p.range,
            Expr::Unary(u) => u.range,
            Expr::Binary(b) => b.range,
            Expr::Call(c) => c.range,
            Expr::Aggregate(a) => a.range,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Expr::Number(_) => ValueType::Scalar,
            Expr::String(_) => ValueType::String,
            Expr::VectorSelector(_) => ValueType::Vector,
            Expr::MatrixSelector(_) | Expr::Subquery(_) => ValueType::Matrix,
            Expr::Paren(p) => p.expr.value_type(),
            Expr::Unary(u) => u.expr.value_type(),
            Expr::Binary(b) => {
                if b.lhs.value_type() == ValueType::Scalar
                    && b.rhs.value_type() == ValueType::Scalar
                {
                    ValueType::Scalar
                } else {
                    ValueType::Vector
                }
            }
            Expr::Call(c) => c.return_type,
            Expr::Aggregate(_) => ValueType::Vector,
        }
    }

    /// Direct children in source order
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Number(_) | Expr::String(_) | Expr::VectorSelector(_) => Vec::new(),
            // The inner selector is not an `Expr` node of its own
            Expr::MatrixSelector(_) => Vec::new(),
            Expr::Subquery(s) => vec![s.expr.as_ref()],
            Expr::Paren(p) => vec![p.expr.as_ref()],
            Expr::Unary(u) => vec![u.expr.as_ref()],
            Expr::Binary(b) => vec![b.lhs.as_ref(), b.rhs.as_ref()],
            Expr::Call(c) => c.args.iter().collect(),
            Expr::Aggregate(a) => match &a.param {
                Some(param) => vec![param.as_ref(), a.expr.as_ref()],
                None => vec![a.expr.as_ref()],
            },
        }
    }

    /// The vector selector carried by this node, if any.
    ///
    /// Range vector selectors expose their inner instant selector.
    pub fn as_selector(&self) -> Option<&VectorSelector> {
        match self {
            Expr::VectorSelector(v) => Some(v),
            Expr::MatrixSelector(m) => Some(&m.selector),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(value: f64, start: usize, end: usize) -> Expr {
        Expr::Number(NumberLiteral {
            value,
            range: SourceRange::new(start, end),
        })
    }

    #[test]
    fn test_precedence_order() {
        assert!(BinaryOp::Pow.precedence() > BinaryOp::Mul.precedence());
        assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
        assert!(BinaryOp::Add.precedence() > BinaryOp::Eql.precedence());
        assert!(BinaryOp::Eql.precedence() > BinaryOp::And.precedence());
        assert!(BinaryOp::And.precedence() > BinaryOp::Or.precedence());
        assert_eq!(BinaryOp::Unless.precedence(), BinaryOp::And.precedence());
        assert!(BinaryOp::Pow.is_right_associative());
        assert!(!BinaryOp::Sub.is_right_associative());
    }

    #[test]
    fn test_scalar_binary_value_type() {
        let expr = Expr::Binary(BinaryExpr {
            op: BinaryOp::Add,
            lhs: Box::new(number(1.0, 0, 1)),
            rhs: Box::new(number(2.0, 4, 5)),
            return_bool: false,
            matching: None,
            range: SourceRange::new(0, 5),
        });
        assert_eq!(expr.value_type(), ValueType::Scalar);
        assert_eq!(expr.children().len(), 2);
    }

    #[test]
    fn test_aggregate_op_names() {
        assert_eq!(AggregateOp::from_name("SUM"), Some(AggregateOp::Sum));
        assert_eq!(
            AggregateOp::from_name("count_values"),
            Some(AggregateOp::CountValues)
        );
        assert_eq!(AggregateOp::from_name("rate"), None);
        assert_eq!(AggregateOp::Topk.param_type(), Some(ValueType::Scalar));
        assert_eq!(AggregateOp::Sum.param_type(), None);
    }

    #[test]
    fn test_metric_name_matcher() {
        let m = LabelMatcher::new(METRIC_NAME_LABEL, MatchOp::Equal, "up");
        assert!(m.is_metric_name());
        assert!(!LabelMatcher::new("job", MatchOp::Equal, "api").is_metric_name());
    }
}
