//! The fixed condition operator set.

use std::fmt;

use crate::schema::ValueKind;

/// A condition operator.
///
/// The token set is fixed; unknown tokens are a syntax error at parse
/// time. Ordering operators are additionally gated on the bound
/// property's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
}

impl Operator {
    /// All operators, in token-display order.
    pub const ALL: [Operator; 6] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::Less,
        Operator::Greater,
        Operator::LessOrEqual,
        Operator::GreaterOrEqual,
    ];

    /// Parses an operator token.
    pub fn from_token(token: &str) -> Option<Operator> {
        match token {
            "=" => Some(Operator::Equal),
            "!=" => Some(Operator::NotEqual),
            "<" => Some(Operator::Less),
            ">" => Some(Operator::Greater),
            "<=" => Some(Operator::LessOrEqual),
            ">=" => Some(Operator::GreaterOrEqual),
            _ => None,
        }
    }

    /// The operator's token form.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
        }
    }

    /// Whether this is `=` or `!=`.
    ///
    /// Equality conditions are eligible for point-lookup optimizations
    /// and are the only operators valid against the null literal.
    pub fn is_equality(self) -> bool {
        matches!(self, Operator::Equal | Operator::NotEqual)
    }

    /// Whether the operator is permitted for a property of `kind`.
    pub fn permitted_for(self, kind: ValueKind) -> bool {
        self.is_equality() || kind.orderable()
    }

    /// Display form of the operators permitted for `kind`, for error
    /// messages.
    pub fn allowed_for(kind: ValueKind) -> String {
        Operator::ALL
            .iter()
            .filter(|op| op.permitted_for(kind))
            .map(|op| op.token())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
