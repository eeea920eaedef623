//! Cron field kinds and the field-expression evaluator.
//!
//! Grammar of a single field:
//!
//! ```text
//! expr := term (',' term)*
//! term := atom ('/' step)?
//! atom := '*' | INT | INT '-' INT
//! ```
//!
//! Evaluation never fails loudly: a malformed expression or an out-of-range
//! literal evaluates to the empty set, which the next-run search treats as
//! "never runs".

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use ck_domain::Error;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Field kinds
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Minute,
    Hour,
    Day,
    Month,
    DayOfWeek,
}

impl FieldKind {
    /// Cron-line order: minute hour day month day-of-week.
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Minute,
        FieldKind::Hour,
        FieldKind::Day,
        FieldKind::Month,
        FieldKind::DayOfWeek,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::Day => "day",
            FieldKind::Month => "month",
            FieldKind::DayOfWeek => "day_of_week",
        }
    }

    /// Bounds used when evaluating an expression. Day-of-week accepts 7 as
    /// an alias for Sunday, so its declared bound is `0..=7`.
    pub fn declared_range(self) -> (u32, u32) {
        match self {
            FieldKind::DayOfWeek => (0, 7),
            other => other.semantic_range(),
        }
    }

    /// Values that can actually occur on a calendar.
    pub fn semantic_range(self) -> (u32, u32) {
        match self {
            FieldKind::Minute => (0, 59),
            FieldKind::Hour => (0, 23),
            FieldKind::Day => (1, 31),
            FieldKind::Month => (1, 12),
            FieldKind::DayOfWeek => (0, 6),
        }
    }

    /// Evaluate `expr` against this kind's bounds, folding the Sunday alias
    /// for day-of-week.
    pub fn evaluate(self, expr: &FieldExpr) -> BTreeSet<u32> {
        let (min, max) = self.declared_range();
        let mut values = match expr {
            FieldExpr::Any => evaluate_field("*", min, max),
            FieldExpr::Values(set) => set.range(min..=max).copied().collect(),
            FieldExpr::Raw(raw) => evaluate_field(raw, min, max),
        };
        if self == FieldKind::DayOfWeek {
            fold_sunday_alias(&mut values);
        }
        values
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(FieldKind::Minute),
            "hour" => Ok(FieldKind::Hour),
            "day" => Ok(FieldKind::Day),
            "month" => Ok(FieldKind::Month),
            "day_of_week" | "dayofweek" | "dow" => Ok(FieldKind::DayOfWeek),
            other => Err(Error::UnknownField(other.to_string())),
        }
    }
}

/// Canonicalize a day-of-week set: 7 becomes 0 without duplicating Sunday.
pub fn fold_sunday_alias(values: &mut BTreeSet<u32>) {
    if values.last() == Some(&7) {
        values.remove(&7);
        values.insert(0);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Evaluator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Num(u32),
    Star,
    Comma,
    Slash,
    Dash,
}

/// Split an expression into tokens. `None` on any character outside the
/// grammar alphabet or on an integer that does not fit in `u32`.
fn tokenize(expr: &str) -> Option<Vec<Token>> {
    let expr = expr.trim();
    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let token = match bytes[i] {
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                tokens.push(Token::Num(expr[start..i].parse().ok()?));
                continue;
            }
            b'*' => Token::Star,
            b',' => Token::Comma,
            b'/' => Token::Slash,
            b'-' => Token::Dash,
            _ => return None,
        };
        tokens.push(token);
        i += 1;
    }
    Some(tokens)
}

/// A term collected while walking the tokens.
enum Pending {
    /// A bare literal. Widened to `[value, max]` if a step follows.
    Single(u32),
    List(Vec<u32>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Operator {
    Range,
    Step,
}

/// Evaluate one field expression against `[min, max]`.
///
/// Returns the matching values, sorted and de-duplicated. Steps are
/// positional: `*/15` over `0..=59` keeps offsets 0, 15, 30, 45 of the
/// expanded range, and `5/10` keeps 5, 15, … 55.
///
/// Any literal outside the bounds, a dangling `-` or `/`, a zero step, or a
/// character outside the grammar yields the empty set.
pub fn evaluate_field(expression: &str, min: u32, max: u32) -> BTreeSet<u32> {
    parse_terms(expression, min, max)
        .map(|terms| {
            terms
                .into_iter()
                .flat_map(|term| match term {
                    Pending::Single(v) => vec![v],
                    Pending::List(values) => values,
                })
                .filter(|v| (min..=max).contains(v))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_terms(expression: &str, min: u32, max: u32) -> Option<Vec<Pending>> {
    let tokens = tokenize(expression)?;
    let mut terms: Vec<Pending> = Vec::new();
    let mut operator: Option<Operator> = None;
    let mut prev: Option<Token> = None;
    // True while the last term is a bare literal that may still open a range.
    let mut bare = false;

    for token in tokens {
        let at_term_start = matches!(prev, None | Some(Token::Comma));
        match token {
            Token::Num(n) => {
                if n < min || n > max {
                    return None;
                }
                match operator.take() {
                    Some(Operator::Range) => {
                        let Some(Pending::Single(start)) = terms.pop() else {
                            return None;
                        };
                        terms.push(Pending::List((start..=n).collect()));
                    }
                    Some(Operator::Step) => {
                        if n == 0 {
                            return None;
                        }
                        let last = terms.last_mut()?;
                        let values: Vec<u32> = match last {
                            Pending::Single(start) => (*start..=max).collect(),
                            Pending::List(values) => std::mem::take(values),
                        };
                        *last = Pending::List(
                            values
                                .into_iter()
                                .enumerate()
                                .filter(|(offset, _)| *offset as u64 % u64::from(n) == 0)
                                .map(|(_, v)| v)
                                .collect(),
                        );
                    }
                    None => {
                        if !at_term_start {
                            return None;
                        }
                        terms.push(Pending::Single(n));
                        bare = true;
                        prev = Some(token);
                        continue;
                    }
                }
                bare = false;
            }
            Token::Star => {
                if !at_term_start {
                    return None;
                }
                terms.push(Pending::List((min..=max).collect()));
                bare = false;
            }
            Token::Dash => {
                if operator.is_some() || !bare || !matches!(prev, Some(Token::Num(_))) {
                    return None;
                }
                operator = Some(Operator::Range);
            }
            Token::Slash => {
                if operator.is_some() || !matches!(prev, Some(Token::Num(_) | Token::Star)) {
                    return None;
                }
                operator = Some(Operator::Step);
            }
            Token::Comma => {
                if operator.is_some() {
                    return None;
                }
                bare = false;
            }
        }
        prev = Some(token);
    }

    if operator.is_some() {
        return None;
    }
    Some(terms)
}

/// Replace the random placeholder `R` with one value drawn from
/// `[min, max]`. Any other expression is returned unchanged.
pub fn expand_random<R: Rng>(expression: &str, min: u32, max: u32, rng: &mut R) -> String {
    if expression.trim() == "R" {
        rng.gen_range(min..=max).to_string()
    } else {
        expression.to_string()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stored field value
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The value stored for one schedule field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldExpr {
    /// `*`: matches every value and leaves day-of-month/day-of-week unrestricted.
    #[default]
    Any,
    /// An explicit set of values.
    Values(BTreeSet<u32>),
    /// Expression text, evaluated on first use.
    Raw(String),
}

impl FieldExpr {
    pub fn parse(expression: &str) -> Self {
        match expression.trim() {
            "*" => FieldExpr::Any,
            other => FieldExpr::Raw(other.to_string()),
        }
    }
}

impl fmt::Display for FieldExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldExpr::Any => f.write_str("*"),
            FieldExpr::Values(values) => {
                let parts: Vec<String> = values.iter().map(u32::to_string).collect();
                f.write_str(&parts.join(","))
            }
            FieldExpr::Raw(raw) => f.write_str(raw),
        }
    }
}

/// A field expression plus its lazily evaluated value set.
///
/// The cache is filled by [`Field::values`] and dropped whenever the field
/// is replaced, so a setter never leaves a stale set behind.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Field {
    expr: FieldExpr,
    cache: OnceLock<BTreeSet<u32>>,
}

impl Field {
    pub fn new(expr: FieldExpr) -> Self {
        Self {
            expr,
            cache: OnceLock::new(),
        }
    }

    pub fn parse(expression: &str) -> Self {
        Self::new(FieldExpr::parse(expression))
    }

    pub fn expr(&self) -> &FieldExpr {
        &self.expr
    }

    /// True for a literal `*`.
    pub fn is_any(&self) -> bool {
        self.expr == FieldExpr::Any
    }

    /// Evaluated values for this field. `kind` must be the same on every
    /// call for a given field; [`Schedule`](crate::Schedule) guarantees that.
    pub fn values(&self, kind: FieldKind) -> &BTreeSet<u32> {
        self.cache.get_or_init(|| kind.evaluate(&self.expr))
    }
}

/// Fields compare by their expression text, so `5` and `{5}` are equal.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.expr.to_string() == other.expr.to_string()
    }
}

impl Eq for Field {}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::parse(&s)
    }
}

impl From<Field> for String {
    fn from(field: Field) -> Self {
        field.expr.to_string()
    }
}
