//! Query IR: one logical database operation, independent of its JSON surface and its SQL text.

use serde::{Deserialize, Serialize};

/// One request. Exactly one operation plus the shared modifier clauses.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryIr {
    pub operation: Operation,
    pub filter: Vec<WhereCond>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryIr {
    pub fn new(operation: Operation) -> Self {
        QueryIr {
            operation,
            filter: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn with_filter(mut self, cond: WhereCond) -> Self {
        self.filter.push(cond);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Every value literal with the column it targets: assignments first, then conditions.
    pub fn literals(&self) -> Vec<(&str, &Literal)> {
        let mut out = Vec::new();
        if let Operation::Insert(m) | Operation::Update(m) = &self.operation {
            out.extend(m.assignments.iter().map(|a| (a.field.as_str(), &a.value)));
        }
        for cond in &self.filter {
            match &cond.value {
                Operand::Scalar(lit) => out.push((cond.field.as_str(), lit)),
                Operand::List(items) => out.extend(items.iter().map(|lit| (cond.field.as_str(), lit))),
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Select(SelectSpec),
    Insert(Mutation),
    Update(Mutation),
    Delete { table: String },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Select(_) => "select",
            Operation::Insert(_) => "insert",
            Operation::Update(_) => "update",
            Operation::Delete { .. } => "delete",
        }
    }

    /// Every table the operation reads or writes, in emission order.
    pub fn tables(&self) -> Vec<&str> {
        match self {
            Operation::Select(s) => {
                let mut tables: Vec<&str> = s.sources.iter().map(|f| f.table.as_str()).collect();
                if let Some(join) = &s.join {
                    tables.push(join.right.table.as_str());
                }
                tables
            }
            Operation::Insert(m) | Operation::Update(m) => vec![m.table.as_str()],
            Operation::Delete { table } => vec![table.as_str()],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectSpec {
    pub sources: Vec<FieldSet>,
    pub order_by: Vec<OrderTerm>,
    pub group_by: Vec<String>,
    pub join: Option<JoinSpec>,
}

/// Columns read from one table. No fields means every column of that table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    pub table: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl FieldSet {
    pub fn all(table: impl Into<String>) -> Self {
        FieldSet {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    pub fn columns<I, S>(table: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSet {
            table: table.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub field: String,
    #[serde(rename = "asc", default = "default_true")]
    pub ascending: bool,
}

fn default_true() -> bool {
    true
}

/// Insert or update body: ordered column/value pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct Mutation {
    pub table: String,
    pub assignments: Vec<Assignment>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub field: String,
    pub value: Literal,
}

/// How a literal is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    /// Quoted and escaped, or bound as a text parameter.
    String,
    /// Validated as a numeric literal, emitted unquoted.
    Number,
    /// Emitted verbatim with no escaping. The caller owns its safety.
    Raw,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Literal {
    pub text: String,
    pub kind: LiteralKind,
}

impl Literal {
    pub fn string(text: impl Into<String>) -> Self {
        Literal {
            text: text.into(),
            kind: LiteralKind::String,
        }
    }

    pub fn number(text: impl Into<String>) -> Self {
        Literal {
            text: text.into(),
            kind: LiteralKind::Number,
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Literal {
            text: text.into(),
            kind: LiteralKind::Raw,
        }
    }

    /// `TRUE`, `FALSE` or `NULL`, which is what JSON booleans and null become.
    pub fn is_keyword_constant(&self) -> bool {
        self.kind == LiteralKind::Raw
            && ["TRUE", "FALSE", "NULL"]
                .iter()
                .any(|k| self.text.eq_ignore_ascii_case(k))
    }
}

/// Right-hand side of a condition: a single literal or a parenthesised list (for IN / NOT IN).
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Scalar(Literal),
    List(Vec<Literal>),
}

impl From<Literal> for Operand {
    fn from(lit: Literal) -> Self {
        Operand::Scalar(lit)
    }
}

/// Joins a condition to the one after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    /// Registry code the connector resolves through.
    pub fn code(self) -> &'static str {
        match self {
            Connector::And => "a",
            Connector::Or => "o",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "and" => Some(Connector::And),
            "o" | "or" => Some(Connector::Or),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhereCond {
    pub field: String,
    /// Operator code, resolved through the registry at compile time.
    pub operator: String,
    pub value: Operand,
    /// Ignored on the last condition; `None` elsewhere means AND.
    pub connector: Option<Connector>,
}

impl WhereCond {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Operand>) -> Self {
        WhereCond {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            connector: None,
        }
    }

    pub fn then(mut self, connector: Connector) -> Self {
        self.connector = Some(connector);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
            JoinKind::LeftOuter => "LEFT OUTER",
            JoinKind::RightOuter => "RIGHT OUTER",
            JoinKind::FullOuter => "FULL OUTER",
        }
    }

    /// Case-insensitive; surrounding whitespace and a trailing "JOIN" are tolerated.
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let words: Vec<&str> = upper
            .split_whitespace()
            .filter(|w| *w != "JOIN")
            .collect();
        Some(match words.as_slice() {
            ["INNER"] => JoinKind::Inner,
            ["LEFT"] => JoinKind::Left,
            ["RIGHT"] => JoinKind::Right,
            ["FULL"] => JoinKind::Full,
            ["LEFT", "OUTER"] => JoinKind::LeftOuter,
            ["RIGHT", "OUTER"] => JoinKind::RightOuter,
            ["FULL", "OUTER"] => JoinKind::FullOuter,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub field: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        ColumnRef {
            table: table.into(),
            field: field.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub left: ColumnRef,
    pub right: ColumnRef,
}
