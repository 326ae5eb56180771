/// Root of a parsed query: a single SELECT or a compound of several.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<Select>),
    SetQuery(Box<SetQuery>),
}

impl Statement {
    /// The leftmost SELECT, whose select list names the output columns.
    pub fn first_select(&self) -> &Select {
        match self {
            Statement::Select(sel) => sel,
            Statement::SetQuery(sq) => &sq.left,
        }
    }

    /// Every SELECT arm, left to right.
    pub fn selects(&self) -> Vec<&Select> {
        match self {
            Statement::Select(sel) => vec![sel.as_ref()],
            Statement::SetQuery(sq) => std::iter::once(&sq.left)
                .chain(sq.ops.iter().map(|(_, sel)| sel))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// `left op sel op sel ...` with ORDER BY / LIMIT applying to the whole.
#[derive(Debug, Clone, PartialEq)]
pub struct SetQuery {
    pub left: Select,
    pub ops: Vec<(SetOp, Select)>,
    pub order_by: Option<Vec<OrderByItem>>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub columns: Vec<SelectColumn>,
    /// Comma-separated FROM entries, each with its chain of joins.
    pub from: Vec<TableRef>,
    pub where_clause: Option<Expr>,
    pub group_by: Option<Vec<Expr>>,
    pub having: Option<Expr>,
    pub order_by: Option<Vec<OrderByItem>>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// Bare `*`
    Star,
    /// `t.*`
    TableStar(String),
    /// expression, optional alias
    Expr(Expr, Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub factor: TableFactor,
    pub joins: Vec<JoinClause>,
}

impl TableRef {
    /// The leading factor followed by every joined factor.
    pub fn factors(&self) -> impl Iterator<Item = &TableFactor> {
        std::iter::once(&self.factor).chain(self.joins.iter().map(|j| &j.factor))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    Table {
        name: String,
        alias: Option<String>,
    },
    /// `(SELECT ...) [AS] alias`; the alias is mandatory.
    Subquery {
        query: Box<Statement>,
        alias: String,
    },
}

impl TableFactor {
    /// Name under which the factor's columns are visible.
    pub fn visible_name(&self) -> &str {
        match self {
            TableFactor::Table { name, alias } => alias.as_deref().unwrap_or(name),
            TableFactor::Subquery { alias, .. } => alias,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<String>),
    Natural,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub factor: TableFactor,
    pub constraint: JoinConstraint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    Null,
    ColumnRef {
        table: Option<String>,
        column: String,
    },
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
        glob: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Statement>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool, // true = IS NOT NULL
    },
    Exists {
        subquery: Box<Statement>,
        negated: bool,
    },
    ScalarSubquery(Box<Statement>),
    FunctionCall {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
        /// `f(*)`, as in `count(*)`
        wildcard: bool,
    },
    CaseWhen {
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        type_name: String,
    },
}

impl Expr {
    /// Visit every subquery directly nested in this expression tree.
    pub fn for_each_subquery<'a>(&'a self, f: &mut dyn FnMut(&'a Statement)) {
        match self {
            Expr::IntLiteral(_)
            | Expr::FloatLiteral(_)
            | Expr::StringLiteral(_)
            | Expr::Null
            | Expr::ColumnRef { .. } => {}
            Expr::BinaryOp { left, right, .. } => {
                left.for_each_subquery(f);
                right.for_each_subquery(f);
            }
            Expr::UnaryOp { operand, .. } => operand.for_each_subquery(f),
            Expr::Like { expr, pattern, .. } => {
                expr.for_each_subquery(f);
                pattern.for_each_subquery(f);
            }
            Expr::InList { expr, list, .. } => {
                expr.for_each_subquery(f);
                for e in list {
                    e.for_each_subquery(f);
                }
            }
            Expr::InSubquery { expr, subquery, .. } => {
                expr.for_each_subquery(f);
                f(subquery);
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.for_each_subquery(f);
                low.for_each_subquery(f);
                high.for_each_subquery(f);
            }
            Expr::IsNull { expr, .. } => expr.for_each_subquery(f),
            Expr::Exists { subquery, .. } => f(subquery),
            Expr::ScalarSubquery(subquery) => f(subquery),
            Expr::FunctionCall { args, .. } => {
                for e in args {
                    e.for_each_subquery(f);
                }
            }
            Expr::CaseWhen {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(e) = operand {
                    e.for_each_subquery(f);
                }
                for (cond, result) in when_clauses {
                    cond.for_each_subquery(f);
                    result.for_each_subquery(f);
                }
                if let Some(e) = else_clause {
                    e.for_each_subquery(f);
                }
            }
            Expr::Cast { expr, .. } => expr.for_each_subquery(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}
