use super::*;

impl Parser {
    /// Parse SELECT, potentially followed by UNION [ALL] / INTERSECT / EXCEPT chains.
    pub(super) fn parse_query(&mut self) -> ParseResult<Statement> {
        self.descend(NESTING_COST)?;
        let query = self.parse_compound();
        self.ascend(NESTING_COST);
        query
    }

    fn parse_compound(&mut self) -> ParseResult<Statement> {
        let mut first = self.parse_select()?;

        if self.peek_set_op().is_none() {
            return Ok(Statement::Select(Box::new(first)));
        }

        // ORDER BY / LIMIT / OFFSET belong to the whole compound, not the first arm
        let mut set_order_by = first.order_by.take();
        let mut set_limit = first.limit.take();
        let mut set_offset = first.offset.take();

        let mut ops = Vec::new();

        while let Some(set_op) = self.peek_set_op() {
            self.advance();
            if set_op == SetOp::Union && self.eat(&Token::All) {
                ops.push((SetOp::UnionAll, self.parse_select()?));
            } else {
                ops.push((set_op, self.parse_select()?));
            }

            if let Some((_, sel)) = ops.last_mut() {
                if sel.order_by.is_some() {
                    set_order_by = sel.order_by.take();
                }
                if sel.limit.is_some() {
                    set_limit = sel.limit.take();
                }
                if sel.offset.is_some() {
                    set_offset = sel.offset.take();
                }
            }
        }

        Ok(Statement::SetQuery(Box::new(SetQuery {
            left: first,
            ops,
            order_by: set_order_by,
            limit: set_limit,
            offset: set_offset,
        })))
    }

    fn peek_set_op(&self) -> Option<SetOp> {
        match self.peek() {
            Some(Token::Union) => Some(SetOp::Union),
            Some(Token::Intersect) => Some(SetOp::Intersect),
            Some(Token::Except) => Some(SetOp::Except),
            _ => None,
        }
    }

    pub(super) fn parse_select(&mut self) -> ParseResult<Select> {
        self.expect(&Token::Select)?;

        let distinct = if self.eat(&Token::Distinct) {
            true
        } else {
            self.eat(&Token::All);
            false
        };

        let columns = self.parse_select_columns()?;

        let mut from = Vec::new();
        if self.eat(&Token::From) {
            loop {
                from.push(self.parse_table_ref()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let where_clause = if self.eat(&Token::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let group_by = if self.eat(&Token::Group) {
            self.expect(&Token::By)?;
            Some(self.parse_expr_list()?)
        } else {
            None
        };

        let having = if self.eat(&Token::Having) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let order_by = if self.eat(&Token::Order) {
            self.expect(&Token::By)?;
            let mut items = Vec::new();
            loop {
                let expr = self.parse_expr()?;
                let descending = if self.eat(&Token::Desc) {
                    true
                } else {
                    self.eat(&Token::Asc);
                    false
                };
                items.push(OrderByItem { expr, descending });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            Some(items)
        } else {
            None
        };

        let (limit, offset) = if self.eat(&Token::Limit) {
            let first = self.parse_expr()?;
            if self.eat(&Token::Offset) {
                (Some(first), Some(self.parse_expr()?))
            } else if self.eat(&Token::Comma) {
                // LIMIT <offset>, <count>
                (Some(self.parse_expr()?), Some(first))
            } else {
                (Some(first), None)
            }
        } else {
            (None, None)
        };

        Ok(Select {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    pub(super) fn parse_select_columns(&mut self) -> ParseResult<Vec<SelectColumn>> {
        let mut columns = Vec::new();
        loop {
            if self.eat(&Token::Star) {
                columns.push(SelectColumn::Star);
            } else if self.is_ident_ahead()
                && self.peek_nth(1) == Some(&Token::Dot)
                && self.peek_nth(2) == Some(&Token::Star)
            {
                let table = self.expect_ident()?;
                self.advance(); // '.'
                self.advance(); // '*'
                columns.push(SelectColumn::TableStar(table));
            } else {
                let expr = self.parse_expr()?;
                let alias = self.parse_alias()?;
                columns.push(SelectColumn::Expr(expr, alias));
            }

            if !self.eat(&Token::Comma) {
                break;
            }
        }

        Ok(columns)
    }

    fn parse_table_ref(&mut self) -> ParseResult<TableRef> {
        let factor = self.parse_table_factor()?;

        let mut joins = Vec::new();
        loop {
            let (join_type, natural) = match self.peek() {
                Some(Token::Join) => {
                    self.advance();
                    (JoinType::Inner, false)
                }
                Some(Token::Inner) => {
                    self.advance();
                    self.expect(&Token::Join)?;
                    (JoinType::Inner, false)
                }
                Some(Token::Left) => {
                    self.advance();
                    self.eat(&Token::Outer);
                    self.expect(&Token::Join)?;
                    (JoinType::Left, false)
                }
                Some(Token::Cross) => {
                    self.advance();
                    self.expect(&Token::Join)?;
                    (JoinType::Cross, false)
                }
                Some(Token::Natural) => {
                    self.advance();
                    let jt = if self.eat(&Token::Left) {
                        self.eat(&Token::Outer);
                        JoinType::Left
                    } else {
                        self.eat(&Token::Inner);
                        JoinType::Inner
                    };
                    self.expect(&Token::Join)?;
                    (jt, true)
                }
                _ => break,
            };

            let factor = self.parse_table_factor()?;
            let constraint = if natural {
                JoinConstraint::Natural
            } else if self.eat(&Token::On) {
                JoinConstraint::On(self.parse_expr()?)
            } else if self.eat(&Token::Using) {
                self.expect(&Token::LParen)?;
                let mut cols = Vec::new();
                loop {
                    cols.push(self.expect_ident()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RParen)?;
                JoinConstraint::Using(cols)
            } else {
                JoinConstraint::None
            };

            joins.push(JoinClause {
                join_type,
                factor,
                constraint,
            });
        }

        Ok(TableRef { factor, joins })
    }

    fn parse_table_factor(&mut self) -> ParseResult<TableFactor> {
        if self.eat(&Token::LParen) {
            if self.peek() != Some(&Token::Select) {
                return Err(self.error(&["SELECT"]));
            }
            let query = self.parse_query()?;
            self.expect(&Token::RParen)?;
            // A derived table must be named
            let alias = match self.parse_alias()? {
                Some(alias) => alias,
                None => return Err(self.error(&["AS", "IDENTIFIER"])),
            };
            return Ok(TableFactor::Subquery {
                query: Box::new(query),
                alias,
            });
        }

        let name = self.expect_ident()?;
        let alias = self.parse_alias()?;
        Ok(TableFactor::Table { name, alias })
    }

    fn parse_expr_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    // Expression parsing with precedence:
    // parse_expr -> parse_or_expr -> parse_and_expr -> parse_not_expr
    //   -> parse_comparison -> parse_additive -> parse_multiplicative
    //   -> parse_concat -> parse_unary -> parse_primary

    pub(super) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.descend(NESTING_COST)?;
        let expr = self.parse_or_expr();
        self.ascend(NESTING_COST);
        expr
    }

    fn parse_or_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expr()?;
        let mut chained = 0;
        while self.eat(&Token::Or) {
            self.descend(1)?;
            chained += 1;
            let right = self.parse_and_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOp::Or,
                right: Box::new(right),
            };
        }
        self.ascend(chained);
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not_expr()?;
        let mut chained = 0;
        while self.eat(&Token::And) {
            self.descend(1)?;
            chained += 1;
            let right = self.parse_not_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOp::And,
                right: Box::new(right),
            };
        }
        self.ascend(chained);
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> ParseResult<Expr> {
        if self.peek() == Some(&Token::Not) {
            if self.peek_nth(1) == Some(&Token::Exists) {
                self.advance(); // NOT
                self.advance(); // EXISTS
                let subquery = self.parse_parenthesized_query()?;
                return Ok(Expr::Exists {
                    subquery: Box::new(subquery),
                    negated: true,
                });
            }
            self.advance();
            self.descend(1)?;
            let operand = self.parse_not_expr()?;
            self.ascend(1);
            Ok(Expr::UnaryOp {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            })
        } else {
            self.parse_comparison()
        }
    }

    fn parse_parenthesized_query(&mut self) -> ParseResult<Statement> {
        self.expect(&Token::LParen)?;
        if self.peek() != Some(&Token::Select) {
            return Err(self.error(&["SELECT"]));
        }
        let query = self.parse_query()?;
        self.expect(&Token::RParen)?;
        Ok(query)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_additive()?;

        // IS [NOT] NULL
        if self.eat(&Token::Is) {
            let negated = self.eat(&Token::Not);
            self.expect(&Token::Null)?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        let negated = if self.peek() == Some(&Token::Not)
            && matches!(
                self.peek_nth(1),
                Some(Token::Like | Token::Glob | Token::In | Token::Between)
            ) {
            self.advance();
            true
        } else {
            false
        };

        match self.peek() {
            Some(Token::Like) | Some(Token::Glob) => {
                let glob = self.advance() == Some(Token::Glob);
                let pattern = self.parse_additive()?;
                return Ok(Expr::Like {
                    expr: Box::new(left),
                    pattern: Box::new(pattern),
                    negated,
                    glob,
                });
            }
            Some(Token::In) => {
                self.advance();
                return self.parse_in_list_or_subquery(left, negated);
            }
            Some(Token::Between) => {
                self.advance();
                return self.parse_between_rest(left, negated);
            }
            _ => {}
        }

        let op = match self.peek() {
            Some(Token::Eq) => Some(BinaryOp::Eq),
            Some(Token::Ne) => Some(BinaryOp::Ne),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::Le) => Some(BinaryOp::Le),
            Some(Token::Ge) => Some(BinaryOp::Ge),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive()?;
            Ok(Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    fn parse_in_list_or_subquery(&mut self, left: Expr, negated: bool) -> ParseResult<Expr> {
        self.expect(&Token::LParen)?;
        // IN (SELECT ...)
        if self.peek() == Some(&Token::Select) {
            let subquery = self.parse_query()?;
            self.expect(&Token::RParen)?;
            return Ok(Expr::InSubquery {
                expr: Box::new(left),
                subquery: Box::new(subquery),
                negated,
            });
        }
        let list = if self.peek() == Some(&Token::RParen) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.expect(&Token::RParen)?;
        Ok(Expr::InList {
            expr: Box::new(left),
            list,
            negated,
        })
    }

    fn parse_between_rest(&mut self, left: Expr, negated: bool) -> ParseResult<Expr> {
        let low = self.parse_additive()?;
        self.expect(&Token::And)?;
        let high = self.parse_additive()?;
        Ok(Expr::Between {
            expr: Box::new(left),
            low: Box::new(low),
            high: Box::new(high),
            negated,
        })
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        let mut chained = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.descend(1)?;
            chained += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        self.ascend(chained);
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_concat()?;
        let mut chained = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            self.descend(1)?;
            chained += 1;
            let right = self.parse_concat()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        self.ascend(chained);
        Ok(left)
    }

    fn parse_concat(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        let mut chained = 0;
        while self.eat(&Token::Concat) {
            self.descend(1)?;
            chained += 1;
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOp::Concat,
                right: Box::new(right),
            };
        }
        self.ascend(chained);
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                self.descend(1)?;
                let operand = self.parse_unary()?;
                self.ascend(1);
                // Negative literals stay literals
                match operand {
                    Expr::IntLiteral(n) => Ok(Expr::IntLiteral(-n)),
                    Expr::FloatLiteral(n) => Ok(Expr::FloatLiteral(-n)),
                    _ => Ok(Expr::UnaryOp {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    }),
                }
            }
            Some(Token::Plus) => {
                self.advance();
                self.descend(1)?;
                let operand = self.parse_unary()?;
                self.ascend(1);
                Ok(Expr::UnaryOp {
                    op: UnaryOp::Plus,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.peek().cloned() {
            Some(Token::Integer(n)) => {
                self.advance();
                Ok(Expr::IntLiteral(n))
            }
            Some(Token::Float(n)) => {
                self.advance();
                Ok(Expr::FloatLiteral(n))
            }
            Some(Token::StringLit(s)) => {
                self.advance();
                Ok(Expr::StringLiteral(s))
            }
            Some(Token::Null) => {
                self.advance();
                Ok(Expr::Null)
            }
            Some(Token::Case) => self.parse_case_when(),
            Some(Token::Cast) => self.parse_cast(),
            Some(Token::Exists) => {
                self.advance();
                let subquery = self.parse_parenthesized_query()?;
                Ok(Expr::Exists {
                    subquery: Box::new(subquery),
                    negated: false,
                })
            }
            Some(Token::LParen) => {
                if self.peek_nth(1) == Some(&Token::Select) {
                    let subquery = self.parse_parenthesized_query()?;
                    return Ok(Expr::ScalarSubquery(Box::new(subquery)));
                }
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Ident(name)) | Some(Token::QuotedIdent(name)) => {
                self.advance();
                if self.peek() == Some(&Token::LParen) {
                    self.parse_function_call(name)
                } else if self.eat(&Token::Dot) {
                    let column = self.expect_ident()?;
                    Ok(Expr::ColumnRef {
                        table: Some(name),
                        column,
                    })
                } else {
                    Ok(Expr::ColumnRef {
                        table: None,
                        column: name,
                    })
                }
            }
            _ => Err(self.error(&[])),
        }
    }

    fn parse_function_call(&mut self, name: String) -> ParseResult<Expr> {
        self.expect(&Token::LParen)?;

        if self.eat(&Token::Star) {
            self.expect(&Token::RParen)?;
            return Ok(Expr::FunctionCall {
                name,
                args: Vec::new(),
                distinct: false,
                wildcard: true,
            });
        }

        let distinct = if self.eat(&Token::Distinct) {
            true
        } else {
            self.eat(&Token::All);
            false
        };

        let args = if !distinct && self.peek() == Some(&Token::RParen) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.expect(&Token::RParen)?;

        Ok(Expr::FunctionCall {
            name,
            args,
            distinct,
            wildcard: false,
        })
    }

    fn parse_case_when(&mut self) -> ParseResult<Expr> {
        self.advance(); // consume CASE

        // Simple CASE (CASE expr WHEN val THEN ...) vs searched CASE (CASE WHEN cond THEN ...)
        let operand = if !matches!(self.peek(), Some(Token::When | Token::Else | Token::End)) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };

        let mut when_clauses = Vec::new();
        while self.eat(&Token::When) {
            let condition = self.parse_expr()?;
            self.expect(&Token::Then)?;
            let result = self.parse_expr()?;
            when_clauses.push((condition, result));
        }
        if when_clauses.is_empty() {
            return Err(self.error(&["WHEN"]));
        }

        let else_clause = if self.eat(&Token::Else) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };

        self.expect(&Token::End)?;

        Ok(Expr::CaseWhen {
            operand,
            when_clauses,
            else_clause,
        })
    }

    fn parse_cast(&mut self) -> ParseResult<Expr> {
        self.advance(); // consume CAST
        self.expect(&Token::LParen)?;
        let expr = self.parse_expr()?;
        self.expect(&Token::As)?;
        let type_name = self.parse_type_name()?;
        self.expect(&Token::RParen)?;
        Ok(Expr::Cast {
            expr: Box::new(expr),
            type_name,
        })
    }

    /// `name [name ...] [( n [, m] )]`, e.g. `DOUBLE PRECISION` or `VARCHAR(20)`.
    fn parse_type_name(&mut self) -> ParseResult<String> {
        let mut words = vec![self.expect_ident()?];
        while self.is_ident_ahead() {
            words.push(self.expect_ident()?);
        }
        let mut type_name = words.join(" ");

        if self.eat(&Token::LParen) {
            let mut sizes = Vec::new();
            loop {
                let negative = self.eat(&Token::Minus);
                match self.peek() {
                    Some(Token::Integer(n)) => {
                        sizes.push(if negative { -n } else { *n }.to_string());
                        self.pos += 1;
                    }
                    _ => return Err(self.error(&["INTEGER"])),
                }
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
            type_name = format!("{}({})", type_name, sizes.join(","));
        }
        Ok(type_name)
    }
}
