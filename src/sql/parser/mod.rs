/// SQL parser: converts token stream into AST.
/// Hand-written recursive descent parser.
///
/// Syntax errors follow bison's verbose format:
/// `"<line>:<col>: syntax error, unexpected <TOKEN>, expecting <EXPECTED>"`.
use tracing::debug;

use crate::error::SyntaxError;
use crate::sql::ast::*;
use crate::sql::lexer::{Position, Spanned, Token};

mod expr_and_select;

pub type ParseResult<T> = Result<T, SyntaxError>;

/// Budget for the height of the expression tree. Input that would exceed it
/// is rejected as a syntax error instead of exhausting the stack.
const MAX_DEPTH: usize = 500;

/// A parenthesized expression or a subquery recurses through every
/// precedence level, so it spends more of the budget than one operator.
const NESTING_COST: usize = 5;

pub struct Parser {
    tokens: Vec<Spanned>,
    end: Position,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>, end: Position) -> Self {
        Parser {
            tokens,
            end,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        if self.pos < self.tokens.len() {
            let token = self.tokens[self.pos].token.clone();
            self.pos += 1;
            Some(token)
        } else {
            None
        }
    }

    /// Consume the next token if it equals `token`.
    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Error positioned at the current token (or at end of input).
    fn error(&self, expected: &[&str]) -> SyntaxError {
        let (pos, unexpected) = match self.tokens.get(self.pos) {
            Some(s) => (s.pos, s.token.describe()),
            None => (self.end, "$end".to_string()),
        };
        SyntaxError {
            line: pos.line,
            column: pos.column,
            unexpected,
            expected: expected.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Claim `cost` levels of nesting, failing at the current token when the
    /// budget is spent.
    fn descend(&mut self, cost: usize) -> ParseResult<()> {
        if self.depth + cost > MAX_DEPTH {
            return Err(self.error(&[]));
        }
        self.depth += cost;
        Ok(())
    }

    fn ascend(&mut self, cost: usize) {
        self.depth -= cost;
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&[&expected.describe()]))
        }
    }

    fn is_ident_ahead(&self) -> bool {
        matches!(self.peek(), Some(Token::Ident(_) | Token::QuotedIdent(_)))
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Ident(s)) | Some(Token::QuotedIdent(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.error(&["IDENTIFIER"])),
        }
    }

    /// Optional alias: `AS name`, or a bare identifier.
    fn parse_alias(&mut self) -> ParseResult<Option<String>> {
        if self.eat(&Token::As) {
            if let Some(Token::StringLit(s)) = self.peek() {
                let s = s.clone();
                self.pos += 1;
                return Ok(Some(s));
            }
            return self.expect_ident().map(Some);
        }
        if self.is_ident_ahead() {
            return self.expect_ident().map(Some);
        }
        Ok(None)
    }

    pub fn parse(&mut self) -> ParseResult<Statement> {
        if self.peek() != Some(&Token::Select) {
            return Err(self.error(&["SELECT"]));
        }
        let stmt = self.parse_query()?;

        // Skip optional trailing semicolon
        self.eat(&Token::Semicolon);

        if self.peek().is_some() {
            return Err(self.error(&["$end"]));
        }
        Ok(stmt)
    }
}

/// Parse one SELECT statement (possibly compound).
pub fn parse_sql(sql: &str) -> ParseResult<Statement> {
    let stream = crate::sql::lexer::tokenize(sql)?;
    let token_count = stream.tokens.len();
    let mut parser = Parser::new(stream.tokens, stream.end);
    let stmt = parser.parse()?;
    debug!(
        tokens = token_count,
        compound = matches!(stmt, Statement::SetQuery(_)),
        "parsed query"
    );
    Ok(stmt)
}

#[cfg(test)]
mod tests;
