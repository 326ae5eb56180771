/// SQL lexer (tokenizer) using nom.
///
/// Every token carries the 1-based line and column of its first character so
/// that the parser can report positioned syntax errors.
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::value,
    IResult,
};

use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Select,
    Distinct,
    All,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Limit,
    Offset,
    As,
    Join,
    Inner,
    Left,
    Outer,
    Cross,
    Natural,
    On,
    Using,
    And,
    Or,
    Not,
    In,
    Is,
    Null,
    Like,
    Glob,
    Between,
    Exists,
    Case,
    When,
    Then,
    Else,
    End,
    Cast,
    Union,
    Intersect,
    Except,

    // Literals
    Integer(i64),
    Float(f64),
    StringLit(String),

    // Identifiers
    Ident(String),
    /// `"..."`, `` `...` `` or `[...]`; never a keyword.
    QuotedIdent(String),

    // Symbols
    LParen,
    RParen,
    Comma,
    Star,
    Semicolon,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Dot,
    Plus,
    Minus,
    Slash,
    Percent,
    Concat,
}

impl Token {
    /// Name used in syntax error messages.
    pub fn describe(&self) -> String {
        let s = match self {
            Token::Integer(_) => "INTEGER",
            Token::Float(_) => "REAL",
            Token::StringLit(_) => "STRING",
            Token::Ident(_) | Token::QuotedIdent(_) => "IDENTIFIER",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::Comma => "','",
            Token::Star => "'*'",
            Token::Semicolon => "';'",
            Token::Eq => "'='",
            Token::Ne => "'<>'",
            Token::Lt => "'<'",
            Token::Gt => "'>'",
            Token::Le => "'<='",
            Token::Ge => "'>='",
            Token::Dot => "'.'",
            Token::Plus => "'+'",
            Token::Minus => "'-'",
            Token::Slash => "'/'",
            Token::Percent => "'%'",
            Token::Concat => "'||'",
            keyword => return format!("{:?}", keyword).to_uppercase(),
        };
        s.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    fn start() -> Self {
        Position { line: 1, column: 1 }
    }

    fn advance(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct TokenStream {
    pub tokens: Vec<Spanned>,
    /// Position just past the last character of input.
    pub end: Position,
}

/// Tokenize a SQL string.
pub fn tokenize(input: &str) -> Result<TokenStream, SyntaxError> {
    let mut tokens = Vec::new();
    let mut remaining = input;
    let mut pos = Position::start();

    loop {
        // Skip whitespace and comments
        while let Ok((rest, skipped)) = lex_trivia(remaining) {
            pos.advance(skipped);
            remaining = rest;
        }

        if remaining.is_empty() {
            break;
        }

        // Left over by lex_trivia only when never closed
        if remaining.starts_with("/*") {
            return Err(undefined_at(pos));
        }

        match lex_token(remaining) {
            Ok((rest, token)) => {
                tokens.push(Spanned { token, pos });
                pos.advance(&remaining[..remaining.len() - rest.len()]);
                remaining = rest;
            }
            Err(_) => return Err(undefined_at(pos)),
        }
    }

    Ok(TokenStream { tokens, end: pos })
}

fn undefined_at(pos: Position) -> SyntaxError {
    SyntaxError {
        line: pos.line,
        column: pos.column,
        unexpected: "$undefined".into(),
        expected: Vec::new(),
    }
}

fn lex_trivia(input: &str) -> IResult<&str, &str> {
    alt((multispace1, lex_line_comment, lex_block_comment))(input)
}

fn lex_line_comment(input: &str) -> IResult<&str, &str> {
    let (rest, _) = tag("--")(input)?;
    let (rest, _) = take_while(|c| c != '\n')(rest)?;
    Ok((rest, &input[..input.len() - rest.len()]))
}

fn lex_block_comment(input: &str) -> IResult<&str, &str> {
    let (rest, _) = tag("/*")(input)?;
    let (rest, _) = take_until("*/")(rest)?;
    let (rest, _) = tag("*/")(rest)?;
    Ok((rest, &input[..input.len() - rest.len()]))
}

fn lex_token(input: &str) -> IResult<&str, Token> {
    alt((
        lex_number,
        lex_symbol,
        lex_string_literal,
        lex_quoted_ident,
        lex_keyword_or_ident,
    ))(input)
}

fn lex_symbol(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::Le, tag("<=")),
        value(Token::Ge, tag(">=")),
        value(Token::Ne, alt((tag("!="), tag("<>")))),
        value(Token::Eq, tag("==")),
        value(Token::Concat, tag("||")),
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
        value(Token::Comma, char(',')),
        value(Token::Star, char('*')),
        value(Token::Semicolon, char(';')),
        value(Token::Eq, char('=')),
        value(Token::Lt, char('<')),
        value(Token::Gt, char('>')),
        value(Token::Dot, char('.')),
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Slash, char('/')),
        value(Token::Percent, char('%')),
    ))(input)
}

/// Body of a quoted run up to `close`, where a doubled `close` is an escape.
fn quoted_body(input: &str, close: char, doubled_escapes: bool) -> IResult<&str, String> {
    let mut result = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == close {
            if doubled_escapes && matches!(chars.peek(), Some((_, next)) if *next == close) {
                chars.next();
                result.push(close);
                continue;
            }
            return Ok((&input[i + c.len_utf8()..], result));
        }
        result.push(c);
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn lex_string_literal(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('\'')(input)?;
    let (input, s) = quoted_body(input, '\'', true)?;
    Ok((input, Token::StringLit(s)))
}

fn lex_quoted_ident(input: &str) -> IResult<&str, Token> {
    let (rest, open) = alt((char('"'), char('`'), char('[')))(input)?;
    let (rest, name) = match open {
        '"' => quoted_body(rest, '"', true)?,
        '`' => quoted_body(rest, '`', true)?,
        _ => quoted_body(rest, ']', false)?,
    };
    Ok((rest, Token::QuotedIdent(name)))
}

fn lex_number(input: &str) -> IResult<&str, Token> {
    let int_end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let mut end = int_end;
    let mut is_float = false;

    if input[end..].starts_with('.') {
        let frac_len = input[end + 1..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(input.len() - end - 1);
        if int_end > 0 || frac_len > 0 {
            end += 1 + frac_len;
            is_float = true;
        }
    }

    if end == 0 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }

    // Exponent: e[+-]digits
    let rest = &input[end..];
    if rest.starts_with(['e', 'E']) {
        let sign_len = usize::from(rest[1..].starts_with(['+', '-']));
        let exp_digits = rest[1 + sign_len..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len() - 1 - sign_len);
        if exp_digits > 0 {
            end += 1 + sign_len + exp_digits;
            is_float = true;
        }
    }

    let text = &input[..end];
    let float_err =
        || nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float));
    if is_float {
        let num: f64 = text.parse().map_err(|_| float_err())?;
        return Ok((&input[end..], Token::Float(num)));
    }
    match text.parse::<i64>() {
        Ok(n) => Ok((&input[end..], Token::Integer(n))),
        // Integers too large for i64 become reals, as in SQLite
        Err(_) => {
            let num: f64 = text.parse().map_err(|_| float_err())?;
            Ok((&input[end..], Token::Float(num)))
        }
    }
}

fn lex_keyword_or_ident(input: &str) -> IResult<&str, Token> {
    let (remaining, word) =
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '$')(input)?;
    let upper = word.to_uppercase();

    let token = match upper.as_str() {
        "SELECT" => Token::Select,
        "DISTINCT" => Token::Distinct,
        "ALL" => Token::All,
        "FROM" => Token::From,
        "WHERE" => Token::Where,
        "GROUP" => Token::Group,
        "BY" => Token::By,
        "HAVING" => Token::Having,
        "ORDER" => Token::Order,
        "ASC" => Token::Asc,
        "DESC" => Token::Desc,
        "LIMIT" => Token::Limit,
        "OFFSET" => Token::Offset,
        "AS" => Token::As,
        "JOIN" => Token::Join,
        "INNER" => Token::Inner,
        "LEFT" => Token::Left,
        "OUTER" => Token::Outer,
        "CROSS" => Token::Cross,
        "NATURAL" => Token::Natural,
        "ON" => Token::On,
        "USING" => Token::Using,
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "IN" => Token::In,
        "IS" => Token::Is,
        "NULL" => Token::Null,
        "LIKE" => Token::Like,
        "GLOB" => Token::Glob,
        "BETWEEN" => Token::Between,
        "EXISTS" => Token::Exists,
        "CASE" => Token::Case,
        "WHEN" => Token::When,
        "THEN" => Token::Then,
        "ELSE" => Token::Else,
        "END" => Token::End,
        "CAST" => Token::Cast,
        "UNION" => Token::Union,
        "INTERSECT" => Token::Intersect,
        "EXCEPT" => Token::Except,
        _ => Token::Ident(word.to_string()),
    };

    Ok((remaining, token))
}
