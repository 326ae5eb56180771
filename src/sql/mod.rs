pub mod ast;
pub mod infer;
pub mod lexer;
pub mod parser;
pub mod tables;
