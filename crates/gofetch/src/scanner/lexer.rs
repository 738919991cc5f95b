//! Lexer for Go import declarations.
//!
//! Only the tokens that can appear in a package clause or an import
//! declaration are recognised. Anything else lexes as an error, which the
//! parser treats as the end of the import section.

use logos::Logos;

/// Tokens of the package clause and import declarations
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+|//[^\n]*")]
pub(crate) enum Token {
    #[token("\n")]
    Newline,

    #[token(";")]
    Semicolon,

    /// Block comment; `true` when it spans lines and so ends a statement
    #[regex(r"/\*", lex_block_comment)]
    BlockComment(bool),

    #[token("package")]
    Package,

    #[token("import")]
    Import,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token(".")]
    Dot,

    #[regex(r"[\p{L}_][\p{L}\p{Nd}_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Interpreted and raw string literals; the content is kept verbatim
    #[regex(r#""([^"\\\n]|\\.)*""#, strip_quotes)]
    #[regex(r"`[^`]*`", strip_quotes)]
    StringLiteral(String),
}

fn lex_block_comment(lex: &mut logos::Lexer<Token>) -> Option<bool> {
    // "/*" is consumed; an unterminated comment is a lex error
    let remainder = lex.remainder();
    let end = remainder.find("*/")?;
    let multiline = remainder[..end].contains('\n');
    lex.bump(end + 2);
    Some(multiline)
}

fn strip_quotes(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    s[1..s.len() - 1].to_string()
}
