//! Import declaration parsing
//!
//! Parses the package clause and the import declarations that follow it,
//! then stops. Source below the last import is never looked at, so files with
//! broken or unfinished code further down still yield their imports.

use logos::Logos;
use std::ops::Range;
use thiserror::Error;

use super::lexer::Token;

/// A single import spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Local name, `.` or `_`, when one is given
    pub name: Option<String>,
    /// Import path as written between the quotes
    pub path: String,
    /// 1-based line of the import path
    pub line: usize,
}

/// Malformed package clause or import declaration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

/// Extract the import specs of one source file
pub fn parse_imports(source: &str) -> Result<Vec<ImportSpec>, SyntaxError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    ImportParser::new(source).parse()
}

type Lexed = (Result<Token, ()>, Range<usize>);

struct ImportParser<'s> {
    source: &'s str,
    lexer: logos::Lexer<'s, Token>,
    peeked: Option<Option<Lexed>>,
}

impl<'s> ImportParser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            lexer: Token::lexer(source),
            peeked: None,
        }
    }

    fn parse(mut self) -> Result<Vec<ImportSpec>, SyntaxError> {
        self.skip_separators();
        match self.bump() {
            Some((Ok(Token::Package), _)) => {}
            Some((_, span)) => return Err(self.error(span.start, "expected 'package'")),
            None => return Err(self.error(self.source.len(), "expected 'package', found end of file")),
        }

        self.skip_trivia();
        match self.bump() {
            Some((Ok(Token::Identifier(_)), _)) => {}
            Some((_, span)) => return Err(self.error(span.start, "expected package name")),
            None => return Err(self.error(self.source.len(), "expected package name, found end of file")),
        }
        self.expect_terminator()?;

        let mut imports = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                Some(Ok(Token::Import)) => {
                    self.bump();
                    self.import_decl(&mut imports)?;
                }
                // first declaration that isn't an import ends the section
                _ => break,
            }
        }
        Ok(imports)
    }

    fn import_decl(&mut self, imports: &mut Vec<ImportSpec>) -> Result<(), SyntaxError> {
        self.skip_blank();
        if self.peek() != Some(Ok(Token::LeftParen)) {
            imports.push(self.import_spec()?);
            return self.expect_terminator();
        }

        self.bump();
        loop {
            self.skip_separators();
            if self.peek() == Some(Ok(Token::RightParen)) {
                self.bump();
                break;
            }
            imports.push(self.import_spec()?);

            self.skip_trivia();
            match self.peek() {
                Some(Ok(Token::RightParen)) => {}
                Some(Ok(Token::Newline | Token::Semicolon | Token::BlockComment(true))) => {
                    self.bump();
                }
                None => {
                    return Err(self.error(self.source.len(), "unterminated import group"));
                }
                Some(_) => {
                    let offset = self.offset();
                    return Err(self.error(offset, "expected ';', newline or ')' after import"));
                }
            }
        }
        self.expect_terminator()
    }

    fn import_spec(&mut self) -> Result<ImportSpec, SyntaxError> {
        self.skip_trivia();
        let name = match self.peek() {
            Some(Ok(Token::Identifier(name))) => {
                self.bump();
                Some(name)
            }
            Some(Ok(Token::Dot)) => {
                self.bump();
                Some(".".to_string())
            }
            _ => None,
        };

        self.skip_trivia();
        match self.bump() {
            Some((Ok(Token::StringLiteral(path)), span)) => Ok(ImportSpec {
                name,
                path,
                line: self.line_at(span.start),
            }),
            Some((_, span)) => Err(self.error(span.start, "expected import path")),
            None => Err(self.error(self.source.len(), "expected import path, found end of file")),
        }
    }

    fn expect_terminator(&mut self) -> Result<(), SyntaxError> {
        self.skip_trivia();
        match self.peek() {
            None => Ok(()),
            Some(Ok(Token::Newline | Token::Semicolon | Token::BlockComment(true))) => {
                self.bump();
                Ok(())
            }
            Some(_) => {
                let offset = self.offset();
                Err(self.error(offset, "expected ';' or newline"))
            }
        }
    }

    /// Skip comments that stay on one line
    fn skip_trivia(&mut self) {
        while self.peek() == Some(Ok(Token::BlockComment(false))) {
            self.bump();
        }
    }

    /// Skip comments and line breaks
    fn skip_blank(&mut self) {
        while matches!(
            self.peek(),
            Some(Ok(Token::Newline | Token::BlockComment(_)))
        ) {
            self.bump();
        }
    }

    /// Skip comments, line breaks and semicolons
    fn skip_separators(&mut self) {
        while matches!(
            self.peek(),
            Some(Ok(Token::Newline | Token::Semicolon | Token::BlockComment(_)))
        ) {
            self.bump();
        }
    }

    fn peek(&mut self) -> Option<Result<Token, ()>> {
        self.fill();
        self.peeked
            .as_ref()
            .and_then(|next| next.as_ref())
            .map(|(token, _)| token.clone())
    }

    fn bump(&mut self) -> Option<Lexed> {
        self.fill();
        self.peeked.take().flatten()
    }

    fn fill(&mut self) {
        if self.peeked.is_none() {
            let next = self.lexer.next().map(|token| (token, self.lexer.span()));
            self.peeked = Some(next);
        }
    }

    /// Start offset of the peeked token, or end of input
    fn offset(&mut self) -> usize {
        self.fill();
        match &self.peeked {
            Some(Some((_, span))) => span.start,
            _ => self.source.len(),
        }
    }

    fn line_at(&self, offset: usize) -> usize {
        self.source[..offset].matches('\n').count() + 1
    }

    fn error(&self, offset: usize, message: &str) -> SyntaxError {
        SyntaxError {
            line: self.line_at(offset),
            message: message.to_string(),
        }
    }
}
