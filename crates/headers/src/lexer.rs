//! Token stream for dumped Objective-C headers.
//!
//! Comments, whitespace and preprocessor lines are trivia and never reach the
//! parser. Every token keeps its byte span and line so the parser can slice
//! type text straight out of the source and attribute diagnostics.

/// Kind of a lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or C keyword
    Ident,
    /// `@interface`, `@end`, ... (span includes the `@`)
    AtKeyword,
    /// Integer literal (bitfield widths, array sizes)
    Number,
    /// String or character literal
    Literal,
    /// Any other single character
    Punct(char),
}

/// A token paired with its location in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Keyword name without the leading `@`
    pub fn keyword<'a>(&self, source: &'a str) -> Option<&'a str> {
        match self.kind {
            TokenKind::AtKeyword => Some(&source[self.start + 1..self.end]),
            _ => None,
        }
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

/// Lexer over one header's text
pub struct Lexer<'a> {
    source: &'a str,
    cursor: usize,
    line: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            line: 1,
            at_line_start: true,
        }
    }

    /// Lex the whole input
    pub fn tokenize(source: &'a str) -> Vec<Token> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token() {
            tokens.push(token);
        }
        tokens
    }

    /// Pull the next token, `None` at end of input.
    pub fn next_token(&mut self) -> Option<Token> {
        self.skip_trivia();

        let start = self.cursor;
        let line = self.line;
        let ch = self.peek_char()?;
        self.at_line_start = false;

        let kind = if is_ident_start(ch) {
            self.eat_while(is_ident_continue);
            TokenKind::Ident
        } else if ch.is_ascii_digit() {
            self.eat_while(|c| c.is_ascii_alphanumeric() || c == '.');
            TokenKind::Number
        } else if ch == '@' && self.peek_next_char().map(is_ident_start).unwrap_or(false) {
            self.bump_char();
            self.eat_while(is_ident_continue);
            TokenKind::AtKeyword
        } else if ch == '"' || ch == '\'' {
            self.bump_char();
            self.eat_quoted(ch);
            TokenKind::Literal
        } else {
            self.bump_char();
            TokenKind::Punct(ch)
        };

        Some(Token {
            kind,
            start,
            end: self.cursor,
            line,
        })
    }

    /// Consume whitespace, comments and preprocessor lines.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.bump_char();
                }
                Some('/') if self.peek_next_char() == Some('/') => {
                    self.skip_to_line_end(false);
                }
                Some('/') if self.peek_next_char() == Some('*') => {
                    self.bump_char();
                    self.bump_char();
                    self.skip_block_comment();
                }
                Some('#') if self.at_line_start => {
                    self.skip_to_line_end(true);
                }
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        while let Some(ch) = self.bump_char() {
            if ch == '*' && self.peek_char() == Some('/') {
                self.bump_char();
                return;
            }
        }
    }

    /// Skip up to (not including) the newline. Directives honour `\` continuations.
    fn skip_to_line_end(&mut self, continuations: bool) {
        let mut escaped = false;
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                if !(continuations && escaped) {
                    return;
                }
                escaped = false;
                self.bump_char();
                continue;
            }
            if ch == '/' && self.peek_next_char() == Some('*') && continuations {
                self.bump_char();
                self.bump_char();
                self.skip_block_comment();
                continue;
            }
            if !ch.is_whitespace() {
                escaped = ch == '\\';
            }
            self.bump_char();
        }
    }

    fn eat_quoted(&mut self, quote: char) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                return;
            }
            self.bump_char();
            if ch == '\\' {
                self.bump_char();
            } else if ch == quote {
                return;
            }
        }
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.bump_char();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.cursor..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut chars = self.source[self.cursor..].chars();
        chars.next()?;
        chars.next()
    }

    fn bump_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.cursor += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.at_line_start = true;
        }
        Some(ch)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

/// Collapse runs of whitespace to single spaces and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String, usize)> {
        Lexer::tokenize(source)
            .into_iter()
            .map(|t| (t.kind, t.text(source).to_string(), t.line))
            .collect()
    }

    #[test]
    fn test_interface_header_line() {
        let toks = kinds("@interface Foo : NSObject <NSCopying>");
        assert_eq!(toks[0], (TokenKind::AtKeyword, "@interface".to_string(), 1));
        assert_eq!(toks[1].1, "Foo");
        assert_eq!(toks[2].0, TokenKind::Punct(':'));
        assert_eq!(toks[4].0, TokenKind::Punct('<'));
        assert_eq!(toks.len(), 7);
    }

    #[test]
    fn test_comments_and_directives_are_trivia() {
        let source = "#import <Foundation/Foundation.h>\n\
                      #define LONG_MACRO(a) \\\n    a + 1\n\
                      // comment ; @end\n\
                      /* block\n comment */ @class Foo;";
        let toks = kinds(source);
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[0].1, "@class");
        assert_eq!(toks[0].2, 6);
    }

    #[test]
    fn test_hash_inside_line_is_punct() {
        let toks = kinds("Class a # b");
        assert_eq!(toks[2].0, TokenKind::Punct('#'));
    }

    #[test]
    fn test_literals_swallow_semicolons() {
        let toks = kinds("API_DEPRECATED(\"use ; instead\", ios(2.0, 3.0));");
        assert_eq!(toks[2].0, TokenKind::Literal);
        assert_eq!(toks.last().unwrap().0, TokenKind::Punct(';'));
    }

    #[test]
    fn test_control_characters_survive_as_punct() {
        let toks = kinds("NS\u{1}Type");
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[1].0, TokenKind::Punct('\u{1}'));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  unsigned \n long   long "), "unsigned long long");
    }
}
