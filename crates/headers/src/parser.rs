//! Declaration parser for class-dump style headers
//!
//! Recovery works at two levels. A line or member that does not fit any
//! production becomes a [`ParseWarning`] and parsing resumes after it. A block
//! that is never closed is a [`ParseFatal`]: whatever was completed before it
//! is returned and the rest of the file is dropped.

use crate::error::{ParseFatal, ParseWarning};
use crate::lexer::{collapse_whitespace, Lexer, Token, TokenKind};
use indexmap::IndexSet;
use objcat_core::{
    CategoryDecl, ClassDecl, Declaration, ForwardRef, IvarDecl, Members, MethodDecl, MethodKind,
    Param, PropertyDecl, ProtocolDecl, SelectorPart,
};
use std::path::Path;
use tracing::debug;

/// Result of parsing one header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedHeader {
    pub declarations: Vec<Declaration>,
    pub forward_refs: Vec<ForwardRef>,
    pub warnings: Vec<ParseWarning>,
    pub fatal: Option<ParseFatal>,
}

impl ParsedHeader {
    fn unreadable(reason: impl Into<String>) -> Self {
        Self {
            fatal: Some(ParseFatal::Unreadable(reason.into())),
            ..Self::default()
        }
    }
}

/// Parse the text of one header
pub fn parse_header(source: &str) -> ParsedHeader {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    Parser::new(source).parse()
}

/// Read and parse one header file. Unreadable or non-UTF-8 files come back
/// as a fatal result rather than an error so the caller can keep going.
pub fn parse_file(path: &Path) -> ParsedHeader {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return ParsedHeader::unreadable(e.to_string()),
    };
    match String::from_utf8(bytes) {
        Ok(text) => parse_header(&text),
        Err(e) => ParsedHeader::unreadable(format!("not valid UTF-8: {}", e)),
    }
}

/// Which parts of a C declarator make up the name and which the type
struct Declarator {
    name: String,
    type_name: String,
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    warnings: Vec<ParseWarning>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Lexer::tokenize(source),
            pos: 0,
            warnings: Vec::new(),
        }
    }

    fn parse(mut self) -> ParsedHeader {
        let mut declarations = Vec::new();
        let mut forward_refs = Vec::new();
        let mut fatal = None;

        while let Some(tok) = self.peek() {
            let result = match tok.kind {
                TokenKind::AtKeyword => match tok.keyword(self.source).unwrap_or_default() {
                    "interface" => self.parse_interface(),
                    "protocol" if self.is_forward_protocol() => {
                        self.parse_forward_refs(&mut forward_refs, ForwardRef::Protocol);
                        Ok(None)
                    }
                    "protocol" => self.parse_protocol(),
                    "class" => {
                        self.parse_forward_refs(&mut forward_refs, ForwardRef::Class);
                        Ok(None)
                    }
                    "import" | "compatibility_alias" => {
                        self.skip_c_declaration();
                        Ok(None)
                    }
                    "end" => {
                        self.warn(tok.line, "@end without an open block");
                        self.bump();
                        Ok(None)
                    }
                    other => {
                        let message = format!("unsupported directive @{}", other);
                        self.warn(tok.line, message);
                        self.skip_line();
                        Ok(None)
                    }
                },
                TokenKind::Ident if is_c_declaration_keyword(tok.text(self.source)) => {
                    self.skip_c_declaration();
                    Ok(None)
                }
                TokenKind::Ident if is_macro_like(tok.text(self.source)) => {
                    self.skip_macro();
                    if self.peek().map(|t| t.line == tok.line && t.kind != TokenKind::AtKeyword).unwrap_or(false) {
                        self.skip_c_declaration();
                    }
                    Ok(None)
                }
                TokenKind::Punct(';') => {
                    self.bump();
                    Ok(None)
                }
                _ => {
                    let message = format!("unrecognized line starting with {:?}", tok.text(self.source));
                    self.warn(tok.line, message);
                    self.skip_line();
                    Ok(None)
                }
            };

            match result {
                Ok(Some(decl)) => declarations.push(decl),
                Ok(None) => {}
                Err(e) => {
                    fatal = Some(e);
                    break;
                }
            }
        }

        ParsedHeader {
            declarations,
            forward_refs,
            warnings: self.warnings,
            fatal,
        }
    }


    fn parse_interface(&mut self) -> Result<Option<Declaration>, ParseFatal> {
        let start = self.bump().map(|t| t.line).unwrap_or(1);
        let Some(name) = self.eat_ident() else {
            self.warn(start, "@interface without a class name");
            return self.recover_block("interface", "<unnamed>", start);
        };

        // `Name<T> :`, `Name<T> (Category)` and `Name<T> <Protocols>` carry generics;
        // a lone `Name <P>` is a root class adopting protocols.
        let generics = if self.at_punct('<') && self.generic_list_precedes(&[':', '(', '<']) {
            self.parse_angle_list()
        } else {
            IndexSet::new()
        };

        if self.at_punct('(') {
            self.bump();
            let category = self.eat_ident();
            if !self.eat_punct(')') {
                self.warn(start, format!("malformed category on {}", name));
                return self.recover_block("interface", &name, start);
            }
            let protocols = self.parse_protocol_list();
            if self.at_punct('{') {
                let ivars = self.parse_ivars(&name, start)?;
                debug!("Dropping {} ivars declared in an extension of {}", ivars.len(), name);
            }
            let members = self.parse_members("interface", &name, start)?;
            return Ok(Some(Declaration::Category(CategoryDecl {
                class_name: name,
                category,
                protocols,
                members,
            })));
        }

        let mut class = ClassDecl::new(name);
        if self.eat_punct(':') {
            class.superclass = self.eat_ident();
            if class.superclass.is_none() {
                self.warn(start, format!("missing superclass name after ':' in {}", class.name));
            }
            if !generics.is_empty() && self.at_punct('<') && self.generic_args_match(&generics) {
                self.parse_angle_list();
            }
        }
        class.protocols = self.parse_protocol_list();
        if self.at_punct('{') {
            class.ivars = self.parse_ivars(&class.name, start)?;
        }
        class.members = self.parse_members("interface", &class.name, start)?;
        Ok(Some(Declaration::Class(class)))
    }

    fn parse_protocol(&mut self) -> Result<Option<Declaration>, ParseFatal> {
        let start = self.bump().map(|t| t.line).unwrap_or(1);
        let Some(name) = self.eat_ident() else {
            self.warn(start, "@protocol without a name");
            return self.recover_block("protocol", "<unnamed>", start);
        };

        let mut protocol = ProtocolDecl::new(name);
        protocol.protocols = self.parse_protocol_list();
        protocol.members = self.parse_members("protocol", &protocol.name, start)?;
        Ok(Some(Declaration::Protocol(protocol)))
    }

    /// Skip a block whose header could not be read, up to and including its `@end`
    fn recover_block(
        &mut self,
        keyword: &'static str,
        name: &str,
        line: usize,
    ) -> Result<Option<Declaration>, ParseFatal> {
        while let Some(tok) = self.bump() {
            if tok.keyword(self.source) == Some("end") {
                return Ok(None);
            }
        }
        Err(ParseFatal::UnterminatedBlock {
            keyword,
            name: name.to_string(),
            line,
        })
    }

    fn parse_members(
        &mut self,
        keyword: &'static str,
        name: &str,
        start: usize,
    ) -> Result<Members, ParseFatal> {
        let unterminated = || ParseFatal::UnterminatedBlock {
            keyword,
            name: name.to_string(),
            line: start,
        };
        let mut members = Members::default();

        loop {
            let Some(tok) = self.peek() else {
                return Err(unterminated());
            };
            match tok.kind {
                TokenKind::AtKeyword => match tok.keyword(self.source).unwrap_or_default() {
                    "end" => {
                        self.bump();
                        return Ok(members);
                    }
                    "property" => {
                        if let Some(property) = self.parse_property() {
                            members.properties.push(property);
                        }
                    }
                    "optional" | "required" | "public" | "private" | "protected" | "package" => {
                        self.bump();
                    }
                    "interface" | "protocol" | "implementation" => return Err(unterminated()),
                    other => {
                        let message = format!("unsupported directive @{} in {}", other, name);
                        self.warn(tok.line, message);
                        self.skip_line();
                    }
                },
                TokenKind::Punct('-') | TokenKind::Punct('+') => {
                    if let Some(method) = self.parse_method() {
                        members.methods.push(method);
                    }
                }
                TokenKind::Punct(';') => {
                    self.bump();
                }
                TokenKind::Ident if is_macro_like(tok.text(self.source)) => {
                    self.skip_macro();
                }
                _ => {
                    let message = format!(
                        "unrecognized line in {} starting with {:?}",
                        name,
                        tok.text(self.source)
                    );
                    self.warn(tok.line, message);
                    self.skip_line();
                }
            }
        }
    }

    fn parse_ivars(&mut self, owner: &str, start: usize) -> Result<Vec<IvarDecl>, ParseFatal> {
        let unterminated = || ParseFatal::UnterminatedIvars {
            name: owner.to_string(),
            line: start,
        };
        self.bump();
        let mut ivars = Vec::new();

        loop {
            let Some(tok) = self.peek() else {
                return Err(unterminated());
            };
            match tok.kind {
                TokenKind::Punct('}') => {
                    self.bump();
                    return Ok(ivars);
                }
                TokenKind::Punct(';') => {
                    self.bump();
                }
                TokenKind::AtKeyword => match tok.keyword(self.source).unwrap_or_default() {
                    "public" | "private" | "protected" | "package" => {
                        self.bump();
                    }
                    _ => return Err(unterminated()),
                },
                _ => {
                    let decl_start = self.pos;
                    let mut depth = 0usize;
                    let decl_end = loop {
                        let Some(t) = self.peek() else {
                            return Err(unterminated());
                        };
                        match t.kind {
                            TokenKind::Punct('{') => depth += 1,
                            TokenKind::Punct('}') if depth == 0 => break self.pos,
                            TokenKind::Punct('}') => depth -= 1,
                            TokenKind::Punct(';') if depth == 0 => break self.pos,
                            TokenKind::AtKeyword if depth == 0 => break self.pos,
                            _ => {}
                        }
                        self.bump();
                    };

                    match self.split_declarator(decl_start, decl_end) {
                        Some(d) => ivars.push(IvarDecl {
                            name: d.name,
                            type_name: d.type_name,
                        }),
                        None => {
                            let message = format!("unrecognized instance variable in {}", owner);
                            self.warn(tok.line, message);
                        }
                    }
                    self.eat_punct(';');
                }
            }
        }
    }


    fn parse_property(&mut self) -> Option<PropertyDecl> {
        let line = self.bump()?.line;

        let mut attributes = Vec::new();
        if self.at_punct('(') {
            let open = self.pos;
            let Some(close) = self.matching(open, '(', ')') else {
                self.warn(line, "unterminated property attribute list");
                self.skip_member(line);
                return None;
            };
            let mut attr_start = open + 1;
            let mut depth = 0usize;
            for idx in open + 1..=close {
                let t = self.tokens[idx];
                match t.kind {
                    TokenKind::Punct('(') => depth += 1,
                    TokenKind::Punct(')') if depth > 0 => depth -= 1,
                    TokenKind::Punct(',') | TokenKind::Punct(')') if depth == 0 => {
                        if attr_start < idx {
                            attributes.push(self.text_between(attr_start, idx));
                        }
                        attr_start = idx + 1;
                    }
                    _ => {}
                }
            }
            self.pos = close + 1;
        }

        let decl_start = self.pos;
        let Some(decl_end) = self.find_terminator(line) else {
            self.warn(line, "property declaration is missing ';'");
            return None;
        };
        self.pos = decl_end + 1;

        match self.split_declarator(decl_start, decl_end) {
            Some(d) => Some(PropertyDecl {
                name: d.name,
                type_name: d.type_name,
                attributes,
                line,
            }),
            None => {
                self.warn(line, "property without a type or name");
                None
            }
        }
    }

    fn parse_method(&mut self) -> Option<MethodDecl> {
        let sign = self.bump()?;
        let line = sign.line;
        let kind = match sign.kind {
            TokenKind::Punct(c) => MethodKind::from_prefix(c)?,
            _ => return None,
        };

        let return_type = if self.at_punct('(') {
            match self.parse_paren_type() {
                Some(t) => t,
                None => {
                    self.warn(line, "malformed method return type");
                    self.skip_member(line);
                    return None;
                }
            }
        } else {
            "id".to_string()
        };

        let mut parts = Vec::new();
        let mut variadic = false;

        match self.peek().map(|t| t.kind) {
            Some(TokenKind::Punct('.')) if self.peek_at(1).map(|t| t.kind) == Some(TokenKind::Ident) => {
                self.bump();
                let name = self.eat_ident().unwrap_or_default();
                parts.push(SelectorPart {
                    label: format!(".{}", name),
                    param: None,
                });
            }
            Some(TokenKind::Ident) | Some(TokenKind::Punct(':')) => {
                let mut label = if self.at_punct(':') {
                    String::new()
                } else {
                    self.eat_ident().unwrap_or_default()
                };

                if !self.at_punct(':') {
                    parts.push(SelectorPart { label, param: None });
                } else {
                    loop {
                        self.bump();
                        let type_name = if self.at_punct('(') {
                            match self.parse_paren_type() {
                                Some(t) => t,
                                None => {
                                    self.warn(line, "malformed parameter type");
                                    self.skip_member(line);
                                    return None;
                                }
                            }
                        } else {
                            "id".to_string()
                        };
                        let name = if self.at_kind(TokenKind::Ident) && !self.punct_at(1, ':') {
                            self.eat_ident()
                        } else {
                            None
                        };
                        parts.push(SelectorPart {
                            label,
                            param: Some(Param { type_name, name }),
                        });

                        if self.at_kind(TokenKind::Ident) && self.punct_at(1, ':') {
                            label = self.eat_ident().unwrap_or_default();
                        } else if self.at_punct(':') {
                            label = String::new();
                        } else {
                            break;
                        }
                    }

                    if self.at_punct(',') && self.punct_at(1, '.') && self.punct_at(2, '.') && self.punct_at(3, '.') {
                        self.pos += 4;
                        variadic = true;
                    }
                }
            }
            _ => {
                self.warn(line, "method declaration without a selector");
                self.skip_member(line);
                return None;
            }
        }

        // Trailing attributes and availability macros are ignored.
        let Some(end) = self.find_terminator(line) else {
            self.warn(line, "method declaration is missing ';'");
            return None;
        };
        self.pos = end + 1;

        Some(MethodDecl {
            kind,
            return_type,
            parts,
            variadic,
            line,
        })
    }

    fn parse_paren_type(&mut self) -> Option<String> {
        let open = self.pos;
        let close = self.matching(open, '(', ')')?;
        if close == open + 1 {
            return None;
        }
        self.pos = close + 1;
        Some(self.text_between(open + 1, close))
    }

    fn parse_forward_refs(&mut self, out: &mut Vec<ForwardRef>, make: fn(String) -> ForwardRef) {
        let line = self.bump().map(|t| t.line).unwrap_or(1);
        loop {
            match self.peek() {
                Some(t) if t.kind == TokenKind::Ident => {
                    out.push(make(t.text(self.source).to_string()));
                    self.bump();
                }
                Some(t) if t.is_punct(',') => {
                    self.bump();
                }
                Some(t) if t.is_punct(';') => {
                    self.bump();
                    return;
                }
                _ => {
                    self.warn(line, "forward declaration is missing ';'");
                    return;
                }
            }
        }
    }

    fn parse_protocol_list(&mut self) -> IndexSet<String> {
        if self.at_punct('<') {
            self.parse_angle_list()
        } else {
            IndexSet::new()
        }
    }

    /// `<A, B>` as a set of names; anything else inside is skipped
    fn parse_angle_list(&mut self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        let open = self.pos;
        let Some(close) = self.matching(open, '<', '>') else {
            let line = self.tokens[open].line;
            self.warn(line, "unterminated '<' list");
            self.bump();
            return names;
        };
        let mut last_ident = None;
        for idx in open + 1..=close {
            let t = self.tokens[idx];
            if t.kind == TokenKind::Ident {
                last_ident = Some(t);
            } else if t.is_punct(',') || idx == close {
                if let Some(ident) = last_ident.take() {
                    names.insert(ident.text(self.source).to_string());
                }
            }
        }
        self.pos = close + 1;
        names
    }


    /// Split the tokens of `Type name` (no terminator) into name and type text.
    fn split_declarator(&self, start: usize, end: usize) -> Option<Declarator> {
        let mut end = end;
        // trailing availability / attribute macros
        while end > start {
            let last = self.tokens[end - 1];
            let cut = if last.kind == TokenKind::Ident && is_macro_like(last.text(self.source)) {
                Some(end - 1)
            } else if last.is_punct(')') {
                self.matching_back(end - 1, '(', ')')
                    .filter(|&open| open > start)
                    .filter(|&open| {
                        let before = self.tokens[open - 1];
                        before.kind == TokenKind::Ident && is_macro_like(before.text(self.source))
                    })
                    .map(|open| open - 1)
            } else {
                None
            };
            match cut {
                Some(cut) if cut >= start + 2 && self.tokens[cut - 1].kind == TokenKind::Ident => end = cut,
                _ => break,
            }
        }
        if end <= start {
            return None;
        }

        // block or function pointer: `void (^name)(BOOL)`
        for idx in start..end.saturating_sub(3) {
            let t = &self.tokens[idx..idx + 4];
            if t[0].is_punct('(')
                && (t[1].is_punct('^') || t[1].is_punct('*'))
                && t[2].kind == TokenKind::Ident
                && t[3].is_punct(')')
            {
                let head = &self.source[self.tokens[start].start..t[2].start];
                let tail = &self.source[t[3].start..self.tokens[end - 1].end];
                return Some(Declarator {
                    name: t[2].text(self.source).to_string(),
                    type_name: collapse_whitespace(&format!("{}{}", head, tail)),
                });
            }
        }

        // array suffix `name[16]` and bitfield width `name:1`
        let mut suffix = String::new();
        let mut name_end = end;
        if self.tokens[end - 1].is_punct(']') {
            let open = self.matching_back(end - 1, '[', ']')?;
            suffix = self.text_between(open, end);
            name_end = open;
        } else if end >= start + 3
            && self.tokens[end - 1].kind == TokenKind::Number
            && self.tokens[end - 2].is_punct(':')
        {
            suffix = format!(":{}", self.tokens[end - 1].text(self.source));
            name_end = end - 2;
        }

        if name_end <= start + 1 {
            return None;
        }
        let name_tok = self.tokens[name_end - 1];
        if name_tok.kind != TokenKind::Ident {
            return None;
        }
        let mut type_name = self.text_between(start, name_end - 1);
        if type_name.is_empty() {
            return None;
        }
        type_name.push_str(&suffix);

        Some(Declarator {
            name: name_tok.text(self.source).to_string(),
            type_name,
        })
    }


    /// Index of the `;` ending a member that started on `line`. Stops at
    /// the start of the next declaration so a missing `;` only costs one member.
    fn find_terminator(&mut self, line: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut idx = self.pos;
        while idx < self.tokens.len() {
            let t = self.tokens[idx];
            match t.kind {
                TokenKind::Punct(';') if depth == 0 => return Some(idx),
                TokenKind::Punct('(') | TokenKind::Punct('{') | TokenKind::Punct('[') => depth += 1,
                TokenKind::Punct(')') | TokenKind::Punct('}') | TokenKind::Punct(']') => {
                    depth = depth.saturating_sub(1)
                }
                TokenKind::AtKeyword => break,
                TokenKind::Punct('-') | TokenKind::Punct('+')
                    if depth == 0 && t.line > line && self.starts_line(idx) =>
                {
                    break
                }
                _ => {}
            }
            idx += 1;
        }
        self.pos = idx;
        None
    }

    fn skip_member(&mut self, line: usize) {
        if let Some(end) = self.find_terminator(line) {
            self.pos = end + 1;
        }
    }

    /// Drop the rest of the current line, stopping before any `@` directive
    fn skip_line(&mut self) {
        let Some(first) = self.bump() else { return };
        while let Some(t) = self.peek() {
            if t.line != first.line || t.kind == TokenKind::AtKeyword {
                break;
            }
            self.bump();
        }
    }

    /// Skip a top-level C declaration (typedef, struct, extern, ...) through its `;`
    fn skip_c_declaration(&mut self) {
        let line = self.peek().map(|t| t.line).unwrap_or(1);
        let mut depth = 0usize;
        if self.peek().map(|t| t.kind) == Some(TokenKind::AtKeyword) {
            self.bump();
        }
        while let Some(t) = self.peek() {
            match t.kind {
                TokenKind::Punct(';') if depth == 0 => {
                    self.bump();
                    return;
                }
                TokenKind::Punct('{') => depth += 1,
                TokenKind::Punct('}') => depth = depth.saturating_sub(1),
                TokenKind::AtKeyword if depth == 0 => break,
                _ => {}
            }
            self.bump();
        }
        self.warn(line, "C declaration is missing ';'");
    }

    /// `MACRO` or `MACRO(...)`
    fn skip_macro(&mut self) {
        self.bump();
        if self.at_punct('(') {
            match self.matching(self.pos, '(', ')') {
                Some(close) => self.pos = close + 1,
                None => self.skip_line(),
            }
        }
    }


    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<Token> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    fn at_punct(&self, c: char) -> bool {
        self.punct_at(0, c)
    }

    fn punct_at(&self, offset: usize, c: char) -> bool {
        self.peek_at(offset).map(|t| t.is_punct(c)).unwrap_or(false)
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.peek().map(|t| t.kind == kind).unwrap_or(false)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.at_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self) -> Option<String> {
        let tok = self.peek()?;
        if tok.kind != TokenKind::Ident {
            return None;
        }
        self.pos += 1;
        Some(tok.text(self.source).to_string())
    }

    fn starts_line(&self, idx: usize) -> bool {
        idx == 0 || self.tokens[idx - 1].line < self.tokens[idx].line
    }

    /// Closing partner of the delimiter at `open`, never crossing a `;` or `@` directive
    fn matching(&self, open: usize, left: char, right: char) -> Option<usize> {
        let mut depth = 0usize;
        for idx in open..self.tokens.len() {
            let t = self.tokens[idx];
            if t.is_punct(left) {
                depth += 1;
            } else if t.is_punct(right) {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            } else if t.is_punct(';') || t.kind == TokenKind::AtKeyword {
                return None;
            }
        }
        None
    }

    fn matching_back(&self, close: usize, left: char, right: char) -> Option<usize> {
        let mut depth = 0usize;
        for idx in (0..=close).rev() {
            let t = self.tokens[idx];
            if t.is_punct(right) {
                depth += 1;
            } else if t.is_punct(left) {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
        }
        None
    }

    /// Source text of tokens `[start, end)` with whitespace collapsed
    fn text_between(&self, start: usize, end: usize) -> String {
        if start >= end {
            return String::new();
        }
        collapse_whitespace(&self.source[self.tokens[start].start..self.tokens[end - 1].end])
    }

    /// `@protocol Name;` or `@protocol A, B;`
    fn is_forward_protocol(&self) -> bool {
        self.peek_at(1).map(|t| t.kind == TokenKind::Ident).unwrap_or(false)
            && (self.punct_at(2, ';') || self.punct_at(2, ','))
    }

    /// Is the `<...>` at the cursor directly followed by one of `follow`?
    fn generic_list_precedes(&self, follow: &[char]) -> bool {
        match self.matching(self.pos, '<', '>') {
            Some(close) => self
                .tokens
                .get(close + 1)
                .map(|t| follow.iter().any(|c| t.is_punct(*c)))
                .unwrap_or(false),
            None => false,
        }
    }

    /// Does the `<...>` at the cursor only name the class's own generic parameters?
    fn generic_args_match(&self, generics: &IndexSet<String>) -> bool {
        let Some(close) = self.matching(self.pos, '<', '>') else {
            return false;
        };
        let mut idents = self.tokens[self.pos + 1..close]
            .iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text(self.source))
            .peekable();
        idents.peek().is_some() && idents.all(|name| generics.contains(name))
    }

    fn warn(&mut self, line: usize, message: impl Into<String>) {
        let warning = ParseWarning::new(line, message);
        debug!("Parse warning: {}", warning);
        self.warnings.push(warning);
    }
}

fn is_c_declaration_keyword(word: &str) -> bool {
    matches!(
        word,
        "typedef" | "struct" | "union" | "enum" | "extern" | "static" | "const" | "void"
    )
}

/// `NS_ASSUME_NONNULL_BEGIN`, `API_AVAILABLE(...)`, `__attribute__((...))`
fn is_macro_like(word: &str) -> bool {
    if word.starts_with("__") {
        return true;
    }
    word.len() > 2
        && word.contains('_')
        && word.starts_with(|c: char| c.is_ascii_uppercase())
        && word
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_class(source: &str) -> ClassDecl {
        let parsed = parse_header(source);
        assert!(parsed.fatal.is_none(), "unexpected fatal: {:?}", parsed.fatal);
        match parsed.declarations.into_iter().next() {
            Some(Declaration::Class(c)) => c,
            other => panic!("expected a class, got {:?}", other),
        }
    }

    #[test]
    fn test_class_header_line() {
        let class = only_class(
            "@interface SBIconView : UIView <SBIconViewDelegate, NSCopying>\n@end\n",
        );
        assert_eq!(class.name, "SBIconView");
        assert_eq!(class.superclass.as_deref(), Some("UIView"));
        assert_eq!(
            class.protocols.iter().cloned().collect::<Vec<_>>(),
            vec!["SBIconViewDelegate", "NSCopying"]
        );
    }

    #[test]
    fn test_root_class_without_superclass() {
        let class = only_class("@interface NSProxy <NSObject>\n@end");
        assert_eq!(class.superclass, None);
        assert!(class.protocols.contains("NSObject"));
    }

    #[test]
    fn test_generic_class_parameters_are_not_protocols() {
        let class = only_class(
            "@interface Box<ObjectType> : NSArray<ObjectType> <NSSecureCoding>\n@end",
        );
        assert_eq!(class.superclass.as_deref(), Some("NSArray"));
        assert_eq!(class.protocols.len(), 1);
        assert!(class.protocols.contains("NSSecureCoding"));
    }

    #[test]
    fn test_category_on_generic_class() {
        let parsed = parse_header("@interface NSArray<ObjectType> (Extras)\n- (void)bar;\n@end");
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        assert_eq!(parsed.declarations.len(), 1);
        match &parsed.declarations[0] {
            Declaration::Category(c) => {
                assert_eq!(c.class_name, "NSArray");
                assert_eq!(c.category.as_deref(), Some("Extras"));
                assert!(c.protocols.is_empty());
                assert_eq!(c.members.methods.len(), 1);
            }
            other => panic!("expected category, got {:?}", other),
        }
    }

    #[test]
    fn test_generic_root_class_keeps_protocols() {
        let parsed = parse_header("@interface Box<T> <NSCopying>\n- (id)value;\n@end");
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        let class = only_class("@interface Box<T> <NSCopying>\n- (id)value;\n@end");
        assert_eq!(class.superclass, None);
        assert_eq!(class.protocols.len(), 1);
        assert!(class.protocols.contains("NSCopying"));
        assert_eq!(class.members.methods.len(), 1);
    }

    #[test]
    fn test_ivar_block() {
        let class = only_class(
            "@interface Foo : NSObject\n\
             {\n\
                 NSString *_name;\n\
                 @private\n\
                 struct CGPoint _origin;\n\
                 struct {\n\
                     unsigned int isOn:1;\n\
                 } _flags;\n\
                 unsigned int _dirty:1;\n\
                 char _buffer[16];\n\
                 id <FooDelegate> _delegate;\n\
             }\n\
             @end",
        );
        let ivars: Vec<_> = class
            .ivars
            .iter()
            .map(|i| (i.name.as_str(), i.type_name.as_str()))
            .collect();
        assert_eq!(
            ivars,
            vec![
                ("_name", "NSString *"),
                ("_origin", "struct CGPoint"),
                ("_flags", "struct { unsigned int isOn:1; }"),
                ("_dirty", "unsigned int:1"),
                ("_buffer", "char[16]"),
                ("_delegate", "id <FooDelegate>"),
            ]
        );
    }

    #[test]
    fn test_properties() {
        let class = only_class(
            "@interface Foo : NSObject\n\
             @property(copy, nonatomic) NSString *title; // @synthesize title=_title;\n\
             @property(nonatomic, getter=isOn) BOOL on;\n\
             @property NSDictionary<NSString *, id> *info;\n\
             @property(copy) void (^completion)(BOOL finished);\n\
             @property(readonly) unsigned long long hash;\n\
             @property(nonatomic, weak) id <FooDelegate> delegate API_AVAILABLE(ios(13.0));\n\
             @end",
        );
        let props: Vec<_> = class
            .members
            .properties
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str(), p.attributes.join(",")))
            .collect();
        assert_eq!(
            props,
            vec![
                ("title", "NSString *", "copy,nonatomic".to_string()),
                ("on", "BOOL", "nonatomic,getter=isOn".to_string()),
                ("info", "NSDictionary<NSString *, id> *", String::new()),
                ("completion", "void (^)(BOOL finished)", "copy".to_string()),
                ("hash", "unsigned long long", "readonly".to_string()),
                ("delegate", "id <FooDelegate>", "nonatomic,weak".to_string()),
            ]
        );
    }

    #[test]
    fn test_methods() {
        let class = only_class(
            "@interface Foo : NSObject\n\
             + (id)sharedInstance;\n\
             - (void).cxx_destruct;\n\
             - (id)initWithFrame:(struct CGRect)arg1 style:(long long)arg2;\n\
             - (void)setValue:(id)value\n        forKey:(NSString *)key;\n\
             - (void)performWithCompletion:(void (^)(BOOL))arg1 NS_AVAILABLE_IOS(8_0);\n\
             - (void)log:(NSString *)format, ...;\n\
             - description;\n\
             @end",
        );
        let methods = &class.members.methods;
        let selectors: Vec<_> = methods.iter().map(|m| m.selector()).collect();
        assert_eq!(
            selectors,
            vec![
                "sharedInstance",
                ".cxx_destruct",
                "initWithFrame:style:",
                "setValue:forKey:",
                "performWithCompletion:",
                "log:",
                "description",
            ]
        );
        assert!(methods[0].kind.is_class());
        assert_eq!(methods[2].return_type, "id");
        let params: Vec<_> = methods[2].params().map(|p| p.type_name.as_str()).collect();
        assert_eq!(params, vec!["struct CGRect", "long long"]);
        assert_eq!(methods[2].parts[0].param.as_ref().unwrap().name.as_deref(), Some("arg1"));
        assert_eq!(methods[3].line, 5);
        assert_eq!(
            methods[4].parts[0].param.as_ref().unwrap().type_name,
            "void (^)(BOOL)"
        );
        assert!(methods[5].variadic);
        assert_eq!(methods[6].return_type, "id");
    }

    #[test]
    fn test_unnamed_parameters() {
        let class = only_class("@interface Foo\n- (void)foo:(id) bar:(int);\n- (void)baz:x;\n@end");
        let m = &class.members.methods[0];
        assert_eq!(m.selector(), "foo:bar:");
        assert!(m.params().all(|p| p.name.is_none()));
        assert_eq!(class.members.methods[1].parts[0].param.as_ref().unwrap().type_name, "id");
    }

    #[test]
    fn test_category_and_extension() {
        let parsed = parse_header(
            "@interface Foo (Private) <Bar>\n- (void)secret;\n@end\n\
             @interface Foo ()\n@property int hidden;\n@end\n",
        );
        assert_eq!(parsed.declarations.len(), 2);
        match &parsed.declarations[0] {
            Declaration::Category(c) => {
                assert_eq!(c.class_name, "Foo");
                assert_eq!(c.category.as_deref(), Some("Private"));
                assert!(c.protocols.contains("Bar"));
                assert_eq!(c.members.methods.len(), 1);
            }
            other => panic!("expected category, got {:?}", other),
        }
        match &parsed.declarations[1] {
            Declaration::Category(c) => assert_eq!(c.category, None),
            other => panic!("expected extension, got {:?}", other),
        }
    }

    #[test]
    fn test_protocol_block_and_forward_refs() {
        let parsed = parse_header(
            "@class NSString, UIView;\n\
             @protocol FooDelegate;\n\
             @protocol FooDataSource <NSObject>\n\
             @required\n- (long long)count;\n@optional\n@property(readonly) id model;\n\
             @end",
        );
        assert_eq!(
            parsed.forward_refs,
            vec![
                ForwardRef::Class("NSString".to_string()),
                ForwardRef::Class("UIView".to_string()),
                ForwardRef::Protocol("FooDelegate".to_string()),
            ]
        );
        match &parsed.declarations[0] {
            Declaration::Protocol(p) => {
                assert_eq!(p.name, "FooDataSource");
                assert!(p.protocols.contains("NSObject"));
                assert_eq!(p.members.methods.len(), 1);
                assert_eq!(p.members.properties.len(), 1);
            }
            other => panic!("expected protocol, got {:?}", other),
        }
    }

    #[test]
    fn test_skips_c_declarations_and_macros() {
        let parsed = parse_header(
            "#import \"CDStructures.h\"\n\
             @import UIKit;\n\
             NS_ASSUME_NONNULL_BEGIN\n\
             typedef struct {\n    double x;\n    double y;\n} CDStruct_1;\n\
             extern NSString *const FooDidChangeNotification;\n\
             __attribute__((visibility(\"hidden\")))\n\
             @interface Foo : NSObject\n@end\n\
             NS_ASSUME_NONNULL_END\n",
        );
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        assert_eq!(parsed.declarations.len(), 1);
    }

    #[test]
    fn test_unrecognized_lines_warn_and_continue() {
        let parsed = parse_header(
            "@interface Foo : NSObject\n\
             this is not objc\n\
             - (void)kept;\n\
             @end\n\
             ??? garbage\n",
        );
        assert_eq!(parsed.warnings.len(), 2);
        assert_eq!(parsed.warnings[0].line, 2);
        assert_eq!(parsed.warnings[1].line, 5);
        let class = match &parsed.declarations[0] {
            Declaration::Class(c) => c,
            other => panic!("expected class, got {:?}", other),
        };
        assert_eq!(class.members.methods.len(), 1);
    }

    #[test]
    fn test_missing_semicolon_drops_only_that_member() {
        let class_src = "@interface Foo : NSObject\n\
                         - (void)broken\n\
                         - (void)fine;\n\
                         @property int alsoBroken\n\
                         @end";
        let parsed = parse_header(class_src);
        assert!(parsed.fatal.is_none());
        assert_eq!(parsed.warnings.len(), 2);
        match &parsed.declarations[0] {
            Declaration::Class(c) => {
                assert_eq!(c.members.methods.len(), 1);
                assert_eq!(c.members.methods[0].selector(), "fine");
                assert!(c.members.properties.is_empty());
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_block_is_fatal() {
        let parsed = parse_header(
            "@interface Done : NSObject\n@end\n\
             @interface Broken : NSObject\n- (void)lost;\n",
        );
        assert_eq!(parsed.declarations.len(), 1);
        assert_eq!(
            parsed.fatal,
            Some(ParseFatal::UnterminatedBlock {
                keyword: "interface",
                name: "Broken".to_string(),
                line: 3,
            })
        );
    }

    #[test]
    fn test_next_block_before_end_is_fatal() {
        let parsed = parse_header(
            "@interface A : NSObject\n- (void)a;\n@interface B : NSObject\n@end\n",
        );
        assert!(parsed.declarations.is_empty());
        assert!(matches!(parsed.fatal, Some(ParseFatal::UnterminatedBlock { .. })));
    }

    #[test]
    fn test_unterminated_ivars_is_fatal() {
        let parsed = parse_header("@interface A : NSObject {\n int _x;\n");
        assert!(matches!(parsed.fatal, Some(ParseFatal::UnterminatedIvars { .. })));
    }

    #[test]
    fn test_parse_file_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bad.h");
        std::fs::write(&path, [0x40, 0xff, 0xfe]).unwrap();
        assert!(matches!(parse_file(&path).fatal, Some(ParseFatal::Unreadable(_))));
    }

    #[test]
    fn test_reparse_is_stable() {
        let source = "@interface Foo : NSObject\n- (void)a;\n- (void)a;\n@end";
        assert_eq!(parse_header(source), parse_header(source));
    }
}
