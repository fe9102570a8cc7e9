//! Formula parser
//!
//! A recursive descent parser for spreadsheet formulas with proper
//! operator precedence, emitting the RPN token program directly.
//!
//! Reference recognition order: simple cell (bounded by the format's
//! maximum row/column - anything beyond is treated as a name lookup,
//! not a cell), area, whole row/column, sheet-qualified, multi-sheet,
//! external-workbook, structured table reference.

use crate::error::{ParseError, ParseResult};
use crate::token::{
    AreaRef, BinaryOp, CellRef, FormulaKind, ParsedFormula, TableRegion, TableSelector, Token,
    UnaryOp,
};
use reckon_core::{
    CellAddress, CellCoord, CellError, CellRange, NamingEnvironment, Table, MAX_COLS, MAX_ROWS,
};

/// Parse formula text into a token program
///
/// `origin` is the cell the formula lives in; it scopes defined-name
/// lookups and anchors `[#This Row]` structured selectors. A leading
/// `=` is accepted and ignored.
///
/// # Example
/// ```rust
/// use reckon_core::{CellCoord, Workbook};
/// use reckon_formula::parse;
///
/// let wb = Workbook::new();
/// let origin = CellCoord::new(0, 0, 0);
/// let program = parse("=SUM(A1:A10)*2", &wb, origin).unwrap();
/// assert_eq!(program.tokens.len(), 4);
/// ```
pub fn parse(
    text: &str,
    env: &dyn NamingEnvironment,
    origin: CellCoord,
) -> ParseResult<ParsedFormula> {
    let tokens = parse_tokens(text, env, origin)?;
    Ok(ParsedFormula::new(tokens))
}

/// Parse an array formula targeting a `rows` x `cols` output rectangle
pub fn parse_array(
    text: &str,
    env: &dyn NamingEnvironment,
    origin: CellCoord,
    rows: u32,
    cols: u16,
) -> ParseResult<ParsedFormula> {
    let tokens = parse_tokens(text, env, origin)?;
    Ok(ParsedFormula::array(tokens, rows, cols))
}

fn parse_tokens(
    text: &str,
    env: &dyn NamingEnvironment,
    origin: CellCoord,
) -> ParseResult<Vec<Token>> {
    let text = text.trim();
    let text = text.strip_prefix('=').unwrap_or(text);
    if text.is_empty() {
        return Err(ParseError::syntax(0, "empty formula"));
    }

    let mut parser = Parser::new(text, env, origin)?;
    parser.parse_expression(false)?;

    if !matches!(parser.current, Tok::Eof) {
        return Err(ParseError::syntax(
            parser.current_pos,
            format!("unexpected '{}'", &parser.input[parser.current_pos..]),
        ));
    }

    Ok(parser.out)
}

/// Scanner tokens
#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number(f64),
    Str(String),
    Bool(bool),
    Err(CellError),

    /// Function name, defined name, or bare column/row text
    Ident(String),
    /// Looks like a cell address within format limits
    CellText(String),
    /// `Sheet1!` (quoted names already unescaped)
    SheetPrefix(String),
    /// `Sheet1:Sheet3!`
    Sheet3dPrefix(String, String),
    /// `[3]`
    ExternBook(u32),
    /// `Tbl[...]` - the whole bracket group, selector still raw
    StructuredGroup { table: String, inner: String },

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Amp,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Colon,
    Comma,
    Semicolon,
    Bang,
    LParen,
    RParen,
    LBrace,
    RBrace,

    Eof,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    env: &'a dyn NamingEnvironment,
    origin: CellCoord,
    current: Tok,
    current_pos: usize,
    /// Whitespace preceded the current token (the intersection operator)
    space_before: bool,
    out: Vec<Token>,
}

impl<'a> Parser<'a> {
    fn new(
        input: &'a str,
        env: &'a dyn NamingEnvironment,
        origin: CellCoord,
    ) -> ParseResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            env,
            origin,
            current: Tok::Eof,
            current_pos: 0,
            space_before: false,
            out: Vec::new(),
        };
        parser.advance()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance(&mut self) -> ParseResult<()> {
        let before = self.pos;
        self.skip_whitespace();
        self.space_before = self.pos > before;
        self.current_pos = self.pos;
        self.current = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> ParseResult<Tok> {
        if self.is_at_end() {
            return Ok(Tok::Eof);
        }

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Tok::Eof),
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Tok::Plus),
            '-' => Some(Tok::Minus),
            '*' => Some(Tok::Star),
            '/' => Some(Tok::Slash),
            '^' => Some(Tok::Caret),
            '%' => Some(Tok::Percent),
            '&' => Some(Tok::Amp),
            ':' => Some(Tok::Colon),
            ',' => Some(Tok::Comma),
            ';' => Some(Tok::Semicolon),
            '!' => Some(Tok::Bang),
            '(' => Some(Tok::LParen),
            ')' => Some(Tok::RParen),
            '{' => Some(Tok::LBrace),
            '}' => Some(Tok::RBrace),
            _ => None,
        };
        if let Some(tok) = single {
            self.bump();
            return Ok(tok);
        }

        // Two-character comparison operators
        if c == '<' {
            self.bump();
            return Ok(match self.peek_char() {
                Some('=') => {
                    self.bump();
                    Tok::Le
                }
                Some('>') => {
                    self.bump();
                    Tok::Ne
                }
                _ => Tok::Lt,
            });
        }
        if c == '>' {
            self.bump();
            if self.peek_char() == Some('=') {
                self.bump();
                return Ok(Tok::Ge);
            }
            return Ok(Tok::Gt);
        }
        if c == '=' {
            self.bump();
            return Ok(Tok::Eq);
        }

        if c == '"' {
            return Ok(self.scan_string());
        }

        if c == '\'' {
            return self.scan_quoted_sheet();
        }

        if c == '[' {
            return self.scan_extern_book();
        }

        if c == '#' {
            return self.scan_error_literal();
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return Ok(self.scan_number());
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            return self.scan_identifier_or_ref();
        }

        Err(ParseError::syntax(
            self.pos,
            format!("unexpected character '{c}'"),
        ))
    }

    fn scan_string(&mut self) -> Tok {
        self.bump(); // opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if c == '"' {
                // "" is an escaped quote
                if self.peek_char_at(1) == Some('"') {
                    s.push('"');
                    self.bump();
                    self.bump();
                } else {
                    break;
                }
            } else {
                s.push(c);
                self.bump();
            }
        }

        if self.peek_char() == Some('"') {
            self.bump();
        }

        Tok::Str(s)
    }

    /// Quoted sheet name(s): `'My Sheet'!` or `'First:Last'!`
    fn scan_quoted_sheet(&mut self) -> ParseResult<Tok> {
        let start = self.pos;
        self.bump(); // opening apostrophe

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') => {
                    // '' is an escaped apostrophe
                    if self.peek_char_at(1) == Some('\'') {
                        name.push('\'');
                        self.bump();
                        self.bump();
                    } else {
                        self.bump();
                        break;
                    }
                }
                Some(c) => {
                    name.push(c);
                    self.bump();
                }
                None => {
                    return Err(ParseError::syntax(start, "unterminated quoted name"));
                }
            }
        }

        if self.peek_char() != Some('!') {
            return Err(ParseError::syntax(
                start,
                "quoted sheet name must be followed by '!'",
            ));
        }
        self.bump();

        // A colon inside the quotes is a 3-D span; sheet names cannot
        // legally contain one
        if let Some((first, last)) = name.split_once(':') {
            if first.is_empty() || last.is_empty() {
                return Err(ParseError::syntax(start, "malformed sheet range"));
            }
            return Ok(Tok::Sheet3dPrefix(first.to_string(), last.to_string()));
        }
        Ok(Tok::SheetPrefix(name))
    }

    fn scan_extern_book(&mut self) -> ParseResult<Tok> {
        let start = self.pos;
        self.bump(); // '['

        let digits_start = self.pos;
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == digits_start || self.peek_char() != Some(']') {
            return Err(ParseError::syntax(start, "malformed workbook index"));
        }
        let index: u32 = self.input[digits_start..self.pos]
            .parse()
            .map_err(|_| ParseError::syntax(start, "workbook index too large"))?;
        self.bump(); // ']'

        Ok(Tok::ExternBook(index))
    }

    fn scan_error_literal(&mut self) -> ParseResult<Tok> {
        let start = self.pos;
        self.bump(); // '#'
        while self.peek_char().is_some_and(|c| {
            c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?'
        }) {
            self.bump();
        }
        let text = &self.input[start..self.pos];
        match CellError::from_literal(text) {
            Some(err) => Ok(Tok::Err(err)),
            None => Err(ParseError::syntax(start, format!("unknown error literal '{text}'"))),
        }
    }

    fn scan_number(&mut self) -> Tok {
        let start = self.pos;

        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek_char() == Some('.') {
            self.bump();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if self.peek_char().is_some_and(|c| c == 'e' || c == 'E') {
            self.bump();
            if self.peek_char().is_some_and(|c| c == '+' || c == '-') {
                self.bump();
            }
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }

        let num: f64 = self.input[start..self.pos].parse().unwrap_or(0.0);
        Tok::Number(num)
    }

    fn scan_identifier_or_ref(&mut self) -> ParseResult<Tok> {
        let start = self.pos;
        while self.peek_char().is_some_and(|c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
        }) {
            self.bump();
        }
        let text = self.input[start..self.pos].to_string();

        // Sheet prefix
        if self.peek_char() == Some('!') {
            self.bump();
            return Ok(Tok::SheetPrefix(text));
        }

        // Speculative 3-D prefix: `First:Last!`
        if self.peek_char() == Some(':') {
            let saved = self.pos;
            self.bump();
            let second_start = self.pos;
            while self.peek_char().is_some_and(|c| {
                c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
            }) {
                self.bump();
            }
            if self.pos > second_start && self.peek_char() == Some('!') {
                let second = self.input[second_start..self.pos].to_string();
                self.bump();
                return Ok(Tok::Sheet3dPrefix(text, second));
            }
            self.pos = saved;
        }

        // Structured reference: table name directly followed by '['
        if self.peek_char() == Some('[') {
            let inner = self.scan_bracket_group()?;
            return Ok(Tok::StructuredGroup { table: text, inner });
        }

        // TRUE/FALSE are literals unless they are a function call
        let upper = text.to_ascii_uppercase();
        if self.peek_char() != Some('(') {
            if upper == "TRUE" {
                return Ok(Tok::Bool(true));
            }
            if upper == "FALSE" {
                return Ok(Tok::Bool(false));
            }
            // Within format limits this is a cell; beyond them the same
            // text is a candidate name
            if CellAddress::parse(&text).is_ok() {
                return Ok(Tok::CellText(text));
            }
        }

        Ok(Tok::Ident(text))
    }

    /// The balanced `[...]` group of a structured reference, outer
    /// brackets stripped
    fn scan_bracket_group(&mut self) -> ParseResult<String> {
        let start = self.pos;
        self.bump(); // '['
        let inner_start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek_char() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = self.input[inner_start..self.pos].to_string();
                        self.bump();
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            self.bump();
        }
        Err(ParseError::syntax(start, "unbalanced ']' in structured reference"))
    }

    // === Scanner helpers ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect(&mut self, expected: Tok, what: &str) -> ParseResult<()> {
        if self.current == expected {
            self.advance()
        } else {
            Err(ParseError::syntax(self.current_pos, format!("expected {what}")))
        }
    }

    // === Expression parsing ===
    // Precedence, lowest binding to highest:
    //   union (',' inside parens)
    //   comparison =, <>, <, <=, >, >=
    //   concatenation &
    //   additive +, -
    //   multiplicative *, /
    //   exponent ^ (right associative)
    //   unary -, +; postfix %
    //   intersection (whitespace between references)
    //   range :
    //   primary

    fn parse_expression(&mut self, in_parens: bool) -> ParseResult<()> {
        self.parse_comparison()?;
        if in_parens {
            while self.current == Tok::Comma {
                self.advance()?;
                self.parse_comparison()?;
                self.out.push(Token::Binary(BinaryOp::Union));
            }
        }
        Ok(())
    }

    fn parse_comparison(&mut self) -> ParseResult<()> {
        self.parse_concatenation()?;
        loop {
            let op = match self.current {
                Tok::Eq => BinaryOp::Eq,
                Tok::Ne => BinaryOp::Ne,
                Tok::Lt => BinaryOp::Lt,
                Tok::Le => BinaryOp::Le,
                Tok::Gt => BinaryOp::Gt,
                Tok::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance()?;
            self.parse_concatenation()?;
            self.out.push(Token::Binary(op));
        }
        Ok(())
    }

    fn parse_concatenation(&mut self) -> ParseResult<()> {
        self.parse_additive()?;
        while self.current == Tok::Amp {
            self.advance()?;
            self.parse_additive()?;
            self.out.push(Token::Binary(BinaryOp::Concat));
        }
        Ok(())
    }

    fn parse_additive(&mut self) -> ParseResult<()> {
        self.parse_multiplicative()?;
        loop {
            let op = match self.current {
                Tok::Plus => BinaryOp::Add,
                Tok::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            self.parse_multiplicative()?;
            self.out.push(Token::Binary(op));
        }
        Ok(())
    }

    fn parse_multiplicative(&mut self) -> ParseResult<()> {
        self.parse_exponent()?;
        loop {
            let op = match self.current {
                Tok::Star => BinaryOp::Mul,
                Tok::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance()?;
            self.parse_exponent()?;
            self.out.push(Token::Binary(op));
        }
        Ok(())
    }

    fn parse_exponent(&mut self) -> ParseResult<()> {
        self.parse_unary()?;
        if self.current == Tok::Caret {
            self.advance()?;
            self.parse_exponent()?; // right associative
            self.out.push(Token::Binary(BinaryOp::Pow));
        }
        Ok(())
    }

    fn parse_unary(&mut self) -> ParseResult<()> {
        if self.current == Tok::Minus {
            self.advance()?;
            self.parse_unary()?;
            self.out.push(Token::Unary(UnaryOp::Neg));
            return Ok(());
        }
        if self.current == Tok::Plus {
            self.advance()?;
            self.parse_unary()?;
            self.out.push(Token::Unary(UnaryOp::Plus));
            return Ok(());
        }

        self.parse_intersection()?;

        while self.current == Tok::Percent {
            self.advance()?;
            self.out.push(Token::Unary(UnaryOp::Percent));
        }
        Ok(())
    }

    /// Whitespace between two reference operands is the intersection
    /// operator: `A1:B2 B1:C3`
    fn parse_intersection(&mut self) -> ParseResult<()> {
        self.parse_range_level()?;
        while self.space_before && self.starts_reference() {
            self.parse_range_level()?;
            self.out.push(Token::Binary(BinaryOp::Intersect));
        }
        Ok(())
    }

    fn starts_reference(&self) -> bool {
        matches!(
            self.current,
            Tok::CellText(_)
                | Tok::SheetPrefix(_)
                | Tok::Sheet3dPrefix(..)
                | Tok::ExternBook(_)
                | Tok::StructuredGroup { .. }
        )
    }

    fn parse_range_level(&mut self) -> ParseResult<()> {
        self.parse_primary()?;
        while self.current == Tok::Colon {
            self.advance()?;
            let mark = self.out.len();
            self.parse_primary()?;
            self.combine_range(mark)?;
        }
        Ok(())
    }

    /// Fold `left : right` into one area token when both operands are
    /// single cell references; otherwise leave a range operator for
    /// the evaluator
    fn combine_range(&mut self, mark: usize) -> ParseResult<()> {
        let single_sides = mark >= 1
            && self.out.len() == mark + 1
            && matches!(self.out[mark - 1], Token::Ref(_))
            && matches!(self.out[mark], Token::Ref(_));
        if !single_sides {
            self.out.push(Token::Binary(BinaryOp::Range));
            return Ok(());
        }

        let (Some(Token::Ref(right)), Some(Token::Ref(left))) =
            (self.out.pop(), self.out.pop())
        else {
            unreachable!()
        };

        let sheet = match (left.sheet, right.sheet) {
            (Some(a), Some(b)) if a != b => {
                return Err(ParseError::syntax(
                    self.current_pos,
                    "range corners are on different sheets",
                ));
            }
            (a, b) => a.or(b),
        };

        self.out.push(Token::Area(AreaRef {
            sheet,
            range: CellRange::new(left.addr, right.addr),
        }));
        Ok(())
    }

    fn parse_primary(&mut self) -> ParseResult<()> {
        match self.current.clone() {
            Tok::Number(n) => {
                self.advance()?;
                // `1:3` is a whole-row reference, not arithmetic
                if self.current == Tok::Colon && is_row_index(n) {
                    if let Some(tok) = self.try_whole_row(None, n as u32 - 1, false)? {
                        self.out.push(tok);
                        return Ok(());
                    }
                }
                self.out.push(Token::Number(n));
                Ok(())
            }

            Tok::Str(s) => {
                self.advance()?;
                self.out.push(Token::Text(s));
                Ok(())
            }

            Tok::Bool(b) => {
                self.advance()?;
                self.out.push(Token::Bool(b));
                Ok(())
            }

            Tok::Err(e) => {
                self.advance()?;
                self.out.push(Token::Err(e));
                Ok(())
            }

            Tok::LParen => {
                self.advance()?;
                self.parse_expression(true)?;
                self.expect(Tok::RParen, "')'")?;
                self.out.push(Token::Paren);
                Ok(())
            }

            Tok::LBrace => self.parse_array_literal(),

            Tok::CellText(text) => {
                self.advance()?;
                let addr = parse_address(&text, self.current_pos)?;
                self.out.push(Token::Ref(CellRef { sheet: None, addr }));
                Ok(())
            }

            Tok::SheetPrefix(name) => {
                self.advance()?;
                let sheet = self
                    .env
                    .sheet_index_of(&name)
                    .ok_or(ParseError::UnknownSheet(name))?;
                self.parse_ref_after_sheet(sheet)
            }

            Tok::Sheet3dPrefix(first, last) => {
                self.advance()?;
                self.parse_3d_reference(&first, &last)
            }

            Tok::ExternBook(workbook) => {
                self.advance()?;
                self.parse_external(workbook)
            }

            Tok::StructuredGroup { table, inner } => {
                self.advance()?;
                let token = self.resolve_structured(&table, &inner)?;
                self.out.push(token);
                Ok(())
            }

            Tok::Ident(name) => {
                self.advance()?;
                // Function call
                if self.current == Tok::LParen {
                    return self.parse_function_call(name);
                }
                // Whole-column (`A:A`) or absolute whole-row (`$1:$3`)
                if self.current == Tok::Colon {
                    if let Some((col, abs)) = parse_column_text(&name) {
                        let tok = self.finish_whole_columns(None, col, abs)?;
                        self.out.push(tok);
                        return Ok(());
                    }
                    if let Some((row, abs)) = parse_row_text(&name) {
                        if let Some(tok) = self.try_whole_row(None, row, abs)? {
                            self.out.push(tok);
                            return Ok(());
                        }
                    }
                }
                // Defined name
                if self.env.name_refers_to(&name, self.origin.sheet).is_some() {
                    self.out.push(Token::Name(name));
                    return Ok(());
                }
                Err(ParseError::UnknownName(name))
            }

            _ => Err(ParseError::syntax(
                self.current_pos,
                format!("unexpected token {:?}", self.current),
            )),
        }
    }

    /// Reference body following `Sheet!`: a cell, a whole-column span,
    /// or a whole-row span. Plain `Sheet1!A1:B2` areas are folded by
    /// the enclosing range level.
    fn parse_ref_after_sheet(&mut self, sheet: u32) -> ParseResult<()> {
        match self.current.clone() {
            Tok::CellText(text) => {
                self.advance()?;
                let addr = parse_address(&text, self.current_pos)?;
                self.out.push(Token::Ref(CellRef {
                    sheet: Some(sheet),
                    addr,
                }));
                Ok(())
            }
            Tok::Ident(name) => {
                self.advance()?;
                if self.current == Tok::Colon {
                    if let Some((col, abs)) = parse_column_text(&name) {
                        let tok = self.finish_whole_columns(Some(sheet), col, abs)?;
                        self.out.push(tok);
                        return Ok(());
                    }
                    if let Some((row, abs)) = parse_row_text(&name) {
                        if let Some(tok) = self.try_whole_row(Some(sheet), row, abs)? {
                            self.out.push(tok);
                            return Ok(());
                        }
                    }
                }
                Err(ParseError::syntax(
                    self.current_pos,
                    "expected reference after sheet name",
                ))
            }
            Tok::Number(n) => {
                self.advance()?;
                if self.current == Tok::Colon && is_row_index(n) {
                    if let Some(tok) = self.try_whole_row(Some(sheet), n as u32 - 1, false)? {
                        self.out.push(tok);
                        return Ok(());
                    }
                }
                Err(ParseError::syntax(
                    self.current_pos,
                    "expected reference after sheet name",
                ))
            }
            _ => Err(ParseError::syntax(
                self.current_pos,
                "expected reference after sheet name",
            )),
        }
    }

    /// `First:Last!A1` or `First:Last!A1:B2`
    fn parse_3d_reference(&mut self, first: &str, last: &str) -> ParseResult<()> {
        let a = self
            .env
            .sheet_index_of(first)
            .ok_or_else(|| ParseError::UnknownSheet(first.to_string()))?;
        let b = self
            .env
            .sheet_index_of(last)
            .ok_or_else(|| ParseError::UnknownSheet(last.to_string()))?;
        let (first_sheet, last_sheet) = if a <= b { (a, b) } else { (b, a) };

        let Tok::CellText(text) = self.current.clone() else {
            return Err(ParseError::syntax(
                self.current_pos,
                "expected cell after sheet range",
            ));
        };
        self.advance()?;
        let start = parse_address(&text, self.current_pos)?;

        if self.current == Tok::Colon {
            self.advance()?;
            let Tok::CellText(text) = self.current.clone() else {
                return Err(ParseError::syntax(
                    self.current_pos,
                    "expected cell after ':'",
                ));
            };
            self.advance()?;
            let end = parse_address(&text, self.current_pos)?;
            self.out.push(Token::Area3d {
                first_sheet,
                last_sheet,
                range: CellRange::new(start, end),
            });
        } else {
            self.out.push(Token::Ref3d {
                first_sheet,
                last_sheet,
                addr: start,
            });
        }
        Ok(())
    }

    /// `[n]Sheet!A1`, `[n]Sheet!A1:B2`, or `[n]!Name`
    fn parse_external(&mut self, workbook: u32) -> ParseResult<()> {
        match self.current.clone() {
            Tok::Bang => {
                self.advance()?;
                let Tok::Ident(name) = self.current.clone() else {
                    return Err(ParseError::syntax(
                        self.current_pos,
                        "expected name after '[n]!'",
                    ));
                };
                self.advance()?;
                self.out.push(Token::NameX { workbook, name });
                Ok(())
            }
            Tok::SheetPrefix(sheet) => {
                self.advance()?;
                let Tok::CellText(text) = self.current.clone() else {
                    return Err(ParseError::syntax(
                        self.current_pos,
                        "expected cell after external sheet name",
                    ));
                };
                self.advance()?;
                let start = parse_address(&text, self.current_pos)?;

                if self.current == Tok::Colon {
                    self.advance()?;
                    let Tok::CellText(text) = self.current.clone() else {
                        return Err(ParseError::syntax(
                            self.current_pos,
                            "expected cell after ':'",
                        ));
                    };
                    self.advance()?;
                    let end = parse_address(&text, self.current_pos)?;
                    self.out.push(Token::ExternArea {
                        workbook,
                        sheet,
                        range: CellRange::new(start, end),
                    });
                } else {
                    self.out.push(Token::ExternRef {
                        workbook,
                        sheet,
                        addr: start,
                    });
                }
                Ok(())
            }
            _ => Err(ParseError::syntax(
                self.current_pos,
                "expected sheet or '!' after workbook index",
            )),
        }
    }

    /// Consume `:B`-style tail after a leading whole-column letter
    fn finish_whole_columns(
        &mut self,
        sheet: Option<u32>,
        first_col: u16,
        first_abs: bool,
    ) -> ParseResult<Token> {
        self.expect(Tok::Colon, "':'")?;
        let Tok::Ident(name) = self.current.clone() else {
            return Err(ParseError::syntax(
                self.current_pos,
                "expected column letter after ':'",
            ));
        };
        let Some((last_col, last_abs)) = parse_column_text(&name) else {
            return Err(ParseError::syntax(
                self.current_pos,
                "expected column letter after ':'",
            ));
        };
        self.advance()?;

        let range = CellRange::new(
            CellAddress::with_absolute(0, first_col, false, first_abs),
            CellAddress::with_absolute(MAX_ROWS - 1, last_col, false, last_abs),
        );
        Ok(Token::Area(AreaRef { sheet, range }))
    }

    /// Consume `:3`-style tail after a leading whole-row number.
    /// Returns `None` (without consuming) when the right side is not a
    /// row, letting `1:expr` fall through to the range operator.
    fn try_whole_row(
        &mut self,
        sheet: Option<u32>,
        first_row: u32,
        first_abs: bool,
    ) -> ParseResult<Option<Token>> {
        let (last_row, last_abs) = match self.peek_past_colon() {
            Some(pair) => pair,
            None => return Ok(None),
        };
        self.advance()?; // the colon
        self.advance()?; // the row

        let range = CellRange::new(
            CellAddress::with_absolute(first_row, 0, first_abs, false),
            CellAddress::with_absolute(last_row, MAX_COLS - 1, last_abs, false),
        );
        Ok(Some(Token::Area(AreaRef { sheet, range })))
    }

    /// Row token directly after the pending colon, if there is one
    fn peek_past_colon(&mut self) -> Option<(u32, bool)> {
        debug_assert_eq!(self.current, Tok::Colon);
        let saved_pos = self.pos;
        let tok = self.scan_after_whitespace();
        self.pos = saved_pos;
        match tok {
            Some(Tok::Number(n)) if is_row_index(n) => Some((n as u32 - 1, false)),
            Some(Tok::Ident(name)) => parse_row_text(&name),
            _ => None,
        }
    }

    fn scan_after_whitespace(&mut self) -> Option<Tok> {
        self.skip_whitespace();
        self.scan_token().ok()
    }

    fn parse_array_literal(&mut self) -> ParseResult<()> {
        let start_pos = self.current_pos;
        self.expect(Tok::LBrace, "'{'")?;

        let mut values = Vec::new();
        let mut rows: u32 = 0;
        let mut cols: u16 = 0;
        let mut current_cols: u16 = 0;

        loop {
            values.push(self.parse_array_element()?);
            current_cols += 1;

            match self.current {
                Tok::Comma => {
                    self.advance()?;
                }
                Tok::Semicolon => {
                    self.advance()?;
                    rows += 1;
                    if rows == 1 {
                        cols = current_cols;
                    } else if current_cols != cols {
                        return Err(ParseError::syntax(start_pos, "ragged array literal"));
                    }
                    current_cols = 0;
                }
                Tok::RBrace => {
                    rows += 1;
                    if rows == 1 {
                        cols = current_cols;
                    } else if current_cols != cols {
                        return Err(ParseError::syntax(start_pos, "ragged array literal"));
                    }
                    break;
                }
                _ => {
                    return Err(ParseError::syntax(
                        self.current_pos,
                        "expected ',' ';' or '}' in array literal",
                    ));
                }
            }
        }

        self.expect(Tok::RBrace, "'}'")?;
        self.out.push(Token::ArrayLit { rows, cols, values });
        Ok(())
    }

    /// Array literals hold scalar constants only
    fn parse_array_element(&mut self) -> ParseResult<Token> {
        let negative = if self.current == Tok::Minus {
            self.advance()?;
            true
        } else {
            false
        };
        let element = match self.current.clone() {
            Tok::Number(n) => Token::Number(if negative { -n } else { n }),
            Tok::Str(s) if !negative => Token::Text(s),
            Tok::Bool(b) if !negative => Token::Bool(b),
            Tok::Err(e) if !negative => Token::Err(e),
            _ => {
                return Err(ParseError::syntax(
                    self.current_pos,
                    "array literals may only contain constants",
                ));
            }
        };
        self.advance()?;
        Ok(element)
    }

    fn parse_function_call(&mut self, name: String) -> ParseResult<()> {
        self.expect(Tok::LParen, "'('")?;

        let mut args: Vec<Vec<Token>> = Vec::new();
        if self.current != Tok::RParen {
            loop {
                if matches!(self.current, Tok::Comma | Tok::RParen) {
                    args.push(vec![Token::MissingArg]);
                } else {
                    args.push(self.parse_arg_tokens()?);
                }
                if self.current == Tok::Comma {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(Tok::RParen, "')'")?;

        if args.len() > u8::MAX as usize {
            return Err(ParseError::syntax(self.current_pos, "too many arguments"));
        }
        let argc = args.len() as u8;
        let name = name.to_ascii_uppercase();

        if name == "IF" && (argc == 2 || argc == 3) {
            self.emit_short_circuit_if(args);
        } else {
            for arg in args {
                self.out.extend(arg);
            }
            self.out.push(Token::Func { name, argc });
        }
        Ok(())
    }

    /// Parse one argument into its own token run
    fn parse_arg_tokens(&mut self) -> ParseResult<Vec<Token>> {
        let saved = std::mem::take(&mut self.out);
        let result = self.parse_expression(false);
        let arg = std::mem::replace(&mut self.out, saved);
        result?;
        Ok(arg)
    }

    /// Compile IF with skip tokens so the unselected branch is never
    /// evaluated (and its references never dereferenced):
    ///
    /// `[cond] SkipIfFalse(|t|+1) [t] Skip(|f|+2) [f] Skip(1) Func(IF,3)`
    ///
    /// With two arguments the false branch and its skip are absent;
    /// a false condition then lands directly on the Func token, and
    /// the evaluator re-pushes the condition so IF runs with its
    /// declared arity.
    fn emit_short_circuit_if(&mut self, mut args: Vec<Vec<Token>>) {
        let argc = args.len() as u8;
        let false_branch = if args.len() == 3 { args.pop() } else { None };
        let true_branch = args.pop().unwrap_or_default();
        let cond = args.pop().unwrap_or_default();

        self.out.extend(cond);
        self.out
            .push(Token::SkipIfFalse(true_branch.len() as u16 + 1));
        self.out.extend(true_branch);
        match false_branch {
            Some(f) => {
                self.out.push(Token::Skip(f.len() as u16 + 2));
                self.out.extend(f);
                self.out.push(Token::Skip(1));
            }
            None => {
                self.out.push(Token::Skip(1));
            }
        }
        self.out.push(Token::Func {
            name: "IF".to_string(),
            argc,
        });
    }

    /// Structured reference resolution: selector grammar per the table
    /// model, resolved against the table at parse time
    fn resolve_structured(&mut self, table_name: &str, inner: &str) -> ParseResult<Token> {
        let table = self
            .env
            .table(table_name)
            .ok_or_else(|| ParseError::UnknownName(table_name.to_string()))?
            .clone();

        let selector = parse_selector(inner, self.current_pos)?;
        let area = resolve_selector(&table, &selector, self.origin);

        // Unknown columns are a name failure, not a value error
        if let Some((first, last)) = &selector.columns {
            if table.column_index(first).is_none() {
                return Err(ParseError::UnknownName(format!("{table_name}[{first}]")));
            }
            if let Some(last) = last {
                if table.column_index(last).is_none() {
                    return Err(ParseError::UnknownName(format!("{table_name}[{last}]")));
                }
            }
        }

        Ok(Token::Structured {
            table: table.name.clone(),
            selector,
            area,
        })
    }
}

// === Free helpers ===

fn parse_address(text: &str, pos: usize) -> ParseResult<CellAddress> {
    CellAddress::parse(text)
        .map_err(|e| ParseError::syntax(pos, format!("invalid cell reference '{text}': {e}")))
}

/// `A` / `$A` - a bare column designator
fn parse_column_text(text: &str) -> Option<(u16, bool)> {
    let (abs, letters) = match text.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    CellAddress::letters_to_column(letters)
        .ok()
        .map(|col| (col, abs))
}

/// `$3` - an absolute row designator (relative rows scan as numbers)
fn parse_row_text(text: &str) -> Option<(u32, bool)> {
    let rest = text.strip_prefix('$')?;
    let row: u32 = rest.parse().ok()?;
    if row == 0 || row > MAX_ROWS {
        return None;
    }
    Some((row - 1, true))
}

fn is_row_index(n: f64) -> bool {
    n.fract() == 0.0 && n >= 1.0 && n <= MAX_ROWS as f64
}

/// Parse the inner text of a structured-reference bracket group
fn parse_selector(inner: &str, pos: usize) -> ParseResult<TableSelector> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Ok(TableSelector::data());
    }

    // `@` shorthand for [#This Row]
    if let Some(rest) = inner.strip_prefix('@') {
        let rest = rest.trim();
        let columns = if rest.is_empty() {
            None
        } else {
            Some((strip_item_brackets(rest).to_string(), None))
        };
        return Ok(TableSelector {
            region: Some(TableRegion::ThisRow),
            columns,
        });
    }

    let mut region = None;
    let mut columns: Option<(String, Option<String>)> = None;

    for item in split_top_level(inner, ',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(ParseError::syntax(pos, "empty structured selector item"));
        }

        // `[c1]:[c2]` - a column span
        if let Some((first, last)) = split_once_top_level(item, ':') {
            let first = strip_item_brackets(first.trim());
            let last = strip_item_brackets(last.trim());
            if columns.is_some() {
                return Err(ParseError::syntax(pos, "multiple column selectors"));
            }
            columns = Some((first.to_string(), Some(last.to_string())));
            continue;
        }

        let item = strip_item_brackets(item);
        if let Some(keyword) = item.strip_prefix('#') {
            let parsed = match keyword.to_ascii_lowercase().as_str() {
                "all" => TableRegion::All,
                "data" => TableRegion::Data,
                "headers" => TableRegion::Headers,
                "totals" => TableRegion::Totals,
                "this row" => TableRegion::ThisRow,
                _ => {
                    return Err(ParseError::syntax(
                        pos,
                        format!("unknown table region '#{keyword}'"),
                    ));
                }
            };
            if region.is_some() {
                return Err(ParseError::syntax(pos, "multiple region selectors"));
            }
            region = Some(parsed);
        } else {
            if columns.is_some() {
                return Err(ParseError::syntax(pos, "multiple column selectors"));
            }
            columns = Some((item.to_string(), None));
        }
    }

    Ok(TableSelector { region, columns })
}

fn strip_item_brackets(item: &str) -> &str {
    item.strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(item)
        .trim()
}

fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn split_once_top_level(s: &str, sep: char) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                return Some((&s[..i], &s[i + c.len_utf8()..]));
            }
            _ => {}
        }
    }
    None
}

/// Turn a selector into the concrete area it denotes. Failures are
/// value payloads (`#REF!` for a region the table does not have,
/// `#VALUE!` for this-row outside the table), not parse errors.
fn resolve_selector(
    table: &Table,
    selector: &TableSelector,
    origin: CellCoord,
) -> Result<AreaRef, CellError> {
    let (first_row, last_row) = match selector.region.unwrap_or(TableRegion::Data) {
        TableRegion::All => (table.range.start.row, table.range.end.row),
        TableRegion::Data => table.data_span().ok_or(CellError::Ref)?,
        TableRegion::Headers => table.header_span().ok_or(CellError::Ref)?,
        TableRegion::Totals => table.totals_span().ok_or(CellError::Ref)?,
        TableRegion::ThisRow => {
            let (first, last) = table.data_span().ok_or(CellError::Ref)?;
            if origin.sheet != table.sheet || origin.row < first || origin.row > last {
                return Err(CellError::Value);
            }
            (origin.row, origin.row)
        }
    };

    let (first_col, last_col) = match &selector.columns {
        None => (table.range.start.col, table.range.end.col),
        Some((first, last)) => {
            let a = table.column_index(first).ok_or(CellError::Ref)?;
            let b = match last {
                Some(last) => table.column_index(last).ok_or(CellError::Ref)?,
                None => a,
            };
            (table.column_at(a.min(b)), table.column_at(a.max(b)))
        }
    };

    Ok(AreaRef {
        sheet: Some(table.sheet),
        range: CellRange::new(
            CellAddress::new(first_row, first_col),
            CellAddress::new(last_row, last_col),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reckon_core::{NamedRange, Workbook};

    fn env() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        wb.add_worksheet_with_name("Summary").unwrap();
        wb.define_name(NamedRange::workbook_scope("TaxRate", "0.0725"))
            .unwrap();
        wb.add_table(
            Table::new(
                "Sales",
                0,
                CellRange::parse("B2:D6").unwrap(),
                vec!["Region".into(), "Units".into(), "Amount".into()],
            )
            .with_totals_rows(1),
        )
        .unwrap();
        wb
    }

    fn origin() -> CellCoord {
        CellCoord::new(0, 0, 0)
    }

    fn parse_ok(text: &str) -> Vec<Token> {
        parse(text, &env(), origin()).unwrap().tokens
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_ok("=42"), vec![Token::Number(42.0)]);
        assert_eq!(parse_ok("=3.14"), vec![Token::Number(3.14)]);
        assert_eq!(parse_ok("=1e3"), vec![Token::Number(1000.0)]);
        assert_eq!(
            parse_ok("=\"he said \"\"hi\"\"\""),
            vec![Token::Text("he said \"hi\"".into())]
        );
        assert_eq!(parse_ok("=TRUE"), vec![Token::Bool(true)]);
        assert_eq!(parse_ok("=#DIV/0!"), vec![Token::Err(CellError::Div0)]);
    }

    #[test]
    fn test_parse_precedence() {
        // 1+2*3 => 1 2 3 * +
        assert_eq!(
            parse_ok("=1+2*3"),
            vec![
                Token::Number(1.0),
                Token::Number(2.0),
                Token::Number(3.0),
                Token::Binary(BinaryOp::Mul),
                Token::Binary(BinaryOp::Add),
            ]
        );
        // 2^3^2 is right associative: 2 3 2 ^ ^
        assert_eq!(
            parse_ok("=2^3^2"),
            vec![
                Token::Number(2.0),
                Token::Number(3.0),
                Token::Number(2.0),
                Token::Binary(BinaryOp::Pow),
                Token::Binary(BinaryOp::Pow),
            ]
        );
    }

    #[test]
    fn test_parse_parentheses_kept() {
        assert_eq!(
            parse_ok("=(1+2)*3"),
            vec![
                Token::Number(1.0),
                Token::Number(2.0),
                Token::Binary(BinaryOp::Add),
                Token::Paren,
                Token::Number(3.0),
                Token::Binary(BinaryOp::Mul),
            ]
        );
    }

    #[test]
    fn test_parse_unary_and_percent() {
        assert_eq!(
            parse_ok("=-A1"),
            vec![
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(0, 0)
                }),
                Token::Unary(UnaryOp::Neg),
            ]
        );
        assert_eq!(
            parse_ok("=50%"),
            vec![Token::Number(50.0), Token::Unary(UnaryOp::Percent)]
        );
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(
            parse_ok("=$B$2"),
            vec![Token::Ref(CellRef {
                sheet: None,
                addr: CellAddress::absolute(1, 1)
            })]
        );
        assert_eq!(
            parse_ok("=A1:B3"),
            vec![Token::Area(AreaRef {
                sheet: None,
                range: CellRange::parse("A1:B3").unwrap()
            })]
        );
        assert_eq!(
            parse_ok("=Data!C2"),
            vec![Token::Ref(CellRef {
                sheet: Some(1),
                addr: CellAddress::new(1, 2)
            })]
        );
        assert_eq!(
            parse_ok("=Data!A1:B2"),
            vec![Token::Area(AreaRef {
                sheet: Some(1),
                range: CellRange::parse("A1:B2").unwrap()
            })]
        );
    }

    #[test]
    fn test_parse_whole_rows_and_columns() {
        assert_eq!(
            parse_ok("=SUM(A:A)"),
            vec![
                Token::Area(AreaRef {
                    sheet: None,
                    range: CellRange::whole_columns(0, 0)
                }),
                Token::Func {
                    name: "SUM".into(),
                    argc: 1
                },
            ]
        );
        assert_eq!(
            parse_ok("=SUM(2:3)"),
            vec![
                Token::Area(AreaRef {
                    sheet: None,
                    range: CellRange::whole_rows(1, 2)
                }),
                Token::Func {
                    name: "SUM".into(),
                    argc: 1
                },
            ]
        );
        // Absolute whole rows keep working behind a sheet prefix
        assert_eq!(
            parse_ok("=SUM(Data!$1:$3)"),
            vec![
                Token::Area(AreaRef {
                    sheet: Some(1),
                    range: CellRange::new(
                        CellAddress::with_absolute(0, 0, true, false),
                        CellAddress::with_absolute(2, MAX_COLS - 1, true, false),
                    )
                }),
                Token::Func {
                    name: "SUM".into(),
                    argc: 1
                },
            ]
        );
    }

    #[test]
    fn test_parse_3d_reference() {
        assert_eq!(
            parse_ok("=SUM(Sheet1:Data!A1)"),
            vec![
                Token::Ref3d {
                    first_sheet: 0,
                    last_sheet: 1,
                    addr: CellAddress::new(0, 0)
                },
                Token::Func {
                    name: "SUM".into(),
                    argc: 1
                },
            ]
        );
        assert_eq!(
            parse_ok("=SUM(Sheet1:Summary!A1:B2)"),
            vec![
                Token::Area3d {
                    first_sheet: 0,
                    last_sheet: 2,
                    range: CellRange::parse("A1:B2").unwrap()
                },
                Token::Func {
                    name: "SUM".into(),
                    argc: 1
                },
            ]
        );
    }

    #[test]
    fn test_parse_quoted_sheet() {
        let mut wb = env();
        wb.add_worksheet_with_name("O'Brien Data").unwrap();
        let tokens = parse("='O''Brien Data'!A1", &wb, origin()).unwrap().tokens;
        assert_eq!(
            tokens,
            vec![Token::Ref(CellRef {
                sheet: Some(3),
                addr: CellAddress::new(0, 0)
            })]
        );
    }

    #[test]
    fn test_parse_external_references() {
        assert_eq!(
            parse_ok("=[2]Prices!B3"),
            vec![Token::ExternRef {
                workbook: 2,
                sheet: "Prices".into(),
                addr: CellAddress::new(2, 1)
            }]
        );
        assert_eq!(
            parse_ok("=[1]!GlobalName"),
            vec![Token::NameX {
                workbook: 1,
                name: "GlobalName".into()
            }]
        );
    }

    #[test]
    fn test_parse_defined_name() {
        assert_eq!(parse_ok("=TaxRate*2"), vec![
            Token::Name("TaxRate".into()),
            Token::Number(2.0),
            Token::Binary(BinaryOp::Mul),
        ]);
    }

    #[test]
    fn test_unknown_name() {
        let err = parse("=NoSuchThing", &env(), origin()).unwrap_err();
        assert_eq!(err, ParseError::UnknownName("NoSuchThing".into()));
    }

    #[test]
    fn test_huge_cell_text_is_a_name_lookup() {
        // Beyond the row limit this is not a cell, so it falls back to
        // name resolution
        let err = parse("=A1048577", &env(), origin()).unwrap_err();
        assert_eq!(err, ParseError::UnknownName("A1048577".into()));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse("=1+", &env(), origin()),
            Err(ParseError::Syntax { .. })
        ));
        assert!(matches!(
            parse("=(1+2", &env(), origin()),
            Err(ParseError::Syntax { .. })
        ));
        assert!(matches!(
            parse("='Unclosed!A1", &env(), origin()),
            Err(ParseError::Syntax { .. })
        ));
    }

    #[test]
    fn test_function_calls_and_missing_args() {
        assert_eq!(
            parse_ok("=SUM(1,2,3)"),
            vec![
                Token::Number(1.0),
                Token::Number(2.0),
                Token::Number(3.0),
                Token::Func {
                    name: "SUM".into(),
                    argc: 3
                },
            ]
        );
        // LOG10 looks like a cell but the '(' makes it a call
        assert_eq!(
            parse_ok("=LOG10(100)"),
            vec![
                Token::Number(100.0),
                Token::Func {
                    name: "LOG10".into(),
                    argc: 1
                },
            ]
        );
        assert_eq!(
            parse_ok("=COUNTA(A1,,B1)"),
            vec![
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(0, 0)
                }),
                Token::MissingArg,
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(0, 1)
                }),
                Token::Func {
                    name: "COUNTA".into(),
                    argc: 3
                },
            ]
        );
    }

    #[test]
    fn test_if_compiles_with_skip_tokens() {
        // IF(A1,B1,C1) => A1 SIF(2) B1 SK(3) C1 SK(1) IF
        assert_eq!(
            parse_ok("=IF(A1,B1,C1)"),
            vec![
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(0, 0)
                }),
                Token::SkipIfFalse(2),
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(0, 1)
                }),
                Token::Skip(3),
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(0, 2)
                }),
                Token::Skip(1),
                Token::Func {
                    name: "IF".into(),
                    argc: 3
                },
            ]
        );
        // Two-argument form has no false branch
        assert_eq!(
            parse_ok("=IF(A1,B1)"),
            vec![
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(0, 0)
                }),
                Token::SkipIfFalse(2),
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(0, 1)
                }),
                Token::Skip(1),
                Token::Func {
                    name: "IF".into(),
                    argc: 2
                },
            ]
        );
    }

    #[test]
    fn test_parse_union_and_intersection() {
        assert_eq!(
            parse_ok("=(A1,B3)"),
            vec![
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(0, 0)
                }),
                Token::Ref(CellRef {
                    sheet: None,
                    addr: CellAddress::new(2, 1)
                }),
                Token::Binary(BinaryOp::Union),
                Token::Paren,
            ]
        );
        assert_eq!(
            parse_ok("=A1:B2 B2:C3"),
            vec![
                Token::Area(AreaRef {
                    sheet: None,
                    range: CellRange::parse("A1:B2").unwrap()
                }),
                Token::Area(AreaRef {
                    sheet: None,
                    range: CellRange::parse("B2:C3").unwrap()
                }),
                Token::Binary(BinaryOp::Intersect),
            ]
        );
    }

    #[test]
    fn test_parse_array_literal() {
        assert_eq!(
            parse_ok("={1,2;3,-4}"),
            vec![Token::ArrayLit {
                rows: 2,
                cols: 2,
                values: vec![
                    Token::Number(1.0),
                    Token::Number(2.0),
                    Token::Number(3.0),
                    Token::Number(-4.0),
                ],
            }]
        );
        assert!(matches!(
            parse("={1,2;3}", &env(), origin()),
            Err(ParseError::Syntax { .. })
        ));
    }

    #[test]
    fn test_structured_column() {
        let tokens = parse_ok("=SUM(Sales[Amount])");
        assert_eq!(
            tokens[0],
            Token::Structured {
                table: "Sales".into(),
                selector: TableSelector {
                    region: None,
                    columns: Some(("Amount".into(), None)),
                },
                // data rows 3..5 of column D
                area: Ok(AreaRef {
                    sheet: Some(0),
                    range: CellRange::parse("D3:D5").unwrap()
                }),
            }
        );
    }

    #[test]
    fn test_structured_regions() {
        let tokens = parse_ok("=SUM(Sales[[#Totals],[Amount]])");
        assert_eq!(
            tokens[0],
            Token::Structured {
                table: "Sales".into(),
                selector: TableSelector {
                    region: Some(TableRegion::Totals),
                    columns: Some(("Amount".into(), None)),
                },
                area: Ok(AreaRef {
                    sheet: Some(0),
                    range: CellRange::parse("D6:D6").unwrap()
                }),
            }
        );

        let tokens = parse_ok("=SUM(Sales[#All])");
        let Token::Structured { area, .. } = &tokens[0] else {
            panic!("expected structured token");
        };
        assert_eq!(area.unwrap().range, CellRange::parse("B2:D6").unwrap());
    }

    #[test]
    fn test_structured_missing_totals_is_ref_payload() {
        let mut wb = env();
        wb.add_table(
            Table::new(
                "Plain",
                0,
                CellRange::parse("F1:G4").unwrap(),
                vec!["X".into(), "Y".into()],
            ),
        )
        .unwrap();
        let tokens = parse("=Plain[#Totals]", &wb, origin()).unwrap().tokens;
        let Token::Structured { area, .. } = &tokens[0] else {
            panic!("expected structured token");
        };
        assert_eq!(*area, Err(CellError::Ref));
    }

    #[test]
    fn test_structured_this_row() {
        // Origin inside the data rows
        let at = CellCoord::new(0, 3, 5);
        let tokens = parse("=Sales[@Amount]", &env(), at).unwrap().tokens;
        let Token::Structured { area, selector, .. } = &tokens[0] else {
            panic!("expected structured token");
        };
        assert_eq!(selector.region, Some(TableRegion::ThisRow));
        assert_eq!(area.unwrap().range, CellRange::parse("D4:D4").unwrap());

        // Origin outside the data rows degrades to #VALUE!
        let tokens = parse("=Sales[@Amount]", &env(), origin()).unwrap().tokens;
        let Token::Structured { area, .. } = &tokens[0] else {
            panic!("expected structured token");
        };
        assert_eq!(*area, Err(CellError::Value));
    }

    #[test]
    fn test_structured_column_span() {
        let tokens = parse_ok("=SUM(Sales[[Units]:[Amount]])");
        let Token::Structured { area, .. } = &tokens[0] else {
            panic!("expected structured token");
        };
        assert_eq!(area.unwrap().range, CellRange::parse("C3:D5").unwrap());
    }

    #[test]
    fn test_structured_unknown_column() {
        let err = parse("=Sales[Bogus]", &env(), origin()).unwrap_err();
        assert_eq!(err, ParseError::UnknownName("Sales[Bogus]".into()));
    }

    #[test]
    fn test_unknown_sheet() {
        let err = parse("=Nowhere!A1", &env(), origin()).unwrap_err();
        assert_eq!(err, ParseError::UnknownSheet("Nowhere".into()));
    }

    #[test]
    fn test_whitespace_and_newlines_tolerated() {
        assert_eq!(
            parse_ok("= 1 +\n  2"),
            vec![
                Token::Number(1.0),
                Token::Number(2.0),
                Token::Binary(BinaryOp::Add),
            ]
        );
    }
}
