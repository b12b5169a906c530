//! The text driver: parses XTA text and drives any [`Builder`].
//!
//! [`parse_xta`] selects a grammar entry point via [`StartSymbol`] — the
//! whole file, a declaration block, a parameter list, a single expression,
//! or one of the edge-label fragments the XML driver feeds through. The
//! `new_syntax` flag picks which keyword mask is reserved; everything else
//! a variant adds or removes falls out of that gating (old-syntax input
//! simply never produces an `if` or `typedef` token).
//!
//! Errors are reported to the [`ErrorHandler`] and recovery is coarse: the
//! parser skips to the next `;` (or stops at a closing `}`) and carries on,
//! so one broken declaration costs one diagnostic, not the rest of the
//! file.

use tack_base::{ErrorHandler, ErrorKind, ParseError, Result};

use crate::ast::{AssignOp, BinaryOp, Prefix, Synchronisation, UnaryOp};
use crate::builder::Builder;
use crate::lexer::{Lexer, Token};
use crate::token::{Syntax, Tok};

/// Grammar entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartSymbol {
    /// A whole `.xta` file; calls `done` at the end.
    XtaFile,
    /// Global declarations.
    Declaration,
    /// Template-local declarations.
    LocalDeclaration,
    /// A bare parameter list; the parse result is the parameter count.
    ParameterList,
    /// Instantiations only.
    Instantiation,
    /// The system section: instantiations, declarations, the system line.
    SystemLine,
    /// A single expression.
    Expression,
    /// A single expression with the property keywords active.
    PropertyExpression,
    /// A location invariant.
    Invariant,
    /// An edge guard; issues `proc_guard` after the expression.
    Guard,
    /// An edge synchronisation; issues `proc_sync`.
    Sync,
    /// An edge update; issues `proc_update`.
    Assign,
}

/// Parses `source` against `builder`, reporting problems to `handler`.
///
/// Returns `0` on success, `-1` if anything was reported, and the
/// parameter count for [`StartSymbol::ParameterList`].
pub fn parse_xta(
    source: &str,
    builder: &mut dyn Builder,
    handler: &mut dyn ErrorHandler,
    new_syntax: bool,
    start: StartSymbol,
) -> i32 {
    let mut mask = if new_syntax { Syntax::NEW } else { Syntax::OLD };
    if start == StartSymbol::PropertyExpression {
        mask |= Syntax::PROPERTY;
    }
    let mut parser = Parser::new(source, mask, builder, handler);

    let mut param_count = 0usize;
    match start {
        StartSymbol::XtaFile => {
            parser.parse_items(true, true);
            if let Err(e) = parser.builder.done() {
                parser.handler.handle_error(&e.message);
                parser.had_error = true;
            }
        }
        StartSymbol::Declaration | StartSymbol::LocalDeclaration => {
            parser.parse_declaration_block(start == StartSymbol::Declaration);
        }
        StartSymbol::ParameterList => {
            param_count = parser.parse_parameters_standalone();
        }
        StartSymbol::Instantiation => {
            parser.parse_instantiation_block();
        }
        StartSymbol::SystemLine => {
            parser.parse_items(false, true);
        }
        StartSymbol::Expression | StartSymbol::PropertyExpression => {
            parser.parse_fragment(|p| p.parse_comma_expr());
        }
        StartSymbol::Invariant => {
            parser.parse_fragment(|p| p.parse_assign_expr());
        }
        StartSymbol::Guard => {
            parser.parse_fragment(|p| {
                p.parse_comma_expr()?;
                p.builder.proc_guard()
            });
        }
        StartSymbol::Sync => {
            parser.parse_fragment(|p| {
                p.parse_channel_expr()?;
                let direction = match p.current.tok {
                    Tok::Bang => Synchronisation::Bang,
                    Tok::Question => Synchronisation::Que,
                    _ => {
                        return Err(ParseError::new(
                            ErrorKind::SyntaxError,
                            "'!' or '?' expected after the channel",
                        ))
                    }
                };
                p.advance();
                p.builder.proc_sync(direction)
            });
        }
        StartSymbol::Assign => {
            parser.parse_fragment(|p| {
                p.parse_comma_expr()?;
                p.builder.proc_update()
            });
        }
    }

    if parser.had_error {
        -1
    } else if start == StartSymbol::ParameterList {
        param_count as i32
    } else {
        0
    }
}

fn is_builtin_type(name: &str) -> bool {
    matches!(
        name,
        "int" | "bool" | "chan" | "clock" | "void" | "scalar" | "meta"
    )
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peeked: Option<Token>,
    builder: &'a mut dyn Builder,
    handler: &'a mut dyn ErrorHandler,
    had_error: bool,
}

impl<'a> Parser<'a> {
    fn new(
        source: &'a str,
        mask: Syntax,
        builder: &'a mut dyn Builder,
        handler: &'a mut dyn ErrorHandler,
    ) -> Self {
        let mut lexer = Lexer::new(source, mask);
        let mut had_error = false;
        let current = fetch(&mut lexer, handler, &mut had_error);
        Self {
            lexer,
            current,
            peeked: None,
            builder,
            handler,
            had_error,
        }
    }

    fn advance(&mut self) {
        self.current = match self.peeked.take() {
            Some(token) => token,
            None => fetch(&mut self.lexer, self.handler, &mut self.had_error),
        };
    }

    fn peek(&mut self) -> &Tok {
        if self.peeked.is_none() {
            self.peeked = Some(fetch(&mut self.lexer, self.handler, &mut self.had_error));
        }
        &self.peeked.as_ref().expect("just filled").tok
    }

    fn at(&self, tok: Tok) -> bool {
        self.current.tok == tok
    }

    fn at_eof(&self) -> bool {
        self.current.tok == Tok::Eof
    }

    fn eat(&mut self, tok: Tok) -> bool {
        if self.at(tok) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<()> {
        if self.at(tok) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(
                ErrorKind::SyntaxError,
                format!("{} expected", what),
            ))
        }
    }

    fn ident(&mut self) -> Result<String> {
        match &self.current.tok {
            Tok::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::new(
                ErrorKind::SyntaxError,
                "identifier expected",
            )),
        }
    }

    fn report(&mut self, error: &ParseError) {
        self.handler.handle_error(&error.message);
        self.had_error = true;
    }

    /// Skips to the next `;` (consumed) or a closing `}` / end of input
    /// (left in place).
    fn recover(&mut self) {
        loop {
            match self.current.tok {
                Tok::Semicolon => {
                    self.advance();
                    return;
                }
                Tok::RBrace | Tok::Eof => return,
                _ => self.advance(),
            }
        }
    }

    fn note_position(&mut self) {
        let t = &self.current;
        let _ = self
            .builder
            .add_position(t.start, t.offset, t.line, "");
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    fn parse_fragment(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) {
        if let Err(e) = body(self).and_then(|()| {
            if self.at_eof() {
                Ok(())
            } else {
                Err(ParseError::new(
                    ErrorKind::SyntaxError,
                    "unexpected input after the expression",
                ))
            }
        }) {
            self.report(&e);
        }
    }

    /// Top-level item loop shared by the file and system-section entries.
    fn parse_items(&mut self, allow_templates: bool, allow_system: bool) {
        while !self.at_eof() {
            self.note_position();
            let result = self.parse_top_item(allow_templates, allow_system);
            if let Err(e) = result {
                self.report(&e);
                self.recover();
                // A stray closing brace would stall the loop.
                if self.at(Tok::RBrace) {
                    self.advance();
                }
            }
        }
    }

    fn at_instantiation_start(&mut self) -> bool {
        matches!(self.current.tok, Tok::Ident(_))
            && matches!(self.peek(), Tok::Asgn | Tok::AsgnColon)
    }

    fn parse_top_item(&mut self, allow_templates: bool, allow_system: bool) -> Result<()> {
        if self.at_instantiation_start() {
            return self.parse_instantiation();
        }
        match self.current.tok {
            Tok::Process if allow_templates => self.parse_template(),
            Tok::Process => Err(ParseError::new(
                ErrorKind::SyntaxError,
                "template definitions are not allowed here",
            )),
            Tok::System if allow_system => self.parse_system_line(),
            _ => self.parse_declaration(true),
        }
    }

    fn parse_declaration_block(&mut self, global: bool) {
        while !self.at_eof() {
            self.note_position();
            if let Err(e) = self.parse_declaration(global) {
                self.report(&e);
                self.recover();
                if self.at(Tok::RBrace) {
                    self.advance();
                }
            }
        }
    }

    fn parse_instantiation_block(&mut self) {
        while !self.at_eof() {
            self.note_position();
            if let Err(e) = self.parse_instantiation() {
                self.report(&e);
                self.recover();
                if self.at(Tok::RBrace) {
                    self.advance();
                }
            }
        }
    }

    fn parse_parameters_standalone(&mut self) -> usize {
        let mut count = 0;
        if self.at_eof() {
            return 0;
        }
        loop {
            if let Err(e) = self.parse_parameter() {
                self.report(&e);
                self.recover();
                break;
            }
            count += 1;
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        if !self.at_eof() {
            let e = ParseError::new(ErrorKind::SyntaxError, "',' or end of parameters expected");
            self.report(&e);
        }
        count
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn starts_chan_priority(&mut self) -> bool {
        matches!(&self.current.tok, Tok::Ident(n) if n == "chan")
            && matches!(self.peek(), Tok::Ident(n) if n == "priority")
    }

    fn starts_progress(&mut self) -> bool {
        matches!(&self.current.tok, Tok::Ident(n) if n == "progress")
            && matches!(self.peek(), Tok::LBrace)
    }

    fn at_default(&self) -> bool {
        self.at(Tok::Default) || matches!(&self.current.tok, Tok::Ident(n) if n == "default")
    }

    fn parse_declaration(&mut self, global: bool) -> Result<()> {
        if self.at(Tok::Typedef) {
            return self.parse_typedef();
        }
        if global && self.starts_chan_priority() {
            return self.parse_chan_priority();
        }
        if self.starts_progress() {
            return self.parse_progress();
        }

        self.parse_type()?;
        let name = self.ident()?;
        if self.at(Tok::LParen) {
            self.parse_function(&name)
        } else {
            self.parse_variable_declarators(name)
        }
    }

    fn parse_typedef(&mut self) -> Result<()> {
        self.advance();
        self.parse_type()?;
        loop {
            let name = self.ident()?;
            self.parse_dims()?;
            let more = self.at(Tok::Comma);
            if more {
                self.builder.type_duplicate()?;
            }
            self.builder.decl_type_def(&name)?;
            if more {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Tok::Semicolon, "';'")
    }

    fn parse_variable_declarators(&mut self, first: String) -> Result<()> {
        let mut name = first;
        loop {
            self.parse_dims()?;
            let has_init = if self.eat(Tok::Asgn) || self.eat(Tok::AsgnColon) {
                self.parse_initialiser()?;
                true
            } else {
                false
            };
            let more = self.at(Tok::Comma);
            if more {
                self.builder.type_duplicate()?;
            }
            self.builder.decl_var(&name, has_init)?;
            if more {
                self.advance();
                name = self.ident()?;
            } else {
                break;
            }
        }
        self.expect(Tok::Semicolon, "';'")
    }

    fn parse_initialiser(&mut self) -> Result<()> {
        if !self.eat(Tok::LBrace) {
            return self.parse_assign_expr();
        }
        let mut count = 0;
        loop {
            let field = if matches!(&self.current.tok, Tok::Ident(_))
                && matches!(self.peek(), Tok::Colon)
            {
                let name = self.ident()?;
                self.advance(); // :
                Some(name)
            } else {
                None
            };
            self.parse_initialiser()?;
            if let Some(name) = field {
                self.builder.decl_field_init(&name)?;
            }
            count += 1;
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::RBrace, "'}'")?;
        self.builder.decl_initialiser_list(count)
    }

    /// `[expr]` dimensions of a declarator; emits one size per dimension.
    fn parse_dims(&mut self) -> Result<usize> {
        let mut dims = 0;
        while self.eat(Tok::LBracket) {
            self.parse_assign_expr()?;
            self.expect(Tok::RBracket, "']'")?;
            dims += 1;
            self.builder.type_array_of_size(dims)?;
        }
        Ok(dims)
    }

    fn parse_parameter(&mut self) -> Result<()> {
        self.parse_type()?;
        let by_ref = self.eat(Tok::Amp);
        let name = self.ident()?;
        self.parse_dims()?;
        self.builder.decl_parameter(&name, by_ref)
    }

    /// The parenthesised parameter list of a function or template; assumes
    /// the opening `(` is already consumed and eats the closing `)`.
    fn parse_parameter_list(&mut self) -> Result<usize> {
        let mut count = 0;
        if !self.at(Tok::RParen) {
            loop {
                self.parse_parameter()?;
                count += 1;
                if !self.eat(Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(Tok::RParen, "')'")?;
        Ok(count)
    }

    fn parse_function(&mut self, name: &str) -> Result<()> {
        self.advance(); // (
        self.parse_parameter_list()?;
        self.expect(Tok::LBrace, "'{'")?;
        self.builder.decl_func_begin(name)?;
        while !self.at(Tok::RBrace) {
            if self.at_eof() {
                return Err(ParseError::new(
                    ErrorKind::SyntaxError,
                    "unexpected end of file in function body",
                ));
            }
            if let Err(e) = self.parse_block_item() {
                self.report(&e);
                self.recover();
            }
        }
        self.advance(); // }
        self.builder.decl_func_end()
    }

    fn parse_progress(&mut self) -> Result<()> {
        self.advance(); // progress
        self.expect(Tok::LBrace, "'{'")?;
        while !self.at(Tok::RBrace) {
            if self.at_eof() {
                return Err(ParseError::new(
                    ErrorKind::SyntaxError,
                    "unexpected end of file in progress block",
                ));
            }
            let is_default = if self.at_default() {
                self.advance();
                true
            } else {
                false
            };
            self.parse_comma_expr()?;
            self.builder.decl_progress(is_default)?;
            self.expect(Tok::Semicolon, "';'")?;
        }
        self.advance(); // }
        Ok(())
    }

    fn parse_chan_priority(&mut self) -> Result<()> {
        self.advance(); // chan
        self.advance(); // priority
        loop {
            if self.at_default() {
                self.advance();
                self.builder.default_chan_priority()?;
            } else {
                self.parse_channel_expr()?;
                self.builder.chan_priority()?;
            }
            if self.eat(Tok::Comma) {
                continue;
            }
            if self.eat(Tok::Lt) {
                self.builder.inc_chan_priority()?;
                continue;
            }
            break;
        }
        self.expect(Tok::Semicolon, "';'")
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn parse_prefix(&mut self) -> Prefix {
        if self.eat(Tok::Const) {
            return Prefix::Const;
        }
        if self.eat(Tok::Urgent) {
            if self.eat(Tok::Broadcast) {
                return Prefix::UrgentBroadcast;
            }
            return Prefix::Urgent;
        }
        if self.eat(Tok::Broadcast) {
            return Prefix::Broadcast;
        }
        if matches!(&self.current.tok, Tok::Ident(n) if n == "meta")
            && matches!(self.peek(), Tok::Ident(_) | Tok::Struct)
        {
            self.advance();
            return Prefix::Meta;
        }
        Prefix::None
    }

    fn parse_type(&mut self) -> Result<()> {
        let prefix = self.parse_prefix();

        if self.at(Tok::Struct) {
            self.advance();
            self.expect(Tok::LBrace, "'{'")?;
            let mut fields = 0;
            while !self.at(Tok::RBrace) {
                if self.at_eof() {
                    return Err(ParseError::new(
                        ErrorKind::SyntaxError,
                        "unexpected end of file in structure",
                    ));
                }
                self.parse_type()?;
                loop {
                    let name = self.ident()?;
                    self.parse_dims()?;
                    let more = self.at(Tok::Comma);
                    if more {
                        self.builder.type_duplicate()?;
                    }
                    self.builder.struct_field(&name)?;
                    fields += 1;
                    if more {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(Tok::Semicolon, "';'")?;
            }
            self.advance(); // }
            return self.builder.type_struct(prefix, fields);
        }

        let name = match &self.current.tok {
            Tok::Ident(name) => name.clone(),
            _ => {
                return Err(ParseError::new(ErrorKind::SyntaxError, "type expected"));
            }
        };
        self.advance();

        match name.as_str() {
            "int" => {
                if self.eat(Tok::LBracket) {
                    self.parse_assign_expr()?;
                    self.expect(Tok::Comma, "','")?;
                    self.parse_assign_expr()?;
                    self.expect(Tok::RBracket, "']'")?;
                    self.builder.type_bounded_int(prefix)
                } else {
                    self.builder.type_int(prefix)
                }
            }
            "bool" => self.builder.type_bool(prefix),
            "chan" => self.builder.type_channel(prefix),
            "clock" => {
                if prefix != Prefix::None {
                    return Err(ParseError::new(
                        ErrorKind::SyntaxError,
                        "clocks accept no type prefix",
                    ));
                }
                self.builder.type_clock()
            }
            "void" => {
                if prefix != Prefix::None {
                    return Err(ParseError::new(
                        ErrorKind::SyntaxError,
                        "void accepts no type prefix",
                    ));
                }
                self.builder.type_void()
            }
            "scalar" => {
                self.expect(Tok::LBracket, "'['")?;
                self.parse_assign_expr()?;
                self.expect(Tok::RBracket, "']'")?;
                self.builder.type_scalar(prefix)
            }
            _ => self.builder.type_name(prefix, &name),
        }
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    fn parse_template(&mut self) -> Result<()> {
        self.advance(); // process
        let name = self.ident()?;
        if self.eat(Tok::LParen) {
            self.parse_parameter_list()?;
        }
        self.expect(Tok::LBrace, "'{'")?;
        self.builder.proc_begin(&name)?;

        while !self.at(Tok::RBrace) {
            if self.at_eof() {
                return Err(ParseError::new(
                    ErrorKind::SyntaxError,
                    format!("unexpected end of file in template '{}'", name),
                ));
            }
            let result = self.parse_template_item();
            if let Err(e) = result {
                self.report(&e);
                self.recover();
            }
        }
        self.advance(); // }
        self.builder.proc_end()
    }

    fn parse_template_item(&mut self) -> Result<()> {
        match &self.current.tok {
            Tok::State => self.parse_state_section(),
            Tok::Commit => self.parse_flag_section(true),
            // `urgent` opens a location section unless a channel
            // declaration follows.
            Tok::Urgent => {
                let is_decl = matches!(self.peek(), Tok::Broadcast)
                    || matches!(self.peek(), Tok::Ident(n) if n == "chan");
                if is_decl {
                    self.parse_declaration(false)
                } else {
                    self.parse_flag_section(false)
                }
            }
            Tok::Init => {
                self.advance();
                let name = self.ident()?;
                self.expect(Tok::Semicolon, "';'")?;
                self.builder.proc_state_init(&name)
            }
            Tok::Trans => self.parse_trans_section(),
            _ => self.parse_declaration(false),
        }
    }

    fn parse_state_section(&mut self) -> Result<()> {
        self.advance(); // state
        loop {
            let name = self.ident()?;
            if self.eat(Tok::LBrace) {
                self.parse_assign_expr()?;
                self.expect(Tok::RBrace, "'}'")?;
                self.builder.proc_state(&name, true)?;
            } else {
                self.builder.proc_state(&name, false)?;
            }
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::Semicolon, "';'")
    }

    fn parse_flag_section(&mut self, committed: bool) -> Result<()> {
        self.advance(); // commit / urgent
        loop {
            let name = self.ident()?;
            if committed {
                self.builder.proc_state_commit(&name)?;
            } else {
                self.builder.proc_state_urgent(&name)?;
            }
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::Semicolon, "';'")
    }

    fn parse_trans_section(&mut self) -> Result<()> {
        self.advance(); // trans
        loop {
            let from = self.ident()?;
            let controllable = if self.eat(Tok::Arrow) {
                true
            } else if self.eat(Tok::ArrowU) {
                false
            } else {
                return Err(ParseError::new(
                    ErrorKind::SyntaxError,
                    "'->' or '-u->' expected",
                ));
            };
            let to = self.ident()?;
            self.builder.proc_edge_begin(&from, &to, controllable)?;
            self.expect(Tok::LBrace, "'{'")?;
            while !self.at(Tok::RBrace) {
                if self.at_eof() {
                    return Err(ParseError::new(
                        ErrorKind::SyntaxError,
                        "unexpected end of file in edge",
                    ));
                }
                self.parse_edge_label()?;
            }
            self.advance(); // }
            self.builder.proc_edge_end(&from, &to)?;
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::Semicolon, "';'")
    }

    fn parse_edge_label(&mut self) -> Result<()> {
        match &self.current.tok {
            Tok::Guard => {
                self.advance();
                self.parse_comma_expr()?;
                self.builder.proc_guard()?;
                self.expect(Tok::Semicolon, "';'")
            }
            Tok::Sync => {
                self.advance();
                self.parse_channel_expr()?;
                let direction = match self.current.tok {
                    Tok::Bang => Synchronisation::Bang,
                    Tok::Question => Synchronisation::Que,
                    _ => {
                        return Err(ParseError::new(
                            ErrorKind::SyntaxError,
                            "'!' or '?' expected after the channel",
                        ))
                    }
                };
                self.advance();
                self.builder.proc_sync(direction)?;
                self.expect(Tok::Semicolon, "';'")
            }
            Tok::Assign => {
                self.advance();
                self.parse_comma_expr()?;
                self.builder.proc_update()?;
                self.expect(Tok::Semicolon, "';'")
            }
            Tok::Ident(n) if n == "select" => {
                self.advance();
                loop {
                    let id = self.ident()?;
                    self.expect(Tok::Colon, "':'")?;
                    self.parse_type()?;
                    self.builder.proc_select(&id)?;
                    if !self.eat(Tok::Comma) {
                        break;
                    }
                }
                self.expect(Tok::Semicolon, "';'")
            }
            _ => Err(ParseError::new(
                ErrorKind::SyntaxError,
                "edge label (select, guard, sync, assign) expected",
            )),
        }
    }

    // ------------------------------------------------------------------
    // Instantiations and the system line
    // ------------------------------------------------------------------

    fn parse_instantiation(&mut self) -> Result<()> {
        let id = self.ident()?;
        if !self.eat(Tok::Asgn) && !self.eat(Tok::AsgnColon) {
            return Err(ParseError::new(ErrorKind::SyntaxError, "'=' expected"));
        }
        let template = self.ident()?;
        self.builder.instantiation_begin(&id, 0, &template)?;
        self.expect(Tok::LParen, "'('")?;
        let mut args = 0;
        if !self.at(Tok::RParen) {
            loop {
                self.parse_assign_expr()?;
                args += 1;
                if !self.eat(Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(Tok::RParen, "')'")?;
        self.expect(Tok::Semicolon, "';'")?;
        self.builder.instantiation_end(&id, 0, &template, args)
    }

    fn parse_system_line(&mut self) -> Result<()> {
        self.advance(); // system
        loop {
            let name = self.ident()?;
            self.builder.process(&name)?;
            self.builder.proc_priority(&name)?;
            if self.eat(Tok::Comma) {
                continue;
            }
            if self.eat(Tok::Lt) {
                self.builder.inc_proc_priority()?;
                continue;
            }
            break;
        }
        self.expect(Tok::Semicolon, "';'")
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn starts_declaration(&mut self) -> bool {
        match &self.current.tok {
            Tok::Typedef | Tok::Const | Tok::Struct | Tok::Broadcast | Tok::Urgent => true,
            Tok::Ident(name) if is_builtin_type(name) => true,
            Tok::Ident(_) => matches!(self.peek(), Tok::Ident(_)),
            _ => false,
        }
    }

    fn parse_block_item(&mut self) -> Result<()> {
        if self.starts_declaration() {
            self.parse_declaration(false)
        } else {
            self.parse_statement()
        }
    }

    fn parse_statement(&mut self) -> Result<()> {
        match &self.current.tok {
            Tok::LBrace => {
                self.advance();
                self.builder.block_begin()?;
                while !self.at(Tok::RBrace) {
                    if self.at_eof() {
                        return Err(ParseError::new(
                            ErrorKind::SyntaxError,
                            "unexpected end of file in block",
                        ));
                    }
                    self.parse_block_item()?;
                }
                self.advance();
                self.builder.block_end()
            }
            Tok::Semicolon => {
                self.advance();
                self.builder.empty_statement()
            }
            Tok::If => {
                self.advance();
                self.builder.if_begin()?;
                self.expect(Tok::LParen, "'('")?;
                self.parse_comma_expr()?;
                self.expect(Tok::RParen, "')'")?;
                self.parse_statement()?;
                let has_else = self.eat(Tok::Else);
                if has_else {
                    self.builder.if_else()?;
                    self.parse_statement()?;
                }
                self.builder.if_end(has_else)
            }
            Tok::While => {
                self.advance();
                self.builder.while_begin()?;
                self.expect(Tok::LParen, "'('")?;
                self.parse_comma_expr()?;
                self.expect(Tok::RParen, "')'")?;
                self.parse_statement()?;
                self.builder.while_end()
            }
            Tok::Do => {
                self.advance();
                self.builder.do_while_begin()?;
                self.parse_statement()?;
                self.expect(Tok::While, "'while'")?;
                self.expect(Tok::LParen, "'('")?;
                self.parse_comma_expr()?;
                self.expect(Tok::RParen, "')'")?;
                self.expect(Tok::Semicolon, "';'")?;
                self.builder.do_while_end()
            }
            Tok::For => {
                self.advance();
                self.expect(Tok::LParen, "'('")?;
                if matches!(&self.current.tok, Tok::Ident(_))
                    && matches!(self.peek(), Tok::Colon)
                {
                    let name = self.ident()?;
                    self.advance(); // :
                    self.parse_type()?;
                    self.builder.iteration_begin(&name)?;
                    self.expect(Tok::RParen, "')'")?;
                    self.parse_statement()?;
                    self.builder.iteration_end(&name)
                } else {
                    self.builder.for_begin()?;
                    self.parse_comma_expr()?;
                    self.expect(Tok::Semicolon, "';'")?;
                    self.parse_comma_expr()?;
                    self.expect(Tok::Semicolon, "';'")?;
                    self.parse_comma_expr()?;
                    self.expect(Tok::RParen, "')'")?;
                    self.parse_statement()?;
                    self.builder.for_end()
                }
            }
            Tok::Return => {
                self.advance();
                if self.eat(Tok::Semicolon) {
                    self.builder.return_statement(false)
                } else {
                    self.parse_comma_expr()?;
                    self.expect(Tok::Semicolon, "';'")?;
                    self.builder.return_statement(true)
                }
            }
            Tok::Break => {
                self.advance();
                self.expect(Tok::Semicolon, "';'")?;
                self.builder.break_statement()
            }
            Tok::Continue => {
                self.advance();
                self.expect(Tok::Semicolon, "';'")?;
                self.builder.continue_statement()
            }
            _ => {
                self.parse_comma_expr()?;
                self.expect(Tok::Semicolon, "';'")?;
                self.builder.expr_statement()
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_comma_expr(&mut self) -> Result<()> {
        self.parse_assign_expr()?;
        while self.eat(Tok::Comma) {
            self.parse_assign_expr()?;
            self.builder.expr_comma()?;
        }
        Ok(())
    }

    fn assign_op(&self) -> Option<AssignOp> {
        let op = match self.current.tok {
            Tok::Asgn | Tok::AsgnColon => AssignOp::Assign,
            Tok::AsgnPlus => AssignOp::AddAssign,
            Tok::AsgnMinus => AssignOp::SubAssign,
            Tok::AsgnMult => AssignOp::MulAssign,
            Tok::AsgnDiv => AssignOp::DivAssign,
            Tok::AsgnMod => AssignOp::ModAssign,
            Tok::AsgnOr => AssignOp::OrAssign,
            Tok::AsgnAnd => AssignOp::AndAssign,
            Tok::AsgnXor => AssignOp::XorAssign,
            Tok::AsgnShl => AssignOp::ShlAssign,
            Tok::AsgnShr => AssignOp::ShrAssign,
            _ => return None,
        };
        Some(op)
    }

    fn parse_assign_expr(&mut self) -> Result<()> {
        self.parse_conditional()?;
        if let Some(op) = self.assign_op() {
            self.advance();
            self.parse_assign_expr()?;
            self.builder.expr_assignment(op)?;
        }
        Ok(())
    }

    fn parse_conditional(&mut self) -> Result<()> {
        self.parse_imply()?;
        if self.eat(Tok::Question) {
            self.parse_assign_expr()?;
            self.expect(Tok::Colon, "':'")?;
            self.parse_conditional()?;
            self.builder.expr_inline_if()?;
        }
        Ok(())
    }

    /// `a imply b` lowers to `!a || b`.
    fn parse_imply(&mut self) -> Result<()> {
        self.parse_or()?;
        while self.eat(Tok::Imply) {
            self.builder.expr_unary(UnaryOp::Not)?;
            self.parse_or()?;
            self.builder.expr_binary(BinaryOp::Or)?;
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<()> {
        self.parse_and()?;
        while self.eat(Tok::OrOr) || self.eat(Tok::Or) {
            self.parse_and()?;
            self.builder.expr_binary(BinaryOp::Or)?;
        }
        Ok(())
    }

    fn parse_and(&mut self) -> Result<()> {
        self.parse_bit_or()?;
        while self.eat(Tok::AndAnd) || self.eat(Tok::And) {
            self.parse_bit_or()?;
            self.builder.expr_binary(BinaryOp::And)?;
        }
        Ok(())
    }

    fn parse_bit_or(&mut self) -> Result<()> {
        self.parse_bit_xor()?;
        while self.eat(Tok::Pipe) {
            self.parse_bit_xor()?;
            self.builder.expr_binary(BinaryOp::BitOr)?;
        }
        Ok(())
    }

    fn parse_bit_xor(&mut self) -> Result<()> {
        self.parse_bit_and()?;
        while self.eat(Tok::Caret) {
            self.parse_bit_and()?;
            self.builder.expr_binary(BinaryOp::BitXor)?;
        }
        Ok(())
    }

    fn parse_bit_and(&mut self) -> Result<()> {
        self.parse_equality()?;
        while self.eat(Tok::Amp) {
            self.parse_equality()?;
            self.builder.expr_binary(BinaryOp::BitAnd)?;
        }
        Ok(())
    }

    fn parse_equality(&mut self) -> Result<()> {
        self.parse_relational()?;
        loop {
            let op = match self.current.tok {
                Tok::EqEq => BinaryOp::Eq,
                Tok::Ne => BinaryOp::Neq,
                _ => break,
            };
            self.advance();
            self.parse_relational()?;
            self.builder.expr_binary(op)?;
        }
        Ok(())
    }

    fn parse_relational(&mut self) -> Result<()> {
        self.parse_shift()?;
        loop {
            let op = match self.current.tok {
                Tok::Lt => BinaryOp::Lt,
                Tok::Le => BinaryOp::Le,
                Tok::Ge => BinaryOp::Ge,
                Tok::Gt => BinaryOp::Gt,
                _ => break,
            };
            self.advance();
            self.parse_shift()?;
            self.builder.expr_binary(op)?;
        }
        Ok(())
    }

    fn parse_shift(&mut self) -> Result<()> {
        self.parse_min_max()?;
        loop {
            let op = match self.current.tok {
                Tok::Shl => BinaryOp::ShiftLeft,
                Tok::Shr => BinaryOp::ShiftRight,
                _ => break,
            };
            self.advance();
            self.parse_min_max()?;
            self.builder.expr_binary(op)?;
        }
        Ok(())
    }

    fn parse_min_max(&mut self) -> Result<()> {
        self.parse_additive()?;
        loop {
            let op = match self.current.tok {
                Tok::MinOp => BinaryOp::Min,
                Tok::MaxOp => BinaryOp::Max,
                _ => break,
            };
            self.advance();
            self.parse_additive()?;
            self.builder.expr_binary(op)?;
        }
        Ok(())
    }

    fn parse_additive(&mut self) -> Result<()> {
        self.parse_multiplicative()?;
        loop {
            let op = match self.current.tok {
                Tok::Plus => BinaryOp::Plus,
                Tok::Minus => BinaryOp::Minus,
                _ => break,
            };
            self.advance();
            self.parse_multiplicative()?;
            self.builder.expr_binary(op)?;
        }
        Ok(())
    }

    fn parse_multiplicative(&mut self) -> Result<()> {
        self.parse_unary()?;
        loop {
            let op = match self.current.tok {
                Tok::Star => BinaryOp::Mult,
                Tok::Slash => BinaryOp::Div,
                Tok::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            self.parse_unary()?;
            self.builder.expr_binary(op)?;
        }
        Ok(())
    }

    fn parse_unary(&mut self) -> Result<()> {
        match self.current.tok {
            Tok::Minus => {
                self.advance();
                self.parse_unary()?;
                self.builder.expr_unary(UnaryOp::Minus)
            }
            Tok::Plus => {
                self.advance();
                self.parse_unary()?;
                self.builder.expr_unary(UnaryOp::Plus)
            }
            Tok::Bang | Tok::Not => {
                self.advance();
                self.parse_unary()?;
                self.builder.expr_unary(UnaryOp::Not)
            }
            Tok::Inc => {
                self.advance();
                self.parse_unary()?;
                self.builder.expr_pre_increment()
            }
            Tok::Dec => {
                self.advance();
                self.parse_unary()?;
                self.builder.expr_pre_decrement()
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<()> {
        self.parse_primary()?;
        loop {
            match self.current.tok {
                Tok::LParen => {
                    self.builder.expr_call_begin()?;
                    self.advance();
                    let mut args = 0;
                    if !self.at(Tok::RParen) {
                        loop {
                            self.parse_assign_expr()?;
                            args += 1;
                            if !self.eat(Tok::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(Tok::RParen, "')'")?;
                    self.builder.expr_call_end(args)?;
                }
                Tok::LBracket => {
                    self.advance();
                    self.parse_assign_expr()?;
                    self.expect(Tok::RBracket, "']'")?;
                    self.builder.expr_array()?;
                }
                Tok::Dot => {
                    self.advance();
                    let field = self.ident()?;
                    self.builder.expr_dot(&field)?;
                }
                Tok::Inc => {
                    self.advance();
                    self.builder.expr_post_increment()?;
                }
                Tok::Dec => {
                    self.advance();
                    self.builder.expr_post_decrement()?;
                }
                Tok::Apostrophe => {
                    self.advance();
                    self.builder.expr_unary(UnaryOp::Rate)?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn parse_primary(&mut self) -> Result<()> {
        if let Tok::Ident(name) = &self.current.tok {
            let name = name.clone();
            if (name == "forall" || name == "exists") && matches!(self.peek(), Tok::LParen) {
                return self.parse_quantifier(name == "forall");
            }
            self.advance();
            return self.builder.expr_id(&name);
        }
        match self.current.tok {
            Tok::Nat(value) => {
                self.advance();
                self.builder.expr_nat(value)
            }
            Tok::True => {
                self.advance();
                self.builder.expr_true()
            }
            Tok::False => {
                self.advance();
                self.builder.expr_false()
            }
            Tok::Deadlock => {
                self.advance();
                self.builder.expr_deadlock()
            }
            Tok::LParen => {
                self.advance();
                self.parse_comma_expr()?;
                self.expect(Tok::RParen, "')'")
            }
            _ => Err(ParseError::new(
                ErrorKind::SyntaxError,
                "expression expected",
            )),
        }
    }

    fn parse_quantifier(&mut self, forall: bool) -> Result<()> {
        self.advance(); // forall / exists
        self.advance(); // (
        let name = self.ident()?;
        self.expect(Tok::Colon, "':'")?;
        self.parse_type()?;
        if forall {
            self.builder.expr_for_all_begin(&name)?;
        } else {
            self.builder.expr_exists_begin(&name)?;
        }
        self.expect(Tok::RParen, "')'")?;
        self.parse_assign_expr()?;
        if forall {
            self.builder.expr_for_all_end(&name)
        } else {
            self.builder.expr_exists_end(&name)
        }
    }

    /// Channel references: an identifier with optional subscripts and
    /// member accesses. Kept apart from the full expression grammar so a
    /// trailing `?` reads as a receive mark, not an inline-if.
    fn parse_channel_expr(&mut self) -> Result<()> {
        let name = self.ident()?;
        self.builder.expr_id(&name)?;
        loop {
            match self.current.tok {
                Tok::LBracket => {
                    self.advance();
                    self.parse_assign_expr()?;
                    self.expect(Tok::RBracket, "']'")?;
                    self.builder.expr_array()?;
                }
                Tok::Dot => {
                    self.advance();
                    let field = self.ident()?;
                    self.builder.expr_dot(&field)?;
                }
                _ => return Ok(()),
            }
        }
    }
}

fn fetch(lexer: &mut Lexer<'_>, handler: &mut dyn ErrorHandler, had_error: &mut bool) -> Token {
    loop {
        match lexer.next_token() {
            Ok(token) => return token,
            Err(e) => {
                handler.handle_error(&e.message);
                *had_error = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pretty::PrettyPrinter;
    use crate::system::SystemBuilder;
    use tack_base::ErrorLog;

    fn pretty_expr(source: &str) -> String {
        let mut pp = PrettyPrinter::new();
        let mut log = ErrorLog::new();
        let status = parse_xta(source, &mut pp, &mut log, true, StartSymbol::Expression);
        assert_eq!(status, 0, "diagnostics: {:?}", log.diagnostics());
        // Pull the single operand off through an expression statement.
        pp.expr_statement().unwrap();
        pp.finish().trim().trim_end_matches(';').to_string()
    }

    #[test]
    fn precedence_binds_multiplication_tighter() {
        assert_eq!(pretty_expr("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(pretty_expr("(1 + 2) * 3"), "((1 + 2) * 3)");
    }

    #[test]
    fn min_max_operators_parse() {
        assert_eq!(pretty_expr("1 <? 2 + 3"), "(1 <? (2 + 3))");
        assert_eq!(pretty_expr("4 >? 2"), "(4 >? 2)");
    }

    #[test]
    fn inline_if_is_right_associative() {
        assert_eq!(pretty_expr("1 ? 2 : 3 ? 4 : 5"), "1 ? 2 : 3 ? 4 : 5");
    }

    #[test]
    fn assignment_chains_to_the_right() {
        assert_eq!(pretty_expr("1 = 2 = 3"), "(1 = (2 = 3))");
    }

    #[test]
    fn old_assignment_token_is_plain_assignment() {
        let mut pp = PrettyPrinter::new();
        let mut log = ErrorLog::new();
        let status = parse_xta("x := 1", &mut pp, &mut log, false, StartSymbol::Expression);
        assert_eq!(status, 0);
    }

    #[test]
    fn property_words_work_only_in_property_mode() {
        let mut pp = PrettyPrinter::new();
        let mut log = ErrorLog::new();
        let status = parse_xta(
            "not deadlock and true",
            &mut pp,
            &mut log,
            true,
            StartSymbol::PropertyExpression,
        );
        assert_eq!(status, 0, "diagnostics: {:?}", log.diagnostics());

        let mut pp = PrettyPrinter::new();
        let mut log = ErrorLog::new();
        let status = parse_xta(
            "not deadlock",
            &mut pp,
            &mut log,
            true,
            StartSymbol::Expression,
        );
        assert_eq!(status, -1);
    }

    #[test]
    fn imply_lowers_to_negated_disjunction() {
        let mut pp = PrettyPrinter::new();
        let mut log = ErrorLog::new();
        let status = parse_xta(
            "true imply false",
            &mut pp,
            &mut log,
            true,
            StartSymbol::PropertyExpression,
        );
        assert_eq!(status, 0);
        pp.expr_statement().unwrap();
        assert_eq!(pp.finish().trim(), "(!true || false);");
    }

    #[test]
    fn parameter_list_returns_the_count() {
        let mut sb = SystemBuilder::new();
        let mut log = ErrorLog::new();
        let count = parse_xta(
            "int a, bool b, int[0,5] c",
            &mut sb,
            &mut log,
            true,
            StartSymbol::ParameterList,
        );
        assert_eq!(count, 3, "diagnostics: {:?}", log.diagnostics());
    }

    #[test]
    fn empty_parameter_list_is_zero() {
        let mut sb = SystemBuilder::new();
        let mut log = ErrorLog::new();
        let count = parse_xta("", &mut sb, &mut log, true, StartSymbol::ParameterList);
        assert_eq!(count, 0);
    }

    #[test]
    fn sync_fragment_emits_channel_and_direction() {
        use crate::ast::Synchronisation;
        use crate::builder::Builder;

        let mut sb = SystemBuilder::new();
        let mut log = ErrorLog::new();
        parse_xta("chan c;", &mut sb, &mut log, true, StartSymbol::Declaration);
        sb.proc_begin("T").unwrap();
        sb.proc_state("a", false).unwrap();
        sb.proc_state("b", false).unwrap();
        sb.proc_state_init("a").unwrap();
        sb.proc_edge_begin("a", "b", true).unwrap();

        let status = parse_xta("c!", &mut sb, &mut log, true, StartSymbol::Sync);
        assert_eq!(status, 0, "diagnostics: {:?}", log.diagnostics());

        sb.proc_edge_end("a", "b").unwrap();
        sb.proc_end().unwrap();
        sb.done().unwrap();
        let system = sb.into_system();
        let sync = system.template("T").unwrap().edges[0].sync.as_ref().unwrap();
        assert_eq!(sync.direction, Synchronisation::Bang);
    }

    #[test]
    fn declarations_recover_at_semicolons() {
        let mut sb = SystemBuilder::new();
        let mut log = ErrorLog::new();
        let status = parse_xta(
            "int x = ; clock y;",
            &mut sb,
            &mut log,
            true,
            StartSymbol::Declaration,
        );
        assert_eq!(status, -1);
        assert!(log.has_errors());
        // The declaration after the broken one still landed.
        sb.done().unwrap();
        let system = sb.into_system();
        assert!(system.symbols.resolve("y").is_some());
        assert_eq!(system.declarations.variables.len(), 1);
    }

    #[test]
    fn unknown_identifier_in_guard_fragment_fails() {
        let mut sb = SystemBuilder::new();
        let mut log = ErrorLog::new();
        let status = parse_xta("ghost < 5", &mut sb, &mut log, true, StartSymbol::Guard);
        assert_eq!(status, -1);
        assert!(log.diagnostics()[0].message.contains("ghost"));
    }

    #[test]
    fn full_file_parses_into_a_system() {
        let source = r#"
// A tiny network.
int x = 0;
chan c;

process Sender(int id) {
    clock t;
    state idle, busy{t <= 5};
    commit busy;
    init idle;
    trans
        idle -> busy {
            guard x < 3;
            sync c!;
            assign x = x + 1;
        },
        busy -u-> idle {
            assign t = 0;
        };
}

process Receiver() {
    state wait;
    init wait;
    trans
        wait -> wait {
            sync c?;
        };
}

S = Sender(1);
R = Receiver();
system S, R;
"#;
        let mut sb = SystemBuilder::new();
        let mut log = ErrorLog::new();
        let status = parse_xta(source, &mut sb, &mut log, true, StartSymbol::XtaFile);
        assert_eq!(status, 0, "diagnostics: {:?}", log.diagnostics());
        assert!(sb.is_done());

        let system = sb.into_system();
        assert_eq!(system.templates.len(), 2);
        assert_eq!(system.instantiations.len(), 2);
        assert_eq!(system.processes.len(), 2);

        let sender = system.template("Sender").unwrap();
        assert_eq!(sender.parameters.len(), 1);
        assert_eq!(sender.locations.len(), 2);
        assert!(sender.locations[1].committed);
        assert_eq!(sender.init, Some(0));
        assert_eq!(sender.edges.len(), 2);
        assert!(sender.edges[0].controllable);
        assert!(!sender.edges[1].controllable);
        assert!(sender.edges[0].guard.is_some());
        assert!(sender.edges[0].sync.is_some());
        assert!(sender.edges[0].update.is_some());
    }

    #[test]
    fn old_syntax_keywords_stay_identifiers_in_new_mode() {
        // `do` is an identifier under the old syntax, so this declares a
        // variable named do.
        let mut sb = SystemBuilder::new();
        let mut log = ErrorLog::new();
        let status = parse_xta(
            "int do;",
            &mut sb,
            &mut log,
            false,
            StartSymbol::Declaration,
        );
        assert_eq!(status, 0, "diagnostics: {:?}", log.diagnostics());
        sb.done().unwrap();
        assert!(sb.into_system().symbols.resolve("do").is_some());
    }

    #[test]
    fn functions_with_statements_parse() {
        let source = r#"
int count;
void step(int d) {
    int i = 0;
    while (i < d) {
        count = count + 1;
        i++;
    }
    if (count > 100)
        count = 0;
    else
        count = count <? 100;
    for (j : int[0,3])
        count = count + j;
    do
        count--;
    while (count > 10);
    return;
}
"#;
        let mut sb = SystemBuilder::new();
        let mut log = ErrorLog::new();
        let status = parse_xta(source, &mut sb, &mut log, true, StartSymbol::Declaration);
        assert_eq!(status, 0, "diagnostics: {:?}", log.diagnostics());
        sb.done().unwrap();
        let system = sb.into_system();
        assert_eq!(system.declarations.functions.len(), 1);
        let f = &system.declarations.functions[0];
        assert_eq!(f.parameters.len(), 1);
        assert_eq!(f.locals.len(), 1);
    }

    #[test]
    fn chan_priorities_and_progress_parse() {
        let source = r#"
chan a, b;
chan priority a < b, default;
progress { x; }
int x;
"#;
        // `x` is declared after use; the progress measure should fail, the
        // rest should survive.
        let mut sb = SystemBuilder::new();
        let mut log = ErrorLog::new();
        let status = parse_xta(source, &mut sb, &mut log, true, StartSymbol::Declaration);
        assert_eq!(status, -1);
        sb.done().unwrap();
        let system = sb.into_system();
        assert_eq!(system.chan_priorities.len(), 3);
        assert_eq!(system.chan_priorities[0].level, 0);
        assert_eq!(system.chan_priorities[1].level, 1);
        assert_eq!(system.chan_priorities[2].channel, None);
    }
}
