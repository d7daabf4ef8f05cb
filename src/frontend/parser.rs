//! Parser for the Quill programming language.
//!
//! Declarations and statements are parsed by recursive descent; expressions
//! use Pratt-style precedence climbing driven by a per-token binding-power
//! table. Errors are accumulated and never escape [`Parser::parse`]: on a
//! parse error the parser enters panic mode, suppresses further records, and
//! skips to the next synchronizing token (a declaration-introducing keyword
//! or the line break after the failed statement).

use crate::frontend::ast::*;
use crate::frontend::diagnostics::Diagnostic;
use crate::frontend::lexer::Lexer;
use crate::frontend::source::Span;
use crate::frontend::token::{Token, TokenKind};

type ParseResult<T> = Result<T, Diagnostic>;

/// Binding power of postfix forms (`.member`, `(args)`, `[index]`).
const POSTFIX_BP: u8 = 29;
/// Binding power of prefix operators (`-`, `not`, `~`, `await`).
const UNARY_BP: u8 = 27;

/// Left/right binding powers for infix operators, low to high. All operators
/// are left-associative except `**`, whose right power is below its left.
fn infix_bp(kind: TokenKind) -> Option<(u8, u8)> {
    use TokenKind::*;
    Some(match kind {
        Eq | PlusEq | MinusEq | StarEq | SlashEq | PercentEq => (1, 2),
        Or => (3, 4),
        And => (5, 6),
        EqEq | NotEq => (7, 8),
        Lt | LtEq | Gt | GtEq => (9, 10),
        Pipe => (11, 12),
        Caret => (13, 14),
        Amp => (15, 16),
        Shl | Shr => (17, 18),
        DotDot => (19, 20),
        Plus | Minus => (21, 22),
        Star | Slash | Percent | At => (23, 24),
        StarStar => (26, 25),
        _ => return Option::None,
    })
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    use TokenKind::*;
    Some(match kind {
        Plus => BinaryOp::Add,
        Minus => BinaryOp::Sub,
        Star => BinaryOp::Mul,
        Slash => BinaryOp::Div,
        Percent => BinaryOp::Mod,
        StarStar => BinaryOp::Pow,
        EqEq => BinaryOp::Eq,
        NotEq => BinaryOp::NotEq,
        Lt => BinaryOp::Lt,
        LtEq => BinaryOp::LtEq,
        Gt => BinaryOp::Gt,
        GtEq => BinaryOp::GtEq,
        And => BinaryOp::And,
        Or => BinaryOp::Or,
        Amp => BinaryOp::BitAnd,
        Pipe => BinaryOp::BitOr,
        Caret => BinaryOp::BitXor,
        Shl => BinaryOp::Shl,
        Shr => BinaryOp::Shr,
        At => BinaryOp::MatMul,
        _ => return Option::None,
    })
}

fn compound_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::PlusEq => Some(BinaryOp::Add),
        TokenKind::MinusEq => Some(BinaryOp::Sub),
        TokenKind::StarEq => Some(BinaryOp::Mul),
        TokenKind::SlashEq => Some(BinaryOp::Div),
        TokenKind::PercentEq => Some(BinaryOp::Mod),
        _ => None,
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    filename: String,
    errors: Vec<Diagnostic>,
    lex_errors: Vec<Diagnostic>,
    panic_mode: bool,
}

impl Parser {
    /// Construct a parser over the given lexer's token stream. The lexer is
    /// drained up front; its diagnostics stay available via `lex_errors`.
    pub fn new(mut lexer: Lexer<'_>) -> Self {
        let tokens = lexer.tokenize_all();
        let filename = lexer.filename().to_string();
        let lex_errors = lexer.take_errors();
        Self {
            tokens,
            pos: 0,
            filename,
            errors: Vec::new(),
            lex_errors,
            panic_mode: false,
        }
    }

    /// Parse the entire token stream into a program. Always returns a
    /// best-effort tree; accumulated errors are available via `errors`.
    #[tracing::instrument(skip_all, fields(file = %self.filename, tokens = self.tokens.len()))]
    pub fn parse(&mut self) -> Program {
        let mut declarations = Vec::new();
        self.skip_layout();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(Some(decl)) => declarations.push(decl),
                Ok(None) => {} // top-level statement: parsed and discarded
                Err(err) => {
                    self.report(err);
                    self.synchronize();
                }
            }
            self.skip_layout();
        }
        Program { declarations, filename: self.filename.clone() }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// Diagnostics carried over from the lexer that produced the stream.
    pub fn lex_errors(&self) -> &[Diagnostic] {
        &self.lex_errors
    }

    // ========================================================================
    // Token management
    // ========================================================================

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> &Token {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, msg: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_here(format!("{}, got {}", msg, self.peek_kind())))
        }
    }

    fn identifier(&mut self, msg: &str) -> ParseResult<Ident> {
        if self.check(TokenKind::Ident) {
            let name = self.peek().lexeme.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error_here(format!("{}, got {}", msg, self.peek_kind())))
        }
    }

    fn error_here(&self, message: String) -> Diagnostic {
        Diagnostic::new(message, self.peek().location)
    }

    /// Span of the most recently consumed token.
    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span()
    }

    fn skip_newlines(&mut self) {
        while self.match_token(TokenKind::Newline) {}
    }

    /// Between top-level declarations, stray newlines and dedents left over
    /// from error recovery are ignored so they do not cascade.
    fn skip_layout(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Dedent) {
            self.advance();
        }
    }

    fn report(&mut self, err: Diagnostic) {
        if !self.panic_mode {
            self.errors.push(err);
            self.panic_mode = true;
        }
    }

    /// Panic-mode recovery: skip until a declaration-introducing keyword or
    /// past the line break that ends the failed statement.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Fn
                | TokenKind::Struct
                | TokenKind::Class
                | TokenKind::Trait
                | TokenKind::Impl
                | TokenKind::Enum
                | TokenKind::Type
                | TokenKind::Import
                | TokenKind::From
                | TokenKind::Async
                | TokenKind::Pub => break,
                TokenKind::Newline => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        self.panic_mode = false;
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn declaration(&mut self) -> ParseResult<Option<Spanned<Decl>>> {
        let start_span = self.peek().span();
        let is_public = self.match_token(TokenKind::Pub);

        let decl = match self.peek_kind() {
            TokenKind::Fn | TokenKind::Async => {
                Decl::Function(self.function_decl(is_public, true)?)
            }
            TokenKind::Struct => Decl::Struct(self.struct_decl(is_public)?),
            TokenKind::Class => Decl::Class(self.class_decl(is_public)?),
            TokenKind::Trait => Decl::Trait(self.trait_decl(is_public)?),
            TokenKind::Impl => Decl::Impl(self.impl_decl()?),
            TokenKind::Enum => Decl::Enum(self.enum_decl(is_public)?),
            TokenKind::Type => Decl::TypeAlias(self.type_alias_decl(is_public)?),
            TokenKind::Import | TokenKind::From => Decl::Import(self.import_decl()?),
            _ => {
                // The front-end does not support top-level statements; they
                // are parsed for recovery and dropped.
                let _ = self.statement()?;
                return Ok(None);
            }
        };

        let span = start_span.merge(self.prev_span());
        Ok(Some(Spanned::new(decl, span)))
    }

    fn function_decl(&mut self, is_public: bool, require_body: bool) -> ParseResult<FnDecl> {
        let is_async = self.match_token(TokenKind::Async);
        self.expect(TokenKind::Fn, "Expected 'fn'")?;
        let name = self.identifier("Expected function name")?;
        let type_params = self.type_params()?;

        self.expect(TokenKind::LParen, "Expected '(' after function name")?;
        let params = self.fn_params()?;
        self.expect(TokenKind::RParen, "Expected ')' after parameters")?;

        let return_type = if self.match_token(TokenKind::Arrow) {
            Some(self.type_ref()?)
        } else {
            None
        };

        let body = if self.check(TokenKind::Colon) {
            self.advance();
            Some(self.block()?)
        } else if require_body {
            return Err(self.error_here(format!(
                "Expected ':' before function body, got {}",
                self.peek_kind()
            )));
        } else {
            None
        };

        Ok(FnDecl { name, type_params, params, return_type, body, is_async, is_public })
    }

    fn fn_params(&mut self) -> ParseResult<Vec<FnParam>> {
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let is_mutable = self.match_token(TokenKind::Mut);
                let name = self.identifier("Expected parameter name")?;
                self.expect(TokenKind::Colon, "Expected ':' after parameter name")?;
                let ty = self.type_ref()?;
                let default = if self.match_token(TokenKind::Eq) {
                    Some(self.expression()?)
                } else {
                    None
                };
                params.push(FnParam { name, ty, default, is_mutable });
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(params)
    }

    fn type_params(&mut self) -> ParseResult<Vec<Ident>> {
        if !self.match_token(TokenKind::LBracket) {
            return Ok(Vec::new());
        }
        let mut params = vec![self.identifier("Expected type parameter")?];
        while self.match_token(TokenKind::Comma) {
            params.push(self.identifier("Expected type parameter")?);
        }
        self.expect(TokenKind::RBracket, "Expected ']' after type parameters")?;
        Ok(params)
    }

    fn struct_decl(&mut self, is_public: bool) -> ParseResult<StructDecl> {
        self.expect(TokenKind::Struct, "Expected 'struct'")?;
        let name = self.identifier("Expected struct name")?;
        let type_params = self.type_params()?;
        self.expect(TokenKind::Colon, "Expected ':' after struct name")?;
        self.enter_block()?;
        let (fields, methods) = self.fields_and_methods()?;
        self.leave_block();
        Ok(StructDecl { name, type_params, fields, methods, is_public })
    }

    fn class_decl(&mut self, is_public: bool) -> ParseResult<ClassDecl> {
        self.expect(TokenKind::Class, "Expected 'class'")?;
        let name = self.identifier("Expected class name")?;
        let type_params = self.type_params()?;

        let base_class = if self.match_token(TokenKind::LParen) {
            let base = self.identifier("Expected base class name")?;
            self.expect(TokenKind::RParen, "Expected ')' after base class")?;
            Some(base)
        } else {
            None
        };

        self.expect(TokenKind::Colon, "Expected ':' after class header")?;
        self.enter_block()?;
        let (fields, methods) = self.fields_and_methods()?;
        self.leave_block();
        Ok(ClassDecl { name, base_class, type_params, fields, methods, is_public })
    }

    fn trait_decl(&mut self, is_public: bool) -> ParseResult<TraitDecl> {
        self.expect(TokenKind::Trait, "Expected 'trait'")?;
        let name = self.identifier("Expected trait name")?;
        let type_params = self.type_params()?;
        self.expect(TokenKind::Colon, "Expected ':' after trait name")?;
        self.enter_block()?;

        let mut methods = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            let start = self.peek().span();
            let member_public = self.match_token(TokenKind::Pub);
            // Trait methods may be signature-only (no default body).
            let func = self.function_decl(member_public, false)?;
            methods.push(Spanned::new(func, start.merge(self.prev_span())));
            self.skip_newlines();
        }

        self.leave_block();
        Ok(TraitDecl { name, type_params, methods, is_public })
    }

    fn impl_decl(&mut self) -> ParseResult<ImplDecl> {
        self.expect(TokenKind::Impl, "Expected 'impl'")?;
        let first = self.identifier("Expected type name after 'impl'")?;
        let (trait_name, type_name) = if self.match_token(TokenKind::For) {
            let type_name = self.identifier("Expected type name after 'for'")?;
            (Some(first), type_name)
        } else {
            (None, first)
        };

        self.expect(TokenKind::Colon, "Expected ':' after impl header")?;
        self.enter_block()?;

        let mut methods = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            let start = self.peek().span();
            let member_public = self.match_token(TokenKind::Pub);
            let func = self.function_decl(member_public, true)?;
            methods.push(Spanned::new(func, start.merge(self.prev_span())));
            self.skip_newlines();
        }

        self.leave_block();
        Ok(ImplDecl { trait_name, type_name, methods })
    }

    fn enum_decl(&mut self, is_public: bool) -> ParseResult<EnumDecl> {
        self.expect(TokenKind::Enum, "Expected 'enum'")?;
        let name = self.identifier("Expected enum name")?;
        let type_params = self.type_params()?;
        self.expect(TokenKind::Colon, "Expected ':' after enum name")?;
        self.enter_block()?;

        let mut variants = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            let start = self.peek().span();
            let variant_name = self.identifier("Expected variant name")?;
            let fields = if self.match_token(TokenKind::LParen) {
                let mut fields = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        fields.push(self.type_ref()?);
                        if !self.match_token(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "Expected ')' after variant fields")?;
                fields
            } else {
                Vec::new()
            };
            variants.push(Spanned::new(
                EnumVariantDecl { name: variant_name, fields },
                start.merge(self.prev_span()),
            ));
            self.skip_newlines();
        }

        self.leave_block();
        Ok(EnumDecl { name, type_params, variants, is_public })
    }

    fn type_alias_decl(&mut self, is_public: bool) -> ParseResult<TypeAliasDecl> {
        self.expect(TokenKind::Type, "Expected 'type'")?;
        let name = self.identifier("Expected type alias name")?;
        self.expect(TokenKind::Eq, "Expected '=' in type alias")?;
        let aliased = self.type_ref()?;
        Ok(TypeAliasDecl { name, aliased, is_public })
    }

    fn import_decl(&mut self) -> ParseResult<ImportDecl> {
        if self.match_token(TokenKind::Import) {
            let module_path = self.module_path()?;
            let alias = if self.match_token(TokenKind::As) {
                Some(self.identifier("Expected alias name")?)
            } else {
                None
            };
            return Ok(ImportDecl { module_path, alias, symbols: Vec::new(), import_all: false });
        }

        self.expect(TokenKind::From, "Expected 'from'")?;
        let module_path = self.module_path()?;
        self.expect(TokenKind::Import, "Expected 'import' in from-import")?;

        if self.match_token(TokenKind::Star) {
            return Ok(ImportDecl { module_path, alias: None, symbols: Vec::new(), import_all: true });
        }

        let mut symbols = vec![self.identifier("Expected symbol name")?];
        while self.match_token(TokenKind::Comma) {
            symbols.push(self.identifier("Expected symbol name")?);
        }
        Ok(ImportDecl { module_path, alias: None, symbols, import_all: false })
    }

    fn module_path(&mut self) -> ParseResult<String> {
        let mut path = self.identifier("Expected module name")?;
        while self.match_token(TokenKind::Dot) {
            path.push('.');
            path.push_str(&self.identifier("Expected module name")?);
        }
        Ok(path)
    }

    /// Struct/class bodies: a mix of `name: Type` fields and `fn` methods,
    /// either optionally preceded by `pub`.
    fn fields_and_methods(
        &mut self,
    ) -> ParseResult<(Vec<Spanned<FieldDecl>>, Vec<Spanned<FnDecl>>)> {
        let mut fields = Vec::new();
        let mut methods = Vec::new();

        self.skip_newlines();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            let start = self.peek().span();
            let member_public = self.match_token(TokenKind::Pub);
            if matches!(self.peek_kind(), TokenKind::Fn | TokenKind::Async) {
                let func = self.function_decl(member_public, true)?;
                methods.push(Spanned::new(func, start.merge(self.prev_span())));
            } else {
                let name = self.identifier("Expected field name")?;
                self.expect(TokenKind::Colon, "Expected ':' after field name")?;
                let ty = self.type_ref()?;
                let default = if self.match_token(TokenKind::Eq) {
                    Some(self.expression()?)
                } else {
                    None
                };
                fields.push(Spanned::new(
                    FieldDecl { name, ty, default, is_public: member_public },
                    start.merge(self.prev_span()),
                ));
            }
            self.skip_newlines();
        }

        Ok((fields, methods))
    }

    /// Open an indentation block after a header's `:`.
    fn enter_block(&mut self) -> ParseResult<()> {
        self.expect(TokenKind::Newline, "Expected newline after ':'")?;
        self.expect(TokenKind::Indent, "Expected indented block")?;
        Ok(())
    }

    /// Close an indentation block, consuming the dedent if one was emitted.
    fn leave_block(&mut self) {
        if self.check(TokenKind::Dedent) {
            self.advance();
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self) -> ParseResult<Block> {
        self.enter_block()?;
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            statements.push(self.statement()?);
            self.skip_newlines();
        }
        self.leave_block();
        Ok(Block { statements })
    }

    fn statement(&mut self) -> ParseResult<Spanned<Stmt>> {
        let start_span = self.peek().span();

        let stmt = match self.peek_kind() {
            TokenKind::Return => {
                self.advance();
                let value = if matches!(
                    self.peek_kind(),
                    TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof
                ) {
                    None
                } else {
                    Some(self.expression()?)
                };
                Stmt::Return(value)
            }
            TokenKind::If => self.if_statement()?,
            TokenKind::While => self.while_statement()?,
            TokenKind::For => self.for_statement()?,
            TokenKind::Match => self.match_statement()?,
            TokenKind::Break => {
                self.advance();
                Stmt::Break
            }
            TokenKind::Continue => {
                self.advance();
                Stmt::Continue
            }
            TokenKind::Yield => {
                self.advance();
                Stmt::Yield(self.expression()?)
            }
            TokenKind::Let => self.var_decl_statement(false, false)?,
            TokenKind::Var => self.var_decl_statement(true, false)?,
            TokenKind::Const => self.var_decl_statement(false, true)?,
            _ => Stmt::Expr(self.expression()?),
        };

        let span = start_span.merge(self.prev_span());
        Ok(Spanned::new(stmt, span))
    }

    fn var_decl_statement(&mut self, is_mutable: bool, is_const: bool) -> ParseResult<Stmt> {
        self.advance(); // let / var / const
        let name = self.identifier("Expected variable name")?;
        let ty = if self.match_token(TokenKind::Colon) {
            Some(self.type_ref()?)
        } else {
            None
        };
        let initializer = if self.match_token(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Stmt::VarDecl(VarDeclStmt { name, ty, initializer, is_mutable, is_const }))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::If, "Expected 'if'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::Colon, "Expected ':' after if condition")?;
        let then_block = self.block()?;

        let mut elif_blocks = Vec::new();
        while self.match_token(TokenKind::Elif) {
            let elif_cond = self.expression()?;
            self.expect(TokenKind::Colon, "Expected ':' after elif condition")?;
            elif_blocks.push((elif_cond, self.block()?));
        }

        let else_block = if self.match_token(TokenKind::Else) {
            self.expect(TokenKind::Colon, "Expected ':' after 'else'")?;
            Some(self.block()?)
        } else {
            None
        };

        Ok(Stmt::If(IfStmt { condition, then_block, elif_blocks, else_block }))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::While, "Expected 'while'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::Colon, "Expected ':' after while condition")?;
        let body = self.block()?;
        Ok(Stmt::While(WhileStmt { condition, body }))
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::For, "Expected 'for'")?;
        let variable = self.identifier("Expected loop variable")?;
        self.expect(TokenKind::In, "Expected 'in' after loop variable")?;
        let iterable = self.expression()?;
        self.expect(TokenKind::Colon, "Expected ':' after for iterable")?;
        let body = self.block()?;
        Ok(Stmt::For(ForStmt { variable, iterable, body }))
    }

    fn match_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::Match, "Expected 'match'")?;
        let scrutinee = self.expression()?;
        self.expect(TokenKind::Colon, "Expected ':' after match value")?;
        self.enter_block()?;

        let mut arms = Vec::new();
        self.skip_newlines();
        while self.check(TokenKind::Case) {
            self.advance();
            // Patterns are expressions for now. The guard's `if` must stay
            // separate, so the pattern is parsed below the conditional form.
            let pattern = self.expr_bp(0)?;
            let guard = if self.match_token(TokenKind::If) {
                Some(self.expression()?)
            } else {
                None
            };
            self.expect(TokenKind::Colon, "Expected ':' after case pattern")?;
            let body = self.block()?;
            arms.push(MatchArm { pattern, guard, body });
            self.skip_newlines();
        }

        self.leave_block();
        Ok(Stmt::Match(MatchStmt { scrutinee, arms }))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> ParseResult<Spanned<Expr>> {
        let expr = self.expr_bp(0)?;

        // Python-style conditional: `then if cond else other`.
        if self.check(TokenKind::If) {
            self.advance();
            let condition = self.expr_bp(0)?;
            self.expect(TokenKind::Else, "Expected 'else' in conditional expression")?;
            let else_expr = self.expression()?;
            let span = expr.span.merge(else_expr.span);
            return Ok(Spanned::new(
                Expr::Ternary {
                    condition: Box::new(condition),
                    then_expr: Box::new(expr),
                    else_expr: Box::new(else_expr),
                },
                span,
            ));
        }

        Ok(expr)
    }

    /// Pratt precedence climbing: parse everything binding at least `min_bp`.
    fn expr_bp(&mut self, min_bp: u8) -> ParseResult<Spanned<Expr>> {
        let mut lhs = self.unary_expr()?;

        loop {
            if matches!(
                self.peek_kind(),
                TokenKind::Dot | TokenKind::LParen | TokenKind::LBracket
            ) {
                if POSTFIX_BP < min_bp {
                    break;
                }
                lhs = self.postfix_expr(lhs)?;
                continue;
            }

            let Some((l_bp, r_bp)) = infix_bp(self.peek_kind()) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }

            let op_kind = self.peek_kind();
            self.advance();
            let rhs = self.expr_bp(r_bp)?;
            let span = lhs.span.merge(rhs.span);

            lhs = if op_kind == TokenKind::Eq {
                Spanned::new(
                    Expr::Assign { target: Box::new(lhs), value: Box::new(rhs), op: None },
                    span,
                )
            } else if let Some(op) = compound_op(op_kind) {
                Spanned::new(
                    Expr::Assign { target: Box::new(lhs), value: Box::new(rhs), op: Some(op) },
                    span,
                )
            } else if op_kind == TokenKind::DotDot {
                Spanned::new(
                    Expr::Range { start: Box::new(lhs), end: Box::new(rhs), inclusive: false },
                    span,
                )
            } else if let Some(op) = binary_op(op_kind) {
                Spanned::new(
                    Expr::Binary { op, left: Box::new(lhs), right: Box::new(rhs) },
                    span,
                )
            } else {
                return Err(self.error_here(format!("Unexpected operator {}", op_kind)));
            };
        }

        Ok(lhs)
    }

    fn unary_expr(&mut self) -> ParseResult<Spanned<Expr>> {
        let start_span = self.peek().span();
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = self.expr_bp(UNARY_BP)?;
            let span = start_span.merge(operand.span);
            return Ok(Spanned::new(Expr::Unary { op, operand: Box::new(operand) }, span));
        }

        if self.match_token(TokenKind::Await) {
            let operand = self.expr_bp(UNARY_BP)?;
            let span = start_span.merge(operand.span);
            return Ok(Spanned::new(Expr::Await(Box::new(operand)), span));
        }

        self.primary()
    }

    fn postfix_expr(&mut self, lhs: Spanned<Expr>) -> ParseResult<Spanned<Expr>> {
        match self.peek_kind() {
            TokenKind::Dot => {
                self.advance();
                let member = self.identifier("Expected member name")?;
                let span = lhs.span.merge(self.prev_span());
                Ok(Spanned::new(Expr::Member { object: Box::new(lhs), member }, span))
            }
            TokenKind::LParen => {
                self.advance();
                let mut args = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        args.push(self.expression()?);
                        if !self.match_token(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "Expected ')' after arguments")?;
                let span = lhs.span.merge(self.prev_span());
                Ok(Spanned::new(Expr::Call { callee: Box::new(lhs), args }, span))
            }
            TokenKind::LBracket => {
                self.advance();
                self.index_or_slice(lhs)
            }
            _ => Ok(lhs),
        }
    }

    /// After `[`: either a plain index or a slice with optional parts.
    fn index_or_slice(&mut self, object: Spanned<Expr>) -> ParseResult<Spanned<Expr>> {
        if self.check(TokenKind::Colon) {
            return self.finish_slice(object, None);
        }

        let first = self.expression()?;
        if self.check(TokenKind::Colon) {
            return self.finish_slice(object, Some(first));
        }

        self.expect(TokenKind::RBracket, "Expected ']' after index")?;
        let span = object.span.merge(self.prev_span());
        Ok(Spanned::new(
            Expr::Index { object: Box::new(object), index: Box::new(first) },
            span,
        ))
    }

    fn finish_slice(
        &mut self,
        object: Spanned<Expr>,
        start: Option<Spanned<Expr>>,
    ) -> ParseResult<Spanned<Expr>> {
        self.expect(TokenKind::Colon, "Expected ':' in slice")?;

        let end = if !self.check(TokenKind::RBracket) && !self.check(TokenKind::Colon) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        let step = if self.match_token(TokenKind::Colon) {
            if !self.check(TokenKind::RBracket) {
                Some(Box::new(self.expression()?))
            } else {
                None
            }
        } else {
            None
        };

        self.expect(TokenKind::RBracket, "Expected ']' after slice")?;
        let span = object.span.merge(self.prev_span());
        Ok(Spanned::new(
            Expr::Slice { object: Box::new(object), start: start.map(Box::new), end, step },
            span,
        ))
    }

    fn primary(&mut self) -> ParseResult<Spanned<Expr>> {
        let start_span = self.peek().span();

        let expr = match self.peek_kind() {
            TokenKind::Int => {
                let value = self.peek().int_value().unwrap_or_default();
                self.advance();
                Expr::Int(value)
            }
            TokenKind::Float => {
                let value = self.peek().float_value().unwrap_or_default();
                self.advance();
                Expr::Float(value)
            }
            TokenKind::Str => {
                let value = self.peek().string_value().unwrap_or_default().to_string();
                self.advance();
                Expr::Str(value)
            }
            TokenKind::True => {
                self.advance();
                Expr::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                Expr::Bool(false)
            }
            TokenKind::None => {
                self.advance();
                Expr::None
            }
            TokenKind::Ident => {
                let name = self.peek().lexeme.clone();
                self.advance();
                Expr::Ident(name)
            }
            TokenKind::SelfKw => {
                self.advance();
                Expr::Ident("self".to_string())
            }
            TokenKind::LParen => return self.tuple_or_grouped(),
            TokenKind::LBracket => return self.list_or_comprehension(),
            TokenKind::LBrace => return self.dict_literal(),
            TokenKind::Pipe => return self.lambda(),
            other => {
                return Err(self.error_here(format!("Expected expression, got {}", other)));
            }
        };

        let span = start_span.merge(self.prev_span());
        Ok(Spanned::new(expr, span))
    }

    fn tuple_or_grouped(&mut self) -> ParseResult<Spanned<Expr>> {
        let start_span = self.peek().span();
        self.advance(); // (

        if self.match_token(TokenKind::RParen) {
            let span = start_span.merge(self.prev_span());
            return Ok(Spanned::new(Expr::Tuple(Vec::new()), span));
        }

        let first = self.expression()?;

        if self.match_token(TokenKind::Comma) {
            let mut elements = vec![first];
            while !self.check(TokenKind::RParen) {
                elements.push(self.expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "Expected ')' after tuple")?;
            let span = start_span.merge(self.prev_span());
            return Ok(Spanned::new(Expr::Tuple(elements), span));
        }

        self.expect(TokenKind::RParen, "Expected ')' after expression")?;
        // Grouping keeps the inner node; only the span widens.
        let span = start_span.merge(self.prev_span());
        Ok(Spanned::new(first.node, span))
    }

    fn list_or_comprehension(&mut self) -> ParseResult<Spanned<Expr>> {
        let start_span = self.peek().span();
        self.advance(); // [

        if self.match_token(TokenKind::RBracket) {
            let span = start_span.merge(self.prev_span());
            return Ok(Spanned::new(Expr::List(Vec::new()), span));
        }

        let first = self.expression()?;

        if self.match_token(TokenKind::For) {
            let var = self.identifier("Expected comprehension variable")?;
            self.expect(TokenKind::In, "Expected 'in' in comprehension")?;
            // `if` after the iterable is the comprehension guard, so the
            // iterable is parsed below the conditional form.
            let iterable = self.expr_bp(0)?;
            let condition = if self.match_token(TokenKind::If) {
                Some(self.expr_bp(0)?)
            } else {
                None
            };
            self.expect(TokenKind::RBracket, "Expected ']' after comprehension")?;
            let span = start_span.merge(self.prev_span());
            return Ok(Spanned::new(
                Expr::ListComp(Box::new(ListCompExpr { element: first, var, iterable, condition })),
                span,
            ));
        }

        let mut elements = vec![first];
        while self.match_token(TokenKind::Comma) {
            if self.check(TokenKind::RBracket) {
                break;
            }
            elements.push(self.expression()?);
        }
        self.expect(TokenKind::RBracket, "Expected ']' after list")?;
        let span = start_span.merge(self.prev_span());
        Ok(Spanned::new(Expr::List(elements), span))
    }

    fn dict_literal(&mut self) -> ParseResult<Spanned<Expr>> {
        let start_span = self.peek().span();
        self.advance(); // {

        let mut entries = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                let key = self.expression()?;
                self.expect(TokenKind::Colon, "Expected ':' in dict entry")?;
                let value = self.expression()?;
                entries.push((key, value));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RBrace) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "Expected '}' after dict")?;
        let span = start_span.merge(self.prev_span());
        Ok(Spanned::new(Expr::Dict(entries), span))
    }

    fn lambda(&mut self) -> ParseResult<Spanned<Expr>> {
        let start_span = self.peek().span();
        self.advance(); // |

        let mut params = Vec::new();
        if !self.check(TokenKind::Pipe) {
            loop {
                let name = self.identifier("Expected parameter name")?;
                let ty = if self.match_token(TokenKind::Colon) {
                    Some(self.type_ref()?)
                } else {
                    None
                };
                params.push(LambdaParam { name, ty });
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Pipe, "Expected '|' after lambda parameters")?;

        let return_type = if self.match_token(TokenKind::Arrow) {
            Some(self.type_ref()?)
        } else {
            None
        };

        let body = if return_type.is_some() {
            self.expect(TokenKind::LBrace, "Expected '{' before lambda body")?;
            let body = self.expression()?;
            self.expect(TokenKind::RBrace, "Expected '}' after lambda body")?;
            body
        } else if self.match_token(TokenKind::LBrace) {
            let body = self.expression()?;
            self.expect(TokenKind::RBrace, "Expected '}' after lambda body")?;
            body
        } else {
            self.expression()?
        };

        let span = start_span.merge(self.prev_span());
        Ok(Spanned::new(
            Expr::Lambda(LambdaExpr { params, return_type, body: Box::new(body) }),
            span,
        ))
    }

    // ========================================================================
    // Type references
    // ========================================================================

    fn type_ref(&mut self) -> ParseResult<Spanned<TypeRef>> {
        let start_span = self.peek().span();

        let ty = match self.peek_kind() {
            TokenKind::Amp => {
                self.advance();
                let is_mutable = self.match_token(TokenKind::Mut);
                let inner = self.type_ref()?;
                TypeRef::Reference { inner: Box::new(inner), is_mutable }
            }
            TokenKind::LBracket => {
                self.advance();
                let element = self.type_ref()?;
                let size = if self.match_token(TokenKind::Semicolon) {
                    let token = self.expect(TokenKind::Int, "Expected array length")?;
                    token.int_value().and_then(|v| usize::try_from(v).ok())
                } else {
                    None
                };
                self.expect(TokenKind::RBracket, "Expected ']' in array type")?;
                TypeRef::Array { element: Box::new(element), size }
            }
            TokenKind::LParen => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        elements.push(self.type_ref()?);
                        if !self.match_token(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "Expected ')' in tuple type")?;
                TypeRef::Tuple(elements)
            }
            TokenKind::Fn => {
                self.advance();
                self.expect(TokenKind::LParen, "Expected '(' in function type")?;
                let mut params = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        params.push(self.type_ref()?);
                        if !self.match_token(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "Expected ')' in function type")?;
                self.expect(TokenKind::Arrow, "Expected '->' in function type")?;
                let ret = self.type_ref()?;
                TypeRef::Function { params, ret: Box::new(ret) }
            }
            TokenKind::SelfType => {
                self.advance();
                TypeRef::Simple("Self".to_string())
            }
            TokenKind::Ident => {
                let name = self.peek().lexeme.clone();
                self.advance();
                if self.match_token(TokenKind::LBracket) {
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RBracket) {
                        loop {
                            args.push(self.type_ref()?);
                            if !self.match_token(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RBracket, "Expected ']' after type arguments")?;
                    TypeRef::Generic(name, args)
                } else {
                    TypeRef::Simple(name)
                }
            }
            other => {
                return Err(self.error_here(format!("Expected type, got {}", other)));
            }
        };

        let span = start_span.merge(self.prev_span());
        Ok(Spanned::new(ty, span))
    }
}
