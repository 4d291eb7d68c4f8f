//! Recursive-descent parser producing the syntax tree in [`super::ast`].
//!
//! Structural mistakes a beginner is likely to make (`=` in a condition, a
//! missing colon, `break` outside a loop) are caught here with a specific
//! message instead of a generic "invalid syntax".

use std::collections::HashSet;
use std::sync::Arc;

use super::ast::*;
use super::faults::SyntaxError;
use super::lexer::{tokenize, Keyword, Tok, Token};

/// Deepest expression nesting accepted. Every operator or call in a chain
/// such as `1 + 1 + 1` or `f()()` counts as one more level.
const MAX_NESTING: usize = 100;

/// Deepest block nesting accepted.
const MAX_BLOCK_DEPTH: usize = 100;

const TOO_DEEP: &str = "this expression is nested too deeply or is too long; split it into smaller steps";

/// Python words this language does not have.
const UNSUPPORTED: &[&str] = &[
    "class", "try", "except", "finally", "with", "lambda", "global", "nonlocal", "del",
    "yield", "raise", "assert", "async", "await",
];

pub fn parse(source: &str) -> Result<Block, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    loop_depth: usize,
    fn_depth: usize,
    block_depth: usize,
    nesting: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            loop_depth: 0,
            fn_depth: 0,
            block_depth: 0,
            nesting: 0,
        }
    }

    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens
            .get((self.pos + offset).min(last))
            .map(|t| &t.tok)
            .unwrap_or(&Tok::Eof)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.line())
    }

    fn unexpected(&self) -> SyntaxError {
        match self.peek() {
            Tok::Indent => self.error("this line is indented more than it should be"),
            Tok::Newline | Tok::Eof => self.error("this line ends too early; something is missing"),
            tok => self.error(format!("unexpected {} here", tok)),
        }
    }

    fn check_op(&self, op: &str) -> bool {
        matches!(self.peek(), Tok::Op(o) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.check_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str, message: &str) -> Result<(), SyntaxError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn check_kw(&self, kw: Keyword) -> bool {
        matches!(self.peek(), Tok::Kw(k) if *k == kw)
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.check_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn name(&mut self, message: &str) -> Result<String, SyntaxError> {
        match self.peek().clone() {
            Tok::Name(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), Tok::Newline | Tok::Eof) || self.check_op(";")
    }

    fn program(mut self) -> Result<Block, SyntaxError> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Tok::Eof => break,
                Tok::Newline => {
                    self.advance();
                }
                Tok::Indent => return Err(self.unexpected()),
                _ => body.extend(self.statement()?),
            }
        }
        Ok(body)
    }

    fn statement(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        match self.peek() {
            Tok::Kw(Keyword::If) => Ok(vec![self.if_statement()?]),
            Tok::Kw(Keyword::While) => Ok(vec![self.while_statement()?]),
            Tok::Kw(Keyword::For) => Ok(vec![self.for_statement()?]),
            Tok::Kw(Keyword::Def) => Ok(vec![self.def_statement()?]),
            Tok::Kw(kw @ (Keyword::Elif | Keyword::Else)) => Err(self.error(format!(
                "'{}' needs a matching 'if' directly above it",
                kw.as_str()
            ))),
            _ => self.simple_line(),
        }
    }

    /// One or more `;`-separated simple statements ending the line.
    fn simple_line(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut stmts = vec![self.simple_statement()?];
        while self.eat_op(";") {
            if matches!(self.peek(), Tok::Newline | Tok::Eof) {
                break;
            }
            stmts.push(self.simple_statement()?);
        }
        match self.peek() {
            Tok::Newline => {
                self.advance();
                Ok(stmts)
            }
            Tok::Eof => Ok(stmts),
            Tok::Str(_) if is_bare_print(&stmts) => {
                Err(self.error("print needs parentheses, like print(\"hello\")"))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn simple_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        let kind = match self.peek().clone() {
            Tok::Kw(Keyword::Pass) => {
                self.advance();
                StmtKind::Pass
            }
            Tok::Kw(Keyword::Break) => {
                if self.loop_depth == 0 {
                    return Err(self.error("'break' can only be used inside a loop"));
                }
                self.advance();
                StmtKind::Break
            }
            Tok::Kw(Keyword::Continue) => {
                if self.loop_depth == 0 {
                    return Err(self.error("'continue' can only be used inside a loop"));
                }
                self.advance();
                StmtKind::Continue
            }
            Tok::Kw(Keyword::Return) => {
                if self.fn_depth == 0 {
                    return Err(self.error("'return' can only be used inside a function"));
                }
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.expression()?))
                }
            }
            Tok::Kw(Keyword::Import) | Tok::Kw(Keyword::From) => self.import_statement(),
            Tok::Name(word) if UNSUPPORTED.contains(&word.as_str()) => {
                return Err(self.error(format!("'{}' is not part of this language", word)));
            }
            _ => self.expression_statement()?,
        };
        Ok(Stmt { kind, line })
    }

    fn import_statement(&mut self) -> StmtKind {
        self.advance();
        let mut module = None;
        while !self.at_statement_end() {
            if let Tok::Name(name) = self.advance() {
                module.get_or_insert(name);
            }
        }
        StmtKind::Import(module.unwrap_or_default())
    }

    fn expression_statement(&mut self) -> Result<StmtKind, SyntaxError> {
        let expr = self.expression()?;

        if self.eat_op("=") {
            let target = self.target(expr)?;
            let value = self.expression()?;
            if self.check_op("=") {
                return Err(self.error("set one name at a time, e.g. a = 1 then b = 1"));
            }
            return Ok(StmtKind::Assign { target, value });
        }

        let op = match self.peek() {
            Tok::Op("+=") => Some(BinOp::Add),
            Tok::Op("-=") => Some(BinOp::Sub),
            Tok::Op("*=") => Some(BinOp::Mul),
            Tok::Op("/=") => Some(BinOp::Div),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let target = self.target(expr)?;
            let value = self.expression()?;
            return Ok(StmtKind::AugAssign { target, op, value });
        }

        Ok(StmtKind::Expr(expr))
    }

    fn target(&self, expr: Expr) -> Result<Target, SyntaxError> {
        let line = expr.line;
        match expr.kind {
            ExprKind::Name(name) => Ok(Target::Name(name)),
            ExprKind::Index { object, index } => Ok(Target::Index {
                object: *object,
                index: *index,
            }),
            ExprKind::Attribute { name, .. } => Err(SyntaxError::new(
                format!("'.{}' can't be changed with '='", name),
                line,
            )),
            ExprKind::Call { .. } => Err(SyntaxError::new(
                "can't assign to a function call; the left side of '=' must be a name",
                line,
            )),
            _ => Err(SyntaxError::new(
                "the left side of '=' must be a name",
                line,
            )),
        }
    }

    fn colon(&mut self, header: &str) -> Result<(), SyntaxError> {
        if self.eat_op(":") {
            return Ok(());
        }
        if self.check_op("=") {
            return Err(self.error("use '==' to compare two values; '=' sets a variable"));
        }
        Err(self.error(format!("expected ':' at the end of the '{}' line", header)))
    }

    fn block(&mut self, header: &str, header_line: usize) -> Result<Block, SyntaxError> {
        if self.block_depth >= MAX_BLOCK_DEPTH {
            return Err(self.error("blocks are nested too deeply; move some of the code into a function"));
        }
        self.block_depth += 1;
        let body = self.block_body(header, header_line);
        self.block_depth -= 1;
        body
    }

    fn block_body(&mut self, header: &str, header_line: usize) -> Result<Block, SyntaxError> {
        if !matches!(self.peek(), Tok::Newline) {
            return self.simple_line();
        }
        self.advance();
        if !matches!(self.peek(), Tok::Indent) {
            return Err(self.error(format!(
                "expected an indented block after '{}' on line {}",
                header, header_line
            )));
        }
        self.advance();

        let mut body = Vec::new();
        loop {
            match self.peek() {
                Tok::Dedent => {
                    self.advance();
                    break;
                }
                Tok::Eof => break,
                Tok::Newline => {
                    self.advance();
                }
                Tok::Indent => return Err(self.unexpected()),
                _ => body.extend(self.statement()?),
            }
        }
        Ok(body)
    }

    fn loop_body(&mut self, header: &str, header_line: usize) -> Result<Block, SyntaxError> {
        self.loop_depth += 1;
        let body = self.block(header, header_line);
        self.loop_depth -= 1;
        body
    }

    fn if_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        self.advance();
        let cond = self.expression()?;
        self.colon("if")?;
        let body = self.block("if", line)?;
        let mut branches = vec![(cond, body)];

        loop {
            let elif_line = self.line();
            if !self.eat_kw(Keyword::Elif) {
                break;
            }
            let cond = self.expression()?;
            self.colon("elif")?;
            branches.push((cond, self.block("elif", elif_line)?));
        }

        let else_line = self.line();
        let orelse = if self.eat_kw(Keyword::Else) {
            self.colon("else")?;
            Some(self.block("else", else_line)?)
        } else {
            None
        };

        Ok(Stmt {
            kind: StmtKind::If { branches, orelse },
            line,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        self.advance();
        let cond = self.expression()?;
        self.colon("while")?;
        let body = self.loop_body("while", line)?;
        Ok(Stmt {
            kind: StmtKind::While { cond, body },
            line,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        self.advance();
        let mut vars = vec![self.name("expected a variable name after 'for'")?];
        while self.eat_op(",") {
            let var = self.name("expected a variable name after ','")?;
            if vars.contains(&var) {
                return Err(self.error(format!("'{}' is used twice in this loop", var)));
            }
            vars.push(var);
        }
        if !self.eat_kw(Keyword::In) {
            return Err(self.error("expected 'in' after the loop variable"));
        }
        let iter = self.expression()?;
        self.colon("for")?;
        let body = self.loop_body("for", line)?;
        Ok(Stmt {
            kind: StmtKind::For { vars, iter, body },
            line,
        })
    }

    fn def_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        self.advance();
        let name = self.name("expected a function name after 'def'")?;
        self.expect_op("(", "expected '(' after the function name")?;

        let mut params: Vec<Param> = Vec::new();
        let mut seen = HashSet::new();
        while !self.eat_op(")") {
            let param = self.name("expected a parameter name")?;
            if !seen.insert(param.clone()) {
                return Err(self.error(format!("parameter '{}' is listed twice", param)));
            }
            let default = if self.eat_op("=") {
                Some(self.expression()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(self.error(
                        "parameters without a default must come before those with one",
                    ));
                }
                None
            };
            params.push(Param {
                name: param,
                default,
            });
            if !self.eat_op(",") {
                self.expect_op(")", "expected ',' or ')' in the parameter list")?;
                break;
            }
        }
        self.colon("def")?;

        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.fn_depth += 1;
        let body = self.block("def", line);
        self.fn_depth -= 1;
        self.loop_depth = saved_loops;

        Ok(Stmt {
            kind: StmtKind::Def(Arc::new(FunctionDef {
                name,
                params,
                body: body?,
                line,
            })),
            line,
        })
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::or_expr)
    }

    /// Counts one more level of nesting against the limit. Callers restore
    /// `self.nesting` once the construct is complete.
    fn deeper(&mut self) -> Result<(), SyntaxError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(self.error(TOO_DEEP));
        }
        Ok(())
    }

    fn or_expr(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.nesting;
        let mut left = self.and_expr()?;
        while self.check_kw(Keyword::Or) {
            let line = self.line();
            self.advance();
            self.deeper()?;
            let right = self.and_expr()?;
            left = Expr {
                kind: ExprKind::Or(Box::new(left), Box::new(right)),
                line,
            };
        }
        self.nesting = depth;
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.nesting;
        let mut left = self.not_expr()?;
        while self.check_kw(Keyword::And) {
            let line = self.line();
            self.advance();
            self.deeper()?;
            let right = self.not_expr()?;
            left = Expr {
                kind: ExprKind::And(Box::new(left), Box::new(right)),
                line,
            };
        }
        self.nesting = depth;
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, SyntaxError> {
        if self.check_kw(Keyword::Not) {
            let line = self.line();
            self.advance();
            let operand = self.nested(Self::not_expr)?;
            return Ok(Expr {
                kind: ExprKind::Not(Box::new(operand)),
                line,
            });
        }
        self.comparison()
    }

    fn comparison_op(&self) -> Option<(CmpOp, usize)> {
        let op = match self.peek() {
            Tok::Op("==") => CmpOp::Eq,
            Tok::Op("!=") => CmpOp::NotEq,
            Tok::Op("<") => CmpOp::Lt,
            Tok::Op("<=") => CmpOp::LtE,
            Tok::Op(">") => CmpOp::Gt,
            Tok::Op(">=") => CmpOp::GtE,
            Tok::Kw(Keyword::In) => CmpOp::In,
            Tok::Kw(Keyword::Not) if matches!(self.peek_at(1), Tok::Kw(Keyword::In)) => {
                return Some((CmpOp::NotIn, 2));
            }
            _ => return None,
        };
        Some((op, 1))
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.sum()?;
        let mut rest = Vec::new();
        while let Some((op, width)) = self.comparison_op() {
            for _ in 0..width {
                self.advance();
            }
            rest.push((op, self.sum()?));
        }
        if rest.is_empty() {
            return Ok(first);
        }
        let line = first.line;
        Ok(Expr {
            kind: ExprKind::Compare {
                first: Box::new(first),
                rest,
            },
            line,
        })
    }

    fn binary(left: Expr, op: BinOp, right: Expr, line: usize) -> Expr {
        Expr {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            line,
        }
    }

    fn sum(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.nesting;
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Tok::Op("+") => BinOp::Add,
                Tok::Op("-") => BinOp::Sub,
                _ => break,
            };
            let line = self.line();
            self.advance();
            self.deeper()?;
            let right = self.term()?;
            left = Self::binary(left, op, right, line);
        }
        self.nesting = depth;
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.nesting;
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Tok::Op("*") => BinOp::Mul,
                Tok::Op("/") => BinOp::Div,
                Tok::Op("//") => BinOp::FloorDiv,
                Tok::Op("%") => BinOp::Mod,
                _ => break,
            };
            let line = self.line();
            self.advance();
            self.deeper()?;
            let right = self.unary()?;
            left = Self::binary(left, op, right, line);
        }
        self.nesting = depth;
        Ok(left)
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        let depth = self.nesting;
        self.deeper()?;
        let result = parse(self);
        self.nesting = depth;
        result
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            Tok::Op("-") => UnaryOp::Neg,
            Tok::Op("+") => UnaryOp::Pos,
            _ => return self.power(),
        };
        let line = self.line();
        self.advance();
        let operand = self.nested(Self::unary)?;
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            line,
        })
    }

    fn power(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.primary()?;
        if self.check_op("**") {
            let line = self.line();
            self.advance();
            let exponent = self.nested(Self::unary)?;
            return Ok(Self::binary(base, BinOp::Pow, exponent, line));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.nesting;
        let mut expr = self.atom()?;
        loop {
            let line = self.line();
            if matches!(self.peek(), Tok::Op("(" | "." | "[")) {
                self.deeper()?;
            }
            if self.eat_op("(") {
                let (args, kwargs) = self.call_arguments()?;
                expr = Expr {
                    kind: ExprKind::Call {
                        func: Box::new(expr),
                        args,
                        kwargs,
                    },
                    line,
                };
            } else if self.eat_op(".") {
                let name = self.name("expected a name after '.'")?;
                expr = Expr {
                    kind: ExprKind::Attribute {
                        object: Box::new(expr),
                        name,
                    },
                    line,
                };
            } else if self.eat_op("[") {
                let index = self.expression()?;
                if self.check_op(":") {
                    return Err(self.error("slices like [a:b] are not supported"));
                }
                self.expect_op("]", "expected ']' after the index")?;
                expr = Expr {
                    kind: ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    line,
                };
            } else {
                self.nesting = depth;
                return Ok(expr);
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn call_arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), SyntaxError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        while !self.eat_op(")") {
            let keyword = match (self.peek(), self.peek_at(1)) {
                (Tok::Name(name), Tok::Op("=")) => Some(name.clone()),
                _ => None,
            };
            if let Some(keyword) = keyword {
                self.advance();
                self.advance();
                if kwargs.iter().any(|(k, _)| *k == keyword) {
                    return Err(self.error(format!("'{}' is given twice", keyword)));
                }
                kwargs.push((keyword, self.expression()?));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error(
                        "plain arguments must come before named ones like angle=90",
                    ));
                }
                args.push(self.expression()?);
            }
            if !self.eat_op(",") {
                self.expect_op(")", "expected ',' or ')' between the arguments")?;
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn atom(&mut self) -> Result<Expr, SyntaxError> {
        let line = self.line();
        let kind = match self.peek().clone() {
            Tok::Int(n) => {
                self.advance();
                ExprKind::Int(n)
            }
            Tok::Float(n) => {
                self.advance();
                ExprKind::Float(n)
            }
            Tok::Str(s) => {
                self.advance();
                let mut text = s;
                while let Tok::Str(more) = self.peek().clone() {
                    self.advance();
                    text.push_str(&more);
                }
                ExprKind::Str(text)
            }
            Tok::Name(name) => {
                self.advance();
                ExprKind::Name(name)
            }
            Tok::Kw(Keyword::True) => {
                self.advance();
                ExprKind::Bool(true)
            }
            Tok::Kw(Keyword::False) => {
                self.advance();
                ExprKind::Bool(false)
            }
            Tok::Kw(Keyword::None) => {
                self.advance();
                ExprKind::None
            }
            Tok::Op("(") => {
                self.advance();
                let inner = self.expression()?;
                if self.check_op(",") {
                    return Err(self.error(
                        "tuples aren't supported here; use a list like [1, 2] instead",
                    ));
                }
                self.expect_op(")", "expected ')'")?;
                return Ok(inner);
            }
            Tok::Op("[") => {
                self.advance();
                let mut items = Vec::new();
                while !self.eat_op("]") {
                    items.push(self.expression()?);
                    if !self.eat_op(",") {
                        self.expect_op("]", "expected ',' or ']' in the list")?;
                        break;
                    }
                }
                ExprKind::List(items)
            }
            _ => return Err(self.unexpected()),
        };
        Ok(Expr { kind, line })
    }
}

fn is_bare_print(stmts: &[Stmt]) -> bool {
    matches!(
        stmts.last(),
        Some(Stmt {
            kind: StmtKind::Expr(Expr {
                kind: ExprKind::Name(name),
                ..
            }),
            ..
        }) if name == "print"
    )
}
