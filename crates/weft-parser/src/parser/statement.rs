use weft_ast::{
    BinaryOp, Block, CaseSelector, Expression, ExpressionKind, Handle, LocalKind, Statement,
    StatementKind, SwitchCase,
};

use super::{PResult, Parser};
use crate::SyntaxError;
use crate::lexer::{CompoundOp, Keyword, TokenKind};

fn compound_operator(op: CompoundOp) -> BinaryOp {
    match op {
        CompoundOp::Add => BinaryOp::Add,
        CompoundOp::Subtract => BinaryOp::Subtract,
        CompoundOp::Multiply => BinaryOp::Multiply,
        CompoundOp::Divide => BinaryOp::Divide,
        CompoundOp::Modulo => BinaryOp::Modulo,
        CompoundOp::And => BinaryOp::BitwiseAnd,
        CompoundOp::Or => BinaryOp::BitwiseOr,
        CompoundOp::Xor => BinaryOp::BitwiseXor,
        CompoundOp::ShiftLeft => BinaryOp::ShiftLeft,
        CompoundOp::ShiftRight => BinaryOp::ShiftRight,
    }
}

impl Parser<'_> {
    /// `{ statement* }`
    pub(super) fn compound_statement(&mut self) -> PResult<Block> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut block = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            if let Some(statement) = self.statement()? {
                block.push(statement);
            }
        }
        Ok(block)
    }

    /// Returns `None` for an empty statement.
    fn statement(&mut self) -> PResult<Option<Statement>> {
        let start = self.span();
        let kind = match self.peek() {
            TokenKind::Semicolon => {
                self.advance();
                return Ok(None);
            }
            TokenKind::LBrace => StatementKind::Block(self.compound_statement()?),
            TokenKind::Keyword(Keyword::If) => self.if_statement()?,
            TokenKind::Keyword(Keyword::Switch) => self.switch_statement()?,
            TokenKind::Keyword(Keyword::Loop) => self.loop_statement()?,
            TokenKind::Keyword(Keyword::For) => self.for_statement()?,
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                let condition = self.expression()?;
                let body = self.compound_statement()?;
                StatementKind::While { condition, body }
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                if self.at_keyword(Keyword::If) {
                    return Err(SyntaxError::new(
                        "'break if' is only allowed at the end of a continuing block",
                        start.until(self.span()),
                    ));
                }
                self.expect(&TokenKind::Semicolon, "';' after 'break'")?;
                StatementKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.expect(&TokenKind::Semicolon, "';' after 'continue'")?;
                StatementKind::Continue
            }
            TokenKind::Keyword(Keyword::Discard) => {
                self.advance();
                self.expect(&TokenKind::Semicolon, "';' after 'discard'")?;
                StatementKind::Discard
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let value = if self.at(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(&TokenKind::Semicolon, "';' after the return value")?;
                StatementKind::Return(value)
            }
            TokenKind::Keyword(Keyword::Continuing) => {
                return Err(SyntaxError::new(
                    "'continuing' must be the last statement of a loop",
                    start,
                ));
            }
            _ => {
                let kind = self.simple_statement()?;
                self.expect(&TokenKind::Semicolon, "';'")?;
                kind
            }
        };
        Ok(Some(Statement::new(kind, start.until(self.previous_span()))))
    }

    /// Declarations, assignments, increments and calls: the statements a
    /// `for` header can hold. Does not consume the trailing `;`.
    fn simple_statement(&mut self) -> PResult<StatementKind> {
        match self.peek() {
            TokenKind::Keyword(Keyword::Let) => return self.local_declaration(LocalKind::Let),
            TokenKind::Keyword(Keyword::Var) => return self.local_declaration(LocalKind::Var),
            TokenKind::Keyword(Keyword::Const) => return self.local_declaration(LocalKind::Const),
            TokenKind::Ident(name)
                if name == "_" && *self.peek_nth(1) == TokenKind::Equal =>
            {
                self.advance();
                self.advance();
                return Ok(StatementKind::Phony(self.expression()?));
            }
            _ => {}
        }

        let target = self.expression()?;
        let kind = match self.peek().clone() {
            TokenKind::Equal => {
                self.advance();
                StatementKind::Assign {
                    target,
                    op: None,
                    value: self.expression()?,
                }
            }
            TokenKind::CompoundAssign(op) => {
                self.advance();
                StatementKind::Assign {
                    target,
                    op: Some(compound_operator(op)),
                    value: self.expression()?,
                }
            }
            TokenKind::PlusPlus => {
                self.advance();
                StatementKind::Increment(target)
            }
            TokenKind::MinusMinus => {
                self.advance();
                StatementKind::Decrement(target)
            }
            _ => {
                if !matches!(self.module.expressions[target].kind, ExpressionKind::Call { .. }) {
                    return Err(SyntaxError::new(
                        "expression statements must be function calls",
                        self.module.expressions[target].span,
                    ));
                }
                StatementKind::Call(target)
            }
        };
        Ok(kind)
    }

    fn local_declaration(&mut self, kind: LocalKind) -> PResult<StatementKind> {
        let keyword = self.advance().span;
        if kind == LocalKind::Var {
            let (space, access) = self.variable_template()?;
            if let Some(space) = space.filter(|s| s.name != "function") {
                return Err(SyntaxError::new(
                    format!(
                        "function-scope variables must be in the 'function' address space, not '{}'",
                        space.name
                    ),
                    space.span,
                ));
            }
            if let Some(access) = access {
                return Err(SyntaxError::new(
                    "function-scope variables cannot declare an access mode",
                    access.span,
                ));
            }
        }
        let name = self.expect_declared_name("a variable name")?;
        let ty = if self.eat(&TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        let initializer = if self.eat(&TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        let local = self.local(name, kind);
        let missing_initializer = || {
            SyntaxError::new(
                "this declaration requires an initializer",
                keyword.until(self.previous_span()),
            )
        };
        Ok(match kind {
            LocalKind::Var => StatementKind::Var {
                local,
                ty,
                initializer,
            },
            LocalKind::Let => StatementKind::Let {
                local,
                ty,
                value: initializer.ok_or_else(missing_initializer)?,
            },
            LocalKind::Const | LocalKind::Parameter => StatementKind::Const {
                local,
                ty,
                value: initializer.ok_or_else(missing_initializer)?,
            },
        })
    }

    fn if_statement(&mut self) -> PResult<StatementKind> {
        self.expect_keyword(Keyword::If, "'if'")?;
        let condition = self.expression()?;
        let accept = self.compound_statement()?;
        let reject = if self.eat_keyword(Keyword::Else) {
            if self.at_keyword(Keyword::If) {
                let start = self.span();
                let nested = self.if_statement()?;
                vec![Statement::new(nested, start.until(self.previous_span()))]
            } else {
                self.compound_statement()?
            }
        } else {
            Vec::new()
        };
        Ok(StatementKind::If {
            condition,
            accept,
            reject,
        })
    }

    fn switch_statement(&mut self) -> PResult<StatementKind> {
        self.expect_keyword(Keyword::Switch, "'switch'")?;
        let selector = self.expression()?;
        self.expect(&TokenKind::LBrace, "'{' to begin the switch body")?;
        let mut cases = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            let start = self.span();
            let selectors = if self.eat_keyword(Keyword::Default) {
                vec![CaseSelector::Default]
            } else {
                self.expect_keyword(Keyword::Case, "'case' or 'default'")?;
                let mut selectors = Vec::new();
                loop {
                    if self.at(&TokenKind::Colon) || self.at(&TokenKind::LBrace) {
                        break;
                    }
                    if self.eat_keyword(Keyword::Default) {
                        selectors.push(CaseSelector::Default);
                    } else {
                        selectors.push(CaseSelector::Expression(self.expression()?));
                    }
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                if selectors.is_empty() {
                    return Err(self.unexpected("a case selector"));
                }
                selectors
            };
            self.eat(&TokenKind::Colon);
            let body = self.compound_statement()?;
            cases.push(SwitchCase {
                selectors,
                body,
                span: start.until(self.previous_span()),
            });
        }
        Ok(StatementKind::Switch { selector, cases })
    }

    fn loop_statement(&mut self) -> PResult<StatementKind> {
        self.expect_keyword(Keyword::Loop, "'loop'")?;
        self.expect(&TokenKind::LBrace, "'{' to begin the loop body")?;
        let mut body = Vec::new();
        let mut continuing = Vec::new();
        let mut break_if = None;
        loop {
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            if self.eat_keyword(Keyword::Continuing) {
                (continuing, break_if) = self.continuing_block()?;
                self.expect(&TokenKind::RBrace, "'}' after the continuing block")?;
                break;
            }
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            if let Some(statement) = self.statement()? {
                body.push(statement);
            }
        }
        Ok(StatementKind::Loop {
            body,
            continuing,
            break_if,
        })
    }

    fn continuing_block(&mut self) -> PResult<(Block, Option<Handle<Expression>>)> {
        self.expect(&TokenKind::LBrace, "'{' after 'continuing'")?;
        let mut block = Vec::new();
        loop {
            if self.eat(&TokenKind::RBrace) {
                return Ok((block, None));
            }
            if self.at_keyword(Keyword::Break)
                && *self.peek_nth(1) == TokenKind::Keyword(Keyword::If)
            {
                self.advance();
                self.advance();
                let condition = self.expression()?;
                self.expect(&TokenKind::Semicolon, "';' after 'break if'")?;
                self.expect(
                    &TokenKind::RBrace,
                    "'}': 'break if' must be the last statement of a continuing block",
                )?;
                return Ok((block, Some(condition)));
            }
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            if let Some(statement) = self.statement()? {
                block.push(statement);
            }
        }
    }

    fn for_statement(&mut self) -> PResult<StatementKind> {
        self.expect_keyword(Keyword::For, "'for'")?;
        self.expect(&TokenKind::LParen, "'(' after 'for'")?;
        let init = self.for_clause(&TokenKind::Semicolon)?;
        self.expect(&TokenKind::Semicolon, "';' after the for initializer")?;
        let condition = if self.at(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&TokenKind::Semicolon, "';' after the for condition")?;
        let update = self.for_clause(&TokenKind::RParen)?;
        if let Some(update) = update.as_deref().filter(|s| {
            matches!(
                s.kind,
                StatementKind::Let { .. } | StatementKind::Var { .. } | StatementKind::Const { .. }
            )
        }) {
            return Err(SyntaxError::new(
                "the for update clause cannot declare a variable",
                update.span,
            ));
        }
        self.expect(&TokenKind::RParen, "')' after the for header")?;
        let body = self.compound_statement()?;
        Ok(StatementKind::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn for_clause(&mut self, terminator: &TokenKind) -> PResult<Option<Box<Statement>>> {
        if self.at(terminator) {
            return Ok(None);
        }
        let start = self.span();
        let kind = self.simple_statement()?;
        Ok(Some(Box::new(Statement::new(
            kind,
            start.until(self.previous_span()),
        ))))
    }
}
