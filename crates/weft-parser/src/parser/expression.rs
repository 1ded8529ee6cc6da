use weft_ast::{
    BinaryOp, CallTarget, Expression, ExpressionKind, Handle, Literal, Span, UnaryOp,
};

use super::types::is_type_generator;
use super::{PResult, Parser};
use crate::SyntaxError;
use crate::lexer::{Keyword, TokenKind};

const F16_MAX: f64 = 65504.0;

/// Number of binary precedence levels; see [`binary_operator`].
const PRECEDENCE_LEVELS: usize = 9;

/// The binary operator `token` spells at `level`, loosest level first.
fn binary_operator(level: usize, token: &TokenKind) -> Option<BinaryOp> {
    let op = match (level, token) {
        (0, TokenKind::PipePipe) => BinaryOp::LogicalOr,
        (1, TokenKind::AmpAmp) => BinaryOp::LogicalAnd,
        (2, TokenKind::Pipe) => BinaryOp::BitwiseOr,
        (3, TokenKind::Caret) => BinaryOp::BitwiseXor,
        (4, TokenKind::Amp) => BinaryOp::BitwiseAnd,
        (5, TokenKind::EqualEqual) => BinaryOp::Equal,
        (5, TokenKind::NotEqual) => BinaryOp::NotEqual,
        (5, TokenKind::Less) => BinaryOp::Less,
        (5, TokenKind::LessEqual) => BinaryOp::LessEqual,
        (5, TokenKind::Greater) => BinaryOp::Greater,
        (5, TokenKind::GreaterEqual) => BinaryOp::GreaterEqual,
        (6, TokenKind::ShiftLeft) => BinaryOp::ShiftLeft,
        (6, TokenKind::ShiftRight) => BinaryOp::ShiftRight,
        (7, TokenKind::Plus) => BinaryOp::Add,
        (7, TokenKind::Minus) => BinaryOp::Subtract,
        (8, TokenKind::Star) => BinaryOp::Multiply,
        (8, TokenKind::Slash) => BinaryOp::Divide,
        (8, TokenKind::Percent) => BinaryOp::Modulo,
        _ => return None,
    };
    Some(op)
}

impl Parser<'_> {
    pub(super) fn expression(&mut self) -> PResult<Handle<Expression>> {
        self.binary(0)
    }

    /// Parses an expression with template-list handling switched off, as
    /// inside parentheses and brackets.
    fn nested_expression(&mut self) -> PResult<Handle<Expression>> {
        let depth = std::mem::take(&mut self.template_depth);
        let result = self.expression();
        self.template_depth = depth;
        result
    }

    fn binary(&mut self, level: usize) -> PResult<Handle<Expression>> {
        if level == PRECEDENCE_LEVELS {
            return self.unary();
        }
        let mut left = self.binary(level + 1)?;
        while let Some(op) = self.operator_at(level) {
            self.advance();
            let right = self.binary(level + 1)?;
            let span = self.module.expressions[left]
                .span
                .until(self.module.expressions[right].span);
            left = self.expression_node(ExpressionKind::Binary { op, left, right }, span);
        }
        Ok(left)
    }

    fn operator_at(&self, level: usize) -> Option<BinaryOp> {
        let token = self.peek();
        if self.template_depth > 0
            && matches!(
                token,
                TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::ShiftRight
            )
        {
            return None;
        }
        binary_operator(level, token)
    }

    fn unary(&mut self) -> PResult<Handle<Expression>> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Bang => UnaryOp::LogicalNot,
            TokenKind::Tilde => UnaryOp::BitwiseNot,
            TokenKind::Amp => UnaryOp::AddressOf,
            TokenKind::Star => UnaryOp::Deref,
            _ => return self.postfix(),
        };
        let start = self.advance().span;
        let operand = self.unary()?;
        let span = start.until(self.module.expressions[operand].span);
        Ok(self.expression_node(ExpressionKind::Unary { op, operand }, span))
    }

    fn postfix(&mut self) -> PResult<Handle<Expression>> {
        let mut base = self.primary()?;
        loop {
            let start = self.module.expressions[base].span;
            if self.eat(&TokenKind::LBracket) {
                let index = self.nested_expression()?;
                self.expect(&TokenKind::RBracket, "']'")?;
                let span = start.until(self.previous_span());
                base = self.expression_node(ExpressionKind::Index { base, index }, span);
            } else if self.eat(&TokenKind::Dot) {
                let member = self.expect_ident("a member name")?;
                let span = start.until(member.span);
                base = self.expression_node(
                    ExpressionKind::Member {
                        base,
                        member,
                        access: None,
                    },
                    span,
                );
            } else {
                return Ok(base);
            }
        }
    }

    fn primary(&mut self) -> PResult<Handle<Expression>> {
        let span = self.span();
        match self.peek().clone() {
            TokenKind::Int { value, suffix } => {
                self.advance();
                let literal = int_literal(value, suffix, span)?;
                Ok(self.expression_node(ExpressionKind::Literal(literal), span))
            }
            TokenKind::Float { value, suffix } => {
                self.advance();
                let literal = float_literal(value, suffix, span)?;
                Ok(self.expression_node(ExpressionKind::Literal(literal), span))
            }
            TokenKind::Keyword(keyword @ (Keyword::True | Keyword::False)) => {
                self.advance();
                let literal = Literal::Bool(keyword == Keyword::True);
                Ok(self.expression_node(ExpressionKind::Literal(literal), span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.nested_expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                // Keep the parenthesized span so diagnostics cover the parens.
                self.module.expressions[inner].span = span.until(self.previous_span());
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if is_type_generator(&name) && *self.peek_nth(1) == TokenKind::Less {
                    let ty = self.type_expr()?;
                    return self.call(CallTarget::Type(ty), span);
                }
                let ident = self.expect_ident("an expression")?;
                if self.at(&TokenKind::LParen) {
                    return self.call(CallTarget::Named(ident), span);
                }
                if ident.name == "_" {
                    return Err(SyntaxError::new(
                        "'_' is only allowed on the left of a phony assignment",
                        ident.span,
                    ));
                }
                Ok(self.expression_node(
                    ExpressionKind::Identifier {
                        name: ident,
                        resolved: None,
                    },
                    span,
                ))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn call(&mut self, target: CallTarget, start: Span) -> PResult<Handle<Expression>> {
        self.expect(&TokenKind::LParen, "'(' to begin the argument list")?;
        let depth = std::mem::take(&mut self.template_depth);
        let arguments = self.comma_list(&TokenKind::RParen, "')'", |p| p.expression());
        self.template_depth = depth;
        let arguments = arguments?;
        let span = start.until(self.previous_span());
        Ok(self.expression_node(
            ExpressionKind::Call {
                target,
                arguments,
                callee: None,
            },
            span,
        ))
    }
}

fn int_literal(value: u64, suffix: Option<char>, span: Span) -> PResult<Literal> {
    let out_of_range =
        |ty: &str| SyntaxError::new(format!("integer literal {value} does not fit in {ty}"), span);
    match suffix {
        Some('i') => i32::try_from(value)
            .map(Literal::I32)
            .map_err(|_| out_of_range("i32")),
        Some('u') => u32::try_from(value)
            .map(Literal::U32)
            .map_err(|_| out_of_range("u32")),
        _ => i64::try_from(value)
            .map(Literal::AbstractInt)
            .map_err(|_| out_of_range("a 64-bit abstract integer")),
    }
}

fn float_literal(value: f64, suffix: Option<char>, span: Span) -> PResult<Literal> {
    let literal = match suffix {
        Some('f') => {
            let narrowed = value as f32;
            narrowed.is_finite().then_some(Literal::F32(narrowed))
        }
        Some('h') => (value.abs() <= F16_MAX).then_some(Literal::F16(value as f32)),
        _ => value.is_finite().then_some(Literal::AbstractFloat(value)),
    };
    literal.ok_or_else(|| {
        SyntaxError::new(
            format!("float literal {value} is out of range for its type"),
            span,
        )
    })
}

#[cfg(test)]
mod tests {
    use weft_ast::{Configuration, Declaration, ShaderModule};

    use super::*;

    /// Parses `const x = <source>;` and returns the module with the root.
    fn parse_expr(source: &str) -> (ShaderModule, Handle<Expression>) {
        let module =
            crate::parse(&format!("const x = {source};"), Configuration::default()).unwrap();
        let Declaration::Constant(c) = module.declarations[0] else {
            panic!("expected a constant");
        };
        let root = module.constants[c].initializer.unwrap();
        (module, root)
    }

    fn shape(module: &ShaderModule, expr: Handle<Expression>) -> String {
        match &module.expressions[expr].kind {
            ExpressionKind::Literal(Literal::AbstractInt(v)) => v.to_string(),
            ExpressionKind::Literal(l) => format!("{l:?}"),
            ExpressionKind::Identifier { name, .. } => name.name.clone(),
            ExpressionKind::Unary { op, operand } => {
                format!("({}{})", op.symbol(), shape(module, *operand))
            }
            ExpressionKind::Binary { op, left, right } => format!(
                "({} {} {})",
                shape(module, *left),
                op.symbol(),
                shape(module, *right)
            ),
            ExpressionKind::Call {
                target, arguments, ..
            } => {
                let name = match target {
                    CallTarget::Named(ident) => ident.name.clone(),
                    CallTarget::Type(_) => "<type>".to_string(),
                };
                let args: Vec<_> = arguments.iter().map(|a| shape(module, *a)).collect();
                format!("{name}({})", args.join(", "))
            }
            ExpressionKind::Index { base, index } => {
                format!("{}[{}]", shape(module, *base), shape(module, *index))
            }
            ExpressionKind::Member { base, member, .. } => {
                format!("{}.{}", shape(module, *base), member.name)
            }
            ExpressionKind::BoundsCheck { .. } => unreachable!(),
        }
    }

    fn parses_as(source: &str, expected: &str) {
        let (module, root) = parse_expr(source);
        assert_eq!(shape(&module, root), expected, "source: {source}");
    }

    #[test]
    fn precedence() {
        parses_as("1 + 2 * 3", "(1 + (2 * 3))");
        parses_as("1 - 2 - 3", "((1 - 2) - 3)");
        parses_as("a << 2 + 1", "(a << (2 + 1))");
        parses_as("a < b && c | d", "((a < b) && (c | d))");
        parses_as("-a[1].y", "(-a[1].y)");
        parses_as("!(a || b)", "(!(a || b))");
    }

    #[test]
    fn calls_and_constructors() {
        parses_as("max(a, 1)", "max(a, 1)");
        parses_as("vec3(1, 2, 3)", "vec3(1, 2, 3)");
        parses_as("vec3<f32>(1.0).x", "<type>(AbstractFloat(1.0)).x");
        parses_as("array<u32, 2>(1u, 2u)[0]", "<type>(U32(1), U32(2))[0]");
    }

    #[test]
    fn suffixed_literals() {
        parses_as("1i", "I32(1)");
        parses_as("4294967295u", "U32(4294967295)");
        parses_as("1.5h", "F16(1.5)");
        parses_as("true", "Bool(true)");
    }

    #[test]
    fn literal_out_of_range() {
        let err = crate::parse("const x = 2147483648i;", Configuration::default()).unwrap_err();
        assert_eq!(err.message, "integer literal 2147483648 does not fit in i32");
        let err = crate::parse("const x = 70000.0h;", Configuration::default()).unwrap_err();
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn parenthesized_span_covers_parens() {
        let (module, root) = parse_expr("(1)");
        assert_eq!(module.expressions[root].span, Span::new(10, 13));
    }

    #[test]
    fn greater_inside_parens_within_template() {
        let module = crate::parse(
            "alias A = array<u32, (4 > 2) + 1>;",
            Configuration::default(),
        );
        // `(4 > 2)` is a bool, which the type checker rejects; the parser
        // only needs to accept the grammar.
        assert!(module.is_ok());
    }
}
