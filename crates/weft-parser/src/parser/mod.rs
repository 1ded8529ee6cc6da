//! Recursive-descent parser.

mod expression;
mod statement;
mod types;

use weft_ast::{
    AccessMode, AddressSpace, Alias, Attribute, AttributeKind, BuiltinValue, Constant,
    Declaration, Expression, ExpressionKind, Function, FunctionResult, GlobalVariable, Handle,
    Ident, InterpolationSampling, InterpolationType, Local, LocalKind, Parameter, ShaderModule,
    Span, Struct, StructMember,
};

use crate::SyntaxError;
use crate::lexer::{CompoundOp, Keyword, Token, TokenKind};

pub(crate) type PResult<T> = Result<T, SyntaxError>;

pub(crate) struct Parser<'m> {
    tokens: Vec<Token>,
    pos: usize,
    module: &'m mut ShaderModule,
    /// Non-zero while parsing inside a template list, where `>` closes the
    /// list instead of comparing.
    template_depth: usize,
}

impl<'m> Parser<'m> {
    pub(crate) fn new(tokens: Vec<Token>, module: &'m mut ShaderModule) -> Self {
        Self {
            tokens,
            pos: 0,
            module,
            template_depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> &TokenKind {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span
    }

    fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1) {
            Some(i) => self.tokens[i].span,
            None => self.span(),
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        *self.peek() == TokenKind::Keyword(keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(&TokenKind::Keyword(keyword))
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::new(
            format!("expected {expected}, found {}", self.peek().describe()),
            self.span(),
        )
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> PResult<Span> {
        if self.at(kind) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, expected: &str) -> PResult<Span> {
        self.expect(&TokenKind::Keyword(keyword), expected)
    }

    fn expect_ident(&mut self, expected: &str) -> PResult<Ident> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                if name.starts_with("__") {
                    return Err(SyntaxError::new(
                        format!("identifiers may not start with '__': '{name}'"),
                        span,
                    ));
                }
                Ok(Ident::new(name, span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Like [`Self::expect_ident`], but rejects the phony name `_`.
    fn expect_declared_name(&mut self, expected: &str) -> PResult<Ident> {
        let ident = self.expect_ident(expected)?;
        if ident.name == "_" {
            return Err(SyntaxError::new("'_' cannot be used as a name", ident.span));
        }
        Ok(ident)
    }

    /// Consumes the `>` that closes a template list, splitting `>>`, `>=` and
    /// `>>=` tokens.
    fn close_template(&mut self) -> PResult<()> {
        let rest = match self.peek() {
            TokenKind::Greater => None,
            TokenKind::ShiftRight => Some(TokenKind::Greater),
            TokenKind::GreaterEqual => Some(TokenKind::Equal),
            TokenKind::CompoundAssign(CompoundOp::ShiftRight) => Some(TokenKind::GreaterEqual),
            _ => return Err(self.unexpected("'>' to close the template list")),
        };
        match rest {
            None => {
                self.advance();
            }
            Some(kind) => {
                let token = &mut self.tokens[self.pos];
                token.kind = kind;
                token.span.start += 1;
            }
        }
        Ok(())
    }

    fn expression_node(&mut self, kind: ExpressionKind, span: Span) -> Handle<Expression> {
        self.module.expressions.append(Expression::new(kind, span))
    }

    fn local(&mut self, name: Ident, kind: LocalKind) -> Handle<Local> {
        self.module.locals.append(Local {
            name,
            kind,
            ty: None,
        })
    }

    /// Parses `item (, item)* [,]` up to and including `close`.
    fn comma_list<T>(
        &mut self,
        close: &TokenKind,
        close_name: &str,
        mut item: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<Vec<T>> {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(item(self)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, close_name)?;
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Module scope
    // ------------------------------------------------------------------

    pub(crate) fn translation_unit(&mut self) -> PResult<()> {
        while self.at_keyword(Keyword::Enable) {
            let start = self.advance().span;
            loop {
                let extension = self.expect_ident("an extension name")?;
                self.module.enables.push(extension);
                if !self.eat(&TokenKind::Comma) || self.at(&TokenKind::Semicolon) {
                    break;
                }
            }
            self.expect(&TokenKind::Semicolon, "';' after the enable directive")
                .map_err(|e| SyntaxError::new(e.message, start.until(e.span)))?;
        }

        while !self.at(&TokenKind::Eof) {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            if self.at_keyword(Keyword::Enable) {
                return Err(SyntaxError::new(
                    "enable directives must come before any declaration",
                    self.span(),
                ));
            }
            let declaration = self.global_declaration()?;
            self.module.declarations.push(declaration);
        }
        Ok(())
    }

    fn global_declaration(&mut self) -> PResult<Declaration> {
        let start = self.span();
        let attributes = self.attributes()?;
        let reject_attributes = |what: &str, attributes: &[Attribute]| match attributes.first() {
            Some(attribute) => Err(SyntaxError::new(
                format!("attributes are not allowed on {what}"),
                attribute.span,
            )),
            None => Ok(()),
        };

        match self.peek().clone() {
            TokenKind::Keyword(Keyword::Const) => {
                reject_attributes("const declarations", &attributes)?;
                self.advance();
                self.constant(start, false, attributes)
            }
            TokenKind::Keyword(Keyword::Override) => {
                self.advance();
                self.constant(start, true, attributes)
            }
            TokenKind::Keyword(Keyword::Var) => {
                self.advance();
                self.global_variable(start, attributes)
            }
            TokenKind::Keyword(Keyword::Struct) => {
                reject_attributes("struct declarations", &attributes)?;
                self.advance();
                self.structure(start)
            }
            TokenKind::Keyword(Keyword::Alias) => {
                reject_attributes("aliases", &attributes)?;
                self.advance();
                let name = self.expect_declared_name("an alias name")?;
                self.expect(&TokenKind::Equal, "'='")?;
                let ty = self.type_expr()?;
                self.expect(&TokenKind::Semicolon, "';'")?;
                let span = start.until(self.previous_span());
                let alias = self.module.aliases.append(Alias {
                    name,
                    ty,
                    span,
                    resolved_ty: None,
                });
                Ok(Declaration::Alias(alias))
            }
            TokenKind::Keyword(Keyword::Fn) => {
                self.advance();
                self.function(start, attributes)
            }
            TokenKind::Keyword(Keyword::Let) => Err(SyntaxError::new(
                "'let' is only allowed inside functions; use 'const' at module scope",
                self.span(),
            )),
            _ => Err(self.unexpected("a module-scope declaration")),
        }
    }

    fn constant(
        &mut self,
        start: Span,
        is_override: bool,
        attributes: Vec<Attribute>,
    ) -> PResult<Declaration> {
        let name = self.expect_declared_name("a constant name")?;
        let ty = if self.eat(&TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        let initializer = if self.eat(&TokenKind::Equal) {
            Some(self.expression()?)
        } else if is_override {
            None
        } else {
            return Err(self.unexpected("'=' and an initializer"));
        };
        self.expect(&TokenKind::Semicolon, "';'")?;
        let span = start.until(self.previous_span());
        let handle = self.module.constants.append(Constant {
            name,
            is_override,
            ty,
            initializer,
            attributes,
            span,
            resolved_ty: None,
            override_id: None,
        });
        Ok(Declaration::Constant(handle))
    }

    fn global_variable(&mut self, start: Span, attributes: Vec<Attribute>) -> PResult<Declaration> {
        let (address_space, access_mode) = self.variable_template()?;
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
        self.expect(&TokenKind::Semicolon, "';'")?;
        let span = start.until(self.previous_span());
        let handle = self.module.global_variables.append(GlobalVariable {
            name,
            address_space,
            access_mode,
            ty,
            initializer,
            attributes,
            span,
            resolved_ty: None,
            space: AddressSpace::Private,
            access: AccessMode::ReadWrite,
            binding: None,
        });
        Ok(Declaration::Variable(handle))
    }

    /// `<space[, access]>` after `var`.
    fn variable_template(&mut self) -> PResult<(Option<Ident>, Option<Ident>)> {
        if !self.eat(&TokenKind::Less) {
            return Ok((None, None));
        }
        self.template_depth += 1;
        let space = self.expect_ident("an address space")?;
        let access = if self.eat(&TokenKind::Comma) {
            Some(self.expect_ident("an access mode")?)
        } else {
            None
        };
        self.template_depth -= 1;
        self.close_template()?;
        Ok((Some(space), access))
    }

    fn structure(&mut self, start: Span) -> PResult<Declaration> {
        let name = self.expect_declared_name("a struct name")?;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let member_start = self.span();
            let attributes = self.attributes()?;
            let member_name = self.expect_declared_name("a member name")?;
            self.expect(&TokenKind::Colon, "':'")?;
            let ty = self.type_expr()?;
            members.push(StructMember {
                name: member_name,
                ty,
                attributes,
                span: member_start.until(self.previous_span()),
                resolved_ty: None,
            });
            if !self.eat(&TokenKind::Comma) && !self.eat(&TokenKind::Semicolon) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}' to close the struct")?;
        self.eat(&TokenKind::Semicolon);
        if members.is_empty() {
            return Err(SyntaxError::new(
                format!("struct '{}' must have at least one member", name.name),
                name.span,
            ));
        }
        let span = start.until(self.previous_span());
        let handle = self.module.structs.append(Struct {
            name,
            members,
            span,
            layout: None,
        });
        Ok(Declaration::Struct(handle))
    }

    fn function(&mut self, start: Span, attributes: Vec<Attribute>) -> PResult<Declaration> {
        let name = self.expect_declared_name("a function name")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let parameters = self.comma_list(&TokenKind::RParen, "')'", |p| {
            let param_start = p.span();
            let attributes = p.attributes()?;
            let name = p.expect_declared_name("a parameter name")?;
            p.expect(&TokenKind::Colon, "':'")?;
            let ty = p.type_expr()?;
            let local = p.local(name, LocalKind::Parameter);
            Ok(Parameter {
                local,
                ty,
                attributes,
                span: param_start.until(p.previous_span()),
            })
        })?;
        let result = if self.eat(&TokenKind::Arrow) {
            let attributes = self.attributes()?;
            let ty = self.type_expr()?;
            Some(FunctionResult {
                ty,
                attributes,
                resolved: None,
            })
        } else {
            None
        };
        let body = self.compound_statement()?;
        let span = start.until(self.previous_span());
        let handle = self.module.functions.append(Function {
            name,
            attributes,
            parameters,
            result,
            body,
            span,
        });
        Ok(Declaration::Function(handle))
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    fn attributes(&mut self) -> PResult<Vec<Attribute>> {
        let mut attributes = Vec::new();
        while self.at(&TokenKind::At) {
            attributes.push(self.attribute()?);
        }
        Ok(attributes)
    }

    fn attribute(&mut self) -> PResult<Attribute> {
        let start = self.expect(&TokenKind::At, "'@'")?;
        let TokenKind::Ident(name) = self.peek().clone() else {
            return Err(self.unexpected("an attribute name"));
        };
        let name_span = self.advance().span;

        let kind = match name.as_str() {
            "compute" => AttributeKind::Compute,
            "vertex" => AttributeKind::Vertex,
            "fragment" => AttributeKind::Fragment,
            "invariant" => AttributeKind::Invariant,
            "must_use" => AttributeKind::MustUse,
            "group" => AttributeKind::Group(self.single_argument(&name)?),
            "binding" => AttributeKind::Binding(self.single_argument(&name)?),
            "location" => AttributeKind::Location(self.single_argument(&name)?),
            "id" => AttributeKind::Id(self.single_argument(&name)?),
            "align" => AttributeKind::Align(self.single_argument(&name)?),
            "size" => AttributeKind::Size(self.single_argument(&name)?),
            "workgroup_size" => {
                self.expect(&TokenKind::LParen, "'(' after @workgroup_size")?;
                let dims = self.comma_list(&TokenKind::RParen, "')'", |p| p.expression())?;
                if dims.is_empty() || dims.len() > 3 {
                    return Err(SyntaxError::new(
                        "@workgroup_size takes one to three arguments",
                        start.until(self.previous_span()),
                    ));
                }
                AttributeKind::WorkgroupSize(dims)
            }
            "builtin" => {
                let args = self.identifier_arguments(&name)?;
                let [value] = args.as_slice() else {
                    return Err(SyntaxError::new(
                        "@builtin takes exactly one argument",
                        start.until(self.previous_span()),
                    ));
                };
                let builtin = BuiltinValue::from_name(&value.name).ok_or_else(|| {
                    SyntaxError::new(format!("unknown builtin value '{}'", value.name), value.span)
                })?;
                AttributeKind::Builtin(builtin)
            }
            "interpolate" => {
                let args = self.identifier_arguments(&name)?;
                let (ty, sampling) = match args.as_slice() {
                    [ty] => (ty, None),
                    [ty, sampling] => (ty, Some(sampling)),
                    _ => {
                        return Err(SyntaxError::new(
                            "@interpolate takes one or two arguments",
                            start.until(self.previous_span()),
                        ));
                    }
                };
                let ty = InterpolationType::from_name(&ty.name).ok_or_else(|| {
                    SyntaxError::new(format!("unknown interpolation type '{}'", ty.name), ty.span)
                })?;
                let sampling = sampling
                    .map(|s| {
                        InterpolationSampling::from_name(&s.name).ok_or_else(|| {
                            SyntaxError::new(
                                format!("unknown interpolation sampling '{}'", s.name),
                                s.span,
                            )
                        })
                    })
                    .transpose()?;
                AttributeKind::Interpolate(ty, sampling)
            }
            _ => {
                return Err(SyntaxError::new(
                    format!("unknown attribute '@{name}'"),
                    start.until(name_span),
                ));
            }
        };
        Ok(Attribute {
            kind,
            span: start.until(self.previous_span()),
        })
    }

    fn single_argument(&mut self, name: &str) -> PResult<Handle<Expression>> {
        self.expect(&TokenKind::LParen, &format!("'(' after @{name}"))?;
        let start = self.previous_span();
        let args = self.comma_list(&TokenKind::RParen, "')'", |p| p.expression())?;
        match args.as_slice() {
            [arg] => Ok(*arg),
            _ => Err(SyntaxError::new(
                format!("@{name} takes exactly one argument"),
                start.until(self.previous_span()),
            )),
        }
    }

    fn identifier_arguments(&mut self, name: &str) -> PResult<Vec<Ident>> {
        self.expect(&TokenKind::LParen, &format!("'(' after @{name}"))?;
        self.comma_list(&TokenKind::RParen, "')'", |p| p.expect_ident("an identifier"))
    }
}

#[cfg(test)]
mod tests {
    use weft_ast::{Configuration, ErrorKind};

    use super::*;

    fn parse(source: &str) -> Result<ShaderModule, weft_ast::Error> {
        crate::parse(source, Configuration::default())
    }

    #[test]
    fn empty_module() {
        let module = parse("").unwrap();
        assert!(module.declarations.is_empty());
    }

    #[test]
    fn enable_directives() {
        let module = parse("enable f16;\nconst x = 1h;").unwrap();
        assert_eq!(module.enables.len(), 1);
        assert_eq!(module.enables[0].name, "f16");
    }

    #[test]
    fn late_enable_is_an_error() {
        let err = parse("const x = 1;\nenable f16;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.contains("before any declaration"));
    }

    #[test]
    fn module_scope_declarations() {
        let module = parse(
            "const a: u32 = 4u;
             override b = 1.0;
             @group(0) @binding(1) var<storage, read_write> buf: array<f32>;
             struct S { x: f32, @align(16) y: vec3<f32>, }
             alias V = vec4<f32>;
             fn f() {}",
        )
        .unwrap();
        assert_eq!(module.declarations.len(), 6);
        let kinds: Vec<_> = module
            .declarations
            .iter()
            .map(|d| match d {
                Declaration::Constant(_) => "constant",
                Declaration::Variable(_) => "variable",
                Declaration::Struct(_) => "struct",
                Declaration::Alias(_) => "alias",
                Declaration::Function(_) => "function",
            })
            .collect();
        assert_eq!(
            kinds,
            ["constant", "constant", "variable", "struct", "alias", "function"]
        );
        let (_, var) = module.global_variables.iter().next().unwrap();
        assert_eq!(var.address_space.as_ref().unwrap().name, "storage");
        assert_eq!(var.access_mode.as_ref().unwrap().name, "read_write");
        assert_eq!(var.attributes.len(), 2);
        let (_, s) = module.structs.iter().next().unwrap();
        assert_eq!(s.members.len(), 2);
        assert!(matches!(s.members[1].attributes[0].kind, AttributeKind::Align(_)));
    }

    #[test]
    fn entry_point_attributes() {
        let module = parse(
            "@compute @workgroup_size(8, 8)
             fn main(@builtin(global_invocation_id) id: vec3<u32>) {}
             @fragment fn fs(@location(0) @interpolate(flat) v: u32) -> @location(0) vec4f {
                 return vec4f();
             }",
        )
        .unwrap();
        let (_, main) = module.functions.iter().next().unwrap();
        assert_eq!(main.stage(), Some(weft_ast::ShaderStage::Compute));
        assert_eq!(main.workgroup_size().map(|d| d.len()), Some(2));
        assert!(matches!(
            main.parameters[0].attributes[0].kind,
            AttributeKind::Builtin(BuiltinValue::GlobalInvocationId)
        ));
        let fs = module.functions.iter().nth(1).unwrap().1;
        assert_eq!(fs.parameters[0].attributes.len(), 2);
        assert!(fs.result.as_ref().unwrap().attributes.len() == 1);
    }

    #[test]
    fn unknown_attribute() {
        let err = parse("@banana fn f() {}").unwrap_err();
        assert_eq!(err.message, "unknown attribute '@banana'");
        assert_eq!(err.span, Span::new(0, 7));
    }

    #[test]
    fn attributes_on_const_are_rejected() {
        let err = parse("@id(1) const x = 1;").unwrap_err();
        assert!(err.message.contains("not allowed on const"));
    }

    #[test]
    fn missing_semicolon_reports_location() {
        let err = parse("const x = 1\nconst y = 2;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.starts_with("expected ';'"), "{}", err.message);
    }

    #[test]
    fn reserved_identifier() {
        let err = parse("const __x = 1;").unwrap_err();
        assert!(err.message.contains("'__'"));
    }

    #[test]
    fn empty_struct_is_rejected() {
        let err = parse("struct S {}").unwrap_err();
        assert!(err.message.contains("at least one member"));
    }
}
