//! Recursive-descent parser for the Mython token stream.
//!
//! The lexer pre-materializes the full token vector; the parser owns the
//! cursor over it. Class definitions are materialized immediately into
//! `runtime::Class` values and recorded in a name table so that parent
//! classes and construction sites resolve against classes already defined
//! earlier in the program.

pub mod error;

pub use self::error::{ParseError, ParseResult};

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{BinaryOperator, Expression, Program, Statement};
use crate::lexer::{Span, Token, TokenKind};
use crate::runtime::{Class, Method};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    current: Token,
    classes: HashMap<String, Rc<Class>>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, Span::default()));
        }
        let current = tokens[0].clone();
        Self {
            tokens,
            pos: 0,
            current,
            classes: HashMap::new(),
        }
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::Eof) {
            if self.consume_newlines() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current.kind {
            TokenKind::Class => self.parse_class_definition(),
            TokenKind::If => self.parse_if(),
            TokenKind::Print => self.parse_print(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Id(_) => self.parse_assignment_or_expression(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect_newline()?;
                Ok(Statement::Expr(expr))
            }
        }
    }

    fn parse_class_definition(&mut self) -> ParseResult<Statement> {
        self.advance();
        let name = self.expect_id()?;

        let parent = if matches!(self.current.kind, TokenKind::Char('(')) {
            self.advance();
            let parent_span = self.current.span;
            let parent_name = self.expect_id()?;
            self.expect_char(')')?;
            let parent =
                self.classes
                    .get(&parent_name)
                    .cloned()
                    .ok_or(ParseError::UnknownClass {
                        name: parent_name,
                        line: parent_span.line,
                        column: parent_span.column,
                    })?;
            Some(parent)
        } else {
            None
        };

        self.expect_char(':')?;
        self.expect_newline()?;
        self.expect_indent()?;

        let mut methods = Vec::new();
        while matches!(self.current.kind, TokenKind::Def) {
            methods.push(self.parse_method()?);
        }
        if methods.is_empty() {
            return Err(self.error("'def'"));
        }
        self.expect_dedent()?;

        let class = Rc::new(Class::new(name.clone(), methods, parent));
        self.classes.insert(name, Rc::clone(&class));
        Ok(Statement::ClassDefinition(class))
    }

    fn parse_method(&mut self) -> ParseResult<Method> {
        self.advance();
        let name = self.expect_id()?;
        self.expect_char('(')?;

        let mut formal_params = Vec::new();
        if matches!(self.current.kind, TokenKind::Id(_)) {
            formal_params.push(self.expect_id()?);
            while matches!(self.current.kind, TokenKind::Char(',')) {
                self.advance();
                formal_params.push(self.expect_id()?);
            }
        }
        self.expect_char(')')?;
        self.expect_char(':')?;

        let body = self.parse_suite()?;
        Ok(Method {
            name,
            formal_params,
            body,
        })
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.advance();
        let condition = self.parse_expression()?;
        self.expect_char(':')?;
        let then_body = self.parse_suite()?;

        let else_body = if matches!(self.current.kind, TokenKind::Else) {
            self.advance();
            self.expect_char(':')?;
            self.parse_suite()?
        } else {
            Vec::new()
        };

        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_suite(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect_newline()?;
        self.expect_indent()?;

        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::Dedent | TokenKind::Eof) {
            if self.consume_newlines() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        self.expect_dedent()?;
        Ok(statements)
    }

    fn parse_print(&mut self) -> ParseResult<Statement> {
        self.advance();
        if matches!(self.current.kind, TokenKind::Newline) {
            self.advance();
            return Ok(Statement::Print(Vec::new()));
        }

        let mut args = vec![self.parse_expression()?];
        while matches!(self.current.kind, TokenKind::Char(',')) {
            self.advance();
            args.push(self.parse_expression()?);
        }
        self.expect_newline()?;
        Ok(Statement::Print(args))
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        self.advance();
        let value = self.parse_expression()?;
        self.expect_newline()?;
        Ok(Statement::Return(value))
    }

    /// A statement beginning with an identifier is either an assignment
    /// through a dotted lvalue or an expression statement. The dotted
    /// prefix is scanned first; when no `=` follows, the cursor rewinds
    /// and the whole line reparses as an expression.
    fn parse_assignment_or_expression(&mut self) -> ParseResult<Statement> {
        let snapshot = self.pos;
        let mut path = vec![self.expect_id()?];
        while matches!(self.current.kind, TokenKind::Char('.'))
            && matches!(self.peek_kind(), TokenKind::Id(_))
        {
            self.advance();
            path.push(self.expect_id()?);
        }

        if !matches!(self.current.kind, TokenKind::Char('=')) {
            self.rewind(snapshot);
            let expr = self.parse_expression()?;
            self.expect_newline()?;
            return Ok(Statement::Expr(expr));
        }

        self.advance();
        let value = self.parse_expression()?;
        self.expect_newline()?;

        let field = match path.pop() {
            Some(field) => field,
            None => return Err(self.error("identifier")),
        };
        if path.is_empty() {
            Ok(Statement::Assignment { name: field, value })
        } else {
            Ok(Statement::FieldAssignment {
                object: path,
                field,
                value,
            })
        }
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_and()?;
        while matches!(self.current.kind, TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            expr = binary(expr, BinaryOperator::Or, right);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_not()?;
        while matches!(self.current.kind, TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            expr = binary(expr, BinaryOperator::And, right);
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> ParseResult<Expression> {
        if matches!(self.current.kind, TokenKind::Not) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expression::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    /// Comparisons are non-associative: at most one relational operator per
    /// expression level.
    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let left = self.parse_additive()?;
        let op = match self.current.kind {
            TokenKind::Eq => BinaryOperator::Equal,
            TokenKind::NotEq => BinaryOperator::NotEqual,
            TokenKind::Char('<') => BinaryOperator::Less,
            TokenKind::Char('>') => BinaryOperator::Greater,
            TokenKind::LessOrEq => BinaryOperator::LessOrEqual,
            TokenKind::GreaterOrEq => BinaryOperator::GreaterOrEqual,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(binary(left, op, right))
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Char('+') => BinaryOperator::Add,
                TokenKind::Char('-') => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Char('*') => BinaryOperator::Mult,
                TokenKind::Char('/') => BinaryOperator::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if matches!(self.current.kind, TokenKind::Char('-')) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(binary(Expression::Number(0), BinaryOperator::Sub, operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match &self.current.kind {
            TokenKind::Number(value) => {
                let value = *value;
                self.advance();
                Ok(Expression::Number(value))
            }
            TokenKind::String(value) => {
                let value = value.clone();
                self.advance();
                Ok(Expression::String(value))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Boolean(false))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expression::None)
            }
            TokenKind::Char('(') => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_char(')')?;
                Ok(expr)
            }
            TokenKind::Id(_) => self.parse_name_expression(),
            _ => Err(self.error("expression")),
        }
    }

    fn parse_name_expression(&mut self) -> ParseResult<Expression> {
        let name_span = self.current.span;
        let first = self.expect_id()?;

        if first == "str" && matches!(self.current.kind, TokenKind::Char('(')) {
            self.advance();
            let argument = self.parse_expression()?;
            self.expect_char(')')?;
            return Ok(Expression::Stringify(Box::new(argument)));
        }

        let mut path = vec![first];
        while matches!(self.current.kind, TokenKind::Char('.'))
            && matches!(self.peek_kind(), TokenKind::Id(_))
        {
            self.advance();
            path.push(self.expect_id()?);
        }

        if !matches!(self.current.kind, TokenKind::Char('(')) {
            return Ok(Expression::Variable(path));
        }

        // Call position: a single name constructs a class instance, a
        // dotted path calls a method on the path prefix.
        let args = self.parse_call_args()?;
        let mut expr = match path.pop() {
            Some(method) if !path.is_empty() => Expression::MethodCall {
                object: Box::new(Expression::Variable(path)),
                method,
                args,
            },
            Some(class_name) => {
                let class =
                    self.classes
                        .get(&class_name)
                        .cloned()
                        .ok_or(ParseError::UnknownClass {
                            name: class_name,
                            line: name_span.line,
                            column: name_span.column,
                        })?;
                Expression::NewInstance { class, args }
            }
            None => return Err(self.error("identifier")),
        };

        // Only further method calls may follow a call result.
        while matches!(self.current.kind, TokenKind::Char('.')) {
            self.advance();
            let method = self.expect_id()?;
            let args = self.parse_call_args()?;
            expr = Expression::MethodCall {
                object: Box::new(expr),
                method,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> ParseResult<Vec<Expression>> {
        self.expect_char('(')?;
        let mut args = Vec::new();
        if !matches!(self.current.kind, TokenKind::Char(')')) {
            args.push(self.parse_expression()?);
            while matches!(self.current.kind, TokenKind::Char(',')) {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }
        self.expect_char(')')?;
        Ok(args)
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while matches!(self.current.kind, TokenKind::Newline) {
            consumed = true;
            self.advance();
        }
        consumed
    }

    fn expect_id(&mut self) -> ParseResult<String> {
        if let TokenKind::Id(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect_char(&mut self, expected: char) -> ParseResult<()> {
        if matches!(self.current.kind, TokenKind::Char(c) if c == expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("'{expected}'")))
        }
    }

    fn expect_newline(&mut self) -> ParseResult<()> {
        if matches!(self.current.kind, TokenKind::Newline) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("newline"))
        }
    }

    fn expect_indent(&mut self) -> ParseResult<()> {
        if matches!(self.current.kind, TokenKind::Indent) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("indent"))
        }
    }

    fn expect_dedent(&mut self) -> ParseResult<()> {
        if matches!(self.current.kind, TokenKind::Dedent) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("dedent"))
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
        self.current = self
            .tokens
            .get(self.pos)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, Span::default()));
    }

    fn rewind(&mut self, pos: usize) {
        self.pos = pos;
        self.current = self
            .tokens
            .get(pos)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, Span::default()));
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|token| token.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    fn error(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: format!("{:?}", self.current.kind),
            line: self.current.span.line,
            column: self.current.span.column,
        }
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<Program> {
    Parser::new(tokens).parse_program()
}
