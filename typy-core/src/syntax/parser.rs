//! Recursive-descent parser producing a `lezer-python` shaped tree.
//!
//! The parser is deliberately permissive about what it accepts: it
//! builds nodes for constructs such as strings, `break` or `**` that
//! the compiler does not support, and leaves rejecting them to the
//! builder.

use crate::error::SyntaxError;
use crate::span::Span;
use crate::syntax::lexer::{Token, TokenKind, lex};
use crate::syntax::{Keyword, NodeId, SyntaxKind, SyntaxTree};

/// How deeply expressions and compound statements may nest in source.
pub const MAX_NESTING: usize = 200;

/// Parse a whole program into a tree rooted at a `Script` node.
pub fn parse(source: &str) -> Result<SyntaxTree, SyntaxError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        position: 0,
        depth: 0,
        tree: SyntaxTree::new(),
    };
    let root = parser.parse_script(source.len())?;
    parser.tree.set_root(root);
    Ok(parser.tree)
}

struct Parser<'t> {
    tokens: &'t [Token],
    position: usize,
    /// Open nesting levels, bounded by [`MAX_NESTING`].
    depth: usize,
    tree: SyntaxTree,
}

impl<'t> Parser<'t> {
    fn parse_script(&mut self, len: usize) -> Result<NodeId, SyntaxError> {
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.bump();
                }
                _ => statements.push(self.parse_statement()?),
            }
        }
        Ok(self
            .tree
            .node(SyntaxKind::Script, Span::new(0, len), statements))
    }

    fn parse_statement(&mut self) -> Result<NodeId, SyntaxError> {
        match self.peek() {
            TokenKind::Def => self.nested(Self::parse_function),
            TokenKind::If => self.nested(Self::parse_if),
            TokenKind::While => self.nested(Self::parse_while),
            _ => {
                let statement = self.parse_simple_statement()?;
                self.expect(TokenKind::Newline, "expected end of line")?;
                Ok(statement)
            }
        }
    }

    fn parse_simple_statement(&mut self) -> Result<NodeId, SyntaxError> {
        match self.peek() {
            TokenKind::Pass => {
                let kw = self.keyword(Keyword::Pass);
                Ok(self.tree.wrap(SyntaxKind::PassStatement, vec![kw]))
            }
            TokenKind::Break => {
                let kw = self.keyword(Keyword::Break);
                Ok(self.tree.wrap(SyntaxKind::BreakStatement, vec![kw]))
            }
            TokenKind::Continue => {
                let kw = self.keyword(Keyword::Continue);
                Ok(self.tree.wrap(SyntaxKind::ContinueStatement, vec![kw]))
            }
            TokenKind::Return => {
                let mut children = vec![self.keyword(Keyword::Return)];
                if self.peek() != TokenKind::Newline {
                    children.push(self.parse_expression()?);
                }
                Ok(self.tree.wrap(SyntaxKind::ReturnStatement, children))
            }
            TokenKind::Name if self.peek_at(1) == TokenKind::Assign => {
                let name = self.leaf(SyntaxKind::VariableName);
                let op = self.leaf(SyntaxKind::AssignOp);
                let value = self.parse_expression()?;
                Ok(self
                    .tree
                    .wrap(SyntaxKind::AssignStatement, vec![name, op, value]))
            }
            _ => {
                let expr = self.parse_expression()?;
                Ok(self.tree.wrap(SyntaxKind::ExpressionStatement, vec![expr]))
            }
        }
    }

    fn parse_function(&mut self) -> Result<NodeId, SyntaxError> {
        let mut children = vec![self.keyword(Keyword::Def)];
        self.check(TokenKind::Name, "expected function name")?;
        children.push(self.leaf(SyntaxKind::VariableName));
        children.push(self.parse_param_list()?);
        if self.peek() == TokenKind::Arrow {
            let arrow = self.leaf(SyntaxKind::Arrow);
            let ty = self.parse_type_name()?;
            children.push(self.tree.wrap(SyntaxKind::TypeDef, vec![arrow, ty]));
        }
        children.push(self.parse_body()?);
        Ok(self.tree.wrap(SyntaxKind::FunctionDefinition, children))
    }

    fn parse_param_list(&mut self) -> Result<NodeId, SyntaxError> {
        self.check(TokenKind::LParen, "expected '(' after function name")?;
        let mut children = vec![self.leaf(SyntaxKind::OpenParen)];
        while self.peek() != TokenKind::RParen {
            self.check(TokenKind::Name, "expected parameter name")?;
            children.push(self.leaf(SyntaxKind::VariableName));
            if self.peek() == TokenKind::Colon {
                let colon = self.leaf(SyntaxKind::Colon);
                let ty = self.parse_type_name()?;
                children.push(self.tree.wrap(SyntaxKind::TypeDef, vec![colon, ty]));
            }
            if self.peek() == TokenKind::Comma {
                children.push(self.leaf(SyntaxKind::Comma));
            } else {
                break;
            }
        }
        self.check(TokenKind::RParen, "expected ')' after parameters")?;
        children.push(self.leaf(SyntaxKind::CloseParen));
        Ok(self.tree.wrap(SyntaxKind::ParamList, children))
    }

    fn parse_type_name(&mut self) -> Result<NodeId, SyntaxError> {
        match self.peek() {
            TokenKind::Name => Ok(self.leaf(SyntaxKind::VariableName)),
            TokenKind::None => Ok(self.leaf(SyntaxKind::None)),
            _ => Err(self.error("expected a type name")),
        }
    }

    /// `: simple_statement NEWLINE` or `: NEWLINE INDENT statement+ DEDENT`.
    fn parse_body(&mut self) -> Result<NodeId, SyntaxError> {
        self.check(TokenKind::Colon, "expected ':'")?;
        let mut children = vec![self.leaf(SyntaxKind::Colon)];
        if self.peek() == TokenKind::Newline {
            self.bump();
            self.expect(TokenKind::Indent, "expected an indented block")?;
            while !matches!(self.peek(), TokenKind::Dedent | TokenKind::Eof) {
                children.push(self.parse_statement()?);
            }
            self.expect(TokenKind::Dedent, "expected end of block")?;
        } else {
            children.push(self.parse_simple_statement()?);
            self.expect(TokenKind::Newline, "expected end of line")?;
        }
        Ok(self.tree.wrap(SyntaxKind::Body, children))
    }

    fn parse_if(&mut self) -> Result<NodeId, SyntaxError> {
        let mut children = vec![self.keyword(Keyword::If)];
        children.push(self.parse_expression()?);
        children.push(self.parse_body()?);
        while self.peek() == TokenKind::Elif {
            children.push(self.keyword(Keyword::Elif));
            children.push(self.parse_expression()?);
            children.push(self.parse_body()?);
        }
        if self.peek() == TokenKind::Else {
            children.push(self.keyword(Keyword::Else));
            children.push(self.parse_body()?);
        }
        Ok(self.tree.wrap(SyntaxKind::IfStatement, children))
    }

    fn parse_while(&mut self) -> Result<NodeId, SyntaxError> {
        let kw = self.keyword(Keyword::While);
        let condition = self.parse_expression()?;
        let body = self.parse_body()?;
        Ok(self
            .tree
            .wrap(SyntaxKind::WhileStatement, vec![kw, condition, body]))
    }

    fn parse_expression(&mut self) -> Result<NodeId, SyntaxError> {
        self.nested(Self::parse_or)
    }

    fn parse_or(&mut self) -> Result<NodeId, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.peek() == TokenKind::Or {
            let op = self.keyword(Keyword::Or);
            let right = self.parse_and()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<NodeId, SyntaxError> {
        let mut left = self.parse_not()?;
        while self.peek() == TokenKind::And {
            let op = self.keyword(Keyword::And);
            let right = self.parse_not()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<NodeId, SyntaxError> {
        if self.peek() == TokenKind::Not {
            let op = self.keyword(Keyword::Not);
            let operand = self.nested(Self::parse_not)?;
            return Ok(self.tree.wrap(SyntaxKind::UnaryExpression, vec![op, operand]));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<NodeId, SyntaxError> {
        let mut left = self.parse_arith()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::Less
                | TokenKind::Greater
                | TokenKind::LessEq
                | TokenKind::GreaterEq => self.leaf(SyntaxKind::CompareOp),
                TokenKind::Is => self.keyword(Keyword::Is),
                _ => return Ok(left),
            };
            let right = self.parse_arith()?;
            left = self.binary(left, op, right);
        }
    }

    fn parse_arith(&mut self) -> Result<NodeId, SyntaxError> {
        let mut left = self.parse_term()?;
        while matches!(self.peek(), TokenKind::Plus | TokenKind::Minus) {
            let op = self.leaf(SyntaxKind::ArithOp);
            let right = self.parse_term()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<NodeId, SyntaxError> {
        let mut left = self.parse_factor()?;
        while matches!(
            self.peek(),
            TokenKind::Star | TokenKind::Slash | TokenKind::DoubleSlash | TokenKind::Percent
        ) {
            let op = self.leaf(SyntaxKind::ArithOp);
            let right = self.parse_factor()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<NodeId, SyntaxError> {
        if matches!(self.peek(), TokenKind::Plus | TokenKind::Minus) {
            let op = self.leaf(SyntaxKind::ArithOp);
            let operand = self.nested(Self::parse_factor)?;
            return Ok(self.tree.wrap(SyntaxKind::UnaryExpression, vec![op, operand]));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<NodeId, SyntaxError> {
        let base = self.parse_call()?;
        if self.peek() == TokenKind::DoubleStar {
            let op = self.leaf(SyntaxKind::ArithOp);
            let exponent = self.nested(Self::parse_factor)?;
            return Ok(self.binary(base, op, exponent));
        }
        Ok(base)
    }

    fn parse_call(&mut self) -> Result<NodeId, SyntaxError> {
        let mut callee = self.parse_atom()?;
        while self.peek() == TokenKind::LParen {
            let args = self.parse_arg_list()?;
            callee = self.tree.wrap(SyntaxKind::CallExpression, vec![callee, args]);
        }
        Ok(callee)
    }

    fn parse_arg_list(&mut self) -> Result<NodeId, SyntaxError> {
        let mut children = vec![self.leaf(SyntaxKind::OpenParen)];
        while self.peek() != TokenKind::RParen {
            children.push(self.parse_expression()?);
            if self.peek() == TokenKind::Comma {
                children.push(self.leaf(SyntaxKind::Comma));
            } else {
                break;
            }
        }
        self.check(TokenKind::RParen, "expected ')' after arguments")?;
        children.push(self.leaf(SyntaxKind::CloseParen));
        Ok(self.tree.wrap(SyntaxKind::ArgList, children))
    }

    fn parse_atom(&mut self) -> Result<NodeId, SyntaxError> {
        match self.peek() {
            TokenKind::Name => Ok(self.leaf(SyntaxKind::VariableName)),
            TokenKind::Number => Ok(self.leaf(SyntaxKind::Number)),
            TokenKind::String => Ok(self.leaf(SyntaxKind::String)),
            TokenKind::True | TokenKind::False => Ok(self.leaf(SyntaxKind::Boolean)),
            TokenKind::None => Ok(self.leaf(SyntaxKind::None)),
            TokenKind::LParen => {
                let open = self.leaf(SyntaxKind::OpenParen);
                let inner = self.parse_expression()?;
                self.check(TokenKind::RParen, "expected ')'")?;
                let close = self.leaf(SyntaxKind::CloseParen);
                Ok(self
                    .tree
                    .wrap(SyntaxKind::ParenthesizedExpression, vec![open, inner, close]))
            }
            _ => Err(self.error("expected an expression")),
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("too many nested expressions or blocks"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn binary(&mut self, left: NodeId, op: NodeId, right: NodeId) -> NodeId {
        self.tree
            .wrap(SyntaxKind::BinaryExpression, vec![left, op, right])
    }

    /// Consume the current token as a leaf node of `kind`.
    fn leaf(&mut self, kind: SyntaxKind) -> NodeId {
        let span = self.current().span;
        self.bump();
        self.tree.leaf(kind, span)
    }

    fn keyword(&mut self, keyword: Keyword) -> NodeId {
        self.leaf(SyntaxKind::Keyword(keyword))
    }

    fn current(&self) -> Token {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens[self.position.min(last)]
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.position + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn bump(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn check(&self, kind: TokenKind, message: &str) -> Result<(), SyntaxError> {
        if self.peek() == kind {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    /// Consume a layout token that does not become a node.
    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<(), SyntaxError> {
        self.check(kind, message)?;
        self.bump();
        Ok(())
    }

    fn error(&self, message: &str) -> SyntaxError {
        SyntaxError::new(self.current().span.from, message)
    }
}
