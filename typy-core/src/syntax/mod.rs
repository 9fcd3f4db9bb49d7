//! Concrete syntax trees and the cursor interface used to walk them.
//!
//! The builder never looks at tokens or grammar rules. It only walks a
//! tree through [`TreeCursor`] and reads source text through node
//! spans. The tree shape follows the `lezer-python` grammar, so a
//! cursor over a tree produced by that grammar can drive the builder
//! just as well as the bundled [`parse`] front end.

pub mod lexer;
pub mod parser;

use std::fmt;

use crate::span::Span;

pub use parser::parse;

/// Keyword tokens that appear as leaves of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    Pass,
    Break,
    Continue,
    Not,
    And,
    Or,
    Is,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Def => "def",
            Keyword::Return => "return",
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Pass => "pass",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Not => "not",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Is => "is",
        }
    }
}

/// Node kinds of the concrete syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Script,
    Body,

    // Statements
    AssignStatement,
    ExpressionStatement,
    FunctionDefinition,
    ReturnStatement,
    IfStatement,
    WhileStatement,
    PassStatement,
    BreakStatement,
    ContinueStatement,

    // Statement parts
    ParamList,
    TypeDef,
    ArgList,

    // Expressions
    VariableName,
    Number,
    Boolean,
    None,
    String,
    CallExpression,
    BinaryExpression,
    UnaryExpression,
    ParenthesizedExpression,

    // Operator and punctuation leaves
    ArithOp,
    CompareOp,
    AssignOp,
    OpenParen,
    CloseParen,
    Colon,
    Comma,
    Arrow,
    Keyword(Keyword),
}

impl SyntaxKind {
    /// Node name as used by the `lezer-python` grammar.
    pub fn name(self) -> &'static str {
        match self {
            SyntaxKind::Script => "Script",
            SyntaxKind::Body => "Body",
            SyntaxKind::AssignStatement => "AssignStatement",
            SyntaxKind::ExpressionStatement => "ExpressionStatement",
            SyntaxKind::FunctionDefinition => "FunctionDefinition",
            SyntaxKind::ReturnStatement => "ReturnStatement",
            SyntaxKind::IfStatement => "IfStatement",
            SyntaxKind::WhileStatement => "WhileStatement",
            SyntaxKind::PassStatement => "PassStatement",
            SyntaxKind::BreakStatement => "BreakStatement",
            SyntaxKind::ContinueStatement => "ContinueStatement",
            SyntaxKind::ParamList => "ParamList",
            SyntaxKind::TypeDef => "TypeDef",
            SyntaxKind::ArgList => "ArgList",
            SyntaxKind::VariableName => "VariableName",
            SyntaxKind::Number => "Number",
            SyntaxKind::Boolean => "Boolean",
            SyntaxKind::None => "None",
            SyntaxKind::String => "String",
            SyntaxKind::CallExpression => "CallExpression",
            SyntaxKind::BinaryExpression => "BinaryExpression",
            SyntaxKind::UnaryExpression => "UnaryExpression",
            SyntaxKind::ParenthesizedExpression => "ParenthesizedExpression",
            SyntaxKind::ArithOp => "ArithOp",
            SyntaxKind::CompareOp => "CompareOp",
            SyntaxKind::AssignOp => "AssignOp",
            SyntaxKind::OpenParen => "(",
            SyntaxKind::CloseParen => ")",
            SyntaxKind::Colon => ":",
            SyntaxKind::Comma => ",",
            SyntaxKind::Arrow => "->",
            SyntaxKind::Keyword(keyword) => keyword.as_str(),
        }
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cursor-style access to a concrete syntax tree.
///
/// Movement methods return `false` and leave the cursor where it was
/// when the requested node does not exist.
pub trait TreeCursor {
    fn kind(&self) -> SyntaxKind;
    fn span(&self) -> Span;
    fn first_child(&mut self) -> bool;
    fn next_sibling(&mut self) -> bool;
    fn parent(&mut self) -> bool;
}

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    kind: SyntaxKind,
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SyntaxNode {
    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Arena-backed concrete syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        SyntaxTree::default()
    }

    /// Add a leaf node.
    pub fn leaf(&mut self, kind: SyntaxKind, span: Span) -> NodeId {
        self.node(kind, span, Vec::new())
    }

    /// Add an interior node adopting `children`, which must not already
    /// have a parent.
    pub fn node(&mut self, kind: SyntaxKind, span: Span, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        for child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(SyntaxNode {
            kind,
            span,
            parent: None,
            children,
        });
        id
    }

    /// Add an interior node whose span covers all of `children`.
    pub fn wrap(&mut self, kind: SyntaxKind, children: Vec<NodeId>) -> NodeId {
        let span = children
            .iter()
            .map(|child| self.nodes[child.0].span)
            .reduce(Span::cover)
            .unwrap_or_default();
        self.node(kind, span, children)
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Cursor focused on the root node.
    ///
    /// # Panics
    ///
    /// Panics if no root has been set.
    pub fn cursor(&self) -> SyntaxCursor<'_> {
        let root = self.root.expect("syntax tree has no root");
        SyntaxCursor { tree: self, node: root }
    }

    /// Cursor focused on an arbitrary node.
    pub fn cursor_at(&self, node: NodeId) -> SyntaxCursor<'_> {
        SyntaxCursor { tree: self, node }
    }
}

/// [`TreeCursor`] over a [`SyntaxTree`].
#[derive(Debug, Clone, Copy)]
pub struct SyntaxCursor<'t> {
    tree: &'t SyntaxTree,
    node: NodeId,
}

impl SyntaxCursor<'_> {
    /// The node currently in focus.
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl TreeCursor for SyntaxCursor<'_> {
    fn kind(&self) -> SyntaxKind {
        self.tree.get(self.node).kind
    }

    fn span(&self) -> Span {
        self.tree.get(self.node).span
    }

    fn first_child(&mut self) -> bool {
        match self.tree.get(self.node).children.first() {
            Some(&child) => {
                self.node = child;
                true
            }
            None => false,
        }
    }

    fn next_sibling(&mut self) -> bool {
        let Some(parent) = self.tree.get(self.node).parent else {
            return false;
        };
        let siblings = &self.tree.get(parent).children;
        let position = siblings.iter().position(|&id| id == self.node);
        match position.and_then(|index| siblings.get(index + 1)) {
            Some(&next) => {
                self.node = next;
                true
            }
            None => false,
        }
    }

    fn parent(&mut self) -> bool {
        match self.tree.get(self.node).parent {
            Some(parent) => {
                self.node = parent;
                true
            }
            None => false,
        }
    }
}
