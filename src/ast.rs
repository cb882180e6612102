// SPDX-License-Identifier: Unlicense
use crate::lexer::TokenKind;
use std::fmt;

pub use crate::arena::{Arena, ArenaError, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub const ALL: [BinaryOperator; 5] = [
        BinaryOperator::Add,
        BinaryOperator::Subtract,
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
        BinaryOperator::Modulo,
    ];

    /// Binding strength; higher binds tighter. All operators are
    /// left-associative.
    pub const fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Subtract => 1,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 2,
        }
    }

    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Subtract),
            TokenKind::Asterisk => Some(BinaryOperator::Multiply),
            TokenKind::Slash => Some(BinaryOperator::Divide),
            TokenKind::Percent => Some(BinaryOperator::Modulo),
            _ => None,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node<'src> {
    Number {
        value: i64,
    },
    UnaryOp {
        operator: UnaryOperator,
        operand: NodeId,
    },
    BinaryOp {
        operator: BinaryOperator,
        left: NodeId,
        right: NodeId,
    },
    /// The single function of a compilation unit, wrapping one expression.
    Function {
        name: &'src str,
        body: NodeId,
    },
}

impl<'src> Node<'src> {
    pub fn for_each_child(&self, mut f: impl FnMut(NodeId)) {
        match *self {
            Node::Number { .. } => {}
            Node::UnaryOp { operand, .. } => f(operand),
            Node::BinaryOp { left, right, .. } => {
                f(left);
                f(right);
            }
            Node::Function { body, .. } => f(body),
        }
    }
}

/// Nodes under `root` with children before parents, left before right.
///
/// Walks with an explicit stack so arbitrarily long operator chains do not
/// exhaust the call stack.
pub fn post_order(arena: &Arena, root: NodeId) -> Vec<NodeId> {
    let mut stack = vec![root];
    let mut order = Vec::new();
    while let Some(id) = stack.pop() {
        order.push(id);
        arena[id].for_each_child(|child| stack.push(child));
    }
    order.reverse();
    order
}

/// Renders the tree under `root` as an s-expression, e.g. `(fn f (+ 2 (* 3 4)))`.
pub fn to_sexpr(arena: &Arena, root: NodeId) -> String {
    Sexpr { arena, root }.to_string()
}

struct Sexpr<'a, 'src> {
    arena: &'a Arena<'src>,
    root: NodeId,
}

enum Piece {
    Node(NodeId),
    Text(&'static str),
}

impl fmt::Display for Sexpr<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = vec![Piece::Node(self.root)];
        while let Some(piece) = pending.pop() {
            let id = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(id) => id,
            };
            match self.arena[id] {
                Node::Number { value } => write!(f, "{value}")?,
                Node::UnaryOp {
                    operator: UnaryOperator::Negate,
                    operand,
                } => {
                    f.write_str("(neg ")?;
                    pending.extend([Piece::Text(")"), Piece::Node(operand)]);
                }
                Node::BinaryOp {
                    operator,
                    left,
                    right,
                } => {
                    write!(f, "({} ", operator.symbol())?;
                    pending.extend([
                        Piece::Text(")"),
                        Piece::Node(right),
                        Piece::Text(" "),
                        Piece::Node(left),
                    ]);
                }
                Node::Function { name, body } => {
                    write!(f, "(fn {name} ")?;
                    pending.extend([Piece::Text(")"), Piece::Node(body)]);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplicative_operators_should_bind_tighter() {
        for op in BinaryOperator::ALL {
            let expected = match op {
                BinaryOperator::Add | BinaryOperator::Subtract => 1,
                _ => 2,
            };
            assert_eq!(op.precedence(), expected, "{op:?}");
        }
    }

    #[test]
    fn every_operator_token_should_map_back() {
        for op in BinaryOperator::ALL {
            let kind = match op.symbol() {
                "+" => TokenKind::Plus,
                "-" => TokenKind::Minus,
                "*" => TokenKind::Asterisk,
                "/" => TokenKind::Slash,
                _ => TokenKind::Percent,
            };
            assert_eq!(BinaryOperator::from_token(kind), Some(op));
        }
        assert_eq!(BinaryOperator::from_token(TokenKind::CloseBrace), None);
    }

    #[test]
    fn sexpr_should_render_nested_nodes() -> Result<(), ArenaError> {
        let mut arena = Arena::new();
        let five = arena.alloc(Node::Number { value: 5 })?;
        let neg = arena.alloc(Node::UnaryOp {
            operator: UnaryOperator::Negate,
            operand: five,
        })?;
        let two = arena.alloc(Node::Number { value: 2 })?;
        let sub = arena.alloc(Node::BinaryOp {
            operator: BinaryOperator::Subtract,
            left: neg,
            right: two,
        })?;
        let f = arena.alloc(Node::Function {
            name: "main",
            body: sub,
        })?;
        assert_eq!(to_sexpr(&arena, f), "(fn main (- (neg 5) 2))");
        assert_eq!(post_order(&arena, f), vec![five, neg, two, sub, f]);
        Ok(())
    }

    #[test]
    fn sexpr_should_render_long_chains() -> Result<(), ArenaError> {
        let mut arena = Arena::new();
        let mut left = arena.alloc(Node::Number { value: 1 })?;
        for _ in 0..200_000 {
            let right = arena.alloc(Node::Number { value: 1 })?;
            left = arena.alloc(Node::BinaryOp {
                operator: BinaryOperator::Add,
                left,
                right,
            })?;
        }
        let rendered = to_sexpr(&arena, left);
        assert!(rendered.starts_with("(+ (+ (+ "));
        assert!(rendered.ends_with(" 1) 1)"));
        assert_eq!(rendered.matches('(').count(), 200_000);
        assert_eq!(post_order(&arena, left).len(), 400_001);
        Ok(())
    }
}
