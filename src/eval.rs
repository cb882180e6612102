// SPDX-License-Identifier: Unlicense
//! Tree-walking evaluator over the AST.
//!
//! Addition, subtraction, multiplication and negation wrap on overflow like
//! the generated native code does. Division and modulo report the cases that
//! trap natively.
use crate::ast::{self, Arena, BinaryOperator, Node, NodeId, UnaryOperator};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    DivisionByZero,
    /// `i64::MIN / -1` or `i64::MIN % -1`.
    Overflow,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::DivisionByZero => f.write_str("division by zero"),
            EvalError::Overflow => f.write_str("integer overflow in division"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Evaluates the tree under `id` bottom-up over its post-order walk.
pub fn evaluate(arena: &Arena, id: NodeId) -> Result<i64, EvalError> {
    let mut values = Vec::new();
    for node in ast::post_order(arena, id) {
        let value = match arena[node] {
            Node::Number { value } => value,
            Node::UnaryOp {
                operator: UnaryOperator::Negate,
                ..
            } => pop(&mut values).wrapping_neg(),
            Node::BinaryOp { operator, .. } => {
                let right = pop(&mut values);
                let left = pop(&mut values);
                apply(operator, left, right)?
            }
            Node::Function { .. } => pop(&mut values),
        };
        values.push(value);
    }
    Ok(pop(&mut values))
}

// A post-order walk always yields an operand before its operator.
fn pop(values: &mut Vec<i64>) -> i64 {
    match values.pop() {
        Some(value) => value,
        None => unreachable!("operand stack underflow"),
    }
}

/// Evaluates a parsed program; an empty program has no value.
pub fn evaluate_program(arena: &Arena, root: Option<NodeId>) -> Result<Option<i64>, EvalError> {
    root.map(|root| evaluate(arena, root)).transpose()
}

fn apply(operator: BinaryOperator, left: i64, right: i64) -> Result<i64, EvalError> {
    match operator {
        BinaryOperator::Add => Ok(left.wrapping_add(right)),
        BinaryOperator::Subtract => Ok(left.wrapping_sub(right)),
        BinaryOperator::Multiply => Ok(left.wrapping_mul(right)),
        BinaryOperator::Divide | BinaryOperator::Modulo if right == 0 => {
            Err(EvalError::DivisionByZero)
        }
        BinaryOperator::Divide => left.checked_div(right).ok_or(EvalError::Overflow),
        BinaryOperator::Modulo => left.checked_rem(right).ok_or(EvalError::Overflow),
    }
}
