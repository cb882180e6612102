// SPDX-License-Identifier: Unlicense
use crate::{ast, ir};
use anyhow::{anyhow, Result};

pub struct IrGen<'a, 'src> {
    ast_arena: &'a ast::Arena<'src>,
    ir_arena: ir::Arena,
}

impl<'a, 'src> IrGen<'a, 'src> {
    fn new(ast_arena: &'a ast::Arena<'src>) -> Self {
        Self {
            ast_arena,
            ir_arena: ir::Arena::new(),
        }
    }

    fn new_node(&mut self, kind: ir::Kind) -> ir::Id {
        self.ir_arena.alloc(ir::Node { kind })
    }

    fn map_binary_operator(operator: ast::BinaryOperator) -> ir::OpKind {
        match operator {
            ast::BinaryOperator::Add => ir::OpKind::IAdd,
            ast::BinaryOperator::Subtract => ir::OpKind::ISub,
            ast::BinaryOperator::Multiply => ir::OpKind::IMul,
            ast::BinaryOperator::Divide => ir::OpKind::IDiv,
            ast::BinaryOperator::Modulo => ir::OpKind::IRem,
        }
    }

    fn lower(&mut self, operands: &mut Vec<ir::Id>, node: ast::Node) -> ir::Id {
        match node {
            ast::Node::Number { value } => self.new_node(ir::Kind::IntValue(value)),
            ast::Node::UnaryOp {
                operator: ast::UnaryOperator::Negate,
                ..
            } => {
                let operand = operands.split_off(operands.len() - 1);
                self.new_node(ir::Kind::Op(ir::OpKind::INeg, operand))
            }
            ast::Node::BinaryOp { operator, .. } => {
                let op_kind = Self::map_binary_operator(operator);
                let lhs_and_rhs = operands.split_off(operands.len() - 2);
                self.new_node(ir::Kind::Op(op_kind, lhs_and_rhs))
            }
            ast::Node::Function { name, .. } => {
                let body = operands.split_off(operands.len() - 1);
                self.new_node(ir::Kind::Function(name.to_owned(), body[0]))
            }
        }
    }

    fn generate_impl(&mut self, root: ast::NodeId) -> Result<ir::Id> {
        // Children are older than their parents, so every node below an
        // allocated root is allocated too.
        self.ast_arena
            .get(root)
            .ok_or(anyhow!("failed to get ast node {} from arena", root))?;

        let mut operands = Vec::new();
        for id in ast::post_order(self.ast_arena, root) {
            let node = self.ast_arena[id];
            let ir = self.lower(&mut operands, node);
            operands.push(ir);
        }
        operands
            .pop()
            .ok_or(anyhow!("lowering ast node {} produced no value", root))
    }
}

pub fn generate(ast_arena: &ast::Arena, root: ast::NodeId) -> Result<(ir::Arena, ir::Id)> {
    let mut irgen = IrGen::new(ast_arena);
    let ir = irgen.generate_impl(root)?;
    log::debug!("lowered {} AST nodes into {} IR nodes", ast_arena.len(), irgen.ir_arena.len());
    Ok((irgen.ir_arena, ir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn irgen_should_lower_every_node_kind() -> Result<()> {
        let (ast_arena, root) = parse("fn calc() { -(7 % 4) + 6 / 2 }")?;
        let root = root.ok_or(anyhow!("expected a function"))?;
        let (ir_arena, ir_root) = generate(&ast_arena, root)?;

        assert_eq!(
            ir::dump(&ir_arena),
            "%0 = int 7\n\
             %1 = int 4\n\
             %2 = irem %0, %1\n\
             %3 = ineg %2\n\
             %4 = int 6\n\
             %5 = int 2\n\
             %6 = idiv %4, %5\n\
             %7 = iadd %3, %6\n\
             %8 = fn calc %7\n"
        );
        match &ir_arena[ir_root].kind {
            ir::Kind::Function(name, _) => assert_eq!(name, "calc"),
            other => panic!("expected a function, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn irgen_should_lower_long_chains() -> Result<()> {
        let terms = 200_000;
        let source = format!("fn f() {{ 1{} }}", " * -1".repeat(terms));
        let (ast_arena, root) = parse(&source)?;
        let root = root.ok_or(anyhow!("expected a function"))?;
        let (ir_arena, ir_root) = generate(&ast_arena, root)?;

        assert_eq!(ir_arena.len(), ast_arena.len());
        match &ir_arena[ir_root].kind {
            ir::Kind::Function(_, body) => match &ir_arena[*body].kind {
                ir::Kind::Op(ir::OpKind::IMul, operands) => assert_eq!(operands.len(), 2),
                other => panic!("expected a multiplication, got {:?}", other),
            },
            other => panic!("expected a function, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn irgen_should_reject_foreign_node() -> Result<()> {
        let (ast_arena, root) = parse("fn f() { 1 + 2 }")?;
        let root = root.ok_or(anyhow!("expected a function"))?;
        let empty = ast::Arena::new();
        assert!(generate(&empty, root).is_err());
        assert!(generate(&ast_arena, root).is_ok());
        Ok(())
    }
}
