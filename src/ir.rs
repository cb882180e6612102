// SPDX-License-Identifier: Unlicense
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    INeg,
    IAdd,
    ISub,
    IMul,
    IDiv,
    IRem,
}

impl OpKind {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpKind::INeg => "ineg",
            OpKind::IAdd => "iadd",
            OpKind::ISub => "isub",
            OpKind::IMul => "imul",
            OpKind::IDiv => "idiv",
            OpKind::IRem => "irem",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    IntValue(i64),
    Op(OpKind, Vec<Id>),
    Function(String, Id),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Kind,
}

pub type Id = id_arena::Id<Node>;
pub type Arena = id_arena::Arena<Node>;

/// One instruction per line in allocation order, e.g. `%2 = iadd %0, %1`.
pub fn dump(arena: &Arena) -> String {
    let mut out = String::new();
    for (id, node) in arena.iter() {
        let _ = match &node.kind {
            Kind::IntValue(i) => writeln!(out, "%{} = int {}", id.index(), i),
            Kind::Op(op, args) => {
                let args = args
                    .iter()
                    .map(|a| format!("%{}", a.index()))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(out, "%{} = {} {}", id.index(), op.mnemonic(), args)
            }
            Kind::Function(name, body) => {
                writeln!(out, "%{} = fn {} %{}", id.index(), name, body.index())
            }
        };
    }
    out
}
