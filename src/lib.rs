// SPDX-License-Identifier: Unlicense
pub mod arena;
pub mod args;
pub mod ast;
#[cfg(feature = "llvm")]
pub mod codegen;
pub mod driver;
pub mod eval;
pub mod ir;
pub mod irgen;
pub mod lexer;
pub mod parser;
