// SPDX-License-Identifier: Unlicense
use std::path::PathBuf;
use std::str::FromStr;

use argh::FromArgs;

/// Compile or evaluate a `.stc` program.
#[derive(FromArgs, Debug)]
pub struct Args {
    /// the source file to process
    #[argh(positional)]
    pub path: PathBuf,

    /// what to produce: `eval`, `tokens`, `ast`, `ir` or `exe`
    #[argh(option, default = "Emit::Eval")]
    pub emit: Emit,

    /// the amount of logging to perform: `off`, `error`, `warn`, `info`,
    /// `debug` or `trace`
    #[argh(option, default = "log::LevelFilter::Warn")]
    pub log: log::LevelFilter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emit {
    Eval,
    Tokens,
    Ast,
    Ir,
    Exe,
}

impl FromStr for Emit {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eval" => Ok(Self::Eval),
            "tokens" => Ok(Self::Tokens),
            "ast" => Ok(Self::Ast),
            "ir" => Ok(Self::Ir),
            "exe" => Ok(Self::Exe),

            _ => Err("expected one of `eval`, `tokens`, `ast`, `ir`, or `exe`"),
        }
    }
}
