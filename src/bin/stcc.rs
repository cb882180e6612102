// SPDX-License-Identifier: Unlicense
use anyhow::Result;
#[cfg(feature = "llvm")]
use anyhow::Context;
use simple_logger::SimpleLogger;
use stc::{
    args::{Args, Emit},
    driver,
};

fn run(args: &Args) -> Result<()> {
    driver::module_name(&args.path)?;
    let source = || driver::read_file(&args.path);
    match args.emit {
        Emit::Eval => match driver::evaluate_source(&source()?)? {
            Some(v) => println!("{}", v),
            None => println!("empty program"),
        },
        Emit::Tokens => print!("{}", driver::dump_tokens(&source()?)?),
        Emit::Ast => println!("{}", driver::dump_ast(&source()?)?),
        Emit::Ir => print!("{}", driver::dump_ir(&source()?)?),
        Emit::Exe => compile(args)?,
    }
    Ok(())
}

#[cfg(feature = "llvm")]
fn compile(args: &Args) -> Result<()> {
    let exe = driver::compile(&args.path).context("failed to compile")?;
    println!(
        "successfully compiled to {}",
        exe.to_str().unwrap_or("<unknown>")
    );
    Ok(())
}

#[cfg(not(feature = "llvm"))]
fn compile(_args: &Args) -> Result<()> {
    anyhow::bail!("stcc was built without the `llvm` feature, cannot emit executables")
}

fn main() {
    let args: Args = argh::from_env();
    if let Err(e) = SimpleLogger::new()
        .with_level(args.log)
        .init()
    {
        eprintln!("failed to set up logging: {}", e);
    }

    if let Err(e) = run(&args) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
