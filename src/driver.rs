// SPDX-License-Identifier: Unlicense
use std::{io::Read, path::Path};

use crate::{ast, eval, ir, irgen, lexer, parser};
use anyhow::{anyhow, Context, Result};

/// File extension of source files.
pub const SOURCE_EXTENSION: &str = "stc";

pub fn read_file(source: &Path) -> Result<String> {
    let mut buf = String::new();
    let mut f = std::fs::File::open(source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    f.read_to_string(&mut buf)
        .with_context(|| format!("failed to read {}", source.display()))?;
    Ok(buf)
}

/// Returns the module name of a `.stc` source path.
pub fn module_name(source: &Path) -> Result<&str> {
    if source.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
        anyhow::bail!(
            "expected a `.{}` source file but got {}",
            SOURCE_EXTENSION,
            source.display()
        );
    }
    source
        .file_stem()
        .and_then(|n| n.to_str())
        .ok_or(anyhow!("invalid source file name {}", source.display()))
}

pub fn evaluate_source(source: &str) -> Result<Option<i64>> {
    let (arena, root) = parser::parse(source).context("failed to parse")?;
    let value = eval::evaluate_program(&arena, root).context("failed to evaluate")?;
    log::info!("evaluated program to {:?}", value);
    Ok(value)
}

pub fn dump_tokens(source: &str) -> Result<String> {
    let tokens = lexer::Lexer::tokenize(source).context("failed to lex")?;
    Ok(tokens
        .iter()
        .map(|t| format!("{:?} {:?}\n", t.kind, t.text))
        .collect())
}

pub fn dump_ast(source: &str) -> Result<String> {
    let (arena, root) = parser::parse(source).context("failed to parse")?;
    Ok(root
        .map(|root| ast::to_sexpr(&arena, root))
        .unwrap_or_default())
}

pub fn dump_ir(source: &str) -> Result<String> {
    let (arena, root) = parser::parse(source).context("failed to parse")?;
    match root {
        Some(root) => {
            let (ir_arena, _) = irgen::generate(&arena, root)?;
            Ok(ir::dump(&ir_arena))
        }
        None => Ok(String::new()),
    }
}

#[cfg(feature = "llvm")]
pub use native::*;

#[cfg(feature = "llvm")]
mod native {
    use std::path::{Path, PathBuf};

    use super::{module_name, read_file};
    use crate::{codegen, irgen, parser};
    use anyhow::{anyhow, Context, Result};

    pub fn generate_object_from_string(
        name: &str,
        source: &str,
        out_dir: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let (ast_arena, ast_root) = parser::parse(source).context("failed to parse")?;
        let ast_root = ast_root.ok_or(anyhow!("empty program, nothing to compile"))?;
        let (ir_arena, ir_root) = irgen::generate(&ast_arena, ast_root)?;
        drop(ast_arena);

        let context = inkwell::context::Context::create();
        let target_machine = codegen::get_host_target_machine()?;
        let codegen = codegen::CodeGen::new(ir_arena, &context, target_machine, name);
        codegen
            .generate(ir_root)
            .context("code generation failed")?;
        log::debug!("generated module:\n{}", codegen.print_to_string());

        let mut output = out_dir.unwrap_or(std::env::current_dir()?);
        output.push(name);
        output.set_extension("o");
        codegen.write_to_file(output.as_path())?;
        log::info!("wrote {}", output.display());
        Ok(output)
    }

    pub fn execute_linker(source: &Path) -> Result<PathBuf> {
        let cc = std::env::var("CC").unwrap_or("cc".into());
        let ext = if cfg!(windows) { "exe" } else { "" };

        let mut output_path = PathBuf::from(source);
        output_path.set_extension(ext);

        let compiling = std::process::Command::new(&cc)
            .args(vec![
                source.as_os_str(),
                std::ffi::OsStr::new("-o"),
                output_path.as_os_str(),
            ])
            .output()?;

        let stderr = String::from_utf8(compiling.stderr)?;
        let status = compiling
            .status
            .code()
            .ok_or(anyhow!("failed to execute the linker `{}`", cc))?;
        if status != 0 {
            return Err(anyhow!(
                "link failed with code {}\nstderr: {}",
                status,
                stderr
            ));
        }

        Ok(output_path)
    }

    pub fn compile(source: &Path) -> Result<PathBuf> {
        let mod_name = module_name(source)?;
        let src = read_file(source)?;
        let out_dir = PathBuf::from(source.parent().unwrap_or(source));
        let obj = generate_object_from_string(mod_name, src.as_str(), Some(out_dir))?;
        let exe = execute_linker(obj.as_path())?;
        Ok(exe)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::{env, fs::File, io::Write, process::{Command, Output}};

        fn compile_and_run(name: &str, src: &str) -> Result<Output> {
            let test_dir = env::temp_dir().join("stc-test-data");
            std::fs::create_dir_all(&test_dir)?;
            let src_file = test_dir.join(format!("{name}.stc"));
            let mut f = File::create(&src_file)?;

            f.write_all(src.as_bytes())?;
            let exe = compile(Path::new(&src_file))?;
            let output = Command::new(exe).output()?;
            Ok(output)
        }

        #[test]
        fn compiler_should_compile_basic_expression() -> Result<()> {
            let src = r#"
            fn answer() { 6 * (10 - 3) % 43 }
            "#;

            let output = compile_and_run("basic_expression", src)?;
            let stdout = String::from_utf8(output.stdout)?;
            assert_eq!(stdout.trim(), "result: 42");
            assert_eq!(output.status.code(), Some(42));
            Ok(())
        }

        #[test]
        fn compiled_division_by_zero_should_abort() -> Result<()> {
            let output = compile_and_run("division_by_zero", "fn f() { 1 / (2 - 2) }")?;
            assert!(!output.status.success());
            Ok(())
        }

        #[test]
        fn compiled_division_overflow_should_abort() -> Result<()> {
            for (name, src) in [
                ("division_overflow", "fn f() { (-9223372036854775807 - 1) / -1 }"),
                ("remainder_overflow", "fn f() { (-9223372036854775807 - 1) % -1 }"),
            ] {
                let output = compile_and_run(name, src)?;
                assert!(!output.status.success(), "{src}");
                assert!(output.stdout.is_empty(), "{src}");
            }
            Ok(())
        }
    }
}
