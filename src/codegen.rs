// SPDX-License-Identifier: Unlicense
use crate::ir;
use anyhow::{anyhow, Result};
use inkwell::{
    builder::Builder, context::Context, module::Module, targets, values, AddressSpace, IntPredicate,
};
use std::{collections::HashMap, path::Path};

#[derive(Debug, Clone)]
struct Value<'a>(Option<values::AnyValueEnum<'a>>);

impl<'a> Value<'a> {
    fn from_int_value(v: values::IntValue<'a>) -> Self {
        Self(Some(values::AnyValueEnum::IntValue(v)))
    }

    fn into_int_value(self) -> Result<values::IntValue<'a>> {
        let v = self
            .0
            .ok_or(anyhow!("expected integer value but actually None"))?;
        if !v.is_int_value() {
            anyhow::bail!("expected integer value but actually {:?}", v)
        }
        Ok(v.into_int_value())
    }
}

pub struct CodeGen<'a> {
    ir_arena: ir::Arena,
    context: &'a Context,
    module: Module<'a>,
    builder: Builder<'a>,
    target_machine: targets::TargetMachine,
}

impl<'a> CodeGen<'a> {
    pub fn new(
        ir_arena: ir::Arena,
        context: &'a Context,
        target_machine: targets::TargetMachine,
        module_name: &str,
    ) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        Self {
            ir_arena,
            context,
            module,
            builder,
            target_machine,
        }
    }

    fn generate_builtins(&self) -> Result<HashMap<&str, values::FunctionValue<'a>>> {
        let i32_ty = self.context.i32_type();
        let i64_ty = self.context.i64_type();
        let i8_ptr_ty = self.context.i8_type().ptr_type(AddressSpace::default());
        let void_ty = self.context.void_type();

        let printf = self
            .module
            .add_function("printf", i32_ty.fn_type(&[i8_ptr_ty.into()], true), None);
        let abort = self
            .module
            .add_function("abort", void_ty.fn_type(&[], false), None);

        let print_int = self.module.add_function(
            "print_int",
            void_ty.fn_type(&[i64_ty.into()], false),
            None,
        );
        let print_int_body = self.context.append_basic_block(print_int, "entry");
        self.builder.position_at_end(print_int_body);

        let format_str = self
            .builder
            .build_global_string_ptr("result: %lld\n", "format_string")?;
        let val_to_print = print_int
            .get_nth_param(0)
            .ok_or(anyhow!("failed to get first param of print_int"))?
            .into_int_value();

        self.builder.build_call(
            printf,
            &[format_str.as_pointer_value().into(), val_to_print.into()],
            "",
        )?;
        self.builder.build_return(None)?;

        let mut builtins = HashMap::new();
        builtins.insert("print_int", print_int);
        builtins.insert("abort", abort);

        Ok(builtins)
    }

    /// Branches to `abort` when `rhs` is zero or when `lhs / rhs` overflows
    /// (`i64::MIN / -1`). sdiv and srem are undefined in LLVM for both.
    fn guard_division(
        &self,
        lhs: values::IntValue<'a>,
        rhs: values::IntValue<'a>,
        abort: values::FunctionValue<'a>,
    ) -> Result<()> {
        let function = self
            .builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or(anyhow!("builder is not positioned inside a function"))?;
        let i64_ty = self.context.i64_type();

        let is_zero = self.builder.build_int_compare(
            IntPredicate::EQ,
            rhs,
            i64_ty.const_zero(),
            "is_zero",
        )?;
        let is_min = self.builder.build_int_compare(
            IntPredicate::EQ,
            lhs,
            i64_ty.const_int(i64::MIN as u64, true),
            "is_min",
        )?;
        let is_minus_one = self.builder.build_int_compare(
            IntPredicate::EQ,
            rhs,
            i64_ty.const_int(-1i64 as u64, true),
            "is_minus_one",
        )?;
        let overflows = self.builder.build_and(is_min, is_minus_one, "overflows")?;
        let traps = self.builder.build_or(is_zero, overflows, "traps")?;

        let trap = self.context.append_basic_block(function, "division_trap");
        let cont = self.context.append_basic_block(function, "division");
        self.builder.build_conditional_branch(traps, trap, cont)?;

        self.builder.position_at_end(trap);
        self.builder.build_call(abort, &[], "")?;
        self.builder.build_unreachable()?;

        self.builder.position_at_end(cont);
        Ok(())
    }

    fn operand(generated: &[Value<'a>], id: ir::Id) -> Result<values::IntValue<'a>> {
        generated
            .get(id.index())
            .cloned()
            .ok_or(anyhow!("ir node {:?} is used before it is generated", id))?
            .into_int_value()
    }

    /// Generates `body` in one forward pass over the arena. The IR is
    /// allocated operands first, so every operand is generated before its user.
    fn generate_impl(&self, body: ir::Id, abort: values::FunctionValue<'a>) -> Result<Value<'a>> {
        let mut generated: Vec<Value<'a>> = Vec::with_capacity(body.index() + 1);
        for (id, node) in self.ir_arena.iter() {
            let value = match &node.kind {
                &ir::Kind::IntValue(i) => self.context.i64_type().const_int(i as u64, true),
                ir::Kind::Op(ir::OpKind::INeg, args) => {
                    let operand = Self::operand(&generated, args[0])?;
                    self.builder.build_int_neg(operand, "neg")?
                }
                ir::Kind::Op(op, args) => {
                    let lhs = Self::operand(&generated, args[0])?;
                    let rhs = Self::operand(&generated, args[1])?;

                    match op {
                        ir::OpKind::IAdd => self.builder.build_int_add(lhs, rhs, "add")?,
                        ir::OpKind::ISub => self.builder.build_int_sub(lhs, rhs, "sub")?,
                        ir::OpKind::IMul => self.builder.build_int_mul(lhs, rhs, "mul")?,
                        ir::OpKind::IDiv => {
                            self.guard_division(lhs, rhs, abort)?;
                            self.builder.build_int_signed_div(lhs, rhs, "div")?
                        }
                        ir::OpKind::IRem => {
                            self.guard_division(lhs, rhs, abort)?;
                            self.builder.build_int_signed_rem(lhs, rhs, "rem")?
                        }
                        ir::OpKind::INeg => anyhow::bail!("negation takes a single operand"),
                    }
                }
                ir::Kind::Function(name, _) => {
                    anyhow::bail!("function `{}` cannot be used as a value", name)
                }
            };
            generated.push(Value::from_int_value(value));
            if id == body {
                return Ok(Value::from_int_value(value));
            }
        }
        anyhow::bail!("failed to get ir {:?} from arena", body)
    }

    fn generate_function(
        &self,
        name: &str,
        body: ir::Id,
        abort: values::FunctionValue<'a>,
    ) -> Result<values::FunctionValue<'a>> {
        let function = self.module.add_function(
            &format!("stc_{}", name),
            self.context.i64_type().fn_type(&[], false),
            None,
        );
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let val = self.generate_impl(body, abort)?.into_int_value()?;
        self.builder.build_return(Some(&val))?;
        Ok(function)
    }

    pub fn generate(&self, root: ir::Id) -> Result<()> {
        let (name, body) = match &self
            .ir_arena
            .get(root)
            .ok_or(anyhow!("failed to get ir root from arena"))?
            .kind
        {
            ir::Kind::Function(name, body) => (name.clone(), *body),
            other => anyhow::bail!("expected a function at the root but got {:?}", other),
        };

        let builtins = self.generate_builtins()?;
        let print_int = builtins
            .get("print_int")
            .ok_or(anyhow!("builtin function not found"))?;
        let abort = *builtins
            .get("abort")
            .ok_or(anyhow!("builtin function not found"))?;

        let function = self.generate_function(&name, body, abort)?;

        let i32_ty = self.context.i32_type();
        let main = self
            .module
            .add_function("main", i32_ty.fn_type(&[], false), None);
        let main_body = self.context.append_basic_block(main, "entry");
        self.builder.position_at_end(main_body);

        let val = self
            .builder
            .build_call(function, &[], "result")?
            .try_as_basic_value()
            .left()
            .ok_or(anyhow!("function `{}` returned no value", name))?
            .into_int_value();
        self.builder.build_call(*print_int, &[val.into()], "")?;

        let status = self.builder.build_int_truncate(val, i32_ty, "status")?;
        self.builder.build_return(Some(&status))?;

        Ok(())
    }

    pub fn print_to_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn write_to_file(&self, file: &Path) -> Result<()> {
        self.module
            .verify()
            .map_err(|e| anyhow!("module verification failed: {}", e))?;
        self.target_machine
            .write_to_file(&self.module, targets::FileType::Object, file)
            .map_err(|e| anyhow!("failed to write object file: {}", e))
    }
}

pub fn get_host_target_machine() -> Result<targets::TargetMachine> {
    use targets::*;

    Target::initialize_native(&InitializationConfig::default())
        .map_err(|e| anyhow!("failed to initialize native target: {}", e))?;

    let triple = TargetMachine::get_default_triple();
    let target =
        Target::from_triple(&triple).map_err(|e| anyhow!("failed to get target: {}", e))?;

    let cpu = TargetMachine::get_host_cpu_name();
    let features = TargetMachine::get_host_cpu_features();

    let opt_level = inkwell::OptimizationLevel::Default;
    let reloc_mode = RelocMode::PIC;
    let code_model = CodeModel::Default;

    target
        .create_target_machine(
            &triple,
            cpu.to_str()?,
            features.to_str()?,
            opt_level,
            reloc_mode,
            code_model,
        )
        .ok_or(anyhow!("failed to get target machine"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{irgen, parser};

    #[test]
    fn codegen_should_emit_guarded_division() -> Result<()> {
        let (ast_arena, root) = parser::parse("fn f() { 10 / (3 - 1) }")?;
        let root = root.ok_or(anyhow!("expected a function"))?;
        let (ir_arena, ir_root) = irgen::generate(&ast_arena, root)?;

        let context = Context::create();
        let codegen = CodeGen::new(ir_arena, &context, get_host_target_machine()?, "test");
        codegen.generate(ir_root)?;

        let ir = codegen.print_to_string();
        assert!(ir.contains("define i64 @stc_f()"), "{}", ir);
        assert!(ir.contains("division_trap"), "{}", ir);
        assert!(ir.contains("call void @abort()"), "{}", ir);
        Ok(())
    }

    #[test]
    fn codegen_should_generate_long_chains() -> Result<()> {
        let source = format!("fn f() {{ 1{} }}", " + 1".repeat(200_000));
        let (ast_arena, root) = parser::parse(&source)?;
        let root = root.ok_or(anyhow!("expected a function"))?;
        let (ir_arena, ir_root) = irgen::generate(&ast_arena, root)?;

        let context = Context::create();
        let codegen = CodeGen::new(ir_arena, &context, get_host_target_machine()?, "test");
        codegen.generate(ir_root)?;
        assert!(codegen.print_to_string().contains("define i64 @stc_f()"));
        Ok(())
    }
}
