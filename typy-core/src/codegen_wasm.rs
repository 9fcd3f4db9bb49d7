//! Wasm backend.
//!
//! Every value is an `i32`: integers as themselves, booleans as 0/1 and
//! `None` as 0. The module is encoded with `wasm_encoder` and printed
//! back to text with `wasmprinter`, so both artifacts describe the same
//! binary. A name section keeps the source names of functions, globals
//! and locals visible in the text.

use std::collections::HashMap;

use tracing::{debug, trace};
use wasm_encoder::{
    BlockType, CodeSection, ConstExpr, EntityType, ExportKind, ExportSection, Function,
    FunctionSection, GlobalSection, GlobalType, ImportSection, IndirectNameMap, Instruction,
    Module, NameMap, NameSection, TypeSection, ValType,
};

use crate::ast::{BinOp, Expr, FunctionDef, Stmt};
use crate::builtins::BUILTINS;
use crate::compiler::CompileOptions;
use crate::error::CodegenError;
use crate::typecheck::SCRATCH_LOCAL;

/// Names assigned at the top level of a program, in order of first
/// assignment. These become wasm globals; every other variable is a
/// function local.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlobalSet {
    names: Vec<String>,
}

impl GlobalSet {
    pub fn collect(program: &[Stmt]) -> Self {
        let mut names: Vec<String> = Vec::new();
        for name in program.iter().filter_map(Stmt::assigned_name) {
            if !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }
        GlobalSet { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index(name).is_some()
    }

    /// Global index of `name`.
    pub fn index(&self, name: &str) -> Option<u32> {
        self.names
            .iter()
            .position(|known| known == name)
            .map(|index| index as u32)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

/// Whether the entry function leaves a value: true iff the last
/// top-level statement is an expression statement.
pub fn entry_returns_value(program: &[Stmt]) -> bool {
    matches!(program.last(), Some(Stmt::Expr(_)))
}

/// An encoded module together with its text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmModule {
    pub wasm: Vec<u8>,
    pub wat: String,
}

/// Generate a module for a checked program.
///
/// Function indices: the builtins are imported first in table order,
/// then user functions in source order, then the entry function.
pub fn generate_module(
    program: &[Stmt],
    globals: &GlobalSet,
    options: &CompileOptions,
) -> Result<WasmModule, CodegenError> {
    let mut defs = Vec::new();
    let mut top_level = Vec::with_capacity(program.len());
    for stmt in program {
        match stmt {
            Stmt::Define(def) => defs.push(def),
            other => top_level.push(other),
        }
    }

    let mut types = TypeTable::default();
    let mut imports = ImportSection::new();
    let mut functions = HashMap::new();
    let mut function_names = NameMap::new();
    for (index, builtin) in BUILTINS.iter().enumerate() {
        let index = index as u32;
        let ty = types.function(builtin.arity(), true);
        imports.import(&options.host_module, builtin.name, EntityType::Function(ty));
        functions.insert(builtin.name, index);
        function_names.append(index, builtin.name);
    }

    let mut declared = FunctionSection::new();
    for (offset, def) in defs.iter().enumerate() {
        let index = (BUILTINS.len() + offset) as u32;
        declared.function(types.function(def.params.len(), true));
        functions.insert(def.name.as_str(), index);
        function_names.append(index, &def.name);
    }
    let returns_value = entry_returns_value(program);
    let entry_index = (BUILTINS.len() + defs.len()) as u32;
    declared.function(types.function(0, returns_value));

    let mut global_section = GlobalSection::new();
    let mut global_names = NameMap::new();
    for (index, name) in globals.names().iter().enumerate() {
        global_section.global(
            GlobalType {
                val_type: ValType::I32,
                mutable: true,
                shared: false,
            },
            &ConstExpr::i32_const(0),
        );
        global_names.append(index as u32, name);
    }

    let mut exports = ExportSection::new();
    exports.export(&options.entry_export, ExportKind::Func, entry_index);

    let layout = Layout { functions, globals };
    let mut code = CodeSection::new();
    let mut local_names = IndirectNameMap::new();
    for (offset, def) in defs.iter().enumerate() {
        let (body, names) = emit_function(def, &layout)?;
        code.function(&body);
        local_names.append((BUILTINS.len() + offset) as u32, &names);
    }
    let (body, names) = emit_entry(&top_level, returns_value, &layout)?;
    code.function(&body);
    local_names.append(entry_index, &names);

    let mut names = NameSection::new();
    names.functions(&function_names);
    names.locals(&local_names);
    names.globals(&global_names);

    let mut module = Module::new();
    module
        .section(&types.section)
        .section(&imports)
        .section(&declared)
        .section(&global_section)
        .section(&exports)
        .section(&code)
        .section(&names);
    let wasm = module.finish();
    let wat = wasmprinter::print_bytes(&wasm).map_err(|err| CodegenError::Print(err.to_string()))?;

    debug!(
        functions = defs.len(),
        globals = globals.names().len(),
        bytes = wasm.len(),
        "generated wasm module"
    );
    Ok(WasmModule { wasm, wat })
}

/// Type section with one entry per distinct `i32` signature.
#[derive(Default)]
struct TypeTable {
    section: TypeSection,
    indices: HashMap<(usize, bool), u32>,
}

impl TypeTable {
    fn function(&mut self, params: usize, returns: bool) -> u32 {
        if let Some(&index) = self.indices.get(&(params, returns)) {
            return index;
        }
        let index = self.section.len();
        self.section
            .ty()
            .function(vec![ValType::I32; params], returns.then_some(ValType::I32));
        self.indices.insert((params, returns), index);
        index
    }
}

/// Module-wide index spaces shared by every function body.
struct Layout<'a> {
    functions: HashMap<&'a str, u32>,
    globals: &'a GlobalSet,
}

/// Local index space of one function: parameters, then the scratch
/// local, then hoisted locals in first-assignment order.
struct Frame<'a> {
    names: Vec<&'a str>,
    params: usize,
}

impl<'a> Frame<'a> {
    fn new(params: Vec<&'a str>, hoisted: Vec<&'a str>) -> Self {
        let count = params.len();
        let mut names = params;
        names.push(SCRATCH_LOCAL);
        names.extend(hoisted);
        Frame {
            names,
            params: count,
        }
    }

    fn scratch(&self) -> u32 {
        self.params as u32
    }

    fn declared(&self) -> u32 {
        (self.names.len() - self.params) as u32
    }

    fn indices(&self) -> HashMap<&'a str, u32> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (*name, index as u32))
            .collect()
    }

    fn name_map(&self) -> NameMap {
        let mut map = NameMap::new();
        for (index, name) in self.names.iter().enumerate() {
            map.append(index as u32, name);
        }
        map
    }
}

fn emit_function(def: &FunctionDef, layout: &Layout<'_>) -> Result<(Function, NameMap), CodegenError> {
    let params: Vec<&str> = def.params.iter().map(|p| p.name.as_str()).collect();
    let hoisted = collect_locals(&def.body, |name| params.contains(&name));
    trace!(function = %def.name, params = params.len(), locals = hoisted.len(), "laying out function");

    let frame = Frame::new(params, hoisted);
    let mut emitter = FunctionEmitter::new(layout, &frame, true);
    emitter.block(&def.body)?;
    emitter
        .body
        .instruction(&Instruction::I32Const(0))
        .instruction(&Instruction::End);
    Ok((emitter.body, frame.name_map()))
}

fn emit_entry(
    statements: &[&Stmt],
    returns_value: bool,
    layout: &Layout<'_>,
) -> Result<(Function, NameMap), CodegenError> {
    let mut hoisted = Vec::new();
    for &stmt in statements {
        collect_nested_locals(stmt, &|name: &str| layout.globals.contains(name), &mut hoisted);
    }
    trace!(locals = hoisted.len(), "laying out entry function");

    let frame = Frame::new(Vec::new(), hoisted);
    let mut emitter = FunctionEmitter::new(layout, &frame, false);
    for &stmt in statements {
        emitter.stmt(stmt)?;
    }
    if returns_value {
        emitter.body.instruction(&Instruction::LocalGet(frame.scratch()));
    }
    emitter.body.instruction(&Instruction::End);
    Ok((emitter.body, frame.name_map()))
}

/// Every name assigned anywhere in `body`, in order of first assignment,
/// skipping names for which `skip` holds.
fn collect_locals<'a>(body: &'a [Stmt], skip: impl Fn(&str) -> bool) -> Vec<&'a str> {
    let mut locals = Vec::new();
    for stmt in body {
        collect_assigned(stmt, &skip, &mut locals);
    }
    locals
}

fn collect_assigned<'a>(stmt: &'a Stmt, skip: &dyn Fn(&str) -> bool, locals: &mut Vec<&'a str>) {
    match stmt {
        Stmt::Assign { name, .. } => {
            if !skip(name) && !locals.contains(&name.as_str()) {
                locals.push(name);
            }
        }
        other => collect_nested_locals(other, skip, locals),
    }
}

/// Names assigned inside the bodies nested under `stmt`.
fn collect_nested_locals<'a>(
    stmt: &'a Stmt,
    skip: &dyn Fn(&str) -> bool,
    locals: &mut Vec<&'a str>,
) {
    let bodies: Vec<&'a [Stmt]> = match stmt {
        Stmt::While { body, .. } => vec![body.as_slice()],
        Stmt::If {
            body,
            elifs,
            orelse,
            ..
        } => std::iter::once(body.as_slice())
            .chain(elifs.iter().map(|elif| elif.body.as_slice()))
            .chain(orelse.iter().map(|orelse| orelse.body.as_slice()))
            .collect(),
        _ => Vec::new(),
    };
    for body in bodies {
        for nested in body {
            collect_assigned(nested, skip, locals);
        }
    }
}

enum Storage {
    Local(u32),
    Global(u32),
}

struct FunctionEmitter<'a> {
    layout: &'a Layout<'a>,
    /// Parameters and hoisted locals; these shadow globals.
    locals: HashMap<&'a str, u32>,
    scratch: u32,
    in_function: bool,
    body: Function,
}

impl<'a> FunctionEmitter<'a> {
    fn new(layout: &'a Layout<'a>, frame: &Frame<'a>, in_function: bool) -> Self {
        FunctionEmitter {
            layout,
            locals: frame.indices(),
            scratch: frame.scratch(),
            in_function,
            body: Function::new([(frame.declared(), ValType::I32)]),
        }
    }

    fn storage(&self, name: &str) -> Result<Storage, CodegenError> {
        if let Some(&index) = self.locals.get(name) {
            Ok(Storage::Local(index))
        } else if let Some(index) = self.layout.globals.index(name) {
            Ok(Storage::Global(index))
        } else {
            Err(CodegenError::UnresolvedName(name.to_string()))
        }
    }

    fn call(&mut self, name: &str) -> Result<(), CodegenError> {
        let index = self
            .layout
            .functions
            .get(name)
            .copied()
            .ok_or_else(|| CodegenError::UnresolvedName(name.to_string()))?;
        self.body.instruction(&Instruction::Call(index));
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Assign { name, value } => {
                self.expr(value)?;
                let set = match self.storage(name)? {
                    Storage::Local(index) => Instruction::LocalSet(index),
                    Storage::Global(index) => Instruction::GlobalSet(index),
                };
                self.body.instruction(&set);
            }
            Stmt::Expr(expr) => {
                self.expr(expr)?;
                self.body.instruction(&Instruction::LocalSet(self.scratch));
            }
            Stmt::Define(def) => return Err(CodegenError::NestedFunction(def.name.clone())),
            Stmt::Return(value) => {
                if !self.in_function {
                    return Err(CodegenError::ReturnOutsideFunction);
                }
                self.expr(value)?;
                self.body.instruction(&Instruction::Return);
            }
            Stmt::Pass => {}
            Stmt::While { condition, body } => {
                self.body
                    .instruction(&Instruction::Block(BlockType::Empty))
                    .instruction(&Instruction::Loop(BlockType::Empty));
                self.expr(condition)?;
                self.body
                    .instruction(&Instruction::I32Eqz)
                    .instruction(&Instruction::BrIf(1));
                self.block(body)?;
                self.body
                    .instruction(&Instruction::Br(0))
                    .instruction(&Instruction::End)
                    .instruction(&Instruction::End);
            }
            Stmt::If {
                condition,
                body,
                elifs,
                orelse,
            } => {
                self.expr(condition)?;
                self.body.instruction(&Instruction::If(BlockType::Empty));
                self.block(body)?;
                let mut open = 1;
                for elif in elifs {
                    self.body.instruction(&Instruction::Else);
                    self.expr(&elif.condition)?;
                    self.body.instruction(&Instruction::If(BlockType::Empty));
                    self.block(&elif.body)?;
                    open += 1;
                }
                if let Some(orelse) = orelse {
                    self.body.instruction(&Instruction::Else);
                    self.block(&orelse.body)?;
                }
                for _ in 0..open {
                    self.body.instruction(&Instruction::End);
                }
            }
        }
        Ok(())
    }

    fn block(&mut self, body: &[Stmt]) -> Result<(), CodegenError> {
        body.iter().try_for_each(|stmt| self.stmt(stmt))
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        match expr {
            Expr::Number(value) => {
                self.body.instruction(&Instruction::I32Const(*value));
            }
            Expr::Bool(value) => {
                self.body.instruction(&Instruction::I32Const(i32::from(*value)));
            }
            Expr::None => {
                self.body.instruction(&Instruction::I32Const(0));
            }
            Expr::Ident(name) => {
                let get = match self.storage(name)? {
                    Storage::Local(index) => Instruction::LocalGet(index),
                    Storage::Global(index) => Instruction::GlobalGet(index),
                };
                self.body.instruction(&get);
            }
            Expr::Call { name, args } => {
                for arg in args {
                    self.expr(arg)?;
                }
                self.call(name)?;
            }
            Expr::Builtin1 { func, arg } => {
                self.expr(arg)?;
                self.call(func.name())?;
            }
            Expr::Builtin2 { func, left, right } => {
                self.expr(left)?;
                self.expr(right)?;
                self.call(func.name())?;
            }
            Expr::Binary { op, left, right } => {
                let instruction = binary_instruction(*op)?;
                self.expr(left)?;
                self.expr(right)?;
                self.body.instruction(&instruction);
            }
            Expr::Not(operand) => {
                self.expr(operand)?;
                self.body
                    .instruction(&Instruction::I32Const(1))
                    .instruction(&Instruction::I32LtS)
                    .instruction(&Instruction::If(BlockType::Result(ValType::I32)))
                    .instruction(&Instruction::I32Const(1))
                    .instruction(&Instruction::Else)
                    .instruction(&Instruction::I32Const(0))
                    .instruction(&Instruction::End);
            }
            Expr::Paren(inner) => self.expr(inner)?,
        }
        Ok(())
    }
}

fn binary_instruction(op: BinOp) -> Result<Instruction<'static>, CodegenError> {
    let instruction = match op {
        BinOp::Add => Instruction::I32Add,
        BinOp::Sub => Instruction::I32Sub,
        BinOp::Mul => Instruction::I32Mul,
        BinOp::IntDiv => Instruction::I32DivS,
        BinOp::Mod => Instruction::I32RemS,
        BinOp::Eq => Instruction::I32Eq,
        BinOp::Neq => Instruction::I32Ne,
        BinOp::Lt => Instruction::I32LtS,
        BinOp::Gt => Instruction::I32GtS,
        BinOp::Lte => Instruction::I32LeS,
        BinOp::Gte => Instruction::I32GeS,
        BinOp::And | BinOp::Or | BinOp::Is => return Err(CodegenError::UnsupportedOperator(op)),
    };
    Ok(instruction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Parameter;
    use crate::builder::build_program;
    use crate::syntax::parse;
    use crate::types::Type;

    fn program(source: &str) -> Vec<Stmt> {
        let tree = parse(source).expect("parse");
        build_program(source, &mut tree.cursor()).expect("build")
    }

    fn generate_with(source: &str, options: &CompileOptions) -> Result<WasmModule, CodegenError> {
        let program = program(source);
        let globals = GlobalSet::collect(&program);
        generate_module(&program, &globals, options)
    }

    fn generate(source: &str) -> Result<WasmModule, CodegenError> {
        generate_with(source, &CompileOptions::default())
    }

    /// Validate the binary and check that the printed text assembles
    /// back into a valid module.
    fn validated(module: WasmModule) -> WasmModule {
        wasmparser::validate(&module.wasm).unwrap_or_else(|err| panic!("{err}\n{}", module.wat));
        let reassembled = wat::parse_str(&module.wat).unwrap_or_else(|err| panic!("{err}\n{}", module.wat));
        wasmparser::validate(&reassembled).unwrap_or_else(|err| panic!("{err}\n{}", module.wat));
        module
    }

    /// Printed lines with `;;` and `(; ;)` annotations removed and
    /// whitespace collapsed.
    fn lines(source: &str) -> Vec<String> {
        let module = validated(generate(source).expect("generate"));
        module
            .wat
            .lines()
            .map(|line| {
                let line = line.split(";;").next().unwrap_or_default();
                let mut kept = String::new();
                let mut rest = line;
                while let Some(start) = rest.find("(;") {
                    kept.push_str(&rest[..start]);
                    rest = match rest[start..].find(";)") {
                        Some(end) => &rest[start + end + 2..],
                        None => "",
                    };
                }
                kept.push_str(rest);
                kept.split_whitespace().collect::<Vec<_>>().join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect()
    }

    fn has_run(lines: &[String], expected: &[&str]) -> bool {
        lines
            .windows(expected.len())
            .any(|window| window.iter().map(String::as_str).eq(expected.iter().copied()))
    }

    fn has_line(lines: &[String], prefix: &str) -> bool {
        lines.iter().any(|line| line.starts_with(prefix))
    }

    #[test]
    fn global_set_keeps_first_assignment_order() {
        let program = program("b = 1\na = 2\nb = 3\nif True:\n    c = 4\n");
        let globals = GlobalSet::collect(&program);
        assert_eq!(globals.names(), ["b".to_string(), "a".to_string()]);
        assert_eq!(globals.index("a"), Some(1));
        assert!(!globals.contains("c"));
    }

    #[test]
    fn module_imports_builtins_and_declares_globals() {
        let lines = lines("x = 5\nx");
        assert!(has_line(&lines, "(import \"imports\" \"print\" (func $print"));
        assert!(has_line(&lines, "(import \"imports\" \"pow\" (func $pow"));
        assert!(has_line(&lines, "(global $x (mut i32)"));
        assert!(has_line(&lines, "(export \"_start\""));
        assert!(has_run(
            &lines,
            &["i32.const 5", "global.set $x", "global.get $x", "local.set $scratch", "local.get $scratch"]
        ));
    }

    #[test]
    fn signatures_share_one_type_each() {
        let lines = lines("def add(a: int, b: int) -> int:\n    return a + b\n\nadd(1, 2)");
        // unary builtins, binary builtins and `add`, then the entry
        assert_eq!(lines.iter().filter(|line| line.starts_with("(type (func")).count(), 3);
    }

    #[test]
    fn options_rename_host_module_and_entry() {
        let options = CompileOptions {
            host_module: "env".to_string(),
            entry_export: "main".to_string(),
        };
        let module = validated(generate_with("print(1)", &options).expect("generate"));
        assert!(module.wat.contains("(import \"env\" \"abs\""));
        assert!(module.wat.contains("(export \"main\""));
    }

    #[test]
    fn option_strings_are_escaped_in_text() {
        let options = CompileOptions {
            host_module: "a\\b".to_string(),
            entry_export: "ma\"in".to_string(),
        };
        let module = validated(generate_with("print(1)", &options).expect("generate"));
        assert!(!module.wat.contains("\"ma\"in\""));
    }

    #[test]
    fn entry_without_trailing_expression_has_no_result() {
        let lines = lines("x = 1");
        assert!(lines.iter().any(|line| line.starts_with("(func (type") && !line.ends_with("(result i32)")));
        assert!(!lines.iter().any(|line| line == "local.get $scratch"));
        assert!(!entry_returns_value(&program("x = 1")));
        assert!(entry_returns_value(&program("x = 1\nx")));
    }

    #[test]
    fn function_locals_are_hoisted_once() {
        let source = "\
def f(n: int) -> int:
    total = 0
    while n > 0:
        total = total + n
        step = 1
        n = n - step
    return total
";
        let lines = lines(source);
        assert!(lines.iter().any(|line| line.starts_with("(func $f") && line.ends_with("(param $n i32) (result i32)")));
        let text = lines.join("\n");
        let scratch = text.find("(local $scratch i32)").expect("scratch local");
        let total = text.find("(local $total i32)").expect("total local");
        let step = text.find("(local $step i32)").expect("step local");
        assert!(scratch < total && total < step);
        assert_eq!(text.matches("(local $total i32)").count(), 1);
        assert!(!text.contains("(local $n i32)"));
        assert!(has_run(&lines, &["local.get $total", "return", "i32.const 0", ")"]));
    }

    #[test]
    fn function_locals_shadow_globals() {
        let source = "\
x = 10
g = 2
def f() -> int:
    x = 1
    return x + g

f()
";
        let lines = lines(source);
        assert!(lines.join("\n").contains("(local $x i32)"));
        assert!(has_run(&lines, &["local.get $x", "global.get $g", "i32.add", "return"]));
        assert!(has_run(&lines, &["i32.const 10", "global.set $x"]));
    }

    #[test]
    fn entry_locals_come_from_nested_bodies() {
        let lines = lines("a = 0\nif a < 1:\n    a = 2\n    b = 3\n");
        let text = lines.join("\n");
        assert!(text.contains("(local $b i32)"));
        assert!(!text.contains("(local $a i32)"));
        assert!(has_run(&lines, &["i32.const 2", "global.set $a", "i32.const 3", "local.set $b"]));
    }

    #[test]
    fn while_loop_shape() {
        let lines = lines("b = 0\nwhile b < 3:\n    b = b + 1\n");
        let expected = [
            "block",
            "loop",
            "global.get $b",
            "i32.const 3",
            "i32.lt_s",
            "i32.eqz",
            "br_if 1",
            "global.get $b",
            "i32.const 1",
            "i32.add",
            "global.set $b",
            "br 0",
            "end",
            "end",
        ];
        assert!(has_run(&lines, &expected), "{lines:#?}");
    }

    #[test]
    fn elif_chains_close_every_if() {
        let source = "\
a = 0
if a > 2:
    a = 1
elif a < 3:
    a = 2
elif a == 3:
    a = 3
else:
    a = 4
";
        let lines = lines(source);
        let count = |word: &str| lines.iter().filter(|line| *line == word).count();
        assert_eq!((count("if"), count("else"), count("end")), (3, 3, 3));
    }

    #[test]
    fn if_without_else() {
        let lines = lines("a = 0\nif a == 0:\n    a = 1\n");
        assert!(has_run(&lines, &["i32.eq", "if", "i32.const 1", "global.set $a", "end"]));
    }

    #[test]
    fn not_lowers_to_select_block() {
        let lines = lines("x = not (1 > 2)");
        let expected = [
            "i32.gt_s",
            "i32.const 1",
            "i32.lt_s",
            "if (result i32)",
            "i32.const 1",
            "else",
            "i32.const 0",
            "end",
            "global.set $x",
        ];
        assert!(has_run(&lines, &expected), "{lines:#?}");
    }

    #[test]
    fn calls_evaluate_arguments_first() {
        let lines = lines("def add(a: int, b: int) -> int:\n    return a + b\n\nprint(max(add(1, 2), abs(-4)))");
        assert!(has_run(
            &lines,
            &["i32.const 1", "i32.const 2", "call $add", "i32.const -4", "call $abs", "call $max", "call $print"]
        ));
    }

    #[test]
    fn reserved_operators_are_rejected() {
        assert_eq!(
            generate("x = True and False"),
            Err(CodegenError::UnsupportedOperator(BinOp::And))
        );
        assert_eq!(
            generate("x = 1 is 1"),
            Err(CodegenError::UnsupportedOperator(BinOp::Is))
        );
    }

    #[test]
    fn malformed_programs_are_rejected() {
        assert_eq!(generate("y"), Err(CodegenError::UnresolvedName("y".to_string())));
        assert_eq!(generate("return 1"), Err(CodegenError::ReturnOutsideFunction));
        assert_eq!(generate("f(1)"), Err(CodegenError::UnresolvedName("f".to_string())));

        let nested = vec![Stmt::Define(FunctionDef {
            name: "outer".to_string(),
            params: vec![Parameter {
                name: "n".to_string(),
                ty: Type::Int,
            }],
            ret: Type::Int,
            body: vec![Stmt::Define(FunctionDef {
                name: "inner".to_string(),
                params: Vec::new(),
                ret: Type::None,
                body: vec![Stmt::Pass],
            })],
        })];
        assert_eq!(
            generate_module(&nested, &GlobalSet::default(), &CompileOptions::default()),
            Err(CodegenError::NestedFunction("inner".to_string()))
        );
    }

    #[test]
    fn empty_program_is_a_valid_module() {
        let lines = lines("");
        assert!(has_run(&lines, &["(local $scratch i32)", ")"]));
    }
}
