use tracing::debug;

use crate::builder::build_program;
use crate::codegen_wasm::{GlobalSet, entry_returns_value, generate_module};
use crate::error::{CoreError, SyntaxError};
use crate::syntax::{TreeCursor, parse};
use crate::typecheck::check_program;

/// Knobs that change the shape of the emitted module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Module name the builtin functions are imported from.
    pub host_module: String,
    /// Export name of the entry function.
    pub entry_export: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            host_module: "imports".to_string(),
            entry_export: "_start".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationArtifact {
    /// Encoded module.
    pub wasm: Vec<u8>,
    /// The same module printed as WAT.
    pub wat: String,
    /// Whether the entry export has an `i32` result.
    pub entry_returns_value: bool,
    /// Wasm globals in declaration order.
    pub globals: Vec<String>,
}

/// Compile source text with the bundled syntax front end.
pub fn compile(source: &str, options: &CompileOptions) -> Result<CompilationArtifact, CoreError> {
    let tree = parse(source)?;
    debug!(nodes = tree.len(), "parsed source");
    let root = tree
        .root()
        .ok_or_else(|| SyntaxError::new(0, "front end produced no root node"))?;
    compile_tree(source, &mut tree.cursor_at(root), options)
}

/// Compile a tree produced by any front end, given a cursor on its root.
///
/// The cursor is left on the root again, including when compilation
/// fails.
pub fn compile_tree<C: TreeCursor>(
    source: &str,
    cursor: &mut C,
    options: &CompileOptions,
) -> Result<CompilationArtifact, CoreError> {
    let program = build_program(source, cursor)?;
    debug!(statements = program.len(), "built program");

    let types = check_program(&program)?;
    debug!(
        functions = types.functions.len(),
        globals = types.globals.len(),
        "type checked program"
    );

    let globals = GlobalSet::collect(&program);
    let module = generate_module(&program, &globals, options)?;
    Ok(CompilationArtifact {
        wasm: module.wasm,
        wat: module.wat,
        entry_returns_value: entry_returns_value(&program),
        globals: globals.into_names(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuildError, CodegenError, TypeError};
    use crate::syntax::SyntaxTree;
    use crate::types::Type;

    #[derive(Default)]
    struct Host {
        printed: Vec<i32>,
    }

    fn pow(base: i32, exp: i32) -> i32 {
        match (base, u32::try_from(exp)) {
            (_, Ok(exp)) => base.wrapping_pow(exp),
            (1, Err(_)) => 1,
            (-1, Err(_)) => {
                if exp % 2 == 0 {
                    1
                } else {
                    -1
                }
            }
            _ => 0,
        }
    }

    fn run(artifact: &CompilationArtifact) -> (Option<i32>, Vec<i32>) {
        run_with(artifact, &CompileOptions::default())
    }

    /// Assemble the printed text, instantiate it and run the entry export.
    fn run_with(artifact: &CompilationArtifact, options: &CompileOptions) -> (Option<i32>, Vec<i32>) {
        wasmparser::validate(&artifact.wasm).expect("valid module");
        let wasm = wat::parse_str(&artifact.wat).expect("assemble wat");
        wasmparser::validate(&wasm).expect("valid module");
        let host = options.host_module.as_str();
        let entry = options.entry_export.as_str();

        let engine = wasmi::Engine::default();
        let module = wasmi::Module::new(&engine, &wasm).expect("module");
        let mut linker = wasmi::Linker::<Host>::new(&engine);
        linker
            .func_wrap(
                host,
                "print",
                |mut caller: wasmi::Caller<'_, Host>, value: i32| -> i32 {
                    caller.data_mut().printed.push(value);
                    value
                },
            )
            .expect("link print");
        linker
            .func_wrap(host, "abs", |value: i32| -> i32 { value.wrapping_abs() })
            .expect("link abs");
        linker
            .func_wrap(host, "max", |a: i32, b: i32| -> i32 { a.max(b) })
            .expect("link max");
        linker
            .func_wrap(host, "min", |a: i32, b: i32| -> i32 { a.min(b) })
            .expect("link min");
        linker
            .func_wrap(host, "pow", pow)
            .expect("link pow");

        let mut store = wasmi::Store::new(&engine, Host::default());
        let instance = linker
            .instantiate_and_start(&mut store, &module)
            .expect("instantiate");
        let result = if artifact.entry_returns_value {
            let start = instance
                .get_typed_func::<(), i32>(&store, entry)
                .expect("typed func");
            Some(start.call(&mut store, ()).expect("execute entry"))
        } else {
            let start = instance
                .get_typed_func::<(), ()>(&store, entry)
                .expect("typed func");
            start.call(&mut store, ()).expect("execute entry");
            None
        };
        let printed = std::mem::take(&mut store.data_mut().printed);
        (result, printed)
    }

    fn compile_default(source: &str) -> Result<CompilationArtifact, CoreError> {
        compile(source, &CompileOptions::default())
    }

    fn eval(source: &str) -> Option<i32> {
        let artifact = compile_default(source).expect("compile should succeed");
        run(&artifact).0
    }

    #[test]
    fn evaluates_global_assignment() {
        assert_eq!(eval("x = 5\nx"), Some(5));
    }

    #[test]
    fn calls_user_functions() {
        let source = "def add(a: int, b: int) -> int:\n    return a + b\n\nadd(2, 3)";
        assert_eq!(eval(source), Some(5));
    }

    #[test]
    fn runs_while_loops() {
        let artifact = compile_default("b = 0\nwhile b < 3:\n    b = b + 1\n    print(b)\nb")
            .expect("compile should succeed");
        assert_eq!(run(&artifact), (Some(3), vec![1, 2, 3]));
    }

    #[test]
    fn takes_the_first_true_branch() {
        let source = "\
a = 0
if 1 > 2:
    a = 1
elif 2 < 3:
    a = 2
else:
    a = 3
a";
        assert_eq!(eval(source), Some(2));
    }

    #[test]
    fn branch_locals_do_not_escape() {
        let source = "if 1 > 2:\n    a = 1\nelif 2 < 3:\n    a = 2\nelse:\n    a = 3\na";
        assert_eq!(
            compile_default(source),
            Err(CoreError::Type(TypeError::UndefinedVariable("a".to_string())))
        );
    }

    #[test]
    fn reports_return_type_mismatch() {
        assert_eq!(
            compile_default("def f(a: int) -> int:\n    return True\n"),
            Err(CoreError::Type(TypeError::ReturnTypeMismatch {
                expected: Type::Int,
                got: Type::Boolean,
            }))
        );
    }

    #[test]
    fn reports_arity_mismatch() {
        assert_eq!(
            compile_default("def add(a: int, b: int) -> int:\n    return a + b\n\nadd(1)"),
            Err(CoreError::Type(TypeError::ArityMismatch {
                name: "add".to_string(),
                expected: 2,
                got: 1,
            }))
        );
    }

    #[test]
    fn integer_arithmetic_truncates() {
        assert_eq!(eval("7 // 2 + 7 % 3 * 10"), Some(13));
        assert_eq!(eval("-7 // 2"), Some(-3));
        assert_eq!(eval("x = 4\n-x + 1"), Some(-3));
    }

    #[test]
    fn booleans_are_zero_or_one() {
        assert_eq!(eval("1 < 2"), Some(1));
        assert_eq!(eval("not (1 < 2)"), Some(0));
        assert_eq!(eval("not False"), Some(1));
        assert_eq!(eval("(3 >= 3) == True"), Some(1));
    }

    #[test]
    fn calls_host_builtins() {
        let artifact = compile_default("print(abs(-4))\nprint(max(2, 9))\nmin(pow(2, 5), 40)")
            .expect("compile should succeed");
        assert_eq!(run(&artifact), (Some(32), vec![4, 9]));
    }

    #[test]
    fn pow_keeps_unit_bases_for_negative_exponents() {
        assert_eq!(eval("pow(2, -1)"), Some(0));
        assert_eq!(eval("pow(1, -3)"), Some(1));
        assert_eq!(eval("pow(-1, -3)"), Some(-1));
        assert_eq!(eval("pow(-1, -2)"), Some(1));
    }

    #[test]
    fn recursive_functions_work() {
        let source = "\
def fact(n: int) -> int:
    if n <= 1:
        return 1
    return n * fact(n - 1)

fact(5)";
        assert_eq!(eval(source), Some(120));
    }

    #[test]
    fn function_locals_and_globals_stay_distinct() {
        let source = "\
x = 10
def f() -> int:
    x = 1
    return x

f() + x";
        assert_eq!(eval(source), Some(11));
    }

    #[test]
    fn functions_read_globals_at_call_time() {
        let source = "\
g = 1
def read() -> int:
    return g

g = 5
read()";
        assert_eq!(eval(source), Some(5));
    }

    #[test]
    fn loops_with_locals_inside_functions() {
        let source = "\
def sum_to(n: int) -> int:
    total = 0
    i = 1
    while i <= n:
        total = total + i
        i = i + 1
    return total

sum_to(10)";
        assert_eq!(eval(source), Some(55));
    }

    #[test]
    fn none_functions_return_zero() {
        let source = "def log(n: int):\n    print(n)\n\nlog(7)";
        let artifact = compile_default(source).expect("compile should succeed");
        assert_eq!(run(&artifact), (Some(0), vec![7]));
    }

    #[test]
    fn statement_programs_have_no_result() {
        let artifact = compile_default("x = 1\nprint(x)\ny = 2").expect("compile should succeed");
        assert!(!artifact.entry_returns_value);
        assert_eq!(artifact.globals, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(run(&artifact), (None, vec![1]));
    }

    #[test]
    fn empty_program_has_no_result() {
        let artifact = compile_default("").expect("compile should succeed");
        assert!(!artifact.entry_returns_value);
        assert!(artifact.globals.is_empty());
        assert_eq!(run(&artifact), (None, Vec::new()));
    }

    #[test]
    fn compilation_is_idempotent() {
        let source = "\
def f(n: int) -> int:
    a = n
    if a > 0:
        b = a * 2
        return b
    return 0

x = f(3)
while x > 0:
    x = x - 1
x";
        let first = compile_default(source).expect("compile should succeed");
        let second = compile_default(source).expect("compile should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn reserved_operators_are_rejected_by_codegen() {
        assert_eq!(
            compile_default("x = True or False"),
            Err(CoreError::Codegen(CodegenError::UnsupportedOperator(
                crate::ast::BinOp::Or
            )))
        );
    }

    #[test]
    fn syntax_errors_surface_unchanged() {
        assert!(matches!(
            compile_default("x = (1"),
            Err(CoreError::Syntax(_))
        ));
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let parens = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        assert!(matches!(compile_default(&parens), Err(CoreError::Syntax(_))));

        let chain = format!("1{}", " + 1".repeat(2_000));
        assert!(matches!(
            compile_default(&chain),
            Err(CoreError::Build(BuildError::TreeTooDeep { .. }))
        ));

        let nested = format!("{}41{} + 1", "(".repeat(150), ")".repeat(150));
        assert_eq!(eval(&nested), Some(42));
    }

    #[test]
    fn options_shape_the_module() {
        let options = CompileOptions {
            host_module: "host".to_string(),
            entry_export: "main".to_string(),
        };
        let artifact = compile("print(1)", &options).expect("compile should succeed");
        assert!(artifact.wat.contains("(import \"host\" \"print\""));
        assert!(artifact.wat.contains("(export \"main\""));
        assert_eq!(run_with(&artifact, &options), (None, vec![1]));
    }

    #[test]
    fn option_strings_survive_quotes_and_backslashes() {
        let options = CompileOptions {
            host_module: "a\\b".to_string(),
            entry_export: "ma\"in".to_string(),
        };
        let artifact = compile("print(6)\n7", &options).expect("compile should succeed");
        assert_eq!(run_with(&artifact, &options), (Some(7), vec![6]));
    }

    #[test]
    fn compiles_from_an_external_tree() {
        let source = "x = 41\nx + 1";
        let tree: SyntaxTree = parse(source).expect("parse");
        let artifact = compile_tree(source, &mut tree.cursor(), &CompileOptions::default())
            .expect("compile should succeed");
        assert_eq!(run(&artifact).0, Some(42));
    }
}
