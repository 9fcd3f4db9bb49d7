use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing::level_filters::LevelFilter;
use typy_core::{CompilationArtifact, CompileOptions, compile};
use wasmi::{Engine, Linker, Module, Store};

/// Compile a typed Python subset to WebAssembly text.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file to compile (reads stdin when absent)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the compiled module (stdout when absent)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = Emit::Wat)]
    emit: Emit,

    #[arg(long, help = "Execute the compiled program with the bundled host functions")]
    run: bool,

    #[arg(
        long,
        value_name = "NAME",
        default_value = "imports",
        help = "Module name builtins are imported from"
    )]
    host_module: String,

    #[arg(
        long,
        value_name = "NAME",
        default_value = "_start",
        help = "Export name of the entry function"
    )]
    entry: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Wat,
    Wasm,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    let (source, name) = match &cli.input {
        Some(path) => (
            fs::read_to_string(path)
                .with_context(|| format!("failed to read input file {}", path.display()))?,
            path.display().to_string(),
        ),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read source from stdin")?;
            (buffer, "<stdin>".to_string())
        }
    };

    let options = CompileOptions {
        host_module: cli.host_module.clone(),
        entry_export: cli.entry.clone(),
    };
    let artifact = compile(&source, &options).with_context(|| format!("failed to compile {name}"))?;
    debug!(
        globals = artifact.globals.len(),
        returns_value = artifact.entry_returns_value,
        "compiled {name}"
    );

    let bytes = match cli.emit {
        Emit::Wat => artifact.wat.clone().into_bytes(),
        Emit::Wasm => artifact.wasm.clone(),
    };
    match &cli.output {
        Some(path) => write_output(path, &bytes)?,
        // With --run the program's own output goes to stdout instead.
        None if !cli.run => io::stdout()
            .write_all(&bytes)
            .context("failed to write module to stdout")?,
        None => {}
    }

    if cli.run {
        if let Some(result) = run_wasm(&artifact, &options)? {
            println!("Program exited with {result}");
        }
    }

    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

/// Run the entry export, returning its result when it has one.
fn run_wasm(artifact: &CompilationArtifact, options: &CompileOptions) -> Result<Option<i32>> {
    let engine = Engine::default();
    let module = Module::new(&engine, &artifact.wasm).context("failed to compile wasm artifact")?;
    let mut linker = Linker::<()>::new(&engine);
    link_host(&mut linker, &options.host_module)?;

    let mut store = Store::new(&engine, ());
    let instance = linker
        .instantiate_and_start(&mut store, &module)
        .context("failed to instantiate module")?;

    let entry = options.entry_export.as_str();
    if artifact.entry_returns_value {
        let start = instance
            .get_typed_func::<(), i32>(&store, entry)
            .with_context(|| format!("exported {entry} function missing or has wrong type"))?;
        let result = start
            .call(&mut store, ())
            .with_context(|| format!("failed to execute {entry}"))?;
        Ok(Some(result))
    } else {
        let start = instance
            .get_typed_func::<(), ()>(&store, entry)
            .with_context(|| format!("exported {entry} function missing or has wrong type"))?;
        start
            .call(&mut store, ())
            .with_context(|| format!("failed to execute {entry}"))?;
        Ok(None)
    }
}

fn link_host(linker: &mut Linker<()>, module: &str) -> Result<()> {
    linker
        .func_wrap(module, "print", |value: i32| -> i32 {
            println!("{value}");
            value
        })
        .context("failed to link print")?;
    linker
        .func_wrap(module, "abs", |value: i32| -> i32 { value.wrapping_abs() })
        .context("failed to link abs")?;
    linker
        .func_wrap(module, "max", |a: i32, b: i32| -> i32 { a.max(b) })
        .context("failed to link max")?;
    linker
        .func_wrap(module, "min", |a: i32, b: i32| -> i32 { a.min(b) })
        .context("failed to link min")?;
    linker
        .func_wrap(module, "pow", pow)
        .context("failed to link pow")?;
    Ok(())
}

/// Integer power. A negative exponent gives the truncated reciprocal,
/// which is zero unless the base is 1 or -1.
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
