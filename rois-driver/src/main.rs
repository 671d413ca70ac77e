//! Rois Compiler Driver
//!
//! `roisc` reads a serialized IR module (JSON, as produced by a front
//! end), verifies it, runs the optimizer and writes assembly or C.

mod demos;

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use rois_common::{CompileOptions, CompilerError, Target};
use rois_ir::Module;
use rois_opt::PassManager;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "roisc")]
#[command(about = "Rois compiler back end")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TargetArg {
    Asm,
    C,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Asm => Target::Asm,
            TargetArg::C => Target::C,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON-serialized IR module
    Compile {
        /// Input module
        input: PathBuf,

        /// Output file (defaults to the input with the target's extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum)]
        target: Option<TargetArg>,

        /// Skip constant folding and dead-tail elimination
        #[arg(long)]
        no_opt: bool,

        /// Print the IR after optimization
        #[arg(long)]
        print_ir: bool,

        /// JSON file with default compile options
        #[arg(long)]
        config: Option<PathBuf>,

        /// Debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compile one of the built-in demo programs (sum, branch, call)
    Demo {
        name: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum)]
        target: Option<TargetArg>,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Compile { verbose: true, .. });
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Compile { input, output, target, no_opt, print_ir, config, verbose } => {
            load_options(config.as_deref(), target, no_opt, verbose)
                .and_then(|options| compile_file(&input, output.as_deref(), &options, print_ir))
        }
        Commands::Demo { name, output, target } => {
            let options = CompileOptions {
                target: target.map(Target::from).unwrap_or_default(),
                ..CompileOptions::default()
            };
            run_demo(&name, output.as_deref(), &options)
        }
    };

    if let Err(e) = result {
        eprintln!("error[{}]: {}", e.class(), e);
        std::process::exit(1);
    }
}

fn io_error(path: &Path, err: impl std::fmt::Display) -> CompilerError {
    CompilerError::IoError { message: format!("{}: {}", path.display(), err) }
}

/// Options from the config file, overridden by command-line flags
fn load_options(
    config: Option<&Path>,
    target: Option<TargetArg>,
    no_opt: bool,
    verbose: bool,
) -> Result<CompileOptions, CompilerError> {
    let mut options = match config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
            serde_json::from_str(&text).map_err(|e| io_error(path, e))?
        }
        None => CompileOptions::default(),
    };
    if let Some(target) = target {
        options.target = target.into();
    }
    if no_opt {
        options.optimize = false;
    }
    options.verbose |= verbose;
    debug!("compile options: {options:?}");
    Ok(options)
}

/// Verify, optimize and emit one module
fn compile_module(mut module: Module, options: &CompileOptions, print_ir: bool) -> Result<String, CompilerError> {
    module.verify()?;
    if options.optimize {
        let changed = PassManager::new().run(&mut module)?;
        debug!("optimizer changed module: {changed}");
        module.verify()?;
    }
    if print_ir || options.verbose {
        println!("{module}");
    }
    Ok(rois_codegen::generate(&module, options)?)
}

fn compile_file(
    input: &Path,
    output: Option<&Path>,
    options: &CompileOptions,
    print_ir: bool,
) -> Result<(), CompilerError> {
    info!("compiling {}", input.display());
    let text = fs::read_to_string(input).map_err(|e| io_error(input, e))?;
    let module: Module = serde_json::from_str(&text).map_err(|e| io_error(input, e))?;

    let code = compile_module(module, options, print_ir)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension(options.target.extension()));
    fs::write(&output, code).map_err(|e| io_error(&output, e))?;
    info!("wrote {}", output.display());
    Ok(())
}

fn run_demo(name: &str, output: Option<&Path>, options: &CompileOptions) -> Result<(), CompilerError> {
    let module = demos::demo(name)?;
    let code = compile_module(module, options, false)?;
    match output {
        Some(path) => fs::write(path, code).map_err(|e| io_error(path, e))?,
        None => print!("{code}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("options.json");
        fs::write(&config, r#"{ "target": "c", "runtime_include": "rt" }"#).unwrap();

        let options = load_options(Some(&config), None, true, false).unwrap();
        assert_eq!(options.target, Target::C);
        assert_eq!(options.runtime_include, "rt");
        assert!(!options.optimize);

        let options = load_options(Some(&config), Some(TargetArg::Asm), false, false).unwrap();
        assert_eq!(options.target, Target::Asm);
        assert!(options.optimize);
    }

    #[test]
    fn test_missing_config() {
        let err = load_options(Some(Path::new("/nonexistent/options.json")), None, false, false).unwrap_err();
        assert_eq!(err.class(), "io");
    }

    #[test]
    fn test_compile_json_module() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sum.json");
        let module = demos::demo("sum").unwrap();
        fs::write(&input, serde_json::to_string(&module).unwrap()).unwrap();

        compile_file(&input, None, &CompileOptions::default(), false).unwrap();
        let asm = fs::read_to_string(dir.path().join("sum.asm")).unwrap();
        assert!(asm.contains("global main"));
        assert!(asm.contains("\tcall f"));

        let c = CompileOptions { target: Target::C, ..CompileOptions::default() };
        compile_file(&input, None, &c, false).unwrap();
        let text = fs::read_to_string(dir.path().join("sum.c")).unwrap();
        assert!(text.contains("int main(void) {"));
    }

    #[test]
    fn test_invalid_module_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.json");
        fs::write(&input, "{ \"name\": 3 }").unwrap();
        let err = compile_file(&input, None, &CompileOptions::default(), false).unwrap_err();
        assert_eq!(err.class(), "io");
    }

    #[test]
    fn test_branch_demo_folds() {
        let module = demos::demo("branch").unwrap();
        let code = compile_module(module, &CompileOptions::default(), false).unwrap();
        // the constant condition in main leaves a single unconditional jump
        assert!(code.contains("\tjmp main_bb1\n"));
        assert!(!code.contains("main_bb0_1_else"));
    }
}
