use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use wasmir::{read_module, validate, Config, Errors, Features, Module};

/// wasmir: read and validate WebAssembly binaries.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input WebAssembly binaries (.wasm)
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Enable a proposal (repeatable)
    #[arg(long, value_name = "NAME", value_parser = feature_name)]
    enable: Vec<String>,

    /// Disable a proposal (repeatable)
    #[arg(long, value_name = "NAME", value_parser = feature_name)]
    disable: Vec<String>,

    /// Enable every proposal
    #[arg(long)]
    enable_all: bool,

    /// Report errors in custom sections as warnings
    #[arg(long)]
    ignore_custom_section_errors: bool,

    /// Do not decode the name section
    #[arg(long)]
    no_debug_names: bool,

    /// Print a summary of the IR of each module
    #[arg(long)]
    dump_ir: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn feature_name(name: &str) -> Result<String, String> {
    if Features::NAMES.contains(&name) {
        Ok(name.to_string())
    } else {
        Err(format!("expected one of: {}", Features::NAMES.join(", ")))
    }
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::default();
        let read = &mut config.read;
        if self.enable_all {
            read.features = Features::all();
        }
        for name in &self.enable {
            read.features.set(name, true);
        }
        for name in &self.disable {
            read.features.set(name, false);
        }
        read.fail_on_custom_section_error = !self.ignore_custom_section_errors;
        read.read_debug_names = !self.no_debug_names;
        read.stop_on_first_error = false;
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = cli.config();
    let mut failed = false;
    for path in &cli.files {
        if let Err(err) = run(path, &config, cli.dump_ir) {
            failed = true;
            match err.downcast_ref::<Errors>() {
                Some(errors) => eprint!("{}", errors.with_file(&path.display().to_string())),
                None => eprintln!("wasmir: {err:#}"),
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(path: &Path, config: &Config, dump_ir: bool) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    log::debug!("read {} ({} bytes)", path.display(), bytes.len());
    if !dump_ir {
        return validate(&bytes, config);
    }
    let module = read_module(&bytes, config)?;
    print!("{}", summary(&module));
    Ok(())
}

fn summary(module: &Module) -> String {
    let mut out = String::new();
    if let Some(name) = &module.name {
        out.push_str(&format!("module {name}\n"));
    }
    let counts = [
        ("types", module.types.len()),
        ("imports", module.imports.len()),
        ("funcs", module.funcs.len()),
        ("tables", module.tables.len()),
        ("memories", module.memories.len()),
        ("globals", module.globals.len()),
        ("tags", module.tags.len()),
        ("exports", module.exports.len()),
        ("elem segments", module.elem_segments.len()),
        ("data segments", module.data_segments.len()),
        ("custom sections", module.customs.len()),
    ];
    for (what, count) in counts.iter().filter(|(_, count)| *count > 0) {
        out.push_str(&format!("{what}: {count}\n"));
    }
    for (index, func) in module.funcs.iter().enumerate() {
        let name = func.name.as_deref().unwrap_or("");
        if func.imported {
            out.push_str(&format!("func[{index}] {name} {} (import)\n", func.sig));
        } else {
            let exprs = module.exprs.iter(func.exprs).count();
            out.push_str(&format!(
                "func[{index}] {name} {} locals={} exprs={exprs}\n",
                func.sig,
                func.locals.len()
            ));
        }
    }
    for export in &module.exports {
        out.push_str(&format!(
            "export \"{}\" {} {}\n",
            export.name, export.kind, export.var
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["wasmir", "input.wasm"]);
        assert_eq!(cli.files, vec![PathBuf::from("input.wasm")]);
        assert!(cli.enable.is_empty());
        assert!(!cli.dump_ir);
        assert_eq!(cli.verbose, 0);
        let config = cli.config();
        assert!(config.validate);
        assert!(config.read.read_debug_names);
        assert_eq!(config.read.features, Features::default());
    }

    #[test]
    fn cli_feature_flags() {
        let cli = Cli::parse_from([
            "wasmir",
            "--enable",
            "threads",
            "--disable",
            "simd",
            "-vv",
            "a.wasm",
            "b.wasm",
        ]);
        assert_eq!(cli.files.len(), 2);
        assert_eq!(cli.verbose, 2);
        let features = cli.config().read.features;
        assert!(features.threads);
        assert!(!features.simd);
    }

    #[test]
    fn cli_rejects_unknown_feature() {
        let result = Cli::try_parse_from(["wasmir", "--enable", "warp-drive", "a.wasm"]);
        assert!(result.is_err());
    }

    #[test]
    fn summary_lists_functions_and_exports() {
        let bytes = wat::parse_str(
            r#"(module (func $main (export "main") (param i32) (local i64) nop))"#,
        )
        .unwrap();
        let module = read_module(&bytes, &Config::default()).unwrap();
        let text = summary(&module);
        assert!(text.contains("funcs: 1"), "{text}");
        assert!(text.contains("locals=1"), "{text}");
        assert!(text.contains("export \"main\" func 0"), "{text}");
    }
}
