//! wasmir: streaming WebAssembly binary decoder, IR builder and validator.
//!
//! The [`binary`] reader walks a module once and announces everything it
//! decodes as [`binary::Event`]s to an [`binary::EventSink`]. Two sinks ship
//! with the crate: [`ir::IrBuilder`] materialises a [`ir::Module`] and
//! [`validator::Validator`] checks it. A tuple of sinks receives every event
//! in turn, so one pass can build and validate.

pub mod binary;
pub mod error;
pub mod features;
pub mod ir;
pub mod opcode;
pub mod types;
pub mod validator;

// Callers of `read_module` and `validate` get the error plumbing and the
// main configuration types from the crate root.
pub use anyhow::{Context, Result};
pub use binary::ReadOptions;
pub use error::{Error, ErrorKind, Errors};
pub use features::Features;
pub use ir::Module;

use binary::read_binary;
use ir::IrBuilder;
use validator::Validator;

/// Configuration for [`read_module`] and [`validate`].
#[derive(Debug, Clone)]
pub struct Config {
    pub read: ReadOptions,
    /// Run the validator alongside the IR builder.
    pub validate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read: ReadOptions::default(),
            validate: true,
        }
    }
}

/// Reads a module into IR, validating it in the same pass.
///
/// On failure the error is the offset-sorted [`Errors`] of the read, which
/// callers can recover with `downcast_ref::<Errors>()`.
///
/// # Example
/// ```no_run
/// use wasmir::{read_module, Config};
///
/// let bytes = std::fs::read("input.wasm").unwrap();
/// let module = read_module(&bytes, &Config::default()).unwrap();
/// println!("{} functions", module.funcs.len());
/// ```
pub fn read_module(bytes: &[u8], config: &Config) -> Result<Module> {
    let mut builder = IrBuilder::new(config.read.limits);
    let result = if config.validate {
        let mut validator = Validator::new(config.read.features);
        read_binary(bytes, &mut (&mut builder, &mut validator), &config.read)
    } else {
        read_binary(bytes, &mut builder, &config.read)
    };
    result.map_err(sorted)?;
    log::debug!("module read");
    Ok(builder.into_module())
}

/// Reads and validates a module without building IR.
pub fn validate(bytes: &[u8], config: &Config) -> Result<()> {
    let mut validator = Validator::new(config.read.features);
    read_binary(bytes, &mut validator, &config.read).map_err(sorted)?;
    Ok(())
}

fn sorted(mut errors: Errors) -> anyhow::Error {
    errors.sort();
    anyhow::Error::new(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_module_builds_and_validates() {
        let bytes = wat::parse_str(r#"(module (func (export "f") (result i32) i32.const 7))"#)
            .unwrap();
        let module = read_module(&bytes, &Config::default()).unwrap();
        assert_eq!(module.funcs.len(), 1);
        assert!(module.export("f").is_some());
    }

    #[test]
    fn errors_are_recoverable_from_anyhow() {
        let bytes = wat::parse_str(r#"(module (func (result i32) i64.const 7))"#).unwrap();
        let err = read_module(&bytes, &Config::default()).unwrap_err();
        let errors = err.downcast_ref::<Errors>().unwrap();
        assert!(errors.has_kind(ErrorKind::Invalid));

        // Without validation the same bytes build fine.
        let config = Config {
            validate: false,
            ..Config::default()
        };
        assert!(read_module(&bytes, &config).is_ok());
    }

    #[test]
    fn validate_reports_malformed_input() {
        let err = validate(b"\0asm\x02\0\0\0", &Config::default()).unwrap_err();
        let errors = err.downcast_ref::<Errors>().unwrap();
        assert!(errors.has_kind(ErrorKind::Malformed));
    }
}
