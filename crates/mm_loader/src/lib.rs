//! Parses the line-oriented machine-code listing into a populated [`Cpu`].
//!
//! This is the external source-loader side of the core's construction contract: it
//! never runs a program, only assembles the `(control_unit_kind, ram_image,
//! register_image, output_spec)` tuple the core asks for.

#[macro_use]
extern crate log;

mod parse;

use std::fmt;

use mm_core::{Cpu, ControlUnitKind, OutputCell, OutputSpec, RegisterName};
use mm_util::Cell;

#[derive(thiserror::Error, Debug)]
pub struct Error {
    line: usize,
    message: String,
}

impl Error {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "line {}: {}", self.line, self.message)
        }
    }
}

/// The fully-parsed contents of a source file, ready to hand to [`Cpu::new`].
#[derive(Debug, Clone)]
pub struct Image {
    pub control_unit: ControlUnitKind,
    pub address_bits: u32,
    pub word_bits: u32,
    pub protected: bool,
    pub ram_image: Vec<(u64, Cell)>,
    pub register_image: Vec<(RegisterName, Cell)>,
    pub output: Vec<OutputCell>,
}

/// Parse `input`, forcing protection on if `protect_memory` is set regardless of the
/// source's own `protect` directive.
pub fn load(input: &str, protect_memory: bool) -> Result<Image, Error> {
    let mut image = parse::parse(input)?;
    image.protected |= protect_memory;
    info!(
        "loaded {:?} program: {} ram cells, {} registers, {} output cells",
        image.control_unit,
        image.ram_image.len(),
        image.register_image.len(),
        image.output.len(),
    );
    Ok(image)
}

/// Parse `input` straight into a runnable [`Cpu`].
pub fn load_cpu(input: &str, protect_memory: bool) -> Result<Cpu, Error> {
    let image = load(input, protect_memory)?;
    Ok(Cpu::new(
        image.control_unit,
        image.address_bits,
        image.word_bits,
        image.protected,
        &image.ram_image,
        &image.register_image,
        OutputSpec::new(image.output),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loads_the_mm2_add_scenario_and_runs_it() {
        let source = "
            cu mm2
            mem 0 01 0008 000a
            mem 8 0003
            mem 10 0004
            out mem 8 16
        ";
        let mut cpu = load_cpu(source, false).unwrap();
        cpu.step();
        assert_eq!(cpu.memory(8, 16).unwrap().value(), 7);
    }

    #[test]
    fn protect_memory_flag_overrides_source() {
        let source = "cu mm2\nmem 0 01 0020 0022";
        let cpu = load_cpu(source, true).unwrap();
        assert!(!cpu.is_halted());
    }
}
