//! Composes RAM, registers, the ALU and a chosen control unit into a runnable machine.

use std::io::{self, Write};

use mm_util::Cell;

use crate::alu::{Alu, HaltReason};
use crate::control_unit::{self, ControlUnit, Mm0, Mm1, Mm2, Mm3};
use crate::ram::Ram;
use crate::register::{RegisterMemory, RegisterName};

/// Which instruction-layout variant a program was assembled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlUnitKind {
    /// `[op]`/`[op|A1]`, operands on a runtime stack.
    Mm0,
    /// `[op|A1]`, accumulator in `R1`.
    Mm1,
    /// `[op|A1|A2]`, arithmetic writes back to `A1`.
    Mm2,
    /// `[op|A1|A2|A3]`, arithmetic writes to `A3`.
    Mm3,
}

/// A register or memory cell the loader asked to have printed after `run()`.
#[derive(Debug, Clone, Copy)]
pub enum OutputCell {
    Register(RegisterName),
    Memory { address: u64, bits: u32 },
}

/// The set of registers/memory cells a program's source declared as its result.
#[derive(Debug, Clone, Default)]
pub struct OutputSpec {
    pub cells: Vec<OutputCell>,
}

impl OutputSpec {
    pub fn new(cells: Vec<OutputCell>) -> Self {
        Self { cells }
    }
}

/// `CPU` owns its `Ram`, `RegisterMemory`, `Alu` and `ControlUnit` outright; nothing
/// outlives it and nothing else references its state.
pub struct Cpu {
    ram: Ram,
    registers: RegisterMemory,
    alu: Alu,
    control_unit: Box<dyn ControlUnit>,
    output_spec: OutputSpec,
    halt_reason: Option<HaltReason>,
}

fn make_control_unit(kind: ControlUnitKind, word_bits: u32) -> Box<dyn ControlUnit> {
    match kind {
        ControlUnitKind::Mm0 => Box::new(Mm0::new(word_bits)),
        ControlUnitKind::Mm1 => Box::new(Mm1::new(word_bits)),
        ControlUnitKind::Mm2 => Box::new(Mm2::new(word_bits)),
        ControlUnitKind::Mm3 => Box::new(Mm3::new(word_bits)),
    }
}

/// The register widths common to every variant, plus the variant-specific `IR` width.
fn register_widths(kind: ControlUnitKind, address_bits: u32, word_bits: u32, ir_bits: u32) -> Vec<(RegisterName, u32)> {
    let mut widths = vec![
        (RegisterName::Pc, address_bits),
        (RegisterName::Ir, ir_bits),
        (RegisterName::Flags, word_bits),
        (RegisterName::Addr, address_bits),
        (RegisterName::R1, word_bits),
        (RegisterName::R2, word_bits),
        (RegisterName::S, word_bits),
        (RegisterName::Res, word_bits),
    ];
    if kind == ControlUnitKind::Mm0 {
        widths.push((RegisterName::Sp, address_bits));
    }
    widths
}

impl Cpu {
    /// Build a fresh CPU: `IP = 0`, `FLAGS = 0`, every RAM cell unwritten, every
    /// register zero before `ram_image`/`register_image` are applied.
    pub fn new(
        kind: ControlUnitKind,
        address_bits: u32,
        word_bits: u32,
        protected: bool,
        ram_image: &[(u64, Cell)],
        register_image: &[(RegisterName, Cell)],
        output_spec: OutputSpec,
    ) -> Self {
        let control_unit = make_control_unit(kind, word_bits);
        let ir_bits = control_unit.ir_bits();

        let mut ram = Ram::new(address_bits, word_bits, protected);
        for &(address, value) in ram_image {
            ram.put(address, value);
        }

        let mut registers = RegisterMemory::new(&register_widths(kind, address_bits, word_bits, ir_bits));
        for &(name, value) in register_image {
            registers.put(name, value);
        }

        let alu_registers = match kind {
            ControlUnitKind::Mm0 => Mm0::new(word_bits).alu_registers(),
            ControlUnitKind::Mm1 => Mm1::new(word_bits).alu_registers(),
            ControlUnitKind::Mm2 => Mm2::new(word_bits).alu_registers(),
            ControlUnitKind::Mm3 => Mm3::new(word_bits).alu_registers(),
        };
        let alu = Alu::new(alu_registers, word_bits);

        Self {
            ram,
            registers,
            alu,
            control_unit,
            output_spec,
            halt_reason: None,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.alu.is_halted(&self.registers)
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt_reason
    }

    pub fn register(&self, name: RegisterName) -> Cell {
        self.registers.fetch(name)
    }

    pub fn memory(&mut self, address: u64, bits: u32) -> Result<Cell, HaltReason> {
        self.ram.fetch(address, bits)
    }

    pub fn access_count(&self) -> u64 {
        self.ram.access_count()
    }

    pub fn write_count(&self) -> u64 {
        self.ram.write_count()
    }

    /// Advance one step. A no-op once halted. Returns the next `IP` so a debugger can
    /// display it before the following instruction runs.
    pub fn step(&mut self) -> u64 {
        if let Some(reason) = control_unit::step(&*self.control_unit, &mut self.registers, &mut self.ram, &self.alu) {
            self.halt_reason = Some(reason);
        }
        self.registers.fetch(RegisterName::Pc).value()
    }

    /// Step until `FLAGS.HALT` is set.
    pub fn run(&mut self) {
        if let Some(reason) = control_unit::run(&*self.control_unit, &mut self.registers, &mut self.ram, &self.alu) {
            self.halt_reason = Some(reason);
        }
        info!(
            "run finished after {} memory accesses, {} writes",
            self.ram.access_count(),
            self.ram.write_count(),
        );
    }

    /// Render the program's declared output cells to `out`, one per line.
    pub fn print_result(&mut self, out: &mut impl Write) -> io::Result<()> {
        if let Some(reason) = self.halt_reason {
            writeln!(out, "halted: {reason}")?;
        }
        let cells: Vec<OutputCell> = self.output_spec.cells.clone();
        for cell in cells {
            match cell {
                OutputCell::Register(name) => {
                    writeln!(out, "{name} = {}", self.registers.fetch(name))?;
                }
                OutputCell::Memory { address, bits } => {
                    let value = self.ram.fetch(address, bits).unwrap_or(Cell::zero(bits));
                    writeln!(out, "[{address:#x}] = {value}")?;
                }
            }
        }
        Ok(())
    }
}
