//! The execution engine of the model-machine family: bit-precise cells and numeric
//! primitives come from [`mm_util`]; this crate adds the register file, RAM, ALU,
//! control-unit variants and the `Cpu` that composes them.

#[macro_use]
extern crate log;

#[cfg(test)]
mod test;

pub mod alu;
pub mod control_unit;
pub mod cpu;
pub mod opcode;
pub mod ram;
pub mod register;

pub use alu::{Alu, AluRegisters, Comparison, HaltReason};
pub use control_unit::{ControlUnit, Mm0, Mm1, Mm2, Mm3};
pub use cpu::{Cpu, ControlUnitKind, OutputCell, OutputSpec};
pub use opcode::Opcode;
pub use ram::Ram;
pub use register::{RegisterMemory, RegisterName};

pub use mm_util::{numeric, Cell};
