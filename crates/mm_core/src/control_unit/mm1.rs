//! One-address accumulator control unit: `[op | A1]`.
//!
//! `R1` is the accumulator: arithmetic always reads it as the first operand and
//! writes the result back into it, never to memory. `load`/`store` move values
//! between the accumulator and `A1`.

use mm_util::Cell;

use crate::alu::{Alu, AluRegisters, HaltReason};
use crate::opcode::Opcode;
use crate::ram::Ram;
use crate::register::{RegisterMemory, RegisterName};

use super::{apply_arithmetic, apply_jump, decode_opcode, ControlUnit};

pub struct Mm1 {
    word_bits: u32,
    alu_registers: AluRegisters,
}

impl Mm1 {
    pub fn new(word_bits: u32) -> Self {
        Self {
            word_bits,
            alu_registers: AluRegisters {
                r1: RegisterName::R1,
                r2: RegisterName::R2,
                s: RegisterName::R1,
                res: RegisterName::Res,
            },
        }
    }

    pub fn alu_registers(&self) -> AluRegisters {
        self.alu_registers
    }
}

impl ControlUnit for Mm1 {
    fn ir_bits(&self) -> u32 {
        self.word_bits * 2
    }

    fn word_bits(&self) -> u32 {
        self.word_bits
    }

    fn execute(&self, ir: Cell, rf: &mut RegisterMemory, ram: &mut Ram, alu: &Alu) -> Result<(), HaltReason> {
        let w = self.word_bits;
        let op_word = ir.slice(w, 2 * w);
        let a1 = ir.slice(0, w).value();
        let opcode = decode_opcode(op_word)?;

        if opcode == Opcode::Halt {
            if a1 != 0 {
                return Err(HaltReason::ReservedBits);
            }
            return Err(HaltReason::Halted);
        }

        if opcode.is_jump() {
            let addr_width = rf.width_of(RegisterName::Addr);
            rf.put(RegisterName::Addr, Cell::new(addr_width, a1));
            apply_jump(opcode, rf, alu);
            return Ok(());
        }

        match opcode {
            Opcode::Load => {
                let value = ram.fetch(a1, w)?;
                rf.put(self.alu_registers.r1, value);
            }
            Opcode::Store => {
                ram.put(a1, rf.fetch(self.alu_registers.r1));
            }
            Opcode::Comp => {
                let operand = ram.fetch(a1, w)?;
                rf.put(self.alu_registers.r2, operand);
                alu.compare(rf);
            }
            op if op.is_arithmetic() => {
                let operand = ram.fetch(a1, w)?;
                rf.put(self.alu_registers.r2, operand);
                apply_arithmetic(op, rf, alu)?;
            }
            _ => return Err(HaltReason::UnknownOpcode),
        }
        Ok(())
    }
}
