//! Zero-address stack control unit: `[op]` for arithmetic/comp/halt, `[op | A1]` for
//! `push`/jumps. Operands live on a runtime stack in RAM addressed by `SP`, which
//! grows downward: `push` writes at `SP` then decrements it, `pop` increments `SP`
//! then reads. The loader is responsible for giving `SP` its initial (top-of-stack)
//! value; this unit only ever moves it relative to itself.

use mm_util::Cell;

use crate::alu::{Alu, AluRegisters, HaltReason};
use crate::opcode::Opcode;
use crate::ram::Ram;
use crate::register::{RegisterMemory, RegisterName};

use super::{apply_arithmetic, apply_jump, decode_opcode, ControlUnit};

pub struct Mm0 {
    word_bits: u32,
    alu_registers: AluRegisters,
}

impl Mm0 {
    pub fn new(word_bits: u32) -> Self {
        Self {
            word_bits,
            alu_registers: AluRegisters {
                r1: RegisterName::R1,
                r2: RegisterName::R2,
                s: RegisterName::S,
                res: RegisterName::Res,
            },
        }
    }

    pub fn alu_registers(&self) -> AluRegisters {
        self.alu_registers
    }
}

fn push(rf: &mut RegisterMemory, ram: &mut Ram, value: Cell) {
    let sp = rf.fetch(RegisterName::Sp).value();
    ram.put(sp, value);
    let sp_width = rf.width_of(RegisterName::Sp);
    rf.put(RegisterName::Sp, Cell::new(sp_width, sp.wrapping_sub(1)));
}

fn pop(rf: &mut RegisterMemory, ram: &mut Ram, w: u32) -> Result<Cell, HaltReason> {
    let sp = rf.fetch(RegisterName::Sp).value().wrapping_add(1);
    let sp_width = rf.width_of(RegisterName::Sp);
    rf.put(RegisterName::Sp, Cell::new(sp_width, sp));
    ram.fetch(sp, w)
}

impl ControlUnit for Mm0 {
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
            Opcode::Push => {
                push(rf, ram, Cell::new(w, a1));
            }
            Opcode::Pop => {
                if a1 != 0 {
                    return Err(HaltReason::ReservedBits);
                }
                pop(rf, ram, w)?;
            }
            Opcode::Comp => {
                if a1 != 0 {
                    return Err(HaltReason::ReservedBits);
                }
                let r2 = pop(rf, ram, w)?;
                let r1 = pop(rf, ram, w)?;
                rf.put(self.alu_registers.r1, r1);
                rf.put(self.alu_registers.r2, r2);
                alu.compare(rf);
            }
            op if op.is_arithmetic() => {
                if a1 != 0 {
                    return Err(HaltReason::ReservedBits);
                }
                let r2 = pop(rf, ram, w)?;
                let r1 = pop(rf, ram, w)?;
                rf.put(self.alu_registers.r1, r1);
                rf.put(self.alu_registers.r2, r2);
                apply_arithmetic(op, rf, alu)?;
                let s = rf.fetch(self.alu_registers.s);
                push(rf, ram, s);
                if op.is_dword_write_back() {
                    let res = rf.fetch(self.alu_registers.res);
                    push(rf, ram, res);
                }
            }
            _ => return Err(HaltReason::UnknownOpcode),
        }
        Ok(())
    }
}
