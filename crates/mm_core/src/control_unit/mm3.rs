//! Three-address control unit: `[op | A1 | A2 | A3]`.
//!
//! Arithmetic reads `A1`/`A2`, writes its result to `A3` -- unlike the two-address
//! form, operands are never overwritten. `comp` and `move` reserve the field they
//! don't use; jumps reserve `A1`/`A2` and use `A3` as the target, by the same
//! convention as the two-address form's `A1`.

use mm_util::Cell;

use crate::alu::{Alu, AluRegisters, HaltReason};
use crate::opcode::Opcode;
use crate::ram::Ram;
use crate::register::{RegisterMemory, RegisterName};

use super::{apply_arithmetic, apply_jump, decode_opcode, ControlUnit};

pub struct Mm3 {
    word_bits: u32,
    alu_registers: AluRegisters,
}

impl Mm3 {
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

impl ControlUnit for Mm3 {
    fn ir_bits(&self) -> u32 {
        self.word_bits * 4
    }

    fn word_bits(&self) -> u32 {
        self.word_bits
    }

    fn execute(&self, ir: Cell, rf: &mut RegisterMemory, ram: &mut Ram, alu: &Alu) -> Result<(), HaltReason> {
        let w = self.word_bits;
        let op_word = ir.slice(3 * w, 4 * w);
        let a1 = ir.slice(2 * w, 3 * w).value();
        let a2 = ir.slice(w, 2 * w).value();
        let a3 = ir.slice(0, w).value();
        let opcode = decode_opcode(op_word)?;

        if opcode == Opcode::Halt {
            if a1 != 0 || a2 != 0 || a3 != 0 {
                return Err(HaltReason::ReservedBits);
            }
            return Err(HaltReason::Halted);
        }

        if opcode.is_jump() {
            if a1 != 0 || a2 != 0 {
                return Err(HaltReason::ReservedBits);
            }
            let addr_width = rf.width_of(RegisterName::Addr);
            rf.put(RegisterName::Addr, Cell::new(addr_width, a3));
            apply_jump(opcode, rf, alu);
            return Ok(());
        }

        match opcode {
            Opcode::Comp => {
                if a3 != 0 {
                    return Err(HaltReason::ReservedBits);
                }
                load_pair(self.alu_registers, rf, ram, w, a1, a2)?;
                alu.compare(rf);
            }
            Opcode::Move => {
                if a2 != 0 {
                    return Err(HaltReason::ReservedBits);
                }
                let value = ram.fetch(a1, w)?;
                ram.put(a3, value);
            }
            op if op.is_arithmetic() => {
                load_pair(self.alu_registers, rf, ram, w, a1, a2)?;
                apply_arithmetic(op, rf, alu)?;
                ram.put(a3, rf.fetch(self.alu_registers.s));
                if op.is_dword_write_back() {
                    ram.put(a3.wrapping_add(1), rf.fetch(self.alu_registers.res));
                }
            }
            _ => return Err(HaltReason::UnknownOpcode),
        }
        Ok(())
    }
}

fn load_pair(
    regs: AluRegisters,
    rf: &mut RegisterMemory,
    ram: &mut Ram,
    w: u32,
    a1: u64,
    a2: u64,
) -> Result<(), HaltReason> {
    let r1 = ram.fetch(a1, w)?;
    let r2 = ram.fetch(a2, w)?;
    rf.put(regs.r1, r1);
    rf.put(regs.r2, r2);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::control_unit::step;

    const WIDTH: u32 = 16;

    fn machine() -> (Mm3, Alu, RegisterMemory, Ram) {
        let cu = Mm3::new(WIDTH);
        let alu = Alu::new(cu.alu_registers(), WIDTH);
        let rf = RegisterMemory::new(&[
            (RegisterName::Pc, WIDTH),
            (RegisterName::Ir, cu.ir_bits()),
            (RegisterName::Flags, WIDTH),
            (RegisterName::Addr, WIDTH),
            (RegisterName::R1, WIDTH),
            (RegisterName::R2, WIDTH),
            (RegisterName::S, WIDTH),
            (RegisterName::Res, WIDTH),
        ]);
        let ram = Ram::new(16, WIDTH, false);
        (cu, alu, rf, ram)
    }

    fn write_instruction(ram: &mut Ram, addr: u64, opcode: Opcode, a1: u64, a2: u64, a3: u64) {
        ram.put(addr, Cell::new(WIDTH, opcode.encode()));
        ram.put(addr + 1, Cell::new(WIDTH, a1));
        ram.put(addr + 2, Cell::new(WIDTH, a2));
        ram.put(addr + 3, Cell::new(WIDTH, a3));
    }

    #[test]
    fn arithmetic_leaves_operands_untouched() {
        let (cu, alu, mut rf, mut ram) = machine();
        write_instruction(&mut ram, 0, Opcode::Add, 8, 10, 12);
        ram.put(8, Cell::new(WIDTH, 3));
        ram.put(10, Cell::new(WIDTH, 4));

        step(&cu, &mut rf, &mut ram, &alu);

        assert_eq!(ram.fetch(8, WIDTH).unwrap().value(), 3);
        assert_eq!(ram.fetch(10, WIDTH).unwrap().value(), 4);
        assert_eq!(ram.fetch(12, WIDTH).unwrap().value(), 7);
        assert_eq!(rf.fetch(RegisterName::Pc).value(), 4);
    }

    #[test]
    fn division_dword_write_back_lands_on_consecutive_cells() {
        let (cu, alu, mut rf, mut ram) = machine();
        write_instruction(&mut ram, 0, Opcode::Udiv, 8, 10, 12);
        ram.put(8, Cell::new(WIDTH, 17));
        ram.put(10, Cell::new(WIDTH, 5));

        step(&cu, &mut rf, &mut ram, &alu);

        assert_eq!(ram.fetch(12, WIDTH).unwrap().value(), 3);
        assert_eq!(ram.fetch(13, WIDTH).unwrap().value(), 2);
    }
}
