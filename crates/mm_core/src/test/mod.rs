//! End-to-end scenarios driving a [`Cpu`] directly, bypassing the external loader.

use mm_util::Cell;

use crate::alu::HaltReason;
use crate::cpu::{Cpu, ControlUnitKind, OutputSpec};
use crate::opcode::Opcode;
use crate::register::RegisterName;

const WIDTH: u32 = 16;

fn mm2_instruction(addr: u64, opcode: Opcode, a1: u64, a2: u64) -> [(u64, Cell); 3] {
    [
        (addr, Cell::new(WIDTH, opcode.encode())),
        (addr + 1, Cell::new(WIDTH, a1)),
        (addr + 2, Cell::new(WIDTH, a2)),
    ]
}

#[test]
fn mm2_add() {
    let mut image = mm2_instruction(0, Opcode::Add, 8, 10).to_vec();
    image.push((8, Cell::new(WIDTH, 3)));
    image.push((10, Cell::new(WIDTH, 4)));

    let mut cpu = Cpu::new(ControlUnitKind::Mm2, 16, WIDTH, false, &image, &[], OutputSpec::default());
    cpu.step();

    assert_eq!(cpu.memory(8, WIDTH).unwrap().value(), 7);
    assert_eq!(cpu.register(RegisterName::Pc).value(), 3);
    assert_eq!(cpu.register(RegisterName::Flags).value(), 0);
}

#[test]
fn mm2_comp_then_conditional_jump() {
    let mut image = mm2_instruction(0, Opcode::Comp, 8, 10).to_vec();
    image.extend(mm2_instruction(3, Opcode::Jeq, 0, 32));
    image.push((8, Cell::new(WIDTH, 5)));
    image.push((10, Cell::new(WIDTH, 5)));

    let mut cpu = Cpu::new(ControlUnitKind::Mm2, 16, WIDTH, false, &image, &[], OutputSpec::default());
    cpu.step();
    cpu.step();

    assert_eq!(cpu.register(RegisterName::Pc).value(), 32);
    assert_eq!(cpu.register(RegisterName::Flags).value() & crate::alu::flag::ZF, crate::alu::flag::ZF);
}

#[test]
fn mm2_sdiv_by_zero_halts() {
    let mut image = mm2_instruction(0, Opcode::Sdiv, 8, 10).to_vec();
    image.push((8, Cell::new(WIDTH, 10)));
    image.push((10, Cell::new(WIDTH, 0)));

    let mut cpu = Cpu::new(ControlUnitKind::Mm2, 16, WIDTH, false, &image, &[], OutputSpec::default());
    cpu.step();

    assert!(cpu.is_halted());
    assert_eq!(cpu.halt_reason(), Some(HaltReason::DivisionByZero));
}

#[test]
fn protected_memory_read_of_an_unwritten_cell_halts() {
    let image = mm2_instruction(0, Opcode::Add, 0x20, 0x22);

    let mut cpu = Cpu::new(ControlUnitKind::Mm2, 16, WIDTH, true, &image, &[], OutputSpec::default());
    cpu.step();

    assert!(cpu.is_halted());
    assert_eq!(cpu.halt_reason(), Some(HaltReason::ReadingDirtyMemory));
}

#[test]
fn mm1_accumulator_sequence() {
    let mut image = vec![
        (0, Cell::new(WIDTH, Opcode::Load.encode())),
        (1, Cell::new(WIDTH, 0x10)),
        (2, Cell::new(WIDTH, Opcode::Add.encode())),
        (3, Cell::new(WIDTH, 0x12)),
        (4, Cell::new(WIDTH, Opcode::Store.encode())),
        (5, Cell::new(WIDTH, 0x14)),
    ];
    image.push((0x10, Cell::new(WIDTH, 7)));
    image.push((0x12, Cell::new(WIDTH, 35)));

    let mut cpu = Cpu::new(ControlUnitKind::Mm1, 16, WIDTH, false, &image, &[], OutputSpec::default());
    cpu.step();
    cpu.step();
    cpu.step();

    assert_eq!(cpu.memory(0x14, WIDTH).unwrap().value(), 42);
    assert_eq!(cpu.register(RegisterName::R1).value(), 42);
}

#[test]
fn signed_less_than_conditional_jump_depends_on_operand_order() {
    let mut image = mm2_instruction(0, Opcode::Sub, 0x10, 0x12).to_vec();
    image.extend(mm2_instruction(3, Opcode::Sjl, 0, 0x40));
    image.push((0x10, Cell::new(WIDTH, (-3_i32 as u16) as u64)));
    image.push((0x12, Cell::new(WIDTH, 5)));

    let mut cpu = Cpu::new(ControlUnitKind::Mm2, 16, WIDTH, false, &image, &[], OutputSpec::default());
    cpu.step();
    cpu.step();
    assert_eq!(cpu.register(RegisterName::Pc).value(), 0x40);

    let mut image = mm2_instruction(0, Opcode::Sub, 0x10, 0x12).to_vec();
    image.extend(mm2_instruction(3, Opcode::Sjl, 0, 0x40));
    image.push((0x10, Cell::new(WIDTH, 5)));
    image.push((0x12, Cell::new(WIDTH, (-3_i32 as u16) as u64)));

    let mut cpu = Cpu::new(ControlUnitKind::Mm2, 16, WIDTH, false, &image, &[], OutputSpec::default());
    cpu.step();
    cpu.step();
    assert_eq!(cpu.register(RegisterName::Pc).value(), 6);
}
