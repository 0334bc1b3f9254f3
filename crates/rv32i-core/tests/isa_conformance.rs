//! Whole-pipeline conformance coverage: the documented execution
//! scenarios, boundary behaviors, and property invariants over the
//! decoder, memory, and executor.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]

use proptest::prelude::*;
use rstest::rstest;
use rv32i_core::{Decoder, Hart, HaltCause, Memory, Register, RunState, SingleHartCpu};
use tempfile as _;

fn memory_with_words(words: &[u32]) -> Memory {
    let mut mem = Memory::new(0x100);
    for (i, word) in words.iter().enumerate() {
        mem.set32((i * 4) as u32, *word);
    }
    mem
}

fn reg(n: u32) -> Register {
    Register::from_field(n)
}

const fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    ((imm as u32 & 0xFFF) << 20) | (rs1 << 15) | (rd << 7) | 0x13
}

const fn branch(funct3: u32, rs1: u32, rs2: u32, offset: i32) -> u32 {
    let imm = offset as u32;
    ((imm >> 12) & 0x1) << 31
        | ((imm >> 5) & 0x3F) << 25
        | rs2 << 20
        | rs1 << 15
        | funct3 << 12
        | ((imm >> 1) & 0xF) << 8
        | ((imm >> 11) & 0x1) << 7
        | 0x63
}

#[test]
fn scenario_addi_writes_and_advances() {
    let mut mem = memory_with_words(&[0x0050_0093]);
    let mut hart = Hart::new(mem.size());
    hart.tick(&mut mem, "");
    assert_eq!(hart.regs().get(reg(1)), 5);
    assert_eq!(hart.pc(), 4);
    assert_eq!(hart.insn_counter(), 1);
}

#[test]
fn scenario_ecall_halts() {
    let mut mem = memory_with_words(&[0x0000_0073]);
    let mut hart = Hart::new(mem.size());
    hart.tick(&mut mem, "");
    assert!(hart.is_halted());
    assert_eq!(hart.halt_cause(), Some(HaltCause::Ecall));
    assert_eq!(
        hart.halt_cause().map(|c| c.to_string()),
        Some("ECALL instruction".to_string())
    );
}

#[test]
fn scenario_ebreak_halts() {
    let mut mem = memory_with_words(&[0x0010_0073]);
    let mut hart = Hart::new(mem.size());
    hart.tick(&mut mem, "");
    assert!(hart.is_halted());
    assert_eq!(
        hart.halt_cause().map(|c| c.to_string()),
        Some("EBREAK instruction".to_string())
    );
}

#[test]
fn scenario_srai_on_minus_one() {
    let mut mem = memory_with_words(&[0xFFF0_0093, 0x4010_D113]);
    let mut hart = Hart::new(mem.size());
    hart.tick(&mut mem, "");
    hart.tick(&mut mem, "");
    assert_eq!(hart.regs().get(reg(1)), -1);
    assert_eq!(hart.regs().get(reg(2)), -1);
}

#[test]
fn scenario_branch_not_taken() {
    let mut mem = memory_with_words(&[0x0010_0093, 0x0020_0113, 0xFE20_8CE3]);
    let mut hart = Hart::new(mem.size());
    for _ in 0..3 {
        hart.tick(&mut mem, "");
    }
    assert_eq!(hart.pc(), 12);
    assert!(!hart.is_halted());
}

#[test]
fn scenario_csrrs_mhartid() {
    let mut mem = memory_with_words(&[0xF140_2573]);
    let mut hart = Hart::new(mem.size());
    hart.tick(&mut mem, "");
    assert_eq!(hart.regs().get(reg(10)), 0);
    assert_eq!(hart.run_state(), RunState::Running);
    assert_eq!(hart.pc(), 4);
}

#[test]
fn boundary_memory_rounds_and_neutralizes() {
    let mem = Memory::new(0x01);
    assert_eq!(mem.size(), 0x10);
    assert_eq!(mem.get8(mem.size()), 0);
}

#[test]
fn boundary_misaligned_fetch_halts_in_place() {
    let mut mem = memory_with_words(&[0x0050_0093]);
    let mut hart = Hart::new(mem.size());
    hart.set_pc(1);
    hart.tick(&mut mem, "");
    assert_eq!(
        hart.halt_cause().map(|c| c.to_string()),
        Some("PC alignment error".to_string())
    );
    assert_eq!(hart.pc(), 1);
}

#[test]
fn x0_stays_zero_across_every_tick() {
    let mut mem = memory_with_words(&[
        addi(0, 0, 0x7FF),
        0x0000_00B7, // lui x1 (harmless)
        addi(0, 1, 1),
        0x0000_0073,
    ]);
    let mut hart = Hart::new(mem.size());
    while !hart.is_halted() {
        hart.tick(&mut mem, "");
        assert_eq!(hart.regs().get(Register::X0), 0);
    }
}

#[test]
fn jal_links_past_the_call_site() {
    let mut mem = memory_with_words(&[0x0080_00EF]); // jal x1, 8
    let mut hart = Hart::new(mem.size());
    hart.tick(&mut mem, "");
    assert_eq!(hart.regs().get(reg(1)), 4);
    assert_eq!(hart.pc(), 8);
}

#[test]
fn jalr_with_rd_equal_rs1_uses_the_old_base() {
    // addi x1, x0, 33 ; jalr x1, 0(x1)
    let mut mem = memory_with_words(&[addi(1, 0, 33), 0x0000_80E7]);
    let mut hart = Hart::new(mem.size());
    hart.tick(&mut mem, "");
    hart.tick(&mut mem, "");
    assert_eq!(hart.pc(), 32, "old rs1 value, low bit cleared");
    assert_eq!(hart.regs().get(reg(1)), 8, "link is the return address");
}

#[rstest]
#[case::beq_taken(0b000, 5, 5, true)]
#[case::beq_not_taken(0b000, 5, 6, false)]
#[case::bne_taken(0b001, 5, 6, true)]
#[case::bne_not_taken(0b001, 5, 5, false)]
#[case::blt_taken(0b100, -1, 1, true)]
#[case::blt_not_taken(0b100, 1, -1, false)]
#[case::bge_taken(0b101, 1, -1, true)]
#[case::bge_not_taken(0b101, -1, 1, false)]
#[case::bltu_taken(0b110, 1, -1, true)] // 1 <U 0xffffffff
#[case::bltu_not_taken(0b110, -1, 1, false)]
#[case::bgeu_taken(0b111, -1, 1, true)] // 0xffffffff >=U 1
#[case::bgeu_not_taken(0b111, 1, -1, false)]
fn branch_comparisons(
    #[case] funct3: u32,
    #[case] lhs: i32,
    #[case] rhs: i32,
    #[case] taken: bool,
) {
    let mut mem = memory_with_words(&[branch(funct3, 1, 2, 16)]);
    let mut hart = Hart::new(mem.size());
    hart.regs_mut().set(reg(1), lhs);
    hart.regs_mut().set(reg(2), rhs);
    hart.tick(&mut mem, "");
    let expected = if taken { 16 } else { 4 };
    assert_eq!(hart.pc(), expected);
}

#[test]
fn load_store_round_trip_through_memory() {
    // addi x1,x0,0x40 ; addi x2,x0,-2 ; sw x2,0(x1) ; lh x3,0(x1) ; lhu x4,0(x1)
    let mut mem = memory_with_words(&[
        addi(1, 0, 0x40),
        addi(2, 0, -2),
        0x0020_A023, // sw x2, 0(x1)
        0x0000_9183, // lh x3, 0(x1)
        0x0000_D203, // lhu x4, 0(x1)
    ]);
    let mut hart = Hart::new(mem.size());
    for _ in 0..5 {
        hart.tick(&mut mem, "");
    }
    assert_eq!(mem.get32(0x40), 0xFFFF_FFFE);
    assert_eq!(hart.regs().get(reg(3)), -2, "lh sign-extends");
    assert_eq!(hart.regs().get(reg(4)), 0xFFFE, "lhu zero-extends");
}

#[test]
fn out_of_range_load_reads_zero_and_continues() {
    // lw x2, 256(x0) reaches past the 0x100-byte image
    let mut mem = memory_with_words(&[0x1000_2103]);
    let mut hart = Hart::new(mem.size());
    hart.tick(&mut mem, "");
    assert_eq!(hart.regs().get(reg(2)), 0);
    assert!(!hart.is_halted());
    assert_eq!(hart.pc(), 4);
}

#[test]
fn driver_budget_and_counter() {
    let mut cpu = SingleHartCpu::new(memory_with_words(&[0x0000_006F])); // jal x0, 0
    cpu.run(3);
    assert_eq!(cpu.hart().insn_counter(), 3);
    assert_eq!(cpu.hart().run_state(), RunState::Halted(None));
}

#[test]
fn running_off_the_end_of_memory_halts_as_illegal() {
    // A single jal to the fill region: 0xa5a5a5a5 does not decode.
    let mut cpu = SingleHartCpu::new(memory_with_words(&[0x0100_006F])); // jal x0, 16
    cpu.run(0);
    assert_eq!(cpu.hart().halt_cause(), Some(HaltCause::IllegalInstruction));
    assert_eq!(cpu.hart().insn_counter(), 2);
}

#[test]
fn trace_lines_can_be_parsed_back() {
    let mut mem = memory_with_words(&[]);
    let mut hart = Hart::new(mem.size());
    let mut line = String::new();
    hart.exec(0x0050_0093, &mut mem, Some(&mut line));

    let (static_part, comment) = line.split_once("// ").expect("comment marker");
    assert_eq!(static_part.trim_end(), "00000000: 00500093  addi    x1,x0,5");
    assert_eq!(comment, "x1 = 0x00000000 + 0x00000005 = 0x00000005");
}

proptest! {
    #[test]
    fn property_decode_is_total_and_pure(insn in any::<u32>()) {
        prop_assert_eq!(Decoder::decode(insn), Decoder::decode(insn));
    }

    #[test]
    fn property_render_is_pure(addr in any::<u32>(), insn in any::<u32>()) {
        prop_assert_eq!(rv32i_core::render(addr, insn), rv32i_core::render(addr, insn));
    }

    #[test]
    fn property_addi_sign_extends_its_immediate(imm in -2048_i32..=2047, rd in 1_u32..32) {
        let mut mem = memory_with_words(&[addi(rd, 0, imm)]);
        let mut hart = Hart::new(mem.size());
        hart.tick(&mut mem, "");
        prop_assert_eq!(hart.regs().get(reg(rd)), imm);
    }

    #[test]
    fn property_logical_vs_arithmetic_right_shift(value in any::<u32>(), shamt in 0_u32..32) {
        // srli x2, x10, shamt and srai x2, x10, shamt
        let srli = (shamt << 20) | (10 << 15) | (0b101 << 12) | (2 << 7) | 0x13;
        let srai = srli | (0x20 << 25);

        let mut mem = memory_with_words(&[]);
        let mut hart = Hart::new(mem.size());
        hart.regs_mut().set(reg(10), value as i32);

        hart.exec(srli, &mut mem, None);
        prop_assert_eq!(hart.regs().get(reg(2)) as u32, value >> shamt);

        hart.exec(srai, &mut mem, None);
        prop_assert_eq!(hart.regs().get(reg(2)), (value as i32) >> shamt);
    }

    #[test]
    fn property_memory_word_reads_compose(addr in 0_u32..0xFC, word in any::<u32>()) {
        let mut mem = Memory::new(0x100);
        mem.set32(addr, word);
        prop_assert_eq!(mem.get32(addr), word);
        prop_assert_eq!(
            mem.get32(addr),
            u32::from(mem.get16(addr)) | u32::from(mem.get16(addr.wrapping_add(2))) << 16
        );
    }

    #[test]
    fn property_x0_never_latches(value in any::<i32>()) {
        let mut mem = memory_with_words(&[]);
        let mut hart = Hart::new(mem.size());
        hart.regs_mut().set(Register::X0, value);
        prop_assert_eq!(hart.regs().get(Register::X0), 0);
    }
}
