//! Runs a small hand-assembled counting loop with the instruction trace
//! enabled: sums 1 through 10 into x1, then stops on `ecall`.

use rv32i_core::{Memory, SingleHartCpu};

fn main() {
    let program: &[u32] = &[
        0x0000_0093, // addi x1, x0, 0      sum = 0
        0x0010_0113, // addi x2, x0, 1      i = 1
        0x00B0_0193, // addi x3, x0, 11     limit = 11
        0x0020_80B3, // add  x1, x1, x2     sum += i
        0x0011_0113, // addi x2, x2, 1      i += 1
        0xFE31_4CE3, // blt  x2, x3, -8
        0x0000_0073, // ecall
    ];

    let mut mem = Memory::new(0x100);
    for (i, word) in program.iter().enumerate() {
        mem.set32((i * 4) as u32, *word);
    }

    let mut cpu = SingleHartCpu::new(mem);
    cpu.hart_mut().set_show_instructions(true);
    cpu.run(0);

    let sum = cpu.hart().regs().get(rv32i_core::Register::from_field(1));
    println!("x1 = {sum}");
}
