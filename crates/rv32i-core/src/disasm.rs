//! Disassembly rendering for RV32I words.
//!
//! The render path is shared: the static pre-execution pass and the
//! executor's trace lines both go through [`render`], so a word always
//! reads the same everywhere it is shown.
//!
//! Formatting rules: the mnemonic is left-justified in an 8-column field;
//! operands are comma-separated with no spaces; registers are `x0..x31`;
//! U-type immediates show the upper 20 bits as 5-digit hex; CSR addresses
//! are 3-digit hex; memory operands use `disp(base)` with a signed decimal
//! displacement; branch and `jal` targets are rendered as absolute
//! addresses.

use std::fmt;

use crate::decoder::{Decoder, Instruction};
use crate::hex;
use crate::memory::Memory;
use crate::state::Register;

/// Column width of the mnemonic field.
pub const MNEMONIC_WIDTH: usize = 8;

/// Rendering of a word that does not decode.
pub const ILLEGAL_INSN_TEXT: &str = "ERROR: UNIMPLEMENTED INSTRUCTION";

/// Shift amounts are displayed modulo the register width.
const XLEN: i32 = 32;

fn mnemonic(m: &str) -> String {
    format!("{m:<width$}", width = MNEMONIC_WIDTH)
}

fn base_disp(disp: i32, base: Register) -> String {
    format!("{disp}({base})")
}

/// Renders the mnemonic-and-operands text for the word `insn` located at
/// byte address `addr`.
///
/// `addr` participates only in pc-relative targets (branches and `jal`),
/// which display as absolute addresses. The function is pure: equal
/// `(addr, insn)` pairs always render identically.
#[must_use]
pub fn render(addr: u32, insn: u32) -> String {
    match Decoder::decode(insn) {
        Instruction::Lui { rd, imm_u } => render_utype("lui", rd, imm_u),
        Instruction::Auipc { rd, imm_u } => render_utype("auipc", rd, imm_u),
        Instruction::Jal { rd, imm_j } => format!(
            "{}{rd},{}",
            mnemonic("jal"),
            hex::to_hex0x32(addr.wrapping_add(imm_j as u32))
        ),
        Instruction::Jalr { rd, rs1, imm_i } => {
            format!("{}{rd},{}", mnemonic("jalr"), base_disp(imm_i, rs1))
        }
        Instruction::Branch {
            op,
            rs1,
            rs2,
            imm_b,
        } => format!(
            "{}{rs1},{rs2},{}",
            mnemonic(op.mnemonic()),
            hex::to_hex0x32(addr.wrapping_add(imm_b as u32))
        ),
        Instruction::Load {
            op,
            rd,
            rs1,
            imm_i,
        } => format!("{}{rd},{}", mnemonic(op.mnemonic()), base_disp(imm_i, rs1)),
        Instruction::Store {
            op,
            rs1,
            rs2,
            imm_s,
        } => format!("{}{rs2},{}", mnemonic(op.mnemonic()), base_disp(imm_s, rs1)),
        Instruction::AluImm {
            op,
            rd,
            rs1,
            imm_i,
        } => {
            let shown = if op.is_shift() { imm_i % XLEN } else { imm_i };
            format!("{}{rd},{rs1},{shown}", mnemonic(op.mnemonic()))
        }
        Instruction::Alu { op, rd, rs1, rs2 } => {
            format!("{}{rd},{rs1},{rs2}", mnemonic(op.mnemonic()))
        }
        Instruction::Csr { op, rd, rs1, csr } => format!(
            "{}{rd},{},{rs1}",
            mnemonic(op.mnemonic()),
            hex::to_hex0x12(csr)
        ),
        Instruction::CsrImm { op, rd, zimm, csr } => format!(
            "{}{rd},{},{zimm}",
            mnemonic(op.mnemonic()),
            hex::to_hex0x12(csr)
        ),
        Instruction::Ecall => "ecall".to_string(),
        Instruction::Ebreak => "ebreak".to_string(),
        Instruction::Illegal => ILLEGAL_INSN_TEXT.to_string(),
    }
}

fn render_utype(m: &str, rd: Register, imm_u: i32) -> String {
    format!(
        "{}{rd},{}",
        mnemonic(m),
        hex::to_hex0x20(((imm_u >> 12) & 0xF_FFFF) as u32)
    )
}

/// One rendered row of the pre-execution disassembly listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DisassemblyRow {
    /// Byte address of the word.
    pub addr: u32,
    /// The raw 32-bit word read at `addr`.
    pub word: u32,
    /// Rendered mnemonic and operands.
    pub text: String,
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}  {}",
            hex::to_hex32(self.addr),
            hex::to_hex32(self.word),
            self.text
        )
    }
}

/// Disassembles the whole memory image in 4-byte strides.
///
/// Reads memory non-destructively and never observes hart state; the rows
/// cover every word from address 0 to the end of the image.
#[must_use]
pub fn disassemble_image(mem: &Memory) -> Vec<DisassemblyRow> {
    let mut rows = Vec::with_capacity((mem.size() / 4) as usize);
    let mut addr = 0;
    while addr < mem.size() {
        let word = mem.get32(addr);
        rows.push(DisassemblyRow {
            addr,
            word,
            text: render(addr, word),
        });
        addr += 4;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::{disassemble_image, render, DisassemblyRow, ILLEGAL_INSN_TEXT};
    use crate::memory::Memory;

    #[test]
    fn renders_itype_alu_with_decimal_immediate() {
        assert_eq!(render(0, 0x0050_0093), "addi    x1,x0,5");
        assert_eq!(render(0, 0xFFF0_0093), "addi    x1,x0,-1");
    }

    #[test]
    fn renders_utype_upper_bits_as_short_hex() {
        assert_eq!(render(0, 0x0001_02B7), "lui     x5,0x00010");
        assert_eq!(render(0, 0xFFFF_F0B7), "lui     x1,0xfffff");
        assert_eq!(render(0, 0x0001_0297), "auipc   x5,0x00010");
    }

    #[test]
    fn renders_jump_targets_as_absolute_addresses() {
        assert_eq!(render(0, 0x0080_00EF), "jal     x1,0x00000008");
        assert_eq!(render(0x10, 0x0080_00EF), "jal     x1,0x00000018");
        assert_eq!(render(8, 0xFE20_8CE3), "beq     x1,x2,0x00000000");
    }

    #[test]
    fn renders_base_displacement_operands() {
        assert_eq!(render(0, 0x0000_80E7), "jalr    x1,0(x1)");
        assert_eq!(render(0, 0x1000_2103), "lw      x2,256(x0)");
        assert_eq!(render(0, 0x0011_2423), "sw      x1,8(x2)");
        assert_eq!(render(0, 0xFE53_0FA3), "sb      x5,-1(x6)");
    }

    #[test]
    fn renders_shift_amount_not_raw_immediate() {
        // srai carries 0x401 in the I field; only the shamt is displayed
        assert_eq!(render(0, 0x4010_D113), "srai    x2,x1,1");
        assert_eq!(render(0, 0x0010_D113), "srli    x2,x1,1");
    }

    #[test]
    fn renders_rtype_registers() {
        assert_eq!(render(0, 0x0020_80B3), "add     x1,x1,x2");
        assert_eq!(render(0, 0x4031_00B3), "sub     x1,x2,x3");
    }

    #[test]
    fn renders_csr_forms() {
        assert_eq!(render(0, 0xF140_2573), "csrrs   x10,0xf14,x0");
        assert_eq!(render(0, 0x3000_90F3), "csrrw   x1,0x300,x1");
        assert_eq!(render(0, 0x3400_D0F3), "csrrwi  x1,0x340,1");
    }

    #[test]
    fn renders_system_and_illegal_words() {
        assert_eq!(render(0, 0x0000_0073), "ecall");
        assert_eq!(render(0, 0x0010_0073), "ebreak");
        assert_eq!(render(0, 0x0000_0000), ILLEGAL_INSN_TEXT);
    }

    #[test]
    fn render_is_pure_over_addr_and_word() {
        for addr in [0_u32, 4, 0x100] {
            for insn in [0x0050_0093_u32, 0xFE20_8CE3, 0] {
                assert_eq!(render(addr, insn), render(addr, insn));
            }
        }
    }

    #[test]
    fn row_display_matches_listing_format() {
        let row = DisassemblyRow {
            addr: 4,
            word: 0x0050_0093,
            text: render(4, 0x0050_0093),
        };
        assert_eq!(row.to_string(), "00000004: 00500093  addi    x1,x0,5");
    }

    #[test]
    fn image_pass_covers_every_word_without_executing() {
        let mut mem = Memory::new(0x20);
        mem.set32(0, 0x0050_0093);
        mem.set32(4, 0x0000_0073);

        let rows = disassemble_image(&mem);
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].to_string(), "00000000: 00500093  addi    x1,x0,5");
        assert_eq!(rows[1].to_string(), "00000004: 00000073  ecall");
        // untouched fill decodes as an unimplemented pattern
        assert_eq!(rows[2].addr, 8);
        assert_eq!(rows[2].word, 0xA5A5_A5A5);
        assert_eq!(rows[2].text, ILLEGAL_INSN_TEXT);
    }
}
