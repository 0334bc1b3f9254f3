//! Instruction classification for the RV32I base integer set.
//!
//! [`Decoder::decode`] is a pure, total function over 32-bit words: the
//! opcode selects the format, then `funct3` and (where the format requires
//! it) `funct7` or the I-type immediate select the operation. Any word that
//! falls through the classification tree is [`Instruction::Illegal`]. Both
//! the execution engine and the static disassembler run on this one path.

use crate::encoding::{
    self, FUNCT7_ALT, FUNCT7_BASE, OPCODE_ALU, OPCODE_ALU_IMM, OPCODE_AUIPC, OPCODE_BRANCH,
    OPCODE_JAL, OPCODE_JALR, OPCODE_LOAD, OPCODE_LUI, OPCODE_STORE, OPCODE_SYSTEM,
};
use crate::state::Register;

/// Conditional branch selector (`funct3` of the branch opcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BranchOp {
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
}

impl BranchOp {
    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Beq => "beq",
            Self::Bne => "bne",
            Self::Blt => "blt",
            Self::Bge => "bge",
            Self::Bltu => "bltu",
            Self::Bgeu => "bgeu",
        }
    }

    /// Comparison operator as it appears in trace comments; unsigned
    /// comparisons carry a `U` suffix.
    #[must_use]
    pub const fn comparison(self) -> &'static str {
        match self {
            Self::Beq => "==",
            Self::Bne => "!=",
            Self::Blt => "<",
            Self::Bge => ">=",
            Self::Bltu => "<U",
            Self::Bgeu => ">=U",
        }
    }
}

/// Load width/extension selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum LoadOp {
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
}

impl LoadOp {
    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Lb => "lb",
            Self::Lh => "lh",
            Self::Lw => "lw",
            Self::Lbu => "lbu",
            Self::Lhu => "lhu",
        }
    }
}

/// Store width selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StoreOp {
    Sb,
    Sh,
    Sw,
}

impl StoreOp {
    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Sb => "sb",
            Self::Sh => "sh",
            Self::Sw => "sw",
        }
    }
}

/// Immediate-operand ALU selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum AluImmOp {
    Addi,
    Slli,
    Slti,
    Sltiu,
    Xori,
    Srli,
    Srai,
    Ori,
    Andi,
}

impl AluImmOp {
    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Addi => "addi",
            Self::Slli => "slli",
            Self::Slti => "slti",
            Self::Sltiu => "sltiu",
            Self::Xori => "xori",
            Self::Srli => "srli",
            Self::Srai => "srai",
            Self::Ori => "ori",
            Self::Andi => "andi",
        }
    }

    /// True for the shift-immediate forms, whose displayed operand is the
    /// shift amount rather than the full immediate.
    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, Self::Slli | Self::Srli | Self::Srai)
    }
}

/// Register-register ALU selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

impl AluOp {
    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Sll => "sll",
            Self::Slt => "slt",
            Self::Sltu => "sltu",
            Self::Xor => "xor",
            Self::Srl => "srl",
            Self::Sra => "sra",
            Self::Or => "or",
            Self::And => "and",
        }
    }
}

/// Register-form CSR instruction selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CsrOp {
    Csrrw,
    Csrrs,
    Csrrc,
}

impl CsrOp {
    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Csrrw => "csrrw",
            Self::Csrrs => "csrrs",
            Self::Csrrc => "csrrc",
        }
    }
}

/// Immediate-form CSR instruction selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CsrImmOp {
    Csrrwi,
    Csrrsi,
    Csrrci,
}

impl CsrImmOp {
    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Csrrwi => "csrrwi",
            Self::Csrrsi => "csrrsi",
            Self::Csrrci => "csrrci",
        }
    }
}

/// A classified RV32I instruction with its decoded operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `lui rd, imm20`
    Lui {
        /// Destination register.
        rd: Register,
        /// U-type immediate, low 12 bits zero.
        imm_u: i32,
    },
    /// `auipc rd, imm20`
    Auipc {
        /// Destination register.
        rd: Register,
        /// U-type immediate, low 12 bits zero.
        imm_u: i32,
    },
    /// `jal rd, offset`
    Jal {
        /// Link register.
        rd: Register,
        /// Signed pc-relative byte offset, always even.
        imm_j: i32,
    },
    /// `jalr rd, offset(rs1)`
    Jalr {
        /// Link register.
        rd: Register,
        /// Base register.
        rs1: Register,
        /// Signed displacement.
        imm_i: i32,
    },
    /// Conditional branch.
    Branch {
        /// Comparison selector.
        op: BranchOp,
        /// Left comparand register.
        rs1: Register,
        /// Right comparand register.
        rs2: Register,
        /// Signed pc-relative byte offset, always even.
        imm_b: i32,
    },
    /// Memory load.
    Load {
        /// Width/extension selector.
        op: LoadOp,
        /// Destination register.
        rd: Register,
        /// Base register.
        rs1: Register,
        /// Signed displacement.
        imm_i: i32,
    },
    /// Memory store.
    Store {
        /// Width selector.
        op: StoreOp,
        /// Base register.
        rs1: Register,
        /// Source register.
        rs2: Register,
        /// Signed displacement.
        imm_s: i32,
    },
    /// ALU operation with an immediate operand.
    AluImm {
        /// Operation selector.
        op: AluImmOp,
        /// Destination register.
        rd: Register,
        /// Source register.
        rs1: Register,
        /// Sign-extended I-type immediate; shift forms use its low 5 bits.
        imm_i: i32,
    },
    /// Register-register ALU operation.
    Alu {
        /// Operation selector.
        op: AluOp,
        /// Destination register.
        rd: Register,
        /// First source register.
        rs1: Register,
        /// Second source register.
        rs2: Register,
    },
    /// Register-form CSR instruction.
    Csr {
        /// Operation selector.
        op: CsrOp,
        /// Destination register.
        rd: Register,
        /// Source register.
        rs1: Register,
        /// CSR address.
        csr: u32,
    },
    /// Immediate-form CSR instruction.
    CsrImm {
        /// Operation selector.
        op: CsrImmOp,
        /// Destination register.
        rd: Register,
        /// Zero-extended 5-bit immediate.
        zimm: u32,
        /// CSR address.
        csr: u32,
    },
    /// `ecall`
    Ecall,
    /// `ebreak`
    Ebreak,
    /// Any bit pattern outside the implemented RV32I encodings.
    Illegal,
}

/// The RV32I instruction classifier.
pub struct Decoder;

impl Decoder {
    /// Classifies a 32-bit word into an [`Instruction`].
    ///
    /// Total over `u32`: every unmatched pattern lands on
    /// [`Instruction::Illegal`].
    #[must_use]
    pub fn decode(insn: u32) -> Instruction {
        let rd = Register::from_field(encoding::rd(insn));
        let rs1 = Register::from_field(encoding::rs1(insn));
        let rs2 = Register::from_field(encoding::rs2(insn));

        match encoding::opcode(insn) {
            OPCODE_LUI => Instruction::Lui {
                rd,
                imm_u: encoding::imm_u(insn),
            },
            OPCODE_AUIPC => Instruction::Auipc {
                rd,
                imm_u: encoding::imm_u(insn),
            },
            OPCODE_JAL => Instruction::Jal {
                rd,
                imm_j: encoding::imm_j(insn),
            },
            OPCODE_JALR if encoding::funct3(insn) == 0b000 => Instruction::Jalr {
                rd,
                rs1,
                imm_i: encoding::imm_i(insn),
            },
            OPCODE_BRANCH => {
                let op = match encoding::funct3(insn) {
                    0b000 => BranchOp::Beq,
                    0b001 => BranchOp::Bne,
                    0b100 => BranchOp::Blt,
                    0b101 => BranchOp::Bge,
                    0b110 => BranchOp::Bltu,
                    0b111 => BranchOp::Bgeu,
                    _ => return Instruction::Illegal,
                };
                Instruction::Branch {
                    op,
                    rs1,
                    rs2,
                    imm_b: encoding::imm_b(insn),
                }
            }
            OPCODE_LOAD => {
                let op = match encoding::funct3(insn) {
                    0b000 => LoadOp::Lb,
                    0b001 => LoadOp::Lh,
                    0b010 => LoadOp::Lw,
                    0b100 => LoadOp::Lbu,
                    0b101 => LoadOp::Lhu,
                    _ => return Instruction::Illegal,
                };
                Instruction::Load {
                    op,
                    rd,
                    rs1,
                    imm_i: encoding::imm_i(insn),
                }
            }
            OPCODE_STORE => {
                let op = match encoding::funct3(insn) {
                    0b000 => StoreOp::Sb,
                    0b001 => StoreOp::Sh,
                    0b010 => StoreOp::Sw,
                    _ => return Instruction::Illegal,
                };
                Instruction::Store {
                    op,
                    rs1,
                    rs2,
                    imm_s: encoding::imm_s(insn),
                }
            }
            OPCODE_ALU_IMM => {
                let op = match encoding::funct3(insn) {
                    0b000 => AluImmOp::Addi,
                    0b001 => AluImmOp::Slli,
                    0b010 => AluImmOp::Slti,
                    0b011 => AluImmOp::Sltiu,
                    0b100 => AluImmOp::Xori,
                    0b101 => match encoding::funct7(insn) {
                        FUNCT7_BASE => AluImmOp::Srli,
                        FUNCT7_ALT => AluImmOp::Srai,
                        _ => return Instruction::Illegal,
                    },
                    0b110 => AluImmOp::Ori,
                    0b111 => AluImmOp::Andi,
                    _ => return Instruction::Illegal,
                };
                Instruction::AluImm {
                    op,
                    rd,
                    rs1,
                    imm_i: encoding::imm_i(insn),
                }
            }
            OPCODE_ALU => {
                let op = match encoding::funct3(insn) {
                    0b000 => match encoding::funct7(insn) {
                        FUNCT7_BASE => AluOp::Add,
                        FUNCT7_ALT => AluOp::Sub,
                        _ => return Instruction::Illegal,
                    },
                    0b001 => AluOp::Sll,
                    0b010 => AluOp::Slt,
                    0b011 => AluOp::Sltu,
                    0b100 => AluOp::Xor,
                    0b101 => match encoding::funct7(insn) {
                        FUNCT7_BASE => AluOp::Srl,
                        FUNCT7_ALT => AluOp::Sra,
                        _ => return Instruction::Illegal,
                    },
                    0b110 => AluOp::Or,
                    0b111 => AluOp::And,
                    _ => return Instruction::Illegal,
                };
                Instruction::Alu { op, rd, rs1, rs2 }
            }
            OPCODE_SYSTEM => match encoding::funct3(insn) {
                0b000 => match encoding::imm_i(insn) {
                    0 => Instruction::Ecall,
                    1 => Instruction::Ebreak,
                    _ => Instruction::Illegal,
                },
                0b001 => Instruction::Csr {
                    op: CsrOp::Csrrw,
                    rd,
                    rs1,
                    csr: encoding::csr(insn),
                },
                0b010 => Instruction::Csr {
                    op: CsrOp::Csrrs,
                    rd,
                    rs1,
                    csr: encoding::csr(insn),
                },
                0b011 => Instruction::Csr {
                    op: CsrOp::Csrrc,
                    rd,
                    rs1,
                    csr: encoding::csr(insn),
                },
                0b101 => Instruction::CsrImm {
                    op: CsrImmOp::Csrrwi,
                    rd,
                    zimm: encoding::zimm(insn),
                    csr: encoding::csr(insn),
                },
                0b110 => Instruction::CsrImm {
                    op: CsrImmOp::Csrrsi,
                    rd,
                    zimm: encoding::zimm(insn),
                    csr: encoding::csr(insn),
                },
                0b111 => Instruction::CsrImm {
                    op: CsrImmOp::Csrrci,
                    rd,
                    zimm: encoding::zimm(insn),
                    csr: encoding::csr(insn),
                },
                _ => Instruction::Illegal,
            },
            _ => Instruction::Illegal,
        }
    }
}
