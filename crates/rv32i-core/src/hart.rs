//! The fetch-decode-execute engine for one RV32I hart.
//!
//! A tick is: alignment check, fetch, dispatch to the executor for the
//! decoded instruction, then optional trace emission. Executors compute
//! their result, render the trace line while every operand value is still
//! in scope, then commit: destination register first (writes to `x0`
//! vanish inside the register file), program counter last. Trace emission
//! never changes architectural state.

use std::fmt::Write as _;
use std::io;

use crate::decoder::{AluImmOp, AluOp, BranchOp, CsrOp, Decoder, Instruction, LoadOp, StoreOp};
use crate::disasm;
use crate::hex::{to_hex0x32, to_hex32};
use crate::memory::Memory;
use crate::state::{HaltCause, Register, RegisterFile, RunState};

/// Width of the rendered-instruction field in trace lines; the `//`
/// comment starts at this column.
const INSTRUCTION_WIDTH: usize = 35;

/// `mhartid`, the only CSR the simulator implements.
const CSR_MHARTID: u32 = 0xF14;

/// Hart id reported by `csrrs rd, mhartid, x0`.
const MHARTID: i32 = 0;

/// One RV32I hardware thread: program counter, register file, and the
/// halt state machine.
///
/// The hart owns its architectural registers but not the memory; every
/// tick borrows the memory from the driver that owns both.
#[derive(Debug)]
pub struct Hart {
    pc: u32,
    regs: RegisterFile,
    insn_counter: u64,
    state: RunState,
    show_instructions: bool,
    show_registers: bool,
}

impl Hart {
    /// Creates a hart reset against a memory of `mem_size` bytes.
    #[must_use]
    pub fn new(mem_size: u32) -> Self {
        let mut hart = Self {
            pc: 0,
            regs: RegisterFile::new(),
            insn_counter: 0,
            state: RunState::Running,
            show_instructions: false,
            show_registers: false,
        };
        hart.reset(mem_size);
        hart
    }

    /// Resets the hart: `pc = 0`, registers to the reset pattern, the
    /// stack pointer seeded with the memory size, counters cleared,
    /// state running.
    pub fn reset(&mut self, mem_size: u32) {
        self.pc = 0;
        self.regs.reset();
        self.regs.set(Register::SP, mem_size as i32);
        self.insn_counter = 0;
        self.state = RunState::Running;
    }

    /// Current program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Overrides the program counter. Execution semantics are unchanged; a
    /// misaligned value halts the hart on the next tick.
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// Number of ticks that have started executing since reset.
    #[must_use]
    pub const fn insn_counter(&self) -> u64 {
        self.insn_counter
    }

    /// Current execution state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.state
    }

    /// True once the hart has stopped; `tick` must not be called again.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    /// The latched halt cause, if one was recorded.
    #[must_use]
    pub const fn halt_cause(&self) -> Option<HaltCause> {
        self.state.cause()
    }

    /// Forces the halted state without recording a cause; an already
    /// latched cause is kept. Used by the driver on budget exhaustion.
    pub fn force_halt(&mut self) {
        if self.state == RunState::Running {
            self.state = RunState::Halted(None);
        }
    }

    /// Enables the per-tick trace line.
    pub fn set_show_instructions(&mut self, show: bool) {
        self.show_instructions = show;
    }

    /// Enables the per-tick register dump. Only observable while
    /// instruction display is also enabled.
    pub fn set_show_registers(&mut self, show: bool) {
        self.show_registers = show;
    }

    /// Read access to the register file.
    #[must_use]
    pub const fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    /// Write access to the register file, for hosts seeding state.
    pub fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Writes the register dump followed by the ` pc` line.
    ///
    /// # Errors
    ///
    /// Propagates any failure from the output sink.
    pub fn dump<W: io::Write>(&self, hdr: &str, out: &mut W) -> io::Result<()> {
        self.regs.dump(hdr, out)?;
        writeln!(out, " pc {}", to_hex0x32(self.pc))
    }

    /// Executes one instruction: alignment check, fetch, dispatch, then
    /// display per the `show_instructions`/`show_registers` flags (the
    /// register dump prefixed by `hdr` and suppressed once halted).
    pub fn tick(&mut self, mem: &mut Memory, hdr: &str) {
        if self.pc % 4 != 0 {
            self.state = RunState::Halted(Some(HaltCause::PcAlignment));
            return;
        }

        self.insn_counter += 1;
        let insn = mem.get32(self.pc);

        if self.show_instructions {
            let mut line = String::new();
            self.exec(insn, mem, Some(&mut line));
            println!("{line}");
            if self.show_registers && !self.is_halted() {
                let stdout = io::stdout();
                let _ = self.dump(hdr, &mut stdout.lock());
            }
        } else {
            self.exec(insn, mem, None);
        }
    }

    /// Decodes and executes one instruction. When `sink` is present the
    /// trace line is appended to it; architectural effects are identical
    /// either way.
    pub fn exec(&mut self, insn: u32, mem: &mut Memory, sink: Option<&mut String>) {
        match Decoder::decode(insn) {
            Instruction::Lui { rd, imm_u } => self.exec_lui(insn, rd, imm_u, sink),
            Instruction::Auipc { rd, imm_u } => self.exec_auipc(insn, rd, imm_u, sink),
            Instruction::Jal { rd, imm_j } => self.exec_jal(insn, rd, imm_j, sink),
            Instruction::Jalr { rd, rs1, imm_i } => self.exec_jalr(insn, rd, rs1, imm_i, sink),
            Instruction::Branch {
                op,
                rs1,
                rs2,
                imm_b,
            } => self.exec_branch(insn, op, rs1, rs2, imm_b, sink),
            Instruction::Load {
                op,
                rd,
                rs1,
                imm_i,
            } => self.exec_load(insn, op, rd, rs1, imm_i, mem, sink),
            Instruction::Store {
                op,
                rs1,
                rs2,
                imm_s,
            } => self.exec_store(insn, op, rs1, rs2, imm_s, mem, sink),
            Instruction::AluImm {
                op,
                rd,
                rs1,
                imm_i,
            } => self.exec_alu_imm(insn, op, rd, rs1, imm_i, sink),
            Instruction::Alu { op, rd, rs1, rs2 } => self.exec_alu(insn, op, rd, rs1, rs2, sink),
            Instruction::Csr {
                op: CsrOp::Csrrs,
                rd,
                rs1,
                csr,
            } => self.exec_csrrs(insn, rd, rs1, csr, sink),
            Instruction::Csr { .. } | Instruction::CsrImm { .. } | Instruction::Illegal => {
                self.exec_illegal(sink);
            }
            Instruction::Ecall => self.exec_ecall(sink),
            Instruction::Ebreak => self.exec_ebreak(insn, sink),
        }
    }

    /// Appends the standard trace line: pc, raw word, rendered text padded
    /// to the comment column, then the comment.
    fn push_trace(&self, sink: &mut String, insn: u32, comment: &str) {
        let rendered = disasm::render(self.pc, insn);
        let _ = write!(
            sink,
            "{}: {}  {rendered:<width$}// {comment}",
            to_hex32(self.pc),
            to_hex32(insn),
            width = INSTRUCTION_WIDTH
        );
    }

    fn exec_illegal(&mut self, sink: Option<&mut String>) {
        if let Some(sink) = sink {
            sink.push_str(disasm::ILLEGAL_INSN_TEXT);
        }
        self.state = RunState::Halted(Some(HaltCause::IllegalInstruction));
    }

    fn exec_ecall(&mut self, sink: Option<&mut String>) {
        if let Some(sink) = sink {
            let _ = write!(sink, "{:<width$}// ECALL", "ecall", width = INSTRUCTION_WIDTH);
        }
        self.state = RunState::Halted(Some(HaltCause::Ecall));
    }

    fn exec_ebreak(&mut self, insn: u32, sink: Option<&mut String>) {
        if let Some(sink) = sink {
            self.push_trace(sink, insn, "HALT");
        }
        self.state = RunState::Halted(Some(HaltCause::Ebreak));
    }

    fn exec_lui(&mut self, insn: u32, rd: Register, imm_u: i32, sink: Option<&mut String>) {
        if let Some(sink) = sink {
            let comment = format!("{rd} = {}", to_hex0x32(imm_u as u32));
            self.push_trace(sink, insn, &comment);
        }
        self.regs.set(rd, imm_u);
        self.pc = self.pc.wrapping_add(4);
    }

    fn exec_auipc(&mut self, insn: u32, rd: Register, imm_u: i32, sink: Option<&mut String>) {
        let value = self.pc.wrapping_add(imm_u as u32);
        if let Some(sink) = sink {
            let comment = format!(
                "{rd} = {} + {} = {}",
                to_hex0x32(self.pc),
                to_hex0x32(imm_u as u32),
                to_hex0x32(value)
            );
            self.push_trace(sink, insn, &comment);
        }
        self.regs.set(rd, value as i32);
        self.pc = self.pc.wrapping_add(4);
    }

    fn exec_jal(&mut self, insn: u32, rd: Register, imm_j: i32, sink: Option<&mut String>) {
        let link = self.pc.wrapping_add(4);
        let target = self.pc.wrapping_add(imm_j as u32);
        if let Some(sink) = sink {
            let comment = format!(
                "{rd} = {},  pc = {} + {} = {}",
                to_hex0x32(link),
                to_hex0x32(self.pc),
                to_hex0x32(imm_j as u32),
                to_hex0x32(target)
            );
            self.push_trace(sink, insn, &comment);
        }
        self.regs.set(rd, link as i32);
        self.pc = target;
    }

    fn exec_jalr(
        &mut self,
        insn: u32,
        rd: Register,
        rs1: Register,
        imm_i: i32,
        sink: Option<&mut String>,
    ) {
        let link = self.pc.wrapping_add(4);
        // Target is computed before the link write so rd == rs1 works.
        let target = (self.regs.get(rs1).wrapping_add(imm_i) as u32) & 0xFFFF_FFFE;
        if let Some(sink) = sink {
            let comment = format!(
                "{rd} = {},  pc = ({} + {}) & 0xfffffffe = {}",
                to_hex0x32(link),
                to_hex0x32(imm_i as u32),
                to_hex0x32(self.regs.get(rs1) as u32),
                to_hex0x32(target)
            );
            self.push_trace(sink, insn, &comment);
        }
        self.regs.set(rd, link as i32);
        self.pc = target;
    }

    fn exec_branch(
        &mut self,
        insn: u32,
        op: BranchOp,
        rs1: Register,
        rs2: Register,
        imm_b: i32,
        sink: Option<&mut String>,
    ) {
        let lhs = self.regs.get(rs1);
        let rhs = self.regs.get(rs2);
        let taken = match op {
            BranchOp::Beq => lhs == rhs,
            BranchOp::Bne => lhs != rhs,
            BranchOp::Blt => lhs < rhs,
            BranchOp::Bge => lhs >= rhs,
            BranchOp::Bltu => (lhs as u32) < (rhs as u32),
            BranchOp::Bgeu => (lhs as u32) >= (rhs as u32),
        };
        let step = if taken { imm_b } else { 4 };
        let next = self.pc.wrapping_add(step as u32);
        if let Some(sink) = sink {
            let comment = format!(
                "pc += ({} {} {} ? {} : 4) = {}",
                to_hex0x32(lhs as u32),
                op.comparison(),
                to_hex0x32(rhs as u32),
                to_hex0x32(imm_b as u32),
                to_hex0x32(next)
            );
            self.push_trace(sink, insn, &comment);
        }
        self.pc = next;
    }

    fn exec_load(
        &mut self,
        insn: u32,
        op: LoadOp,
        rd: Register,
        rs1: Register,
        imm_i: i32,
        mem: &mut Memory,
        sink: Option<&mut String>,
    ) {
        let base = self.regs.get(rs1);
        let addr = base.wrapping_add(imm_i) as u32;
        let value = match op {
            LoadOp::Lb => mem.get8_sx(addr),
            LoadOp::Lh => mem.get16_sx(addr),
            LoadOp::Lw => mem.get32_sx(addr),
            LoadOp::Lbu => i32::from(mem.get8(addr)),
            LoadOp::Lhu => i32::from(mem.get16(addr)),
        };
        if let Some(sink) = sink {
            let view = match op {
                LoadOp::Lb => "sx(m8",
                LoadOp::Lh => "sx(m16",
                LoadOp::Lw => "sx(m32",
                LoadOp::Lbu => "zx(m8",
                LoadOp::Lhu => "zx(m16",
            };
            let comment = format!(
                "{rd} = {view}({} + {})) = {}",
                to_hex0x32(base as u32),
                to_hex0x32(imm_i as u32),
                to_hex0x32(value as u32)
            );
            self.push_trace(sink, insn, &comment);
        }
        self.regs.set(rd, value);
        self.pc = self.pc.wrapping_add(4);
    }

    fn exec_store(
        &mut self,
        insn: u32,
        op: StoreOp,
        rs1: Register,
        rs2: Register,
        imm_s: i32,
        mem: &mut Memory,
        sink: Option<&mut String>,
    ) {
        let base = self.regs.get(rs1);
        let addr = base.wrapping_add(imm_s) as u32;
        let value = self.regs.get(rs2);
        match op {
            StoreOp::Sb => mem.set8(addr, value as u8),
            StoreOp::Sh => mem.set16(addr, value as u16),
            StoreOp::Sw => mem.set32(addr, value as u32),
        }
        if let Some(sink) = sink {
            // The comment reads the stored value back out of memory.
            let (view, stored) = match op {
                StoreOp::Sb => ("m8", u32::from(mem.get8(addr))),
                StoreOp::Sh => ("m16", u32::from(mem.get16(addr))),
                StoreOp::Sw => ("m32", mem.get32(addr)),
            };
            let comment = format!(
                "{view}({} + {}) = {}",
                to_hex0x32(base as u32),
                to_hex0x32(imm_s as u32),
                to_hex0x32(stored)
            );
            self.push_trace(sink, insn, &comment);
        }
        self.pc = self.pc.wrapping_add(4);
    }

    #[allow(clippy::too_many_lines)]
    fn exec_alu_imm(
        &mut self,
        insn: u32,
        op: AluImmOp,
        rd: Register,
        rs1: Register,
        imm_i: i32,
        sink: Option<&mut String>,
    ) {
        let src = self.regs.get(rs1);
        let shamt = (imm_i & 0x1F) as u32;
        let value = match op {
            AluImmOp::Addi => src.wrapping_add(imm_i),
            AluImmOp::Slti => i32::from(src < imm_i),
            AluImmOp::Sltiu => i32::from((src as u32) < (imm_i as u32)),
            AluImmOp::Xori => src ^ imm_i,
            AluImmOp::Ori => src | imm_i,
            AluImmOp::Andi => src & imm_i,
            AluImmOp::Slli => ((src as u32) << shamt) as i32,
            AluImmOp::Srli => ((src as u32) >> shamt) as i32,
            AluImmOp::Srai => src >> shamt,
        };
        if let Some(sink) = sink {
            let comment = match op {
                AluImmOp::Addi => format!(
                    "{rd} = {} + {} = {}",
                    to_hex0x32(src as u32),
                    to_hex0x32(imm_i as u32),
                    to_hex0x32(value as u32)
                ),
                AluImmOp::Slti => format!(
                    "{rd} = ({} < {imm_i}) ? 1 : 0 = {}",
                    to_hex0x32(src as u32),
                    to_hex0x32(value as u32)
                ),
                AluImmOp::Sltiu => format!(
                    "{rd} = ({} <U {}) ? 1 : 0 = {}",
                    to_hex0x32(src as u32),
                    imm_i as u32,
                    to_hex0x32(value as u32)
                ),
                AluImmOp::Xori => format!(
                    "{rd} = {} ^ {} = {}",
                    to_hex0x32(src as u32),
                    to_hex0x32(imm_i as u32),
                    to_hex0x32(value as u32)
                ),
                AluImmOp::Ori => format!(
                    "{rd} = {} | {} = {}",
                    to_hex0x32(src as u32),
                    to_hex0x32(imm_i as u32),
                    to_hex0x32(value as u32)
                ),
                AluImmOp::Andi => format!(
                    "{rd} = {} & {} = {}",
                    to_hex0x32(src as u32),
                    to_hex0x32(imm_i as u32),
                    to_hex0x32(value as u32)
                ),
                AluImmOp::Slli => format!(
                    "{rd} = {} << {shamt} = {}",
                    to_hex0x32(src as u32),
                    to_hex0x32(value as u32)
                ),
                AluImmOp::Srli | AluImmOp::Srai => format!(
                    "{rd} = {} >> {shamt} = {}",
                    to_hex0x32(src as u32),
                    to_hex0x32(value as u32)
                ),
            };
            self.push_trace(sink, insn, &comment);
        }
        self.regs.set(rd, value);
        self.pc = self.pc.wrapping_add(4);
    }

    fn exec_alu(
        &mut self,
        insn: u32,
        op: AluOp,
        rd: Register,
        rs1: Register,
        rs2: Register,
        sink: Option<&mut String>,
    ) {
        let lhs = self.regs.get(rs1);
        let rhs = self.regs.get(rs2);
        let shamt = (rhs as u32) & 0x1F;
        let value = match op {
            AluOp::Add => lhs.wrapping_add(rhs),
            AluOp::Sub => lhs.wrapping_sub(rhs),
            AluOp::Sll => ((lhs as u32) << shamt) as i32,
            AluOp::Slt => i32::from(lhs < rhs),
            AluOp::Sltu => i32::from((lhs as u32) < (rhs as u32)),
            AluOp::Xor => lhs ^ rhs,
            AluOp::Srl => ((lhs as u32) >> shamt) as i32,
            AluOp::Sra => lhs >> shamt,
            AluOp::Or => lhs | rhs,
            AluOp::And => lhs & rhs,
        };
        if let Some(sink) = sink {
            let comment = match op {
                AluOp::Slt => format!(
                    "{rd} = ({} < {}) ? 1 : 0 = {}",
                    to_hex0x32(lhs as u32),
                    to_hex0x32(rhs as u32),
                    to_hex0x32(value as u32)
                ),
                AluOp::Sltu => format!(
                    "{rd} = ({} <U {}) ? 1 : 0 = {}",
                    to_hex0x32(lhs as u32),
                    to_hex0x32(rhs as u32),
                    to_hex0x32(value as u32)
                ),
                AluOp::Sll | AluOp::Srl | AluOp::Sra => {
                    let symbol = if op == AluOp::Sll { "<<" } else { ">>" };
                    format!(
                        "{rd} = {} {symbol} {shamt} = {}",
                        to_hex0x32(lhs as u32),
                        to_hex0x32(value as u32)
                    )
                }
                AluOp::Add | AluOp::Sub | AluOp::Xor | AluOp::Or | AluOp::And => {
                    let symbol = match op {
                        AluOp::Add => "+",
                        AluOp::Sub => "-",
                        AluOp::Xor => "^",
                        AluOp::Or => "|",
                        _ => "&",
                    };
                    format!(
                        "{rd} = {} {symbol} {} = {}",
                        to_hex0x32(lhs as u32),
                        to_hex0x32(rhs as u32),
                        to_hex0x32(value as u32)
                    )
                }
            };
            self.push_trace(sink, insn, &comment);
        }
        self.regs.set(rd, value);
        self.pc = self.pc.wrapping_add(4);
    }

    fn exec_csrrs(
        &mut self,
        insn: u32,
        rd: Register,
        rs1: Register,
        csr: u32,
        sink: Option<&mut String>,
    ) {
        if !rs1.is_zero() || csr != CSR_MHARTID {
            self.state = RunState::Halted(Some(HaltCause::IllegalCsr));
        }
        if let Some(sink) = sink {
            let comment = format!("{rd} = {MHARTID}");
            self.push_trace(sink, insn, &comment);
        }
        // Committed even on the illegal-CSR halt; the driver stops the run
        // on the next tick.
        self.regs.set(rd, MHARTID);
        self.pc = self.pc.wrapping_add(4);
    }
}
