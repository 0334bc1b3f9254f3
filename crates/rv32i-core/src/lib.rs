//! Core crate for the `rv32i` user-mode RV32I functional simulator.
//!
//! The crate models one hardware thread ("hart") executing the RV32I base
//! integer instruction set over a flat little-endian memory image. The
//! decoder is pure over 32-bit words so the execution engine and the static
//! disassembler share one classification path.

#![warn(missing_docs)]

/// Fixed-width hexadecimal string formatting for dump and trace output.
pub mod hex;

/// Byte-addressable little-endian memory and the flat image loader.
pub mod memory;
pub use memory::{LoadError, Memory};

/// Architectural hart state model primitives.
pub mod state;
pub use state::{HaltCause, Register, RegisterFile, RunState};

/// Instruction-word bit-field extraction and opcode constants.
pub mod encoding;

/// Deterministic instruction classification.
pub mod decoder;
pub use decoder::{
    AluImmOp, AluOp, BranchOp, CsrImmOp, CsrOp, Decoder, Instruction, LoadOp, StoreOp,
};

/// Disassembly rendering shared by the static pass and the executor.
pub mod disasm;
pub use disasm::{disassemble_image, render, DisassemblyRow};

/// The fetch-decode-execute engine.
pub mod hart;
pub use hart::Hart;

/// The single-hart driver.
pub mod cpu;
pub use cpu::SingleHartCpu;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
