//! # ios-cpu
//!
//! The guest CPU surface consumed by the thread runtime: architectural register
//! names for the ARM (AArch32) and AArch64 guests, the per-bitness register
//! map, and the [`Backend`] capability trait every CPU emulation engine must
//! implement.

#![no_std]

pub mod backend;
pub mod regs;

pub use backend::*;
pub use regs::*;
