//! # ios-sys-mem
//!
//! Guest memory regions used as thread stacks, and the allocator interface
//! the thread runtime requests them from.

#![no_std]

pub mod alignment;
pub mod stack;

pub use stack::*;
