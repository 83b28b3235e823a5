#![no_std]

// Test doubles need `Vec`.
#[cfg(test)]
extern crate alloc;

mod thread_impl;

pub use ios_sys_mem as stack_mem;
pub use ios_sys_thread_tls as tls_region;
pub use thread_impl::*;

#[cfg(test)]
mod testing;
