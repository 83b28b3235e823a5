//! Test doubles for the backend and the thread record.

use alloc::vec::Vec;
use core::num::NonZeroU64;

use ios_cpu::{Arm64Reg, ArmReg, Backend, BackendError, Bitness, ContextHandle, Register};
use ios_sys_mem::BumpStackAllocator;
use ios_sys_thread_tls::{Pthread, SlotError, TlsRecord};

/// Guest address of the thread records used in tests.
pub const RECORD_BASE: u64 = 0xbfff_0000;

/// Bytes the fake PC moves per unit of timeout.
pub const INSN_SIZE: u64 = 4;

const ARENA_START: u64 = 0xe000_0000;
const ARENA_END: u64 = 0xf000_0000;

pub fn stack_arena() -> BumpStackAllocator {
    BumpStackAllocator::new(ARENA_START, ARENA_END).expect("valid arena")
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RegWrite(Register, u64),
    RegRead(Register),
    ContextAlloc(u64),
    ContextSave(u64),
    ContextRestore(u64),
    RunUntil {
        begin: u64,
        until: u64,
    },
    BeginThread {
        entry: u64,
        arg: u64,
        stack_top: u64,
        timeout: u64,
    },
    ResumeUntil {
        timeout: u64,
    },
}

/// The registers the fake CPU models: arg0, sp, pc, thread pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegFile([u64; 4]);

const ARG0: usize = 0;
const SP: usize = 1;
const PC: usize = 2;
const TP: usize = 3;

/// A fake CPU that records every call and executes "slices" by moving the PC
/// forward [`INSN_SIZE`] bytes per unit of timeout.
pub struct RecordingBackend {
    bitness: Bitness,
    regs: RegFile,
    contexts: Vec<RegFile>,

    pub calls: Vec<Call>,
    /// Every register file loaded by `context_restore`, in order.
    pub restored: Vec<RegFile>,
    /// Value returned by `run_until`.
    pub exit_status: u64,
    /// Returned once by the next execution primitive.
    pub fault: Option<BackendError>,
    /// Returned once by the next `reg_write`.
    pub fail_reg_write: Option<BackendError>,
    pub max_contexts: usize,
}

impl RecordingBackend {
    pub fn new(bitness: Bitness) -> Self {
        Self {
            bitness,
            regs: RegFile::default(),
            contexts: Vec::new(),
            calls: Vec::new(),
            restored: Vec::new(),
            exit_status: 0,
            fault: None,
            fail_reg_write: None,
            max_contexts: 16,
        }
    }

    /// Live value of `reg`.
    pub fn reg(&self, reg: Register) -> u64 {
        let idx = self.index(reg).expect("register of the backend's bitness");
        self.regs.0[idx]
    }

    /// Contents of a saved snapshot.
    pub fn snapshot(&self, ctx: &ContextHandle) -> RegFile {
        self.contexts[Self::slot(ctx)].clone()
    }

    pub fn contexts_allocated(&self) -> usize {
        self.contexts.len()
    }

    fn index(&self, reg: Register) -> Result<usize, BackendError> {
        match (self.bitness, reg) {
            (Bitness::Arm32, Register::Arm(r)) => Ok(match r {
                ArmReg::R0 => ARG0,
                ArmReg::Sp => SP,
                ArmReg::Pc => PC,
                ArmReg::C13C0_3 => TP,
            }),
            (Bitness::Arm64, Register::Arm64(r)) => Ok(match r {
                Arm64Reg::X0 => ARG0,
                Arm64Reg::Sp => SP,
                Arm64Reg::Pc => PC,
                Arm64Reg::TpidrroEl0 => TP,
            }),
            _ => Err(BackendError::InvalidRegister(reg)),
        }
    }

    fn slot(ctx: &ContextHandle) -> usize {
        (ctx.raw() - 1) as usize
    }

    fn execute(&mut self, timeout: u64) -> Result<(), BackendError> {
        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }
        self.regs.0[PC] += timeout * INSN_SIZE;
        Ok(())
    }
}

impl Backend for RecordingBackend {
    fn bitness(&self) -> Bitness {
        self.bitness
    }

    fn reg_write(&mut self, reg: Register, value: u64) -> Result<(), BackendError> {
        self.calls.push(Call::RegWrite(reg, value));
        if let Some(err) = self.fail_reg_write.take() {
            return Err(err);
        }
        let idx = self.index(reg)?;
        self.regs.0[idx] = value;
        Ok(())
    }

    fn reg_read(&mut self, reg: Register) -> Result<u64, BackendError> {
        self.calls.push(Call::RegRead(reg));
        let idx = self.index(reg)?;
        Ok(self.regs.0[idx])
    }

    fn context_alloc(&mut self) -> Result<ContextHandle, BackendError> {
        if self.contexts.len() >= self.max_contexts {
            return Err(BackendError::OutOfContexts);
        }
        self.contexts.push(RegFile::default());
        let raw = self.contexts.len() as u64;
        self.calls.push(Call::ContextAlloc(raw));
        Ok(ContextHandle::from_raw(NonZeroU64::new(raw).expect("non-zero id")))
    }

    fn context_save(&mut self, ctx: &ContextHandle) -> Result<(), BackendError> {
        self.calls.push(Call::ContextSave(ctx.raw()));
        self.contexts[Self::slot(ctx)] = self.regs.clone();
        Ok(())
    }

    fn context_restore(&mut self, ctx: &ContextHandle) -> Result<(), BackendError> {
        self.calls.push(Call::ContextRestore(ctx.raw()));
        self.regs = self.contexts[Self::slot(ctx)].clone();
        self.restored.push(self.regs.clone());
        Ok(())
    }

    fn run_until(&mut self, begin: u64, until: u64) -> Result<u64, BackendError> {
        self.calls.push(Call::RunUntil { begin, until });
        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }
        self.regs.0[PC] = until;
        Ok(self.exit_status)
    }

    fn begin_thread(
        &mut self,
        entry: u64,
        arg: u64,
        stack_top: u64,
        timeout: u64,
    ) -> Result<(), BackendError> {
        self.calls.push(Call::BeginThread {
            entry,
            arg,
            stack_top,
            timeout,
        });
        self.regs.0[ARG0] = arg;
        self.regs.0[SP] = stack_top;
        self.regs.0[PC] = entry;
        self.execute(timeout)
    }

    fn resume_until(&mut self, timeout: u64) -> Result<(), BackendError> {
        self.calls.push(Call::ResumeUntil { timeout });
        self.execute(timeout)
    }
}

/// A [`Pthread`] that remembers every `set_stack` call.
pub struct CountingRecord {
    pub inner: Pthread,
    pub set_stack_calls: Vec<(u64, u64)>,
}

impl CountingRecord {
    pub fn new(bitness: Bitness) -> Self {
        Self {
            inner: Pthread::new(bitness, RECORD_BASE),
            set_stack_calls: Vec::new(),
        }
    }
}

impl TlsRecord for CountingRecord {
    fn base_address(&self) -> u64 {
        self.inner.base_address()
    }

    fn tsd_address(&self) -> u64 {
        self.inner.tsd_address()
    }

    fn set_stack(&mut self, base: u64, size: u64) {
        self.set_stack_calls.push((base, size));
        self.inner.set_stack(base, size);
    }

    fn write_slot(&mut self, slot: usize, value: u64) -> Result<(), SlotError> {
        self.inner.write_slot(slot, value)
    }

    fn read_slot(&self, slot: usize) -> Result<u64, SlotError> {
        self.inner.read_slot(slot)
    }

    fn pack(&mut self) {
        self.inner.pack();
    }
}
