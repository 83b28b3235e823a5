//! Architectural register names.
//!
//! Only the registers the thread runtime touches are named here. An emulation
//! backend maps them onto its own register identifiers (e.g. Unicorn's
//! `UC_ARM_REG_*` / `UC_ARM64_REG_*` constants).
//!
//! ## Thread pointer registers
//!
//! Darwin exposes the thread-specific data (TSD) block of the running thread
//! through a read-only thread ID register:
//!
//! - **AArch32**: CP15 `c13, c0, 3` (`TPIDRURO`), the user read-only thread ID
//!   register.
//! - **AArch64**: `TPIDRRO_EL0`, the EL0 read-only software thread ID register.
//!
//! ## References
//! - [ARM TPIDRRO_EL0 Register](https://developer.arm.com/documentation/ddi0601/2024-12/AArch64-Registers/TPIDRRO-EL0--EL0-Read-Only-Software-Thread-ID-Register)
//! - [ARM TPIDRURO Register](https://developer.arm.com/documentation/ddi0601/2024-12/AArch32-Registers/TPIDRURO--PL0-Read-Only-Software-Thread-ID-Register)

use core::fmt;

/// Guest architecture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness {
    /// AArch32 guest (ARM/Thumb).
    Arm32,
    /// AArch64 guest.
    Arm64,
}

impl Bitness {
    /// Size of a guest pointer in bytes.
    #[inline]
    pub const fn pointer_size(self) -> usize {
        match self {
            Bitness::Arm32 => 4,
            Bitness::Arm64 => 8,
        }
    }

    /// Returns `true` for AArch64 guests.
    #[inline]
    pub const fn is_64bit(self) -> bool {
        matches!(self, Bitness::Arm64)
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bitness::Arm32 => f.write_str("32-bit"),
            Bitness::Arm64 => f.write_str("64-bit"),
        }
    }
}

/// AArch32 registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmReg {
    /// First integer argument / return value.
    R0,
    /// Stack pointer (R13).
    Sp,
    /// Program counter (R15).
    Pc,
    /// CP15 user read-only thread ID register (`TPIDRURO`).
    C13C0_3,
}

/// AArch64 registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arm64Reg {
    /// First integer argument / return value.
    X0,
    /// Stack pointer.
    Sp,
    /// Program counter.
    Pc,
    /// EL0 read-only software thread ID register.
    TpidrroEl0,
}

/// A named guest register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// AArch32 register.
    Arm(ArmReg),
    /// AArch64 register.
    Arm64(Arm64Reg),
}

impl Register {
    /// The architecture this register belongs to.
    pub const fn bitness(self) -> Bitness {
        match self {
            Register::Arm(_) => Bitness::Arm32,
            Register::Arm64(_) => Bitness::Arm64,
        }
    }
}

impl From<ArmReg> for Register {
    fn from(reg: ArmReg) -> Self {
        Register::Arm(reg)
    }
}

impl From<Arm64Reg> for Register {
    fn from(reg: Arm64Reg) -> Self {
        Register::Arm64(reg)
    }
}

/// The registers the thread runtime programs before handing control to the
/// guest, resolved once for a given [`Bitness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    /// First integer argument register.
    pub arg0: Register,
    /// Stack pointer.
    pub sp: Register,
    /// Program counter.
    pub pc: Register,
    /// Read-only thread pointer register holding the TSD address.
    pub thread_pointer: Register,
}

impl RegisterMap {
    /// AArch32 calling convention.
    pub const ARM32: RegisterMap = RegisterMap {
        arg0: Register::Arm(ArmReg::R0),
        sp: Register::Arm(ArmReg::Sp),
        pc: Register::Arm(ArmReg::Pc),
        thread_pointer: Register::Arm(ArmReg::C13C0_3),
    };

    /// AArch64 calling convention.
    pub const ARM64: RegisterMap = RegisterMap {
        arg0: Register::Arm64(Arm64Reg::X0),
        sp: Register::Arm64(Arm64Reg::Sp),
        pc: Register::Arm64(Arm64Reg::Pc),
        thread_pointer: Register::Arm64(Arm64Reg::TpidrroEl0),
    };

    /// Returns the register map for `bitness`.
    pub const fn for_bitness(bitness: Bitness) -> RegisterMap {
        match bitness {
            Bitness::Arm32 => Self::ARM32,
            Bitness::Arm64 => Self::ARM64,
        }
    }
}
