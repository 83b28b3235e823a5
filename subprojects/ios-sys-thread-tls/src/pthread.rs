//! In-memory thread record.

use alloc::{vec, vec::Vec};

use ios_cpu::Bitness;

use crate::{SlotError, TSD_SLOT_COUNT, TlsRecord};

/// Record signature, ASCII "THRD".
pub const PTHREAD_SIG: u64 = 0x5448_5244;

/// Byte offsets of the record fields for one bitness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PthreadLayout {
    /// Offset of the `stack_addr` word.
    pub stack_addr: usize,
    /// Offset of the `stack_size` word.
    pub stack_size: usize,
    /// Offset of TSD slot 0.
    pub tsd: usize,
}

impl PthreadLayout {
    /// 32-bit `libsystem_pthread` record.
    pub const ARM32: PthreadLayout = PthreadLayout {
        stack_addr: 0x40,
        stack_size: 0x44,
        tsd: 0x48,
    };

    /// 64-bit `libsystem_pthread` record.
    pub const ARM64: PthreadLayout = PthreadLayout {
        stack_addr: 0xb0,
        stack_size: 0xb8,
        tsd: 0xe0,
    };

    /// Layout used by guests of `bitness`.
    pub const fn for_bitness(bitness: Bitness) -> PthreadLayout {
        match bitness {
            Bitness::Arm32 => Self::ARM32,
            Bitness::Arm64 => Self::ARM64,
        }
    }

    /// Total image size for `bitness`.
    pub const fn image_size(bitness: Bitness) -> usize {
        Self::for_bitness(bitness).tsd + TSD_SLOT_COUNT * bitness.pointer_size()
    }
}

static_assertions::const_assert!(PthreadLayout::ARM32.stack_size + 4 <= PthreadLayout::ARM32.tsd);
static_assertions::const_assert!(PthreadLayout::ARM64.stack_size + 8 <= PthreadLayout::ARM64.tsd);
static_assertions::const_assert_eq!(PthreadLayout::ARM64.tsd % 8, 0);

/// A thread record living at a fixed guest address.
///
/// Field updates are kept in the struct until [`TlsRecord::pack`] serializes
/// them into the little-endian guest image returned by [`Pthread::image`].
/// Copying that image into guest memory is left to the driver.
#[derive(Debug, Clone)]
pub struct Pthread {
    bitness: Bitness,
    base: u64,
    stack_addr: u64,
    stack_size: u64,
    tsd: [u64; TSD_SLOT_COUNT],
    image: Vec<u8>,
}

impl Pthread {
    /// Creates an empty record at guest address `base`.
    pub fn new(bitness: Bitness, base: u64) -> Self {
        Self {
            bitness,
            base,
            stack_addr: 0,
            stack_size: 0,
            tsd: [0; TSD_SLOT_COUNT],
            image: vec![0; PthreadLayout::image_size(bitness)],
        }
    }

    /// Stack bounds last passed to [`TlsRecord::set_stack`].
    pub fn stack(&self) -> (u64, u64) {
        (self.stack_addr, self.stack_size)
    }

    /// The packed guest image as of the last [`TlsRecord::pack`].
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    fn layout(&self) -> PthreadLayout {
        PthreadLayout::for_bitness(self.bitness)
    }

    fn put_word(&mut self, offset: usize, value: u64) {
        let width = self.bitness.pointer_size();
        let bytes = value.to_le_bytes();
        self.image[offset..offset + width].copy_from_slice(&bytes[..width]);
    }
}

impl TlsRecord for Pthread {
    fn base_address(&self) -> u64 {
        self.base
    }

    fn tsd_address(&self) -> u64 {
        self.base + self.layout().tsd as u64
    }

    fn set_stack(&mut self, base: u64, size: u64) {
        self.stack_addr = base;
        self.stack_size = size;
    }

    fn write_slot(&mut self, slot: usize, value: u64) -> Result<(), SlotError> {
        let cell = self.tsd.get_mut(slot).ok_or(SlotError::OutOfRange { slot })?;
        *cell = value;
        Ok(())
    }

    fn read_slot(&self, slot: usize) -> Result<u64, SlotError> {
        self.tsd
            .get(slot)
            .copied()
            .ok_or(SlotError::OutOfRange { slot })
    }

    fn pack(&mut self) {
        let layout = self.layout();
        let width = self.bitness.pointer_size();

        self.put_word(0, PTHREAD_SIG);
        self.put_word(layout.stack_addr, self.stack_addr);
        self.put_word(layout.stack_size, self.stack_size);
        for slot in 0..TSD_SLOT_COUNT {
            self.put_word(layout.tsd + slot * width, self.tsd[slot]);
        }
    }
}
