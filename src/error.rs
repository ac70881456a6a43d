//! Build-time contract violations
//!
//! Hanya sisi writer yang punya error. Sisi reader tidak pernah return error:
//! field absent menjadi `None`/default, buffer malformed langsung panic.

use thiserror::Error;

/// Pelanggaran urutan build (bottom-up, satu sequence tanpa interleave)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Table/vector dibuat saat table lain masih terbuka
    #[error("a table is already open; finish children before starting the parent")]
    NestedTable,

    /// `add_*`/`end_table` tanpa `start_table`
    #[error("no table is open")]
    NoOpenTable,

    #[error("slot {slot} is out of range for a table with {field_count} fields")]
    SlotOutOfRange { slot: u16, field_count: u16 },

    /// Offset child belum selesai ditulis sebelum parent dibuka
    #[error("offset {0} does not refer to an object finished before this one")]
    UnfinishedChild(u32),

    #[error("cannot finish the buffer while a table is open")]
    TableStillOpen,

    #[error("buffer is already finished; call reset() to reuse the builder")]
    AlreadyFinished,

    #[error("buffer has not been finished")]
    NotFinished,

    /// Table inline lebih dari 64KB tidak bisa dialamatkan lewat vtable u16
    #[error("table of {0} bytes exceeds the 16-bit vtable range")]
    TableTooLarge(usize),

    /// Satu flag `ip_v6` per Packet, jadi local/remote harus satu family
    #[error("local and remote addresses belong to different IP families")]
    MixedAddressFamily,
}

pub type Result<T> = std::result::Result<T, BuildError>;
