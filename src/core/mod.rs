//! Core module: Buffer Codec untuk table, vector, dan scalar
//!
//! Prinsip desain:
//! - Zero-Copy: Reader mengakses field langsung lewat offset, tanpa parse
//! - Relocatable: Semua referensi adalah offset relatif, bukan pointer
//! - Compatible: Slot di luar vtable atau entry 0 = absent, bukan error

mod builder;
mod frame;
mod scalar;
mod table;

pub use builder::{Builder, Offset, UnionValue};
pub use frame::FrameReader;
pub use scalar::{read_scalar, write_scalar, Scalar};
pub use table::{root_loc, root_table, size_prefixed_root_table, Table, TableMut, Vector};

/// Ukuran offset relatif (table -> child, root)
pub const SIZE_UOFFSET: usize = 4;
/// Offset bertanda table -> vtable (`vtable_pos = table_pos - soffset`)
pub type SOffset = i32;
/// Ukuran offset table -> vtable
pub const SIZE_SOFFSET: usize = std::mem::size_of::<SOffset>();
/// Ukuran satu entry vtable
pub const SIZE_VOFFSET: usize = 2;
/// Ukuran size prefix untuk framing
pub const SIZE_PREFIX: usize = 4;
/// vtable_len + table_len sebelum entry slot
pub const VTABLE_METADATA_FIELDS: usize = 2;
/// Kapasitas awal builder
pub const DEFAULT_CAPACITY: usize = 1024;
/// Offset u32 dengan soffset i32: maksimal 2GB
pub const MAX_BUFFER_SIZE: usize = (1 << 31) - 1;
