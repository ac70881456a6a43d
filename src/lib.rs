//! kextwire - Offset-indexed wire format untuk kernel network filter
//!
//! Arsitektur:
//! - Zero-Copy: Reader mengakses field langsung di buffer lewat vtable
//! - Bottom-Up Build: Child ditulis dulu, root terakhir, satu buffer kontigu
//! - Schema Evolution: Reader lama/baru saling toleran lewat slot count
//! - Tagged Union: Command envelope untuk kind command yang bisa bertambah

pub mod core;
pub mod error;
pub mod protocol;

pub use crate::core::{Builder, FrameReader, Offset};
pub use crate::error::{BuildError, Result};
