//! Deskriptor schema statis
//!
//! Setiap message shape (slot, nama, tipe, default) dideklarasikan sekali
//! sebagai data. Builder memakai `field_count()` untuk `start_table`, getter
//! dan adder typed membaca default dari `FieldDef` yang sama, dan `fields_of`
//! me-render table apa pun secara generik untuk debugging.

use crate::core::{Builder, Scalar, Table, Vector};
use crate::error::Result;

/// Tipe field di wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    Bool,
    U16,
    U32,
    U64,
    Bytes,
    WordVector,
    /// Discriminant union (u8)
    UnionType,
    /// Referensi payload union; tidak di-dereference secara generik
    UnionValue,
}

/// Perilaku saat slot absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Absent dan default tidak bisa dibedakan
    Default(u64),
    /// Absent berarti "tidak diketahui"
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub slot: u16,
    pub kind: FieldKind,
    pub presence: Presence,
}

impl FieldDef {
    pub const fn scalar(name: &'static str, slot: u16, kind: FieldKind, default: u64) -> Self {
        Self {
            name,
            slot,
            kind,
            presence: Presence::Default(default),
        }
    }

    pub const fn optional(name: &'static str, slot: u16, kind: FieldKind) -> Self {
        Self {
            name,
            slot,
            kind,
            presence: Presence::Optional,
        }
    }

    /// Nilai default mentah; field optional dibaca sebagai 0 jika dipaksa
    pub const fn default_bits(&self) -> u64 {
        match self.presence {
            Presence::Default(bits) => bits,
            Presence::Optional => 0,
        }
    }

    /// Default typed untuk field scalar ini
    #[inline(always)]
    pub fn default_value<T: FieldScalar>(&self) -> T {
        debug_assert!(
            T::accepts(self.kind),
            "field {} is {:?}, not readable as {}",
            self.name,
            self.kind,
            std::any::type_name::<T>()
        );
        T::from_default(self.default_bits())
    }

    /// Baca scalar, default dari deskriptor jika absent
    #[inline(always)]
    pub fn read<T: FieldScalar>(&self, table: &Table<'_>) -> T {
        table.get(self.slot, self.default_value())
    }

    /// Baca scalar tanpa default: absent tetap `None`
    #[inline(always)]
    pub fn read_optional<T: FieldScalar>(&self, table: &Table<'_>) -> Option<T> {
        table.get_optional(self.slot)
    }

    /// Tulis scalar; nilai sama dengan default deskriptor tidak ditulis
    #[inline(always)]
    pub fn add<T: FieldScalar>(&self, fbb: &mut Builder, value: T) -> Result<()> {
        match self.presence {
            Presence::Default(_) => fbb.add_scalar(self.slot, value, self.default_value()),
            Presence::Optional => fbb.add_scalar_always(self.slot, value),
        }
    }
}

/// Scalar yang bisa dipetakan ke `FieldKind` dan default `u64` deskriptor
pub trait FieldScalar: Scalar {
    fn from_default(bits: u64) -> Self;
    fn accepts(kind: FieldKind) -> bool;
}

macro_rules! impl_field_scalar {
    ($($ty:ty => $($kind:ident)|+),* $(,)?) => {
        $(
            impl FieldScalar for $ty {
                #[inline(always)]
                fn from_default(bits: u64) -> Self {
                    bits as $ty
                }

                #[inline(always)]
                fn accepts(kind: FieldKind) -> bool {
                    matches!(kind, $(FieldKind::$kind)|+)
                }
            }
        )*
    };
}

impl_field_scalar! {
    u8 => U8 | UnionType,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

impl FieldScalar for bool {
    #[inline(always)]
    fn from_default(bits: u64) -> Self {
        bits != 0
    }

    #[inline(always)]
    fn accepts(kind: FieldKind) -> bool {
        kind == FieldKind::Bool
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

impl TableSchema {
    /// Jumlah slot yang dideklarasikan (untuk `start_table`)
    pub const fn field_count(&self) -> u16 {
        self.fields.len() as u16
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Semua field yang ada (plus default untuk scalar absent) dalam urutan slot
    pub fn fields_of<'a>(&self, table: &Table<'a>) -> Vec<(&'static str, FieldValue<'a>)> {
        self.fields
            .iter()
            .filter_map(|def| read_field(def, table).map(|value| (def.name, value)))
            .collect()
    }
}

/// Nilai field hasil baca generik
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Unsigned(u64),
    Bool(bool),
    Bytes(&'a [u8]),
    Words(Vector<'a, u32>),
    /// Payload union yang ada; isi tidak di-interpretasi
    Union,
}

fn read_field<'a>(def: &FieldDef, table: &Table<'a>) -> Option<FieldValue<'a>> {
    let default = match def.presence {
        Presence::Default(value) => Some(value),
        Presence::Optional => None,
    };
    let scalar = |value: Option<u64>| value.or(default).map(FieldValue::Unsigned);

    match def.kind {
        FieldKind::U8 | FieldKind::UnionType => {
            scalar(table.get_optional::<u8>(def.slot).map(u64::from))
        }
        FieldKind::U16 => scalar(table.get_optional::<u16>(def.slot).map(u64::from)),
        FieldKind::U32 => scalar(table.get_optional::<u32>(def.slot).map(u64::from)),
        FieldKind::U64 => scalar(table.get_optional::<u64>(def.slot)),
        FieldKind::Bool => table
            .get_optional::<bool>(def.slot)
            .or(default.map(|d| d != 0))
            .map(FieldValue::Bool),
        FieldKind::Bytes => table.get_bytes(def.slot).map(FieldValue::Bytes),
        FieldKind::WordVector => table.get_vector::<u32>(def.slot).map(FieldValue::Words),
        FieldKind::UnionValue => table.is_present(def.slot).then_some(FieldValue::Union),
    }
}
