//! Backward-Growing Table Builder
//!
//! Buffer diisi dari belakang ke depan: child (string, vector, table) ditulis
//! dulu, parent belakangan, root paling akhir. Semua offset internal disimpan
//! sebagai jarak dari *akhir* buffer, jadi tetap valid saat buffer di-grow.
//!
//! vtable yang identik byte-per-byte hanya ditulis sekali (interning).

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use log::trace;

use super::scalar::{write_scalar, Scalar};
use super::{
    SOffset, DEFAULT_CAPACITY, MAX_BUFFER_SIZE, SIZE_PREFIX, SIZE_SOFFSET, SIZE_UOFFSET,
    SIZE_VOFFSET, VTABLE_METADATA_FIELDS,
};
use crate::error::{BuildError, Result};

/// Offset ke object yang sudah selesai ditulis, dihitung dari akhir buffer.
///
/// Parameter `T` hanya penanda tipe object (vector, byte string, table).
pub struct Offset<T: ?Sized> {
    value: u32,
    _marker: PhantomData<T>,
}

impl<T: ?Sized> Offset<T> {
    #[inline(always)]
    pub fn new(value: u32) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Hapus tipe, untuk disimpan di field union
    #[inline(always)]
    pub fn as_union_value(&self) -> Offset<UnionValue> {
        Offset::new(self.value)
    }
}

impl<T: ?Sized> Clone for Offset<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Offset<T> {}

impl<T: ?Sized> PartialEq for Offset<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: ?Sized> Eq for Offset<T> {}

impl<T: ?Sized> fmt::Debug for Offset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Offset").field(&self.value).finish()
    }
}

/// Penanda untuk payload union yang tipenya ditentukan discriminant
#[derive(Debug)]
pub enum UnionValue {}

#[derive(Debug, Clone, Copy)]
struct FieldLoc {
    off: u32,
    slot: u16,
}

#[derive(Debug, Clone, Copy)]
struct OpenTable {
    object_start: u32,
    field_count: u16,
}

/// Builder untuk satu buffer.
///
/// Dimiliki eksklusif oleh satu writer (`&mut self` di semua operasi tulis).
pub struct Builder {
    buf: Vec<u8>,
    // Data valid ada di buf[head..]
    head: usize,
    min_align: usize,
    field_locs: Vec<FieldLoc>,
    open: Option<OpenTable>,
    vtables: HashMap<Vec<u8>, u32>,
    finished: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Membuat builder dengan kapasitas awal tertentu
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: vec![0u8; capacity],
            head: capacity,
            min_align: 1,
            field_locs: Vec::new(),
            open: None,
            vtables: HashMap::new(),
            finished: false,
        }
    }

    /// Reset builder untuk reuse. Kapasitas yang sudah dialokasi dipertahankan.
    pub fn reset(&mut self) {
        self.head = self.buf.len();
        self.min_align = 1;
        self.field_locs.clear();
        self.open = None;
        self.vtables.clear();
        self.finished = false;
    }

    /// Bytes yang sudah terpakai
    #[inline(always)]
    pub fn used_space(&self) -> usize {
        self.buf.len() - self.head
    }

    #[inline(always)]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Buffer final, hanya tersedia setelah `finish`/`finish_size_prefixed`
    pub fn finished_data(&self) -> Result<&[u8]> {
        if !self.finished {
            return Err(BuildError::NotFinished);
        }
        Ok(&self.buf[self.head..])
    }

    /// Tulis vector elemen fixed-width. Elemen tetap urut di buffer final.
    pub fn create_vector<T: Scalar>(&mut self, items: &[T]) -> Result<Offset<[T]>> {
        self.ensure_writable()?;

        let bytes = items.len() * T::SIZE;
        // Length prefix harus langsung menempel ke elemen pertama
        self.align(bytes, SIZE_UOFFSET);
        self.align(bytes, T::SIZE);

        let start = self.make_space(bytes);
        for (i, item) in items.iter().enumerate() {
            write_scalar(&mut self.buf, start + i * T::SIZE, *item);
        }

        let off = self.push(items.len() as u32);
        Ok(Offset::new(off))
    }

    /// Byte string tanpa terminator
    pub fn create_byte_string(&mut self, bytes: &[u8]) -> Result<Offset<[u8]>> {
        self.create_vector(bytes)
    }

    pub fn start_table(&mut self, field_count: u16) -> Result<()> {
        self.ensure_writable()?;
        self.field_locs.clear();
        self.open = Some(OpenTable {
            object_start: self.used_space() as u32,
            field_count,
        });
        Ok(())
    }

    /// Tulis scalar ke slot, kecuali `value == default` (slot tetap absent).
    pub fn add_scalar<T: Scalar>(&mut self, slot: u16, value: T, default: T) -> Result<()> {
        self.check_slot(slot)?;
        if value == default {
            return Ok(());
        }
        self.track_scalar(slot, value);
        Ok(())
    }

    /// Tulis scalar tanpa default elision. Dipakai field yang absent-nya
    /// berbeda makna dengan nilai nol.
    pub fn add_scalar_always<T: Scalar>(&mut self, slot: u16, value: T) -> Result<()> {
        self.check_slot(slot)?;
        self.track_scalar(slot, value);
        Ok(())
    }

    /// Referensi relatif ke child yang sudah selesai sebelum table ini dibuka
    pub fn add_offset<T: ?Sized>(&mut self, slot: u16, child: Offset<T>) -> Result<()> {
        let open = self.check_slot(slot)?;
        if child.value() == 0 || child.value() > open.object_start {
            return Err(BuildError::UnfinishedChild(child.value()));
        }
        let off = self.push_uoffset(child.value());
        self.field_locs.push(FieldLoc { off, slot });
        Ok(())
    }

    /// Finalisasi table: tulis (atau reuse) vtable lalu patch soffset.
    ///
    /// Jika table melebihi `u16::MAX` bytes, semua field table tersebut
    /// dibuang dan builder kembali ke state sebelum `start_table`.
    pub fn end_table<T: ?Sized>(&mut self) -> Result<Offset<T>> {
        let open = self.open.take().ok_or(BuildError::NoOpenTable)?;

        let pad = padding_bytes(self.used_space() + SIZE_SOFFSET, SIZE_SOFFSET);
        let table_size = self.used_space() + pad + SIZE_SOFFSET - open.object_start as usize;
        if table_size > u16::MAX as usize {
            self.head = self.buf.len() - open.object_start as usize;
            self.field_locs.clear();
            return Err(BuildError::TableTooLarge(table_size));
        }

        // Placeholder soffset ke vtable
        let object_loc = self.push::<SOffset>(0);
        debug_assert_eq!((object_loc - open.object_start) as usize, table_size);

        // Slot absent di ekor vtable dipangkas; reader menganggapnya absent
        let slots = self
            .field_locs
            .iter()
            .map(|loc| loc.slot as usize + 1)
            .max()
            .unwrap_or(0);
        let vtable_len = (VTABLE_METADATA_FIELDS + slots) * SIZE_VOFFSET;

        let mut vtable = vec![0u8; vtable_len];
        write_scalar(&mut vtable, 0, vtable_len as u16);
        write_scalar(&mut vtable, SIZE_VOFFSET, table_size as u16);
        for loc in &self.field_locs {
            let entry = (VTABLE_METADATA_FIELDS + loc.slot as usize) * SIZE_VOFFSET;
            write_scalar(&mut vtable, entry, (object_loc - loc.off) as u16);
        }
        self.field_locs.clear();

        let vtable_loc = match self.vtables.get(&vtable) {
            Some(&existing) => {
                trace!("reusing vtable at {} for table at {}", existing, object_loc);
                existing
            }
            None => {
                let start = self.make_space(vtable_len);
                self.buf[start..start + vtable_len].copy_from_slice(&vtable);
                let loc = self.used_space() as u32;
                self.vtables.insert(vtable, loc);
                loc
            }
        };

        // vtable_pos = table_pos - soffset
        let soffset = vtable_loc as i64 - object_loc as i64;
        let table_pos = self.buf.len() - object_loc as usize;
        write_scalar(&mut self.buf, table_pos, soffset as SOffset);

        Ok(Offset::new(object_loc))
    }

    /// Tulis root offset di awal buffer dan tandai buffer final.
    pub fn finish<T: ?Sized>(&mut self, root: Offset<T>) -> Result<()> {
        self.finish_with(root.value(), false)
    }

    /// Seperti `finish`, plus prefix u32 panjang payload untuk stream framing.
    pub fn finish_size_prefixed<T: ?Sized>(&mut self, root: Offset<T>) -> Result<()> {
        self.finish_with(root.value(), true)
    }

    fn finish_with(&mut self, root: u32, size_prefixed: bool) -> Result<()> {
        if self.finished {
            return Err(BuildError::AlreadyFinished);
        }
        if self.open.is_some() {
            return Err(BuildError::TableStillOpen);
        }
        if root == 0 || root as usize > self.used_space() {
            return Err(BuildError::UnfinishedChild(root));
        }

        let prefix = if size_prefixed { SIZE_PREFIX } else { 0 };
        let min_align = self.min_align.max(SIZE_UOFFSET);
        self.align(SIZE_UOFFSET + prefix, min_align);
        self.push_uoffset(root);

        if size_prefixed {
            let size = self.used_space() as u32;
            self.push(size);
        }

        self.finished = true;
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.finished {
            return Err(BuildError::AlreadyFinished);
        }
        if self.open.is_some() {
            return Err(BuildError::NestedTable);
        }
        Ok(())
    }

    fn check_slot(&self, slot: u16) -> Result<OpenTable> {
        let open = self.open.ok_or(BuildError::NoOpenTable)?;
        if slot >= open.field_count {
            return Err(BuildError::SlotOutOfRange {
                slot,
                field_count: open.field_count,
            });
        }
        Ok(open)
    }

    fn track_scalar<T: Scalar>(&mut self, slot: u16, value: T) {
        let off = self.push(value);
        self.field_locs.push(FieldLoc { off, slot });
    }

    /// Push scalar dengan alignment natural. Returns offset-dari-akhir.
    #[inline(always)]
    fn push<T: Scalar>(&mut self, value: T) -> u32 {
        self.align(T::SIZE, T::SIZE);
        let pos = self.make_space(T::SIZE);
        write_scalar(&mut self.buf, pos, value);
        self.used_space() as u32
    }

    /// Push offset relatif (target - posisi field ini) ke object `target`.
    #[inline(always)]
    fn push_uoffset(&mut self, target: u32) -> u32 {
        self.align(SIZE_UOFFSET, SIZE_UOFFSET);
        let rel = self.used_space() as u32 + SIZE_UOFFSET as u32 - target;
        self.push(rel)
    }

    /// Padding sehingga setelah `len` bytes berikutnya, posisi aligned.
    #[inline(always)]
    fn align(&mut self, len: usize, alignment: usize) {
        self.min_align = self.min_align.max(alignment);
        let pad = padding_bytes(self.used_space() + len, alignment);
        let start = self.make_space(pad);
        self.buf[start..start + pad].fill(0);
    }

    #[inline(always)]
    fn make_space(&mut self, n: usize) -> usize {
        while self.head < n {
            self.grow();
        }
        self.head -= n;
        self.head
    }

    /// Double kapasitas; data lama dipindah ke ekor buffer baru.
    fn grow(&mut self) {
        let old_len = self.buf.len();
        let new_len = (old_len * 2).max(1);
        assert!(
            new_len <= MAX_BUFFER_SIZE,
            "buffer would exceed {} bytes",
            MAX_BUFFER_SIZE
        );

        let used = old_len - self.head;
        let mut grown = vec![0u8; new_len];
        grown[new_len - used..].copy_from_slice(&self.buf[self.head..]);
        self.head = new_len - used;
        self.buf = grown;
    }
}

#[inline(always)]
fn padding_bytes(buf_size: usize, alignment: usize) -> usize {
    (!buf_size).wrapping_add(1) & (alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::root_table;

    #[test]
    fn test_default_elision() {
        let mut fbb = Builder::new();
        fbb.start_table(3).unwrap();
        fbb.add_scalar(0, 7u32, 0).unwrap();
        fbb.add_scalar(1, 0u8, 0).unwrap();
        fbb.add_scalar(2, false, false).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish(root).unwrap();

        let table = root_table(fbb.finished_data().unwrap());
        assert_eq!(table.get(0, 0u32), 7);
        assert_eq!(table.field_offset(1), None);
        assert_eq!(table.field_offset(2), None);
        // Slot ekor absent dipangkas dari vtable
        assert_eq!(table.vtable_slots(), 1);
    }

    #[test]
    fn test_vtable_is_shared_between_identical_tables() {
        let mut fbb = Builder::new();

        fbb.start_table(2).unwrap();
        fbb.add_scalar(0, 1u32, 0).unwrap();
        let first: Offset<()> = fbb.end_table().unwrap();

        fbb.start_table(2).unwrap();
        fbb.add_scalar(0, 2u32, 0).unwrap();
        let second: Offset<()> = fbb.end_table().unwrap();

        assert_eq!(fbb.vtables.len(), 1);
        fbb.start_table(1).unwrap();
        let _: Offset<()> = fbb.end_table().unwrap();
        assert_eq!(fbb.vtables.len(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn test_shared_vtable_resolves_for_both_tables() {
        let mut fbb = Builder::new();

        fbb.start_table(1).unwrap();
        fbb.add_scalar(0, 11u32, 0).unwrap();
        let first: Offset<()> = fbb.end_table().unwrap();

        fbb.start_table(1).unwrap();
        fbb.add_scalar(0, 22u32, 0).unwrap();
        let second: Offset<()> = fbb.end_table().unwrap();

        fbb.start_table(2).unwrap();
        fbb.add_offset(0, first).unwrap();
        fbb.add_offset(1, second).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish(root).unwrap();

        let table = root_table(fbb.finished_data().unwrap());
        let first = table.get_table(0).unwrap();
        let second = table.get_table(1).unwrap();
        assert_eq!(first.vtable_pos(), second.vtable_pos());
        assert_eq!(first.get(0, 0u32), 11);
        assert_eq!(second.get(0, 0u32), 22);
    }

    #[test]
    fn test_distinct_presence_gets_distinct_vtable() {
        let mut fbb = Builder::new();

        fbb.start_table(2).unwrap();
        fbb.add_scalar(0, 1u32, 0).unwrap();
        let _: Offset<()> = fbb.end_table().unwrap();
        let after_first = fbb.used_space();

        fbb.start_table(2).unwrap();
        fbb.add_scalar(1, 1u32, 0).unwrap();
        let _: Offset<()> = fbb.end_table().unwrap();

        assert!(fbb.used_space() - after_first > 8);
    }

    #[test]
    fn test_nested_table_rejected() {
        let mut fbb = Builder::new();
        fbb.start_table(1).unwrap();
        assert_eq!(fbb.start_table(1), Err(BuildError::NestedTable));
        assert_eq!(
            fbb.create_vector(&[1u32]).map(|o| o.value()),
            Err(BuildError::NestedTable)
        );
    }

    #[test]
    fn test_child_created_after_parent_start_rejected() {
        let mut fbb = Builder::new();
        let early = fbb.create_byte_string(b"early").unwrap();
        fbb.start_table(2).unwrap();
        fbb.add_offset(0, early).unwrap();

        let bogus: Offset<[u8]> = Offset::new(fbb.used_space() as u32 + 64);
        assert_eq!(
            fbb.add_offset(1, bogus),
            Err(BuildError::UnfinishedChild(bogus.value()))
        );
    }

    #[test]
    fn test_slot_and_state_checks() {
        let mut fbb = Builder::new();
        assert_eq!(fbb.add_scalar(0, 1u8, 0), Err(BuildError::NoOpenTable));
        assert_eq!(
            fbb.end_table::<()>().map(|o| o.value()),
            Err(BuildError::NoOpenTable)
        );

        fbb.start_table(2).unwrap();
        assert_eq!(
            fbb.add_scalar(2, 1u8, 0),
            Err(BuildError::SlotOutOfRange {
                slot: 2,
                field_count: 2
            })
        );

        let vec = Offset::<[u8]>::new(4);
        assert_eq!(fbb.finish(vec), Err(BuildError::TableStillOpen));
        assert_eq!(fbb.finished_data().map(|d| d.len()), Err(BuildError::NotFinished));
    }

    #[test]
    fn test_finish_twice_rejected() {
        let mut fbb = Builder::new();
        fbb.start_table(1).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish(root).unwrap();
        assert_eq!(fbb.finish(root), Err(BuildError::AlreadyFinished));
        assert_eq!(
            fbb.start_table(1),
            Err(BuildError::AlreadyFinished)
        );
    }

    #[test]
    fn test_growth_preserves_offsets() {
        let mut fbb = Builder::with_capacity(1);
        let words: Vec<u32> = (0..100).collect();
        let vector = fbb.create_vector(&words).unwrap();
        fbb.start_table(1).unwrap();
        fbb.add_offset(0, vector).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish(root).unwrap();

        let table = root_table(fbb.finished_data().unwrap());
        let decoded = table.get_vector::<u32>(0).unwrap();
        assert_eq!(decoded.len(), 100);
        assert_eq!(decoded.get(99), 99);
        assert_eq!(decoded.to_vec(), words);
    }

    #[test]
    fn test_reset_allows_reuse() {
        let mut fbb = Builder::new();
        fbb.start_table(1).unwrap();
        fbb.add_scalar(0, 1u16, 0).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish(root).unwrap();
        let first = fbb.finished_data().unwrap().to_vec();

        fbb.reset();
        fbb.start_table(1).unwrap();
        fbb.add_scalar(0, 1u16, 0).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish(root).unwrap();

        assert_eq!(fbb.finished_data().unwrap(), first.as_slice());
    }

    #[test]
    fn test_finished_buffer_is_aligned() {
        let mut fbb = Builder::new();
        fbb.start_table(2).unwrap();
        fbb.add_scalar_always(0, 0u64).unwrap();
        fbb.add_scalar(1, 3u8, 0).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish(root).unwrap();

        let data = fbb.finished_data().unwrap();
        assert_eq!(data.len() % 8, 0);
        let table = root_table(data);
        assert_eq!(table.get_optional::<u64>(0), Some(0));
        assert_eq!(table.get(1, 0u8), 3);
    }

    #[test]
    fn test_oversized_table_is_rolled_back() {
        let mut fbb = Builder::new();
        let label = fbb.create_byte_string(b"kept").unwrap();
        let before = fbb.used_space();

        // 8200 field u64 = 65600 bytes, melebihi batas table u16
        fbb.start_table(8200).unwrap();
        for slot in 0..8200u16 {
            fbb.add_scalar_always(slot, u64::from(slot) + 1).unwrap();
        }
        assert!(matches!(
            fbb.end_table::<()>(),
            Err(BuildError::TableTooLarge(size)) if size > u16::MAX as usize
        ));
        assert_eq!(fbb.used_space(), before);

        // Builder tetap bisa dipakai tanpa reset
        fbb.start_table(1).unwrap();
        fbb.add_offset(0, label).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish(root).unwrap();
        let table = root_table(fbb.finished_data().unwrap());
        assert_eq!(table.get_bytes(0), Some(&b"kept"[..]));
    }
}
