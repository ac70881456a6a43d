//! Zero-Copy Table Reader
//!
//! Field dibaca langsung dari buffer lewat vtable, tanpa parse pass.
//!
//! Layout table:
//! ┌──────────────────────────┐      ┌──────────────────────────────────┐
//! │ soffset (i32) ───────────┼────▶ │ vtable_len │ table_len │ slot... │
//! ├──────────────────────────┤      └──────────────────────────────────┘
//! │ fields (inline / uoffset)│
//! └──────────────────────────┘
//!
//! Kompatibilitas dua arah:
//! - Slot di luar panjang vtable (buffer lama) = absent
//! - Entry vtable 0 = absent
//! - Slot baru di buffer baru tidak pernah disentuh reader lama

use std::fmt;
use std::marker::PhantomData;

use super::scalar::{read_scalar, write_scalar, Scalar};
use super::{
    SOffset, SIZE_PREFIX, SIZE_SOFFSET, SIZE_UOFFSET, SIZE_VOFFSET, VTABLE_METADATA_FIELDS,
};

/// Posisi vtable milik table di `loc`.
///
/// # Panics
/// Panic jika table atau soffset-nya menunjuk ke luar buffer.
#[inline(always)]
fn vtable_pos(buf: &[u8], loc: usize) -> usize {
    assert!(
        loc + SIZE_SOFFSET <= buf.len(),
        "table at {} is outside buffer of {} bytes",
        loc,
        buf.len()
    );
    let soffset = read_scalar::<SOffset>(buf, loc) as i64;
    let pos = loc as i64 - soffset;
    assert!(
        pos >= 0 && (pos as usize) < buf.len(),
        "vtable at {} is outside buffer of {} bytes",
        pos,
        buf.len()
    );
    pos as usize
}

/// Offset field dari awal table, atau `None` jika absent.
#[inline(always)]
fn field_offset(buf: &[u8], loc: usize, slot: u16) -> Option<usize> {
    let vtable = vtable_pos(buf, loc);
    let vtable_len = read_scalar::<u16>(buf, vtable) as usize;
    let entry = (VTABLE_METADATA_FIELDS + slot as usize) * SIZE_VOFFSET;
    if entry + SIZE_VOFFSET > vtable_len {
        return None;
    }
    match read_scalar::<u16>(buf, vtable + entry) {
        0 => None,
        off => Some(off as usize),
    }
}

/// Ikuti uoffset yang tersimpan di `pos`
#[inline(always)]
fn deref_uoffset(buf: &[u8], pos: usize) -> usize {
    pos + read_scalar::<u32>(buf, pos) as usize
}

/// Posisi root object.
///
/// # Panics
/// Panic jika buffer terlalu pendek untuk root offset (atau size prefix).
pub fn root_loc(buf: &[u8], size_prefixed: bool) -> usize {
    if size_prefixed {
        let len = read_scalar::<u32>(buf, 0) as usize;
        assert!(
            SIZE_PREFIX + len <= buf.len(),
            "size prefix {} exceeds buffer of {} bytes",
            len,
            buf.len()
        );
        deref_uoffset(buf, SIZE_PREFIX)
    } else {
        deref_uoffset(buf, 0)
    }
}

pub fn root_table(buf: &[u8]) -> Table<'_> {
    Table::new(buf, root_loc(buf, false))
}

pub fn size_prefixed_root_table(buf: &[u8]) -> Table<'_> {
    Table::new(buf, root_loc(buf, true))
}

/// Read-only view ke satu table. `Copy`, aman di-share antar thread.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Table<'a> {
    buf: &'a [u8],
    loc: usize,
}

impl<'a> Table<'a> {
    #[inline(always)]
    pub fn new(buf: &'a [u8], loc: usize) -> Self {
        Self { buf, loc }
    }

    #[inline(always)]
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }

    #[inline(always)]
    pub fn loc(&self) -> usize {
        self.loc
    }

    #[inline(always)]
    pub fn vtable_pos(&self) -> usize {
        vtable_pos(self.buf, self.loc)
    }

    /// Jumlah slot yang dideklarasikan vtable buffer ini
    pub fn vtable_slots(&self) -> usize {
        let len = read_scalar::<u16>(self.buf, self.vtable_pos()) as usize;
        (len / SIZE_VOFFSET).saturating_sub(VTABLE_METADATA_FIELDS)
    }

    #[inline(always)]
    pub fn field_offset(&self, slot: u16) -> Option<usize> {
        field_offset(self.buf, self.loc, slot)
    }

    #[inline(always)]
    pub fn is_present(&self, slot: u16) -> bool {
        self.field_offset(slot).is_some()
    }

    /// Scalar dengan default untuk slot absent
    #[inline(always)]
    pub fn get<T: Scalar>(&self, slot: u16, default: T) -> T {
        self.get_optional(slot).unwrap_or(default)
    }

    /// Scalar tanpa default: absent tetap `None`
    #[inline(always)]
    pub fn get_optional<T: Scalar>(&self, slot: u16) -> Option<T> {
        self.field_offset(slot)
            .map(|off| read_scalar(self.buf, self.loc + off))
    }

    pub fn get_vector<T: Scalar>(&self, slot: u16) -> Option<Vector<'a, T>> {
        self.field_offset(slot)
            .map(|off| Vector::new(self.buf, deref_uoffset(self.buf, self.loc + off)))
    }

    pub fn get_bytes(&self, slot: u16) -> Option<&'a [u8]> {
        self.get_vector::<u8>(slot).map(|v| v.as_bytes())
    }

    pub fn get_table(&self, slot: u16) -> Option<Table<'a>> {
        self.field_offset(slot)
            .map(|off| Table::new(self.buf, deref_uoffset(self.buf, self.loc + off)))
    }
}

impl fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("loc", &self.loc)
            .field("vtable_slots", &self.vtable_slots())
            .finish()
    }
}

/// Vector fixed-width: `[len: u32][elem 0][elem 1]...`
pub struct Vector<'a, T> {
    buf: &'a [u8],
    loc: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for Vector<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Vector<'_, T> {}

impl<'a, T: Scalar> Vector<'a, T> {
    /// # Panics
    /// Panic jika panjang vector melewati akhir buffer.
    pub fn new(buf: &'a [u8], loc: usize) -> Self {
        let len = read_scalar::<u32>(buf, loc) as usize;
        let end = len
            .checked_mul(T::SIZE)
            .and_then(|bytes| bytes.checked_add(loc + SIZE_UOFFSET));
        assert!(
            matches!(end, Some(end) if end <= buf.len()),
            "vector of {} elements at {} overruns buffer of {} bytes",
            len,
            loc,
            buf.len()
        );
        Self {
            buf,
            loc,
            len,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Posisi absolut elemen ke-`index`.
    ///
    /// # Panics
    /// Panic jika `index >= len()`.
    #[inline(always)]
    fn element_pos(&self, index: usize) -> usize {
        assert!(
            index < self.len,
            "index {} out of range for vector of length {}",
            index,
            self.len
        );
        self.loc + SIZE_UOFFSET + index * T::SIZE
    }

    /// # Panics
    /// Panic jika `index >= len()`.
    #[inline(always)]
    pub fn get(&self, index: usize) -> T {
        read_scalar(self.buf, self.element_pos(index))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + 'a {
        let vector = *self;
        (0..vector.len).map(move |i| vector.get(i))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<'a> Vector<'a, u8> {
    pub fn as_bytes(&self) -> &'a [u8] {
        let start = self.loc + SIZE_UOFFSET;
        &self.buf[start..start + self.len]
    }
}

impl<T: Scalar> PartialEq for Vector<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Scalar + fmt::Debug> fmt::Debug for Vector<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// View mutable ke table yang sudah final.
///
/// Hanya overwrite in-place untuk field fixed-width yang sudah ada.
/// Tidak pernah menambah, menghapus, atau resize field.
pub struct TableMut<'a> {
    buf: &'a mut [u8],
    loc: usize,
}

impl<'a> TableMut<'a> {
    pub fn new(buf: &'a mut [u8], loc: usize) -> Self {
        Self { buf, loc }
    }

    pub fn as_table(&self) -> Table<'_> {
        Table::new(self.buf, self.loc)
    }

    /// Returns `false` jika slot absent; buffer tidak berubah.
    pub fn mutate<T: Scalar>(&mut self, slot: u16, value: T) -> bool {
        match field_offset(self.buf, self.loc, slot) {
            Some(off) => {
                write_scalar(self.buf, self.loc + off, value);
                true
            }
            None => false,
        }
    }

    /// Returns `false` jika vector absent.
    ///
    /// # Panics
    /// Panic jika `index` di luar panjang vector.
    pub fn mutate_vector_element<T: Scalar>(&mut self, slot: u16, index: usize, value: T) -> bool {
        let Some(off) = field_offset(self.buf, self.loc, slot) else {
            return false;
        };
        let vector_loc = deref_uoffset(self.buf, self.loc + off);
        let pos = Vector::<T>::new(self.buf, vector_loc).element_pos(index);
        write_scalar(self.buf, pos, value);
        true
    }

    /// Pindah ke child table di `slot`
    pub fn into_child(self, slot: u16) -> Option<TableMut<'a>> {
        let off = field_offset(self.buf, self.loc, slot)?;
        let loc = deref_uoffset(self.buf, self.loc + off);
        Some(TableMut::new(self.buf, loc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Builder, Offset};

    fn sample() -> Vec<u8> {
        let mut fbb = Builder::new();
        let words = fbb.create_vector(&[10u32, 20, 30]).unwrap();
        fbb.start_table(4).unwrap();
        fbb.add_scalar(0, 5u16, 0).unwrap();
        fbb.add_offset(2, words).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish(root).unwrap();
        fbb.finished_data().unwrap().to_vec()
    }

    #[test]
    fn test_slot_beyond_vtable_is_absent() {
        let buf = sample();
        let table = root_table(&buf);
        assert_eq!(table.vtable_slots(), 3);
        assert!(table.is_present(0));
        assert!(!table.is_present(1));
        assert!(!table.is_present(3));
        assert!(!table.is_present(200));
        assert_eq!(table.get(3, 9u8), 9);
    }

    #[test]
    fn test_vector_access() {
        let buf = sample();
        let words = root_table(&buf).get_vector::<u32>(2).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words.get(1), 20);
        assert_eq!(words.iter().sum::<u32>(), 60);
        assert_eq!(format!("{:?}", words), "[10, 20, 30]");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_vector_index_out_of_range_panics() {
        let buf = sample();
        let words = root_table(&buf).get_vector::<u32>(2).unwrap();
        let _ = words.get(3);
    }

    #[test]
    #[should_panic(expected = "overruns buffer")]
    fn test_corrupt_vector_length_panics() {
        let mut buf = sample();
        let words = root_table(&buf).get_vector::<u32>(2).unwrap();
        let len_pos = words.loc;
        write_scalar(&mut buf, len_pos, 1_000u32);
        let _ = root_table(&buf).get_vector::<u32>(2);
    }

    #[test]
    #[should_panic]
    fn test_corrupt_root_offset_panics() {
        let mut buf = sample();
        write_scalar(&mut buf, 0, u32::MAX - 8);
        let _ = root_table(&buf).get(0, 0u16);
    }

    #[test]
    fn test_mutate_present_and_absent() {
        let mut buf = sample();
        let loc = root_loc(&buf, false);
        let before = buf.clone();

        let mut table = TableMut::new(&mut buf, loc);
        assert!(!table.mutate(1, 3u8));
        assert!(table.mutate(0, 6u16));
        assert!(table.mutate_vector_element(2, 0, 11u32));
        assert!(!table.mutate_vector_element(1, 0, 11u32));
        assert_eq!(table.as_table().get(0, 0u16), 6);

        let changed = buf
            .iter()
            .zip(before.iter())
            .filter(|(a, b)| a != b)
            .count();
        // 5 -> 6 (satu byte) dan 10 -> 11 (satu byte)
        assert_eq!(changed, 2);
    }

    #[test]
    fn test_size_prefixed_root() {
        let mut fbb = Builder::new();
        fbb.start_table(1).unwrap();
        fbb.add_scalar(0, 77u32, 0).unwrap();
        let root: Offset<()> = fbb.end_table().unwrap();
        fbb.finish_size_prefixed(root).unwrap();
        let buf = fbb.finished_data().unwrap();

        assert_eq!(read_scalar::<u32>(buf, 0) as usize, buf.len() - SIZE_PREFIX);
        assert_eq!(size_prefixed_root_table(buf).get(0, 0u32), 77);
    }

    #[test]
    #[should_panic(expected = "outside buffer")]
    fn test_corrupt_soffset_panics() {
        let mut buf = sample();
        let loc = root_loc(&buf, false);
        let soffset = -2 * buf.len() as SOffset;
        write_scalar(&mut buf, loc, soffset);
        let _ = root_table(&buf).get(0, 0u16);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_vtable_entry_past_buffer_panics() {
        let mut buf = sample();
        let vtable = root_table(&buf).vtable_pos();
        let entry = vtable + VTABLE_METADATA_FIELDS * SIZE_VOFFSET;
        write_scalar(&mut buf, entry, u16::MAX);
        let _ = root_table(&buf).get(0, 0u16);
    }
}
