//! Scalar little-endian read/write
//!
//! Semua nilai fixed-width disimpan little-endian. Trait `Scalar` adalah
//! satu-satunya seam antara tipe Rust dan byte di buffer.

/// Tipe fixed-width yang bisa disimpan langsung di buffer
pub trait Scalar: Copy + PartialEq + 'static {
    /// Ukuran (dan alignment) dalam bytes
    const SIZE: usize;

    /// Decode dari tepat `SIZE` bytes
    fn from_le(bytes: &[u8]) -> Self;

    /// Encode ke tepat `SIZE` bytes
    fn write_le(self, dst: &mut [u8]);
}

macro_rules! impl_scalar {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline(always)]
                fn from_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }

                #[inline(always)]
                fn write_le(self, dst: &mut [u8]) {
                    dst.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Scalar for bool {
    const SIZE: usize = 1;

    #[inline(always)]
    fn from_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline(always)]
    fn write_le(self, dst: &mut [u8]) {
        dst[0] = self as u8;
    }
}

/// Baca scalar di posisi absolut `pos`.
///
/// # Panics
/// Panic jika `pos..pos + T::SIZE` di luar buffer (buffer malformed).
#[inline(always)]
pub fn read_scalar<T: Scalar>(buf: &[u8], pos: usize) -> T {
    T::from_le(&buf[pos..pos + T::SIZE])
}

/// Tulis scalar di posisi absolut `pos`.
///
/// # Panics
/// Panic jika `pos..pos + T::SIZE` di luar buffer.
#[inline(always)]
pub fn write_scalar<T: Scalar>(buf: &mut [u8], pos: usize, value: T) {
    value.write_le(&mut buf[pos..pos + T::SIZE]);
}
