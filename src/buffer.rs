// Aligned, padded byte buffer backing every parser input.
//
// Every SIMD kernel loads full 64-byte groups; the trailing zero-filled
// padding lets the last group load without tail-branch logic. The index
// stores u32 offsets, so inputs larger than u32::MAX bytes are rejected
// up front.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::ptr::NonNull;

use crate::error::{Error, Result};

/// Alignment and minimum padding of every buffer, in bytes.
pub const SIMD_ALIGN: usize = 64;

/// Largest supported input size (u32 index offsets).
pub const MAX_BUFFER_LEN: u64 = u32::MAX as u64;

/// Owner of a 64-byte-aligned byte region with zero-filled trailing padding.
///
/// Move-only; the region is immutable once loaded. `as_slice` exposes the
/// `len` content bytes, `padded` additionally exposes the padding so SIMD
/// loops can read one full group past the end.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    capacity: usize,
}

// The region is written only during construction; shared access afterwards
// is read-only.
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocate a zero-filled buffer of `len` content bytes plus at least
    /// `padding` (never less than 64) trailing bytes.
    pub fn allocate(len: usize, padding: usize) -> Result<Self> {
        if len as u64 > MAX_BUFFER_LEN {
            return Err(Error::SizeLimitExceeded {
                size: len as u64,
                limit: MAX_BUFFER_LEN,
            });
        }
        let pad = padding.max(SIMD_ALIGN);
        let capacity = len
            .checked_add(pad)
            .ok_or(Error::Alloc { size: len })?;
        let layout = Layout::from_size_align(capacity, SIMD_ALIGN)
            .map_err(|_| Error::Alloc { size: capacity })?;
        // SAFETY: layout has non-zero size (capacity >= 64).
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(Error::Alloc { size: capacity })?;
        Ok(AlignedBuffer { ptr, len, capacity })
    }

    /// Allocate and copy from an existing slice.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let mut buf = Self::allocate(data.len(), SIMD_ALIGN)?;
        buf.content_mut().copy_from_slice(data);
        Ok(buf)
    }

    /// Read an entire file into a fresh buffer.
    pub fn load_file<P: AsRef<Path>>(path: P, padding: usize) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();
        if size > MAX_BUFFER_LEN {
            return Err(Error::SizeLimitExceeded {
                size,
                limit: MAX_BUFFER_LEN,
            });
        }
        let mut buf = Self::allocate(size as usize, padding)?;
        file.read_exact(buf.content_mut())?;
        Ok(buf)
    }

    /// Drain stdin into a fresh buffer.
    pub fn load_stdin(padding: usize) -> Result<Self> {
        let mut data = Vec::new();
        std::io::stdin().lock().read_to_end(&mut data)?;
        if data.len() as u64 > MAX_BUFFER_LEN {
            return Err(Error::SizeLimitExceeded {
                size: data.len() as u64,
                limit: MAX_BUFFER_LEN,
            });
        }
        let mut buf = Self::allocate(data.len(), padding)?;
        buf.content_mut().copy_from_slice(&data);
        Ok(buf)
    }

    /// The content bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for capacity >= len bytes.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Content plus the zero-filled padding. SIMD loops index this so a full
    /// 64-byte load at any block starting below `len()` stays in bounds.
    #[inline]
    pub fn padded(&self) -> &[u8] {
        // SAFETY: ptr is valid for capacity bytes, all initialized.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Padding bytes past the content.
    #[inline]
    pub fn padding(&self) -> usize {
        self.capacity - self.len
    }

    #[inline]
    fn content_mut(&mut self) -> &mut [u8] {
        // SAFETY: exclusive access, ptr valid for len bytes.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // Layout was validated during allocation.
        if let Ok(layout) = Layout::from_size_align(self.capacity, SIMD_ALIGN) {
            // SAFETY: ptr was allocated with exactly this layout.
            unsafe { dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

impl std::ops::Deref for AlignedBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("padding", &self.padding())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_alignment_and_padding() {
        let buf = AlignedBuffer::allocate(100, 64).expect("alloc");
        assert_eq!(buf.as_slice().as_ptr() as usize % SIMD_ALIGN, 0);
        assert_eq!(buf.len(), 100);
        assert!(buf.padding() >= 64);
        assert!(buf.padded().len() >= 164);
        // Padding is zero-filled.
        assert!(buf.padded()[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_padding_floor() {
        // Requesting less than 64 bytes of padding still yields 64.
        let buf = AlignedBuffer::allocate(10, 1).expect("alloc");
        assert!(buf.padding() >= 64);
    }

    #[test]
    fn test_from_slice() {
        let buf = AlignedBuffer::from_slice(b"a,b,c\n1,2,3\n").expect("alloc");
        assert_eq!(buf.as_slice(), b"a,b,c\n1,2,3\n");
        assert_eq!(&buf[..5], b"a,b,c");
    }

    #[test]
    fn test_empty_buffer() {
        let buf = AlignedBuffer::from_slice(b"").expect("alloc");
        assert!(buf.is_empty());
        assert!(buf.padded().len() >= 64);
    }

    #[test]
    fn test_load_file() {
        let mut tmp = tempfile::NamedTempFile::new().expect("tempfile");
        tmp.write_all(b"x,y\n1,2\n").expect("write");
        let buf = AlignedBuffer::load_file(tmp.path(), 64).expect("load");
        assert_eq!(buf.as_slice(), b"x,y\n1,2\n");
        assert!(buf.padded()[buf.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = AlignedBuffer::load_file("/nonexistent/columncsv-test", 64);
        assert!(matches!(err, Err(crate::error::Error::Io(_))));
    }
}
