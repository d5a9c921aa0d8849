//! Strided gather/scatter between caller storage and packed element payloads.
//!
//! Callers often keep element values inside larger records (an array of
//! structs), so values sit `stride` bytes apart. On the wire they are packed
//! back to back, `unit_size` bytes each.

use crate::error::{ComError, ProtocolErrorKind, Result};

/// Bytes spanned by `count` values of `unit_size` placed `stride` bytes apart.
pub fn strided_len(count: usize, unit_size: usize, stride: usize) -> usize {
    match count {
        0 => 0,
        n => (n - 1) * stride + unit_size,
    }
}

fn check_stride(unit_size: usize, stride: usize) -> Result<()> {
    if stride < unit_size {
        return Err(ComError::protocol(ProtocolErrorKind::StrideTooSmall {
            stride,
            unit_size,
        }));
    }
    Ok(())
}

/// Pack `count` strided values from `src` into `dst`.
pub fn gather(
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    unit_size: usize,
    stride: usize,
) -> Result<()> {
    check_stride(unit_size, stride)?;
    let packed = count * unit_size;
    let needed = strided_len(count, unit_size, stride);
    if src.len() < needed {
        return Err(ComError::protocol(ProtocolErrorKind::SourceTooShort {
            needed,
            available: src.len(),
        }));
    }
    if dst.len() < packed {
        return Err(ComError::protocol(ProtocolErrorKind::DestinationTooSmall {
            needed: packed,
            available: dst.len(),
        }));
    }
    if count == 0 || unit_size == 0 {
        return Ok(());
    }

    if stride == unit_size {
        dst[..packed].copy_from_slice(&src[..packed]);
        return Ok(());
    }

    let dst = &mut dst[..packed];
    match unit_size {
        1 => gather_fixed::<1>(dst, src, stride),
        2 => gather_fixed::<2>(dst, src, stride),
        4 => gather_fixed::<4>(dst, src, stride),
        8 => gather_fixed::<8>(dst, src, stride),
        n => {
            for (out, value) in dst.chunks_exact_mut(n).zip(src.chunks(stride)) {
                out.copy_from_slice(&value[..n]);
            }
        }
    }
    Ok(())
}

/// Unpack `count` packed values from `src` into `dst`, `stride` bytes apart.
///
/// Bytes of `dst` between values are left untouched.
pub fn scatter(
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    unit_size: usize,
    stride: usize,
) -> Result<()> {
    check_stride(unit_size, stride)?;
    let packed = count * unit_size;
    let needed = strided_len(count, unit_size, stride);
    if src.len() < packed {
        return Err(ComError::protocol(ProtocolErrorKind::SourceTooShort {
            needed: packed,
            available: src.len(),
        }));
    }
    if dst.len() < needed {
        return Err(ComError::protocol(ProtocolErrorKind::DestinationTooSmall {
            needed,
            available: dst.len(),
        }));
    }
    if count == 0 || unit_size == 0 {
        return Ok(());
    }

    if stride == unit_size {
        dst[..packed].copy_from_slice(&src[..packed]);
        return Ok(());
    }

    let src = &src[..packed];
    match unit_size {
        1 => scatter_fixed::<1>(dst, src, stride),
        2 => scatter_fixed::<2>(dst, src, stride),
        4 => scatter_fixed::<4>(dst, src, stride),
        8 => scatter_fixed::<8>(dst, src, stride),
        n => {
            for (slot, value) in dst.chunks_mut(stride).zip(src.chunks_exact(n)) {
                slot[..n].copy_from_slice(value);
            }
        }
    }
    Ok(())
}

#[inline]
fn gather_fixed<const N: usize>(dst: &mut [u8], src: &[u8], stride: usize) {
    for (out, value) in dst.chunks_exact_mut(N).zip(src.chunks(stride)) {
        out.copy_from_slice(&value[..N]);
    }
}

#[inline]
fn scatter_fixed<const N: usize>(dst: &mut [u8], src: &[u8], stride: usize) {
    for (slot, value) in dst.chunks_mut(stride).zip(src.chunks_exact(N)) {
        slot[..N].copy_from_slice(value);
    }
}
