//! Address and stride arithmetic.
//!
//! These are the trusted fast paths every view operation reduces to. The
//! element address law for a rank-`n` view is
//!
//! ```text
//! address(i0, .., i_{n-1}) = base + sum(d < n-1) stride[d] * i_d + size_of::<T>() * i_{n-1}
//! ```
//!
//! `add_elements` and `multiply` work in machine-word unsigned arithmetic on
//! 32-bit and 64-bit targets alike and do not re-check their inputs: callers
//! validate indices and extents first.

use crate::{out_of_range, report, Argument, Result, ViewError};

/// Computes `base + index * size_of::<T>()`.
///
/// The caller guarantees that `index` lies within the addressed range, so the
/// byte length cannot overflow.
#[inline(always)]
pub fn add_elements<T>(base: usize, index: usize) -> usize {
    base.wrapping_add(multiply(index, std::mem::size_of::<T>()))
}

/// Byte-sized product of two pre-validated quantities.
#[inline(always)]
pub fn multiply(a: usize, b: usize) -> usize {
    debug_assert!(a.checked_mul(b).is_some(), "byte length overflow");
    a.wrapping_mul(b)
}

/// Signed byte distance from `from` to `to`.
#[inline]
pub fn byte_offset<T: ?Sized, U: ?Sized>(from: *const T, to: *const U) -> isize {
    (to.cast::<u8>() as usize).wrapping_sub(from.cast::<u8>() as usize) as isize
}

/// Derive the outer byte strides of a row-major layout.
///
/// `out[d]` receives the byte distance between consecutive indices along
/// dimension `d`; the innermost dimension's stride is `elem_size` and is not
/// written. Strides are derived right to left:
/// `out[n-2] = lengths[n-1] * elem_size`, `out[d] = out[d+1] * lengths[d+1]`.
pub fn row_major_byte_strides(elem_size: usize, lengths: &[usize], out: &mut [isize]) -> Result<()> {
    let rank = lengths.len();
    debug_assert_eq!(out.len() + 1, rank.max(1));
    if rank < 2 {
        return Ok(());
    }
    let mut stride = elem_size;
    for d in (0..rank - 1).rev() {
        stride = stride
            .checked_mul(lengths[d + 1])
            .ok_or_else(|| report(ViewError::Overflow))?;
        out[d] = isize::try_from(stride).map_err(|_| report(ViewError::Overflow))?;
    }
    Ok(())
}

/// Byte offset of the element at `index` relative to a view's base.
///
/// `strides` holds the outer byte strides, one fewer than `index.len()`.
#[inline]
pub fn element_byte_offset(elem_size: usize, strides: &[isize], index: &[usize]) -> isize {
    debug_assert_eq!(strides.len() + 1, index.len());
    let last = index.len() - 1;
    let mut offset = multiply(index[last], elem_size) as isize;
    for (&stride, &i) in strides.iter().zip(index) {
        offset = offset.wrapping_add(stride.wrapping_mul(i as isize));
    }
    offset
}

/// Number of bytes spanned by a view with non-negative strides.
///
/// Returns 0 for an empty view.
pub fn extent_bytes(elem_size: usize, lengths: &[usize], strides: &[isize]) -> Result<usize> {
    debug_assert_eq!(strides.len() + 1, lengths.len().max(1));
    if lengths.iter().any(|&len| len == 0) {
        return Ok(0);
    }
    let overflow = || report(ViewError::Overflow);
    let last = lengths.len() - 1;
    let mut extent = lengths[last].checked_mul(elem_size).ok_or_else(overflow)?;
    for (axis, (&stride, &len)) in strides.iter().zip(lengths).enumerate() {
        let stride = usize::try_from(stride)
            .map_err(|_| out_of_range(Argument::Strides, axis, 0, 0))?;
        let span = stride.checked_mul(len - 1).ok_or_else(overflow)?;
        extent = extent.checked_add(span).ok_or_else(overflow)?;
    }
    Ok(extent)
}

/// Element count of a grid with the given lengths.
///
/// Any zero length makes the grid empty, whatever the other lengths are.
/// Fails with [`ViewError::Overflow`] if the product does not fit in `usize`.
pub(crate) fn checked_len(lengths: &[usize]) -> Result<usize> {
    if lengths.contains(&0) {
        return Ok(0);
    }
    lengths
        .iter()
        .try_fold(1usize, |acc, &len| acc.checked_mul(len))
        .ok_or_else(|| report(ViewError::Overflow))
}

/// Validate an element index against a length.
#[inline]
pub(crate) fn check_index(index: usize, len: usize, axis: usize) -> Result<()> {
    if index >= len {
        return Err(out_of_range(Argument::Index, axis, index, len));
    }
    Ok(())
}

/// Validate that `start..start + length` lies inside `0..bound`.
#[inline]
pub(crate) fn check_window(start: usize, length: usize, bound: usize, axis: usize) -> Result<()> {
    if start > bound {
        return Err(out_of_range(Argument::Start, axis, start, bound));
    }
    if length > bound - start {
        return Err(out_of_range(Argument::Length, axis, length, bound - start));
    }
    Ok(())
}
