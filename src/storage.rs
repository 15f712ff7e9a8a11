//! Storage descriptors and host arrays.
//!
//! A view addresses its elements through a [`Storage`] descriptor, which is
//! exactly one of:
//! - array-backed: first-element address of a borrowed host array plus a byte offset
//! - object-backed: base address of a borrowed host value plus a byte offset
//! - pointer-backed: an absolute address with no borrowed owner
//!
//! Host arrays reach the views through the [`HostArray`] trait, which yields a
//! first-element address and one length per dimension.

use std::ptr::NonNull;

use crate::access::{Access, ReadOnly, ReadWrite};
use crate::auxiliary::add_elements;
use crate::{out_of_range, report, Argument, Result, ViewError};
use memview_traits::{is_reference_free, Element};

/// Which kind of storage a view addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackingKind {
    /// A borrowed host array.
    Array,
    /// The interior of a borrowed host value.
    Object,
    /// Caller-managed memory.
    Pointer,
}

impl std::fmt::Display for BackingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackingKind::Array => "array",
            BackingKind::Object => "object",
            BackingKind::Pointer => "pointer",
        };
        f.write_str(name)
    }
}

/// Where a view's elements live.
///
/// Borrowed variants keep the owner's address and a relative byte offset;
/// the pointer variant keeps only an absolute address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Storage {
    Array { first: NonNull<u8>, byte_offset: usize },
    Object { base: NonNull<u8>, byte_offset: usize },
    Pointer { address: NonNull<u8> },
}

impl Storage {
    #[inline]
    pub(crate) fn array<T>(first: NonNull<T>, byte_offset: usize) -> Self {
        Storage::Array {
            first: first.cast(),
            byte_offset,
        }
    }

    #[inline]
    pub(crate) fn object<H: ?Sized>(base: NonNull<H>, byte_offset: usize) -> Self {
        Storage::Object {
            base: base.cast(),
            byte_offset,
        }
    }

    #[inline]
    pub(crate) fn pointer<T>(address: NonNull<T>) -> Self {
        Storage::Pointer {
            address: address.cast(),
        }
    }

    #[inline]
    pub(crate) fn kind(self) -> BackingKind {
        match self {
            Storage::Array { .. } => BackingKind::Array,
            Storage::Object { .. } => BackingKind::Object,
            Storage::Pointer { .. } => BackingKind::Pointer,
        }
    }

    /// Absolute address of the view's first element.
    #[inline]
    pub(crate) fn address(self) -> *mut u8 {
        match self {
            Storage::Array { first, byte_offset } | Storage::Object { base: first, byte_offset } => {
                first.as_ptr().wrapping_add(byte_offset)
            }
            Storage::Pointer { address } => address.as_ptr(),
        }
    }

    /// Address of the element `byte_offset` bytes past the first element.
    #[inline]
    pub(crate) fn element<T>(self, byte_offset: isize) -> *mut T {
        self.address().wrapping_offset(byte_offset).cast()
    }

    /// Descriptor for a window starting `count` elements of `T` further in.
    #[inline]
    pub(crate) fn advance<T>(self, count: usize) -> Self {
        self.advance_bytes(add_elements::<T>(0, count))
    }

    /// Descriptor for a window starting `bytes` further into the same storage.
    #[inline]
    pub(crate) fn advance_bytes(self, bytes: usize) -> Self {
        match self {
            Storage::Array { first, byte_offset } => Storage::Array {
                first,
                byte_offset: byte_offset.wrapping_add(bytes),
            },
            Storage::Object { base, byte_offset } => Storage::Object {
                base,
                byte_offset: byte_offset.wrapping_add(bytes),
            },
            Storage::Pointer { address } => {
                // SAFETY: `bytes` stays within or one past a window of valid
                // memory, which cannot contain or wrap to the null address.
                let address = unsafe { NonNull::new_unchecked(address.as_ptr().wrapping_add(bytes)) };
                Storage::Pointer { address }
            }
        }
    }
}

/// Admit caller-managed memory as pointer-backed storage.
///
/// Rejects element types that are not reference free, then null pointers.
pub(crate) fn raw_storage<T: Element>(ptr: *const T) -> Result<Storage> {
    if !is_reference_free::<T>() {
        return Err(report(ViewError::NotReferenceFree {
            type_name: std::any::type_name::<T>(),
        }));
    }
    let address = NonNull::new(ptr as *mut T).ok_or_else(|| {
        report(ViewError::NullSource {
            argument: Argument::Pointer,
        })
    })?;
    log::trace!("pointer-backed view at {:p}", address);
    Ok(Storage::pointer(address))
}

/// Validate that a field `offset` bytes into a host of `host_size` bytes
/// leaves room for `extent` bytes.
///
/// An offset outside the host is reported against [`Argument::Field`]; an
/// extent running past the host's end against `extent_argument`.
pub(crate) fn checked_interior_offset(
    offset: isize,
    extent: usize,
    host_size: usize,
    extent_argument: Argument,
) -> Result<usize> {
    let start = usize::try_from(offset)
        .ok()
        .filter(|&start| start <= host_size)
        .ok_or_else(|| out_of_range(Argument::Field, 0, offset.unsigned_abs(), host_size))?;
    if extent > host_size - start {
        return Err(out_of_range(extent_argument, 0, extent, host_size - start));
    }
    Ok(start)
}

/// A host array: something that yields a stable first-element address and
/// one length per dimension.
///
/// # Safety
/// `into_raw_parts` must return the address of the first of `dims.product()`
/// initialized elements laid out row-major without padding. The memory must
/// stay valid for reads for `'a`; when `Access = ReadWrite` it must also be
/// exclusively borrowed and valid for writes for `'a`.
pub unsafe trait HostArray<'a, const N: usize> {
    /// Element type.
    type Elem: 'a;
    /// Access mode granted by the borrow.
    type Access: Access;

    /// First-element address and per-dimension lengths.
    fn into_raw_parts(self) -> (NonNull<Self::Elem>, [usize; N]);
}

unsafe impl<'a, T: 'a> HostArray<'a, 1> for &'a [T] {
    type Elem = T;
    type Access = ReadOnly;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; 1]) {
        let len = self.len();
        (NonNull::from(self).cast(), [len])
    }
}

unsafe impl<'a, T: 'a> HostArray<'a, 1> for &'a mut [T] {
    type Elem = T;
    type Access = ReadWrite;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; 1]) {
        let len = self.len();
        (NonNull::from(self).cast(), [len])
    }
}

unsafe impl<'a, T: 'a> HostArray<'a, 1> for &'a Vec<T> {
    type Elem = T;
    type Access = ReadOnly;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; 1]) {
        <&'a [T] as HostArray<'a, 1>>::into_raw_parts(self.as_slice())
    }
}

unsafe impl<'a, T: 'a> HostArray<'a, 1> for &'a mut Vec<T> {
    type Elem = T;
    type Access = ReadWrite;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; 1]) {
        <&'a mut [T] as HostArray<'a, 1>>::into_raw_parts(self.as_mut_slice())
    }
}

unsafe impl<'a, T: 'a, const L: usize> HostArray<'a, 1> for &'a [T; L] {
    type Elem = T;
    type Access = ReadOnly;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; 1]) {
        (NonNull::from(self).cast(), [L])
    }
}

unsafe impl<'a, T: 'a, const L: usize> HostArray<'a, 1> for &'a mut [T; L] {
    type Elem = T;
    type Access = ReadWrite;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; 1]) {
        (NonNull::from(self).cast(), [L])
    }
}

// Rows of fixed width with a runtime row count, e.g. `Vec<[T; C]>`
unsafe impl<'a, T: 'a, const C: usize> HostArray<'a, 2> for &'a [[T; C]] {
    type Elem = T;
    type Access = ReadOnly;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; 2]) {
        let rows = self.len();
        (NonNull::from(self).cast(), [rows, C])
    }
}

unsafe impl<'a, T: 'a, const C: usize> HostArray<'a, 2> for &'a mut [[T; C]] {
    type Elem = T;
    type Access = ReadWrite;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; 2]) {
        let rows = self.len();
        (NonNull::from(self).cast(), [rows, C])
    }
}

// Nested fixed-size arrays are contiguous and row-major
macro_rules! impl_nested_host_array {
    ($rank:literal, [$($d:ident),+], $arr:ty) => {
        unsafe impl<'a, T: 'a, $(const $d: usize),+> HostArray<'a, $rank> for &'a $arr {
            type Elem = T;
            type Access = ReadOnly;

            #[inline]
            fn into_raw_parts(self) -> (NonNull<T>, [usize; $rank]) {
                (NonNull::from(self).cast(), [$($d),+])
            }
        }

        unsafe impl<'a, T: 'a, $(const $d: usize),+> HostArray<'a, $rank> for &'a mut $arr {
            type Elem = T;
            type Access = ReadWrite;

            #[inline]
            fn into_raw_parts(self) -> (NonNull<T>, [usize; $rank]) {
                (NonNull::from(self).cast(), [$($d),+])
            }
        }
    };
}

impl_nested_host_array!(2, [D0, D1], [[T; D1]; D0]);
impl_nested_host_array!(3, [D0, D1, D2], [[[T; D2]; D1]; D0]);
impl_nested_host_array!(4, [D0, D1, D2, D3], [[[[T; D3]; D2]; D1]; D0]);
impl_nested_host_array!(5, [D0, D1, D2, D3, D4], [[[[[T; D4]; D3]; D2]; D1]; D0]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_address_and_advance() {
        let data = [1u32, 2, 3, 4];
        let first = NonNull::from(&data).cast::<u32>();

        let array = Storage::array(first, 4);
        assert_eq!(array.kind(), BackingKind::Array);
        assert_eq!(array.address(), first.as_ptr().cast::<u8>().wrapping_add(4));
        let advanced = array.advance::<u32>(2);
        assert_eq!(
            advanced,
            Storage::Array {
                first: first.cast(),
                byte_offset: 12
            }
        );
        assert_eq!(unsafe { *advanced.element::<u32>(0) }, 4);

        let pointer = Storage::pointer(first);
        assert_eq!(pointer.kind(), BackingKind::Pointer);
        assert_eq!(unsafe { *pointer.advance_bytes(4).element::<u32>(4) }, 3);
    }

    #[test]
    fn test_raw_storage_rejects() {
        let err = raw_storage::<Box<u8>>(std::ptr::null()).unwrap_err();
        assert!(matches!(err, ViewError::NotReferenceFree { .. }));

        let err = raw_storage::<u8>(std::ptr::null()).unwrap_err();
        assert_eq!(
            err,
            ViewError::NullSource {
                argument: Argument::Pointer
            }
        );

        let value = 5u16;
        let storage = raw_storage(&value as *const u16).unwrap();
        assert_eq!(storage.kind(), BackingKind::Pointer);
    }

    #[test]
    fn test_checked_interior_offset() {
        assert_eq!(checked_interior_offset(8, 8, 16, Argument::Length).unwrap(), 8);
        assert_eq!(checked_interior_offset(16, 0, 16, Argument::Length).unwrap(), 16);
        assert!(matches!(
            checked_interior_offset(-4, 4, 16, Argument::Length),
            Err(ViewError::OutOfRange {
                argument: Argument::Field,
                value: 4,
                ..
            })
        ));
        assert!(matches!(
            checked_interior_offset(12, 8, 16, Argument::Length),
            Err(ViewError::OutOfRange {
                argument: Argument::Length,
                value: 8,
                bound: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_object_storage_kind() {
        let value = (1u8, 2u64);
        let storage = Storage::object(NonNull::from(&value), 0);
        assert_eq!(storage.kind(), BackingKind::Object);
        assert_eq!(storage.kind().to_string(), "object");
    }

    #[test]
    fn test_host_array_rank1() {
        let mut v = vec![1, 2, 3];
        let (ptr, dims) = (&v).into_raw_parts();
        assert_eq!(dims, [3]);
        assert_eq!(ptr.as_ptr() as *const i32, v.as_ptr());

        let (_, dims) = (&mut v).into_raw_parts();
        assert_eq!(dims, [3]);

        let arr = [0u8; 7];
        let (_, dims) = HostArray::<1>::into_raw_parts(&arr);
        assert_eq!(dims, [7]);
    }

    #[test]
    fn test_host_array_nested() {
        let grid = [[[0i16; 4]; 3]; 2];
        let (ptr, dims) = HostArray::<3>::into_raw_parts(&grid);
        assert_eq!(dims, [2, 3, 4]);
        assert_eq!(ptr.as_ptr() as *const i16, &grid[0][0][0] as *const i16);

        let rows: Vec<[f32; 5]> = vec![[0.0; 5]; 6];
        let (_, dims) = HostArray::<2>::into_raw_parts(rows.as_slice());
        assert_eq!(dims, [6, 5]);
    }
}
