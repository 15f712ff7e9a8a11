//! Rectangular views of rank 2 to 5.
//!
//! A [`ViewND`] addresses a row-major grid through N-1 outer byte strides;
//! the innermost stride is always `size_of::<T>()` and is not stored.
//! Sub-windows keep the strides of the host they were cut from, so a window
//! of a 3x4 array still steps a full host row per outer index.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ops::Index;
use std::ptr::NonNull;

use crate::access::{Access, ReadOnly, ReadWrite};
use crate::auxiliary::{
    byte_offset, check_index, check_window, checked_len, element_byte_offset, extent_bytes, row_major_byte_strides,
};
use crate::storage::{checked_interior_offset, raw_storage, BackingKind, HostArray, Storage};
use crate::view1d::View1D;
use crate::{out_of_range, Argument, Result};
use memview_traits::Element;

/// Type-level rank marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dim<const N: usize>;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Dim<2> {}
    impl Sealed for super::Dim<3> {}
    impl Sealed for super::Dim<4> {}
    impl Sealed for super::Dim<5> {}
}

/// Ranks a [`ViewND`] can have, with their outer stride storage.
pub trait Rank: sealed::Sealed {
    /// `[isize; N - 1]`: byte strides of every dimension but the innermost.
    type Strides: Copy + Default + fmt::Debug + PartialEq + Eq + AsRef<[isize]> + AsMut<[isize]>;
}

impl Rank for Dim<2> {
    type Strides = [isize; 1];
}

impl Rank for Dim<3> {
    type Strides = [isize; 2];
}

impl Rank for Dim<4> {
    type Strides = [isize; 3];
}

impl Rank for Dim<5> {
    type Strides = [isize; 4];
}

/// Outer byte strides of a rank-`N` view.
pub type Strides<const N: usize> = <Dim<N> as Rank>::Strides;

/// A strided view of rank `N` (2 to 5).
///
/// # Type Parameters
/// - `'a`: Lifetime of the underlying storage
/// - `T`: Element type
/// - `N`: Number of dimensions
/// - `A`: Access mode, [`ReadOnly`] (default) or [`ReadWrite`]
pub struct ViewND<'a, T, const N: usize, A: Access = ReadOnly>
where
    Dim<N>: Rank,
{
    storage: Storage,
    dims: [usize; N],
    strides: Strides<N>,
    _marker: PhantomData<(&'a Cell<T>, A)>,
}

pub type View2D<'a, T, A = ReadOnly> = ViewND<'a, T, 2, A>;
pub type View3D<'a, T, A = ReadOnly> = ViewND<'a, T, 3, A>;
pub type View4D<'a, T, A = ReadOnly> = ViewND<'a, T, 4, A>;
pub type View5D<'a, T, A = ReadOnly> = ViewND<'a, T, 5, A>;

impl<T, const N: usize, A: Access> Clone for ViewND<'_, T, N, A>
where
    Dim<N>: Rank,
{
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const N: usize, A: Access> Copy for ViewND<'_, T, N, A> where Dim<N>: Rank {}

impl<T, const N: usize, A: Access> fmt::Debug for ViewND<'_, T, N, A>
where
    Dim<N>: Rank,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewND")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("backing", &self.backing())
            .field("address", &self.as_ptr())
            .finish()
    }
}

// SAFETY: a read-only view behaves like `&'a [T]`.
unsafe impl<T: Sync, const N: usize> Send for ViewND<'_, T, N, ReadOnly> where Dim<N>: Rank {}
unsafe impl<T: Sync, const N: usize> Sync for ViewND<'_, T, N, ReadOnly> where Dim<N>: Rank {}

/// Row-major strides for `dims`.
fn dense_strides<T, const N: usize>(dims: &[usize; N]) -> Result<Strides<N>>
where
    Dim<N>: Rank,
{
    let mut strides = <Strides<N> as Default>::default();
    row_major_byte_strides(size_of::<T>(), dims, strides.as_mut())?;
    Ok(strides)
}

impl<'a, T, const N: usize, A: Access> ViewND<'a, T, N, A>
where
    Dim<N>: Rank,
{
    #[inline]
    fn from_parts(storage: Storage, dims: [usize; N], strides: Strides<N>) -> Self {
        Self {
            storage,
            dims,
            strides,
            _marker: PhantomData,
        }
    }

    /// View a whole host array.
    pub fn new<S>(source: S) -> Self
    where
        S: HostArray<'a, N, Elem = T, Access = A>,
    {
        let (first, dims) = source.into_raw_parts();
        // A live host spans at most isize::MAX bytes, so only an empty host
        // can overflow; its strides are never followed.
        let strides = dense_strides::<T, N>(&dims).unwrap_or_default();
        Self::from_parts(Storage::array(first, 0), dims, strides)
    }

    /// View a host array from `starts` to its end along every axis.
    pub fn with_start<S>(source: S, starts: [usize; N]) -> Result<Self>
    where
        S: HostArray<'a, N, Elem = T, Access = A>,
    {
        let view = Self::new(source);
        let mut lengths = [0; N];
        for axis in 0..N {
            check_window(starts[axis], 0, view.dims[axis], axis)?;
            lengths[axis] = view.dims[axis] - starts[axis];
        }
        view.subview(starts, lengths)
    }

    /// View `lengths` elements per axis of a host array beginning at `starts`.
    pub fn with_range<S>(source: S, starts: [usize; N], lengths: [usize; N]) -> Result<Self>
    where
        S: HostArray<'a, N, Elem = T, Access = A>,
    {
        Self::new(source).subview(starts, lengths)
    }

    /// Lengths per dimension.
    #[inline]
    pub fn dims(&self) -> &[usize; N] {
        &self.dims
    }

    /// Length along `axis`.
    #[inline]
    pub fn dim(&self, axis: usize) -> usize {
        self.dims[axis]
    }

    /// Outer byte strides; the innermost stride is `size_of::<T>()`.
    #[inline]
    pub fn strides(&self) -> &Strides<N> {
        &self.strides
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        N
    }

    /// Total number of elements.
    ///
    /// An axis of length 0 makes the view empty whatever the other lengths
    /// are. A pointer-backed view whose lengths multiply past `usize::MAX`
    /// reports `usize::MAX`.
    #[inline]
    pub fn len(&self) -> usize {
        checked_len(&self.dims).unwrap_or(usize::MAX)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.contains(&0)
    }

    #[inline]
    pub fn backing(&self) -> BackingKind {
        self.storage.kind()
    }

    /// Address of element `(0, .., 0)`.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.storage.element::<T>(0)
    }

    /// Whether both views share base address, dimensions and strides.
    #[inline]
    pub fn ptr_eq<B: Access>(&self, other: &ViewND<'_, T, N, B>) -> bool {
        self.as_ptr() == other.as_ptr() && self.dims == other.dims && self.strides == other.strides
    }

    #[inline]
    fn ptr_at(&self, index: &[usize; N]) -> *mut T {
        self.storage
            .element::<T>(element_byte_offset(size_of::<T>(), self.strides.as_ref(), index))
    }

    fn check_indices(&self, index: &[usize; N]) -> Result<()> {
        for axis in 0..N {
            check_index(index[axis], self.dims[axis], axis)?;
        }
        Ok(())
    }

    /// Whether the elements are laid out densely in row-major order.
    pub fn is_contiguous(&self) -> bool {
        if self.is_empty() {
            return true;
        }
        match dense_strides::<T, N>(&self.dims) {
            Ok(dense) => dense == self.strides,
            Err(_) => false,
        }
    }

    /// The window of `lengths` elements per axis beginning at `starts`.
    ///
    /// The window keeps this view's strides.
    pub fn subview(&self, starts: [usize; N], lengths: [usize; N]) -> Result<Self> {
        for axis in 0..N {
            check_window(starts[axis], lengths[axis], self.dims[axis], axis)?;
        }
        let offset = element_byte_offset(size_of::<T>(), self.strides.as_ref(), &starts);
        Ok(Self::from_parts(
            self.storage.advance_bytes(offset as usize),
            lengths,
            self.strides,
        ))
    }

    /// Visit every element address in row-major order.
    fn for_each_ptr(&self, mut f: impl FnMut(*mut T)) {
        if self.is_empty() {
            return;
        }
        let mut index = [0usize; N];
        loop {
            f(self.ptr_at(&index));
            let mut axis = N;
            loop {
                if axis == 0 {
                    return;
                }
                axis -= 1;
                index[axis] += 1;
                if index[axis] < self.dims[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
    }
}

impl<'a, T: Copy, const N: usize, A: Access> ViewND<'a, T, N, A>
where
    Dim<N>: Rank,
{
    /// Read the element at `index`.
    pub fn get(&self, index: [usize; N]) -> Result<T> {
        self.check_indices(&index)?;
        // SAFETY: indices checked above.
        Ok(unsafe { self.get_unchecked(index) })
    }

    /// Read the element at `index` without bounds checking.
    ///
    /// # Safety
    /// `index[d] < self.dims()[d]` for every axis.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: [usize; N]) -> T {
        self.ptr_at(&index).read()
    }
}

impl<'a, T, A: Access> ViewND<'a, T, 2, A> {
    #[inline]
    pub fn nrows(&self) -> usize {
        self.dims[0]
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.dims[1]
    }

    /// Row `row` as a linear view.
    pub fn row(&self, row: usize) -> Result<View1D<'a, T, A>> {
        check_index(row, self.dims[0], 0)?;
        let offset = element_byte_offset(size_of::<T>(), &self.strides, &[row, 0]);
        Ok(View1D::from_storage(
            self.storage.advance_bytes(offset as usize),
            self.dims[1],
        ))
    }
}

/// Validate caller-supplied strides: every stride must keep elements aligned.
fn check_strides<T>(strides: &[isize]) -> Result<()> {
    for (axis, &stride) in strides.iter().enumerate() {
        if stride.unsigned_abs() % align_of::<T>() != 0 {
            return Err(out_of_range(
                Argument::Strides,
                axis,
                stride.unsigned_abs(),
                align_of::<T>(),
            ));
        }
    }
    Ok(())
}

impl<'a, T, const N: usize> ViewND<'a, T, N, ReadOnly>
where
    Dim<N>: Rank,
{
    /// View caller-managed memory as a dense row-major grid.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of every addressed element for `'a`,
    /// and the memory must not be written through other means during `'a`.
    pub unsafe fn from_raw_parts(ptr: *const T, dims: [usize; N]) -> Result<Self>
    where
        T: Element,
    {
        let storage = raw_storage(ptr)?;
        Ok(Self::from_parts(storage, dims, dense_strides::<T, N>(&dims)?))
    }

    /// View caller-managed memory with explicit outer byte strides.
    ///
    /// Fails with [`Argument::Strides`] if a stride is not a multiple of the
    /// alignment of `T`.
    ///
    /// # Safety
    /// As [`from_raw_parts`](Self::from_raw_parts), for every address the
    /// strides reach.
    pub unsafe fn from_raw_parts_strided(ptr: *const T, dims: [usize; N], strides: Strides<N>) -> Result<Self>
    where
        T: Element,
    {
        let storage = raw_storage(ptr)?;
        check_strides::<T>(strides.as_ref())?;
        Ok(Self::from_parts(storage, dims, strides))
    }

    /// View a dense grid in the interior of `host`, starting at the field
    /// selected by `field`. The grid must lie inside `host`'s own bytes.
    pub fn from_object<H: ?Sized>(host: &'a H, field: impl FnOnce(&H) -> &T, dims: [usize; N]) -> Result<Self> {
        let host_size = std::mem::size_of_val(host);
        let offset = byte_offset(host as *const H, field(host) as *const T);
        let strides = dense_strides::<T, N>(&dims)?;
        let extent = extent_bytes(size_of::<T>(), &dims, strides.as_ref())?;
        let offset = checked_interior_offset(offset, extent, host_size, Argument::Dims)?;
        Ok(Self::from_parts(Storage::object(NonNull::from(host), offset), dims, strides))
    }

    /// View a dense grid in the interior of `host` without checking that it
    /// lies inside.
    ///
    /// Unlike the rank-1 [`View1D::dangerous_from_object`], this derives
    /// row-major byte strides from `dims` and so returns a `Result`. It fails
    /// with [`ViewError::Overflow`](crate::ViewError::Overflow) only if those
    /// strides do not fit in `isize`. No bounds are checked.
    ///
    /// # Safety
    /// Every addressed element must be valid for reads for `'a` and owned by
    /// `host`.
    pub unsafe fn dangerous_from_object<H: ?Sized>(
        host: &'a H,
        field: impl FnOnce(&H) -> &T,
        dims: [usize; N],
    ) -> Result<Self> {
        let offset = byte_offset(host as *const H, field(host) as *const T);
        log::trace!("unchecked object-backed view: offset {offset}, dims {dims:?}");
        let strides = dense_strides::<T, N>(&dims)?;
        Ok(Self::from_parts(
            Storage::object(NonNull::from(host), offset as usize),
            dims,
            strides,
        ))
    }

    /// Shared reference to the element at `index`.
    pub fn get_ref(&self, index: [usize; N]) -> Result<&'a T> {
        self.check_indices(&index)?;
        // SAFETY: indices checked above; the memory is shared for `'a`.
        Ok(unsafe { &*self.ptr_at(&index) })
    }
}

impl<'a, T: Clone, const N: usize> ViewND<'a, T, N, ReadOnly>
where
    Dim<N>: Rank,
{
    /// Clone the elements into a new `Vec` in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        // SAFETY: every visited address is in bounds; the memory is shared for `'a`.
        self.for_each_ptr(|ptr| out.push(unsafe { (*ptr).clone() }));
        out
    }
}

impl<'a, T, const N: usize> ViewND<'a, T, N, ReadWrite>
where
    Dim<N>: Rank,
{
    /// Read-write counterpart of [`ViewND::from_raw_parts`].
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of every addressed element for
    /// `'a`, and accessed only through views derived from this one during `'a`.
    pub unsafe fn from_raw_parts_mut(ptr: *mut T, dims: [usize; N]) -> Result<Self>
    where
        T: Element,
    {
        let storage = raw_storage(ptr)?;
        Ok(Self::from_parts(storage, dims, dense_strides::<T, N>(&dims)?))
    }

    /// Read-write counterpart of [`ViewND::from_raw_parts_strided`].
    ///
    /// # Safety
    /// As [`from_raw_parts_mut`](Self::from_raw_parts_mut), for every address
    /// the strides reach. Distinct indices must not reach the same element
    /// unless the caller accepts aliasing writes.
    pub unsafe fn from_raw_parts_strided_mut(ptr: *mut T, dims: [usize; N], strides: Strides<N>) -> Result<Self>
    where
        T: Element,
    {
        let storage = raw_storage(ptr)?;
        check_strides::<T>(strides.as_ref())?;
        Ok(Self::from_parts(storage, dims, strides))
    }

    /// Read-write counterpart of [`ViewND::from_object`].
    pub fn from_object_mut<H: ?Sized>(
        host: &'a mut H,
        field: impl FnOnce(&mut H) -> &mut T,
        dims: [usize; N],
    ) -> Result<Self> {
        let base: *mut H = host;
        // SAFETY: `base` comes from a live exclusive borrow.
        let host_size = std::mem::size_of_val(unsafe { &*base });
        let offset = byte_offset(base, field(unsafe { &mut *base }) as *mut T);
        let strides = dense_strides::<T, N>(&dims)?;
        let extent = extent_bytes(size_of::<T>(), &dims, strides.as_ref())?;
        let offset = checked_interior_offset(offset, extent, host_size, Argument::Dims)?;
        // SAFETY: derived from a reference.
        let base = unsafe { NonNull::new_unchecked(base) };
        Ok(Self::from_parts(Storage::object(base, offset), dims, strides))
    }

    /// Read-write counterpart of [`ViewND::dangerous_from_object`].
    ///
    /// Fails with [`ViewError::Overflow`](crate::ViewError::Overflow) only if the derived
    /// strides overflow.
    ///
    /// # Safety
    /// Every addressed element must be valid for reads and writes for `'a`
    /// and owned by `host`.
    pub unsafe fn dangerous_from_object_mut<H: ?Sized>(
        host: &'a mut H,
        field: impl FnOnce(&mut H) -> &mut T,
        dims: [usize; N],
    ) -> Result<Self> {
        let base: *mut H = host;
        let offset = byte_offset(base, field(&mut *base) as *mut T);
        log::trace!("unchecked object-backed view: offset {offset}, dims {dims:?}");
        let strides = dense_strides::<T, N>(&dims)?;
        Ok(Self::from_parts(
            Storage::object(NonNull::new_unchecked(base), offset as usize),
            dims,
            strides,
        ))
    }

    /// Store `value` at `index`, dropping the previous value.
    pub fn set(&self, index: [usize; N], value: T) -> Result<()> {
        self.check_indices(&index)?;
        // SAFETY: indices checked above.
        unsafe { self.set_unchecked(index, value) };
        Ok(())
    }

    /// Store `value` at `index` without bounds checking.
    ///
    /// # Safety
    /// `index[d] < self.dims()[d]` for every axis.
    #[inline]
    pub unsafe fn set_unchecked(&self, index: [usize; N], value: T) {
        drop(std::ptr::replace(self.ptr_at(&index), value));
    }

    /// Cell reference to the element at `index`.
    pub fn cell(&self, index: [usize; N]) -> Result<&'a Cell<T>> {
        self.check_indices(&index)?;
        // SAFETY: `Cell<T>` has the layout of `T`.
        Ok(unsafe { &*(self.ptr_at(&index) as *const Cell<T>) })
    }
}

impl<'a, T: Copy, const N: usize> ViewND<'a, T, N, ReadWrite>
where
    Dim<N>: Rank,
{
    /// Copy the elements into a new `Vec` in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        // SAFETY: every visited address is in bounds.
        self.for_each_ptr(|ptr| out.push(unsafe { ptr.read() }));
        out
    }

    /// Store `value` in every element.
    pub fn fill(&self, value: T) {
        // SAFETY: every visited address is in bounds.
        self.for_each_ptr(|ptr| unsafe { *ptr = value });
    }
}

impl<T, const N: usize> Index<[usize; N]> for ViewND<'_, T, N, ReadOnly>
where
    Dim<N>: Rank,
{
    type Output = T;

    fn index(&self, index: [usize; N]) -> &T {
        match self.get_ref(index) {
            Ok(element) => element,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<T, const N: usize> Index<[usize; N]> for ViewND<'_, T, N, ReadWrite>
where
    Dim<N>: Rank,
{
    type Output = Cell<T>;

    fn index(&self, index: [usize; N]) -> &Cell<T> {
        match self.cell(index) {
            Ok(element) => element,
            Err(err) => panic!("{err}"),
        }
    }
}
