//! Rank-1 contiguous views.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ops::Index;
use std::ptr::NonNull;

use crate::access::{Access, ReadOnly, ReadWrite};
use crate::auxiliary::{byte_offset, check_index, check_window};
use crate::storage::{checked_interior_offset, raw_storage, BackingKind, HostArray, Storage};
use crate::view0d::View0D;
use crate::{report, Argument, Result, ViewError};
use memview_traits::Element;

/// A contiguous window of `len` elements of `T`.
///
/// Element `i` lives at `base + i * size_of::<T>()`. The view is a `Copy`
/// descriptor; it neither owns nor copies the elements.
///
/// # Type Parameters
/// - `T`: Element type
/// - `A`: Access mode, [`ReadOnly`] (default) or [`ReadWrite`]
pub struct View1D<'a, T, A: Access = ReadOnly> {
    storage: Storage,
    len: usize,
    _marker: PhantomData<(&'a Cell<T>, A)>,
}

impl<T, A: Access> Clone for View1D<'_, T, A> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: Access> Copy for View1D<'_, T, A> {}

impl<T, A: Access> fmt::Debug for View1D<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View1D")
            .field("len", &self.len)
            .field("backing", &self.backing())
            .field("address", &self.as_ptr())
            .finish()
    }
}

impl<T, A: Access> Default for View1D<'_, T, A> {
    fn default() -> Self {
        Self::empty()
    }
}

// SAFETY: a read-only view behaves like `&'a [T]`.
unsafe impl<T: Sync> Send for View1D<'_, T, ReadOnly> {}
unsafe impl<T: Sync> Sync for View1D<'_, T, ReadOnly> {}

impl<'a, T, A: Access> View1D<'a, T, A> {
    #[inline]
    pub(crate) fn from_storage(storage: Storage, len: usize) -> Self {
        Self {
            storage,
            len,
            _marker: PhantomData,
        }
    }

    /// View a whole host array.
    pub fn new<S>(source: S) -> Self
    where
        S: HostArray<'a, 1, Elem = T, Access = A>,
    {
        let (first, [len]) = source.into_raw_parts();
        Self::from_storage(Storage::array(first, 0), len)
    }

    /// View a host array from `start` to its end.
    ///
    /// `start == len` yields an empty view.
    pub fn with_start<S>(source: S, start: usize) -> Result<Self>
    where
        S: HostArray<'a, 1, Elem = T, Access = A>,
    {
        Self::new(source).slice_from(start)
    }

    /// View `length` elements of a host array beginning at `start`.
    pub fn with_range<S>(source: S, start: usize, length: usize) -> Result<Self>
    where
        S: HostArray<'a, 1, Elem = T, Access = A>,
    {
        Self::new(source).slice(start, length)
    }

    /// The empty view.
    pub fn empty() -> Self {
        Self::from_storage(Storage::pointer(NonNull::<T>::dangling()), 0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Which kind of storage the view addresses.
    #[inline]
    pub fn backing(&self) -> BackingKind {
        self.storage.kind()
    }

    /// Address of the first element.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr_at(0)
    }

    #[inline]
    fn ptr_at(&self, index: usize) -> *mut T {
        self.storage.address().cast::<T>().wrapping_add(index)
    }

    /// The elements from `start` to the end.
    pub fn slice_from(&self, start: usize) -> Result<Self> {
        check_window(start, 0, self.len, 0)?;
        Ok(Self::from_storage(
            self.storage.advance::<T>(start),
            self.len - start,
        ))
    }

    /// `length` elements beginning at `start`.
    pub fn slice(&self, start: usize, length: usize) -> Result<Self> {
        check_window(start, length, self.len, 0)?;
        Ok(Self::from_storage(self.storage.advance::<T>(start), length))
    }

    /// Whether both views address the same first element and have the same length.
    #[inline]
    pub fn ptr_eq<B: Access>(&self, other: &View1D<'_, T, B>) -> bool {
        self.len == other.len && self.as_ptr() == other.as_ptr()
    }

    /// Single-element view of element `index`.
    pub fn element(&self, index: usize) -> Result<View0D<'a, T, A>> {
        check_index(index, self.len, 0)?;
        Ok(View0D::from_storage(self.storage.advance::<T>(index)))
    }
}

impl<'a, T: Copy, A: Access> View1D<'a, T, A> {
    /// Read element `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        check_index(index, self.len, 0)?;
        // SAFETY: index checked above.
        Ok(unsafe { self.get_unchecked(index) })
    }

    /// Read element `index` without bounds checking.
    ///
    /// # Safety
    /// `index < self.len()`.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> T {
        self.ptr_at(index).read()
    }

    /// Iterate over element values.
    pub fn iter(&self) -> Iter<'a, T, A> {
        Iter {
            view: *self,
            front: 0,
            back: self.len,
        }
    }
}

impl<'a, T> View1D<'a, T, ReadOnly> {
    /// View `len` elements of caller-managed memory.
    ///
    /// Fails with [`ViewError::NotReferenceFree`] if `T` holds references and
    /// with [`ViewError::NullSource`] if `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `len` elements of `T` for `'a`, and the
    /// memory must not be written through other means during `'a`.
    pub unsafe fn from_raw_parts(ptr: *const T, len: usize) -> Result<Self>
    where
        T: Element,
    {
        Ok(Self::from_storage(raw_storage(ptr)?, len))
    }

    /// View `len` elements of the interior of `host`, starting at the field
    /// selected by `field`.
    ///
    /// The window must lie inside `host`'s own bytes; a field reached through
    /// an indirection (a `Box` or `Vec` member) is rejected.
    pub fn from_object<H: ?Sized>(host: &'a H, field: impl FnOnce(&H) -> &T, len: usize) -> Result<Self> {
        let host_size = std::mem::size_of_val(host);
        let base = NonNull::from(host);
        let offset = byte_offset(host as *const H, field(host) as *const T);
        let extent = len
            .checked_mul(size_of::<T>())
            .ok_or_else(|| report(ViewError::Overflow))?;
        let offset = checked_interior_offset(offset, extent, host_size, Argument::Length)?;
        Ok(Self::from_storage(Storage::object(base, offset), len))
    }

    /// View `len` elements of the interior of `host` without checking that
    /// they lie inside it.
    ///
    /// A rank-1 window has no strides to derive, so nothing here can fail and
    /// the view is returned directly. The rank 2 to 5 counterpart,
    /// [`ViewND::dangerous_from_object`](crate::ViewND::dangerous_from_object),
    /// returns a `Result` because its derived strides can overflow.
    ///
    /// # Safety
    /// `len` elements of `T` starting at the selected field must be valid for
    /// reads for `'a` and owned by `host`.
    pub unsafe fn dangerous_from_object<H: ?Sized>(host: &'a H, field: impl FnOnce(&H) -> &T, len: usize) -> Self {
        let base = NonNull::from(host);
        let offset = byte_offset(host as *const H, field(host) as *const T);
        log::trace!("unchecked object-backed view: offset {offset}, len {len}");
        Self::from_storage(Storage::object(base, offset as usize), len)
    }

    /// Shared reference to element `index`.
    pub fn get_ref(&self, index: usize) -> Result<&'a T> {
        check_index(index, self.len, 0)?;
        // SAFETY: index checked above; the memory is shared for `'a`.
        Ok(unsafe { &*self.ptr_at(index) })
    }

    /// The elements as a slice.
    ///
    /// Object-backed views cannot be flattened and report
    /// [`ViewError::Unsupported`].
    pub fn as_slice(&self) -> Result<&'a [T]> {
        self.check_flattenable("as_slice")?;
        // SAFETY: the window is contiguous, initialized and shared for `'a`.
        Ok(unsafe { std::slice::from_raw_parts(self.ptr_at(0), self.len) })
    }
}

impl<'a, T, A: Access> View1D<'a, T, A> {
    fn check_flattenable(&self, operation: &'static str) -> Result<()> {
        match self.backing() {
            BackingKind::Object => Err(report(ViewError::Unsupported {
                operation,
                backing: BackingKind::Object,
            })),
            BackingKind::Array | BackingKind::Pointer => Ok(()),
        }
    }
}

impl<'a, T> View1D<'a, T, ReadWrite> {
    /// Read-write counterpart of [`View1D::from_raw_parts`].
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` elements of `T` for
    /// `'a`, and accessed only through views derived from this one during `'a`.
    pub unsafe fn from_raw_parts_mut(ptr: *mut T, len: usize) -> Result<Self>
    where
        T: Element,
    {
        Ok(Self::from_storage(raw_storage(ptr)?, len))
    }

    /// Read-write counterpart of [`View1D::from_object`].
    pub fn from_object_mut<H: ?Sized>(
        host: &'a mut H,
        field: impl FnOnce(&mut H) -> &mut T,
        len: usize,
    ) -> Result<Self> {
        let base: *mut H = host;
        // SAFETY: `base` comes from a live exclusive borrow.
        let host_size = std::mem::size_of_val(unsafe { &*base });
        let offset = byte_offset(base, field(unsafe { &mut *base }) as *mut T);
        let extent = len
            .checked_mul(size_of::<T>())
            .ok_or_else(|| report(ViewError::Overflow))?;
        let offset = checked_interior_offset(offset, extent, host_size, Argument::Length)?;
        // SAFETY: derived from a reference.
        let base = unsafe { NonNull::new_unchecked(base) };
        Ok(Self::from_storage(Storage::object(base, offset), len))
    }

    /// Read-write counterpart of [`View1D::dangerous_from_object`]. Infallible
    /// for the same reason.
    ///
    /// # Safety
    /// `len` elements of `T` starting at the selected field must be valid for
    /// reads and writes for `'a` and owned by `host`.
    pub unsafe fn dangerous_from_object_mut<H: ?Sized>(
        host: &'a mut H,
        field: impl FnOnce(&mut H) -> &mut T,
        len: usize,
    ) -> Self {
        let base: *mut H = host;
        let offset = byte_offset(base, field(&mut *base) as *mut T);
        log::trace!("unchecked object-backed view: offset {offset}, len {len}");
        Self::from_storage(Storage::object(NonNull::new_unchecked(base), offset as usize), len)
    }

    /// Store `value` at `index`, dropping the previous value.
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        check_index(index, self.len, 0)?;
        // SAFETY: index checked above.
        unsafe { self.set_unchecked(index, value) };
        Ok(())
    }

    /// Store `value` at `index` without bounds checking.
    ///
    /// # Safety
    /// `index < self.len()`.
    #[inline]
    pub unsafe fn set_unchecked(&self, index: usize, value: T) {
        drop(std::ptr::replace(self.ptr_at(index), value));
    }

    /// Cell reference to element `index`.
    pub fn cell(&self, index: usize) -> Result<&'a Cell<T>> {
        check_index(index, self.len, 0)?;
        // SAFETY: `Cell<T>` has the layout of `T`; writers share this discipline.
        Ok(unsafe { &*(self.ptr_at(index) as *const Cell<T>) })
    }

    /// The elements as a slice of cells.
    ///
    /// Object-backed views report [`ViewError::Unsupported`].
    pub fn as_cells(&self) -> Result<&'a [Cell<T>]> {
        self.check_flattenable("as_cells")?;
        // SAFETY: contiguous and initialized; `Cell<T>` has the layout of `T`.
        Ok(unsafe { std::slice::from_raw_parts(self.ptr_at(0) as *const Cell<T>, self.len) })
    }
}

impl<'a, T: Clone> View1D<'a, T, ReadOnly> {
    /// Clone the elements into a new `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len)
            // SAFETY: in bounds; the memory is shared for `'a`.
            .map(|i| unsafe { (*self.ptr_at(i)).clone() })
            .collect()
    }

    /// Clone all elements into `destination`, which must be at least as long.
    ///
    /// On a short destination nothing is written.
    pub fn copy_to(&self, destination: &View1D<'_, T, ReadWrite>) -> Result<()> {
        if !self.try_copy_to(destination) {
            return Err(report(ViewError::DestinationTooShort {
                source_len: self.len,
                destination_len: destination.len,
            }));
        }
        Ok(())
    }

    /// Like [`copy_to`](Self::copy_to), reporting a short destination as `false`.
    pub fn try_copy_to(&self, destination: &View1D<'_, T, ReadWrite>) -> bool {
        if self.len > destination.len {
            return false;
        }
        for i in 0..self.len {
            // SAFETY: both indices are in bounds. A read-only window is not
            // written during `'a`, so it cannot overlap the destination.
            unsafe { destination.set_unchecked(i, (*self.ptr_at(i)).clone()) };
        }
        true
    }
}

impl<'a, T: Copy> View1D<'a, T, ReadWrite> {
    /// Copy the elements into a new `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Copy all elements into `destination`, which must be at least as long.
    ///
    /// Overlapping source and destination are handled like `memmove`. On a
    /// short destination nothing is written.
    pub fn copy_to(&self, destination: &View1D<'_, T, ReadWrite>) -> Result<()> {
        if !self.try_copy_to(destination) {
            return Err(report(ViewError::DestinationTooShort {
                source_len: self.len,
                destination_len: destination.len,
            }));
        }
        Ok(())
    }

    /// Like [`copy_to`](Self::copy_to), reporting a short destination as `false`.
    pub fn try_copy_to(&self, destination: &View1D<'_, T, ReadWrite>) -> bool {
        if self.len > destination.len {
            return false;
        }
        let src = self.ptr_at(0);
        let dst = destination.ptr_at(0);
        // SAFETY: both windows are valid for `self.len` elements and the
        // direction keeps every source element unread-after-overwrite.
        unsafe {
            if byte_offset(dst, src) >= 0 {
                for i in 0..self.len {
                    *dst.add(i) = *src.add(i);
                }
            } else {
                for i in (0..self.len).rev() {
                    *dst.add(i) = *src.add(i);
                }
            }
        }
        true
    }

    /// Store `value` in every element.
    pub fn fill(&self, value: T) {
        for i in 0..self.len {
            // SAFETY: in bounds.
            unsafe { *self.ptr_at(i) = value };
        }
    }

    /// Reset every element to zero.
    pub fn clear(&self)
    where
        T: num_traits::Zero,
    {
        self.fill(T::zero());
    }
}

#[cfg(feature = "cast")]
impl<'a, T: bytemuck::Pod, A: Access> View1D<'a, T, A> {
    /// Reinterpret the window as elements of `U`.
    ///
    /// Fails with [`ViewError::TypeMismatch`] if the byte length is not a
    /// multiple of `size_of::<U>()` or the first element is misaligned for `U`.
    pub fn cast<U: bytemuck::Pod>(&self) -> Result<View1D<'a, U, A>> {
        let mismatch = |reason| {
            report(ViewError::TypeMismatch {
                from: std::any::type_name::<T>(),
                to: std::any::type_name::<U>(),
                reason,
            })
        };
        let bytes = crate::auxiliary::multiply(self.len, size_of::<T>());
        let size = size_of::<U>();
        if size == 0 {
            return Err(mismatch("zero-sized target type"));
        }
        if bytes % size != 0 {
            return Err(mismatch("byte length is not a multiple of the target size"));
        }
        if (self.storage.address() as usize) % std::mem::align_of::<U>() != 0 {
            return Err(mismatch("first element is misaligned for the target type"));
        }
        Ok(View1D::from_storage(self.storage, bytes / size))
    }
}

impl<'a, T> From<&'a [T]> for View1D<'a, T, ReadOnly> {
    fn from(slice: &'a [T]) -> Self {
        View1D::new(slice)
    }
}

impl<'a, T> From<&'a mut [T]> for View1D<'a, T, ReadWrite> {
    fn from(slice: &'a mut [T]) -> Self {
        View1D::new(slice)
    }
}

impl<T> Index<usize> for View1D<'_, T, ReadOnly> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get_ref(index) {
            Ok(element) => element,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<T> Index<usize> for View1D<'_, T, ReadWrite> {
    type Output = Cell<T>;

    fn index(&self, index: usize) -> &Cell<T> {
        match self.cell(index) {
            Ok(element) => element,
            Err(err) => panic!("{err}"),
        }
    }
}

/// Iterator over the element values of a [`View1D`].
pub struct Iter<'a, T, A: Access = ReadOnly> {
    view: View1D<'a, T, A>,
    front: usize,
    back: usize,
}

impl<T: Copy, A: Access> Iterator for Iter<'_, T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        // SAFETY: front < back <= len.
        let value = unsafe { self.view.get_unchecked(self.front) };
        self.front += 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T: Copy, A: Access> DoubleEndedIterator for Iter<'_, T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        // SAFETY: front <= back < len.
        Some(unsafe { self.view.get_unchecked(self.back) })
    }
}

impl<T: Copy, A: Access> ExactSizeIterator for Iter<'_, T, A> {}

impl<'a, T: Copy, A: Access> IntoIterator for View1D<'a, T, A> {
    type Item = T;
    type IntoIter = Iter<'a, T, A>;

    fn into_iter(self) -> Iter<'a, T, A> {
        self.iter()
    }
}
