//! Rank-0 views: one element.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr::NonNull;

use crate::access::{Access, ReadOnly, ReadWrite};
use crate::auxiliary::{byte_offset, check_index};
use crate::storage::{checked_interior_offset, BackingKind, HostArray, Storage};
use crate::{Argument, Result};

/// A view of exactly one element of `T`.
pub struct View0D<'a, T, A: Access = ReadOnly> {
    storage: Storage,
    _marker: PhantomData<(&'a Cell<T>, A)>,
}

impl<T, A: Access> Clone for View0D<'_, T, A> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: Access> Copy for View0D<'_, T, A> {}

impl<T, A: Access> fmt::Debug for View0D<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View0D")
            .field("backing", &self.backing())
            .field("address", &self.as_ptr())
            .finish()
    }
}

// SAFETY: a read-only view behaves like `&'a T`.
unsafe impl<T: Sync> Send for View0D<'_, T, ReadOnly> {}
unsafe impl<T: Sync> Sync for View0D<'_, T, ReadOnly> {}

impl<'a, T, A: Access> View0D<'a, T, A> {
    #[inline]
    pub(crate) fn from_storage(storage: Storage) -> Self {
        Self {
            storage,
            _marker: PhantomData,
        }
    }

    /// View element `index` of a host array.
    pub fn new<S>(source: S, index: usize) -> Result<Self>
    where
        S: HostArray<'a, 1, Elem = T, Access = A>,
    {
        let (first, [len]) = source.into_raw_parts();
        check_index(index, len, 0)?;
        Ok(Self::from_storage(Storage::array(first, 0).advance::<T>(index)))
    }

    #[inline]
    pub fn backing(&self) -> BackingKind {
        self.storage.kind()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.storage.element::<T>(0)
    }

    /// Whether both views address the same element.
    #[inline]
    pub fn ptr_eq<B: Access>(&self, other: &View0D<'_, T, B>) -> bool {
        self.as_ptr() == other.as_ptr()
    }
}

impl<T: Copy, A: Access> View0D<'_, T, A> {
    #[inline]
    pub fn get(&self) -> T {
        // SAFETY: every constructor establishes a valid element.
        unsafe { self.storage.element::<T>(0).read() }
    }
}

impl<'a, T> View0D<'a, T, ReadOnly> {
    /// View the field of `host` selected by `field`.
    ///
    /// The field must lie inside `host`'s own bytes.
    pub fn from_object<H: ?Sized>(host: &'a H, field: impl FnOnce(&H) -> &T) -> Result<Self> {
        let host_size = std::mem::size_of_val(host);
        let offset = byte_offset(host as *const H, field(host) as *const T);
        let offset = checked_interior_offset(offset, size_of::<T>(), host_size, Argument::Field)?;
        Ok(Self::from_storage(Storage::object(NonNull::from(host), offset)))
    }

    /// View the element at `address`.
    ///
    /// # Safety
    /// `address` must be valid for reads of `T` for `'a` and not written
    /// during `'a`.
    pub unsafe fn from_raw(address: NonNull<T>) -> Self {
        log::trace!("pointer-backed element view at {:p}", address);
        Self::from_storage(Storage::pointer(address))
    }

    #[inline]
    pub fn get_ref(&self) -> &'a T {
        // SAFETY: every constructor establishes a valid, shared element.
        unsafe { &*self.storage.element::<T>(0) }
    }
}

impl<'a, T> View0D<'a, T, ReadWrite> {
    /// Read-write counterpart of [`View0D::from_object`].
    pub fn from_object_mut<H: ?Sized>(host: &'a mut H, field: impl FnOnce(&mut H) -> &mut T) -> Result<Self> {
        let base: *mut H = host;
        // SAFETY: `base` comes from a live exclusive borrow.
        let host_size = std::mem::size_of_val(unsafe { &*base });
        let offset = byte_offset(base, field(unsafe { &mut *base }) as *mut T);
        let offset = checked_interior_offset(offset, size_of::<T>(), host_size, Argument::Field)?;
        // SAFETY: derived from a reference.
        let base = unsafe { NonNull::new_unchecked(base) };
        Ok(Self::from_storage(Storage::object(base, offset)))
    }

    /// View the element at `address` for reading and writing.
    ///
    /// # Safety
    /// `address` must be valid for reads and writes of `T` for `'a` and
    /// accessed only through views derived from this one during `'a`.
    pub unsafe fn from_raw_mut(address: NonNull<T>) -> Self {
        log::trace!("pointer-backed element view at {:p}", address);
        Self::from_storage(Storage::pointer(address))
    }

    /// Store `value`, dropping the previous value.
    #[inline]
    pub fn set(&self, value: T) {
        drop(self.replace(value));
    }

    /// Store `value` and return the previous value.
    #[inline]
    pub fn replace(&self, value: T) -> T {
        // SAFETY: every constructor establishes a valid, writable element.
        unsafe { std::ptr::replace(self.storage.element::<T>(0), value) }
    }

    #[inline]
    pub fn cell(&self) -> &'a Cell<T> {
        // SAFETY: `Cell<T>` has the layout of `T`.
        unsafe { &*self.storage.element::<Cell<T>>(0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ViewError;

    #[test]
    fn test_element_of_array() {
        let data = [17, 18, 19, 20];
        let e = View0D::new(&data, 2).unwrap();
        assert_eq!(e.get(), 19);
        assert_eq!(*e.get_ref(), 19);
        assert_eq!(e.backing(), BackingKind::Array);
        assert_eq!(e.as_ptr(), &data[2] as *const i32);

        assert!(matches!(
            View0D::new(&data, 4),
            Err(ViewError::OutOfRange {
                argument: Argument::Index,
                value: 4,
                bound: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_copies_alias() {
        let mut data = vec![1u8, 2, 3];
        {
            let e = View0D::new(&mut data, 0).unwrap();
            let copy = e;
            copy.set(9);
            assert_eq!(e.get(), 9);
            assert_eq!(e.replace(10), 9);
            e.cell().set(11);
            assert!(e.ptr_eq(&copy));
        }
        assert_eq!(data, [11, 2, 3]);
    }

    #[test]
    fn test_object_field() {
        struct Point {
            x: f64,
            y: f64,
        }
        let mut p = Point { x: 1.0, y: 2.0 };
        {
            let y = View0D::from_object_mut(&mut p, |p| &mut p.y).unwrap();
            assert_eq!(y.backing(), BackingKind::Object);
            y.set(y.get() * 10.0);
        }
        assert_eq!(p.y, 20.0);
        assert_eq!(View0D::from_object(&p, |p| &p.x).unwrap().get(), 1.0);

        static ELSEWHERE: f64 = 0.0;
        let err = View0D::from_object(&p, |_| &ELSEWHERE).unwrap_err();
        assert!(matches!(
            err,
            ViewError::OutOfRange {
                argument: Argument::Field,
                ..
            }
        ));
    }

    #[test]
    fn test_raw_address() {
        let mut value = 5i64;
        // SAFETY: `value` outlives the view and is only accessed through it.
        let e = unsafe { View0D::from_raw_mut(NonNull::from(&mut value)) };
        e.set(6);
        assert_eq!(e.backing(), BackingKind::Pointer);
        assert_eq!(value, 6);
    }

    #[test]
    fn test_drops_replaced_value() {
        use std::rc::Rc;
        let shared = Rc::new(());
        let mut slots = [Rc::clone(&shared)];
        let e = View0D::new(&mut slots, 0).unwrap();
        e.set(Rc::new(()));
        assert_eq!(Rc::strong_count(&shared), 1);
    }
}
