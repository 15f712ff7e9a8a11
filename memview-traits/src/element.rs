//! Element-type eligibility for caller-managed memory.
//!
//! A view over raw memory hands out values of `T` that were never written by
//! safe Rust code, and writes through it drop whatever it overwrites. That is
//! only acceptable for plain data: types with no embedded references, raw
//! pointers or owning heap handles. [`Element::REFERENCE_FREE`] records this
//! per type.
//!
//! # Key Design: the predicate is an associated const
//!
//! The predicate is computed once per element type by the compiler and folded
//! into every call site, so consulting it costs nothing at run time. Composite
//! types (`[T; N]`, tuples, `Option<T>`, `Complex<T>`) derive their answer from
//! their parts.

use num_complex::Complex;
use std::num::Wrapping;
use std::ptr::NonNull;
use std::rc::Rc;
use std::sync::Arc;

/// Element types that a view may address.
///
/// Plain-data types can be marked with [`reference_free!`](crate::reference_free):
/// ```ignore
/// #[derive(Clone, Copy)]
/// struct Rgb(u8, u8, u8);
/// memview_traits::reference_free!(Rgb);
/// ```
pub trait Element {
    /// `true` when the type holds no references, pointers or owning handles.
    const REFERENCE_FREE: bool;
}

/// Returns whether `T` may be stored in caller-managed memory.
#[inline(always)]
pub const fn is_reference_free<T: Element>() -> bool {
    T::REFERENCE_FREE
}

/// Implement [`Element`] with `REFERENCE_FREE = true` for plain-data types.
#[macro_export]
macro_rules! reference_free {
    ($($t:ty),* $(,)?) => {
        $(impl $crate::Element for $t {
            const REFERENCE_FREE: bool = true;
        })*
    };
}

reference_free!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char, ()
);

// Holders of addresses or heap allocations
macro_rules! impl_element_with_references {
    ($($t:ty),*) => {
        $(impl<T: ?Sized> Element for $t {
            const REFERENCE_FREE: bool = false;
        })*
    };
}

impl_element_with_references!(*const T, *mut T, NonNull<T>, Box<T>, Rc<T>, Arc<T>);

impl<T: ?Sized> Element for &T {
    const REFERENCE_FREE: bool = false;
}

impl<T: ?Sized> Element for &mut T {
    const REFERENCE_FREE: bool = false;
}

impl<T> Element for Vec<T> {
    const REFERENCE_FREE: bool = false;
}

impl Element for String {
    const REFERENCE_FREE: bool = false;
}

// Composites inherit from their parts
impl<T: Element> Element for Complex<T> {
    const REFERENCE_FREE: bool = T::REFERENCE_FREE;
}

impl<T: Element> Element for Wrapping<T> {
    const REFERENCE_FREE: bool = T::REFERENCE_FREE;
}

impl<T: Element> Element for Option<T> {
    const REFERENCE_FREE: bool = T::REFERENCE_FREE;
}

impl<T: Element, const N: usize> Element for [T; N] {
    const REFERENCE_FREE: bool = T::REFERENCE_FREE;
}

impl<A: Element> Element for (A,) {
    const REFERENCE_FREE: bool = A::REFERENCE_FREE;
}

impl<A: Element, B: Element> Element for (A, B) {
    const REFERENCE_FREE: bool = A::REFERENCE_FREE && B::REFERENCE_FREE;
}

impl<A: Element, B: Element, C: Element> Element for (A, B, C) {
    const REFERENCE_FREE: bool = A::REFERENCE_FREE && B::REFERENCE_FREE && C::REFERENCE_FREE;
}

impl<A: Element, B: Element, C: Element, D: Element> Element for (A, B, C, D) {
    const REFERENCE_FREE: bool =
        A::REFERENCE_FREE && B::REFERENCE_FREE && C::REFERENCE_FREE && D::REFERENCE_FREE;
}
