//! Type-level access modes.
//!
//! A view's access mode is a zero-sized marker carried in its type, so reads
//! and writes are resolved at compile time without runtime dispatch:
//! - [`ReadOnly`]: built from shared borrows; hands out `&'a T`
//! - [`ReadWrite`]: built from exclusive borrows; aliasing copies write through
//!   `&self` with `Cell` semantics
//!
//! The trait is sealed: the soundness of the `Send`/`Sync` and `Cell`
//! reasoning in the view types depends on there being exactly these two modes.

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::ReadOnly {}
    impl Sealed for super::ReadWrite {}
}

/// Access mode of a view.
pub trait Access: sealed::Sealed + Copy + Default + std::fmt::Debug + 'static {
    /// Whether views in this mode may write to their storage.
    const WRITABLE: bool;
}

/// Shared, read-only access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOnly;

/// Exclusive-borrow, read-write access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadWrite;

impl Access for ReadOnly {
    const WRITABLE: bool = false;
}

impl Access for ReadWrite {
    const WRITABLE: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writable<A: Access>() -> bool {
        A::WRITABLE
    }

    #[test]
    fn test_modes() {
        assert!(!writable::<ReadOnly>());
        assert!(writable::<ReadWrite>());
        assert_eq!(ReadOnly::default(), ReadOnly);
    }
}
