//! Strided multi-dimensional views over borrowed arrays, object interiors and
//! raw memory.
//!
//! A view is a small `Copy` descriptor: a storage origin, a shape and (for
//! rank two and above) byte strides. It never owns or copies the elements it
//! addresses.
//!
//! # Core Types
//!
//! - [`View0D`]: a single element
//! - [`View1D`]: a contiguous window of `len` elements
//! - [`ViewND`] ([`View2D`] .. [`View5D`]): a row-major strided grid of rank 2-5
//! - [`DenseArray`]: owned row-major host array
//!
//! # Storage Origins
//!
//! Every view addresses exactly one [`BackingKind`]:
//! - `Array`: a borrowed host array ([`HostArray`]: slices, `Vec`, fixed-size
//!   and nested arrays, [`DenseArray`]) plus a byte offset from its first element
//! - `Object`: a borrowed host value plus a byte offset to one of its fields
//! - `Pointer`: caller-managed memory, accepted only for element types that are
//!   [reference free](memview_traits::Element)
//!
//! # Access Modes
//!
//! Views built from shared borrows are [`ReadOnly`] and hand out `&'a T`.
//! Views built from exclusive borrows are [`ReadWrite`]: copies of one view may
//! alias and write through `&self`, the way `&'a [Cell<T>]` does, and element
//! references are handed out as `&'a Cell<T>`.
//!
//! # Checked and unchecked entry points
//!
//! Every constructor and accessor validates its arguments and reports a
//! [`ViewError`]. Entry points that skip validation are `unsafe fn`s with
//! distinct names (`*_unchecked`, `dangerous_*`, `from_raw*`); violating their
//! preconditions is undefined behaviour.
//!
//! # Example
//!
//! ```rust
//! use memview::{View1D, View2D};
//!
//! let mut data = [17, 18, 19, 20];
//! let view = View1D::with_range(&mut data, 1, 2).unwrap();
//! assert_eq!(view.get(0).unwrap(), 18);
//! view.set(1, 42).unwrap();
//! assert_eq!(data, [17, 18, 42, 20]);
//!
//! let grid = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
//! let view = View2D::new(&grid);
//! assert_eq!(view.strides(), &[24]);
//! assert_eq!(view.get([1, 2]).unwrap(), 6.0);
//! ```

pub mod access;
pub mod array;
pub mod auxiliary;
pub mod storage;
pub mod view;
pub mod view0d;
pub mod view1d;

// ============================================================================
// Element eligibility
// ============================================================================
pub use memview_traits::{is_reference_free, reference_free, Element};

// ============================================================================
// View-based types
// ============================================================================
pub use access::{Access, ReadOnly, ReadWrite};
pub use array::DenseArray;
pub use storage::{BackingKind, HostArray};
pub use view::{Dim, Rank, Strides, View2D, View3D, View4D, View5D, ViewND};
pub use view0d::View0D;
pub use view1d::{Iter, View1D};

// ============================================================================
// Error types
// ============================================================================

/// The argument whose range constraint a call violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Argument {
    /// Raw pointer handed to a pointer-backed constructor.
    Pointer,
    /// Interior field of a host object.
    Field,
    /// Element index.
    Index,
    /// Window start.
    Start,
    /// Window or buffer length.
    Length,
    /// Caller-supplied byte strides.
    Strides,
    /// Host array dimensions.
    Dims,
}

impl std::fmt::Display for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Argument::Pointer => "pointer",
            Argument::Field => "field",
            Argument::Index => "index",
            Argument::Start => "start",
            Argument::Length => "length",
            Argument::Strides => "strides",
            Argument::Dims => "dims",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while constructing or accessing a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// A required source was null.
    #[error("{argument} is null")]
    NullSource { argument: Argument },

    /// The requested element type does not fit the addressed storage.
    #[error("cannot view `{from}` storage as `{to}`: {reason}")]
    TypeMismatch {
        from: &'static str,
        to: &'static str,
        reason: &'static str,
    },

    /// An index, start or length lies outside its valid domain.
    #[error("{argument} {value} out of range for axis {axis} (bound {bound})")]
    OutOfRange {
        argument: Argument,
        axis: usize,
        value: usize,
        bound: usize,
    },

    /// A copy destination is shorter than its source.
    #[error("destination too short: need {source_len} elements, have {destination_len}")]
    DestinationTooShort {
        source_len: usize,
        destination_len: usize,
    },

    /// Integer overflow while computing strides or extents.
    #[error("byte offset overflow while computing strides")]
    Overflow,

    /// The element type holds references and cannot live in caller-managed memory.
    #[error("element type `{type_name}` contains references and cannot be viewed through a raw pointer")]
    NotReferenceFree { type_name: &'static str },

    /// The operation cannot be expressed for this backing kind.
    #[error("{operation} is not supported for {backing}-backed views")]
    Unsupported {
        operation: &'static str,
        backing: BackingKind,
    },
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;

// ============================================================================
// Failure reporting
// ============================================================================

/// Log a contract violation on its way back to the caller.
#[cold]
#[inline(never)]
pub(crate) fn report(err: ViewError) -> ViewError {
    log::debug!("view contract violation: {err}");
    err
}

#[cold]
#[inline(never)]
pub(crate) fn out_of_range(argument: Argument, axis: usize, value: usize, bound: usize) -> ViewError {
    report(ViewError::OutOfRange {
        argument,
        axis,
        value,
        bound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_argument() {
        let err = ViewError::OutOfRange {
            argument: Argument::Index,
            axis: 1,
            value: 4,
            bound: 4,
        };
        assert_eq!(err.to_string(), "index 4 out of range for axis 1 (bound 4)");

        let err = ViewError::NullSource {
            argument: Argument::Pointer,
        };
        assert_eq!(err.to_string(), "pointer is null");

        let err = ViewError::Unsupported {
            operation: "as_slice",
            backing: BackingKind::Object,
        };
        assert_eq!(err.to_string(), "as_slice is not supported for object-backed views");
    }

    #[test]
    fn test_report_passes_error_through() {
        let err = out_of_range(Argument::Start, 0, 5, 4);
        assert!(matches!(
            err,
            ViewError::OutOfRange {
                argument: Argument::Start,
                value: 5,
                bound: 4,
                ..
            }
        ));
    }
}
