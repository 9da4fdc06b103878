/*!
Integer handles tagged with a marker type.

Addresses and register indexes are all plain integers at runtime, but mixing
them up is always a bug. [`TypedInt`] wraps an integer together with a
zero-sized marker, so that an [`InstructionAddress`] can't be passed where an
[`ElementRegister`] is expected, even if both are just numbers.
*/

use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Kind of value stored in the payload of an instruction's operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    /// Absolute index within the instruction list.
    Address,
    /// Number of input elements.
    Distance,
    /// Index within the element register bank.
    Element,
    /// Index within the string register bank.
    String,
    /// Index within the predicate register bank.
    Predicate,
    /// Index within the consume function register bank.
    ConsumeFunction,
    /// Index within the position register bank.
    Position,
    /// Index within the capture register bank.
    Capture,
}

/// Implemented by every marker type used with [`TypedInt`].
pub trait Marker {
    /// Prefix used when the handle is displayed in a disassembly.
    const PREFIX: &'static str;
}

/// Implemented by the markers of handles that can be stored in the payload
/// of an [`crate::engine::Operand`].
pub trait PayloadMarker: Marker {
    /// The kind of payload represented by this marker.
    const KIND: PayloadKind;
}

/// An integer parameterized by a marker type.
pub struct TypedInt<M> {
    bits: u64,
    _marker: PhantomData<fn() -> M>,
}

impl<M> TypedInt<M> {
    /// Creates a new handle from an index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self { bits: index as u64, _marker: PhantomData }
    }

    /// Creates a new handle from its raw bits.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits, _marker: PhantomData }
    }

    /// Returns the raw bits of this handle.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.bits
    }

    /// Returns the handle as an index that can be used with slices.
    #[inline]
    pub const fn index(self) -> usize {
        self.bits as usize
    }

    /// Returns the handle that follows this one.
    #[inline]
    pub(crate) fn next(self) -> Self {
        Self::from_bits(self.bits + 1)
    }
}

impl<M> Clone for TypedInt<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for TypedInt<M> {}

impl<M> PartialEq for TypedInt<M> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<M> Eq for TypedInt<M> {}

impl<M> PartialOrd for TypedInt<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for TypedInt<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bits.cmp(&other.bits)
    }
}

impl<M> Hash for TypedInt<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state)
    }
}

impl<M: Marker> Debug for TypedInt<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", M::PREFIX, self.bits)
    }
}

impl<M: Marker> Display for TypedInt<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", M::PREFIX, self.bits)
    }
}

/// Marker types for [`TypedInt`].
pub mod marker {
    use super::{Marker, PayloadKind, PayloadMarker};

    macro_rules! markers {
        ($(
            $(#[$doc:meta])*
            $name:ident => $prefix:literal $(, $kind:ident)?;
        )*) => {
            $(
                $(#[$doc])*
                #[derive(Debug)]
                pub enum $name {}

                impl Marker for $name {
                    const PREFIX: &'static str = $prefix;
                }

                $(
                    impl PayloadMarker for $name {
                        const KIND: PayloadKind = PayloadKind::$kind;
                    }
                )?
            )*
        };
    }

    markers! {
        /// Marker for [`super::InstructionAddress`].
        InstructionAddress => "@", Address;
        /// Marker for [`super::AddressToken`].
        AddressToken => "#";
        /// Marker for [`super::Distance`].
        Distance => "", Distance;
        /// Marker for [`super::BoolRegister`].
        BoolRegister => "%b";
        /// Marker for [`super::ElementRegister`].
        ElementRegister => "%e", Element;
        /// Marker for [`super::StringRegister`].
        StringRegister => "%s", String;
        /// Marker for [`super::PredicateRegister`].
        PredicateRegister => "%p", Predicate;
        /// Marker for [`super::ConsumeFunctionRegister`].
        ConsumeFunctionRegister => "%f", ConsumeFunction;
        /// Marker for [`super::PositionRegister`].
        PositionRegister => "%r", Position;
        /// Marker for [`super::CaptureRegister`].
        CaptureRegister => "%c", Capture;
    }
}

/// Absolute index of an instruction within a program.
pub type InstructionAddress = TypedInt<marker::InstructionAddress>;

/// Placeholder for an instruction address that is not known yet.
pub type AddressToken = TypedInt<marker::AddressToken>;

/// Number of input elements to advance.
pub type Distance = TypedInt<marker::Distance>;

/// Register holding a boolean condition.
pub type BoolRegister = TypedInt<marker::BoolRegister>;

/// Register holding an element to compare against.
pub type ElementRegister = TypedInt<marker::ElementRegister>;

/// Register holding a string, used for comments and diagnostics.
pub type StringRegister = TypedInt<marker::StringRegister>;

/// Register holding a predicate over a single element.
pub type PredicateRegister = TypedInt<marker::PredicateRegister>;

/// Register holding a custom consume function.
pub type ConsumeFunctionRegister = TypedInt<marker::ConsumeFunctionRegister>;

/// Register holding a position in the input.
pub type PositionRegister = TypedInt<marker::PositionRegister>;

/// Register holding the bounds of a capture group.
pub type CaptureRegister = TypedInt<marker::CaptureRegister>;
