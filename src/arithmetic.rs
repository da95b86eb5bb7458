//! Interface to the external encrypted-arithmetic library.
//!
//! The ledger never sees plaintext. It holds the library's opaque handles and
//! may only ask for a fresh zero, add two handles, check that a handle is
//! well-formed, and serialize a handle into its fixed-size wire form. Nothing
//! here can inspect or compare what a handle encrypts.
use crate::error::Slot;
use serde::Serialize;
use std::fmt;

/// Size of a serialized ciphertext handle in bytes
pub const HANDLE_BYTES: usize = 32;

/// Additively homomorphic arithmetic over opaque ciphertext handles
pub trait EncryptedArithmetic {
    /// Opaque reference to an encrypted value
    type Handle: Clone + fmt::Debug;

    /// A handle encrypting zero
    fn zero(&self) -> Self::Handle;

    /// A handle encrypting the sum of what `lhs` and `rhs` encrypt
    fn add(&self, lhs: &Self::Handle, rhs: &Self::Handle) -> Self::Handle;

    /// Whether `handle` refers to a well-formed ciphertext
    fn is_initialized(&self, handle: &Self::Handle) -> bool;

    /// The fixed-size wire form of `handle`, as handed to the decryption oracle
    fn serialize(&self, handle: &Self::Handle) -> SerializedHandle;
}

/// Wire form of a ciphertext handle. It identifies a ciphertext; it says
/// nothing about the plaintext.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializedHandle([u8; HANDLE_BYTES]);

impl SerializedHandle {
    pub const fn new(bytes: [u8; HANDLE_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HANDLE_BYTES] {
        &self.0
    }
}

impl fmt::Debug for SerializedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializedHandle({})", hex::encode(self.0))
    }
}

/// One value per vote option, in the fixed order for / against / abstain.
/// A ballot is the three encrypted increments one provider submits; a batch
/// keeps its running totals in the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counters<T> {
    pub in_favor: T,
    pub against: T,
    pub abstain: T,
}

/// Three encrypted increments submitted by one provider
pub type Ballot<H> = Counters<H>;

impl<T> Counters<T> {
    pub fn new(in_favor: T, against: T, abstain: T) -> Self {
        return Self {
            in_favor,
            against,
            abstain,
        };
    }

    /// Pair each value with its slot, in order
    pub fn slots(&self) -> [(Slot, &T); 3] {
        [
            (Slot::For, &self.in_favor),
            (Slot::Against, &self.against),
            (Slot::Abstain, &self.abstain),
        ]
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Counters<U> {
        Counters {
            in_favor: f(&self.in_favor),
            against: f(&self.against),
            abstain: f(&self.abstain),
        }
    }

    /// Combine slot by slot with another set of counters
    pub fn zip_with<U, V>(
        &self,
        other: &Counters<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> Counters<V> {
        Counters {
            in_favor: f(&self.in_favor, &other.in_favor),
            against: f(&self.against, &other.against),
            abstain: f(&self.abstain, &other.abstain),
        }
    }

    pub fn into_array(self) -> [T; 3] {
        [self.in_favor, self.against, self.abstain]
    }
}

/// Serialize all three handles in slot order
pub fn serialize_counters<A: EncryptedArithmetic>(
    arithmetic: &A,
    counters: &Counters<A::Handle>,
) -> [SerializedHandle; 3] {
    counters
        .map(|handle| arithmetic.serialize(handle))
        .into_array()
}
