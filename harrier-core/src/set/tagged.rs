// Tagged pointer: successor reference plus a one-bit deletion mark, packed
// into a single pointer-width word so both fields transition together
// atomically.
//
// Bit layout:
//   Bit 0: DELETE_MARK - the node owning this cell is logically deleted
//
// Node alignment keeps bit 0 of any real node address clear, so the bit is
// free to steal.

use std::sync::atomic::{AtomicPtr, Ordering};

const DELETE_MARK: usize = 0b01;

/// A (pointer, deletion-mark) pair as one immutable snapshot value.
pub(crate) struct TaggedPtr<T> {
    raw: *mut T,
}

impl<T> Copy for TaggedPtr<T> {}

impl<T> Clone for TaggedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> TaggedPtr<T> {
    /// Wrap a raw (possibly marked) word.
    #[inline]
    fn from_raw(raw: *mut T) -> Self {
        TaggedPtr { raw }
    }

    /// An unmarked pointer.
    #[inline]
    pub(crate) fn new(ptr: *mut T) -> Self {
        debug_assert_eq!(ptr as usize & DELETE_MARK, 0, "unaligned node pointer");
        TaggedPtr { raw: ptr }
    }

    /// The clean pointer without the mark bit (the one you dereference).
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        (self.raw as usize & !DELETE_MARK) as *mut T
    }

    /// The raw word with the mark bit intact (for CAS operations).
    #[inline]
    pub(crate) fn as_raw(&self) -> *mut T {
        self.raw
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        (self.raw as usize & DELETE_MARK) != 0
    }

    /// The same pointer with the mark bit set or cleared.
    #[inline]
    pub(crate) fn with_mark(&self, mark: bool) -> Self {
        let ptr_bits = self.as_ptr() as usize;
        let raw = if mark { ptr_bits | DELETE_MARK } else { ptr_bits };
        TaggedPtr { raw: raw as *mut T }
    }
}

/// An atomic cell holding a `TaggedPtr<T>`.
///
/// Every operation reads or replaces pointer and mark as one indivisible
/// unit; there is no way to update one field without observing the other.
pub(crate) struct AtomicTaggedPtr<T> {
    cell: AtomicPtr<T>,
}

impl<T> AtomicTaggedPtr<T> {
    #[inline]
    pub(crate) fn new(ptr: *mut T) -> Self {
        AtomicTaggedPtr {
            cell: AtomicPtr::new(TaggedPtr::new(ptr).as_raw()),
        }
    }

    /// Atomic snapshot of (pointer, mark). Acquire ordering.
    #[inline]
    pub(crate) fn load(&self) -> TaggedPtr<T> {
        TaggedPtr::from_raw(self.cell.load(Ordering::Acquire))
    }

    /// Plain store. Only legal on a node that is not yet published
    /// (insert initializes the new node's cell before the link CAS).
    #[inline]
    pub(crate) fn store(&self, value: TaggedPtr<T>) {
        self.cell.store(value.as_raw(), Ordering::Release)
    }

    /// Replace the pair only if the current value equals `expected` in both
    /// fields. No side effect on mismatch.
    #[inline]
    pub(crate) fn compare_exchange(
        &self,
        expected: TaggedPtr<T>,
        new: TaggedPtr<T>,
    ) -> Result<(), TaggedPtr<T>> {
        self.cell
            .compare_exchange(
                expected.as_raw(),
                new.as_raw(),
                Ordering::Release,
                Ordering::Relaxed,
            )
            .map(|_| ())
            .map_err(TaggedPtr::from_raw)
    }

    /// Set the mark bit, requiring the pointer component to still equal
    /// `expected`. Fails without side effect if the successor changed (or
    /// the mark is already set), so a deletion can never apply itself to
    /// the wrong successor.
    #[inline]
    pub(crate) fn attempt_mark(&self, expected: *mut T) -> bool {
        let clean = TaggedPtr::new(expected);
        self.compare_exchange(clean, clean.with_mark(true)).is_ok()
    }
}
