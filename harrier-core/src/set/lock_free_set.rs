use std::ptr;

use crate::fingerprint::Fingerprint;
use crate::guard::Guard;
use crate::set::tagged::{AtomicTaggedPtr, TaggedPtr};

type NodePtr<T> = *mut Node<T>;

//
// Concurrent set implementation based on Harris's paper 'A Pragmatic
// Implementation of Non-Blocking Linked-Lists'.
//
// =============================================================================
// CHAIN STRUCTURE & INVARIANTS
// =============================================================================
//
// Chain (sorted ascending by fingerprint key):
// ┌──────┐    ┌──────┐    ┌──────┐    ┌──────┐    ┌──────┐
// │ HEAD │───►│  10  │───►│  20  │───►│  30  │───►│ TAIL │──► null
// │(sent)│    │      │    │      │    │      │    │(sent)│
// └──────┘    └──────┘    └──────┘    └──────┘    └──────┘
//
// Marked pointer: the mark bit on node.next means the NODE OWNING THE CELL
// is logically deleted, not its successor.
//
// INVARIANTS:
// 1. Chain is always sorted by key (ascending); equal-key nodes
//    (fingerprint collisions with distinct payloads) sit adjacent
// 2. At most one unmarked node per (key, payload) pair
// 3. HEAD and TAIL sentinels are never marked and never unlinked
// 4. A marked node is excluded from membership even while still linked
//
// =============================================================================
// DELETE (Two-Phase)
// =============================================================================
//
// Phase 1: LOGICAL DELETE - mark curr.next. This is the linearization
//          point; the item is gone the instant the mark CAS succeeds.
// Phase 2: PHYSICAL UNLINK - CAS pred.next from curr to curr's successor.
//          Best-effort: if it fails, a later locate() through this region
//          performs the unlink instead.
//
// Before:  pred ──────► curr ──────► succ
//
// Mark:    pred ──────► curr ──╳───► succ
//
// Unlink:  pred ─────────────────────► succ
//                       curr ──╳───► succ   (unreachable, deferred)
//
// Reclamation: exactly one CAS can move a marked node out of the chain
// (delete's own unlink attempt or a later locate's snip - both CAS the
// same pred.next cell from the same unmarked value). The thread whose CAS
// succeeds hands the node to the guard, so every node is deferred at most
// once. A marked node still linked when the set drops was never deferred
// and is freed by Drop.
//

struct Node<T> {
    key: u32,
    item: Option<T>,
    next: AtomicTaggedPtr<Node<T>>,
}

impl<T> Node<T> {
    fn new(key: u32, item: T) -> Self {
        Node {
            key,
            item: Some(item),
            next: AtomicTaggedPtr::new(ptr::null_mut()),
        }
    }

    fn sentinel(key: u32, next: NodePtr<T>) -> Self {
        Node {
            key,
            item: None,
            next: AtomicTaggedPtr::new(next),
        }
    }

    fn is_sentinel(&self) -> bool {
        self.item.is_none()
    }

    /// Key AND payload match. Sentinels carry no payload and never match,
    /// so items whose fingerprints collide with the sentinel keys behave
    /// normally.
    fn matches(&self, key: u32, item: &T) -> bool
    where
        T: Eq,
    {
        self.key == key && self.item.as_ref().is_some_and(|own| own == item)
    }

    /// Deallocate this node.
    ///
    /// # Safety
    /// - `ptr` must have been allocated with `Box::new`
    /// - must only be called once, and the node must not be accessed after
    unsafe fn dealloc_ptr(ptr: NodePtr<T>) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

/// A lock-free concurrent set.
///
/// Items are ordered and identified by their [`Fingerprint`]; distinct
/// items sharing a fingerprint are kept as distinct elements (payloads are
/// compared on a key match). `G` selects the memory reclamation strategy:
///
/// ```text
/// LockFreeSet<String, EpochGuard>      - production (harrier-crossbeam)
/// LockFreeSet<String, DeferredGuard>   - testing
/// ```
///
/// `insert`, `contains` and `delete` never block; contention is resolved
/// by retrying the traversal, giving the lock-free (not wait-free)
/// progress guarantee.
pub struct LockFreeSet<T, G: Guard> {
    /// Head sentinel; immutable after construction.
    head: NodePtr<T>,
    /// Shared guard instance. Unlinked nodes are deferred to this guard.
    guard: G,
}

// The raw head pointer suppresses the auto traits. Payloads are created,
// compared and dropped on arbitrary threads, hence the T bounds.
unsafe impl<T: Send, G: Guard> Send for LockFreeSet<T, G> {}
unsafe impl<T: Send + Sync, G: Guard> Sync for LockFreeSet<T, G> {}

impl<T, G> LockFreeSet<T, G>
where
    T: Fingerprint + Eq,
    G: Guard,
{
    /// Create an empty set: a head sentinel chained to a tail sentinel.
    pub fn new() -> Self {
        let tail = Box::into_raw(Box::new(Node::sentinel(u32::MAX, ptr::null_mut())));
        let head = Box::into_raw(Box::new(Node::sentinel(u32::MIN, tail)));
        LockFreeSet {
            head,
            guard: G::default(),
        }
    }

    /// Insert an item. Returns `false` if an equal item is already present.
    pub fn insert(&self, item: T) -> bool {
        let _read = G::pin();
        let key = item.fingerprint();
        let new_node = Box::into_raw(Box::new(Node::new(key, item)));

        loop {
            let item = unsafe { (*new_node).item.as_ref().unwrap_unchecked() };
            let (pred, curr) = self.locate(key, item);

            if unsafe { (*curr).matches(key, item) } {
                // Already present; clean up the unused node.
                unsafe { Node::dealloc_ptr(new_node) };
                return false;
            }

            // Initialize the unpublished node, then try to link it in.
            unsafe { (*new_node).next.store(TaggedPtr::new(curr)) };

            let link = unsafe {
                (*pred)
                    .next
                    .compare_exchange(TaggedPtr::new(curr), TaggedPtr::new(new_node))
            };
            if link.is_ok() {
                return true;
            }
            // CAS failed, full relocate
        }
    }

    /// Membership query. Read-only: performs no repair and no CAS, so it
    /// is safely concurrent with any number of mutators.
    pub fn contains(&self, item: &T) -> bool {
        let _read = G::pin();
        let key = item.fingerprint();

        let mut curr = unsafe { (*self.head).next.load() }.as_ptr();
        loop {
            let node = unsafe { &*curr };
            if node.is_sentinel() || node.key > key {
                return false;
            }
            if node.matches(key, item) {
                // One atomic read of the matching node's own cell: member
                // iff the mark is unset at this instant.
                return !node.next.load().is_marked();
            }
            curr = node.next.load().as_ptr();
        }
    }

    /// Remove an item. Returns `false` if no equal item is present.
    pub fn delete(&self, item: &T) -> bool {
        let _read = G::pin();
        let key = item.fingerprint();

        loop {
            let (pred, curr) = self.locate(key, item);

            if !unsafe { (*curr).matches(key, item) } {
                return false;
            }

            // Logical deletion: mark curr's own next cell. The mark only
            // applies if the successor is still the one we read; on a
            // concurrent change (or a competing delete's mark) retry from
            // locate.
            let succ = unsafe { (*curr).next.load() }.as_ptr();
            if !unsafe { (*curr).next.attempt_mark(succ) } {
                continue;
            }

            // Linearization point passed. Physical unlink is best-effort;
            // on failure a later locate() snips (and defers) the node
            // instead.
            let unlink = unsafe {
                (*pred)
                    .next
                    .compare_exchange(TaggedPtr::new(curr), TaggedPtr::new(succ))
            };
            if unlink.is_ok() {
                unsafe { self.guard.defer_destroy(curr, Node::dealloc_ptr) };
            }
            return true;
        }
    }

    // Core routine: find the adjacent (pred, curr) pair for a key, where
    // curr is the first node that is the tail sentinel, has a greater key,
    // or matches key AND payload. Logically deleted nodes encountered on
    // the way are physically unlinked; a failed repair CAS restarts the
    // whole traversal from the head sentinel (a partial resume could run
    // from an unlinked pred).
    fn locate(&self, key: u32, item: &T) -> (NodePtr<T>, NodePtr<T>) {
        'retry: loop {
            let mut pred = self.head;
            let mut curr = unsafe { (*pred).next.load() }.as_ptr();

            loop {
                let mut succ = unsafe { (*curr).next.load() };

                // curr is logically deleted: snip it out of the chain.
                while succ.is_marked() {
                    let snip = unsafe {
                        (*pred)
                            .next
                            .compare_exchange(TaggedPtr::new(curr), TaggedPtr::new(succ.as_ptr()))
                    };
                    if snip.is_err() {
                        continue 'retry;
                    }
                    // The winning snip owns reclamation of the node.
                    unsafe { self.guard.defer_destroy(curr, Node::dealloc_ptr) };
                    curr = succ.as_ptr();
                    succ = unsafe { (*curr).next.load() };
                }

                let node = unsafe { &*curr };
                if node.is_sentinel() || node.key > key || node.matches(key, item) {
                    return (pred, curr);
                }

                pred = curr;
                curr = succ.as_ptr();
            }
        }
    }

    /// Chain walk for test assertions: keys of unmarked, non-sentinel
    /// nodes in chain order.
    #[cfg(test)]
    fn audit_keys(&self) -> Vec<u32> {
        let mut keys = Vec::new();
        let mut curr = unsafe { (*self.head).next.load() }.as_ptr();
        loop {
            let node = unsafe { &*curr };
            if node.is_sentinel() {
                return keys;
            }
            let next = node.next.load();
            if !next.is_marked() {
                keys.push(node.key);
            }
            curr = next.as_ptr();
        }
    }
}

impl<T, G> Default for LockFreeSet<T, G>
where
    T: Fingerprint + Eq,
    G: Guard,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, G: Guard> Drop for LockFreeSet<T, G> {
    fn drop(&mut self) {
        // Free every node still physically linked, sentinels and marked
        // nodes included. A marked node that is still linked was never
        // deferred (only a successful unlink CAS defers), so this is its
        // sole free. Unlinked nodes belong to the guard.
        let mut curr = self.head;
        while !curr.is_null() {
            let next = unsafe { (*curr).next.load() }.as_ptr();
            unsafe { Node::dealloc_ptr(curr) };
            curr = next;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
// Concurrency stress tests live in tests/set_stress_tests.rs.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::DeferredGuard;

    type TestSet<T> = LockFreeSet<T, DeferredGuard>;

    #[test]
    fn test_sequential_scenario() {
        let set: TestSet<&str> = LockFreeSet::new();

        assert!(set.insert("a"));
        assert!(set.insert("b"));
        assert!(!set.insert("a"));
        assert!(set.contains(&"a"));
        assert!(set.delete(&"a"));
        assert!(!set.contains(&"a"));
        assert!(!set.delete(&"a"));
        assert!(set.contains(&"b"));
    }

    #[test]
    fn test_empty_set() {
        let set: TestSet<&str> = LockFreeSet::new();

        assert!(!set.contains(&"anything"));
        assert!(!set.delete(&"anything"));
        assert!(set.audit_keys().is_empty());
    }

    #[test]
    fn test_duplicate_insert_leaves_set_unchanged() {
        let set: TestSet<u32> = LockFreeSet::new();

        assert!(set.insert(5));
        assert!(set.insert(10));
        let before = set.audit_keys();

        assert!(!set.insert(5));
        assert!(!set.insert(10));
        assert_eq!(set.audit_keys(), before);
    }

    #[test]
    fn test_delete_absent_leaves_set_unchanged() {
        let set: TestSet<u32> = LockFreeSet::new();

        set.insert(1);
        set.insert(2);
        let before = set.audit_keys();

        assert!(!set.delete(&3));
        assert_eq!(set.audit_keys(), before);
    }

    #[test]
    fn test_delete_then_reinsert() {
        let set: TestSet<String> = LockFreeSet::new();

        assert!(set.insert("item".to_string()));
        assert!(set.delete(&"item".to_string()));
        // No tombstone may block reuse of the key.
        assert!(set.insert("item".to_string()));
        assert!(set.contains(&"item".to_string()));
    }

    #[test]
    fn test_chain_stays_sorted_without_duplicates() {
        let set: TestSet<u32> = LockFreeSet::new();

        // Scrambled insertion order.
        for i in 0..500u32 {
            set.insert(i.wrapping_mul(7919) % 500);
        }

        let keys = set.audit_keys();
        for window in keys.windows(2) {
            assert!(window[0] < window[1], "chain not sorted or has duplicates");
        }
    }

    #[test]
    fn test_sentinel_boundary_keys() {
        // The u32 fingerprint is the identity, so these land exactly on
        // the sentinel keys. Sentinels carry no payload and must never be
        // matched or deleted in their place.
        let set: TestSet<u32> = LockFreeSet::new();

        assert!(!set.contains(&0));
        assert!(!set.delete(&0));
        assert!(!set.contains(&u32::MAX));
        assert!(!set.delete(&u32::MAX));

        assert!(set.insert(0));
        assert!(set.insert(u32::MAX));
        assert!(set.contains(&0));
        assert!(set.contains(&u32::MAX));

        assert!(set.delete(&0));
        assert!(set.delete(&u32::MAX));
        assert!(!set.contains(&0));
        assert!(!set.contains(&u32::MAX));
    }

    // Distinct payloads deliberately sharing one fingerprint.
    #[derive(PartialEq, Eq, Debug)]
    struct Colliding(&'static str);

    impl Fingerprint for Colliding {
        fn fingerprint(&self) -> u32 {
            7
        }
    }

    #[test]
    fn test_fingerprint_collision_keeps_distinct_items() {
        let set: TestSet<Colliding> = LockFreeSet::new();

        assert!(set.insert(Colliding("left")));
        assert!(set.insert(Colliding("right")));

        // Both are members; a collision is not aliasing.
        assert!(set.contains(&Colliding("left")));
        assert!(set.contains(&Colliding("right")));
        assert!(!set.insert(Colliding("left")));

        // Deleting one must not take the other with it.
        assert!(set.delete(&Colliding("left")));
        assert!(!set.contains(&Colliding("left")));
        assert!(set.contains(&Colliding("right")));
        assert!(!set.delete(&Colliding("left")));
        assert!(set.delete(&Colliding("right")));
    }

    #[test]
    fn test_mixed_operation_sequence() {
        let set: TestSet<u64> = LockFreeSet::new();

        for i in 0..100u64 {
            assert!(set.insert(i));
        }
        for i in (0..100u64).step_by(2) {
            assert!(set.delete(&i));
        }
        for i in 0..100u64 {
            assert_eq!(set.contains(&i), i % 2 == 1, "wrong membership for {}", i);
        }
        for i in (0..100u64).step_by(2) {
            assert!(set.insert(i), "re-insert of {} must succeed", i);
        }
        for i in 0..100u64 {
            assert!(set.contains(&i));
        }
    }
}
