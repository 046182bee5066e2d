//! Region allocator owning every message, string and array of one message tree.
//!
//! Each `Arena` wraps a `bumpalo::Bump` region. Arenas can be fused into a
//! group: the group keeps every member region alive until the last handle
//! into any member is dropped, so pointers from one arena into another stay
//! valid after fusion.
//!
//! Memory is never reallocated or freed individually. Growable structures
//! allocate a fresh block and copy.

use std::alloc::Layout;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use bumpalo::Bump;
use tracing::trace;

/// Allocation failed (out of memory or the configured limit was reached).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("arena allocation of {size} bytes (align {align}) failed")]
pub struct AllocError {
    pub size: usize,
    pub align: usize,
}

type Cleanup = Box<dyn FnOnce()>;

/// One bump region plus the cleanups registered against it.
struct Region {
    bump: Bump,
    cleanups: RefCell<Vec<Cleanup>>,
}

impl Drop for Region {
    fn drop(&mut self) {
        // LIFO relative to registration order.
        let cleanups = std::mem::take(self.cleanups.get_mut());
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }
}

/// Fusion group node (union-find). Only the root holds the member regions.
struct Group {
    parent: RefCell<Option<Rc<Group>>>,
    regions: RefCell<Vec<Rc<Region>>>,
}

impl Group {
    fn root(self: &Rc<Self>) -> Rc<Group> {
        let mut current = Rc::clone(self);
        loop {
            let next = match &*current.parent.borrow() {
                Some(parent) => Rc::clone(parent),
                None => break,
            };
            current = next;
        }
        current
    }
}

/// Bump allocator with fusable lifetime.
///
/// Single-writer: an `Arena` is neither `Send` nor `Sync`.
pub struct Arena {
    region: Rc<Region>,
    group: Rc<Group>,
    /// Blocks handed out by `reusable_block`, by (key, size, align).
    reusable: RefCell<HashMap<(usize, usize, usize), NonNull<u8>>>,
}

impl Arena {
    pub fn new() -> Self {
        Self::from_bump(Bump::new())
    }

    /// Arena whose first chunk holds at least `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_bump(Bump::with_capacity(capacity))
    }

    /// Arena that refuses to grow past `limit` bytes of chunk memory.
    pub fn with_limit(limit: usize) -> Self {
        let bump = Bump::new();
        bump.set_allocation_limit(Some(limit));
        Self::from_bump(bump)
    }

    fn from_bump(bump: Bump) -> Self {
        let region = Rc::new(Region {
            bump,
            cleanups: RefCell::new(Vec::new()),
        });
        let group = Rc::new(Group {
            parent: RefCell::new(None),
            regions: RefCell::new(vec![Rc::clone(&region)]),
        });
        Self {
            region,
            group,
            reusable: RefCell::new(HashMap::new()),
        }
    }

    /// Returns a zeroed block of at least `size` bytes aligned to `align`.
    ///
    /// `align` must be a power of two.
    pub fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        let err = AllocError { size, align };
        let layout = Layout::from_size_align(size, align).map_err(|_| err)?;
        let ptr = self.region.bump.try_alloc_layout(layout).map_err(|_| err)?;
        // SAFETY: `ptr` is valid for `size` writes, freshly allocated.
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    /// Copies `bytes` into the arena.
    pub fn alloc_bytes(&self, bytes: &[u8]) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.allocate(bytes.len(), 1)?;
        // SAFETY: destination was just allocated with `bytes.len()` capacity.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len()) };
        Ok(ptr)
    }

    /// Returns the block cached under `key` while `reuse` accepts it,
    /// otherwise a fresh zeroed block that replaces it in the cache.
    ///
    /// Blocks are cached per `(key, size, align)`, so a key never maps to a
    /// block of another shape. A replaced block stays allocated.
    pub fn reusable_block(
        &self,
        key: usize,
        size: usize,
        align: usize,
        reuse: impl FnOnce(NonNull<u8>) -> bool,
    ) -> Result<NonNull<u8>, AllocError> {
        let slot = (key, size, align);
        let cached = self.reusable.borrow().get(&slot).copied();
        if let Some(ptr) = cached
            && reuse(ptr)
        {
            return Ok(ptr);
        }
        let ptr = self.allocate(size, align)?;
        self.reusable.borrow_mut().insert(slot, ptr);
        Ok(ptr)
    }

    /// Stops handing out `ptr` from `reusable_block` under this shape.
    pub fn retire_block(&self, key: usize, size: usize, align: usize, ptr: NonNull<u8>) {
        let mut reusable = self.reusable.borrow_mut();
        if reusable.get(&(key, size, align)) == Some(&ptr) {
            reusable.remove(&(key, size, align));
        }
    }

    /// Moves `value` into the arena. If `T` needs dropping, a cleanup is
    /// registered that drops it in place when the region is released.
    pub fn alloc_value<T: 'static>(&self, value: T) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::new::<T>();
        let raw = self.allocate(layout.size(), layout.align())?;
        let ptr = raw.cast::<T>();
        // SAFETY: `ptr` is aligned and sized for `T`.
        unsafe { ptr.as_ptr().write(value) };
        if std::mem::needs_drop::<T>() {
            self.register_cleanup(move || {
                // SAFETY: the region backing `ptr` outlives its own cleanups.
                unsafe { std::ptr::drop_in_place(ptr.as_ptr()) }
            });
        }
        Ok(ptr)
    }

    /// Runs `cleanup` when this arena's region is released.
    ///
    /// Cleanups registered on the same arena run in reverse order.
    pub fn register_cleanup<F>(&self, cleanup: F)
    where
        F: FnOnce() + 'static,
    {
        self.region.cleanups.borrow_mut().push(Box::new(cleanup));
    }

    /// Joins the lifetimes of `self` and `other`. Idempotent.
    pub fn fuse(&self, other: &Arena) {
        let a = self.group.root();
        let b = other.group.root();
        if Rc::ptr_eq(&a, &b) {
            return;
        }
        let moved = std::mem::take(&mut *b.regions.borrow_mut());
        trace!(regions = moved.len(), "fusing arena groups");
        a.regions.borrow_mut().extend(moved);
        *b.parent.borrow_mut() = Some(a);
    }

    /// Whether both arenas belong to the same fusion group.
    pub fn is_fused(&self, other: &Arena) -> bool {
        Rc::ptr_eq(&self.group.root(), &other.group.root())
    }

    /// Bytes of chunk memory held by this arena's fusion group.
    pub fn space_allocated(&self) -> usize {
        self.group
            .root()
            .regions
            .borrow()
            .iter()
            .map(|region| region.bump.allocated_bytes())
            .sum()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("allocated", &self.region.bump.allocated_bytes())
            .finish_non_exhaustive()
    }
}
