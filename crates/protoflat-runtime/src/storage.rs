//! Raw arena storage for messages, arrays and maps.
//!
//! A message is a single zeroed arena block:
//!
//! ```text
//! [header: unknown-field block, cached size][body laid out by its Layout]
//! ```
//!
//! Unknown-field bytes live in an append-only arena block. Appending writes
//! past the current length or moves to a larger block; bytes already handed
//! out are never written again.
//!
//! Slots are read and written unaligned through raw pointers. No Rust
//! reference into a body outlives the call that created it, so several
//! handles may point at the same storage.
//!
//! The raw types here are only ever built from blocks allocated for the
//! layout they are used with; every accessor relies on that.

use std::ptr::{self, NonNull};

use indexmap::IndexMap;
use protoflat_core::{AllocError, Arena, FieldType, StorageClass};
use protoflat_schema::{FieldLayout, Layout, Presence};

use crate::value::MapKey;

#[repr(C)]
struct Header {
    unknown: *mut u8,
    unknown_len: usize,
    unknown_cap: usize,
    cached_size: u32,
}

/// Offset of the body inside a message block.
pub(crate) const HEADER_SIZE: usize = size_of::<Header>().next_multiple_of(BLOCK_ALIGN);
const BLOCK_ALIGN: usize = 8;

/// Pointer and length of arena-owned string or bytes data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub(crate) struct StrView {
    ptr: *const u8,
    len: usize,
}

impl StrView {
    pub(crate) const EMPTY: StrView = StrView {
        ptr: ptr::null(),
        len: 0,
    };

    pub(crate) fn copy_in(arena: &Arena, bytes: &[u8]) -> Result<Self, AllocError> {
        if bytes.is_empty() {
            return Ok(Self::EMPTY);
        }
        let ptr = arena.alloc_bytes(bytes)?;
        Ok(Self {
            ptr: ptr.as_ptr(),
            len: bytes.len(),
        })
    }

    pub(crate) fn len(self) -> usize {
        self.len
    }

    /// # Safety
    ///
    /// The arena owning the bytes must stay alive for `'a`.
    pub(crate) unsafe fn bytes<'a>(self) -> &'a [u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: non-empty views always come from `copy_in`; arena bytes are never written again.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

/// Contents of one field slot, array element or map value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Slot {
    /// Scalar bits: `bool` as 0/1, 32-bit values in the low word.
    Bits(u64),
    Str(StrView),
    /// Submessage block, null when absent.
    Message(*mut u8),
}

impl Slot {
    pub(crate) fn empty(field_type: FieldType) -> Slot {
        match field_type.storage() {
            StorageClass::Str => Slot::Str(StrView::EMPTY),
            StorageClass::Ptr => Slot::Message(ptr::null_mut()),
            _ => Slot::Bits(0),
        }
    }

    pub(crate) fn is_zero(self) -> bool {
        match self {
            Slot::Bits(bits) => bits == 0,
            Slot::Str(view) => view.len == 0,
            Slot::Message(ptr) => ptr.is_null(),
        }
    }

    pub(crate) fn bits(self) -> u64 {
        match self {
            Slot::Bits(bits) => bits,
            _ => 0,
        }
    }

    pub(crate) fn message(self) -> Option<RawMessage> {
        match self {
            Slot::Message(ptr) => RawMessage::from_ptr(ptr),
            _ => None,
        }
    }
}

/// # Safety
///
/// `at` must point at a slot sized for `field_type`.
unsafe fn load(at: *const u8, field_type: FieldType) -> Slot {
    // SAFETY: guaranteed by the caller.
    unsafe {
        match field_type.storage() {
            StorageClass::Byte => Slot::Bits(u64::from(at.read())),
            StorageClass::Word32 => Slot::Bits(u64::from(at.cast::<u32>().read_unaligned())),
            StorageClass::Word64 => Slot::Bits(at.cast::<u64>().read_unaligned()),
            StorageClass::Str => Slot::Str(at.cast::<StrView>().read_unaligned()),
            StorageClass::Ptr => Slot::Message(at.cast::<*mut u8>().read_unaligned()),
        }
    }
}

/// # Safety
///
/// `at` must point at a writable slot sized for `field_type`.
unsafe fn store(at: *mut u8, field_type: FieldType, slot: Slot) {
    // SAFETY: guaranteed by the caller.
    unsafe {
        match (field_type.storage(), slot) {
            (StorageClass::Byte, Slot::Bits(bits)) => at.write(u8::from(bits != 0)),
            (StorageClass::Word32, Slot::Bits(bits)) => {
                at.cast::<u32>().write_unaligned(bits as u32)
            }
            (StorageClass::Word64, Slot::Bits(bits)) => at.cast::<u64>().write_unaligned(bits),
            (StorageClass::Str, Slot::Str(view)) => at.cast::<StrView>().write_unaligned(view),
            (StorageClass::Ptr, Slot::Message(ptr)) => at.cast::<*mut u8>().write_unaligned(ptr),
            _ => debug_assert!(false, "slot does not match storage class of {field_type:?}"),
        }
    }
}

/// A message block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawMessage(NonNull<u8>);

impl RawMessage {
    pub(crate) fn alloc(arena: &Arena, layout: &Layout) -> Result<Self, AllocError> {
        let ptr = arena.allocate(HEADER_SIZE + layout.size() as usize, BLOCK_ALIGN)?;
        Ok(Self(ptr))
    }

    /// Empty block shared by reads of unset fields of type `layout`.
    ///
    /// The arena hands out the same block while it is still empty.
    pub(crate) fn shared_default(arena: &Arena, layout: &Layout) -> Result<Self, AllocError> {
        let key = ptr::from_ref(layout) as usize;
        let size = HEADER_SIZE + layout.size() as usize;
        let ptr = arena.reusable_block(key, size, BLOCK_ALIGN, |ptr| Self(ptr).is_empty(layout))?;
        Ok(Self(ptr))
    }

    /// Takes the block out of `shared_default` rotation once it is stored
    /// in a field.
    pub(crate) fn unshare(self, arena: &Arena, layout: &Layout) {
        let key = ptr::from_ref(layout) as usize;
        arena.retire_block(key, HEADER_SIZE + layout.size() as usize, BLOCK_ALIGN, self.0);
    }

    /// No unknown fields and an all-zero body.
    fn is_empty(self, layout: &Layout) -> bool {
        // SAFETY: the block was allocated for `layout`.
        unsafe {
            (*self.header()).unknown_len == 0
                && std::slice::from_raw_parts(self.body(), layout.size() as usize)
                    .iter()
                    .all(|&b| b == 0)
        }
    }

    pub(crate) fn from_ptr(ptr: *mut u8) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub(crate) fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    fn header(self) -> *mut Header {
        self.0.as_ptr().cast()
    }

    fn body(self) -> *mut u8 {
        // SAFETY: every block is at least HEADER_SIZE bytes.
        unsafe { self.0.as_ptr().add(HEADER_SIZE) }
    }

    fn at(self, offset: u32) -> *mut u8 {
        // SAFETY: layout offsets lie inside the body.
        unsafe { self.body().add(offset as usize) }
    }

    /// Value slot of a singular field.
    pub(crate) fn slot(self, field: &FieldLayout) -> Slot {
        // SAFETY: the slot at `field.offset` is sized for its storage class.
        unsafe { load(self.at(field.offset), field.field_type) }
    }

    pub(crate) fn set_slot(self, field: &FieldLayout, slot: Slot) {
        // SAFETY: as in `slot`.
        unsafe { store(self.at(field.offset), field.field_type, slot) }
    }

    /// Array or map pointer of a repeated or map field.
    pub(crate) fn container(self, field: &FieldLayout) -> *mut u8 {
        // SAFETY: repeated and map fields own a pointer-sized slot.
        unsafe { self.at(field.offset).cast::<*mut u8>().read_unaligned() }
    }

    pub(crate) fn set_container(self, field: &FieldLayout, ptr: *mut u8) {
        // SAFETY: as in `container`.
        unsafe { self.at(field.offset).cast::<*mut u8>().write_unaligned(ptr) }
    }

    fn has_bit(self, bit: u32) -> bool {
        // SAFETY: hasbit bytes lead the body.
        let byte = unsafe { self.body().add((bit / 8) as usize).read() };
        byte & (1 << (bit % 8)) != 0
    }

    fn set_bit(self, bit: u32, on: bool) {
        let at = self.at(bit / 8);
        let mask = 1u8 << (bit % 8);
        // SAFETY: hasbit bytes lead the body.
        unsafe {
            let byte = at.read();
            at.write(if on { byte | mask } else { byte & !mask });
        }
    }

    /// Field number of the member currently set in a oneof, 0 if none.
    pub(crate) fn oneof_case(self, case_offset: u32) -> u32 {
        // SAFETY: case words are 4-byte slots.
        unsafe { self.at(case_offset).cast::<u32>().read_unaligned() }
    }

    pub(crate) fn set_oneof_case(self, case_offset: u32, number: u32) {
        // SAFETY: as in `oneof_case`.
        unsafe { self.at(case_offset).cast::<u32>().write_unaligned(number) }
    }

    /// Explicit presence of a singular field. Always false for implicit presence.
    pub(crate) fn has(self, field: &FieldLayout) -> bool {
        match field.presence {
            Presence::Hasbit(bit) => self.has_bit(bit),
            Presence::Oneof { case_offset } => self.oneof_case(case_offset) == field.number,
            Presence::None => false,
        }
    }

    /// Whether a singular field would be serialized.
    pub(crate) fn is_set(self, field: &FieldLayout) -> bool {
        match field.presence {
            Presence::None => !self.slot(field).is_zero(),
            _ => self.has(field),
        }
    }

    pub(crate) fn mark_present(self, field: &FieldLayout) {
        match field.presence {
            Presence::Hasbit(bit) => self.set_bit(bit, true),
            Presence::Oneof { case_offset } => self.set_oneof_case(case_offset, field.number),
            Presence::None => {}
        }
    }

    /// Resets a singular field to its empty slot and clears its presence.
    pub(crate) fn clear_field(self, field: &FieldLayout) {
        match field.presence {
            Presence::Hasbit(bit) => self.set_bit(bit, false),
            Presence::Oneof { case_offset } => {
                if self.oneof_case(case_offset) != field.number {
                    return;
                }
                self.set_oneof_case(case_offset, 0);
            }
            Presence::None => {}
        }
        self.set_slot(field, Slot::empty(field.field_type));
    }

    /// Existing submessage of a singular message field, or a new one attached to it.
    pub(crate) fn mutable_child(
        self,
        arena: &Arena,
        field: &FieldLayout,
        layout: &Layout,
    ) -> Result<RawMessage, AllocError> {
        if self.has(field)
            && let Some(existing) = self.slot(field).message()
        {
            return Ok(existing);
        }
        let child = RawMessage::alloc(arena, layout)?;
        self.set_slot(field, Slot::Message(child.as_ptr()));
        self.mark_present(field);
        Ok(child)
    }

    pub(crate) fn array(self, field: &FieldLayout) -> Option<RawArray> {
        RawArray::from_ptr(self.container(field))
    }

    pub(crate) fn mutable_array(self, arena: &Arena, field: &FieldLayout) -> Result<RawArray, AllocError> {
        if let Some(array) = self.array(field) {
            return Ok(array);
        }
        let array = RawArray::alloc(arena)?;
        self.set_container(field, array.as_ptr());
        Ok(array)
    }

    pub(crate) fn map(self, field: &FieldLayout) -> Option<RawMap> {
        RawMap::from_ptr(self.container(field))
    }

    pub(crate) fn mutable_map(self, arena: &Arena, field: &FieldLayout) -> Result<RawMap, AllocError> {
        if let Some(map) = self.map(field) {
            return Ok(map);
        }
        let map = RawMap::alloc(arena)?;
        self.set_container(field, map.as_ptr());
        Ok(map)
    }

    pub(crate) fn cached_size(self) -> u32 {
        // SAFETY: header is always present.
        unsafe { (*self.header()).cached_size }
    }

    pub(crate) fn set_cached_size(self, size: u32) {
        // SAFETY: header is always present.
        unsafe { (*self.header()).cached_size = size }
    }

    /// Unknown-field records in wire order.
    ///
    /// # Safety
    ///
    /// The arena owning this message must stay alive for `'a`.
    pub(crate) unsafe fn unknown<'a>(self) -> &'a [u8] {
        // SAFETY: the first `unknown_len` bytes of the block are initialized
        // and no append or clear writes to them again.
        unsafe {
            let header = self.header();
            if (*header).unknown.is_null() {
                &[]
            } else {
                std::slice::from_raw_parts((*header).unknown, (*header).unknown_len)
            }
        }
    }

    /// Appends raw records. Grows by copying into a fresh block; the old
    /// block stays in the arena for any slice still reading it.
    pub(crate) fn append_unknown(self, arena: &Arena, bytes: &[u8]) -> Result<(), AllocError> {
        if bytes.is_empty() {
            return Ok(());
        }
        // SAFETY: the header holds null or a live arena block of `unknown_cap` bytes.
        unsafe {
            let header = self.header();
            let len = (*header).unknown_len;
            let needed = len.checked_add(bytes.len()).ok_or(AllocError {
                size: usize::MAX,
                align: 1,
            })?;
            if needed > (*header).unknown_cap {
                let cap = needed.max((*header).unknown_cap * 2).max(16);
                let block = arena.allocate(cap, 1)?.as_ptr();
                if len > 0 {
                    ptr::copy_nonoverlapping((*header).unknown, block, len);
                }
                (*header).unknown = block;
                (*header).unknown_cap = cap;
            }
            // `bytes` may be this message's own records; they lie below `len`.
            ptr::copy_nonoverlapping(bytes.as_ptr(), (*header).unknown.add(len), bytes.len());
            (*header).unknown_len = needed;
        }
        Ok(())
    }

    /// Detaches the unknown-field block. Later appends start a fresh one.
    pub(crate) fn clear_unknown(self) {
        // SAFETY: header is always present; the block itself stays in the arena.
        unsafe {
            let header = self.header();
            (*header).unknown = ptr::null_mut();
            (*header).unknown_len = 0;
            (*header).unknown_cap = 0;
        }
    }

    /// Zeroes every field and drops unknown fields.
    pub(crate) fn clear(self, layout: &Layout) {
        self.clear_unknown();
        // SAFETY: the body is exactly `layout.size()` bytes.
        unsafe { ptr::write_bytes(self.body(), 0, layout.size() as usize) }
    }

    /// Exchanges bodies and unknown fields of two blocks sharing a layout.
    pub(crate) fn swap(self, other: RawMessage, layout: &Layout) {
        if self == other {
            return;
        }
        // SAFETY: distinct blocks never overlap; both hold `layout.size()` bytes.
        unsafe {
            ptr::swap_nonoverlapping(self.body(), other.body(), layout.size() as usize);
            let (a, b) = (self.header(), other.header());
            ptr::swap(&raw mut (*a).unknown, &raw mut (*b).unknown);
            ptr::swap(&raw mut (*a).unknown_len, &raw mut (*b).unknown_len);
            ptr::swap(&raw mut (*a).unknown_cap, &raw mut (*b).unknown_cap);
        }
    }
}

#[repr(C)]
struct ArrayHeader {
    data: *mut u8,
    len: usize,
    cap: usize,
}

/// Growable element buffer of a repeated field.
///
/// Growing allocates a fresh block and copies; the old block stays in the
/// arena until release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawArray(NonNull<ArrayHeader>);

impl RawArray {
    pub(crate) fn alloc(arena: &Arena) -> Result<Self, AllocError> {
        let ptr = arena.allocate(size_of::<ArrayHeader>(), align_of::<ArrayHeader>())?;
        Ok(Self(ptr.cast()))
    }

    pub(crate) fn from_ptr(ptr: *mut u8) -> Option<Self> {
        NonNull::new(ptr.cast()).map(Self)
    }

    pub(crate) fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr().cast()
    }

    pub(crate) fn len(self) -> usize {
        // SAFETY: the header is live for the arena's lifetime.
        unsafe { (*self.0.as_ptr()).len }
    }

    fn element(self, index: usize, field_type: FieldType) -> *mut u8 {
        // SAFETY: callers check `index < cap`.
        unsafe { (*self.0.as_ptr()).data.add(index * field_type.storage().size()) }
    }

    /// Element at `index`; the caller checks bounds.
    pub(crate) fn get(self, index: usize, field_type: FieldType) -> Slot {
        debug_assert!(index < self.len());
        // SAFETY: in-bounds element.
        unsafe { load(self.element(index, field_type), field_type) }
    }

    pub(crate) fn set(self, index: usize, field_type: FieldType, slot: Slot) {
        debug_assert!(index < self.len());
        // SAFETY: in-bounds element.
        unsafe { store(self.element(index, field_type), field_type, slot) }
    }

    pub(crate) fn push(self, arena: &Arena, field_type: FieldType, slot: Slot) -> Result<(), AllocError> {
        let header = self.0.as_ptr();
        let class = field_type.storage();
        // SAFETY: header is live; the copy moves `len` initialized elements into a larger block.
        unsafe {
            if (*header).len == (*header).cap {
                let cap = ((*header).cap * 2).max(4);
                let bytes = cap.checked_mul(class.size()).ok_or(AllocError {
                    size: usize::MAX,
                    align: class.align(),
                })?;
                let data = arena.allocate(bytes, class.align())?.as_ptr();
                if (*header).len > 0 {
                    ptr::copy_nonoverlapping((*header).data, data, (*header).len * class.size());
                }
                (*header).data = data;
                (*header).cap = cap;
            }
            let index = (*header).len;
            (*header).len += 1;
            self.set(index, field_type, slot);
        }
        Ok(())
    }

    pub(crate) fn truncate(self, len: usize) {
        // SAFETY: header is live.
        unsafe {
            let header = self.0.as_ptr();
            (*header).len = (*header).len.min(len);
        }
    }
}

/// Entries of a map field. Keys are owned, values are slots like any field.
pub(crate) type MapStore = IndexMap<MapKey, Slot>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawMap(NonNull<MapStore>);

impl RawMap {
    pub(crate) fn alloc(arena: &Arena) -> Result<Self, AllocError> {
        arena.alloc_value(MapStore::new()).map(Self)
    }

    pub(crate) fn from_ptr(ptr: *mut u8) -> Option<Self> {
        NonNull::new(ptr.cast()).map(Self)
    }

    pub(crate) fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr().cast()
    }

    /// # Safety
    ///
    /// No other reference to the same map may be live while the returned one is.
    pub(crate) unsafe fn entries<'m>(self) -> &'m mut MapStore {
        // SAFETY: guaranteed by the caller.
        unsafe { &mut *self.0.as_ptr() }
    }

    pub(crate) fn len(self) -> usize {
        // SAFETY: short-lived shared access.
        unsafe { (*self.0.as_ptr()).len() }
    }
}
