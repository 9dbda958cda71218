//! The extension manager and its slot bookkeeping.

use std::fmt;
use std::rc::Rc;

/// Alignment unit for extension offsets, in bytes.
pub const WORD_SIZE: usize = 8;

/// Identifies one extension within a manager.
///
/// In a chained (extended-array) manager, handles below the inner
/// layout's extension count refer to inner slots.
pub type Handle = usize;

/// Round `size` up to the next word boundary.
pub fn align(size: usize) -> usize {
    size.div_ceil(WORD_SIZE) * WORD_SIZE
}

type CopyFn = Box<dyn Fn(&[u8], &mut [u8])>;

struct Slot {
    key: String,
    size: usize,
    aligned_size: usize,
    offset: usize,
    /// Dedicated buffer, array modes only.
    data: Option<Vec<u8>>,
    copy: Option<CopyFn>,
}

enum Mode {
    Struct,
    ExistingObject { shadow: Vec<u8> },
    Array { item_size: usize, count: usize },
    ExtendedArray { inner: Rc<ExtensionManager>, count: usize },
}

/// Manages a set of extensions and their layout. See the crate docs for
/// the four shapes.
pub struct ExtensionManager {
    name: String,
    mode: Mode,
    slots: Vec<Slot>,
    final_size: usize,
    locked_down: bool,
}

impl ExtensionManager {
    /// Layout authority for records allocated through
    /// [`allocate`](Self::allocate).
    pub fn of_struct(name: impl Into<String>) -> Self {
        Self::with_mode(name, Mode::Struct)
    }

    /// Shadow buffer alongside one existing object.
    pub fn of_existing_object(name: impl Into<String>) -> Self {
        Self::with_mode(
            name,
            Mode::ExistingObject {
                shadow: Vec::new(),
            },
        )
    }

    /// Dedicated per-extension buffers for `count` items of `item_size`
    /// bytes each.
    pub fn of_array(name: impl Into<String>, item_size: usize, count: usize) -> Self {
        Self::with_mode(name, Mode::Array { item_size, count })
    }

    /// Array chained onto `inner`: the inner struct layout's final size
    /// is the item stride, and handle lookups search it first.
    pub fn of_extended_array(
        name: impl Into<String>,
        inner: Rc<ExtensionManager>,
        count: usize,
    ) -> Self {
        Self::with_mode(name, Mode::ExtendedArray { inner, count })
    }

    fn with_mode(name: impl Into<String>, mode: Mode) -> Self {
        Self {
            name: name.into(),
            mode,
            slots: Vec::new(),
            final_size: 0,
            locked_down: false,
        }
    }

    /// Manager name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of extensions reachable through this manager, inner layout
    /// included.
    pub fn len(&self) -> usize {
        self.inner_count() + self.slots.len()
    }

    /// Whether no extensions are registered anywhere in the chain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of extensions registered on this manager itself.
    pub fn local_len(&self) -> usize {
        self.slots.len()
    }

    /// Aggregate aligned size of the local layout, in bytes. For a struct
    /// layout this is the record size; for an existing object it is the
    /// shadow buffer size.
    pub fn final_size(&self) -> usize {
        self.final_size
    }

    /// Item stride for array shapes.
    ///
    /// # Panics
    ///
    /// Panics on struct and existing-object managers, which have no
    /// items.
    pub fn item_size(&self) -> usize {
        match &self.mode {
            Mode::Array { item_size, .. } => *item_size,
            Mode::ExtendedArray { inner, .. } => inner.final_size(),
            _ => panic!("extension manager '{}' has no item stride", self.name),
        }
    }

    /// Freeze the layout. Later [`add_extension`](Self::add_extension)
    /// calls panic.
    pub fn lock_down(&mut self) {
        log::debug!("extension manager '{}' locked down", self.name);
        self.locked_down = true;
    }

    /// Whether the layout is frozen.
    pub fn is_locked_down(&self) -> bool {
        self.locked_down
    }

    // ── Registration ───────────────────────────────────────────────────────

    /// Register an extension of `size` bytes under `key`, returning its
    /// handle.
    ///
    /// The slot's offset is the current aligned layout size; the layout
    /// grows by the aligned size, so offsets are word-aligned and
    /// monotonically increasing.
    ///
    /// # Panics
    ///
    /// Panics if the manager is locked down.
    pub fn add_extension(&mut self, key: impl Into<String>, size: usize) -> Handle {
        let key = key.into();
        assert!(
            !self.locked_down,
            "extension manager '{}' is locked down; cannot add '{key}'",
            self.name
        );
        let aligned_size = align(size);
        let offset = self.final_size;
        self.final_size += aligned_size;

        let data = match &mut self.mode {
            Mode::Struct => None,
            Mode::ExistingObject { shadow } => {
                shadow.resize(shadow.len() + aligned_size, 0);
                None
            }
            Mode::Array { count, .. } => Some(vec![0; aligned_size * *count]),
            Mode::ExtendedArray { count, .. } => Some(vec![0; aligned_size * *count]),
        };
        self.slots.push(Slot {
            key,
            size,
            aligned_size,
            offset,
            data,
            copy: None,
        });
        self.inner_count() + self.slots.len() - 1
    }

    /// Install a data-copy callback for `handle`, used by
    /// [`copy_record`](Self::copy_record) instead of the default byte
    /// copy.
    pub fn set_copy_func(&mut self, handle: Handle, copy: impl Fn(&[u8], &mut [u8]) + 'static) {
        let slot = self.local_slot_mut(handle);
        slot.copy = Some(Box::new(copy));
    }

    // ── Lookup ─────────────────────────────────────────────────────────────

    /// Find the handle registered under `key`, searching the inner layout
    /// first in chained managers.
    pub fn get_handle(&self, key: &str) -> Option<Handle> {
        if let Mode::ExtendedArray { inner, .. } = &self.mode {
            if let Some(handle) = inner.get_handle(key) {
                return Some(handle);
            }
        }
        self.slots
            .iter()
            .position(|s| s.key == key)
            .map(|index| index + self.inner_count())
    }

    /// The key `handle` was registered under.
    pub fn key_of(&self, handle: Handle) -> &str {
        match self.delegate(handle) {
            Ok((inner, handle)) => inner.key_of(handle),
            Err(local) => &self.slots[local].key,
        }
    }

    /// Byte offset of `handle` within a record or shadow buffer.
    pub fn offset_of(&self, handle: Handle) -> usize {
        match self.delegate(handle) {
            Ok((inner, handle)) => inner.offset_of(handle),
            Err(local) => self.slots[local].offset,
        }
    }

    /// Requested (unaligned) size of `handle` in bytes.
    pub fn size_of(&self, handle: Handle) -> usize {
        match self.delegate(handle) {
            Ok((inner, handle)) => inner.size_of(handle),
            Err(local) => self.slots[local].size,
        }
    }

    // ── Struct-layout access ───────────────────────────────────────────────

    /// Allocate `count` zero-filled records of the current layout.
    pub fn allocate(&self, count: usize) -> Vec<u8> {
        vec![0; self.final_size * count]
    }

    /// Record number `index` within a buffer from
    /// [`allocate`](Self::allocate).
    pub fn record<'a>(&self, buffer: &'a [u8], index: usize) -> &'a [u8] {
        &buffer[index * self.final_size..(index + 1) * self.final_size]
    }

    /// Mutable record number `index`.
    pub fn record_mut<'a>(&self, buffer: &'a mut [u8], index: usize) -> &'a mut [u8] {
        &mut buffer[index * self.final_size..(index + 1) * self.final_size]
    }

    /// The bytes of `handle`'s slot within one record.
    pub fn slice<'a>(&self, record: &'a [u8], handle: Handle) -> &'a [u8] {
        let (offset, size) = (self.offset_of(handle), self.size_of(handle));
        &record[offset..offset + size]
    }

    /// Mutable bytes of `handle`'s slot within one record.
    pub fn slice_mut<'a>(&self, record: &'a mut [u8], handle: Handle) -> &'a mut [u8] {
        let (offset, size) = (self.offset_of(handle), self.size_of(handle));
        &mut record[offset..offset + size]
    }

    /// Copy a record slot by slot, honouring any installed copy
    /// callbacks; slots without one get a raw byte copy.
    pub fn copy_record(&self, src: &[u8], dst: &mut [u8]) {
        for slot in &self.slots {
            let range = slot.offset..slot.offset + slot.size;
            let (src_part, dst_part) = (&src[range.clone()], &mut dst[range]);
            match &slot.copy {
                Some(copy) => copy(src_part, dst_part),
                None => dst_part.copy_from_slice(src_part),
            }
        }
    }

    // ── Existing-object access ─────────────────────────────────────────────

    /// The bytes of `handle`'s slot in the shadow buffer.
    ///
    /// # Panics
    ///
    /// Panics unless this is an existing-object manager.
    pub fn get(&self, handle: Handle) -> &[u8] {
        let Mode::ExistingObject { shadow } = &self.mode else {
            panic!("extension manager '{}' has no shadow buffer", self.name);
        };
        let slot = &self.slots[handle];
        &shadow[slot.offset..slot.offset + slot.size]
    }

    /// Mutable bytes of `handle`'s slot in the shadow buffer.
    ///
    /// # Panics
    ///
    /// Panics unless this is an existing-object manager.
    pub fn get_mut(&mut self, handle: Handle) -> &mut [u8] {
        let Mode::ExistingObject { shadow } = &mut self.mode else {
            panic!("extension manager '{}' has no shadow buffer", self.name);
        };
        let slot = &self.slots[handle];
        &mut shadow[slot.offset..slot.offset + slot.size]
    }

    // ── Array access ───────────────────────────────────────────────────────

    /// The bytes of item `index`'s slot in a locally registered array
    /// extension.
    ///
    /// In a chained manager `handle` must refer to a local slot; inner
    /// handles describe layout within the items themselves and are read
    /// through [`offset_of`](Self::offset_of).
    pub fn array_slice(&self, handle: Handle, index: usize) -> &[u8] {
        let (slot, data) = self.array_slot(handle);
        &data[index * slot.aligned_size..index * slot.aligned_size + slot.size]
    }

    /// Mutable bytes of item `index`'s slot in a locally registered array
    /// extension.
    pub fn array_slice_mut(&mut self, handle: Handle, index: usize) -> &mut [u8] {
        let inner_count = self.inner_count();
        let local = handle
            .checked_sub(inner_count)
            .unwrap_or_else(|| self.no_local_buffer(handle));
        let slot = &mut self.slots[local];
        let (aligned, size) = (slot.aligned_size, slot.size);
        let data = slot
            .data
            .as_mut()
            .unwrap_or_else(|| panic!("extension handle {handle} has no array buffer"));
        &mut data[index * aligned..index * aligned + size]
    }

    fn array_slot(&self, handle: Handle) -> (&Slot, &[u8]) {
        let local = handle
            .checked_sub(self.inner_count())
            .unwrap_or_else(|| self.no_local_buffer(handle));
        let slot = &self.slots[local];
        let data = slot
            .data
            .as_deref()
            .unwrap_or_else(|| panic!("extension handle {handle} has no array buffer"));
        (slot, data)
    }

    fn no_local_buffer(&self, handle: Handle) -> ! {
        panic!(
            "handle {handle} belongs to the inner layout of extension manager '{}'",
            self.name
        )
    }

    // ── Internals ──────────────────────────────────────────────────────────

    fn inner_count(&self) -> usize {
        match &self.mode {
            Mode::ExtendedArray { inner, .. } => inner.len(),
            _ => 0,
        }
    }

    /// Resolve a handle to the inner manager or a local slot index.
    fn delegate(&self, handle: Handle) -> Result<(&ExtensionManager, Handle), usize> {
        match &self.mode {
            Mode::ExtendedArray { inner, .. } if handle < inner.len() => Ok((inner, handle)),
            _ => Err(handle - self.inner_count()),
        }
    }

    fn local_slot_mut(&mut self, handle: Handle) -> &mut Slot {
        let local = handle
            .checked_sub(self.inner_count())
            .unwrap_or_else(|| self.no_local_buffer(handle));
        &mut self.slots[local]
    }
}

impl fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &self.mode {
            Mode::Struct => "struct",
            Mode::ExistingObject { .. } => "existing-object",
            Mode::Array { .. } => "array",
            Mode::ExtendedArray { .. } => "extended-array",
        };
        f.debug_struct("ExtensionManager")
            .field("name", &self.name)
            .field("mode", &mode)
            .field("extensions", &self.slots.iter().map(|s| &s.key).collect::<Vec<_>>())
            .field("final_size", &self.final_size)
            .field("locked_down", &self.locked_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_word_aligned_and_increasing() {
        let mut em = ExtensionManager::of_struct("particle");
        let a = em.add_extension("a", 3);
        let b = em.add_extension("b", 5);
        let c = em.add_extension("c", 4);
        assert_eq!(
            [em.offset_of(a), em.offset_of(b), em.offset_of(c)],
            [0, 8, 16]
        );
        assert_eq!(em.final_size(), 24);
    }

    #[test]
    fn struct_records_are_zero_filled_and_sliced() {
        let mut em = ExtensionManager::of_struct("particle");
        let colour = em.add_extension("colour", 4);
        let mass = em.add_extension("mass", 8);
        let mut buffer = em.allocate(3);
        assert_eq!(buffer.len(), em.final_size() * 3);
        assert!(buffer.iter().all(|&b| b == 0));

        em.slice_mut(em.record_mut(&mut buffer, 1), mass)
            .copy_from_slice(&7.5f64.to_le_bytes());
        let got = f64::from_le_bytes(
            em.slice(em.record(&buffer, 1), mass).try_into().unwrap(),
        );
        assert_eq!(got, 7.5);
        // neighbouring records untouched
        assert!(em.slice(em.record(&buffer, 0), mass).iter().all(|&b| b == 0));
        assert_eq!(em.slice(em.record(&buffer, 2), colour).len(), 4);
    }

    #[test]
    #[should_panic(expected = "locked down")]
    fn add_after_lockdown_panics() {
        let mut em = ExtensionManager::of_struct("particle");
        em.add_extension("a", 8);
        em.lock_down();
        em.add_extension("b", 8);
    }

    #[test]
    fn existing_object_shadow_grows_zero_filled() {
        let mut em = ExtensionManager::of_existing_object("context");
        let flag = em.add_extension("flag", 1);
        let vec3 = em.add_extension("vec3", 24);
        assert_eq!(em.final_size(), 32);
        assert!(em.get(flag).iter().all(|&b| b == 0));
        em.get_mut(flag)[0] = 1;
        em.get_mut(vec3)[23] = 9;
        assert_eq!(em.get(flag), &[1]);
        assert_eq!(em.get(vec3)[23], 9);
    }

    #[test]
    fn array_extensions_get_dedicated_buffers() {
        let mut em = ExtensionManager::of_array("swarm", 16, 4);
        let temp = em.add_extension("temperature", 8);
        em.array_slice_mut(temp, 2)
            .copy_from_slice(&1.25f64.to_le_bytes());
        let got = f64::from_le_bytes(em.array_slice(temp, 2).try_into().unwrap());
        assert_eq!(got, 1.25);
        assert!(em.array_slice(temp, 3).iter().all(|&b| b == 0));
        assert_eq!(em.item_size(), 16);
    }

    #[test]
    fn extended_array_offsets_handles_past_inner() {
        let mut inner = ExtensionManager::of_struct("particle");
        let position = inner.add_extension("position", 24);
        let _mass = inner.add_extension("mass", 8);
        let inner = Rc::new(inner);

        let mut em = ExtensionManager::of_extended_array("swarm", inner.clone(), 10);
        let colour = em.add_extension("colour", 4);
        assert_eq!(colour, 2);
        assert_eq!(em.len(), 3);
        assert_eq!(em.item_size(), inner.final_size());

        // inner keys resolve to inner handles, local keys come after
        assert_eq!(em.get_handle("position"), Some(position));
        assert_eq!(em.get_handle("colour"), Some(2));
        assert_eq!(em.get_handle("absent"), None);

        // delegated handles answer with the inner layout's offsets
        assert_eq!(em.offset_of(position), 0);
        assert_eq!(em.key_of(1), "mass");

        // the local extension has its own per-item buffer
        em.array_slice_mut(colour, 9)[0] = 0xff;
        assert_eq!(em.array_slice(colour, 9)[0], 0xff);
    }

    #[test]
    #[should_panic(expected = "belongs to the inner layout")]
    fn array_access_through_inner_handle_panics() {
        let mut inner = ExtensionManager::of_struct("particle");
        inner.add_extension("mass", 8);
        let mut em = ExtensionManager::of_extended_array("swarm", Rc::new(inner), 4);
        em.add_extension("colour", 4);
        em.array_slice(0, 0);
    }

    #[test]
    fn copy_record_honours_callbacks() {
        let mut em = ExtensionManager::of_struct("particle");
        let a = em.add_extension("a", 4);
        let b = em.add_extension("b", 4);
        // slot b doubles each byte instead of copying
        em.set_copy_func(b, |src, dst| {
            for (s, d) in src.iter().zip(dst.iter_mut()) {
                *d = s.wrapping_mul(2);
            }
        });
        let mut src = em.allocate(1);
        em.slice_mut(&mut src, a).copy_from_slice(&[1, 2, 3, 4]);
        em.slice_mut(&mut src, b).copy_from_slice(&[10, 20, 30, 40]);
        let mut dst = em.allocate(1);
        em.copy_record(&src, &mut dst);
        assert_eq!(em.slice(&dst, a), &[1, 2, 3, 4]);
        assert_eq!(em.slice(&dst, b), &[20, 40, 60, 80]);
    }

    #[test]
    fn get_handle_misses_are_none() {
        let mut em = ExtensionManager::of_struct("particle");
        em.add_extension("a", 8);
        assert_eq!(em.get_handle("a"), Some(0));
        assert_eq!(em.get_handle("z"), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn offsets_stay_aligned_and_monotone(sizes in proptest::collection::vec(1usize..64, 1..32)) {
                let mut em = ExtensionManager::of_struct("p");
                let handles: Vec<_> = sizes
                    .iter()
                    .enumerate()
                    .map(|(i, &s)| em.add_extension(format!("k{i}"), s))
                    .collect();
                let mut previous = None;
                for (&h, &s) in handles.iter().zip(&sizes) {
                    let offset = em.offset_of(h);
                    prop_assert_eq!(offset % WORD_SIZE, 0);
                    if let Some(p) = previous {
                        prop_assert!(offset > p);
                    }
                    prop_assert!(offset + s <= em.final_size());
                    previous = Some(offset);
                }
            }
        }
    }
}
