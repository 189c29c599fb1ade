//! Generation-checked handle tables.
//!
//! Handles that cross the host boundary never carry engine pointers. They
//! are `(index, generation)` keys into a table owned by whoever owns the
//! underlying resources. Removing an entry bumps the slot's generation, so a
//! stale key is detected instead of aliasing whatever reuses the slot.

use core::fmt;
use core::num::NonZeroU32;

/// A key into a [`HandleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    index: u32,
    generation: NonZeroU32,
}

impl Key {
    /// Rebuild a key from its raw parts. Returns `None` for generation 0,
    /// which is never issued.
    pub fn from_parts(index: u32, generation: u32) -> Option<Self> {
        NonZeroU32::new(generation).map(|generation| Key { index, generation })
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation.get()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

enum Slot<T> {
    Occupied { generation: NonZeroU32, value: T },
    Vacant { generation: NonZeroU32, next_free: Option<u32> },
}

/// Slab of values addressed by generation-checked [`Key`]s.
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `value` and return the key that addresses it.
    pub fn insert(&mut self, value: T) -> Key {
        self.len += 1;
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let (generation, next_free) = match slot {
                Slot::Vacant {
                    generation,
                    next_free,
                } => (*generation, *next_free),
                Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };
            *slot = Slot::Occupied { generation, value };
            self.free_head = next_free;
            return Key { index, generation };
        }

        let index = u32::try_from(self.slots.len()).expect("handle table exceeded u32::MAX slots");
        let generation = NonZeroU32::MIN;
        self.slots.push(Slot::Occupied { generation, value });
        Key { index, generation }
    }

    pub fn get(&self, key: Key) -> Option<&T> {
        match self.slots.get(key.index as usize)? {
            Slot::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    /// Remove the entry for `key`. The slot's generation advances so `key`
    /// (and any copy of it) stays invalid from now on.
    pub fn remove(&mut self, key: Key) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == key.generation => {}
            _ => return None,
        }

        // Wrapping back to 1 after u32::MAX reuses; a key would have to sit
        // unused through four billion reuses of one slot to collide.
        let next_generation = key.generation.checked_add(1).unwrap_or(NonZeroU32::MIN);
        let vacant = Slot::Vacant {
            generation: next_generation,
            next_free: self.free_head,
        };
        let Slot::Occupied { value, .. } = core::mem::replace(slot, vacant) else {
            unreachable!()
        };
        self.free_head = Some(key.index);
        self.len -= 1;
        Some(value)
    }

    /// Remove every entry, invalidating all outstanding keys.
    pub fn drain(&mut self) -> Vec<T> {
        let keys: Vec<Key> = self.keys().collect();
        keys.into_iter().filter_map(|key| self.remove(key)).collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { generation, .. } => Some(Key {
                    index: index as u32,
                    generation: *generation,
                }),
                Slot::Vacant { .. } => None,
            })
    }
}
