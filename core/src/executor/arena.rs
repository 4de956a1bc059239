//! Generational arena holding live frames
//!
//! Frames refer to each other by [`FrameId`]. Freeing a slot bumps its
//! generation, so an id held past the frame's lifetime (by a timer, a resume
//! handle or a stratum) is detected as stale instead of aliasing a new frame.

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Free { generation: u32, next_free: Option<u32> },
}

pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, value: T) -> FrameId {
        self.len += 1;
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let (generation, next_free) = match slot {
                Slot::Free {
                    generation,
                    next_free,
                } => (*generation, *next_free),
                Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };
            *slot = Slot::Occupied { generation, value };
            self.free_head = next_free;
            return FrameId { index, generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied {
            generation: 0,
            value,
        });
        FrameId {
            index,
            generation: 0,
        }
    }

    /// Insert a value that needs to know its own id.
    pub fn insert_with(&mut self, f: impl FnOnce(FrameId) -> T) -> FrameId {
        let next = match self.free_head {
            Some(index) => match &self.slots[index as usize] {
                Slot::Free { generation, .. } => FrameId {
                    index,
                    generation: *generation,
                },
                Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            },
            None => FrameId {
                index: self.slots.len() as u32,
                generation: 0,
            },
        };
        let id = self.insert(f(next));
        debug_assert_eq!(id, next);
        id
    }

    pub fn contains(&self, id: FrameId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: FrameId) -> Option<&T> {
        match self.slots.get(id.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: FrameId) -> Option<&mut T> {
        match self.slots.get_mut(id.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Free the slot, returning its value. Stale ids return `None`.
    pub fn remove(&mut self, id: FrameId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        let slot = std::mem::replace(
            &mut self.slots[id.index as usize],
            Slot::Free {
                generation: id.generation.wrapping_add(1),
                next_free: self.free_head,
            },
        );
        self.free_head = Some(id.index);
        self.len -= 1;
        match slot {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Free { .. } => None,
        }
    }
}
