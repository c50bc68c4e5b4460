use serde::{Deserialize, Serialize};

pub type SlotIndex = u32;
pub type Generation = u32;

/// Opaque reference to a pooled value: slot index plus the slot generation at issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    pub(crate) index: SlotIndex,
    pub(crate) generation: Generation,
}

impl Handle {
    pub fn index(&self) -> SlotIndex {
        self.index
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Slot<T> {
    pub(crate) generation: Generation,
    pub(crate) value: Option<T>,
}

impl<T> Slot<T> {
    pub(crate) fn empty() -> Self {
        Self {
            generation: 0,
            value: None,
        }
    }

    pub(crate) fn is_occupied(&self) -> bool {
        self.value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display() {
        let h = Handle {
            index: 3,
            generation: 7,
        };
        assert_eq!(h.to_string(), "#3v7");
    }

    #[test]
    fn handles_order_by_index_first() {
        let a = Handle {
            index: 1,
            generation: 9,
        };
        let b = Handle {
            index: 2,
            generation: 0,
        };
        assert!(a < b);
    }

    #[test]
    fn empty_slot_is_unoccupied() {
        let slot: Slot<u8> = Slot::empty();
        assert!(!slot.is_occupied());
        assert_eq!(slot.generation, 0);
    }
}
