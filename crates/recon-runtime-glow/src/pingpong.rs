//! Two-slot ring used by the bloom blur chain.
//
// The blur reads one slot and writes the other, then the roles flip. `BlurCursor` owns that
// bookkeeping so callers never index the pair with a bool.

/// One of the two ping-pong slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Zero,
    One,
}

impl Slot {
    pub fn index(self) -> usize {
        match self {
            Slot::Zero => 0,
            Slot::One => 1,
        }
    }

    pub fn other(self) -> Slot {
        match self {
            Slot::Zero => Slot::One,
            Slot::One => Slot::Zero,
        }
    }
}

/// A fixed pair of values addressed by [`Slot`].
#[derive(Debug)]
pub struct PingPong<T> {
    slots: [T; 2],
}

impl<T> PingPong<T> {
    pub fn new(zero: T, one: T) -> Self {
        Self { slots: [zero, one] }
    }

    pub fn get(&self, slot: Slot) -> &T {
        &self.slots[slot.index()]
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut T {
        &mut self.slots[slot.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }
}

/// Per-frame pass state for the separable blur.
///
/// `current()` holds the latest result (initially the bright-pass output in slot 0),
/// `other()` is where the next pass writes. `advance()` flips both the slot roles and
/// the blur direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurCursor {
    current: Slot,
    horizontal: bool,
}

impl BlurCursor {
    /// Bright-pass output in slot 0, first pass horizontal.
    pub fn start() -> Self {
        Self {
            current: Slot::Zero,
            horizontal: true,
        }
    }

    pub fn current(&self) -> Slot {
        self.current
    }

    pub fn other(&self) -> Slot {
        self.current.other()
    }

    pub fn horizontal(&self) -> bool {
        self.horizontal
    }

    pub fn advance(&mut self) {
        self.current = self.current.other();
        self.horizontal = !self.horizontal;
    }
}

/// Slot that holds the finished blur after `iterations` passes.
pub fn final_blur_slot(iterations: u32) -> Slot {
    let mut cursor = BlurCursor::start();
    for _ in 0..iterations {
        cursor.advance();
    }
    cursor.current()
}
