use core::{
    fmt,
    marker::PhantomData,
    mem::size_of,
    ops::{Index, IndexMut},
};

pub const MAX_BANKS: usize = 8;
const MAX_BANK_CAPACITY: usize = 1 << 29;

/// Location of an allocation: bank in the low three bits, offset above.
pub struct Handle<T> {
    raw: u32,
    _marker: PhantomData<*const T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle({}:{})", self.bank(), self.offset())
    }
}

impl<T> Handle<T> {
    fn new(bank: usize, offset: usize) -> Self {
        debug_assert!(bank < MAX_BANKS && offset < MAX_BANK_CAPACITY);
        Self {
            raw: bank as u32 | (offset as u32) << 3,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn bank(self) -> usize {
        (self.raw & 7) as usize
    }

    #[inline]
    pub fn offset(self) -> usize {
        (self.raw >> 3) as usize
    }

    #[inline]
    pub fn at(self, i: usize) -> Self {
        Self::new(self.bank(), self.offset() + i)
    }
}

pub struct Arena<T> {
    banks: Vec<Vec<T>>,
    current: usize,
    bank_capacity: usize,
    max_banks: usize,
    _not_send: PhantomData<*const ()>,
}

impl<T: Clone> Arena<T> {
    pub fn new(bank_capacity: usize, max_banks: usize) -> Self {
        assert!(
            (1..=MAX_BANK_CAPACITY).contains(&bank_capacity),
            "bank capacity {bank_capacity}"
        );
        assert!((1..=MAX_BANKS).contains(&max_banks), "{max_banks} banks");

        Self {
            banks: Vec::with_capacity(max_banks),
            current: 0,
            bank_capacity,
            max_banks,
            _not_send: PhantomData,
        }
    }

    pub fn with_bytes(bank_bytes: usize, max_banks: usize) -> Self {
        let capacity = (bank_bytes / size_of::<T>().max(1)).clamp(1, MAX_BANK_CAPACITY);
        Self::new(capacity, max_banks)
    }

    /// Moves to the next bank exactly when the current one cannot hold the whole run. Panics
    /// when every bank is full.
    pub fn alloc(&mut self, len: usize, fill: T) -> Handle<T> {
        assert!(
            len <= self.bank_capacity,
            "allocation of {len} exceeds bank capacity {}",
            self.bank_capacity,
        );

        if self.banks.is_empty() || self.banks[self.current].len() + len > self.bank_capacity {
            if !self.banks.is_empty() {
                self.current += 1;
            }
            assert!(
                self.current < self.max_banks,
                "arena exhausted ({} banks of {})",
                self.max_banks,
                self.bank_capacity,
            );
            if self.current == self.banks.len() {
                self.banks.push(Vec::with_capacity(self.bank_capacity));
            }
        }

        let bank = &mut self.banks[self.current];
        let offset = bank.len();
        bank.resize(offset + len, fill);
        Handle::new(self.current, offset)
    }
}

impl<T> Arena<T> {
    #[inline]
    pub fn slice(&self, start: Handle<T>, len: usize) -> &[T] {
        &self.banks[start.bank()][start.offset()..start.offset() + len]
    }

    #[inline]
    pub fn slice_mut(&mut self, start: Handle<T>, len: usize) -> &mut [T] {
        &mut self.banks[start.bank()][start.offset()..start.offset() + len]
    }

    pub fn len(&self) -> usize {
        self.banks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn banks_used(&self) -> usize {
        self.banks.iter().filter(|b| !b.is_empty()).count()
    }

    pub fn reset(&mut self) {
        for bank in &mut self.banks {
            bank.clear();
        }
        self.current = 0;
    }
}

impl<T> Index<Handle<T>> for Arena<T> {
    type Output = T;

    #[inline]
    fn index(&self, handle: Handle<T>) -> &T {
        &self.banks[handle.bank()][handle.offset()]
    }
}

impl<T> IndexMut<Handle<T>> for Arena<T> {
    #[inline]
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        &mut self.banks[handle.bank()][handle.offset()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switches_bank_only_when_full() {
        let mut arena = Arena::new(10, 3);

        let a = arena.alloc(4, 1u32);
        let b = arena.alloc(6, 2);
        assert_eq!((a.bank(), a.offset()), (0, 0));
        assert_eq!((b.bank(), b.offset()), (0, 4));
        assert_eq!(arena.banks_used(), 1);

        let c = arena.alloc(1, 3);
        assert_eq!((c.bank(), c.offset()), (1, 0));

        let d = arena.alloc(10, 4);
        assert_eq!((d.bank(), d.offset()), (2, 0));

        assert_eq!(arena.slice(a, 4), &[1; 4]);
        assert_eq!(arena.slice(b, 6), &[2; 6]);
        assert_eq!(arena[c], 3);
        assert_eq!(arena.len(), 21);
    }

    #[test]
    fn handles_address_elements() {
        let mut arena = Arena::new(16, 1);
        let run = arena.alloc(5, 0u8);
        for i in 0..5 {
            arena[run.at(i)] = i as u8 * 10;
        }
        arena.slice_mut(run, 5)[4] += 1;
        assert_eq!(arena.slice(run, 5), &[0, 10, 20, 30, 41]);
        assert_eq!((run.at(2).bank(), run.at(2).offset()), (0, 2));
    }

    #[test]
    fn reset_reuses_banks() {
        let mut arena = Arena::new(4, 2);
        arena.alloc(4, 'x');
        arena.alloc(4, 'y');
        arena.reset();
        assert!(arena.is_empty());

        let h = arena.alloc(2, 'z');
        assert_eq!((h.bank(), h.offset()), (0, 0));
        assert_eq!(arena.slice(h, 2), &['z', 'z']);
    }

    #[test]
    #[should_panic(expected = "arena exhausted")]
    fn exhaustion_panics() {
        let mut arena = Arena::new(4, 2);
        arena.alloc(3, 0u16);
        arena.alloc(3, 0);
        arena.alloc(3, 0);
    }

    #[test]
    #[should_panic(expected = "exceeds bank capacity")]
    fn oversized_request_panics() {
        let mut arena = Arena::new(4, 2);
        arena.alloc(5, 0u16);
    }

    #[test]
    fn sizes_banks_by_bytes() {
        let mut arena = Arena::<u64>::with_bytes(64, 1);
        arena.alloc(8, 0);
        assert_eq!(arena.len(), 8);
    }
}
