use core::ops::{Index, IndexMut};

// DO NOT CHANGE
// Current assignment assumed throughout codebase
pub const A: bool = false;
pub const B: bool = true;

/// One value per player. `a` is the side the engine plays for.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pair<T> {
    pub a: T,
    pub b: T,
}

impl<T> Index<bool> for Pair<T> {
    type Output = T;

    fn index(&self, index: bool) -> &T {
        match index {
            A => &self.a,
            B => &self.b,
        }
    }
}

impl<T> IndexMut<bool> for Pair<T> {
    fn index_mut(&mut self, index: bool) -> &mut T {
        match index {
            A => &mut self.a,
            B => &mut self.b,
        }
    }
}

impl<T> Pair<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    /// Returns `(side, opponent of side)`.
    pub fn get_mut(&mut self, side: bool) -> (&mut T, &mut T) {
        match side {
            A => (&mut self.a, &mut self.b),
            B => (&mut self.b, &mut self.a),
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Pair<U> {
        Pair::new(f(self.a), f(self.b))
    }

    pub fn map_mut(&mut self, mut f: impl FnMut(&mut T)) {
        f(&mut self.a);
        f(&mut self.b);
    }

    pub fn swap(self) -> Self {
        Self::new(self.b, self.a)
    }
}

impl<T: Copy> Pair<T> {
    pub fn both(value: T) -> Self {
        Self { a: value, b: value }
    }
}
