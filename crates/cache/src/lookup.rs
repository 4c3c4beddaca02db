/// Outcome of a cache read that completed without an I/O failure
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Lookup<T> {
    /// The entry exists and is consistent
    Found(T),
    /// Nothing usable is cached under this key
    Absent,
}

impl<T> Lookup<T> {
    /// Returns `true` for [`Lookup::Found`]
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Convert into an `Option`, discarding the distinction from errors
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => None,
        }
    }
}
