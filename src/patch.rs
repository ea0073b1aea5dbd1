use serde::{Deserialize, Deserializer};

/// A field of a partial update: either left out of the request or given a value.
///
/// Use with `#[serde(default)]` so an absent key deserializes to `Unchanged`.
/// For nullable columns use `Patch<Option<T>>`: an explicit `null` becomes
/// `Set(None)` and clears the column, which a bare `Option<T>` cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unchanged,
    Set(T),
}

impl<T> Patch<T> {
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(v) => Some(v),
            Patch::Unchanged => None,
        }
    }

    /// Overwrites `target` when the field was present; returns whether it did.
    pub fn apply_to(self, target: &mut T) -> bool {
        match self {
            Patch::Set(v) => {
                *target = v;
                true
            }
            Patch::Unchanged => false,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Patch::Set)
    }
}
