use serde::{Deserialize, Deserializer};

use crate::error::{AppError, AppResult};

/// One field of a partial update: absent from the body, explicitly `null`,
/// or carrying a value. Use with `#[serde(default)]` so absent fields stay
/// `Missing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Missing,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Missing
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(de)? {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Patch::Missing)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Missing => Patch::Missing,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }

    pub fn try_map<U>(self, f: impl FnOnce(T) -> AppResult<U>) -> AppResult<Patch<U>> {
        Ok(match self {
            Patch::Missing => Patch::Missing,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)?),
        })
    }

    /// Writes into a nullable column.
    pub fn apply(self, slot: &mut Option<T>) {
        match self {
            Patch::Missing => {}
            Patch::Null => *slot = None,
            Patch::Value(v) => *slot = Some(v),
        }
    }

    /// Writes into a non-nullable column; `null` is rejected.
    pub fn apply_required(self, slot: &mut T, field: &str) -> AppResult<()> {
        match self {
            Patch::Missing => Ok(()),
            Patch::Null => Err(AppError::validation(format!("{field} cannot be null"))),
            Patch::Value(v) => {
                *slot = v;
                Ok(())
            }
        }
    }
}
