use serde::Serialize;

use crate::error::{Error, Result};

/// A bare value for single-host calls, an ordered sequence otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Wraps per-host values; `single` selects the bare form.
    pub(crate) fn from_values(single: bool, mut values: Vec<T>) -> Self {
        if single && values.len() == 1 {
            OneOrMany::One(values.remove(0))
        } else {
            OneOrMany::Many(values)
        }
    }

    pub fn is_one(&self) -> bool {
        matches!(self, OneOrMany::One(_))
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }

    /// The bare value, if this is the single-host form.
    pub fn as_one(&self) -> Option<&T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(_) => None,
        }
    }

    /// Extracts exactly one value from either form.
    pub fn into_one(self) -> Result<T> {
        match self {
            OneOrMany::One(value) => Ok(value),
            OneOrMany::Many(mut values) if values.len() == 1 => Ok(values.remove(0)),
            OneOrMany::Many(values) => Err(Error::InvalidArgument(format!(
                "expected exactly one host, got {}",
                values.len()
            ))),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}
