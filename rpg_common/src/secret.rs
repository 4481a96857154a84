use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A wrapper for configuration values that must never leak into logs or `Debug` output. The value is only accessible
/// via an explicit call to [`Secret::reveal`].
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl Secret<String> {
    /// True when no usable secret has been configured. Placeholder values from `.env` templates count as unset.
    pub fn is_unset(&self) -> bool {
        self.value.is_empty() || self.value.contains("placeholder")
    }
}
