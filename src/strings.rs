//! Presence checks for optional text values.

/// Classifies a text value as meaningfully present or not.
///
/// A value is absent when it is `None`, empty, or made only of whitespace.
pub trait StringPresence {
    /// Returns true when the value is missing, empty, or whitespace only.
    fn is_absent(&self) -> bool;

    /// Returns true when the value carries at least one non-whitespace character.
    fn is_present(&self) -> bool {
        !self.is_absent()
    }
}

impl StringPresence for str {
    fn is_absent(&self) -> bool {
        self.chars().all(char::is_whitespace)
    }
}

impl StringPresence for String {
    fn is_absent(&self) -> bool {
        self.as_str().is_absent()
    }
}

impl<S: AsRef<str>> StringPresence for Option<S> {
    fn is_absent(&self) -> bool {
        match self {
            Some(value) => value.as_ref().is_absent(),
            None => true,
        }
    }
}
