use crate::error::{Result, StudioError};

/// A closed set of string options sent to the API and offered in the UI.
pub trait Choice: Copy + PartialEq + 'static {
    /// Field label used in error messages.
    const LABEL: &'static str;
    /// Every option, in the order the UI lists them.
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;
}

pub fn parse_choice<T: Choice>(value: &str) -> Result<T> {
    let value = value.trim();
    T::ALL
        .iter()
        .copied()
        .find(|choice| choice.as_str() == value)
        .ok_or_else(|| {
            StudioError::ValidationError(format!("Unsupported {}: '{}'", T::LABEL, value))
        })
}
