use serde::de::Error;

/// Decides what to do with an array that holds more than one element.
pub trait Policy {
    /// Stores `value`, the element at `index`, into `slot`.
    fn merge<T, E>(slot: &mut Option<T>, value: T, index: usize) -> Result<(), E>
    where
        E: Error;
}

/// Keeps the last element of the array.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Lenient;

/// Rejects arrays of more than one element.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Strict;

const EXPECT: &str = "an array of at most one element";

impl Policy for Lenient {
    fn merge<T, E>(slot: &mut Option<T>, value: T, index: usize) -> Result<(), E>
    where
        E: Error,
    {
        if slot.replace(value).is_some() {
            tracing::warn!(index, "optional array: discard element in favor of a later one");
        }
        Ok(())
    }
}

impl Policy for Strict {
    fn merge<T, E>(slot: &mut Option<T>, value: T, index: usize) -> Result<(), E>
    where
        E: Error,
    {
        if slot.is_some() {
            return Err(E::invalid_length(index + 1, &EXPECT));
        }
        *slot = Some(value);
        Ok(())
    }
}
