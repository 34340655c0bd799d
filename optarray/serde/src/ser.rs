use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::SerdeWith;

/// Serializes an optional value as an array of zero or one element.
pub fn encode<T, S>(option: Option<&T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: ?Sized + Serialize,
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(usize::from(option.is_some())))?;
    if let Some(value) = option {
        seq.serialize_element(value)?;
    }
    seq.end()
}

/// Wraps a borrowed optional value so that it serializes as an array.
#[derive(Debug)]
pub struct Encoder<'a, T: ?Sized>(Option<&'a T>);

impl<T: ?Sized> Clone for Encoder<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Encoder<'_, T> {}

impl<'a, T: ?Sized> Encoder<'a, T> {
    pub fn new(option: Option<&'a T>) -> Self {
        Self(option)
    }
}

impl<'a, T> From<&'a Option<T>> for Encoder<'a, T> {
    fn from(option: &'a Option<T>) -> Self {
        Self(option.as_ref())
    }
}

impl<T> Serialize for Encoder<'_, T>
where
    T: ?Sized + Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        encode(self.0, serializer)
    }
}

pub(crate) struct SerializeWith<'a, C>(&'a C::Value)
where
    C: SerdeWith;

impl<'a, C> SerializeWith<'a, C>
where
    C: SerdeWith,
{
    pub(crate) fn new(value: &'a C::Value) -> Self {
        Self(value)
    }
}

impl<C> Serialize for SerializeWith<'_, C>
where
    C: SerdeWith,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        C::serialize(self.0, serializer)
    }
}
