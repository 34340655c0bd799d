pub mod as_array;
pub mod de;
pub mod ser;

mod policy;

use std::fmt;
use std::marker::PhantomData;

use serde::de::{DeserializeOwned, Deserializer};
use serde::ser::{Serialize, Serializer};

pub use optarray_serde_attribute::optional;

pub use crate::policy::{Lenient, Policy, Strict};

//
// Implementer's Notes:
//
// * We map `Option<T>` to a JSON array of zero or one element, regardless of how the underlying
//   format represents `Option` natively:
//
//   | Rust                         | JSON                         |
//   |------------------------------|------------------------------|
//   | None                         | []                           |
//   | Some(v)                      | [v]                          |
//   | Some(None)                   | [null]                       |
//
// * `T` is bound statically (through `Typed<T>` or a `SerdeWith` codec), but the element decoder
//   is instantiated anew at every element position (see `de::ElementSeed`).
//

// When implementing this trait, you are usually doing so for a foreign type.  To avoid triggering
// Rust's orphan rule, we design this trait to accept the (foreign) type as an associated type.
pub trait SerdeWith {
    type Value;

    fn deserialize<'de, D>(deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>;

    fn serialize<S>(value: &Self::Value, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer;
}

/// Codes a value with its own `Serialize` and `Deserialize` implementations.
pub struct Same<T>(PhantomData<fn() -> T>);

impl<T> fmt::Debug for Same<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Same")
    }
}

impl<T> SerdeWith for Same<T>
where
    T: Serialize + DeserializeOwned,
{
    type Value = T;

    fn deserialize<'de, D>(deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer)
    }

    fn serialize<S>(value: &Self::Value, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }
}

///
/// Codes `Option<C::Value>` as an array of zero or one element, where the element is coded by
/// `C`.
///
/// It is meant to be used with `#[serde(with = "AsArray::<Lenient, MyCodec>")]`, and since it is
/// itself a `SerdeWith`, it can be nested to code `Option<Option<T>>` as `[[v]]`, `[[]]`, or `[]`.
///
pub struct AsArray<P, C>(PhantomData<fn() -> (P, C)>);

impl<P, C> fmt::Debug for AsArray<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("AsArray")
    }
}

// We provide inherent functions in addition to the `SerdeWith` implementation because the code
// generated by `#[serde(with = "...")]` does not import `SerdeWith`.
impl<P, C> AsArray<P, C>
where
    P: Policy,
    C: SerdeWith,
{
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<C::Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        de::Decoder::<P, _>::new(de::With::<C>::new()).decode(deserializer)
    }

    pub fn serialize<S>(option: &Option<C::Value>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ser::encode(
            option.as_ref().map(ser::SerializeWith::<C>::new).as_ref(),
            serializer,
        )
    }
}

impl<P, C> SerdeWith for AsArray<P, C>
where
    P: Policy,
    C: SerdeWith,
{
    type Value = Option<C::Value>;

    fn deserialize<'de, D>(deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Self::deserialize(deserializer)
    }

    fn serialize<S>(value: &Self::Value, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Self::serialize(value, serializer)
    }
}
