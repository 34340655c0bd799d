use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, DeserializeSeed, Deserializer, SeqAccess, Visitor};

use crate::{Lenient, Policy, SerdeWith};

///
/// Produces the element decoder at each element position.
///
/// Lookup is split into two phases: `ElementSeed` is bound once, when the optional type is
/// resolved, and `seed` is called every time an element is about to be decoded.  The latter may
/// consult whatever context the implementer captures, which is how contextual (e.g., polymorphic)
/// element decoding is supported.
///
pub trait ElementSeed<'de> {
    type Value;
    type Seed: DeserializeSeed<'de, Value = Self::Value>;

    fn seed(&self) -> Self::Seed;
}

/// Decodes elements with `T`'s own `Deserialize` implementation.
pub struct Typed<T>(PhantomData<fn() -> T>);

/// Decodes elements with a `SerdeWith` codec.
pub struct With<C>(PhantomData<fn() -> C>);

#[derive(Debug)]
pub struct WithSeed<C>(PhantomData<fn() -> C>);

/// Decodes elements with the seed returned by the closure.
#[derive(Clone, Copy, Debug)]
pub struct FromFn<F>(pub F);

/// Decodes an array of zero or one element into an `Option`.
pub struct Decoder<P, S> {
    element: S,
    _policy: PhantomData<fn() -> P>,
}

struct ArrayVisitor<'a, P, S>(&'a Decoder<P, S>);

/// Decodes an optional value with a contextual element seed under the lenient policy.
pub fn from_array_seed<'de, S, D>(
    deserializer: D,
    element: S,
) -> Result<Option<S::Value>, D::Error>
where
    S: ElementSeed<'de>,
    D: Deserializer<'de>,
{
    Decoder::<Lenient, _>::new(element).decode(deserializer)
}

//
// `Typed` and `With`
//

macro_rules! impl_marker {
    ($type:ident) => {
        impl<T> $type<T> {
            pub const fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<T> Default for $type<T> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T> Clone for $type<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $type<T> {}

        impl<T> fmt::Debug for $type<T> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.debug_tuple(stringify!($type))
                    .field(&std::any::type_name::<T>())
                    .finish()
            }
        }
    };
}

impl_marker!(Typed);
impl_marker!(With);

impl<'de, T> ElementSeed<'de> for Typed<T>
where
    T: Deserialize<'de>,
{
    type Value = T;
    type Seed = PhantomData<T>;

    fn seed(&self) -> Self::Seed {
        PhantomData
    }
}

impl<'de, C> ElementSeed<'de> for With<C>
where
    C: SerdeWith,
{
    type Value = C::Value;
    type Seed = WithSeed<C>;

    fn seed(&self) -> Self::Seed {
        WithSeed(PhantomData)
    }
}

impl<'de, C> DeserializeSeed<'de> for WithSeed<C>
where
    C: SerdeWith,
{
    type Value = C::Value;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        C::deserialize(deserializer)
    }
}

impl<'de, F, S> ElementSeed<'de> for FromFn<F>
where
    F: Fn() -> S,
    S: DeserializeSeed<'de>,
{
    type Value = S::Value;
    type Seed = S;

    fn seed(&self) -> Self::Seed {
        (self.0)()
    }
}

//
// `Decoder`
//

impl<P, S> Decoder<P, S> {
    pub fn new(element: S) -> Self {
        Self {
            element,
            _policy: PhantomData,
        }
    }

    pub fn decode<'de, D>(&self, deserializer: D) -> Result<Option<S::Value>, D::Error>
    where
        P: Policy,
        S: ElementSeed<'de>,
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(ArrayVisitor(self))
    }
}

impl<P, S> Clone for Decoder<P, S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self::new(self.element.clone())
    }
}

impl<P, S> fmt::Debug for Decoder<P, S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("policy", &std::any::type_name::<P>())
            .field("element", &self.element)
            .finish()
    }
}

impl<'de, P, S> DeserializeSeed<'de> for Decoder<P, S>
where
    P: Policy,
    S: ElementSeed<'de>,
{
    type Value = Option<S::Value>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        self.decode(deserializer)
    }
}

impl<'de, P, S> DeserializeSeed<'de> for &Decoder<P, S>
where
    P: Policy,
    S: ElementSeed<'de>,
{
    type Value = Option<S::Value>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        self.decode(deserializer)
    }
}

impl<'de, P, S> Visitor<'de> for ArrayVisitor<'_, P, S>
where
    P: Policy,
    S: ElementSeed<'de>,
{
    type Value = Option<S::Value>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of zero or one element")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut value = None;
        let mut index = 0;
        // Resolve the element seed at each position rather than once up front.
        while let Some(element) = seq.next_element_seed(self.0.element.seed())? {
            P::merge::<_, A::Error>(&mut value, element, index)?;
            index += 1;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::thread;

    use serde::de::{Error as _, IntoDeserializer};

    use crate::{Same, Strict};

    use super::*;

    fn decode<P, T>(json: &str) -> Result<Option<T>, serde_json::Error>
    where
        P: Policy,
        T: for<'de> Deserialize<'de>,
    {
        Decoder::<P, _>::new(Typed::<T>::new())
            .decode(&mut serde_json::Deserializer::from_str(json))
    }

    fn assert_err<T>(result: Result<T, serde_json::Error>, prefix: &str)
    where
        T: fmt::Debug,
    {
        let error = result.unwrap_err().to_string();
        assert!(error.starts_with(prefix), "{error:?}");
    }

    #[test]
    fn lenient() {
        assert_eq!(decode::<Lenient, String>("[]").unwrap(), None);
        assert_eq!(
            decode::<Lenient, String>(r#"["a"]"#).unwrap(),
            Some("a".to_string()),
        );
        assert_eq!(
            decode::<Lenient, String>(r#" [ "a" ] "#).unwrap(),
            Some("a".to_string()),
        );
        assert_eq!(decode::<Lenient, u8>("[1,2,3]").unwrap(), Some(3));

        assert_eq!(decode::<Lenient, Option<u8>>("[null]").unwrap(), Some(None));
        assert_eq!(decode::<Lenient, Option<u8>>("[1]").unwrap(), Some(Some(1)));
        assert_eq!(decode::<Lenient, Option<u8>>("[]").unwrap(), None);
        assert_eq!(
            decode::<Lenient, Option<u8>>("[1,null]").unwrap(),
            Some(None),
        );

        assert_eq!(
            decode::<Lenient, Vec<u8>>("[[1,2]]").unwrap(),
            Some(vec![1, 2]),
        );
        assert_eq!(decode::<Lenient, Vec<u8>>("[[]]").unwrap(), Some(vec![]));
    }

    #[test]
    fn strict() {
        assert_eq!(decode::<Strict, u8>("[]").unwrap(), None);
        assert_eq!(decode::<Strict, u8>("[1]").unwrap(), Some(1));
        assert_err(
            decode::<Strict, u8>("[1,2]"),
            "invalid length 2, expected an array of at most one element",
        );
    }

    #[test]
    fn stream_error() {
        assert_err(
            decode::<Lenient, u8>("1"),
            "invalid type: integer `1`, expected an array of zero or one element",
        );
        assert_err(
            decode::<Lenient, u8>("null"),
            "invalid type: null, expected an array of zero or one element",
        );
        assert_err(
            decode::<Lenient, u8>(r#"{"a":1}"#),
            "invalid type: map, expected an array of zero or one element",
        );
        assert_err(decode::<Lenient, u8>("[1"), "EOF while parsing a list");
        assert_err(decode::<Lenient, u8>(""), "EOF while parsing a value");
    }

    #[test]
    fn element_error() {
        assert_err(
            decode::<Lenient, u8>("[null]"),
            "invalid type: null, expected u8",
        );
        assert_err(
            decode::<Lenient, u8>(r#"["a"]"#),
            "invalid type: string \"a\", expected u8",
        );
        assert_err(
            decode::<Lenient, u8>("[1,null]"),
            "invalid type: null, expected u8",
        );
    }

    #[test]
    fn borrowed() {
        let json = r#"["a"]"#;
        let value: Option<&str> = Decoder::<Lenient, _>::new(Typed::new())
            .decode(&mut serde_json::Deserializer::from_str(json))
            .unwrap();
        assert_eq!(value, Some("a"));
    }

    #[test]
    fn with() {
        let decoder = Decoder::<Lenient, _>::new(With::<Same<String>>::new());
        assert_eq!(
            decoder
                .decode(&mut serde_json::Deserializer::from_str(r#"["a"]"#))
                .unwrap(),
            Some("a".to_string()),
        );
        assert_eq!(
            decoder
                .decode(&mut serde_json::Deserializer::from_str("[]"))
                .unwrap(),
            None,
        );
    }

    #[test]
    fn from_fn() {
        struct Offset(u8);

        impl<'de> DeserializeSeed<'de> for Offset {
            type Value = u8;

            fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                u8::deserialize(deserializer)?
                    .checked_add(self.0)
                    .ok_or_else(|| D::Error::custom("overflow"))
            }
        }

        fn decode(
            decoder: &Decoder<Lenient, FromFn<impl Fn() -> Offset>>,
            json: &str,
        ) -> Result<Option<u8>, serde_json::Error> {
            decoder.decode(&mut serde_json::Deserializer::from_str(json))
        }

        // The context is read when an element is decoded, not when the decoder is constructed.
        let offset = Cell::new(0);
        let decoder = Decoder::<Lenient, _>::new(FromFn(|| Offset(offset.get())));
        assert_eq!(decode(&decoder, "[1]").unwrap(), Some(1));
        offset.set(10);
        assert_eq!(decode(&decoder, "[1]").unwrap(), Some(11));
        assert_eq!(decode(&decoder, "[]").unwrap(), None);
        offset.set(255);
        assert_err(decode(&decoder, "[1]"), "overflow");

        offset.set(1);
        assert_eq!(
            from_array_seed(
                &mut serde_json::Deserializer::from_str("[2]"),
                FromFn(|| Offset(offset.get())),
            )
            .unwrap(),
            Some(3),
        );
    }

    #[test]
    fn reentrant() {
        let decoder = Decoder::<Strict, _>::new(Typed::<u32>::new());
        thread::scope(|s| {
            for i in 0..4u32 {
                let decoder = &decoder;
                s.spawn(move || {
                    let json = format!("[{i}]");
                    let mut deserializer = serde_json::Deserializer::from_str(&json);
                    assert_eq!(decoder.decode(&mut deserializer).unwrap(), Some(i));
                });
            }
        });
    }

    #[test]
    fn idempotent() {
        for json in ["[]", "[1]", "[1,2]"] {
            let x = decode::<Lenient, u8>(json).unwrap();
            let y = decode::<Lenient, u8>(json).unwrap();
            assert_eq!(x, y);
        }
    }

    #[test]
    fn seed() {
        let decoder = Decoder::<Lenient, _>::new(Typed::<u8>::new());
        let value: Result<_, serde::de::value::Error> =
            (&decoder).deserialize(Vec::<u8>::new().into_deserializer());
        assert_eq!(value, Ok(None));
        let value: Result<_, serde::de::value::Error> =
            decoder.deserialize(vec![1u8, 2].into_deserializer());
        assert_eq!(value, Ok(Some(2)));
    }
}
