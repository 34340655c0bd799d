//! Codes `Option<T>` as an array of zero or one element.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Deserialize, PartialEq, Serialize)]
//! struct Container {
//!     #[serde(with = "optarray_serde::as_array")]
//!     optional: Option<String>,
//! }
//!
//! let container = Container { optional: Some("a".to_string()) };
//! let json = serde_json::to_string(&container).unwrap();
//! assert_eq!(json, r#"{"optional":["a"]}"#);
//! assert_eq!(serde_json::from_str::<Container>(&json).unwrap(), container);
//! ```
//!
//! When the array holds more than one element, `deserialize` keeps the last one; use
//! `as_array::strict` to reject such arrays instead.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::de::{Decoder, Typed};
use crate::{Lenient, Policy, ser};

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    deserialize_with::<Lenient, T, D>(deserializer)
}

pub fn serialize<T, S>(option: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    ser::encode(option.as_ref(), serializer)
}

fn deserialize_with<'de, P, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    P: Policy,
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Decoder::<P, _>::new(Typed::<T>::new()).decode(deserializer)
}

/// Same as `as_array`, except that arrays of more than one element are rejected.
pub mod strict {
    use crate::Strict;

    use super::*;

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        deserialize_with::<Strict, T, D>(deserializer)
    }

    pub fn serialize<T, S>(option: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        super::serialize(option, serializer)
    }
}
