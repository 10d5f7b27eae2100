use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::num::ParseIntError;

use err_derive::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A storage-assigned row identifier, tagged with the entity it names so
/// that a drink id can't be handed to something expecting another kind.
pub struct Id<T> {
    val: i32,
    phantom: PhantomData<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error(display = "Unparseable Id")]
    Unparseable(#[error(source)] ParseIntError),
}

pub trait Entity {
    const PREFIX: &'static str;
}

impl<T> Id<T> {
    pub const fn new(val: i32) -> Self {
        Id {
            val,
            phantom: PhantomData,
        }
    }

    pub fn get(&self) -> i32 {
        self.val
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.val)
    }
}

impl<T: Entity> fmt::Debug for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}#{}", T::PREFIX, self.val)
    }
}

impl<T> std::str::FromStr for Id<T> {
    type Err = IdParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let val = src.parse::<i32>().map_err(IdParseError::Unparseable)?;
        Ok(Id::new(val))
    }
}

impl<T> From<i32> for Id<T> {
    fn from(val: i32) -> Self {
        Id::new(val)
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.val.cmp(&other.val)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.val.hash(state)
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Id::new(self.val)
    }
}

impl<T> Copy for Id<T> {}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.val)
    }
}

// Path segments arrive as strings; `deserialize_i32` lets the deserializer
// do the parsing so that both JSON numbers and URL segments are accepted.
impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let val = i32::deserialize(deserializer)?;
        Ok(Id::new(val))
    }
}
