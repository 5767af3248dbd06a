//! Descriptions of DBus methods, signals, properties and interfaces.
//!
//! Descriptors are assembled once, by adding arguments and annotations, and
//! are read-only while in use for marshalling.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};

mod interface;
mod method;
mod property;
mod signal;

pub use interface::Interface;
pub use method::Method;
pub use property::{Access, Property};
pub use signal::Signal;

pub const NO_REPLY_ANNOTATION: &str = "org.freedesktop.DBus.Method.NoReply";
pub const DEPRECATED_ANNOTATION: &str = "org.freedesktop.DBus.Deprecated";

pub type Annotations = BTreeMap<String, String>;

/// Direction of a method argument, as named in introspection data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(Error::mismatch("direction \"in\" or \"out\"", format!("{:?}", other))),
        }
    }
}

/// Which half of a method call a message carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    MethodCall,
    MethodReturn,
}

fn annotation_is_true(annotations: &Annotations, key: &str) -> bool {
    annotations.get(key).map_or(false, |v| v == "true")
}

/// Converts a DBus member name such as `GetNameOwner` to `get_name_owner`.
pub(crate) fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
