//! Choosing how named Rust structs are represented.

use std::collections::BTreeSet;

/// Representation of a struct with named fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructSerializationStyle {
    /// A DBus struct, `(...)`, with the fields in declaration order.
    StronglyTyped,
    /// An `a{sv}` dictionary from field names to variants. Fields that are
    /// `None` are left out.
    Dict,
}

pub trait SerializerPolicy: Clone {
    fn query_struct_name(&self, name: &str) -> StructSerializationStyle;
}

/// Serializes every named struct as a dictionary.
#[derive(Clone, Debug)]
pub struct DefaultSerializerPolicy;

impl SerializerPolicy for DefaultSerializerPolicy {
    fn query_struct_name(&self, _: &str) -> StructSerializationStyle {
        StructSerializationStyle::Dict
    }
}

/// Serializes every named struct as a DBus struct.
#[derive(Clone, Debug)]
pub struct StronglyTypedSerializerPolicy;

impl SerializerPolicy for StronglyTypedSerializerPolicy {
    fn query_struct_name(&self, _: &str) -> StructSerializationStyle {
        StructSerializationStyle::StronglyTyped
    }
}

/// Serializes the listed structs as DBus structs and all others as
/// dictionaries.
#[derive(Clone, Debug, Default)]
pub struct PerStructSerializerPolicy {
    strongly_typed: BTreeSet<String>,
}

impl PerStructSerializerPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strongly_typed(mut self, name: impl Into<String>) -> Self {
        self.strongly_typed.insert(name.into());
        self
    }
}

impl SerializerPolicy for PerStructSerializerPolicy {
    fn query_struct_name(&self, name: &str) -> StructSerializationStyle {
        if self.strongly_typed.contains(name) {
            StructSerializationStyle::StronglyTyped
        } else {
            StructSerializationStyle::Dict
        }
    }
}
