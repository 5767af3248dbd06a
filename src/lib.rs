//! Signature-driven marshalling of DBus arguments.
//!
//! This crate moves typed argument data between DBus message bodies and
//! Rust values. Actually sending the messages is outside of the scope
//! of this crate; it deals only in message bodies and their signatures.
//!
//! The pieces, bottom up:
//!
//! * The [`signature`] module parses DBus type signatures into
//!   [`Argument`]s, each an arena of typed nodes that can be walked as a
//!   tree (array elements, struct fields, dictionary keys and values).
//! * The [`wire`] module holds a cursor for reading a body,
//!   [`WireReader`], and an appender for writing one, [`WireWriter`].
//! * A [`BoxingPolicy`] decides, per type code, whether a value travels
//!   as a native scalar ("unboxed") or as a [`Value`] ("boxed"), and which
//!   native type stands for each DBus type.
//! * The [`Marshaller`] converts between the wire and boxed or unboxed
//!   values, driven by an argument's node tree.
//! * [`Method`], [`Signal`], [`Property`] and [`Interface`] describe DBus
//!   members, check native call signatures against them, and marshal whole
//!   calls through a [`CallRecord`].
//!
//! On top of that, the [`ser`] and [`de`] modules provide [serde] support:
//! any `Serialize` type can be turned into a [`Value`] or a [`Message`],
//! and back with `Deserialize`. DBus allows for the same data to be
//! serialized in different ways, and this can be configured via the
//! [`serializer_policy`] module and [`serialize_with_policy`].
//!
//! [serde]: https://serde.rs
//! [`serializer_policy`]: crate::ser::serializer_policy
//! [`serialize_with_policy`]: crate::ser::serialize_with_policy()
//! [`CallRecord`]: crate::marshal::CallRecord

mod align;
pub mod argument;
pub mod boxing;
pub mod de;
pub mod descriptor;
pub mod error;
pub mod marshal;
pub mod message;
mod primitives;
pub mod ser;
pub mod signature;
pub mod value;
pub mod wire;

pub use argument::{Argument, ArgumentRef};
pub use boxing::BoxingPolicy;
pub use de::{from_message, from_value};
pub use descriptor::{Interface, Method, Property, Signal};
pub use error::{Error, Result};
pub use marshal::Marshaller;
pub use message::Message;
pub use ser::{serialize, serialize_with_policy, to_value};
pub use value::{Value, Variant};
pub use wire::{WireReader, WireWriter};
