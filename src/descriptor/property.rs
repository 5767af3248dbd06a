use std::str::FromStr;

use byteorder::ByteOrder;
use log::debug;

use crate::argument::Argument;
use crate::boxing::{BoxingPolicy, NativeType};
use crate::error::{Error, Result};
use crate::marshal::Marshaller;
use crate::value::Value;
use crate::wire::{WireReader, WireWriter};

use super::{annotation_is_true, Annotations, DEPRECATED_ANNOTATION};

/// Access mode of a property, as named in introspection data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn is_readable(self) -> bool {
        self != Access::Write
    }

    pub fn is_writable(self) -> bool {
        self != Access::Read
    }
}

impl FromStr for Access {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read" => Ok(Access::Read),
            "write" => Ok(Access::Write),
            "readwrite" => Ok(Access::ReadWrite),
            other => Err(Error::mismatch(
                "access \"read\", \"write\" or \"readwrite\"",
                format!("{:?}", other),
            )),
        }
    }
}

/// A DBus property: one complete type read or written through the
/// `org.freedesktop.DBus.Properties` interface.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    name: String,
    interface: Option<String>,
    arg: Argument,
    access: Access,
    annotations: Annotations,
}

impl Property {
    pub fn new(name: impl Into<String>, arg: Argument, access: Access) -> Self {
        Property {
            name: name.into(),
            interface: None,
            arg,
            access,
            annotations: Annotations::default(),
        }
    }

    pub fn from_signature(name: impl Into<String>, signature: &str, access: Access) -> Result<Self> {
        Ok(Property::new(name, Argument::from_signature(signature)?, access))
    }

    /// A property typed after a native type, see [`Argument::from_native_type`].
    pub fn from_native_type(name: impl Into<String>, native: &NativeType, access: Access) -> Result<Self> {
        Ok(Property::new(name, Argument::from_native_type(native)?, access))
    }

    pub(crate) fn set_interface(&mut self, interface: &str) {
        self.interface = Some(interface.to_owned());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    pub fn argument(&self) -> &Argument {
        &self.arg
    }

    pub fn signature(&self) -> String {
        self.arg.signature()
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    pub fn is_deprecated(&self) -> bool {
        annotation_is_true(&self.annotations, DEPRECATED_ANNOTATION)
    }

    /// Native type of the property's accessors, boxed or not.
    pub fn native_type(&self, policy: &BoxingPolicy, boxed: bool) -> Result<NativeType> {
        policy.native_type(self.arg.root(), boxed)
    }

    /// Appends a new value for a writable property.
    pub fn marshal<B: ByteOrder>(
        &self,
        marshaller: &Marshaller<'_>,
        value: &Value,
        writer: &mut WireWriter<'_, B>,
    ) -> Result<()> {
        if !self.access.is_writable() {
            return Err(Error::mismatch("writable property", format!("read-only {}", self.name)));
        }
        debug!("property {}: marshalling '{}'", self.name, self.signature());
        marshaller.marshal_value(self.arg.root(), value, writer)
    }

    /// Reads the value of a readable property under the cursor.
    pub fn unmarshal<B: ByteOrder>(
        &self,
        marshaller: &Marshaller<'_>,
        reader: &WireReader<'_, B>,
    ) -> Result<Value> {
        if !self.access.is_readable() {
            return Err(Error::mismatch("readable property", format!("write-only {}", self.name)));
        }
        marshaller.unmarshal_value(self.arg.root(), reader)
    }
}
