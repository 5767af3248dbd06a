use byteorder::ByteOrder;
use log::debug;

use crate::argument::Argument;
use crate::error::{Error, Result};
use crate::marshal::Marshaller;
use crate::signature::parse_signature;
use crate::value::Value;
use crate::wire::{WireReader, WireWriter};

use super::{annotation_is_true, Annotations, DEPRECATED_ANNOTATION};

/// A DBus signal. Signal arguments have no direction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signal {
    name: String,
    interface: Option<String>,
    path: Option<String>,
    args: Vec<Argument>,
    annotations: Annotations,
}

impl Signal {
    pub fn new(name: impl Into<String>) -> Self {
        Signal {
            name: name.into(),
            ..Signal::default()
        }
    }

    pub fn from_signature(name: impl Into<String>, signature: &str) -> Result<Self> {
        let mut signal = Signal::new(name);
        for arg in parse_signature(signature)? {
            signal.add_argument(arg);
        }
        Ok(signal)
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
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

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.args
    }

    pub fn add_argument(&mut self, arg: Argument) {
        debug!("signal {}: adding argument '{}'", self.name, arg.signature());
        self.args.push(arg);
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

    pub fn argument_at_index(&self, index: usize) -> Result<&Argument> {
        self.args.get(index).ok_or(Error::IndexOutOfRange {
            index: index as isize,
            inputs: self.args.len(),
            outputs: 0,
        })
    }

    pub fn message_signature(&self) -> String {
        self.args.iter().map(Argument::signature).collect()
    }

    /// Appends one boxed value per argument.
    pub fn marshal<B: ByteOrder>(
        &self,
        marshaller: &Marshaller<'_>,
        values: &[Value],
        writer: &mut WireWriter<'_, B>,
    ) -> Result<()> {
        if values.len() != self.args.len() {
            return Err(Error::mismatch(
                format!("{} arguments to {}", self.args.len(), self.name),
                values.len(),
            ));
        }
        for (arg, value) in self.args.iter().zip(values) {
            marshaller.marshal_value(arg.root(), value, writer)?;
        }
        Ok(())
    }

    /// Reads every argument as a boxed value, advancing `reader`.
    pub fn unmarshal<B: ByteOrder>(
        &self,
        marshaller: &Marshaller<'_>,
        reader: &mut WireReader<'_, B>,
    ) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            values.push(marshaller.unmarshal_value(arg.root(), reader)?);
            reader.next()?;
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::Signal;
    use crate::boxing::BoxingPolicy;
    use crate::error::{Error, Result};
    use crate::marshal::Marshaller;
    use crate::message::Message;
    use crate::value::{Value, Variant};
    use byteorder::LE;
    use test_log::test;

    #[test]
    fn arguments() -> Result<()> {
        let signal = Signal::from_signature("NameOwnerChanged", "sss")?;
        assert_eq!(signal.message_signature(), "sss");
        assert_eq!(signal.argument_at_index(2)?.signature(), "s");
        assert_eq!(
            signal.argument_at_index(3).err(),
            Some(Error::IndexOutOfRange {
                index: 3,
                inputs: 3,
                outputs: 0
            })
        );
        Ok(())
    }

    #[test]
    fn round_trip() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);
        let signal = Signal::from_signature("PropertiesChanged", "sa{sv}as")?;
        let values = vec![
            Value::from("org.example.Foo"),
            Value::Array(vec![Value::dict_entry("Count", Variant::new(3u32)?)]),
            Value::Array(vec![]),
        ];

        let mut message = Message::new();
        signal.marshal(&marshaller, &values, &mut message.writer::<LE>())?;
        assert_eq!(message.signature_str()?, "sa{sv}as");

        let mut reader = message.reader::<LE>()?;
        assert_eq!(signal.unmarshal(&marshaller, &mut reader)?, values);
        reader.finish()?;

        assert!(signal
            .marshal(&marshaller, &values[..1], &mut message.writer::<LE>())
            .is_err());
        Ok(())
    }
}
