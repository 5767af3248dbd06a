
use byteorder::ByteOrder;
use log::{debug, trace};

use crate::argument::Argument;
use crate::boxing::{BoxedType, BoxingPolicy, BoxingState, NativeSignature, NativeType};
use crate::error::{Error, Result};
use crate::marshal::{CallRecord, Marshaller, Slot, RETURN_INDEX};
use crate::signature::parse_signature;
use crate::value::Value;
use crate::wire::{WireReader, WireWriter};

use super::{
    annotation_is_true, to_snake_case, Annotations, Direction, MessageKind,
    DEPRECATED_ANNOTATION, NO_REPLY_ANNOTATION,
};

/// A DBus method: its input and output arguments plus metadata.
///
/// Arguments are addressed by signed index: `0..` selects inputs, `-1` the
/// first output and `-(n + 1)` output `n`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Method {
    name: String,
    interface: Option<String>,
    path: Option<String>,
    inputs: Vec<Argument>,
    outputs: Vec<Argument>,
    annotations: Annotations,
}

impl Method {
    pub fn new(name: impl Into<String>) -> Self {
        Method {
            name: name.into(),
            ..Method::default()
        }
    }

    /// Builds a method from the concatenated signatures of its inputs and
    /// outputs, as found in introspection data.
    pub fn from_signatures(name: impl Into<String>, inputs: &str, outputs: &str) -> Result<Self> {
        let mut method = Method::new(name);
        for arg in parse_signature(inputs)? {
            method.add_argument(arg, Direction::In);
        }
        for arg in parse_signature(outputs)? {
            method.add_argument(arg, Direction::Out);
        }
        Ok(method)
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Object path of the object vending this method.
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

    pub fn inputs(&self) -> &[Argument] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Argument] {
        &self.outputs
    }

    pub fn add_argument(&mut self, arg: Argument, direction: Direction) {
        debug!(
            "method {}: adding {:?} argument '{}'",
            self.name,
            direction,
            arg.signature()
        );
        match direction {
            Direction::In => self.inputs.push(arg),
            Direction::Out => self.outputs.push(arg),
        }
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    /// Whether callers expect no reply.
    pub fn is_oneway(&self) -> bool {
        annotation_is_true(&self.annotations, NO_REPLY_ANNOTATION)
    }

    pub fn is_deprecated(&self) -> bool {
        annotation_is_true(&self.annotations, DEPRECATED_ANNOTATION)
    }

    pub fn argument_at_index(&self, index: isize) -> Result<&Argument> {
        let found = if index >= 0 {
            self.inputs.get(index as usize)
        } else {
            self.outputs.get((-(index + 1)) as usize)
        };
        found.ok_or(Error::IndexOutOfRange {
            index,
            inputs: self.inputs.len(),
            outputs: self.outputs.len(),
        })
    }

    /// Native parameter and return types. Several outputs are returned as one
    /// boxed struct, which has no unboxed form.
    pub fn native_call_signature(
        &self,
        policy: &BoxingPolicy,
        boxed: bool,
    ) -> Result<NativeSignature> {
        let args = self
            .inputs
            .iter()
            .map(|arg| policy.native_type(arg.root(), boxed))
            .collect::<Result<Vec<_>>>()?;
        let ret = match self.outputs.as_slice() {
            [] => NativeType::Void,
            [output] => policy.native_type(output.root(), boxed)?,
            _ if boxed => NativeType::Boxed(BoxedType::Struct),
            outputs => return Err(Error::UnrepresentableReturn(outputs.len())),
        };
        Ok(NativeSignature::new(args, ret))
    }

    /// Whether `sig` is exactly the boxed or unboxed native signature.
    pub fn matches_native_signature(
        &self,
        policy: &BoxingPolicy,
        sig: &NativeSignature,
        boxed: bool,
    ) -> bool {
        self.native_call_signature(policy, boxed)
            .map_or(false, |own| own == *sig)
    }

    /// Compares input `index` against parameter `sig_index` of a native
    /// signature.
    pub fn boxing_state_for_argument(
        &self,
        policy: &BoxingPolicy,
        index: usize,
        sig: &NativeSignature,
        sig_index: usize,
    ) -> BoxingState {
        match (self.inputs.get(index), sig.args.get(sig_index)) {
            (Some(arg), Some(native)) => policy.boxing_state(arg.root(), native),
            _ => BoxingState::Invalid,
        }
    }

    pub fn boxing_state_for_return(
        &self,
        policy: &BoxingPolicy,
        sig: &NativeSignature,
    ) -> BoxingState {
        match self.outputs.as_slice() {
            [] if sig.ret == NativeType::Void => BoxingState::Boxed,
            [output] => policy.boxing_state(output.root(), &sig.ret),
            [_, _, ..] if sig.ret == NativeType::Boxed(BoxedType::Struct) => BoxingState::Boxed,
            _ => BoxingState::Invalid,
        }
    }

    /// Whether every argument and the return value of `sig` can be resolved,
    /// each position boxed or unboxed independently.
    pub fn is_valid_for_signature(&self, policy: &BoxingPolicy, sig: &NativeSignature) -> bool {
        self.check_signature(policy, sig).is_ok()
    }

    /// Like [`is_valid_for_signature`](Method::is_valid_for_signature),
    /// naming the first position that does not match.
    pub fn check_signature(&self, policy: &BoxingPolicy, sig: &NativeSignature) -> Result<()> {
        if sig.args.len() != self.inputs.len() {
            return Err(Error::IncompatibleSignature(format!(
                "{} takes {} arguments, {} has {}",
                self.name,
                self.inputs.len(),
                sig,
                sig.args.len()
            )));
        }
        for i in 0..self.inputs.len() {
            if !self.boxing_state_for_argument(policy, i, sig, i).is_valid() {
                return Err(Error::IncompatibleSignature(format!(
                    "argument {} of {} is '{}', not {}",
                    i,
                    self.name,
                    self.inputs[i].signature(),
                    sig.args[i]
                )));
            }
        }
        if !self.boxing_state_for_return(policy, sig).is_valid() {
            return Err(Error::IncompatibleSignature(format!(
                "{} cannot return {}",
                self.name, sig.ret
            )));
        }
        Ok(())
    }

    /// Body signature of a call to, or a reply from, this method.
    pub fn message_signature(&self, kind: MessageKind) -> String {
        let args = match kind {
            MessageKind::MethodCall => &self.inputs,
            MessageKind::MethodReturn => &self.outputs,
        };
        args.iter().map(Argument::signature).collect()
    }

    pub fn native_name(&self) -> String {
        to_snake_case(&self.name)
    }

    /// A Rust declaration of the native method, e.g.
    /// `fn get_name_owner(&self, name: &str) -> &str;`
    pub fn declaration(&self, policy: &BoxingPolicy, boxed: bool) -> Result<String> {
        let sig = self.native_call_signature(policy, boxed)?;
        let mut out = String::new();
        if self.is_deprecated() {
            out.push_str("#[deprecated]\n");
        }
        out.push_str(&format!("fn {}(&self", self.native_name()));
        for (i, (arg, native)) in self.inputs.iter().zip(&sig.args).enumerate() {
            let name = match arg.name() {
                Some(name) => to_snake_case(name),
                None => format!("arg{}", i),
            };
            out.push_str(&format!(", {}: {}", name, native));
        }
        out.push(')');
        if sig.ret != NativeType::Void {
            out.push_str(&format!(" -> {}", sig.ret));
        }
        out.push(';');
        Ok(out)
    }

    fn boxing_for(&self, policy: &BoxingPolicy, arg: &Argument, native: &NativeType) -> Result<bool> {
        match policy.boxing_state(arg.root(), native) {
            BoxingState::Boxed => Ok(true),
            BoxingState::Unboxed => Ok(false),
            BoxingState::Invalid => Err(Error::IncompatibleSignature(format!(
                "'{}' of {} cannot be held as {}",
                arg.signature(),
                self.name,
                native
            ))),
        }
    }

    /// Reads a call's arguments into the argument slots of `record`, or a
    /// reply into its return slot, advancing `reader` past each value.
    pub fn unmarshal<B: ByteOrder>(
        &self,
        marshaller: &Marshaller<'_>,
        reader: &mut WireReader<'_, B>,
        record: &mut CallRecord,
        kind: MessageKind,
    ) -> Result<()> {
        let policy = marshaller.policy();
        trace!("unmarshalling {:?} of {}", kind, self.name);
        match kind {
            MessageKind::MethodCall => {
                for (i, arg) in self.inputs.iter().enumerate() {
                    let index = i as isize;
                    let boxing = self.boxing_for(policy, arg, record.native_type(index)?)?;
                    marshaller.unmarshal_into_record(arg.root(), reader, record, index, boxing)?;
                    reader.next()?;
                }
            }
            MessageKind::MethodReturn => match self.outputs.as_slice() {
                [] => {}
                [output] => {
                    let boxing =
                        self.boxing_for(policy, output, record.native_type(RETURN_INDEX)?)?;
                    marshaller.unmarshal_into_record(
                        output.root(),
                        reader,
                        record,
                        RETURN_INDEX,
                        boxing,
                    )?;
                    reader.next()?;
                }
                outputs => {
                    let mut fields = Vec::with_capacity(outputs.len());
                    for output in outputs {
                        fields.push(marshaller.unmarshal_value(output.root(), reader)?);
                        reader.next()?;
                    }
                    record.set(RETURN_INDEX, Slot::Value(Value::Struct(fields)))?;
                }
            },
        }
        Ok(())
    }

    /// Appends a call's arguments from `record`, or a reply from its return
    /// slot.
    pub fn marshal<B: ByteOrder>(
        &self,
        marshaller: &Marshaller<'_>,
        record: &CallRecord,
        writer: &mut WireWriter<'_, B>,
        kind: MessageKind,
    ) -> Result<()> {
        trace!("marshalling {:?} of {}", kind, self.name);
        match kind {
            MessageKind::MethodCall => {
                for (i, arg) in self.inputs.iter().enumerate() {
                    marshaller.marshal_from_record(arg.root(), record, i as isize, writer)?;
                }
            }
            MessageKind::MethodReturn => match self.outputs.as_slice() {
                [] => {}
                [output] => {
                    marshaller.marshal_from_record(output.root(), record, RETURN_INDEX, writer)?
                }
                outputs => {
                    let fields = match record.ret() {
                        Slot::Value(Value::Struct(fields)) if fields.len() == outputs.len() => {
                            fields
                        }
                        other => {
                            return Err(Error::mismatch(
                                format!("struct of {} return values", outputs.len()),
                                format!("{:?}", other),
                            ))
                        }
                    };
                    for (output, field) in outputs.iter().zip(fields) {
                        marshaller.marshal_value(output.root(), field, writer)?;
                    }
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Method;
    use crate::argument::Argument;
    use crate::boxing::{BoxedType, BoxingPolicy, BoxingState, NativeSignature, NativeType, Word};
    use crate::descriptor::{Direction, MessageKind, DEPRECATED_ANNOTATION, NO_REPLY_ANNOTATION};
    use crate::error::{Error, Result};
    use crate::marshal::{CallRecord, Marshaller, Slot, RETURN_INDEX};
    use crate::message::Message;
    use crate::value::Value;
    use byteorder::LE;
    use test_log::test;

    #[test]
    fn index_convention() -> Result<()> {
        let method = Method::from_signatures("Frob", "is", "u")?;
        assert_eq!(method.argument_at_index(0)?.signature(), "i");
        assert_eq!(method.argument_at_index(1)?.signature(), "s");
        assert_eq!(method.argument_at_index(-1)?.signature(), "u");
        assert_eq!(
            method.argument_at_index(2).err(),
            Some(Error::IndexOutOfRange {
                index: 2,
                inputs: 2,
                outputs: 1
            })
        );
        assert!(method.argument_at_index(-2).is_err());
        Ok(())
    }

    #[test]
    fn annotations() {
        let mut method = Method::new("Ping");
        assert!(!method.is_oneway());
        method.annotate(NO_REPLY_ANNOTATION, "true");
        method.annotate(DEPRECATED_ANNOTATION, "false");
        assert!(method.is_oneway());
        assert!(!method.is_deprecated());
    }

    #[test]
    fn native_signatures() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let method = Method::from_signatures("GetNameOwner", "s", "s")?;
        assert_eq!(
            method.native_call_signature(&policy, false)?,
            NativeSignature::new(vec![NativeType::Str], NativeType::Str)
        );
        assert_eq!(
            method.native_call_signature(&policy, true)?,
            NativeSignature::new(
                vec![NativeType::Boxed(BoxedType::String)],
                NativeType::Boxed(BoxedType::String)
            )
        );

        let pair = Method::from_signatures("Pair", "", "ii")?;
        assert_eq!(
            pair.native_call_signature(&policy, true)?.ret,
            NativeType::Boxed(BoxedType::Struct)
        );
        assert_eq!(
            pair.native_call_signature(&policy, false),
            Err(Error::UnrepresentableReturn(2))
        );

        let none = Method::from_signatures("Quit", "", "")?;
        assert_eq!(none.native_call_signature(&policy, false)?.ret, NativeType::Void);
        Ok(())
    }

    #[test]
    fn mixed_boxing_is_valid() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let method = Method::from_signatures("Set", "sa{sv}i", "b")?;
        let sig = NativeSignature::new(
            vec![
                NativeType::Boxed(BoxedType::String),
                NativeType::Boxed(BoxedType::Dictionary),
                NativeType::I32,
            ],
            NativeType::Bool,
        );
        assert_eq!(
            method.boxing_state_for_argument(&policy, 0, &sig, 0),
            BoxingState::Boxed
        );
        assert_eq!(
            method.boxing_state_for_argument(&policy, 2, &sig, 2),
            BoxingState::Unboxed
        );
        assert_eq!(
            method.boxing_state_for_argument(&policy, 2, &sig, 0),
            BoxingState::Invalid
        );
        assert_eq!(method.boxing_state_for_return(&policy, &sig), BoxingState::Unboxed);
        assert!(method.is_valid_for_signature(&policy, &sig));
        assert!(!method.matches_native_signature(&policy, &sig, true));

        let wrong = NativeSignature::new(sig.args.clone(), NativeType::U32);
        assert!(!method.is_valid_for_signature(&policy, &wrong));
        assert!(matches!(
            method.check_signature(&policy, &wrong),
            Err(Error::IncompatibleSignature(_))
        ));
        Ok(())
    }

    #[test]
    fn declarations() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let mut method = Method::new("GetNameOwner");
        method.add_argument(Argument::named("s", "BusName")?, Direction::In);
        method.add_argument(Argument::from_signature("s")?, Direction::Out);
        assert_eq!(method.native_name(), "get_name_owner");
        assert_eq!(
            method.declaration(&policy, false)?,
            "fn get_name_owner(&self, bus_name: &str) -> &str;"
        );
        method.annotate(DEPRECATED_ANNOTATION, "true");
        assert!(method.declaration(&policy, true)?.starts_with("#[deprecated]\n"));
        Ok(())
    }

    #[test]
    fn calls_round_trip() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);
        let method = Method::from_signatures("Frob", "ias", "")?;
        assert_eq!(method.message_signature(MessageKind::MethodCall), "ias");

        let sig = NativeSignature::new(
            vec![NativeType::I32, NativeType::Boxed(BoxedType::Array)],
            NativeType::Void,
        );
        let mut record = CallRecord::new(sig);
        record.set(0, Slot::Word(Word::from_i32(-5)))?;
        record.set(1, Slot::Value(vec!["a", "b"].into()))?;

        let mut message = Message::new();
        method.marshal(&marshaller, &record, &mut message.writer::<LE>(), MessageKind::MethodCall)?;
        assert_eq!(message.signature_str()?, "ias");

        let mut decoded = CallRecord::new(record.signature().clone());
        let mut reader = message.reader::<LE>()?;
        method.unmarshal(&marshaller, &mut reader, &mut decoded, MessageKind::MethodCall)?;
        reader.finish()?;
        assert_eq!(decoded, record);
        Ok(())
    }

    #[test]
    fn several_outputs_travel_as_a_struct() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);
        let method = Method::from_signatures("Pair", "", "is")?;
        let sig = method.native_call_signature(&policy, true)?;

        let mut record = CallRecord::new(sig.clone());
        let pair = Value::Struct(vec![7i32.into(), "seven".into()]);
        record.set(RETURN_INDEX, Slot::Value(pair.clone()))?;

        let mut message = Message::new();
        method.marshal(&marshaller, &record, &mut message.writer::<LE>(), MessageKind::MethodReturn)?;
        assert_eq!(message.signature_str()?, "is");

        let mut decoded = CallRecord::new(sig);
        let mut reader = message.reader::<LE>()?;
        method.unmarshal(&marshaller, &mut reader, &mut decoded, MessageKind::MethodReturn)?;
        assert_eq!(decoded.ret(), &Slot::Value(pair));
        Ok(())
    }

    #[test]
    fn incompatible_records_are_rejected() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);
        let method = Method::from_signatures("Frob", "i", "")?;
        let message = Message::from_parts(vec![1, 0, 0, 0], "i");
        let mut record = CallRecord::new(NativeSignature::new(vec![NativeType::Str], NativeType::Void));
        let mut reader = message.reader::<LE>()?;
        assert!(matches!(
            method.unmarshal(&marshaller, &mut reader, &mut record, MessageKind::MethodCall),
            Err(Error::IncompatibleSignature(_))
        ));
        Ok(())
    }
}
