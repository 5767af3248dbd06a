//! Typed argument trees produced by the signature grammar.
//!
//! Every [`Argument`] owns its nodes in a flat arena. Children and parent
//! links are [`NodeId`] indices into that arena, so a tree never owns its
//! parent and can be shared read-only across threads once built.

use std::fmt;

use crate::boxing::{BoxedType, NativeType};
use crate::error::{Error, Result};
use crate::signature::{self, TypeCode};

/// Index of a node within the [`Argument`] that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Node {
    pub(crate) code: TypeCode,
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// One complete type, e.g. the type of a single method argument.
#[derive(Clone, PartialEq)]
pub struct Argument {
    nodes: Vec<Node>,
}

impl Argument {
    /// Builds an argument from a signature holding exactly one complete type.
    pub fn from_signature(signature: &str) -> Result<Self> {
        let nodes = signature::parse_single(signature).map_err(|reason| {
            Error::MalformedSignature {
                signature: signature.to_owned(),
                reason,
            }
        })?;
        Ok(Argument::from_nodes(nodes))
    }

    /// Like [`from_signature`](Argument::from_signature), naming the argument.
    pub fn named(signature: &str, name: impl Into<String>) -> Result<Self> {
        Ok(Argument::from_signature(signature)?.with_name(name))
    }

    /// Builds the argument a native type stands for.
    ///
    /// Scalars map to their standard wire types and `&str` to a string.
    /// Typed arrays, structs and dictionaries map child for child. Of the
    /// untyped boxed kinds only strings, object paths, signatures and
    /// variants name a single wire type.
    pub fn from_native_type(native: &NativeType) -> Result<Self> {
        let mut signature = String::new();
        write_native_signature(native, &mut signature)?;
        Argument::from_signature(&signature)
    }

    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        debug_assert!(!nodes.is_empty(), "argument arena without a root");
        Argument { nodes }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.nodes[0].name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.root().name()
    }

    pub fn root(&self) -> ArgumentRef<'_> {
        ArgumentRef {
            arg: self,
            id: NodeId(0),
        }
    }

    /// Looks up a node of this tree, `None` if `id` belongs to another tree.
    pub fn node(&self, id: NodeId) -> Option<ArgumentRef<'_>> {
        if id.index() < self.nodes.len() {
            Some(ArgumentRef { arg: self, id })
        } else {
            None
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn code(&self) -> TypeCode {
        self.root().code()
    }

    pub fn signature(&self) -> String {
        self.root().wire_signature()
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("name", &self.name())
            .field("signature", &self.signature())
            .finish()
    }
}

fn write_native_signature(native: &NativeType, out: &mut String) -> Result<()> {
    let code = match native {
        NativeType::Byte => TypeCode::Byte,
        NativeType::Bool => TypeCode::Boolean,
        NativeType::I16 => TypeCode::Int16,
        NativeType::U16 => TypeCode::UInt16,
        NativeType::I32 => TypeCode::Int32,
        NativeType::U32 => TypeCode::UInt32,
        NativeType::I64 => TypeCode::Int64,
        NativeType::U64 => TypeCode::UInt64,
        NativeType::F64 => TypeCode::Double,
        NativeType::Str | NativeType::Boxed(BoxedType::String) => TypeCode::String,
        NativeType::Boxed(BoxedType::ObjectPath) => TypeCode::ObjectPath,
        NativeType::Boxed(BoxedType::Signature) => TypeCode::Signature,
        NativeType::Boxed(BoxedType::Variant) => TypeCode::Variant,
        NativeType::Array(element) => {
            out.push('a');
            return write_native_signature(element, out);
        }
        NativeType::Struct(fields) => {
            out.push('(');
            for field in fields {
                write_native_signature(field, out)?;
            }
            out.push(')');
            return Ok(());
        }
        NativeType::Dict(key, value) => {
            out.push_str("a{");
            write_native_signature(key, out)?;
            write_native_signature(value, out)?;
            out.push('}');
            return Ok(());
        }
        other => return Err(Error::mismatch("native type with a wire type", other)),
    };
    out.push(code.as_char());
    Ok(())
}

/// A borrowed view of one node of an [`Argument`].
#[derive(Clone, Copy)]
pub struct ArgumentRef<'a> {
    arg: &'a Argument,
    id: NodeId,
}

impl<'a> ArgumentRef<'a> {
    fn node(&self) -> &'a Node {
        &self.arg.nodes[self.id.index()]
    }

    fn at(&self, id: NodeId) -> ArgumentRef<'a> {
        ArgumentRef { arg: self.arg, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn argument(&self) -> &'a Argument {
        self.arg
    }

    pub fn code(&self) -> TypeCode {
        self.node().code
    }

    pub fn name(&self) -> Option<&'a str> {
        self.node().name.as_deref()
    }

    pub fn is_container(&self) -> bool {
        self.code().is_container()
    }

    /// Whether this node sits inside another node rather than directly in a
    /// method or signal.
    pub fn is_sub_argument(&self) -> bool {
        self.node().parent.is_some()
    }

    pub fn parent(&self) -> Option<ArgumentRef<'a>> {
        self.node().parent.map(|id| self.at(id))
    }

    pub fn children(&self) -> impl Iterator<Item = ArgumentRef<'a>> + 'a {
        let arg = self.arg;
        self.node()
            .children
            .iter()
            .map(move |&id| ArgumentRef { arg, id })
    }

    pub fn child(&self, n: usize) -> Option<ArgumentRef<'a>> {
        self.node().children.get(n).map(|&id| self.at(id))
    }

    /// The element type of an array.
    pub fn element(&self) -> Option<ArgumentRef<'a>> {
        match self.code() {
            TypeCode::Array => self.child(0),
            _ => None,
        }
    }

    /// The key type of a dict entry.
    pub fn key(&self) -> Option<ArgumentRef<'a>> {
        match self.code() {
            TypeCode::DictEntry => self.child(0),
            _ => None,
        }
    }

    /// The value type of a dict entry.
    pub fn value(&self) -> Option<ArgumentRef<'a>> {
        match self.code() {
            TypeCode::DictEntry => self.child(1),
            _ => None,
        }
    }

    /// An array of dict entries.
    pub fn is_dictionary(&self) -> bool {
        self.element()
            .map_or(false, |e| e.code() == TypeCode::DictEntry)
    }

    /// The canonical signature of this sub-tree.
    pub fn wire_signature(&self) -> String {
        let mut out = String::new();
        self.write_signature(&mut out);
        out
    }

    fn write_signature(&self, out: &mut String) {
        out.push(self.code().as_char());
        for child in self.children() {
            child.write_signature(out);
        }
        if let Some(close) = self.code().closing() {
            out.push(close as char);
        }
    }

    /// Native representation used when the value is not boxed. Containers are
    /// always boxed.
    pub fn unboxed_type(&self) -> NativeType {
        match self.code() {
            TypeCode::Byte => NativeType::Byte,
            TypeCode::Boolean => NativeType::Bool,
            TypeCode::Int16 => NativeType::I16,
            TypeCode::UInt16 => NativeType::U16,
            TypeCode::Int32 => NativeType::I32,
            TypeCode::UInt32 => NativeType::U32,
            TypeCode::Int64 => NativeType::I64,
            TypeCode::UInt64 => NativeType::U64,
            TypeCode::Double => NativeType::F64,
            TypeCode::String | TypeCode::ObjectPath | TypeCode::Signature => NativeType::Str,
            _ => NativeType::Boxed(self.container_boxed_type()),
        }
    }

    pub fn unboxed_size(&self) -> usize {
        self.unboxed_type().size()
    }

    pub fn boxed_type(&self) -> Option<BoxedType> {
        let boxed = match self.code() {
            TypeCode::Byte
            | TypeCode::Int16
            | TypeCode::UInt16
            | TypeCode::Int32
            | TypeCode::UInt32
            | TypeCode::Int64
            | TypeCode::UInt64
            | TypeCode::Double => BoxedType::Number,
            TypeCode::Boolean => BoxedType::Boolean,
            TypeCode::String => BoxedType::String,
            TypeCode::ObjectPath => BoxedType::ObjectPath,
            TypeCode::Signature => BoxedType::Signature,
            _ => self.container_boxed_type(),
        };
        Some(boxed)
    }

    fn container_boxed_type(&self) -> BoxedType {
        match self.code() {
            TypeCode::Array if self.is_dictionary() => BoxedType::Dictionary,
            TypeCode::Array => BoxedType::Array,
            TypeCode::Struct | TypeCode::DictEntry => BoxedType::Struct,
            _ => BoxedType::Variant,
        }
    }
}

impl fmt::Debug for ArgumentRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentRef")
            .field("id", &self.id)
            .field("signature", &self.wire_signature())
            .finish()
    }
}
