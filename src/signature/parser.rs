use crate::argument::{Node, NodeId};

use super::{SignatureError, TypeCode, MAX_CONTAINER_DEPTH};

#[derive(Clone, Copy, Default)]
struct Depth {
    arrays: usize,
    structs: usize,
}

impl Depth {
    fn enter_array(self) -> Result<Depth, SignatureError> {
        if self.arrays == MAX_CONTAINER_DEPTH {
            return Err(SignatureError::ExceededMaximumArrayRecursion);
        }
        Ok(Depth {
            arrays: self.arrays + 1,
            ..self
        })
    }

    fn enter_struct(self) -> Result<Depth, SignatureError> {
        if self.structs == MAX_CONTAINER_DEPTH {
            return Err(SignatureError::ExceededMaximumStructRecursion);
        }
        Ok(Depth {
            structs: self.structs + 1,
            ..self
        })
    }
}

/// Recursive descent over a signature, one complete type at a time.
pub(crate) struct Parser<'s> {
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> Parser<'s> {
    pub(crate) fn new(bytes: &'s [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Parses the next complete type into a fresh arena whose root is the
    /// first node.
    pub(crate) fn next_complete_type(&mut self) -> Result<Vec<Node>, SignatureError> {
        let mut nodes = Vec::new();
        self.complete_type(&mut nodes, None, false, Depth::default())?;
        Ok(nodes)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn complete_type(
        &mut self,
        nodes: &mut Vec<Node>,
        parent: Option<NodeId>,
        in_array: bool,
        depth: Depth,
    ) -> Result<NodeId, SignatureError> {
        let b = match self.peek() {
            Some(b) => b,
            None if in_array => return Err(SignatureError::MissingArrayElementType),
            None => return Err(SignatureError::Empty),
        };

        let code = match TypeCode::from_byte(b) {
            Some(code) => code,
            None if in_array && (b == b')' || b == b'}') => {
                return Err(SignatureError::MissingArrayElementType)
            }
            None if b == b')' => return Err(SignatureError::StructEndedButNotStarted),
            None if b == b'}' => return Err(SignatureError::DictEntryEndedButNotStarted),
            None => return Err(SignatureError::UnknownTypeCode(b as char)),
        };
        self.pos += 1;

        let id = push(nodes, code, parent);

        match code {
            TypeCode::Array => {
                self.complete_type(nodes, Some(id), true, depth.enter_array()?)?;
            }
            TypeCode::Struct => {
                let depth = depth.enter_struct()?;
                loop {
                    match self.peek() {
                        None => return Err(SignatureError::StructStartedButNotEnded),
                        Some(b')') => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => {
                            self.complete_type(nodes, Some(id), false, depth)?;
                        }
                    }
                }
                if nodes[id.index()].children.is_empty() {
                    return Err(SignatureError::StructHasNoFields);
                }
            }
            TypeCode::DictEntry => {
                if !in_array {
                    return Err(SignatureError::DictEntryNotInsideArray);
                }
                let depth = depth.enter_struct()?;
                self.dict_entry_fields(nodes, id, depth)?;
            }
            _ => {}
        }

        Ok(id)
    }

    fn dict_entry_fields(
        &mut self,
        nodes: &mut Vec<Node>,
        id: NodeId,
        depth: Depth,
    ) -> Result<(), SignatureError> {
        match self.peek() {
            None => return Err(SignatureError::DictEntryStartedButNotEnded),
            Some(b'}') => return Err(SignatureError::DictEntryHasNoFields),
            Some(b) => {
                if TypeCode::from_byte(b).map_or(false, TypeCode::is_container) {
                    return Err(SignatureError::DictKeyMustBeBasicType);
                }
            }
        }
        self.complete_type(nodes, Some(id), false, depth)?;

        match self.peek() {
            None => return Err(SignatureError::DictEntryStartedButNotEnded),
            Some(b'}') => return Err(SignatureError::DictEntryHasOnlyOneField),
            Some(_) => {}
        }
        self.complete_type(nodes, Some(id), false, depth)?;

        match self.peek() {
            None => Err(SignatureError::DictEntryStartedButNotEnded),
            Some(b'}') => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(SignatureError::DictEntryHasTooManyFields),
        }
    }
}

fn push(nodes: &mut Vec<Node>, code: TypeCode, parent: Option<NodeId>) -> NodeId {
    let id = NodeId::new(nodes.len());
    nodes.push(Node {
        code,
        name: None,
        parent,
        children: Vec::new(),
    });
    if let Some(parent) = parent {
        nodes[parent.index()].children.push(id);
    }
    id
}
