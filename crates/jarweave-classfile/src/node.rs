//! Editable structural form of a class file

use crate::encoder::{ByteReader, ByteWriter, DecodeError, EncodeError};
use crate::verify::VerifyError;
use crate::name::ClassName;
use crate::verify::argument_slots;
use thiserror::Error;

/// Class file magic number
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Newest major version the codec accepts
pub const MAX_MAJOR_VERSION: u16 = 65;

/// Major version given to freshly created classes
pub const DEFAULT_MAJOR_VERSION: u16 = 52;

/// Class file encoding/decoding errors
#[derive(Debug, Error)]
pub enum ClassFileError {
    /// Truncated or otherwise malformed data
    #[error("Malformed class data: {0}")]
    Malformed(#[from] DecodeError),

    /// Class does not fit the binary layout
    #[error("Cannot encode class: {0}")]
    Encode(#[from] EncodeError),

    /// Decoded class fails structural verification
    #[error("Invalid class structure: {0}")]
    Invalid(#[from] VerifyError),

    /// Invalid magic number
    #[error("Invalid magic number: expected 0xCAFEBABE, got {0:#010x}")]
    InvalidMagic(u32),

    /// Unsupported class file version
    #[error("Unsupported class file version {major}.{minor} (newest supported: {MAX_MAJOR_VERSION})")]
    UnsupportedVersion { major: u16, minor: u16 },
}

/// Access flags shared by classes, fields and methods
pub mod access {
    /// Declared public
    pub const PUBLIC: u16 = 0x0001;
    /// Declared private
    pub const PRIVATE: u16 = 0x0002;
    /// Declared protected
    pub const PROTECTED: u16 = 0x0004;
    /// Declared static
    pub const STATIC: u16 = 0x0008;
    /// Declared final
    pub const FINAL: u16 = 0x0010;
    /// Treat superclass methods specially on invokespecial
    pub const SUPER: u16 = 0x0020;
    /// Declared native
    pub const NATIVE: u16 = 0x0100;
    /// Is an interface
    pub const INTERFACE: u16 = 0x0200;
    /// Declared abstract
    pub const ABSTRACT: u16 = 0x0400;
    /// Not present in source
    pub const SYNTHETIC: u16 = 0x1000;
}

/// Options for [`ClassNode::encode_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Raise each method's `max_locals` to cover its declared arguments
    pub compute_maxs: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self { compute_maxs: true }
    }
}

/// A named attribute with an opaque payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Raw attribute payload
    pub data: Vec<u8>,
}

impl Attribute {
    /// Create an attribute
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    fn encode(&self, writer: &mut ByteWriter) -> Result<(), EncodeError> {
        writer.emit_str(&self.name)?;
        writer.emit_blob(&self.data)
    }

    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_str()?;
        let data = reader.read_blob()?;
        Ok(Self { name, data })
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    /// Access flags
    pub access: u16,
    /// Field name
    pub name: String,
    /// Field type descriptor (`I`, `Ljava/lang/String;`, ...)
    pub descriptor: String,
    /// Field attributes
    pub attributes: Vec<Attribute>,
}

impl FieldNode {
    /// Create a field with no attributes
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            attributes: Vec::new(),
        }
    }

    fn encode(&self, writer: &mut ByteWriter) -> Result<(), EncodeError> {
        writer.emit_u16(self.access);
        writer.emit_str(&self.name)?;
        writer.emit_str(&self.descriptor)?;
        encode_attributes(&self.attributes, writer)
    }

    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let access = reader.read_u16()?;
        let name = reader.read_str()?;
        let descriptor = reader.read_str()?;
        let attributes = decode_attributes(reader)?;
        Ok(Self {
            access,
            name,
            descriptor,
            attributes,
        })
    }
}

/// Method definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNode {
    /// Access flags
    pub access: u16,
    /// Method name
    pub name: String,
    /// Method descriptor (`(ILjava/lang/String;)V`)
    pub descriptor: String,
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// Method body; empty for abstract and native methods
    pub code: Vec<u8>,
    /// Method attributes
    pub attributes: Vec<Attribute>,
}

impl MethodNode {
    /// Create a method with an empty body
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            max_stack: 0,
            max_locals: 0,
            code: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Whether the method is declared static
    pub fn is_static(&self) -> bool {
        self.access & access::STATIC != 0
    }

    /// Local slots taken by the receiver and declared arguments
    ///
    /// Returns `None` if the descriptor is malformed.
    pub fn argument_locals(&self) -> Option<u16> {
        let receiver = if self.is_static() { 0 } else { 1 };
        let slots = argument_slots(&self.descriptor)? + receiver;
        u16::try_from(slots).ok()
    }

    fn encode(&self, writer: &mut ByteWriter, options: WriterOptions) -> Result<(), EncodeError> {
        let max_locals = if options.compute_maxs {
            self.argument_locals()
                .map_or(self.max_locals, |needed| self.max_locals.max(needed))
        } else {
            self.max_locals
        };

        writer.emit_u16(self.access);
        writer.emit_str(&self.name)?;
        writer.emit_str(&self.descriptor)?;
        writer.emit_u16(self.max_stack);
        writer.emit_u16(max_locals);
        writer.emit_blob(&self.code)?;
        encode_attributes(&self.attributes, writer)
    }

    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let access = reader.read_u16()?;
        let name = reader.read_str()?;
        let descriptor = reader.read_str()?;
        let max_stack = reader.read_u16()?;
        let max_locals = reader.read_u16()?;
        let code = reader.read_blob()?;
        let attributes = decode_attributes(reader)?;
        Ok(Self {
            access,
            name,
            descriptor,
            max_stack,
            max_locals,
            code,
            attributes,
        })
    }
}

/// A decoded class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNode {
    /// Minor version
    pub minor_version: u16,
    /// Major version
    pub major_version: u16,
    /// Access flags
    pub access: u16,
    /// Internal name (`com/example/Foo`)
    pub name: String,
    /// Internal name of the superclass; `None` only for `java/lang/Object`
    pub super_name: Option<String>,
    /// Internal names of implemented interfaces
    pub interfaces: Vec<String>,
    /// Field definitions
    pub fields: Vec<FieldNode>,
    /// Method definitions
    pub methods: Vec<MethodNode>,
    /// Class attributes
    pub attributes: Vec<Attribute>,
}

impl ClassNode {
    /// Create an empty public class extending `java/lang/Object`
    pub fn new(name: &str) -> Self {
        Self {
            minor_version: 0,
            major_version: DEFAULT_MAJOR_VERSION,
            access: access::PUBLIC | access::SUPER,
            name: ClassName::new(name).internal(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Normalized name of this class
    pub fn class_name(&self) -> ClassName {
        ClassName::new(&self.name)
    }

    /// Find a method by name and descriptor
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodNode> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Find a method by name and descriptor for editing
    pub fn method_mut(&mut self, name: &str, descriptor: &str) -> Option<&mut MethodNode> {
        self.methods
            .iter_mut()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find a class attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Encode with default [`WriterOptions`]
    pub fn encode(&self) -> Result<Vec<u8>, ClassFileError> {
        self.encode_with(WriterOptions::default())
    }

    /// Encode the class to its binary form
    ///
    /// Layout:
    /// - Header: magic (u32) + minor (u16) + major (u16)
    /// - access, this class, optional super class, interfaces
    /// - Field table, method table, class attributes
    pub fn encode_with(&self, options: WriterOptions) -> Result<Vec<u8>, ClassFileError> {
        let mut writer = ByteWriter::with_capacity(256);

        writer.emit_u32(MAGIC);
        writer.emit_u16(self.minor_version);
        writer.emit_u16(self.major_version);

        writer.emit_u16(self.access);
        writer.emit_str(&self.name)?;
        match &self.super_name {
            Some(super_name) => {
                writer.emit_u8(1);
                writer.emit_str(super_name)?;
            }
            None => writer.emit_u8(0),
        }

        writer.emit_count(self.interfaces.len())?;
        for interface in &self.interfaces {
            writer.emit_str(interface)?;
        }

        writer.emit_count(self.fields.len())?;
        for field in &self.fields {
            field.encode(&mut writer)?;
        }

        writer.emit_count(self.methods.len())?;
        for method in &self.methods {
            method.encode(&mut writer, options)?;
        }

        encode_attributes(&self.attributes, &mut writer)?;

        Ok(writer.into_bytes())
    }

    /// Decode a class from its binary form
    pub fn decode(data: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = ByteReader::new(data);

        let magic = reader.read_u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::InvalidMagic(magic));
        }

        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;
        if major_version > MAX_MAJOR_VERSION {
            return Err(ClassFileError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let access = reader.read_u16()?;
        let name = reader.read_str()?;
        let super_name = if reader.read_u8()? != 0 {
            Some(reader.read_str()?)
        } else {
            None
        };

        let interface_count = reader.read_u16()? as usize;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            interfaces.push(reader.read_str()?);
        }

        let field_count = reader.read_u16()? as usize;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(FieldNode::decode(&mut reader)?);
        }

        let method_count = reader.read_u16()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            methods.push(MethodNode::decode(&mut reader)?);
        }

        let attributes = decode_attributes(&mut reader)?;
        reader.finish()?;

        Ok(Self {
            minor_version,
            major_version,
            access,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }
}

fn encode_attributes(attributes: &[Attribute], writer: &mut ByteWriter) -> Result<(), EncodeError> {
    writer.emit_count(attributes.len())?;
    for attribute in attributes {
        attribute.encode(writer)?;
    }
    Ok(())
}

fn decode_attributes(reader: &mut ByteReader<'_>) -> Result<Vec<Attribute>, DecodeError> {
    let count = reader.read_u16()? as usize;
    let mut attributes = Vec::with_capacity(count);
    for _ in 0..count {
        attributes.push(Attribute::decode(reader)?);
    }
    Ok(attributes)
}
