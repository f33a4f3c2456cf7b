//! Structural class verification
//!
//! Checks the invariants a transformed class must keep before it is
//! re-encoded: well-formed names and descriptors, no duplicate members,
//! and bodies only where the access flags allow one.

use crate::node::{access, ClassNode, MethodNode};
use std::collections::HashSet;

/// Class verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Class, member or interface name is empty or malformed
    #[error("Invalid name '{0}'")]
    InvalidName(String),

    /// Field descriptor could not be parsed
    #[error("Invalid field descriptor '{descriptor}' on field '{field}'")]
    InvalidFieldDescriptor { field: String, descriptor: String },

    /// Method descriptor could not be parsed
    #[error("Invalid method descriptor '{descriptor}' on method '{method}'")]
    InvalidMethodDescriptor { method: String, descriptor: String },

    /// Two fields share a name and descriptor
    #[error("Duplicate field {name}:{descriptor}")]
    DuplicateField { name: String, descriptor: String },

    /// Two methods share a name and descriptor
    #[error("Duplicate method {name}{descriptor}")]
    DuplicateMethod { name: String, descriptor: String },

    /// Abstract or native method carries a body
    #[error("Method {name}{descriptor} is abstract or native but has code")]
    UnexpectedCode { name: String, descriptor: String },
}

/// Verify a decoded class
pub fn verify_class(class: &ClassNode) -> Result<(), VerifyError> {
    if !is_internal_name(&class.name) {
        return Err(VerifyError::InvalidName(class.name.clone()));
    }
    if let Some(super_name) = &class.super_name {
        if !is_internal_name(super_name) {
            return Err(VerifyError::InvalidName(super_name.clone()));
        }
    }
    for interface in &class.interfaces {
        if !is_internal_name(interface) {
            return Err(VerifyError::InvalidName(interface.clone()));
        }
    }

    let mut seen = HashSet::new();
    for field in &class.fields {
        if !is_member_name(&field.name) {
            return Err(VerifyError::InvalidName(field.name.clone()));
        }
        if !is_field_descriptor(&field.descriptor) {
            return Err(VerifyError::InvalidFieldDescriptor {
                field: field.name.clone(),
                descriptor: field.descriptor.clone(),
            });
        }
        if !seen.insert((field.name.as_str(), field.descriptor.as_str())) {
            return Err(VerifyError::DuplicateField {
                name: field.name.clone(),
                descriptor: field.descriptor.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for method in &class.methods {
        verify_method(method)?;
        if !seen.insert((method.name.as_str(), method.descriptor.as_str())) {
            return Err(VerifyError::DuplicateMethod {
                name: method.name.clone(),
                descriptor: method.descriptor.clone(),
            });
        }
    }

    Ok(())
}

fn verify_method(method: &MethodNode) -> Result<(), VerifyError> {
    let special = method.name == "<init>" || method.name == "<clinit>";
    if !special && !is_member_name(&method.name) {
        return Err(VerifyError::InvalidName(method.name.clone()));
    }
    if argument_slots(&method.descriptor).is_none() {
        return Err(VerifyError::InvalidMethodDescriptor {
            method: method.name.clone(),
            descriptor: method.descriptor.clone(),
        });
    }
    if method.access & (access::ABSTRACT | access::NATIVE) != 0 && !method.code.is_empty() {
        return Err(VerifyError::UnexpectedCode {
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
        });
    }
    Ok(())
}

/// Count the local slots taken by a method descriptor's arguments
///
/// `long` and `double` take two slots, everything else one. Returns `None`
/// if the descriptor is malformed.
pub fn argument_slots(descriptor: &str) -> Option<usize> {
    let rest = descriptor.strip_prefix('(')?;
    let (args, ret) = rest.split_once(')')?;
    if ret != "V" && !is_field_descriptor(ret) {
        return None;
    }

    let mut slots = 0;
    let mut remaining = args;
    while !remaining.is_empty() {
        let (ty, tail) = split_field_type(remaining)?;
        slots += if ty == "J" || ty == "D" { 2 } else { 1 };
        remaining = tail;
    }
    Some(slots)
}

/// Whether `descriptor` is exactly one field type
pub fn is_field_descriptor(descriptor: &str) -> bool {
    matches!(split_field_type(descriptor), Some((_, "")))
}

fn split_field_type(input: &str) -> Option<(&str, &str)> {
    let first = input.chars().next()?;
    match first {
        'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => Some(input.split_at(1)),
        'L' => {
            let end = input.find(';')?;
            if end == 1 {
                return None;
            }
            Some(input.split_at(end + 1))
        }
        '[' => {
            let (_, tail) = split_field_type(&input[1..])?;
            Some(input.split_at(input.len() - tail.len()))
        }
        _ => None,
    }
}

fn is_internal_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('.') && name.split('/').all(is_member_name)
}

fn is_member_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['.', ';', '[', '/', '<', '>'])
}
