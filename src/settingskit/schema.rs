//! # Schema Descriptors
//!
//! A [`SchemaDescriptor`] is the static description of a settings type: its fields, what shape
//! each one has and whether the generated accessors can read or write it. The
//! [`crate::settings_schema!`] macro builds one per type; [`validate`] checks it before anything
//! is bound to a store.
//!
//! Field shapes:
//!
//! - `Leaf`: a single stored value of a supported kind, optionally with a declared default.
//! - `Group`: a nested settings type stored below `<prefix>.<key>`. Read-only.
//! - `List`: a [`crate::collections::BoundList`] over an array setting. Read-only.
//! - `Map`: a [`crate::collections::BoundMap`] over a map setting. Read-only.
//!
//! "Read-only" here means the accessor hands out a view; the view itself is mutable.

use crate::error::{Result, SettingsError};
use crate::value::{Value, ValueKind};
use std::collections::HashSet;
use std::ptr;

/// Returns the descriptor of a nested settings type.
pub type SchemaFn = fn() -> &'static SchemaDescriptor;

#[derive(Debug, Clone)]
pub enum FieldShape {
    Leaf {
        kind: ValueKind,
        default: Option<Value>,
    },
    Group {
        schema: SchemaFn,
    },
    List {
        kind: ValueKind,
    },
    Map,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub shape: FieldShape,
    pub readable: bool,
    pub writable: bool,
}

impl FieldDescriptor {
    pub fn leaf(key: &'static str, kind: ValueKind) -> Self {
        Self {
            key,
            shape: FieldShape::Leaf {
                kind,
                default: None,
            },
            readable: true,
            writable: true,
        }
    }

    pub fn group(key: &'static str, schema: SchemaFn) -> Self {
        Self {
            key,
            shape: FieldShape::Group { schema },
            readable: true,
            writable: false,
        }
    }

    /// `kind` is the array kind of the stored setting.
    pub fn list(key: &'static str, kind: ValueKind) -> Self {
        Self {
            key,
            shape: FieldShape::List { kind },
            readable: true,
            writable: false,
        }
    }

    pub fn map(key: &'static str) -> Self {
        Self {
            key,
            shape: FieldShape::Map,
            readable: true,
            writable: false,
        }
    }

    /// Sets the declared default of a leaf. Ignored for other shapes.
    pub fn with_default(mut self, value: Value) -> Self {
        if let FieldShape::Leaf { default, .. } = &mut self.shape {
            *default = Some(value);
        }
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    pub fn with_setter(mut self) -> Self {
        self.writable = true;
        self
    }

    pub fn default_value(&self) -> Option<&Value> {
        match &self.shape {
            FieldShape::Leaf { default, .. } => default.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

impl SchemaDescriptor {
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }
}

/// Checks `schema` and every group it reaches.
pub fn validate(schema: &'static SchemaDescriptor) -> Result<()> {
    let mut stack = Vec::new();
    validate_inner(schema, &mut stack)
}

fn invalid(schema: &SchemaDescriptor, field: &str, reason: impl Into<String>) -> SettingsError {
    SettingsError::InvalidSchema {
        schema: schema.name,
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn validate_inner(
    schema: &'static SchemaDescriptor,
    stack: &mut Vec<&'static SchemaDescriptor>,
) -> Result<()> {
    stack.push(schema);
    let mut seen = HashSet::new();

    for field in &schema.fields {
        let key = field.key;
        if key.is_empty() {
            return Err(invalid(schema, key, "key must not be empty"));
        }
        if key.contains('.') {
            return Err(invalid(schema, key, "key must not contain '.'"));
        }
        // registry keys ignore case, so keys differing only in case collide
        if !seen.insert(key.to_ascii_lowercase()) {
            return Err(invalid(schema, key, "duplicate key"));
        }

        match &field.shape {
            FieldShape::Leaf { kind, default } => {
                if !kind.is_supported() {
                    return Err(invalid(schema, key, format!("unsupported type {}", kind)));
                }
                if !field.readable {
                    return Err(invalid(schema, key, "value has no getter"));
                }
                if !field.writable {
                    return Err(invalid(schema, key, "value has no setter"));
                }
                if let Some(default) = default {
                    if default.kind() != *kind {
                        return Err(invalid(
                            schema,
                            key,
                            format!("default is {} but the field is {}", default.kind(), kind),
                        ));
                    }
                }
            }
            FieldShape::Group { .. } | FieldShape::List { .. } | FieldShape::Map => {
                if field.writable {
                    return Err(invalid(schema, key, "collections and groups cannot have a setter"));
                }
                if !field.readable {
                    return Err(invalid(schema, key, "collections and groups need a getter"));
                }
            }
        }

        match &field.shape {
            FieldShape::List { kind } if !kind.is_array() => {
                return Err(invalid(
                    schema,
                    key,
                    format!("list items must be stored as an array, not {}", kind),
                ));
            }
            FieldShape::Group { schema: nested } => {
                let nested = nested();
                if stack.iter().any(|s| ptr::eq(*s, nested)) {
                    return Err(invalid(
                        schema,
                        key,
                        format!("group {} contains itself", nested.name),
                    ));
                }
                validate_inner(nested, stack)?;
            }
            _ => {}
        }
    }

    stack.pop();
    Ok(())
}
