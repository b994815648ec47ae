//! Declarative status descriptions and their compiled dispatch tables.
//!
//! Each proxy type declares its observable fields once as a [`StatusDecl`].
//! [`compile`] turns that into a [`Schema`]: a table from callback wire key
//! to the slot that absorbs it, plus the setters the declaration asked for.
//! Compilation runs once per proxy type at connection setup; a malformed
//! declaration fails there, never on first use.

mod modifier;

use std::collections::HashMap;

pub use modifier::{unwrap_modifiers, FieldModifier, Wrapped};

use crate::error::SchemaError;

/// Type token for one declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDecl {
    Int,
    Float,
    Str,
    /// Carried on the wire as int 0/1.
    Bool,
    Blob,
    Uuid,
    /// Raw decoded value, no coercion.
    Any,
    /// Identity of a nested object of the named proxy class.
    Object(&'static str),
    /// Repeated field; one callback per element.
    List(Box<TypeDecl>),
    /// Keyed field; the first callback argument is the key.
    Dict(Box<TypeDecl>, Vec<TypeDecl>),
    /// Fixed-arity composite scalar.
    Tuple(Vec<TypeDecl>),
}

impl TypeDecl {
    pub fn list(elem: TypeDecl) -> Self {
        TypeDecl::List(Box::new(elem))
    }

    pub fn dict(key: TypeDecl, values: Vec<TypeDecl>) -> Self {
        TypeDecl::Dict(Box::new(key), values)
    }

    fn is_primitive(&self) -> bool {
        !matches!(
            self,
            TypeDecl::List(_) | TypeDecl::Dict(..) | TypeDecl::Tuple(_)
        )
    }
}

/// One declared field with its modifier chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: &'static str,
    pub token: TypeDecl,
    pub modifiers: Vec<FieldModifier>,
}

impl FieldDecl {
    pub fn writable(mut self) -> Self {
        self.modifiers.push(FieldModifier::Setter);
        self
    }

    pub fn renamed(mut self, path: &str) -> Self {
        self.modifiers.push(FieldModifier::RenamePath(path.to_string()));
        self
    }
}

pub fn field(name: &'static str, token: TypeDecl) -> FieldDecl {
    FieldDecl {
        name,
        token,
        modifiers: Vec::new(),
    }
}

/// The full status description of one proxy type.
pub type StatusDecl = Vec<FieldDecl>;

/// How a raw callback argument list becomes a field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coerce {
    Any,
    Int,
    Float,
    Str,
    Bool,
    Blob,
    Uuid,
    Object(&'static str),
    /// Positional decode, one coercion per argument.
    Tuple(Vec<Coerce>),
}

/// Where a matched callback lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Scalar(Coerce),
    List(Coerce),
    Dict { key: Coerce, value: Coerce },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledField {
    pub name: String,
    /// Callback suffix (without leading separator) that feeds this field.
    pub wire_key: String,
    pub slot: Slot,
    /// Command path of the generated setter, if any.
    pub setter: Option<String>,
}

/// Compiled dispatch table for one proxy type.
#[derive(Debug, Clone)]
pub struct Schema {
    class: String,
    fields: Vec<CompiledField>,
    by_key: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    /// Field fed by a callback with this (separator-stripped) suffix.
    pub fn by_wire_key(&self, key: &str) -> Option<&CompiledField> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }
}

/// Default wire key for a repeated or keyed field: plural names lose a
/// trailing "es", otherwise a trailing "s".
pub fn singularize(name: &str) -> &str {
    if let Some(stem) = name.strip_suffix("es") {
        stem
    } else if let Some(stem) = name.strip_suffix('s') {
        stem
    } else {
        name
    }
}

/// Compile a status description. `known_class` answers whether a nested
/// object class name is registered.
pub fn compile(
    class: &str,
    decl: &[FieldDecl],
    known_class: &dyn Fn(&str) -> bool,
) -> Result<Schema, SchemaError> {
    let mut schema = Schema {
        class: class.to_string(),
        fields: Vec::with_capacity(decl.len()),
        by_key: HashMap::new(),
        by_name: HashMap::new(),
    };

    for fd in decl {
        let ctx = FieldCtx {
            class,
            field: fd.name,
            known_class,
        };
        let wrapped = unwrap_modifiers(&fd.token, &fd.modifiers);
        if wrapped.path.as_deref() == Some("") {
            return Err(ctx.bad("empty rename path"));
        }

        let (slot, default_key) = match wrapped.base() {
            TypeDecl::List(elem) => (Slot::List(ctx.element(elem)?), singularize(fd.name)),
            TypeDecl::Dict(key, values) => {
                let key = match key.as_ref() {
                    TypeDecl::Int | TypeDecl::Str | TypeDecl::Uuid | TypeDecl::Any => {
                        ctx.primitive(key)?
                    }
                    _ => return Err(ctx.bad("dict key must be int, str, uuid or any")),
                };
                let value = match values.as_slice() {
                    [] => return Err(ctx.bad("dict needs at least one value type")),
                    [single] => ctx.element(single)?,
                    many => ctx.tuple(many)?,
                };
                (Slot::Dict { key, value }, singularize(fd.name))
            }
            TypeDecl::Tuple(items) => (Slot::Scalar(ctx.tuple(items)?), fd.name),
            scalar => (Slot::Scalar(ctx.primitive(scalar)?), fd.name),
        };

        if wrapped.writable && !matches!(slot, Slot::Scalar(_)) {
            return Err(ctx.bad("setters are only generated for scalar fields"));
        }

        let wire_key = wrapped.path.clone().unwrap_or_else(|| default_key.to_string());
        if schema.by_name.contains_key(fd.name) {
            return Err(SchemaError::DuplicateField {
                class: class.to_string(),
                field: fd.name.to_string(),
            });
        }
        if let Some(&other) = schema.by_key.get(&wire_key) {
            return Err(SchemaError::DuplicateKey {
                class: class.to_string(),
                key: wire_key,
                first: schema.fields[other].name.clone(),
                second: fd.name.to_string(),
            });
        }

        let setter = wrapped.writable.then(|| format!("/{}", wire_key));
        log::trace!(target: "schema", "{}.{} <- /{} ({:?})", class, fd.name, wire_key, slot);
        let index = schema.fields.len();
        schema.by_key.insert(wire_key.clone(), index);
        schema.by_name.insert(fd.name.to_string(), index);
        schema.fields.push(CompiledField {
            name: fd.name.to_string(),
            wire_key,
            slot,
            setter,
        });
    }

    Ok(schema)
}

struct FieldCtx<'a> {
    class: &'a str,
    field: &'static str,
    known_class: &'a dyn Fn(&str) -> bool,
}

impl FieldCtx<'_> {
    fn bad(&self, reason: &'static str) -> SchemaError {
        SchemaError::BadShape {
            class: self.class.to_string(),
            field: self.field.to_string(),
            reason,
        }
    }

    fn primitive(&self, t: &TypeDecl) -> Result<Coerce, SchemaError> {
        Ok(match t {
            TypeDecl::Int => Coerce::Int,
            TypeDecl::Float => Coerce::Float,
            TypeDecl::Str => Coerce::Str,
            TypeDecl::Bool => Coerce::Bool,
            TypeDecl::Blob => Coerce::Blob,
            TypeDecl::Uuid => Coerce::Uuid,
            TypeDecl::Any => Coerce::Any,
            TypeDecl::Object(target) => {
                if !(self.known_class)(target) {
                    return Err(SchemaError::UnknownClass {
                        class: self.class.to_string(),
                        field: self.field.to_string(),
                        target: target.to_string(),
                    });
                }
                Coerce::Object(target)
            }
            _ => return Err(self.bad("nested repeated or keyed types are not supported")),
        })
    }

    fn tuple(&self, items: &[TypeDecl]) -> Result<Coerce, SchemaError> {
        if items.is_empty() {
            return Err(self.bad("empty tuple"));
        }
        if !items.iter().all(TypeDecl::is_primitive) {
            return Err(self.bad("tuple members must be scalar"));
        }
        items
            .iter()
            .map(|t| self.primitive(t))
            .collect::<Result<Vec<_>, _>>()
            .map(Coerce::Tuple)
    }

    fn element(&self, t: &TypeDecl) -> Result<Coerce, SchemaError> {
        match t {
            TypeDecl::Tuple(items) => self.tuple(items),
            other => self.primitive(other),
        }
    }
}
