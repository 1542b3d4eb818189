//! Mapping from schema types to field kinds.

use std::collections::HashMap;

use delta_kit::schema::erase_type;
use delta_kit::ValueKind;

use crate::schema::{Modifier, ModelDef, SchemaFile, TypeRef, PRIMITIVES, UNORDERED_PRIMITIVES};

/// What a type name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// Built-in primitive.
    Primitive,
    /// Declared `[[enum]]`.
    Enum,
    /// Declared `[[key]]`.
    Key,
    /// Declared `[[import]]`.
    Import,
    /// Declared `[[model]]`.
    Model,
}

impl TypeClass {
    /// Whether values of this class can be compared by equality as scalars.
    fn is_scalar(self) -> bool {
        matches!(self, TypeClass::Primitive | TypeClass::Enum | TypeClass::Key)
    }
}

/// Every type name a schema can refer to.
#[derive(Debug, Default)]
pub struct TypeTable {
    classes: HashMap<String, TypeClass>,
}

impl TypeTable {
    /// Index primitives and every declared type. Later declarations of a
    /// name shadow earlier ones; the validator reports such duplicates.
    pub fn new(schema: &SchemaFile) -> Self {
        let mut classes: HashMap<String, TypeClass> = PRIMITIVES
            .iter()
            .map(|p| (p.to_string(), TypeClass::Primitive))
            .collect();
        for import in &schema.imports {
            classes.insert(import.name.clone(), TypeClass::Import);
        }
        for def in &schema.enums {
            classes.insert(def.name.clone(), TypeClass::Enum);
        }
        for def in &schema.keys {
            classes.insert(def.name.clone(), TypeClass::Key);
        }
        for def in &schema.models {
            classes.insert(def.name.clone(), TypeClass::Model);
        }
        Self { classes }
    }

    /// Classify a type name.
    pub fn class_of(&self, name: &str) -> Option<TypeClass> {
        self.classes.get(name).copied()
    }

    /// Check that `name` can identify something: a set element, a map key,
    /// a key-type part or a model key.
    pub fn check_identity(&self, name: &str) -> Result<(), String> {
        match self.class_of(name) {
            None => Err(format!("unknown type `{name}`")),
            Some(_) if UNORDERED_PRIMITIVES.contains(&name) => {
                Err(format!("`{name}` has no total order and cannot be used as a key"))
            }
            Some(class) if class.is_scalar() => Ok(()),
            Some(_) => Err(format!(
                "`{name}` cannot be used as a key; expected a primitive, enum or key type"
            )),
        }
    }

    /// Resolve one model field to its kind and generated Rust type.
    pub fn resolve_field(&self, modifier: Modifier, field_type: &str) -> Result<ResolvedType, String> {
        let parsed = TypeRef::parse(field_type)
            .ok_or_else(|| format!("malformed type `{field_type}`"))?;

        if modifier == Modifier::Key {
            let name = parsed
                .name()
                .ok_or_else(|| format!("key field cannot be a collection (`{field_type}`)"))?;
            self.check_identity(name)?;
            return Ok(ResolvedType {
                kind: ValueKind::Scalar,
                rust_type: name.to_string(),
                erased: name.to_string(),
            });
        }

        match parsed {
            TypeRef::Named(name) => {
                let class = self
                    .class_of(&name)
                    .ok_or_else(|| format!("unknown type `{name}`"))?;
                let kind = match class {
                    TypeClass::Import => ValueKind::Opaque,
                    TypeClass::Model => ValueKind::Nested,
                    _ => ValueKind::Scalar,
                };
                Ok(ResolvedType {
                    kind,
                    rust_type: format!("{}<{name}>", kind.marker()),
                    erased: erase_type(&name).to_string(),
                })
            }
            TypeRef::Set(element) => {
                let element = self.identity_name(&element, "set element")?;
                Ok(ResolvedType::collection(
                    ValueKind::KeySet,
                    format!("KeySet<{element}>"),
                ))
            }
            TypeRef::Map(key, value) => {
                let key = self.identity_name(&key, "map key")?;
                let value = value
                    .name()
                    .ok_or_else(|| "map values cannot be collections".to_string())?;
                let kind = match self.class_of(value) {
                    None => return Err(format!("unknown type `{value}`")),
                    Some(TypeClass::Model) => ValueKind::KeyModelMap,
                    Some(_) => ValueKind::KeyValueMap,
                };
                Ok(ResolvedType::collection(
                    kind,
                    format!("{}<{key}, {value}>", kind.marker()),
                ))
            }
        }
    }

    fn identity_name<'t>(&self, ty: &'t TypeRef, role: &str) -> Result<&'t str, String> {
        let name = ty
            .name()
            .ok_or_else(|| format!("{role} cannot be a collection"))?;
        self.check_identity(name)
            .map_err(|reason| format!("invalid {role}: {reason}"))?;
        Ok(name)
    }

    /// Resolve every field of a model, stopping at the first failure.
    pub fn resolve_model<'m>(&self, model: &'m ModelDef) -> Result<Vec<ResolvedField<'m>>, String> {
        model
            .fields
            .iter()
            .map(|field| {
                self.resolve_field(field.modifier, &field.field_type)
                    .map(|ty| ResolvedField {
                        name: &field.name,
                        modifier: field.modifier,
                        ty,
                    })
                    .map_err(|reason| format!("field `{}`: {reason}", field.name))
            })
            .collect()
    }
}

/// Generated representation of one field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// Field kind.
    pub kind: ValueKind,
    /// Type written in the generated struct (e.g., `"KeySet<String>"`, or
    /// the bare identity type for key fields).
    pub rust_type: String,
    /// Erased type hashed into the fingerprint.
    pub erased: String,
}

impl ResolvedType {
    fn collection(kind: ValueKind, rust_type: String) -> Self {
        Self {
            kind,
            rust_type,
            erased: kind.marker().to_string(),
        }
    }
}

/// A model field together with its resolved type.
#[derive(Debug, Clone)]
pub struct ResolvedField<'m> {
    /// Field name.
    pub name: &'m str,
    /// Identity or value.
    pub modifier: Modifier,
    /// Resolved type.
    pub ty: ResolvedType,
}

/// Fingerprint of resolved fields, identical to what the runtime computes
/// for the generated model.
pub fn fingerprint_of(fields: &[ResolvedField<'_>]) -> u64 {
    delta_kit::schema::fingerprint(fields.iter().map(|f| (f.name, f.ty.erased.as_str())))
}
