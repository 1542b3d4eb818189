//! Static field metadata and the structural fingerprint.
//!
//! Every model type exposes a [`ModelDescriptor`] listing its fields with
//! their modifier, kind and erased type name. The fingerprint derived from it
//! is a schema version tag: it only depends on the sorted field names and
//! their erased types.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::error::{DeltaError, Result};

/// Field names that generated builders and deltas reserve for themselves.
///
/// `key` is only reserved for `val` fields; the identity field may use it.
pub const RESERVED_FIELD_NAMES: &[&str] = &[
    "reference",
    "last_delta_type",
    "delta_type",
    "state",
    "build",
    "build_empty",
    "reset",
    "init",
    "reconcile",
    "descriptor",
    "empty",
    "builder",
    "delta_builder",
    "key",
    "delta",
    "to_delta",
    "apply_delta",
    "is_touched",
];

/// Whether a field is part of the identity or a mutable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldModifier {
    /// Immutable, identity-contributing field.
    Key,
    /// Mutable value field.
    Val,
}

/// The closed set of field kinds the algebra knows how to diff and patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Primitive, enum or key type compared by equality.
    Scalar,
    /// Externally defined immutable type compared by equality; may be absent.
    Opaque,
    /// Optional nested model diffed recursively.
    Nested,
    /// Set of keys; members are added or removed.
    KeySet,
    /// Map from keys to scalar values.
    KeyValueMap,
    /// Map from keys to nested models diffed recursively.
    KeyModelMap,
}

impl ValueKind {
    /// Number of type arguments the kind's marker takes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            ValueKind::Scalar | ValueKind::Opaque | ValueKind::Nested | ValueKind::KeySet => 1,
            ValueKind::KeyValueMap | ValueKind::KeyModelMap => 2,
        }
    }

    /// Name of the kind's marker type.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            ValueKind::Scalar => "Scalar",
            ValueKind::Opaque => "Opaque",
            ValueKind::Nested => "Nested",
            ValueKind::KeySet => "KeySet",
            ValueKind::KeyValueMap => "KeyValueMap",
            ValueKind::KeyModelMap => "KeyModelMap",
        }
    }
}

/// Metadata of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: &'static str,
    /// Key or val.
    pub modifier: FieldModifier,
    /// How the field is diffed.
    pub kind: ValueKind,
    /// Type name with generics and path stripped; this is what the
    /// fingerprint hashes.
    pub type_name: &'static str,
    /// Type arguments of the kind's marker as written.
    pub type_args: &'static [&'static str],
}

/// Metadata of one model type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Model name.
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [FieldDescriptor],
}

impl ModelDescriptor {
    /// The identity field, if declared.
    #[must_use]
    pub fn key_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.modifier == FieldModifier::Key)
    }

    /// All `val` fields in declaration order.
    pub fn val_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.modifier == FieldModifier::Val)
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Structural fingerprint of this model's fields.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        fingerprint(self.fields.iter().map(|f| (f.name, f.type_name)))
    }

    /// Reject kind combinations the algebra does not support.
    pub fn validate(&self) -> Result<()> {
        let keys = self
            .fields
            .iter()
            .filter(|f| f.modifier == FieldModifier::Key)
            .count();
        if keys != 1 {
            return Err(DeltaError::unsupported(
                self.name,
                "",
                format!("expected exactly one key field, found {keys}"),
            ));
        }

        let mut seen = BTreeSet::new();
        for field in self.fields {
            if !seen.insert(field.name) {
                return Err(DeltaError::unsupported(
                    self.name,
                    field.name,
                    "duplicate field name",
                ));
            }
            if field.modifier == FieldModifier::Key && field.kind != ValueKind::Scalar {
                return Err(DeltaError::unsupported(
                    self.name,
                    field.name,
                    format!("key field must be a scalar, not {}", field.kind.marker()),
                ));
            }
            if field.type_args.len() != field.kind.arity() {
                return Err(DeltaError::unsupported(
                    self.name,
                    field.name,
                    format!(
                        "{} takes {} type argument(s), found {}",
                        field.kind.marker(),
                        field.kind.arity(),
                        field.type_args.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Strip generic arguments and module path from a type name.
///
/// ```
/// use delta_kit::schema::erase_type;
///
/// assert_eq!(erase_type("std::collections::BTreeMap<u32, String>"), "BTreeMap");
/// assert_eq!(erase_type("u64"), "u64");
/// ```
#[must_use]
pub fn erase_type(ty: &str) -> &str {
    let base = match ty.find('<') {
        Some(idx) => &ty[..idx],
        None => ty,
    };
    let base = base.trim();
    match base.rfind("::") {
        Some(idx) => &base[idx + 2..],
        None => base,
    }
}

/// Stable 64-bit fingerprint of `(field name, erased type)` pairs.
///
/// Pairs are sorted by name (then type) before hashing, so declaration order
/// does not matter. Each string is fed to SHA-256 with a big-endian `u16`
/// length prefix; the first eight digest bytes are read little-endian.
pub fn fingerprint<'a, I>(fields: I) -> u64
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = fields.into_iter().collect();
    pairs.sort_unstable();

    let mut hasher = Sha256::new();
    for (name, ty) in pairs {
        write_str(&mut hasher, name);
        write_str(&mut hasher, ty);
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

fn write_str(hasher: &mut Sha256, s: &str) {
    let len = u16::try_from(s.len()).unwrap_or(u16::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(&s.as_bytes()[..usize::from(len)]);
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor {
            name: "id",
            modifier: FieldModifier::Key,
            kind: ValueKind::Scalar,
            type_name: "u64",
            type_args: &["u64"],
        },
        FieldDescriptor {
            name: "tags",
            modifier: FieldModifier::Val,
            kind: ValueKind::KeySet,
            type_name: "KeySet",
            type_args: &["String"],
        },
        FieldDescriptor {
            name: "lines",
            modifier: FieldModifier::Val,
            kind: ValueKind::KeyModelMap,
            type_name: "KeyModelMap",
            type_args: &["u32", "LineItem"],
        },
    ];

    const ORDER: ModelDescriptor = ModelDescriptor {
        name: "Order",
        fields: ORDER_FIELDS,
    };

    #[test]
    fn erase_type_strips_generics_and_path() {
        assert_eq!(erase_type("KeySet<String>"), "KeySet");
        assert_eq!(erase_type("crate::model::Customer"), "Customer");
        assert_eq!(erase_type(" Option<Vec<u8>> "), "Option");
    }

    #[test]
    fn fingerprint_ignores_declaration_order() {
        let a = fingerprint([("id", "u64"), ("name", "String"), ("tags", "KeySet")]);
        let b = fingerprint([("tags", "KeySet"), ("id", "u64"), ("name", "String")]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_name_or_type() {
        let base = fingerprint([("id", "u64"), ("name", "String")]);
        assert_ne!(base, fingerprint([("id", "u64"), ("title", "String")]));
        assert_ne!(base, fingerprint([("id", "u64"), ("name", "Opaque")]));
        assert_ne!(base, fingerprint([("id", "u32"), ("name", "String")]));
    }

    #[test]
    fn fingerprint_is_not_fooled_by_concatenation() {
        let a = fingerprint([("ab", "c")]);
        let b = fingerprint([("a", "bc")]);
        assert_ne!(a, b);
    }

    #[test]
    fn descriptor_fingerprint_matches_free_function() {
        let expected = fingerprint([("id", "u64"), ("tags", "KeySet"), ("lines", "KeyModelMap")]);
        assert_eq!(ORDER.fingerprint(), expected);
    }

    #[test]
    fn descriptor_lookups() {
        assert_eq!(ORDER.key_field().map(|f| f.name), Some("id"));
        let vals: Vec<_> = ORDER.val_fields().map(|f| f.name).collect();
        assert_eq!(vals, vec!["tags", "lines"]);
        assert_eq!(ORDER.field("lines").map(|f| f.kind), Some(ValueKind::KeyModelMap));
        assert!(ORDER.field("missing").is_none());
    }

    #[test]
    fn valid_descriptor_passes() {
        assert!(ORDER.validate().is_ok());
    }

    #[test]
    fn missing_key_is_rejected() {
        let desc = ModelDescriptor {
            name: "Loose",
            fields: &ORDER_FIELDS[1..],
        };
        let err = desc.validate().unwrap_err();
        assert!(err.to_string().contains("exactly one key field"));
    }

    #[test]
    fn collection_key_is_rejected() {
        const FIELDS: &[FieldDescriptor] = &[FieldDescriptor {
            name: "tags",
            modifier: FieldModifier::Key,
            kind: ValueKind::KeySet,
            type_name: "KeySet",
            type_args: &["String"],
        }];
        let desc = ModelDescriptor {
            name: "Tagged",
            fields: FIELDS,
        };
        assert!(matches!(
            desc.validate(),
            Err(DeltaError::UnsupportedFieldKind { ref field, .. }) if field == "tags"
        ));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor {
                name: "id",
                modifier: FieldModifier::Key,
                kind: ValueKind::Scalar,
                type_name: "u8",
                type_args: &["u8"],
            },
            FieldDescriptor {
                name: "prices",
                modifier: FieldModifier::Val,
                kind: ValueKind::KeyValueMap,
                type_name: "KeyValueMap",
                type_args: &["String"],
            },
        ];
        let desc = ModelDescriptor {
            name: "Menu",
            fields: FIELDS,
        };
        assert!(desc.validate().is_err());
    }

    #[test]
    fn duplicate_field_is_rejected() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor {
                name: "id",
                modifier: FieldModifier::Key,
                kind: ValueKind::Scalar,
                type_name: "u8",
                type_args: &["u8"],
            },
            FieldDescriptor {
                name: "id",
                modifier: FieldModifier::Val,
                kind: ValueKind::Scalar,
                type_name: "u8",
                type_args: &["u8"],
            },
        ];
        let desc = ModelDescriptor {
            name: "Twice",
            fields: FIELDS,
        };
        assert!(desc.validate().unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn macro_reserves_the_same_field_names() {
        let source = include_str!("../../delta-kit-macros/src/lib.rs");
        let start = source
            .find("const RESERVED_FIELD_NAMES")
            .and_then(|at| source[at..].find("= &[").map(|offset| at + offset + 4))
            .unwrap();
        let end = start + source[start..].find("];").unwrap();
        let mut from_macro: Vec<&str> = source[start..end]
            .split(',')
            .map(|name| name.trim().trim_matches('"'))
            .filter(|name| !name.is_empty())
            .collect();
        let mut from_runtime = RESERVED_FIELD_NAMES.to_vec();
        from_macro.sort_unstable();
        from_runtime.sort_unstable();
        assert_eq!(from_macro, from_runtime);
    }
}
