use serde::Deserialize;

/// Top-level schema file structure parsed from `delta-schema.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaFile {
    /// Global configuration.
    pub config: SchemaConfig,
    /// Externally defined types used as opaque values.
    #[serde(default, rename = "import")]
    pub imports: Vec<Import>,
    /// Enumerations usable as scalar values, set elements and map keys.
    #[serde(default, rename = "enum")]
    pub enums: Vec<EnumDef>,
    /// Composite identity types.
    #[serde(default, rename = "key")]
    pub keys: Vec<KeyDef>,
    /// Model definitions.
    #[serde(default, rename = "model")]
    pub models: Vec<ModelDef>,
}

/// Global code-generation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    /// Output directory relative to the project root.
    pub output: String,
}

/// An externally defined immutable type, e.g. a timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct Import {
    /// Name the schema refers to the type by (PascalCase).
    pub name: String,
    /// Rust path of the type (e.g., `"crate::time::Timestamp"`).
    pub path: String,
}

/// A fieldless enumeration.
#[derive(Debug, Clone, Deserialize)]
pub struct EnumDef {
    /// Enum name in PascalCase.
    pub name: String,
    /// Variant names in declaration order.
    pub variants: Vec<String>,
    /// Variant used as the zero value; the first variant when omitted.
    pub default: Option<String>,
}

impl EnumDef {
    /// Variant used as the zero value.
    pub fn default_variant(&self) -> Option<&str> {
        self.default
            .as_deref()
            .or_else(|| self.variants.first().map(String::as_str))
    }
}

/// A composite identity type made of scalar parts.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyDef {
    /// Key type name in PascalCase.
    pub name: String,
    /// Parts of the key, compared in declaration order.
    pub fields: Vec<Field>,
}

/// A model definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDef {
    /// Model name in PascalCase (e.g., `"Order"`).
    pub name: String,
    /// Fields; exactly one carries `modifier = "key"`.
    pub fields: Vec<Field>,
}

impl ModelDef {
    /// Fields marked as identity.
    pub fn key_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.modifier == Modifier::Key)
    }
}

/// A single field of a model or key type.
#[derive(Debug, Clone, Deserialize)]
pub struct Field {
    /// Field name in snake_case.
    pub name: String,
    /// Schema type (e.g., `"String"`, `"Set<u32>"`, `"Map<LineKey, LineItem>"`).
    #[serde(rename = "type")]
    pub field_type: String,
    /// Identity or value field; value by default.
    #[serde(default)]
    pub modifier: Modifier,
}

/// Field modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Immutable identity field.
    Key,
    /// Mutable value field.
    #[default]
    Val,
}

/// Primitive type names accepted in schemas.
pub const PRIMITIVES: &[&str] = &[
    "String", "bool", "char", "u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64", "f32", "f64",
];

/// Primitives that have no total order and cannot identify anything.
pub const UNORDERED_PRIMITIVES: &[&str] = &["f32", "f64"];

/// A parsed schema type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A primitive or a declared type name.
    Named(String),
    /// `Set<T>`.
    Set(Box<TypeRef>),
    /// `Map<K, V>`.
    Map(Box<TypeRef>, Box<TypeRef>),
}

impl TypeRef {
    /// Parse a schema type expression; `None` when it is malformed.
    pub fn parse(input: &str) -> Option<TypeRef> {
        let input = input.trim();
        if let Some(inner) = generic_body(input, "Set") {
            return Some(TypeRef::Set(Box::new(TypeRef::parse(inner)?)));
        }
        if let Some(inner) = generic_body(input, "Map") {
            let (key, value) = split_top_level(inner)?;
            return Some(TypeRef::Map(
                Box::new(TypeRef::parse(key)?),
                Box::new(TypeRef::parse(value)?),
            ));
        }
        is_identifier(input).then(|| TypeRef::Named(input.to_string()))
    }

    /// The type name, when this is a plain name.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeRef::Named(name) => Some(name),
            _ => None,
        }
    }
}

fn generic_body<'a>(input: &'a str, head: &str) -> Option<&'a str> {
    input
        .strip_prefix(head)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

fn split_top_level(input: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (idx, ch) in input.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&input[..idx], &input[idx + 1..])),
            _ => {}
        }
    }
    None
}

fn is_identifier(input: &str) -> bool {
    let mut chars = input.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_schema() {
        let toml = r#"
[config]
output = "src/generated"

[[import]]
name = "Timestamp"
path = "crate::time::Timestamp"

[[enum]]
name = "Status"
variants = ["Draft", "Placed", "Shipped"]

[[key]]
name = "LineKey"
fields = [
    { name = "order", type = "u64" },
    { name = "line", type = "u32" },
]

[[model]]
name = "Order"
fields = [
    { name = "id", type = "u64", modifier = "key" },
    { name = "status", type = "Status" },
    { name = "lines", type = "Map<LineKey, LineItem>" },
]
"#;
        let schema: SchemaFile = toml::from_str(toml).unwrap();
        assert_eq!(schema.config.output, "src/generated");
        assert_eq!(schema.imports[0].path, "crate::time::Timestamp");
        assert_eq!(schema.enums[0].default_variant(), Some("Draft"));
        assert_eq!(schema.keys[0].fields.len(), 2);

        let order = &schema.models[0];
        assert_eq!(order.key_fields().count(), 1);
        assert_eq!(order.fields[0].modifier, Modifier::Key);
        assert_eq!(order.fields[1].modifier, Modifier::Val);
    }

    #[test]
    fn sections_are_optional() {
        let toml = r#"
[config]
output = "out"
"#;
        let schema: SchemaFile = toml::from_str(toml).unwrap();
        assert!(schema.imports.is_empty());
        assert!(schema.enums.is_empty());
        assert!(schema.keys.is_empty());
        assert!(schema.models.is_empty());
    }

    #[test]
    fn explicit_enum_default() {
        let toml = r#"
[config]
output = "out"

[[enum]]
name = "Priority"
variants = ["Low", "Normal", "High"]
default = "Normal"
"#;
        let schema: SchemaFile = toml::from_str(toml).unwrap();
        assert_eq!(schema.enums[0].default_variant(), Some("Normal"));
    }

    #[test]
    fn parse_type_expressions() {
        assert_eq!(TypeRef::parse("u64"), Some(TypeRef::Named("u64".into())));
        assert_eq!(
            TypeRef::parse("Set<String>"),
            Some(TypeRef::Set(Box::new(TypeRef::Named("String".into()))))
        );
        assert_eq!(
            TypeRef::parse(" Map< LineKey , LineItem > "),
            Some(TypeRef::Map(
                Box::new(TypeRef::Named("LineKey".into())),
                Box::new(TypeRef::Named("LineItem".into())),
            ))
        );
        assert_eq!(
            TypeRef::parse("Map<u32, Set<String>>"),
            Some(TypeRef::Map(
                Box::new(TypeRef::Named("u32".into())),
                Box::new(TypeRef::Set(Box::new(TypeRef::Named("String".into())))),
            ))
        );
    }

    #[test]
    fn reject_malformed_type_expressions() {
        assert_eq!(TypeRef::parse(""), None);
        assert_eq!(TypeRef::parse("Map<u32>"), None);
        assert_eq!(TypeRef::parse("Set<u32"), None);
        assert_eq!(TypeRef::parse("Vec<u8>"), None);
        assert_eq!(TypeRef::parse("9lives"), None);
    }
}
