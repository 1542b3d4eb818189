use std::collections::HashSet;
use std::fmt;

use delta_kit::schema::RESERVED_FIELD_NAMES;

use crate::resolve::TypeTable;
use crate::schema::{Field, Modifier, SchemaFile, PRIMITIVES};

/// A single validation error with context about where it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Declared type the error belongs to (model, enum, key or import).
    pub model: Option<String>,
    /// Field or variant the error belongs to.
    pub field: Option<String>,
    /// What is wrong.
    pub message: String,
}

impl ValidationError {
    fn global(message: impl Into<String>) -> Self {
        Self {
            model: None,
            field: None,
            message: message.into(),
        }
    }

    fn on_type(model: &str, message: impl Into<String>) -> Self {
        Self {
            model: Some(model.to_string()),
            field: None,
            message: message.into(),
        }
    }

    fn on_field(model: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            model: Some(model.to_string()),
            field: Some(field.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ctx = Vec::new();
        if let Some(m) = &self.model {
            ctx.push(format!("type={m}"));
        }
        if let Some(field) = &self.field {
            ctx.push(format!("field={field}"));
        }
        if ctx.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "[{}] {}", ctx.join(", "), self.message)
        }
    }
}

/// Validate a parsed schema file. Returns `Ok(())` if valid, or every error
/// found.
pub fn validate_schema(schema: &SchemaFile) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if schema.config.output.is_empty() {
        errors.push(ValidationError::global("config.output must not be empty"));
    }
    if schema.models.is_empty() {
        errors.push(ValidationError::global("schema must define at least one model"));
    }

    // Type names share one namespace across imports, enums, keys and models.
    let declared = schema
        .imports
        .iter()
        .map(|i| i.name.as_str())
        .chain(schema.enums.iter().map(|e| e.name.as_str()))
        .chain(schema.keys.iter().map(|k| k.name.as_str()))
        .chain(schema.models.iter().map(|m| m.name.as_str()));
    let mut seen = HashSet::new();
    for name in declared {
        if !is_pascal_case(name) {
            errors.push(ValidationError::on_type(
                name,
                "type name must be PascalCase (start with uppercase)",
            ));
        }
        if PRIMITIVES.contains(&name) {
            errors.push(ValidationError::on_type(name, "type name shadows a primitive"));
        }
        if !seen.insert(name) {
            errors.push(ValidationError::on_type(name, "duplicate type name"));
        }
    }

    let table = TypeTable::new(schema);

    for import in &schema.imports {
        if import.path.trim().is_empty() {
            errors.push(ValidationError::on_type(&import.name, "import path must not be empty"));
        }
    }

    for def in &schema.enums {
        if def.variants.is_empty() {
            errors.push(ValidationError::on_type(&def.name, "enum must have at least one variant"));
        }
        let mut variants = HashSet::new();
        for variant in &def.variants {
            if !is_pascal_case(variant) {
                errors.push(ValidationError::on_field(
                    &def.name,
                    variant,
                    "variant name must be PascalCase",
                ));
            }
            if !variants.insert(variant.as_str()) {
                errors.push(ValidationError::on_field(&def.name, variant, "duplicate variant"));
            }
        }
        if let Some(default) = &def.default {
            if !variants.contains(default.as_str()) {
                errors.push(ValidationError::on_field(
                    &def.name,
                    default,
                    "default is not one of the variants",
                ));
            }
        }
    }

    for def in &schema.keys {
        if def.fields.is_empty() {
            errors.push(ValidationError::on_type(&def.name, "key type must have at least one field"));
        }
        check_field_names(&def.name, &def.fields, false, &mut errors);
        for field in &def.fields {
            if let Err(reason) = table.check_identity(field.field_type.trim()) {
                errors.push(ValidationError::on_field(&def.name, &field.name, reason));
            }
            if field.modifier == Modifier::Key {
                errors.push(ValidationError::on_field(
                    &def.name,
                    &field.name,
                    "key type parts cannot carry a modifier",
                ));
            }
        }
    }

    for model in &schema.models {
        check_field_names(&model.name, &model.fields, true, &mut errors);

        let keys = model.key_fields().count();
        if keys != 1 {
            errors.push(ValidationError::on_type(
                &model.name,
                format!("model must have exactly one key field, found {keys}"),
            ));
        }

        for field in &model.fields {
            if let Err(reason) = table.resolve_field(field.modifier, &field.field_type) {
                errors.push(ValidationError::on_field(&model.name, &field.name, reason));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_field_names(
    owner: &str,
    fields: &[Field],
    reserve: bool,
    errors: &mut Vec<ValidationError>,
) {
    let mut names = HashSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            errors.push(ValidationError::on_field(owner, &field.name, "duplicate field name"));
        }
        if !is_snake_case(&field.name) {
            errors.push(ValidationError::on_field(
                owner,
                &field.name,
                "field name must be snake_case (start with lowercase)",
            ));
        }
        let key_named_key = field.modifier == Modifier::Key && field.name == "key";
        if reserve && !key_named_key && RESERVED_FIELD_NAMES.contains(&field.name.as_str()) {
            errors.push(ValidationError::on_field(
                owner,
                &field.name,
                "field name is reserved by the generated builder and delta types",
            ));
        }
    }
}

fn is_pascal_case(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase()) && chars.all(|c| c.is_ascii_alphanumeric())
}

fn is_snake_case(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;

    fn make_schema(models: Vec<ModelDef>) -> SchemaFile {
        SchemaFile {
            config: SchemaConfig {
                output: "src/generated".into(),
            },
            imports: Vec::new(),
            enums: Vec::new(),
            keys: Vec::new(),
            models,
        }
    }

    fn make_model(name: &str, fields: Vec<Field>) -> ModelDef {
        ModelDef {
            name: name.into(),
            fields,
        }
    }

    fn key(name: &str, field_type: &str) -> Field {
        Field {
            name: name.into(),
            field_type: field_type.into(),
            modifier: Modifier::Key,
        }
    }

    fn val(name: &str, field_type: &str) -> Field {
        Field {
            name: name.into(),
            field_type: field_type.into(),
            modifier: Modifier::Val,
        }
    }

    fn messages(schema: &SchemaFile) -> Vec<String> {
        validate_schema(schema)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn valid_minimal_schema() {
        let schema = make_schema(vec![make_model(
            "Task",
            vec![key("id", "u64"), val("title", "String")],
        )]);
        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn empty_output_and_no_models_fail() {
        let mut schema = make_schema(Vec::new());
        schema.config.output = String::new();
        let errs = messages(&schema);
        assert!(errs.iter().any(|e| e.contains("output")));
        assert!(errs.iter().any(|e| e.contains("at least one model")));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let schema = make_schema(vec![make_model(
            "task",
            vec![val("Title", "String"), val("count", "Money")],
        )]);
        let errs = validate_schema(&schema).unwrap_err();
        assert!(errs.len() >= 4);
        assert!(errs.iter().any(|e| e.message.contains("PascalCase")));
        assert!(errs.iter().any(|e| e.message.contains("snake_case")));
        assert!(errs.iter().any(|e| e.message.contains("exactly one key")));
        assert!(errs
            .iter()
            .any(|e| e.field.as_deref() == Some("count") && e.message.contains("unknown type")));
    }

    #[test]
    fn two_keys_fail() {
        let schema = make_schema(vec![make_model(
            "Task",
            vec![key("id", "u64"), key("code", "String")],
        )]);
        assert!(messages(&schema).iter().any(|e| e.contains("found 2")));
    }

    #[test]
    fn float_key_fails() {
        let schema = make_schema(vec![make_model("Reading", vec![key("at", "f64")])]);
        assert!(messages(&schema).iter().any(|e| e.contains("total order")));
    }

    #[test]
    fn reserved_field_name_fails() {
        let schema = make_schema(vec![make_model(
            "Task",
            vec![key("id", "u64"), val("reference", "String")],
        )]);
        assert!(messages(&schema).iter().any(|e| e.contains("reserved")));
    }

    #[test]
    fn key_field_may_be_named_key() {
        let schema = make_schema(vec![make_model("Task", vec![key("key", "u64")])]);
        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn duplicate_names_fail() {
        let mut schema = make_schema(vec![
            make_model("Task", vec![key("id", "u64"), val("id", "String")]),
            make_model("Task", vec![key("id", "u64")]),
        ]);
        schema.enums.push(EnumDef {
            name: "Task".into(),
            variants: vec!["A".into()],
            default: None,
        });
        let errs = messages(&schema);
        assert!(errs.iter().any(|e| e.contains("duplicate field name")));
        assert_eq!(
            errs.iter().filter(|e| e.contains("duplicate type name")).count(),
            2
        );
    }

    #[test]
    fn enum_rules() {
        let mut schema = make_schema(vec![make_model("Task", vec![key("id", "u64")])]);
        schema.enums.push(EnumDef {
            name: "Empty".into(),
            variants: Vec::new(),
            default: None,
        });
        schema.enums.push(EnumDef {
            name: "Level".into(),
            variants: vec!["Low".into(), "Low".into(), "high".into()],
            default: Some("Medium".into()),
        });
        let errs = messages(&schema);
        assert!(errs.iter().any(|e| e.contains("at least one variant")));
        assert!(errs.iter().any(|e| e.contains("duplicate variant")));
        assert!(errs.iter().any(|e| e.contains("variant name must be PascalCase")));
        assert!(errs.iter().any(|e| e.contains("default is not one of the variants")));
    }

    #[test]
    fn key_type_rules() {
        let mut schema = make_schema(vec![make_model("Task", vec![key("id", "Slot")])]);
        schema.imports.push(Import {
            name: "Timestamp".into(),
            path: "crate::time::Timestamp".into(),
        });
        schema.keys.push(KeyDef {
            name: "Slot".into(),
            fields: vec![val("day", "u16"), val("at", "Timestamp"), val("weight", "f32")],
        });
        let errs = messages(&schema);
        assert!(errs
            .iter()
            .any(|e| e.contains("field=at") && e.contains("cannot be used as a key")));
        assert!(errs.iter().any(|e| e.contains("field=weight")));
        assert!(!errs.iter().any(|e| e.contains("field=day")));
    }

    #[test]
    fn display_includes_context() {
        let err = ValidationError::on_field("Order", "lines", "bad");
        assert_eq!(err.to_string(), "[type=Order, field=lines] bad");
        assert_eq!(ValidationError::global("oops").to_string(), "oops");
    }
}
