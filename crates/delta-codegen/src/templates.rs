//! Source templates for generated files.
//!
//! Every function returns complete file content starting with
//! [`HEADER`]. Input is assumed to be validated.

use std::fmt::Write as _;

use crate::resolve::{fingerprint_of, ResolvedField};
use crate::schema::{EnumDef, Import, KeyDef, Modifier, ModelDef};

/// Header placed at the top of every generated file.
pub const HEADER: &str = "// @generated by delta-codegen. Do not edit by hand.\n";

/// File name (without directory) for a model module.
pub fn model_file_name(model: &ModelDef) -> String {
    format!("{}.rs", to_snake_case(&model.name))
}

/// Generate the module for one model.
pub fn generate_model_file(model: &ModelDef, fields: &[ResolvedField<'_>]) -> String {
    let fingerprint = fingerprint_of(fields);
    let mut out = String::from(HEADER);
    out.push('\n');
    out.push_str("#[allow(unused_imports)]\nuse super::*;\nuse delta_kit::prelude::*;\n\n");

    let _ = writeln!(out, "/// The `{}` model.", model.name);
    out.push_str("///\n");
    let _ = writeln!(out, "/// Schema fingerprint: `{fingerprint:#018x}`.");
    let _ = writeln!(out, "#[model(fingerprint = {fingerprint})]");
    let _ = writeln!(out, "pub struct {} {{", model.name);
    for field in fields {
        if field.modifier == Modifier::Key {
            out.push_str("    #[key]\n");
        }
        let _ = writeln!(out, "    {}: {},", field.name, field.ty.rust_type);
    }
    out.push_str("}\n");
    out
}

/// Generate `enums.rs` holding every declared enum.
pub fn generate_enums_file(enums: &[EnumDef]) -> String {
    let mut out = String::from(HEADER);
    for def in enums {
        let default = def.default_variant();
        out.push('\n');
        let _ = writeln!(out, "/// The `{}` enumeration.", def.name);
        out.push_str(
            "#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]\n",
        );
        let _ = writeln!(out, "pub enum {} {{", def.name);
        for variant in &def.variants {
            if Some(variant.as_str()) == default {
                out.push_str("    #[default]\n");
            }
            let _ = writeln!(out, "    {variant},");
        }
        out.push_str("}\n");
    }
    out
}

/// Generate `keys.rs` holding every composite key type.
pub fn generate_keys_file(keys: &[KeyDef]) -> String {
    let mut out = String::from(HEADER);
    out.push_str("\n#[allow(unused_imports)]\nuse super::*;\n");
    for def in keys {
        out.push('\n');
        let _ = writeln!(out, "/// The `{}` composite key.", def.name);
        out.push_str("#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]\n");
        let _ = writeln!(out, "pub struct {} {{", def.name);
        for field in &def.fields {
            let _ = writeln!(out, "    pub {}: {},", field.name, field.field_type.trim());
        }
        out.push_str("}\n");
    }
    out
}

/// Generate the `mod.rs` tying the generated modules together.
pub fn generate_mod_file(
    imports: &[Import],
    has_enums: bool,
    has_keys: bool,
    models: &[ModelDef],
) -> String {
    let mut modules = Vec::new();
    if has_enums {
        modules.push("enums".to_string());
    }
    if has_keys {
        modules.push("keys".to_string());
    }
    modules.extend(models.iter().map(|m| to_snake_case(&m.name)));

    let mut out = String::from(HEADER);
    out.push('\n');
    for module in &modules {
        let _ = writeln!(out, "mod {module};");
    }
    out.push('\n');
    for import in imports {
        let path = import.path.trim();
        let last = path.rsplit("::").next().unwrap_or(path);
        if last == import.name {
            let _ = writeln!(out, "pub use {path};");
        } else {
            let _ = writeln!(out, "pub use {path} as {};", import.name);
        }
    }
    for module in &modules {
        let _ = writeln!(out, "pub use {module}::*;");
    }
    out
}

/// Convert a PascalCase name to snake_case.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
