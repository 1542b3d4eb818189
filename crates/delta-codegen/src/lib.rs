//! # delta-codegen
//!
//! Code generation from TOML schema definitions for delta-kit.
//!
//! Reads a `delta-schema.toml` file and generates Rust modules declaring the
//! schema's models with `#[model]`:
//!
//! - `{model}.rs`: one module per model, carrying its schema fingerprint
//! - `enums.rs`: declared enumerations
//! - `keys.rs`: composite identity types
//! - `mod.rs`: module declarations, imports and re-exports
//!
//! All generated files contain a header marking them as auto-generated.
//!
//! # Example
//!
//! ```rust
//! use delta_codegen::generate_from_str;
//!
//! let toml = r#"
//! [config]
//! output = "src/generated"
//!
//! [[enum]]
//! name = "Status"
//! variants = ["Open", "Done"]
//!
//! [[model]]
//! name = "Task"
//! fields = [
//!     { name = "id", type = "u64", modifier = "key" },
//!     { name = "title", type = "String" },
//!     { name = "status", type = "Status" },
//!     { name = "labels", type = "Set<String>" },
//! ]
//! "#;
//!
//! let output = generate_from_str(toml).unwrap();
//! assert_eq!(output.output_dir, "src/generated");
//! assert!(output.file("task.rs").unwrap().contains("labels: KeySet<String>,"));
//! ```

mod resolve;
mod schema;
pub mod templates;
mod validator;

pub use resolve::{fingerprint_of, ResolvedField, ResolvedType, TypeClass, TypeTable};
pub use schema::{EnumDef, Field, Import, KeyDef, Modifier, ModelDef, SchemaConfig, SchemaFile, TypeRef};
pub use validator::{validate_schema, ValidationError};

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

/// Error type for the code-generation process.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Failed to read the schema file or write generated files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse the TOML schema.
    #[error("parse error: {0}")]
    Parse(String),
    /// Schema validation failed.
    #[error("schema validation failed:\n{}", render_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn render_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A single generated file ready to be written to disk.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    /// Path relative to the output directory (e.g., `"order.rs"`).
    pub relative_path: String,
    /// Full file content including the auto-generated header.
    pub content: String,
}

/// The complete output of the code-generation process.
#[derive(Debug, Clone)]
pub struct GeneratedOutput {
    /// Output directory from the schema config.
    pub output_dir: String,
    /// All generated files.
    pub files: Vec<GeneratedFile>,
    /// Fingerprint of every model, by model name, in declaration order.
    pub fingerprints: Vec<(String, u64)>,
}

impl GeneratedOutput {
    /// Content of the file at `relative_path`, if generated.
    pub fn file(&self, relative_path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.relative_path == relative_path)
            .map(|f| f.content.as_str())
    }

    /// Fingerprint of the named model, if generated.
    pub fn fingerprint(&self, model: &str) -> Option<u64> {
        self.fingerprints
            .iter()
            .find(|(name, _)| name == model)
            .map(|(_, fp)| *fp)
    }

    /// Write every file below `root.join(output_dir)`, creating directories
    /// as needed.
    pub fn write_to(&self, root: &Path) -> Result<(), CodegenError> {
        let dir = root.join(&self.output_dir);
        std::fs::create_dir_all(&dir)?;
        for file in &self.files {
            let path = dir.join(&file.relative_path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &file.content)?;
            debug!(path = %path.display(), "wrote generated file");
        }
        info!(dir = %dir.display(), files = self.files.len(), "generated code written");
        Ok(())
    }
}

/// Parse a TOML schema file from disk and generate all code.
pub fn generate(schema_path: &Path) -> Result<GeneratedOutput, CodegenError> {
    let toml_content = std::fs::read_to_string(schema_path)?;
    generate_from_str(&toml_content)
}

/// Parse a TOML string and generate all code.
pub fn generate_from_str(toml_content: &str) -> Result<GeneratedOutput, CodegenError> {
    let schema: SchemaFile =
        toml::from_str(toml_content).map_err(|e| CodegenError::Parse(e.to_string()))?;
    info!(
        models = schema.models.len(),
        enums = schema.enums.len(),
        keys = schema.keys.len(),
        imports = schema.imports.len(),
        "parsed schema"
    );
    generate_from_schema(&schema)
}

/// Generate code from an already-parsed schema.
///
/// Produces a flat directory:
///
/// ```text
/// {output}/
///   mod.rs
///   enums.rs     (if any enum is declared)
///   keys.rs      (if any key type is declared)
///   {model}.rs ...
/// ```
pub fn generate_from_schema(schema: &SchemaFile) -> Result<GeneratedOutput, CodegenError> {
    validate_schema(schema).map_err(CodegenError::Validation)?;

    let table = TypeTable::new(schema);
    let mut files = Vec::new();
    let mut fingerprints = Vec::new();

    for model in &schema.models {
        let fields = table
            .resolve_model(model)
            .map_err(|message| {
                CodegenError::Validation(vec![ValidationError {
                    model: Some(model.name.clone()),
                    field: None,
                    message,
                }])
            })?;
        let fingerprint = fingerprint_of(&fields);
        debug!(model = %model.name, fingerprint, "resolved model");
        fingerprints.push((model.name.clone(), fingerprint));
        files.push(GeneratedFile {
            relative_path: templates::model_file_name(model),
            content: templates::generate_model_file(model, &fields),
        });
    }

    if !schema.enums.is_empty() {
        files.push(GeneratedFile {
            relative_path: "enums.rs".into(),
            content: templates::generate_enums_file(&schema.enums),
        });
    }
    if !schema.keys.is_empty() {
        files.push(GeneratedFile {
            relative_path: "keys.rs".into(),
            content: templates::generate_keys_file(&schema.keys),
        });
    }

    files.push(GeneratedFile {
        relative_path: "mod.rs".into(),
        content: templates::generate_mod_file(
            &schema.imports,
            !schema.enums.is_empty(),
            !schema.keys.is_empty(),
            &schema.models,
        ),
    });

    info!(files = files.len(), output = %schema.config.output, "generated code");
    Ok(GeneratedOutput {
        output_dir: schema.config.output.clone(),
        files,
        fingerprints,
    })
}
