use std::path::{Path, PathBuf};

use delta_codegen::GeneratedOutput;
use delta_example_orders::{Customer, LineItem, Order};
use delta_kit::Model;

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn generate() -> GeneratedOutput {
    delta_codegen::generate(&manifest_dir().join("orders.toml")).unwrap()
}

#[test]
fn checked_in_code_matches_schema() {
    let output = generate();
    let dir: &Path = &manifest_dir().join(&output.output_dir);
    for file in &output.files {
        let on_disk = std::fs::read_to_string(dir.join(&file.relative_path)).unwrap();
        assert_eq!(
            on_disk, file.content,
            "{} is stale; regenerate it from orders.toml",
            file.relative_path
        );
    }
    assert_eq!(output.files.len(), 6);
}

#[test]
fn recorded_fingerprints_match_runtime() {
    assert_eq!(Customer::fingerprint(), Customer::SCHEMA_FINGERPRINT);
    assert_eq!(LineItem::fingerprint(), LineItem::SCHEMA_FINGERPRINT);
    assert_eq!(Order::fingerprint(), Order::SCHEMA_FINGERPRINT);
}

#[test]
fn generator_fingerprints_match_runtime() {
    let output = generate();
    assert_eq!(output.fingerprint("Customer"), Some(Customer::fingerprint()));
    assert_eq!(output.fingerprint("LineItem"), Some(LineItem::fingerprint()));
    assert_eq!(output.fingerprint("Order"), Some(Order::fingerprint()));
}

#[test]
fn descriptors_validate() {
    for descriptor in [
        Customer::descriptor(),
        LineItem::descriptor(),
        Order::descriptor(),
    ] {
        assert!(descriptor.validate().is_ok(), "{}", descriptor.name);
        assert_eq!(descriptor.key_field().map(|f| f.name), Some("id"));
    }
    assert_eq!(
        Order::descriptor().field("lines").map(|f| f.type_args),
        Some(&["LineKey", "LineItem"][..])
    );
}
