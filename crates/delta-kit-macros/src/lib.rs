//! Proc macros for `delta-kit`.
//!
//! Provides one macro:
//!
//! - **`#[model]`**: attribute macro that turns a struct declaration into an
//!   immutable model plus its builder, delta and delta builder, together with
//!   the `delta_kit` trait implementations tying the four roles together.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, punctuated::Punctuated, token::Comma, Attribute, Fields, GenericArgument,
    Ident, ItemStruct, Meta, PathArguments, Type,
};

/// Field names the generated types use for their own state and methods.
/// Mirrors `delta_kit::schema::RESERVED_FIELD_NAMES`.
const RESERVED_FIELD_NAMES: &[&str] = &[
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

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Scalar,
    Opaque,
    Nested,
    KeySet,
    KeyValueMap,
    KeyModelMap,
}

impl Kind {
    fn from_marker(name: &str) -> Option<Self> {
        Some(match name {
            "Scalar" => Kind::Scalar,
            "Opaque" => Kind::Opaque,
            "Nested" => Kind::Nested,
            "KeySet" => Kind::KeySet,
            "KeyValueMap" => Kind::KeyValueMap,
            "KeyModelMap" => Kind::KeyModelMap,
            _ => return None,
        })
    }

    fn marker(self) -> &'static str {
        match self {
            Kind::Scalar => "Scalar",
            Kind::Opaque => "Opaque",
            Kind::Nested => "Nested",
            Kind::KeySet => "KeySet",
            Kind::KeyValueMap => "KeyValueMap",
            Kind::KeyModelMap => "KeyModelMap",
        }
    }

    fn arity(self) -> usize {
        match self {
            Kind::KeyValueMap | Kind::KeyModelMap => 2,
            _ => 1,
        }
    }

    /// Kinds whose builder field can be read without materializing it.
    fn readable(self) -> bool {
        !matches!(self, Kind::Nested | Kind::KeyModelMap)
    }

    fn value_kind(self) -> TokenStream2 {
        let variant = Ident::new(self.marker(), Span::call_site());
        quote!(::delta_kit::ValueKind::#variant)
    }
}

struct KeyField {
    attrs: Vec<Attribute>,
    ident: Ident,
    ty: Type,
}

struct ValField {
    attrs: Vec<Attribute>,
    ident: Ident,
    ty: Type,
    kind: Kind,
    args: Vec<Type>,
}

/// Attribute macro generating a model and its three companion types.
///
/// The struct must have named fields. Exactly one field is marked `#[key]`
/// and holds the record's identity type; every other field is declared with
/// a field-kind marker from `delta_kit`: `Scalar<T>`, `Opaque<T>`,
/// `Nested<M>`, `KeySet<K>`, `KeyValueMap<K, V>` or `KeyModelMap<K, M>`.
///
/// # Attributes
///
/// - `fingerprint = N`: Optional. Fingerprint recorded by the schema the
///   struct was generated from, exposed as `SCHEMA_FINGERPRINT`.
///
/// # Generated Items
///
/// For `struct Order`:
///
/// - `Order` itself, with the kinds' immutable value types, one accessor per
///   field, `Order::builder(key)` and `Order::delta_builder(type, key)`;
///   derives `Debug`, `Clone` and `PartialEq`.
/// - `OrderBuilder` with `field()` (scalars, opaque values, sets and
///   scalar maps), `field_mut()` and `set_field()`.
/// - `OrderDelta` with `field()`, `has_field()` and, for model maps,
///   `field_flatten()`.
/// - `OrderDeltaBuilder` with `field()` and `add_field()`.
/// - Implementations of `Model`, `ModelBuilder`, `ModelDelta` and
///   `ModelDeltaBuilder`, and a static `ModelDescriptor`.
///
/// # Example
///
/// ```ignore
/// use delta_kit::prelude::*;
///
/// #[model]
/// pub struct Customer {
///     #[key]
///     id: u64,
///     name: Scalar<String>,
///     emails: KeySet<String>,
/// }
///
/// let mut builder = Customer::builder(7);
/// builder.set_name("Grace".into());
/// let customer = builder.build().unwrap();
/// assert_eq!(customer.name(), "Grace");
/// ```
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    let args = parse_macro_input!(attr with Punctuated::<Meta, Comma>::parse_terminated);

    match expand(&args, input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: &Punctuated<Meta, Comma>, input: ItemStruct) -> syn::Result<TokenStream2> {
    let fingerprint = parse_args(args)?;

    if !input.generics.params.is_empty() || input.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[model] does not support generic structs",
        ));
    }

    let named = match &input.fields {
        Fields::Named(named) => named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "#[model] requires a struct with named fields",
            ))
        }
    };

    let mut key: Option<KeyField> = None;
    let mut vals = Vec::new();

    for field in &named.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let is_key = field.attrs.iter().any(|a| a.path().is_ident("key"));
        let attrs: Vec<Attribute> = field
            .attrs
            .iter()
            .filter(|a| !a.path().is_ident("key"))
            .cloned()
            .collect();

        if is_key {
            if key.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one field may be marked #[key]",
                ));
            }
            if marker_of(&field.ty).is_some() {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "the #[key] field takes the plain identity type, not a field-kind marker",
                ));
            }
            if is_reserved(&ident, true) {
                return Err(reserved_error(&ident));
            }
            key = Some(KeyField {
                attrs,
                ident,
                ty: field.ty.clone(),
            });
            continue;
        }

        if is_reserved(&ident, false) {
            return Err(reserved_error(&ident));
        }
        let (kind, type_args) = marker_of(&field.ty).ok_or_else(|| {
            syn::Error::new_spanned(
                &field.ty,
                "unsupported field kind: expected Scalar<T>, Opaque<T>, Nested<M>, KeySet<K>, \
                 KeyValueMap<K, V> or KeyModelMap<K, M>",
            )
        })?;
        if type_args.len() != kind.arity() {
            return Err(syn::Error::new_spanned(
                &field.ty,
                format!(
                    "{} takes {} type argument(s), found {}",
                    kind.marker(),
                    kind.arity(),
                    type_args.len()
                ),
            ));
        }
        vals.push(ValField {
            attrs,
            ident,
            ty: field.ty.clone(),
            kind,
            args: type_args,
        });
    }

    let key = key.ok_or_else(|| {
        syn::Error::new(
            Span::call_site(),
            "#[model] requires exactly one field marked #[key]",
        )
    })?;

    Ok(generate(&input, &key, &vals, fingerprint))
}

fn parse_args(args: &Punctuated<Meta, Comma>) -> syn::Result<Option<u64>> {
    let mut fingerprint = None;
    for meta in args {
        match meta {
            Meta::NameValue(nv) if nv.path.is_ident("fingerprint") => {
                if let syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(lit),
                    ..
                }) = &nv.value
                {
                    fingerprint = Some(lit.base10_parse::<u64>()?);
                } else {
                    return Err(syn::Error::new_spanned(
                        &nv.value,
                        "`fingerprint` expects an integer literal",
                    ));
                }
            }
            other => {
                let key = other
                    .path()
                    .get_ident()
                    .map(|i| i.to_string())
                    .unwrap_or_default();
                return Err(syn::Error::new_spanned(
                    other.path(),
                    format!("unknown attribute `{key}`"),
                ));
            }
        }
    }
    Ok(fingerprint)
}

fn is_reserved(ident: &Ident, is_key: bool) -> bool {
    let name = ident.to_string();
    if is_key && name == "key" {
        return false;
    }
    RESERVED_FIELD_NAMES.contains(&name.as_str())
}

fn reserved_error(ident: &Ident) -> syn::Error {
    syn::Error::new_spanned(
        ident,
        format!("`{ident}` is reserved by the generated builder and delta types"),
    )
}

/// Recognise a field-kind marker and return its type arguments.
fn marker_of(ty: &Type) -> Option<(Kind, Vec<Type>)> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    let kind = Kind::from_marker(&segment.ident.to_string())?;
    let args = match &segment.arguments {
        PathArguments::AngleBracketed(angle) => angle
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Some((kind, args))
}

fn type_string(ty: &Type) -> String {
    quote!(#ty)
        .to_string()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn erase(ty: &str) -> String {
    let base = ty.split('<').next().unwrap_or(ty);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

fn generate(
    input: &ItemStruct,
    key: &KeyField,
    vals: &[ValField],
    fingerprint: Option<u64>,
) -> TokenStream2 {
    let vis = &input.vis;
    let model = &input.ident;
    let struct_attrs = &input.attrs;
    let name = model.to_string();
    let builder = format_ident!("{}Builder", model);
    let delta = format_ident!("{}Delta", model);
    let delta_builder = format_ident!("{}DeltaBuilder", model);

    let key_ident = &key.ident;
    let key_ty = &key.ty;
    let key_attrs = &key.attrs;

    let idents: Vec<&Ident> = vals.iter().map(|v| &v.ident).collect();
    let tys: Vec<&Type> = vals.iter().map(|v| &v.ty).collect();
    let field_attrs: Vec<&Vec<Attribute>> = vals.iter().map(|v| &v.attrs).collect();

    // ── Descriptor ──
    let key_ty_str = type_string(key_ty);
    let key_erased = erase(&key_ty_str);
    let key_name = key_ident.to_string();
    let mut descriptors = vec![quote! {
        ::delta_kit::FieldDescriptor {
            name: #key_name,
            modifier: ::delta_kit::FieldModifier::Key,
            kind: ::delta_kit::ValueKind::Scalar,
            type_name: #key_erased,
            type_args: &[#key_ty_str],
        }
    }];
    for val in vals {
        let field_name = val.ident.to_string();
        let args: Vec<String> = val.args.iter().map(type_string).collect();
        let type_name = match val.kind {
            Kind::Scalar | Kind::Opaque | Kind::Nested => erase(&args[0]),
            _ => val.kind.marker().to_string(),
        };
        let kind = val.kind.value_kind();
        descriptors.push(quote! {
            ::delta_kit::FieldDescriptor {
                name: #field_name,
                modifier: ::delta_kit::FieldModifier::Val,
                kind: #kind,
                type_name: #type_name,
                type_args: &[#(#args),*],
            }
        });
    }

    let schema_fingerprint = fingerprint.map(|value| {
        quote! {
            /// Fingerprint recorded by the schema this model was generated from.
            pub const SCHEMA_FINGERPRINT: u64 = #value;
        }
    });

    // ── Per-field accessors ──
    let model_getters = vals.iter().map(|v| {
        let ident = &v.ident;
        let ty = &v.ty;
        let doc = format!("The `{ident}` field.");
        quote! {
            #[doc = #doc]
            pub fn #ident(&self) -> &<#ty as ::delta_kit::FieldKind>::Value {
                &self.#ident
            }
        }
    });

    let builder_accessors = vals.iter().map(|v| {
        let ident = &v.ident;
        let ty = &v.ty;
        let mut_ident = format_ident!("{}_mut", ident);
        let set_ident = format_ident!("set_{}", ident);
        let read_doc = format!("Read `{ident}` without materializing it.");
        let mut_doc = format!("Materialize `{ident}` and borrow it mutably.");
        let set_doc = format!("Replace `{ident}`.");
        let getter = v.kind.readable().then(|| {
            quote! {
                #[doc = #read_doc]
                pub fn #ident(&self) -> &<#ty as ::delta_kit::FieldKind>::Working {
                    self.#ident.get()
                }
            }
        });
        quote! {
            #getter

            #[doc = #mut_doc]
            pub fn #mut_ident(&mut self) -> &mut <#ty as ::delta_kit::FieldKind>::Working {
                self.#ident.touch()
            }

            #[doc = #set_doc]
            pub fn #set_ident(&mut self, value: <#ty as ::delta_kit::FieldKind>::Working) -> &mut Self {
                self.#ident.set(value);
                self
            }
        }
    });

    let delta_accessors = vals.iter().map(|v| {
        let ident = &v.ident;
        let ty = &v.ty;
        let has_ident = format_ident!("has_{}", ident);
        let doc = format!("Change carried for `{ident}`, if any.");
        let has_doc = format!("Whether the delta carries a change for `{ident}`.");
        let flatten = (v.kind == Kind::KeyModelMap).then(|| {
            let flatten_ident = format_ident!("{}_flatten", ident);
            let sub_model = &v.args[1];
            let flatten_doc = format!("Nested deltas of every `{ident}` entry.");
            quote! {
                #[doc = #flatten_doc]
                pub fn #flatten_ident(&self) -> ::std::vec::Vec<&<#sub_model as ::delta_kit::Model>::Delta> {
                    self.#ident
                        .iter()
                        .flatten()
                        .map(|entry| entry.value())
                        .collect()
                }
            }
        });
        quote! {
            #[doc = #doc]
            pub fn #ident(&self) -> ::std::option::Option<&<#ty as ::delta_kit::FieldKind>::Delta> {
                self.#ident.as_ref()
            }

            #[doc = #has_doc]
            pub fn #has_ident(&self) -> bool {
                self.#ident.is_some()
            }

            #flatten
        }
    });

    let delta_builder_accessors = vals.iter().map(|v| {
        let ident = &v.ident;
        let ty = &v.ty;
        let add_ident = format_ident!("add_{}", ident);
        let doc = format!("Accumulated change for `{ident}`, if any.");
        let add_doc = format!("Merge a change for `{ident}`.");
        quote! {
            #[doc = #doc]
            pub fn #ident(&self) -> ::std::option::Option<<#ty as ::delta_kit::FieldKind>::Delta> {
                self.#ident.build()
            }

            #[doc = #add_doc]
            pub fn #add_ident(
                &mut self,
                change: &<#ty as ::delta_kit::FieldKind>::Delta,
            ) -> ::delta_kit::Result<&mut Self> {
                self.#ident.add(change)?;
                ::std::result::Result::Ok(self)
            }
        }
    });

    let model_doc = format!("Mutable working copy of [`{model}`].");
    let delta_doc = format!("Structural diff of [`{model}`].");
    let delta_builder_doc = format!("Accumulator merging [`{delta}`]s into one.");
    let key_doc = format!("The `{key_ident}` identity field.");

    quote! {
        #(#struct_attrs)*
        #[derive(Debug, Clone, PartialEq)]
        #vis struct #model {
            #(#key_attrs)*
            #key_ident: #key_ty,
            #(
                #(#field_attrs)*
                #idents: <#tys as ::delta_kit::FieldKind>::Value,
            )*
        }

        impl #model {
            #[doc = #key_doc]
            pub fn #key_ident(&self) -> &#key_ty {
                &self.#key_ident
            }

            #(#model_getters)*

            /// A fresh builder for `key` with every field at its zero value.
            pub fn builder(key: #key_ty) -> #builder {
                <#builder as ::delta_kit::ModelBuilder>::new(key)
            }

            /// An empty delta accumulator for `key`.
            pub fn delta_builder(delta_type: ::delta_kit::DeltaType, key: #key_ty) -> #delta_builder {
                <#delta_builder as ::delta_kit::ModelDeltaBuilder>::new(delta_type, key)
            }

            #schema_fingerprint
        }

        impl ::delta_kit::Model for #model {
            type Key = #key_ty;
            type Builder = #builder;
            type Delta = #delta;
            type DeltaBuilder = #delta_builder;

            fn descriptor() -> &'static ::delta_kit::ModelDescriptor {
                static DESCRIPTOR: ::delta_kit::ModelDescriptor = ::delta_kit::ModelDescriptor {
                    name: #name,
                    fields: &[#(#descriptors),*],
                };
                &DESCRIPTOR
            }

            fn fingerprint() -> u64 {
                static FINGERPRINT: ::std::sync::OnceLock<u64> = ::std::sync::OnceLock::new();
                *FINGERPRINT.get_or_init(|| <Self as ::delta_kit::Model>::descriptor().fingerprint())
            }

            fn key(&self) -> &#key_ty {
                &self.#key_ident
            }

            fn empty(key: #key_ty) -> Self {
                Self {
                    #key_ident: key,
                    #(#idents: <#tys as ::delta_kit::FieldKind>::empty(),)*
                }
            }
        }

        #[doc = #model_doc]
        #[derive(Debug)]
        #vis struct #builder {
            reference: ::std::option::Option<::std::sync::Arc<#model>>,
            last_delta_type: ::std::option::Option<::delta_kit::DeltaType>,
            #key_ident: #key_ty,
            #(#idents: ::delta_kit::Slot<#tys>,)*
        }

        impl #builder {
            #[doc = #key_doc]
            pub fn #key_ident(&self) -> &#key_ty {
                &self.#key_ident
            }

            #(#builder_accessors)*
        }

        impl ::delta_kit::ModelBuilder for #builder {
            type Model = #model;

            fn new(key: #key_ty) -> Self {
                Self {
                    reference: ::std::option::Option::None,
                    last_delta_type: ::std::option::Option::None,
                    #key_ident: key,
                    #(#idents: ::delta_kit::Slot::zeroed(),)*
                }
            }

            fn from_reference(reference: ::std::sync::Arc<#model>) -> Self {
                Self {
                    #key_ident: ::std::clone::Clone::clone(&reference.#key_ident),
                    #(#idents: ::delta_kit::Slot::deferred(::std::clone::Clone::clone(&reference.#idents)),)*
                    last_delta_type: ::std::option::Option::None,
                    reference: ::std::option::Option::Some(reference),
                }
            }

            fn key(&self) -> &#key_ty {
                &self.#key_ident
            }

            fn reference(&self) -> ::std::option::Option<&::std::sync::Arc<#model>> {
                self.reference.as_ref()
            }

            fn last_delta_type(&self) -> ::std::option::Option<::delta_kit::DeltaType> {
                self.last_delta_type
            }

            fn set_last_delta_type(
                &mut self,
                delta_type: ::std::option::Option<::delta_kit::DeltaType>,
            ) -> &mut Self {
                self.last_delta_type = delta_type;
                self
            }

            fn is_touched(&self) -> bool {
                false #(|| self.#idents.is_touched())*
            }

            fn reset(&mut self) -> &mut Self {
                #(self.#idents = ::delta_kit::Slot::zeroed();)*
                self.last_delta_type = ::std::option::Option::None;
                self
            }

            fn init(&mut self) -> &mut Self {
                #(self.#idents.init();)*
                self
            }

            fn build(&self) -> ::std::option::Option<::std::sync::Arc<#model>> {
                if self.last_delta_type == ::std::option::Option::Some(::delta_kit::DeltaType::Delete) {
                    return ::std::option::Option::None;
                }
                if !::delta_kit::ModelBuilder::is_touched(self) {
                    if let ::std::option::Option::Some(reference) = &self.reference {
                        return ::std::option::Option::Some(::std::sync::Arc::clone(reference));
                    }
                }
                ::std::option::Option::Some(::std::sync::Arc::new(#model {
                    #key_ident: ::std::clone::Clone::clone(&self.#key_ident),
                    #(#idents: self.#idents.freeze(),)*
                }))
            }

            fn apply_delta(&mut self, delta: &#delta) -> ::delta_kit::Result<&mut Self> {
                ::delta_kit::ensure_same_key("apply_delta", &self.#key_ident, &delta.#key_ident)?;
                if delta.delta_type == ::delta_kit::DeltaType::Delete {
                    ::delta_kit::__private::tracing::debug!(
                        model = #name,
                        key = ?self.#key_ident,
                        "applied delete"
                    );
                    ::delta_kit::ModelBuilder::reset(self);
                    self.last_delta_type = ::std::option::Option::Some(::delta_kit::DeltaType::Delete);
                    return ::std::result::Result::Ok(self);
                }
                self.last_delta_type = ::std::option::Option::Some(delta.delta_type);
                #(
                    if let ::std::option::Option::Some(change) = &delta.#idents {
                        self.#idents.apply(change)?;
                    }
                )*
                ::std::result::Result::Ok(self)
            }

            fn reconcile_into(
                &self,
                deltas: &mut #delta_builder,
                reference: &#model,
            ) -> ::delta_kit::Result<()> {
                ::delta_kit::ensure_same_key("reconcile", &self.#key_ident, &deltas.#key_ident)?;
                ::delta_kit::ensure_same_key("reconcile", &self.#key_ident, &reference.#key_ident)?;
                #(
                    if let ::std::option::Option::Some(change) = self.#idents.diff(&reference.#idents)? {
                        deltas.#idents.add(&change)?;
                    }
                )*
                ::std::result::Result::Ok(())
            }
        }

        #[doc = #delta_doc]
        #[derive(Debug, Clone, PartialEq)]
        #vis struct #delta {
            delta_type: ::delta_kit::DeltaType,
            #key_ident: #key_ty,
            #(#idents: ::std::option::Option<<#tys as ::delta_kit::FieldKind>::Delta>,)*
        }

        impl #delta {
            #[doc = #key_doc]
            pub fn #key_ident(&self) -> &#key_ty {
                &self.#key_ident
            }

            #(#delta_accessors)*
        }

        impl ::delta_kit::ModelDelta for #delta {
            type Model = #model;

            fn delta_type(&self) -> ::delta_kit::DeltaType {
                self.delta_type
            }

            fn key(&self) -> &#key_ty {
                &self.#key_ident
            }

            fn has_changes(&self) -> bool {
                false #(|| self.#idents.is_some())*
            }

            fn to_delta_builder(&self) -> #delta_builder {
                #delta_builder {
                    state: ::delta_kit::DeltaTypeState::new(self.delta_type),
                    #key_ident: ::std::clone::Clone::clone(&self.#key_ident),
                    #(#idents: ::delta_kit::DeltaSlot::from_delta(self.#idents.as_ref()),)*
                }
            }
        }

        #[doc = #delta_builder_doc]
        #[derive(Debug)]
        #vis struct #delta_builder {
            state: ::delta_kit::DeltaTypeState,
            #key_ident: #key_ty,
            #(#idents: ::delta_kit::DeltaSlot<#tys>,)*
        }

        impl #delta_builder {
            #[doc = #key_doc]
            pub fn #key_ident(&self) -> &#key_ty {
                &self.#key_ident
            }

            #(#delta_builder_accessors)*
        }

        impl ::delta_kit::ModelDeltaBuilder for #delta_builder {
            type Model = #model;

            fn new(delta_type: ::delta_kit::DeltaType, key: #key_ty) -> Self {
                Self {
                    state: ::delta_kit::DeltaTypeState::new(delta_type),
                    #key_ident: key,
                    #(#idents: ::delta_kit::DeltaSlot::new(),)*
                }
            }

            fn key(&self) -> &#key_ty {
                &self.#key_ident
            }

            fn delta_type(&self) -> ::delta_kit::DeltaType {
                self.state.current()
            }

            fn initial_delta_type(&self) -> ::delta_kit::DeltaType {
                self.state.initial()
            }

            fn set_delta_type(&mut self, delta_type: ::delta_kit::DeltaType) -> &mut Self {
                self.state.set(delta_type);
                self
            }

            fn reset_delta_type(&mut self) -> &mut Self {
                self.state.reset();
                self
            }

            fn add_delta(&mut self, delta: &#delta) -> ::delta_kit::Result<&mut Self> {
                ::delta_kit::ensure_same_key("add_delta", &self.#key_ident, &delta.#key_ident)?;
                self.state.absorb(delta.delta_type);
                #(
                    if let ::std::option::Option::Some(change) = &delta.#idents {
                        self.#idents.add(change)?;
                    }
                )*
                ::std::result::Result::Ok(self)
            }

            fn build_delta(&self) -> ::std::option::Option<#delta> {
                let delta = #delta {
                    delta_type: self.state.current(),
                    #key_ident: ::std::clone::Clone::clone(&self.#key_ident),
                    #(#idents: self.#idents.build(),)*
                };
                if delta.delta_type == ::delta_kit::DeltaType::Update
                    && !::delta_kit::ModelDelta::has_changes(&delta)
                {
                    return ::std::option::Option::None;
                }
                ::std::option::Option::Some(delta)
            }
        }
    }
}
