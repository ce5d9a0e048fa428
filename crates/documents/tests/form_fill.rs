//! Form filling against PDFs built in-test

use dealer_assist_config::DealerDomainConfig;
use dealer_assist_core::{DiscoveredField, DocumentTemplate, FormFieldSet};
use dealer_assist_documents::{
    fill_form, inspect_form_fields, read_text_fields, DocumentError, DocumentGenerator,
    FormFieldKind,
};
use dealer_assist_persistence::{
    InMemoryFileStore, InMemoryTemplateStore, TemplateFileStore, TemplateStore,
};
use lopdf::{dictionary, Document, Object};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Build a one-page PDF whose form has the given (name, FT) fields
fn build_form(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let field_refs: Vec<Object> = fields
        .iter()
        .map(|(name, ft)| {
            let id = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => Object::Name(ft.as_bytes().to_vec()),
                "T" => Object::string_literal(*name),
                "Rect" => vec![0.into(), 0.into(), 200.into(), 20.into()],
            });
            Object::Reference(id)
        })
        .collect();

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Annots" => field_refs.clone(),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let form_id = doc.add_object(dictionary! { "Fields" => field_refs });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => form_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A form with a parent field "buyer" holding text kids "first" and "last"
fn build_nested_form() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let parent_id = doc.new_object_id();
    let first_id = doc.add_object(dictionary! {
        "T" => Object::string_literal("first"),
        "Parent" => parent_id,
    });
    let last_id = doc.add_object(dictionary! {
        "T" => Object::string_literal("last"),
        "Parent" => parent_id,
    });
    doc.objects.insert(
        parent_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("buyer"),
            "FT" => "Tx",
            "Kids" => vec![first_id.into(), last_id.into()],
        }),
    );
    let form_id = doc.add_object(dictionary! { "Fields" => vec![parent_id.into()] });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "AcroForm" => form_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_inspect_lists_fields() {
    let pdf = build_form(&[("NAME_FIRST", "Tx"), ("AGREE", "Btn")]);
    let fields = inspect_form_fields(&pdf).unwrap();

    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "NAME_FIRST");
    assert_eq!(fields[0].kind, FormFieldKind::Text);
    assert_eq!(fields[1].kind, FormFieldKind::Button);
    assert!(fields[0].value.is_none());
}

#[test]
fn test_fill_is_idempotent() {
    let pdf = build_form(&[("NAME_FIRST", "Tx"), ("NAME_LAST", "Tx")]);
    let data = values(&[("NAME_FIRST", "Jane"), ("NAME_LAST", "Doe")]);

    let first = fill_form(&pdf, &data).unwrap();
    let second = fill_form(&pdf.clone(), &data).unwrap();

    assert_eq!(first.bytes, second.bytes);
    let read = read_text_fields(&first.bytes).unwrap();
    assert_eq!(read.get("NAME_FIRST").map(String::as_str), Some("Jane"));
    assert_eq!(read.get("NAME_LAST").map(String::as_str), Some("Doe"));
}

#[test]
fn test_absent_fields_do_not_affect_present_ones() {
    let pdf = build_form(&[("NAME_FIRST", "Tx")]);

    let plain = fill_form(&pdf, &values(&[("NAME_FIRST", "Jane")])).unwrap();
    let extra = fill_form(
        &pdf,
        &values(&[("NAME_FIRST", "Jane"), ("NOT_IN_FORM", "x")]),
    )
    .unwrap();

    assert_eq!(extra.missing, vec!["NOT_IN_FORM".to_string()]);
    assert_eq!(plain.bytes, extra.bytes);
}

#[test]
fn test_non_text_fields_skipped() {
    let pdf = build_form(&[("NAME_FIRST", "Tx"), ("AGREE", "Btn")]);
    let filled = fill_form(&pdf, &values(&[("AGREE", "Yes"), ("NAME_FIRST", "Jane")])).unwrap();

    assert_eq!(filled.filled, vec!["NAME_FIRST".to_string()]);
    assert_eq!(filled.skipped, vec!["AGREE".to_string()]);
    let read = read_text_fields(&filled.bytes).unwrap();
    assert!(!read.contains_key("AGREE"));
}

#[test]
fn test_nested_names_and_inherited_type() {
    let pdf = build_nested_form();
    let names: Vec<_> = inspect_form_fields(&pdf)
        .unwrap()
        .into_iter()
        .map(|f| (f.name, f.kind))
        .collect();
    assert_eq!(
        names,
        vec![
            ("buyer.first".to_string(), FormFieldKind::Text),
            ("buyer.last".to_string(), FormFieldKind::Text),
        ]
    );

    let filled = fill_form(&pdf, &values(&[("buyer.last", "Doe")])).unwrap();
    let read = read_text_fields(&filled.bytes).unwrap();
    assert_eq!(read.get("buyer.last").map(String::as_str), Some("Doe"));
}

#[test]
fn test_pdf_without_form() {
    let mut doc = Document::with_version("1.5");
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog" });
    doc.trailer.set("Root", catalog_id);
    let mut pdf = Vec::new();
    doc.save_to(&mut pdf).unwrap();

    assert!(inspect_form_fields(&pdf).unwrap().is_empty());
    let filled = fill_form(&pdf, &values(&[("NAME_FIRST", "Jane")])).unwrap();
    assert!(filled.filled.is_empty());
}

struct Fixture {
    generator: DocumentGenerator,
    templates: Arc<InMemoryTemplateStore>,
    files: Arc<InMemoryFileStore>,
}

fn fixture() -> Fixture {
    let domain = Arc::new(DealerDomainConfig::builtin().unwrap());
    let templates = Arc::new(InMemoryTemplateStore::new());
    let files = Arc::new(InMemoryFileStore::new());
    let generator = DocumentGenerator::new(domain, templates.clone(), files.clone());
    Fixture {
        generator,
        templates,
        files,
    }
}

#[tokio::test]
async fn test_generate_with_default_mapping() {
    let fx = fixture();
    let template = DocumentTemplate::new("Delivery Report", "delivery.pdf")
        .with_document_id("delivery-report");
    fx.templates.save(&template).await.unwrap();
    fx.files
        .put(&template.storage_key(), &build_form(&[("NAME_FIRST", "Tx"), ("Last Name", "Tx"), ("VIN", "Tx")]))
        .await
        .unwrap();

    let data = values(&[
        ("firstName", "Jane"),
        ("lastName", "Doe"),
        ("vehicle_vin", "1HGCM82633A004352"),
        ("lender_name", "ABC Financial"),
    ]);
    let document = fx.generator.generate(&template.id, &data).await.unwrap();

    assert_eq!(document.filename, "delivery-filled.pdf");
    let read = read_text_fields(&document.bytes).unwrap();
    assert_eq!(read.get("NAME_FIRST").map(String::as_str), Some("Jane"));
    assert_eq!(read.get("Last Name").map(String::as_str), Some("Doe"));
    assert_eq!(read.get("VIN").map(String::as_str), Some("1HGCM82633A004352"));
}

#[tokio::test]
async fn test_generate_with_analysed_mapping() {
    let fx = fixture();
    let template = DocumentTemplate::new("Custom", "custom.pdf");
    fx.templates.save(&template).await.unwrap();
    fx.templates
        .set_form_fields(
            &template.id,
            &FormFieldSet::new(vec![DiscoveredField {
                id: "BUYER".to_string(),
                label: "Buyer".to_string(),
                field_type: "text".to_string(),
                page: Some(1),
                section: None,
                mappings: vec!["lastName".to_string()],
            }]),
        )
        .await
        .unwrap();
    fx.files
        .put(&template.storage_key(), &build_form(&[("BUYER", "Tx"), ("First Name", "Tx")]))
        .await
        .unwrap();

    let data = values(&[("firstName", "Jane"), ("lastName", "Doe")]);
    let document = fx.generator.generate(&template.id, &data).await.unwrap();

    let read = read_text_fields(&document.bytes).unwrap();
    assert_eq!(read.get("BUYER").map(String::as_str), Some("Doe"));
    // defaults are not consulted once a template has its own mapping
    assert!(!read.contains_key("First Name"));
}

#[tokio::test]
async fn test_batch_reports_each_template() {
    let fx = fixture();
    let good = DocumentTemplate::new("Privacy Policy", "privacy.pdf")
        .with_document_id("privacy-policy");
    let no_file = DocumentTemplate::new("Deal Check List", "missing.pdf")
        .with_document_id("deal-check-list");
    fx.templates.save(&good).await.unwrap();
    fx.templates.save(&no_file).await.unwrap();
    fx.files
        .put(&good.storage_key(), &build_form(&[("First Name", "Tx")]))
        .await
        .unwrap();

    let ids = vec![no_file.id.clone(), "unknown".to_string(), good.id.clone()];
    let items = fx
        .generator
        .generate_batch(&ids, &values(&[("firstName", "Jane")]))
        .await;

    assert_eq!(items.len(), 3);
    assert!(matches!(items[0].result, Err(DocumentError::FileUnavailable(_))));
    assert!(matches!(items[1].result, Err(DocumentError::TemplateNotFound(_))));
    assert!(items[2].result.is_ok());

    let required = vec!["deal-check-list".to_string(), "privacy-policy".to_string()];
    let ordered = fx
        .generator
        .templates_for_scenario("new-no-trade", &required)
        .await
        .unwrap();
    assert_eq!(ordered[0].id, no_file.id);
    assert_eq!(ordered[1].id, good.id);
}
