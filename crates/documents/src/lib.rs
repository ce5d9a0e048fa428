//! PDF documents for the dealership sales assistant
//!
//! - AcroForm inspection and text-field filling (lopdf)
//! - Resolution of flattened deal data to form field names
//! - Single and batch generation from stored templates

pub mod acroform;
pub mod error;
pub mod generator;
pub mod mapping;

pub use acroform::{fill_form, inspect_form_fields, read_text_fields, FilledForm, FormFieldInfo, FormFieldKind};
pub use error::DocumentError;
pub use generator::{BatchItem, DocumentGenerator, GeneratedDocument};
pub use mapping::{FieldMapping, MappingSource};
