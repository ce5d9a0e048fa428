//! AcroForm access over lopdf
//!
//! Fields are addressed by their fully qualified name: partial names (`T`) joined
//! with `.` from the root of the field tree. Field type (`FT`) is inherited from
//! ancestors. Only text fields are written.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::DocumentError;

const MAX_FIELD_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldKind {
    Text,
    Button,
    Choice,
    Signature,
    Unknown,
}

impl FormFieldKind {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"Tx" => FormFieldKind::Text,
            b"Btn" => FormFieldKind::Button,
            b"Ch" => FormFieldKind::Choice,
            b"Sig" => FormFieldKind::Signature,
            _ => FormFieldKind::Unknown,
        }
    }
}

/// A terminal form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormFieldInfo {
    pub name: String,
    pub kind: FormFieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Outcome of a fill
#[derive(Debug, Clone, Default)]
pub struct FilledForm {
    pub bytes: Vec<u8>,
    /// Form field names that received a value
    pub filled: Vec<String>,
    /// Names that exist but are not text fields
    pub skipped: Vec<String>,
    /// Names the form does not have
    pub missing: Vec<String>,
}

struct FieldNode {
    id: ObjectId,
    name: String,
    kind: FormFieldKind,
}

fn load(bytes: &[u8]) -> Result<Document, DocumentError> {
    Document::load_mem(bytes).map_err(|e| DocumentError::Parse(e.to_string()))
}

fn catalog_id(doc: &Document) -> Option<ObjectId> {
    doc.trailer.get(b"Root").ok()?.as_reference().ok()
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn resolve_array<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Vec<Object>> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok(),
        Object::Array(items) => Some(items),
        _ => None,
    }
}

fn acroform(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.get_dictionary(catalog_id(doc)?).ok()?;
    resolve_dict(doc, catalog.get(b"AcroForm").ok()?)
}

/// Decode a PDF text string (UTF-16BE with BOM, else PDFDocEncoding as Latin-1)
fn decode_text(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => {
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let units: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                Some(String::from_utf16_lossy(&units))
            } else {
                Some(bytes.iter().map(|&b| b as char).collect())
            }
        }
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn encode_text(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn named_kids(doc: &Document, dict: &Dictionary) -> Vec<ObjectId> {
    dict.get(b"Kids")
        .ok()
        .and_then(|kids| resolve_array(doc, kids))
        .map(|kids| {
            kids.iter()
                .filter_map(|kid| kid.as_reference().ok())
                .filter(|id| doc.get_dictionary(*id).is_ok_and(|d| d.has(b"T")))
                .collect()
        })
        .unwrap_or_default()
}

fn walk(
    doc: &Document,
    id: ObjectId,
    parent: &str,
    inherited: Option<FormFieldKind>,
    depth: usize,
    out: &mut Vec<FieldNode>,
) {
    if depth > MAX_FIELD_DEPTH {
        tracing::warn!(?id, "Form field tree too deep, stopping");
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };

    let name = match dict.get(b"T").ok().and_then(decode_text) {
        Some(partial) if parent.is_empty() => partial,
        Some(partial) => format!("{parent}.{partial}"),
        None => parent.to_string(),
    };
    let kind = dict
        .get(b"FT")
        .ok()
        .and_then(|ft| ft.as_name().ok())
        .map(FormFieldKind::from_name)
        .or(inherited);

    let kids = named_kids(doc, dict);
    if kids.is_empty() {
        if !name.is_empty() {
            out.push(FieldNode {
                id,
                name,
                kind: kind.unwrap_or(FormFieldKind::Unknown),
            });
        }
        return;
    }
    for kid in kids {
        walk(doc, kid, &name, kind, depth + 1, out);
    }
}

fn collect_fields(doc: &Document) -> Vec<FieldNode> {
    let mut out = Vec::new();
    let Some(fields) = acroform(doc)
        .and_then(|form| form.get(b"Fields").ok())
        .and_then(|fields| resolve_array(doc, fields))
    else {
        return out;
    };

    for field in fields {
        if let Ok(id) = field.as_reference() {
            walk(doc, id, "", None, 0, &mut out);
        }
    }
    out
}

/// List the terminal fields of a PDF form; a PDF without a form yields an empty list
pub fn inspect_form_fields(bytes: &[u8]) -> Result<Vec<FormFieldInfo>, DocumentError> {
    let doc = load(bytes)?;
    Ok(collect_fields(&doc)
        .into_iter()
        .map(|node| FormFieldInfo {
            value: doc
                .get_dictionary(node.id)
                .ok()
                .and_then(|d| d.get(b"V").ok())
                .and_then(decode_text),
            name: node.name,
            kind: node.kind,
        })
        .collect())
}

/// Current values of all text fields that have one
pub fn read_text_fields(bytes: &[u8]) -> Result<BTreeMap<String, String>, DocumentError> {
    Ok(inspect_form_fields(bytes)?
        .into_iter()
        .filter(|f| f.kind == FormFieldKind::Text)
        .filter_map(|f| f.value.map(|v| (f.name, v)))
        .collect())
}

fn set_need_appearances(doc: &mut Document) {
    let Some(root) = catalog_id(doc) else {
        return;
    };
    let form_ref = doc
        .get_dictionary(root)
        .ok()
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|form| form.as_reference().ok());

    match form_ref {
        Some(id) => {
            if let Ok(form) = doc.get_dictionary_mut(id) {
                form.set("NeedAppearances", true);
            }
        }
        None => {
            if let Ok(Object::Dictionary(form)) = doc
                .get_dictionary_mut(root)
                .and_then(|catalog| catalog.get_mut(b"AcroForm"))
            {
                form.set("NeedAppearances", true);
            }
        }
    }
}

/// Write values into same-named text fields.
///
/// Names the form lacks and non-text fields are reported and skipped.
pub fn fill_form(
    bytes: &[u8],
    values: &BTreeMap<String, String>,
) -> Result<FilledForm, DocumentError> {
    let mut doc = load(bytes)?;
    let nodes = collect_fields(&doc);
    let by_name: HashMap<&str, &FieldNode> = nodes.iter().map(|n| (n.name.as_str(), n)).collect();

    let mut result = FilledForm::default();
    for (name, value) in values {
        match by_name.get(name.as_str()) {
            Some(node) if node.kind == FormFieldKind::Text => {
                if let Ok(dict) = doc.get_dictionary_mut(node.id) {
                    dict.set("V", encode_text(value));
                    result.filled.push(name.clone());
                }
            }
            Some(_) => result.skipped.push(name.clone()),
            None => result.missing.push(name.clone()),
        }
    }

    if !result.filled.is_empty() {
        set_need_appearances(&mut doc);
    }

    doc.save_to(&mut result.bytes)
        .map_err(|e| DocumentError::Write(e.to_string()))?;
    Ok(result)
}
