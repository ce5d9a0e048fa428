//! Text processing for model responses
//!
//! Model replies carry machine-readable data inline:
//! - `<field name="KEY">VALUE</field>` for captured deal fields
//! - `<sales_suggestion>TEXT</sales_suggestion>` for a suggested phrase
//!
//! [`extract_structured`] pulls both out and returns the text to display.
//!
//! # Example
//!
//! ```
//! use dealer_assist_text_processing::extract_structured;
//!
//! let reply = extract_structured(
//!     r#"Great to meet you! <field name="firstName">Jane</field>"#,
//! );
//! assert_eq!(reply.clean_text, "Great to meet you!");
//! assert_eq!(reply.fields.get("firstName").map(String::as_str), Some("Jane"));
//! ```

pub mod markup;

pub use markup::{extract_structured, ExtractedResponse};
