//! Namespaced XML documents and the rule passes applied to build
//! descriptors.

pub mod document;
pub mod errors;
pub mod fragment;
mod layout;
pub mod query;
pub mod rules;

pub use document::{Attribute, Document, Element, ElementPath, Node, QName};
pub use errors::XmlError;
pub use fragment::parse_fragment;
pub use query::ElementQuery;
pub use rules::{apply_rules, patch_descriptor, PomRules};
