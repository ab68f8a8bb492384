use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("invalid XML at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("invalid UTF-8 in XML: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("document has no root element")]
    MissingRoot,

    #[error("document has more than one root element (second: <{name}>)")]
    MultipleRoots { name: String },

    #[error("unexpected closing tag </{name}>")]
    UnexpectedEnd { name: String },

    #[error("element <{name}> is never closed")]
    Unclosed { name: String },

    #[error("text outside the root element: {text:?}")]
    TextOutsideRoot { text: String },

    #[error("malformed attribute on <{element}>: {message}")]
    Attribute { element: String, message: String },

    #[error("undeclared namespace prefix '{prefix}'")]
    UnboundPrefix { prefix: String },

    #[error("'{name}' is not a valid element name")]
    InvalidName { name: String },

    #[error("invalid <{wrapper}> fragment for '{key}': {source}")]
    Fragment {
        wrapper: &'static str,
        key: String,
        source: Box<XmlError>,
    },

    #[error("descriptor not found: {0}")]
    MissingFile(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("write error: {0}")]
    Edit(#[from] crate::edit::EditError),
}
