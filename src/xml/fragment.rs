use crate::xml::document::{Document, Element};
use crate::xml::errors::XmlError;

/// Parse rule-supplied markup as the children of a detached `<wrapper>`
/// element, then move the whole subtree into `namespace`.
///
/// `key` only labels the error when the markup is malformed.
pub fn parse_fragment(
    wrapper: &'static str,
    key: &str,
    markup: &str,
    namespace: Option<&str>,
) -> Result<Element, XmlError> {
    let source = format!("<{wrapper}>{markup}</{wrapper}>");
    let document = Document::parse(&source).map_err(|source| XmlError::Fragment {
        wrapper,
        key: key.to_string(),
        source: Box::new(source),
    })?;

    let mut element = document.into_root();
    element.stamp_namespace(namespace);
    Ok(element)
}
