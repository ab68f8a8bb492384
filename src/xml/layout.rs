//! Whitespace layout for nodes inserted into an existing document.
//!
//! Inserted elements copy the indentation of their siblings; compact rule
//! fragments such as `<groupId>g</groupId><artifactId>a</artifactId>` are
//! spread over lines using the document's own indentation unit.

use crate::xml::document::{Element, Node};

pub(crate) const DEFAULT_INDENT: &str = "    ";

pub(crate) fn detect_newline(input: &str) -> &'static str {
    if input.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Indentation of the root's first child element, assuming the root itself
/// starts at column zero.
pub(crate) fn detect_indent_unit(root: &Element) -> String {
    root.children
        .iter()
        .position(|node| matches!(node, Node::Element(_)))
        .and_then(|index| leading_indent(&root.children, index))
        .filter(|indent| !indent.is_empty())
        .unwrap_or_else(|| DEFAULT_INDENT.to_string())
}

/// Whitespace after the last line break of a whitespace-only text.
fn trailing_indent(text: &str) -> Option<&str> {
    if !text.chars().all(char::is_whitespace) {
        return None;
    }
    text.rfind('\n').map(|pos| &text[pos + 1..])
}

pub(crate) fn is_line_break(node: &Node) -> bool {
    matches!(node, Node::Text(text) if trailing_indent(text).is_some())
}

/// Indentation of `children[index]`, read from the text node before it.
pub(crate) fn leading_indent(children: &[Node], index: usize) -> Option<String> {
    let previous = children.get(index.checked_sub(1)?)?;
    match previous {
        Node::Text(text) => trailing_indent(text).map(str::to_string),
        _ => None,
    }
}

pub(crate) fn append_indented(
    parent: &mut Element,
    parent_indent: &str,
    mut child: Element,
    unit: &str,
    newline: &str,
) {
    parent.self_closing = false;

    if parent.children.is_empty() {
        let indent = format!("{parent_indent}{unit}");
        indent_fragment(&mut child, &indent, unit, newline);
        parent.children.push(Node::Text(format!("{newline}{indent}")));
        parent.children.push(Node::Element(child));
        parent.children.push(Node::Text(format!("{newline}{parent_indent}")));
        return;
    }

    let closes_with_break = parent.children.last().is_some_and(is_line_break);
    if !closes_with_break {
        parent.children.push(Node::Element(child));
        return;
    }

    let indent = parent
        .children
        .iter()
        .rposition(|node| matches!(node, Node::Element(_)))
        .and_then(|index| leading_indent(&parent.children, index))
        .unwrap_or_else(|| format!("{parent_indent}{unit}"));
    indent_fragment(&mut child, &indent, unit, newline);

    let at = parent.children.len() - 1;
    parent.children.insert(at, Node::Element(child));
    parent.children.insert(at, Node::Text(format!("{newline}{indent}")));
}

/// Lay out a compact fragment placed at `indent`. Fragments that already
/// carry whitespace between elements are left as written.
pub(crate) fn indent_fragment(element: &mut Element, indent: &str, unit: &str, newline: &str) {
    if has_layout(element) {
        return;
    }
    indent_children(element, indent, unit, newline);
}

fn has_layout(element: &Element) -> bool {
    element.children.iter().any(|node| match node {
        Node::Element(child) => has_layout(child),
        other => other.is_whitespace(),
    })
}

fn indent_children(element: &mut Element, indent: &str, unit: &str, newline: &str) {
    // Mixed content keeps its text exactly
    let structural = element
        .children
        .iter()
        .all(|node| matches!(node, Node::Element(_) | Node::Comment(_)));
    if element.children.is_empty() || !structural {
        return;
    }

    let inner = format!("{indent}{unit}");
    for mut node in std::mem::take(&mut element.children) {
        if let Node::Element(child) = &mut node {
            indent_children(child, &inner, unit, newline);
        }
        element.children.push(Node::Text(format!("{newline}{inner}")));
        element.children.push(node);
    }
    element.children.push(Node::Text(format!("{newline}{indent}")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::document::Document;
    use pretty_assertions::assert_eq;

    fn parse_root(input: &str) -> Element {
        Document::parse(input).unwrap().into_root()
    }

    #[test]
    fn test_detect_indent_unit() {
        assert_eq!(detect_indent_unit(&parse_root("<r>\n  <a/>\n</r>")), "  ");
        assert_eq!(detect_indent_unit(&parse_root("<r>\n\t<a/>\n</r>")), "\t");
        assert_eq!(detect_indent_unit(&parse_root("<r><a/></r>")), DEFAULT_INDENT);
    }

    #[test]
    fn test_leading_indent_ignores_text_content() {
        let root = parse_root("<r>text<a/></r>");
        assert_eq!(leading_indent(&root.children, 1), None);
        assert_eq!(leading_indent(&root.children, 0), None);
    }

    #[test]
    fn test_append_after_last_sibling() {
        let mut doc = Document::parse("<r>\n  <p>\n    <a>1</a>\n  </p>\n</r>").unwrap();
        let path = doc
            .find(&crate::xml::ElementQuery::named("p"))
            .unwrap();
        assert!(doc.append_child(&path, Element::with_text("b", None, "2")));
        assert_eq!(
            doc.to_xml_string(),
            "<r>\n  <p>\n    <a>1</a>\n    <b>2</b>\n  </p>\n</r>"
        );
    }

    #[test]
    fn test_append_into_empty_container() {
        let mut doc = Document::parse("<r>\n  <p>\n  </p>\n</r>").unwrap();
        let path = doc
            .find(&crate::xml::ElementQuery::named("p"))
            .unwrap();
        assert!(doc.append_child(&path, Element::with_text("b", None, "2")));
        assert_eq!(
            doc.to_xml_string(),
            "<r>\n  <p>\n    <b>2</b>\n  </p>\n</r>"
        );
    }

    #[test]
    fn test_append_keeps_crlf() {
        let mut doc = Document::parse("<r>\r\n  <p>\r\n    <a/>\r\n  </p>\r\n</r>").unwrap();
        let path = doc
            .find(&crate::xml::ElementQuery::named("p"))
            .unwrap();
        assert!(doc.append_child(&path, Element::new("b", None)));
        assert_eq!(
            doc.to_xml_string(),
            "<r>\r\n  <p>\r\n    <a/>\r\n    <b></b>\r\n  </p>\r\n</r>"
        );
    }

    #[test]
    fn test_indent_compact_fragment() {
        let mut fragment = parse_root("<dependency><groupId>g</groupId><artifactId>a</artifactId></dependency>");
        indent_fragment(&mut fragment, "    ", "  ", "\n");

        let mut out = Document::parse("<x/>").unwrap();
        let root = out.find(&crate::xml::ElementQuery::named("x")).unwrap();
        out.append_child(&root, fragment);
        assert!(out.to_xml_string().contains(
            "<dependency>\n      <groupId>g</groupId>\n      <artifactId>a</artifactId>\n    </dependency>"
        ));
    }

    #[test]
    fn test_fragment_with_own_layout_untouched() {
        let mut fragment = parse_root("<d>\n<a/></d>");
        let before = fragment.clone();
        indent_fragment(&mut fragment, "    ", "  ", "\n");
        assert_eq!(fragment, before);
    }
}
