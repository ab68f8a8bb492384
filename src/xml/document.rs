//! Namespace-aware XML tree with lossless round-tripping.
//!
//! Parsed regions keep their raw text (start tags, character data, comments,
//! declarations), so serializing an untouched document reproduces the input
//! byte-for-byte. Only nodes synthesized or rewritten by the rule engine are
//! rendered from their structured form.

use crate::xml::errors::XmlError;
use crate::xml::layout;
use crate::xml::query::ElementQuery;
use quick_xml::escape::{partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, kept escaped exactly as read
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    Declaration(String),
    DocType(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, Node::Text(text) if text.chars().all(char::is_whitespace))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl QName {
    /// Whether `name` can stand alone as an unprefixed element name
    /// (an XML NCName).
    pub fn is_ncname(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if is_name_start(first) => chars.all(is_name_char),
            _ => false,
        }
    }
}

fn is_name_start(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    /// Value as written in the source, entities still escaped
    pub raw_value: String,
}

impl Attribute {
    pub fn value(&self) -> Cow<'_, str> {
        unescape(&self.raw_value).unwrap_or(Cow::Borrowed(self.raw_value.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    /// Resolved namespace URI (`None` when unqualified)
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub(crate) self_closing: bool,
    /// Start tag content as read; dropped once the name or namespace changes
    raw_start: Option<String>,
}

impl Element {
    pub fn new(local: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: QName {
                prefix: None,
                local: local.into(),
            },
            namespace: namespace.map(str::to_string),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
            raw_start: None,
        }
    }

    pub fn with_text(local: impl Into<String>, namespace: Option<&str>, text: &str) -> Self {
        let mut element = Self::new(local, namespace);
        element.set_text(text);
        element
    }

    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    pub fn attribute(&self, key: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(Attribute::value)
    }

    /// Concatenated, unescaped text of every descendant.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(raw) => match unescape(raw) {
                    Ok(text) => out.push_str(&text),
                    Err(_) => out.push_str(raw),
                },
                Node::CData(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
                _ => {}
            }
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, value: &str) {
        self.children.clear();
        if !value.is_empty() {
            self.children
                .push(Node::Text(partial_escape(value).into_owned()));
        }
        self.self_closing = false;
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing && self.children.is_empty()
    }

    /// Move this element and every descendant into `namespace`.
    ///
    /// Prefixes and default-namespace declarations are dropped so the subtree
    /// renders unprefixed and inherits the namespace of its insertion point.
    pub fn stamp_namespace(&mut self, namespace: Option<&str>) {
        self.namespace = namespace.map(str::to_string);
        self.name.prefix = None;
        self.raw_start = None;
        self.attributes.retain(|attr| attr.key != "xmlns");
        for child in &mut self.children {
            if let Node::Element(element) = child {
                element.stamp_namespace(namespace);
            }
        }
    }

    fn declared_default_namespace(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == "xmlns")
            .map(|attr| attr.raw_value.as_str())
    }
}

/// Location of an element: index into the document's top-level nodes, then
/// child indices down to the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath(Vec<usize>);

impl ElementPath {
    /// Path of the enclosing element; `None` for the root element.
    pub fn parent(&self) -> Option<ElementPath> {
        self.split_last().map(|(parent, _)| parent)
    }

    fn split_last(&self) -> Option<(ElementPath, usize)> {
        if self.0.len() < 2 {
            return None;
        }
        let (last, parent) = self.0.split_last()?;
        Some((ElementPath(parent.to_vec()), *last))
    }

    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    bom: bool,
    nodes: Vec<Node>,
    root_index: usize,
    default_namespace: Option<String>,
    newline: &'static str,
    indent_unit: String,
}

impl Document {
    pub fn parse(input: &str) -> Result<Self, XmlError> {
        let (bom, body) = match input.strip_prefix('\u{feff}') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let mut reader = NsReader::from_str(body);
        reader.config_mut().trim_text(false);

        let mut nodes = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root_index = None;

        loop {
            let next = reader.read_resolved_event();
            let (resolved, event) = match next {
                Ok((resolved, event)) => (resolved_namespace(resolved), event),
                Err(source) => {
                    return Err(XmlError::Syntax {
                        position: reader.buffer_position() as u64,
                        message: source.to_string(),
                    })
                }
            };

            let node = match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start, resolved?, false)?);
                    continue;
                }
                Event::Empty(start) => Node::Element(element_from_start(&start, resolved?, true)?),
                Event::End(end) => {
                    let element = stack.pop().ok_or_else(|| XmlError::UnexpectedEnd {
                        name: String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                    })?;
                    Node::Element(element)
                }
                Event::Text(text) => Node::Text(utf8(&text)?),
                Event::CData(data) => Node::CData(utf8(&data)?),
                Event::Comment(comment) => Node::Comment(utf8(&comment)?),
                Event::PI(pi) => Node::ProcessingInstruction(utf8(&pi)?),
                Event::Decl(decl) => Node::Declaration(utf8(&decl)?),
                Event::DocType(doctype) => Node::DocType(utf8(&doctype)?),
                Event::Eof => break,
            };

            attach(&mut stack, &mut nodes, &mut root_index, node)?;
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::Unclosed {
                name: open.name.to_string(),
            });
        }
        let root_index = root_index.ok_or(XmlError::MissingRoot)?;

        let root = nodes[root_index]
            .as_element()
            .ok_or(XmlError::MissingRoot)?;
        let default_namespace = root
            .declared_default_namespace()
            .filter(|ns| !ns.is_empty())
            .map(str::to_string);
        let indent_unit = layout::detect_indent_unit(root);

        Ok(Self {
            bom,
            nodes,
            root_index,
            default_namespace,
            newline: layout::detect_newline(body),
            indent_unit,
        })
    }

    /// Default namespace declared on the root element, captured at parse time.
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    pub fn root(&self) -> &Element {
        match &self.nodes[self.root_index] {
            Node::Element(element) => element,
            _ => unreachable!("root_index always points at an element"),
        }
    }

    pub fn into_root(mut self) -> Element {
        match self.nodes.swap_remove(self.root_index) {
            Node::Element(element) => element,
            _ => unreachable!("root_index always points at an element"),
        }
    }

    /// First element in document order (root included) matching `query`.
    pub fn find(&self, query: &ElementQuery<'_>) -> Option<ElementPath> {
        let mut path = vec![self.root_index];
        find_in(self.root(), query, &mut path).then_some(ElementPath(path))
    }

    pub fn element(&self, path: &ElementPath) -> Option<&Element> {
        let (first, rest) = path.0.split_first()?;
        let mut current = self.nodes.get(*first)?.as_element()?;
        for index in rest {
            current = current.children.get(*index)?.as_element()?;
        }
        Some(current)
    }

    pub fn element_mut(&mut self, path: &ElementPath) -> Option<&mut Element> {
        let (first, rest) = path.0.split_first()?;
        let mut current = self.nodes.get_mut(*first)?.as_element_mut()?;
        for index in rest {
            current = current.children.get_mut(*index)?.as_element_mut()?;
        }
        Some(current)
    }

    /// Swap the element at `path` for `replacement`, indenting a compact
    /// replacement to match its position. Returns the detached element, or
    /// `None` when `path` is the root or does not resolve.
    pub fn replace(&mut self, path: &ElementPath, mut replacement: Element) -> Option<Element> {
        let (parent_path, index) = path.split_last()?;
        let unit = self.indent_unit.clone();
        let newline = self.newline;

        let parent = self.element_mut(&parent_path)?;
        parent.children.get(index)?.as_element()?;

        let indent = layout::leading_indent(&parent.children, index).unwrap_or_default();
        layout::indent_fragment(&mut replacement, &indent, &unit, newline);

        match std::mem::replace(&mut parent.children[index], Node::Element(replacement)) {
            Node::Element(old) => Some(old),
            _ => None,
        }
    }

    /// Detach the element at `path` together with the line break leading up
    /// to it. Returns `None` when `path` is the root or does not resolve.
    pub fn remove(&mut self, path: &ElementPath) -> Option<Element> {
        let (parent_path, index) = path.split_last()?;
        let parent = self.element_mut(&parent_path)?;
        parent.children.get(index)?.as_element()?;

        let removed = parent.children.remove(index);
        if index > 0 && layout::is_line_break(&parent.children[index - 1]) {
            parent.children.remove(index - 1);
        }

        match removed {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Append `child` as the last element child of the element at `parent`,
    /// laid out like its siblings. Returns `false` if `parent` does not resolve.
    pub fn append_child(&mut self, parent: &ElementPath, child: Element) -> bool {
        let parent_indent = self.indent_of(parent);
        let unit = self.indent_unit.clone();
        let newline = self.newline;

        match self.element_mut(parent) {
            Some(element) => {
                layout::append_indented(element, &parent_indent, child, &unit, newline);
                true
            }
            None => false,
        }
    }

    fn indent_of(&self, path: &ElementPath) -> String {
        path.split_last()
            .and_then(|(parent_path, index)| {
                let parent = self.element(&parent_path)?;
                layout::leading_indent(&parent.children, index)
            })
            .unwrap_or_default()
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push('\u{feff}');
        }
        for node in &self.nodes {
            write_node(&mut out, node, None);
        }
        out
    }
}

fn find_in(element: &Element, query: &ElementQuery<'_>, path: &mut Vec<usize>) -> bool {
    if query.matches(element) {
        return true;
    }
    for (index, child) in element.children.iter().enumerate() {
        if let Node::Element(child) = child {
            path.push(index);
            if find_in(child, query, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

fn attach(
    stack: &mut [Element],
    nodes: &mut Vec<Node>,
    root_index: &mut Option<usize>,
    node: Node,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }

    match &node {
        Node::Element(element) => {
            if root_index.is_some() {
                return Err(XmlError::MultipleRoots {
                    name: element.name.to_string(),
                });
            }
            *root_index = Some(nodes.len());
        }
        Node::Text(text) if !text.trim().is_empty() => {
            return Err(XmlError::TextOutsideRoot { text: text.clone() });
        }
        _ => {}
    }
    nodes.push(node);
    Ok(())
}

fn resolved_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>, XmlError> {
    match resolved {
        ResolveResult::Bound(namespace) => Ok(Some(
            String::from_utf8_lossy(namespace.into_inner()).into_owned(),
        )),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(XmlError::UnboundPrefix {
            prefix: String::from_utf8_lossy(&prefix).into_owned(),
        }),
    }
}

fn utf8(bytes: &[u8]) -> Result<String, XmlError> {
    Ok(std::str::from_utf8(bytes)?.to_string())
}

fn element_from_start(
    start: &BytesStart<'_>,
    namespace: Option<String>,
    self_closing: bool,
) -> Result<Element, XmlError> {
    let qname = start.name();
    let prefix = match qname.prefix() {
        Some(prefix) => Some(utf8(prefix.as_ref())?),
        None => None,
    };
    let name = QName {
        prefix,
        local: utf8(qname.local_name().as_ref())?,
    };

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Attribute {
            element: name.to_string(),
            message: e.to_string(),
        })?;
        attributes.push(Attribute {
            key: utf8(attr.key.as_ref())?,
            raw_value: utf8(&attr.value)?,
        });
    }

    Ok(Element {
        name,
        namespace,
        attributes,
        children: Vec::new(),
        self_closing,
        raw_start: Some(utf8(start)?),
    })
}

fn write_node<'a>(out: &mut String, node: &'a Node, scope: Option<&'a str>) {
    match node {
        Node::Element(element) => write_element(out, element, scope),
        Node::Text(text) => out.push_str(text),
        Node::CData(text) => {
            out.push_str("<![CDATA[");
            out.push_str(text);
            out.push_str("]]>");
        }
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Node::ProcessingInstruction(text) | Node::Declaration(text) => {
            out.push_str("<?");
            out.push_str(text);
            out.push_str("?>");
        }
        Node::DocType(text) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(text);
            out.push('>');
        }
    }
}

/// `scope` is the default namespace in effect where `element` is written.
fn write_element<'a>(out: &mut String, element: &'a Element, scope: Option<&'a str>) {
    let name = element.name.to_string();

    out.push('<');
    match &element.raw_start {
        Some(raw) => out.push_str(raw),
        None => {
            out.push_str(&name);
            for attr in &element.attributes {
                let quote = if attr.raw_value.contains('"') { '\'' } else { '"' };
                out.push(' ');
                out.push_str(&attr.key);
                out.push('=');
                out.push(quote);
                out.push_str(&attr.raw_value);
                out.push(quote);
            }
        }
    }

    let scope = match element.declared_default_namespace() {
        Some(declared) => Some(declared),
        None if element.name.prefix.is_none() && element.namespace.as_deref() != scope => {
            out.push_str(" xmlns=\"");
            out.push_str(&partial_escape(element.namespace.as_deref().unwrap_or("")));
            out.push('"');
            element.namespace.as_deref()
        }
        None => scope,
    }
    .filter(|ns| !ns.is_empty());

    if element.is_self_closing() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(out, child, scope);
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}
