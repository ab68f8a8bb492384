use crate::xml::document::Element;

/// Element selector. Names are compared by local name only, so a lookup
/// matches regardless of the prefix or namespace an element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementQuery<'a> {
    /// First element with this local name
    LocalName(&'a str),
    /// First element with this local name whose full text equals `text`
    LocalNameWithText { local: &'a str, text: &'a str },
}

impl<'a> ElementQuery<'a> {
    pub fn named(local: &'a str) -> Self {
        ElementQuery::LocalName(local)
    }

    pub fn named_with_text(local: &'a str, text: &'a str) -> Self {
        ElementQuery::LocalNameWithText { local, text }
    }

    pub fn matches(&self, element: &Element) -> bool {
        match self {
            ElementQuery::LocalName(local) => element.local_name() == *local,
            // Exact comparison, no trimming: `<artifactId> x</artifactId>` is not `x`
            ElementQuery::LocalNameWithText { local, text } => {
                element.local_name() == *local && element.text() == *text
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::document::Document;

    const POM: &str = r#"<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:m="urn:mule">
  <m:artifactId>prefixed</m:artifactId>
  <dependencies>
    <dependency>
      <artifactId>mule-http-connector</artifactId>
    </dependency>
  </dependencies>
</project>"#;

    #[test]
    fn test_local_name_ignores_prefix() {
        let doc = Document::parse(POM).unwrap();
        let path = doc.find(&ElementQuery::named("artifactId")).unwrap();
        assert_eq!(doc.element(&path).unwrap().text(), "prefixed");
    }

    #[test]
    fn test_text_match_is_exact() {
        let doc = Document::parse(POM).unwrap();
        assert!(doc
            .find(&ElementQuery::named_with_text(
                "artifactId",
                "mule-http-connector"
            ))
            .is_some());
        assert!(doc
            .find(&ElementQuery::named_with_text(
                "artifactId",
                "Mule-HTTP-Connector"
            ))
            .is_none());
        assert!(doc
            .find(&ElementQuery::named_with_text("artifactId", "mule-http"))
            .is_none());
    }

    #[test]
    fn test_root_is_searched_first() {
        let doc = Document::parse(POM).unwrap();
        let path = doc.find(&ElementQuery::named("project")).unwrap();
        assert!(path.parent().is_none());
    }
}
