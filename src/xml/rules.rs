//! Rule passes over a parsed build descriptor.
//!
//! Passes run in a fixed order (properties, dependency replacement,
//! dependency deletion, repositories) and each rule is applied in its
//! set's order. Lookups that miss are logged and skipped; a malformed rule
//! fragment aborts the whole document before anything is written.

use std::path::Path;

use crate::config::{RuleBook, RuleSet};
use crate::edit::{Rewrite, RewriteResult};
use crate::log::{OperationLog, Outcome};
use crate::xml::document::{Document, Element, ElementPath, QName};
use crate::xml::errors::XmlError;
use crate::xml::fragment::parse_fragment;
use crate::xml::query::ElementQuery;

const PROPERTIES: &str = "properties";
const DEPENDENCY: &str = "dependency";
const ARTIFACT_ID: &str = "artifactId";
const REPOSITORY: &str = "repository";
const REPOSITORIES: &str = "repositories";
const REPOSITORY_ID: &str = "id";

/// The four rule sets that touch the build descriptor.
#[derive(Debug, Clone, Copy)]
pub struct PomRules<'a> {
    pub properties: &'a RuleSet,
    pub dependency_replacements: &'a RuleSet,
    pub dependency_deletions: &'a RuleSet,
    pub repositories: &'a RuleSet,
}

impl<'a> PomRules<'a> {
    pub fn from_book(book: &'a RuleBook) -> Self {
        Self {
            properties: &book.replace_properties,
            dependency_replacements: &book.replace_dependencies,
            dependency_deletions: &book.delete_dependencies,
            repositories: &book.replace_repositories,
        }
    }
}

/// Apply every pass to `doc` in place.
///
/// On `Err` the document may be partially mutated; callers must discard it
/// rather than serialize it.
pub fn apply_rules(
    doc: &mut Document,
    rules: &PomRules<'_>,
    log: &mut OperationLog,
) -> Result<(), XmlError> {
    let namespace = doc.default_namespace().map(str::to_string);
    let namespace = namespace.as_deref();

    log.section(PROPERTIES);
    upsert_properties(doc, rules.properties, namespace, log)?;
    log.section("properties done");

    log.section("dependencies");
    replace_dependencies(doc, rules.dependency_replacements, namespace, log)?;
    delete_dependencies(doc, rules.dependency_deletions, log);
    log.section("dependencies done");

    log.section(REPOSITORIES);
    upsert_repositories(doc, rules.repositories, namespace, log)?;
    log.section("repositories done");

    Ok(())
}

fn upsert_properties(
    doc: &mut Document,
    rules: &RuleSet,
    namespace: Option<&str>,
    log: &mut OperationLog,
) -> Result<(), XmlError> {
    if let Some(rule) = rules.iter().find(|rule| !QName::is_ncname(&rule.key)) {
        return Err(XmlError::InvalidName {
            name: rule.key.clone(),
        });
    }

    for rule in rules {
        if let Some(element) = doc
            .find(&ElementQuery::named(&rule.key))
            .and_then(|path| doc.element_mut(&path))
        {
            element.set_text(&rule.value);
            log.push(
                Outcome::Updated,
                format!("Node {} value updated successfully!", rule.key),
            );
            continue;
        }

        log.push(
            Outcome::NotFound,
            format!("Target {} node not found.", rule.key),
        );
        match doc.find(&ElementQuery::named(PROPERTIES)) {
            Some(container) => {
                let property = Element::with_text(rule.key.as_str(), namespace, &rule.value);
                doc.append_child(&container, property);
                log.push(
                    Outcome::Added,
                    format!("properties {} added successfully!", rule.key),
                );
            }
            None => log.push(Outcome::NotFound, "properties not found."),
        }
    }
    Ok(())
}

fn replace_dependencies(
    doc: &mut Document,
    rules: &RuleSet,
    namespace: Option<&str>,
    log: &mut OperationLog,
) -> Result<(), XmlError> {
    for rule in rules {
        let query = ElementQuery::named_with_text(ARTIFACT_ID, &rule.key);
        let replaced = match enclosing(doc, &query) {
            Some(target) => {
                let dependency = parse_fragment(DEPENDENCY, &rule.key, &rule.value, namespace)?;
                doc.replace(&target, dependency).is_some()
            }
            None => false,
        };

        if replaced {
            log.push(
                Outcome::Updated,
                format!("Dependency {} updated successfully!", rule.key),
            );
        } else {
            log.push(
                Outcome::NotFound,
                format!("Dependency {} not found.", rule.key),
            );
        }
    }
    Ok(())
}

fn delete_dependencies(doc: &mut Document, rules: &RuleSet, log: &mut OperationLog) {
    for rule in rules {
        let query = ElementQuery::named_with_text(ARTIFACT_ID, &rule.key);
        let removed = enclosing(doc, &query).and_then(|target| doc.remove(&target));

        if removed.is_some() {
            log.push(
                Outcome::Removed,
                format!("Dependency {} removed successfully!", rule.key),
            );
        } else {
            log.push(
                Outcome::NotFound,
                format!("Dependency {} not found.", rule.key),
            );
        }
    }
}

fn upsert_repositories(
    doc: &mut Document,
    rules: &RuleSet,
    namespace: Option<&str>,
    log: &mut OperationLog,
) -> Result<(), XmlError> {
    for rule in rules {
        let query = ElementQuery::named_with_text(REPOSITORY_ID, &rule.key);
        if let Some(target) = enclosing(doc, &query) {
            let repository = parse_fragment(REPOSITORY, &rule.key, &rule.value, namespace)?;
            doc.replace(&target, repository);
            log.push(
                Outcome::Updated,
                format!("repository {} updated successfully!", rule.key),
            );
            continue;
        }

        log.push(
            Outcome::NotFound,
            format!("repository {} not found.", rule.key),
        );
        match doc.find(&ElementQuery::named(REPOSITORIES)) {
            Some(container) => {
                let repository = parse_fragment(REPOSITORY, &rule.key, &rule.value, namespace)?;
                doc.append_child(&container, repository);
                log.push(
                    Outcome::Added,
                    format!("repository {} added successfully!", rule.key),
                );
            }
            None => log.push(Outcome::NotFound, "repositories not found."),
        }
    }
    Ok(())
}

/// Path of the element enclosing the first match of `query`. The root
/// element cannot be replaced or removed, so a match that is the root or a
/// direct child of it counts as a miss.
fn enclosing(doc: &Document, query: &ElementQuery<'_>) -> Option<ElementPath> {
    doc.find(query)?.parent().filter(|parent| parent.depth() > 0)
}

/// Read `path`, apply `rules`, and write the result back only if every
/// pass succeeded. The serialized document is fully buffered before the
/// write, which fails if the file changed since it was read.
pub fn patch_descriptor(
    path: &Path,
    rules: &PomRules<'_>,
    log: &mut OperationLog,
) -> Result<RewriteResult, XmlError> {
    let original = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(XmlError::MissingFile(path.to_path_buf()))
        }
        Err(err) => return Err(err.into()),
    };
    let source = std::str::from_utf8(&original)?;

    let mut doc = Document::parse(source)?;
    apply_rules(&mut doc, rules, log)?;
    let serialized = doc.to_xml_string();

    tracing::debug!(path = %path.display(), bytes = serialized.len(), "writing descriptor");
    Ok(Rewrite::new(path, &original, serialized.into_bytes()).apply()?)
}
