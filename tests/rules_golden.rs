//! Golden tests for the descriptor rule passes
//!
//! A realistic Mule application POM run through every pass; untouched
//! regions must come back byte-for-byte.

use mule_patcher::xml::{apply_rules, patch_descriptor, Document, ElementQuery, PomRules};
use mule_patcher::{OperationLog, Outcome, RuleBook, RuleSet};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const NS: &str = "http://maven.apache.org/POM/4.0.0";

const POM: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
    <modelVersion>4.0.0</modelVersion>
    <!-- application coordinates -->
    <groupId>com.example</groupId>
    <artifactId>orders-api</artifactId>
    <properties>
        <project.build.sourceEncoding>UTF-8</project.build.sourceEncoding>
        <app.runtime>4.4.0</app.runtime>
        <mule.maven.plugin.version>3.8.2</mule.maven.plugin.version>
    </properties>
    <dependencies>
        <dependency>
            <groupId>org.mule.connectors</groupId>
            <artifactId>mule-http-connector</artifactId>
            <version>1.7.1</version>
            <classifier>mule-plugin</classifier>
        </dependency>
        <dependency>
            <groupId>org.mule.connectors</groupId>
            <artifactId>mule-sockets-connector</artifactId>
            <version>1.2.2</version>
            <classifier>mule-plugin</classifier>
        </dependency>
    </dependencies>
    <repositories>
        <repository>
            <id>anypoint-exchange-v3</id>
            <name>Anypoint Exchange</name>
            <url>https://maven.anypoint.mulesoft.com/api/v3/maven</url>
            <layout>default</layout>
        </repository>
    </repositories>
</project>
"#;

const EXPECTED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
    <modelVersion>4.0.0</modelVersion>
    <!-- application coordinates -->
    <groupId>com.example</groupId>
    <artifactId>orders-api</artifactId>
    <properties>
        <project.build.sourceEncoding>UTF-8</project.build.sourceEncoding>
        <app.runtime>4.9.0</app.runtime>
        <mule.maven.plugin.version>4.3.0</mule.maven.plugin.version>
        <munit.version>3.1.0</munit.version>
    </properties>
    <dependencies>
        <dependency>
            <groupId>org.mule.connectors</groupId>
            <artifactId>mule-http-connector</artifactId>
            <version>1.10.3</version>
            <classifier>mule-plugin</classifier>
        </dependency>
    </dependencies>
    <repositories>
        <repository>
            <id>anypoint-exchange-v3</id>
            <url>https://maven.anypoint.mulesoft.com/api/v3/maven</url>
        </repository>
        <repository>
            <id>mulesoft-releases</id>
            <url>https://repository.mulesoft.org/releases/</url>
        </repository>
    </repositories>
</project>
"#;

fn migration_book() -> RuleBook {
    RuleBook {
        replace_properties: [
            ("app.runtime", "4.9.0"),
            ("mule.maven.plugin.version", "4.3.0"),
            ("munit.version", "3.1.0"),
        ]
        .into_iter()
        .collect(),
        replace_dependencies: [(
            "mule-http-connector",
            "<groupId>org.mule.connectors</groupId><artifactId>mule-http-connector</artifactId><version>1.10.3</version><classifier>mule-plugin</classifier>",
        )]
        .into_iter()
        .collect(),
        delete_dependencies: [("mule-sockets-connector", "")].into_iter().collect(),
        replace_repositories: [
            (
                "anypoint-exchange-v3",
                "<id>anypoint-exchange-v3</id><url>https://maven.anypoint.mulesoft.com/api/v3/maven</url>",
            ),
            (
                "mulesoft-releases",
                "<id>mulesoft-releases</id><url>https://repository.mulesoft.org/releases/</url>",
            ),
        ]
        .into_iter()
        .collect(),
        ..RuleBook::default()
    }
}

#[test]
fn test_full_migration_golden() {
    let book = migration_book();
    let mut doc = Document::parse(POM).unwrap();
    let mut log = OperationLog::new();
    apply_rules(&mut doc, &PomRules::from_book(&book), &mut log).unwrap();

    assert_eq!(doc.to_xml_string(), EXPECTED);

    let messages: Vec<_> = log.lines().iter().map(|l| l.message.as_str()).collect();
    assert_eq!(
        messages,
        [
            "properties",
            "Node app.runtime value updated successfully!",
            "Node mule.maven.plugin.version value updated successfully!",
            "Target munit.version node not found.",
            "properties munit.version added successfully!",
            "properties done",
            "dependencies",
            "Dependency mule-http-connector updated successfully!",
            "Dependency mule-sockets-connector removed successfully!",
            "dependencies done",
            "repositories",
            "repository anypoint-exchange-v3 updated successfully!",
            "repository mulesoft-releases not found.",
            "repository mulesoft-releases added successfully!",
            "repositories done",
        ]
    );
}

#[test]
fn test_migration_is_stable_on_second_run() {
    let book = migration_book();
    let mut doc = Document::parse(EXPECTED).unwrap();
    let mut log = OperationLog::new();
    apply_rules(&mut doc, &PomRules::from_book(&book), &mut log).unwrap();

    // Every rule now matches in place; nothing new is added
    assert_eq!(doc.to_xml_string(), EXPECTED);
    assert_eq!(log.count(Outcome::Added), 0);
    assert_eq!(log.count(Outcome::NotFound), 1);
    assert!(log.contains("Dependency mule-sockets-connector not found."));
}

#[test]
fn test_synthesized_nodes_share_root_namespace() {
    let book = migration_book();
    let mut doc = Document::parse(POM).unwrap();
    let mut log = OperationLog::new();
    apply_rules(&mut doc, &PomRules::from_book(&book), &mut log).unwrap();

    assert_eq!(doc.default_namespace(), Some(NS));
    for query in [
        ElementQuery::named("munit.version"),
        ElementQuery::named_with_text("version", "1.10.3"),
        ElementQuery::named_with_text("id", "mulesoft-releases"),
    ] {
        let path = doc.find(&query).unwrap();
        assert_eq!(doc.element(&path).unwrap().namespace.as_deref(), Some(NS));
        let parent = doc.element(&path.parent().unwrap()).unwrap();
        assert_eq!(parent.namespace.as_deref(), Some(NS));
    }
}

#[test]
fn test_crlf_descriptor_keeps_line_endings() {
    let pom = POM.replace('\n', "\r\n");
    let book = RuleBook {
        replace_properties: [("munit.version", "3.1.0")].into_iter().collect(),
        ..RuleBook::default()
    };
    let mut doc = Document::parse(&pom).unwrap();
    let mut log = OperationLog::new();
    apply_rules(&mut doc, &PomRules::from_book(&book), &mut log).unwrap();

    let xml = doc.to_xml_string();
    assert!(xml.contains(
        "<mule.maven.plugin.version>3.8.2</mule.maven.plugin.version>\r\n        <munit.version>3.1.0</munit.version>\r\n    </properties>"
    ));
    assert!(!xml.replace("\r\n", "").contains('\n'));
}

#[test]
fn test_patch_descriptor_on_disk() {
    let dir = TempDir::new().unwrap();
    let pom = dir.path().join("pom.xml");
    fs::write(&pom, POM).unwrap();

    let book = migration_book();
    let mut log = OperationLog::new();
    patch_descriptor(&pom, &PomRules::from_book(&book), &mut log).unwrap();

    assert_eq!(fs::read_to_string(&pom).unwrap(), EXPECTED);
}

#[test]
fn test_unprefixed_descriptor_without_namespace() {
    let pom = "<project>\n  <properties>\n  </properties>\n</project>";
    let rules: RuleSet = [("app.runtime", "4.9.0")].into_iter().collect();
    let empty = RuleSet::default();
    let mut doc = Document::parse(pom).unwrap();
    let mut log = OperationLog::new();
    let passes = PomRules {
        properties: &rules,
        dependency_replacements: &empty,
        dependency_deletions: &empty,
        repositories: &empty,
    };
    apply_rules(&mut doc, &passes, &mut log).unwrap();

    assert_eq!(
        doc.to_xml_string(),
        "<project>\n  <properties>\n    <app.runtime>4.9.0</app.runtime>\n  </properties>\n</project>"
    );
}
