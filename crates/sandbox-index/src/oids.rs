//! Identifier assignment and write-back text edits

use crate::syntax::{self, JsxElement};
use sandbox_core::constants::OID_ATTRIBUTE;
use sandbox_core::Oid;
use std::collections::HashSet;
use tree_sitter::Tree;

/// Result of assigning identifiers to every element of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidAssignment {
    /// Source text after injection, identical to the input when unmodified
    pub content: String,
    /// Whether any identifier was injected or replaced
    pub modified: bool,
    /// Elements that had no identifier
    pub injected: usize,
    /// Elements whose identifier was a duplicate or unusable
    pub replaced: usize,
}

struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Give every non-fragment element a unique `data-oid`
///
/// Existing acceptable identifiers are reserved before anything is
/// generated, so the first occurrence of a value always keeps it and fresh
/// identifiers never collide with one already in the file.
#[must_use]
pub fn assign_oids(tree: &Tree, source: &str) -> OidAssignment {
    let elements: Vec<JsxElement<'_>> = syntax::elements(tree.root_node())
        .into_iter()
        .filter(|e| !e.is_fragment(source))
        .collect();

    let mut taken: HashSet<Oid> = elements
        .iter()
        .filter_map(|e| e.oid_attribute(source))
        .filter_map(|a| a.literal(source))
        .filter(|v| Oid::is_acceptable(v))
        .map(Oid::from)
        .collect();

    let mut kept: HashSet<Oid> = HashSet::new();
    let mut edits = Vec::new();
    let mut injected = 0;
    let mut replaced = 0;

    for element in &elements {
        match element.oid_attribute(source) {
            Some(attribute) => {
                let existing = attribute
                    .literal(source)
                    .filter(|v| Oid::is_acceptable(v))
                    .map(Oid::from);
                if let Some(oid) = existing {
                    if kept.insert(oid) {
                        continue;
                    }
                }

                let fresh = Oid::generate_unique(|candidate| taken.contains(candidate));
                taken.insert(fresh.clone());
                replaced += 1;

                edits.push(match attribute.value {
                    Some(value) => Edit {
                        start: value.start_byte(),
                        end: value.end_byte(),
                        text: format!("\"{fresh}\""),
                    },
                    None => {
                        let at = attribute.attribute.end_byte();
                        Edit {
                            start: at,
                            end: at,
                            text: format!("=\"{fresh}\""),
                        }
                    }
                });
            }
            None => {
                let fresh = Oid::generate_unique(|candidate| taken.contains(candidate));
                taken.insert(fresh.clone());
                injected += 1;

                let at = element.insertion_point();
                edits.push(Edit {
                    start: at,
                    end: at,
                    text: format!(" {OID_ATTRIBUTE}=\"{fresh}\""),
                });
            }
        }
    }

    let modified = !edits.is_empty();
    let mut content = source.to_owned();
    edits.sort_by(|a, b| b.start.cmp(&a.start));
    for edit in edits {
        content.replace_range(edit.start..edit.end, &edit.text);
    }

    OidAssignment {
        content,
        modified,
        injected,
        replaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::SourceLanguage;
    use crate::syntax::parse;
    use pretty_assertions::assert_eq;

    fn assign(source: &str) -> OidAssignment {
        let tree = parse(source, SourceLanguage::Tsx).unwrap();
        assign_oids(&tree, source)
    }

    fn oids_in(source: &str) -> Vec<String> {
        let tree = parse(source, SourceLanguage::Tsx).unwrap();
        syntax::elements(tree.root_node())
            .iter()
            .filter_map(|e| e.oid_attribute(source))
            .filter_map(|a| a.literal(source).map(str::to_owned))
            .collect()
    }

    #[test]
    fn untouched_when_all_unique() {
        let source = r#"const a = <div data-oid="aaaaaaa"><p data-oid="bbbbbbb" /></div>;"#;
        let result = assign(source);
        assert!(!result.modified);
        assert_eq!(result.content, source);
        assert_eq!(result.injected, 0);
    }

    #[test]
    fn injects_missing_identifiers() {
        let source = "const a = <div className=\"x\"><img /></div>;";
        let result = assign(source);
        assert!(result.modified);
        assert_eq!(result.injected, 2);
        assert!(result.content.starts_with("const a = <div className=\"x\" data-oid=\""));
        let oids = oids_in(&result.content);
        assert_eq!(oids.len(), 2);
        assert_ne!(oids[0], oids[1]);
    }

    #[test]
    fn first_duplicate_keeps_its_identifier() {
        let source = r#"const a = <div data-oid="dup1234"><span data-oid="dup1234" /></div>;"#;
        let result = assign(source);
        assert_eq!(result.replaced, 1);
        let oids = oids_in(&result.content);
        assert_eq!(oids[0], "dup1234");
        assert_ne!(oids[1], "dup1234");
    }

    #[test]
    fn fragments_receive_nothing() {
        let source = "const a = <><p /></>;";
        let result = assign(source);
        assert_eq!(result.injected, 1);
        assert!(result.content.starts_with("const a = <><p data-oid=\""));
    }

    #[test]
    fn unusable_values_are_replaced_in_place() {
        let source = r#"const a = <div data-oid="">x</div>;"#;
        let result = assign(source);
        assert_eq!(result.replaced, 1);
        assert_eq!(oids_in(&result.content).len(), 1);
        assert!(!result.content.contains("data-oid=\"\""));
    }

    #[test]
    fn reassignment_is_stable() {
        let first = assign("const a = <ul><li>1</li><li>2</li></ul>;");
        let second = assign(&first.content);
        assert!(!second.modified);
        assert_eq!(second.content, first.content);
    }

    proptest::proptest! {
        #[test]
        fn identifiers_are_unique_per_pass(ids in proptest::collection::vec(proptest::option::of(0u8..4), 1..12)) {
            let children: String = ids
                .iter()
                .map(|id| match id {
                    Some(n) => format!("<span data-oid=\"dup{n}abc\" />"),
                    None => "<span />".to_owned(),
                })
                .collect();
            let source = format!("const a = <div>{children}</div>;");

            let result = assign(&source);
            let oids = oids_in(&result.content);
            let unique: HashSet<&String> = oids.iter().collect();

            proptest::prop_assert_eq!(oids.len(), ids.len() + 1);
            proptest::prop_assert_eq!(unique.len(), oids.len());
        }
    }
}
