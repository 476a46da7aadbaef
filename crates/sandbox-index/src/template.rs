//! Build template nodes from a parsed file

use crate::syntax::{self, JsxElement};
use sandbox_core::{
    CoreElementType, DynamicType, Oid, SandboxPath, TemplateNode, TemplateTag,
};
use std::collections::HashMap;
use tree_sitter::{Node, Tree};

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

const LOGICAL_OPERATORS: &[&str] = &["&&", "||", "??"];

/// Map every identified element of `tree` to its template node
///
/// Elements without a literal `data-oid` are skipped; call
/// [`assign_oids`](crate::assign_oids) first. When the same identifier
/// appears twice the first occurrence wins.
#[must_use]
pub fn build_template_map(
    tree: &Tree,
    source: &str,
    path: &SandboxPath,
) -> HashMap<Oid, TemplateNode> {
    let mut builder = MapBuilder {
        source,
        path,
        components: Vec::new(),
        nodes: HashMap::new(),
    };
    builder.visit(tree.root_node());
    builder.nodes
}

struct MapBuilder<'s> {
    source: &'s str,
    path: &'s SandboxPath,
    components: Vec<String>,
    nodes: HashMap<Oid, TemplateNode>,
}

impl MapBuilder<'_> {
    fn visit(&mut self, node: Node<'_>) {
        if let Some(element) = JsxElement::from_node(node) {
            self.record(element);
        }

        match self.component_name(node) {
            Some(name) => self.with_component(name, |this| this.visit_children(node)),
            None => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    fn with_component(&mut self, name: String, f: impl FnOnce(&mut Self)) {
        self.components.push(name);
        f(self);
        self.components.pop();
    }

    fn component_name(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "function_declaration"
            | "generator_function_declaration"
            | "class_declaration"
            | "abstract_class_declaration" => node
                .child_by_field_name("name")
                .map(|n| syntax::text(n, self.source).to_owned()),
            "variable_declarator" => node
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")
                .map(|n| syntax::text(n, self.source).to_owned()),
            _ => None,
        }
    }

    fn record(&mut self, element: JsxElement<'_>) {
        if element.is_fragment(self.source) {
            return;
        }
        let Some(oid) = element
            .oid_attribute(self.source)
            .and_then(|a| a.literal(self.source))
            .map(Oid::from)
        else {
            return;
        };
        if self.nodes.contains_key(&oid) {
            tracing::debug!("Duplicate identifier {} in {}", oid, self.path);
            return;
        }

        let tag_name = element.tag_name(self.source).unwrap_or_default().to_owned();
        let core_element_type = if tag_name.eq_ignore_ascii_case("body") {
            Some(CoreElementType::DocumentBody)
        } else if is_component_root(element.element, self.source) {
            Some(CoreElementType::ComponentRoot)
        } else {
            None
        };

        let node = TemplateNode {
            path: self.path.clone(),
            tag_name,
            start_position: syntax::position(element.element.start_position()),
            end_position: syntax::position(element.element.end_position()),
            start_tag: tag_span(element.opening),
            end_tag: element.closing.map(tag_span),
            component: self.components.last().cloned(),
            dynamic_type: dynamic_type(element.element, self.source),
            core_element_type,
        };
        self.nodes.insert(oid, node);
    }
}

fn tag_span(node: Node<'_>) -> TemplateTag {
    TemplateTag {
        start: syntax::position(node.start_position()),
        end: syntax::position(node.end_position()),
    }
}

fn is_fragment_element(node: Node<'_>, source: &str) -> bool {
    JsxElement::from_node(node).is_some_and(|e| e.is_fragment(source))
}

/// Climb past wrappers that do not change what a node evaluates to
///
/// Parentheses always; enclosing fragments too, so `<>{...}</>` style
/// wrappers stay transparent.
fn significant_parent<'t>(node: Node<'t>, source: &str) -> Option<(Node<'t>, Node<'t>)> {
    let mut child = node;
    let mut parent = node.parent()?;
    loop {
        let transparent = parent.kind() == "parenthesized_expression"
            || (parent.kind() == "jsx_element" && is_fragment_element(parent, source));
        if !transparent {
            return Some((child, parent));
        }
        child = parent;
        parent = parent.parent()?;
    }
}

fn dynamic_type(element: Node<'_>, source: &str) -> Option<DynamicType> {
    let (child, parent) = significant_parent(element, source)?;

    match parent.kind() {
        "ternary_expression"
            if syntax::is_field(parent, "consequence", child)
                || syntax::is_field(parent, "alternative", child) =>
        {
            return Some(DynamicType::Conditional);
        }
        "binary_expression" => {
            let operator = parent
                .child_by_field_name("operator")
                .map(|n| syntax::text(n, source));
            if operator.is_some_and(|op| LOGICAL_OPERATORS.contains(&op)) {
                return Some(DynamicType::Conditional);
            }
        }
        _ => {}
    }

    let function = returning_function(child, parent)?;
    is_map_callback(function, source).then_some(DynamicType::ArrayIteration)
}

/// Function whose return value is the element
fn returning_function<'t>(child: Node<'t>, parent: Node<'t>) -> Option<Node<'t>> {
    match parent.kind() {
        "arrow_function" if syntax::is_field(parent, "body", child) => Some(parent),
        "return_statement" => {
            let mut current = parent.parent()?;
            while !FUNCTION_KINDS.contains(&current.kind()) {
                current = current.parent()?;
            }
            Some(current)
        }
        _ => None,
    }
}

fn is_map_callback(function: Node<'_>, source: &str) -> bool {
    let Some(arguments) = function.parent().filter(|p| p.kind() == "arguments") else {
        return false;
    };
    let Some(call) = arguments.parent().filter(|p| p.kind() == "call_expression") else {
        return false;
    };
    call.child_by_field_name("function")
        .filter(|f| f.kind() == "member_expression")
        .and_then(|f| f.child_by_field_name("property"))
        .is_some_and(|p| syntax::text(p, source) == "map")
}

fn is_component_root(element: Node<'_>, source: &str) -> bool {
    let Some((child, parent)) = significant_parent(element, source) else {
        return false;
    };
    let Some(function) = returning_function(child, parent) else {
        return false;
    };

    match function.kind() {
        "function_declaration" | "generator_function_declaration" | "method_definition" => true,
        _ => match function.parent() {
            Some(holder) => match holder.kind() {
                "variable_declarator" | "export_statement" => true,
                "arguments" => !is_map_callback(function, source),
                _ => false,
            },
            None => false,
        },
    }
}
