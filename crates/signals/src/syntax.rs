//! Closed-category view over tree-sitter nodes.
//!
//! Analyzers never match on concrete node kinds themselves; they receive
//! [`SyntaxItem`]s from [`visit_items`] instead.

use crate::language::Language;
use sigfix_protocol::LineRange;
use tree_sitter::{Node, Tree};

pub const ANONYMOUS: &str = "<anonymous>";

/// One syntactic fact of interest, tagged by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxItem {
    /// A function-like construct that has a body
    Function { name: String, span: LineRange },
    /// A module specifier given as a string literal, with the range of its statement
    Import { specifier: String, statement: LineRange },
}

/// Walk the whole tree in document order and report every item.
pub fn visit_items(tree: &Tree, source: &str, language: Language, mut f: impl FnMut(SyntaxItem)) {
    let mut cursor = tree.walk();
    loop {
        if let Some(item) = classify(cursor.node(), source, language) {
            f(item);
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn classify(node: Node, source: &str, language: Language) -> Option<SyntaxItem> {
    if is_function_like(node.kind(), language) && node.child_by_field_name("body").is_some() {
        return Some(SyntaxItem::Function {
            name: function_name(node, source),
            span: node_span(node),
        });
    }

    if language.has_module_imports() {
        return classify_import(node, source);
    }

    None
}

fn is_function_like(kind: &str, language: Language) -> bool {
    match language {
        Language::JavaScript | Language::TypeScript | Language::Tsx => matches!(
            kind,
            "function_declaration"
                | "generator_function_declaration"
                | "function_expression"
                | "function"
                | "generator_function"
                | "arrow_function"
                | "method_definition"
        ),
        Language::Rust => matches!(kind, "function_item" | "closure_expression"),
        Language::Python => matches!(kind, "function_definition" | "lambda"),
        Language::Unknown => false,
    }
}

fn classify_import(node: Node, source: &str) -> Option<SyntaxItem> {
    match node.kind() {
        "import_statement" | "export_statement" => {
            let specifier = string_literal(node.child_by_field_name("source")?, source)?;
            Some(SyntaxItem::Import {
                specifier,
                statement: node_span(node),
            })
        }
        "import_require_clause" => {
            let specifier = string_literal(node.child_by_field_name("source")?, source)?;
            Some(SyntaxItem::Import {
                specifier,
                statement: node_span(enclosing_statement(node)),
            })
        }
        "call_expression" => {
            let callee = node.child_by_field_name("function")?;
            let is_loader = callee.kind() == "import"
                || (callee.kind() == "identifier" && text(callee, source) == "require");
            if !is_loader {
                return None;
            }
            let args = node.child_by_field_name("arguments")?;
            let specifier = string_literal(args.named_child(0)?, source)?;
            Some(SyntaxItem::Import {
                specifier,
                statement: node_span(enclosing_statement(node)),
            })
        }
        _ => None,
    }
}

/// Resolve a function's name: declared name (also covers methods, accessors and
/// constructors), then the binding it is assigned to, then `<anonymous>`.
fn function_name(node: Node, source: &str) -> String {
    if let Some(name) = node.child_by_field_name("name") {
        return single_line(text(name, source));
    }

    if let Some(binding) = binding_target(node) {
        return single_line(text(binding, source));
    }

    ANONYMOUS.to_string()
}

/// The left-hand side of the variable/property binding `node` is the value of.
fn binding_target(node: Node) -> Option<Node> {
    let parent = node.parent()?;
    let field = match parent.kind() {
        "variable_declarator" | "public_field_definition" => "name",
        "field_definition" => "property",
        "pair" => "key",
        "assignment_expression" | "assignment" | "augmented_assignment_expression" => "left",
        "let_declaration" => "pattern",
        _ => return None,
    };
    let target = parent.child_by_field_name(field)?;
    (target.id() != node.id()).then_some(target)
}

fn enclosing_statement(node: Node) -> Node {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.kind() == "program" {
            return current;
        }
        let kind = current.kind();
        if kind.ends_with("statement") || kind.ends_with("declaration") {
            return current;
        }
        current = parent;
    }
    current
}

fn string_literal(node: Node, source: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let raw = text(node, source);
    let inner = raw.trim_matches(|c| c == '"' || c == '\'');
    Some(inner.to_string())
}

fn node_span(node: Node) -> LineRange {
    LineRange::new(node.start_position().row + 1, node.end_position().row + 1)
}

fn text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

fn single_line(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}
