use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use deplens_core::analyzer::{LanguageAnalyzer, ParsedFile};
use deplens_core::types::{ExportRecord, ImportRecord, RiskLevel, SourcePosition};

/// Holds queries compiled for a specific dialect grammar.
struct QuerySet {
    import_query: Query,
    export_query: Query,
    dynamic_import_query: Query,
}

const IMPORT_QUERY_SRC: &str = "(import_statement) @import";

const EXPORT_QUERY_SRC: &str = "(export_statement) @export";

const DYNAMIC_IMPORT_QUERY_SRC: &str = r#"
(call_expression
  function: (import)
  arguments: (arguments (string) @path)) @call
"#;

fn compile_queries(language: &Language) -> Result<QuerySet> {
    Ok(QuerySet {
        import_query: Query::new(language, IMPORT_QUERY_SRC)
            .context("failed to compile import query")?,
        export_query: Query::new(language, EXPORT_QUERY_SRC)
            .context("failed to compile export query")?,
        dynamic_import_query: Query::new(language, DYNAMIC_IMPORT_QUERY_SRC)
            .context("failed to compile dynamic import query")?,
    })
}

struct Dialect {
    language: Language,
    queries: QuerySet,
}

impl Dialect {
    fn new(language: Language) -> Result<Self> {
        let queries = compile_queries(&language)?;
        Ok(Self { language, queries })
    }
}

/// TypeScript/TSX/JavaScript analyzer using tree-sitter.
pub struct TypeScriptAnalyzer {
    ts: Dialect,
    tsx: Dialect,
    js: Dialect,
}

impl TypeScriptAnalyzer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ts: Dialect::new(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())?,
            tsx: Dialect::new(tree_sitter_typescript::LANGUAGE_TSX.into())?,
            js: Dialect::new(tree_sitter_javascript::LANGUAGE.into())?,
        })
    }

    fn dialect_for_file(&self, path: &Path) -> &Dialect {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsx") => &self.tsx,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => &self.js,
            _ => &self.ts,
        }
    }
}

impl LanguageAnalyzer for TypeScriptAnalyzer {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn file_extensions(&self) -> &[&str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs"]
    }

    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        let dialect = self.dialect_for_file(path);
        let mut parser = Parser::new();
        parser
            .set_language(&dialect.language)
            .context("failed to set language")?;
        let tree = parser
            .parse(content, None)
            .context("failed to parse source file")?;
        Ok(ParsedFile {
            path: path.to_path_buf(),
            tree,
            content: content.to_string(),
        })
    }

    fn parse_errors(&self, parsed: &ParsedFile) -> Vec<String> {
        let root = parsed.tree.root_node();
        if !root.has_error() {
            return Vec::new();
        }
        let mut errors = Vec::new();
        collect_error_nodes(root, &mut errors);
        if errors.is_empty() {
            errors.push("syntax error".to_string());
        }
        errors
    }

    fn extract_imports(&self, parsed: &ParsedFile) -> Vec<ImportRecord> {
        let dialect = self.dialect_for_file(&parsed.path);
        let mut records = extract_static_imports(&dialect.queries.import_query, parsed);
        records.extend(extract_dynamic_imports(
            &dialect.queries.dynamic_import_query,
            parsed,
        ));
        records.sort_by_key(|r| (r.position.line, r.position.column));
        records
    }

    fn extract_exports(&self, parsed: &ParsedFile) -> Vec<ExportRecord> {
        let dialect = self.dialect_for_file(&parsed.path);
        let query = &dialect.queries.export_query;
        let mut cursor = QueryCursor::new();
        let export_idx = capture_index(query, "export");

        let mut records = Vec::new();
        let mut matches = cursor.matches(query, parsed.tree.root_node(), parsed.content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index as usize == export_idx {
                    records.push(export_from_statement(capture.node, &parsed.content));
                }
            }
        }
        records
    }

    fn complexity_score(&self, parsed: &ParsedFile) -> u32 {
        let mut score = 1u32;
        let mut cursor = parsed.tree.walk();
        loop {
            if is_complexity_node(cursor.node().kind()) {
                score += 1;
            }
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return score;
                }
            }
        }
    }
}

/// The closed set of structural control-flow kinds that add to complexity.
/// A structural approximation, not a control-flow-graph cyclomatic count.
fn is_complexity_node(kind: &str) -> bool {
    matches!(
        kind,
        "if_statement"
            | "for_statement"
            | "for_in_statement"
            | "while_statement"
            | "do_statement"
            | "switch_case"
            | "ternary_expression"
            | "catch_clause"
            | "&&"
            | "||"
    )
}

fn capture_index(query: &Query, name: &str) -> usize {
    query
        .capture_names()
        .iter()
        .position(|n| *n == name)
        .unwrap_or(0)
}

fn extract_static_imports(query: &Query, parsed: &ParsedFile) -> Vec<ImportRecord> {
    let mut cursor = QueryCursor::new();
    let import_idx = capture_index(query, "import");

    let mut records = Vec::new();
    let mut matches = cursor.matches(query, parsed.tree.root_node(), parsed.content.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index as usize == import_idx {
                if let Some(record) = import_from_statement(capture.node, parsed) {
                    records.push(record);
                }
            }
        }
    }
    records
}

fn import_from_statement(node: Node, parsed: &ParsedFile) -> Option<ImportRecord> {
    let source_node = node.child_by_field_name("source")?;
    let import_path = strip_quotes(&node_text(source_node, &parsed.content));

    let mut is_type_only = false;
    let mut is_default = false;
    let mut is_namespace = false;
    let mut imported_names = Vec::new();
    let mut local_names = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            // The bare `type` keyword of `import type ...`; a default import
            // named `type` sits inside the import_clause instead
            "type" => is_type_only = true,
            "import_clause" => collect_clause_bindings(
                child,
                &parsed.content,
                &mut imported_names,
                &mut local_names,
                &mut is_default,
                &mut is_namespace,
            ),
            _ => {}
        }
    }

    // Same-file textual usage scan over the local bindings; imports with no
    // bindings (side-effect imports) are conservatively used
    let is_used = local_names.is_empty()
        || local_names
            .iter()
            .any(|name| identifier_used_outside(&parsed.content, name, node.byte_range()));

    Some(ImportRecord {
        file: parsed.path.clone(),
        import_path,
        resolved_path: None,
        imported_names,
        is_type_only,
        is_default,
        is_namespace,
        is_dynamic: false,
        position: position_of(node),
        is_framework_essential: false,
        risk_level: RiskLevel::Low,
        is_used,
    })
}

fn collect_clause_bindings(
    clause: Node,
    content: &str,
    imported_names: &mut Vec<String>,
    local_names: &mut Vec<String>,
    is_default: &mut bool,
    is_namespace: &mut bool,
) {
    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                *is_default = true;
                imported_names.push("default".to_string());
                local_names.push(node_text(child, content));
            }
            "namespace_import" => {
                *is_namespace = true;
                imported_names.push("*".to_string());
                let mut inner = child.walk();
                for grandchild in child.children(&mut inner) {
                    if grandchild.kind() == "identifier" {
                        local_names.push(node_text(grandchild, content));
                    }
                }
            }
            "named_imports" => {
                let mut inner = child.walk();
                for specifier in child.children(&mut inner) {
                    if specifier.kind() != "import_specifier" {
                        continue;
                    }
                    let Some(name_node) = specifier.child_by_field_name("name") else {
                        continue;
                    };
                    imported_names.push(strip_quotes(&node_text(name_node, content)));
                    let local = specifier
                        .child_by_field_name("alias")
                        .map(|alias| node_text(alias, content))
                        .unwrap_or_else(|| node_text(name_node, content));
                    local_names.push(local);
                }
            }
            _ => {}
        }
    }
}

fn extract_dynamic_imports(query: &Query, parsed: &ParsedFile) -> Vec<ImportRecord> {
    let mut cursor = QueryCursor::new();
    let path_idx = capture_index(query, "path");
    let call_idx = capture_index(query, "call");

    let mut records = Vec::new();
    let mut matches = cursor.matches(query, parsed.tree.root_node(), parsed.content.as_bytes());
    while let Some(m) = matches.next() {
        let mut import_path = None;
        let mut position = SourcePosition::default();
        for capture in m.captures {
            if capture.index as usize == path_idx {
                import_path = Some(strip_quotes(&node_text(capture.node, &parsed.content)));
            } else if capture.index as usize == call_idx {
                position = position_of(capture.node);
            }
        }
        let Some(import_path) = import_path else {
            continue;
        };
        records.push(ImportRecord {
            file: parsed.path.clone(),
            import_path,
            resolved_path: None,
            imported_names: vec!["*".to_string()],
            is_type_only: false,
            is_default: false,
            is_namespace: false,
            is_dynamic: true,
            position,
            is_framework_essential: false,
            risk_level: RiskLevel::High,
            // Dynamic imports are evaluated for effect; never removable
            is_used: true,
        });
    }
    records
}

fn export_from_statement(node: Node, content: &str) -> ExportRecord {
    let source_path = node
        .child_by_field_name("source")
        .map(|source| strip_quotes(&node_text(source, content)));
    let is_re_export = source_path.is_some();

    let mut names = Vec::new();
    let mut is_default = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "default" => is_default = true,
            "*" => names.push("*".to_string()),
            "namespace_export" => {
                // export * as ns from '...'
                let mut inner = child.walk();
                let mut found = false;
                for grandchild in child.children(&mut inner) {
                    if grandchild.kind() == "identifier" {
                        names.push(node_text(grandchild, content));
                        found = true;
                    }
                }
                if !found {
                    names.push("*".to_string());
                }
            }
            "export_clause" => {
                let mut inner = child.walk();
                for specifier in child.children(&mut inner) {
                    if specifier.kind() != "export_specifier" {
                        continue;
                    }
                    let exported = specifier
                        .child_by_field_name("alias")
                        .or_else(|| specifier.child_by_field_name("name"));
                    if let Some(name_node) = exported {
                        names.push(strip_quotes(&node_text(name_node, content)));
                    }
                }
            }
            _ => {}
        }
    }

    if is_default {
        names = vec!["default".to_string()];
    } else if let Some(declaration) = node.child_by_field_name("declaration") {
        collect_declaration_names(declaration, content, &mut names);
    }

    ExportRecord {
        names,
        is_default,
        is_re_export,
        source_path,
        position: position_of(node),
        is_used_internally: true,
    }
}

fn collect_declaration_names(declaration: Node, content: &str, names: &mut Vec<String>) {
    match declaration.kind() {
        "function_declaration"
        | "generator_function_declaration"
        | "class_declaration"
        | "abstract_class_declaration"
        | "interface_declaration"
        | "type_alias_declaration"
        | "enum_declaration" => {
            if let Some(name) = declaration.child_by_field_name("name") {
                names.push(node_text(name, content));
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = declaration.walk();
            for declarator in declaration.children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                if let Some(name) = declarator.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        names.push(node_text(name, content));
                    }
                }
            }
        }
        _ => {}
    }
}

fn collect_error_nodes(node: Node, errors: &mut Vec<String>) {
    if node.is_error() || node.is_missing() {
        let pos = node.start_position();
        errors.push(format!(
            "syntax error at {}:{}",
            pos.row + 1,
            pos.column + 1
        ));
        return;
    }
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}

/// Whole-word occurrence of `name` anywhere outside `exclude` byte range.
fn identifier_used_outside(content: &str, name: &str, exclude: std::ops::Range<usize>) -> bool {
    if name.is_empty() {
        return false;
    }
    let bytes = content.as_bytes();
    let mut search_start = 0;
    while let Some(found) = content[search_start..].find(name) {
        let start = search_start + found;
        let end = start + name.len();
        search_start = end;

        if start >= exclude.start && end <= exclude.end {
            continue;
        }
        let boundary_before = start == 0 || !is_identifier_byte(bytes[start - 1]);
        let boundary_after = end == bytes.len() || !is_identifier_byte(bytes[end]);
        if boundary_before && boundary_after {
            return true;
        }
    }
    false
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// Extract text from a tree-sitter node.
fn node_text(node: Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}

/// Strip surrounding quotes (single or double) from a string literal.
fn strip_quotes(raw: &str) -> String {
    raw.trim_matches('"').trim_matches('\'').to_string()
}

fn position_of(node: Node) -> SourcePosition {
    SourcePosition {
        line: node.start_position().row + 1,
        column: node.start_position().column + 1,
    }
}
