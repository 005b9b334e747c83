//! Python AST extraction via tree-sitter — produces MODULE, CLASS,
//! FUNCTION, METHOD, IMPORT, and CALL artifacts. Tree-sitter walking idiom
//! (parent tracking, node classification by kind string) applied to
//! scope-stack parent tracking, callee-name construction, and canonical-id
//! formatting.

use hybridrag_core::artifact::{Artifact, ArtifactKind};
use tree_sitter::{Node, Parser};

/// One frame of lexical scope while walking the tree: the enclosing
/// artifact's canonical id/name and whether it is a class (to distinguish
/// METHOD from FUNCTION).
struct ScopeFrame {
    canonical_id: String,
    is_class: bool,
}

pub struct PythonExtractor<'a> {
    relative_path: &'a str,
    source: &'a [u8],
    artifacts: Vec<Artifact>,
    scope_stack: Vec<ScopeFrame>,
}

/// Dotted module display name: `pkg/mod.py` -> `pkg.mod`. Strips the
/// literal `.py` suffix only, not an arbitrary trailing-character set.
fn module_display_name(relative_path: &str) -> String {
    let dotted = relative_path.replace('/', ".");
    dotted.strip_suffix(".py").map(|s| s.to_string()).unwrap_or(dotted)
}

impl<'a> PythonExtractor<'a> {
    pub fn new(relative_path: &'a str, source: &'a [u8]) -> Self {
        Self { relative_path, source, artifacts: Vec::new(), scope_stack: Vec::new() }
    }

    /// Parse and extract. Returns an empty artifact list (not an error) if
    /// the source fails to parse at all.
    pub fn extract(mut self) -> Vec<Artifact> {
        let mut parser = Parser::new();
        if parser.set_language(&tree_sitter_python::LANGUAGE.into()).is_err() {
            return Vec::new();
        }
        let Some(tree) = parser.parse(self.source, None) else {
            return Vec::new();
        };

        let module_id = self.relative_path.to_string();
        self.artifacts.push(
            Artifact::new(ArtifactKind::Module, module_id.clone(), module_display_name(self.relative_path), self.relative_path)
                .with_text(String::from_utf8_lossy(self.source).to_string()),
        );
        self.scope_stack.push(ScopeFrame { canonical_id: module_id, is_class: false });

        self.walk(tree.root_node());
        self.artifacts
    }

    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn current_scope_id(&self) -> String {
        self.scope_stack.last().map(|f| f.canonical_id.clone()).unwrap_or_else(|| self.relative_path.to_string())
    }

    /// True if *any* enclosing scope frame is a class, not just the
    /// immediate one — a `def` nested inside a method (e.g. a closure
    /// helper) is still a METHOD, since its nearest class ancestor exists
    /// further up the stack.
    fn in_class_scope(&self) -> bool {
        self.scope_stack.iter().any(|f| f.is_class)
    }

    fn walk(&mut self, node: Node) {
        match node.kind() {
            "class_definition" => self.visit_class(node),
            "function_definition" => self.visit_function(node),
            "import_statement" => self.visit_import(node),
            "import_from_statement" => self.visit_import_from(node),
            "call" => self.visit_call(node),
            _ => self.walk_children(node),
        }
    }

    fn walk_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child);
        }
    }

    fn node_start_line(node: Node) -> usize {
        node.start_position().row + 1
    }

    fn source_segment(&self, node: Node) -> String {
        self.text(node)
    }

    fn visit_class(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            self.walk_children(node);
            return;
        };
        let name = self.text(name_node);
        let parent_id = self.current_scope_id();
        let symbol_path = format!("{name}");
        let canonical_id = format!("{}#{symbol_path}", self.relative_path);

        let bases = node
            .child_by_field_name("superclasses")
            .map(|n| self.text(n))
            .unwrap_or_default();

        self.artifacts.push(
            Artifact::new(ArtifactKind::Class, canonical_id.clone(), name, self.relative_path)
                .with_parent(parent_id)
                .with_text(self.source_segment(node))
                .with_meta("lineno", Self::node_start_line(node) as i64)
                .with_meta("bases", bases),
        );

        self.scope_stack.push(ScopeFrame { canonical_id, is_class: true });
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_children(body);
        }
        self.scope_stack.pop();
    }

    fn visit_function(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            self.walk_children(node);
            return;
        };
        let name = self.text(name_node);
        let parent_frame_is_class = self.in_class_scope();
        let parent_id = self.current_scope_id();

        let (kind, symbol_path) = if parent_frame_is_class {
            let parent_name = parent_id.rsplit('#').next().unwrap_or(&parent_id).to_string();
            (ArtifactKind::Method, format!("{parent_name}.{name}"))
        } else {
            (ArtifactKind::Function, name.clone())
        };
        let canonical_id = format!("{}#{symbol_path}", self.relative_path);

        self.artifacts.push(
            Artifact::new(kind, canonical_id.clone(), name, self.relative_path)
                .with_parent(parent_id)
                .with_text(self.source_segment(node))
                .with_meta("lineno", Self::node_start_line(node) as i64),
        );

        self.scope_stack.push(ScopeFrame { canonical_id, is_class: false });
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_children(body);
        }
        self.scope_stack.pop();
    }

    fn visit_import(&mut self, node: Node) {
        let parent_id = self.current_scope_id();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "dotted_name" | "identifier" => {
                    let module = self.text(child);
                    self.emit_import(&parent_id, &module, None);
                }
                "aliased_import" => {
                    let module = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    let alias = child.child_by_field_name("alias").map(|n| self.text(n));
                    self.emit_import(&parent_id, &module, alias.as_deref());
                }
                _ => {}
            }
        }
    }

    fn visit_import_from(&mut self, node: Node) {
        let parent_id = self.current_scope_id();
        let module = node
            .child_by_field_name("module_name")
            .map(|n| self.text(n))
            .unwrap_or_default();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "dotted_name" | "identifier" => {
                    let name = self.text(child);
                    if name != module {
                        self.emit_import(&parent_id, &format!("{module}.{name}"), None);
                    }
                }
                "aliased_import" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    let alias = child.child_by_field_name("alias").map(|n| self.text(n));
                    self.emit_import(&parent_id, &format!("{module}.{name}"), alias.as_deref());
                }
                _ => {}
            }
        }
    }

    fn emit_import(&mut self, parent_id: &str, imported: &str, alias: Option<&str>) {
        let canonical_id = format!("{}#import:{imported}", self.relative_path);
        let mut artifact = Artifact::new(ArtifactKind::Import, canonical_id, imported.to_string(), self.relative_path)
            .with_parent(parent_id.to_string())
            .with_meta("module", imported.to_string());
        if let Some(alias) = alias {
            artifact = artifact.with_meta("alias", alias.to_string());
        }
        self.artifacts.push(artifact);
    }

    fn visit_call(&mut self, node: Node) {
        let parent_id = self.current_scope_id();
        let func_name = node
            .child_by_field_name("function")
            .map(|func_node| self.callee_name(func_node))
            .unwrap_or_else(|| "<unknown>".to_string());

        let canonical_id = format!("{}#call:{func_name}", self.relative_path);
        self.artifacts.push(
            Artifact::new(ArtifactKind::Call, canonical_id, func_name, self.relative_path)
                .with_parent(parent_id)
                .with_meta("lineno", Self::node_start_line(node) as i64),
        );

        // Calls can nest (args may contain calls); keep walking.
        if let Some(args) = node.child_by_field_name("arguments") {
            self.walk_children(args);
        }
    }

    /// `<receiver>.<attr>` for attribute access, raw text otherwise. Falls
    /// back to `"<unknown>"` on anything unparseable.
    fn callee_name(&self, func_node: Node) -> String {
        if func_node.kind() == "attribute" {
            let receiver = func_node.child_by_field_name("object").map(|n| self.text(n));
            let attr = func_node.child_by_field_name("attribute").map(|n| self.text(n));
            match (receiver, attr) {
                (Some(r), Some(a)) => format!("{r}.{a}"),
                _ => "<unknown>".to_string(),
            }
        } else {
            let text = self.text(func_node);
            if text.is_empty() {
                "<unknown>".to_string()
            } else {
                text
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_module_class_method_and_call() {
        let src = b"class C:\n    def go(self):\n        return go()\n\ndef go():\n    pass\n";
        let artifacts = PythonExtractor::new("pkg/mod.py", src).extract();

        let module = artifacts.iter().find(|a| a.kind == ArtifactKind::Module).unwrap();
        assert_eq!(module.id, "pkg/mod.py");

        let method = artifacts.iter().find(|a| a.kind == ArtifactKind::Method).unwrap();
        assert_eq!(method.id, "pkg/mod.py#C.go");
        assert_eq!(method.parent_id.as_deref(), Some("pkg/mod.py#C"));

        let free_fn = artifacts.iter().find(|a| a.kind == ArtifactKind::Function).unwrap();
        assert_eq!(free_fn.id, "pkg/mod.py#go");

        let calls: Vec<_> = artifacts.iter().filter(|a| a.kind == ArtifactKind::Call).collect();
        assert!(calls.iter().any(|c| c.name == "go"));
    }

    #[test]
    fn def_nested_inside_a_method_is_still_a_method() {
        let src = b"class C:\n    def go(self):\n        def inner():\n            pass\n        return inner()\n";
        let artifacts = PythonExtractor::new("pkg/mod.py", src).extract();

        let methods: Vec<_> = artifacts.iter().filter(|a| a.kind == ArtifactKind::Method).collect();
        assert!(methods.iter().any(|a| a.id == "pkg/mod.py#C.go"));
        assert!(
            methods.iter().any(|a| a.id == "pkg/mod.py#C.go.inner"),
            "nested def should classify as METHOD, not FUNCTION: {:?}",
            artifacts.iter().map(|a| (&a.kind, &a.id)).collect::<Vec<_>>()
        );
        assert!(artifacts.iter().all(|a| a.kind != ArtifactKind::Function));
    }

    #[test]
    fn module_display_name_strips_literal_suffix_only() {
        assert_eq!(module_display_name("pkg/mod.py"), "pkg.mod");
        assert_eq!(module_display_name("pkg/happy.py"), "pkg.happy");
    }

    #[test]
    fn attribute_call_is_receiver_dot_attr() {
        let src = b"def f(obj):\n    obj.run()\n";
        let artifacts = PythonExtractor::new("m.py", src).extract();
        let calls: Vec<_> = artifacts.iter().filter(|a| a.kind == ArtifactKind::Call).collect();
        assert!(calls.iter().any(|c| c.name == "obj.run"));
    }
}
