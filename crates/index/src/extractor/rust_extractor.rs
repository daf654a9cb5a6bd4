use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::{Fields, ImplItem, Item, ItemConst, ItemEnum, ItemFn, ItemImpl, ItemStatic, ItemStruct,
          ItemTrait, ItemUse, UseTree};

use crate::model::{SymbolKind, SymbolRecord};

use super::{Extractor, SyntaxCheck};

pub struct RustExtractor;

impl Extractor for RustExtractor {
    fn extract(&self, source: &str) -> Vec<SymbolRecord> {
        match syn::parse_file(source) {
            Ok(file) => {
                let mut visitor = Visitor::default();
                visitor.visit_file(&file);
                visitor.symbols
            }
            // The contract forbids omitting the whole file on a parse fault; an empty
            // record list plus the caller's `check_syntax` call surfaces the error instead.
            Err(_) => Vec::new(),
        }
    }

    fn check_syntax(&self, source: &str) -> SyntaxCheck {
        match syn::parse_file(source) {
            Ok(_) => SyntaxCheck::Ok,
            Err(err) => {
                let span = err.span();
                SyntaxCheck::Error {
                    line: span.start().line.max(1),
                    message: err.to_string(),
                }
            }
        }
    }
}

#[derive(Default)]
struct Visitor {
    symbols: Vec<SymbolRecord>,
    current_impl_target: Option<String>,
}

fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("doc") {
            if let syn::Meta::NameValue(meta) = &attr.meta {
                if let syn::Expr::Lit(expr_lit) = &meta.value {
                    if let syn::Lit::Str(lit_str) = &expr_lit.lit {
                        lines.push(lit_str.value().trim().to_string());
                    }
                }
            }
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Trailing decorator (attribute) lines widen the span upward, per the extractor contract.
fn span_with_attrs<T: Spanned>(node: &T, attrs: &[syn::Attribute]) -> (usize, usize) {
    let end = node.span().end().line.max(1);
    let start = attrs
        .iter()
        .map(|a| a.span().start().line)
        .chain(std::iter::once(node.span().start().line))
        .min()
        .unwrap_or(1)
        .max(1);
    (start, end)
}

fn fn_signature(sig: &syn::Signature) -> Vec<String> {
    sig.inputs
        .iter()
        .map(|arg| match arg {
            syn::FnArg::Receiver(r) => {
                if r.reference.is_some() {
                    if r.mutability.is_some() {
                        "&mut self".to_string()
                    } else {
                        "&self".to_string()
                    }
                } else {
                    "self".to_string()
                }
            }
            syn::FnArg::Typed(pat_type) => {
                let name = quote::quote!(#pat_type.pat).to_string();
                let ty = quote::quote!(#pat_type.ty).to_string();
                format!("{name}: {ty}")
            }
        })
        .collect()
}

impl<'ast> Visit<'ast> for Visitor {
    fn visit_item_fn(&mut self, f: &'ast ItemFn) {
        let (start, end) = span_with_attrs(f, &f.attrs);
        self.symbols.push(SymbolRecord {
            kind: SymbolKind::Function,
            name: f.sig.ident.to_string(),
            start_line: start,
            end_line: end,
            signature: Some(fn_signature(&f.sig)),
            docstring: doc_comment(&f.attrs),
            parent_class: None,
            is_async: f.sig.asyncness.is_some(),
        });
        visit::visit_item_fn(self, f);
    }

    fn visit_item_struct(&mut self, s: &'ast ItemStruct) {
        let (start, end) = span_with_attrs(s, &s.attrs);
        self.symbols.push(SymbolRecord {
            kind: SymbolKind::Class,
            name: s.ident.to_string(),
            start_line: start,
            end_line: end,
            signature: None,
            docstring: doc_comment(&s.attrs),
            parent_class: None,
            is_async: false,
        });
        if let Fields::Named(_) = &s.fields {
            // field-level records are out of scope; the spec's symbol tags stop at
            // Function/Class/Variable/Import/Decorator/Comment/Assignment/Annotation.
        }
        visit::visit_item_struct(self, s);
    }

    fn visit_item_enum(&mut self, e: &'ast ItemEnum) {
        let (start, end) = span_with_attrs(e, &e.attrs);
        self.symbols.push(SymbolRecord {
            kind: SymbolKind::Class,
            name: e.ident.to_string(),
            start_line: start,
            end_line: end,
            signature: None,
            docstring: doc_comment(&e.attrs),
            parent_class: None,
            is_async: false,
        });
        visit::visit_item_enum(self, e);
    }

    fn visit_item_trait(&mut self, t: &'ast ItemTrait) {
        let (start, end) = span_with_attrs(t, &t.attrs);
        self.symbols.push(SymbolRecord {
            kind: SymbolKind::Class,
            name: t.ident.to_string(),
            start_line: start,
            end_line: end,
            signature: None,
            docstring: doc_comment(&t.attrs),
            parent_class: None,
            is_async: false,
        });
        visit::visit_item_trait(self, t);
    }

    fn visit_item_impl(&mut self, i: &'ast ItemImpl) {
        let target = quote::quote!(#i.self_ty).to_string().replace(' ', "");
        let prior = self.current_impl_target.replace(target);
        for item in &i.items {
            if let ImplItem::Fn(method) = item {
                let (start, end) = span_with_attrs(method, &method.attrs);
                self.symbols.push(SymbolRecord {
                    kind: SymbolKind::Function,
                    name: method.sig.ident.to_string(),
                    start_line: start,
                    end_line: end,
                    signature: Some(fn_signature(&method.sig)),
                    docstring: doc_comment(&method.attrs),
                    parent_class: self.current_impl_target.clone(),
                    is_async: method.sig.asyncness.is_some(),
                });
            }
        }
        self.current_impl_target = prior;
    }

    fn visit_item_const(&mut self, c: &'ast ItemConst) {
        let (start, end) = span_with_attrs(c, &c.attrs);
        self.symbols.push(SymbolRecord {
            kind: SymbolKind::Variable,
            name: c.ident.to_string(),
            start_line: start,
            end_line: end,
            signature: None,
            docstring: doc_comment(&c.attrs),
            parent_class: None,
            is_async: false,
        });
        visit::visit_item_const(self, c);
    }

    fn visit_item_static(&mut self, s: &'ast ItemStatic) {
        let (start, end) = span_with_attrs(s, &s.attrs);
        self.symbols.push(SymbolRecord {
            kind: SymbolKind::Variable,
            name: s.ident.to_string(),
            start_line: start,
            end_line: end,
            signature: None,
            docstring: doc_comment(&s.attrs),
            parent_class: None,
            is_async: false,
        });
        visit::visit_item_static(self, s);
    }

    fn visit_item_use(&mut self, u: &'ast ItemUse) {
        for name in flatten_use_tree(&u.tree, String::new()) {
            let (start, end) = span_with_attrs(u, &u.attrs);
            self.symbols.push(SymbolRecord {
                kind: SymbolKind::Import,
                name,
                start_line: start,
                end_line: end,
                signature: None,
                docstring: None,
                parent_class: None,
                is_async: false,
            });
        }
    }
}

fn flatten_use_tree(tree: &UseTree, prefix: String) -> Vec<String> {
    match tree {
        UseTree::Path(p) => {
            let next = if prefix.is_empty() {
                p.ident.to_string()
            } else {
                format!("{prefix}::{}", p.ident)
            };
            flatten_use_tree(&p.tree, next)
        }
        UseTree::Name(n) => vec![if prefix.is_empty() {
            n.ident.to_string()
        } else {
            format!("{prefix}::{}", n.ident)
        }],
        UseTree::Rename(r) => vec![if prefix.is_empty() {
            r.rename.to_string()
        } else {
            format!("{prefix}::{}", r.rename)
        }],
        UseTree::Glob(_) => vec![format!("{prefix}::*")],
        UseTree::Group(g) => g
            .items
            .iter()
            .flat_map(|t| flatten_use_tree(t, prefix.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SymbolKind;

    #[test]
    fn extracts_function_with_exact_span() {
        let src = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        let symbols = RustExtractor.extract(src);
        assert_eq!(symbols.len(), 1);
        let f = &symbols[0];
        assert_eq!(f.kind, SymbolKind::Function);
        assert_eq!(f.name, "add");
        assert_eq!(f.start_line, 1);
        assert_eq!(f.end_line, 3);
        assert_eq!(f.signature.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn doc_comment_and_attrs_widen_span_upward() {
        let src = "/// does a thing\n#[inline]\npub fn go() {\n    ()\n}\n";
        let symbols = RustExtractor.extract(src);
        let f = &symbols[0];
        assert_eq!(f.start_line, 1);
        assert_eq!(f.docstring.as_deref(), Some("does a thing"));
    }

    #[test]
    fn methods_carry_parent_class() {
        let src = "struct Foo;\nimpl Foo {\n    fn bar(&self) {}\n}\n";
        let symbols = RustExtractor.extract(src);
        let method = symbols.iter().find(|s| s.name == "bar").unwrap();
        assert_eq!(method.parent_class.as_deref(), Some("Foo"));
    }

    #[test]
    fn use_statements_flatten_groups() {
        let src = "use std::collections::{HashMap, HashSet};\n";
        let symbols = RustExtractor.extract(src);
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"std::collections::HashMap"));
        assert!(names.contains(&"std::collections::HashSet"));
    }

    #[test]
    fn check_syntax_reports_error_location() {
        let bad = "fn broken( {\n";
        match RustExtractor.check_syntax(bad) {
            SyntaxCheck::Error { .. } => {}
            SyntaxCheck::Ok => panic!("expected a syntax error"),
        }
    }

    #[test]
    fn never_panics_on_garbage_input() {
        let garbage = "{{{ not rust at all ]]]";
        let symbols = RustExtractor.extract(garbage);
        assert!(symbols.is_empty());
    }
}
