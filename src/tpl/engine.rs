use tracing::debug;

use crate::error::TranspileError;
use crate::models::options::TranspileOptions;
use crate::tpl::ast::Program;
use crate::tpl::cache::{self, TEMPLATE_CACHE};
use crate::tpl::diagnostic::Diagnostic;
use crate::tpl::parser::parse_template;
use crate::tpl::transpile::Transpiler;

/// The Django text of one template plus what was degraded on the way.
#[derive(Debug, Clone)]
pub struct Transpiled {
    pub output: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Number of conditional tags emitted.
    pub conditionals: usize,
}

/// Transpiles a Handlebars source into Django template text.
pub fn transpile(source: &str, options: &TranspileOptions) -> Result<Transpiled, TranspileError> {
    let program = parse_template(source)?;
    transpile_program(&program, options)
}

/// Like [`transpile`], keeping the parsed AST cached under `template_name`.
pub fn transpile_template(
    template_name: &str,
    source: &str,
    options: &TranspileOptions,
) -> Result<Transpiled, TranspileError> {
    let ast = cache::get_ast(template_name, source)?;
    let transpiled = transpile_program(&ast, options)?;
    debug!(
        template = template_name,
        conditionals = transpiled.conditionals,
        diagnostics = transpiled.diagnostics.len(),
        "transpiled template"
    );
    Ok(transpiled)
}

/// Every document starts from its own root context.
pub fn transpile_program(
    program: &Program,
    options: &TranspileOptions,
) -> Result<Transpiled, TranspileError> {
    let transpiler = Transpiler::from_program(program, options)?;
    let output = transpiler.to_string();
    let mut shared = transpiler.context().shared().borrow_mut();
    Ok(Transpiled {
        output,
        diagnostics: std::mem::take(&mut shared.diagnostics),
        conditionals: shared.conditionals,
    })
}

/// Appends the original template as a trailing Django comment.
pub fn with_source_comment(output: &str, source: &str) -> String {
    format!(
        "{}\n\n{{% comment %}}\nOriginal handlebar template:\n\n{}\n{{% endcomment %}}",
        output, source
    )
}

/// Drops the cached AST of a template.
pub fn remove_template(template_name: &str) {
    TEMPLATE_CACHE.remove(template_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tpl::diagnostic::DiagnosticKind;

    #[test]
    fn test_transpile_simple() {
        let out = transpile("Hello {{name}}", &TranspileOptions::new()).unwrap();
        assert_eq!(out.output, "Hello {{ name }}");
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.conditionals, 0);
    }

    #[test]
    fn test_documents_do_not_share_state() {
        let options = TranspileOptions::new();
        let first = transpile("{{#if a}}{{/if}}{{#foo}}{{/foo}}", &options).unwrap();
        let second = transpile("{{#if a}}{{/if}}", &options).unwrap();
        assert_eq!(first.conditionals, 1);
        assert_eq!(first.diagnostics.len(), 1);
        assert_eq!(first.diagnostics[0].kind, DiagnosticKind::UnsupportedBlock);
        assert_eq!(second.conditionals, 1);
        assert!(second.diagnostics.is_empty());
    }

    #[test]
    fn test_transpile_template_uses_cache() {
        let options = TranspileOptions::new();
        let out = transpile_template("engine_test", "{{#each items}}{{@key}}{{/each}}", &options)
            .unwrap();
        assert_eq!(
            out.output,
            "{% for key, items_i in items.items %}{{ key }}{% endfor %}"
        );
        assert!(TEMPLATE_CACHE.contains_key("engine_test"));
        remove_template("engine_test");
        assert!(!TEMPLATE_CACHE.contains_key("engine_test"));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = transpile("{{#if a}}", &TranspileOptions::new()).unwrap_err();
        assert!(matches!(err, TranspileError::Parse(_)));
    }

    #[test]
    fn test_with_source_comment() {
        assert_eq!(
            with_source_comment("{{ a }}", "{{a}}"),
            "{{ a }}\n\n{% comment %}\nOriginal handlebar template:\n\n{{a}}\n{% endcomment %}"
        );
    }
}
