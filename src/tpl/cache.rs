use crate::error::ParseError;
use crate::tpl::ast::Program;
use crate::tpl::parser::parse_template;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

/// The parsed form of one template file, keyed by its path in the cache and
/// kept until the file content changes.
#[derive(Clone)]
pub struct CachedTemplate {
    pub ast: Arc<Program>,
    pub content_hash: u64,
}

/// Parsed templates by name
pub(crate) static TEMPLATE_CACHE: LazyLock<DashMap<String, CachedTemplate>> =
    LazyLock::new(DashMap::new);

fn content_hash(template_content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    template_content.hash(&mut hasher);
    hasher.finish()
}

/// Returns the cached AST of `template_name`, reparsing when the content changed.
/// Templates that fail to parse are never cached.
pub(crate) fn get_ast(
    template_name: &str,
    template_content: &str,
) -> Result<Arc<Program>, ParseError> {
    let hash = content_hash(template_content);
    if let Some(cached) = TEMPLATE_CACHE.get(template_name)
        && cached.content_hash == hash
    {
        return Ok(Arc::clone(&cached.ast));
    }

    let ast = Arc::new(parse_template(template_content)?);
    TEMPLATE_CACHE.insert(
        template_name.to_string(),
        CachedTemplate {
            ast: Arc::clone(&ast),
            content_hash: hash,
        },
    );
    Ok(ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_and_invalidation() {
        let first = get_ast("cache_test", "{{a}}").unwrap();
        let again = get_ast("cache_test", "{{a}}").unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let changed = get_ast("cache_test", "{{b}}").unwrap();
        assert!(!Arc::ptr_eq(&first, &changed));
        assert_eq!(
            TEMPLATE_CACHE.get("cache_test").map(|c| c.content_hash),
            Some(content_hash("{{b}}"))
        );
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        assert!(get_ast("cache_broken", "{{#if a}}").is_err());
        assert!(TEMPLATE_CACHE.get("cache_broken").is_none());
    }

    #[test]
    fn test_broken_edit_keeps_previous_ast() {
        let good = get_ast("cache_edit", "{{a}}").unwrap();
        assert!(get_ast("cache_edit", "{{#if a}}").is_err());
        let cached = TEMPLATE_CACHE.get("cache_edit").map(|c| Arc::clone(&c.ast));
        assert!(cached.is_some_and(|ast| Arc::ptr_eq(&ast, &good)));
    }
}
