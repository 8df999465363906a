use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::tpl::ast::PathExpression;
use crate::tpl::diagnostic::Diagnostic;

/// Returned for references that cannot be bound to any scope.
pub const UNRESOLVED: &str = "???";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterationStyle {
    #[default]
    Array,
    Object,
}

/// Variables introduced by one block level (`each`, `with`).
///
/// Only the iteration style changes after construction, and only from
/// `Array` to `Object`.
#[derive(Debug, Default)]
pub struct Scope {
    variables: Vec<String>,
    replacements: Option<HashMap<String, String>>,
    iteration_style: Cell<IterationStyle>,
}

impl Scope {
    pub fn new(variables: Vec<String>, replacements: Option<HashMap<String, String>>) -> Self {
        Self {
            variables,
            replacements,
            iteration_style: Cell::new(IterationStyle::Array),
        }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn replacements(&self) -> Option<&HashMap<String, String>> {
        self.replacements.as_ref()
    }

    /// Alias of `this` inside the scope.
    pub fn value(&self) -> Option<&str> {
        self.variables.first().map(String::as_str)
    }

    /// Alias of `@key` inside the scope.
    pub fn key(&self) -> Option<&str> {
        self.variables.get(1).map(String::as_str)
    }

    pub fn iteration_style(&self) -> IterationStyle {
        self.iteration_style.get()
    }

    pub fn mark_object_iteration(&self) {
        self.iteration_style.set(IterationStyle::Object);
    }
}

/// State shared by a root context and every context derived from it.
#[derive(Debug, Default)]
pub struct SharedState {
    pub conditionals: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// All variables and replacements visible up to some depth.
#[derive(Debug, Default)]
pub struct MergedScope {
    pub variables: HashSet<String>,
    pub replacements: HashMap<String, String>,
}

/// The chain of scopes enclosing a point in the template.
///
/// Children are created with [`Context::create_child`]; the parent keeps its
/// own scope list, while the scopes themselves and the shared state are
/// reference counted and visible to every derived context.
#[derive(Debug, Clone)]
pub struct Context {
    scopes: Vec<Rc<Scope>>,
    depth: usize,
    shared: Rc<RefCell<SharedState>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            scopes: vec![Rc::new(Scope::new(Vec::new(), None))],
            depth: 0,
            shared: Rc::new(RefCell::new(SharedState::default())),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn shared(&self) -> &Rc<RefCell<SharedState>> {
        &self.shared
    }

    pub fn create_child(
        &self,
        variables: Vec<String>,
        replacements: Option<HashMap<String, String>>,
    ) -> Context {
        let mut child = self.clone();
        child.scopes.push(Rc::new(Scope::new(variables, replacements)));
        child.depth += 1;
        child
    }

    /// Panics when `depth` is above [`Context::depth`].
    pub fn scope_at(&self, depth: usize) -> &Scope {
        &self.scopes[depth]
    }

    pub fn current_scope(&self) -> &Scope {
        self.scope_at(self.depth)
    }

    pub fn collect_up_to(&self, depth: usize) -> MergedScope {
        let mut merged = MergedScope::default();
        for scope in self.scopes.iter().take(depth + 1) {
            merged.variables.extend(scope.variables.iter().cloned());
            if let Some(replacements) = &scope.replacements {
                merged
                    .replacements
                    .extend(replacements.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        merged
    }

    /// Translates a Handlebars path into a Django variable expression.
    pub fn resolve(&self, path: &PathExpression) -> String {
        let Some(target) = self.depth.checked_sub(path.depth) else {
            return UNRESOLVED.to_string();
        };

        // the root has no scope variables
        if target == 0 {
            return path.joined();
        }

        let Some(scope) = self.scopes.get(target) else {
            return UNRESOLVED.to_string();
        };

        if path.is_current_value_reference() {
            return scope.value().unwrap_or(UNRESOLVED).to_string();
        }

        if path.is_key_reference() {
            // a key that was never declared turns the loop into an object loop
            if scope.key().is_none() {
                scope.mark_object_iteration();
            }
            return scope.key().unwrap_or("key").to_string();
        }

        let merged = self.collect_up_to(target);
        if merged.variables.contains(&path.parts[0]) {
            let name = path.joined();
            return match merged.replacements.get(&name) {
                Some(replacement) => replacement.clone(),
                None => name,
            };
        }

        match scope.value() {
            Some(value) => format!("{}.{}", value, path.joined()),
            None => UNRESOLVED.to_string(),
        }
    }

    pub fn record(&self, diagnostic: Diagnostic) {
        self.shared.borrow_mut().diagnostics.push(diagnostic);
    }

    pub fn count_conditional(&self) {
        self.shared.borrow_mut().conditionals += 1;
    }
}
