use std::fmt;

use tracing::warn;

use crate::error::TranspileError;
use crate::models::options::TranspileOptions;
use crate::tpl::ast::{
    Block, Expression, Mustache, Partial, PathExpression, Program, Statement, SubExpression,
};
use crate::tpl::context::{Context, IterationStyle, UNRESOLVED};
use crate::tpl::diagnostic::{Diagnostic, DiagnosticKind};

/// Walks a Handlebars program and collects the equivalent Django fragments.
///
/// Nested programs are handled by child transpilers that share the same
/// options; blocks that introduce variables (`each`, `with`) hand their
/// child a [`Context`] extended by one scope.
pub struct Transpiler<'a> {
    buffer: Vec<String>,
    context: Context,
    depth: usize,
    options: &'a TranspileOptions,
}

impl<'a> Transpiler<'a> {
    pub fn new(context: Context, depth: usize, options: &'a TranspileOptions) -> Self {
        Self {
            buffer: Vec::new(),
            context,
            depth,
            options,
        }
    }

    /// Transpiles `program` against a fresh root context.
    pub fn from_program(
        program: &Program,
        options: &'a TranspileOptions,
    ) -> Result<Self, TranspileError> {
        let mut transpiler = Self::new(Context::new(), 0, options);
        transpiler.transpile_program(program, false)?;
        Ok(transpiler)
    }

    pub fn fragments(&self) -> &[String] {
        &self.buffer
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// True when `program` holds nothing but an `if` block, which lets an
    /// enclosing `else` collapse into `elif`.
    pub fn is_only_condition(program: &Program) -> bool {
        matches!(program.body.as_slice(), [Statement::Block(b)] if b.helper() == "if")
    }

    pub fn transpile_program(
        &mut self,
        program: &Program,
        is_conditional_in_inverse: bool,
    ) -> Result<&mut Self, TranspileError> {
        for statement in &program.body {
            match statement {
                Statement::Content(text) => self.buffer.push(text.clone()),
                Statement::Mustache(mustache) => self.mustache(mustache)?,
                Statement::Comment(text) => self.buffer.push(format!("{{#{}#}}", text)),
                Statement::Block(block) => self.block(block, is_conditional_in_inverse)?,
                Statement::Partial(partial) => self.partial(partial)?,
            }
        }
        Ok(self)
    }

    fn nested(
        &self,
        program: &Program,
        context: Context,
        depth: usize,
        is_conditional_in_inverse: bool,
    ) -> Result<String, TranspileError> {
        let mut transpiler = Transpiler::new(context, depth, self.options);
        transpiler.transpile_program(program, is_conditional_in_inverse)?;
        Ok(transpiler.to_string())
    }

    fn degrade(&self, kind: DiagnosticKind, message: String) {
        warn!(kind = kind.as_str(), depth = self.depth, "{}", message);
        self.context.record(Diagnostic::new(kind, message));
    }

    /// Resolves a path, mapping loop data variables onto `forloop`.
    fn variable(&self, path: &PathExpression) -> String {
        if path.data {
            match path.original.as_str() {
                "@index" => return "forloop.counter0".to_string(),
                "@first" => return "forloop.first".to_string(),
                "@last" => return "forloop.last".to_string(),
                _ => {}
            }
        }
        self.context.resolve(path)
    }

    /// A path is resolved, anything else is kept as written.
    fn argument(&self, expr: Option<&Expression>) -> String {
        match expr {
            Some(Expression::Path(path)) => self.variable(path),
            Some(other) => other.as_written(),
            None => UNRESOLVED.to_string(),
        }
    }

    fn mustache(&mut self, mustache: &Mustache) -> Result<(), TranspileError> {
        let path = match &mustache.path {
            Expression::Path(path) => path,
            other => return Err(TranspileError::LiteralInterpolation(other.as_written())),
        };

        if path.original == self.options.icon_helper {
            self.icon(mustache);
            return Ok(());
        }

        if !mustache.params.is_empty() || !mustache.hash.is_empty() {
            self.degrade(
                DiagnosticKind::IgnoredArguments,
                format!("arguments of helper `{}` are dropped", path.original),
            );
        }

        let escaped = if mustache.escaped { "" } else { "|safe" };
        let variable = self.variable(path);
        self.buffer.push(format!("{{{{ {}{} }}}}", variable, escaped));
        Ok(())
    }

    fn icon(&mut self, mustache: &Mustache) {
        let mut tag = String::from("{% carbon_icon");
        for param in &mustache.params {
            tag.push(' ');
            match param {
                Expression::Path(path) => tag.push_str(&self.variable(path)),
                other => tag.push_str(&other.as_written()),
            }
        }
        for pair in &mustache.hash {
            let value = self.icon_class(&pair.key, &pair.value);
            tag.push_str(&format!(" {}=\"{}\"", pair.key.replace('-', "_"), value));
        }
        tag.push_str(" %}");
        self.buffer.push(tag);
    }

    /// Translates the `add` class-building expressions of icon arguments.
    fn icon_class(&self, key: &str, value: &Expression) -> String {
        let prefix = &self.options.icon_class_prefix;
        match value {
            Expression::String(s) => return s.clone(),
            Expression::SubExpression(sub) if sub.helper() == "add" => {
                match (sub.params.first(), sub.params.get(1)) {
                    (Some(Expression::Path(_)), Some(Expression::String(s))) => {
                        return format!("{}{}", prefix, s);
                    }
                    (Some(Expression::SubExpression(_)), Some(Expression::SubExpression(_))) => {
                        let mut classes = Vec::new();
                        collect_classes(sub, prefix, &mut classes);
                        return classes.join(" ");
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        self.degrade(
            DiagnosticKind::UnsupportedIconArgument,
            format!("icon argument {}={} is not supported", key, value.as_written()),
        );
        "?".to_string()
    }

    fn block(&mut self, block: &Block, is_conditional_in_inverse: bool) -> Result<(), TranspileError> {
        match block.helper() {
            "if" => self.if_block(block, is_conditional_in_inverse),
            "unless" => self.unless_block(block),
            "eq" | "is" => self.eq_block(block),
            "with" => self.with_block(block),
            "each" => self.each_block(block),
            name => {
                self.degrade(
                    DiagnosticKind::UnsupportedBlock,
                    format!("unsupported block helper `{}`", name),
                );
                self.passthrough(block)
            }
        }
    }

    fn condition(&self, expr: Option<&Expression>) -> String {
        match expr {
            Some(Expression::Path(path)) => self.variable(path),
            Some(Expression::SubExpression(sub)) if sub.helper() == "condition" => sub
                .params
                .iter()
                .map(|param| match param {
                    Expression::Path(path) => self.variable(path),
                    other => other.literal_text(),
                })
                .collect::<Vec<_>>()
                .join(" "),
            Some(literal) if literal.is_literal() => literal.literal_text(),
            other => {
                let written = other.map_or_else(String::new, Expression::as_written);
                self.degrade(
                    DiagnosticKind::UnsupportedCondition,
                    format!("condition `{}` is not supported", written),
                );
                UNRESOLVED.to_string()
            }
        }
    }

    fn if_block(&mut self, block: &Block, is_conditional_in_inverse: bool) -> Result<(), TranspileError> {
        let condition = self.condition(block.params.first());
        self.context.count_conditional();
        // a lone `if` in an else branch continues the parent's chain
        let tag = if is_conditional_in_inverse { "elif" } else { "if" };
        self.buffer.push(format!("{{% {} {} %}}", tag, condition));

        let body = self.nested(&block.program, self.context.clone(), self.depth, false)?;
        self.buffer.push(body);

        if let Some(inverse) = &block.inverse {
            let only_condition = Self::is_only_condition(inverse);
            let body = self.nested(inverse, self.context.clone(), self.depth, only_condition)?;
            if !only_condition {
                self.buffer.push("{% else %}".to_string());
            }
            self.buffer.push(body);
        }

        // the outermost `if` closes the whole chain
        if !is_conditional_in_inverse {
            self.buffer.push("{% endif %}".to_string());
        }
        Ok(())
    }

    fn unless_block(&mut self, block: &Block) -> Result<(), TranspileError> {
        let condition = self.condition(block.params.first());
        self.context.count_conditional();
        self.buffer.push(format!("{{% if not {} %}}", condition));
        self.close_conditional(block)
    }

    fn eq_block(&mut self, block: &Block) -> Result<(), TranspileError> {
        let left = self.argument(block.params.first());
        let right = block
            .params
            .get(1)
            .map_or_else(|| UNRESOLVED.to_string(), Expression::as_written);
        self.context.count_conditional();
        self.buffer.push(format!("{{% if {} == {} %}}", left, right));
        self.close_conditional(block)
    }

    /// Body, optional `else` branch and `endif` of a non-chaining conditional.
    fn close_conditional(&mut self, block: &Block) -> Result<(), TranspileError> {
        let body = self.nested(&block.program, self.context.clone(), self.depth, false)?;
        self.buffer.push(body);
        if let Some(inverse) = &block.inverse {
            let body = self.nested(inverse, self.context.clone(), self.depth, false)?;
            self.buffer.push("{% else %}".to_string());
            self.buffer.push(body);
        }
        self.buffer.push("{% endif %}".to_string());
        Ok(())
    }

    fn with_block(&mut self, block: &Block) -> Result<(), TranspileError> {
        let (lookup, name) = match (block.params.as_slice(), block.program.block_params.as_slice()) {
            ([Expression::SubExpression(sub)], [name])
                if sub.helper() == "lookup" && sub.params.len() == 2 =>
            {
                (sub, name)
            }
            _ => {
                self.degrade(
                    DiagnosticKind::UnsupportedWith,
                    "`with` is only translated for `(lookup collection key) as |name|`".to_string(),
                );
                return self.passthrough(block);
            }
        };

        let child = self.context.create_child(vec![name.clone()], None);
        let collection = self.argument(lookup.params.first());
        let key = self.argument(lookup.params.get(1));
        self.buffer
            .push(format!("{{% with {}={}|lookup:{} %}}", name, collection, key));
        let body = self.nested(&block.program, child, self.depth, false)?;
        self.buffer.push(body);
        if block.inverse.is_some() {
            self.degrade(
                DiagnosticKind::UnsupportedWith,
                format!("else branch of `with {}` is dropped", name),
            );
        }
        self.buffer.push("{% endwith %}".to_string());
        Ok(())
    }

    fn each_block(&mut self, block: &Block) -> Result<(), TranspileError> {
        let collection = match block.params.first() {
            Some(Expression::Path(path)) => self.variable(path),
            other => {
                let written = other.map_or_else(String::new, Expression::as_written);
                self.degrade(
                    DiagnosticKind::UnsupportedCondition,
                    format!("`each` over `{}` is not supported", written),
                );
                UNRESOLVED.to_string()
            }
        };

        let block_params = &block.program.block_params;
        let child = if block_params.is_empty() {
            let last = collection.rsplit('.').next().unwrap_or_default();
            self.context.create_child(vec![format!("{}_i", last)], None)
        } else {
            let child = self.context.create_child(block_params.clone(), None);
            if block_params.len() == 2 {
                child.current_scope().mark_object_iteration();
            }
            child
        };

        // the loop header depends on what the body did to the child scope
        let body = self.nested(&block.program, child.clone(), self.depth + 1, false)?;

        let scope = child.current_scope();
        match scope.iteration_style() {
            IterationStyle::Array => {
                let value = scope.value().unwrap_or("value");
                self.buffer
                    .push(format!("{{% for {} in {} %}}", value, collection));
            }
            IterationStyle::Object => {
                let (key, value) = match scope.value() {
                    Some(value) => (scope.key().unwrap_or("key"), value),
                    None => ("key", "value"),
                };
                self.buffer.push(format!(
                    "{{% for {}, {} in {}.items %}}",
                    key, value, collection
                ));
            }
        }
        self.buffer.push(body);

        if let Some(inverse) = &block.inverse {
            let body = self.nested(inverse, self.context.clone(), self.depth, false)?;
            self.buffer.push("{% empty %}".to_string());
            self.buffer.push(body);
        }
        self.buffer.push("{% endfor %}".to_string());
        Ok(())
    }

    /// Wraps the translated body in the helper's own markers.
    fn passthrough(&mut self, block: &Block) -> Result<(), TranspileError> {
        let name = block.helper();
        self.buffer.push(format!("{{{{# {} }}}}", name));
        let body = self.nested(&block.program, self.context.clone(), self.depth, false)?;
        self.buffer.push(body);
        if let Some(inverse) = &block.inverse {
            let body = self.nested(inverse, self.context.clone(), self.depth, false)?;
            self.buffer.push("{{else}}".to_string());
            self.buffer.push(body);
        }
        self.buffer.push(format!("{{{{/{}}}}}", name));
        Ok(())
    }

    fn partial(&mut self, partial: &Partial) -> Result<(), TranspileError> {
        let name = self.partial_name(&partial.name);
        let mut bindings = Vec::new();

        if let Some(first) = partial.params.first() {
            let context = self.argument(Some(first));
            // Django includes can add variables but not replace the context
            if self.options.strict_partials {
                return Err(TranspileError::PartialContext {
                    partial: partial.name.as_written(),
                    context,
                });
            }
            self.degrade(
                DiagnosticKind::PartialContext,
                format!(
                    "context `{}` passed to partial {} cannot be translated",
                    context,
                    partial.name.as_written()
                ),
            );
            bindings.push(format!("{}=\"does-not-work\"", context));
        }

        for pair in &partial.hash {
            let value = match &pair.value {
                Expression::Path(path) => self.variable(path),
                Expression::String(s) => format!("\"{}\"", s),
                Expression::Number(n) => n.clone(),
                Expression::Boolean(b) => b.to_string(),
                other => {
                    self.degrade(
                        DiagnosticKind::IgnoredArguments,
                        format!("partial argument {}={} is dropped", pair.key, other.as_written()),
                    );
                    continue;
                }
            };
            bindings.push(format!("{}={}", pair.key, value));
        }

        let with = if bindings.is_empty() {
            String::new()
        } else {
            format!(" with {}", bindings.join(" "))
        };
        self.buffer.push(format!("{{% include {}{} %}}", name, with));
        Ok(())
    }

    fn partial_name(&self, name: &Expression) -> String {
        let source = &self.options.source_extension;
        let target = &self.options.target_extension;
        match name {
            Expression::String(s) => {
                let renamed = s.replacen(&format!(".{}", source), &format!(".{}", target), 1);
                return format!("\"{}\"", renamed);
            }
            Expression::Path(path) => {
                let parts: Vec<&str> = path
                    .parts
                    .iter()
                    .map(String::as_str)
                    .filter(|part| *part != source.as_str())
                    .collect();
                return format!("\"{}.{}\"", parts.join("/"), target);
            }
            // only lookups on the current scope are supported
            Expression::SubExpression(sub) if sub.helper() == "lookup" => match sub.params.get(1) {
                Some(Expression::Path(path)) => return self.variable(path),
                Some(literal) if literal.is_literal() => return literal.literal_text(),
                _ => {}
            },
            _ => {}
        }
        self.degrade(
            DiagnosticKind::UnsupportedPartial,
            format!("partial name {} is not supported", name.as_written()),
        );
        UNRESOLVED.to_string()
    }
}

fn collect_classes(sub: &SubExpression, prefix: &str, classes: &mut Vec<String>) {
    for param in &sub.params {
        match param {
            Expression::String(s) if s != " " => classes.push(format!("{}{}", prefix, s)),
            Expression::SubExpression(inner) => collect_classes(inner, prefix, classes),
            _ => {}
        }
    }
}

impl fmt::Display for Transpiler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.buffer {
            f.write_str(fragment)?;
        }
        Ok(())
    }
}
