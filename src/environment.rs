use crate::ast::{Node, Template};
use crate::callbacks::{CallbackResult, CallbackTable};
use crate::context::RenderContext;
use crate::error::{AkizoraError, RenderError, Result};
use crate::lexer::SyntaxConfig;
use crate::parser;
use crate::renderer::Renderer;
use crate::template_loader::{FileSystemLoader, TemplateLoader};
use crate::value::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Resolves an include name into a parsed template when the environment's
/// cache and file search come up empty (or file search is disabled)
pub type IncludeCallback = Arc<dyn Fn(&str) -> Result<Template> + Send + Sync>;

/// Configuration, callback table and template cache; the entry point for
/// parsing and rendering.
///
/// `parse` and `render` take `&mut self` because include resolution writes
/// into the template cache and every render replaces the diagnostics list.
/// An environment shared across threads must be configured up front and
/// have its cache writes serialized by the host.
pub struct Environment {
    syntax: SyntaxConfig,
    callbacks: CallbackTable,
    templates: HashMap<String, Template>,
    loader: Box<dyn TemplateLoader>,
    include_callback: Option<IncludeCallback>,
    search_included_templates_in_files: bool,
    graceful_errors: bool,
    render_errors: Vec<RenderError>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            syntax: SyntaxConfig::default(),
            callbacks: CallbackTable::with_builtins(),
            templates: HashMap::new(),
            loader: Box::new(FileSystemLoader::new(".")),
            include_callback: None,
            search_included_templates_in_files: true,
            graceful_errors: false,
            render_errors: Vec::new(),
        }
    }

    /// An environment whose loader reads templates under `root`
    pub fn with_template_root(root: impl AsRef<Path>) -> Self {
        let mut env = Self::new();
        env.loader = Box::new(FileSystemLoader::new(root));
        env
    }

    /// Parse a template source. Includes are resolved eagerly: every
    /// `{% include "name" %}` that is not already cached is located via the
    /// include callback or the loader and parsed into the cache, so a
    /// missing include surfaces here as a file error.
    pub fn parse(&mut self, source: &str) -> Result<Template> {
        let template = parser::parse(source, &self.syntax)?;
        let mut in_flight = Vec::new();
        self.resolve_includes(&template, &mut in_flight)?;
        Ok(template)
    }

    /// Load a template through the loader and parse it
    pub fn parse_file(&mut self, path: &str) -> Result<Template> {
        let source = self.loader.load(path)?;
        self.parse(&source)
    }

    /// Parse and render in one call
    pub fn render(&mut self, source: &str, data: impl Into<Value>) -> Result<String> {
        let template = self.parse(source)?;
        self.render_template(&template, data)
    }

    /// Render a previously parsed template. The diagnostics list is
    /// replaced on every call.
    pub fn render_template(&mut self, template: &Template, data: impl Into<Value>) -> Result<String> {
        self.render_errors.clear();
        let mut ctx = RenderContext::new(data.into());
        let result = Renderer::new(
            template,
            &self.callbacks,
            &self.templates,
            self.graceful_errors,
        )
        .render(&mut ctx);
        self.render_errors = ctx.errors;
        result?;
        Ok(ctx.output)
    }

    /// Register a named template for `{% include "name" %}`
    pub fn include_template(&mut self, name: &str, template: Template) {
        self.templates.insert(name.to_string(), template);
    }

    pub fn add_callback<F>(&mut self, name: &str, arity: i32, callback: F)
    where
        F: Fn(&[Value]) -> CallbackResult + Send + Sync + 'static,
    {
        self.callbacks.add(name, arity, callback);
    }

    pub fn add_void_callback<F>(&mut self, name: &str, arity: i32, callback: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.callbacks.add_void(name, arity, callback);
    }

    pub fn set_expression(&mut self, open: &str, close: &str) {
        self.syntax.expression_open = open.to_string();
        self.syntax.expression_close = close.to_string();
    }

    pub fn set_statement(&mut self, open: &str, close: &str) {
        self.syntax.statement_open = open.to_string();
        self.syntax.statement_close = close.to_string();
    }

    pub fn set_comment(&mut self, open: &str, close: &str) {
        self.syntax.comment_open = open.to_string();
        self.syntax.comment_close = close.to_string();
    }

    pub fn set_line_statement(&mut self, prefix: &str) {
        self.syntax.line_statement = prefix.to_string();
    }

    pub fn set_trim_blocks(&mut self, trim_blocks: bool) {
        self.syntax.trim_blocks = trim_blocks;
    }

    pub fn set_lstrip_blocks(&mut self, lstrip_blocks: bool) {
        self.syntax.lstrip_blocks = lstrip_blocks;
    }

    pub fn set_search_included_templates_in_files(&mut self, search: bool) {
        self.search_included_templates_in_files = search;
    }

    pub fn set_include_callback<F>(&mut self, callback: F)
    where
        F: Fn(&str) -> Result<Template> + Send + Sync + 'static,
    {
        self.include_callback = Some(Arc::new(callback));
    }

    pub fn set_loader(&mut self, loader: Box<dyn TemplateLoader>) {
        self.loader = loader;
    }

    pub fn set_graceful_errors(&mut self, graceful: bool) {
        self.graceful_errors = graceful;
    }

    /// Failures recovered by graceful mode during the last render, in
    /// source order
    pub fn get_last_render_errors(&self) -> &[RenderError] {
        &self.render_errors
    }

    pub fn clear_render_errors(&mut self) {
        self.render_errors.clear();
    }

    fn resolve_includes(&mut self, template: &Template, in_flight: &mut Vec<String>) -> Result<()> {
        for name in collect_includes(&template.nodes) {
            if self.templates.contains_key(&name) || in_flight.contains(&name) {
                continue;
            }
            let included = self.locate_template(&name)?;
            in_flight.push(name.clone());
            let nested = self.resolve_includes(&included, in_flight);
            in_flight.pop();
            nested?;
            self.templates.insert(name, included);
        }
        Ok(())
    }

    fn locate_template(&mut self, name: &str) -> Result<Template> {
        if let Some(callback) = self.include_callback.clone() {
            return callback(name);
        }
        if self.search_included_templates_in_files {
            let source = self.loader.load(name)?;
            return parser::parse(&source, &self.syntax);
        }
        Err(AkizoraError::FileError {
            message: format!("failed accessing file at '{}'", name),
        })
    }
}

fn collect_includes(nodes: &[Node]) -> Vec<String> {
    let mut names = Vec::new();
    walk_includes(nodes, &mut names);
    names
}

fn walk_includes(nodes: &[Node], names: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Include(n) => names.push(n.name.clone()),
            Node::If(n) => {
                for (_, body) in &n.branches {
                    walk_includes(body, names);
                }
                if let Some(body) = &n.else_body {
                    walk_includes(body, names);
                }
            }
            Node::For(n) => walk_includes(&n.body, names),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_reuse() {
        let mut env = Environment::new();
        let template = env
            .parse("{% if is_happy %}{{ name }}{% else %}{{ city }}{% endif %}")
            .unwrap();

        let data = json!({"name": "Peter", "city": "Brunswick", "is_happy": true});
        assert_eq!(env.render_template(&template, data).unwrap(), "Peter");

        let data = json!({"name": "Peter", "city": "Brunswick", "is_happy": false});
        assert_eq!(env.render_template(&template, data).unwrap(), "Brunswick");
    }

    #[test]
    fn test_named_include() {
        let mut env = Environment::new();
        let greeting = env.parse("Hello {{ name }}").unwrap();
        env.include_template("greeting", greeting);

        let template = env.parse(r#"{% include "greeting" %}!"#).unwrap();
        assert_eq!(
            env.render_template(&template, json!({"name": "Peter"})).unwrap(),
            "Hello Peter!"
        );
    }

    #[test]
    fn test_missing_include_is_parse_time_file_error() {
        let mut env = Environment::new();
        let err = env.parse(r#"{% include "does-not-exist" %}!"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "File error: failed accessing file at 'does-not-exist'"
        );
    }

    #[test]
    fn test_include_callback() {
        let mut env = Environment::new();
        env.set_search_included_templates_in_files(false);
        env.set_include_callback(|_| crate::parse("Hello {{ name }}"));

        let template = env.parse(r#"{% include "greeting" %}!"#).unwrap();
        assert_eq!(
            env.render_template(&template, json!({"name": "Peter"})).unwrap(),
            "Hello Peter!"
        );
    }

    #[test]
    fn test_include_callback_receives_name() {
        let mut env = Environment::new();
        env.set_include_callback(|name| crate::parse(&format!("Bye {}", name)));

        let template = env.parse(r#"{% include "Jeff" %}!"#).unwrap();
        assert_eq!(env.render_template(&template, json!({})).unwrap(), "Bye Jeff!");
    }

    #[test]
    fn test_delimiter_reconfiguration() {
        let mut env = Environment::new();
        let data = json!({"name": "Peter"});
        assert_eq!(env.render("Hello {{ name }}!", data.clone()).unwrap(), "Hello Peter!");

        env.set_expression("(&", "&)");
        assert_eq!(
            env.render("Hello {{ name }}!", data.clone()).unwrap(),
            "Hello {{ name }}!"
        );
        assert_eq!(env.render("Hello (& name &)!", data).unwrap(), "Hello Peter!");
    }

    #[test]
    fn test_errors_cleared_between_renders() {
        let mut env = Environment::new();
        env.set_graceful_errors(true);
        let data = json!({"name": "Peter"});

        env.render("{{ unknown }}", data.clone()).unwrap();
        assert_eq!(env.get_last_render_errors().len(), 1);

        env.render("{{ name }}", data.clone()).unwrap();
        assert_eq!(env.get_last_render_errors().len(), 0);

        env.render("{{ unknown }}", data).unwrap();
        assert_eq!(env.get_last_render_errors().len(), 1);
    }

    #[test]
    fn test_custom_callback() {
        let mut env = Environment::new();
        env.add_callback("double", 1, |args| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
        });
        assert_eq!(env.render("{{ double(age) }}", json!({"age": 29})).unwrap(), "58");
    }
}
