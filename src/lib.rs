//! Akizora - a Jinja2-style text template engine
//!
//! Templates interleave literal text with expressions `{{ }}`, statements
//! `{% %}`, comments `{# #}` and raw blocks; rendering substitutes values
//! from a JSON-like data tree. Templates are parsed once and can be rendered
//! many times against different data.
//!
//! The engine also offers a graceful error mode: instead of failing the
//! render, an unknown variable or callback leaves its original source text
//! in the output and records a structured diagnostic.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//!
//! let result = akizora::render(
//!     "Hello {{ name }}!",
//!     json!({"name": "World"}),
//! ).unwrap();
//!
//! assert_eq!(result, "Hello World!");
//! ```
//!
//! # Environments
//!
//! An [`Environment`] holds delimiters, whitespace rules, registered
//! callbacks and the named-template cache:
//!
//! ```rust
//! use akizora::Environment;
//! use serde_json::json;
//!
//! let mut env = Environment::new();
//! env.set_graceful_errors(true);
//!
//! let result = env.render("{{ name }} in {{ city }}", json!({"name": "Peter"})).unwrap();
//! assert_eq!(result, "Peter in {{ city }}");
//! assert_eq!(env.get_last_render_errors().len(), 1);
//! ```

// Public modules - part of the API
pub mod ast;
pub mod callbacks;
pub mod error;
pub mod template_loader;
pub mod value;

// Internal implementation modules
mod builtins;
mod context;
mod environment;
mod lexer;
mod parser;
mod renderer;
mod token;

pub use ast::Template;
pub use callbacks::{CallbackError, CallbackResult, CallbackTable, VARIADIC};
pub use environment::{Environment, IncludeCallback};
pub use error::{AkizoraError, Location, RenderError, Result, Span};
pub use lexer::SyntaxConfig;
pub use template_loader::{FileSystemLoader, TemplateLoader};
pub use value::Value;

/// Convenience function: parse and render in one call with a fresh default
/// environment
///
/// # Example
///
/// ```rust
/// use serde_json::json;
///
/// let result = akizora::render(
///     "{% for n in names %}{{ n }} {% endfor %}",
///     json!({"names": ["Jeff", "Seb"]}),
/// ).unwrap();
///
/// assert_eq!(result, "Jeff Seb ");
/// ```
pub fn render(source: &str, data: impl Into<Value>) -> Result<String> {
    Environment::new().render(source, data)
}

/// Parse a template with the default syntax configuration
pub fn parse(source: &str) -> Result<Template> {
    Environment::new().parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_simple() {
        let result = render("Hello {{ name }}!", json!({"name": "World"})).unwrap();
        assert_eq!(result, "Hello World!");
    }

    #[test]
    fn test_parse_then_render() {
        let template = parse("Hello {{ name }}!").unwrap();
        let mut env = Environment::new();
        assert_eq!(
            env.render_template(&template, json!({"name": "Alice"})).unwrap(),
            "Hello Alice!"
        );
        assert_eq!(
            env.render_template(&template, json!({"name": "Bob"})).unwrap(),
            "Hello Bob!"
        );
    }

    #[test]
    fn test_render_empty_template() {
        assert_eq!(render("", json!({})).unwrap(), "");
    }
}
