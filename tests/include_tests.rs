//! Include resolution: the named-template cache, the include callback, and
//! the filesystem loader.

use akizora::{AkizoraError, Environment};
use serde_json::json;
use std::fs;

fn test_data() -> serde_json::Value {
    json!({"name": "Peter", "city": "Brunswick", "is_happy": true})
}

mod named_templates {
    use super::*;

    #[test]
    fn includes_registered_template() {
        let mut env = Environment::new();
        let greeting = env.parse("Hello {{ name }}").unwrap();
        env.include_template("greeting", greeting);

        let template = env.parse("{% include \"greeting\" %}!").unwrap();
        assert_eq!(env.render_template(&template, test_data()).unwrap(), "Hello Peter!");
    }

    #[test]
    fn missing_include_fails_at_parse() {
        let mut env = Environment::new();
        let err = env.parse("{% include \"does-not-exist\" %}!").unwrap_err();
        assert_eq!(
            err.to_string(),
            "File error: failed accessing file at 'does-not-exist'"
        );
    }

    #[test]
    fn include_argument_must_be_a_string_literal() {
        let mut env = Environment::new();
        let err = env.parse("{% include does %}!").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parser error at line 1, column 12: expected string, got 'does'"
        );
    }

    #[test]
    fn include_shares_the_render_context() {
        let data = json!({"cities": [{"name": "Munich"}, {"name": "New York"}]});

        let mut env = Environment::new();
        let partial = env.parse("{{ loop.index }}:{{ city.name }};").unwrap();
        env.include_template("city.tpl", partial);

        let result = env
            .render("{% for city in cities %}{% include \"city.tpl\" %}{% endfor %}", data)
            .unwrap();
        assert_eq!(result, "0:Munich;1:New York;");
    }

    #[test]
    fn set_bindings_are_visible_in_includes() {
        let mut env = Environment::new();
        let partial = env.parse("{{ label }}").unwrap();
        env.include_template("label", partial);

        let result = env
            .render("{% set label = \"tag\" %}{% include \"label\" %}", json!({}))
            .unwrap();
        assert_eq!(result, "tag");
    }
}

mod include_callback {
    use super::*;

    #[test]
    fn callback_resolves_when_file_search_is_off() {
        let mut env = Environment::new();
        env.set_search_included_templates_in_files(false);
        env.set_include_callback(|_| akizora::parse("Hello {{ name }}"));

        let template = env.parse("{% include \"greeting\" %}!").unwrap();
        assert_eq!(env.render_template(&template, test_data()).unwrap(), "Hello Peter!");
    }

    #[test]
    fn callback_receives_the_include_name() {
        let mut env = Environment::new();
        env.set_include_callback(|name| akizora::parse(&format!("Bye {}", name)));

        let template = env.parse("{% include \"Jeff\" %}!").unwrap();
        assert_eq!(env.render_template(&template, test_data()).unwrap(), "Bye Jeff!");
    }

    #[test]
    fn without_callback_or_search_include_is_a_file_error() {
        let mut env = Environment::new();
        env.set_search_included_templates_in_files(false);
        let err = env.parse("{% include \"greeting\" %}").unwrap_err();
        assert!(matches!(err, AkizoraError::FileError { .. }));
    }
}

mod file_loading {
    use super::*;

    fn template_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("greeting.tmpl"), "Hello {{ name }}").unwrap();
        fs::write(
            dir.path().join("page.tmpl"),
            "<{% include \"greeting.tmpl\" %} from {{ city }}>",
        )
        .unwrap();
        dir
    }

    #[test]
    fn includes_load_from_the_template_root() {
        let dir = template_dir();
        let mut env = Environment::with_template_root(dir.path());

        let result = env
            .render("{% include \"greeting.tmpl\" %}!", test_data())
            .unwrap();
        assert_eq!(result, "Hello Peter!");
    }

    #[test]
    fn nested_includes_resolve_recursively() {
        let dir = template_dir();
        let mut env = Environment::with_template_root(dir.path());

        let result = env.render("{% include \"page.tmpl\" %}", test_data()).unwrap();
        assert_eq!(result, "<Hello Peter from Brunswick>");
    }

    #[test]
    fn parse_file_reads_through_the_loader() {
        let dir = template_dir();
        let mut env = Environment::with_template_root(dir.path());

        let template = env.parse_file("greeting.tmpl").unwrap();
        assert_eq!(env.render_template(&template, test_data()).unwrap(), "Hello Peter");
    }

    #[test]
    fn registered_templates_win_over_files() {
        let dir = template_dir();
        let mut env = Environment::with_template_root(dir.path());
        let override_template = env.parse("override").unwrap();
        env.include_template("greeting.tmpl", override_template);

        let result = env
            .render("{% include \"greeting.tmpl\" %}", test_data())
            .unwrap();
        assert_eq!(result, "override");
    }
}
