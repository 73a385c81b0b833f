//! Integration tests for `component` / `slot`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use template_mixins::{Bindings, EngineConfig, Environment, TemplateError, Value};

fn vars(pairs: &[(&str, &str)]) -> Bindings {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

fn env() -> Environment {
    let mut env = Environment::new();
    env.add_template(
        "card.html",
        r#"<div class="card"><h1>{% slot title %}Untitled{% endslot %}</h1>{% slot body %}{% endslot %}</div>"#,
    );
    env.add_template("greet.html", "Hi {{ who }}!");
    env.add_template(
        "scope.html",
        "[{{ who }}|{{ secret }}]{% slot s %}({{ secret }}|{{ who }}){% endslot %}",
    );
    env.add_template("outer.html", "<outer>{% slot content %}{% endslot %}|{% slot label %}outer-default{% endslot %}</outer>");
    env.add_template("inner.html", "<inner>{% slot label %}default{% endslot %}</inner>");
    env.add_template("plain.html", "<x/>");
    env.add_template("base_card.html", "<h1>{% slot title %}Base{% endslot %}</h1>");
    env.add_template(
        "wrapper.html",
        r#"{% component "base_card.html" %}{% slot title %}Wrapped {{ slot.super }}{% endslot %}{% endcomponent %}"#,
    );
    env.add_template("child.html", r#"{% extends "card.html" %}"#);
    env.add_template("loop.html", r#"{% component "loop.html" %}{% endcomponent %}"#);
    env
}

fn render(source: &str, bindings: Bindings) -> String {
    env().render_str(source, bindings).expect("Should render")
}

fn render_err(source: &str) -> TemplateError {
    env()
        .render_str(source, Bindings::new())
        .expect_err("Should fail")
}

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn test_slot_override() {
    let out = render(
        r#"{% component "card.html" %}{% slot title %}Hello{% endslot %}{% endcomponent %}"#,
        Bindings::new(),
    );
    assert_eq!(out, r#"<div class="card"><h1>Hello</h1></div>"#);
}

#[test]
fn test_placeholders_fall_back_to_defaults() {
    let out = render(r#"{% component "card.html" %}{% endcomponent %}"#, Bindings::new());
    assert_eq!(out, r#"<div class="card"><h1>Untitled</h1></div>"#);
}

#[test]
fn test_whitespace_and_comments_allowed_in_body() {
    let source = "{% component \"card.html\" %}\n  {# note #}\n  {% slot body %}B{% endslot body %}\n{% endcomponent %}";
    let out = render(source, Bindings::new());
    assert_eq!(out, r#"<div class="card"><h1>Untitled</h1>B</div>"#);
}

#[test]
fn test_loose_content_in_body_is_compile_error() {
    let env = env();
    for source in [
        r#"{% component "card.html" %}loose{% slot title %}x{% endslot %}{% endcomponent %}"#,
        r#"{% component "card.html" %}{{ x }}{% endcomponent %}"#,
        r#"{% component "card.html" %}{% component "card.html" %}{% endcomponent %}{% endcomponent %}"#,
    ] {
        let err = env.template_from_str(source).unwrap_err();
        assert!(
            err.to_string().contains("'component' only allows slots"),
            "{}: {}",
            source,
            err
        );
    }
}

#[test]
fn test_with_bindings_from_calling_context() {
    let out = render(
        r#"{% component "greet.html" with who=name %}{% endcomponent %}"#,
        vars(&[("name", "Ada")]),
    );
    assert_eq!(out, "Hi Ada!");
}

#[test]
fn test_with_bindings_are_popped_after_render() {
    let out = render(
        r#"{% component "greet.html" with who="x" %}{% endcomponent %}[{{ who }}]"#,
        Bindings::new(),
    );
    assert_eq!(out, "Hi x![]");
}

#[test]
fn test_calling_scope_visible_without_only() {
    let source = r#"{% component "scope.html" with who="w" %}{% slot s %}<{{ secret }}|{{ who }}>{% endslot %}{% endcomponent %}"#;
    let out = render(source, vars(&[("secret", "S")]));
    assert_eq!(out, "[w|S]<S|w>");
}

#[test]
fn test_only_isolates_target_and_slots() {
    let source = r#"{% component "scope.html" with who="w" only %}{% slot s %}<{{ secret }}|{{ who }}>{% endslot %}{% endcomponent %}"#;
    let out = render(source, vars(&[("secret", "S")]));
    assert_eq!(out, "[w|]<|w>");
}

#[test]
fn test_nested_component_resolves_against_inner_target() {
    let source = concat!(
        r#"{% component "outer.html" %}"#,
        r#"{% slot content %}{% component "inner.html" %}{% slot label %}L{% endslot %}{% endcomponent %}{% endslot %}"#,
        r#"{% slot label %}OUTER{% endslot %}"#,
        r#"{% endcomponent %}"#,
    );
    let out = render(source, Bindings::new());
    assert_eq!(out, "<outer><inner>L</inner>|OUTER</outer>");
}

#[test]
fn test_nested_component_sibling_order_does_not_matter() {
    let source = concat!(
        r#"{% component "outer.html" %}"#,
        r#"{% slot label %}OUTER{% endslot %}"#,
        r#"{% slot content %}{% component "inner.html" %}{% slot label %}L{% endslot %}{% endcomponent %}{% endslot %}"#,
        r#"{% endcomponent %}"#,
    );
    let out = render(source, Bindings::new());
    assert_eq!(out, "<outer><inner>L</inner>|OUTER</outer>");
}

#[test]
fn test_sibling_components_are_independent() {
    let source = concat!(
        r#"{% component "inner.html" %}{% slot label %}A{% endslot %}{% endcomponent %}"#,
        r#"{% component "inner.html" %}{% endcomponent %}"#,
    );
    assert_eq!(render(source, Bindings::new()), "<inner>A</inner><inner>default</inner>");
}

#[test]
fn test_unconsumed_overrides_are_released() {
    let source = concat!(
        r#"{% component "plain.html" %}{% slot label %}LEAK{% endslot %}{% endcomponent %}"#,
        r#"{% component "inner.html" %}{% endcomponent %}"#,
    );
    assert_eq!(render(source, Bindings::new()), "<x/><inner>default</inner>");
}

#[test]
fn test_super_renders_forwarded_override() {
    let out = render(
        r#"{% component "wrapper.html" %}{% slot title %}Page{% endslot %}{% endcomponent %}"#,
        Bindings::new(),
    );
    assert_eq!(out, "<h1>Wrapped Page</h1>");
}

#[test]
fn test_super_without_pending_override_is_empty() {
    let out = render(r#"{% component "wrapper.html" %}{% endcomponent %}"#, Bindings::new());
    assert_eq!(out, "<h1>Wrapped </h1>");
}

#[test]
fn test_super_output_is_not_escaped_twice() {
    let out = render(
        r#"{% component "wrapper.html" %}{% slot title %}{{ amp }}{% endslot %}{% endcomponent %}"#,
        vars(&[("amp", "&")]),
    );
    assert_eq!(out, "<h1>Wrapped &amp;</h1>");
}

#[test]
fn test_super_outside_component_is_attribute_error() {
    let err = render_err("{% slot title %}{{ slot.super }}{% endslot %}");
    assert!(matches!(err, TemplateError::Attribute { .. }), "{}", err);
}

#[test]
fn test_slot_outside_component_renders_default() {
    let out = render("{% slot title %}<{{ slot.name }}>{% endslot %}", Bindings::new());
    assert_eq!(out, "<title>");
}

#[test]
fn test_slot_variable_does_not_leak() {
    let out = render(
        r#"{% component "card.html" %}{% slot title %}{{ slot.name }}{% endslot %}{% endcomponent %}[{{ slot }}]"#,
        Bindings::new(),
    );
    assert_eq!(out, r#"<div class="card"><h1>title</h1></div>[]"#);
}

#[test]
fn test_target_from_variable() {
    let out = render(
        r#"{% component tpl with who="v" %}{% endcomponent %}"#,
        vars(&[("tpl", "greet.html")]),
    );
    assert_eq!(out, "Hi v!");
}

#[test]
fn test_target_from_template_value() {
    let env = env();
    let greet = env.get_template("greet.html").expect("Should load");

    let mut bindings = Bindings::new();
    bindings.insert("tpl".to_string(), Value::from(Arc::clone(&greet)));
    let out = env
        .render_str(r#"{% component tpl with who="t" %}{% endcomponent %}"#, bindings)
        .unwrap();
    assert_eq!(out, "Hi t!");

    let mut wrapped = Bindings::new();
    wrapped.insert("template".to_string(), Value::from(greet));
    let mut bindings = Bindings::new();
    bindings.insert("backend".to_string(), Value::from(wrapped));
    let out = env
        .render_str(r#"{% component backend with who="w" %}{% endcomponent %}"#, bindings)
        .unwrap();
    assert_eq!(out, "Hi w!");
}

#[test]
fn test_falsy_variable_target() {
    let err = render_err("{% component missing %}{% endcomponent %}");
    insta::assert_snapshot!(
        err.to_string(),
        @"syntax error: Invalid template name in 'component' tag: None. Got this from the 'missing' variable."
    );
}

#[test]
fn test_empty_literal_target() {
    let err = render_err(r#"{% component "" %}{% endcomponent %}"#);
    insta::assert_snapshot!(
        err.to_string(),
        @"syntax error: Invalid template name in 'component' tag: ''."
    );
}

#[test]
fn test_unknown_target() {
    let err = render_err(r#"{% component "nope.html" %}{% endcomponent %}"#);
    assert!(matches!(err, TemplateError::NotFound { ref name } if name == "nope.html"));
}

#[test]
fn test_target_must_not_extend() {
    let err = render_err(r#"{% component "child.html" %}{% endcomponent %}"#);
    assert!(err.is_syntax());
    assert!(err.to_string().contains("must not extend another template"));
}

#[test]
fn test_errors_inside_target_point_at_calling_tag() {
    let mut env = env();
    let padding = "<p>some long preamble that pushes the failing tag far past the caller</p>";
    env.add_template(
        "bad_render.html",
        format!("{}{{% component missing %}}{{% endcomponent %}}", padding),
    );
    env.add_template("bad_compile.html", format!("{}{{% slot a b %}}{{% endslot %}}", padding));

    let cases = [
        ("bad_render.html", "while rendering 'bad_render.html': Invalid template name"),
        ("bad_compile.html", "while rendering 'bad_compile.html': 'slot' tag takes only one argument"),
    ];
    for (target, expected) in cases {
        let source = format!(r#"{{% component "{}" %}}{{% endcomponent %}}"#, target);
        let err = env.render_str(&source, Bindings::new()).unwrap_err();
        assert!(err.to_string().contains(expected), "{}", err);

        let span = err.span().cloned().expect("Should carry the caller's span");
        assert!(span.end <= source.len());
        assert!(source[span].contains(target));
        assert!(err.format(&source, "page.html").contains(target));
    }
}

#[test]
fn test_compile_errors() {
    let env = env();
    let cases = [
        ("{% component %}{% endcomponent %}", "takes at least one argument"),
        (r#"{% component "card.html" loudly %}{% endcomponent %}"#, "unknown argument for 'component' tag"),
        (r#"{% component "card.html" with %}{% endcomponent %}"#, "needs at least one keyword argument"),
        (r#"{% component "card.html" only only %}{% endcomponent %}"#, "specified more than once"),
        (r#"{% component "card.html" %}"#, "unclosed tag 'component'"),
        (
            r#"{% component "card.html" %}{% slot a %}{% endslot %}{% slot a %}{% endslot %}{% endcomponent %}"#,
            "'slot' tag with name 'a' appears more than once",
        ),
        (r#"{% component "card.html" %}{% slot a %}x{% endslot b %}{% endcomponent %}"#, "invalid block tag 'endslot b'"),
        ("{% slot a b %}{% endslot %}", "'slot' tag takes only one argument"),
    ];
    for (source, expected) in cases {
        let err = env.template_from_str(source).unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "{:?}: expected error containing {:?}, got {}",
            source,
            expected,
            err
        );
    }
}

#[test]
fn test_self_inclusion_hits_recursion_limit() {
    let err = env()
        .render("loop.html", Bindings::new())
        .expect_err("Should fail");
    assert!(
        matches!(err, TemplateError::RecursionLimit { limit: 64, .. }),
        "{}",
        err
    );
}

#[test]
fn test_component_inside_mixin() {
    let source = concat!(
        r#"{% mixin hi %}{% component "greet.html" with who=n %}{% endcomponent %}{% endmixin %}"#,
        r#"{% mix hi with n="a" %} {% mix hi with n="b" %}"#,
    );
    assert_eq!(render(source, Bindings::new()), "Hi a! Hi b!");
}

#[test]
fn test_relative_paths_from_directory() {
    let env = Environment::with_config(EngineConfig::default().with_template_dir(fixtures()));
    let out = env
        .render("pages/home.html", vars(&[("title", "Welcome")]))
        .expect("Should render");

    let lines: Vec<&str> = out.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(
        lines,
        vec![
            "<section><h1>Welcome</h1>Sign up</section>",
            "<footer>(c) example</footer>",
        ]
    );
}

#[test]
fn test_relative_path_outside_root() {
    let env = Environment::with_config(EngineConfig::default().with_template_dir(fixtures()));
    let err = env.get_template("pages/escape.html").unwrap_err();
    assert!(err.to_string().contains("points outside the file hierarchy"));
}

#[test]
fn test_target_names_cannot_leave_template_dirs() {
    let root = tempfile::tempdir().expect("Should create temp dir");
    let templates = root.path().join("tpl");
    std::fs::create_dir(&templates).unwrap();
    std::fs::write(templates.join("ok.html"), "ok").unwrap();
    let secret = root.path().join("secret.txt");
    std::fs::write(&secret, "top secret").unwrap();

    let env = Environment::with_config(EngineConfig::default().with_template_dir(&templates));
    assert_eq!(
        env.render_str(r#"{% component "sub/../ok.html" %}{% endcomponent %}"#, Bindings::new())
            .expect("Should render"),
        "ok"
    );

    let escaping = [
        r#"{% component "../secret.txt" %}{% endcomponent %}"#.to_string(),
        format!(r#"{{% component "{}" %}}{{% endcomponent %}}"#, secret.display()),
    ];
    for source in &escaping {
        let err = env.render_str(source, Bindings::new()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }), "{}: {}", source, err);
    }

    let err = env
        .render_str(
            "{% component target %}{% endcomponent %}",
            vars(&[("target", "../secret.txt")]),
        )
        .unwrap_err();
    assert!(matches!(err, TemplateError::NotFound { .. }));
}

#[test]
fn test_config_file_template_dirs() {
    let config = EngineConfig::from_file(&fixtures().join("engine.toml")).expect("Should load");
    assert_eq!(config.recursion_limit, 16);

    let env = Environment::with_config(config);
    let out = env
        .render("shared/footer.html", Bindings::new())
        .expect("Should render");
    assert_eq!(out, "<footer>(c) example</footer>\n");
}

#[test]
fn test_parallel_renders_share_compiled_template() {
    let env = env();
    let template = env
        .template_from_str(r#"{% component "inner.html" %}{% slot label %}{{ n }}{% endslot %}{% endcomponent %}"#)
        .map(Arc::new)
        .expect("Should compile");

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let template = Arc::clone(&template);
                let env = &env;
                scope.spawn(move || {
                    let mut bindings = Bindings::new();
                    bindings.insert("n".to_string(), Value::from(i as i64));
                    template.render(env, bindings)
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let out = handle.join().expect("Thread should not panic").expect("Should render");
            assert_eq!(out, format!("<inner>{}</inner>", i));
        }
    });
}
