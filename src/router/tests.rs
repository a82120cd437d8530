use super::CompiledPattern;
use crate::error::Error;

fn params(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
    let compiled = CompiledPattern::compile(pattern).unwrap();
    compiled.captures(path).map(|p| {
        p.into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    })
}

#[test]
fn test_root_path() {
    let compiled = CompiledPattern::compile("/").unwrap();
    assert_eq!(compiled.regex().as_str(), "^/$");
    assert!(compiled.is_match("/"));
    assert!(!compiled.is_match("/a"));
    assert!(compiled.param_names().is_empty());
}

#[test]
fn test_literal_path_matches_exactly() {
    let compiled = CompiledPattern::compile("/api/v1/health").unwrap();
    assert!(compiled.is_match("/api/v1/health"));
    assert!(!compiled.is_match("/api/v1/health/"));
    assert!(!compiled.is_match("/api/v1/Health"));
    assert!(!compiled.is_match("/api/v1/healthz"));
    assert!(!compiled.is_match("/prefix/api/v1/health"));
}

#[test]
fn test_literal_text_is_escaped() {
    let compiled = CompiledPattern::compile("/files/report.v1+final").unwrap();
    assert!(compiled.is_match("/files/report.v1+final"));
    assert!(!compiled.is_match("/files/reportXv1+final"));
    assert!(!compiled.is_match("/files/report.v11final"));
}

#[test]
fn test_parameterized_path() {
    let compiled = CompiledPattern::compile("/items/:id").unwrap();
    assert_eq!(compiled.regex().as_str(), "^/items/(?P<id>[^/]+)$");
    assert_eq!(
        params("/items/:id", "/items/123"),
        Some(vec![("id".into(), "123".into())])
    );
    assert_eq!(params("/items/:id", "/items/"), None);
    assert_eq!(params("/items/:id", "/items/1/2"), None);
}

#[test]
fn test_constrained_parameter() {
    assert_eq!(
        params(r"/users/:id(\d+)", "/users/42"),
        Some(vec![("id".into(), "42".into())])
    );
    assert_eq!(params(r"/users/:id(\d+)", "/users/abc"), None);
}

#[test]
fn test_multiple_params_keep_pattern_order() {
    let compiled = CompiledPattern::compile("/a/:first/b/:second").unwrap();
    let names: Vec<&str> = compiled.param_names().iter().map(|n| n.as_ref()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(
        params("/a/:first/b/:second", "/a/1/b/2"),
        Some(vec![
            ("first".into(), "1".into()),
            ("second".into(), "2".into())
        ])
    );
}

#[test]
fn test_tokens_embedded_in_literal_text() {
    assert_eq!(
        params("/v:major.:minor", "/v2.7"),
        Some(vec![("major".into(), "2".into()), ("minor".into(), "7".into())])
    );
    assert_eq!(
        params(r"/img/:name(\w+).png", "/img/logo.png"),
        Some(vec![("name".into(), "logo".into())])
    );
}

#[test]
fn test_bare_colon_is_literal() {
    let compiled = CompiledPattern::compile("/time/12:30").unwrap();
    assert!(compiled.param_names().is_empty());
    assert!(compiled.is_match("/time/12:30"));
}

#[test]
fn test_wildcard_captures_remainder() {
    let compiled = CompiledPattern::compile("/files/*").unwrap();
    assert!(compiled.has_wildcard());
    assert!(!compiled.regex().as_str().ends_with('$'));
    assert_eq!(
        params("/files/*", "/files/a/b/c.txt"),
        Some(vec![("wildcard".into(), "a/b/c.txt".into())])
    );
}

#[test]
fn test_empty_wildcard() {
    // `/files/` matches with an empty capture; `/files` does not match.
    assert_eq!(
        params("/files/*", "/files/"),
        Some(vec![("wildcard".into(), String::new())])
    );
    assert_eq!(params("/files/*", "/files"), None);
}

#[test]
fn test_wildcard_with_params() {
    assert_eq!(
        params(r"/users/:id(\d+)/files/*", "/users/7/files/docs/cv.pdf"),
        Some(vec![
            ("id".into(), "7".into()),
            ("wildcard".into(), "docs/cv.pdf".into())
        ])
    );
}

#[test]
fn test_wildcard_must_be_last() {
    let err = CompiledPattern::compile("/files/*/meta").unwrap_err();
    assert!(matches!(err, Error::RouteCompilation { .. }));
}

#[test]
fn test_named_group_inside_constraint_is_not_a_param() {
    let compiled = CompiledPattern::compile("/x/:v(a|(?P<alt>b))").unwrap();
    assert_eq!(compiled.param_names().len(), 1);

    let params = compiled.captures("/x/b").unwrap();
    let pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|(name, value)| (name.as_ref(), value.as_str()))
        .collect();
    assert_eq!(pairs, vec![("v", "b")]);
}

#[test]
fn test_malformed_constraint_fails_at_compile_time() {
    for bad in ["/a/:id(", r"/a/:id(\d+", "/a/:id([a-)", "/a/:id(*)", "/a/:id()"] {
        match CompiledPattern::compile(bad) {
            Err(Error::RouteCompilation { pattern, .. }) => assert_eq!(pattern, bad),
            other => panic!("expected compilation error for {bad}, got {other:?}"),
        }
    }
}

#[test]
fn test_pattern_must_be_absolute() {
    assert!(matches!(
        CompiledPattern::compile("users/:id"),
        Err(Error::RouteCompilation { .. })
    ));
}

#[test]
fn test_escaped_paren_inside_constraint() {
    assert_eq!(
        params(r"/q/:expr(\(\d\))", "/q/(4)"),
        Some(vec![("expr".into(), "(4)".into())])
    );
}

#[test]
fn test_matching_is_case_sensitive() {
    let compiled = CompiledPattern::compile("/Users/:id").unwrap();
    assert!(compiled.is_match("/Users/1"));
    assert!(!compiled.is_match("/users/1"));
}
