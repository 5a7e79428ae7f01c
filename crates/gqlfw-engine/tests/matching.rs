use gqlfw_engine::hash_path;
use gqlfw_engine::scan_template;
use gqlfw_engine::Engine;
use gqlfw_engine::LoadError;
use gqlfw_engine::RequestScanner;
use gqlfw_engine::TemplateDefinition;
use gqlfw_reduce::ReduceError;
use gqlfw_reduce::Reducer;
use gqlfw_schema::Schema;
use rustc_hash::FxHashSet;

fn definition(id: &str, document: &str) -> TemplateDefinition {
    TemplateDefinition::new(id, serde_json::from_str(document).unwrap())
}

fn engine(templates: &[(&str, &str)]) -> Engine {
    Engine::new(
        templates.iter().map(|(id, document)| definition(id, document)),
        None,
    )
    .unwrap()
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Match(String),
    NoMatch,
    Error(ReduceError),
}

fn request(engine: &mut Engine, body: &str, variables: Option<&str>) -> Outcome {
    let mut outcome = None;
    let mut errored = None;
    engine.match_request(
        body,
        None,
        variables,
        |_| {},
        |template| {
            outcome = Some(template.map_or(Outcome::NoMatch, |t| Outcome::Match(t.id().into())));
        },
        |err| errored = Some(err),
    );
    match (outcome, errored) {
        (Some(outcome), None) => outcome,
        (None, Some(err)) => Outcome::Error(err),
        other => panic!("exactly one callback must run, got {other:?}"),
    }
}

fn matched(id: &str) -> Outcome {
    Outcome::Match(id.to_string())
}

const ANY_ARGUMENT: &str = r#"{"kind": "query", "selections": [
    {"field": {"name": "f", "arguments": [{"name": "a"}]}}
]}"#;

const GREATER_THAN_TEN: &str = r#"{"kind": "query", "selections": [
    {"field": {"name": "f", "arguments": [
        {"name": "a", "constraint": {"greater": {"int": 10}}}
    ]}}
]}"#;

const MAX_ONE: &str = r#"{"kind": "query", "selections": [
    {"max": {"limit": 1, "options": [{"field": {"name": "a"}}, {"field": {"name": "b"}}]}}
]}"#;

mod scenarios {
    use super::*;

    #[test]
    fn test_any_argument() {
        let mut engine = engine(&[("any", ANY_ARGUMENT)]);
        assert_eq!(request(&mut engine, "query { f(a: 42) }", None), matched("any"));
        assert_eq!(request(&mut engine, r#"{ f(a: "x") }"#, None), matched("any"));
        assert_eq!(request(&mut engine, "{ f }", None), Outcome::NoMatch);
    }

    #[test]
    fn test_constraint_rejects() {
        let mut engine = engine(&[("gt", GREATER_THAN_TEN)]);
        assert_eq!(request(&mut engine, "query { f(a: 5) }", None), Outcome::NoMatch);
        assert_eq!(request(&mut engine, "query { f(a: 11) }", None), matched("gt"));
    }

    #[test]
    fn test_max_set() {
        let mut engine = engine(&[("max", MAX_ONE)]);
        assert_eq!(request(&mut engine, "{ a }", None), matched("max"));
        assert_eq!(request(&mut engine, "{ b }", None), matched("max"));
        assert_eq!(request(&mut engine, "{ a b }", None), Outcome::NoMatch);
    }

    #[test]
    fn test_exact_path_set_wins() {
        let mut engine = engine(&[
            (
                "A",
                r#"{"kind": "query", "selections": [
                    {"field": {"name": "bazz"}}, {"field": {"name": "foo"}}
                ]}"#,
            ),
            (
                "B",
                r#"{"kind": "query", "selections": [
                    {"field": {"name": "bazz"}}, {"field": {"name": "bar"}}
                ]}"#,
            ),
            (
                "C",
                r#"{"kind": "query", "selections": [{"field": {"name": "bazz"}}]}"#,
            ),
        ]);
        assert_eq!(request(&mut engine, "{ bazz }", None), matched("C"));
        assert_eq!(request(&mut engine, "{ foo bazz }", None), matched("A"));
        assert_eq!(request(&mut engine, "{ bazz bar }", None), matched("B"));
    }

    #[test]
    fn test_fragment_recursion() {
        let mut engine = engine(&[("any", ANY_ARGUMENT)]);
        assert_eq!(
            request(
                &mut engine,
                "fragment a on Q { ...b } fragment b on Q { ...a }",
                None
            ),
            Outcome::Error(ReduceError::FragmentRecursion {
                path: vec!["a".into(), "b".into(), "a".into()]
            })
        );
    }

    #[test]
    fn test_variable_type_mismatch() {
        let mut engine = engine(&[("any", ANY_ARGUMENT)]);
        let outcome = request(
            &mut engine,
            "query ($v: Int! = 42) { f(a: $v) }",
            Some(r#"{"v": "oops"}"#),
        );
        assert!(matches!(
            outcome,
            Outcome::Error(ReduceError::UnexpectedValueType {
                provenance: gqlfw_reduce::ValueSource::Json,
                ..
            })
        ));
        assert_eq!(
            request(&mut engine, "query ($v: Int! = 42) { f(a: $v) }", None),
            matched("any")
        );
    }
}

mod laws {
    use super::*;

    #[test]
    fn test_hash_parity() {
        let document = serde_json::from_str(
            r#"{"kind": "mutation", "selections": [
                {"field": {"name": "update", "arguments": [
                    {"name": "input", "constraint": {"object": [
                        {"name": "id", "variable": "id"},
                        {"name": "patch", "constraint": {"object": [
                            {"name": "name", "variable": "name"}
                        ]}}
                    ]}},
                    {"name": "dryRun"}
                ], "selections": [
                    {"inline_fragment": {"type_condition": "Result", "selections": [
                        {"field": {"name": "ok"}}
                    ]}},
                    {"inline_fragment": {"type_condition": "Failure", "selections": [
                        {"field": {"name": "reason"}}
                    ]}}
                ]}}
            ]}"#,
        )
        .unwrap();
        let template = scan_template("t", &document, None).unwrap();

        let mut reducer = Reducer::new();
        let operation = reducer
            .reduce(
                r#"mutation ($p: Patch) {
                    update(dryRun: true, input: {patch: $p, id: 1}) {
                        ... on Failure { reason }
                        ...Fields
                    }
                }
                fragment Fields on Result { ok }"#,
                None,
                Some(r#"{"p": {"name": "x"}}"#),
            )
            .unwrap();
        let known: FxHashSet<u64> = template.variables.iter().map(|v| v.hash).collect();
        let mut scanner = RequestScanner::default();
        let paths = scanner.scan(&operation, &known);

        let mut leaves: Vec<u64> = template.leaves.iter().map(|l| l.hash).collect();
        leaves.sort_unstable();
        assert_eq!(paths.leaves, leaves.as_slice());

        let mut arguments: Vec<u64> = template.arguments.iter().map(|a| a.hash).collect();
        let mut observed: Vec<u64> = paths.arguments.iter().map(|a| a.0).collect();
        arguments.sort_unstable();
        observed.sort_unstable();
        assert_eq!(observed, arguments);

        let mut variables: Vec<u64> = paths.variables.iter().map(|v| v.0).collect();
        variables.sort_unstable();
        let mut expected = vec![
            hash_path("M.update|dryRun,input,/input/id"),
            hash_path("M.update|dryRun,input,/input/patch/name"),
        ];
        expected.sort_unstable();
        assert_eq!(variables, expected);
    }

    #[test]
    fn test_idempotence() {
        let mut engine = engine(&[("gt", GREATER_THAN_TEN), ("max", MAX_ONE)]);
        let requests = [
            "{ f(a: 11) }",
            "{ a b }",
            "{ f(a: 1) }",
            "{ b }",
            "{ f(a: ",
        ];
        let first: Vec<Outcome> = requests
            .iter()
            .map(|body| request(&mut engine, body, None))
            .collect();
        let again: Vec<Outcome> = requests
            .iter()
            .rev()
            .map(|body| request(&mut engine, body, None))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        assert_eq!(first, again);
        assert_eq!(first[0], matched("gt"));
        assert_eq!(first[3], matched("max"));
    }

    #[test]
    fn test_combinator_law() {
        let mut engine = engine(&[(
            "max2",
            r#"{"kind": "query", "selections": [
                {"max": {"limit": 2, "options": [
                    {"field": {"name": "a"}}, {"field": {"name": "b"}}, {"field": {"name": "c"}}
                ]}}
            ]}"#,
        )]);
        for body in ["{ a }", "{ b c }", "{ a c }", "{ c a }"] {
            assert_eq!(request(&mut engine, body, None), matched("max2"), "{body}");
        }
        assert_eq!(request(&mut engine, "{ a b c }", None), Outcome::NoMatch);
    }

    #[test]
    fn test_match_all_reports_every_template() {
        let mut engine = engine(&[("any", ANY_ARGUMENT), ("gt", GREATER_THAN_TEN)]);
        let mut all = Vec::new();
        let count = engine.match_all(
            "{ f(a: 20) }",
            None,
            None,
            |_| {},
            |template| all.push(template.id().to_string()),
            |err| panic!("{err}"),
        );
        assert_eq!(count, 2);
        assert_eq!(all, vec!["any", "gt"]);
        assert_eq!(request(&mut engine, "{ f(a: 20) }", None), matched("any"));
    }
}

mod constraints {
    use super::*;

    #[test]
    fn test_template_variables() {
        let mut engine = engine(&[(
            "page",
            r#"{"kind": "query", "selections": [
                {"field": {"name": "users", "arguments": [
                    {"name": "first", "variable": "first", "constraint": {"less_or_equal": {"int": 100}}},
                    {"name": "skip", "constraint": {"less": {"mul": [{"variable": "first"}, {"int": 10}]}}}
                ], "selections": [{"field": {"name": "id"}}]}}
            ]}"#,
        )]);
        assert_eq!(
            request(&mut engine, "{ users(first: 10, skip: 99) { id } }", None),
            matched("page")
        );
        assert_eq!(
            request(&mut engine, "{ users(skip: 100, first: 10) { id } }", None),
            Outcome::NoMatch
        );
        assert_eq!(
            request(
                &mut engine,
                "query ($n: Int) { users(first: $n, skip: 0) { id } }",
                Some(r#"{"n": 200}"#)
            ),
            Outcome::NoMatch
        );
    }

    #[test]
    fn test_every_occurrence_is_checked() {
        let mut engine = engine(&[(
            "gt",
            r#"{"kind": "query", "selections": [
                {"field": {"name": "f", "arguments": [
                    {"name": "a", "constraint": {"greater": {"int": 10}}}
                ], "selections": [{"field": {"name": "x"}}]}}
            ]}"#,
        )]);
        assert_eq!(
            request(&mut engine, "{ one: f(a: 11) { x } two: f(a: 12) { x } }", None),
            matched("gt")
        );
        assert_eq!(
            request(&mut engine, "{ one: f(a: 11) { x } two: f(a: 1) { x } }", None),
            Outcome::NoMatch
        );
    }

    #[test]
    fn test_enum_from_variables() {
        let mut engine = engine(&[(
            "role",
            r#"{"kind": "query", "selections": [
                {"field": {"name": "users", "arguments": [
                    {"name": "role", "constraint": {"equals": {"enum": "ADMIN"}}}
                ], "selections": [{"field": {"name": "id"}}]}}
            ]}"#,
        )]);
        assert_eq!(
            request(&mut engine, "{ users(role: ADMIN) { id } }", None),
            matched("role")
        );
        assert_eq!(
            request(
                &mut engine,
                "query ($r: Role) { users(role: $r) { id } }",
                Some(r#"{"r": "ADMIN"}"#)
            ),
            matched("role")
        );
        assert_eq!(
            request(&mut engine, r#"{ users(role: "ADMIN") { id } }"#, None),
            Outcome::NoMatch
        );
    }
}

mod schema {
    use super::*;

    fn schema() -> Schema {
        serde_json::from_str(
            r#"{"types": {
                "Query": {"kind": "object", "fields": [
                    {"name": "users", "arguments": [
                        {"name": "filter", "type": {"named": "UserFilter"}},
                        {"name": "ids", "type": {"list": {"non_null": {"named": "ID"}}}}
                    ], "type": {"list": {"named": "User"}}}
                ]},
                "User": {"kind": "object", "fields": [
                    {"name": "id", "type": {"non_null": {"named": "ID"}}}
                ]},
                "Role": {"kind": "enum", "values": ["ADMIN", "USER"]},
                "UserFilter": {"kind": "input_object", "fields": [
                    {"name": "role", "type": {"non_null": {"named": "Role"}}},
                    {"name": "active", "type": {"named": "Boolean"}}
                ]}
            }}"#,
        )
        .unwrap()
    }

    const USERS: &str = r#"{"kind": "query", "selections": [
        {"field": {"name": "users", "arguments": [
            {"name": "filter", "constraint": {"not_equals": "null"}}
        ], "selections": [{"field": {"name": "id"}}]}}
    ]}"#;

    #[test]
    fn test_typed_arguments() {
        let mut engine = Engine::new([definition("users", USERS)], Some(schema())).unwrap();
        assert!(engine.schema().is_some());
        assert_eq!(
            request(&mut engine, "{ users(filter: {role: ADMIN}) { id } }", None),
            matched("users")
        );
        assert_eq!(
            request(&mut engine, "{ users(filter: {active: true}) { id } }", None),
            Outcome::NoMatch
        );
        assert_eq!(
            request(&mut engine, "{ users(filter: {role: ROOT}) { id } }", None),
            Outcome::NoMatch
        );
        assert_eq!(
            request(
                &mut engine,
                "query ($f: UserFilter) { users(filter: $f) { id } }",
                Some(r#"{"f": {"role": "USER", "active": false}}"#)
            ),
            matched("users")
        );
    }

    #[test]
    fn test_template_must_fit_schema() {
        let unknown_field = r#"{"kind": "query", "selections": [
            {"field": {"name": "posts", "selections": [{"field": {"name": "id"}}]}}
        ]}"#;
        assert!(matches!(
            Engine::new([definition("posts", unknown_field)], Some(schema())),
            Err(LoadError::SchemaMismatch { .. })
        ));

        let unknown_input_field = r#"{"kind": "query", "selections": [
            {"field": {"name": "users", "arguments": [
                {"name": "filter", "constraint": {"object": [{"name": "age"}]}}
            ], "selections": [{"field": {"name": "id"}}]}}
        ]}"#;
        assert!(matches!(
            Engine::new([definition("age", unknown_input_field)], Some(schema())),
            Err(LoadError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_schema() {
        let mut schema = schema();
        schema.query_type = "Missing".into();
        assert!(matches!(
            Engine::new([definition("users", USERS)], Some(schema)),
            Err(LoadError::InvalidSchema(_))
        ));
    }
}

mod loading {
    use super::*;

    #[test]
    fn test_undefined_variable() {
        let document = r#"{"kind": "query", "selections": [
            {"field": {"name": "f", "arguments": [
                {"name": "a", "constraint": {"less": {"variable": "missing"}}}
            ]}}
        ]}"#;
        assert_eq!(
            Engine::new([definition("t", document)], None).unwrap_err(),
            LoadError::UndefinedVariable {
                template: "t".into(),
                name: "missing".into()
            }
        );
    }

    #[test]
    fn test_variables_are_scoped_per_template() {
        let declares = r#"{"kind": "query", "selections": [
            {"field": {"name": "f", "arguments": [{"name": "a", "variable": "x"}]}}
        ]}"#;
        let uses = r#"{"kind": "query", "selections": [
            {"field": {"name": "g", "arguments": [
                {"name": "b", "constraint": {"less": {"variable": "x"}}}
            ]}}
        ]}"#;
        assert!(matches!(
            Engine::new([definition("a", declares), definition("b", uses)], None),
            Err(LoadError::UndefinedVariable { .. })
        ));
    }
}
