//! Property-based tests using proptest

use icesheet::params::file::parse_relaxed;
use icesheet::prelude::*;
use proptest::prelude::*;

const PREFIXES: [(&str, Category); 3] = [
    ("pre", Category::Preproc),
    ("proc", Category::Process),
    ("post", Category::Postproc),
];

fn resolver() -> ModuleResolver {
    let mut registry = ModuleRegistry::new();
    for (prefix, category) in PREFIXES {
        for i in 0..6 {
            let name = format!("{prefix}{i}");
            registry.register(move || Box::new(NoopModule::new(name.clone(), category)));
        }
    }
    ModuleResolver::new(registry)
}

fn names_strategy(prefix: &'static str) -> impl Strategy<Value = Vec<String>> {
    Just((0..6).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>())
        .prop_shuffle()
        .prop_flat_map(|names| {
            let len = names.len();
            (Just(names), 0..=len)
        })
        .prop_map(|(names, n)| names.into_iter().take(n).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_resolved_order_is_concatenation(
        preproc in names_strategy("pre"),
        process in names_strategy("proc"),
        postproc in names_strategy("post"),
    ) {
        let lists = ModuleLists {
            preproc: preproc.clone(),
            process: process.clone(),
            postproc: postproc.clone(),
        };
        let resolved = resolver().resolve_lists(&lists).unwrap();
        let got: Vec<String> = resolved.iter().map(|m| m.name.clone()).collect();

        let expected: Vec<String> = preproc.into_iter().chain(process).chain(postproc).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn test_comment_lines_do_not_change_document(
        entries in prop::collection::vec(("[a-z_]{1,10}", ".*"), 0..8),
        comments in prop::collection::vec((0usize..32, any::<bool>(), "[ \t]{0,4}", "[^\n\r]*"), 0..6),
    ) {
        let object: serde_json::Map<String, serde_json::Value> = entries
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        let expected = serde_json::Value::Object(object);
        let pretty = serde_json::to_string_pretty(&expected).unwrap();

        let mut lines: Vec<String> = pretty.lines().map(str::to_string).collect();
        for (position, slashes, indent, text) in comments {
            let marker = if slashes { "//" } else { "#" };
            let at = position % (lines.len() + 1);
            lines.insert(at, format!("{indent}{marker}{text}"));
        }
        let document = lines.join("\n");

        let parsed = parse_relaxed(&document, "generated.json").unwrap();
        prop_assert_eq!(parsed, expected);
    }

    #[test]
    fn test_shared_dependency_added_once(
        dependents in 1usize..6,
    ) {
        let mut registry = ModuleRegistry::new();
        registry.register(|| Box::new(NoopModule::new("shared", Category::Preproc)));
        for i in 0..dependents {
            let name = format!("user{i}");
            registry.register(move || {
                Box::new(NoopModule::new(name.clone(), Category::Process).with_dependency("shared"))
            });
        }
        let resolver = ModuleResolver::new(registry);
        let lists = ModuleLists {
            process: (0..dependents).map(|i| format!("user{i}")).collect(),
            ..ModuleLists::default()
        };

        let validator = ModuleValidator::new();
        let resolved = resolver.resolve_lists(&lists).unwrap();
        let expanded = DependencyExpander::default()
            .expand(&resolver, &validator, resolved)
            .unwrap();

        prop_assert_eq!(expanded.len(), dependents + 1);
        prop_assert_eq!(expanded.iter().filter(|m| m.name == "shared").count(), 1);
    }
}
