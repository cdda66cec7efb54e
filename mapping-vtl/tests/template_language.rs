use std::fmt;

use mapping_vtl::{parse, Context, EvalError, EvalOptions, Map, Object, Value};
use rstest::rstest;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Greeter;

#[derive(Debug)]
struct Refused;

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("refused")
    }
}

impl std::error::Error for Refused {}

impl Object for Greeter {
    fn property(&self, name: &str) -> Option<Value> {
        (name == "name").then(|| Value::from("greeter"))
    }

    fn call(&self, method: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        match method {
            "hello" => {
                EvalError::check_arity("greeter.hello", 1, args.len())?;
                Ok(Some(Value::from(format!("hello {}", args[0]))))
            }
            "fail" => Err(EvalError::method("greeter.fail", Refused)),
            _ => Ok(None),
        }
    }
}

fn context() -> Context {
    Context::new()
        .with("greeter", Value::object(Greeter))
        .with(
            "data",
            Value::from(json!({"name": "Ada", "tags": ["a", "b", "c"], "n": 3, "empty": ""})),
        )
}

fn render(src: &str) -> String {
    render_with(src, &EvalOptions::default())
}

fn render_with(src: &str, opts: &EvalOptions) -> String {
    parse(src)
        .unwrap_or_else(|e| panic!("parse failed for {src:?}: {e}"))
        .render(&context(), opts)
        .unwrap_or_else(|e| panic!("render failed for {src:?}: {e}"))
}

fn strict() -> EvalOptions {
    EvalOptions { silent: false, ..EvalOptions::default() }
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

#[rstest]
#[case("$data.name", "Ada")]
#[case("${data.name}x", "Adax")]
#[case("$data.tags[1]", "b")]
#[case("$data['name']", "Ada")]
#[case("$data.tags.size()", "3")]
#[case("$data.tags", "[a, b, c]")]
#[case("$data.name.toUpperCase()", "ADA")]
#[case("$greeter.name", "greeter")]
#[case("$greeter.hello('you')", "hello you")]
#[case("$greeter.hello($data.n)", "hello 3")]
#[case("email: $data.name.", "email: Ada.")]
fn reference_chains(#[case] src: &str, #[case] expected: &str) {
    assert_eq!(render(src), expected);
}

#[rstest]
#[case("$missing")]
#[case("$data.nope")]
#[case("$data.tags[9]")]
#[case("$greeter.unknown()")]
#[case("$data.name.nope()")]
fn unresolved_references_are_empty_in_silent_mode(#[case] src: &str) {
    assert_eq!(render(src), "");
}

#[test]
fn unresolved_references_echo_source_when_not_silent() {
    assert_eq!(render_with("[$missing.value]", &strict()), "[$missing.value]");
    assert_eq!(render_with("[$!missing]", &strict()), "[]");
}

#[test]
fn host_method_errors_abort_even_in_silent_mode() {
    let err = parse("before $greeter.fail()")
        .unwrap()
        .render(&context(), &EvalOptions::default())
        .unwrap_err();
    match err {
        EvalError::Method { method, source } => {
            assert_eq!(method, "greeter.fail");
            assert_eq!(source.to_string(), "refused");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
#[case("#if(false && $greeter.fail())x#else-#end", "-")]
#[case("#if($missing and $greeter.fail())x#else-#end", "-")]
#[case("#if(true || $greeter.fail())y#end", "y")]
#[case("#if($data.name or $greeter.fail())y#end", "y")]
#[case("#if(true && $data.name)z#end", "z")]
#[case("#if(false || $data.empty)z#else-#end", "-")]
fn logical_operators_skip_the_right_operand_when_decided(#[case] src: &str, #[case] expected: &str) {
    assert_eq!(render(src), expected);
}

#[test]
fn host_method_arity_is_reported() {
    let err = parse("$greeter.hello('a', 'b')")
        .unwrap()
        .render(&context(), &EvalOptions::default())
        .unwrap_err();
    assert!(matches!(err, EvalError::Arity { expected: 1, found: 2, .. }));
}

#[test]
fn escaped_reference_renders_literally() {
    assert_eq!(render(r"\$data.name is $data.name"), "$data.name is Ada");
}

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

#[rstest]
#[case("#if($data.n > 2)big#{else}small#end", "big")]
#[case("#if($data.n == '3')eq#end", "eq")]
#[case("#if($data.empty)x#elseif($data.name == 'Ada')ada#{else}y#end", "ada")]
#[case("#if(!$missing && $data.tags.contains('b'))ok#end", "ok")]
#[case("#if($data.n % 2 == 1 and $data.n >= 3)odd#end", "odd")]
fn conditionals(#[case] src: &str, #[case] expected: &str) {
    assert_eq!(render(src), expected);
}

#[test]
fn foreach_exposes_loop_state() {
    let out = render("#foreach($t in $data.tags)$t#if($foreach.hasNext),#end#end");
    assert_eq!(out, "a,b,c");
}

#[test]
fn foreach_else_runs_for_empty_input() {
    assert_eq!(render("#foreach($t in [])x#{else}none#end"), "none");
    assert_eq!(render("#foreach($t in $missing)x#{else}none#end"), "none");
}

#[test]
fn foreach_over_map_iterates_values() {
    assert_eq!(render("#foreach($v in {'a': 1, 'b': 2})$v#end"), "12");
}

#[test]
fn break_and_stop() {
    assert_eq!(render("#foreach($i in [1..5])#if($i == 3)#break#end$i#end!"), "12!");
    assert_eq!(render("a#stop b"), "a");
    assert_eq!(render("#foreach($i in [1..5])$i#if($i == 2)#stop#end#end after"), "12");
}

#[test]
fn foreach_limit_is_enforced() {
    let opts = EvalOptions { max_foreach_iterations: 2, ..EvalOptions::default() };
    let err = parse("#foreach($t in $data.tags)$t#end")
        .unwrap()
        .render(&context(), &opts)
        .unwrap_err();
    assert!(matches!(err, EvalError::LoopLimit { limit: 2 }));
}

#[test]
fn set_with_unresolved_value_stores_null() {
    assert_eq!(render_with("#set($x = $missing)[$x]", &strict()), "[$x]");
    assert_eq!(render("#set($x = 'v')#set($x = $missing)[$x]"), "[]");
}

#[test]
fn double_quoted_strings_interpolate_single_quoted_do_not() {
    assert_eq!(render(r#"#set($a = "hi $data.name")#set($b = 'hi $data.name')$a|$b"#), "hi Ada|hi $data.name");
}

#[test]
fn directive_lines_do_not_leave_blank_lines() {
    let src = "{\n  #set($n = $data.name)\n  #if($n)\n  \"name\": \"$n\"\n  #end\n}";
    assert_eq!(render(src), "{\n  \"name\": \"Ada\"\n}");
}

#[test]
fn comments_and_raw_blocks() {
    assert_eq!(render("a## line comment\nb#* block\ncomment *#c#[[$raw]]#"), "abc$raw");
}

#[test]
fn map_mutators_through_nested_place() {
    let out = render("#set($m = {'inner': {}})$!m.inner.put('k', 'v')$m");
    assert_eq!(out, "{inner={k=v}}");
}

#[test]
fn arithmetic_and_concatenation() {
    assert_eq!(render("#set($x = $data.n * 2 + 1)$x"), "7");
    assert_eq!(render("#set($x = 'n=' + $data.n)$x"), "n=3");
    assert_eq!(render("#set($x = 7 / 2)$x"), "3.5");
}

#[test]
fn maps_built_in_templates_keep_insertion_order() {
    let mut expected = Map::new();
    expected.insert("z".into(), Value::Int(1));
    expected.insert("a".into(), Value::Int(2));
    assert_eq!(render("#set($m = {'z': 1, 'a': 2})$m"), Value::Map(expected).to_string());
}

#[test]
fn templates_are_reusable() {
    let template = parse("#set($n = $n + 1)$n").unwrap();
    let ctx = Context::new().with("n", 1i64);
    let opts = EvalOptions::default();
    assert_eq!(template.render(&ctx, &opts).unwrap(), "2");
    assert_eq!(template.render(&ctx, &opts).unwrap(), "2");
}
