use std::collections::BTreeMap;
use std::fs;

use zenv::Error;
use zenv::compile::{CompileOptions, compile_env, compile_str};
use zenv::parse::{Tokenizer, render};
use zenv::source::{DirectoryProvider, LoadOptions, MemoryProvider};

fn compile(source: &str) -> zenv::Result<BTreeMap<String, String>> {
    compile_str(source, &MemoryProvider::new(), &CompileOptions::default())
}

fn value_of(source: &str, variable: &str) -> Option<String> {
    compile(source)
        .unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
        .remove(variable)
}

macro_rules! value_test {
    ($name:ident, $source:expr, $variable:expr, $expected:expr) => {
        #[test]
        fn $name() {
            assert_eq!(
                value_of($source, $variable).as_deref(),
                Some($expected),
                "source: {:?}",
                $source,
            );
        }
    };
}

// ── Literal values ──

value_test!(quoted_value, r#"REGULAR="Hello, world!""#, "REGULAR", "Hello, world!");
value_test!(unquoted_value_trimmed, "PLAIN=   some text   ", "PLAIN", "some text");
value_test!(quoted_value_verbatim, "Q=\"  l1\nl2  \"", "Q", "  l1\nl2  ");
value_test!(empty_value, "E=\n", "E", "");
value_test!(escaped_dollar, r"A=\$HOME", "A", "$HOME");
value_test!(hash_inside_value, "A=a#b", "A", "a#b");
value_test!(comment_lines_ignored, "# heading\nA=1\n# trailer", "A", "1");
value_test!(crlf_lines, "A=1\r\nB=${A}2\r\n", "B", "12");

// ── Interpolation ──

value_test!(braced_reference, "A=x\nB=<${A}>", "B", "<x>");
value_test!(shorthand_reference, "A=x\nB=$A.y", "B", "x.y");
value_test!(forward_reference, "B=${A}!\nA=later", "B", "later!");
value_test!(reference_in_quotes, "A=x\nB=\"[$A]\"", "B", "[x]");
value_test!(unset_reference_is_empty, "B=${NOPE}", "B", "");
value_test!(length, "N=hello\nL=${#N}", "L", "5");
value_test!(length_of_unset, "L=${#NOPE}", "L", "0");

// ── Conditional operators ──

value_test!(or1_unset_default, "OR1=${UNSET:-default}", "OR1", "default");
value_test!(or2b_set_value, "OR2=value\nOR2B=${OR2:-default}", "OR2B", "value");
value_test!(or_alias_on_empty, "E=\nA=${E||fallback}", "A", "fallback");
value_test!(dash_keeps_empty, "E=\nA=${E-default}", "A", "");
value_test!(dash_alias_on_unset, "A=${U??d}", "A", "d");
value_test!(alternate_when_set, "S=x\nA=${S:+yes}", "A", "yes");
value_test!(alternate_when_unset, "A=${U:+yes}", "A", "");
value_test!(alternate_alias, "S=x\nA=${S&&yes}", "A", "yes");
value_test!(plus_on_empty, "E=\nA=${E+set}", "A", "set");
value_test!(ternary_true, "S=x\nA=${S?on:off}", "A", "on");
value_test!(ternary_false, "A=${U?on:off}", "A", "off");
value_test!(nested_defaults, "A=${U:-${V:-deep}}", "A", "deep");
value_test!(repeated_operator_is_text, "A=${U:-a:-b}", "A", "a:-b");
value_test!(repeated_operator_when_set, "U=u\nA=${U:-a:-b}", "A", "u");
value_test!(
    default_with_operator_text,
    "U=${URL:-http://localhost:80/x}",
    "U",
    "http://localhost:80/x"
);

// ── Slicing ──

value_test!(slice_offset, "Y=Hello, world!\nA=${Y:7}", "A", "world!");
value_test!(slice_offset_length, "Y=Hello, world!\nA=${Y:0:5}", "A", "Hello");
value_test!(slice_negative_offset, "Y=Hello\nA=${Y: -3}", "A", "llo");
value_test!(slice_offset_past_i64, "Y=Hello\nA=${Y:99999999999999999999}", "A", "");
value_test!(slice_non_numeric_length, "Y=Hello\nB=${Y:1:abc}", "B", "");

// ── Trimming and replacement ──

value_test!(prefix, "BASE=Hello, world!\nPREFIX=${BASE#Hello, }", "PREFIX", "world!");
value_test!(suffix, "BASE=Hello, world!\nSUFFIX=${BASE%, world!}", "SUFFIX", "Hello");
value_test!(
    prefix_longest,
    "X=\"/path/to/something\"\nPREFIX_LONGEST=${X##*/}",
    "PREFIX_LONGEST",
    "something"
);
value_test!(
    prefix_shortest,
    "X=\"/path/to/something\"\nP=${X#*/}",
    "P",
    "path/to/something"
);
value_test!(
    suffix_longest,
    "X=\"/path/to/something\"\nSUFFIX_LONGEST=${X%%/*}",
    "SUFFIX_LONGEST",
    ""
);
value_test!(
    suffix_shortest,
    "X=\"/path/to/something\"\nS=${X%/*}",
    "S",
    "/path/to"
);
value_test!(replace_first, "Y=\"Hello, world!\"\nREPLACE=${Y/o/e}", "REPLACE", "Helle, world!");
value_test!(
    replace_all,
    "Y=\"Hello, world!\"\nREPLACE_ALL=${Y//o/e}",
    "REPLACE_ALL",
    "Helle, werld!"
);
value_test!(replace_with_nothing, "Y=a-b-c\nR=${Y//-/}", "R", "abc");
value_test!(replace_regex_first, "Y=\"Hello, world!\"\nR=${Y/o./X}", "R", "HellX world!");
value_test!(replace_regex_all, "Y=\"Hello, world!\"\nR2=${Y//[lo]+/_}", "R2", "He_, w_r_d!");
value_test!(replace_with_group, "Y=key=value\nR=${Y/(.*)=(.*)/\\$2=\\$1}", "R", "value=key");

// ── Overrides ──

value_test!(last_assignment_wins, "X=a\nX=b", "X", "b");
value_test!(preserved_assignment_wins, "#/preserve\nX=a\nX=b", "X", "a");
value_test!(
    overridden_value_never_evaluated,
    "A=${X|broken}\nA=ok",
    "A",
    "ok"
);
value_test!(
    untaken_default_never_evaluated,
    "S=x\nA=${S:-${B|broken}}",
    "A",
    "x"
);

// ── Errors ──

#[test]
fn missing_include_fails() {
    let err = compile("#/include \"nowhere\"\nA=1").unwrap_err();
    assert!(matches!(err, Error::SourceNotFound { name } if name == "nowhere"));
}

#[test]
fn unknown_operator_fails() {
    let err = compile("A=${X|y}").unwrap_err();
    assert!(matches!(err, Error::UnknownOperator { variable, spelling } if variable == "X" && spelling == "|"));
}

#[test]
fn unrecognized_input_fails() {
    let err = compile("A=1\nlowercase=2").unwrap_err();
    assert!(matches!(err, Error::UnrecognizedToken { line: 2, column: 1, .. }));
}

#[test]
fn invalid_replacement_pattern_fails() {
    let err = compile("Y=abc\nR=${Y/(/x}").unwrap_err();
    assert!(matches!(err, Error::InvalidPattern { pattern, .. } if pattern == "("));
}

#[test]
fn cyclic_reference_fails() {
    let err = compile("A=${B}\nB=${A}").unwrap_err();
    assert!(matches!(err, Error::CyclicReference { .. }));
}

#[test]
fn unset_names_are_absent() {
    let env = compile("A=${U}").unwrap();
    assert_eq!(env.keys().collect::<Vec<_>>(), ["A"]);
}

// ── Includes ──

#[test]
fn includes_and_preserve_across_files() {
    let provider = MemoryProvider::new()
        .with("default", "#/include base\nNAME=app\nGREETING=hi ${NAME}\n")
        .with("base", "#/include \"defaults\"\n#/preserve\nNAME=locked\n")
        .with("defaults", "NAME=default\nEXTRA=1\n");
    let env = compile_env("default", &provider, &CompileOptions::default()).unwrap();
    assert_eq!(env["NAME"], "locked");
    assert_eq!(env["GREETING"], "hi locked");
    assert_eq!(env["EXTRA"], "1");
}

#[test]
fn cyclic_include_fails() {
    let provider = MemoryProvider::new().with("default", "#/include default\n");
    let err = compile_env("default", &provider, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, Error::CyclicInclude { chain } if chain == ["default", "default"]));
}

#[test]
fn directory_with_mixed_formats() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env"), "#/include shared\nA=${B}-x\n").unwrap();
    fs::write(
        dir.path().join("shared.env.json"),
        r#"{"b": "from-json", "c": {"value": "${NOT}", "preserve": true}}"#,
    )
    .unwrap();

    let provider = DirectoryProvider::new(zenv::formats::builtin(), "default");
    let options = CompileOptions {
        load: LoadOptions {
            dir: dir.path().to_path_buf(),
            recursive: false,
        },
        ..CompileOptions::default()
    };
    let env = compile_env("default", &provider, &options).unwrap();
    assert_eq!(env["A"], "from-json-x");
    assert_eq!(env["C"], "${NOT}");
}

// ── Rendering ──

#[test]
fn rendered_tree_tokenizes_to_the_same_tree() {
    let source = "#/include base\n# comment\n#/preserve\nA=\"quoted $X\"\nB=  ${A:-a\\}b}$C tail  \nC=${X##*/}\n";
    let tree = Tokenizer::new(source).tokenize().unwrap();
    let text = render(&tree);
    let again = Tokenizer::new(&text).tokenize().unwrap();
    assert!(tree.equivalent(tree.root(), &again, again.root()), "{text}");
    assert_eq!(render(&again), text);
}
