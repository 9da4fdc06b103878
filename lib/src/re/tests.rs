use pretty_assertions::assert_eq;

use crate::config::{Config, EngineConfig, SyntaxConfig};
use crate::errors::CompileError;
use crate::re::{Parser, Regex};
use crate::Error;

macro_rules! assert_re_code {
    ($re:expr, $code:expr) => {{
        let regex = Regex::new($re).unwrap();
        assert_eq!($code, format!("\n{}", regex.program()));
    }};
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

fn regex_with_syntax(pattern: &str, syntax: SyntaxConfig) -> Regex {
    let config = Config { syntax, ..Config::default() };
    Regex::with_config(pattern, &config).unwrap()
}

#[test]
fn re_code_1() {
    assert_re_code!(
        "ab*",
        r#"
elements: ['a', 'b']
strings: []
[0] MATCH %e0
[1] SAVE @4 // ACCEPT
[2] MATCH %e1
[3] BRANCH @1 // SAVE @4
[4] ACCEPT
"#
    );
}

#[test]
fn re_code_2() {
    assert_re_code!(
        "[0-9]+?",
        r#"
elements: []
strings: []
predicates: 2
[0] MATCH_PREDICATE %p0
[1] SAVE @3 // MATCH_PREDICATE %p1
[2] BRANCH @5 // ACCEPT
[3] MATCH_PREDICATE %p1
[4] BRANCH @1 // SAVE @3
[5] ACCEPT
"#
    );
}

#[test]
fn re_code_3() {
    assert_re_code!(
        "^a$",
        r#"
elements: ['a']
strings: []
consume functions: 1
[0] CONSUME_BY %f0
[1] MATCH %e0
[2] SAVE @9 // ACCEPT
[3] SAVE @8 // FAIL
[4] CONSUME 1
[5] CLEAR_THROUGH @8 // FAIL
[6] CLEAR
[7] FAIL
[8] FAIL
[9] ACCEPT
"#
    );
}

#[test]
fn re_code_4() {
    assert_re_code!(
        "(?s)a.",
        r#"
elements: ['a']
strings: []
[0] MATCH %e0
[1] CONSUME 1
[2] ACCEPT
"#
    );
}

#[test]
fn lowering() {
    let node = Parser::new().parse_node("(?P<x>a)b").unwrap();

    assert_eq!(
        format!("{:?}", node),
        "Concat([Capture { index: 0, name: Some(\"x\"), node: Element('a') \
         }, Element('b')])"
    );

    let node = Parser::new().parse_node("a{2,5}?").unwrap();

    assert_eq!(
        format!("{:?}", node),
        "Quantification { amount: Range(2, 5), kind: Reluctant, node: \
         Element('a') }"
    );

    let node = Parser::new().parse_node("(?:ab){3,}").unwrap();

    assert_eq!(
        format!("{:?}", node),
        "Quantification { amount: NOrMore(3), kind: Greedy, node: \
         Literal(['a', 'b']) }"
    );
}

#[test]
fn whole_matches() {
    assert!(regex("a*a").matches("aaaa"));
    assert!(regex("a|ab").matches("ab"));
    assert!(regex("(a|ab)(c|bcd)(d*)").matches("abcd"));
    assert!(regex("").matches(""));
    assert!(!regex("").matches("a"));
    assert!(!regex("a+").matches("aab"));
    assert!(regex("a{2}").matches("aa"));
    assert!(!regex("a{2}").matches("a"));
    assert!(!regex("a{2}").matches("aaa"));
}

#[test]
fn prefixes() {
    assert_eq!(regex(r"\d+").match_prefix("123abc"), Some("123"));
    assert_eq!(regex(r"\d+?").match_prefix("123abc"), Some("1"));
    assert_eq!(regex("x").match_prefix("abc"), None);
    assert_eq!(regex("x*").match_prefix("abc"), Some(""));
    assert_eq!(regex("a|ab").match_prefix("ab"), Some("a"));
    assert_eq!(regex("<.+>").match_prefix("<a><b>"), Some("<a><b>"));
    assert_eq!(regex("<.+?>").match_prefix("<a><b>"), Some("<a>"));
    assert_eq!(regex("a{2,3}").match_prefix("aaaa"), Some("aaa"));
    assert_eq!(regex("a{2,3}?").match_prefix("aaaa"), Some("aa"));
    assert_eq!(regex("[α-ω]+").match_prefix("αβγd"), Some("αβγ"));
    assert_eq!(regex("[^a]+").match_prefix("bbba"), Some("bbb"));
}

#[test]
fn find() {
    assert_eq!(regex("b+").find("aabbbc"), Some(2..5));
    assert_eq!(regex("^b").find("ab"), None);
    assert_eq!(regex("^a").find("ab"), Some(0..1));
    assert_eq!(regex("b$").find("abb"), Some(2..3));
    assert_eq!(regex(r"w\w+").find("héllo wörld"), Some(7..13));
    assert_eq!(regex("x").find("abc"), None);
    assert_eq!(regex("x*").find("abc"), Some(0..0));
}

#[test]
fn captures() {
    assert_eq!(
        regex(r"(\w+)@(\w+)\.com").captures("mail: joe@example.com"),
        Some(vec![Some(6..21), Some(6..9), Some(10..17)])
    );

    assert_eq!(
        regex("(a)|(b)").captures("b"),
        Some(vec![Some(0..1), None, Some(0..1)])
    );

    assert_eq!(
        regex(r"(?P<year>\d{4})-(?P<month>\d{2})").captures("on 2024-05!"),
        Some(vec![Some(3..10), Some(3..7), Some(8..10)])
    );

    // Each group keeps the range from the last iteration in which it
    // participated.
    assert_eq!(
        regex("(?:(a)|(b))+").captures("ab"),
        Some(vec![Some(0..2), Some(0..1), Some(1..2)])
    );

    assert_eq!(regex("(a)").captures("b"), None);
}

#[test]
fn word_boundaries() {
    assert_eq!(regex(r"\bcat\b").find("concat cat"), Some(7..10));
    assert_eq!(regex(r"\Bcat").find("concat cat"), Some(3..6));
    assert_eq!(regex(r"\bx").find("ñx x"), Some(4..5));
    assert!(!regex(r"\b").matches(""));
    assert!(regex(r"\B").matches(""));
}

#[test]
fn syntax_options() {
    let multi_line = SyntaxConfig { multi_line: true, ..Default::default() };
    assert_eq!(
        regex_with_syntax("^b$", multi_line).find("a\nb\nc"),
        Some(2..3)
    );
    assert_eq!(regex("^b$").find("a\nb\nc"), None);
    assert_eq!(regex("(?m)^c$").find("a\nb\nc"), Some(4..5));

    let case_insensitive =
        SyntaxConfig { case_insensitive: true, ..Default::default() };
    assert!(regex_with_syntax("hello", case_insensitive).matches("HeLLo"));
    assert!(regex("(?i)hello").matches("HeLLo"));
    assert!(!regex("hello").matches("HeLLo"));

    assert!(regex("a.c").matches("abc"));
    assert!(!regex("a.c").matches("a\nc"));
    assert!(regex("(?s)a.c").matches("a\nc"));

    let dot_all =
        SyntaxConfig { dot_matches_new_line: true, ..Default::default() };
    assert!(regex_with_syntax("a.c", dot_all).matches("a\nc"));

    let ascii = SyntaxConfig { unicode: false, ..Default::default() };
    assert!(regex(r"\w").matches("é"));
    assert!(!regex_with_syntax(r"\w", ascii).matches("é"));
}

#[test]
fn empty_loops_terminate() {
    assert_eq!(regex("(a*)*b").find("aaac"), None);
    assert!(regex("(a|)*b").matches("aab"));
    assert_eq!(regex("(?:a?)+?b").match_prefix("aab"), Some("aab"));
}

#[test]
fn errors() {
    assert!(matches!(
        Regex::new("a("),
        Err(Error::CompileError(CompileError::Syntax { .. }))
    ));

    // The matching is done over characters, patterns that match arbitrary
    // bytes are rejected.
    assert!(matches!(
        Regex::new(r"(?-u:\xFF)"),
        Err(Error::CompileError(CompileError::Syntax { .. }))
    ));

    assert!(matches!(
        Regex::new(r"\<foo"),
        Err(Error::CompileError(CompileError::Unsupported(_)))
    ));

    let config = Config {
        engine: EngineConfig { max_instructions: 10, ..Default::default() },
        ..Default::default()
    };

    assert!(matches!(
        Regex::with_config("a{100}", &config),
        Err(Error::CompileError(CompileError::TooLarge))
    ));
}

#[test]
fn resource_limits() {
    let config = Config {
        engine: EngineConfig { cycle_limit: Some(50), ..Default::default() },
        ..Default::default()
    };

    let re = Regex::with_config("(a|a)*b", &config).unwrap();
    let haystack = "a".repeat(20);

    assert!(!re.matches(&haystack));
    assert_eq!(re.find(&haystack), None);
    assert_eq!(re.as_str(), "(a|a)*b");

    // Without the limit the search completes, and fails.
    assert_eq!(regex("(a|a)*b").find("aaaaaaaa"), None);
}
