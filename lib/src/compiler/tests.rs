use pretty_assertions::assert_eq;

use crate::compiler::ast::{
    Amount, Anchor, Grammar, Lookaround, Node, QuantKind,
};
use crate::compiler::Compiler;
use crate::engine::{Engine, MatchMode};
use crate::errors::CompileError;

macro_rules! assert_code {
    ($node:expr, $code:expr) => {{
        let program = Compiler::new().compile(&$node).unwrap();
        assert_eq!($code, format!("\n{}", program));
    }};
}

macro_rules! assert_grammar_code {
    ($grammar:expr, $code:expr) => {{
        let program = Compiler::new().compile_grammar(&$grammar).unwrap();
        assert_eq!($code, format!("\n{}", program));
    }};
}

fn el(c: char) -> Node<char> {
    Node::Element(c)
}

fn lit(s: &str) -> Node<char> {
    Node::literal(s.chars())
}

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

fn engine(node: &Node<char>) -> Engine<char> {
    Engine::new(Compiler::new().compile(node).unwrap())
}

fn prefix(node: &Node<char>, input: &str) -> Option<usize> {
    let input = chars(input);
    engine(node).consume(&input, 0..input.len(), MatchMode::Prefix)
}

fn whole(node: &Node<char>, input: &str) -> Option<usize> {
    let input = chars(input);
    engine(node).consume(&input, 0..input.len(), MatchMode::Whole)
}

#[test]
fn code_literal() {
    assert_code!(
        lit("ab"),
        r#"
elements: ['a', 'b']
strings: []
[0] MATCH %e0
[1] MATCH %e1
[2] ACCEPT
"#
    );
}

#[test]
fn code_any() {
    assert_code!(
        Node::Concat(vec![el('a'), Node::Any, el('a')]),
        r#"
elements: ['a']
strings: []
[0] MATCH %e0
[1] CONSUME 1
[2] MATCH %e0
[3] ACCEPT
"#
    );
}

#[test]
fn code_alternation() {
    assert_code!(
        Node::Alternation(vec![el('a'), el('b'), el('c')]),
        r#"
elements: ['a', 'b', 'c']
strings: []
[0] SAVE @3 // SAVE @6
[1] MATCH %e0
[2] BRANCH @7 // ACCEPT
[3] SAVE @6 // MATCH %e2
[4] MATCH %e1
[5] BRANCH @7 // ACCEPT
[6] MATCH %e2
[7] ACCEPT
"#
    );
}

#[test]
fn code_greedy_star() {
    assert_code!(
        el('a').zero_or_more(),
        r#"
elements: ['a']
strings: []
[0] SAVE @3 // ACCEPT
[1] MATCH %e0
[2] BRANCH @0 // SAVE @3
[3] ACCEPT
"#
    );
}

#[test]
fn code_greedy_plus() {
    assert_code!(
        el('a').one_or_more(),
        r#"
elements: ['a']
strings: []
[0] MATCH %e0
[1] SAVE @4 // ACCEPT
[2] MATCH %e0
[3] BRANCH @1 // SAVE @4
[4] ACCEPT
"#
    );
}

#[test]
fn code_greedy_optional() {
    assert_code!(
        el('a').optional(),
        r#"
elements: ['a']
strings: []
[0] SAVE @2 // ACCEPT
[1] MATCH %e0
[2] ACCEPT
"#
    );
}

#[test]
fn code_reluctant_star() {
    assert_code!(
        el('a').repeat(Amount::ZeroOrMore, QuantKind::Reluctant),
        r#"
elements: ['a']
strings: []
[0] SAVE @2 // MATCH %e0
[1] BRANCH @4 // ACCEPT
[2] MATCH %e0
[3] BRANCH @0 // SAVE @2
[4] ACCEPT
"#
    );
}

#[test]
fn code_reluctant_optional() {
    assert_code!(
        el('a').repeat(Amount::ZeroOrOne, QuantKind::Reluctant),
        r#"
elements: ['a']
strings: []
[0] SAVE @2 // MATCH %e0
[1] BRANCH @3 // ACCEPT
[2] MATCH %e0
[3] ACCEPT
"#
    );
}

#[test]
fn code_range() {
    assert_code!(
        el('a').repeat(Amount::Range(2, 4), QuantKind::Greedy),
        r#"
elements: ['a']
strings: []
[0] MATCH %e0
[1] MATCH %e0
[2] SAVE @6 // ACCEPT
[3] MATCH %e0
[4] SAVE @6 // ACCEPT
[5] MATCH %e0
[6] ACCEPT
"#
    );
}

#[test]
fn code_n_or_more() {
    assert_code!(
        el('a').repeat(Amount::NOrMore(2), QuantKind::Greedy),
        r#"
elements: ['a']
strings: []
[0] MATCH %e0
[1] MATCH %e0
[2] SAVE @5 // ACCEPT
[3] MATCH %e0
[4] BRANCH @2 // SAVE @5
[5] ACCEPT
"#
    );
}

#[test]
fn code_nullable_star() {
    assert_code!(
        el('a').optional().zero_or_more(),
        r#"
elements: ['a']
strings: []
[0] SAVE @7 // ACCEPT
[1] MOVE_POSITION %r0
[2] SAVE @4 // COMPARE_POSITION %b0 %r0
[3] MATCH %e0
[4] COMPARE_POSITION %b0 %r0
[5] COND_BRANCH %b0 @7 // ACCEPT
[6] BRANCH @0 // SAVE @7
[7] ACCEPT
"#
    );
}

#[test]
fn code_possessive() {
    assert_code!(
        el('a').repeat(Amount::ZeroOrMore, QuantKind::Possessive),
        r#"
elements: ['a']
strings: []
[0] SAVE @6 // FAIL
[1] SAVE @4 // CLEAR_THROUGH @6
[2] MATCH %e0
[3] BRANCH @1 // SAVE @4
[4] CLEAR_THROUGH @6 // FAIL
[5] BRANCH @7 // ACCEPT
[6] FAIL
[7] ACCEPT
"#
    );
}

#[test]
fn code_positive_lookahead() {
    assert_code!(
        el('a').lookaround(Lookaround::Ahead),
        r#"
elements: ['a']
strings: []
[0] SAVE @7 // ACCEPT
[1] SAVE @5 // CLEAR
[2] MATCH %e0
[3] CLEAR_THROUGH @5 // CLEAR
[4] FAIL
[5] CLEAR
[6] FAIL
[7] ACCEPT
"#
    );
}

#[test]
fn code_negative_lookahead() {
    assert_code!(
        el('a').lookaround(Lookaround::NegativeAhead),
        r#"
elements: ['a']
strings: []
[0] SAVE @7 // ACCEPT
[1] SAVE @6 // FAIL
[2] MATCH %e0
[3] CLEAR_THROUGH @6 // FAIL
[4] CLEAR
[5] FAIL
[6] FAIL
[7] ACCEPT
"#
    );
}

#[test]
fn code_end_of_input() {
    assert_code!(
        Node::<char>::Anchor(Anchor::EndOfInput),
        r#"
elements: []
strings: []
[0] SAVE @7 // ACCEPT
[1] SAVE @6 // FAIL
[2] CONSUME 1
[3] CLEAR_THROUGH @6 // FAIL
[4] CLEAR
[5] FAIL
[6] FAIL
[7] ACCEPT
"#
    );
}

#[test]
fn code_capture() {
    assert_code!(
        Node::Concat(vec![el('a').capture(0), Node::Backreference(0)]),
        r#"
elements: ['a']
strings: []
[0] BEGIN_CAPTURE %c0
[1] MATCH %e0
[2] END_CAPTURE %c0
[3] BACKREFERENCE %c0
[4] ACCEPT
"#
    );
}

#[test]
fn code_predicate_and_consumer() {
    assert_code!(
        Node::Concat(vec![
            Node::Anchor(Anchor::StartOfInput),
            Node::predicate(|c: &char| c.is_ascii_digit()),
        ]),
        r#"
elements: []
strings: []
predicates: 1
consume functions: 1
[0] CONSUME_BY %f0
[1] MATCH_PREDICATE %p0
[2] ACCEPT
"#
    );
}

#[test]
fn code_grammar() {
    let grammar = Grammar::new("S").production(
        "S",
        Node::Alternation(vec![
            Node::Concat(vec![
                el('('),
                Node::reference("S"),
                el(')'),
                Node::reference("S"),
            ]),
            Node::Empty,
        ]),
    );

    assert_grammar_code!(
        grammar,
        r#"
elements: ['(', ')']
strings: ["S"]
[0] BRANCH @1 // NOP %s0
[1] NOP %s0 // "S"
[2] SAVE @8 // RET
[3] MATCH %e0
[4] CALL @1 // NOP %s0
[5] MATCH %e1
[6] CALL @1 // NOP %s0
[7] BRANCH @8 // RET
[8] RET
"#
    );
}

#[test]
fn literal_matching() {
    assert_eq!(prefix(&lit("abc"), "abcd"), Some(3));
    assert_eq!(prefix(&lit("abc"), "abd"), None);
    assert_eq!(prefix(&lit("abc"), "ab"), None);
    assert_eq!(whole(&lit("abc"), "abcd"), None);
    assert_eq!(whole(&lit("abc"), "abc"), Some(3));
}

#[test]
fn star_backtracks() {
    // a*a
    let node = Node::Concat(vec![el('a').zero_or_more(), el('a')]);
    assert_eq!(prefix(&node, "aaaa"), Some(4));
    assert_eq!(prefix(&node, "a"), Some(1));
    assert_eq!(prefix(&node, ""), None);
}

#[test]
fn alternation_is_ordered() {
    // a|ab
    let node = Node::Alternation(vec![lit("a"), lit("ab")]);
    assert_eq!(prefix(&node, "ab"), Some(1));
    assert_eq!(whole(&node, "ab"), Some(2));
}

#[test]
fn quantifier_boundaries() {
    assert_eq!(prefix(&el('a').zero_or_more(), ""), Some(0));
    assert_eq!(prefix(&el('a').one_or_more(), ""), None);
    assert_eq!(prefix(&el('a').optional(), "b"), Some(0));

    let node = el('a').repeat(Amount::Range(2, 4), QuantKind::Greedy);
    assert_eq!(prefix(&node, "a"), None);
    assert_eq!(prefix(&node, "aa"), Some(2));
    assert_eq!(prefix(&node, "aaa"), Some(3));
    assert_eq!(prefix(&node, "aaab"), Some(3));
    assert_eq!(prefix(&node, "aaaaa"), Some(4));

    let node = el('a').repeat(Amount::Exactly(3), QuantKind::Greedy);
    assert_eq!(prefix(&node, "aa"), None);
    assert_eq!(prefix(&node, "aaaa"), Some(3));

    let node = el('a').repeat(Amount::UpToN(2), QuantKind::Greedy);
    assert_eq!(prefix(&node, ""), Some(0));
    assert_eq!(prefix(&node, "aaa"), Some(2));

    let node = el('a').repeat(Amount::NOrMore(2), QuantKind::Greedy);
    assert_eq!(prefix(&node, "a"), None);
    assert_eq!(prefix(&node, "aaaaa"), Some(5));
}

#[test]
fn reluctant_quantifiers() {
    let star = el('a').repeat(Amount::ZeroOrMore, QuantKind::Reluctant);
    let plus = el('a').repeat(Amount::OneOrMore, QuantKind::Reluctant);
    let opt = el('a').repeat(Amount::ZeroOrOne, QuantKind::Reluctant);
    let range = el('a').repeat(Amount::Range(1, 3), QuantKind::Reluctant);

    assert_eq!(prefix(&star, "aaa"), Some(0));
    assert_eq!(prefix(&plus, "aaa"), Some(1));
    assert_eq!(prefix(&opt, "aaa"), Some(0));
    assert_eq!(prefix(&range, "aaa"), Some(1));

    // Whole mode forces the reluctant quantifiers to take more.
    assert_eq!(whole(&star, "aaa"), Some(3));
    assert_eq!(whole(&range, "aaa"), Some(3));
    assert_eq!(whole(&range, "aaaa"), None);

    // a*?b
    let node = Node::Concat(vec![star, el('b')]);
    assert_eq!(prefix(&node, "aab"), Some(3));
}

#[test]
fn possessive_quantifiers() {
    let possessive = Node::Concat(vec![
        el('a').repeat(Amount::ZeroOrMore, QuantKind::Possessive),
        el('a'),
    ]);
    let greedy = Node::Concat(vec![el('a').zero_or_more(), el('a')]);

    assert_eq!(prefix(&possessive, "aaa"), None);
    assert_eq!(prefix(&greedy, "aaa"), Some(3));

    let node = Node::Concat(vec![
        el('a').repeat(Amount::OneOrMore, QuantKind::Possessive),
        el('b'),
    ]);
    assert_eq!(prefix(&node, "aab"), Some(3));
}

#[test]
fn atomic_groups() {
    let alternation = Node::Alternation(vec![lit("a"), lit("ab")]);

    // (?>a|ab)c
    let atomic = Node::Concat(vec![alternation.clone().atomic(), el('c')]);
    // (a|ab)c
    let plain = Node::Concat(vec![alternation, el('c')]);

    assert_eq!(prefix(&atomic, "abc"), None);
    assert_eq!(prefix(&atomic, "ac"), Some(2));
    assert_eq!(prefix(&plain, "abc"), Some(3));
}

#[test]
fn lookaheads() {
    // (?=ab)a
    let node =
        Node::Concat(vec![lit("ab").lookaround(Lookaround::Ahead), el('a')]);
    assert_eq!(prefix(&node, "ab"), Some(1));
    assert_eq!(prefix(&node, "ac"), None);

    // (?!ab)a
    let node = Node::Concat(vec![
        lit("ab").lookaround(Lookaround::NegativeAhead),
        el('a'),
    ]);
    assert_eq!(prefix(&node, "ac"), Some(1));
    assert_eq!(prefix(&node, "ab"), None);
}

#[test]
fn lookahead_inside_loop() {
    // ((?!b).)*
    let node = Node::Concat(vec![
        el('b').lookaround(Lookaround::NegativeAhead),
        Node::Any,
    ])
    .zero_or_more();
    assert_eq!(prefix(&node, "aab"), Some(2));
    assert_eq!(prefix(&node, "aaa"), Some(3));
}

#[test]
fn anchors() {
    let end = Node::Concat(vec![el('a'), Node::Anchor(Anchor::EndOfInput)]);
    assert_eq!(prefix(&end, "a"), Some(1));
    assert_eq!(prefix(&end, "ab"), None);

    // The end anchor refers to the end of the search range.
    let input = chars("ab");
    let result = engine(&end).consume(&input, 0..1, MatchMode::Prefix);
    assert_eq!(result, Some(1));

    let start =
        Node::Concat(vec![Node::Anchor(Anchor::StartOfInput), el('a')]);
    let input = chars("aa");
    let engine = engine(&start);
    assert_eq!(engine.consume(&input, 0..2, MatchMode::Prefix), Some(1));
    assert_eq!(engine.consume(&input, 1..2, MatchMode::Prefix), None);
}

#[test]
fn captures() {
    // (a+)(b)?c
    let node = Node::Concat(vec![
        el('a').one_or_more().capture(0),
        el('b').capture(1).optional(),
        el('c'),
    ]);

    let input = chars("aac");
    let m = engine(&node)
        .find_match(&input, 0..input.len(), MatchMode::Prefix)
        .unwrap()
        .unwrap();

    assert_eq!(m.range, 0..3);
    assert_eq!(m.captures, vec![Some(0..2), None]);

    let input = chars("abc");
    let m = engine(&node)
        .find_match(&input, 0..input.len(), MatchMode::Prefix)
        .unwrap()
        .unwrap();

    assert_eq!(m.captures, vec![Some(0..1), Some(1..2)]);
}

#[test]
fn captures_are_restored_on_backtracking() {
    // (a)x|ab
    let node = Node::Alternation(vec![
        Node::Concat(vec![el('a').capture(0), el('x')]),
        lit("ab"),
    ]);

    let input = chars("ab");
    let m = engine(&node)
        .find_match(&input, 0..input.len(), MatchMode::Prefix)
        .unwrap()
        .unwrap();

    assert_eq!(m.range, 0..2);
    assert_eq!(m.captures, vec![None]);
}

#[test]
fn captures_inside_lookahead_are_discarded() {
    // (?=(a))a
    let node = Node::Concat(vec![
        el('a').capture(0).lookaround(Lookaround::Ahead),
        el('a'),
    ]);

    let input = chars("a");
    let m = engine(&node)
        .find_match(&input, 0..1, MatchMode::Prefix)
        .unwrap()
        .unwrap();

    assert_eq!(m.captures, vec![None]);
}

#[test]
fn backreferences() {
    // (a|b)\1
    let node = Node::Concat(vec![
        Node::Alternation(vec![el('a'), el('b')]).capture(0),
        Node::Backreference(0),
    ]);

    assert_eq!(prefix(&node, "aa"), Some(2));
    assert_eq!(prefix(&node, "bb"), Some(2));
    assert_eq!(prefix(&node, "ab"), None);
    assert_eq!(prefix(&node, "a"), None);
}

#[test]
fn nullable_loops_terminate() {
    // (a?)*
    let node = el('a').optional().zero_or_more();
    assert_eq!(prefix(&node, "aa"), Some(2));
    assert_eq!(prefix(&node, "b"), Some(0));

    // (a*)*b
    let node = Node::Concat(vec![
        el('a').zero_or_more().zero_or_more(),
        el('b'),
    ]);
    assert_eq!(prefix(&node, "aaab"), Some(4));
    assert_eq!(prefix(&node, "aaac"), None);

    // (a|)*? in whole mode
    let node = Node::Alternation(vec![el('a'), Node::Empty])
        .repeat(Amount::ZeroOrMore, QuantKind::Reluctant);
    assert_eq!(whole(&node, "aaa"), Some(3));
}

#[test]
fn empty_alternation_never_matches() {
    assert_eq!(prefix(&Node::Alternation(vec![]), ""), None);
    assert_eq!(prefix(&Node::Empty, "abc"), Some(0));
}

#[test]
fn balanced_parentheses() {
    let grammar = Grammar::new("S").production(
        "S",
        Node::Alternation(vec![
            Node::Concat(vec![
                el('('),
                Node::reference("S"),
                el(')'),
                Node::reference("S"),
            ]),
            Node::Empty,
        ]),
    );

    let program = Compiler::new().compile_grammar(&grammar).unwrap();
    let engine = Engine::new(program).match_mode(MatchMode::Whole);

    assert_eq!(engine.consume_all(&chars("(()())")), Some(6));
    assert_eq!(engine.consume_all(&chars("")), Some(0));
    assert_eq!(engine.consume_all(&chars("(()")), None);
    assert_eq!(engine.consume_all(&chars("())")), None);

    let input = chars("()x");
    assert_eq!(engine.consume(&input, 0..3, MatchMode::Prefix), Some(2));
}

#[test]
fn mutual_recursion() {
    // A = 'a' B | ε
    // B = 'b' A
    let grammar = Grammar::new("A")
        .production(
            "A",
            Node::Alternation(vec![
                Node::Concat(vec![el('a'), Node::reference("B")]),
                Node::Empty,
            ]),
        )
        .production("B", Node::Concat(vec![el('b'), Node::reference("A")]));

    let program = Compiler::new().compile_grammar(&grammar).unwrap();
    let engine = Engine::new(program).match_mode(MatchMode::Whole);

    assert_eq!(engine.consume_all(&chars("abab")), Some(4));
    assert_eq!(engine.consume_all(&chars("aba")), None);
    assert_eq!(engine.consume_all(&chars("ba")), None);
}

#[test]
fn backtracking_into_returned_function() {
    // S = X 'b'
    // X = 'a' | 'a' 'a'
    // The first alternative of X returns, then 'b' fails and the processor
    // must backtrack into X, whose return address was already popped.
    let grammar = Grammar::new("S")
        .production("S", Node::Concat(vec![Node::reference("X"), el('b')]))
        .production("X", Node::Alternation(vec![lit("a"), lit("aa")]));

    let engine =
        Engine::new(Compiler::new().compile_grammar(&grammar).unwrap());

    assert_eq!(engine.consume_all(&chars("aab")), Some(3));
    assert_eq!(engine.consume_all(&chars("ab")), Some(2));
    assert_eq!(engine.consume_all(&chars("aaab")), None);
}

#[test]
fn captures_in_recursive_productions() {
    // S = '(' (S?) ')'
    let grammar = Grammar::new("S").production(
        "S",
        Node::Concat(vec![
            el('('),
            Node::reference("S").optional().capture(0),
            el(')'),
        ]),
    );

    let engine =
        Engine::new(Compiler::new().compile_grammar(&grammar).unwrap());

    let find = |s: &str| {
        let input = chars(s);
        engine
            .find_match(&input, 0..input.len(), MatchMode::Prefix)
            .unwrap()
            .map(|m| (m.range, m.captures))
    };

    // The inner activation of the group closes before the outer one, and
    // doesn't clobber its start.
    assert_eq!(find("(())"), Some((0..4, vec![Some(1..3)])));
    assert_eq!(find("((()))"), Some((0..6, vec![Some(1..5)])));
    assert_eq!(find("()"), Some((0..2, vec![Some(1..1)])));
    assert_eq!(find("(())x"), Some((0..4, vec![Some(1..3)])));
    assert_eq!(find("(()x"), None);
}

#[test]
fn undefined_production() {
    assert_eq!(
        Compiler::<char>::new().compile(&Node::reference("foo")).err(),
        Some(CompileError::UndefinedProduction("foo".to_string()))
    );

    let grammar: Grammar<char> =
        Grammar::new("S").production("S", Node::reference("T"));
    assert_eq!(
        Compiler::new().compile_grammar(&grammar).err(),
        Some(CompileError::UndefinedProduction("T".to_string()))
    );

    let grammar: Grammar<char> = Grammar::new("S");
    assert_eq!(
        Compiler::new().compile_grammar(&grammar).err(),
        Some(CompileError::UndefinedProduction("S".to_string()))
    );
}

#[test]
fn invalid_backreference() {
    assert_eq!(
        Compiler::<char>::new().compile(&Node::Backreference(2)).err(),
        Some(CompileError::InvalidBackreference(2))
    );
}

#[test]
fn invalid_range() {
    let node = el('a').repeat(Amount::Range(3, 2), QuantKind::Greedy);
    assert!(matches!(
        Compiler::new().compile(&node),
        Err(CompileError::Unsupported(_))
    ));
}

#[test]
fn too_large() {
    let node = el('a').repeat(Amount::Exactly(20), QuantKind::Greedy);

    assert_eq!(
        Compiler::new().max_instructions(10).compile(&node).err(),
        Some(CompileError::TooLarge)
    );

    assert!(Compiler::new().max_instructions(21).compile(&node).is_ok());
}

#[test]
fn generic_elements() {
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    enum Token {
        Number(u32),
        Plus,
    }

    // number ('+' number)*
    let number = Node::predicate(|t: &Token| matches!(t, Token::Number(_)));
    let node = Node::Concat(vec![
        number.clone(),
        Node::Concat(vec![Node::Element(Token::Plus), number]).zero_or_more(),
    ]);

    let engine = Engine::new(Compiler::new().compile(&node).unwrap())
        .match_mode(MatchMode::Whole);

    let input =
        vec![Token::Number(1), Token::Plus, Token::Number(2), Token::Plus];

    assert_eq!(engine.consume_all(&input), None);
    assert_eq!(engine.consume_all(&input[..3]), Some(3));
}
