/*! A backtracking virtual machine for matching patterns.

Patterns are described as trees of [`Node`]s, which can match sequences of
any element type: characters, bytes, tokens, etc. A [`Compiler`] translates
the tree into a compact [`engine::Program`] made of fixed-width instructions,
and an [`Engine`] executes the program over some input, exploring the
alternatives depth-first and backtracking when an alternative fails.

Besides the usual regular expression constructs, patterns can contain
lookaheads, atomic groups, possessive quantifiers, backreferences, arbitrary
predicates and custom consume functions. Patterns can also be organized in
a [`Grammar`] of named productions that refer to each other, which allows
matching recursive languages.

For the common case of matching text, [`Regex`] parses regular expressions
with the [`regex-syntax`][1] crate and compiles them into programs for the
same VM.

# Example

```rust
use matching_engine::{Compiler, Engine, Grammar, MatchMode, Node};

// balanced := ( "(" balanced ")" )*
let grammar = Grammar::new("balanced").production(
    "balanced",
    Node::Concat(vec![
        Node::Element('('),
        Node::reference("balanced"),
        Node::Element(')'),
    ])
    .zero_or_more(),
);

let program = Compiler::new().compile_grammar(&grammar).unwrap();
let engine = Engine::new(program).match_mode(MatchMode::Whole);

let input: Vec<char> = "(()(()))".chars().collect();
assert_eq!(engine.consume_all(&input), Some(8));

let input: Vec<char> = "(()".chars().collect();
assert_eq!(engine.consume_all(&input), None);
```

```rust
use matching_engine::Regex;

let re = Regex::new(r"(\w+)@(\w+)\.com").unwrap();
assert_eq!(
    re.captures("mail: joe@example.com"),
    Some(vec![Some(6..21), Some(6..9), Some(10..17)])
);
```

[1]: https://docs.rs/regex-syntax
*/

pub use compiler::ast::Amount;
pub use compiler::ast::Anchor;
pub use compiler::ast::Grammar;
pub use compiler::ast::Lookaround;
pub use compiler::ast::Node;
pub use compiler::ast::QuantKind;
pub use compiler::Compiler;

pub use config::Config;
pub use config::EngineConfig;
pub use config::SyntaxConfig;

pub use engine::Engine;
pub use engine::Match;
pub use engine::MatchMode;

pub use errors::CompileError;
pub use errors::Error;
pub use errors::MatchError;

pub use re::Regex;

pub mod compiler;
pub mod config;
pub mod engine;
pub mod re;

mod errors;
