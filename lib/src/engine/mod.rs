/*!
A backtracking virtual machine for matching patterns.

Patterns are compiled into a [`Program`], a sequence of fixed-width
[`Instruction`]s that is executed by a [`Processor`] against some input. The
processor explores alternatives depth-first, pushing a save point before
trying each alternative and backtracking to it when the alternative fails.

The machine is generic over the type of the input elements, which can be
anything that can be compared for equality and hashed: characters, bytes,
tokens, etc.

Programs are usually produced by [`crate::compiler::Compiler`], but they can
also be written by hand with a [`Builder`]:

```
# use matching_engine::engine::{Builder, Engine};
let mut builder = Builder::new();
let done = builder.make_address();
let start = builder.make_address();
builder.label(start);
builder.build_save(done);
builder.build_match('a');
builder.build_branch(start);
builder.label(done);
builder.build_accept();

let engine = Engine::new(builder.assemble());
let input: Vec<char> = "aaab".chars().collect();
assert_eq!(engine.consume_all(&input), Some(3));
```
 */

pub use builder::Builder;
pub use consume::{Engine, Match, MatchMode};
pub use instr::{Instruction, OpCode, Operand};
pub use processor::{Controller, Processor, State, DEFAULT_MAX_SAVE_POINTS};
pub use program::{ConsumeFunction, Predicate, Program};
pub use registers::RegisterInfo;
pub use typed::*;

mod builder;
mod consume;
mod instr;
mod processor;
mod program;
mod registers;
mod typed;
