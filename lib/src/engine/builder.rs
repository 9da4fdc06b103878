/*!
Assembler for VM programs.

The [`Builder`] appends instructions one by one. Instructions that jump
forward need an address that is not known at the time they are emitted, so
they refer to an [`AddressToken`] instead, and a fixup is recorded for them.
Once the token is bound to an actual address with [`Builder::resolve`] or
[`Builder::label`], [`Builder::assemble`] patches every instruction that
referred to it.

```text
  let done = builder.make_address();
  builder.build_save(done);      // SAVE ?
  builder.build_match('a');      // MATCH %e0
  builder.label(done);           // done = 2
  builder.build_accept();        // ACCEPT
```
 */

use std::hash::Hash;
use std::ops::Range;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::engine::instr::{Instruction, Operand};
use crate::engine::program::{ConsumeFunction, Predicate, Program};
use crate::engine::registers::RegisterInfo;
use crate::engine::typed::{
    AddressToken, BoolRegister, CaptureRegister, ConsumeFunctionRegister,
    Distance, ElementRegister, InstructionAddress, PositionRegister,
    PredicateRegister, StringRegister,
};

/// Builds a [`Program`] instruction by instruction.
pub struct Builder<E> {
    instructions: Vec<Instruction>,
    elements: IndexSet<E>,
    strings: IndexSet<String>,
    predicates: Vec<Predicate<E>>,
    consume_functions: Vec<ConsumeFunction<E>>,
    address_tokens: Vec<Option<InstructionAddress>>,
    address_fixups: Vec<(InstructionAddress, AddressToken)>,
    next_bool_register: BoolRegister,
    next_position_register: PositionRegister,
    next_capture_register: CaptureRegister,
}

impl<E> Default for Builder<E>
where
    E: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Builder<E>
where
    E: Clone + Eq + Hash,
{
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            elements: IndexSet::new(),
            strings: IndexSet::new(),
            predicates: Vec::new(),
            consume_functions: Vec::new(),
            address_tokens: Vec::new(),
            address_fixups: Vec::new(),
            next_bool_register: BoolRegister::new(0),
            next_position_register: PositionRegister::new(0),
            next_capture_register: CaptureRegister::new(0),
        }
    }

    /// Creates a builder where the element registers are pre-populated with
    /// the given elements, in order.
    pub fn with_static_elements<I>(elements: I) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        let mut builder = Self::new();
        builder.elements.extend(elements);
        builder
    }

    /// Returns the builder to its empty state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Number of instructions emitted so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Address that the next emitted instruction will have.
    #[inline]
    pub fn next_address(&self) -> InstructionAddress {
        InstructionAddress::new(self.instructions.len())
    }

    /// Creates a new address token, not bound to any address yet.
    pub fn make_address(&mut self) -> AddressToken {
        self.address_tokens.push(None);
        AddressToken::new(self.address_tokens.len() - 1)
    }

    /// Binds `token` to the most recently emitted instruction.
    ///
    /// # Panics
    ///
    /// If no instruction has been emitted yet.
    pub fn resolve(&mut self, token: AddressToken) {
        assert!(
            !self.instructions.is_empty(),
            "resolve() requires at least one instruction"
        );
        let addr = InstructionAddress::new(self.instructions.len() - 1);
        self.bind(token, addr);
    }

    /// Binds `token` to the next instruction to be emitted.
    pub fn label(&mut self, token: AddressToken) {
        let addr = self.next_address();
        self.bind(token, addr);
    }

    fn bind(&mut self, token: AddressToken, addr: InstructionAddress) {
        let slot = &mut self.address_tokens[token.index()];
        assert!(slot.is_none(), "address token {} bound twice", token);
        *slot = Some(addr);
    }

    /// Records that the instruction just emitted must be patched with the
    /// address bound to `token`.
    fn fixup(&mut self, token: AddressToken) {
        let addr = InstructionAddress::new(self.instructions.len() - 1);
        self.address_fixups.push((addr, token));
    }

    fn push(&mut self, instr: Instruction) -> InstructionAddress {
        let addr = self.next_address();
        assert!(
            addr.bits() <= Operand::MAX_PAYLOAD,
            "program exceeds the addressable range"
        );
        self.instructions.push(instr);
        addr
    }

    /// Returns the register that holds `element`, adding it if not present.
    pub fn intern_element(&mut self, element: E) -> ElementRegister {
        let (idx, _) = self.elements.insert_full(element);
        ElementRegister::new(idx)
    }

    /// Returns the register that holds `s`, adding it if not present.
    pub fn intern_string<S: Into<String>>(&mut self, s: S) -> StringRegister {
        let (idx, _) = self.strings.insert_full(s.into());
        StringRegister::new(idx)
    }

    pub fn make_bool_register(&mut self) -> BoolRegister {
        let r = self.next_bool_register;
        assert!(
            r.bits() <= Operand::MAX_CONDITION,
            "too many bool registers"
        );
        self.next_bool_register = r.next();
        r
    }

    pub fn make_position_register(&mut self) -> PositionRegister {
        let r = self.next_position_register;
        self.next_position_register = r.next();
        r
    }

    pub fn make_capture_register(&mut self) -> CaptureRegister {
        let r = self.next_capture_register;
        self.next_capture_register = r.next();
        r
    }

    /// Registers a predicate. Predicates are opaque, so registering the
    /// same closure twice produces two different registers.
    pub fn make_predicate<F>(&mut self, f: F) -> PredicateRegister
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.add_predicate(Arc::new(f))
    }

    /// Same as [`Builder::make_predicate`], but for predicates that are
    /// already shared.
    pub fn add_predicate(
        &mut self,
        predicate: Predicate<E>,
    ) -> PredicateRegister {
        self.predicates.push(predicate);
        PredicateRegister::new(self.predicates.len() - 1)
    }

    /// Registers a custom consume function.
    pub fn make_consume_function<F>(&mut self, f: F) -> ConsumeFunctionRegister
    where
        F: Fn(&[E], Range<usize>) -> Option<usize> + Send + Sync + 'static,
    {
        self.add_consume_function(Arc::new(f))
    }

    /// Same as [`Builder::make_consume_function`], but for functions that are
    /// already shared.
    pub fn add_consume_function(
        &mut self,
        function: ConsumeFunction<E>,
    ) -> ConsumeFunctionRegister {
        self.consume_functions.push(function);
        ConsumeFunctionRegister::new(self.consume_functions.len() - 1)
    }

    pub fn build_nop(&mut self, comment: Option<&str>) {
        let s = comment.map(|c| self.intern_string(c));
        self.push(Instruction::nop(s));
    }

    pub fn build_branch(&mut self, to: AddressToken) {
        self.push(Instruction::branch(None));
        self.fixup(to);
    }

    pub fn build_cond_branch(
        &mut self,
        condition: BoolRegister,
        to: AddressToken,
    ) {
        self.push(Instruction::cond_branch(condition, None));
        self.fixup(to);
    }

    pub fn build_save(&mut self, to: AddressToken) {
        self.push(Instruction::save(None));
        self.fixup(to);
    }

    pub fn build_save_address(&mut self, to: AddressToken) {
        self.push(Instruction::save_address(None));
        self.fixup(to);
    }

    pub fn build_clear(&mut self) {
        self.push(Instruction::clear());
    }

    pub fn build_clear_through(&mut self, to: AddressToken) {
        self.push(Instruction::clear_through(None));
        self.fixup(to);
    }

    pub fn build_restore(&mut self) {
        self.push(Instruction::restore());
    }

    pub fn build_call(&mut self, to: AddressToken) {
        self.push(Instruction::call(None));
        self.fixup(to);
    }

    pub fn build_ret(&mut self) {
        self.push(Instruction::ret());
    }

    pub fn build_accept(&mut self) {
        self.push(Instruction::accept());
    }

    pub fn build_fail(&mut self) {
        self.push(Instruction::fail());
    }

    pub fn build_abort(&mut self, reason: Option<&str>) {
        let s = reason.map(|r| self.intern_string(r));
        self.push(Instruction::abort(s));
    }

    pub fn build_consume(&mut self, n: usize) {
        self.push(Instruction::consume(Distance::new(n)));
    }

    pub fn build_consume_by(&mut self, f: ConsumeFunctionRegister) {
        self.push(Instruction::consume_by(f));
    }

    pub fn build_match(&mut self, element: E) {
        let e = self.intern_element(element);
        self.push(Instruction::match_element(e));
    }

    pub fn build_match_predicate(&mut self, p: PredicateRegister) {
        self.push(Instruction::match_predicate(p));
    }

    pub fn build_assert(&mut self, element: E, condition: BoolRegister) {
        let e = self.intern_element(element);
        self.push(Instruction::assertion(condition, e));
    }

    pub fn build_move_position(&mut self, r: PositionRegister) {
        self.push(Instruction::move_position(r));
    }

    pub fn build_compare_position(
        &mut self,
        r: PositionRegister,
        condition: BoolRegister,
    ) {
        self.push(Instruction::compare_position(condition, r));
    }

    pub fn build_begin_capture(&mut self, c: CaptureRegister) {
        self.push(Instruction::begin_capture(c));
    }

    pub fn build_end_capture(&mut self, c: CaptureRegister) {
        self.push(Instruction::end_capture(c));
    }

    pub fn build_backreference(&mut self, c: CaptureRegister) {
        self.push(Instruction::backreference(c));
    }

    pub fn build_print(&mut self, message: &str) {
        let s = self.intern_string(message);
        self.push(Instruction::print(s));
    }

    /// Produces a program from the instructions emitted so far.
    ///
    /// The builder is not modified, so calling this function twice produces
    /// two identical programs.
    ///
    /// # Panics
    ///
    /// If some instruction refers to an address token that was never bound.
    pub fn assemble(&self) -> Program<E> {
        let mut instructions = self.instructions.clone();

        for (addr, token) in self.address_fixups.iter() {
            let target = self.address_tokens[token.index()].unwrap_or_else(
                || panic!("address token {} was never resolved", token),
            );
            let instr = &mut instructions[addr.index()];
            let mut operand = instr.operand();
            operand.initialize_payload(target);
            instr.set_operand(operand);
        }

        let register_info = RegisterInfo {
            elements: self.elements.len(),
            strings: self.strings.len(),
            bools: self.next_bool_register.index(),
            predicates: self.predicates.len(),
            consume_functions: self.consume_functions.len(),
            positions: self.next_position_register.index(),
            captures: self.next_capture_register.index(),
        };

        Program {
            instructions,
            static_elements: self.elements.iter().cloned().collect(),
            static_strings: self.strings.iter().cloned().collect(),
            static_predicates: self.predicates.clone(),
            static_consume_functions: self.consume_functions.clone(),
            register_info,
        }
    }
}
