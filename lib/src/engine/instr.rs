/*!
This module defines the instructions executed by the backtracking VM.

Instruction encoding format
---------------------------

Every instruction is a fixed-width 64-bit word. The most significant byte
holds the [`OpCode`], and the remaining 56 bits hold the [`Operand`]:

```text
  63        56 55             40 39                                0
  +-----------+-----------------+-----------------------------------+
  |  opcode   |    condition    |              payload              |
  +-----------+-----------------+-----------------------------------+
```

Both the condition and the payload are optional. In order to distinguish an
absent value from a value of zero, they are stored biased by one, so a zero
field means "not present". The condition is the index of a boolean register,
and is used by conditional instructions like `COND_BRANCH`. The meaning of
the payload depends exclusively on the opcode: it can be an instruction
address, a distance, or the index of some register. Decoding a payload as a
kind that doesn't correspond to the opcode is a bug in the program, and
results in a panic.

For instance, `COND_BRANCH %b0 @5` is encoded as:

```text
  0x03      0x0001      0x0000000006
  opcode   condition      payload
```
 */

use std::fmt::{Display, Formatter};

use crate::engine::typed::{
    marker, BoolRegister, CaptureRegister, ConsumeFunctionRegister, Distance,
    ElementRegister, InstructionAddress, PayloadKind, PayloadMarker,
    PositionRegister, PredicateRegister, StringRegister, TypedInt,
};

/// Operation performed by an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Never encoded. An all-zeroes instruction decodes to this opcode.
    Invalid = 0,
    /// Does nothing. May carry a string used as a comment.
    Nop,
    /// Jumps to an address.
    Branch,
    /// Jumps to an address if a boolean register is set.
    CondBranch,
    /// Pushes a save point that resumes at an address, restoring the
    /// current input position.
    Save,
    /// Pushes a save point that resumes at an address, without restoring
    /// the input position.
    SaveAddress,
    /// Discards the most recent save point.
    Clear,
    /// Discards save points up to and including the most recent one that
    /// resumes at a given address.
    ClearThrough,
    /// Backtracks to the most recent save point.
    Restore,
    /// Pushes the return address and jumps to a function.
    Call,
    /// Returns from the current function.
    Ret,
    /// Ends the execution successfully.
    Accept,
    /// Backtracks to the most recent save point, or fails if there is none.
    Fail,
    /// Ends the execution with a failure, ignoring any save point.
    Abort,
    /// Advances the input position by some distance.
    Consume,
    /// Advances the input position according to a custom function.
    ConsumeBy,
    /// Matches the current element against an element register.
    Match,
    /// Matches the current element against a predicate.
    MatchPredicate,
    /// Stores in a boolean register whether the current element is equal
    /// to an element register, without consuming it.
    Assertion,
    /// Stores the current input position in a position register.
    MovePosition,
    /// Stores in a boolean register whether the current input position is
    /// equal to a position register.
    ComparePosition,
    /// Records the start of a capture group.
    BeginCapture,
    /// Records the end of a capture group.
    EndCapture,
    /// Matches the input previously captured by a capture group.
    Backreference,
    /// Emits a string for debugging purposes.
    Print,
}

impl OpCode {
    const ALL: [OpCode; 25] = [
        OpCode::Invalid,
        OpCode::Nop,
        OpCode::Branch,
        OpCode::CondBranch,
        OpCode::Save,
        OpCode::SaveAddress,
        OpCode::Clear,
        OpCode::ClearThrough,
        OpCode::Restore,
        OpCode::Call,
        OpCode::Ret,
        OpCode::Accept,
        OpCode::Fail,
        OpCode::Abort,
        OpCode::Consume,
        OpCode::ConsumeBy,
        OpCode::Match,
        OpCode::MatchPredicate,
        OpCode::Assertion,
        OpCode::MovePosition,
        OpCode::ComparePosition,
        OpCode::BeginCapture,
        OpCode::EndCapture,
        OpCode::Backreference,
        OpCode::Print,
    ];

    /// Returns the opcode corresponding to the given byte, if any.
    #[inline]
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Returns the kind of payload carried by instructions with this opcode,
    /// or [`None`] if they don't carry any.
    pub fn payload_kind(self) -> Option<PayloadKind> {
        match self {
            OpCode::Invalid
            | OpCode::Clear
            | OpCode::Restore
            | OpCode::Ret
            | OpCode::Accept
            | OpCode::Fail => None,
            OpCode::Nop | OpCode::Abort | OpCode::Print => {
                Some(PayloadKind::String)
            }
            OpCode::Branch
            | OpCode::CondBranch
            | OpCode::Save
            | OpCode::SaveAddress
            | OpCode::ClearThrough
            | OpCode::Call => Some(PayloadKind::Address),
            OpCode::Consume => Some(PayloadKind::Distance),
            OpCode::ConsumeBy => Some(PayloadKind::ConsumeFunction),
            OpCode::Match | OpCode::Assertion => Some(PayloadKind::Element),
            OpCode::MatchPredicate => Some(PayloadKind::Predicate),
            OpCode::MovePosition | OpCode::ComparePosition => {
                Some(PayloadKind::Position)
            }
            OpCode::BeginCapture
            | OpCode::EndCapture
            | OpCode::Backreference => Some(PayloadKind::Capture),
        }
    }

    /// Returns true if instructions with this opcode take a condition.
    pub fn has_condition(self) -> bool {
        matches!(
            self,
            OpCode::CondBranch | OpCode::Assertion | OpCode::ComparePosition
        )
    }

    /// Name used for this opcode in disassemblies.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Invalid => "INVALID",
            OpCode::Nop => "NOP",
            OpCode::Branch => "BRANCH",
            OpCode::CondBranch => "COND_BRANCH",
            OpCode::Save => "SAVE",
            OpCode::SaveAddress => "SAVE_ADDRESS",
            OpCode::Clear => "CLEAR",
            OpCode::ClearThrough => "CLEAR_THROUGH",
            OpCode::Restore => "RESTORE",
            OpCode::Call => "CALL",
            OpCode::Ret => "RET",
            OpCode::Accept => "ACCEPT",
            OpCode::Fail => "FAIL",
            OpCode::Abort => "ABORT",
            OpCode::Consume => "CONSUME",
            OpCode::ConsumeBy => "CONSUME_BY",
            OpCode::Match => "MATCH",
            OpCode::MatchPredicate => "MATCH_PREDICATE",
            OpCode::Assertion => "ASSERT",
            OpCode::MovePosition => "MOVE_POSITION",
            OpCode::ComparePosition => "COMPARE_POSITION",
            OpCode::BeginCapture => "BEGIN_CAPTURE",
            OpCode::EndCapture => "END_CAPTURE",
            OpCode::Backreference => "BACKREFERENCE",
            OpCode::Print => "PRINT",
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// The 56 least significant bits of an instruction. See the module
/// documentation for details about the layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Operand(u64);

impl Operand {
    /// Number of bits used by the payload.
    pub const PAYLOAD_BITS: u32 = 40;
    /// Number of bits used by the condition.
    pub const CONDITION_BITS: u32 = 16;

    const PAYLOAD_MASK: u64 = (1 << Self::PAYLOAD_BITS) - 1;
    const CONDITION_MASK: u64 =
        ((1 << Self::CONDITION_BITS) - 1) << Self::PAYLOAD_BITS;

    /// Largest value that can be stored in the payload.
    pub const MAX_PAYLOAD: u64 = Self::PAYLOAD_MASK - 1;
    /// Largest boolean register that can be used as a condition.
    pub const MAX_CONDITION: u64 = (1 << Self::CONDITION_BITS) - 2;

    /// Creates an operand with neither condition nor payload.
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Creates an operand from its raw bits.
    ///
    /// # Panics
    ///
    /// If any of the bits reserved for the opcode is set.
    pub fn from_bits(bits: u64) -> Self {
        assert_eq!(
            bits & !(Self::PAYLOAD_MASK | Self::CONDITION_MASK),
            0,
            "operand bits overlap with the opcode"
        );
        Self(bits)
    }

    /// Returns the raw bits of the operand.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Creates an operand with the given payload.
    pub fn with_payload<M: PayloadMarker>(payload: TypedInt<M>) -> Self {
        let mut operand = Self::new();
        operand.initialize_payload(payload);
        operand
    }

    /// Returns a copy of this operand with the given condition.
    pub fn with_condition(mut self, condition: BoolRegister) -> Self {
        assert!(!self.has_condition(), "condition already initialized");
        assert!(
            condition.bits() <= Self::MAX_CONDITION,
            "bool register {} doesn't fit in a condition",
            condition
        );
        self.0 |= (condition.bits() + 1) << Self::PAYLOAD_BITS;
        self
    }

    #[inline]
    pub fn has_payload(&self) -> bool {
        self.0 & Self::PAYLOAD_MASK != 0
    }

    #[inline]
    pub fn has_condition(&self) -> bool {
        self.0 & Self::CONDITION_MASK != 0
    }

    /// Stores a payload into an operand that doesn't have one yet.
    ///
    /// # Panics
    ///
    /// If the operand already has a payload, or if the value doesn't fit.
    pub fn initialize_payload<M: PayloadMarker>(
        &mut self,
        value: TypedInt<M>,
    ) {
        assert!(!self.has_payload(), "payload already initialized");
        assert!(
            value.bits() <= Self::MAX_PAYLOAD,
            "payload {} is out of range",
            value
        );
        self.0 |= value.bits() + 1;
    }

    /// Returns the payload interpreted as a handle of type `M`.
    ///
    /// # Panics
    ///
    /// If the operand doesn't have a payload.
    #[inline]
    pub fn payload<M: PayloadMarker>(&self) -> TypedInt<M> {
        assert!(self.has_payload(), "operand has no payload");
        TypedInt::from_bits((self.0 & Self::PAYLOAD_MASK) - 1)
    }

    /// Returns the condition register.
    ///
    /// # Panics
    ///
    /// If the operand doesn't have a condition.
    #[inline]
    pub fn condition(&self) -> BoolRegister {
        assert!(self.has_condition(), "operand has no condition");
        TypedInt::from_bits(
            ((self.0 & Self::CONDITION_MASK) >> Self::PAYLOAD_BITS) - 1,
        )
    }
}

/// A single VM instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(u64);

impl Instruction {
    const OPCODE_SHIFT: u32 = 56;

    /// Creates a new instruction.
    ///
    /// # Panics
    ///
    /// If `opcode` is [`OpCode::Invalid`].
    pub fn new(opcode: OpCode, operand: Operand) -> Self {
        assert_ne!(opcode, OpCode::Invalid, "can't encode an invalid opcode");
        Self(((opcode as u64) << Self::OPCODE_SHIFT) | operand.bits())
    }

    /// Creates an instruction from its raw bits.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits of the instruction.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns the instruction's opcode.
    ///
    /// # Panics
    ///
    /// If the opcode byte doesn't correspond to any known opcode.
    #[inline]
    pub fn opcode(&self) -> OpCode {
        let byte = (self.0 >> Self::OPCODE_SHIFT) as u8;
        OpCode::from_u8(byte)
            .unwrap_or_else(|| panic!("unknown opcode {:#04x}", byte))
    }

    #[inline]
    pub fn operand(&self) -> Operand {
        Operand(self.0 & ((1 << Self::OPCODE_SHIFT) - 1))
    }

    /// Replaces the instruction's operand, keeping its opcode.
    pub fn set_operand(&mut self, operand: Operand) {
        self.0 = (self.0 & !((1 << Self::OPCODE_SHIFT) - 1)) | operand.bits();
    }

    /// Returns the payload of this instruction as a handle of type `M`.
    ///
    /// # Panics
    ///
    /// If the payload kind of `M` doesn't correspond to the opcode, or if the
    /// instruction has no payload.
    #[inline]
    pub fn payload<M: PayloadMarker>(&self) -> TypedInt<M> {
        let opcode = self.opcode();
        assert_eq!(
            opcode.payload_kind(),
            Some(M::KIND),
            "{} doesn't take a {:?} payload",
            opcode,
            M::KIND,
        );
        self.operand().payload()
    }

    /// Like [`Instruction::payload`], but returns [`None`] if the payload
    /// is absent.
    pub fn optional_payload<M: PayloadMarker>(&self) -> Option<TypedInt<M>> {
        if self.operand().has_payload() {
            Some(self.payload())
        } else {
            None
        }
    }

    /// Returns the condition register.
    ///
    /// # Panics
    ///
    /// If the opcode doesn't take a condition, or if it is absent.
    #[inline]
    pub fn condition(&self) -> BoolRegister {
        let opcode = self.opcode();
        assert!(opcode.has_condition(), "{} doesn't take a condition", opcode);
        self.operand().condition()
    }

    /// Returns the target address of branch-like instructions.
    pub fn target(&self) -> Option<InstructionAddress> {
        if self.opcode().payload_kind() == Some(PayloadKind::Address) {
            self.optional_payload()
        } else {
            None
        }
    }

    /// Returns the string register of instructions that carry one.
    pub fn string(&self) -> Option<StringRegister> {
        if self.opcode().payload_kind() == Some(PayloadKind::String) {
            self.optional_payload()
        } else {
            None
        }
    }

    fn with_optional<M: PayloadMarker>(
        opcode: OpCode,
        payload: Option<TypedInt<M>>,
    ) -> Self {
        let operand = payload.map(Operand::with_payload).unwrap_or_default();
        Self::new(opcode, operand)
    }

    pub fn nop(comment: Option<StringRegister>) -> Self {
        Self::with_optional(OpCode::Nop, comment)
    }

    pub fn branch(target: Option<InstructionAddress>) -> Self {
        Self::with_optional(OpCode::Branch, target)
    }

    pub fn cond_branch(
        condition: BoolRegister,
        target: Option<InstructionAddress>,
    ) -> Self {
        let operand = target.map(Operand::with_payload).unwrap_or_default();
        Self::new(OpCode::CondBranch, operand.with_condition(condition))
    }

    pub fn save(target: Option<InstructionAddress>) -> Self {
        Self::with_optional(OpCode::Save, target)
    }

    pub fn save_address(target: Option<InstructionAddress>) -> Self {
        Self::with_optional(OpCode::SaveAddress, target)
    }

    pub fn clear() -> Self {
        Self::new(OpCode::Clear, Operand::new())
    }

    pub fn clear_through(target: Option<InstructionAddress>) -> Self {
        Self::with_optional(OpCode::ClearThrough, target)
    }

    pub fn restore() -> Self {
        Self::new(OpCode::Restore, Operand::new())
    }

    pub fn call(target: Option<InstructionAddress>) -> Self {
        Self::with_optional(OpCode::Call, target)
    }

    pub fn ret() -> Self {
        Self::new(OpCode::Ret, Operand::new())
    }

    pub fn accept() -> Self {
        Self::new(OpCode::Accept, Operand::new())
    }

    pub fn fail() -> Self {
        Self::new(OpCode::Fail, Operand::new())
    }

    pub fn abort(reason: Option<StringRegister>) -> Self {
        Self::with_optional(OpCode::Abort, reason)
    }

    pub fn consume(distance: Distance) -> Self {
        Self::new(OpCode::Consume, Operand::with_payload(distance))
    }

    pub fn consume_by(function: ConsumeFunctionRegister) -> Self {
        Self::new(OpCode::ConsumeBy, Operand::with_payload(function))
    }

    pub fn match_element(element: ElementRegister) -> Self {
        Self::new(OpCode::Match, Operand::with_payload(element))
    }

    pub fn match_predicate(predicate: PredicateRegister) -> Self {
        Self::new(OpCode::MatchPredicate, Operand::with_payload(predicate))
    }

    pub fn assertion(
        condition: BoolRegister,
        element: ElementRegister,
    ) -> Self {
        Self::new(
            OpCode::Assertion,
            Operand::with_payload(element).with_condition(condition),
        )
    }

    pub fn move_position(position: PositionRegister) -> Self {
        Self::new(OpCode::MovePosition, Operand::with_payload(position))
    }

    pub fn compare_position(
        condition: BoolRegister,
        position: PositionRegister,
    ) -> Self {
        Self::new(
            OpCode::ComparePosition,
            Operand::with_payload(position).with_condition(condition),
        )
    }

    pub fn begin_capture(capture: CaptureRegister) -> Self {
        Self::new(OpCode::BeginCapture, Operand::with_payload(capture))
    }

    pub fn end_capture(capture: CaptureRegister) -> Self {
        Self::new(OpCode::EndCapture, Operand::with_payload(capture))
    }

    pub fn backreference(capture: CaptureRegister) -> Self {
        Self::new(OpCode::Backreference, Operand::with_payload(capture))
    }

    pub fn print(message: StringRegister) -> Self {
        Self::new(OpCode::Print, Operand::with_payload(message))
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let opcode = self.opcode();
        let operand = self.operand();

        write!(f, "{}", opcode)?;

        if opcode.has_condition() && operand.has_condition() {
            write!(f, " {}", operand.condition())?;
        }

        if !operand.has_payload() {
            return Ok(());
        }

        use marker as m;

        match opcode.payload_kind() {
            Some(PayloadKind::Address) => {
                write!(f, " {}", self.payload::<m::InstructionAddress>())
            }
            Some(PayloadKind::Distance) => {
                write!(f, " {}", self.payload::<m::Distance>())
            }
            Some(PayloadKind::Element) => {
                write!(f, " {}", self.payload::<m::ElementRegister>())
            }
            Some(PayloadKind::String) => {
                write!(f, " {}", self.payload::<m::StringRegister>())
            }
            Some(PayloadKind::Predicate) => {
                write!(f, " {}", self.payload::<m::PredicateRegister>())
            }
            Some(PayloadKind::ConsumeFunction) => {
                let function = self.payload::<m::ConsumeFunctionRegister>();
                write!(f, " {}", function)
            }
            Some(PayloadKind::Position) => {
                write!(f, " {}", self.payload::<m::PositionRegister>())
            }
            Some(PayloadKind::Capture) => {
                write!(f, " {}", self.payload::<m::CaptureRegister>())
            }
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

