//! Opcode abstractions, decoding and the dispatch table.
use crate::{definitions::memory, OpcodeError, ProcessError};

/// the base mask used for generating all the other sub masks
pub(crate) const OPCODE_MASK_FFFF: u16 = u16::MAX;

/// the mask for the first twelve bits
pub(crate) const OPCODE_MASK_FFF0: u16 = OPCODE_MASK_FFFF << 4;

/// the mask for the first eight bits
pub(crate) const OPCODE_MASK_FF00: u16 = OPCODE_MASK_FFFF << 8;

/// the mask for the first four bits
pub(crate) const OPCODE_MASK_F000: u16 = OPCODE_MASK_FFFF << 12;

/// the mask for the last four bits
pub(crate) const OPCODE_MASK_000F: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FFF0;

/// the mask for the last eight bits
pub(crate) const OPCODE_MASK_00FF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FF00;

/// the mask for the last twelve bits
pub(crate) const OPCODE_MASK_0FFF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_F000;

/// the size of a nibble in bits
const NIBBLE: u16 = 0x4;

/// a wrapper type for u16 to make it clear what is meant to be used
pub type Opcode = u16;

/// will build an opcode from data and the given point
/// # Arguments
///
/// - `data` - A slice of u8 data entries used to generate the opcodes
/// - `pointer` - Where in the data the opcode shall be extracted, so `pointer` and `pointer + 1` make
/// the opcode up
///
/// # Example
/// ```rust
/// # use chip::opcode::*;
/// # use chip::OpcodeError;
///  const OPCODES: [Opcode; 2] = [0x00EE, 0x1EDA];
///  const SPLIT_OPCODE: [u8; 4] = [0x00, 0xEE, 0x1E, 0xDA];
///  for (i, val) in OPCODES.iter().enumerate() {
///      let opcode = build_opcode(&SPLIT_OPCODE, i * 2).expect("This will work.");
///      assert_eq!(opcode, *val);
///  }
/// # let pointer = 3;
/// # assert_eq!(
/// #    Err(OpcodeError::MemoryInvalid { pointer, len: SPLIT_OPCODE.len() }),
/// #    build_opcode(&SPLIT_OPCODE, pointer)
/// # );
/// ```
pub fn build_opcode(data: &[u8], pointer: usize) -> Result<Opcode, OpcodeError> {
    // controlling that there is no illegal access here
    if pointer + 1 < data.len() {
        Ok(Opcode::from_be_bytes([data[pointer], data[pointer + 1]]))
    } else {
        Err(OpcodeError::MemoryInvalid {
            pointer,
            len: data.len(),
        })
    }
}

/// Field extractors for the four nibbles of an opcode.
pub trait OpcodeTrait {
    /// the top nibble, selecting the opcode family
    /// - `T` in `TNNN`
    fn t(&self) -> u8;

    /// the lowest twelve bits, an address
    /// - `NNN` in `TNNN`
    fn nnn(&self) -> u16;

    /// register index and byte constant
    /// - `X` and `NN` in `TXNN`
    fn xnn(&self) -> (usize, u8);

    /// two register indices and the lowest nibble
    /// - `X`, `Y` and `N` in `TXYN`
    fn xyn(&self) -> (usize, usize, u8);

    /// the register index in the second nibble
    /// - `X` in `TXTT`
    fn x(&self) -> usize;
}

impl OpcodeTrait for Opcode {
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.t(), 0x1);
    /// ```
    fn t(&self) -> u8 {
        ((self & OPCODE_MASK_F000) >> (3 * NIBBLE)) as u8
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.nnn(), 0xEDA)
    /// ```
    fn nnn(&self) -> u16 {
        self & OPCODE_MASK_0FFF
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.xnn(), (0xE, 0xDA));
    /// ```
    fn xnn(&self) -> (usize, u8) {
        (self.x(), (self & OPCODE_MASK_00FF) as u8)
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.xyn(), (0xE, 0xD, 0xA));
    /// ```
    fn xyn(&self) -> (usize, usize, u8) {
        const MASK: u16 = OPCODE_MASK_00FF ^ OPCODE_MASK_000F;
        let y = ((self & MASK) >> NIBBLE) as usize;
        let n = (self & OPCODE_MASK_000F) as u8;
        (self.x(), y, n)
    }

    fn x(&self) -> usize {
        ((self & OPCODE_MASK_0FFF & OPCODE_MASK_FF00) >> (2 * NIBBLE)) as usize
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents the program steps that the chip
/// can take.
pub enum ProgramCounterStep {
    /// Will not change the program counter
    None,
    /// Will move the program counter to the next opcode
    Next,
    /// Will skip the next opcode
    Skip,
    /// Will simply move the program counter to the given location.
    Jump(u16),
}

impl ProgramCounterStep {
    /// Will return a Skip if the condition is true.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next, ProgramCounterStep::cond(false));
    /// assert_eq!(ProgramCounterStep::Skip, ProgramCounterStep::cond(true));
    /// ```
    #[inline]
    pub fn cond(cond: bool) -> Self {
        if cond {
            ProgramCounterStep::Skip
        } else {
            ProgramCounterStep::Next
        }
    }

    /// Will calculate the new program counter starting from `pc`.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(0x202, ProgramCounterStep::Next.apply(0x200));
    /// assert_eq!(0x204, ProgramCounterStep::Skip.apply(0x200));
    /// assert_eq!(0x340, ProgramCounterStep::Jump(0x340).apply(0x200));
    /// ```
    #[inline]
    pub fn apply(&self, pc: usize) -> usize {
        match *self {
            ProgramCounterStep::None => pc,
            ProgramCounterStep::Next => pc + memory::opcodes::SIZE,
            ProgramCounterStep::Skip => pc + 2 * memory::opcodes::SIZE,
            ProgramCounterStep::Jump(pointer) => pointer as usize,
        }
    }
}

/// Generates a sub opcode enum and its conversion from the selecting field.
macro_rules! sub_opcodes {
    (
        $(#[$meta:meta])*
        $name:ident : $from:ty {
            $( $(#[$vmeta:meta])* $key:literal => $variant:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl TryFrom<$from> for $name {
            type Error = ();

            fn try_from(value: $from) -> Result<Self, Self::Error> {
                match value {
                    $( $key => Ok($name::$variant), )+
                    _ => Err(()),
                }
            }
        }
    };
}

sub_opcodes!(
    /// The `0NNN` opcodes this machine understands.
    SystemOpcode : Opcode {
        /// `00E0` - clears the screen
        0x00E0 => Clear,
        /// `00EE` - returns from a subroutine
        0x00EE => Return,
    }
);

sub_opcodes!(
    /// The register to register operations of the `8XYN` family, selected by `N`.
    ArithmeticOpcode : u8 {
        /// `8XY0` - `Vx = Vy`
        0x0 => Assign,
        /// `8XY1` - `Vx |= Vy`
        0x1 => Or,
        /// `8XY2` - `Vx &= Vy`
        0x2 => And,
        /// `8XY3` - `Vx ^= Vy`
        0x3 => Xor,
        /// `8XY4` - `Vx += Vy`, `VF` is the carry
        0x4 => Add,
        /// `8XY5` - `Vx -= Vy`, `VF` is set if `Vx > Vy`
        0x5 => Sub,
        /// `8XY6` - `Vx >>= 1`, `VF` is the shifted out bit
        0x6 => ShiftRight,
        /// `8XY7` - `Vx = Vy - Vx`, `VF` is set if `Vy > Vx`
        0x7 => SubN,
        /// `8XYE` - `Vx <<= 1`, `VF` is the shifted out bit
        0xE => ShiftLeft,
    }
);

sub_opcodes!(
    /// The keypad opcodes of the `EXNN` family, selected by `NN`.
    KeyOpcode : u8 {
        /// `EX9E` - skip if the key in `Vx` is pressed
        0x9E => Pressed,
        /// `EXA1` - skip if the key in `Vx` is not pressed
        0xA1 => NotPressed,
    }
);

sub_opcodes!(
    /// The timer, keypad and memory opcodes of the `FXNN` family, selected by `NN`.
    MiscOpcode : u8 {
        /// `FX07` - `Vx = delay timer`
        0x07 => GetDelayTimer,
        /// `FX0A` - `Vx = first pressed key`, waits until there is one
        0x0A => AwaitKeyPress,
        /// `FX15` - `delay timer = Vx`
        0x15 => SetDelayTimer,
        /// `FX18` - `sound timer = Vx`
        0x18 => SetSoundTimer,
        /// `FX1E` - `I += Vx`
        0x1E => AddVxToI,
        /// `FX29` - `I = glyph address of Vx`
        0x29 => SetIToSprite,
        /// `FX33` - `memory[I..I+3] = BCD(Vx)`
        0x33 => StoreBCD,
        /// `FX55` - `memory[I..=I+x] = V0..=Vx`
        0x55 => StoreV0ToVx,
        /// `FX65` - `V0..=Vx = memory[I..=I+x]`
        0x65 => FillV0ToVx,
    }
);

/// The comparisons used by the skip opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// `3XNN` - `Vx == NN`
    EqualConst { x: usize, nn: u8 },
    /// `4XNN` - `Vx != NN`
    NotEqualConst { x: usize, nn: u8 },
    /// `5XY0` - `Vx == Vy`
    EqualRegister { x: usize, y: usize },
    /// `9XY0` - `Vx != Vy`
    NotEqualRegister { x: usize, y: usize },
}

/// A fully decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    System(SystemOpcode),
    Jump { nnn: u16 },
    Call { nnn: u16 },
    Skip(Condition),
    LoadConst { x: usize, nn: u8 },
    AddConst { x: usize, nn: u8 },
    Arithmetic { ops: ArithmeticOpcode, x: usize, y: usize },
    SetIndex { nnn: u16 },
    JumpOffset { nnn: u16 },
    Random { x: usize, nn: u8 },
    Draw { x: usize, y: usize, n: usize },
    Key { ops: KeyOpcode, x: usize },
    Misc { ops: MiscOpcode, x: usize },
}

impl TryFrom<Opcode> for Instruction {
    type Error = OpcodeError;

    fn try_from(value: Opcode) -> Result<Self, Self::Error> {
        let invalid = |_| OpcodeError::InvalidOpcode(value);

        let nnn = value.nnn();
        let (x, nn) = value.xnn();
        let (_, y, n) = value.xyn();

        let res = match value.t() {
            0x0 => Instruction::System(value.try_into().map_err(invalid)?),
            0x1 => Instruction::Jump { nnn },
            0x2 => Instruction::Call { nnn },
            0x3 => Instruction::Skip(Condition::EqualConst { x, nn }),
            0x4 => Instruction::Skip(Condition::NotEqualConst { x, nn }),
            0x5 if n == 0 => Instruction::Skip(Condition::EqualRegister { x, y }),
            0x6 => Instruction::LoadConst { x, nn },
            0x7 => Instruction::AddConst { x, nn },
            0x8 => Instruction::Arithmetic {
                ops: n.try_into().map_err(invalid)?,
                x,
                y,
            },
            0x9 if n == 0 => Instruction::Skip(Condition::NotEqualRegister { x, y }),
            0xA => Instruction::SetIndex { nnn },
            0xB => Instruction::JumpOffset { nnn },
            0xC => Instruction::Random { x, nn },
            0xD => Instruction::Draw {
                x,
                y,
                n: n as usize,
            },
            0xE => Instruction::Key {
                ops: nn.try_into().map_err(invalid)?,
                x,
            },
            0xF => Instruction::Misc {
                ops: nn.try_into().map_err(invalid)?,
                x,
            },
            // 5XYN and 9XYN with N != 0
            _ => return Err(OpcodeError::InvalidOpcode(value)),
        };
        Ok(res)
    }
}

/// Moves the program counter after an instruction ran.
pub trait ProgramCounter {
    /// will move the program counter by the given step, refusing
    /// jumps outside of memory.
    fn advance(&mut self, step: ProgramCounterStep) -> Result<(), ProcessError>;
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents a command from the interpreter up to the driver.
pub enum Operation {
    /// If no action has to be taken.
    None,
    /// The machine waits for the next key press
    Wait,
    /// The display changed and has to be redrawn
    Draw,
}

/// The instruction table. Every handler returns how the program counter
/// has to move; handlers that fail leave the counter where it was.
///
/// Requires [`ProgramCounter`](ProgramCounter) for applying the returned step.
pub trait ChipOpcodes: ProgramCounter {
    /// will run a single decoded instruction
    fn calc(&mut self, instruction: Instruction) -> Result<Operation, ProcessError> {
        let mut operation = Operation::None;
        let mut step_op = |(step, op): (ProgramCounterStep, Operation)| {
            operation = op;
            step
        };

        let step = match instruction {
            Instruction::System(ops) => self.system(ops).map(&mut step_op),
            Instruction::Jump { nnn } => self.jump(nnn),
            Instruction::Call { nnn } => self.call(nnn),
            Instruction::Skip(condition) => self.skip(condition),
            Instruction::LoadConst { x, nn } => self.load_const(x, nn),
            Instruction::AddConst { x, nn } => self.add_const(x, nn),
            Instruction::Arithmetic { ops, x, y } => self.arithmetic(ops, x, y),
            Instruction::SetIndex { nnn } => self.set_index(nnn),
            Instruction::JumpOffset { nnn } => self.jump_offset(nnn),
            Instruction::Random { x, nn } => self.random(x, nn),
            Instruction::Draw { x, y, n } => self.draw(x, y, n).map(&mut step_op),
            Instruction::Key { ops, x } => self.key(ops, x),
            Instruction::Misc { ops, x } => self.misc(ops, x).map(&mut step_op),
        }?;

        self.advance(step)?;
        Ok(operation)
    }

    /// - `00E0` - Display  - `disp_clear()`        - Clears the screen.
    /// - `00EE` - Flow     - `return;`             - Returns from a subroutine.
    ///
    /// `0NNN` (call RCA 1802 code) is not supported.
    fn system(
        &mut self,
        ops: SystemOpcode,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError>;

    /// - `1NNN` - Flow     - `goto NNN;`           - Jumps to address `NNN`.
    fn jump(&self, nnn: u16) -> Result<ProgramCounterStep, ProcessError>;

    /// - `2NNN` - Flow     - `*(0xNNN)()`          - Calls subroutine at `NNN`.
    fn call(&mut self, nnn: u16) -> Result<ProgramCounterStep, ProcessError>;

    /// - `3XNN` - Cond     - `if(Vx==NN)`          - Skips the next instruction if `VX` equals `NN`.
    /// - `4XNN` - Cond     - `if(Vx!=NN)`          - Skips the next instruction if `VX` doesn't equal `NN`.
    /// - `5XY0` - Cond     - `if(Vx==Vy)`          - Skips the next instruction if `VX` equals `VY`.
    /// - `9XY0` - Cond     - `if(Vx!=Vy)`          - Skips the next instruction if `VX` doesn't equal `VY`.
    fn skip(&self, condition: Condition) -> Result<ProgramCounterStep, ProcessError>;

    /// - `6XNN` - Const    - `Vx = NN`             - Sets `VX` to `NN`.
    fn load_const(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `7XNN` - Const    - `Vx += NN`            - Adds `NN` to `VX`. (Carry flag is not changed)
    fn add_const(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `8XY0` - Assign   - `Vx=Vy`               - Sets `VX` to the value of `VY`.
    /// - `8XY1` - BitOp    - `Vx=Vx|Vy`            - Sets `VX` to `VX` or `VY`.
    /// - `8XY2` - BitOp    - `Vx=Vx&Vy`            - Sets `VX` to `VX` and `VY`.
    /// - `8XY3` - BitOp    - `Vx=Vx^Vy`            - Sets `VX` to `VX` xor `VY`.
    /// - `8XY4` - Math     - `Vx += Vy`            - Adds `VY` to `VX`. `VF` is set to `1` when there's a carry, and to `0` when there isn't.
    /// - `8XY5` - Math     - `Vx -= Vy`            - `VY` is subtracted from `VX`. `VF` is set to `1` when `VX > VY`, else `0`.
    /// - `8XY6` - BitOp    - `Vx>>=1`              - Stores the least significant bit of `VX` in `VF` and then shifts `VX` to the right by `1`.
    /// - `8XY7` - Math     - `Vx=Vy-Vx`            - Sets `VX` to `VY` minus `VX`. `VF` is set to `1` when `VY > VX`, else `0`.
    /// - `8XYE` - BitOp    - `Vx<<=1`              - Stores the most significant bit of `VX` in `VF` and then shifts `VX` to the left by `1`.
    fn arithmetic(
        &mut self,
        ops: ArithmeticOpcode,
        x: usize,
        y: usize,
    ) -> Result<ProgramCounterStep, ProcessError>;

    /// - `ANNN` - MEM      - `I = NNN`             - Sets `I` to the address `NNN`.
    fn set_index(&mut self, nnn: u16) -> Result<ProgramCounterStep, ProcessError>;

    /// - `BNNN` - Flow     - `PC=V0+NNN`           - Jumps to the address `NNN` plus `V0`.
    fn jump_offset(&self, nnn: u16) -> Result<ProgramCounterStep, ProcessError>;

    /// - `CXNN` - Rand     - `Vx=rand()&NN`        - Sets `VX` to a random byte and `NN`.
    fn random(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError>;

    /// - `DXYN` - Disp     - `draw(Vx,Vy,N)`       - XORs an `8xN` sprite from `I` onto the screen
    /// at `(VX, VY)`, wrapping on both axes. `VF` is set to `1` if any pixel was cleared.
    fn draw(
        &mut self,
        x: usize,
        y: usize,
        n: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError>;

    /// - `EX9E` - KeyOp    - `if(key()==Vx)`       - Skips the next instruction if the key stored in `VX` is pressed.
    /// - `EXA1` - KeyOp    - `if(key()!=Vx)`       - Skips the next instruction if the key stored in `VX` isn't pressed.
    fn key(&self, ops: KeyOpcode, x: usize) -> Result<ProgramCounterStep, ProcessError>;

    /// - `FX07` - Timer    - `Vx = get_delay()`    - Sets `VX` to the value of the delay timer.
    /// - `FX0A` - KeyOp    - `Vx = get_key()`      - Stores the first pressed key in `VX`, repeats itself while none is.
    /// - `FX15` - Timer    - `delay_timer(Vx)`     - Sets the delay timer to `VX`.
    /// - `FX18` - Sound    - `sound_timer(Vx)`     - Sets the sound timer to `VX`.
    /// - `FX1E` - MEM      - `I +=Vx`              - Adds `VX` to `I`. `VF` is not affected.
    /// - `FX29` - MEM      - `I=sprite_addr[Vx]`   - Sets `I` to the location of the font glyph for `VX`.
    /// - `FX33` - BCD      - `set_BCD(Vx)`         - Stores the hundreds, tens and ones of `VX` at `I`, `I+1` and `I+2`.
    /// - `FX55` - MEM      - `reg_dump(Vx,&I)`     - Stores `V0` to `VX` (including `VX`) in memory starting at address `I`.
    /// - `FX65` - MEM      - `reg_load(Vx,&I)`     - Fills `V0` to `VX` (including `VX`) with values from memory starting at address `I`.
    fn misc(
        &mut self,
        ops: MiscOpcode,
        x: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError>;
}
