use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    crate::{
        definitions::{cpu, display, keyboard, memory},
        devices::Keyboard,
        opcode::{self, Instruction, Opcode, Operation, ProgramCounter, ProgramCounterStep},
        resources::Rom,
        LoadError, MemoryError, ProcessError, StackError,
    },
    rand::{rngs::StdRng, RngCore, SeedableRng},
    tinyvec::ArrayVec,
};

/// The Machine struct represents the current state
/// of the system, it contains all the structures
/// needed for emulating an instance of the
/// Chip8 CPU.
pub struct Machine {
    /// name of the loaded rom
    pub(super) name: String,
    /// the last executed opcode, all two bytes long and stored big-endian
    pub(super) opcode: Opcode,
    /// - `0x000-0x1FF` - Chip 8 interpreter (contains font set in emu)
    /// - `0x000-0x050` - Used for the built in `4x5` pixel font set (`0-F`)
    /// - `0x200-0xFFF` - Program ROM and work RAM
    pub(super) memory: Box<[u8]>,
    /// `8-bit` data registers named `V0` to `VF`. The `VF` register doubles as a flag for some
    /// instructions; thus, it should be avoided. In an addition operation, `VF` is the carry flag,
    /// while in subtraction, it is the "no borrow" flag. In the draw instruction `VF` is set upon
    /// pixel collision.
    pub(super) registers: [u8; cpu::register::SIZE],
    /// The index for the register, this is a special register entry
    /// called index `I`
    pub(super) index_register: u16,
    /// The program counter is a CPU register in the computer processor which has the address of the
    /// next instruction to be executed from memory.
    pub(super) program_counter: u16,
    /// The stack is only used to store return addresses when subroutines are called. The original
    /// [RCA 1802](https://de.wikipedia.org/wiki/RCA1802) version allocated `48` bytes for up to
    /// `12` levels of nesting; here we are using `16`.
    pub(super) stack: ArrayVec<[u16; cpu::stack::SIZE]>,
    /// Delay timer: This timer is intended to be used for timing the events of games. Its value
    /// can be set and read. Counts down once per step, until it reaches 0.
    pub(super) delay_timer: u8,
    /// Sound timer: This timer is used for sound effects. When its value is nonzero, a beeping
    /// sound is made. Counts down once per step, until it reaches 0.
    pub(super) sound_timer: u8,
    /// The graphics of the Chip 8 are black and white and the screen has a total of `2048` pixels
    /// `(64 x 32)`, one byte holding `0` or `1` per pixel, row by row.
    pub(super) display: Box<[u8]>,
    /// Set whenever the display changed, cleared by whoever presents it.
    pub(super) redraw: bool,
    pub(super) keyboard: Keyboard,
    /// This stores the random number generator, used by the machine.
    /// It is stored into the machine, so as to enable simple mocking
    /// of the given type.
    pub(super) rng: Box<dyn RngCore + Send>,
}

/// Will allocate a zeroed buffer, reporting instead of aborting if there is no memory left.
fn allocate(size: usize) -> Result<Box<[u8]>, ProcessError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|_| ProcessError::Allocation)?;
    buffer.resize(size, 0);
    Ok(buffer.into_boxed_slice())
}

/// Seed for the random number generator, taken from the system clock.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_nanos() as u64)
        .unwrap_or_default()
}

impl Machine {
    /// will create a new machine, zeroed except for the font set
    pub fn new() -> Result<Self, ProcessError> {
        let mut memory = allocate(memory::SIZE)?;

        // load fonts
        memory[display::fontset::LOCATION
            ..(display::fontset::LOCATION + display::fontset::FONTSET.len())]
            .copy_from_slice(&display::fontset::FONTSET);

        Ok(Self {
            name: String::new(),
            opcode: 0,
            memory,
            registers: [0; cpu::register::SIZE],
            index_register: 0,
            program_counter: cpu::PROGRAM_COUNTER as u16,
            stack: ArrayVec::new(),
            delay_timer: 0,
            sound_timer: 0,
            display: allocate(display::RESOLUTION)?,
            redraw: false,
            keyboard: Keyboard::new(),
            rng: Box::new(StdRng::seed_from_u64(clock_seed())),
        })
    }

    /// Will copy the program image to the program start and reset the program counter.
    ///
    /// An image larger than the program area is refused and leaves the machine untouched.
    pub fn load(&mut self, image: &[u8]) -> Result<(), LoadError> {
        if image.len() > cpu::PROGRAM_SIZE {
            return Err(MemoryError::OutOfBounds {
                address: cpu::PROGRAM_COUNTER,
                len: image.len(),
            }
            .into());
        }

        self.memory[cpu::PROGRAM_COUNTER..(cpu::PROGRAM_COUNTER + image.len())]
            .copy_from_slice(image);
        self.program_counter = cpu::PROGRAM_COUNTER as u16;
        Ok(())
    }

    /// Will load the given rom and remember its name.
    pub fn load_rom(&mut self, rom: &Rom) -> Result<(), LoadError> {
        rom.validate()?;
        self.load(rom.get_data())?;
        self.name = rom.get_name().to_string();
        log::info!("loaded rom '{}'", self.name);
        Ok(())
    }

    /// Will read the rom at the given path and load it.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        let rom = Rom::from_path(path)?;
        self.load_rom(&rom)
    }

    /// will advance the program by a single step
    ///
    /// Ticks both timers, then fetches and executes the opcode at the program counter.
    pub fn step(&mut self) -> Result<Operation, ProcessError> {
        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }
        if self.sound_timer > 0 {
            self.sound_timer -= 1;
        }

        let opcode = opcode::build_opcode(&self.memory, self.program_counter as usize)?;
        self.execute(opcode)
    }

    /// Will decode and run the given opcode.
    ///
    /// On error the program counter is left where it was.
    pub fn execute(&mut self, opcode: Opcode) -> Result<Operation, ProcessError> {
        // import here as to not bloat the namespace
        use crate::opcode::ChipOpcodes;

        let instruction = Instruction::try_from(opcode)?;
        self.opcode = opcode;
        self.calc(instruction)
    }

    /// Will write keyboard data into interncal keyboard representation.
    pub fn set_keyboard(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keyboard.set_mult(keys);
    }

    /// Will set the value of the given key, keys outside of the keypad are ignored.
    pub fn set_key(&mut self, key: usize, to: bool) {
        self.keyboard.set_key(key, to)
    }

    /// Will get the current state of the keyboard
    pub fn get_keyboard(&self) -> &[bool] {
        self.keyboard.get_keys()
    }

    /// Will replace the random number generator, mostly useful for reproducible runs.
    pub fn set_rng(&mut self, rng: Box<dyn RngCore + Send>) {
        self.rng = rng;
    }

    /// will return the sound timer
    pub fn get_sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// will return the delay timer
    pub fn get_delay_timer(&self) -> u8 {
        self.delay_timer
    }

    /// The tone shall play as long as the sound timer is running.
    pub fn is_sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn get_registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn get_index_register(&self) -> u16 {
        self.index_register
    }

    pub fn get_program_counter(&self) -> u16 {
        self.program_counter
    }

    /// The amount of return addresses currently on the stack.
    pub fn get_stack_pointer(&self) -> usize {
        self.stack.len()
    }

    pub fn get_memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Will return the current display configuration, see
    /// [`definitions::display`](crate::definitions::display) for its layout.
    pub fn get_display(&self) -> &[u8] {
        &self.display
    }

    /// Will return if the display changed since the flag was last cleared.
    pub fn needs_redraw(&self) -> bool {
        self.redraw
    }

    pub fn clear_redraw_flag(&mut self) {
        self.redraw = false;
    }

    /// Will return and clear the redraw flag in one go.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Will push the current pointer to the stack
    pub(super) fn push_stack(&mut self, pointer: u16) -> Result<(), StackError> {
        match self.stack.try_push(pointer) {
            None => Ok(()),
            Some(_) => Err(StackError::Full),
        }
    }

    /// Will pop from the stack
    pub(super) fn pop_stack(&mut self) -> Result<u16, StackError> {
        self.stack.pop().ok_or(StackError::Empty)
    }
}

impl ProgramCounter for Machine {
    fn advance(&mut self, step: ProgramCounterStep) -> Result<(), ProcessError> {
        let pc = step.apply(self.program_counter as usize);

        // running off the end by stepping is caught by the next fetch
        if matches!(step, ProgramCounterStep::Jump(_)) && pc >= memory::SIZE {
            return Err(MemoryError::OutOfBounds {
                address: pc,
                len: memory::opcodes::SIZE,
            }
            .into());
        }

        self.program_counter = pc as u16;
        Ok(())
    }
}

/// Will create a new machine.
pub fn create() -> Result<Machine, ProcessError> {
    Machine::new()
}

/// Will release the machine held by `machine`, leaving `None` behind.
///
/// Destroying an already released machine is refused.
pub fn destroy(machine: &mut Option<Machine>) -> Result<(), ProcessError> {
    machine
        .take()
        .map(drop)
        .ok_or(ProcessError::InvalidMachine)
}

/// Will run a single opcode on the given machine.
pub fn execute(machine: Option<&mut Machine>, opcode: Opcode) -> Result<Operation, ProcessError> {
    machine
        .ok_or(ProcessError::InvalidMachine)?
        .execute(opcode)
}

/// Will run a single step on the given machine.
pub fn step(machine: Option<&mut Machine>) -> Result<Operation, ProcessError> {
    machine.ok_or(ProcessError::InvalidMachine)?.step()
}
