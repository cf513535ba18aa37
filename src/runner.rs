use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{
    chip8::Machine,
    definitions::cpu,
    devices::{DisplayCommands, KeyboardCommands},
    opcode::Operation,
    ProcessError,
};

#[derive(Debug, PartialEq, Clone, Copy)]
/// The outcome of a single tick of the [`Runner`].
pub enum RunState {
    /// The machine ran a step and returned the given operation.
    Running(Operation),
    /// The host asked to stop, the machine was not touched.
    Stopped,
}

/// Drives a [`Machine`], feeding it input and presenting its output.
///
/// The machine itself never blocks or sleeps, pacing and the halting
/// policy on errors are left to the runner.
pub struct Runner<D, K>
where
    D: DisplayCommands,
    K: KeyboardCommands,
{
    display: D,
    keyboard: K,
    interval: Duration,
    /// the last sound state forwarded to the display
    sound: bool,
}

impl<D, K> Runner<D, K>
where
    D: DisplayCommands,
    K: KeyboardCommands,
{
    pub fn new(display: D, keyboard: K) -> Self {
        Self {
            display,
            keyboard,
            interval: Duration::from_millis(cpu::INTERVAL),
            sound: false,
        }
    }

    /// Will set the time between two steps.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn get_interval(&self) -> Duration {
        self.interval
    }

    /// Will poll the input, run a single step and present the result.
    pub fn tick(&mut self, machine: &mut Machine) -> Result<RunState, ProcessError> {
        let keys = match self.keyboard.poll() {
            Some(keys) => keys,
            None => return Ok(RunState::Stopped),
        };
        machine.set_keyboard(&keys);

        let operation = machine.step()?;

        if machine.take_redraw() {
            self.display.display(machine.get_display());
        }

        let sound = machine.is_sound_active();
        if sound != self.sound {
            log::debug!("sound turned {}", if sound { "on" } else { "off" });
            self.sound = sound;
            self.display.sound(sound);
        }

        Ok(RunState::Running(operation))
    }

    /// Will tick the machine at the configured interval until the host stops it.
    ///
    /// The first error halts the machine and is returned.
    pub fn run(&mut self, machine: &mut Machine) -> Result<(), ProcessError> {
        log::info!(
            "running '{}' every {:?}",
            machine.get_name(),
            self.interval
        );

        loop {
            let start = Instant::now();

            match self.tick(machine) {
                Ok(RunState::Running(_)) => {}
                Ok(RunState::Stopped) => break,
                Err(err) => {
                    log::error!(
                        "halting at {:#06X} after an error: {}",
                        machine.get_program_counter(),
                        err
                    );
                    self.silence();
                    return Err(err);
                }
            }

            if let Some(remaining) = self.interval.checked_sub(start.elapsed()) {
                thread::sleep(remaining);
            }
        }

        log::info!("stopped by the host");
        self.silence();
        Ok(())
    }

    /// Will make sure the tone does not outlive the run.
    fn silence(&mut self) {
        if self.sound {
            self.sound = false;
            self.display.sound(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::{predicate::eq, Sequence};

    use super::*;
    use crate::{
        definitions::{display, keyboard},
        devices::{MockDisplayCommands, MockKeyboardCommands},
        resources::Rom,
        OpcodeError,
    };

    const NO_KEYS: [bool; keyboard::SIZE] = [false; keyboard::SIZE];

    fn get_machine(program: &[u8]) -> Machine {
        let mut machine = Machine::new().unwrap();
        machine.load_rom(&Rom::new("TEST", program)).unwrap();
        machine
    }

    fn get_runner(
        display: MockDisplayCommands,
        keyboard: MockKeyboardCommands,
    ) -> Runner<MockDisplayCommands, MockKeyboardCommands> {
        Runner::new(display, keyboard).with_interval(Duration::from_millis(0))
    }

    #[test]
    fn test_default_interval() {
        let runner = Runner::new(MockDisplayCommands::new(), MockKeyboardCommands::new());
        assert_eq!(Duration::from_millis(2), runner.get_interval());
    }

    #[test]
    fn test_tick_stopped() {
        let mut keyboard = MockKeyboardCommands::new();
        keyboard.expect_poll().times(1).returning(|| None);
        let mut display = MockDisplayCommands::new();
        display.expect_display().never();

        let mut machine = get_machine(&[0x00, 0xE0]);
        let mut runner = get_runner(display, keyboard);

        assert_eq!(Ok(RunState::Stopped), runner.tick(&mut machine));
        assert_eq!(0x200, machine.get_program_counter());
    }

    #[test]
    fn test_tick_draws_on_redraw() {
        let mut keyboard = MockKeyboardCommands::new();
        keyboard.expect_poll().times(2).returning(|| Some(NO_KEYS));

        let mut display = MockDisplayCommands::new();
        // only the clear changes the display
        display
            .expect_display()
            .withf(|pixels| pixels.len() == display::RESOLUTION && pixels.iter().all(|&p| p == 0))
            .times(1)
            .return_const(());
        display.expect_sound().never();

        // 00E0 6005
        let mut machine = get_machine(&[0x00, 0xE0, 0x60, 0x05]);
        let mut runner = get_runner(display, keyboard);

        assert_eq!(
            Ok(RunState::Running(Operation::Draw)),
            runner.tick(&mut machine)
        );
        assert!(!machine.needs_redraw());
        assert_eq!(
            Ok(RunState::Running(Operation::None)),
            runner.tick(&mut machine)
        );
    }

    #[test]
    fn test_tick_forwards_keys() {
        let mut keys = NO_KEYS;
        keys[0x7] = true;

        let mut keyboard = MockKeyboardCommands::new();
        keyboard.expect_poll().times(1).returning(move || Some(keys));

        // F00A
        let mut machine = get_machine(&[0xF0, 0x0A]);
        let mut runner = get_runner(MockDisplayCommands::new(), keyboard);

        assert_eq!(
            Ok(RunState::Running(Operation::None)),
            runner.tick(&mut machine)
        );
        assert_eq!(&keys[..], machine.get_keyboard());
        assert_eq!(0x7, machine.get_registers()[0]);
    }

    #[test]
    fn test_tick_sound_transitions() {
        let mut keyboard = MockKeyboardCommands::new();
        keyboard.expect_poll().times(4).returning(|| Some(NO_KEYS));

        let mut seq = Sequence::new();
        let mut display = MockDisplayCommands::new();
        display
            .expect_sound()
            .with(eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        display
            .expect_sound()
            .with(eq(false))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        // 6002 F018 6000 6000
        let mut machine = get_machine(&[0x60, 0x02, 0xF0, 0x18, 0x60, 0x00, 0x60, 0x00]);
        let mut runner = get_runner(display, keyboard);

        for _ in 0..4 {
            assert!(runner.tick(&mut machine).is_ok());
        }
        assert_eq!(0, machine.get_sound_timer());
    }

    #[test]
    fn test_run_until_stopped() {
        let mut polls = 0;
        let mut keyboard = MockKeyboardCommands::new();
        keyboard.expect_poll().times(4).returning(move || {
            polls += 1;
            if polls < 4 {
                Some(NO_KEYS)
            } else {
                None
            }
        });

        let mut machine = get_machine(&[0x60, 0x05, 0x61, 0x05, 0x80, 0x14]);
        let mut runner = get_runner(MockDisplayCommands::new(), keyboard);

        assert_eq!(Ok(()), runner.run(&mut machine));
        assert_eq!(10, machine.get_registers()[0]);
        assert_eq!(0x206, machine.get_program_counter());
    }

    #[test]
    fn test_run_halts_on_error() {
        let mut keyboard = MockKeyboardCommands::new();
        keyboard.expect_poll().times(3).returning(|| Some(NO_KEYS));

        // the tone is stopped when halting
        let mut display = MockDisplayCommands::new();
        display.expect_sound().with(eq(true)).times(1).return_const(());
        display.expect_sound().with(eq(false)).times(1).return_const(());

        // 6010 F018 5001
        let mut machine = get_machine(&[0x60, 0x10, 0xF0, 0x18, 0x50, 0x01]);
        let mut runner = get_runner(display, keyboard);

        assert_eq!(
            Err(ProcessError::Opcode(OpcodeError::InvalidOpcode(0x5001))),
            runner.run(&mut machine)
        );
        assert_eq!(0x204, machine.get_program_counter());
    }
}
