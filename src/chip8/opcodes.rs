use crate::{
    definitions::{cpu, display, memory},
    opcode::{
        ArithmeticOpcode, ChipOpcodes, Condition, KeyOpcode, MiscOpcode, Operation,
        ProgramCounterStep, SystemOpcode,
    },
    MemoryError, ProcessError, StackError,
};

use super::Machine;

/// The random byte is reduced modulo `0xFF`, so `0xFF` itself is never produced.
const RANDOM_MODULO: u32 = 0xFF;

#[inline]
fn out_of_bounds(address: usize, len: usize) -> MemoryError {
    MemoryError::OutOfBounds { address, len }
}

impl ChipOpcodes for Machine {
    fn system(
        &mut self,
        ops: SystemOpcode,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        match ops {
            SystemOpcode::Clear => {
                // 00E0
                // clear display
                self.display.fill(0);
                self.redraw = true;
                Ok((ProgramCounterStep::Next, Operation::Draw))
            }
            SystemOpcode::Return => {
                // 00EE
                // Return from sub routine => pop from stack and continue after the call
                let pc = *self.stack.last().ok_or(StackError::Empty)?;
                let next = pc as usize + memory::opcodes::SIZE;
                if next >= memory::SIZE {
                    return Err(out_of_bounds(next, memory::opcodes::SIZE).into());
                }
                self.pop_stack()?;
                Ok((ProgramCounterStep::Jump(next as u16), Operation::None))
            }
        }
    }

    fn jump(&self, nnn: u16) -> Result<ProgramCounterStep, ProcessError> {
        // 1NNN
        Ok(ProgramCounterStep::Jump(nnn))
    }

    fn call(&mut self, nnn: u16) -> Result<ProgramCounterStep, ProcessError> {
        // 2NNN
        // the address of the call itself is stored, the return moves past it
        self.push_stack(self.program_counter)?;
        Ok(ProgramCounterStep::Jump(nnn))
    }

    fn skip(&self, condition: Condition) -> Result<ProgramCounterStep, ProcessError> {
        let cond = match condition {
            Condition::EqualConst { x, nn } => self.registers[x] == nn,
            Condition::NotEqualConst { x, nn } => self.registers[x] != nn,
            Condition::EqualRegister { x, y } => self.registers[x] == self.registers[y],
            Condition::NotEqualRegister { x, y } => self.registers[x] != self.registers[y],
        };
        Ok(ProgramCounterStep::cond(cond))
    }

    fn load_const(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        // 6XNN
        self.registers[x] = nn;
        Ok(ProgramCounterStep::Next)
    }

    fn add_const(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        // 7XNN
        // let VX overflow, but ignore carry
        self.registers[x] = self.registers[x].wrapping_add(nn);
        Ok(ProgramCounterStep::Next)
    }

    fn arithmetic(
        &mut self,
        ops: ArithmeticOpcode,
        x: usize,
        y: usize,
    ) -> Result<ProgramCounterStep, ProcessError> {
        let vx = self.registers[x];
        let vy = self.registers[y];

        let (res, flag) = match ops {
            ArithmeticOpcode::Assign => (vy, None),
            ArithmeticOpcode::Or => (vx | vy, None),
            ArithmeticOpcode::And => (vx & vy, None),
            ArithmeticOpcode::Xor => (vx ^ vy, None),
            ArithmeticOpcode::Add => {
                let (res, carry) = vx.overflowing_add(vy);
                (res, Some(u8::from(carry)))
            }
            // not borrow, equal values count as a borrow
            ArithmeticOpcode::Sub => (vx.wrapping_sub(vy), Some(u8::from(vx > vy))),
            ArithmeticOpcode::ShiftRight => (vx >> 1, Some(vx & 0x01)),
            ArithmeticOpcode::SubN => (vy.wrapping_sub(vx), Some(u8::from(vy > vx))),
            ArithmeticOpcode::ShiftLeft => (vx << 1, Some(vx >> 7)),
        };

        if let Some(flag) = flag {
            self.registers[cpu::register::LAST] = flag;
        }
        // the result wins if VF is the destination as well
        self.registers[x] = res;
        Ok(ProgramCounterStep::Next)
    }

    fn set_index(&mut self, nnn: u16) -> Result<ProgramCounterStep, ProcessError> {
        // ANNN
        self.index_register = nnn;
        Ok(ProgramCounterStep::Next)
    }

    fn jump_offset(&self, nnn: u16) -> Result<ProgramCounterStep, ProcessError> {
        // BNNN
        Ok(ProgramCounterStep::Jump(nnn + u16::from(self.registers[0])))
    }

    fn random(&mut self, x: usize, nn: u8) -> Result<ProgramCounterStep, ProcessError> {
        // CXNN
        let rand = (self.rng.next_u32() % RANDOM_MODULO) as u8;
        self.registers[x] = rand & nn;
        Ok(ProgramCounterStep::Next)
    }

    fn draw(
        &mut self,
        x: usize,
        y: usize,
        n: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        // DXYN
        // see https://tobiasvl.github.io/blog/write-a-chip-8-emulator/
        let index = self.index_register as usize;
        let sprite = self
            .memory
            .get(index..(index + n))
            .ok_or_else(|| out_of_bounds(index, n))?;

        let coorx = self.registers[x] as usize;
        let coory = self.registers[y] as usize;

        let mut collision = false;

        for (i, row) in sprite.iter().enumerate() {
            let py = (coory + i) % display::HEIGHT;

            for j in 0..display::SPRITE_WIDTH {
                let mask = 0x80 >> j;
                if row & mask == 0 {
                    continue;
                }

                let px = (coorx + j) % display::WIDTH;
                let pixel = &mut self.display[py * display::WIDTH + px];

                // a set pixel turned off
                collision |= *pixel == 1;
                *pixel ^= 1;
            }
        }

        self.registers[cpu::register::LAST] = u8::from(collision);
        self.redraw = true;

        Ok((ProgramCounterStep::Next, Operation::Draw))
    }

    fn key(&self, ops: KeyOpcode, x: usize) -> Result<ProgramCounterStep, ProcessError> {
        let key = self.registers[x];
        let pressed = self
            .keyboard
            .is_pressed(key as usize)
            .ok_or(ProcessError::KeyOutOfBounds(key))?;

        let cond = match ops {
            // EX9E
            KeyOpcode::Pressed => pressed,
            // EXA1
            KeyOpcode::NotPressed => !pressed,
        };
        Ok(ProgramCounterStep::cond(cond))
    }

    fn misc(
        &mut self,
        ops: MiscOpcode,
        x: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        let index = self.index_register as usize;

        match ops {
            MiscOpcode::GetDelayTimer => {
                // FX07
                self.registers[x] = self.delay_timer;
            }
            MiscOpcode::AwaitKeyPress => {
                // FX0A
                // without a key the counter stays, so this opcode is fetched again next step
                match self.keyboard.first_pressed() {
                    Some(key) => self.registers[x] = key as u8,
                    None => return Ok((ProgramCounterStep::None, Operation::Wait)),
                }
            }
            MiscOpcode::SetDelayTimer => {
                // FX15
                self.delay_timer = self.registers[x];
            }
            MiscOpcode::SetSoundTimer => {
                // FX18
                self.sound_timer = self.registers[x];
            }
            MiscOpcode::AddVxToI => {
                // FX1E
                // VF is not affected
                self.index_register = self
                    .index_register
                    .wrapping_add(u16::from(self.registers[x]));
            }
            MiscOpcode::SetIToSprite => {
                // FX29
                let glyph = self.registers[x] as usize;
                self.index_register =
                    (display::fontset::LOCATION + glyph * display::fontset::GLYPH_SIZE) as u16;
            }
            MiscOpcode::StoreBCD => {
                // FX33
                let r = self.registers[x];
                self.memory
                    .get_mut(index..(index + 3))
                    .ok_or_else(|| out_of_bounds(index, 3))?
                    .copy_from_slice(&[r / 100, r / 10 % 10, r % 10]); // 234 => [2, 3, 4]
            }
            MiscOpcode::StoreV0ToVx => {
                // FX55
                // I itself is left unmodified
                self.memory
                    .get_mut(index..=(index + x))
                    .ok_or_else(|| out_of_bounds(index, x + 1))?
                    .copy_from_slice(&self.registers[..=x]);
            }
            MiscOpcode::FillV0ToVx => {
                // FX65
                let data = self
                    .memory
                    .get(index..=(index + x))
                    .ok_or_else(|| out_of_bounds(index, x + 1))?;
                self.registers[..=x].copy_from_slice(data);
            }
        }
        Ok((ProgramCounterStep::Next, Operation::None))
    }
}
