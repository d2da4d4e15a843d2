//! Virtual machine.
use std::{
    fmt::{self, Write},
    time::Duration,
};

use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::{
    constants::*,
    cpu::Chip8Cpu,
    dispatch::OpTable,
    error::Chip8Result,
    keypad::KeyCode,
    ops::OpContext,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    ops: OpTable,
    rng: Box<dyn RngCore>,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng: Box<dyn RngCore> = match conf.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        };
        Self::with_rng(conf, rng)
    }

    /// Create a VM that draws its random numbers from the given source.
    pub fn with_rng(conf: Chip8Conf, rng: Box<dyn RngCore>) -> Self {
        Chip8Vm {
            cpu: Chip8Cpu::new(),
            ops: OpTable::new(),
            rng,
            conf,
        }
    }

    /// Copy the program image into memory at [`MEM_START`].
    ///
    /// The rest of the machine is left as is. Call [`Chip8Vm::reset`]
    /// beforehand to avoid leaking state from a previous program.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        self.cpu.load_program(bytecode)?;
        log::debug!("loaded program of {} bytes", bytecode.len());
        Ok(())
    }

    /// Clear internal state in preparation for a fresh startup.
    pub fn reset(&mut self) {
        self.cpu.reset();
        log::debug!("reset");
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer<'_> {
        &self.cpu.display
    }

    /// State of a single pixel. Coordinates wrap around the screen edges.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.cpu.display[crate::display::pixel_index(x, y)]
    }
}

/// What happened during a step, so the driver can react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// Display buffer was changed, by either `DRW` or `CLS`.
    Draw,
    /// Sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
}

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Chip8Conf {
    /// Seed for the random number generator. Seeded from entropy when `None`.
    pub seed: Option<u64>,
    /// Maximum depth of the call stack. Unlimited when `None`.
    pub stack_limit: Option<usize>,
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key_state(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    /// Press the key down.
    pub fn set_key(&mut self, key: KeyCode) {
        self.set_key_state(key, true)
    }

    /// Release the key.
    pub fn clear_key(&mut self, key: KeyCode) {
        self.set_key_state(key, false)
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Count down the delay and sound timers by one.
    ///
    /// The VM has no clock of its own. The caller decides the cadence,
    /// conventionally [`DELAY_FREQUENCY`].
    pub fn decrement_timers(&mut self) {
        self.cpu.tick_delay();
        self.cpu.tick_sound();
    }

    /// Execute up to the given number of instructions, stopping at the first error.
    ///
    /// Returns the flow of the last executed instruction.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?;
        }

        Ok(flow)
    }

    /// Fetch, decode and execute exactly one instruction.
    ///
    /// Unknown instructions are skipped.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        // Each instruction is two bytes, with the opcode identity in the first 4-bit nibble.
        let instr = self.cpu.fetch();

        match self.ops.lookup(instr) {
            Some(def) => {
                op_trace(self.cpu.pc, def.mnemonic, instr);

                let mut ctx = OpContext {
                    cpu: &mut self.cpu,
                    rng: &mut *self.rng,
                    stack_limit: self.conf.stack_limit,
                };

                (def.exec)(&mut ctx, instr).map_err(|err| {
                    log::debug!("{err}");
                    err
                })
            }
            None => {
                log::debug!(
                    "skipping unknown instruction {instr} at 0x{:04X}",
                    self.cpu.pc.wrapping_sub(2)
                );
                Ok(Flow::Ok)
            }
        }
    }
}

/// Accessors
impl Chip8Vm {
    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    pub fn pc(&self) -> Address {
        self.cpu.pc
    }

    /// Address register I.
    pub fn index(&self) -> Address {
        self.cpu.address
    }

    /// Return addresses on the call stack, oldest first.
    pub fn stack(&self) -> &[Address] {
        &self.cpu.stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    /// Buzzer should be on while sound timer counts down,
    /// then turned off when the timer reaches zero.
    pub fn is_buzzer_on(&self) -> bool {
        self.cpu.sound_timer > 0
    }

    pub fn key_state(&self, key: KeyCode) -> bool {
        self.cpu.key_state(key.as_u8())
    }

    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        &self.cpu.ram
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the contents of program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, std::fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, self.cpu.read(i + 1))?;
        }

        Ok(buf)
    }

    pub fn dump_registers(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();

        for (i, v) in self.cpu.registers.iter().enumerate() {
            write!(buf, "V{i:X}={v:02X} ")?;
        }
        writeln!(buf)?;
        writeln!(
            buf,
            "PC={:04X} I={:04X} DT={:02X} ST={:02X} SP={}",
            self.cpu.pc,
            self.cpu.address,
            self.cpu.delay_timer,
            self.cpu.sound_timer,
            self.cpu.stack.len()
        )?;

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.cpu.display[x + y * DISPLAY_WIDTH] {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys: ")?;
            for i in 0..KEY_COUNT {
                if self.cpu.key_state(i) {
                    write!(buf, "k{i:x}")?;
                }
            }
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(pc: Address, name: &str, instr: crate::bytecode::Instr) {
    log::trace!("{:04X}: {instr} {:4}", pc.wrapping_sub(2), name);
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Address, _: &str, _: crate::bytecode::Instr) {}
