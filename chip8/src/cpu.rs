//! CPU and memory state.
use crate::{
    bytecode::Instr,
    constants::*,
    error::{Chip8Error, Chip8Result},
    font::FONTSET,
};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction in memory.
    pub(crate) pc: Address,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// (I) Pointer register used for temporarily storing an address.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: Vec<Address>,
    /// Screen buffer that is drawn too.
    pub(crate) display: Box<[bool; DISPLAY_BUFFER_SIZE]>,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut cpu = Self {
            pc: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_state: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: Vec::new(),
            display: Box::new([false; DISPLAY_BUFFER_SIZE]),
        };
        cpu.reset();
        cpu
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Put the machine back into its power-on state.
    ///
    /// All memory, registers, timers, keys and the display are cleared,
    /// the font is restored and the program counter points at the
    /// start of program memory.
    pub fn reset(&mut self) {
        self.clear_memory();
        self.load_font();

        self.pc = MEM_START as Address;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.clear_keys();
    }

    /// Erase the contents of the memory buffers `ram`, `stack` and `display`.
    pub(crate) fn clear_memory(&mut self) {
        self.ram.fill(0);
        self.stack.clear();
        self.display.fill(false);
    }

    fn load_font(&mut self) {
        self.ram[FONTSET_START..FONTSET_START + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Copy a program image into memory at [`MEM_START`].
    ///
    /// Memory outside the image is left as is. Nothing is written when the
    /// image is rejected.
    pub fn load_program(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.is_empty() {
            return Err(Chip8Error::EmptyProgram);
        }

        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        self.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        Ok(())
    }

    /// Read the instruction at the program counter, then advance past it.
    #[inline(always)]
    pub(crate) fn fetch(&mut self) -> Instr {
        let instr = Instr::fetch(&self.ram, self.pc as usize);
        self.pc = self.pc.wrapping_add(2);
        instr
    }

    /// Skip over the next instruction.
    #[inline(always)]
    pub(crate) fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// Read a byte from memory. The address wraps around the memory size.
    #[inline(always)]
    pub fn read(&self, address: usize) -> u8 {
        self.ram[address & ADDRESS_MASK]
    }

    /// Write a byte to memory. The address wraps around the memory size.
    #[inline(always)]
    pub fn write(&mut self, address: usize, value: u8) {
        self.ram[address & ADDRESS_MASK] = value;
    }

    #[inline(always)]
    pub fn set_flag(&mut self, value: bool) {
        self.registers[FLAG_REGISTER] = value as u8;
    }

    pub fn clear_display(&mut self) {
        self.display.fill(false);
    }

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    /// Whether the key is pressed down.
    ///
    /// Values outside the keypad are never pressed.
    pub fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// Retrieve the value of the lowest key that is pressed down.
    #[inline]
    pub fn first_key(&self) -> Option<u8> {
        if self.any_key() {
            Some(self.key_state.trailing_zeros() as u8)
        } else {
            None
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Count down the sound timer.
    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}
