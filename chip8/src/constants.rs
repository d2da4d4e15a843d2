//! Constant values of the Chip-8 architecture.

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 0x10; // 16

/// Register VF, written by arithmetic and draw instructions as a carry,
/// borrow or collision flag.
pub const FLAG_REGISTER: usize = 0xF;

/// The lower memory space was historically used for the interpreter itself,
/// but is now used for fonts.
pub const MEM_START: usize = 0x200; // 512
pub const MEM_SIZE: usize = 0x1000; // 4096

/// Mask applied to every address before it touches memory.
pub const ADDRESS_MASK: usize = MEM_SIZE - 1;

/// Largest program image accepted by the loader.
///
/// The final byte of memory at 0xFFF is never part of a program image.
pub const MAX_PROGRAM_SIZE: usize = MEM_SIZE - MEM_START - 1; // 3583

/// Address where the builtin font glyphs are stored.
pub const FONTSET_START: usize = 0x000;

/// Glyphs are 5 bytes high, one byte per row.
pub const FONTSET_HEIGHT: usize = 5;

/// Number of glyphs in the font, one for each hexadecimal digit.
pub const FONTSET_GLYPH_COUNT: usize = 16;

pub const FONTSET_DATA_LENGTH: usize = FONTSET_HEIGHT * FONTSET_GLYPH_COUNT; // 80

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_BUFFER_SIZE: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;
pub const DISPLAY_WIDTH_MASK: usize = DISPLAY_WIDTH - 1;
pub const DISPLAY_HEIGHT_MASK: usize = DISPLAY_HEIGHT - 1;

/// Sprites are always 8 pixels wide, one bit per pixel.
pub const SPRITE_WIDTH: usize = 8;

/// Conventional number of times per second that the timers count down.
pub const DELAY_FREQUENCY: u64 = 60;

/// Number of nanoseconds in a second
#[doc(hidden)]
pub const NANOS_IN_SECOND: u64 = 1_000_000_000;

/// Number of keys on the hexadecimal keypad (0x0-0xF)
pub const KEY_COUNT: u8 = 16;

/// Type for storing the 12-bit memory addresses.
pub type Address = u16;

/// Type of the framebuffer exposed to renderers.
pub type Chip8DisplayBuffer<'a> = &'a [bool; DISPLAY_BUFFER_SIZE];
