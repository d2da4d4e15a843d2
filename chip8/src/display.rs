//! Sprite drawing onto the display buffer.
use crate::{constants::*, cpu::Chip8Cpu};

/// Index into the display buffer, wrapping coordinates around the screen edges.
#[inline(always)]
pub fn pixel_index(x: usize, y: usize) -> usize {
    (x & DISPLAY_WIDTH_MASK) + (y & DISPLAY_HEIGHT_MASK) * DISPLAY_WIDTH
}

/// XOR blit a sprite to the display buffer, with the top left corner at (`x`, `y`).
///
/// The sprite is encoded as 8 pixels wide and `height` rows high, one byte per row,
/// stored in memory pointed to by address register I. Sprites are wrapped around
/// to the other side of the screen rather than clipped.
///
/// Register VF is set to 1 if any pixel in the display buffer was erased,
/// and 0 otherwise.
pub fn draw_sprite(cpu: &mut Chip8Cpu, x: u8, y: u8, height: u8) {
    let (x, y) = (x as usize, y as usize);
    let mut is_erased = false;

    // Flag is cleared before any pixels are toggled.
    cpu.set_flag(false);

    for r in 0..height as usize {
        let row = cpu.read(cpu.address as usize + r);

        for c in 0..SPRITE_WIDTH {
            // Most significant bit is the leftmost pixel.
            if (row >> (7 - c)) & 1 == 0 {
                continue;
            }

            let d = pixel_index(x + c, y + r);
            let old_px = cpu.display[d];

            // XOR erases a pixel when both the old and new values are both 1.
            is_erased |= old_px;

            cpu.display[d] = !old_px;
        }
    }

    // If a pixel was erased, then a collision occurred.
    cpu.set_flag(is_erased);
}

#[cfg(test)]
mod test {
    use super::*;

    fn cpu_with_sprite(sprite: &[u8]) -> Chip8Cpu {
        let mut cpu = Chip8Cpu::new();
        cpu.address = 0x300;
        for (i, row) in sprite.iter().enumerate() {
            cpu.ram[0x300 + i] = *row;
        }
        cpu
    }

    #[test]
    fn test_draw_toggle() {
        let mut cpu = cpu_with_sprite(&[0b1000_0000]);

        draw_sprite(&mut cpu, 3, 2, 1);
        assert!(cpu.display[pixel_index(3, 2)]);
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);

        draw_sprite(&mut cpu, 3, 2, 1);
        assert!(!cpu.display[pixel_index(3, 2)]);
        assert_eq!(cpu.registers[FLAG_REGISTER], 1);
    }

    /// Draw two sprites next to each other.
    /// The zero bits of the second draw must not erase
    /// the pixels of the first draw.
    #[test]
    fn test_draw_collision() {
        let mut cpu = cpu_with_sprite(&[0b1111_0000]);

        // ____####
        draw_sprite(&mut cpu, 4, 0, 1);
        // ########
        draw_sprite(&mut cpu, 0, 0, 1);

        assert!((0..8).all(|x| cpu.display[pixel_index(x, 0)]));
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);
    }

    #[test]
    fn test_draw_wraps() {
        let mut cpu = cpu_with_sprite(&[0b1100_0000, 0b1100_0000]);

        draw_sprite(&mut cpu, 63, 31, 2);

        assert!(cpu.display[pixel_index(63, 31)]);
        assert!(cpu.display[pixel_index(0, 31)]);
        assert!(cpu.display[pixel_index(63, 0)]);
        assert!(cpu.display[pixel_index(0, 0)]);
        assert_eq!(cpu.display.iter().filter(|px| **px).count(), 4);
    }

    #[test]
    fn test_draw_coordinates_beyond_screen() {
        let mut cpu = cpu_with_sprite(&[0b1000_0000]);

        // 70 mod 64 = 6, 40 mod 32 = 8
        draw_sprite(&mut cpu, 70, 40, 1);
        assert!(cpu.display[pixel_index(6, 8)]);
    }

    #[test]
    fn test_flag_cleared_before_draw() {
        let mut cpu = cpu_with_sprite(&[0b1000_0000]);
        cpu.registers[FLAG_REGISTER] = 1;

        draw_sprite(&mut cpu, 0, 0, 1);
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);
    }

    #[test]
    fn test_draw_zero_height() {
        let mut cpu = cpu_with_sprite(&[0b1000_0000]);
        draw_sprite(&mut cpu, 0, 0, 0);
        assert!(cpu.display.iter().all(|px| !px));
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);
    }
}
