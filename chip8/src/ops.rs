//! Instruction handlers.
//!
//! Each handler receives the decoded instruction with the program counter
//! already advanced past it, and operates only on the state reachable
//! through [`OpContext`].
use rand::prelude::*;

use crate::{
    bytecode::Instr,
    constants::*,
    cpu::Chip8Cpu,
    display,
    error::{Chip8Error, Chip8Result},
    vm::Flow,
};

/// State an instruction handler is allowed to touch.
pub struct OpContext<'a> {
    pub cpu: &'a mut Chip8Cpu,
    pub rng: &'a mut dyn RngCore,
    /// Maximum depth of the call stack, if any.
    pub stack_limit: Option<usize>,
}

/// Signature shared by all instruction handlers.
pub type OpFn = fn(&mut OpContext<'_>, Instr) -> Chip8Result<Flow>;

// ----------------------------------------------------------------------------
// Flow control

/// 00E0 (CLS)
///
/// Clear display
pub fn cls(ctx: &mut OpContext<'_>, _: Instr) -> Chip8Result<Flow> {
    ctx.cpu.clear_display();
    Ok(Flow::Draw)
}

/// 00EE (RET)
///
/// Return from a subroutine.
/// Set the program counter to the value at the top of the stack.
pub fn ret(ctx: &mut OpContext<'_>, _: Instr) -> Chip8Result<Flow> {
    match ctx.cpu.stack.pop() {
        Some(address) => {
            ctx.cpu.pc = address;
            Ok(Flow::Jump)
        }
        None => Err(Chip8Error::StackUnderflow { pc: ctx.cpu.pc }),
    }
}

/// 1NNN (JP addr)
///
/// Jump to address.
pub fn jp(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.pc = instr.nnn;
    Ok(Flow::Jump)
}

/// 2NNN (CALL addr)
///
/// Call subroutine at NNN.
pub fn call(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    if let Some(limit) = ctx.stack_limit {
        if ctx.cpu.stack.len() >= limit {
            return Err(Chip8Error::StackOverflow { pc: ctx.cpu.pc });
        }
    }

    ctx.cpu.stack.push(ctx.cpu.pc);
    ctx.cpu.pc = instr.nnn;
    Ok(Flow::Jump)
}

/// BNNN (JP V0, addr)
///
/// Jump to address NNN offset by register V0.
pub fn jp_v0(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.pc = instr.nnn + ctx.cpu.registers[0] as Address;
    Ok(Flow::Jump)
}

// ----------------------------------------------------------------------------
// Conditional skips

/// 3XNN (SE Vx, byte)
///
/// Skip the next instruction if register VX equals value NN.
pub fn se_byte(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    if ctx.cpu.registers[instr.vx()] == instr.nn {
        ctx.cpu.skip();
    }
    Ok(Flow::Ok)
}

/// 4XNN (SNE Vx, byte)
///
/// Skip the next instruction if register VX does not equal value NN.
pub fn sne_byte(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    if ctx.cpu.registers[instr.vx()] != instr.nn {
        ctx.cpu.skip();
    }
    Ok(Flow::Ok)
}

/// 5XY0 (SE Vx, Vy)
///
/// Skip the next instruction if register VX equals value VY.
pub fn se_reg(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    if ctx.cpu.registers[instr.vx()] == ctx.cpu.registers[instr.vy()] {
        ctx.cpu.skip();
    }
    Ok(Flow::Ok)
}

/// 9XY0 (SNE Vx, Vy)
///
/// Skip next instruction if Vx != Vy.
pub fn sne_reg(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    if ctx.cpu.registers[instr.vx()] != ctx.cpu.registers[instr.vy()] {
        ctx.cpu.skip();
    }
    Ok(Flow::Ok)
}

/// EX9E (SKP Vx)
///
/// Skip the next instruction if the key with the value of Vx is pressed.
pub fn skp(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    if ctx.cpu.key_state(ctx.cpu.registers[instr.vx()]) {
        ctx.cpu.skip();
    }
    Ok(Flow::Ok)
}

/// EXA1 (SKNP Vx)
///
/// Skip the next instruction if the key with the value of Vx is not pressed.
pub fn sknp(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    if !ctx.cpu.key_state(ctx.cpu.registers[instr.vx()]) {
        ctx.cpu.skip();
    }
    Ok(Flow::Ok)
}

// ----------------------------------------------------------------------------
// Registers

/// 6XNN (LD Vx, byte)
///
/// Set register VX to value NN.
pub fn ld_byte(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.registers[instr.vx()] = instr.nn;
    Ok(Flow::Ok)
}

/// 7XNN (ADD Vx, byte)
///
/// Add value NN to register VX. Carry flag is not set.
pub fn add_byte(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let x = ctx.cpu.registers[instr.vx()];
    ctx.cpu.registers[instr.vx()] = x.wrapping_add(instr.nn);
    Ok(Flow::Ok)
}

/// CXNN (RND Vx, byte)
///
/// Set register VX to the result of bitwise AND between a random number and NN.
pub fn rnd(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.registers[instr.vx()] = instr.nn & ctx.rng.gen::<u8>();
    Ok(Flow::Ok)
}

// ----------------------------------------------------------------------------
// Arithmetic
//
// Flags are computed from the operands as they were before the instruction.
// The flag is written before the result, so when X is F the result wins.

/// 8XY0 (LD Vx, Vy)
///
/// Store the value of register VY in register VX.
pub fn ld_reg(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.registers[instr.vx()] = ctx.cpu.registers[instr.vy()];
    Ok(Flow::Ok)
}

/// 8XY1 (OR Vx, Vy)
pub fn or(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.registers[instr.vx()] |= ctx.cpu.registers[instr.vy()];
    Ok(Flow::Ok)
}

/// 8XY2 (AND Vx, Vy)
pub fn and(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.registers[instr.vx()] &= ctx.cpu.registers[instr.vy()];
    Ok(Flow::Ok)
}

/// 8XY3 (XOR Vx, Vy)
pub fn xor(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.registers[instr.vx()] ^= ctx.cpu.registers[instr.vy()];
    Ok(Flow::Ok)
}

/// 8XY4 (ADD Vx, Vy)
///
/// ADDs VY to VX, and stores the result in VX.
/// Overflow is wrapped.
/// If overflow, set VF to 1, else 0.
pub fn add_reg(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let (x, y) = operands(ctx.cpu, instr);
    let (result, carry) = x.overflowing_add(y);
    ctx.cpu.set_flag(carry);
    ctx.cpu.registers[instr.vx()] = result;
    Ok(Flow::Ok)
}

/// 8XY5 (SUB Vx, Vy)
///
/// Subtracts VY from VX, and stores the result in VX.
/// VF is set to 0 when there is a borrow, set to 1 when there isn't.
pub fn sub(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let (x, y) = operands(ctx.cpu, instr);
    ctx.cpu.set_flag(y <= x);
    ctx.cpu.registers[instr.vx()] = x.wrapping_sub(y);
    Ok(Flow::Ok)
}

/// 8XY6 (SHR Vx)
///
/// VF is set to the least-significant bit of Vx, then Vx is shifted right by 1.
/// VY is unused.
pub fn shr(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let x = ctx.cpu.registers[instr.vx()];
    ctx.cpu.registers[FLAG_REGISTER] = x & 1;
    ctx.cpu.registers[instr.vx()] = x >> 1;
    Ok(Flow::Ok)
}

/// 8XY7 (SUBN Vx, Vy)
///
/// Subtracts VX from VY, and stores the result in VX.
/// VF is set to 0 when there is a borrow, set to 1 when there isn't.
pub fn subn(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let (x, y) = operands(ctx.cpu, instr);
    ctx.cpu.set_flag(x <= y);
    ctx.cpu.registers[instr.vx()] = y.wrapping_sub(x);
    Ok(Flow::Ok)
}

/// 8XYE (SHL Vx)
///
/// VF is set to the most-significant bit of Vx, then Vx is shifted left by 1.
/// VY is unused.
pub fn shl(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let x = ctx.cpu.registers[instr.vx()];
    ctx.cpu.registers[FLAG_REGISTER] = (x >> 7) & 1;
    ctx.cpu.registers[instr.vx()] = x << 1;
    Ok(Flow::Ok)
}

#[inline(always)]
fn operands(cpu: &Chip8Cpu, instr: Instr) -> (u8, u8) {
    (cpu.registers[instr.vx()], cpu.registers[instr.vy()])
}

// ----------------------------------------------------------------------------
// Display

/// DXYN (DRW Vx, Vy, nibble)
///
/// Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
/// See [`display::draw_sprite`].
pub fn drw(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let (x, y) = operands(ctx.cpu, instr);
    display::draw_sprite(ctx.cpu, x, y, instr.n);
    Ok(Flow::Draw)
}

// ----------------------------------------------------------------------------
// Timers and keyboard

/// FX07 (LD Vx, DT)
///
/// Set Vx = delay timer value.
pub fn ld_vx_dt(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.registers[instr.vx()] = ctx.cpu.delay_timer;
    Ok(Flow::Ok)
}

/// FX0A (LD Vx, K)
///
/// Wait for a key press, store the value of the key in Vx.
///
/// The machine does not block. Instead the program counter is rewound so the
/// same instruction is fetched again on the next step. Nothing may be
/// modified before the key check, otherwise the retries would repeat it.
pub fn ld_vx_k(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    match ctx.cpu.first_key() {
        Some(k) => {
            ctx.cpu.registers[instr.vx()] = k;
            Ok(Flow::Ok)
        }
        None => {
            // rewind the program counter to stall the machine
            ctx.cpu.pc = ctx.cpu.pc.wrapping_sub(2);
            Ok(Flow::KeyWait)
        }
    }
}

/// FX15 (LD DT, Vx)
///
/// Set delay timer = Vx.
pub fn ld_dt_vx(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.delay_timer = ctx.cpu.registers[instr.vx()];
    Ok(Flow::Ok)
}

/// FX18 (LD ST, Vx)
///
/// Set sound timer = Vx.
pub fn ld_st_vx(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.sound_timer = ctx.cpu.registers[instr.vx()];
    Ok(Flow::Sound)
}

// ----------------------------------------------------------------------------
// Memory

/// ANNN (LD I, addr)
///
/// Set address register I to value NNN.
pub fn ld_i(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    ctx.cpu.address = instr.nnn;
    Ok(Flow::Ok)
}

/// FX1E (ADD I, Vx)
///
/// Add Vx to I
pub fn add_i(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let x = ctx.cpu.registers[instr.vx()] as Address;
    ctx.cpu.address = ctx.cpu.address.wrapping_add(x);
    Ok(Flow::Ok)
}

/// FX29 (LD F, Vx)
///
/// Set I = location of sprite for digit Vx.
pub fn ld_f(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let x = ctx.cpu.registers[instr.vx()] as usize;
    ctx.cpu.address = (FONTSET_START + x * FONTSET_HEIGHT) as Address;
    Ok(Flow::Ok)
}

/// FX33 (LD B, Vx)
///
/// Store the binary-coded decimal representation of Vx
/// in the memory locations I, I+1, and I+2.
#[rustfmt::skip]
pub fn ld_b(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let addr = ctx.cpu.address as usize;
    let x = ctx.cpu.registers[instr.vx()];
    ctx.cpu.write(addr,     x / 100 % 10);
    ctx.cpu.write(addr + 1, x / 10  % 10);
    ctx.cpu.write(addr + 2, x       % 10);
    Ok(Flow::Ok)
}

/// FX55 (LD [I], Vx)
///
/// Store registers V0 through Vx in memory starting at location I.
/// I is left pointing just past the last byte written.
pub fn ld_mem_vx(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let addr = ctx.cpu.address as usize;
    for v in 0..=instr.vx() {
        let value = ctx.cpu.registers[v];
        ctx.cpu.write(addr + v, value);
    }
    ctx.cpu.address = ctx.cpu.address.wrapping_add(instr.x as Address + 1);
    Ok(Flow::Ok)
}

/// FX65 (LD Vx, [I])
///
/// Read registers V0 through Vx from memory starting at location I.
/// I is left pointing just past the last byte read.
pub fn ld_vx_mem(ctx: &mut OpContext<'_>, instr: Instr) -> Chip8Result<Flow> {
    let addr = ctx.cpu.address as usize;
    for v in 0..=instr.vx() {
        ctx.cpu.registers[v] = ctx.cpu.read(addr + v);
    }
    ctx.cpu.address = ctx.cpu.address.wrapping_add(instr.x as Address + 1);
    Ok(Flow::Ok)
}

#[cfg(test)]
mod test {
    use rand::rngs::mock::StepRng;

    use super::*;

    /// Run a single handler against the given CPU.
    fn exec(cpu: &mut Chip8Cpu, handler: OpFn, word: u16) -> Chip8Result<Flow> {
        let mut rng = StepRng::new(0, 1);
        let mut ctx = OpContext {
            cpu,
            rng: &mut rng,
            stack_limit: None,
        };
        handler(&mut ctx, Instr::new(word))
    }

    fn cpu_with(registers: &[(usize, u8)]) -> Chip8Cpu {
        let mut cpu = Chip8Cpu::new();
        for (r, value) in registers {
            cpu.registers[*r] = *value;
        }
        cpu
    }

    #[test]
    fn test_add_reg_carry() {
        let mut cpu = cpu_with(&[(1, 0xFF), (2, 0x01)]);
        exec(&mut cpu, add_reg, 0x8124).unwrap();
        assert_eq!(cpu.registers[1], 0x00);
        assert_eq!(cpu.registers[FLAG_REGISTER], 1);

        let mut cpu = cpu_with(&[(1, 0x01), (2, 0x01), (FLAG_REGISTER, 1)]);
        exec(&mut cpu, add_reg, 0x8124).unwrap();
        assert_eq!(cpu.registers[1], 0x02);
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);
    }

    #[test]
    fn test_sub_borrow() {
        let mut cpu = cpu_with(&[(1, 0x01), (2, 0x02)]);
        exec(&mut cpu, sub, 0x8125).unwrap();
        assert_eq!(cpu.registers[1], 0xFF);
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);

        let mut cpu = cpu_with(&[(1, 0x05), (2, 0x02)]);
        exec(&mut cpu, sub, 0x8125).unwrap();
        assert_eq!(cpu.registers[1], 0x03);
        assert_eq!(cpu.registers[FLAG_REGISTER], 1);

        // Equal operands do not borrow.
        let mut cpu = cpu_with(&[(1, 0x07), (2, 0x07)]);
        exec(&mut cpu, sub, 0x8125).unwrap();
        assert_eq!(cpu.registers[1], 0x00);
        assert_eq!(cpu.registers[FLAG_REGISTER], 1);
    }

    #[test]
    fn test_subn_borrow() {
        let mut cpu = cpu_with(&[(1, 0x02), (2, 0x01)]);
        exec(&mut cpu, subn, 0x8127).unwrap();
        assert_eq!(cpu.registers[1], 0xFF);
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);

        let mut cpu = cpu_with(&[(1, 0x02), (2, 0x05)]);
        exec(&mut cpu, subn, 0x8127).unwrap();
        assert_eq!(cpu.registers[1], 0x03);
        assert_eq!(cpu.registers[FLAG_REGISTER], 1);
    }

    #[test]
    fn test_shifts() {
        let mut cpu = cpu_with(&[(3, 0b1000_0001)]);
        exec(&mut cpu, shr, 0x8306).unwrap();
        assert_eq!(cpu.registers[3], 0b0100_0000);
        assert_eq!(cpu.registers[FLAG_REGISTER], 1);

        exec(&mut cpu, shr, 0x8306).unwrap();
        assert_eq!(cpu.registers[3], 0b0010_0000);
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);

        let mut cpu = cpu_with(&[(3, 0b1000_0001)]);
        exec(&mut cpu, shl, 0x830E).unwrap();
        assert_eq!(cpu.registers[3], 0b0000_0010);
        assert_eq!(cpu.registers[FLAG_REGISTER], 1);

        exec(&mut cpu, shl, 0x830E).unwrap();
        assert_eq!(cpu.registers[3], 0b0000_0100);
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);
    }

    #[test]
    fn test_flag_register_as_destination() {
        // Result overwrites the carry flag.
        let mut cpu = cpu_with(&[(FLAG_REGISTER, 0xFF), (1, 0x03)]);
        exec(&mut cpu, add_reg, 0x8F14).unwrap();
        assert_eq!(cpu.registers[FLAG_REGISTER], 0x02);
    }

    #[test]
    fn test_bitwise_leave_flag() {
        let mut cpu = cpu_with(&[(1, 0b1100), (2, 0b1010), (FLAG_REGISTER, 7)]);
        exec(&mut cpu, or, 0x8121).unwrap();
        assert_eq!(cpu.registers[1], 0b1110);

        cpu.registers[1] = 0b1100;
        exec(&mut cpu, and, 0x8122).unwrap();
        assert_eq!(cpu.registers[1], 0b1000);

        cpu.registers[1] = 0b1100;
        exec(&mut cpu, xor, 0x8123).unwrap();
        assert_eq!(cpu.registers[1], 0b0110);

        exec(&mut cpu, ld_reg, 0x8120).unwrap();
        assert_eq!(cpu.registers[1], 0b1010);

        assert_eq!(cpu.registers[FLAG_REGISTER], 7);
    }

    #[test]
    fn test_add_byte_wraps_without_flag() {
        let mut cpu = cpu_with(&[(4, 0xFE)]);
        exec(&mut cpu, add_byte, 0x7403).unwrap();
        assert_eq!(cpu.registers[4], 0x01);
        assert_eq!(cpu.registers[FLAG_REGISTER], 0);
    }

    #[test]
    fn test_skips() {
        let mut cpu = cpu_with(&[(1, 0x42), (2, 0x42), (3, 0x00)]);
        let pc = cpu.pc;

        exec(&mut cpu, se_byte, 0x3142).unwrap();
        assert_eq!(cpu.pc, pc + 2);
        exec(&mut cpu, se_byte, 0x3143).unwrap();
        assert_eq!(cpu.pc, pc + 2);

        exec(&mut cpu, sne_byte, 0x4143).unwrap();
        assert_eq!(cpu.pc, pc + 4);
        exec(&mut cpu, sne_byte, 0x4142).unwrap();
        assert_eq!(cpu.pc, pc + 4);

        exec(&mut cpu, se_reg, 0x5120).unwrap();
        assert_eq!(cpu.pc, pc + 6);
        exec(&mut cpu, se_reg, 0x5130).unwrap();
        assert_eq!(cpu.pc, pc + 6);

        exec(&mut cpu, sne_reg, 0x9130).unwrap();
        assert_eq!(cpu.pc, pc + 8);
        exec(&mut cpu, sne_reg, 0x9120).unwrap();
        assert_eq!(cpu.pc, pc + 8);
    }

    #[test]
    fn test_key_skips() {
        let mut cpu = cpu_with(&[(1, 0x5), (2, 0x20)]);
        cpu.set_key_state(5, true);
        let pc = cpu.pc;

        exec(&mut cpu, skp, 0xE19E).unwrap();
        assert_eq!(cpu.pc, pc + 2);
        exec(&mut cpu, sknp, 0xE1A1).unwrap();
        assert_eq!(cpu.pc, pc + 2);

        // Register values beyond the keypad are never pressed.
        exec(&mut cpu, skp, 0xE29E).unwrap();
        assert_eq!(cpu.pc, pc + 2);
        exec(&mut cpu, sknp, 0xE2A1).unwrap();
        assert_eq!(cpu.pc, pc + 4);
    }

    #[test]
    fn test_call_ret() {
        let mut cpu = Chip8Cpu::new();
        cpu.pc = 0x206;

        assert_eq!(exec(&mut cpu, call, 0x2400), Ok(Flow::Jump));
        assert_eq!(cpu.pc, 0x400);
        assert_eq!(cpu.stack, vec![0x206]);

        assert_eq!(exec(&mut cpu, ret, 0x00EE), Ok(Flow::Jump));
        assert_eq!(cpu.pc, 0x206);
        assert!(cpu.stack.is_empty());
    }

    #[test]
    fn test_ret_underflow() {
        let mut cpu = Chip8Cpu::new();
        cpu.pc = 0x202;

        assert_eq!(
            exec(&mut cpu, ret, 0x00EE),
            Err(Chip8Error::StackUnderflow { pc: 0x202 })
        );
        assert_eq!(cpu.pc, 0x202);
    }

    #[test]
    fn test_call_limit() {
        let mut cpu = Chip8Cpu::new();
        let mut rng = StepRng::new(0, 0);
        let mut ctx = OpContext {
            cpu: &mut cpu,
            rng: &mut rng,
            stack_limit: Some(2),
        };

        call(&mut ctx, Instr::new(0x2300)).unwrap();
        call(&mut ctx, Instr::new(0x2400)).unwrap();
        assert_eq!(
            call(&mut ctx, Instr::new(0x2500)),
            Err(Chip8Error::StackOverflow { pc: 0x400 })
        );
        assert_eq!(cpu.pc, 0x400);
        assert_eq!(cpu.stack, vec![0x200, 0x300]);
    }

    #[test]
    fn test_jumps() {
        let mut cpu = cpu_with(&[(0, 0x10)]);

        exec(&mut cpu, jp, 0x1ABC).unwrap();
        assert_eq!(cpu.pc, 0xABC);

        exec(&mut cpu, jp_v0, 0xB300).unwrap();
        assert_eq!(cpu.pc, 0x310);
    }

    #[test]
    fn test_rnd_masks() {
        let mut cpu = Chip8Cpu::new();
        let mut rng = StepRng::new(0xAB, 0);
        let mut ctx = OpContext {
            cpu: &mut cpu,
            rng: &mut rng,
            stack_limit: None,
        };

        rnd(&mut ctx, Instr::new(0xC30F)).unwrap();
        assert_eq!(ctx.cpu.registers[3], 0x0B);

        rnd(&mut ctx, Instr::new(0xC3FF)).unwrap();
        assert_eq!(ctx.cpu.registers[3], 0xAB);

        rnd(&mut ctx, Instr::new(0xC300)).unwrap();
        assert_eq!(ctx.cpu.registers[3], 0x00);
    }

    #[test]
    fn test_timers() {
        let mut cpu = cpu_with(&[(1, 30)]);

        exec(&mut cpu, ld_dt_vx, 0xF115).unwrap();
        assert_eq!(cpu.delay_timer, 30);

        assert_eq!(exec(&mut cpu, ld_st_vx, 0xF118), Ok(Flow::Sound));
        assert_eq!(cpu.sound_timer, 30);

        cpu.delay_timer = 12;
        exec(&mut cpu, ld_vx_dt, 0xF207).unwrap();
        assert_eq!(cpu.registers[2], 12);
    }

    #[test]
    fn test_get_key() {
        let mut cpu = Chip8Cpu::new();
        cpu.pc = 0x202; // already advanced past the instruction

        assert_eq!(exec(&mut cpu, ld_vx_k, 0xF30A), Ok(Flow::KeyWait));
        assert_eq!(cpu.pc, 0x200);
        assert_eq!(cpu.registers, [0; REGISTER_COUNT]);

        cpu.pc = 0x202;
        cpu.set_key_state(0xE, true);
        cpu.set_key_state(0x9, true);
        assert_eq!(exec(&mut cpu, ld_vx_k, 0xF30A), Ok(Flow::Ok));
        assert_eq!(cpu.pc, 0x202);
        assert_eq!(cpu.registers[3], 0x9);
    }

    #[test]
    fn test_index_register() {
        let mut cpu = cpu_with(&[(1, 0x10), (2, 0xF)]);

        exec(&mut cpu, ld_i, 0xA123).unwrap();
        assert_eq!(cpu.address, 0x123);

        exec(&mut cpu, add_i, 0xF11E).unwrap();
        assert_eq!(cpu.address, 0x133);

        exec(&mut cpu, ld_f, 0xF229).unwrap();
        assert_eq!(cpu.address, 0xF * 5);
        assert_eq!(cpu.ram[cpu.address as usize], 0xF0, "glyph F starts with a full row");
    }

    #[test]
    fn test_bcd() {
        let mut cpu = cpu_with(&[(5, 157)]);
        cpu.address = 0x300;

        exec(&mut cpu, ld_b, 0xF533).unwrap();
        assert_eq!(&cpu.ram[0x300..0x303], &[1, 5, 7]);

        cpu.registers[5] = 8;
        exec(&mut cpu, ld_b, 0xF533).unwrap();
        assert_eq!(&cpu.ram[0x300..0x303], &[0, 0, 8]);
        assert_eq!(cpu.address, 0x300);
    }

    #[test]
    fn test_register_dump_and_load() {
        let mut cpu = cpu_with(&[(0, 0xA0), (1, 0xA1), (2, 0xA2), (3, 0xA3)]);
        cpu.address = 0x300;

        exec(&mut cpu, ld_mem_vx, 0xF255).unwrap();
        assert_eq!(&cpu.ram[0x300..0x304], &[0xA0, 0xA1, 0xA2, 0x00]);
        assert_eq!(cpu.address, 0x303);

        cpu.registers = [0; REGISTER_COUNT];
        cpu.address = 0x300;
        exec(&mut cpu, ld_vx_mem, 0xF165).unwrap();
        assert_eq!(&cpu.registers[0..3], &[0xA0, 0xA1, 0x00]);
        assert_eq!(cpu.address, 0x302);
    }

    #[test]
    fn test_memory_ops_wrap() {
        let mut cpu = cpu_with(&[(0, 1), (1, 2)]);
        cpu.address = 0xFFF;

        exec(&mut cpu, ld_mem_vx, 0xF155).unwrap();
        assert_eq!(cpu.ram[0xFFF], 1);
        assert_eq!(cpu.ram[0x000], 2);
    }
}
