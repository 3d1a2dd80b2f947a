//! PIT channel 0 as the x86_64 system timer.

use x86_64::instructions::port::Port;

use crate::config;
use crate::time;

const PIT_INPUT_FREQ_HZ: u32 = 1_193_182;
const PIT_COMMAND_PORT: u16 = 0x43;
const PIT_CHANNEL0_PORT: u16 = 0x40;

/// Program the PIT to fire at [`config::TIMER_HZ`] and register the
/// tick-backed timer device.
pub fn init() {
    let divisor = (PIT_INPUT_FREQ_HZ / config::TIMER_HZ) as u16;
    unsafe {
        let mut cmd: Port<u8> = Port::new(PIT_COMMAND_PORT);
        let mut ch0: Port<u8> = Port::new(PIT_CHANNEL0_PORT);

        // Counter 0, lobyte/hibyte, mode 3 (square wave), binary.
        cmd.write(0x36);
        ch0.write((divisor & 0xff) as u8);
        ch0.write((divisor >> 8) as u8);
    }

    time::register_device(&time::SYSTEM_TICK);
    log::info!(
        "PIT timer at {} Hz ({} ms per tick)",
        config::TIMER_HZ,
        1000 / config::TIMER_HZ
    );
}

/// Per-tick work for the timer vector: advance the clock, wake
/// sleepers, then let the caller reschedule and send EOI.
pub fn timer_interrupt() {
    time::timer_interrupt();
}
