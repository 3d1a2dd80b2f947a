//! Legacy 8259 PIC pair as the x86_64 interrupt controller.

use pic8259::ChainedPics;
use spin::Mutex;

use crate::interrupts::InterruptController;

/// Hardware IRQs are remapped past the CPU exception vectors.
pub const PIC_1_OFFSET: u8 = 32;
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

pub struct LegacyPic;

static LEGACY_PIC: LegacyPic = LegacyPic;

impl InterruptController for LegacyPic {
    fn enable(&self, line: u8) {
        let mut pics = PICS.lock();
        unsafe {
            let mut masks = pics.read_masks();
            if line < 8 {
                masks[0] &= !(1u8 << line);
            } else {
                masks[1] &= !(1u8 << (line - 8));
            }
            pics.write_masks(masks[0], masks[1]);
        }
    }

    fn disable(&self, line: u8) {
        let mut pics = PICS.lock();
        unsafe {
            let mut masks = pics.read_masks();
            if line < 8 {
                masks[0] |= 1u8 << line;
            } else {
                masks[1] |= 1u8 << (line - 8);
            }
            pics.write_masks(masks[0], masks[1]);
        }
    }
}

/// Remap the PICs and register them as the system controller. All
/// lines start masked; processes opt in via `EnableIrq`.
pub fn init() {
    unsafe {
        let mut pics = PICS.lock();
        pics.initialize();
        pics.write_masks(0xff, 0xff);
    }
    crate::interrupts::register_controller(&LEGACY_PIC);
    log::info!("8259 PIC remapped to {}..{}", PIC_1_OFFSET, PIC_2_OFFSET + 8);
}

/// Signal end-of-interrupt for `vector` after the portable handler ran.
pub fn end_of_interrupt(vector: u8) {
    unsafe {
        PICS.lock().notify_end_of_interrupt(vector);
    }
}
