use core::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::cart::Mirroring;

/// CPU side memory, as seen by the mapper.
/// Units are 8 KiB windows: four of PRG ROM at $8000, one of PRG RAM at $6000.
pub trait CpuMemory {
  fn map_prg_rom_bank(&mut self, unit: usize, bank: usize);
  fn map_prg_ram_bank(&mut self, unit: usize, bank: usize);
}

/// PPU side memory, as seen by the mapper.
/// Units are 1 KiB windows: eight of CHR at $0000.
pub trait PpuMemory {
  fn map_chr_bank(&mut self, unit: usize, bank: usize);
  fn set_mirroring(&mut self, mirroring: Mirroring);
  fn map_nametable_areas(&mut self, areas: [usize; 4]);
}

/// The CPU interrupt lines a mapper can drive.
pub trait InterruptLines {
  fn activate_interrupt(&mut self, kind: Interrupt);
  fn clear_interrupt(&mut self, kind: Interrupt);
}

/// Whatever is currently on the PPU address bus.
pub trait AddressBus {
  fn address(&self) -> u16;
}

bitflags! {
  #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
  #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
  pub struct Interrupt: u8 {
    const RESET   = 0b0000_0001;
    const NMI     = 0b0000_0010;
    const IRQ_APU = 0b0000_0100;
    const IRQ_DMC = 0b0000_1000;
    // raised by the cartridge
    const IRQ_EXT = 0b0001_0000;
  }
}

impl Interrupt {
  pub fn irq_pending(&self) -> bool {
    self.intersects(Interrupt::IRQ_APU | Interrupt::IRQ_DMC | Interrupt::IRQ_EXT)
  }
}

// The set of pending interrupts is itself a valid interrupt controller.
impl InterruptLines for Interrupt {
  fn activate_interrupt(&mut self, kind: Interrupt) {
    self.insert(kind);
  }

  fn clear_interrupt(&mut self, kind: Interrupt) {
    self.remove(kind);
  }
}

impl AddressBus for u16 {
  fn address(&self) -> u16 { *self }
}

pub type Shared<T> = Rc<RefCell<T>>;

/// Handles to the devices a mapper talks to.
/// The mapper never owns them: the emulation driver does.
#[derive(Clone)]
pub struct Wiring {
  pub cpu: Shared<dyn InterruptLines>,
  pub ppu: Shared<dyn AddressBus>,
  pub cpu_mem: Shared<dyn CpuMemory>,
  pub ppu_mem: Shared<dyn PpuMemory>,
}

#[cfg(test)]
mod mem_tests {
  use super::*;

  #[test]
  fn interrupt_set_as_lines() {
    let mut pending = Interrupt::empty();
    pending.activate_interrupt(Interrupt::IRQ_EXT);
    pending.activate_interrupt(Interrupt::NMI);
    assert!(pending.irq_pending());

    pending.clear_interrupt(Interrupt::IRQ_EXT);
    assert_eq!(pending, Interrupt::NMI);
    assert!(!pending.irq_pending());
  }
}
