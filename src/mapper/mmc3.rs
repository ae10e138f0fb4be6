use bitfield_struct::bitfield;
use log::trace;

use crate::{cart::{CartHeader, Mirroring}, mem::Interrupt};
use super::{Mapper, MapperBase};

/// Ticks A12 has to stay low before a rise is counted again.
const A12_LOW_DELAY: u8 = 7;
const A12_MASK: u16 = 0x1000;

/// Last value written to the bank select register ($8000).
#[bitfield(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BankSelect {
  #[bits(3)]
  target: u8,
  #[bits(3)]
  __: u8,
  prg_swap: bool,
  chr_invert: bool,
}

/// Register slots, decoded from address lines 15-13 and 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
  BankSelect,    // $8000-$9FFE, even
  BankData,      // $8001-$9FFF, odd
  Mirroring,     // $A000-$BFFE, even
  PrgRamProtect, // $A001-$BFFF, odd
  IrqLatch,      // $C000-$DFFE, even
  IrqReload,     // $C001-$DFFF, odd
  IrqDisable,    // $E000-$FFFE, even
  IrqEnable,     // $E001-$FFFF, odd
}

impl Register {
  pub fn decode(addr: u16) -> Option<Self> {
    let reg = match addr & 0xE001 {
      0x8000 => Self::BankSelect,
      0x8001 => Self::BankData,
      0xA000 => Self::Mirroring,
      0xA001 => Self::PrgRamProtect,
      0xC000 => Self::IrqLatch,
      0xC001 => Self::IrqReload,
      0xE000 => Self::IrqDisable,
      0xE001 => Self::IrqEnable,
      _ => return None,
    };
    Some(reg)
  }
}

// Mapper 04
// https://www.nesdev.org/wiki/MMC3
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mmc3 {
  base: MapperBase,
  command: BankSelect,

  irq_counter: u8,
  irq_latch: u8,
  irq_reload: bool,
  irq_enabled: bool,
  // ticks left before an A12 rise counts again
  irq_delay: u8,
  // MMC3A and some clones only fire when the counter was reloaded, not when it got to zero by decrementing
  alternate_mode: bool,
}

impl Mmc3 {
  pub fn new(header: &CartHeader) -> Self {
    // every board gets 8 KiB of PRG RAM, whatever the header says
    let header = CartHeader {
      prg_ram_size: 8 * 1024,
      prg_ram_battery_size: header.prg_ram_battery_size.min(8 * 1024),
      ..header.clone()
    };

    Self {
      alternate_mode: header.submapper == 4,
      base: MapperBase::new(&header),
      command: BankSelect::new(),
      irq_counter: 0,
      irq_latch: 0,
      irq_reload: false,
      irq_enabled: false,
      irq_delay: 0,
    }
  }

  pub fn command(&self) -> u8 { self.command.into_bits() }
  pub fn irq_counter(&self) -> u8 { self.irq_counter }
  pub fn irq_latch(&self) -> u8 { self.irq_latch }
  pub fn irq_enabled(&self) -> bool { self.irq_enabled }
  pub fn alternate_mode(&self) -> bool { self.alternate_mode }

  fn reset_mapping(&self) {
    // last 32 KiB of PRG ROM
    self.base.map_prg_rom_32k(0, -1);
    self.base.map_prg_ram_8k(0, 0);
    if self.base.header.has_chr_ram() {
      self.base.map_chr_ram_8k(0, 0);
    } else {
      self.base.map_chr_rom_8k(0, 0);
    }
  }

  fn reset_registers(&mut self) {
    self.command = BankSelect::new();
    self.irq_counter = 0;
    self.irq_latch = 0;
    self.irq_reload = false;
    self.irq_enabled = false;
    self.irq_delay = 0;
  }

  fn write_bank_data(&mut self, val: u8) {
    match self.command.target() {
      0 | 1 => if !self.base.header.has_chr_ram() { self.switch_double_chr_banks(val) },
      2..=5 => if !self.base.header.has_chr_ram() { self.switch_single_chr_bank(val) },
      6 => self.switch_prg_banks_0_and_2(val),
      7 => self.switch_prg_bank_1(val),
      _ => unreachable!(),
    }
  }

  fn write_mirroring(&self, val: u8) {
    // four screen boards have the nametables hardwired
    if self.base.header.mirroring == Mirroring::FourScreen { return; }

    if val & 1 != 0 {
      self.base.set_horizontal_mirroring();
    } else {
      self.base.set_vertical_mirroring();
    }
  }

  fn write_irq_reload(&mut self) {
    if self.alternate_mode {
      self.irq_reload = true;
    }
    self.irq_counter = 0;
  }

  fn write_irq_enable(&mut self, enabled: bool) {
    self.irq_enabled = enabled;
    if !enabled {
      // acknowledges any pending interrupt
      self.base.clear_interrupt(Interrupt::IRQ_EXT);
    }
  }

  // 2 KiB at the CHR unit pair S[1,0] = C[7,0]
  fn switch_double_chr_banks(&self, bank: u8) {
    let src = (self.command.chr_invert() as usize) << 1 | (self.command.target() as usize & 1);
    self.base.map_chr_rom_2k(src, (bank >> 1) as i32);
  }

  // 1 KiB at the CHR unit S[2,1,0] = (C-2)[!7,1,0]
  fn switch_single_chr_bank(&self, bank: u8) {
    let src = ((!self.command.chr_invert()) as usize) << 2 | (self.command.target().wrapping_sub(2) as usize & 0b11);
    self.base.map_chr_rom_1k(src, bank as i32);
  }

  fn switch_prg_banks_0_and_2(&self, bank: u8) {
    let selected = (self.command.prg_swap() as usize) << 1;
    let fixed = ((!self.command.prg_swap()) as usize) << 1;
    self.base.map_prg_rom_8k(selected, bank as i32);
    // second last bank
    self.base.map_prg_rom_8k(fixed, -2);
  }

  fn switch_prg_bank_1(&self, bank: u8) {
    self.base.map_prg_rom_8k(1, bank as i32);
  }

  fn clock_irq_counter(&mut self) {
    let old_counter = self.irq_counter;
    if self.irq_counter == 0 || self.irq_reload {
      self.irq_counter = self.irq_latch;
    } else {
      self.irq_counter -= 1;
    }

    if self.irq_enabled
      && self.irq_counter == 0
      && (!self.alternate_mode || old_counter == 0 || self.irq_reload)
    {
      self.base.activate_interrupt(Interrupt::IRQ_EXT);
    }
    self.irq_reload = false;
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for Mmc3 {
  fn base(&self) -> &MapperBase { &self.base }
  fn base_mut(&mut self) -> &mut MapperBase { &mut self.base }

  fn reset(&mut self) {
    self.reset_mapping();
    self.reset_registers();
  }

  fn write(&mut self, addr: u16, val: u8) {
    let Some(reg) = Register::decode(addr) else {
      trace!("MMC3 write to {addr:04X} ignored");
      return;
    };

    match reg {
      Register::BankSelect => self.command = BankSelect::from_bits(val),
      Register::BankData => self.write_bank_data(val),
      Register::Mirroring => self.write_mirroring(val),
      // TODO: enforce PRG RAM write protection once MMC6 boards share this code
      Register::PrgRamProtect => trace!("MMC3 PRG RAM protect {val:02X} ignored"),
      Register::IrqLatch => self.irq_latch = val,
      Register::IrqReload => self.write_irq_reload(),
      Register::IrqDisable => self.write_irq_enable(false),
      Register::IrqEnable => self.write_irq_enable(true),
    }
  }

  // The counter is clocked by rises of PPU A12, and a rise only counts
  // after A12 stayed low for a while, which filters out the quick
  // toggles of sprite fetches.
  //
  // A12  ____      _____  1
  //          |    |
  //          |____|       0
  //               ^
  //             rising edge
  fn tick(&mut self) {
    if self.base.ppu_address() & A12_MASK != 0 {
      if self.irq_delay == 0 {
        self.clock_irq_counter();
      }
      self.irq_delay = A12_LOW_DELAY;
    } else if self.irq_delay > 0 {
      self.irq_delay -= 1;
    }
  }
}
