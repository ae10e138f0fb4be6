use bitfield_struct::bitfield;
use log::trace;

use crate::cart::CartHeader;
use super::{Mapper, MapperBase};

#[bitfield(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Control {
  #[bits(2)]
  mirroring: u8,
  #[bits(2)]
  prg_mode: u8,
  chr_4k: bool,
  #[bits(3)]
  __: u8,
}

// Mapper 01
// https://www.nesdev.org/wiki/MMC1
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mmc1 {
  base: MapperBase,

  shift_reg: u8,
  shift_writes: u8,
  control: Control,
  chr_bank0: u8,
  chr_bank1: u8,
  prg_bank: u8,
}

impl Mmc1 {
  pub fn new(header: &CartHeader) -> Self {
    Self {
      base: MapperBase::new(header),
      shift_reg: 0,
      shift_writes: 0,
      control: Control::from_bits(0b0_11_00),
      chr_bank0: 0,
      chr_bank1: 0,
      prg_bank: 0,
    }
  }

  fn write_control(&mut self, val: u8) {
    self.control = Control::from_bits(val);
    match self.control.mirroring() {
      0 => self.base.set_single_screen_mirroring(0),
      1 => self.base.set_single_screen_mirroring(1),
      2 => self.base.set_vertical_mirroring(),
      3 => self.base.set_horizontal_mirroring(),
      _ => unreachable!(),
    }
  }

  fn update_prg_banks(&self) {
    // SUROM and SXROM select the 256 KiB half of PRG ROM with bit 4 of the CHR register
    let outer = self.chr_bank0 & 0x10;
    let bank = self.prg_bank & 0x0F;

    match self.control.prg_mode() {
      0 | 1 => self.base.map_prg_rom_32k(0, ((outer | bank) >> 1) as i32),
      2 => {
        self.base.map_prg_rom_16k(0, outer as i32);
        self.base.map_prg_rom_16k(1, (outer | bank) as i32);
      }
      3 => {
        self.base.map_prg_rom_16k(0, (outer | bank) as i32);
        self.base.map_prg_rom_16k(1, (outer | 0x0F) as i32);
      }
      _ => unreachable!(),
    }

    // SOROM and SXROM bank PRG RAM with bits 2-3
    self.base.map_prg_ram_8k(0, ((self.chr_bank0 & 0x0C) >> 2) as i32);
  }

  fn update_chr_banks(&self) {
    if self.control.chr_4k() {
      self.base.map_chr_4k(0, self.chr_bank0 as i32);
      self.base.map_chr_4k(1, self.chr_bank1 as i32);
    } else {
      self.base.map_chr_8k(0, (self.chr_bank0 >> 1) as i32);
    }
  }

  fn write_register(&mut self, addr: u16, val: u8) {
    match addr & 0xE000 {
      0x8000 => self.write_control(val),
      0xA000 => self.chr_bank0 = val,
      0xC000 => self.chr_bank1 = val,
      0xE000 => self.prg_bank = val,
      _ => unreachable!(),
    }

    self.update_prg_banks();
    self.update_chr_banks();
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for Mmc1 {
  fn base(&self) -> &MapperBase { &self.base }
  fn base_mut(&mut self) -> &mut MapperBase { &mut self.base }

  fn reset(&mut self) {
    self.shift_reg = 0;
    self.shift_writes = 0;
    self.control = Control::from_bits(0b0_11_00);
    self.chr_bank0 = 0;
    self.chr_bank1 = 0;
    self.prg_bank = 0;

    self.update_prg_banks();
    self.update_chr_banks();
  }

  fn write(&mut self, addr: u16, val: u8) {
    if addr < 0x8000 {
      trace!("MMC1 write to {addr:04X} ignored");
      return;
    }

    if val & 0b1000_0000 != 0 {
      self.shift_reg = 0;
      self.shift_writes = 0;
      // back to fixed last bank
      self.control.set_prg_mode(3);
      self.update_prg_banks();
      return;
    }

    self.shift_reg = (self.shift_reg >> 1) | ((val & 1) << 4);
    self.shift_writes += 1;

    if self.shift_writes == 5 {
      let val = self.shift_reg;
      self.shift_reg = 0;
      self.shift_writes = 0;
      self.write_register(addr, val);
    }
  }
}

#[cfg(test)]
mod mmc1_tests {
  use super::*;

  fn serial_write(mmc1: &mut Mmc1, addr: u16, val: u8) {
    for i in 0..5 {
      mmc1.write(addr, (val >> i) & 1);
    }
  }

  #[test]
  fn shift_register_loads_after_five_writes() {
    let mut mmc1 = Mmc1::new(&CartHeader::default());
    serial_write(&mut mmc1, 0xE000, 0b0_0101);
    assert_eq!(mmc1.prg_bank, 0b0101);
    assert_eq!(mmc1.shift_writes, 0);

    serial_write(&mut mmc1, 0xA000, 0b1_0011);
    assert_eq!(mmc1.chr_bank0, 0b1_0011);
  }

  #[test]
  fn reset_bit_clears_shift_register() {
    let mut mmc1 = Mmc1::new(&CartHeader::default());
    mmc1.control = Control::from_bits(0);
    mmc1.write(0x8000, 1);
    mmc1.write(0x8000, 1);
    mmc1.write(0x8000, 0x80);

    assert_eq!(mmc1.shift_reg, 0);
    assert_eq!(mmc1.shift_writes, 0);
    assert_eq!(mmc1.control.prg_mode(), 3);
  }

  #[test]
  fn control_fields() {
    let control = Control::from_bits(0b1_10_11);
    assert_eq!(control.mirroring(), 3);
    assert_eq!(control.prg_mode(), 2);
    assert!(control.chr_4k());
  }
}
