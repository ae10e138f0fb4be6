use crate::cart::CartHeader;
use super::{Mapper, MapperBase};

// Mapper 07
// https://www.nesdev.org/wiki/AxROM
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxRom {
  base: MapperBase,
}

impl AxRom {
  pub fn new(header: &CartHeader) -> Self {
    Self { base: MapperBase::new(header) }
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for AxRom {
  fn base(&self) -> &MapperBase { &self.base }
  fn base_mut(&mut self) -> &mut MapperBase { &mut self.base }

  fn reset(&mut self) {
    self.base.map_prg_rom_32k(0, 0);
    self.base.map_chr_8k(0, 0);
    self.base.set_single_screen_mirroring(0);
  }

  fn write(&mut self, addr: u16, val: u8) {
    if addr < 0x8000 { return; }
    self.base.map_prg_rom_32k(0, (val & 0b111) as i32);
    self.base.set_single_screen_mirroring(((val >> 4) & 1) as usize);
  }
}
