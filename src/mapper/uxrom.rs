use crate::cart::CartHeader;
use super::{Mapper, MapperBase};

// Mapper 02
// https://www.nesdev.org/wiki/UxROM
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UxRom {
  base: MapperBase,
}

impl UxRom {
  pub fn new(header: &CartHeader) -> Self {
    Self { base: MapperBase::new(header) }
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for UxRom {
  fn base(&self) -> &MapperBase { &self.base }
  fn base_mut(&mut self) -> &mut MapperBase { &mut self.base }

  fn reset(&mut self) {
    self.base.map_prg_rom_16k(0, 0);
    self.base.map_prg_rom_16k(1, -1);
    self.base.map_chr_8k(0, 0);
  }

  fn write(&mut self, addr: u16, val: u8) {
    if addr < 0x8000 { return; }
    self.base.map_prg_rom_16k(0, val as i32);
  }
}
