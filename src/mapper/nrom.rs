use crate::cart::CartHeader;
use super::{Mapper, MapperBase};

// Mapper 00
// https://www.nesdev.org/wiki/NROM
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NRom {
  base: MapperBase,
}

impl NRom {
  pub fn new(header: &CartHeader) -> Self {
    Self { base: MapperBase::new(header) }
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for NRom {
  fn base(&self) -> &MapperBase { &self.base }
  fn base_mut(&mut self) -> &mut MapperBase { &mut self.base }

  fn reset(&mut self) {
    // 16 KiB boards see their only bank mirrored at $C000
    self.base.map_prg_rom_32k(0, 0);
    self.base.map_prg_ram_8k(0, 0);
    self.base.map_chr_8k(0, 0);
  }
}
