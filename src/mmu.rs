use log::trace;

use crate::{banks::{CHR_UNIT_SHIFT, PRG_UNIT_SHIFT}, cart::{CartHeader, Mirroring}, mem::{CpuMemory, PpuMemory}};

/// One address window split in equally sized pages,
/// each page pointing to a bank of the backing memory.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default)]
pub struct Banking {
  pub data_size: usize,
  pub bank_size: usize,
  bank_size_shift: usize,
  pub banks_count: usize,
  pub pages_start: usize,
  pub bankings: Box<[usize]>,
}

// https://stackoverflow.com/questions/25787613/division-and-multiplication-by-power-of-2
impl Banking {
  pub fn new(data_size: usize, pages_start: usize, page_size_shift: u32, pages_count: usize) -> Self {
    let bankings = vec![0; pages_count].into_boxed_slice();
    let bank_size = 1 << page_size_shift;
    let banks_count = data_size >> page_size_shift;
    Self { bankings, data_size, pages_start, bank_size, bank_size_shift: page_size_shift as usize, banks_count }
  }

  pub fn set_page(&mut self, page: usize, bank: usize) {
    // the mapper already wrapped the bank, i do not expect to write outside the slots array either
    if let Some(slot) = self.bankings.get_mut(page) {
      *slot = bank << self.bank_size_shift;
    } else {
      trace!("Page {page} is outside of a {} pages window", self.bankings.len());
    }
  }

  /// Physical bank currently mapped on `page`, if the page is in the window.
  pub fn bank(&self, page: usize) -> Option<usize> {
    self.bankings.get(page).map(|offset| offset >> self.bank_size_shift)
  }

  pub fn page_to_bank_addr(&self, page: usize, addr: usize) -> Option<usize> {
    self.bankings.get(page).map(|offset| offset + (addr & (self.bank_size-1)))
  }

  /// Translates a bus address to an offset in the backing memory.
  /// Addresses outside the window translate to nothing.
  pub fn translate(&self, addr: usize) -> Option<usize> {
    let page = addr.checked_sub(self.pages_start)? >> self.bank_size_shift;
    self.page_to_bank_addr(page, addr)
  }
}

/// Reference memory subsystem: it only keeps the bank tables,
/// the bytes themselves stay with whoever owns them.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct MemConfig {
  pub prg:  Banking,
  pub sram: Banking,
  pub chr:  Banking,
  pub ciram: Banking,
  pub mirroring: Mirroring,
}

impl Default for MemConfig {
  fn default() -> Self {
    let header = Default::default();
    Self::new(&header)
  }
}

impl MemConfig {
  pub fn new(header: &CartHeader) -> Self {
    let chr_size = if header.has_chr_ram() { header.chr_ram_size } else { header.chr_rom_size };

    let prg = Banking::new(header.prg_rom_size, 0x8000, PRG_UNIT_SHIFT, 4);
    let sram = Banking::new(header.prg_ram_size, 0x6000, PRG_UNIT_SHIFT, 1);
    let chr = Banking::new(chr_size, 0, CHR_UNIT_SHIFT, 8);
    let ciram = Banking::new(4*1024, 0x2000, CHR_UNIT_SHIFT, 4);

    let mut res = Self { prg, sram, chr, ciram, mirroring: header.mirroring };
    res.map_nametable_areas(header.mirroring.areas());
    res
  }
}

impl CpuMemory for MemConfig {
  fn map_prg_rom_bank(&mut self, unit: usize, bank: usize) {
    self.prg.set_page(unit, bank);
  }

  fn map_prg_ram_bank(&mut self, unit: usize, bank: usize) {
    self.sram.set_page(unit, bank);
  }
}

impl PpuMemory for MemConfig {
  fn map_chr_bank(&mut self, unit: usize, bank: usize) {
    self.chr.set_page(unit, bank);
  }

  fn set_mirroring(&mut self, mirroring: Mirroring) {
    self.mirroring = mirroring;
    self.map_nametable_areas(mirroring.areas());
  }

  fn map_nametable_areas(&mut self, areas: [usize; 4]) {
    for (page, area) in areas.into_iter().enumerate() {
      self.ciram.set_page(page, area);
    }
  }
}
