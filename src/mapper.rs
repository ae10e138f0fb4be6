mod nrom;
mod mmc1;
mod uxrom;
mod cnrom;
mod mmc3;
mod axrom;

pub use nrom::NRom;
pub use mmc1::Mmc1;
pub use uxrom::UxRom;
pub use cnrom::CnRom;
pub use mmc3::{Mmc3, Register};
pub use axrom::AxRom;

use log::info;

use crate::{banks::{BankWindow, ChrRam, ChrRom, PrgRam, PrgRom}, cart::{Cart, CartHeader, Mirroring}, mem::{Interrupt, Wiring}};

fn fmt_size(size: usize) -> String {
  match size {
    0 => String::from("none"),
    _ if size % 1024 == 0 => format!("{} KiB", size / 1024),
    _ => format!("{size} B"),
  }
}

/// State and services every mapper shares: cartridge RAM, bank windows
/// and the handles to the devices it drives.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Default)]
pub struct MapperBase {
  pub header: CartHeader,
  prg_ram: Option<Box<[u8]>>,
  chr_ram: Option<Box<[u8]>>,

  prg_rom_window: BankWindow<PrgRom>,
  prg_ram_window: BankWindow<PrgRam>,
  chr_rom_window: BankWindow<ChrRom>,
  chr_ram_window: BankWindow<ChrRam>,

  // handles can't be serialized, they have to be injected again after loading
  #[cfg_attr(feature = "serde", serde(skip))]
  wiring: Option<Wiring>,
}

impl MapperBase {
  pub fn new(header: &CartHeader) -> Self {
    let header = header.clone();
    let prg_ram = (header.prg_ram_size > 0)
      .then(|| vec![0; header.prg_ram_size].into_boxed_slice());
    let chr_ram = (header.chr_ram_size > 0)
      .then(|| vec![0; header.chr_ram_size].into_boxed_slice());

    info!("PRG RAM size: {}, battery backed: {}", fmt_size(header.prg_ram_size), fmt_size(header.prg_ram_battery_size));
    info!("CHR RAM size: {}, battery backed: {}", fmt_size(header.chr_ram_size), fmt_size(header.chr_ram_battery_size));
    if header.has_battery() {
      info!("NVRAM size: {}", fmt_size(header.prg_ram_battery_size + header.chr_ram_battery_size));
    }

    Self {
      prg_rom_window: BankWindow::new(header.prg_rom_size),
      prg_ram_window: BankWindow::new(header.prg_ram_size),
      chr_rom_window: BankWindow::new(header.chr_rom_size),
      chr_ram_window: BankWindow::new(header.chr_ram_size),
      prg_ram, chr_ram, header,
      wiring: None,
    }
  }

  pub fn inject(&mut self, wiring: Wiring) {
    self.wiring = Some(wiring);
  }

  pub fn is_wired(&self) -> bool {
    self.wiring.is_some()
  }

  /// Clears RAM, except for the battery backed part.
  pub fn reset_ram(&mut self) {
    if let Some(ram) = &mut self.prg_ram {
      let keep = self.header.prg_ram_battery_size.min(ram.len());
      ram[keep..].fill(0);
    }
    if let Some(ram) = &mut self.chr_ram {
      let keep = self.header.chr_ram_battery_size.min(ram.len());
      ram[keep..].fill(0);
    }
  }

  pub fn prg_ram(&self) -> Option<&[u8]> {
    self.prg_ram.as_deref()
  }

  pub fn chr_ram(&self) -> Option<&[u8]> {
    self.chr_ram.as_deref()
  }

  pub fn write_prg_ram(&mut self, offset: usize, val: u8) {
    if let Some(byte) = self.prg_ram.as_mut().and_then(|ram| ram.get_mut(offset)) {
      *byte = val;
    }
  }

  pub fn write_chr_ram(&mut self, offset: usize, val: u8) {
    if let Some(byte) = self.chr_ram.as_mut().and_then(|ram| ram.get_mut(offset)) {
      *byte = val;
    }
  }

  // PRG ROM mapping

  pub fn map_prg_rom_32k(&self, src: usize, dst: i32) {
    self.map_prg_rom(src * 4, dst.wrapping_mul(4), 4);
  }

  pub fn map_prg_rom_16k(&self, src: usize, dst: i32) {
    self.map_prg_rom(src * 2, dst.wrapping_mul(2), 2);
  }

  pub fn map_prg_rom_8k(&self, src: usize, dst: i32) {
    self.map_prg_rom(src, dst, 1);
  }

  fn map_prg_rom(&self, src: usize, dst: i32, count: usize) {
    let Some(wiring) = &self.wiring else { return };
    let mut mem = wiring.cpu_mem.borrow_mut();
    self.prg_rom_window.map(src, dst, count, |unit, bank| mem.map_prg_rom_bank(unit, bank));
  }

  // PRG RAM mapping

  pub fn map_prg_ram_8k(&self, src: usize, dst: i32) {
    let Some(wiring) = &self.wiring else { return };
    let mut mem = wiring.cpu_mem.borrow_mut();
    self.prg_ram_window.map(src, dst, 1, |unit, bank| mem.map_prg_ram_bank(unit, bank));
  }

  // CHR ROM mapping

  pub fn map_chr_rom_8k(&self, src: usize, dst: i32) {
    self.map_chr_rom(src * 8, dst.wrapping_mul(8), 8);
  }

  pub fn map_chr_rom_4k(&self, src: usize, dst: i32) {
    self.map_chr_rom(src * 4, dst.wrapping_mul(4), 4);
  }

  pub fn map_chr_rom_2k(&self, src: usize, dst: i32) {
    self.map_chr_rom(src * 2, dst.wrapping_mul(2), 2);
  }

  pub fn map_chr_rom_1k(&self, src: usize, dst: i32) {
    self.map_chr_rom(src, dst, 1);
  }

  fn map_chr_rom(&self, src: usize, dst: i32, count: usize) {
    let Some(wiring) = &self.wiring else { return };
    let mut mem = wiring.ppu_mem.borrow_mut();
    self.chr_rom_window.map(src, dst, count, |unit, bank| mem.map_chr_bank(unit, bank));
  }

  // CHR RAM mapping
  // Only known game using battery-backed CHR RAM is RacerMate Challenge II

  pub fn map_chr_ram_8k(&self, src: usize, dst: i32) {
    self.map_chr_ram(src * 8, dst.wrapping_mul(8), 8);
  }

  pub fn map_chr_ram_4k(&self, src: usize, dst: i32) {
    self.map_chr_ram(src * 4, dst.wrapping_mul(4), 4);
  }

  fn map_chr_ram(&self, src: usize, dst: i32, count: usize) {
    let Some(wiring) = &self.wiring else { return };
    let mut mem = wiring.ppu_mem.borrow_mut();
    self.chr_ram_window.map(src, dst, count, |unit, bank| mem.map_chr_bank(unit, bank));
  }

  /// Maps CHR RAM when the board has it, CHR ROM otherwise.
  pub fn map_chr_8k(&self, src: usize, dst: i32) {
    if self.header.has_chr_ram() {
      self.map_chr_ram_8k(src, dst);
    } else {
      self.map_chr_rom_8k(src, dst);
    }
  }

  pub fn map_chr_4k(&self, src: usize, dst: i32) {
    if self.header.has_chr_ram() {
      self.map_chr_ram_4k(src, dst);
    } else {
      self.map_chr_rom_4k(src, dst);
    }
  }

  // Non-volatile RAM

  pub fn nvram_size(&self) -> usize {
    // No known NES game uses both battery-backed PRG RAM and CHR RAM
    self.header.prg_ram_battery_size + self.header.chr_ram_battery_size
  }

  pub fn nvram(&self) -> Option<&[u8]> {
    let (ram, size) = self.battery_ram()?;
    ram.get(..size)
  }

  /// Copies as much of `data` as fits in the battery backed RAM.
  /// Extra bytes are dropped, and a shorter blob leaves the rest untouched.
  pub fn set_nvram(&mut self, data: &[u8]) {
    let (ram, size) = if self.header.prg_ram_battery_size > 0 {
      (self.prg_ram.as_deref_mut(), self.header.prg_ram_battery_size)
    } else if self.header.chr_ram_battery_size > 0 {
      (self.chr_ram.as_deref_mut(), self.header.chr_ram_battery_size)
    } else {
      (None, 0)
    };

    if let Some(ram) = ram {
      let len = data.len().min(size).min(ram.len());
      ram[..len].copy_from_slice(&data[..len]);
    }
  }

  fn battery_ram(&self) -> Option<(&[u8], usize)> {
    if self.header.prg_ram_battery_size > 0 {
      Some((self.prg_ram.as_deref()?, self.header.prg_ram_battery_size))
    } else if self.header.chr_ram_battery_size > 0 {
      Some((self.chr_ram.as_deref()?, self.header.chr_ram_battery_size))
    } else {
      None
    }
  }

  // Nametables mirroring

  pub fn set_single_screen_mirroring(&self, area: usize) {
    self.set_mirroring_mode(Mirroring::SingleScreen(area));
  }

  pub fn set_vertical_mirroring(&self) {
    self.set_mirroring_mode(Mirroring::Vertical);
  }

  pub fn set_horizontal_mirroring(&self) {
    self.set_mirroring_mode(Mirroring::Horizontal);
  }

  pub fn set_four_screen_mirroring(&self) {
    self.set_mirroring_mode(Mirroring::FourScreen);
  }

  pub fn set_mirroring(&self, areas: [usize; 4]) {
    if let Some(wiring) = &self.wiring {
      wiring.ppu_mem.borrow_mut().map_nametable_areas(areas);
    }
  }

  fn set_mirroring_mode(&self, mirroring: Mirroring) {
    if let Some(wiring) = &self.wiring {
      wiring.ppu_mem.borrow_mut().set_mirroring(mirroring);
    }
  }

  // Interrupts and PPU bus

  pub fn activate_interrupt(&self, kind: Interrupt) {
    if let Some(wiring) = &self.wiring {
      wiring.cpu.borrow_mut().activate_interrupt(kind);
    }
  }

  pub fn clear_interrupt(&self, kind: Interrupt) {
    if let Some(wiring) = &self.wiring {
      wiring.cpu.borrow_mut().clear_interrupt(kind);
    }
  }

  /// Current PPU address bus, or 0 when no PPU is wired.
  pub fn ppu_address(&self) -> u16 {
    self.wiring.as_ref()
      .map(|wiring| wiring.ppu.borrow().address())
      .unwrap_or(0)
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
pub trait Mapper {
  fn base(&self) -> &MapperBase;
  fn base_mut(&mut self) -> &mut MapperBase;

  fn inject(&mut self, wiring: Wiring) {
    self.base_mut().inject(wiring);
  }

  fn power_up(&mut self) {
    info!("Resetting mapper");
    self.base_mut().reset_ram();
    self.reset();
  }

  // For mappers to implement
  fn reset(&mut self) {}
  fn write(&mut self, _addr: u16, _val: u8) {}
  fn tick(&mut self) {}

  fn prg_ram(&self) -> Option<&[u8]> { self.base().prg_ram() }
  fn chr_ram(&self) -> Option<&[u8]> { self.base().chr_ram() }
  fn write_prg_ram(&mut self, offset: usize, val: u8) { self.base_mut().write_prg_ram(offset, val) }
  fn write_chr_ram(&mut self, offset: usize, val: u8) { self.base_mut().write_chr_ram(offset, val) }

  fn nvram_size(&self) -> usize { self.base().nvram_size() }
  fn nvram(&self) -> Option<&[u8]> { self.base().nvram() }
  fn set_nvram(&mut self, data: &[u8]) { self.base_mut().set_nvram(data) }
}

pub type CartMapper = Box<dyn Mapper>;

pub fn new_mapper(cart: &Cart) -> Result<CartMapper, String> {
  let header = &cart.header;
  let mapper: CartMapper = match header.mapper {
    0 => Box::new(NRom::new(header)),
    1 => Box::new(Mmc1::new(header)),
    2 => Box::new(UxRom::new(header)),
    3 => Box::new(CnRom::new(header)),
    4 => Box::new(Mmc3::new(header)),
    7 => Box::new(AxRom::new(header)),
    _ => return Err(format!("Mapper {} not implemented", header.mapper)),
  };

  info!("Created mapper {} ({})", header.mapper, mapper_name(header.mapper, header.submapper));
  Ok(mapper)
}

pub fn mapper_name(id: u16, submapper: u8) -> &'static str {
  if id == 4 && submapper == 4 {
    return "MMC3A";
  }

  MAPPERS_TABLE.iter()
    .find(|m| m.0 == id)
    .map(|m| m.1)
    .unwrap_or("Not implemented")
}

const MAPPERS_TABLE: [(u16, &'static str); 6] = [
  (0, "NRom"),
  (1, "MMC1"),
  (2, "UxRom"),
  (3, "CNRom"),
  (4, "MMC3"),
  (7, "AxRom"),
];
