#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
  #[default] Horizontal,
  Vertical,
  FourScreen,
  SingleScreen(usize),
}

impl Mirroring {
  /// Nametable area backing each of the four logical nametables ($2000, $2400, $2800, $2C00).
  pub fn areas(&self) -> [usize; 4] {
    match self {
      Mirroring::Horizontal => [0, 0, 1, 1],
      Mirroring::Vertical   => [0, 1, 0, 1],
      Mirroring::FourScreen => [0, 1, 2, 3],
      Mirroring::SingleScreen(area) => [*area; 4],
    }
  }
}

/// Everything the loader found out about the cartridge.
/// Sizes are in bytes, a zero size means the memory is absent.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CartHeader {
  pub mapper: u16,
  pub submapper: u8,
  pub mirroring: Mirroring,

  pub prg_rom_size: usize,
  pub chr_rom_size: usize,
  pub prg_ram_size: usize,
  pub chr_ram_size: usize,

  // battery backed prefix of the ram of the same kind
  pub prg_ram_battery_size: usize,
  pub chr_ram_battery_size: usize,
}

impl CartHeader {
  pub fn has_chr_ram(&self) -> bool {
    self.chr_ram_size > 0
  }

  pub fn has_battery(&self) -> bool {
    self.prg_ram_battery_size > 0 || self.chr_ram_battery_size > 0
  }

  fn validate(&self) -> Result<(), String> {
    if self.prg_ram_battery_size > self.prg_ram_size {
      return Err(format!(
        "Battery backed PRG RAM ({} bytes) is bigger than PRG RAM ({} bytes)",
        self.prg_ram_battery_size, self.prg_ram_size
      ));
    }
    if self.chr_ram_battery_size > self.chr_ram_size {
      return Err(format!(
        "Battery backed CHR RAM ({} bytes) is bigger than CHR RAM ({} bytes)",
        self.chr_ram_battery_size, self.chr_ram_size
      ));
    }
    // no known game has both
    if self.prg_ram_battery_size > 0 && self.chr_ram_battery_size > 0 {
      return Err("Cartridge can't have both battery backed PRG RAM and CHR RAM".to_string());
    }
    Ok(())
  }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct Cart {
  pub header: CartHeader,
  // we do not care to serialize roms
  #[cfg_attr(feature = "serde", serde(skip))]
  pub prg: Box<[u8]>,
  #[cfg_attr(feature = "serde", serde(skip))]
  pub chr: Box<[u8]>,
}

impl Cart {
  pub fn new(header: CartHeader, prg: Box<[u8]>, chr: Box<[u8]>) -> Result<Self, String> {
    if prg.len() != header.prg_rom_size {
      return Err(format!(
        "PRG ROM is {} bytes, but header declares {} bytes",
        prg.len(), header.prg_rom_size
      ));
    }
    if chr.len() != header.chr_rom_size {
      return Err(format!(
        "CHR ROM is {} bytes, but header declares {} bytes",
        chr.len(), header.chr_rom_size
      ));
    }
    header.validate()?;

    Ok(Self { header, prg, chr })
  }
}

#[cfg(test)]
mod cart_tests {
  use super::*;

  fn header() -> CartHeader {
    CartHeader {
      mapper: 4,
      prg_rom_size: 0x8000,
      chr_rom_size: 0x2000,
      prg_ram_size: 0x2000,
      ..Default::default()
    }
  }

  #[test]
  fn mirroring_areas() {
    assert_eq!(Mirroring::Horizontal.areas(), [0, 0, 1, 1]);
    assert_eq!(Mirroring::Vertical.areas(), [0, 1, 0, 1]);
    assert_eq!(Mirroring::FourScreen.areas(), [0, 1, 2, 3]);
    assert_eq!(Mirroring::SingleScreen(1).areas(), [1, 1, 1, 1]);
  }

  #[test]
  fn accepts_matching_roms() {
    let cart = Cart::new(header(), vec![0; 0x8000].into(), vec![0; 0x2000].into());
    assert!(cart.is_ok());
  }

  #[test]
  fn rejects_short_prg() {
    let cart = Cart::new(header(), vec![0; 0x4000].into(), vec![0; 0x2000].into());
    assert!(cart.is_err());
  }

  #[test]
  fn rejects_two_batteries() {
    let header = CartHeader {
      chr_ram_size: 0x2000,
      prg_ram_battery_size: 0x2000,
      chr_ram_battery_size: 0x2000,
      ..header()
    };
    let cart = Cart::new(header, vec![0; 0x8000].into(), vec![0; 0x2000].into());
    assert!(cart.is_err());
  }

  #[test]
  fn battery_and_chr_ram_flags() {
    assert!(!header().has_battery());
    assert!(!header().has_chr_ram());

    let header = CartHeader {
      chr_ram_size: 0x2000,
      chr_ram_battery_size: 0x400,
      ..header()
    };
    assert!(header.has_battery());
    assert!(header.has_chr_ram());
  }

  #[test]
  fn rejects_oversized_battery() {
    let header = CartHeader { prg_ram_battery_size: 0x4000, ..header() };
    assert!(header.validate().is_err());
  }
}
