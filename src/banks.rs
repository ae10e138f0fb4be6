use core::marker::PhantomData;

use log::trace;

/// PRG memory is banked in 8 KiB units.
pub const PRG_UNIT_SHIFT: u32 = 13;
/// CHR memory is banked in 1 KiB units.
pub const CHR_UNIT_SHIFT: u32 = 10;

pub trait BankKind {
  const UNIT_SHIFT: u32;
  const NAME: &'static str;
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy)]
pub struct PrgRom;
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy)]
pub struct PrgRam;
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy)]
pub struct ChrRom;
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy)]
pub struct ChrRam;

impl BankKind for PrgRom { const UNIT_SHIFT: u32 = PRG_UNIT_SHIFT; const NAME: &'static str = "PRG ROM"; }
impl BankKind for PrgRam { const UNIT_SHIFT: u32 = PRG_UNIT_SHIFT; const NAME: &'static str = "PRG RAM"; }
impl BankKind for ChrRom { const UNIT_SHIFT: u32 = CHR_UNIT_SHIFT; const NAME: &'static str = "CHR ROM"; }
impl BankKind for ChrRam { const UNIT_SHIFT: u32 = CHR_UNIT_SHIFT; const NAME: &'static str = "CHR RAM"; }

/// Highest physical unit of a memory, usable as a mask.
///
/// Only meaningful for power of two sizes: any other size gives a mask
/// with holes, and banks wrap onto whatever units the mask lets through.
pub fn max_unit(physical_size: usize, unit_shift: u32) -> u32 {
  (physical_size.wrapping_sub(1) >> unit_shift) as u32
}

/// Wraps a (possibly negative) logical bank onto a physical unit.
///
/// The bank is taken modulo 2^32 in two's complement before masking,
/// so -1 is the last unit, -2 the one before it, and so on.
pub fn physical_unit(bank: i32, max_unit: u32) -> usize {
  (bank as u32 & max_unit) as usize
}

/// Assigns `count` consecutive units, starting from logical unit `src`,
/// to the physical units starting from `dst`.
/// Requests never fail: out of range banks silently wrap.
pub fn map_bank_window(
  src: usize,
  dst: i32,
  count: usize,
  unit_shift: u32,
  physical_size: usize,
  mut assign: impl FnMut(usize, usize),
) {
  // nothing to map onto
  if physical_size == 0 { return; }

  let max_unit = max_unit(physical_size, unit_shift);
  for i in 0..count {
    assign(src + i, physical_unit(dst.wrapping_add(i as i32), max_unit));
  }
}

/// Bank window over one kind of cartridge memory.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct BankWindow<K> {
  pub physical_size: usize,
  kind: PhantomData<K>,
}

impl<K: BankKind> BankWindow<K> {
  pub fn new(physical_size: usize) -> Self {
    Self { physical_size, kind: PhantomData::<K> }
  }

  pub fn is_empty(&self) -> bool {
    self.physical_size == 0
  }

  pub fn units_count(&self) -> usize {
    self.physical_size >> K::UNIT_SHIFT
  }

  pub fn physical_unit(&self, bank: i32) -> usize {
    physical_unit(bank, max_unit(self.physical_size, K::UNIT_SHIFT))
  }

  pub fn map(&self, src: usize, dst: i32, count: usize, assign: impl FnMut(usize, usize)) {
    if self.is_empty() {
      trace!("No {} to map on unit {src}", K::NAME);
    }
    map_bank_window(src, dst, count, K::UNIT_SHIFT, self.physical_size, assign);
  }
}

#[cfg(test)]
mod banks_tests {
  use super::*;

  fn collect(src: usize, dst: i32, count: usize, shift: u32, size: usize) -> Vec<(usize, usize)> {
    let mut assigned = Vec::new();
    map_bank_window(src, dst, count, shift, size, |unit, bank| assigned.push((unit, bank)));
    assigned
  }

  #[test]
  fn last_32kb_of_64kb_prg() {
    let assigned = collect(0, -4, 4, PRG_UNIT_SHIFT, 0x10000);
    assert_eq!(assigned, vec![(0, 4), (1, 5), (2, 6), (3, 7)]);
  }

  #[test]
  fn wraps_like_twos_complement_mask() {
    for exp in [PRG_UNIT_SHIFT, CHR_UNIT_SHIFT] {
      for units in [1usize, 2, 4, 8, 16, 32, 256] {
        let size = units << exp;
        for d in -300i32..300 {
          let assigned = collect(0, d, 1, exp, size);
          let expected = (d & (units as i32 - 1)) as usize;
          assert_eq!(assigned, vec![(0, expected)], "size {size:#x}, bank {d}");
        }
      }
    }
  }

  #[test]
  fn negative_banks_count_from_the_end() {
    let window = BankWindow::<ChrRom>::new(128 * 1024);
    assert_eq!(window.units_count(), 128);
    assert_eq!(window.physical_unit(-1), 127);
    assert_eq!(window.physical_unit(-2), 126);
    assert_eq!(window.physical_unit(128), 0);
  }

  #[test]
  fn extreme_banks_do_not_overflow() {
    let assigned = collect(0, i32::MAX, 2, PRG_UNIT_SHIFT, 0x8000);
    assert_eq!(assigned, vec![(0, 3), (1, 0)]);
  }

  #[test]
  fn empty_memory_maps_nothing() {
    let window = BankWindow::<PrgRam>::new(0);
    let mut calls = 0;
    window.map(0, 0, 1, |_, _| calls += 1);
    assert!(window.is_empty());
    assert_eq!(calls, 0);
  }

  #[test]
  fn memory_smaller_than_unit_maps_to_first_unit() {
    let window = BankWindow::<PrgRam>::new(0x800);
    assert_eq!(window.physical_unit(5), 0);
  }
}
