#![allow(dead_code)]
use std::{cell::RefCell, rc::Rc};

use nen_mapper::{cart::Mirroring, mapper::Mapper, mem::{CpuMemory, Interrupt, PpuMemory, Shared, Wiring}};

pub fn init_log() {
  let mut builder = colog::basic_builder();
  builder.filter_level(log::LevelFilter::Trace);
  builder.is_test(true);
  let _ = builder.try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
  PrgRom(usize, usize),
  PrgRam(usize, usize),
  Chr(usize, usize),
  Mirroring(Mirroring),
  Nametables([usize; 4]),
}

/// Memory subsystem that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct Recorder {
  pub calls: Vec<Call>,
}

impl CpuMemory for Recorder {
  fn map_prg_rom_bank(&mut self, unit: usize, bank: usize) {
    self.calls.push(Call::PrgRom(unit, bank));
  }

  fn map_prg_ram_bank(&mut self, unit: usize, bank: usize) {
    self.calls.push(Call::PrgRam(unit, bank));
  }
}

impl PpuMemory for Recorder {
  fn map_chr_bank(&mut self, unit: usize, bank: usize) {
    self.calls.push(Call::Chr(unit, bank));
  }

  fn set_mirroring(&mut self, mirroring: Mirroring) {
    self.calls.push(Call::Mirroring(mirroring));
  }

  fn map_nametable_areas(&mut self, areas: [usize; 4]) {
    self.calls.push(Call::Nametables(areas));
  }
}

/// The devices a mapper gets wired to: one memory subsystem serving
/// both CPU and PPU, the pending interrupts and the PPU address bus.
pub struct Rig<M> {
  pub mem: Shared<M>,
  pub irq: Shared<Interrupt>,
  pub bus: Shared<u16>,
}

impl<M: CpuMemory + PpuMemory + 'static> Rig<M> {
  pub fn new(mem: M) -> Self {
    init_log();
    Self {
      mem: Rc::new(RefCell::new(mem)),
      irq: Rc::new(RefCell::new(Interrupt::empty())),
      bus: Rc::new(RefCell::new(0)),
    }
  }

  pub fn wiring(&self) -> Wiring {
    Wiring {
      cpu: self.irq.clone(),
      ppu: self.bus.clone(),
      cpu_mem: self.mem.clone(),
      ppu_mem: self.mem.clone(),
    }
  }

  pub fn irq_pending(&self) -> bool {
    self.irq.borrow().contains(Interrupt::IRQ_EXT)
  }

  /// Keeps A12 low for `low_ticks` ticks, then raises it for one tick.
  pub fn pulse_a12(&self, mapper: &mut dyn Mapper, low_ticks: usize) {
    *self.bus.borrow_mut() = 0x0FF0;
    for _ in 0..low_ticks {
      mapper.tick();
    }
    *self.bus.borrow_mut() = 0x1000;
    mapper.tick();
  }
}

impl Rig<Recorder> {
  pub fn take_calls(&self) -> Vec<Call> {
    std::mem::take(&mut self.mem.borrow_mut().calls)
  }
}
