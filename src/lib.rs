pub mod cart;
pub mod banks;
pub mod mem;
pub mod mmu;
pub mod mapper;
