//! PIC18 Dasm - Désassembleur PIC18F
//!
//! Cette bibliothèque décode les mots de 16 bits de la mémoire programme d'un
//! microcontrôleur PIC18F en instructions (mnémonique et opérandes), à partir
//! d'une table d'opcodes à préfixes de longueur variable.

pub mod config;
pub mod cpu;
pub mod listing;
pub mod memory;
pub mod rom;

pub use config::*;
pub use cpu::*;
pub use listing::*;
pub use memory::*;
pub use rom::*;

/// Version du désassembleur
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plage désassemblée par défaut (octets 0 à 2200, fin exclue)
pub const DEFAULT_SCAN_END: u32 = 2200;
