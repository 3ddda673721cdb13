//! Mémoire programme du PIC18F
//!
//! La mémoire flash est reconstituée à partir d'un fichier Intel HEX : une
//! table creuse adresse → octet, où les adresses non programmées renvoient
//! l'octet de remplissage (0xFF, flash effacée).

pub mod interface;
pub mod rom;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use interface::*;
pub use rom::*;

/// Taille d'un mot de programme en octets
pub const WORD_SIZE_BYTES: u32 = 2;

/// Ordre des octets dans un mot de programme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WordOrder {
    /// Octet de poids fort à l'adresse basse : `(mem[i] << 8) | mem[i + 1]`
    #[default]
    BigEndian,

    /// Octet de poids faible à l'adresse basse (disposition physique du PIC18)
    LittleEndian,
}

impl WordOrder {
    /// Assemble deux octets consécutifs (adresse basse en premier)
    pub fn combine(self, first: u8, second: u8) -> u16 {
        match self {
            WordOrder::BigEndian => u16::from_be_bytes([first, second]),
            WordOrder::LittleEndian => u16::from_le_bytes([first, second]),
        }
    }
}

/// Erreurs d'accès à la mémoire programme
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("Adresse non alignée sur un mot: {address:#08x}")]
    UnalignedAddress { address: u32 },

    #[error("Plage d'adresses invalide: {start:#08x}..{end:#08x}")]
    InvalidRange { start: u32, end: u32 },

    #[error("Dépassement de l'espace d'adressage à {address:#08x}")]
    AddressOverflow { address: u32 },
}
