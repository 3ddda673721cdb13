//! Décodage des instructions du PIC18F
//!
//! Le PIC18F utilise des mots de programme de 16 bits. Chaque instruction est
//! identifiée par un préfixe de longueur variable ; les bits restants portent
//! les opérandes (bit de destination `d`, bit d'accès banque `a`, registre `f`).

pub mod decoder;
pub mod instruction_formats;
pub mod instructions;

pub use decoder::*;
pub use instruction_formats::*;
pub use instructions::*;
