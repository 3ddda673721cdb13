//! Décodeur d'instructions PIC18F par préfixe le plus long
//!
//! Chaque entrée de la table dont le préfixe correspond aux premiers bits du
//! mot devient un candidat. Le candidat au préfixe strictement le plus long
//! l'emporte ; une égalité signale une table mal formée et produit
//! `DecodeError::AmbiguousEncoding` plutôt qu'un choix arbitraire.

use super::instruction_formats::*;
use super::instructions::*;
use log::trace;
use std::sync::Arc;

/// Candidat retenu pour un mot, le temps d'un décodage
#[derive(Debug)]
struct MatchCandidate<'t> {
    mnemonic: &'t str,
    prefix_len: u8,
    fields: OperandFields,
}

/// Décode un mot de 16 bits avec la table donnée
pub fn decode_word(table: &OpcodeTable, word: u16) -> Result<DecodedInstruction, DecodeError> {
    let candidates: Vec<MatchCandidate<'_>> = table
        .iter()
        .filter(|encoding| encoding.matches(word))
        .map(|encoding| MatchCandidate {
            mnemonic: encoding.mnemonic(),
            prefix_len: encoding.prefix_len(),
            fields: extract_fields(encoding, word),
        })
        .collect();

    for candidate in &candidates {
        trace!(
            "{:016b}: candidat {} (préfixe {} bits)",
            word,
            candidate.mnemonic,
            candidate.prefix_len
        );
    }

    let longest = match candidates.iter().map(|c| c.prefix_len).max() {
        Some(len) => len,
        None => return Err(DecodeError::UnknownOpcode { word }),
    };

    let mut winners: Vec<MatchCandidate<'_>> = candidates
        .into_iter()
        .filter(|c| c.prefix_len == longest)
        .collect();

    if winners.len() > 1 {
        return Err(DecodeError::AmbiguousEncoding {
            word,
            candidates: winners.iter().map(|c| c.mnemonic.to_string()).collect(),
        });
    }

    match winners.pop() {
        Some(winner) => Ok(DecodedInstruction::new(winner.mnemonic, winner.fields)),
        None => Err(DecodeError::UnknownOpcode { word }),
    }
}

/// Extrait les champs d'un encodage, bit de poids fort en tête, juste après le préfixe
pub fn extract_fields(encoding: &InstructionEncoding, word: u16) -> OperandFields {
    let mut fields = OperandFields::new();
    let mut remaining = WORD_BITS - encoding.prefix_len();

    for spec in encoding.fields() {
        remaining -= spec.width;
        fields.insert(Operand {
            name: spec.name,
            width: spec.width,
            value: (word >> remaining) & field_mask(spec.width),
        });
    }

    fields
}

/// Décodeur partageant une table d'opcodes immuable
///
/// Sans état : peut être cloné et utilisé depuis plusieurs threads.
#[derive(Debug, Clone)]
pub struct InstructionDecoder {
    table: Arc<OpcodeTable>,
}

impl InstructionDecoder {
    /// Crée un décodeur sur une table partagée
    pub fn new(table: Arc<OpcodeTable>) -> Self {
        Self { table }
    }

    /// Décodeur sur la table de référence PIC18F
    pub fn pic18() -> Result<Self, TableError> {
        Ok(Self::new(Arc::new(OpcodeTable::pic18()?)))
    }

    pub fn table(&self) -> &OpcodeTable {
        &self.table
    }

    /// Décode un mot de mémoire programme
    pub fn decode(&self, word: u16) -> Result<DecodedInstruction, DecodeError> {
        decode_word(&self.table, word)
    }
}
