//! Instructions décodées du PIC18F

use std::fmt;
use thiserror::Error;

/// Valeur d'un champ d'opérande extraite d'un mot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub name: char,
    pub width: u8,
    pub value: u16,
}

/// Champs d'opérandes d'une instruction, dans l'ordre de la table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperandFields {
    operands: Vec<Operand>,
}

impl OperandFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un opérande ; un nom déjà présent voit sa valeur écrasée sur place
    pub fn insert(&mut self, operand: Operand) {
        match self.operands.iter_mut().find(|o| o.name == operand.name) {
            Some(existing) => *existing = operand,
            None => self.operands.push(operand),
        }
    }

    pub fn get(&self, name: char) -> Option<u16> {
        self.operands.iter().find(|o| o.name == name).map(|o| o.value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operand> {
        self.operands.iter()
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }
}

/// Instruction décodée : mnémonique et valeurs des champs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub mnemonic: String,
    pub fields: OperandFields,
}

impl DecodedInstruction {
    pub fn new(mnemonic: impl Into<String>, fields: OperandFields) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            fields,
        }
    }

    /// Valeur d'un champ par son nom
    pub fn field(&self, name: char) -> Option<u16> {
        self.fields.get(name)
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        for (i, operand) in self.fields.iter().enumerate() {
            let separator = if i == 0 { " " } else { ", " };
            // Les adresses de registre s'affichent en hexadécimal
            if operand.width >= 8 {
                let digits = (operand.width as usize + 3) / 4;
                write!(f, "{}{}=0x{:0digits$x}", separator, operand.name, operand.value, digits = digits)?;
            } else {
                write!(f, "{}{}={}", separator, operand.name, operand.value)?;
            }
        }
        Ok(())
    }
}

/// Issue non décodable d'un mot ; n'interrompt jamais le désassemblage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Aucun préfixe de la table ne correspond
    #[error("Opcode inconnu: {word:#06x}")]
    UnknownOpcode { word: u16 },

    /// Plusieurs candidats à égalité sur la longueur de préfixe maximale
    #[error("Encodage ambigu pour {word:#06x}: {}", .candidates.join("|"))]
    AmbiguousEncoding { word: u16, candidates: Vec<String> },
}

impl DecodeError {
    /// Mot à l'origine de l'erreur
    pub fn word(&self) -> u16 {
        match self {
            DecodeError::UnknownOpcode { word } => *word,
            DecodeError::AmbiguousEncoding { word, .. } => *word,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operand(name: char, width: u8, value: u16) -> Operand {
        Operand { name, width, value }
    }

    #[test]
    fn test_operand_fields_last_wins() {
        let mut fields = OperandFields::new();
        fields.insert(operand('f', 4, 3));
        fields.insert(operand('d', 1, 1));
        fields.insert(operand('f', 4, 9));

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get('f'), Some(9));
        assert_eq!(fields.get('d'), Some(1));
        assert_eq!(fields.get('a'), None);

        // La position d'origine est conservée
        let names: Vec<char> = fields.iter().map(|o| o.name).collect();
        assert_eq!(names, vec!['f', 'd']);
    }

    #[test]
    fn test_display() {
        let mut fields = OperandFields::new();
        fields.insert(operand('d', 1, 0));
        fields.insert(operand('a', 1, 1));
        fields.insert(operand('f', 8, 0x21));
        let addwf = DecodedInstruction::new("ADDWF", fields);
        assert_eq!(addwf.to_string(), "ADDWF d=0, a=1, f=0x21");

        let mut fields = OperandFields::new();
        fields.insert(operand('f', 12, 0x0AB));
        let movff = DecodedInstruction::new("MOVFF", fields);
        assert_eq!(movff.to_string(), "MOVFF f=0x0ab");

        let nop = DecodedInstruction::new("NOP", OperandFields::new());
        assert_eq!(nop.to_string(), "NOP");
    }

    #[test]
    fn test_decode_error_messages() {
        let unknown = DecodeError::UnknownOpcode { word: 0xFFFF };
        assert_eq!(unknown.to_string(), "Opcode inconnu: 0xffff");
        assert_eq!(unknown.word(), 0xFFFF);

        let ambiguous = DecodeError::AmbiguousEncoding {
            word: 0xC000,
            candidates: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(ambiguous.to_string(), "Encodage ambigu pour 0xc000: A|B");
    }
}
