//! Validation des enregistrements Intel HEX

use thiserror::Error;

/// Erreurs de lecture d'un fichier Intel HEX
#[derive(Debug, Error)]
pub enum HexError {
    /// Enregistrement mal formé
    #[error("Ligne {line}: enregistrement invalide ({reason})")]
    InvalidRecord { line: usize, reason: String },

    /// Checksum incorrect
    #[error("Ligne {line}: checksum incorrect: attendu {expected:#04x}, trouvé {found:#04x}")]
    ChecksumMismatch { line: usize, expected: u8, found: u8 },

    /// Type d'enregistrement inconnu
    #[error("Ligne {line}: type d'enregistrement non supporté {record_type:#04x}")]
    UnsupportedRecordType { line: usize, record_type: u8 },

    /// Adresse programmée deux fois
    #[error("Ligne {line}: adresse {address:#08x} déjà programmée")]
    AddressOverlap { line: usize, address: u32 },

    #[error("Erreur d'E/S: {0}")]
    Io(#[from] std::io::Error),
}

impl HexError {
    pub(crate) fn invalid(line: usize, reason: impl Into<String>) -> Self {
        HexError::InvalidRecord {
            line,
            reason: reason.into(),
        }
    }
}

/// Validateur d'enregistrements
pub struct RecordValidator;

impl RecordValidator {
    /// Décode le corps hexadécimal d'un enregistrement (après le `:`)
    pub fn decode_hex_bytes(line: usize, text: &str) -> Result<Vec<u8>, HexError> {
        if !text.is_ascii() {
            return Err(HexError::invalid(line, "caractères non ASCII"));
        }
        if text.len() % 2 != 0 {
            return Err(HexError::invalid(line, "nombre impair de chiffres hexadécimaux"));
        }

        (0..text.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&text[i..i + 2], 16).map_err(|_| {
                    HexError::invalid(line, format!("chiffres hexadécimaux invalides {:?}", &text[i..i + 2]))
                })
            })
            .collect()
    }

    /// Checksum attendu : complément à deux de la somme des octets
    pub fn calculate_checksum(bytes: &[u8]) -> u8 {
        let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        (!sum).wrapping_add(1)
    }

    /// Vérifie la longueur et le checksum d'un enregistrement décodé
    ///
    /// `bytes` contient tout l'enregistrement, checksum final compris.
    pub fn validate_record(line: usize, bytes: &[u8]) -> Result<(), HexError> {
        // longueur + adresse (2) + type + checksum
        if bytes.len() < 5 {
            return Err(HexError::invalid(line, "enregistrement trop court"));
        }

        let declared = bytes[0] as usize;
        if bytes.len() != declared + 5 {
            return Err(HexError::invalid(
                line,
                format!("{} octets annoncés, {} présents", declared, bytes.len() - 5),
            ));
        }

        let (body, checksum) = bytes.split_at(bytes.len() - 1);
        let expected = Self::calculate_checksum(body);
        if expected != checksum[0] {
            return Err(HexError::ChecksumMismatch {
                line,
                expected,
                found: checksum[0],
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        // :0300300002337A1E
        let bytes = [0x03, 0x00, 0x30, 0x00, 0x02, 0x33, 0x7A];
        assert_eq!(RecordValidator::calculate_checksum(&bytes), 0x1E);
        assert_eq!(RecordValidator::calculate_checksum(&[0x00, 0x00, 0x00, 0x01]), 0xFF);
    }

    #[test]
    fn test_decode_hex_bytes() {
        assert_eq!(
            RecordValidator::decode_hex_bytes(1, "00000001FF").unwrap(),
            vec![0x00, 0x00, 0x00, 0x01, 0xFF]
        );
        assert!(matches!(
            RecordValidator::decode_hex_bytes(3, "0000001"),
            Err(HexError::InvalidRecord { line: 3, .. })
        ));
        assert!(matches!(
            RecordValidator::decode_hex_bytes(4, "00zz"),
            Err(HexError::InvalidRecord { line: 4, .. })
        ));
    }

    #[test]
    fn test_validate_record() {
        let good = RecordValidator::decode_hex_bytes(1, "0300300002337A1E").unwrap();
        assert!(RecordValidator::validate_record(1, &good).is_ok());

        let bad = RecordValidator::decode_hex_bytes(2, "0300300002337A1F").unwrap();
        assert!(matches!(
            RecordValidator::validate_record(2, &bad),
            Err(HexError::ChecksumMismatch {
                line: 2,
                expected: 0x1E,
                found: 0x1F
            })
        ));

        let short = RecordValidator::decode_hex_bytes(5, "0400300002337A1D").unwrap();
        assert!(matches!(
            RecordValidator::validate_record(5, &short),
            Err(HexError::InvalidRecord { line: 5, .. })
        ));
    }
}
