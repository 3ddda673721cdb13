//! Chargement des fichiers Intel HEX en mémoire programme

use log::{debug, warn};
use std::fs;
use std::path::Path;

use super::validation::{HexError, RecordValidator};
use crate::memory::{ProgramMemory, WordOrder, DEFAULT_PADDING};

/// Types d'enregistrements Intel HEX
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Data,
    EndOfFile,
    ExtendedSegmentAddress,
    StartSegmentAddress,
    ExtendedLinearAddress,
    StartLinearAddress,
}

impl RecordType {
    fn from_code(line: usize, code: u8) -> Result<Self, HexError> {
        match code {
            0x00 => Ok(RecordType::Data),
            0x01 => Ok(RecordType::EndOfFile),
            0x02 => Ok(RecordType::ExtendedSegmentAddress),
            0x03 => Ok(RecordType::StartSegmentAddress),
            0x04 => Ok(RecordType::ExtendedLinearAddress),
            0x05 => Ok(RecordType::StartLinearAddress),
            _ => Err(HexError::UnsupportedRecordType {
                line,
                record_type: code,
            }),
        }
    }
}

/// Enregistrement `:LLAAAATT<données>CC` décodé et validé
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexRecord {
    pub record_type: RecordType,
    pub offset: u16,
    pub data: Vec<u8>,
}

impl HexRecord {
    /// Parse une ligne (numérotée à partir de 1)
    pub fn parse(line: usize, text: &str) -> Result<Self, HexError> {
        let body = text
            .strip_prefix(':')
            .ok_or_else(|| HexError::invalid(line, "':' attendu en début de ligne"))?;

        let bytes = RecordValidator::decode_hex_bytes(line, body)?;
        RecordValidator::validate_record(line, &bytes)?;

        let record_type = RecordType::from_code(line, bytes[3])?;
        let offset = u16::from_be_bytes([bytes[1], bytes[2]]);
        let data = bytes[4..bytes.len() - 1].to_vec();

        Ok(Self {
            record_type,
            offset,
            data,
        })
    }

    /// Valeur 16 bits des enregistrements d'adresse étendue
    fn address_value(&self, line: usize) -> Result<u32, HexError> {
        match self.data.as_slice() {
            [high, low] => Ok(u16::from_be_bytes([*high, *low]) as u32),
            _ => Err(HexError::invalid(line, "adresse étendue sur 2 octets attendue")),
        }
    }
}

/// Chargeur de fichiers Intel HEX
#[derive(Debug, Clone)]
pub struct HexLoader {
    padding: u8,
    word_order: WordOrder,
}

impl HexLoader {
    pub fn new() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            word_order: WordOrder::default(),
        }
    }

    pub fn with_padding(mut self, padding: u8) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_word_order(mut self, word_order: WordOrder) -> Self {
        self.word_order = word_order;
        self
    }

    /// Charge un fichier Intel HEX
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ProgramMemory, HexError> {
        let path = path.as_ref();
        debug!("Chargement de {}", path.display());
        let contents = fs::read_to_string(path)?;
        self.parse(&contents)
    }

    /// Reconstitue la mémoire programme à partir du texte Intel HEX
    pub fn parse(&self, source: &str) -> Result<ProgramMemory, HexError> {
        let mut memory = ProgramMemory::new()
            .with_padding(self.padding)
            .with_word_order(self.word_order);
        let mut base = 0u32;
        let mut records = 0usize;
        let mut reached_eof = false;

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }

            let record = HexRecord::parse(line, text)?;
            records += 1;

            match record.record_type {
                RecordType::Data => {
                    let start = base.wrapping_add(record.offset as u32);
                    for (i, &byte) in record.data.iter().enumerate() {
                        let address = start.wrapping_add(i as u32);
                        if memory.write_u8(address, byte).is_some() {
                            return Err(HexError::AddressOverlap { line, address });
                        }
                    }
                }
                RecordType::EndOfFile => {
                    reached_eof = true;
                    break;
                }
                RecordType::ExtendedSegmentAddress => base = record.address_value(line)? << 4,
                RecordType::ExtendedLinearAddress => base = record.address_value(line)? << 16,
                RecordType::StartSegmentAddress | RecordType::StartLinearAddress => {
                    // Adresse de démarrage : sans effet sur le contenu mémoire
                }
            }
        }

        if !reached_eof {
            warn!("Fichier Intel HEX sans enregistrement de fin");
        }
        debug!(
            "{} enregistrements lus, {} octets programmés",
            records,
            memory.len()
        );

        Ok(memory)
    }
}

impl Default for HexLoader {
    fn default() -> Self {
        Self::new()
    }
}
