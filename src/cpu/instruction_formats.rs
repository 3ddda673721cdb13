//! Formats d'encodage des instructions PIC18F
//!
//! Chaque mnémonique est décrit par un préfixe de bits fixe suivi d'une liste
//! ordonnée de champs d'opérandes contigus. Préfixe et champs remplissent
//! exactement un mot de 16 bits :
//!
//! ```text
//! +-----------+---+---+-----------------+
//! |  préfixe  | d | a |        f        |   ADDWF = 001001 d a ffffffff
//! +-----------+---+---+-----------------+
//!  15       10  9   8  7               0
//! ```
//!
//! Les préfixes peuvent être préfixes les uns des autres : c'est le décodeur
//! qui tranche en retenant le préfixe correspondant le plus long.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Taille d'un mot de mémoire programme en bits
pub const WORD_BITS: u8 = 16;

/// Table de référence PIC18F (sous-ensemble : opérations orientées registre)
///
/// Notation compacte : le premier élément est le préfixe, chaque élément
/// suivant est un champ dont le nom est le caractère répété et la largeur la
/// longueur de la répétition.
const PIC18_PATTERNS: &[(&str, &[&str])] = &[
    ("ADDWF", &["001001", "d", "a", "ffffffff"]),
    ("ADDWFC", &["001000", "d", "a", "ffffffff"]),
    ("ANDWF", &["000101", "d", "a", "ffffffff"]),
    ("CLRF", &["0110101", "a", "ffffffff"]),
    ("COMF", &["000111", "d", "a", "ffffffff"]),
    ("CPFSEQ", &["0110001", "a", "ffffffff"]),
    ("CPFSGT", &["0110010", "a", "ffffffff"]),
    ("CPFSLT", &["0110000", "a", "ffffffff"]),
    ("DECF", &["000001", "d", "a", "ffffffff"]),
    ("DECFSZ", &["001011", "d", "a", "ffffffff"]),
    ("DCFSNZ", &["010011", "d", "a", "ffffffff"]),
    ("INCF", &["001010", "d", "a", "ffffffff"]),
    ("INCFSZ", &["001111", "d", "a", "ffffffff"]),
    ("INFSNZ", &["010010", "d", "a", "ffffffff"]),
    ("IORWF", &["000100", "d", "a", "ffffffff"]),
    ("MOVF", &["010100", "d", "a", "ffffffff"]),
    // Premier mot seulement : le second mot (1111 + destination) n'est pas modélisé
    ("MOVFF", &["1100", "ffffffffffff"]),
    ("MOVWF", &["0110111", "a", "ffffffff"]),
    ("MULWF", &["0000001", "a", "ffffffff"]),
    ("NEGF", &["0110110", "a", "ffffffff"]),
    ("RLCF", &["001101", "d", "a", "ffffffff"]),
    ("RLNCF", &["010001", "d", "a", "ffffffff"]),
    ("RRCF", &["001100", "d", "a", "ffffffff"]),
    ("RRNCF", &["010000", "d", "a", "ffffffff"]),
    ("SETF", &["0110100", "a", "ffffffff"]),
    ("SUBFWB", &["010101", "d", "a", "ffffffff"]),
    ("SUBWF", &["010111", "d", "a", "ffffffff"]),
    ("SUBWFB", &["010110", "d", "a", "ffffffff"]),
    ("SWAPF", &["001110", "d", "a", "ffffffff"]),
    ("TSTFSZ", &["0110011", "a", "ffffffff"]),
    ("XORWF", &["000110", "d", "a", "ffffffff"]),
];

/// Erreurs de construction de la table d'opcodes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Encodage invalide pour {mnemonic}: préfixe + champs = {total} bits (attendu 16)")]
    MalformedEncoding { mnemonic: String, total: u32 },

    #[error("Préfixe invalide pour {mnemonic}: {prefix:?}")]
    InvalidPrefix { mnemonic: String, prefix: String },

    #[error("Nom de champ invalide pour {mnemonic}: {name:?}")]
    InvalidFieldName { mnemonic: String, name: String },

    #[error("Champ {name} de largeur nulle dans {mnemonic}")]
    ZeroWidthField { mnemonic: String, name: char },

    #[error("Champ {name} dupliqué dans {mnemonic}")]
    DuplicateFieldName { mnemonic: String, name: char },

    #[error("Mnémonique dupliqué: {0}")]
    DuplicateMnemonic(String),

    #[error("Champ {name} inexistant dans {mnemonic}")]
    UnknownField { mnemonic: String, name: char },

    #[error("Valeur {value:#x} trop large pour le champ {name} ({width} bits) de {mnemonic}")]
    FieldOverflow {
        mnemonic: String,
        name: char,
        width: u8,
        value: u16,
    },
}

/// Champ d'opérande : nom sur un caractère et largeur en bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    pub name: char,
    pub width: u8,
}

impl FieldSpec {
    pub fn new(name: char, width: u8) -> Self {
        Self { name, width }
    }

    /// Valeur maximale représentable dans le champ
    pub fn max_value(&self) -> u16 {
        field_mask(self.width)
    }
}

/// Masque des `width` bits de poids faible
pub(crate) fn field_mask(width: u8) -> u16 {
    if width >= WORD_BITS {
        u16::MAX
    } else {
        (1u16 << width) - 1
    }
}

/// Encodage d'un mnémonique : préfixe fixe puis champs contigus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionEncoding {
    mnemonic: String,
    /// Bits du préfixe, alignés à droite
    prefix_bits: u16,
    prefix_len: u8,
    fields: Vec<FieldSpec>,
}

impl InstructionEncoding {
    /// Crée un encodage à partir d'un préfixe `0`/`1` et de ses champs
    ///
    /// Rejette tout encodage dont préfixe et champs ne couvrent pas
    /// exactement 16 bits.
    pub fn new(
        mnemonic: impl Into<String>,
        prefix: &str,
        fields: Vec<FieldSpec>,
    ) -> Result<Self, TableError> {
        let mnemonic = mnemonic.into();
        let (prefix_bits, prefix_len) = parse_prefix(prefix).ok_or_else(|| {
            TableError::InvalidPrefix {
                mnemonic: mnemonic.clone(),
                prefix: prefix.to_string(),
            }
        })?;

        if let Some(field) = fields.iter().find(|f| f.width == 0) {
            return Err(TableError::ZeroWidthField {
                mnemonic,
                name: field.name,
            });
        }

        let total = prefix_len as u32 + fields.iter().map(|f| f.width as u32).sum::<u32>();
        if total != WORD_BITS as u32 {
            return Err(TableError::MalformedEncoding { mnemonic, total });
        }

        Ok(Self {
            mnemonic,
            prefix_bits,
            prefix_len,
            fields,
        })
    }

    /// Crée un encodage depuis la notation compacte `["001001", "d", "a", "ffffffff"]`
    pub fn from_pattern(mnemonic: impl Into<String>, pattern: &[&str]) -> Result<Self, TableError> {
        let mnemonic = mnemonic.into();
        let (prefix, runs) = match pattern.split_first() {
            Some(split) => split,
            None => {
                return Err(TableError::InvalidPrefix {
                    mnemonic,
                    prefix: String::new(),
                })
            }
        };

        let mut fields = Vec::with_capacity(runs.len());
        for run in runs {
            let name = match run.chars().next() {
                Some(c) if run.chars().all(|other| other == c) => c,
                _ => {
                    return Err(TableError::InvalidFieldName {
                        mnemonic,
                        name: run.to_string(),
                    })
                }
            };
            let width = u8::try_from(run.chars().count()).unwrap_or(u8::MAX);
            fields.push(FieldSpec::new(name, width));
        }

        Self::new(mnemonic, prefix, fields)
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn prefix_bits(&self) -> u16 {
        self.prefix_bits
    }

    /// Préfixe rendu en chaîne binaire, bit de poids fort en tête
    pub fn prefix_string(&self) -> String {
        format!("{:0width$b}", self.prefix_bits, width = self.prefix_len as usize)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Indique si les premiers bits du mot sont exactement le préfixe
    pub fn matches(&self, word: u16) -> bool {
        (word >> (WORD_BITS - self.prefix_len)) == self.prefix_bits
    }

    /// Construit le mot correspondant aux valeurs de champs données
    ///
    /// Les champs absents valent 0. Pour un nom présent plusieurs fois dans
    /// l'encodage, la valeur est écrite dans chaque occurrence.
    pub fn encode(&self, values: &[(char, u16)]) -> Result<u16, TableError> {
        for (name, _) in values {
            if !self.fields.iter().any(|f| f.name == *name) {
                return Err(TableError::UnknownField {
                    mnemonic: self.mnemonic.clone(),
                    name: *name,
                });
            }
        }

        let mut remaining = WORD_BITS - self.prefix_len;
        let mut word = self.prefix_bits << remaining;

        for field in &self.fields {
            remaining -= field.width;
            let value = values
                .iter()
                .rev()
                .find(|(name, _)| *name == field.name)
                .map(|(_, value)| *value)
                .unwrap_or(0);
            if value > field.max_value() {
                return Err(TableError::FieldOverflow {
                    mnemonic: self.mnemonic.clone(),
                    name: field.name,
                    width: field.width,
                    value,
                });
            }
            word |= value << remaining;
        }

        Ok(word)
    }

    /// Premier nom de champ répété dans l'encodage, s'il existe
    fn duplicate_field(&self) -> Option<char> {
        let mut seen = HashSet::new();
        self.fields.iter().map(|f| f.name).find(|name| !seen.insert(*name))
    }
}

/// Parse un préfixe binaire de 1 à 16 caractères
fn parse_prefix(prefix: &str) -> Option<(u16, u8)> {
    if prefix.is_empty() || prefix.len() > WORD_BITS as usize {
        return None;
    }

    let mut bits = 0u16;
    for c in prefix.chars() {
        bits = match c {
            '0' => bits << 1,
            '1' => (bits << 1) | 1,
            _ => return None,
        };
    }

    Some((bits, prefix.len() as u8))
}

/// Options de validation de la table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableOptions {
    /// Accepte un même nom de champ plusieurs fois dans une instruction ;
    /// la dernière valeur décodée l'emporte.
    pub allow_duplicate_fields: bool,
}

/// Table d'opcodes validée, immuable après construction
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    entries: Vec<InstructionEncoding>,
}

impl OpcodeTable {
    /// Valide et construit une table
    pub fn new(entries: Vec<InstructionEncoding>, options: TableOptions) -> Result<Self, TableError> {
        let mut mnemonics = HashSet::new();
        for entry in &entries {
            if !mnemonics.insert(entry.mnemonic.clone()) {
                return Err(TableError::DuplicateMnemonic(entry.mnemonic.clone()));
            }

            if let Some(name) = entry.duplicate_field() {
                if !options.allow_duplicate_fields {
                    return Err(TableError::DuplicateFieldName {
                        mnemonic: entry.mnemonic.clone(),
                        name,
                    });
                }
                warn!(
                    "Champ {} dupliqué dans {}: seule la dernière valeur sera conservée",
                    name, entry.mnemonic
                );
            }
        }

        let table = Self { entries };
        for (first, second) in table.prefix_conflicts() {
            warn!("{} et {} partagent le même préfixe: décodage ambigu", first, second);
        }
        debug!("Table d'opcodes chargée: {} instructions", table.len());

        Ok(table)
    }

    /// Table de référence PIC18F
    pub fn pic18() -> Result<Self, TableError> {
        let entries = PIC18_PATTERNS
            .iter()
            .map(|(mnemonic, pattern)| InstructionEncoding::from_pattern(*mnemonic, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries, TableOptions::default())
    }

    /// Charge une table depuis sa représentation TOML
    pub fn from_toml_str(source: &str, options: TableOptions) -> anyhow::Result<Self> {
        let file: TableFile = toml::from_str(source)?;
        let entries = file
            .instructions
            .into_iter()
            .map(EncodingEntry::into_encoding)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(entries, options)?)
    }

    /// Charge une table depuis un fichier TOML
    pub fn from_file(path: impl AsRef<Path>, options: TableOptions) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents, options)
    }

    /// Sérialise la table au format TOML
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        let file = TableFile {
            instructions: self.entries.iter().map(EncodingEntry::from).collect(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Paires de mnémoniques au préfixe identique (ordre de la table)
    pub fn prefix_conflicts(&self) -> Vec<(&str, &str)> {
        let mut conflicts = Vec::new();
        for (i, first) in self.entries.iter().enumerate() {
            for second in &self.entries[i + 1..] {
                if first.prefix_len == second.prefix_len && first.prefix_bits == second.prefix_bits {
                    conflicts.push((first.mnemonic(), second.mnemonic()));
                }
            }
        }
        conflicts
    }

    pub fn get(&self, mnemonic: &str) -> Option<&InstructionEncoding> {
        self.entries.iter().find(|e| e.mnemonic == mnemonic)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InstructionEncoding> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a OpcodeTable {
    type Item = &'a InstructionEncoding;
    type IntoIter = std::slice::Iter<'a, InstructionEncoding>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Format de fichier de table externe
#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    #[serde(rename = "instruction", default)]
    instructions: Vec<EncodingEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncodingEntry {
    mnemonic: String,
    prefix: String,
    #[serde(default)]
    fields: Vec<FieldEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldEntry {
    name: String,
    width: u8,
}

impl EncodingEntry {
    fn into_encoding(self) -> Result<InstructionEncoding, TableError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let mut chars = field.name.chars();
            match (chars.next(), chars.next()) {
                (Some(name), None) => fields.push(FieldSpec::new(name, field.width)),
                _ => {
                    return Err(TableError::InvalidFieldName {
                        mnemonic: self.mnemonic,
                        name: field.name,
                    })
                }
            }
        }
        InstructionEncoding::new(self.mnemonic, &self.prefix, fields)
    }
}

impl From<&InstructionEncoding> for EncodingEntry {
    fn from(encoding: &InstructionEncoding) -> Self {
        Self {
            mnemonic: encoding.mnemonic.clone(),
            prefix: encoding.prefix_string(),
            fields: encoding
                .fields
                .iter()
                .map(|f| FieldEntry {
                    name: f.name.to_string(),
                    width: f.width,
                })
                .collect(),
        }
    }
}
