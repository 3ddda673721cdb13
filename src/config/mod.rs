//! Configuration du désassembleur

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::cpu::TableOptions;
use crate::memory::{WordOrder, DEFAULT_PADDING};

/// Configuration principale du désassembleur
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisassemblerConfig {
    pub range: RangeConfig,
    pub memory: MemoryConfig,
    pub decoder: DecoderConfig,
    pub output: OutputConfig,
}

/// Plage d'adresses désassemblée, fin exclue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub word_order: WordOrder,
    pub padding: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Table d'opcodes externe (TOML) ; table PIC18F de référence si absente
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_path: Option<String>,
    pub allow_duplicate_fields: bool,
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub show_raw_word: bool,
    pub unknown_marker: String,
    pub ambiguous_marker: String,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            start: 0,
            end: crate::DEFAULT_SCAN_END,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            word_order: WordOrder::BigEndian,
            padding: DEFAULT_PADDING,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_raw_word: true,
            unknown_marker: "<unknown>".to_string(),
            ambiguous_marker: "<ambiguous>".to_string(),
        }
    }
}

impl DecoderConfig {
    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            allow_duplicate_fields: self.allow_duplicate_fields,
        }
    }
}

impl DisassemblerConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: DisassemblerConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn load_or_default(path: &str) -> Self {
        Self::load_from_file(path).unwrap_or_default()
    }
}

/// Parse une adresse décimale ou hexadécimale (`0x...`)
pub fn parse_address(text: &str) -> Result<u32> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    parsed.map_err(|e| anyhow!("Adresse invalide {:?}: {}", text, e))
}
