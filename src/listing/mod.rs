//! Listing de désassemblage
//!
//! Chaque mot de la plage donne exactement une ligne, dans l'ordre des
//! adresses, qu'il soit décodé, inconnu ou ambigu.

use log::info;
use rayon::prelude::*;
use std::fmt;

use crate::config::OutputConfig;
use crate::cpu::{DecodeError, DecodedInstruction, InstructionDecoder};
use crate::memory::{MemoryError, ProgramMemory};

/// Ligne de listing pour un mot de programme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLine {
    pub address: u32,
    pub word: u16,
    pub outcome: Result<DecodedInstruction, DecodeError>,
}

impl ListingLine {
    /// Rend la ligne selon les options d'affichage
    pub fn render(&self, output: &OutputConfig) -> String {
        let mut line = format!("{:#08x}:", self.address);
        if output.show_raw_word {
            line.push_str(&format!(" {:04X}", self.word));
        }
        line.push_str("  ");

        match &self.outcome {
            Ok(instruction) => line.push_str(&instruction.to_string()),
            Err(DecodeError::UnknownOpcode { .. }) => line.push_str(&output.unknown_marker),
            Err(DecodeError::AmbiguousEncoding { candidates, .. }) => {
                let marker = output.ambiguous_marker.trim_end_matches('>');
                if marker.len() == output.ambiguous_marker.len() {
                    line.push_str(&format!("{} {}", marker, candidates.join("|")));
                } else {
                    line.push_str(&format!("{}: {}>", marker, candidates.join("|")));
                }
            }
        }

        line
    }
}

impl fmt::Display for ListingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&OutputConfig::default()))
    }
}

/// Bilan d'un désassemblage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingSummary {
    pub decoded: usize,
    pub unknown: usize,
    pub ambiguous: usize,
}

impl ListingSummary {
    pub fn from_lines(lines: &[ListingLine]) -> Self {
        lines.iter().fold(Self::default(), |mut summary, line| {
            match &line.outcome {
                Ok(_) => summary.decoded += 1,
                Err(DecodeError::UnknownOpcode { .. }) => summary.unknown += 1,
                Err(DecodeError::AmbiguousEncoding { .. }) => summary.ambiguous += 1,
            }
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.decoded + self.unknown + self.ambiguous
    }
}

impl fmt::Display for ListingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mots: {} décodés, {} inconnus, {} ambigus",
            self.total(),
            self.decoded,
            self.unknown,
            self.ambiguous
        )
    }
}

/// Désassembleur de flux de mots
#[derive(Debug, Clone)]
pub struct Disassembler {
    decoder: InstructionDecoder,
}

impl Disassembler {
    pub fn new(decoder: InstructionDecoder) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &InstructionDecoder {
        &self.decoder
    }

    fn line(&self, address: u32, word: u16) -> ListingLine {
        ListingLine {
            address,
            word,
            outcome: self.decoder.decode(word),
        }
    }

    /// Désassemble une suite de mots `(adresse, mot)`
    pub fn disassemble<I>(&self, words: I) -> Vec<ListingLine>
    where
        I: IntoIterator<Item = (u32, u16)>,
    {
        words
            .into_iter()
            .map(|(address, word)| self.line(address, word))
            .collect()
    }

    /// Version parallèle : l'ordre du résultat est celui de l'entrée
    pub fn disassemble_parallel(&self, words: &[(u32, u16)]) -> Vec<ListingLine> {
        words
            .par_iter()
            .map(|&(address, word)| self.line(address, word))
            .collect()
    }

    /// Désassemble la plage `start..end` de la mémoire programme
    pub fn disassemble_memory(
        &self,
        memory: &ProgramMemory,
        start: u32,
        end: u32,
        parallel: bool,
    ) -> Result<Vec<ListingLine>, MemoryError> {
        let words = memory.words(start, end)?;
        let lines = if parallel {
            let words: Vec<(u32, u16)> = words.collect();
            self.disassemble_parallel(&words)
        } else {
            self.disassemble(words)
        };

        info!(
            "{:#08x}..{:#08x}: {}",
            start,
            end,
            ListingSummary::from_lines(&lines)
        );
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{InstructionEncoding, OpcodeTable, TableOptions};
    use std::sync::Arc;

    fn disassembler() -> Disassembler {
        Disassembler::new(InstructionDecoder::pic18().unwrap())
    }

    #[test]
    fn test_render_lines() {
        let lines = disassembler().disassemble(vec![(0, 0x2601), (2, 0xFFFF)]);
        assert_eq!(lines[0].to_string(), "0x000000: 2601  ADDWF d=1, a=0, f=0x01");
        assert_eq!(lines[1].to_string(), "0x000002: FFFF  <unknown>");

        let output = OutputConfig {
            show_raw_word: false,
            unknown_marker: "???".to_string(),
            ambiguous_marker: "<ambiguous>".to_string(),
        };
        assert_eq!(lines[1].render(&output), "0x000002:  ???");
    }

    #[test]
    fn test_render_ambiguous() {
        let entries = vec![
            InstructionEncoding::from_pattern("A", &["1100", "ffffffffffff"]).unwrap(),
            InstructionEncoding::from_pattern("B", &["1100", "kkkkkkkkkkkk"]).unwrap(),
        ];
        let table = OpcodeTable::new(entries, TableOptions::default()).unwrap();
        let disassembler = Disassembler::new(InstructionDecoder::new(Arc::new(table)));

        let lines = disassembler.disassemble(vec![(0x10, 0xC000)]);
        assert_eq!(lines[0].to_string(), "0x000010: C000  <ambiguous: A|B>");

        let output = OutputConfig {
            ambiguous_marker: "AMBIGU".to_string(),
            ..OutputConfig::default()
        };
        assert_eq!(lines[0].render(&output), "0x000010: C000  AMBIGU A|B");
    }

    #[test]
    fn test_parallel_preserves_order() {
        let disassembler = disassembler();
        let words: Vec<(u32, u16)> = (0..4096u32)
            .map(|i| (i * 2, (i as u16).wrapping_mul(0x9E37)))
            .collect();

        let sequential = disassembler.disassemble(words.iter().copied());
        let parallel = disassembler.disassemble_parallel(&words);
        assert_eq!(sequential, parallel);

        let addresses: Vec<u32> = parallel.iter().map(|l| l.address).collect();
        let expected: Vec<u32> = words.iter().map(|(a, _)| *a).collect();
        assert_eq!(addresses, expected);
    }

    #[test]
    fn test_summary() {
        let lines = disassembler().disassemble(vec![(0, 0x2601), (2, 0xFFFF), (4, 0xC000)]);
        let summary = ListingSummary::from_lines(&lines);
        assert_eq!(
            summary,
            ListingSummary {
                decoded: 2,
                unknown: 1,
                ambiguous: 0
            }
        );
        assert_eq!(summary.to_string(), "3 mots: 2 décodés, 1 inconnus, 0 ambigus");
    }

    #[test]
    fn test_disassemble_memory() {
        let mut memory = ProgramMemory::new();
        memory.write_block(0, &[0x26, 0x01, 0xC0, 0x00]);

        let lines = disassembler().disassemble_memory(&memory, 0, 8, true).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].outcome.as_ref().unwrap().mnemonic, "MOVFF");
        assert!(lines[2].outcome.is_err());

        let err = disassembler().disassemble_memory(&memory, 3, 8, false);
        assert_eq!(err, Err(MemoryError::UnalignedAddress { address: 3 }));
    }
}
