//! Image de la mémoire flash programme

use super::interface::MemoryInterface;
use super::{MemoryError, WordOrder, WORD_SIZE_BYTES};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Octet renvoyé pour une adresse non programmée (flash effacée)
pub const DEFAULT_PADDING: u8 = 0xFF;

/// Mémoire programme creuse, en lecture seule une fois chargée
#[derive(Debug, Clone)]
pub struct ProgramMemory {
    /// Octets programmés, indexés par adresse
    data: BTreeMap<u32, u8>,

    /// Valeur des octets non programmés
    padding: u8,

    /// Ordre des octets dans un mot
    word_order: WordOrder,
}

impl ProgramMemory {
    /// Crée une mémoire vide
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
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

    pub fn padding(&self) -> u8 {
        self.padding
    }

    /// Programme un octet ; renvoie l'ancienne valeur si l'adresse était déjà écrite
    pub fn write_u8(&mut self, address: u32, value: u8) -> Option<u8> {
        self.data.insert(address, value)
    }

    /// Programme un bloc d'octets consécutifs
    pub fn write_block(&mut self, address: u32, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.data.insert(address.wrapping_add(i as u32), byte);
        }
    }

    /// Indique si l'adresse a été programmée
    pub fn contains(&self, address: u32) -> bool {
        self.data.contains_key(&address)
    }

    /// Nombre d'octets programmés
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Première et dernière adresses programmées
    pub fn address_range(&self) -> Option<RangeInclusive<u32>> {
        let first = *self.data.keys().next()?;
        let last = *self.data.keys().next_back()?;
        Some(first..=last)
    }

    fn byte_at(&self, address: u32) -> u8 {
        self.data.get(&address).copied().unwrap_or(self.padding)
    }

    /// Mots `(adresse, mot)` de `start` (inclus) à `end` (exclu), par pas de 2 octets
    pub fn words(
        &self,
        start: u32,
        end: u32,
    ) -> Result<impl Iterator<Item = (u32, u16)> + '_, MemoryError> {
        if start % WORD_SIZE_BYTES != 0 {
            return Err(MemoryError::UnalignedAddress { address: start });
        }
        if start > end {
            return Err(MemoryError::InvalidRange { start, end });
        }

        Ok((start..end).step_by(WORD_SIZE_BYTES as usize).map(move |address| {
            // address < end <= u32::MAX : address + 1 ne déborde pas
            let word = self
                .word_order
                .combine(self.byte_at(address), self.byte_at(address + 1));
            (address, word)
        }))
    }
}

impl Default for ProgramMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryInterface for ProgramMemory {
    fn read_u8(&self, address: u32) -> Result<u8, MemoryError> {
        Ok(self.byte_at(address))
    }

    fn word_order(&self) -> WordOrder {
        self.word_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unprogrammed_reads_padding() {
        let memory = ProgramMemory::new();
        assert_eq!(memory.read_u8(0x1234).unwrap(), 0xFF);
        assert_eq!(memory.read_u16(0x1234).unwrap(), 0xFFFF);
        assert!(memory.address_range().is_none());

        let memory = ProgramMemory::new().with_padding(0x00);
        assert_eq!(memory.read_u16(0).unwrap(), 0x0000);
    }

    #[test]
    fn test_read_words_in_both_orders() {
        let mut memory = ProgramMemory::new();
        memory.write_block(0x10, &[0x26, 0x01, 0xC0, 0x00]);

        assert_eq!(memory.read_u16(0x10).unwrap(), 0x2601);
        assert_eq!(memory.read_block(0x10, 4).unwrap(), vec![0x26, 0x01, 0xC0, 0x00]);
        assert_eq!(memory.address_range(), Some(0x10..=0x13));

        let memory = memory.with_word_order(WordOrder::LittleEndian);
        assert_eq!(memory.read_u16(0x10).unwrap(), 0x0126);
    }

    #[test]
    fn test_read_u16_at_top_of_address_space() {
        let memory = ProgramMemory::new();
        assert_eq!(
            memory.read_u16(u32::MAX),
            Err(MemoryError::AddressOverflow { address: u32::MAX })
        );
    }

    #[test]
    fn test_write_reports_overlap() {
        let mut memory = ProgramMemory::new();
        assert_eq!(memory.write_u8(0, 0x12), None);
        assert_eq!(memory.write_u8(0, 0x34), Some(0x12));
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_words_iteration() {
        let mut memory = ProgramMemory::new();
        memory.write_block(0, &[0x26, 0x01, 0xC0, 0x00, 0xAB]);

        let words: Vec<(u32, u16)> = memory.words(0, 6).unwrap().collect();
        assert_eq!(words, vec![(0, 0x2601), (2, 0xC000), (4, 0xABFF)]);

        // Une fin impaire inclut le dernier mot commencé
        assert_eq!(memory.words(0, 5).unwrap().count(), 3);
        assert_eq!(memory.words(4, 4).unwrap().count(), 0);
    }

    #[test]
    fn test_words_range_errors() {
        let memory = ProgramMemory::new();
        assert!(matches!(
            memory.words(1, 10),
            Err(MemoryError::UnalignedAddress { address: 1 })
        ));
        assert!(matches!(
            memory.words(10, 2),
            Err(MemoryError::InvalidRange { start: 10, end: 2 })
        ));
    }
}
