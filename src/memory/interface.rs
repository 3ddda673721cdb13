//! Interface mémoire commune

use super::{MemoryError, WordOrder};

/// Trait définissant l'accès en lecture à la mémoire programme
pub trait MemoryInterface {
    /// Lit un octet à l'adresse spécifiée
    fn read_u8(&self, address: u32) -> Result<u8, MemoryError>;

    /// Ordre des octets dans un mot de 16 bits
    fn word_order(&self) -> WordOrder;

    /// Lit un mot de 16 bits à l'adresse spécifiée
    fn read_u16(&self, address: u32) -> Result<u16, MemoryError> {
        let next = address
            .checked_add(1)
            .ok_or(MemoryError::AddressOverflow { address })?;
        let first = self.read_u8(address)?;
        let second = self.read_u8(next)?;
        Ok(self.word_order().combine(first, second))
    }

    /// Lit un bloc de données
    fn read_block(&self, address: u32, size: usize) -> Result<Vec<u8>, MemoryError> {
        let mut data = Vec::with_capacity(size);
        for i in 0..size as u32 {
            let current = address
                .checked_add(i)
                .ok_or(MemoryError::AddressOverflow { address })?;
            data.push(self.read_u8(current)?);
        }
        Ok(data)
    }
}
