//! Memory and I/O bus interface.

/// Memory and I/O bus interface.
///
/// Components access memory and peripherals through this trait. The bus
/// handles address decoding and routing to the appropriate device. Memory
/// and I/O are separate 16-bit address spaces, as on the Z80.
pub trait Bus {
    /// Read a byte from the given memory address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given memory address.
    fn write(&mut self, address: u16, value: u8);

    /// Read a byte from the given I/O port.
    fn io_read(&mut self, port: u16) -> u8;

    /// Write a byte to the given I/O port.
    fn io_write(&mut self, port: u16, value: u8);

    /// Interrupt acknowledge cycle.
    ///
    /// Returns the byte the interrupting device places on the data bus. A
    /// floating bus reads `0xFF`, which is `RST 38` in IM 0 and the low byte
    /// of the IM 2 vector address.
    fn int_ack(&mut self) -> u8 {
        0xFF
    }
}
