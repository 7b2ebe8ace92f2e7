#![no_std]

//! Driver for the Microchip MCP23017 16-bit I2C GPIO expander.
//!
//! The chip exposes sixteen pins as two 8-bit ports (GPA, GPB), each port
//! with its own direction, polarity, pull-up and interrupt-on-change
//! registers. The driver keeps no shadow of the register file: every
//! single-bit operation re-reads the affected register over the bus before
//! writing it back. Those read-modify-write sequences are not atomic on
//! the bus, so anything else touching the same device concurrently must be
//! serialized by the caller.
//!
//! The blocking driver lives at the crate root; [`asynch`] mirrors it for
//! `embedded-hal-async` HALs.

use bitfield::bitfield;
use embedded_hal::digital::PinState;
use embedded_hal::i2c::I2c;

pub mod asynch;

/// I2C device address
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Address(u8);

impl From<u8> for Address {
    fn from(a: u8) -> Self {
        Address(a)
    }
}

impl Address {
    /// Address from the A2/A1/A0 hardware straps: `0b010_0000 | a2 a1 a0`.
    pub fn from_pin_states(a2: PinState, a1: PinState, a0: PinState) -> Self {
        let bit = |s: PinState| (s == PinState::High) as u8;
        Address(0b010_0000 | bit(a2) << 2 | bit(a1) << 1 | bit(a0))
    }
}

/// One of the two 8-bit ports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Port {
    A = 0,
    B = 1,
}

/// Logical pin: GPA0..GPA7 on port A, GPB0..GPB7 on port B.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Pin {
    Gpa0 = 0,
    Gpa1 = 1,
    Gpa2 = 2,
    Gpa3 = 3,
    Gpa4 = 4,
    Gpa5 = 5,
    Gpa6 = 6,
    Gpa7 = 7,
    Gpb0 = 8,
    Gpb1 = 9,
    Gpb2 = 10,
    Gpb3 = 11,
    Gpb4 = 12,
    Gpb5 = 13,
    Gpb6 = 14,
    Gpb7 = 15,
}

impl Pin {
    /// All sixteen pins, in index order.
    pub const ALL: [Pin; 16] = [
        Pin::Gpa0,
        Pin::Gpa1,
        Pin::Gpa2,
        Pin::Gpa3,
        Pin::Gpa4,
        Pin::Gpa5,
        Pin::Gpa6,
        Pin::Gpa7,
        Pin::Gpb0,
        Pin::Gpb1,
        Pin::Gpb2,
        Pin::Gpb3,
        Pin::Gpb4,
        Pin::Gpb5,
        Pin::Gpb6,
        Pin::Gpb7,
    ];

    /// Port this pin belongs to.
    pub fn port(self) -> Port {
        if (self as u8) < 8 {
            Port::A
        } else {
            Port::B
        }
    }

    fn mask(self) -> u8 {
        1 << (self as u8 % 8)
    }
}

/// Pin direction. The IODIR bit is 1 for input, 0 for output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Register kinds, at their BANK=0 port-A addresses. The port-B twin of
/// each register sits at the next address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Direction, 1 = input, 0 = output
    Iodir = 0x00,
    /// Input polarity inversion
    Ipol = 0x02,
    /// Interrupt-on-change enable
    Gpinten = 0x04,
    /// Compare value for interrupt-on-change
    Defval = 0x06,
    /// Trigger mode, 1 = compare against DEFVAL, 0 = any change
    Intcon = 0x08,
    /// Pull-up enable
    Gppu = 0x0c,
    /// Interrupt flag, read-only
    Intf = 0x0e,
    /// Port state latched when the interrupt fired; reading clears it
    Intcap = 0x10,
    /// Live pin levels
    Gpio = 0x12,
    /// Output latch
    Olat = 0x14,
}

impl Register {
    /// Bus address of this register for `port`.
    pub fn for_port(self, port: Port) -> u8 {
        self as u8 + port as u8
    }
}

bitfield! {
    /// Snapshot of one port's eight pins.
    #[derive(Clone, Copy, PartialEq)]
    pub struct PortPins(u8);
    impl Debug;

    pub p0, set_p0: 0;
    pub p1, set_p1: 1;
    pub p2, set_p2: 2;
    pub p3, set_p3: 3;
    pub p4, set_p4: 4;
    pub p5, set_p5: 5;
    pub p6, set_p6: 6;
    pub p7, set_p7: 7;
}

impl PortPins {
    /// All pins low.
    pub fn new() -> Self {
        PortPins(0)
    }

    /// Wrap a raw register value.
    pub fn from_u8(value: u8) -> Self {
        PortPins(value)
    }

    /// Raw register value.
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Set the pin at `offset` (0..7) within the port. Out-of-range
    /// offsets are ignored.
    pub fn set_pin(&mut self, offset: u8, value: bool) {
        if offset < 8 {
            if value {
                self.0 |= 1 << offset;
            } else {
                self.0 &= !(1 << offset);
            }
        }
    }

    /// Get the pin at `offset` (0..7) within the port. Out-of-range
    /// offsets read as low.
    pub fn get_pin(&self, offset: u8) -> bool {
        offset < 8 && (self.0 & (1 << offset)) != 0
    }
}

impl Default for PortPins {
    fn default() -> Self {
        Self::new()
    }
}

/// MCP23017 16-bit I2C GPIO expander driver (blocking).
#[derive(Debug)]
pub struct Mcp23017<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> Mcp23017<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a new instance of the MCP23017 device.
    pub fn new(i2c: I2C, address: Address) -> Self {
        Mcp23017 {
            i2c,
            address: address.0,
        }
    }

    /// Probe the device and reset both ports to the all-output,
    /// no-pull-up baseline.
    ///
    /// Must succeed before any other operation is meaningful; on a probe
    /// NACK no register is written.
    pub fn init(&mut self) -> Result<(), E> {
        // zero-length write, the device must ack its address
        self.i2c.write(self.address, &[])?;
        self.write_register(Register::Iodir.for_port(Port::A), 0x00)?;
        self.write_register(Register::Iodir.for_port(Port::B), 0x00)?;
        self.write_register(Register::Gppu.for_port(Port::A), 0x00)?;
        self.write_register(Register::Gppu.for_port(Port::B), 0x00)?;
        Ok(())
    }

    /// Read one register.
    pub fn read_register(&mut self, addr: u8) -> Result<u8, E> {
        let mut data: [u8; 1] = [0];
        self.i2c.write_read(self.address, &[addr], &mut data)?;
        Ok(data[0])
    }

    /// Write one register.
    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<(), E> {
        self.i2c.write(self.address, &[addr, value])
    }

    fn update_register(&mut self, reg: Register, port: Port, mask: u8, set: bool) -> Result<(), E> {
        let addr = reg.for_port(port);
        let current = self.read_register(addr)?;
        let next = if set { current | mask } else { current & !mask };
        self.write_register(addr, next)
    }

    /// Configure one pin as input or output.
    pub fn set_direction(&mut self, pin: Pin, direction: Direction) -> Result<(), E> {
        let input = direction == Direction::Input;
        self.update_register(Register::Iodir, pin.port(), pin.mask(), input)
    }

    /// Drive one output pin high or low.
    ///
    /// The read-modify-write snapshot comes from GPIO (live levels), not
    /// OLAT: on a port mixing inputs and outputs, an input pin whose
    /// electrical level differs from its latch bit gets that level copied
    /// into the latch by the write-back. Inherited chip-usage convention,
    /// kept for compatibility.
    pub fn write_output(&mut self, pin: Pin, level: bool) -> Result<(), E> {
        let current = self.read_register(Register::Gpio.for_port(pin.port()))?;
        let next = if level {
            current | pin.mask()
        } else {
            current & !pin.mask()
        };
        self.write_register(Register::Olat.for_port(pin.port()), next)
    }

    /// Read the live level of one pin.
    pub fn read_pin(&mut self, pin: Pin) -> Result<bool, E> {
        let levels = self.read_register(Register::Gpio.for_port(pin.port()))?;
        Ok(levels & pin.mask() != 0)
    }

    /// Invert the current logical level of one pin.
    pub fn toggle_pin(&mut self, pin: Pin) -> Result<(), E> {
        let level = self.read_pin(pin)?;
        self.write_output(pin, !level)
    }

    /// Enable or disable the internal pull-up of one pin.
    pub fn set_pull_up(&mut self, pin: Pin, enable: bool) -> Result<(), E> {
        self.update_register(Register::Gppu, pin.port(), pin.mask(), enable)
    }

    /// Invert or restore the input polarity of one pin.
    pub fn set_polarity(&mut self, pin: Pin, invert: bool) -> Result<(), E> {
        self.update_register(Register::Ipol, pin.port(), pin.mask(), invert)
    }

    /// Snapshot of the live levels of one port.
    pub fn read_port(&mut self, port: Port) -> Result<PortPins, E> {
        let levels = self.read_register(Register::Gpio.for_port(port))?;
        Ok(PortPins::from_u8(levels))
    }

    /// Replace the whole output latch of one port.
    pub fn write_port(&mut self, port: Port, pins: PortPins) -> Result<(), E> {
        self.write_register(Register::Olat.for_port(port), pins.as_u8())
    }

    /// Arm interrupt-on-change for one pin.
    ///
    /// With `compare_to_default` the pin interrupts whenever its level
    /// differs from `default_level`; otherwise on any change from the
    /// previous level (`default_level` is still programmed, but inert).
    pub fn enable_interrupt(
        &mut self,
        pin: Pin,
        compare_to_default: bool,
        default_level: bool,
    ) -> Result<(), E> {
        self.update_register(Register::Intcon, pin.port(), pin.mask(), compare_to_default)?;
        self.update_register(Register::Defval, pin.port(), pin.mask(), default_level)?;
        self.update_register(Register::Gpinten, pin.port(), pin.mask(), true)
    }

    /// Disarm interrupt-on-change for one pin. INTCON and DEFVAL keep
    /// whatever was programmed.
    pub fn disable_interrupt(&mut self, pin: Pin) -> Result<(), E> {
        self.update_register(Register::Gpinten, pin.port(), pin.mask(), false)
    }

    /// Whether `pin` caused the pending interrupt. Reading INTF does not
    /// clear the latch.
    pub fn interrupt_pending(&mut self, pin: Pin) -> Result<bool, E> {
        let flags = self.read_register(Register::Intf.for_port(pin.port()))?;
        Ok(flags & pin.mask() != 0)
    }

    /// Port state captured at the moment the interrupt condition occurred.
    /// Reading INTCAP clears the latched interrupt for that port.
    pub fn interrupt_capture(&mut self, port: Port) -> Result<PortPins, E> {
        let captured = self.read_register(Register::Intcap.for_port(port))?;
        Ok(PortPins::from_u8(captured))
    }

    /// Clear any latched interrupt by reading INTCAP on both ports. INTF
    /// is read-only and resets as a side effect of the capture reads.
    pub fn clear_interrupt(&mut self) -> Result<(), E> {
        self.read_register(Register::Intcap.for_port(Port::A))?;
        self.read_register(Register::Intcap.for_port(Port::B))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_map_matches_bank0_layout() {
        assert_eq!(Register::Iodir.for_port(Port::A), 0x00);
        assert_eq!(Register::Iodir.for_port(Port::B), 0x01);
        assert_eq!(Register::Ipol.for_port(Port::A), 0x02);
        assert_eq!(Register::Ipol.for_port(Port::B), 0x03);
        assert_eq!(Register::Gpinten.for_port(Port::A), 0x04);
        assert_eq!(Register::Gpinten.for_port(Port::B), 0x05);
        assert_eq!(Register::Defval.for_port(Port::A), 0x06);
        assert_eq!(Register::Defval.for_port(Port::B), 0x07);
        assert_eq!(Register::Intcon.for_port(Port::A), 0x08);
        assert_eq!(Register::Intcon.for_port(Port::B), 0x09);
        assert_eq!(Register::Gppu.for_port(Port::A), 0x0c);
        assert_eq!(Register::Gppu.for_port(Port::B), 0x0d);
        assert_eq!(Register::Intf.for_port(Port::A), 0x0e);
        assert_eq!(Register::Intf.for_port(Port::B), 0x0f);
        assert_eq!(Register::Intcap.for_port(Port::A), 0x10);
        assert_eq!(Register::Intcap.for_port(Port::B), 0x11);
        assert_eq!(Register::Gpio.for_port(Port::A), 0x12);
        assert_eq!(Register::Gpio.for_port(Port::B), 0x13);
        assert_eq!(Register::Olat.for_port(Port::A), 0x14);
        assert_eq!(Register::Olat.for_port(Port::B), 0x15);
    }

    #[test]
    fn pins_split_across_ports() {
        for pin in Pin::ALL {
            let expected = if (pin as u8) < 8 { Port::A } else { Port::B };
            assert_eq!(pin.port(), expected);
        }
    }

    #[test]
    fn pin_masks_wrap_per_port() {
        assert_eq!(Pin::Gpa0.mask(), 0x01);
        assert_eq!(Pin::Gpa7.mask(), 0x80);
        assert_eq!(Pin::Gpb0.mask(), 0x01);
        assert_eq!(Pin::Gpb5.mask(), 0x20);
        assert_eq!(Pin::Gpb7.mask(), 0x80);
    }

    #[test]
    fn address_from_straps() {
        use embedded_hal::digital::PinState::{High, Low};

        assert_eq!(Address::from_pin_states(Low, Low, Low), Address(0x20));
        assert_eq!(Address::from_pin_states(Low, Low, High), Address(0x21));
        assert_eq!(Address::from_pin_states(Low, High, Low), Address(0x22));
        assert_eq!(Address::from_pin_states(High, Low, Low), Address(0x24));
        assert_eq!(Address::from_pin_states(High, High, High), Address(0x27));
    }

    #[test]
    fn port_pins_bitfield() {
        let mut pins = PortPins::new();

        pins.set_p0(true);
        pins.set_p7(true);

        assert!(pins.p0());
        assert!(pins.p7());
        assert!(!pins.p1());
        assert_eq!(pins.as_u8(), 0b1000_0001);

        pins.set_pin(3, true);
        assert!(pins.get_pin(3));
        assert_eq!(pins.as_u8(), 0b1000_1001);
    }

    #[test]
    fn port_pins_from_u8() {
        let pins = PortPins::from_u8(0b1010_1010);

        assert!(!pins.p0());
        assert!(pins.p1());
        assert!(!pins.p6());
        assert!(pins.p7());
        assert_eq!(pins.as_u8(), 0b1010_1010);
    }

    #[test]
    fn port_pins_ignores_out_of_range_offsets() {
        let mut pins = PortPins::default();

        pins.set_pin(8, true);
        pins.set_pin(255, true);

        assert_eq!(pins.as_u8(), 0);
        assert!(!pins.get_pin(8));
    }
}
