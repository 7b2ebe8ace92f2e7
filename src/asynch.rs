//! Async mirror of the blocking driver, for `embedded-hal-async` HALs.
//!
//! Transaction-for-transaction identical to [`crate::Mcp23017`]; only the
//! transport trait differs.

use embedded_hal_async::i2c::I2c as AsyncI2c;

use crate::{Address, Direction, Pin, Port, PortPins, Register};

/// MCP23017 16-bit I2C GPIO expander driver (async).
#[derive(Debug)]
pub struct Mcp23017<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> Mcp23017<I2C>
where
    I2C: AsyncI2c<Error = E>,
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
    pub async fn init(&mut self) -> Result<(), E> {
        // zero-length write, the device must ack its address
        self.i2c.write(self.address, &[]).await?;
        self.write_register(Register::Iodir.for_port(Port::A), 0x00)
            .await?;
        self.write_register(Register::Iodir.for_port(Port::B), 0x00)
            .await?;
        self.write_register(Register::Gppu.for_port(Port::A), 0x00)
            .await?;
        self.write_register(Register::Gppu.for_port(Port::B), 0x00)
            .await?;
        Ok(())
    }

    /// Read one register.
    pub async fn read_register(&mut self, addr: u8) -> Result<u8, E> {
        let mut data: [u8; 1] = [0];
        self.i2c.write_read(self.address, &[addr], &mut data).await?;
        Ok(data[0])
    }

    /// Write one register.
    pub async fn write_register(&mut self, addr: u8, value: u8) -> Result<(), E> {
        self.i2c.write(self.address, &[addr, value]).await
    }

    async fn update_register(
        &mut self,
        reg: Register,
        port: Port,
        mask: u8,
        set: bool,
    ) -> Result<(), E> {
        let addr = reg.for_port(port);
        let current = self.read_register(addr).await?;
        let next = if set { current | mask } else { current & !mask };
        self.write_register(addr, next).await
    }

    /// Configure one pin as input or output.
    pub async fn set_direction(&mut self, pin: Pin, direction: Direction) -> Result<(), E> {
        let input = direction == Direction::Input;
        self.update_register(Register::Iodir, pin.port(), pin.mask(), input)
            .await
    }

    /// Drive one output pin high or low. Same GPIO-snapshot,
    /// OLAT-write-back convention as the blocking driver.
    pub async fn write_output(&mut self, pin: Pin, level: bool) -> Result<(), E> {
        let current = self
            .read_register(Register::Gpio.for_port(pin.port()))
            .await?;
        let next = if level {
            current | pin.mask()
        } else {
            current & !pin.mask()
        };
        self.write_register(Register::Olat.for_port(pin.port()), next)
            .await
    }

    /// Read the live level of one pin.
    pub async fn read_pin(&mut self, pin: Pin) -> Result<bool, E> {
        let levels = self
            .read_register(Register::Gpio.for_port(pin.port()))
            .await?;
        Ok(levels & pin.mask() != 0)
    }

    /// Invert the current logical level of one pin.
    pub async fn toggle_pin(&mut self, pin: Pin) -> Result<(), E> {
        let level = self.read_pin(pin).await?;
        self.write_output(pin, !level).await
    }

    /// Enable or disable the internal pull-up of one pin.
    pub async fn set_pull_up(&mut self, pin: Pin, enable: bool) -> Result<(), E> {
        self.update_register(Register::Gppu, pin.port(), pin.mask(), enable)
            .await
    }

    /// Invert or restore the input polarity of one pin.
    pub async fn set_polarity(&mut self, pin: Pin, invert: bool) -> Result<(), E> {
        self.update_register(Register::Ipol, pin.port(), pin.mask(), invert)
            .await
    }

    /// Snapshot of the live levels of one port.
    pub async fn read_port(&mut self, port: Port) -> Result<PortPins, E> {
        let levels = self.read_register(Register::Gpio.for_port(port)).await?;
        Ok(PortPins::from_u8(levels))
    }

    /// Replace the whole output latch of one port.
    pub async fn write_port(&mut self, port: Port, pins: PortPins) -> Result<(), E> {
        self.write_register(Register::Olat.for_port(port), pins.as_u8())
            .await
    }

    /// Arm interrupt-on-change for one pin.
    pub async fn enable_interrupt(
        &mut self,
        pin: Pin,
        compare_to_default: bool,
        default_level: bool,
    ) -> Result<(), E> {
        self.update_register(Register::Intcon, pin.port(), pin.mask(), compare_to_default)
            .await?;
        self.update_register(Register::Defval, pin.port(), pin.mask(), default_level)
            .await?;
        self.update_register(Register::Gpinten, pin.port(), pin.mask(), true)
            .await
    }

    /// Disarm interrupt-on-change for one pin. INTCON and DEFVAL keep
    /// whatever was programmed.
    pub async fn disable_interrupt(&mut self, pin: Pin) -> Result<(), E> {
        self.update_register(Register::Gpinten, pin.port(), pin.mask(), false)
            .await
    }

    /// Whether `pin` caused the pending interrupt.
    pub async fn interrupt_pending(&mut self, pin: Pin) -> Result<bool, E> {
        let flags = self
            .read_register(Register::Intf.for_port(pin.port()))
            .await?;
        Ok(flags & pin.mask() != 0)
    }

    /// Port state captured at the moment the interrupt condition occurred.
    /// Reading INTCAP clears the latched interrupt for that port.
    pub async fn interrupt_capture(&mut self, port: Port) -> Result<PortPins, E> {
        let captured = self.read_register(Register::Intcap.for_port(port)).await?;
        Ok(PortPins::from_u8(captured))
    }

    /// Clear any latched interrupt by reading INTCAP on both ports.
    pub async fn clear_interrupt(&mut self) -> Result<(), E> {
        self.read_register(Register::Intcap.for_port(Port::A)).await?;
        self.read_register(Register::Intcap.for_port(Port::B)).await?;
        Ok(())
    }
}
