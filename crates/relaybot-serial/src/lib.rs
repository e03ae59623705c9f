//! Serial device adapter (serialport).
//!
//! Opens the relay board's port once at startup and hands it to the core as
//! a `DeviceTransport`.

use std::{
    io::{self, Write},
    path::Path,
    time::Duration,
};

use serialport::SerialPort;

use relaybot_core::{device::DeviceTransport, errors::Error, Result};

const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// `Write` view of an open serial port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

/// Open `port_name` as 8N1 at `baud_rate`.
pub fn open_port(port_name: &Path, baud_rate: u32) -> Result<SerialLink> {
    let name = port_name.to_string_lossy();
    let builder = serialport::new(name.as_ref(), baud_rate)
        .timeout(WRITE_TIMEOUT)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None);

    let port = builder
        .open()
        .map_err(|e| Error::Config(format!("could not open port {name}: {e}")))?;

    tracing::debug!("serial port {name} opened at {baud_rate} baud");
    Ok(SerialLink::new(port))
}

/// Device for the configured port, or debug mode when none is set.
pub fn open_device(port_name: Option<&Path>, baud_rate: u32) -> Result<DeviceTransport> {
    let Some(port_name) = port_name else {
        tracing::warn!("port name is not set, running in debug mode");
        return Ok(DeviceTransport::Disabled);
    };

    let link = open_port(port_name, baud_rate)?;
    Ok(DeviceTransport::connected(link))
}
