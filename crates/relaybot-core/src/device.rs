use std::io::{self, Write};

/// Failure of a single device command.
///
/// These never escape the dispatcher; they are rendered into the reply text.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("debug: command not sent")]
    Disabled,

    #[error("could not write to port: {0}")]
    Write(#[source] io::Error),

    #[error("could not flush port: {0}")]
    Flush(#[source] io::Error),
}

/// The device the command bytes are written to.
///
/// `Disabled` is debug mode: no port configured, every command fails without
/// touching any hardware.
pub enum DeviceTransport {
    Connected(Box<dyn Write + Send>),
    Disabled,
}

impl DeviceTransport {
    pub fn connected(link: impl Write + Send + 'static) -> Self {
        Self::Connected(Box::new(link))
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// Write one command and flush it out to the device.
    pub fn send_command(&mut self, command: &[u8]) -> Result<(), DeviceError> {
        let Self::Connected(link) = self else {
            return Err(DeviceError::Disabled);
        };

        link.write_all(command).map_err(DeviceError::Write)?;
        link.flush().map_err(DeviceError::Flush)?;
        Ok(())
    }
}

impl std::fmt::Debug for DeviceTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected(_) => f.write_str("DeviceTransport::Connected"),
            Self::Disabled => f.write_str("DeviceTransport::Disabled"),
        }
    }
}
