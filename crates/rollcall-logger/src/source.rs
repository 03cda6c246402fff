//! Opening the byte stream the reader writes to.

use std::time::Duration;

use tokio::io::AsyncRead;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt as _, StopBits};

use crate::error::{Error, Result};

/// Port name that selects standard input instead of a serial device, for
/// replaying captured reader output.
pub const STDIN: &str = "-";

pub type InputStream = Box<dyn AsyncRead + Unpin + Send>;

/// Open `port` at `baud_rate`, 8N1 without flow control.
pub fn open(port: &str, baud_rate: u32, timeout: Duration) -> Result<InputStream> {
  if port == STDIN {
    tracing::info!("reading scans from standard input");
    return Ok(Box::new(tokio::io::stdin()));
  }

  let stream = tokio_serial::new(port, baud_rate)
    .data_bits(DataBits::Eight)
    .parity(Parity::None)
    .stop_bits(StopBits::One)
    .flow_control(FlowControl::None)
    .timeout(timeout)
    .open_native_async()
    .map_err(|source| Error::Connect {
      port: port.to_owned(),
      source,
    })?;

  tracing::info!(port, baud_rate, "connected to reader");
  Ok(Box::new(stream))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn missing_device_is_a_connect_error() {
    let err = open("/dev/rollcall-no-such-port", 9600, Duration::from_millis(10))
      .err()
      .unwrap();
    assert!(matches!(err, Error::Connect { ref port, .. } if port == "/dev/rollcall-no-such-port"));
  }
}
