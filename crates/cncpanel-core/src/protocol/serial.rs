//! Serial port handling
//!
//! Port discovery and raw 8N1 setup for the motor controller board.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;

use super::{ProtocolError, DEFAULT_BAUD_RATE, PORT_TIMEOUT_MS};

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyACM0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            product: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// Sort key: ttyACM* first (numeric suffix), then ttyUSB*, then the rest by name.
/// The controller board enumerates as a CDC-ACM device.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List available serial ports in a deterministic order
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let p = PortInfo::from(info);
        map.entry(p.name.clone()).or_insert(p);
    }

    // udev sometimes lags behind /dev for freshly plugged boards
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Device path the controller usually shows up at on this host
pub fn platform_default_port() -> Option<&'static str> {
    if cfg!(target_os = "linux") {
        Some("/dev/ttyACM2")
    } else if cfg!(target_os = "openbsd") {
        Some("/dev/cuaU0")
    } else {
        None
    }
}

/// Resolve the port to open: platform default, else the first discovered port
pub fn default_port_name() -> Result<String, ProtocolError> {
    if let Some(name) = platform_default_port() {
        return Ok(name.to_string());
    }
    list_ports()
        .into_iter()
        .next()
        .map(|p| p.name)
        .ok_or(ProtocolError::PortNotFound)
}

/// Open a serial port for the controller
pub fn open_port(name: &str, baud_rate: Option<u32>) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    // Reads are only issued when bytes are queued, so the timeout is a backstop
    serialport::new(name, baud)
        .timeout(Duration::from_millis(PORT_TIMEOUT_MS))
        .open()
        .map_err(|e| ProtocolError::OpenFailed {
            port: name.to_string(),
            reason: e.to_string(),
        })
}

/// Configure raw 8N1 with no flow control
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)?;
    port.set_parity(serialport::Parity::None)?;
    port.set_stop_bits(serialport::StopBits::One)?;
    port.set_flow_control(serialport::FlowControl::None)?;

    // Some CDC boards reset when DTR drops; not fatal if the driver refuses
    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::debug!("failed to set DTR high: {} (continuing)", e);
    }

    Ok(())
}

/// Clear the serial port buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(serialport::ClearBuffer::All)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_ports_sorted_and_unique() {
        let ports = list_ports();
        for pair in ports.windows(2) {
            assert!(port_sort_key(&pair[0].name) <= port_sort_key(&pair[1].name));
            assert_ne!(pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_port_sorting() {
        let names = vec![
            "/dev/ttyUSB1",
            "/dev/ttyACM2",
            "/dev/cuaU0",
            "/dev/ttyACM0",
            "/dev/ttyACM10",
        ];
        let mut ports: Vec<PortInfo> = names
            .into_iter()
            .map(|n| PortInfo::bare(n.to_string()))
            .collect();

        ports.sort_by_key(|p| port_sort_key(&p.name));
        let ordered: Vec<String> = ports.into_iter().map(|p| p.name).collect();

        assert_eq!(
            ordered,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM2",
                "/dev/ttyACM10",
                "/dev/ttyUSB1",
                "/dev/cuaU0",
            ]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_default_port() {
        assert_eq!(platform_default_port(), Some("/dev/ttyACM2"));
        assert_eq!(default_port_name().ok().as_deref(), Some("/dev/ttyACM2"));
    }

    #[test]
    fn test_open_missing_port_fails_cleanly() {
        let err = open_port("/dev/does-not-exist-cncpanel", None).err();
        assert!(matches!(err, Some(ProtocolError::OpenFailed { .. })));
    }
}
