//! Plantower PMS5003 particulate sensor over a serial port.
//!
//! In active mode the sensor streams a 32-byte frame roughly once per second:
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 0-1 | Start characters `0x42 0x4D` |
//! | 2-3 | Frame length, always 28 |
//! | 4-27 | Twelve big-endian data words (see [`ParticleFrame`]) |
//! | 28-29 | Reserved |
//! | 30-31 | Checksum: sum of bytes 0-29 |

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Buf;
use serialport::SerialPort;
use tokio::sync::Mutex;
use tracing::trace;

use envmon_types::{Field, SensorValues};

use crate::error::{Error, Result};
use crate::sensor::SensorSource;

/// Length of a complete frame in bytes.
pub const FRAME_LEN: usize = 32;

/// Frame start characters.
pub const START_BYTES: [u8; 2] = [0x42, 0x4D];

/// Default baud rate of the sensor.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

const FRAME_BODY_LEN: u16 = 28;

/// Bytes scanned for a start sequence before giving up.
const MAX_SYNC_BYTES: usize = FRAME_LEN * 4;

/// Decoded PMS5003 data words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParticleFrame {
    /// PM1.0, standard particles, µg/m³.
    pub pm10_standard: u16,
    /// PM2.5, standard particles, µg/m³.
    pub pm25_standard: u16,
    /// PM10, standard particles, µg/m³.
    pub pm100_standard: u16,
    /// PM1.0, atmospheric environment, µg/m³.
    pub pm10_env: u16,
    /// PM2.5, atmospheric environment, µg/m³.
    pub pm25_env: u16,
    /// PM10, atmospheric environment, µg/m³.
    pub pm100_env: u16,
    /// Particles > 0.3 µm per 0.1 L.
    pub particles_03um: u16,
    /// Particles > 0.5 µm per 0.1 L.
    pub particles_05um: u16,
    /// Particles > 1.0 µm per 0.1 L.
    pub particles_10um: u16,
    /// Particles > 2.5 µm per 0.1 L.
    pub particles_25um: u16,
    /// Particles > 5.0 µm per 0.1 L.
    pub particles_50um: u16,
    /// Particles > 10 µm per 0.1 L.
    pub particles_100um: u16,
}

impl ParticleFrame {
    /// Decode a complete frame, validating start characters, length and checksum.
    pub fn from_bytes(frame: &[u8]) -> Result<Self> {
        if frame.len() != FRAME_LEN {
            return Err(Error::InvalidFrame(format!(
                "expected {FRAME_LEN} bytes, got {}",
                frame.len()
            )));
        }
        if frame[..2] != START_BYTES {
            return Err(Error::InvalidFrame(format!(
                "bad start characters {:02X} {:02X}",
                frame[0], frame[1]
            )));
        }

        let expected = frame[..30].iter().map(|&b| u16::from(b)).fold(0u16, u16::wrapping_add);

        let mut buf = &frame[2..];
        let length = buf.get_u16();
        if length != FRAME_BODY_LEN {
            return Err(Error::InvalidFrame(format!("bad frame length {length}")));
        }

        let decoded = Self {
            pm10_standard: buf.get_u16(),
            pm25_standard: buf.get_u16(),
            pm100_standard: buf.get_u16(),
            pm10_env: buf.get_u16(),
            pm25_env: buf.get_u16(),
            pm100_env: buf.get_u16(),
            particles_03um: buf.get_u16(),
            particles_05um: buf.get_u16(),
            particles_10um: buf.get_u16(),
            particles_25um: buf.get_u16(),
            particles_50um: buf.get_u16(),
            particles_100um: buf.get_u16(),
        };
        buf.advance(2);
        let checksum = buf.get_u16();
        if checksum != expected {
            return Err(Error::InvalidFrame(format!(
                "checksum mismatch: frame says {checksum:#06X}, computed {expected:#06X}"
            )));
        }

        Ok(decoded)
    }

    /// Copy the decoded words into the particulate fields of `values`.
    pub fn apply_to(&self, values: &mut SensorValues) {
        let words = [
            (Field::Pm10Standard, self.pm10_standard),
            (Field::Pm25Standard, self.pm25_standard),
            (Field::Pm100Standard, self.pm100_standard),
            (Field::Pm10Env, self.pm10_env),
            (Field::Pm25Env, self.pm25_env),
            (Field::Pm100Env, self.pm100_env),
            (Field::Particles03um, self.particles_03um),
            (Field::Particles05um, self.particles_05um),
            (Field::Particles10um, self.particles_10um),
            (Field::Particles25um, self.particles_25um),
            (Field::Particles50um, self.particles_50um),
            (Field::Particles100um, self.particles_100um),
        ];
        for (field, word) in words {
            values.set(field, Some(f64::from(word)));
        }
    }
}

/// Read bytes until a start sequence is found, then the rest of the frame.
pub fn read_frame_from<R: Read + ?Sized>(reader: &mut R) -> Result<ParticleFrame> {
    let mut frame = [0u8; FRAME_LEN];
    let mut byte = [0u8; 1];
    let mut previous = 0u8;

    for _ in 0..MAX_SYNC_BYTES {
        reader.read_exact(&mut byte)?;
        if previous == START_BYTES[0] && byte[0] == START_BYTES[1] {
            frame[..2].copy_from_slice(&START_BYTES);
            reader.read_exact(&mut frame[2..])?;
            trace!(frame = ?frame, "Read particle frame");
            return ParticleFrame::from_bytes(&frame);
        }
        previous = byte[0];
    }

    Err(Error::InvalidFrame(format!(
        "no start characters within {MAX_SYNC_BYTES} bytes"
    )))
}

/// A PMS5003 attached to a serial port.
pub struct SerialParticleSensor {
    path: String,
    port: Arc<Mutex<Box<dyn SerialPort>>>,
}

impl fmt::Debug for SerialParticleSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialParticleSensor")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SerialParticleSensor {
    /// Open the serial port at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if the port does not exist and
    /// [`Error::Serial`] for any other failure to open it.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_secs(2))
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice
                | serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    Error::DeviceNotFound(path.to_string())
                }
                _ => Error::Serial(e),
            })?;

        Ok(Self::from_port(path, port))
    }

    /// Wrap an already opened port.
    pub fn from_port(path: impl Into<String>, port: Box<dyn SerialPort>) -> Self {
        Self {
            path: path.into(),
            port: Arc::new(Mutex::new(port)),
        }
    }

    /// Port path.
    pub fn name(&self) -> &str {
        &self.path
    }

    /// Read the next complete frame.
    ///
    /// Stale input is discarded first so the frame reflects the current air.
    pub async fn read_frame(&self) -> Result<ParticleFrame> {
        let port = Arc::clone(&self.port);
        tokio::task::spawn_blocking(move || {
            let mut port = port.blocking_lock();
            port.clear(serialport::ClearBuffer::Input)?;
            read_frame_from(&mut *port)
        })
        .await
        .map_err(|e| Error::TaskFailed(e.to_string()))?
    }
}

#[async_trait]
impl SensorSource for SerialParticleSensor {
    fn name(&self) -> &str {
        &self.path
    }

    async fn read(&self) -> Result<SensorValues> {
        let frame = self.read_frame().await?;
        let mut values = SensorValues::missing();
        frame.apply_to(&mut values);
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(words: [u16; 12]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(FRAME_LEN);
        frame.extend_from_slice(&START_BYTES);
        frame.extend_from_slice(&FRAME_BODY_LEN.to_be_bytes());
        for word in words {
            frame.extend_from_slice(&word.to_be_bytes());
        }
        frame.extend_from_slice(&[0x97, 0x00]);
        let checksum = frame.iter().map(|&b| u16::from(b)).sum::<u16>();
        frame.extend_from_slice(&checksum.to_be_bytes());
        frame
    }

    const WORDS: [u16; 12] = [3, 5, 6, 3, 5, 6, 510, 150, 30, 4, 1, 0];

    #[test]
    fn test_decode_frame() {
        let frame = ParticleFrame::from_bytes(&encode(WORDS)).unwrap();
        assert_eq!(frame.pm25_env, 5);
        assert_eq!(frame.particles_03um, 510);
        assert_eq!(frame.particles_100um, 0);

        let mut values = SensorValues::missing().with(Field::Temperature, 20.0);
        frame.apply_to(&mut values);
        assert_eq!(values.temperature, Some(20.0));
        assert_eq!(values.pm100_standard, Some(6.0));
        assert_eq!(values.particles_05um, Some(150.0));
        assert_eq!(values.humidity, None);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = encode(WORDS);
        bytes[10] ^= 0xFF;
        let err = ParticleFrame::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidFrame(msg) if msg.contains("checksum")));
    }

    #[test]
    fn test_bad_length_and_start() {
        assert!(ParticleFrame::from_bytes(&[0x42, 0x4D]).is_err());

        let mut bytes = encode(WORDS);
        bytes[0] = 0x00;
        assert!(ParticleFrame::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_reader_syncs_to_start_bytes() {
        let mut stream = vec![0x00, 0x4D, 0x42, 0x13];
        stream.extend(encode(WORDS));
        let frame = read_frame_from(&mut Cursor::new(stream)).unwrap();
        assert_eq!(frame.pm10_standard, 3);
    }

    #[test]
    fn test_reader_gives_up_without_start_bytes() {
        let stream = vec![0u8; MAX_SYNC_BYTES + 8];
        let err = read_frame_from(&mut Cursor::new(stream)).unwrap_err();
        assert!(matches!(err, Error::InvalidFrame(_)));
    }

    #[test]
    fn test_truncated_stream_is_io_error() {
        let bytes = encode(WORDS);
        let err = read_frame_from(&mut Cursor::new(&bytes[..20])).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
