// Feetech STS3215 smart servo protocol
//
// Instruction packet: [0xFF, 0xFF, ID, Length, Instruction, Params..., Checksum]
// Status packet:      [0xFF, 0xFF, ID, Length, Error, Params..., Checksum]
// Length counts everything after itself; the checksum covers ID through the
// last parameter.

use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Broadcast ID, used by sync writes (no status reply)
pub const BROADCAST_ID: u8 = 0xFE;

/// Encoder steps per output shaft revolution
pub const STEPS_PER_REVOLUTION: i64 = 4096;

const HEADER: [u8; 2] = [0xFF, 0xFF];

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
    SyncWrite = 0x83,
}

/// RAM registers used by the drive backend
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Register {
    OperatingMode = 33,   // 1 byte
    TorqueEnable = 40,    // 1 byte
    GoalPosition = 42,    // 2 bytes, relative steps in step mode
    GoalVelocity = 46,    // 2 bytes, sign-magnitude
    Lock = 55,            // 1 byte
    PresentPosition = 56, // 2 bytes, 0..4095
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatingMode {
    Position = 0,
    Velocity = 1,
    Pwm = 2,
    Step = 3,
}

#[derive(Debug, thiserror::Error)]
pub enum FeetechError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response from motor {id}: {reason}")]
    InvalidResponse { id: u8, reason: String },

    #[error("Checksum mismatch for motor {id}")]
    ChecksumMismatch { id: u8 },

    #[error("Motor {id} returned error status: 0x{status:02X}")]
    MotorError { id: u8, status: u8 },

    #[error("Timeout waiting for response from motor {id}")]
    Timeout { id: u8 },
}

pub type Result<T> = std::result::Result<T, FeetechError>;

fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    !sum
}

/// Encode an instruction packet
pub fn encode_instruction(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(params.len() + 6);
    packet.extend_from_slice(&HEADER);
    packet.extend_from_slice(&[id, (params.len() + 2) as u8, instruction as u8]);
    packet.extend_from_slice(params);
    packet.push(checksum(&packet[HEADER.len()..]));
    packet
}

/// Validate the body of a status packet (everything after the header) and
/// return its parameters
pub fn decode_status(expected_id: u8, body: &[u8]) -> Result<Vec<u8>> {
    let invalid = |reason: String| FeetechError::InvalidResponse {
        id: expected_id,
        reason,
    };

    let Some((&[id, length], rest)) = body.split_first_chunk::<2>() else {
        return Err(invalid("Truncated status".into()));
    };
    if id != expected_id {
        return Err(invalid(format!("ID mismatch: got {}", id)));
    }
    if length < 2 || rest.len() != length as usize {
        return Err(invalid(format!("Length {} does not match {} bytes", length, rest.len())));
    }

    let (&received, payload) = rest.split_last().ok_or_else(|| invalid("Empty status".into()))?;
    if checksum(&body[..body.len() - 1]) != received {
        return Err(FeetechError::ChecksumMismatch { id });
    }

    match payload.split_first() {
        Some((&0, params)) => Ok(params.to_vec()),
        Some((&status, _)) => Err(FeetechError::MotorError { id, status }),
        None => Err(invalid("Missing error byte".into())),
    }
}

/// Sign-magnitude: bit 15 = negative, bits 0-14 = magnitude
pub fn encode_sign_magnitude(value: i16) -> u16 {
    let magnitude = value.unsigned_abs().min(0x7FFF);
    if value < 0 { 0x8000 | magnitude } else { magnitude }
}

/// Serial connection to a chain of servos
pub struct FeetechBus {
    port: Box<dyn SerialPort>,
}

impl FeetechBus {
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;
        Ok(Self { port })
    }

    fn send(&mut self, id: u8, instruction: Instruction, params: &[u8]) -> Result<()> {
        let packet = encode_instruction(id, instruction, params);
        self.port.write_all(&packet)?;
        self.port.flush()?;
        Ok(())
    }

    fn receive(&mut self, expected_id: u8) -> Result<Vec<u8>> {
        let mut head = [0u8; 4];
        self.port.read_exact(&mut head).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut => FeetechError::Timeout { id: expected_id },
            _ => FeetechError::Io(e),
        })?;
        if head[..2] != HEADER {
            return Err(FeetechError::InvalidResponse {
                id: expected_id,
                reason: format!("Invalid header: {:02X?}", &head[..2]),
            });
        }

        let mut body = vec![0u8; 2 + head[3] as usize];
        body[..2].copy_from_slice(&head[2..]);
        self.port.read_exact(&mut body[2..])?;
        decode_status(expected_id, &body)
    }

    pub fn ping(&mut self, id: u8) -> Result<bool> {
        self.send(id, Instruction::Ping, &[])?;
        match self.receive(id) {
            Ok(_) => Ok(true),
            Err(FeetechError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn write_u8(&mut self, id: u8, register: Register, value: u8) -> Result<()> {
        debug!("Write u8 to motor {}: reg={:?}, value={}", id, register, value);
        self.send(id, Instruction::Write, &[register as u8, value])?;
        self.receive(id).map(drop)
    }

    pub fn write_u16(&mut self, id: u8, register: Register, value: u16) -> Result<()> {
        debug!("Write u16 to motor {}: reg={:?}, value={}", id, register, value);
        let [lo, hi] = value.to_le_bytes();
        self.send(id, Instruction::Write, &[register as u8, lo, hi])?;
        self.receive(id).map(drop)
    }

    pub fn write_i16(&mut self, id: u8, register: Register, value: i16) -> Result<()> {
        self.write_u16(id, register, encode_sign_magnitude(value))
    }

    pub fn read_u16(&mut self, id: u8, register: Register) -> Result<u16> {
        self.send(id, Instruction::Read, &[register as u8, 2])?;
        let params = self.receive(id)?;
        match params[..] {
            [lo, hi, ..] => Ok(u16::from_le_bytes([lo, hi])),
            _ => Err(FeetechError::InvalidResponse {
                id,
                reason: format!("Expected 2 bytes, got {}", params.len()),
            }),
        }
    }

    /// Write one signed 16-bit register on several motors in one broadcast
    pub fn sync_write_i16(&mut self, register: Register, data: &[(u8, i16)]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut params = vec![register as u8, 2];
        for &(id, value) in data {
            params.push(id);
            params.extend_from_slice(&encode_sign_magnitude(value).to_le_bytes());
        }
        debug!("Sync write to {} motors: reg={:?}", data.len(), register);
        self.send(BROADCAST_ID, Instruction::SyncWrite, &params)
    }

    pub fn set_torque(&mut self, id: u8, enabled: bool) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, enabled as u8)?;
        self.write_u8(id, Register::Lock, enabled as u8)
    }

    /// Switch operating mode; torque is dropped while the mode changes
    pub fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
        self.set_torque(id, false)?;
        self.write_u8(id, Register::OperatingMode, mode as u8)?;
        self.set_torque(id, true)
    }

    pub fn present_position(&mut self, id: u8) -> Result<u16> {
        self.read_u16(id, Register::PresentPosition)
            .map(|raw| raw % STEPS_PER_REVOLUTION as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        // ~(1+4+3+30+0+2) = ~40 = 215
        assert_eq!(checksum(&[1u8, 4, 0x03, 30, 0, 2]), 215);
        // Sum wraps past 0xFF
        assert_eq!(checksum(&[0xFE, 0x04]), !0x02);
    }

    #[test]
    fn test_encode_write_packet() {
        let packet = encode_instruction(1, Instruction::Write, &[30, 0, 2]);
        assert_eq!(packet, vec![0xFF, 0xFF, 1, 5, 0x03, 30, 0, 2, !(1u8 + 5 + 3 + 30 + 2)]);
    }

    #[test]
    fn test_decode_position_status() {
        let mut body = vec![7, 4, 0, 0x34, 0x12];
        body.push(checksum(&body));
        assert_eq!(decode_status(7, &body).unwrap(), vec![0x34, 0x12]);
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        let mut body = vec![7, 2, 0x20];
        body.push(checksum(&body));
        assert!(matches!(
            decode_status(7, &body),
            Err(FeetechError::MotorError { id: 7, status: 0x20 })
        ));
        assert!(matches!(
            decode_status(8, &body),
            Err(FeetechError::InvalidResponse { id: 8, .. })
        ));

        let corrupt = [7, 2, 0, 0x00];
        assert!(matches!(
            decode_status(7, &corrupt),
            Err(FeetechError::ChecksumMismatch { id: 7 })
        ));
        assert!(decode_status(7, &[7]).is_err());
    }

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(encode_sign_magnitude(100), 100);
        assert_eq!(encode_sign_magnitude(-100), 0x8064);
        assert_eq!(encode_sign_magnitude(i16::MIN), 0xFFFF);
        assert_eq!(encode_sign_magnitude(3000), 0x0BB8);
    }
}
