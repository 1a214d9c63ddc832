// Output port specifiers and their resolution to concrete port lists
//
// Legacy firmware encodes ports as single bytes: 0..=2 name one port,
// 3..=6 name the two- and three-port combinations. Callers hand us a
// PortSpec and everything past this boundary works with a PortList.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One physical motor output
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPort {
    A = 0,
    B = 1,
    C = 2,
}

impl OutputPort {
    /// All ports in canonical order
    pub const ALL: [OutputPort; 3] = [OutputPort::A, OutputPort::B, OutputPort::C];

    /// Bit used for this port in a `PortSpec::Set` mask
    pub const fn mask(self) -> u8 {
        1 << (self as u8)
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputPort::A => "A",
            OutputPort::B => "B",
            OutputPort::C => "C",
        };
        f.write_str(name)
    }
}

/// Logical output selector as accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSpec {
    Single(OutputPort),
    AB,
    AC,
    BC,
    ABC,
    /// Arbitrary port set, bit n = port n
    Set(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Unrecognized output port code: {0}")]
    Unrecognized(u8),
}

impl TryFrom<u8> for PortSpec {
    type Error = PortError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PortSpec::Single(OutputPort::A)),
            1 => Ok(PortSpec::Single(OutputPort::B)),
            2 => Ok(PortSpec::Single(OutputPort::C)),
            3 => Ok(PortSpec::AB),
            4 => Ok(PortSpec::AC),
            5 => Ok(PortSpec::BC),
            6 => Ok(PortSpec::ABC),
            other => Err(PortError::Unrecognized(other)),
        }
    }
}

impl PortSpec {
    /// Normalize into an ascending list of concrete ports
    pub fn resolve(self) -> PortList {
        use OutputPort::{A, B, C};
        match self {
            PortSpec::Single(port) => PortList::from_slice(&[port]),
            PortSpec::AB => PortList::from_slice(&[A, B]),
            PortSpec::AC => PortList::from_slice(&[A, C]),
            PortSpec::BC => PortList::from_slice(&[B, C]),
            PortSpec::ABC => PortList::from_slice(&[A, B, C]),
            PortSpec::Set(mask) => {
                let mut list = PortList::empty();
                for port in OutputPort::ALL {
                    if mask & port.mask() != 0 {
                        list.push(port);
                    }
                }
                list
            }
        }
    }
}

/// Resolved ports, at most three, always ascending and without duplicates
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PortList {
    ports: [OutputPort; 3],
    len: u8,
}

impl PortList {
    pub const fn empty() -> Self {
        Self {
            ports: [OutputPort::A; 3],
            len: 0,
        }
    }

    fn from_slice(ports: &[OutputPort]) -> Self {
        let mut list = Self::empty();
        for &port in ports {
            list.push(port);
        }
        list
    }

    fn push(&mut self, port: OutputPort) {
        debug_assert!((self.len as usize) < self.ports.len());
        self.ports[self.len as usize] = port;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[OutputPort] {
        &self.ports[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The two ports of a synchronized pair, if this list is exactly a pair
    pub fn pair(&self) -> Option<[OutputPort; 2]> {
        match self.as_slice() {
            &[first, second] => Some([first, second]),
            _ => None,
        }
    }
}

impl fmt::Debug for PortList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl From<[OutputPort; 2]> for PortList {
    fn from(pair: [OutputPort; 2]) -> Self {
        Self::from_slice(&pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OutputPort::{A, B, C};

    #[test]
    fn test_symbolic_constants_resolve_in_order() {
        assert_eq!(PortSpec::AB.resolve().as_slice(), &[A, B]);
        assert_eq!(PortSpec::AC.resolve().as_slice(), &[A, C]);
        assert_eq!(PortSpec::BC.resolve().as_slice(), &[B, C]);
        assert_eq!(PortSpec::ABC.resolve().as_slice(), &[A, B, C]);
        assert_eq!(PortSpec::Single(B).resolve().as_slice(), &[B]);
    }

    #[test]
    fn test_legacy_codes() {
        let expected: [&[OutputPort]; 7] = [&[A], &[B], &[C], &[A, B], &[A, C], &[B, C], &[A, B, C]];
        for (code, ports) in expected.iter().enumerate() {
            let spec = PortSpec::try_from(code as u8).unwrap();
            assert_eq!(spec.resolve().as_slice(), *ports, "code {}", code);
        }
        assert_eq!(PortSpec::try_from(7u8), Err(PortError::Unrecognized(7)));
    }

    #[test]
    fn test_set_falls_back_to_membership() {
        // C and A given, resolved ascending
        let spec = PortSpec::Set(C.mask() | A.mask());
        assert_eq!(spec.resolve().as_slice(), &[A, C]);
        assert_eq!(spec.resolve().pair(), Some([A, C]));

        // Bits beyond port C are ignored
        assert_eq!(PortSpec::Set(0b1111_1010).resolve().as_slice(), &[B]);
        assert!(PortSpec::Set(0).resolve().is_empty());
    }

    #[test]
    fn test_pair_requires_two_ports() {
        assert_eq!(PortSpec::ABC.resolve().pair(), None);
        assert_eq!(PortSpec::Single(A).resolve().pair(), None);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&PortSpec::AC).unwrap();
        assert_eq!(json, "\"ac\"");
        let single: PortSpec = serde_json::from_str(r#"{"single":"c"}"#).unwrap();
        assert_eq!(single, PortSpec::Single(C));
    }
}
