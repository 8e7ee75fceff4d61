//! Payload structs for the vendor messages named in [`crate::dispatch`].

use crate::{Result, VendorError};

/// `BEAR/4`: ask the peer to stop forwarding queries above `hops` (a
/// leaf-throttling hint; `0` lifts any prior limit).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct HopsFlow {
    pub hops: u8,
}

impl HopsFlow {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let hops = *payload.first().ok_or(VendorError::Truncated)?;
        Ok(Self { hops })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![self.hops]
    }
}

/// `BEAR/7`: ask the peer to open a TCP connection back to our listening
/// port, used to verify we are reachable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ConnectBack {
    pub port: u16,
}

impl ConnectBack {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 2 {
            return Err(VendorError::Truncated);
        }
        Ok(Self {
            port: u16::from_le_bytes([payload[0], payload[1]]),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.port.to_le_bytes().to_vec()
    }
}

/// `BEAR/11`: "how many more hits do you still want for this query".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct QueryStatusRequest {
    pub muid: [u8; 16],
}

impl QueryStatusRequest {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 16 {
            return Err(VendorError::Truncated);
        }
        let mut muid = [0u8; 16];
        muid.copy_from_slice(&payload[0..16]);
        Ok(Self { muid })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.muid.to_vec()
    }
}

/// `BEAR/12`: reply naming how many hits remain wanted (`0xFFFF` means
/// "stop searching, I have enough").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct QueryStatusResponse {
    pub hits_wanted: u16,
}

impl QueryStatusResponse {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 2 {
            return Err(VendorError::Truncated);
        }
        Ok(Self {
            hits_wanted: u16::from_le_bytes([payload[0], payload[1]]),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.hits_wanted.to_le_bytes().to_vec()
    }
}

/// `LIME/21`: ask a reachable peer to act as our push-proxy, identifying
/// ourselves by servent GUID so it knows whom a later Push is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PushProxyRequest {
    pub servent_id: [u8; 16],
}

impl PushProxyRequest {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 16 {
            return Err(VendorError::Truncated);
        }
        let mut servent_id = [0u8; 16];
        servent_id.copy_from_slice(&payload[0..16]);
        Ok(Self { servent_id })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.servent_id.to_vec()
    }
}

/// `LIME/22`: confirmation carrying the proxy's externally reachable
/// address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PushProxyAck {
    pub ip: [u8; 4],
    pub port: u16,
}

impl PushProxyAck {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 6 {
            return Err(VendorError::Truncated);
        }
        Ok(Self {
            ip: [payload[0], payload[1], payload[2], payload[3]],
            port: u16::from_le_bytes([payload[4], payload[5]]),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.ip.to_vec();
        out.extend_from_slice(&self.port.to_le_bytes());
        out
    }
}

/// `/0/0`: advertised vendor-message support, one `(vendor, selector,
/// version)` triple per line the peer claims to understand.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MessagesSupported {
    pub supported: Vec<(crate::codes::VendorCode, u16, u16)>,
}

impl MessagesSupported {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 2 {
            return Err(VendorError::Truncated);
        }
        let count = u16::from_le_bytes([payload[0], payload[1]]) as usize;
        let mut supported = Vec::with_capacity(count);
        let mut pos = 2;
        for _ in 0..count {
            if pos + 8 > payload.len() {
                return Err(VendorError::Truncated);
            }
            let mut vendor = [0u8; 4];
            vendor.copy_from_slice(&payload[pos..pos + 4]);
            let selector = u16::from_le_bytes([payload[pos + 4], payload[pos + 5]]);
            let version = u16::from_le_bytes([payload[pos + 6], payload[pos + 7]]);
            supported.push((vendor, selector, version));
            pos += 8;
        }
        Ok(Self { supported })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.supported.len() * 8);
        out.extend_from_slice(&(self.supported.len() as u16).to_le_bytes());
        for (vendor, selector, version) in &self.supported {
            out.extend_from_slice(vendor);
            out.extend_from_slice(&selector.to_le_bytes());
            out.extend_from_slice(&version.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    #[test]
    fn hops_flow_roundtrip() {
        let h = HopsFlow { hops: 3 };
        assert_eq!(HopsFlow::decode(&h.encode()).unwrap(), h);
    }

    #[test]
    fn connect_back_roundtrip() {
        let c = ConnectBack { port: 6346 };
        assert_eq!(ConnectBack::decode(&c.encode()).unwrap(), c);
    }

    #[test]
    fn push_proxy_ack_roundtrip() {
        let a = PushProxyAck {
            ip: [1, 2, 3, 4],
            port: 6347,
        };
        assert_eq!(PushProxyAck::decode(&a.encode()).unwrap(), a);
    }

    #[test]
    fn messages_supported_roundtrip() {
        let m = MessagesSupported {
            supported: vec![(codes::T_BEAR, 0x0004, 0x0001), (codes::T_LIME, 0x0015, 0x0002)],
        };
        let encoded = m.encode();
        assert_eq!(MessagesSupported::decode(&encoded).unwrap(), m);
    }

    #[test]
    fn truncated_payload_rejected() {
        assert!(matches!(HopsFlow::decode(&[]), Err(VendorError::Truncated)));
        assert!(matches!(ConnectBack::decode(&[1]), Err(VendorError::Truncated)));
    }
}
