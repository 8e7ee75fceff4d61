use servent_wire::ggep::Extension;

use crate::{parse_trailing_ggep, Result};

/// A Ping payload. Plain pings carry no body; a Ping may also carry a
/// trailing GGEP block (e.g. an `"SCP"` extension requesting a supernode
/// connect-back), which the router and pong cache both inspect.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ping {
    pub ggep: Option<Vec<Extension>>,
}

impl Ping {
    pub fn decode(body: &[u8]) -> Result<Self> {
        Ok(Self {
            ggep: parse_trailing_ggep(body),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        match &self.ggep {
            Some(exts) => servent_wire::ggep::write_block(exts, &[]).unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ping_roundtrip() {
        let p = Ping::default();
        let encoded = p.encode();
        assert!(encoded.is_empty());
        assert_eq!(Ping::decode(&encoded).unwrap(), p);
    }

    #[test]
    fn ping_with_ggep_roundtrip() {
        let p = Ping {
            ggep: Some(vec![Extension::new("SCP", vec![0])]),
        };
        let encoded = p.encode();
        let decoded = Ping::decode(&encoded).unwrap();
        assert_eq!(decoded, p);
    }
}
