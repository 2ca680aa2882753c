// ── Serial / network port descriptors ──

use serde::{Deserialize, Serialize};

/// A port as listed by the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPort {
    pub name: String,
    pub serial_number: String,
    pub device_class: String,
    pub is_open: bool,
    pub is_primary: bool,
    pub baud: u32,
    pub buffer_algorithm: String,
    pub version: String,
    pub network_port: bool,
    pub vendor_id: String,
    pub product_id: String,
}

impl AgentPort {
    /// Convenience constructor for a closed, non-network port.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Structural equality that ignores list order. Compared as multisets
/// over every field, so ports sharing a name still match up.
pub fn same_ports(a: &[AgentPort], b: &[AgentPort]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&AgentPort> = a.iter().collect();
    let mut b: Vec<&AgentPort> = b.iter().collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_does_not_matter() {
        let a = vec![AgentPort::named("COM3"), AgentPort::named("COM4")];
        let b = vec![AgentPort::named("COM4"), AgentPort::named("COM3")];
        assert!(same_ports(&a, &b));
    }

    #[test]
    fn reordered_ports_sharing_a_name_match() {
        let board = |vendor: &str, product: &str| AgentPort {
            vendor_id: vendor.into(),
            product_id: product.into(),
            ..AgentPort::named("/dev/ttyUSB0")
        };
        let a = vec![board("0x2341", "0x0043"), board("0x1a86", "0x7523")];
        let b = vec![board("0x1a86", "0x7523"), board("0x2341", "0x0043")];
        assert!(same_ports(&a, &b));

        let c = vec![board("0x2341", "0x0043"), board("0x2341", "0x0043")];
        assert!(!same_ports(&a, &c));
    }

    #[test]
    fn field_changes_matter() {
        let a = vec![AgentPort::named("COM3")];
        let b = vec![AgentPort {
            is_open: true,
            ..AgentPort::named("COM3")
        }];
        assert!(!same_ports(&a, &b));
        assert!(!same_ports(&a, &[]));
    }
}
