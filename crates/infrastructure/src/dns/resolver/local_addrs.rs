use rustc_hash::FxHashSet;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

/// Addresses this process answers DNS on.
///
/// A delegation whose nameservers resolve to one of these would send the
/// resolver's queries back into its own listener.
#[derive(Debug, Clone, Default)]
pub struct LocalAddresses {
    addrs: FxHashSet<SocketAddr>,
}

impl LocalAddresses {
    pub fn new(addrs: impl IntoIterator<Item = SocketAddr>) -> Self {
        Self {
            addrs: addrs.into_iter().collect(),
        }
    }

    /// Expand listener addresses into everything they accept on. A wildcard
    /// bind covers every interface address of its family (both for `::`).
    pub fn for_listeners(listeners: &[SocketAddr]) -> Self {
        Self::expand(listeners, &interface_addresses())
    }

    fn expand(listeners: &[SocketAddr], interfaces: &[IpAddr]) -> Self {
        let mut addrs = FxHashSet::default();
        for listener in listeners {
            match listener.ip() {
                IpAddr::V4(ip) if ip.is_unspecified() => addrs.extend(
                    interfaces
                        .iter()
                        .filter(|ip| ip.is_ipv4())
                        .map(|ip| SocketAddr::new(*ip, listener.port())),
                ),
                IpAddr::V6(ip) if ip.is_unspecified() => addrs.extend(
                    interfaces
                        .iter()
                        .map(|ip| SocketAddr::new(*ip, listener.port())),
                ),
                _ => {
                    addrs.insert(*listener);
                }
            }
        }
        debug!(count = addrs.len(), "Local listener addresses collected");
        Self { addrs }
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.addrs.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}

fn interface_addresses() -> Vec<IpAddr> {
    netdev::get_interfaces()
        .into_iter()
        .flat_map(|iface| {
            let v4 = iface.ipv4.iter().map(|net| IpAddr::V4(net.addr()));
            let v6 = iface.ipv6.iter().map(|net| IpAddr::V6(net.addr()));
            v4.chain(v6).collect::<Vec<_>>()
        })
        .collect()
}
