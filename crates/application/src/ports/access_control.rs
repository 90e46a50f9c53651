use rsdns_domain::AccessList;
use std::net::IpAddr;

pub trait AccessControlPort: Send + Sync {
    fn is_allowed(&self, client: IpAddr) -> bool;
}

impl AccessControlPort for AccessList {
    fn is_allowed(&self, client: IpAddr) -> bool {
        AccessList::is_allowed(self, client)
    }
}
