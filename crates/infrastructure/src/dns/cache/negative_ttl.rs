/// Clamp for negative-answer lifetimes. The SOA-derived TTL
/// (min of the SOA record TTL and its MINIMUM field) is held inside
/// `[floor, max]`; a negative reply without SOA gets the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegativeTtl {
    floor: u32,
    max: u32,
}

impl NegativeTtl {
    pub fn new(floor: u32, max: u32) -> Self {
        Self {
            floor,
            max: max.max(floor),
        }
    }

    pub fn ttl_for(&self, soa_ttl: Option<u32>) -> u32 {
        match soa_ttl {
            Some(ttl) => ttl.clamp(self.floor, self.max),
            None => self.floor,
        }
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }
}

impl Default for NegativeTtl {
    fn default() -> Self {
        Self::new(5, 3600)
    }
}
