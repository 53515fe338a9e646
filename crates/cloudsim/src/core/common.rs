use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Outcome of checking or performing a resource allocation for VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AllocationVerdict {
    Success,
    NotEnoughPes,
    NotEnoughMips,
    NotEnoughRam,
    NotEnoughBw,
    NotEnoughStorage,
    HostFailed,
    HostNotFound,
    NoSuitableHost,
}

impl Display for AllocationVerdict {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            AllocationVerdict::Success => write!(f, "success"),
            AllocationVerdict::NotEnoughPes => write!(f, "not enough pes"),
            AllocationVerdict::NotEnoughMips => write!(f, "not enough mips"),
            AllocationVerdict::NotEnoughRam => write!(f, "not enough ram"),
            AllocationVerdict::NotEnoughBw => write!(f, "not enough bandwidth"),
            AllocationVerdict::NotEnoughStorage => write!(f, "not enough storage"),
            AllocationVerdict::HostFailed => write!(f, "host failed"),
            AllocationVerdict::HostNotFound => write!(f, "host not found"),
            AllocationVerdict::NoSuitableHost => write!(f, "no suitable host"),
        }
    }
}
