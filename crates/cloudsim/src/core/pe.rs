//! Processing element (CPU core).

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PeStatus {
    Free,
    Busy,
    Failed,
}

/// Processing element with capacity in MIPS.
#[derive(Clone, Debug, Serialize)]
pub struct Pe {
    pub id: u32,
    pub mips: f64,
    pub status: PeStatus,
}

impl Pe {
    pub fn new(id: u32, mips: f64) -> Self {
        Self {
            id,
            mips,
            status: PeStatus::Free,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == PeStatus::Failed
    }

    /// Capacity available for allocation, zero for failed PE.
    pub fn available_mips(&self) -> f64 {
        if self.is_failed() {
            0.
        } else {
            self.mips
        }
    }
}
