mod replicated;

pub use replicated::Replicated;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a value lives.
///
/// There is no device runtime behind this: relocating a value rewrites its tag,
/// which is what stages downstream of a placement decision observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Cpu,
    Accelerator(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu:0"),
            Device::Accelerator(index) => write!(f, "accelerator:{index}"),
        }
    }
}

/// Values that can be relocated to another device.
pub trait DevicePut: Sized {
    fn device_put(self, device: Device) -> Self;
}

impl<A: DevicePut, B: DevicePut> DevicePut for (A, B) {
    fn device_put(self, device: Device) -> Self {
        (self.0.device_put(device), self.1.device_put(device))
    }
}

/// Where acting runs relative to learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActingPlacement {
    /// Rollout runs wherever the training state already lives.
    Colocated,
    /// Rollout inputs move to `acting` and results come back to `learner`, so
    /// acting does not contend with the gradient computation.
    Offload { acting: Device, learner: Device },
}

impl ActingPlacement {
    pub fn from_flag(gpu_acting: bool, acting: Device, learner: Device) -> Self {
        if gpu_acting {
            ActingPlacement::Colocated
        } else {
            ActingPlacement::Offload { acting, learner }
        }
    }

    pub fn to_acting<T: DevicePut>(&self, value: T) -> T {
        match self {
            ActingPlacement::Colocated => value,
            ActingPlacement::Offload { acting, .. } => value.device_put(*acting),
        }
    }

    pub fn to_learner<T: DevicePut>(&self, value: T) -> T {
        match self {
            ActingPlacement::Colocated => value,
            ActingPlacement::Offload { learner, .. } => value.device_put(*learner),
        }
    }
}

/// The devices visible to this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDevices {
    pub count: usize,
    pub accelerator: bool,
}

impl LocalDevices {
    /// The default device, the one learning happens on.
    pub fn primary(&self) -> Device {
        if self.accelerator {
            Device::Accelerator(0)
        } else {
            Device::Cpu
        }
    }

    pub fn all(&self) -> Vec<Device> {
        if self.accelerator {
            (0..self.count).map(Device::Accelerator).collect()
        } else {
            vec![Device::Cpu; self.count]
        }
    }
}
