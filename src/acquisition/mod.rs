//! Sample acquisition: device abstraction, synthetic source, and the
//! acquisition loop itself.

pub mod device;
pub mod rig;
pub mod synthetic;

pub use device::{validate_code, DeviceError, Gain, SamplingDevice, FULL_SCALE_CODE};
pub use rig::{AcquisitionRig, RigConfig, RigState, RunReport};
pub use synthetic::{SyntheticDevice, SyntheticProfile};
