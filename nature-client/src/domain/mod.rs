pub mod appliance;
pub mod reading;

pub use appliance::{epc, Appliance, Device, EchonetAppliance, EchonetProperty};
pub use reading::{parse_provider_timestamp, Reading};
