pub mod nature_remo;

pub use nature_remo::{discover_meter, NatureRemoSource};
