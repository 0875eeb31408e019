//! Map implementation selection for the instance table.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::HashMap;
}
