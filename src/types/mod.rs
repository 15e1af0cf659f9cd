pub mod fibonacci;
pub mod market;
pub mod scan;
pub mod tracking;

pub use fibonacci::*;
pub use market::*;
pub use scan::*;
pub use tracking::*;
