pub mod charts;
pub mod valuesprovider;

pub use valuesprovider::{Checksums, Values, ValuesProvider};
