pub mod viewer;

pub use viewer::{ViewerContext, ViewerType};
