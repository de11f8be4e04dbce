pub mod chat;
pub mod diagnosis;
pub mod enums;
pub mod patient;
pub mod timestamp;

pub use chat::*;
pub use diagnosis::*;
pub use enums::*;
pub use patient::*;
