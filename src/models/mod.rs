//! Entities as exchanged with the backend and kept in local storage

mod audit;
mod claim;
mod contact;
mod progress;
mod promotion;
mod response;
mod script;
mod settings;
mod user;

pub use audit::*;
pub use claim::*;
pub use contact::*;
pub use progress::*;
pub use promotion::*;
pub use response::*;
pub use script::*;
pub use settings::*;
pub use user::*;
