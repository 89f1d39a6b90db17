pub mod auth;
pub mod handlers;
pub mod response;
pub mod server;

pub use response::TriggerResponse;
pub use server::{ApiServer, AppState};
