pub mod events;
pub mod gateway;
pub mod handlers;
pub mod password;
pub mod session;

pub use gateway::{AccountGateway, AuthError};
