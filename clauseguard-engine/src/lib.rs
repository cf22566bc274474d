pub mod api_client;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod session;
pub mod store;
pub mod traits;
pub mod upload;

#[cfg(test)]
mod testing;
