pub mod analysis;
pub mod auth;
pub mod config;
pub mod contract;
pub mod dashboard;
pub mod listing;
pub mod risk;
pub mod route;
pub mod text;
pub mod toast;
pub mod types;
pub mod upload;

// Keep the public surface small and intentional.
pub use analysis::*;
pub use auth::*;
pub use config::*;
pub use contract::*;
pub use dashboard::*;
pub use listing::*;
pub use risk::*;
pub use route::*;
pub use text::*;
pub use toast::*;
pub use types::*;
pub use upload::*;
