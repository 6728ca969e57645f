pub mod identity;
pub mod imaging;
pub mod services;
