pub mod enrollment;
pub mod health;
pub mod verification;
