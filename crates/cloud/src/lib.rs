//! Remote asset gateway implementations.
//!
//! - [`cloudinary`] -- Cloudinary-compatible upload API with signed requests.

pub mod cloudinary;

pub use cloudinary::{CloudinaryConfig, CloudinaryGateway};
