//! Feature slices: one module per visible component of the wall.

pub mod auth;
pub mod captcha;
pub mod feed;
pub mod input;
