//! 사용자 계정 도메인 모델.

mod phone;
mod role;
mod user;

pub use phone::*;
pub use role::*;
pub use user::*;
