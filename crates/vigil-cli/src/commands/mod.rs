pub mod attachment;
pub mod audit;
pub mod comment;
pub mod dispatch;
pub mod incident;
pub mod shared;
pub mod user;
