pub mod credential;
pub mod db;
pub mod error;
pub mod handlers;
