pub mod backend;
pub mod codec;
pub mod commands;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod float_codec;
pub mod frame;
pub mod gc;
pub mod glob;
pub mod key_codec;
pub mod keyspace;
pub mod rdb;
pub mod script;
pub mod server;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
