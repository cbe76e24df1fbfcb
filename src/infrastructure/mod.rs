pub mod config;
pub mod db;
pub mod llm_clients;
pub mod response;
