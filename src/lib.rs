pub mod budget;
pub mod db;
pub mod drafts;
pub mod error;
pub mod models;
pub mod statement;
