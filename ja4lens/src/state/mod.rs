pub mod db;
pub mod index;
