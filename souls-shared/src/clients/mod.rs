pub mod db;
pub mod email;
pub mod geoip;
pub mod redis;
