pub mod otp_service;
pub mod request_meta;
