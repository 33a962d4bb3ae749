pub mod device;
pub mod discovery;
pub mod hcsecd;
pub mod inquiry;
pub mod service;
