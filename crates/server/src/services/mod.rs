pub mod accounts;
pub mod images;
pub mod password;
