pub mod dialog;
pub mod init;
pub mod message;
