pub mod compare;
pub mod init;
pub mod proctor;
pub mod score;
pub mod validate;
