pub mod capture;
pub mod cat;
pub mod check;
pub mod netfs;
pub mod write;
