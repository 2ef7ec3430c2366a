pub mod a2s;
pub mod master;
