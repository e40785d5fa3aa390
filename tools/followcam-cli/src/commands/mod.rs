pub mod analyze;
pub mod check;
pub mod info;
pub mod session;
pub mod track;
