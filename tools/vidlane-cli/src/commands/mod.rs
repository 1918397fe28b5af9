pub mod check;
pub mod inspect;
pub mod plan;
pub mod validate;
