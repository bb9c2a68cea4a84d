pub mod consent;
pub mod design;
pub mod order;
