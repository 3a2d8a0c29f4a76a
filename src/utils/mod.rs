pub mod account_label;
pub mod address_validator;
pub mod amount;
