pub mod european;
pub mod payoff;

pub use crate::core::types::OptionType;
