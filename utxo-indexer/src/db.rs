mod store;
mod utxo;

pub use store::*;
pub use utxo::*;
