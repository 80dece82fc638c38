mod rpc;
mod server;

pub use rpc::*;
pub use server::*;
