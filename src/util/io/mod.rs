pub mod bus;
pub mod frame;
pub mod serial;
pub mod transport;
