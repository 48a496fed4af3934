pub mod carts;
pub mod system;
