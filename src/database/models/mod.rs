pub mod live_price;

pub use live_price::{LivePrice, NewLivePrice};
