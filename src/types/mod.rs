pub mod analysis;
pub mod candle;
pub mod fundamentals;
pub mod indicators;

pub use analysis::*;
pub use candle::*;
pub use fundamentals::*;
pub use indicators::*;
