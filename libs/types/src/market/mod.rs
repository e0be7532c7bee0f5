//! Market data records consumed by the engine

pub mod candle;
