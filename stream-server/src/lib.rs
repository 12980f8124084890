pub mod config;
pub mod http;
pub mod overlay;
pub mod process;
pub mod storage;
pub mod stream;

#[cfg(test)]
mod testing;
