#[cfg(test)]
mod fixtures;

mod session_store;
