pub mod outputter;
pub use outputter::Outputter;

#[cfg(any(test, feature = "test-util"))]
pub use outputter::NullOutputter;
