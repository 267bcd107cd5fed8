use std::fmt::Debug;

/// A trait for items that can be used for sequence classification
pub trait Item: Send + Sync + Clone + Debug {
    /// Returns the input text for the item
    fn input(&self) -> &str;

    /// Returns one class id per label column
    fn labels(&self) -> &[usize];
}
