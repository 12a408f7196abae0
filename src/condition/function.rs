// src/condition/function.rs

use crate::condition::Condition;

/// Wraps a closure as a [`Condition`].
pub struct FnCondition<F>(F);

impl<F> FnCondition<F>
where
    F: Fn() -> bool + Send,
{
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

impl<F> Condition for FnCondition<F>
where
    F: Fn() -> bool + Send,
{
    fn check(&self) -> bool {
        (self.0)()
    }
}
