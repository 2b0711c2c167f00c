//! Plugins: bundles of middleware registered in one call.

use super::MiddlewareStack;
use crate::Result;

/// Registers one or more middleware into a stack.
///
/// Closures taking `&mut MiddlewareStack` are plugins too:
///
/// ```ignore
/// use strata::stack::MiddlewareStack;
///
/// let mut stack = MiddlewareStack::new();
/// stack.use_plugin(&|stack: &mut MiddlewareStack| stack.add(my_middleware()))?;
/// ```
pub trait Plugin {
    /// Adds this plugin's middleware to `stack`.
    ///
    /// # Errors
    ///
    /// Returns the stack error raised while adding a middleware.
    fn apply_to_stack(&self, stack: &mut MiddlewareStack) -> Result<()>;
}

impl<F> Plugin for F
where
    F: Fn(&mut MiddlewareStack) -> Result<()>,
{
    fn apply_to_stack(&self, stack: &mut MiddlewareStack) -> Result<()> {
        self(stack)
    }
}
