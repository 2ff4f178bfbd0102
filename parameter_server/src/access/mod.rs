//! Access strategies: how a pull reads a parameter and how a push updates it.

mod access_method;
mod ada_grad;
mod adam;
mod additive;
mod agent;
mod gradient_descent;
mod gradient_descent_with_momentum;

pub use access_method::{AccessMethod, SizeMismatchErr};
pub use ada_grad::{AdaGrad, AdaGradParam};
pub use adam::{Adam, AdamParam};
pub use additive::Additive;
pub use agent::{PullAccess, PullStrategy, PushAccess, PushStrategy};
pub use gradient_descent::GradientDescent;
pub use gradient_descent_with_momentum::{GradientDescentWithMomentum, MomentumParam};
