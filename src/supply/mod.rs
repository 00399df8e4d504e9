//! Supplies: lifetimes of subscriptions and the cutoff graph between them.
//!
//! Every receiver owns exactly one [`Supply`]. Cutting it off stops delivery for
//! good; dependency edges ([`Supply::needs`] / [`Supply::cuts`]) propagate the
//! cutoff, with its [`Reason`], down a DAG of dependent supplies.

mod reason;
mod token;

pub use reason::Reason;
pub use token::Supply;
