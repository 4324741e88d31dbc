//! Application services on top of a [`LinkStore`](qrshort_core::LinkStore).
//!
//! [`LinkService`] is the entry point used by the HTTP gateway. It validates
//! input, delegates to the store and hands hit increments to a background
//! [`HitCounter`]. [`RedirectService`] turns a short code into a redirect
//! target.

pub mod hits;
pub mod redirect;
pub mod service;

pub use hits::HitCounter;
pub use redirect::{Redirect, RedirectService, Redirector};
pub use service::LinkService;
