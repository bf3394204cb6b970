//! Navigation between permission views
//!
//! The data page (laid out by group or by database) and the collections
//! page each edit their own tree. Moving between them, or off the
//! permissions route, goes through the [`NavigationGuard`].

mod guard;

pub use guard::{
    DataFocus, GuardChoice, NavigationGuard, NavigationOutcome, NavigationRequest, Page, View,
};
