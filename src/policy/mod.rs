//! Confirmation policy
//!
//! | Transition | Confirmation |
//! |------------|--------------|
//! | data access narrows, or a database becomes `Limited` | "Change access to this database to limited?" |
//! | native query `Disallowed -> Allowed` | "Allow native query editing?" |
//! | collection access | none per edit |
//! | save with pending edits | "Save permissions?" with per-group grant lines |
//! | leave the page with pending edits | "Discard your unsaved changes?" |

mod confirmation;

pub use confirmation::{ConfirmationKind, ConfirmationPolicy, ConfirmationRequirement};
