//! Forward-window outcome labels for the unified cohort table.
//!
//! Each derivation mirrors the backward feature joins but looks at
//! `(anchor, anchor + horizon]` and resolves to the
//! positive/negative/unobserved state machine; `unobserved` marks censoring
//! ambiguity and is never conflated with a negative.

pub mod acute;
pub mod death;
mod spine;
pub mod symptom;
pub mod toxicity;

pub use acute::add_ed_visit_labels;
pub use death::add_death_labels;
pub use symptom::add_symptom_labels;
pub use toxicity::add_ctcae_labels;
