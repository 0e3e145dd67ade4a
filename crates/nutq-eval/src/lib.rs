//! Pronunciation evaluation library for Nutq
//!
//! This crate provides the pure decision logic layered on top of a speech
//! recognizer's output: Arabic text normalization, edit-distance similarity,
//! and the acceptance policy that turns a recognition result into a score.
//!
//! Nothing here performs I/O. The attempt lifecycle and the collaborators
//! (recognizer, token provider, persistence) live in `nutq-attempt`.

pub mod normalization;
pub mod policy;
pub mod similarity;

pub use normalization::{is_diacritic, normalize, normalize_opt};
pub use policy::{
    ACCEPT_SCORE_THRESHOLD, ACCEPT_SIMILARITY_THRESHOLD, AcceptanceBasis, AcceptancePolicy,
    CONFIDENT_MATCH_FLOOR, Decision, NO_ERROR_SENTINEL, RejectReason, VendorAssessment,
};
pub use similarity::{edit_distance, similarity};
