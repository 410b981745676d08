//! # husk-dict
//!
//! Picks the pre-trained compression dictionary that best fits a piece of
//! content. The extension table is consulted first; content without a
//! telling extension goes through an ordered list of scored pattern rules.
//! Detection never fails: anything unrecognized is `generic`.

pub mod detect;
pub mod dictionary;
pub mod rules;

pub use detect::{detect, detect_named, detect_package, detect_path, SAMPLE_LIMIT};
pub use dictionary::DictionaryId;
pub use rules::{lookup_extension, rule_order, Rule, RULES};
