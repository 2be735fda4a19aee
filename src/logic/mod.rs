//! Domain logic: normalization, analysis, assessment, proof, session
//! workflow and ledger submission.

pub mod analyzer;
pub mod assessor;
pub mod ledger;
pub mod normalize;
pub mod proof;
pub mod session;
