pub mod candidate;
pub mod classification;
pub mod contact;
pub mod extraction;
pub mod voucher;
pub mod wire;

pub use candidate::{IssuerCandidateList, MatchCandidate, MatchMethod, SelfExclusion};
pub use classification::{ClassificationResult, EstimationRequest};
pub use contact::{Address, ClientProfile, ContactRecord};
pub use extraction::{field, ExtractedField, ExtractionSet};
pub use voucher::{ImportOutcome, SupplierRef, VoucherDraft};
