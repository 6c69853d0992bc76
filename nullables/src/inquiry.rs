//! Nullable inquiry creator: deterministic inquiry ids.

use async_trait::async_trait;
use ltc_providers::{InquiryCreator, ProviderError};
use ltc_types::{InquiryId, Uid};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Issues `inq_null_<n>` ids in order.
pub struct NullInquiryCreator {
    next: AtomicU64,
    unavailable: AtomicBool,
}

impl NullInquiryCreator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// When set, creation fails as if the provider were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for NullInquiryCreator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InquiryCreator for NullInquiryCreator {
    async fn create_inquiry(&self, _reference: &Uid) -> Result<InquiryId, ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Unreachable("null inquiry creator offline".into()));
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(InquiryId::new(format!("inq_null_{n}")))
    }
}
