use super::engine::Marketplace;
use crate::domain::changeset::Changeset;
use crate::domain::ids::{PaymentId, ProofId};
use crate::domain::proof::{self, ContentHash, MediaType, PaymentProof};
use crate::error::{MarketError, Result};
use tracing::info;

impl Marketplace {
    /// Attaches evidence of a transfer to a payment and moves it to review.
    ///
    /// The file is stored content-addressed before the commit. If the commit then
    /// fails, the blob stays behind unreferenced and a retry reuses it.
    pub async fn submit_proof(
        &self,
        credential: &str,
        payment_id: PaymentId,
        bytes: &[u8],
        mime: &str,
    ) -> Result<PaymentProof> {
        let caller = self.authenticate(credential).await?;
        let mut payment = self
            .store
            .payment(payment_id)
            .await?
            .ok_or_else(|| MarketError::not_found("payment", payment_id))?;
        if !caller.can_access(payment.user_id) {
            return Err(MarketError::forbidden("payment belongs to another user"));
        }

        let mime = MediaType::parse(mime)?;
        proof::check_payload(bytes, self.config.max_proof_bytes)?;
        let from = payment.status;
        payment.mark_proof_received()?;

        let sha256 = ContentHash::of(bytes);
        let file_url = self.blobs.put(&sha256, bytes).await?;
        let proof = PaymentProof {
            id: ProofId::new(),
            payment_id,
            file_url,
            sha256,
            mime,
            size_bytes: bytes.len(),
            created_at: self.clock.now(),
        };

        self.commit(
            Changeset::new()
                .update_payment(payment.clone(), from)
                .insert_proof(proof.clone()),
        )
        .await?;
        info!(
            reference = %payment.reference,
            sha256 = %proof.sha256,
            size = proof.size_bytes,
            "proof received"
        );
        Ok(proof)
    }
}
