//! Token rail payment pipeline: build, sign, broadcast.

use crate::audit::AuditContext;
use crate::blockchain::{AuditTarget, SigningOutcome};
use crate::context::SettlementContext;
use crate::error::SettlementResult;
use crate::payments::types::{parse_address, PaymentOutcome, PaymentRequest, PAYMENT_EVENT};

/// Make an on-chain payment.
///
/// The funder's nonce lock is held from the nonce read until the receipt
/// arrives or the pipeline fails. A signature awaiting MFA approval is
/// returned as [`PaymentOutcome::AwaitingApproval`] and nothing is broadcast.
pub async fn process_payment(
    context: &SettlementContext,
    request: &PaymentRequest,
) -> SettlementResult<PaymentOutcome> {
    let funder = parse_address("funder", &request.funder)?;
    let recipient = parse_address("recipient", &request.recipient)?;

    tracing::info!(
        network = %request.network,
        contract_ref = %request.contract_ref,
        funder = %funder,
        recipient = %recipient,
        symbol = %request.symbol,
        amount = %request.amount,
        "Processing payment"
    );

    let result: SettlementResult<PaymentOutcome> = async {
        let _sender = context.nonce_locks().acquire(&request.network, funder).await;

        let prepared = context
            .payment_builder()
            .build_payment(funder, recipient, &request.network, &request.symbol, &request.amount)
            .await?;

        match context.signer().sign(&prepared.transaction, funder).await? {
            SigningOutcome::ApprovalRequired { mfa_id } => {
                tracing::info!(
                    network = %request.network,
                    funder = %funder,
                    mfa_id = ?mfa_id,
                    "Payment awaiting MFA approval"
                );
                Ok(PaymentOutcome::AwaitingApproval {
                    mfa_id,
                    transaction: Box::new(prepared.transaction),
                })
            }
            SigningOutcome::Signed(raw) => {
                let connection = context.registry().get_connection(&request.network).await?;
                let audit = AuditContext::new(request.contract_ref.clone(), PAYMENT_EVENT);
                let receipt = context
                    .broadcaster()
                    .broadcast(
                        &*connection,
                        &raw,
                        Some(AuditTarget {
                            context: &audit,
                            from: funder,
                            to: Some(prepared.recipient),
                        }),
                    )
                    .await?;
                Ok(PaymentOutcome::Confirmed(receipt))
            }
        }
    }
    .await;

    if let Err(e) = &result {
        tracing::error!(
            network = %request.network,
            contract_ref = %request.contract_ref,
            funder = %funder,
            recipient = %recipient,
            symbol = %request.symbol,
            amount = %request.amount,
            error = %e,
            "Payment failed"
        );
    }
    result
}
