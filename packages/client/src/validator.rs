//! `/eth/v1/validator` endpoints.

use eth2api::types::{phase0, BlsSignature, DependentProposerDuty, Epoch, Root, Slot};
use eth2api::{minimal_request, ApiError, Client, Envelope, Query, QueryValue, RequestDescriptor};

/// `GET /eth/v1/validator/blocks/{slot}`
///
/// A node that is still syncing answers 503; check the error with
/// [`ApiError::is_syncing`].
pub async fn produce_block<C: Client>(
    cli: &C,
    slot: Slot,
    randao_reveal: BlsSignature,
    graffiti: Option<Root>,
) -> Result<phase0::BeaconBlock, ApiError> {
    let query = Query::new()
        .with("randao_reveal", QueryValue::text(&randao_reveal))
        .with_opt("graffiti", graffiti.map(|g| QueryValue::text(&g)));
    let req = RequestDescriptor::get(format!("/eth/v1/validator/blocks/{slot}")).with_query(query);
    minimal_request(cli, req).await.map(Envelope::into_data)
}

/// `GET /eth/v1/validator/duties/proposer/{epoch}`. The reply carries its
/// own `dependent_root` next to `data` and is decoded as-is.
pub async fn proposer_duties<C: Client>(
    cli: &C,
    epoch: Epoch,
) -> Result<DependentProposerDuty, ApiError> {
    let req = RequestDescriptor::get(format!("/eth/v1/validator/duties/proposer/{epoch}"));
    minimal_request(cli, req).await
}

#[cfg(test)]
mod tests {
    use eth2api::types::ValidatorIndex;
    use serde_json::json;

    use super::*;
    use crate::spy::Spy;

    #[tokio::test]
    async fn produce_block_sends_randao_and_graffiti() {
        let randao = BlsSignature([2; 96]);
        let graffiti = Root([3; 32]);
        let block = phase0::BeaconBlock {
            slot: Slot(4),
            ..Default::default()
        };
        let spy = Spy::get(
            &format!("/eth/v1/validator/blocks/4?graffiti={graffiti}&randao_reveal={randao}"),
            200,
            json!({ "data": block }),
        );
        let got = produce_block(&spy, Slot(4), randao, Some(graffiti))
            .await
            .unwrap();
        assert_eq!(got.slot, Slot(4));
    }

    #[tokio::test]
    async fn produce_block_while_syncing() {
        let randao = BlsSignature::default();
        let spy = Spy::get(
            &format!("/eth/v1/validator/blocks/4?randao_reveal={randao}"),
            503,
            json!({ "code": 503, "message": "beacon node is syncing" }),
        );
        let err = produce_block(&spy, Slot(4), randao, None).await.unwrap_err();
        assert!(err.is_syncing());
        assert_eq!(err.status_code(), Some(503));
    }

    #[tokio::test]
    async fn proposer_duties_keep_dependent_root() {
        let spy = Spy::get(
            "/eth/v1/validator/duties/proposer/1",
            200,
            json!({
                "dependent_root": format!("0x{}", "09".repeat(32)),
                "data": [{
                    "pubkey": format!("0x{}", "01".repeat(48)),
                    "validator_index": "3",
                    "slot": "32",
                }],
            }),
        );
        let duties = proposer_duties(&spy, Epoch(1)).await.unwrap();
        assert_eq!(duties.dependent_root, Root([9; 32]));
        assert_eq!(duties.data[0].validator_index, ValidatorIndex(3));
    }
}
