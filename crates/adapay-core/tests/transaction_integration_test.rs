//! Integration tests for transaction building flow
//!
//! Tests the complete flow from UTXO decoding through reassembly

use adapay_core::testing::{base_address, enterprise_address, utxo, witness_set_hex};
use adapay_core::{
    AuxiliaryData, Error, Memo, PaymentRequest, SendConfig, SignedTransaction, TransactionBuilder,
    TxOutput, UtxoSelector, DEFAULT_METADATA_LABEL,
};

fn builder() -> TransactionBuilder {
    TransactionBuilder::new(&SendConfig::default()).unwrap()
}

#[test]
fn test_provider_entries_to_signed_transaction() {
    let owner = enterprise_address(0, 0x33);
    let raw = vec![
        utxo(1, 0, 3_000_000, &owner).to_hex().unwrap(),
        "deadbeef".to_string(),
        utxo(2, 1, 8_000_000, &owner).to_hex().unwrap(),
    ];
    let available = UtxoSelector::decode_available(&raw);
    assert_eq!(available.len(), 2);

    let request = PaymentRequest::new(
        base_address(0, 0x44),
        4_000_000,
        Some(Memo::new("coffee").unwrap()),
    );
    let draft = builder().build(&available, &request, &owner).unwrap();
    assert!(draft.is_balanced());

    let signed = SignedTransaction::assemble(&draft, &witness_set_hex(draft.inputs().len())).unwrap();
    signed.verify_against(&draft).unwrap();

    assert_eq!(signed.id(), draft.id().unwrap());
    assert_eq!(
        signed.decode_memo(DEFAULT_METADATA_LABEL).unwrap(),
        Some("coffee".to_string())
    );

    let reparsed = SignedTransaction::from_bytes(&hex::decode(signed.to_hex()).unwrap()).unwrap();
    assert_eq!(reparsed, signed);
}

#[test]
fn test_insufficient_funds_scenario() {
    let owner = enterprise_address(0, 0x33);
    let available = vec![utxo(1, 0, 500_000, &owner)];
    let request = PaymentRequest::new(base_address(0, 0x44), 600_000, None);

    let builder = builder();
    let expected_fee = builder
        .minimum_fee(&available, &TxOutput::new(request.recipient.clone(), 600_000), None)
        .unwrap();

    match builder.build(&available, &request, &owner) {
        Err(Error::InsufficientFunds {
            required,
            available,
        }) => {
            assert_eq!(required, 600_000 + expected_fee);
            assert_eq!(available, 500_000);
        }
        other => panic!("expected insufficient funds, got {:?}", other),
    }
}

#[test]
fn test_exact_drain_scenario() {
    let owner = enterprise_address(0, 0x33);
    let recipient = base_address(0, 0x44);
    let amount = 10_000_000;
    let builder = builder();
    let memo = Memo::new("exact").unwrap();

    let fee = builder
        .minimum_fee(
            &[utxo(9, 0, 0, &owner)],
            &TxOutput::new(recipient.clone(), amount),
            Some(&memo),
        )
        .unwrap();

    let request = PaymentRequest::new(recipient, amount, Some(memo));
    let draft = builder
        .build(&[utxo(9, 0, amount + fee, &owner)], &request, &owner)
        .unwrap();

    assert_eq!(draft.outputs().len(), 1);
    assert_eq!(draft.fee(), fee);
    assert!(draft.is_balanced());
}

#[test]
fn test_dropped_metadata_is_detected() {
    let owner = enterprise_address(0, 0x33);
    let request = PaymentRequest::new(
        base_address(0, 0x44),
        2_000_000,
        Some(Memo::new("keep me").unwrap()),
    );
    let draft = builder()
        .build(&[utxo(1, 0, 10_000_000, &owner)], &request, &owner)
        .unwrap();
    let witnesses = hex::decode(witness_set_hex(1)).unwrap();

    let dropped = SignedTransaction::from_raw_parts(draft.body_bytes().unwrap(), witnesses.clone(), true, None);
    assert!(matches!(dropped.verify_against(&draft), Err(Error::Reassembly(_))));

    let altered_aux = AuxiliaryData::new(DEFAULT_METADATA_LABEL, Memo::new("keep mE").unwrap())
        .to_bytes()
        .unwrap();
    let altered = SignedTransaction::from_raw_parts(
        draft.body_bytes().unwrap(),
        witnesses,
        true,
        Some(altered_aux),
    );
    assert!(matches!(altered.verify_against(&draft), Err(Error::Reassembly(_))));
}

#[test]
fn test_malformed_witness_set_is_provider_error() {
    let owner = enterprise_address(0, 0x33);
    let request = PaymentRequest::new(base_address(0, 0x44), 2_000_000, None);
    let draft = builder()
        .build(&[utxo(1, 0, 10_000_000, &owner)], &request, &owner)
        .unwrap();

    for bad in ["", "zz", "a0", "80", "a1008"] {
        assert!(
            matches!(
                SignedTransaction::assemble(&draft, bad),
                Err(Error::UnknownProvider(_))
            ),
            "accepted {:?}",
            bad
        );
    }
}
