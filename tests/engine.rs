mod support;

use uuid::Uuid;

use backend_recognition_system::db::tx::TransactionStatus;
use backend_recognition_system::engine::{
    cancel_transfer, confirm_transfer, create_transfer, ConfirmOptions, CreateTransfer,
    TransferError, REVIEW_ANY_PERMISSION, REVIEW_OWN_PERMISSION,
};

use support::{MemoryLedger, StaticGate};

struct Setup {
    store: MemoryLedger,
    gate: StaticGate,
    sender: Uuid,
    receiver: Uuid,
    reviewer: Uuid,
}

fn setup(sender_balance: i64) -> Setup {
    let store = MemoryLedger::new();
    let gate = StaticGate::new();

    let sender = store.add_user("alice", sender_balance, 0);
    let receiver = store.add_user("bob", 0, 0);
    let reviewer = store.add_user("carol", 0, 0);
    gate.grant(reviewer, REVIEW_OWN_PERMISSION);

    Setup {
        store,
        gate,
        sender,
        receiver,
        reviewer,
    }
}

fn transfer_request(s: &Setup, amount: i64) -> CreateTransfer {
    CreateTransfer {
        sender_id: s.sender,
        receiver_id: s.receiver,
        reviewer_id: s.reviewer,
        amount,
        title: "Thanks for the code review".to_string(),
        description: Some("Caught a nasty off-by-one".to_string()),
    }
}

#[tokio::test]
async fn create_debits_sender_and_leaves_transaction_pending() {
    let s = setup(30);

    let transaction = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();

    assert_eq!(transaction.status, TransactionStatus::Pending);
    assert!(!transaction.reviewed);
    assert!(transaction.reviewed_at.is_none());
    assert_eq!(transaction.amount, 10);
    assert_eq!(s.store.balance_of(s.sender), 20);
    // funds are in flight: the receiver sees nothing yet
    assert_eq!(s.store.vault_of(s.receiver), 0);
    assert_eq!(s.store.balance_of(s.receiver), 0);
}

#[tokio::test]
async fn confirm_credits_receiver_vault_without_touching_sender() {
    let s = setup(30);
    let transaction = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();

    let settled = confirm_transfer(
        &s.store,
        &s.gate,
        s.reviewer,
        transaction.id,
        ConfirmOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(settled.status, TransactionStatus::Success);
    assert!(settled.reviewed);
    assert!(settled.reviewed_at.is_some());
    assert_eq!(settled.review_by_id, s.reviewer);
    assert_eq!(s.store.vault_of(s.receiver), 10);
    assert_eq!(s.store.balance_of(s.sender), 20);
}

#[tokio::test]
async fn cancel_refunds_sender_and_leaves_receiver_untouched() {
    let s = setup(30);
    let transaction = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();
    assert_eq!(s.store.balance_of(s.sender), 20);

    let settled = cancel_transfer(&s.store, &s.gate, s.reviewer, transaction.id)
        .await
        .unwrap();

    assert_eq!(settled.status, TransactionStatus::Failed);
    assert!(settled.reviewed);
    assert!(settled.reviewed_at.is_some());
    assert_eq!(settled.review_by_id, s.reviewer);
    assert_eq!(s.store.balance_of(s.sender), 30);
    assert_eq!(s.store.vault_of(s.receiver), 0);
}

#[tokio::test]
async fn zero_amount_is_rejected_without_mutation() {
    let s = setup(30);

    let result = create_transfer(&s.store, &s.gate, transfer_request(&s, 0)).await;

    assert!(matches!(result, Err(TransferError::InvalidAmount)));
    assert_eq!(s.store.balance_of(s.sender), 30);
    assert_eq!(s.store.transaction_count(), 0);
}

#[tokio::test]
async fn insufficient_balance_is_rejected_without_mutation() {
    let s = setup(5);

    let result = create_transfer(&s.store, &s.gate, transfer_request(&s, 10)).await;

    assert!(matches!(result, Err(TransferError::InsufficientBalance)));
    assert_eq!(s.store.balance_of(s.sender), 5);
    assert_eq!(s.store.transaction_count(), 0);
}

#[tokio::test]
async fn transfer_to_self_is_rejected() {
    let s = setup(30);
    let mut request = transfer_request(&s, 10);
    request.receiver_id = s.sender;

    let result = create_transfer(&s.store, &s.gate, request).await;

    assert!(matches!(result, Err(TransferError::SelfTransfer)));
    assert_eq!(s.store.transaction_count(), 0);
}

#[tokio::test]
async fn reviewer_equal_to_sender_or_receiver_is_rejected() {
    let s = setup(30);
    gate_all(&s);

    let mut request = transfer_request(&s, 10);
    request.reviewer_id = s.sender;
    let result = create_transfer(&s.store, &s.gate, request).await;
    assert!(matches!(result, Err(TransferError::ReviewerConflict)));

    let mut request = transfer_request(&s, 10);
    request.reviewer_id = s.receiver;
    let result = create_transfer(&s.store, &s.gate, request).await;
    assert!(matches!(result, Err(TransferError::ReviewerConflict)));

    assert_eq!(s.store.balance_of(s.sender), 30);
    assert_eq!(s.store.transaction_count(), 0);
}

// reviewer-conflict checks need the conflicting party to hold the review
// grant, otherwise ReviewerUnauthorized fires first
fn gate_all(s: &Setup) {
    s.gate.grant(s.sender, REVIEW_OWN_PERMISSION);
    s.gate.grant(s.receiver, REVIEW_OWN_PERMISSION);
}

#[tokio::test]
async fn reviewer_without_review_grant_is_rejected() {
    let s = setup(30);
    let outsider = s.store.add_user("dave", 0, 0);
    let mut request = transfer_request(&s, 10);
    request.reviewer_id = outsider;

    let result = create_transfer(&s.store, &s.gate, request).await;

    assert!(matches!(result, Err(TransferError::ReviewerUnauthorized)));
    assert_eq!(s.store.transaction_count(), 0);
}

#[tokio::test]
async fn second_confirm_fails_and_changes_nothing() {
    let s = setup(30);
    let transaction = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();

    confirm_transfer(
        &s.store,
        &s.gate,
        s.reviewer,
        transaction.id,
        ConfirmOptions::default(),
    )
    .await
    .unwrap();

    let result = confirm_transfer(
        &s.store,
        &s.gate,
        s.reviewer,
        transaction.id,
        ConfirmOptions::default(),
    )
    .await;

    assert!(matches!(result, Err(TransferError::AlreadyReviewed)));
    // no double credit
    assert_eq!(s.store.vault_of(s.receiver), 10);
    assert_eq!(s.store.balance_of(s.sender), 20);
}

#[tokio::test]
async fn cancel_after_confirm_fails_and_changes_nothing() {
    let s = setup(30);
    let transaction = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();

    confirm_transfer(
        &s.store,
        &s.gate,
        s.reviewer,
        transaction.id,
        ConfirmOptions::default(),
    )
    .await
    .unwrap();

    let result = cancel_transfer(&s.store, &s.gate, s.reviewer, transaction.id).await;

    assert!(matches!(result, Err(TransferError::AlreadyReviewed)));
    // the confirmed outcome stands: no refund on top of the credit
    assert_eq!(s.store.balance_of(s.sender), 20);
    assert_eq!(s.store.vault_of(s.receiver), 10);
    assert_eq!(
        s.store.transaction(transaction.id).unwrap().status,
        TransactionStatus::Success
    );
}

#[tokio::test]
async fn user_who_is_not_the_reviewer_cannot_settle() {
    let s = setup(30);
    let outsider = s.store.add_user("mallory", 0, 0);
    let transaction = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();

    let confirm = confirm_transfer(
        &s.store,
        &s.gate,
        outsider,
        transaction.id,
        ConfirmOptions::default(),
    )
    .await;
    assert!(matches!(confirm, Err(TransferError::Unauthorized)));

    let cancel = cancel_transfer(&s.store, &s.gate, outsider, transaction.id).await;
    assert!(matches!(cancel, Err(TransferError::Unauthorized)));

    assert_eq!(
        s.store.transaction(transaction.id).unwrap().status,
        TransactionStatus::Pending
    );
}

#[tokio::test]
async fn admin_override_can_confirm_and_reassign_the_reviewer() {
    let s = setup(30);
    let admin = s.store.add_user("root", 0, 0);
    s.gate.grant(admin, REVIEW_ANY_PERMISSION);

    let transaction = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();

    let settled = confirm_transfer(
        &s.store,
        &s.gate,
        admin,
        transaction.id,
        ConfirmOptions {
            reassign_reviewer: true,
        },
    )
    .await
    .unwrap();

    assert_eq!(settled.status, TransactionStatus::Success);
    assert_eq!(settled.review_by_id, admin);
    assert_eq!(s.store.vault_of(s.receiver), 10);
}

#[tokio::test]
async fn admin_override_without_reassignment_keeps_the_reviewer_of_record() {
    let s = setup(30);
    let admin = s.store.add_user("root", 0, 0);
    s.gate.grant(admin, REVIEW_ANY_PERMISSION);

    let transaction = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();

    let settled = confirm_transfer(
        &s.store,
        &s.gate,
        admin,
        transaction.id,
        ConfirmOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(settled.review_by_id, s.reviewer);
}

#[tokio::test]
async fn cancel_records_the_acting_admin_as_reviewer() {
    let s = setup(30);
    let admin = s.store.add_user("root", 0, 0);
    s.gate.grant(admin, REVIEW_ANY_PERMISSION);

    let transaction = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();

    let settled = cancel_transfer(&s.store, &s.gate, admin, transaction.id)
        .await
        .unwrap();

    assert_eq!(settled.review_by_id, admin);
    assert_eq!(s.store.balance_of(s.sender), 30);
}

#[tokio::test]
async fn settling_a_missing_transaction_is_not_found() {
    let s = setup(30);

    let result = confirm_transfer(
        &s.store,
        &s.gate,
        s.reviewer,
        Uuid::new_v4(),
        ConfirmOptions::default(),
    )
    .await;

    assert!(matches!(result, Err(TransferError::NotFound)));
}

#[tokio::test]
async fn transfer_with_unknown_participant_is_not_found() {
    let s = setup(30);
    let mut request = transfer_request(&s, 10);
    request.receiver_id = Uuid::new_v4();

    let result = create_transfer(&s.store, &s.gate, request).await;

    assert!(matches!(result, Err(TransferError::NotFound)));
    assert_eq!(s.store.balance_of(s.sender), 30);
}

#[tokio::test]
async fn full_lifecycle_conserves_hearts_across_many_transfers() {
    let s = setup(30);

    // three transfers of 10: confirm, cancel, leave pending
    let first = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();
    let second = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();
    let _third = create_transfer(&s.store, &s.gate, transfer_request(&s, 10))
        .await
        .unwrap();
    assert_eq!(s.store.balance_of(s.sender), 0);

    confirm_transfer(
        &s.store,
        &s.gate,
        s.reviewer,
        first.id,
        ConfirmOptions::default(),
    )
    .await
    .unwrap();
    cancel_transfer(&s.store, &s.gate, s.reviewer, second.id)
        .await
        .unwrap();

    // 10 confirmed into the vault, 10 refunded, 10 still in flight
    assert_eq!(s.store.vault_of(s.receiver), 10);
    assert_eq!(s.store.balance_of(s.sender), 10);

    // a fourth transfer exceeding the refunded balance is rejected
    let result = create_transfer(&s.store, &s.gate, transfer_request(&s, 11)).await;
    assert!(matches!(result, Err(TransferError::InsufficientBalance)));
}
