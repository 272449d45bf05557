//! The Ledger Mutation Service.
//!
//! Every balance change runs as one [`UnitOfWork`]: the user's balance is
//! locked and re-read, the debit is checked against it, and the balance,
//! transaction record, point log and side-effect rows are written before a
//! single commit. An error anywhere drops the unit of work, so nothing from a
//! failed call is ever visible. Errors are returned untouched; logging and
//! HTTP mapping belong to the caller.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::mutation::{validate_quantity, LedgerMutation, LedgerReceipt, SideEffect};
use crate::ledger::pricing::price_for;
use crate::models::{
    ItemType, PointLog, PricingPolicy, PricingTier, TournamentEntry, TransactionMetadata,
    TransactionRecord, TransactionStatus, TransactionType, Voucher, VoucherStatus,
};
use crate::store::{Store, UnitOfWork};

pub struct LedgerService<S> {
    store: S,
    voucher_validity: Duration,
}

impl<S: Store> LedgerService<S> {
    pub fn new(store: S, voucher_validity: Duration) -> Self {
        Self {
            store,
            voucher_validity,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Applies `mutation` atomically.
    pub async fn apply(&self, mutation: LedgerMutation) -> LedgerResult<LedgerReceipt> {
        mutation.validate()?;
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let receipt = self.execute(&mut tx, mutation, None, now).await?;
        tx.commit().await?;
        Ok(receipt)
    }

    /// Records a pending point charge. The balance moves on [`confirm`].
    ///
    /// [`confirm`]: LedgerService::confirm
    pub async fn request_charge(
        &self,
        user_id: Uuid,
        amount: i64,
        depositor_name: String,
    ) -> LedgerResult<TransactionRecord> {
        if amount <= 0 {
            return Err(LedgerError::ValidationError(
                "charge amount must be positive".to_string(),
            ));
        }
        if depositor_name.trim().is_empty() {
            return Err(LedgerError::ValidationError(
                "depositor name is required".to_string(),
            ));
        }
        let metadata = TransactionMetadata::Charge {
            depositor_name,
            reviewed_by: None,
            note: None,
        };
        self.insert_pending(user_id, amount, metadata, None).await
    }

    /// Records a pending withdrawal of `amount` points. The balance must
    /// cover it now and again when an admin confirms it.
    pub async fn request_withdrawal(
        &self,
        user_id: Uuid,
        amount: i64,
        destination: String,
    ) -> LedgerResult<TransactionRecord> {
        if amount <= 0 {
            return Err(LedgerError::ValidationError(
                "withdrawal amount must be positive".to_string(),
            ));
        }
        if destination.trim().is_empty() {
            return Err(LedgerError::ValidationError(
                "withdrawal destination is required".to_string(),
            ));
        }
        let metadata = TransactionMetadata::Withdrawal {
            destination,
            reviewed_by: None,
            note: None,
        };
        self.insert_pending(user_id, -amount, metadata, Some(amount))
            .await
    }

    /// Completes a pending charge or withdrawal, moving the balance by the
    /// record's amount. Confirming a finalized record fails with
    /// [`LedgerError::InvalidState`] and changes nothing.
    pub async fn confirm(&self, transaction_id: Uuid, reviewer: Uuid) -> LedgerResult<LedgerReceipt> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let pending = lock_pending(&mut tx, transaction_id).await?;

        let mut metadata = pending.metadata.clone();
        metadata.record_review(reviewer, None);
        let reason = match pending.transaction_type {
            TransactionType::Withdrawal => "Withdrawal confirmed",
            _ => "Point charge confirmed",
        };
        let mutation = LedgerMutation::new(pending.user_id, pending.amount, metadata, reason);
        mutation.validate()?;

        let receipt = self.execute(&mut tx, mutation, Some(pending), now).await?;
        tx.commit().await?;
        Ok(receipt)
    }

    /// Finalizes a pending record as `CANCELLED` or `FAILED` without touching
    /// the balance.
    pub async fn reject(
        &self,
        transaction_id: Uuid,
        reviewer: Uuid,
        status: TransactionStatus,
        note: Option<String>,
    ) -> LedgerResult<TransactionRecord> {
        if !matches!(
            status,
            TransactionStatus::Cancelled | TransactionStatus::Failed
        ) {
            return Err(LedgerError::ValidationError(format!(
                "cannot reject into status {status:?}"
            )));
        }

        let mut tx = self.store.begin().await?;
        let mut record = lock_pending(&mut tx, transaction_id).await?;
        record.metadata.record_review(reviewer, note);
        record.status = status;
        record.updated_at = Utc::now();
        tx.update_transaction(&record).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Lets a user withdraw their own pending request.
    pub async fn cancel_request(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> LedgerResult<TransactionRecord> {
        let mut tx = self.store.begin().await?;
        let mut record = tx
            .lock_transaction(transaction_id)
            .await?
            .filter(|record| record.user_id == user_id)
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))?;
        ensure_pending(&record)?;

        record.status = TransactionStatus::Cancelled;
        record.updated_at = Utc::now();
        tx.update_transaction(&record).await?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn purchase_vouchers(
        &self,
        user_id: Uuid,
        tier: PricingTier,
        voucher_type: ItemType,
        quantity: u32,
    ) -> LedgerResult<LedgerReceipt> {
        validate_quantity(quantity)?;
        let unit_price = self.price(voucher_type, tier).await?;
        let total = unit_price
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| LedgerError::ValidationError("purchase total overflows".to_string()))?;

        let mutation = LedgerMutation::new(
            user_id,
            -total,
            TransactionMetadata::VoucherPurchase {
                voucher_type,
                quantity,
                unit_price,
            },
            format!("Purchased {quantity} {} voucher(s)", voucher_type.label()),
        )
        .with_side_effect(SideEffect::IssueVouchers {
            voucher_type,
            quantity,
            unit_price,
        });
        self.apply(mutation).await
    }

    /// Takes a tournament seat paid for with points at the tier's price.
    pub async fn enter_tournament_with_points(
        &self,
        user_id: Uuid,
        tier: PricingTier,
        tournament_id: Uuid,
        entry_type: ItemType,
    ) -> LedgerResult<LedgerReceipt> {
        let price = self.price(entry_type, tier).await?;
        let mutation = LedgerMutation::new(
            user_id,
            -price,
            TransactionMetadata::TournamentEntry {
                tournament_id,
                entry_type,
            },
            format!("Tournament {} entry", entry_type.label()),
        )
        .with_side_effect(SideEffect::RecordTournamentEntry {
            tournament_id,
            entry_type,
        });
        self.apply(mutation).await
    }

    /// Takes a tournament seat by spending an active voucher. No points move,
    /// so no transaction record or point log is written.
    pub async fn enter_tournament_with_voucher(
        &self,
        user_id: Uuid,
        tournament_id: Uuid,
        entry_type: ItemType,
        voucher_id: Uuid,
    ) -> LedgerResult<TournamentEntry> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        tx.lock_balance(user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("user", user_id))?;

        let voucher = tx
            .lock_voucher(voucher_id)
            .await?
            .filter(|voucher| voucher.user_id == user_id)
            .ok_or_else(|| LedgerError::not_found("voucher", voucher_id))?;
        match voucher.effective_status(now) {
            VoucherStatus::Active => {}
            VoucherStatus::Used => {
                return Err(LedgerError::InvalidState(format!(
                    "voucher '{voucher_id}' has already been used"
                )))
            }
            VoucherStatus::Expired => {
                return Err(LedgerError::InvalidState(format!(
                    "voucher '{voucher_id}' expired at {}",
                    voucher.expires_at
                )))
            }
        }
        if voucher.voucher_type != entry_type {
            return Err(LedgerError::ValidationError(format!(
                "a {} voucher cannot pay for a {} entry",
                voucher.voucher_type.label(),
                entry_type.label()
            )));
        }

        check_entry(&mut tx, tournament_id, user_id, entry_type).await?;
        tx.set_voucher_status(voucher_id, VoucherStatus::Used, Some(now))
            .await?;
        let entry = TournamentEntry {
            id: Uuid::new_v4(),
            tournament_id,
            user_id,
            entry_type,
            voucher_id: Some(voucher_id),
            transaction_id: None,
            created_at: now,
        };
        tx.insert_tournament_entry(&entry).await?;
        tx.commit().await?;
        Ok(entry)
    }

    pub async fn adjust(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        amount: i64,
        note: String,
    ) -> LedgerResult<LedgerReceipt> {
        if note.trim().is_empty() {
            return Err(LedgerError::ValidationError(
                "adjustments need a note".to_string(),
            ));
        }
        let reason = format!("Admin adjustment: {note}");
        let mutation = LedgerMutation::new(
            user_id,
            amount,
            TransactionMetadata::AdminAdjustment { admin_id, note },
            reason,
        );
        self.apply(mutation).await
    }

    /// Vouchers owned by `user_id`, with expiry derived at `now`.
    pub async fn vouchers(&self, user_id: Uuid, now: DateTime<Utc>) -> LedgerResult<Vec<Voucher>> {
        let vouchers = self.store.list_vouchers(user_id).await?;
        Ok(vouchers
            .into_iter()
            .map(|voucher| voucher.with_effective_status(now))
            .collect())
    }

    /// Active policies visible to `tier`.
    pub async fn price_list(&self, tier: PricingTier) -> LedgerResult<Vec<PricingPolicy>> {
        let policies = self.store.list_pricing().await?;
        Ok(policies
            .into_iter()
            .filter(|policy| policy.active && policy.tier == tier)
            .collect())
    }

    async fn price(&self, item_type: ItemType, tier: PricingTier) -> LedgerResult<i64> {
        let policies = self.store.list_pricing().await?;
        price_for(&policies, item_type, tier)
    }

    async fn insert_pending(
        &self,
        user_id: Uuid,
        amount: i64,
        metadata: TransactionMetadata,
        must_cover: Option<i64>,
    ) -> LedgerResult<TransactionRecord> {
        let mut tx = self.store.begin().await?;
        let balance = tx
            .lock_balance(user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("user", user_id))?;
        if let Some(required) = must_cover {
            if balance < required {
                return Err(LedgerError::insufficient(balance, -required));
            }
        }

        let record = TransactionRecord::new(
            user_id,
            amount,
            metadata,
            TransactionStatus::Pending,
            Utc::now(),
        );
        tx.insert_transaction(&record).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Writes one validated mutation into `tx`. With `pending`, that record
    /// (already locked by the caller) is completed instead of inserting a new
    /// one.
    async fn execute(
        &self,
        tx: &mut S::Tx,
        mutation: LedgerMutation,
        pending: Option<TransactionRecord>,
        now: DateTime<Utc>,
    ) -> LedgerResult<LedgerReceipt> {
        let balance = tx
            .lock_balance(mutation.user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("user", mutation.user_id))?;

        let new_balance = balance.checked_add(mutation.amount).ok_or_else(|| {
            LedgerError::ValidationError("amount overflows the balance".to_string())
        })?;
        if new_balance < 0 {
            return Err(LedgerError::insufficient(balance, mutation.amount));
        }

        tx.set_balance(mutation.user_id, new_balance).await?;

        let transaction = match pending {
            Some(mut record) => {
                record.status = TransactionStatus::Completed;
                record.metadata = mutation.metadata;
                record.updated_at = now;
                tx.update_transaction(&record).await?;
                record
            }
            None => {
                let record = TransactionRecord::new(
                    mutation.user_id,
                    mutation.amount,
                    mutation.metadata,
                    TransactionStatus::Completed,
                    now,
                );
                tx.insert_transaction(&record).await?;
                record
            }
        };

        let point_log = PointLog {
            id: Uuid::new_v4(),
            user_id: mutation.user_id,
            transaction_id: transaction.id,
            amount: mutation.amount,
            balance_after: new_balance,
            reason: mutation.reason,
            created_at: now,
        };
        tx.insert_point_log(&point_log).await?;

        let mut vouchers = Vec::new();
        let mut entry = None;
        for effect in mutation.side_effects {
            match effect {
                SideEffect::IssueVouchers {
                    voucher_type,
                    quantity,
                    unit_price,
                } => {
                    let batch = (0..quantity)
                        .map(|_| {
                            Voucher::issue(
                                mutation.user_id,
                                transaction.id,
                                voucher_type,
                                unit_price,
                                now,
                                self.voucher_validity,
                            )
                        })
                        .collect::<LedgerResult<Vec<Voucher>>>()?;
                    tx.insert_vouchers(&batch).await?;
                    vouchers.extend(batch);
                }
                SideEffect::RecordTournamentEntry {
                    tournament_id,
                    entry_type,
                } => {
                    check_entry(tx, tournament_id, mutation.user_id, entry_type).await?;
                    let row = TournamentEntry {
                        id: Uuid::new_v4(),
                        tournament_id,
                        user_id: mutation.user_id,
                        entry_type,
                        voucher_id: None,
                        transaction_id: Some(transaction.id),
                        created_at: now,
                    };
                    tx.insert_tournament_entry(&row).await?;
                    entry = Some(row);
                }
            }
        }

        Ok(LedgerReceipt {
            transaction,
            point_log,
            balance: new_balance,
            vouchers,
            entry,
        })
    }
}

fn ensure_pending(record: &TransactionRecord) -> LedgerResult<()> {
    if record.status.is_final() {
        return Err(LedgerError::InvalidState(format!(
            "transaction '{}' is already {:?}",
            record.id, record.status
        )));
    }
    Ok(())
}

async fn lock_pending<T: UnitOfWork>(tx: &mut T, id: Uuid) -> LedgerResult<TransactionRecord> {
    let record = tx
        .lock_transaction(id)
        .await?
        .ok_or_else(|| LedgerError::not_found("transaction", id))?;
    ensure_pending(&record)?;
    Ok(record)
}

/// One buy-in per user and tournament; re-buys only after a buy-in.
async fn check_entry<T: UnitOfWork>(
    tx: &mut T,
    tournament_id: Uuid,
    user_id: Uuid,
    entry_type: ItemType,
) -> LedgerResult<()> {
    if !tx.tournament_exists(tournament_id).await? {
        return Err(LedgerError::not_found("tournament", tournament_id));
    }
    let buy_ins = tx
        .count_entries(tournament_id, user_id, ItemType::BuyIn)
        .await?;
    match entry_type {
        ItemType::BuyIn if buy_ins > 0 => Err(LedgerError::InvalidState(
            "already bought in to this tournament".to_string(),
        )),
        ItemType::ReBuy if buy_ins == 0 => Err(LedgerError::InvalidState(
            "a re-buy requires a buy-in first".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::models::{MemberRole, Tournament, User};
    use crate::store::MemoryStore;

    async fn setup(balance: i64) -> (LedgerService<MemoryStore>, User) {
        let store = MemoryStore::new();
        let user = store
            .seed_user(User::new("Sam", "sam@example.com", MemberRole::Guest), balance)
            .await;
        (LedgerService::new(store, Duration::days(30)), user)
    }

    async fn balance_of(service: &LedgerService<MemoryStore>, user_id: Uuid) -> i64 {
        service
            .store()
            .find_user(user_id)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    async fn tournament(service: &LedgerService<MemoryStore>) -> Uuid {
        let tournament = Tournament::new("Friday Deepstack", Utc::now() + Duration::days(2));
        service.store().create_tournament(&tournament).await.unwrap();
        tournament.id
    }

    fn adjustment(user_id: Uuid, amount: i64) -> LedgerMutation {
        LedgerMutation::new(
            user_id,
            amount,
            TransactionMetadata::AdminAdjustment {
                admin_id: Uuid::nil(),
                note: "test".to_string(),
            },
            "test",
        )
    }

    #[tokio::test]
    async fn test_guest_buys_two_vouchers() {
        let (service, user) = setup(100_000).await;

        let receipt = service
            .purchase_vouchers(user.id, PricingTier::Guest, ItemType::BuyIn, 2)
            .await
            .unwrap();

        assert_eq!(receipt.balance, 40_000);
        assert_eq!(receipt.transaction.amount, -60_000);
        assert_eq!(receipt.transaction.status, TransactionStatus::Completed);
        assert_eq!(receipt.transaction.transaction_type, TransactionType::VoucherPurchase);
        assert_eq!(receipt.point_log.balance_after, 40_000);
        assert_eq!(receipt.vouchers.len(), 2);
        for voucher in &receipt.vouchers {
            assert_eq!(voucher.status, VoucherStatus::Active);
            assert_eq!(voucher.price_paid, 30_000);
            assert_eq!(voucher.expires_at, receipt.transaction.created_at + Duration::days(30));
        }

        assert_eq!(balance_of(&service, user.id).await, 40_000);
        let stored = service.vouchers(user.id, Utc::now()).await.unwrap();
        assert_eq!(stored.len(), 2);
        let transactions = service
            .store()
            .list_transactions(Some(user.id), None)
            .await
            .unwrap();
        assert_eq!(transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_purchase_beyond_balance_writes_nothing() {
        let (service, user) = setup(20_000).await;

        let err = service
            .purchase_vouchers(user.id, PricingTier::Guest, ItemType::BuyIn, 1)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                balance: 20_000,
                requested: 30_000,
                shortfall: 10_000
            }
        ));
        assert_eq!(balance_of(&service, user.id).await, 20_000);
        assert!(service.vouchers(user.id, Utc::now()).await.unwrap().is_empty());
        assert_eq!(service.store().transaction_count().await, 0);
        assert!(service
            .store()
            .list_point_logs(user.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_debit_of_exact_balance_reaches_zero() {
        let (service, user) = setup(5_000).await;

        let err = service.apply(adjustment(user.id, -5_001)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(balance_of(&service, user.id).await, 5_000);

        let receipt = service.apply(adjustment(user.id, -5_000)).await.unwrap();
        assert_eq!(receipt.balance, 0);
        assert_eq!(balance_of(&service, user.id).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (service, _) = setup(0).await;
        let err = service.apply(adjustment(Uuid::new_v4(), 100)).await.unwrap_err();
        assert!(matches!(err, LedgerError::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_debits_only_one_wins() {
        let (service, user) = setup(100_000).await;
        let service = Arc::new(service);
        let user_id = user.id;

        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.apply(adjustment(user_id, -60_000)).await })
        };
        let second = {
            let service = service.clone();
            tokio::spawn(async move { service.apply(adjustment(user_id, -60_000)).await })
        };
        let results = [first.await.unwrap(), second.await.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let shortfalls = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::InsufficientBalance { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(shortfalls, 1);
        assert_eq!(balance_of(&service, user.id).await, 40_000);
    }

    #[tokio::test]
    async fn test_charge_confirmation_is_idempotent() {
        let (service, user) = setup(0).await;
        let admin = Uuid::new_v4();

        let pending = service
            .request_charge(user.id, 50_000, "Sam Park".to_string())
            .await
            .unwrap();
        assert_eq!(pending.status, TransactionStatus::Pending);
        assert_eq!(balance_of(&service, user.id).await, 0);

        let receipt = service.confirm(pending.id, admin).await.unwrap();
        assert_eq!(receipt.balance, 50_000);
        assert_eq!(receipt.transaction.id, pending.id);
        assert_eq!(receipt.transaction.status, TransactionStatus::Completed);
        match &receipt.transaction.metadata {
            TransactionMetadata::Charge { reviewed_by, .. } => assert_eq!(*reviewed_by, Some(admin)),
            other => panic!("unexpected metadata: {other:?}"),
        }

        let again = service.confirm(pending.id, admin).await.unwrap_err();
        assert!(matches!(again, LedgerError::InvalidState(_)));
        let rejected = service
            .reject(pending.id, admin, TransactionStatus::Cancelled, None)
            .await
            .unwrap_err();
        assert!(matches!(rejected, LedgerError::InvalidState(_)));

        assert_eq!(balance_of(&service, user.id).await, 50_000);
        assert_eq!(service.store().list_point_logs(user.id).await.unwrap().len(), 1);
        assert_eq!(service.store().transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejected_charge_cannot_be_confirmed() {
        let (service, user) = setup(0).await;
        let admin = Uuid::new_v4();
        let pending = service
            .request_charge(user.id, 10_000, "Sam".to_string())
            .await
            .unwrap();

        let rejected = service
            .reject(
                pending.id,
                admin,
                TransactionStatus::Cancelled,
                Some("no deposit".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, TransactionStatus::Cancelled);

        let err = service.confirm(pending.id, admin).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
        assert_eq!(balance_of(&service, user.id).await, 0);
        assert!(service.store().list_point_logs(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reject_refuses_non_terminal_status() {
        let (service, user) = setup(0).await;
        let pending = service
            .request_charge(user.id, 10_000, "Sam".to_string())
            .await
            .unwrap();
        let err = service
            .reject(pending.id, Uuid::new_v4(), TransactionStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_withdrawal_checks_balance_at_confirmation() {
        let (service, user) = setup(30_000).await;
        let admin = Uuid::new_v4();

        let err = service
            .request_withdrawal(user.id, 40_000, "bank 001".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { shortfall: 10_000, .. }));

        let pending = service
            .request_withdrawal(user.id, 20_000, "bank 001".to_string())
            .await
            .unwrap();
        assert_eq!(pending.amount, -20_000);

        service
            .purchase_vouchers(user.id, PricingTier::Guest, ItemType::ReBuy, 1)
            .await
            .unwrap();
        assert_eq!(balance_of(&service, user.id).await, 5_000);

        let err = service.confirm(pending.id, admin).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        let still_pending = service
            .store()
            .list_transactions(Some(user.id), Some(TransactionStatus::Pending))
            .await
            .unwrap();
        assert_eq!(still_pending.len(), 1);

        service.apply(adjustment(user.id, 15_000)).await.unwrap();
        let receipt = service.confirm(pending.id, admin).await.unwrap();
        assert_eq!(receipt.balance, 0);
        assert_eq!(receipt.point_log.amount, -20_000);
    }

    #[tokio::test]
    async fn test_user_cancels_only_own_request() {
        let (service, user) = setup(0).await;
        let pending = service
            .request_charge(user.id, 10_000, "Sam".to_string())
            .await
            .unwrap();

        let err = service
            .cancel_request(pending.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::EntityNotFound(_)));

        let cancelled = service.cancel_request(pending.id, user.id).await.unwrap();
        assert_eq!(cancelled.status, TransactionStatus::Cancelled);
        let err = service.cancel_request(pending.id, user.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_voucher_entry_consumes_voucher() {
        let (service, user) = setup(60_000).await;
        let tournament_id = tournament(&service).await;
        let receipt = service
            .purchase_vouchers(user.id, PricingTier::Guest, ItemType::BuyIn, 1)
            .await
            .unwrap();
        let voucher_id = receipt.vouchers[0].id;

        let entry = service
            .enter_tournament_with_voucher(user.id, tournament_id, ItemType::BuyIn, voucher_id)
            .await
            .unwrap();
        assert_eq!(entry.voucher_id, Some(voucher_id));
        assert_eq!(entry.transaction_id, None);

        let vouchers = service.vouchers(user.id, Utc::now()).await.unwrap();
        assert_eq!(vouchers[0].status, VoucherStatus::Used);
        assert!(vouchers[0].used_at.is_some());
        assert_eq!(balance_of(&service, user.id).await, 30_000);

        let tournament_two = tournament(&service).await;
        let err = service
            .enter_tournament_with_voucher(user.id, tournament_two, ItemType::BuyIn, voucher_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_expired_voucher_is_refused() {
        let store = MemoryStore::new();
        let user = store
            .seed_user(User::new("Sam", "sam@example.com", MemberRole::Guest), 30_000)
            .await;
        let service = LedgerService::new(store, Duration::seconds(-1));
        let tournament_id = tournament(&service).await;

        let receipt = service
            .purchase_vouchers(user.id, PricingTier::Guest, ItemType::BuyIn, 1)
            .await
            .unwrap();
        let voucher = &receipt.vouchers[0];
        assert_eq!(voucher.status, VoucherStatus::Active);

        let listed = service.vouchers(user.id, Utc::now()).await.unwrap();
        assert_eq!(listed[0].status, VoucherStatus::Expired);

        let err = service
            .enter_tournament_with_voucher(user.id, tournament_id, ItemType::BuyIn, voucher.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
        assert!(service.store().entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_voucher_of_other_type_is_refused() {
        let (service, user) = setup(60_000).await;
        let tournament_id = tournament(&service).await;
        let receipt = service
            .purchase_vouchers(user.id, PricingTier::Guest, ItemType::ReBuy, 1)
            .await
            .unwrap();

        let err = service
            .enter_tournament_with_voucher(
                user.id,
                tournament_id,
                ItemType::BuyIn,
                receipt.vouchers[0].id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_points_entry_follows_buy_in_rules() {
        let (service, user) = setup(100_000).await;
        let tournament_id = tournament(&service).await;

        let err = service
            .enter_tournament_with_points(user.id, PricingTier::Guest, tournament_id, ItemType::ReBuy)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
        assert_eq!(balance_of(&service, user.id).await, 100_000);

        let receipt = service
            .enter_tournament_with_points(user.id, PricingTier::Guest, tournament_id, ItemType::BuyIn)
            .await
            .unwrap();
        assert_eq!(receipt.balance, 70_000);
        let entry = receipt.entry.unwrap();
        assert_eq!(entry.transaction_id, Some(receipt.transaction.id));

        let err = service
            .enter_tournament_with_points(user.id, PricingTier::Guest, tournament_id, ItemType::BuyIn)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));

        let receipt = service
            .enter_tournament_with_points(user.id, PricingTier::Guest, tournament_id, ItemType::ReBuy)
            .await
            .unwrap();
        assert_eq!(receipt.balance, 45_000);
        assert_eq!(service.store().entries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tournament_rolls_back_debit() {
        let (service, user) = setup(100_000).await;
        let err = service
            .enter_tournament_with_points(user.id, PricingTier::Guest, Uuid::new_v4(), ItemType::BuyIn)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::EntityNotFound(_)));
        assert_eq!(balance_of(&service, user.id).await, 100_000);
        assert_eq!(service.store().transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_price_is_reported() {
        let (service, user) = setup(100_000).await;
        let mut policy = PricingPolicy::new(ItemType::BuyIn, PricingTier::Guest, 30_000);
        policy.active = false;
        service.store().upsert_pricing(&policy).await.unwrap();

        let err = service
            .purchase_vouchers(user.id, PricingTier::Guest, ItemType::BuyIn, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PricingNotConfigured { .. }));
        assert_eq!(service.price_list(PricingTier::Guest).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_adjustment_requires_note() {
        let (service, user) = setup(0).await;
        let err = service
            .adjust(Uuid::new_v4(), user.id, 1_000, "  ".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ValidationError(_)));

        let receipt = service
            .adjust(Uuid::new_v4(), user.id, 1_000, "tournament prize".to_string())
            .await
            .unwrap();
        assert_eq!(receipt.point_log.reason, "Admin adjustment: tournament prize");
        assert_eq!(receipt.balance, 1_000);
    }

    #[tokio::test]
    async fn test_minimum_adjustment_is_rejected() {
        let (service, user) = setup(100).await;
        let err = service
            .adjust(Uuid::new_v4(), user.id, i64::MIN, "clear out".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ValidationError(_)));
        assert_eq!(balance_of(&service, user.id).await, 100);

        let err = service
            .adjust(Uuid::new_v4(), user.id, i64::MIN + 1, "clear out".to_string())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { requested: i64::MAX, .. }
        ));
    }

    #[tokio::test]
    async fn test_unrepresentable_voucher_expiry_writes_nothing() {
        let store = MemoryStore::new();
        let user = store
            .seed_user(User::new("Sam", "sam@example.com", MemberRole::Guest), 100_000)
            .await;
        let service = LedgerService::new(store, Duration::days(100_000_000));

        let err = service
            .purchase_vouchers(user.id, PricingTier::Guest, ItemType::BuyIn, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ValidationError(_)));
        assert_eq!(balance_of(&service, user.id).await, 100_000);
        assert_eq!(service.store().transaction_count().await, 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Final balance is the start plus every accepted amount, and no
        /// prefix of the history dips below zero.
        #[test]
        fn prop_balance_matches_successful_mutations(
            initial in 0i64..200_000,
            amounts in prop::collection::vec(
                prop_oneof![-80_000i64..-1, 1i64..80_000],
                1..25,
            ),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let (service, user) = setup(initial).await;
                let mut expected = initial;
                let mut applied = 0usize;

                for amount in amounts {
                    match service.apply(adjustment(user.id, amount)).await {
                        Ok(receipt) => {
                            expected += amount;
                            applied += 1;
                            prop_assert_eq!(receipt.balance, expected);
                        }
                        Err(LedgerError::InsufficientBalance { .. }) => {
                            prop_assert!(expected + amount < 0);
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {}", other),
                    }
                    prop_assert!(balance_of(&service, user.id).await >= 0);
                }

                prop_assert_eq!(balance_of(&service, user.id).await, expected);
                let logs = service.store().list_point_logs(user.id).await.unwrap();
                prop_assert_eq!(logs.len(), applied);
                Ok(())
            })?;
        }
    }
}
