//! Record processing for replay files
//!
//! `RecordProcessor` sits between the CSV readers and the `LedgerEngine`. It
//! performs the caller-side checks the transfer core relies on (positive
//! amounts, supported currencies, existing accounts with matching currency,
//! distinct source and destination) and then routes each record to the engine.

use std::time::Duration;

use tracing::debug;

use super::context::TxContext;
use super::engine::LedgerEngine;
use super::traits::{Querier, TransactionalStore};
use crate::types::{
    is_supported_currency, Account, AccountId, LedgerError, LedgerRecord, OpenAccountParams,
    PageParams, TransferTxParams,
};

const ACCOUNT_PAGE_SIZE: i64 = 500;

/// Validates replay records and applies them through a shared engine
#[derive(Debug)]
pub struct RecordProcessor<S> {
    engine: LedgerEngine<S>,
    tx_timeout: Option<Duration>,
}

impl<S> Clone for RecordProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            tx_timeout: self.tx_timeout,
        }
    }
}

impl<S: TransactionalStore> RecordProcessor<S> {
    pub fn new(engine: LedgerEngine<S>) -> Self {
        Self {
            engine,
            tx_timeout: None,
        }
    }

    /// Bound every record's transaction by `timeout`
    pub fn with_tx_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tx_timeout = timeout;
        self
    }

    pub fn engine(&self) -> &LedgerEngine<S> {
        &self.engine
    }

    fn context(&self, record: &LedgerRecord) -> TxContext {
        let ctx = TxContext::new(record.label());
        match self.tx_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    /// Validate a record and apply it
    pub async fn process_record(&self, record: LedgerRecord) -> Result<(), LedgerError> {
        let ctx = self.context(&record);

        match record {
            LedgerRecord::Open {
                owner,
                currency,
                balance,
            } => self.process_open(&ctx, owner, currency, balance).await,
            LedgerRecord::Transfer {
                from,
                to,
                amount,
                currency,
            } => self.process_transfer(&ctx, from, to, amount, currency).await,
        }
    }

    async fn process_open(
        &self,
        ctx: &TxContext,
        owner: String,
        currency: String,
        balance: i64,
    ) -> Result<(), LedgerError> {
        if balance < 0 {
            return Err(LedgerError::invalid_amount(balance));
        }
        if !is_supported_currency(&currency) {
            return Err(LedgerError::unsupported_currency(&currency));
        }

        let opened = self
            .engine
            .open_account(
                ctx,
                OpenAccountParams {
                    owner_name: owner,
                    currency,
                    balance,
                },
            )
            .await?;
        debug!(
            parent: ctx.span(),
            account = opened.account.id,
            balance = opened.account.balance,
            "account opened"
        );
        Ok(())
    }

    async fn process_transfer(
        &self,
        ctx: &TxContext,
        from: AccountId,
        to: AccountId,
        amount: i64,
        currency: String,
    ) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::invalid_amount(amount));
        }
        if !is_supported_currency(&currency) {
            return Err(LedgerError::unsupported_currency(&currency));
        }
        if from == to {
            return Err(LedgerError::same_account(from));
        }
        self.valid_account(ctx, from, &currency).await?;
        self.valid_account(ctx, to, &currency).await?;

        let result = self
            .engine
            .transfer_tx(
                ctx,
                TransferTxParams {
                    from_account_id: from,
                    to_account_id: to,
                    amount,
                },
            )
            .await?;
        debug!(
            parent: ctx.span(),
            transfer = result.transfer.id,
            from_balance = result.from_account.balance,
            to_balance = result.to_account.balance,
            "transfer applied"
        );
        Ok(())
    }

    async fn valid_account(
        &self,
        ctx: &TxContext,
        id: AccountId,
        currency: &str,
    ) -> Result<Account, LedgerError> {
        let account = self.engine.store().get_account(ctx, id).await?;
        if account.currency != currency {
            return Err(LedgerError::currency_mismatch(id, currency, &account.currency));
        }
        Ok(account)
    }

    /// Every committed account, ordered by id
    pub async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let ctx = TxContext::background();
        let mut accounts = Vec::new();
        let mut page_id = 1;

        loop {
            let page = self
                .engine
                .store()
                .list_accounts(&ctx, PageParams::page(page_id, ACCOUNT_PAGE_SIZE))
                .await?;
            let done = (page.len() as i64) < ACCOUNT_PAGE_SIZE;
            accounts.extend(page);
            if done {
                return Ok(accounts);
            }
            page_id += 1;
        }
    }
}
