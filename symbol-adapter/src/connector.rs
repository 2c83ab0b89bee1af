//! Node-facing interfaces used by the reconciler

use crate::{
    client::NodeClient,
    pagination::PagedFetcher,
    types::{AccountInfo, BlockInfo, HarvestQuery, TransactionStatementInfo, UnlockedAccounts},
    Error, Result,
};
use async_trait::async_trait;
use harvest_ledger::{Address, HarvestStatement};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Source of harvest fee statements and block timestamps
#[async_trait]
pub trait HarvestSource: Send + Sync {
    /// All harvest statements at or above `from_height`, ascending by height.
    ///
    /// Either every page is returned or the call fails.
    async fn fetch_since(
        &self,
        query: &HarvestQuery,
        from_height: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<HarvestStatement>>;

    /// Block timestamp in milliseconds since the network epoch
    async fn block_timestamp_ms(&self, height: u64, cancel: &CancellationToken) -> Result<u64>;
}

/// Node-side lookups that are not part of the reconciliation itself
#[async_trait]
pub trait NodeDirectory: Send + Sync {
    /// Number of blocks whose beneficiary is `beneficiary`
    async fn harvested_block_count(
        &self,
        beneficiary: &Address,
        cancel: &CancellationToken,
    ) -> Result<usize>;

    /// Main accounts of everyone currently harvesting on the node
    async fn delegated_harvesters(&self, cancel: &CancellationToken) -> Result<Vec<Address>>;
}

#[async_trait]
impl<T: HarvestSource + ?Sized> HarvestSource for &T {
    async fn fetch_since(
        &self,
        query: &HarvestQuery,
        from_height: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<HarvestStatement>> {
        (**self).fetch_since(query, from_height, cancel).await
    }

    async fn block_timestamp_ms(&self, height: u64, cancel: &CancellationToken) -> Result<u64> {
        (**self).block_timestamp_ms(height, cancel).await
    }
}

#[async_trait]
impl<T: NodeDirectory + ?Sized> NodeDirectory for &T {
    async fn harvested_block_count(
        &self,
        beneficiary: &Address,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        (**self).harvested_block_count(beneficiary, cancel).await
    }

    async fn delegated_harvesters(&self, cancel: &CancellationToken) -> Result<Vec<Address>> {
        (**self).delegated_harvesters(cancel).await
    }
}

impl NodeClient {
    fn pages(&self) -> Result<PagedFetcher<&Self>> {
        PagedFetcher::new(self, self.config().page_size)
    }

    async fn account(&self, public_key: &str, cancel: &CancellationToken) -> Result<AccountInfo> {
        self.get_json(&format!("/accounts/{}", public_key), &[], cancel)
            .await
    }

    /// Resolve a harvesting (remote) key to its main account address
    async fn main_account_address(
        &self,
        remote_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Address> {
        let remote = self.account(remote_key, cancel).await?;

        match remote.account.linked_public_key() {
            Some(main_key) => {
                let main = self.account(main_key, cancel).await?;
                main.account.address()
            }
            None => {
                debug!(key = remote_key, "Harvesting key has no linked account");
                remote.account.address()
            }
        }
    }
}

#[async_trait]
impl HarvestSource for NodeClient {
    async fn fetch_since(
        &self,
        query: &HarvestQuery,
        from_height: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<HarvestStatement>> {
        let params = query.to_params(from_height);
        let infos: Vec<TransactionStatementInfo> = self
            .pages()?
            .fetch_all("/statements/transaction", &params, cancel)
            .await?;

        let mut statements = infos
            .into_iter()
            .map(HarvestStatement::try_from)
            .collect::<Result<Vec<_>>>()?;

        statements.retain(|s| s.height >= from_height);
        statements.sort_by_key(|s| s.height);
        statements.dedup_by_key(|s| s.height);

        info!(
            from_height,
            count = statements.len(),
            "Fetched harvest statements"
        );
        Ok(statements)
    }

    async fn block_timestamp_ms(&self, height: u64, cancel: &CancellationToken) -> Result<u64> {
        let info: BlockInfo = self
            .get_json(&format!("/blocks/{}", height), &[], cancel)
            .await?;
        Ok(info.block.timestamp)
    }
}

#[async_trait]
impl NodeDirectory for NodeClient {
    async fn harvested_block_count(
        &self,
        beneficiary: &Address,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let params = vec![("beneficiaryAddress".to_string(), beneficiary.to_string())];
        let blocks: Vec<Value> = self.pages()?.fetch_all("/blocks", &params, cancel).await?;
        Ok(blocks.len())
    }

    async fn delegated_harvesters(&self, cancel: &CancellationToken) -> Result<Vec<Address>> {
        let unlocked: UnlockedAccounts = self.get_json("/node/unlockedaccount", &[], cancel).await?;

        let mut harvesters = Vec::with_capacity(unlocked.unlocked_account.len());
        for key in &unlocked.unlocked_account {
            match self.main_account_address(key, cancel).await {
                Ok(address) => {
                    if !harvesters.contains(&address) {
                        harvesters.push(address);
                    }
                }
                // Keys the chain has never seen have no account yet
                Err(Error::Api {
                    status_code: 404, ..
                }) => warn!(key = %key, "Unused public key has no address"),
                Err(e) => return Err(e),
            }
        }

        Ok(harvesters)
    }
}
