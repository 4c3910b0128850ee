//! Read-only view of a connected account

use crate::coordinator::read_error;
use crate::provider::SigningProvider;
use adapay_core::{abbreviate, decode_balance, AddressCodec, Balance, FeeEstimator, Result};

/// Addresses and balance of the connected account, fetched together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// Network id reported by the provider
    pub network_id: u8,
    /// Address shown to the user as "the" account address
    pub primary_address: String,
    /// Address change outputs are sent to
    pub change_address: String,
    /// First reward address, if the account has one
    pub reward_address: Option<String>,
    /// Decoded balance
    pub balance: Balance,
    /// Balance minus the advisory fee estimate
    pub max_sendable: u64,
}

impl AccountSnapshot {
    /// Fetch everything concurrently.
    ///
    /// The primary address is the first used address, else the first unused
    /// address, else the change address. All addresses are normalized to
    /// their text form.
    pub async fn fetch<P: SigningProvider + ?Sized>(provider: &P) -> Result<Self> {
        let (network_id, used, unused, change, rewards, raw_balance) = tokio::try_join!(
            async { provider.network_id().await.map_err(read_error) },
            async { provider.used_addresses().await.map_err(read_error) },
            async { provider.unused_addresses().await.map_err(read_error) },
            async { provider.change_address().await.map_err(read_error) },
            async { provider.reward_addresses().await.map_err(read_error) },
            async { provider.balance().await.map_err(read_error) },
        )?;

        let change_address = AddressCodec::normalize(&change)?;
        let primary_address = match used.first().or_else(|| unused.first()) {
            Some(address) => AddressCodec::normalize(address)?,
            None => change_address.clone(),
        };
        let reward_address = rewards
            .first()
            .map(|address| AddressCodec::normalize(address))
            .transpose()?;

        let balance = decode_balance(&raw_balance)?;
        let max_sendable = FeeEstimator::new().max_sendable(balance.lovelace, false);

        tracing::debug!(
            "Account {} holds {} lovelace ({:?})",
            abbreviate(&primary_address),
            balance.lovelace,
            balance.encoding
        );

        Ok(Self {
            network_id,
            primary_address,
            change_address,
            reward_address,
            balance,
            max_sendable,
        })
    }
}
