//! Offline build plans
//!
//! A plan carries everything a wallet would otherwise supply: its UTXOs as
//! returned by `getUtxos` and its change address.

use adapay_core::{
    lovelace_to_ada, AddressCodec, PaymentRequest, SendConfig, TransactionBuilder,
    TransactionDraft, UtxoSelector,
};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Payment to build without a connected wallet
#[derive(Debug, Clone, Deserialize)]
pub struct BuildPlan {
    pub recipient: String,
    pub amount_ada: String,
    #[serde(default)]
    pub memo: Option<String>,
    pub change_address: String,
    pub utxos: Vec<String>,
}

/// What `adapay build` prints
#[derive(Debug, Serialize)]
pub struct BuildSummary {
    pub transaction_id: String,
    pub fee: u64,
    pub fee_ada: String,
    pub inputs: usize,
    pub change: Option<u64>,
    pub unsigned_transaction: String,
}

impl BuildPlan {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading plan {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing plan {}", path.display()))
    }

    pub fn build(&self, config: &SendConfig) -> anyhow::Result<TransactionDraft> {
        let request = PaymentRequest::parse(
            config,
            &self.recipient,
            &self.amount_ada,
            self.memo.as_deref(),
        )?;
        let change_address = AddressCodec::decode(&self.change_address)?;

        let available = UtxoSelector::decode_available(&self.utxos);
        if available.is_empty() {
            bail!("plan contains no decodable UTXOs");
        }

        let builder = TransactionBuilder::new(config)?;
        Ok(builder.build(&available, &request, &change_address)?)
    }
}

impl BuildSummary {
    pub fn from_draft(draft: &TransactionDraft) -> anyhow::Result<Self> {
        Ok(Self {
            transaction_id: draft.id()?,
            fee: draft.fee(),
            fee_ada: lovelace_to_ada(draft.fee()),
            inputs: draft.inputs().len(),
            change: draft.change_output().map(|output| output.coin),
            unsigned_transaction: draft.unsigned_hex()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapay_core::testing::{base_address, enterprise_address, utxo};
    use std::io::Write;

    fn plan(utxos: Vec<String>) -> BuildPlan {
        let owner = enterprise_address(0, 0x33);
        BuildPlan {
            recipient: base_address(0, 0x44).to_text().unwrap(),
            amount_ada: "2.5".to_string(),
            memo: Some("invoice 17".to_string()),
            change_address: owner.to_hex(),
            utxos,
        }
    }

    #[test]
    fn test_plan_builds_with_change() {
        let owner = enterprise_address(0, 0x33);
        let plan = plan(vec![utxo(1, 0, 10_000_000, &owner).to_hex().unwrap()]);

        let draft = plan.build(&SendConfig::default()).unwrap();
        let summary = BuildSummary::from_draft(&draft).unwrap();

        assert_eq!(summary.inputs, 1);
        assert_eq!(summary.change, Some(10_000_000 - 2_500_000 - summary.fee));
        assert_eq!(summary.transaction_id.len(), 64);
        assert!(summary.unsigned_transaction.starts_with("84"));
    }

    #[test]
    fn test_plan_without_usable_utxos() {
        let plan = plan(vec!["zz".to_string()]);
        assert!(plan.build(&SendConfig::default()).is_err());
    }

    #[test]
    fn test_load_plan_file() {
        let owner = enterprise_address(0, 0x33);
        let json = serde_json::json!({
            "recipient": base_address(0, 0x44).to_text().unwrap(),
            "amount_ada": "1",
            "change_address": owner.to_text().unwrap(),
            "utxos": [utxo(1, 0, 5_000_000, &owner).to_hex().unwrap()],
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json).unwrap();

        let plan = BuildPlan::load(file.path()).unwrap();
        assert!(plan.memo.is_none());
        assert!(plan.build(&SendConfig::default()).is_ok());
    }
}
