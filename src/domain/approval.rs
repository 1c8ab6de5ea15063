use alloy::primitives::{Address, TxHash, U256};

/// A decoded `Approval(owner, spender, value)` log from the token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEvent {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub tx_hash: TxHash,
    pub log_index: u64,
    pub block_number: u64,
}

impl ApprovalEvent {
    /// Lowercase `0x`-prefixed owner, the form the watchlist stores.
    pub fn owner_key(&self) -> String {
        format!("{:#x}", self.owner)
    }
}

/// Result of evaluating a watched owner's balance against an approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeDecision {
    pub owner: Address,
    pub approval_amount: U256,
    pub user_balance: U256,
    pub threshold: U256,
    pub triggered: bool,
    pub tx_hash: Option<TxHash>,
}

/// `floor(balance * 90 / 100)`, split so the multiplication cannot overflow.
pub fn freeze_threshold(balance: U256) -> U256 {
    let hundred = U256::from(100u64);
    let ninety = U256::from(90u64);
    (balance / hundred) * ninety + (balance % hundred) * ninety / hundred
}

pub fn should_freeze(amount: U256, threshold: U256) -> bool {
    !amount.is_zero() && amount >= threshold
}

/// Renders a base-unit amount with the token's decimals.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = amount / divisor;
    let fraction = amount % divisor;
    let fraction_str = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, fraction_str)
}
