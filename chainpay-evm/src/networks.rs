//! Known EVM networks and their native assets.

use chainpay::config::PaymentConfig;

/// Ethereum Mainnet chain ID.
pub const ETHEREUM_MAINNET: u64 = 1;

/// Ethereum Sepolia (testnet) chain ID.
pub const ETHEREUM_SEPOLIA: u64 = 11_155_111;

/// Base Mainnet chain ID.
pub const BASE_MAINNET: u64 = 8453;

/// Base Sepolia (testnet) chain ID.
pub const BASE_SEPOLIA: u64 = 84532;

/// Polygon Mainnet chain ID.
pub const POLYGON_MAINNET: u64 = 137;

/// Polygon Amoy (testnet) chain ID.
pub const POLYGON_AMOY: u64 = 80002;

/// Avalanche C-Chain chain ID.
pub const AVALANCHE_MAINNET: u64 = 43114;

/// Avalanche Fuji (testnet) chain ID.
pub const AVALANCHE_FUJI: u64 = 43113;

/// Celo Mainnet chain ID.
pub const CELO_MAINNET: u64 = 42220;

/// A chain and the native asset payments on it are denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownNetwork {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Human-readable network name.
    pub name: &'static str,
    /// Native asset symbol.
    pub asset_symbol: &'static str,
    /// Native asset decimal precision.
    pub decimals: u8,
}

const fn network(chain_id: u64, name: &'static str, asset_symbol: &'static str) -> KnownNetwork {
    KnownNetwork {
        chain_id,
        name,
        asset_symbol,
        decimals: 18,
    }
}

/// Every network with a known native asset.
pub const KNOWN_NETWORKS: &[KnownNetwork] = &[
    network(ETHEREUM_MAINNET, "ethereum", "ETH"),
    network(ETHEREUM_SEPOLIA, "ethereum-sepolia", "ETH"),
    network(BASE_MAINNET, "base", "ETH"),
    network(BASE_SEPOLIA, "base-sepolia", "ETH"),
    network(POLYGON_MAINNET, "polygon", "POL"),
    network(POLYGON_AMOY, "polygon-amoy", "POL"),
    network(AVALANCHE_MAINNET, "avalanche", "AVAX"),
    network(AVALANCHE_FUJI, "avalanche-fuji", "AVAX"),
    network(CELO_MAINNET, "celo", "CELO"),
];

/// Looks up a network by chain id.
#[must_use]
pub fn known_network(chain_id: u64) -> Option<&'static KnownNetwork> {
    KNOWN_NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Fills an unset asset symbol and precision from the known network table.
///
/// Explicitly configured values are left alone. Unknown chains keep the
/// [`PaymentConfig`] fallbacks.
pub fn apply_network_defaults(config: &mut PaymentConfig) {
    let Some(network) = known_network(config.chain_id) else {
        return;
    };
    if config.asset_symbol.is_none() {
        config.asset_symbol = Some(network.asset_symbol.to_owned());
    }
    if config.decimals.is_none() {
        config.decimals = Some(network.decimals);
    }
}
