//! Well-known network names.

/// Chain id of a well-known network name, matched case-insensitively.
///
/// Unknown names return `None`; the chain id is then whatever the ledger
/// node reports.
pub fn known_chain_id(network: &str) -> Option<u64> {
    match network.to_ascii_lowercase().as_str() {
        "ropsten" => Some(3),
        "rinkeby" => Some(4),
        "goerli" => Some(5),
        "kovan" => Some(42),
        "xsc" => Some(530),
        "sepolia" => Some(11_155_111),
        "holesky" => Some(17_000),
        _ => None,
    }
}
