use anyhow::{anyhow, bail, Result};
use ethers::types::{Address, H256, U256};
use ethers::utils::to_checksum;
use std::str::FromStr;

pub fn fmt_address(addr: Address) -> String {
    format!("0x{}", hex::encode(addr.as_bytes()))
}

pub fn fmt_h256(h: H256) -> String {
    format!("0x{}", hex::encode(h.as_bytes()))
}

/// Renders a wei amount as ether: 18-decimal fixed point, full precision.
pub fn fmt_eth(wei: U256) -> String {
    let exa = U256::exp10(18);
    let whole = wei / exa;
    let frac = (wei % exa).to_string();
    format!("{}.{:0>18}", whole, frac)
}

/// Parses a 20-byte hex address.
///
/// Mixed-case input must carry a valid EIP-55 checksum; single-case input is
/// accepted as checksum-agnostic. Callers validate with this before opening
/// any connection, so a bad address never turns into an RPC call.
pub fn parse_checksummed(s: &str) -> Result<Address> {
    let hex_part = s
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("invalid address '{s}': missing 0x prefix"))?;
    if hex_part.len() != 40 {
        bail!(
            "invalid address '{s}': expected 40 hex chars, got {}",
            hex_part.len()
        );
    }
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("invalid address '{s}': non-hex characters");
    }

    let addr = Address::from_str(s).map_err(|e| anyhow!("invalid address '{s}': {e}"))?;

    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower && to_checksum(&addr, None) != s {
        bail!("invalid address '{s}': bad EIP-55 checksum");
    }

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::{fmt_address, fmt_eth, parse_checksummed};
    use ethers::types::U256;

    // EIP-55 test vector.
    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn parse_valid_checksummed() {
        let addr = parse_checksummed(CHECKSUMMED).unwrap();
        assert_eq!(fmt_address(addr), CHECKSUMMED.to_lowercase());
    }

    #[test]
    fn parse_all_lowercase_is_accepted() {
        let lower = CHECKSUMMED.to_lowercase();
        assert!(parse_checksummed(&lower).is_ok());
    }

    #[test]
    fn parse_bad_checksum_is_rejected() {
        // Same hex digits, wrong casing on the second character.
        let bad = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        let err = parse_checksummed(bad).unwrap_err();
        assert!(err.to_string().contains("checksum"), "{err}");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(parse_checksummed("0x5aAeb6").is_err());
        assert!(parse_checksummed(&format!("{CHECKSUMMED}00")).is_err());
    }

    #[test]
    fn parse_rejects_non_hex() {
        let bad = "0xzzAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert!(parse_checksummed(bad).is_err());
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        let bad = CHECKSUMMED.trim_start_matches("0x");
        assert!(parse_checksummed(bad).is_err());
    }

    #[test]
    fn fmt_eth_full_precision() {
        assert_eq!(fmt_eth(U256::zero()), "0.000000000000000000");
        assert_eq!(fmt_eth(U256::one()), "0.000000000000000001");
        assert_eq!(
            fmt_eth(U256::exp10(18) * U256::from(50u64)),
            "50.000000000000000000"
        );
        // 1.5 ETH
        assert_eq!(
            fmt_eth(U256::exp10(18) + U256::exp10(17) * U256::from(5u64)),
            "1.500000000000000000"
        );
    }
}
