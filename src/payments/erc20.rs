//! ERC-20 ABI fragments used by the token rail.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};

use crate::blockchain::client::ChainRpc;
use crate::blockchain::types::{CallRequest, ChainError, ChainLog, ChainResult};

sol! {
    interface IERC20 {
        function decimals() external view returns (uint8);
        function transfer(address to, uint256 amount) external returns (bool);

        #[derive(Debug)]
        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}

/// Topic 0 of `Transfer(address,address,uint256)`.
pub fn transfer_topic() -> B256 {
    IERC20::Transfer::SIGNATURE_HASH
}

/// Left-pad an address into a 32-byte topic.
pub fn address_topic(address: Address) -> B256 {
    address.into_word()
}

/// Call data for `transfer(to, amount)`.
pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}

/// Read `decimals()` from a token contract.
pub async fn read_decimals(connection: &dyn ChainRpc, token: Address) -> ChainResult<u8> {
    let call = CallRequest {
        to: Some(token),
        data: IERC20::decimalsCall {}.abi_encode().into(),
        ..Default::default()
    };
    let output = connection.call(&call).await?;
    decode_decimals(&output)
}

fn decode_decimals(output: &[u8]) -> ChainResult<u8> {
    let word = output
        .get(..32)
        .ok_or_else(|| ChainError::Decode(format!("decimals() returned {} bytes", output.len())))?;
    u8::try_from(U256::from_be_slice(word))
        .map_err(|_| ChainError::Decode("decimals() result exceeds uint8".to_string()))
}

/// A decoded `Transfer` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Decode a `Transfer` log.
pub fn decode_transfer(log: &ChainLog) -> ChainResult<Transfer> {
    if log.topics.len() != 3 || log.topics[0] != transfer_topic() {
        return Err(ChainError::Decode(format!(
            "log at {:?} is not an ERC-20 Transfer",
            log.transaction_hash
        )));
    }
    let word = log.data.get(..32).ok_or_else(|| {
        ChainError::Decode(format!("Transfer log data has {} bytes", log.data.len()))
    })?;

    Ok(Transfer {
        from: Address::from_word(log.topics[1]),
        to: Address::from_word(log.topics[2]),
        value: U256::from_be_slice(word),
    })
}
