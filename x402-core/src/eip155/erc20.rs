//! `ethers::contract::abigen!` binding for an EIP-3009-compliant ERC-20
//! token, carried over verbatim from the teacher's `schemes/exact_evm.rs`.

use ethers::contract::abigen;

abigen!(
    EIP3009Token,
    r#"[
        function transferWithAuthorization(address from, address to, uint256 value, uint256 validAfter, uint256 validBefore, bytes32 nonce, uint8 v, bytes32 r, bytes32 s) external
        function authorizationState(address authorizer, bytes32 nonce) external view returns (bool)
        function balanceOf(address account) external view returns (uint256)
        function decimals() external view returns (uint8)
        function name() external view returns (string)
        function version() external view returns (string)
    ]"#
);
