use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function balanceOf(address account) external view returns (uint256 balance);
    }
}

sol! {
    #[sol(rpc)]
    interface IFreezer {
        function freezeTokenAndRemoteMultiple(uint32[] calldata destDomains) external returns (bytes32[] messageIds);
    }
}
