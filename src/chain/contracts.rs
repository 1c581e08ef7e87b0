//! Contract interfaces the relay talks to.
//!
//! Both the read path and the write path encode calls from these bindings;
//! nothing else in the crate spells out selectors or event signatures.

use alloy::sol;

sol! {
    /// Q&A bounty contract.
    #[derive(Debug, PartialEq, Eq)]
    interface IQnA {
        function askQuestion(address token, uint256 bounty, uint256 deadline, string uri) external payable returns (uint256);
        function askQuestionOnBehalf(address asker, address token, uint256 bounty, uint256 deadline, string uri) external returns (uint256);
        function addBounty(uint256 questionId, uint256 amount) external payable;
        function addBountyOnBehalf(address funder, uint256 questionId, uint256 amount) external;
        function reduceBountyAsAdmin(uint256 questionId, uint256 newAmount) external;
        function cancelQuestionAsAdmin(uint256 questionId) external;
        function answerQuestion(uint256 questionId, string uri) external returns (uint256);
        function answerQuestionOnBehalf(address answerer, uint256 questionId, string uri) external returns (uint256);
        function acceptAnswerAsAdmin(uint256 questionId, uint256 answerId) external;
        function fundBounty(uint256 questionId) external payable;

        function questionCount() external view returns (uint256);
        function bountyOf(uint256 questionId) external view returns (uint256);
        function getQuestion(uint256 questionId) external view returns (
            address asker,
            address token,
            uint256 bounty,
            uint256 deadline,
            string uri,
            bool answered
        );

        event QuestionAsked(uint256 indexed questionId, address indexed asker, address token, uint256 bounty, uint256 deadline, string uri);
        event AnswerPosted(uint256 indexed questionId, uint256 indexed answerId, address indexed answerer, string uri);
        event AnswerAccepted(uint256 indexed questionId, uint256 indexed answerId, address indexed answerer, uint256 bounty);
        event BountyAdded(uint256 indexed questionId, address indexed funder, uint256 amount);
        event QuestionCancelled(uint256 indexed questionId);

        error NotOpen();
        error AlreadyAccepted();
        error NotAuthorized();
        error InvalidQuestion();
        error InvalidAnswer();
    }

    /// Platform ERC-20 token.
    #[derive(Debug, PartialEq, Eq)]
    interface IBrainToken {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 value);

        error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
        error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
        error OwnableUnauthorizedAccount(address account);
    }

    /// Faucet / swap contract holding the rate and the faucet amount.
    #[derive(Debug, PartialEq, Eq)]
    interface IFaucetSwap {
        function faucetAmount() external view returns (uint256);
        function swapRate() external view returns (uint256);
        function getSwapAmount(uint256 ethAmount) external view returns (uint256);
        function getBrainBalance() external view returns (uint256);
        function hasClaimedFaucet(address account) external view returns (bool);

        function setFaucetAmount(uint256 amount) external;
        function setSwapRate(uint256 rate) external;
        function withdrawBrain(uint256 amount) external;
        function withdrawEth() external;
    }
}
