//! Nonce bumping until the next contract address sorts on the wanted side of
//! a reference address.
//!
//! Pools such as Uniswap order their two tokens by address, so the token's
//! deployment address decides whether it becomes `token0` or `token1`. The
//! deployer cannot choose the address directly, only its nonce: every
//! zero-value self-transfer moves the next CREATE address to a new,
//! effectively random position.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use log::{debug, info};
use rayon::prelude::*;

use crate::chain::Chain;
use crate::error::{DeployError, Result};
use crate::predictor::{contract_address, predict_address};

/// strict lexicographic order of the lowercase forms of `a` and `b`.
/// strings that differ only in case never precede each other.
pub fn precedes_ignoring_case(a: &str, b: &str) -> bool {
    a.to_ascii_lowercase() < b.to_ascii_lowercase()
}

/// condition a predicted contract address has to meet.
pub trait AddressPredicate: Sync {
    fn is_satisfied(&self, candidate: &Address) -> bool;
}

impl<F> AddressPredicate for F
where
    F: Fn(&Address) -> bool + Sync,
{
    fn is_satisfied(&self, candidate: &Address) -> bool {
        self(candidate)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortPosition {
    #[default]
    Before,
    After,
}

impl FromStr for SortPosition {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            other => Err(DeployError::Config(format!(
                "unknown sort position `{other}`, expected `before` or `after`"
            ))),
        }
    }
}

impl fmt::Display for SortPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// candidate must sort strictly before (or after) `reference`, comparing the
/// checksummed strings case-insensitively. equality satisfies neither side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortCondition {
    pub reference: Address,
    pub position: SortPosition,
}

impl SortCondition {
    pub fn new(reference: Address, position: SortPosition) -> Self {
        Self {
            reference,
            position,
        }
    }
}

impl AddressPredicate for SortCondition {
    fn is_satisfied(&self, candidate: &Address) -> bool {
        let candidate = candidate.to_checksum(None);
        let reference = self.reference.to_checksum(None);
        match self.position {
            SortPosition::Before => precedes_ignoring_case(&candidate, &reference),
            SortPosition::After => precedes_ignoring_case(&reference, &candidate),
        }
    }
}

/// smallest offset `k <= max_offset` for which the address `account` creates
/// at `start_nonce + k` satisfies `predicate`. pure; nothing is submitted.
pub fn plan_offset<P: AddressPredicate>(
    account: &Address,
    start_nonce: u64,
    predicate: &P,
    max_offset: u64,
) -> Option<u64> {
    const CHUNK_SIZE: u64 = 1000;

    (0..max_offset / CHUNK_SIZE + 1)
        .into_par_iter()
        .find_map_first(|chunk| {
            let start = chunk * CHUNK_SIZE;
            let end = start.saturating_add(CHUNK_SIZE).min(max_offset.saturating_add(1));
            (start..end).find(|&offset| match start_nonce.checked_add(offset) {
                Some(nonce) => predicate.is_satisfied(&contract_address(account, nonce)),
                None => false,
            })
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedAddress {
    /// address the signer's next deployment will land on
    pub address: Address,
    /// nonce that deployment will use
    pub nonce: u64,
    pub self_transfers: u64,
}

/// bumps the signer's nonce with self-transfers until its next contract
/// address satisfies the predicate.
pub struct OrderingLoop<P> {
    predicate: P,
    max_iterations: Option<u64>,
    timeout: Option<Duration>,
}

impl<P: AddressPredicate> OrderingLoop<P> {
    /// unbounded loop; see [`Self::with_max_iterations`] and [`Self::with_timeout`]
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            max_iterations: None,
            timeout: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    pub async fn run<C: Chain + ?Sized>(&self, chain: &C) -> Result<OrderedAddress> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.advance(chain))
                .await
                .map_err(|_| DeployError::Timeout(limit))?,
            None => self.advance(chain).await,
        }
    }

    async fn advance<C: Chain + ?Sized>(&self, chain: &C) -> Result<OrderedAddress> {
        let account = chain.signer_address();
        let mut self_transfers = 0;

        loop {
            let prediction = predict_address(chain, account, 0).await?;
            if self.predicate.is_satisfied(&prediction.address) {
                info!(
                    "next contract address {} at nonce {} after {} self-transfers",
                    prediction.address.to_checksum(None),
                    prediction.nonce,
                    self_transfers
                );
                return Ok(OrderedAddress {
                    address: prediction.address,
                    nonce: prediction.nonce,
                    self_transfers,
                });
            }

            if self.max_iterations.is_some_and(|max| self_transfers >= max) {
                return Err(DeployError::IterationLimit {
                    attempts: self_transfers,
                    last: prediction.address,
                });
            }

            info!(
                "{} at nonce {} does not qualify, sending self-transfer",
                prediction.address.to_checksum(None),
                prediction.nonce
            );
            let tx = chain.self_transfer().await?;
            debug!("self-transfer {tx} confirmed");
            self_transfers += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{MockChain, Submitted};
    use alloy::primitives::U256;

    const WETH: &str = "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1";

    // nonce 0..=3 create 0xcd23.., 0x343c.., 0xf778.., 0xfffd..
    fn sender() -> Address {
        Address::from_str("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap()
    }

    fn weth() -> Address {
        Address::from_str(WETH).unwrap()
    }

    #[test]
    fn lower_prefix_precedes_reference() {
        assert!(precedes_ignoring_case(
            "0x1000000000000000000000000000000000000000",
            WETH
        ));
        assert!(!precedes_ignoring_case(
            WETH,
            "0x1000000000000000000000000000000000000000"
        ));
    }

    #[test]
    fn comparison_ignores_case() {
        let upper = "0xAA00000000000000000000000000000000000000";
        let lower = "0xaa00000000000000000000000000000000000000";
        assert!(!precedes_ignoring_case(upper, lower));
        assert!(!precedes_ignoring_case(lower, upper));
        // 'B' sorts before 'a' in ascii, but not once case is ignored
        assert!(precedes_ignoring_case("0xa0", "0xB0"));
    }

    #[test]
    fn equal_address_satisfies_neither_position() {
        for position in [SortPosition::Before, SortPosition::After] {
            let condition = SortCondition::new(weth(), position);
            assert!(!condition.is_satisfied(&weth()));
        }
    }

    #[test]
    fn sort_position_parses() {
        assert_eq!("Before".parse::<SortPosition>().unwrap(), SortPosition::Before);
        assert_eq!("after".parse::<SortPosition>().unwrap(), SortPosition::After);
        assert!("sideways".parse::<SortPosition>().is_err());
    }

    #[test]
    fn sort_position_cli_values() {
        use clap::ValueEnum;

        let names: Vec<_> = SortPosition::value_variants()
            .iter()
            .filter_map(|p| p.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["before", "after"]);
    }

    #[test]
    fn plan_finds_first_qualifying_offset() {
        let before = SortCondition::new(weth(), SortPosition::Before);
        assert_eq!(plan_offset(&sender(), 0, &before, 10), Some(1));
        assert_eq!(plan_offset(&sender(), 1, &before, 10), Some(0));

        let after = SortCondition::new(weth(), SortPosition::After);
        assert_eq!(plan_offset(&sender(), 1, &after, 10), Some(1));
    }

    #[test]
    fn plan_respects_max_offset() {
        let target = contract_address(&sender(), 2500);
        let exact = |candidate: &Address| *candidate == target;

        assert_eq!(plan_offset(&sender(), 0, &exact, 2499), None);
        assert_eq!(plan_offset(&sender(), 0, &exact, 2500), Some(2500));
    }

    #[tokio::test]
    async fn qualifying_address_needs_no_transfers() {
        let chain = MockChain::new(sender(), 1);
        let ordering = OrderingLoop::new(SortCondition::new(weth(), SortPosition::Before));

        let ordered = ordering.run(&chain).await.unwrap();
        assert_eq!(ordered.nonce, 1);
        assert_eq!(ordered.self_transfers, 0);
        assert_eq!(ordered.address, contract_address(&sender(), 1));
        assert!(chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn bumps_nonce_with_zero_value_self_transfers() {
        let chain = MockChain::new(sender(), 0);
        let ordering = OrderingLoop::new(SortCondition::new(weth(), SortPosition::Before));

        let ordered = ordering.run(&chain).await.unwrap();
        assert_eq!(ordered.self_transfers, 1);
        assert_eq!(ordered.nonce, 1);
        assert_eq!(
            chain.submitted(),
            vec![Submitted::Transfer {
                to: sender(),
                value: U256::ZERO
            }]
        );
    }

    #[tokio::test]
    async fn after_position_bumps_until_greater() {
        let chain = MockChain::new(sender(), 1);
        let ordering = OrderingLoop::new(SortCondition::new(weth(), SortPosition::After));

        let ordered = ordering.run(&chain).await.unwrap();
        assert_eq!(ordered.nonce, 2);
        assert_eq!(ordered.self_transfers, 1);
    }

    #[tokio::test]
    async fn loop_matches_plan() {
        let target = contract_address(&sender(), 5);
        let predicate = move |candidate: &Address| *candidate == target;
        let planned = plan_offset(&sender(), 0, &predicate, 100).unwrap();

        let chain = MockChain::new(sender(), 0);
        let ordered = OrderingLoop::new(predicate).run(&chain).await.unwrap();
        assert_eq!(ordered.self_transfers, planned);
        assert_eq!(chain.nonce(), 5);
    }

    #[tokio::test]
    async fn keeps_going_while_candidate_sorts_after_reference() {
        let low = Address::from_str("0x1000000000000000000000000000000000000000").unwrap();
        let chain = MockChain::new(sender(), 0);
        let ordering =
            OrderingLoop::new(SortCondition::new(low, SortPosition::Before)).with_max_iterations(3);

        let err = ordering.run(&chain).await.unwrap_err();
        assert!(matches!(err, DeployError::IterationLimit { attempts: 3, .. }));
        assert_eq!(chain.submitted().len(), 3);
    }

    #[tokio::test]
    async fn equal_reference_does_not_stop_the_loop() {
        let chain = MockChain::new(sender(), 0);
        let reference = contract_address(&sender(), 0);
        let ordering = OrderingLoop::new(SortCondition::new(reference, SortPosition::Before))
            .with_max_iterations(1);

        // nonce 0 equals the reference, nonce 1 (0x343c..) is below 0xcd23..
        let ordered = ordering.run(&chain).await.unwrap();
        assert_eq!(ordered.self_transfers, 1);
    }

    #[tokio::test]
    async fn rejected_self_transfer_aborts_the_loop() {
        let chain = MockChain::new(sender(), 0).failing_submission(2);
        let never = |_: &Address| false;

        let err = OrderingLoop::new(never).run(&chain).await.unwrap_err();
        assert!(matches!(err, DeployError::Transport(_)));
        assert_eq!(chain.submitted().len(), 2);
        assert_eq!(chain.nonce(), 2);
    }

    #[tokio::test]
    async fn failed_nonce_lookup_is_not_retried() {
        // first read sees 0xcd23.. which sorts after WETH, the second read fails
        let chain = MockChain::new(sender(), 0).failing_count_read(1);
        let ordering = OrderingLoop::new(SortCondition::new(weth(), SortPosition::Before));

        let err = ordering.run(&chain).await.unwrap_err();
        assert!(matches!(err, DeployError::Transport(_)));
        assert_eq!(chain.submitted().len(), 1);
    }

    #[tokio::test]
    async fn times_out() {
        let chain = MockChain::new(sender(), 0).with_delay(Duration::from_millis(50));
        let never = |_: &Address| false;
        let ordering = OrderingLoop::new(never).with_timeout(Duration::from_millis(10));

        let err = ordering.run(&chain).await.unwrap_err();
        assert!(matches!(err, DeployError::Timeout(_)));
    }
}
